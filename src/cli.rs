use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::benchmark::{self, BenchmarkParams, SchedulerKind};
use crate::config::Config;

#[derive(Parser)]
#[command(name = "cadenza")]
#[command(about = "Cadenza - cooperative step driver for suspended computations", long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default search)
    #[arg(long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Drive a synthetic computation and report step throughput
    Bench {
        /// Number of suspension points (default from config)
        #[arg(long)]
        steps: Option<usize>,

        /// Members per aggregate step (default from config)
        #[arg(long)]
        width: Option<usize>,

        /// Scheduler that runs deferred work
        #[arg(long, value_enum, default_value_t = SchedulerKind::EventLoop)]
        scheduler: SchedulerKind,
    },

    /// Print the resolved configuration as JSON
    Config,
}

/// Run the CLI by parsing process arguments
pub async fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    run_cli_with_args(cli).await
}

/// Run the CLI with provided arguments
pub async fn run_cli_from_args(args: Vec<String>) -> Result<()> {
    let cli = Cli::parse_from(args);
    run_cli_with_args(cli).await
}

async fn run_cli_with_args(cli: Cli) -> Result<()> {
    // Load configuration before anything else so config errors surface first
    let config = match &cli.config {
        Some(path) => Config::load_from(Some(path.as_str())),
        None => Config::load(),
    }?;
    init_tracing(&config.log_filter);

    match cli.command {
        Commands::Bench {
            steps,
            width,
            scheduler,
        } => {
            let params = BenchmarkParams {
                steps: steps.unwrap_or(config.bench.steps),
                width: width.unwrap_or(config.bench.width),
                scheduler,
            };
            let report = benchmark::run_benchmark(params).await?;
            report.print();
        }

        Commands::Config => {
            let json = serde_json::to_string_pretty(&config)
                .context("Failed to serialize configuration")?;
            println!("{}", json);
        }
    }

    Ok(())
}

/// Log to stderr, filtered by `RUST_LOG` or else the configured directive
fn init_tracing(log_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_filter));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bench_with_overrides() {
        let cli = Cli::try_parse_from([
            "cadenza",
            "--config",
            "custom.toml",
            "bench",
            "--steps",
            "50",
            "--scheduler",
            "tokio",
        ])
        .unwrap();

        assert_eq!(cli.config.as_deref(), Some("custom.toml"));
        let Commands::Bench {
            steps,
            width,
            scheduler,
        } = cli.command
        else {
            unreachable!("Expected the bench command");
        };
        assert_eq!(steps, Some(50));
        assert_eq!(width, None);
        assert_eq!(scheduler, SchedulerKind::Tokio);
    }

    #[test]
    fn test_scheduler_defaults_to_event_loop() {
        let cli = Cli::try_parse_from(["cadenza", "bench"]).unwrap();
        let Commands::Bench { scheduler, .. } = cli.command else {
            unreachable!("Expected the bench command");
        };
        assert_eq!(scheduler, SchedulerKind::EventLoop);
    }

    #[test]
    fn test_global_config_flag_after_subcommand() {
        let cli = Cli::try_parse_from(["cadenza", "config", "--config", "other.toml"]).unwrap();
        assert!(matches!(cli.command, Commands::Config));
        assert_eq!(cli.config.as_deref(), Some("other.toml"));
    }

    #[test]
    fn test_unknown_scheduler_is_rejected() {
        assert!(Cli::try_parse_from(["cadenza", "bench", "--scheduler", "threads"]).is_err());
    }
}
