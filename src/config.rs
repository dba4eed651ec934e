//! Configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `CADENZA_`-prefixed environment variables. The library itself
//! never loads configuration; callers pass a [`Config`] to the runtime builder.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Env var naming the config file (overrides the default search)
pub const CONFIG_PATH_ENV: &str = "CADENZA_CONFIG_PATH";

/// Config file looked up in the working directory when no path is given
const DEFAULT_CONFIG_FILE: &str = "cadenza";

/// What happens to an error when a drive was started without a completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnhandledPolicy {
    /// Panic from a fresh scheduler task
    ///
    /// On an [`EventLoop`](crate::scheduler::EventLoop) the panic unwinds out
    /// of `run`. Under a [`LocalScheduler`](crate::scheduler::LocalScheduler)
    /// it only ends the spawned task: a `LocalSet` swallows task panics unless
    /// built with `unhandled_panic(UnhandledPanic::ShutdownRuntime)` (needs
    /// `tokio_unstable`). Use `Log` or a hook there to see the error.
    #[default]
    Panic,
    /// Log at error level and carry on
    Log,
    /// Drop the error silently
    Ignore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub unhandled: UnhandledPolicy,

    /// `EnvFilter` directive used by the CLI when `RUST_LOG` is unset
    pub log_filter: String,

    pub bench: BenchConfig,
}

/// Defaults for `cadenza bench`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BenchConfig {
    /// Number of suspension points in the synthetic computation
    pub steps: usize,
    /// Members per aggregate step
    pub width: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            unhandled: UnhandledPolicy::default(),
            log_filter: "info".to_string(),
            bench: BenchConfig::default(),
        }
    }
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            steps: 10_000,
            width: 8,
        }
    }
}

impl Config {
    /// Load from `CADENZA_CONFIG_PATH` (or `./cadenza.toml` if present) and the environment
    pub fn load() -> Result<Self> {
        let path = std::env::var(CONFIG_PATH_ENV).ok();
        Self::load_from(path.as_deref())
    }

    /// Load from an explicit file (required if given) and the environment
    pub fn load_from(path: Option<&str>) -> Result<Self> {
        let file = match path {
            Some(path) => config::File::with_name(path).required(true),
            None => config::File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let settings = config::Config::builder()
            .add_source(file)
            .add_source(
                config::Environment::with_prefix("CADENZA")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .context("Failed to read configuration")?;

        settings
            .try_deserialize()
            .context("Failed to parse configuration")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.unhandled, UnhandledPolicy::Panic);
        assert_eq!(config.log_filter, "info");
        assert_eq!(config.bench.steps, 10_000);
        assert_eq!(config.bench.width, 8);
    }

    #[test]
    fn test_load_from_file_fills_missing_fields_with_defaults() {
        let path = std::env::temp_dir().join(format!("cadenza-test-{}.toml", uuid::Uuid::new_v4()));
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "unhandled = \"log\"\n\n[bench]\nsteps = 25").unwrap();

        let config = Config::load_from(path.to_str()).unwrap();
        std::fs::remove_file(&path).unwrap();

        assert_eq!(config.unhandled, UnhandledPolicy::Log);
        assert_eq!(config.bench.steps, 25);
    }

    #[test]
    fn test_environment_overrides() {
        std::env::set_var("CADENZA_BENCH__WIDTH", "3");
        let config = Config::load_from(None);
        std::env::remove_var("CADENZA_BENCH__WIDTH");

        assert_eq!(config.unwrap().bench.width, 3);
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let result = Config::load_from(Some("/nonexistent/cadenza-config"));
        assert!(result.is_err());
    }

    #[test]
    fn test_policy_names() {
        let policy: UnhandledPolicy = serde_json::from_str("\"ignore\"").unwrap();
        assert_eq!(policy, UnhandledPolicy::Ignore);
        assert_eq!(serde_json::to_string(&UnhandledPolicy::Panic).unwrap(), "\"panic\"");
    }
}
