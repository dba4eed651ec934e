/// Cadenza CLI
///
/// Benchmarks the step engine and inspects the resolved configuration.

use cadenza::cli;

#[tokio::main(flavor = "current_thread")]
async fn main() {
    if let Err(e) = cli::run_cli().await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
