use anyhow::Result;
use apkeep::cli::{run, Cli};
use clap::Parser;
use tracing::Level;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::DEBUG } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();
    tracing::info!("CLI arguments parsed, invoking run");

    let result = run(cli).await;
    match &result {
        Ok(report) => tracing::info!(
            added = report.added,
            skipped = report.skipped,
            "CLI completed successfully"
        ),
        Err(e) => tracing::error!(error = %e, "CLI exited with error"),
    }
    result.map(|_| ())
}
