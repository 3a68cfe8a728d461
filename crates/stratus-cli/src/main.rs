//! Stratus - command-line client for cloud services

use clap::Parser;
use stratus_cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    stratus_cli::init_tracing(cli.debug);

    tracing::debug!(command = ?cli.command, "starting");
    let output = stratus_cli::run(cli).await?;
    print!("{output}");
    Ok(())
}
