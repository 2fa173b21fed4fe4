use anyhow::Result;
use clap::Parser;

use drop_warden::cli::{run, Cli};
use drop_warden::config;
use drop_warden::telemetry::init_telemetry;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = config::config()?;
    init_telemetry(
        &config.observability.log_level,
        config.observability.json_logs,
    )?;

    run(cli).await
}
