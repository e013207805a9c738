//! Netscript Agent Binary Entry Point

use clap::Parser;
use script_agent::{load_config, logging::init_logging, run_agent, Args};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let config = load_config(&args)?;

    let _log_guard = init_logging(&config.logging)?;

    if let Err(e) = run_agent(args, config).await {
        tracing::error!("Agent failed: {:#}", e);
        return Err(e);
    }

    Ok(())
}
