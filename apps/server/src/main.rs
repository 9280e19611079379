mod config;
mod diagnostics;
mod main_lib;

use config::Config;
use diagnostics::run_diagnostics_reporter;
use main_lib::{build_gateway, init_tracing};
use tokio_util::sync::CancellationToken;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();
    let config = Config::from_env();
    let gateway = build_gateway(&config)?;

    gateway.start();

    let cancel = CancellationToken::new();
    let reporter = tokio::spawn(run_diagnostics_reporter(
        gateway.clone(),
        config.diagnostics_interval,
        cancel.clone(),
    ));

    tracing::info!("TickerHub running, press Ctrl+C to stop");
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    cancel.cancel();
    if let Err(e) = reporter.await {
        tracing::warn!("Diagnostics reporter ended abnormally: {}", e);
    }
    gateway.shutdown().await;
    Ok(())
}
