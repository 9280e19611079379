//! Periodic diagnostics log line.

use std::sync::Arc;
use std::time::Duration;

use tickerhub_core::Gateway;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Log a diagnostics summary every `period` until `cancel` fires.
pub async fn run_diagnostics_reporter(
    gateway: Arc<Gateway>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // Nothing worth reporting at startup
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = ticker.tick() => report(&gateway),
        }
    }
}

fn report(gateway: &Gateway) {
    let diagnostics = gateway.facade().get_diagnostics();
    let throttled: Vec<&str> = diagnostics
        .providers
        .iter()
        .filter(|p| p.rate.as_ref().is_some_and(|r| r.throttled))
        .map(|p| p.id.as_str())
        .collect();
    let queued: usize = diagnostics.providers.iter().map(|p| p.queue_len).sum();

    info!(
        "Diagnostics: {} providers ({} throttled: [{}]), {} queued, cache {}/{} metadata {}/{} live, {} evictions",
        diagnostics.providers.len(),
        throttled.len(),
        throttled.join(", "),
        queued,
        diagnostics.cache.metadata_entries,
        diagnostics.cache.metadata_capacity,
        diagnostics.cache.live_entries,
        diagnostics.cache.live_capacity,
        diagnostics.cache.evictions,
    );

    match serde_json::to_string(&diagnostics) {
        Ok(json) => tracing::debug!(target: "tickerhub::diagnostics", "{}", json),
        Err(e) => warn!("Failed to serialize diagnostics: {}", e),
    }
}
