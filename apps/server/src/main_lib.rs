use std::sync::Arc;

use tickerhub_core::{build_providers, Gateway};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::Config;

pub fn init_tracing() {
    let log_format =
        std::env::var("TICKERHUB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if log_format.eq_ignore_ascii_case("json") {
        registry
            .with(fmt::layer().json().with_current_span(false))
            .init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    }
}

pub fn build_gateway(config: &Config) -> anyhow::Result<Arc<Gateway>> {
    let provider_set = build_providers(&config.credentials);
    for warning in &provider_set.warnings {
        tracing::warn!("Startup: {}", warning);
    }
    if provider_set.providers.is_empty() {
        anyhow::bail!("no market data provider could be constructed");
    }

    let gateway = Gateway::new(config.gateway.clone(), provider_set.providers)?;
    Ok(Arc::new(gateway))
}
