//! Capability-based fallback routing.
//!
//! The router owns the registered providers and one ordered chain per
//! [`Capability`]. A request walks its chain through the scheduler until a
//! provider succeeds:
//! - denial (queue full, stopped) and provider errors advance to the next provider
//! - live quotes are validated; an invalid quote counts as that provider's failure
//! - when every provider fails the result is [`RouteOutcome::CapabilityExhausted`],
//!   never an error
//!
//! Chains default to declared capabilities ordered by priority class (high
//! first) then registration order. `RoutingMode::BestAvailable` re-ranks a
//! chain per request using live rate-tracker data.

use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use super::rate_tracker::RateSnapshot;
use super::scheduler::RequestScheduler;
use super::skip_reason::{FetchDiagnostics, SkipReason};
use super::validator::QuoteValidator;
use crate::clock::SharedClock;
use crate::errors::MarketDataError;
use crate::models::{AssetCategory, AssetMetadata, LiveQuote, ProviderId};
use crate::provider::{Capability, MarketDataProvider, PriorityClass};

/// Idle time after which a provider gets the full idle bonus.
const IDLE_SATURATION_SECS: f64 = 60.0;

/// How a chain is ordered for each request.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingMode {
    /// Walk the chain as configured.
    #[default]
    Ordered,
    /// Re-rank the chain by score before walking it.
    BestAvailable,
}

/// Result of routing one request.
#[derive(Debug)]
pub enum RouteOutcome<T> {
    Resolved {
        value: T,
        provider: ProviderId,
        diagnostics: FetchDiagnostics,
    },
    /// Every provider in the chain failed or was skipped.
    CapabilityExhausted {
        capability: Capability,
        diagnostics: FetchDiagnostics,
    },
}

impl<T> RouteOutcome<T> {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }

    pub fn value(self) -> Option<T> {
        match self {
            Self::Resolved { value, .. } => Some(value),
            Self::CapabilityExhausted { .. } => None,
        }
    }

    pub fn diagnostics(&self) -> &FetchDiagnostics {
        match self {
            Self::Resolved { diagnostics, .. } | Self::CapabilityExhausted { diagnostics, .. } => {
                diagnostics
            }
        }
    }
}

/// Best-available score for one provider.
///
/// `priority_class x 100 + (1 - utilization) x 50 + min(idle, 60s)/60s x 25
/// + chain match x 25`, where the chain match is 1.0 for the head of the
/// configured chain and falls off linearly with position.
pub fn provider_score(
    priority: PriorityClass,
    snapshot: Option<&RateSnapshot>,
    position: usize,
    chain_len: usize,
) -> f64 {
    let utilization = snapshot.map(|s| s.utilization).unwrap_or(0.0);
    let idle_secs = snapshot
        .and_then(|s| s.idle_for)
        .map(|idle| idle.as_secs_f64())
        .unwrap_or(IDLE_SATURATION_SECS);
    let chain_match = if chain_len == 0 {
        0.0
    } else {
        (chain_len - position.min(chain_len)) as f64 / chain_len as f64
    };

    f64::from(priority.weight()) * 100.0
        + (1.0 - utilization) * 50.0
        + idle_secs.min(IDLE_SATURATION_SECS) / IDLE_SATURATION_SECS * 25.0
        + chain_match * 25.0
}

/// Routes capability requests across interchangeable providers.
pub struct FallbackRouter {
    /// Registration order.
    providers: Vec<Arc<dyn MarketDataProvider>>,
    by_id: HashMap<String, Arc<dyn MarketDataProvider>>,
    chains: HashMap<Capability, Vec<ProviderId>>,
    scheduler: RequestScheduler,
    validator: QuoteValidator,
    clock: SharedClock,
    mode: RoutingMode,
}

impl FallbackRouter {
    /// Register providers with the scheduler's rate tracker and derive the
    /// default chain for every capability.
    pub fn new(
        providers: Vec<Arc<dyn MarketDataProvider>>,
        scheduler: RequestScheduler,
        clock: SharedClock,
    ) -> Self {
        let mut registered: Vec<Arc<dyn MarketDataProvider>> = Vec::with_capacity(providers.len());
        let mut by_id = HashMap::new();

        for provider in providers {
            if by_id.contains_key(provider.id()) {
                warn!("Provider '{}' registered twice, keeping the first", provider.id());
                continue;
            }
            scheduler.tracker().register(provider.config().clone());
            by_id.insert(provider.id().to_string(), provider.clone());
            registered.push(provider);
        }

        let chains = Capability::ALL
            .iter()
            .map(|cap| (*cap, default_chain(&registered, |p| p.capabilities().supports(*cap))))
            .collect();

        let router = Self {
            providers: registered,
            by_id,
            chains,
            scheduler,
            validator: QuoteValidator::new(),
            clock,
            mode: RoutingMode::Ordered,
        };

        for cap in Capability::ALL {
            info!(
                "Fallback chain for {}: [{}]",
                cap,
                router.chain(cap).join(", ")
            );
        }
        router
    }

    /// Replace a capability's chain.
    pub fn with_chain<I, S>(mut self, capability: Capability, chain: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ProviderId>,
    {
        self.chains
            .insert(capability, chain.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_mode(mut self, mode: RoutingMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_validator(mut self, validator: QuoteValidator) -> Self {
        self.validator = validator;
        self
    }

    pub fn mode(&self) -> RoutingMode {
        self.mode
    }

    pub fn providers(&self) -> &[Arc<dyn MarketDataProvider>] {
        &self.providers
    }

    pub fn provider(&self, id: &str) -> Option<&Arc<dyn MarketDataProvider>> {
        self.by_id.get(id)
    }

    pub fn scheduler(&self) -> &RequestScheduler {
        &self.scheduler
    }

    /// Configured chain for a capability.
    pub fn chain(&self, capability: Capability) -> Vec<ProviderId> {
        self.chains.get(&capability).cloned().unwrap_or_default()
    }

    /// Chain in the order the current mode will try it.
    pub fn ordered_chain(&self, capability: Capability) -> Vec<ProviderId> {
        match self.mode {
            RoutingMode::Ordered => self.chain(capability),
            RoutingMode::BestAvailable => self.rank(capability),
        }
    }

    /// Highest-scored provider for a capability, if any.
    pub fn best_available(&self, capability: Capability) -> Option<ProviderId> {
        self.rank(capability).into_iter().next()
    }

    /// Chain sorted by score, ties to the least recently used provider.
    fn rank(&self, capability: Capability) -> Vec<ProviderId> {
        let chain = self.chain(capability);
        let tracker = self.scheduler.tracker();

        let mut scored: Vec<(ProviderId, f64, Option<chrono::DateTime<chrono::Utc>>)> = chain
            .iter()
            .enumerate()
            .filter_map(|(position, id)| {
                let provider = self.by_id.get(id.as_ref())?;
                let snapshot = tracker.snapshot(id);
                let mut score = provider_score(
                    provider.config().priority_class,
                    snapshot.as_ref(),
                    position,
                    chain.len(),
                );
                if !provider.capabilities().supports(capability) {
                    score = 0.0;
                }
                Some((id.clone(), score, snapshot.and_then(|s| s.last_request_at)))
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(Ordering::Equal)
                // None (never used) sorts before any timestamp
                .then_with(|| a.2.cmp(&b.2))
        });

        scored.into_iter().map(|(id, _, _)| id).collect()
    }

    /// Walk the capability's chain until `work` succeeds on a provider.
    pub async fn resolve<T, F, Fut>(
        &self,
        capability: Capability,
        priority: PriorityClass,
        work: F,
    ) -> RouteOutcome<T>
    where
        F: Fn(Arc<dyn MarketDataProvider>) -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let chain = self.ordered_chain(capability);
        self.walk(capability, chain, priority, true, work).await
    }

    async fn walk<T, F, Fut>(
        &self,
        capability: Capability,
        chain: Vec<ProviderId>,
        priority: PriorityClass,
        require_capability: bool,
        work: F,
    ) -> RouteOutcome<T>
    where
        F: Fn(Arc<dyn MarketDataProvider>) -> Fut,
        Fut: Future<Output = Result<T, MarketDataError>>,
    {
        let mut diagnostics = FetchDiagnostics::new();

        for id in chain {
            let Some(provider) = self.by_id.get(id.as_ref()).cloned() else {
                diagnostics.record_skip(id, SkipReason::NotRegistered);
                continue;
            };

            if require_capability && !provider.capabilities().supports(capability) {
                diagnostics.record_skip(id, SkipReason::CapabilityNotDeclared);
                continue;
            }

            let result = self
                .scheduler
                .schedule(provider.id(), priority, || work(provider.clone()))
                .await;

            match result {
                Ok(value) => {
                    diagnostics.record_success(id.clone());
                    return RouteOutcome::Resolved {
                        value,
                        provider: id,
                        diagnostics,
                    };
                }
                Err(MarketDataError::ProviderDenied { reason, .. }) => {
                    debug!("{} via '{}' denied ({}), trying next", capability, id, reason);
                    diagnostics.record_skip(id, SkipReason::Denied { reason });
                }
                Err(e) => {
                    debug!("{} via '{}' failed ({}), trying next", capability, id, e);
                    diagnostics.record_error(id, e.to_string());
                }
            }
        }

        warn!(
            "Capability exhausted: {} [{}]",
            capability,
            diagnostics.summary()
        );
        RouteOutcome::CapabilityExhausted {
            capability,
            diagnostics,
        }
    }

    /// Fetch and validate a live quote.
    pub async fn fetch_quote(
        &self,
        symbol: &str,
        category: AssetCategory,
        priority: PriorityClass,
    ) -> RouteOutcome<LiveQuote> {
        let capability = Capability::quote_for(category);
        self.resolve(capability, priority, |provider| {
            let symbol = symbol.to_string();
            let validator = self.validator.clone();
            let clock = self.clock.clone();
            async move {
                let quote = provider.get_quote(&symbol, category).await?;
                validator.validate(&quote, clock.now())?;
                Ok(quote)
            }
        })
        .await
    }

    /// Fetch descriptive metadata.
    pub async fn fetch_profile(
        &self,
        symbol: &str,
        category: AssetCategory,
        priority: PriorityClass,
    ) -> RouteOutcome<AssetMetadata> {
        let capability = Capability::profile_for(category);
        self.resolve(capability, priority, |provider| {
            let symbol = symbol.to_string();
            async move { provider.get_profile(&symbol, category).await }
        })
        .await
    }

    /// Ask discovery-capable providers for a category's top assets.
    ///
    /// Reported under the category's profile capability. An empty listing
    /// counts as exhaustion so callers fall back to their own catalog.
    pub async fn discover(
        &self,
        category: AssetCategory,
        limit: usize,
    ) -> RouteOutcome<Vec<AssetMetadata>> {
        let capability = Capability::profile_for(category);
        let chain = default_chain(&self.providers, |p| p.capabilities().supports_discovery);

        let outcome = self
            .walk(capability, chain, PriorityClass::Low, false, |provider| async move {
                provider.discover(category, limit).await
            })
            .await;

        match outcome {
            RouteOutcome::Resolved {
                value,
                provider,
                diagnostics,
            } if value.is_empty() => {
                debug!("Discovery via '{}' returned nothing for {}", provider, category);
                RouteOutcome::CapabilityExhausted {
                    capability,
                    diagnostics,
                }
            }
            other => other,
        }
    }
}

/// Providers matching `filter`, high priority class first, registration order within a class.
fn default_chain<P>(providers: &[Arc<dyn MarketDataProvider>], filter: P) -> Vec<ProviderId>
where
    P: Fn(&Arc<dyn MarketDataProvider>) -> bool,
{
    let mut matching: Vec<(usize, &Arc<dyn MarketDataProvider>)> = providers
        .iter()
        .enumerate()
        .filter(|(_, p)| filter(p))
        .collect();
    // Stable sort keeps registration order within a class
    matching.sort_by(|a, b| b.1.config().priority_class.cmp(&a.1.config().priority_class));
    matching
        .into_iter()
        .map(|(_, p)| Cow::Borrowed(p.id()))
        .collect()
}
