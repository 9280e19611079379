//! Provider orchestration.
//!
//! This module sits between callers and the provider adapters:
//! - Sliding-window rate tracking and adaptive throttling per provider
//! - Priority queueing of requests that cannot be admitted yet
//! - Capability chains with fallback across interchangeable providers
//! - Live quote validation

mod rate_tracker;
mod router;
mod scheduler;
mod skip_reason;
mod validator;

pub use rate_tracker::{AttemptOutcome, RateSnapshot, RateTracker};
pub use router::{provider_score, FallbackRouter, RouteOutcome, RoutingMode};
pub use scheduler::{priority_score, PendingQueue, QueueItem, RequestScheduler, SchedulerConfig};
pub use skip_reason::{FetchDiagnostics, ProviderAttempt, SkipReason};
pub use validator::{QuoteValidator, ValidationSeverity, ValidatorConfig};
