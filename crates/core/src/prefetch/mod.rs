//! Discovery/prefetch loop.
//!
//! Each cycle walks every category: resolve the target universe, write its
//! metadata, then fetch live data through the router in small concurrent
//! batches. Refreshes of one category never overlap.

mod model;
mod service;

pub use model::{PrefetchPhase, PrefetchState, RefreshReport};
pub use service::PrefetchService;
