//! Market data models
//!
//! This module contains the normalized data types shared by providers,
//! the registry and the gateway cache:
//! - `types` - Provider identifier alias and symbol normalization
//! - `asset` - Asset categories (stock, ETF, crypto)
//! - `quote` - Normalized live quote (LiveQuote)
//! - `metadata` - Descriptive asset data (AssetMetadata)

mod asset;
mod metadata;
mod quote;
mod types;

pub use asset::AssetCategory;
pub use metadata::AssetMetadata;
pub use quote::LiveQuote;
pub use types::{normalize_symbol, ProviderId};
