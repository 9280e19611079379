use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::asset::AssetCategory;

/// Descriptive data for an asset (name, classification, listing).
///
/// Changes rarely, so the cache keeps it for hours while live quotes
/// expire within seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMetadata {
    pub symbol: String,

    /// Human readable name (e.g., "Apple Inc", "Bitcoin")
    pub display_name: String,

    pub category: AssetCategory,

    /// Business sector (e.g., "Technology")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sector: Option<String>,

    /// Industry within sector (e.g., "Consumer Electronics")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub industry: Option<String>,

    /// Listing exchange (e.g., "NASDAQ")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exchange: Option<String>,

    /// Country of domicile
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,

    pub last_updated: DateTime<Utc>,
}

impl AssetMetadata {
    /// Create metadata with only the identifying fields.
    pub fn new(
        symbol: impl Into<String>,
        display_name: impl Into<String>,
        category: AssetCategory,
        last_updated: DateTime<Utc>,
    ) -> Self {
        Self {
            symbol: symbol.into(),
            display_name: display_name.into(),
            category,
            sector: None,
            industry: None,
            exchange: None,
            country: None,
            last_updated,
        }
    }

    /// Fill empty fields from another record for the same symbol.
    ///
    /// Used when a provider profile only partially covers what the catalog knows.
    pub fn merge_missing(mut self, other: &AssetMetadata) -> Self {
        if self.display_name.is_empty() {
            self.display_name = other.display_name.clone();
        }
        self.sector = self.sector.or_else(|| other.sector.clone());
        self.industry = self.industry.or_else(|| other.industry.clone());
        self.exchange = self.exchange.or_else(|| other.exchange.clone());
        self.country = self.country.or_else(|| other.country.clone());
        self
    }
}
