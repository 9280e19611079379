use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Asset category served by the gateway.
///
/// The category decides which capability chain answers a quote request and
/// which live-data TTL applies in the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AssetCategory {
    Stock,
    Etf,
    Crypto,
}

impl AssetCategory {
    /// All categories, in prefetch order.
    pub const ALL: [AssetCategory; 3] = [Self::Stock, Self::Etf, Self::Crypto];

    /// Equities and ETFs share provider chains.
    pub fn is_equity(&self) -> bool {
        matches!(self, Self::Stock | Self::Etf)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Stock => "STOCK",
            Self::Etf => "ETF",
            Self::Crypto => "CRYPTO",
        }
    }
}

impl fmt::Display for AssetCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AssetCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "stock" | "stocks" | "equity" | "equities" => Ok(Self::Stock),
            "etf" | "etfs" => Ok(Self::Etf),
            "crypto" | "cryptocurrency" | "cryptocurrencies" => Ok(Self::Crypto),
            other => Err(format!("Unknown asset category: {}", other)),
        }
    }
}
