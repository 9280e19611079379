//! Provider capabilities.
//!
//! A capability is a logical data need ("equity quote", "crypto quote") that one or
//! more interchangeable providers can serve. The router builds one fallback chain per
//! capability from what each provider declares here.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::models::AssetCategory;

/// Logical data need served by an ordered provider chain.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Capability {
    EquityQuote,
    CryptoQuote,
    EquityProfile,
    CryptoProfile,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Self::EquityQuote,
        Self::CryptoQuote,
        Self::EquityProfile,
        Self::CryptoProfile,
    ];

    /// Capability answering live quotes for a category.
    pub fn quote_for(category: AssetCategory) -> Self {
        if category.is_equity() {
            Self::EquityQuote
        } else {
            Self::CryptoQuote
        }
    }

    /// Capability answering metadata/profile lookups for a category.
    pub fn profile_for(category: AssetCategory) -> Self {
        if category.is_equity() {
            Self::EquityProfile
        } else {
            Self::CryptoProfile
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::EquityQuote => "equity quote",
            Self::CryptoQuote => "crypto quote",
            Self::EquityProfile => "equity profile",
            Self::CryptoProfile => "crypto profile",
        };
        f.write_str(name)
    }
}

/// Describes what a market data provider can do.
#[derive(Clone, Debug)]
pub struct ProviderCapabilities {
    /// Capabilities this provider can serve.
    pub capabilities: &'static [Capability],

    /// Whether the provider can list a category's top assets.
    pub supports_discovery: bool,
}

impl ProviderCapabilities {
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_capability_for_category() {
        assert_eq!(Capability::quote_for(AssetCategory::Stock), Capability::EquityQuote);
        assert_eq!(Capability::quote_for(AssetCategory::Etf), Capability::EquityQuote);
        assert_eq!(Capability::quote_for(AssetCategory::Crypto), Capability::CryptoQuote);
    }

    #[test]
    fn test_profile_capability_for_category() {
        assert_eq!(Capability::profile_for(AssetCategory::Etf), Capability::EquityProfile);
        assert_eq!(Capability::profile_for(AssetCategory::Crypto), Capability::CryptoProfile);
    }

    #[test]
    fn test_supports() {
        let caps = ProviderCapabilities {
            capabilities: &[Capability::EquityQuote],
            supports_discovery: false,
        };
        assert!(caps.supports(Capability::EquityQuote));
        assert!(!caps.supports(Capability::CryptoQuote));
    }
}
