//! Built-in lists of well-known assets.

use chrono::{DateTime, Utc};
use tickerhub_market_data::{normalize_symbol, AssetCategory, AssetMetadata};

/// (symbol, name, sector, industry, exchange)
const STOCKS: &[(&str, &str, &str, &str, &str)] = &[
    ("AAPL", "Apple Inc.", "Technology", "Consumer Electronics", "NASDAQ"),
    ("MSFT", "Microsoft Corporation", "Technology", "Software", "NASDAQ"),
    ("NVDA", "NVIDIA Corporation", "Technology", "Semiconductors", "NASDAQ"),
    ("AMZN", "Amazon.com Inc.", "Consumer Cyclical", "Internet Retail", "NASDAQ"),
    ("GOOGL", "Alphabet Inc.", "Communication Services", "Internet Content", "NASDAQ"),
    ("META", "Meta Platforms Inc.", "Communication Services", "Internet Content", "NASDAQ"),
    ("BRK.B", "Berkshire Hathaway Inc.", "Financial Services", "Insurance", "NYSE"),
    ("TSLA", "Tesla Inc.", "Consumer Cyclical", "Auto Manufacturers", "NASDAQ"),
    ("AVGO", "Broadcom Inc.", "Technology", "Semiconductors", "NASDAQ"),
    ("JPM", "JPMorgan Chase & Co.", "Financial Services", "Banks", "NYSE"),
    ("LLY", "Eli Lilly and Company", "Healthcare", "Drug Manufacturers", "NYSE"),
    ("V", "Visa Inc.", "Financial Services", "Credit Services", "NYSE"),
    ("UNH", "UnitedHealth Group Inc.", "Healthcare", "Healthcare Plans", "NYSE"),
    ("XOM", "Exxon Mobil Corporation", "Energy", "Oil & Gas Integrated", "NYSE"),
    ("MA", "Mastercard Inc.", "Financial Services", "Credit Services", "NYSE"),
    ("JNJ", "Johnson & Johnson", "Healthcare", "Drug Manufacturers", "NYSE"),
    ("PG", "Procter & Gamble Co.", "Consumer Defensive", "Household Products", "NYSE"),
    ("HD", "The Home Depot Inc.", "Consumer Cyclical", "Home Improvement Retail", "NYSE"),
    ("COST", "Costco Wholesale Corporation", "Consumer Defensive", "Discount Stores", "NASDAQ"),
    ("MRK", "Merck & Co. Inc.", "Healthcare", "Drug Manufacturers", "NYSE"),
    ("ABBV", "AbbVie Inc.", "Healthcare", "Drug Manufacturers", "NYSE"),
    ("CVX", "Chevron Corporation", "Energy", "Oil & Gas Integrated", "NYSE"),
    ("ORCL", "Oracle Corporation", "Technology", "Software", "NYSE"),
    ("KO", "The Coca-Cola Company", "Consumer Defensive", "Beverages", "NYSE"),
    ("PEP", "PepsiCo Inc.", "Consumer Defensive", "Beverages", "NASDAQ"),
    ("BAC", "Bank of America Corporation", "Financial Services", "Banks", "NYSE"),
    ("ADBE", "Adobe Inc.", "Technology", "Software", "NASDAQ"),
    ("CRM", "Salesforce Inc.", "Technology", "Software", "NYSE"),
    ("NFLX", "Netflix Inc.", "Communication Services", "Entertainment", "NASDAQ"),
    ("AMD", "Advanced Micro Devices Inc.", "Technology", "Semiconductors", "NASDAQ"),
    ("WMT", "Walmart Inc.", "Consumer Defensive", "Discount Stores", "NYSE"),
    ("TMO", "Thermo Fisher Scientific Inc.", "Healthcare", "Diagnostics & Research", "NYSE"),
    ("MCD", "McDonald's Corporation", "Consumer Cyclical", "Restaurants", "NYSE"),
    ("CSCO", "Cisco Systems Inc.", "Technology", "Communication Equipment", "NASDAQ"),
    ("ACN", "Accenture plc", "Technology", "IT Services", "NYSE"),
    ("ABT", "Abbott Laboratories", "Healthcare", "Medical Devices", "NYSE"),
    ("LIN", "Linde plc", "Basic Materials", "Specialty Chemicals", "NASDAQ"),
    ("DIS", "The Walt Disney Company", "Communication Services", "Entertainment", "NYSE"),
    ("INTC", "Intel Corporation", "Technology", "Semiconductors", "NASDAQ"),
    ("WFC", "Wells Fargo & Company", "Financial Services", "Banks", "NYSE"),
    ("VZ", "Verizon Communications Inc.", "Communication Services", "Telecom Services", "NYSE"),
    ("QCOM", "QUALCOMM Inc.", "Technology", "Semiconductors", "NASDAQ"),
    ("TXN", "Texas Instruments Inc.", "Technology", "Semiconductors", "NASDAQ"),
    ("IBM", "International Business Machines", "Technology", "IT Services", "NYSE"),
    ("PFE", "Pfizer Inc.", "Healthcare", "Drug Manufacturers", "NYSE"),
    ("NKE", "NIKE Inc.", "Consumer Cyclical", "Footwear & Accessories", "NYSE"),
    ("CAT", "Caterpillar Inc.", "Industrials", "Farm & Heavy Machinery", "NYSE"),
    ("GS", "The Goldman Sachs Group Inc.", "Financial Services", "Capital Markets", "NYSE"),
    ("BA", "The Boeing Company", "Industrials", "Aerospace & Defense", "NYSE"),
    ("UBER", "Uber Technologies Inc.", "Technology", "Software", "NYSE"),
];

/// (symbol, name, exchange)
const ETFS: &[(&str, &str, &str)] = &[
    ("SPY", "SPDR S&P 500 ETF Trust", "NYSE ARCA"),
    ("IVV", "iShares Core S&P 500 ETF", "NYSE ARCA"),
    ("VOO", "Vanguard S&P 500 ETF", "NYSE ARCA"),
    ("VTI", "Vanguard Total Stock Market ETF", "NYSE ARCA"),
    ("QQQ", "Invesco QQQ Trust", "NASDAQ"),
    ("VEA", "Vanguard FTSE Developed Markets ETF", "NYSE ARCA"),
    ("VUG", "Vanguard Growth ETF", "NYSE ARCA"),
    ("IEFA", "iShares Core MSCI EAFE ETF", "BATS"),
    ("VTV", "Vanguard Value ETF", "NYSE ARCA"),
    ("BND", "Vanguard Total Bond Market ETF", "NASDAQ"),
    ("AGG", "iShares Core U.S. Aggregate Bond ETF", "NYSE ARCA"),
    ("IWF", "iShares Russell 1000 Growth ETF", "NYSE ARCA"),
    ("IJH", "iShares Core S&P Mid-Cap ETF", "NYSE ARCA"),
    ("IEMG", "iShares Core MSCI Emerging Markets ETF", "NYSE ARCA"),
    ("VIG", "Vanguard Dividend Appreciation ETF", "NYSE ARCA"),
    ("IJR", "iShares Core S&P Small-Cap ETF", "NYSE ARCA"),
    ("VWO", "Vanguard FTSE Emerging Markets ETF", "NYSE ARCA"),
    ("GLD", "SPDR Gold Shares", "NYSE ARCA"),
    ("VGT", "Vanguard Information Technology ETF", "NYSE ARCA"),
    ("XLK", "Technology Select Sector SPDR Fund", "NYSE ARCA"),
    ("IWM", "iShares Russell 2000 ETF", "NYSE ARCA"),
    ("VXUS", "Vanguard Total International Stock ETF", "NASDAQ"),
    ("SCHD", "Schwab U.S. Dividend Equity ETF", "NYSE ARCA"),
    ("VO", "Vanguard Mid-Cap ETF", "NYSE ARCA"),
    ("XLF", "Financial Select Sector SPDR Fund", "NYSE ARCA"),
    ("TLT", "iShares 20+ Year Treasury Bond ETF", "NASDAQ"),
    ("XLE", "Energy Select Sector SPDR Fund", "NYSE ARCA"),
    ("DIA", "SPDR Dow Jones Industrial Average ETF", "NYSE ARCA"),
    ("VNQ", "Vanguard Real Estate ETF", "NYSE ARCA"),
    ("ARKK", "ARK Innovation ETF", "NYSE ARCA"),
];

/// (symbol, name)
const CRYPTOS: &[(&str, &str)] = &[
    ("BTC", "Bitcoin"),
    ("ETH", "Ethereum"),
    ("USDT", "Tether"),
    ("BNB", "BNB"),
    ("SOL", "Solana"),
    ("XRP", "XRP"),
    ("USDC", "USD Coin"),
    ("ADA", "Cardano"),
    ("DOGE", "Dogecoin"),
    ("TRX", "TRON"),
    ("AVAX", "Avalanche"),
    ("DOT", "Polkadot"),
    ("LINK", "Chainlink"),
    ("TON", "Toncoin"),
    ("MATIC", "Polygon"),
    ("SHIB", "Shiba Inu"),
    ("LTC", "Litecoin"),
    ("BCH", "Bitcoin Cash"),
    ("UNI", "Uniswap"),
    ("ATOM", "Cosmos"),
    ("XLM", "Stellar"),
    ("ETC", "Ethereum Classic"),
    ("XMR", "Monero"),
    ("NEAR", "NEAR Protocol"),
    ("ICP", "Internet Computer"),
    ("APT", "Aptos"),
    ("FIL", "Filecoin"),
    ("HBAR", "Hedera"),
    ("ARB", "Arbitrum"),
    ("VET", "VeChain"),
    ("OP", "Optimism"),
    ("MKR", "Maker"),
    ("CRO", "Cronos"),
    ("AAVE", "Aave"),
    ("GRT", "The Graph"),
    ("ALGO", "Algorand"),
    ("INJ", "Injective"),
    ("STX", "Stacks"),
    ("SUI", "Sui"),
    ("IMX", "Immutable"),
    ("RNDR", "Render"),
    ("EGLD", "MultiversX"),
    ("SAND", "The Sandbox"),
    ("MANA", "Decentraland"),
    ("THETA", "Theta Network"),
    ("AXS", "Axie Infinity"),
    ("XTZ", "Tezos"),
    ("EOS", "EOS"),
    ("FTM", "Fantom"),
    ("KAS", "Kaspa"),
];

/// Static fallback universe, ordered roughly by size.
#[derive(Clone, Copy, Debug, Default)]
pub struct StaticCatalog;

impl StaticCatalog {
    pub fn new() -> Self {
        Self
    }

    /// First `limit` assets of a category.
    pub fn list(&self, category: AssetCategory, limit: usize, now: DateTime<Utc>) -> Vec<AssetMetadata> {
        match category {
            AssetCategory::Stock => STOCKS
                .iter()
                .take(limit)
                .map(|entry| stock(entry, now))
                .collect(),
            AssetCategory::Etf => ETFS.iter().take(limit).map(|entry| etf(entry, now)).collect(),
            AssetCategory::Crypto => CRYPTOS
                .iter()
                .take(limit)
                .map(|entry| crypto(entry, now))
                .collect(),
        }
    }

    /// Look a symbol up across every category.
    pub fn lookup(&self, symbol: &str, now: DateTime<Utc>) -> Option<AssetMetadata> {
        let symbol = normalize_symbol(symbol);
        STOCKS
            .iter()
            .find(|entry| entry.0 == symbol)
            .map(|entry| stock(entry, now))
            .or_else(|| ETFS.iter().find(|entry| entry.0 == symbol).map(|entry| etf(entry, now)))
            .or_else(|| {
                CRYPTOS
                    .iter()
                    .find(|entry| entry.0 == symbol)
                    .map(|entry| crypto(entry, now))
            })
    }

    pub fn len(&self, category: AssetCategory) -> usize {
        match category {
            AssetCategory::Stock => STOCKS.len(),
            AssetCategory::Etf => ETFS.len(),
            AssetCategory::Crypto => CRYPTOS.len(),
        }
    }
}

fn stock(entry: &(&str, &str, &str, &str, &str), now: DateTime<Utc>) -> AssetMetadata {
    let (symbol, name, sector, industry, exchange) = *entry;
    let mut metadata = AssetMetadata::new(symbol, name, AssetCategory::Stock, now);
    metadata.sector = Some(sector.to_string());
    metadata.industry = Some(industry.to_string());
    metadata.exchange = Some(exchange.to_string());
    metadata.country = Some("United States".to_string());
    metadata
}

fn etf(entry: &(&str, &str, &str), now: DateTime<Utc>) -> AssetMetadata {
    let (symbol, name, exchange) = *entry;
    let mut metadata = AssetMetadata::new(symbol, name, AssetCategory::Etf, now);
    metadata.exchange = Some(exchange.to_string());
    metadata
}

fn crypto(entry: &(&str, &str), now: DateTime<Utc>) -> AssetMetadata {
    let (symbol, name) = *entry;
    AssetMetadata::new(symbol, name, AssetCategory::Crypto, now)
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn test_catalog_covers_default_universes() {
        let catalog = StaticCatalog::new();
        assert_eq!(catalog.len(AssetCategory::Stock), 50);
        assert_eq!(catalog.len(AssetCategory::Etf), 30);
        assert_eq!(catalog.len(AssetCategory::Crypto), 50);
    }

    #[test]
    fn test_symbols_unique_across_categories() {
        let mut seen = HashSet::new();
        let now = Utc::now();
        for category in AssetCategory::ALL {
            for metadata in StaticCatalog.list(category, usize::MAX, now) {
                assert!(seen.insert(metadata.symbol.clone()), "duplicate {}", metadata.symbol);
                assert_eq!(metadata.category, category);
            }
        }
    }

    #[test]
    fn test_list_respects_limit() {
        let listed = StaticCatalog.list(AssetCategory::Crypto, 3, Utc::now());
        let symbols: Vec<&str> = listed.iter().map(|m| m.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["BTC", "ETH", "USDT"]);
    }

    #[test]
    fn test_lookup() {
        let now = Utc::now();
        let aapl = StaticCatalog.lookup("aapl", now).unwrap();
        assert_eq!(aapl.category, AssetCategory::Stock);
        assert_eq!(aapl.sector.as_deref(), Some("Technology"));

        assert_eq!(StaticCatalog.lookup("QQQ", now).unwrap().category, AssetCategory::Etf);
        assert_eq!(StaticCatalog.lookup("SOL", now).unwrap().display_name, "Solana");
        assert!(StaticCatalog.lookup("ZZZ", now).is_none());
    }
}
