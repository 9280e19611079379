use std::borrow::Cow;

/// Provider identifier - mostly static constants ("FINNHUB", "YAHOO", ...)
pub type ProviderId = Cow<'static, str>;

/// Normalize a ticker for use as a map key.
pub fn normalize_symbol(symbol: &str) -> String {
    symbol.trim().to_ascii_uppercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_symbol() {
        assert_eq!(normalize_symbol(" aapl "), "AAPL");
        assert_eq!(normalize_symbol("btc"), "BTC");
        assert_eq!(normalize_symbol("BRK.B"), "BRK.B");
    }
}
