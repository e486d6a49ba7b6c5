use serde::Deserialize;
use std::fmt;

pub const DEFAULT_MARKET_SUFFIX: &str = ".SA";

/// Exchange suffix the quote provider expects on every lookup symbol
/// (B3 / São Paulo is `.SA`). The backend stores tickers without it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MarketSuffix(String);

impl Default for MarketSuffix {
    fn default() -> Self {
        Self(DEFAULT_MARKET_SUFFIX.to_string())
    }
}

impl MarketSuffix {
    /// Returns None unless the suffix looks like `.XX`.
    pub fn new(suffix: &str) -> Option<Self> {
        if suffix.len() > 1 && suffix.starts_with('.') && !suffix.contains(char::is_whitespace) {
            Some(Self(suffix.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn is_suffixed(&self, raw: &str) -> bool {
        let suffix_len = self.0.len();
        raw.len() > suffix_len
            && raw.is_char_boundary(raw.len() - suffix_len)
            && raw[raw.len() - suffix_len..].eq_ignore_ascii_case(&self.0)
    }

    /// Append the suffix unless the ticker already ends with it (any case).
    /// Null-ish input (empty or whitespace) yields None.
    pub fn normalize(&self, raw: &str) -> Option<TickerSymbol> {
        if raw.trim().is_empty() {
            return None;
        }

        if self.is_suffixed(raw) {
            Some(TickerSymbol {
                symbol: raw.to_string(),
                base_len: raw.len() - self.0.len(),
            })
        } else {
            Some(TickerSymbol {
                symbol: format!("{}{}", raw, self.0),
                base_len: raw.len(),
            })
        }
    }
}

/// Provider lookup form of a ticker, e.g. `PETR4.SA`.
///
/// The suffix is present exactly once and [`TickerSymbol::base`] always
/// recovers the backend form by stripping it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickerSymbol {
    symbol: String,
    base_len: usize,
}

impl TickerSymbol {
    /// Symbol sent to the quote provider.
    pub fn as_str(&self) -> &str {
        &self.symbol
    }

    /// Ticker as stored in the backend (suffix stripped).
    pub fn base(&self) -> &str {
        &self.symbol[..self.base_len]
    }

    pub fn suffix(&self) -> &str {
        &self.symbol[self.base_len..]
    }
}

impl fmt::Display for TickerSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.symbol)
    }
}

/// Row returned by the `get_unique_tickers` procedure.
#[derive(Debug, Clone, Deserialize)]
pub struct TickerRow {
    #[serde(default)]
    pub ticker: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_appends_suffix() {
        let suffix = MarketSuffix::default();
        let ticker = suffix.normalize("PETR4").unwrap();

        assert_eq!(ticker.as_str(), "PETR4.SA");
        assert_eq!(ticker.base(), "PETR4");
        assert_eq!(ticker.suffix(), ".SA");
    }

    #[test]
    fn test_normalize_keeps_existing_suffix() {
        let suffix = MarketSuffix::default();

        for raw in ["VALE3.SA", "vale3.sa", "ITUB4.Sa"] {
            let ticker = suffix.normalize(raw).unwrap();
            assert_eq!(ticker.as_str(), raw, "{} should be unchanged", raw);
            assert_eq!(ticker.base().len(), raw.len() - 3);
        }
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let suffix = MarketSuffix::default();

        for raw in ["PETR4", "BBAS3.SA", "MXRF11", "hglg11.sa"] {
            let once = suffix.normalize(raw).unwrap();
            let twice = suffix.normalize(once.as_str()).unwrap();
            assert_eq!(once, twice);
            assert_eq!(once.as_str().to_uppercase().matches(".SA").count(), 1);
        }
    }

    #[test]
    fn test_base_and_symbol_are_mutually_derivable() {
        let suffix = MarketSuffix::default();

        for raw in ["PETR4", "VALE3.SA"] {
            let ticker = suffix.normalize(raw).unwrap();
            let rebuilt = suffix.normalize(ticker.base()).unwrap();
            assert_eq!(rebuilt.base(), ticker.base());
            assert!(rebuilt.as_str().eq_ignore_ascii_case(ticker.as_str()));
        }
    }

    #[test]
    fn test_normalize_rejects_empty() {
        let suffix = MarketSuffix::default();
        assert!(suffix.normalize("").is_none());
        assert!(suffix.normalize("   ").is_none());
    }

    #[test]
    fn test_bare_suffix_is_not_a_ticker_with_suffix() {
        let suffix = MarketSuffix::default();
        let ticker = suffix.normalize(".SA").unwrap();
        assert_eq!(ticker.as_str(), ".SA.SA");
        assert_eq!(ticker.base(), ".SA");
    }

    #[test]
    fn test_custom_suffix() {
        let suffix = MarketSuffix::new(".TO").unwrap();
        assert_eq!(suffix.normalize("SHOP").unwrap().as_str(), "SHOP.TO");
        assert!(MarketSuffix::new("TO").is_none());
        assert!(MarketSuffix::new(".").is_none());
    }
}
