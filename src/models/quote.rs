use chrono::{DateTime, FixedOffset};

/// Point-in-time metadata for one instrument.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuoteInfo {
    pub long_name: Option<String>,
    pub sector: Option<String>,
    pub current_price: Option<f64>,
    pub previous_close: Option<f64>,
    /// Dividend yield as a fraction (0.085 == 8.5%)
    pub dividend_yield: Option<f64>,
    pub trailing_peg_ratio: Option<f64>,
}

/// Daily close as returned by the provider.
#[derive(Debug, Clone, PartialEq)]
pub struct PricePoint {
    pub date: DateTime<FixedOffset>,
    pub close: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DividendPoint {
    pub date: DateTime<FixedOffset>,
    pub amount: f64,
}
