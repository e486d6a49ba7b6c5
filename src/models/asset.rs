use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceHistoryEntry {
    pub date: DateTime<FixedOffset>,
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DividendHistoryEntry {
    pub date: DateTime<FixedOffset>,
    pub amount: f64,
}

/// Row shape accepted by the `bulk_upsert_assets` procedure, keyed by `ticker`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    pub ticker: String,
    pub name: Option<String>,
    pub sector: Option<String>,
    pub current_price: Option<f64>,
    /// Trailing dividend yield as a percentage (provider fraction * 100)
    pub dividends_12m: f64,
    pub price_history: Vec<PriceHistoryEntry>,
    pub dividend_history: Vec<DividendHistoryEntry>,
}

/// Body of the `bulk_upsert_assets` RPC call.
#[derive(Debug, Serialize)]
pub struct BulkUpsertRequest<'a> {
    pub assets_data: &'a [AssetRecord],
}
