pub mod asset_sync;
pub mod asset_upsert;
pub mod quote_fetch;
pub mod record_formatter;
pub mod ticker_discovery;
