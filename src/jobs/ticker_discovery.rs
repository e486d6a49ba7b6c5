use crate::error::BackendError;
use crate::models::ticker::{MarketSuffix, TickerSymbol};
use crate::services::backend::AssetBackend;

/// Fetch the tickers to sync and convert them to provider symbols.
///
/// Order follows the backend response. Null or blank tickers are dropped;
/// no further de-duplication happens here.
pub async fn discover_tickers(
    backend: &dyn AssetBackend,
    suffix: &MarketSuffix,
) -> Result<Vec<TickerSymbol>, BackendError> {
    tracing::info!("Fetching unique tickers from the backend...");

    let rows = backend.get_unique_tickers().await?;
    let total_rows = rows.len();

    let tickers: Vec<TickerSymbol> = rows
        .into_iter()
        .filter_map(|row| row.ticker)
        .filter_map(|raw| suffix.normalize(&raw))
        .collect();

    if tickers.len() < total_rows {
        tracing::debug!(
            "Dropped {} rows without a ticker",
            total_rows - tickers.len()
        );
    }

    tracing::info!(
        "{} tickers found: {:?}",
        tickers.len(),
        tickers.iter().map(|t| t.as_str()).collect::<Vec<_>>()
    );

    Ok(tickers)
}
