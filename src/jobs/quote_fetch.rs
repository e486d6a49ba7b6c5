use crate::error::ProviderError;
use crate::models::ticker::TickerSymbol;
use crate::services::quote_provider::{QuoteBatch, QuoteProvider};

/// Resolve every ticker with one batched provider call.
/// An empty ticker list never reaches the provider.
pub async fn fetch_quotes(
    provider: &dyn QuoteProvider,
    tickers: &[TickerSymbol],
) -> Result<QuoteBatch, ProviderError> {
    if tickers.is_empty() {
        tracing::warn!("No tickers given, skipping quote fetch");
        return Ok(QuoteBatch::new());
    }

    tracing::info!("Fetching Yahoo Finance data for {} tickers...", tickers.len());

    let batch = provider.tickers(tickers).await?;

    tracing::debug!("Provider returned {} handles", batch.len());
    Ok(batch)
}
