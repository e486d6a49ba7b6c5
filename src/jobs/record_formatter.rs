//! Turns provider handles into `bulk_upsert_assets` rows.
//!
//! Each ticker is processed in isolation: a provider error, missing
//! metadata or even a panic while formatting one ticker only drops that
//! ticker from the batch.

use futures_util::{FutureExt, StreamExt, stream};
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::error::FormatError;
use crate::models::asset::{AssetRecord, DividendHistoryEntry, PriceHistoryEntry};
use crate::models::quote::{DividendPoint, PricePoint, QuoteInfo};
use crate::models::ticker::TickerSymbol;
use crate::services::quote_provider::{QuoteBatch, QuoteHandle};

/// Decides whether provider metadata is populated enough to be stored.
pub trait CompletenessPredicate: Send + Sync {
    fn name(&self) -> &'static str;
    fn is_complete(&self, info: &QuoteInfo) -> bool;
}

/// Built-in completeness checks, selectable by name from configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CompletenessCheck {
    /// Accept only metadata that carries a trailing PEG ratio. The ratio
    /// itself is never stored; its presence marks a fully populated record.
    #[default]
    TrailingPegRatio,
    /// Accept any metadata the provider returns.
    MetadataPresent,
}

impl CompletenessCheck {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "trailing_peg_ratio" => Some(Self::TrailingPegRatio),
            "metadata_present" => Some(Self::MetadataPresent),
            _ => None,
        }
    }
}

impl CompletenessPredicate for CompletenessCheck {
    fn name(&self) -> &'static str {
        match self {
            Self::TrailingPegRatio => "trailing_peg_ratio",
            Self::MetadataPresent => "metadata_present",
        }
    }

    fn is_complete(&self, info: &QuoteInfo) -> bool {
        match self {
            Self::TrailingPegRatio => info.trailing_peg_ratio.is_some(),
            Self::MetadataPresent => true,
        }
    }
}

impl<F> CompletenessPredicate for F
where
    F: Fn(&QuoteInfo) -> bool + Send + Sync,
{
    fn name(&self) -> &'static str {
        "custom"
    }

    fn is_complete(&self, info: &QuoteInfo) -> bool {
        self(info)
    }
}

/// A ticker left out of the upsert batch.
#[derive(Debug, Clone)]
pub struct SkippedTicker {
    pub ticker: TickerSymbol,
    pub reason: String,
    /// true when the provider simply had no usable data
    pub data_gap: bool,
}

#[derive(Debug, Default)]
pub struct FormatOutcome {
    pub records: Vec<AssetRecord>,
    pub skipped: Vec<SkippedTicker>,
}

#[derive(Clone)]
pub struct RecordFormatter {
    predicate: Arc<dyn CompletenessPredicate>,
    concurrency: usize,
}

impl RecordFormatter {
    pub fn new(predicate: Arc<dyn CompletenessPredicate>, concurrency: usize) -> Self {
        Self {
            predicate,
            concurrency: concurrency.max(1),
        }
    }

    /// Format every ticker of the batch, keeping batch order in the output.
    pub async fn format(&self, batch: &QuoteBatch) -> FormatOutcome {
        tracing::info!("Formatting data for {} tickers...", batch.len());

        let results: Vec<(TickerSymbol, Result<AssetRecord, FormatError>)> =
            stream::iter(batch.iter())
                .map(|(symbol, handle)| {
                    let symbol = symbol.clone();
                    let handle = Arc::clone(handle);
                    let predicate = Arc::clone(&self.predicate);

                    async move {
                        let result = AssertUnwindSafe(format_ticker(
                            &symbol,
                            handle.as_ref(),
                            predicate.as_ref(),
                        ))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| Err(FormatError::Panicked(panic_message(&*panic))));

                        (symbol, result)
                    }
                })
                .buffered(self.concurrency)
                .collect()
                .await;

        let mut outcome = FormatOutcome::default();

        for (symbol, result) in results {
            match result {
                Ok(record) => outcome.records.push(record),
                Err(e) => {
                    if e.is_data_gap() {
                        tracing::warn!("Incomplete or missing data for {} ({}). Skipping.", symbol, e);
                    } else {
                        tracing::error!("Failed to process data for ticker {}: {}", symbol, e);
                    }
                    outcome.skipped.push(SkippedTicker {
                        ticker: symbol,
                        reason: e.to_string(),
                        data_gap: e.is_data_gap(),
                    });
                }
            }
        }

        tracing::info!("{} assets formatted for upsert", outcome.records.len());
        outcome
    }
}

async fn format_ticker(
    symbol: &TickerSymbol,
    handle: &dyn QuoteHandle,
    predicate: &dyn CompletenessPredicate,
) -> Result<AssetRecord, FormatError> {
    let info = handle.info().await?.ok_or(FormatError::MissingMetadata)?;

    if !predicate.is_complete(&info) {
        return Err(FormatError::Incomplete(predicate.name()));
    }

    let history = handle.history_1y().await?;
    let dividends = handle.dividends().await?;

    tracing::debug!(
        "{}: {} prices, {} dividends",
        symbol,
        history.len(),
        dividends.len()
    );

    Ok(build_record(symbol, &info, history, dividends))
}

/// Map provider data onto the backend row.
pub fn build_record(
    symbol: &TickerSymbol,
    info: &QuoteInfo,
    history: Vec<PricePoint>,
    dividends: Vec<DividendPoint>,
) -> AssetRecord {
    AssetRecord {
        ticker: symbol.base().to_string(),
        name: info.long_name.clone(),
        sector: info.sector.clone(),
        current_price: info.current_price.or(info.previous_close),
        dividends_12m: info.dividend_yield.unwrap_or(0.0) * 100.0,
        price_history: history
            .into_iter()
            .map(|p| PriceHistoryEntry {
                date: p.date,
                price: p.close,
            })
            .collect(),
        dividend_history: dividends
            .into_iter()
            .map(|d| DividendHistoryEntry {
                date: d.date,
                amount: d.amount,
            })
            .collect(),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
