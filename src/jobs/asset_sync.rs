//! Financial asset sync: backend tickers -> Yahoo Finance -> `bulk_upsert_assets`.
//!
//! Runs once per invocation. Each stage returns a typed result so the caller
//! can tell "nothing to do" apart from "a stage failed".

use std::sync::Arc;

use crate::config::Config;
use crate::error::SyncError;
use crate::jobs::asset_upsert::upsert_assets;
use crate::jobs::quote_fetch::fetch_quotes;
use crate::jobs::record_formatter::{RecordFormatter, SkippedTicker};
use crate::jobs::ticker_discovery::discover_tickers;
use crate::models::ticker::MarketSuffix;
use crate::services::backend::AssetBackend;
use crate::services::quote_provider::QuoteProvider;

/// Process exit status for a missing or invalid configuration.
pub const EXIT_CONFIG_ERROR: u8 = 1;
/// Process exit status when discovery, fetch or upsert failed.
pub const EXIT_STAGE_FAILURE: u8 = 2;

#[derive(Debug, Default, Clone)]
pub struct SyncReport {
    pub discovered: usize,
    pub fetched: usize,
    pub formatted: usize,
    pub upserted: usize,
    pub skipped: Vec<SkippedTicker>,
}

impl SyncReport {
    /// Tickers dropped because of an error rather than a data gap.
    pub fn failed(&self) -> usize {
        self.skipped.iter().filter(|s| !s.data_gap).count()
    }

    pub fn log_summary(&self) {
        tracing::info!("=== Asset Sync Complete ===");
        tracing::info!("Tickers discovered: {}", self.discovered);
        tracing::info!("Handles fetched: {}", self.fetched);
        tracing::info!("Records formatted: {}", self.formatted);
        tracing::info!("Records upserted: {}", self.upserted);

        if !self.skipped.is_empty() {
            tracing::warn!(
                "Skipped {} tickers ({} errors)",
                self.skipped.len(),
                self.failed()
            );
            for skipped in &self.skipped {
                tracing::warn!("  {}: {}", skipped.ticker, skipped.reason);
            }
        }
    }
}

pub struct AssetSyncJob {
    backend: Arc<dyn AssetBackend>,
    provider: Arc<dyn QuoteProvider>,
    suffix: MarketSuffix,
    formatter: RecordFormatter,
}

impl AssetSyncJob {
    pub fn new(
        backend: Arc<dyn AssetBackend>,
        provider: Arc<dyn QuoteProvider>,
        suffix: MarketSuffix,
        formatter: RecordFormatter,
    ) -> Self {
        Self {
            backend,
            provider,
            suffix,
            formatter,
        }
    }

    pub fn from_config(
        config: &Config,
        backend: Arc<dyn AssetBackend>,
        provider: Arc<dyn QuoteProvider>,
    ) -> Self {
        let formatter = RecordFormatter::new(Arc::new(config.completeness), config.format_concurrency);
        Self::new(backend, provider, config.market_suffix.clone(), formatter)
    }

    pub async fn run(&self) -> Result<SyncReport, SyncError> {
        tracing::info!("--- Starting financial asset sync ---");
        let mut report = SyncReport::default();

        // 1. Tickers to sync
        let tickers = discover_tickers(self.backend.as_ref(), &self.suffix)
            .await
            .map_err(SyncError::Discovery)?;
        report.discovered = tickers.len();

        if tickers.is_empty() {
            tracing::warn!("No tickers found, nothing to sync");
            return Ok(report);
        }

        // 2. One batched provider lookup
        let batch = fetch_quotes(self.provider.as_ref(), &tickers)
            .await
            .map_err(SyncError::Fetch)?;
        report.fetched = batch.len();

        if batch.is_empty() {
            tracing::warn!("Provider returned no data, nothing to upsert");
            return Ok(report);
        }

        // 3. Per-ticker formatting, failures isolated
        let outcome = self.formatter.format(&batch).await;
        report.formatted = outcome.records.len();
        report.skipped = outcome.skipped;

        // 4. Single batched write
        report.upserted = upsert_assets(self.backend.as_ref(), &outcome.records)
            .await
            .map_err(SyncError::Upsert)?;

        tracing::info!("--- Financial asset sync finished ---");
        Ok(report)
    }
}
