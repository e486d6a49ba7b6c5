use async_trait::async_trait;

use crate::error::BackendError;
use crate::models::asset::AssetRecord;
use crate::models::ticker::TickerRow;

/// Procedures the sync job needs from the backend.
#[async_trait]
pub trait AssetBackend: Send + Sync {
    /// Tickers referenced by investment transactions and existing assets.
    /// Uniqueness is the backend's responsibility.
    async fn get_unique_tickers(&self) -> Result<Vec<TickerRow>, BackendError>;

    /// Create-or-replace every record by ticker in a single call.
    async fn bulk_upsert_assets(&self, assets: &[AssetRecord]) -> Result<(), BackendError>;
}
