use crate::error::BackendError;
use crate::models::asset::AssetRecord;
use crate::services::backend::AssetBackend;

/// Send all records in a single `bulk_upsert_assets` call.
///
/// Returns the number of records sent; an empty slice makes no call.
pub async fn upsert_assets(
    backend: &dyn AssetBackend,
    records: &[AssetRecord],
) -> Result<usize, BackendError> {
    if records.is_empty() {
        tracing::warn!("No asset records to send to the backend");
        return Ok(0);
    }

    tracing::info!("Sending {} assets to the backend...", records.len());
    backend.bulk_upsert_assets(records).await?;
    tracing::info!("Asset data updated successfully");

    Ok(records.len())
}
