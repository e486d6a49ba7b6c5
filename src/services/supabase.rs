use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;

use crate::error::BackendError;
use crate::models::asset::{AssetRecord, BulkUpsertRequest};
use crate::models::ticker::TickerRow;
use crate::services::backend::AssetBackend;

pub const GET_UNIQUE_TICKERS: &str = "get_unique_tickers";
pub const BULK_UPSERT_ASSETS: &str = "bulk_upsert_assets";

/// PostgREST RPC client for the Supabase project.
///
/// Authenticates with the service role key so SECURITY DEFINER
/// procedures can be called.
#[derive(Clone)]
pub struct SupabaseService {
    client: Client,
    base_url: String,
    service_key: String,
}

impl SupabaseService {
    pub fn new(
        base_url: String,
        service_key: String,
        timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            service_key,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn rpc_url(&self, function: &str) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, function)
    }

    async fn call_rpc<B: Serialize + ?Sized>(
        &self,
        function: &'static str,
        body: &B,
    ) -> Result<String, BackendError> {
        tracing::debug!("Calling RPC {}", function);

        let response = self
            .client
            .post(self.rpc_url(function))
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .header("accept", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(BackendError::Rpc {
                function,
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(text)
    }
}

#[async_trait]
impl AssetBackend for SupabaseService {
    async fn get_unique_tickers(&self) -> Result<Vec<TickerRow>, BackendError> {
        let text = self
            .call_rpc(GET_UNIQUE_TICKERS, &serde_json::json!({}))
            .await?;

        // PostgREST answers an empty body / null when the function returns no rows
        if text.trim().is_empty() || text.trim() == "null" {
            return Ok(vec![]);
        }

        serde_json::from_str(&text).map_err(|source| BackendError::Decode {
            function: GET_UNIQUE_TICKERS,
            source,
        })
    }

    async fn bulk_upsert_assets(&self, assets: &[AssetRecord]) -> Result<(), BackendError> {
        self.call_rpc(BULK_UPSERT_ASSETS, &BulkUpsertRequest { assets_data: assets })
            .await?;
        Ok(())
    }
}
