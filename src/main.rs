use std::process::ExitCode;
use std::sync::Arc;

use asset_sync::config::Config;
use asset_sync::jobs::asset_sync::{AssetSyncJob, EXIT_CONFIG_ERROR, EXIT_STAGE_FAILURE};
use asset_sync::logging;
use asset_sync::services::supabase::SupabaseService;
use asset_sync::services::yahoo_finance::YahooFinanceService;

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables (before tracing so RUST_LOG from .env applies)
    dotenvy::dotenv().ok();

    // Initialize tracing
    logging::init_tracing();

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Invalid configuration: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let backend = match SupabaseService::new(
        config.supabase_url.clone(),
        config.supabase_service_key.clone(),
        config.http_timeout,
    ) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to build Supabase client: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    let provider = match YahooFinanceService::new(
        config.yahoo_base_url.clone(),
        config.yahoo_cookie_url.clone(),
        &config.user_agent,
        config.http_timeout,
    ) {
        Ok(service) => service,
        Err(e) => {
            tracing::error!("Failed to build Yahoo Finance client: {}", e);
            return ExitCode::from(EXIT_CONFIG_ERROR);
        }
    };

    tracing::info!(
        "Syncing into {} using {} (suffix {}, concurrency {})",
        backend.base_url(),
        provider.base_url(),
        config.market_suffix.as_str(),
        config.format_concurrency
    );

    let job = AssetSyncJob::from_config(&config, Arc::new(backend), Arc::new(provider));

    match job.run().await {
        Ok(report) => {
            report.log_summary();
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!("Asset sync aborted: {}", e);
            ExitCode::from(EXIT_STAGE_FAILURE)
        }
    }
}
