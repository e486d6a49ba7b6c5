//! Error types for the asset sync pipeline.
//!
//! Stage-level failures ([`SyncError`]) stop the run. Per-ticker failures
//! ([`FormatError`]) only skip the offending ticker.

use thiserror::Error;

/// Failures talking to the Supabase backend.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("RPC {function} returned {status}: {body}")]
    Rpc {
        function: &'static str,
        status: u16,
        body: String,
    },

    #[error("failed to decode {function} response: {source}")]
    Decode {
        function: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

/// Failures talking to the quote provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("provider error for {symbol}: {description}")]
    Api { symbol: String, description: String },

    #[error("invalid data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },
}

/// Why a single ticker was left out of the upsert batch.
#[derive(Error, Debug)]
pub enum FormatError {
    #[error("no metadata returned")]
    MissingMetadata,

    #[error("incomplete metadata (check: {0})")]
    Incomplete(&'static str),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("panicked while formatting: {0}")]
    Panicked(String),
}

impl FormatError {
    /// Skips caused by missing data rather than by a failure.
    pub fn is_data_gap(&self) -> bool {
        matches!(self, FormatError::MissingMetadata | FormatError::Incomplete(_))
    }
}

/// A stage failure that halts the pipeline.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("ticker discovery failed: {0}")]
    Discovery(#[source] BackendError),

    #[error("quote fetch failed: {0}")]
    Fetch(#[source] ProviderError),

    #[error("asset upsert failed: {0}")]
    Upsert(#[source] BackendError),
}
