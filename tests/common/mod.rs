#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use chrono::{DateTime, FixedOffset};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use asset_sync::error::{BackendError, ProviderError};
use asset_sync::models::asset::AssetRecord;
use asset_sync::models::quote::{DividendPoint, PricePoint, QuoteInfo};
use asset_sync::models::ticker::{TickerRow, TickerSymbol};
use asset_sync::services::backend::AssetBackend;
use asset_sync::services::quote_provider::{QuoteBatch, QuoteHandle, QuoteProvider};

/// In-memory backend recording every upsert batch.
#[derive(Default)]
pub struct FakeBackend {
    pub rows: Vec<TickerRow>,
    pub fail_discovery: bool,
    pub fail_upsert: bool,
    pub discovery_calls: AtomicUsize,
    pub upserts: Mutex<Vec<Vec<AssetRecord>>>,
}

impl FakeBackend {
    pub fn with_tickers(tickers: &[Option<&str>]) -> Self {
        Self {
            rows: tickers
                .iter()
                .map(|t| TickerRow {
                    ticker: t.map(|s| s.to_string()),
                })
                .collect(),
            ..Default::default()
        }
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.lock().unwrap().len()
    }

    pub fn last_upsert(&self) -> Vec<AssetRecord> {
        self.upserts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl AssetBackend for FakeBackend {
    async fn get_unique_tickers(&self) -> Result<Vec<TickerRow>, BackendError> {
        self.discovery_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_discovery {
            return Err(BackendError::Rpc {
                function: "get_unique_tickers",
                status: 503,
                body: "service unavailable".to_string(),
            });
        }
        Ok(self.rows.clone())
    }

    async fn bulk_upsert_assets(&self, assets: &[AssetRecord]) -> Result<(), BackendError> {
        self.upserts.lock().unwrap().push(assets.to_vec());
        if self.fail_upsert {
            return Err(BackendError::Rpc {
                function: "bulk_upsert_assets",
                status: 400,
                body: "constraint violation".to_string(),
            });
        }
        Ok(())
    }
}

/// What a fake handle yields for each call.
#[derive(Clone, Default)]
pub struct FakeQuote {
    pub info: Option<QuoteInfo>,
    pub history: Vec<PricePoint>,
    pub dividends: Vec<DividendPoint>,
    pub fail_history: bool,
    pub panic_on_dividends: bool,
}

pub struct FakeHandle {
    symbol: String,
    quote: FakeQuote,
}

#[async_trait]
impl QuoteHandle for FakeHandle {
    async fn info(&self) -> Result<Option<QuoteInfo>, ProviderError> {
        Ok(self.quote.info.clone())
    }

    async fn history_1y(&self) -> Result<Vec<PricePoint>, ProviderError> {
        if self.quote.fail_history {
            return Err(ProviderError::Api {
                symbol: self.symbol.clone(),
                description: "history unavailable".to_string(),
            });
        }
        Ok(self.quote.history.clone())
    }

    async fn dividends(&self) -> Result<Vec<DividendPoint>, ProviderError> {
        if self.quote.panic_on_dividends {
            panic!("dividend series for {} is corrupt", self.symbol);
        }
        Ok(self.quote.dividends.clone())
    }
}

/// Provider answering from a fixed table, counting batched calls.
#[derive(Default)]
pub struct FakeProvider {
    pub quotes: HashMap<String, FakeQuote>,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub requested: Mutex<Vec<Vec<String>>>,
}

impl FakeProvider {
    pub fn with_quotes(quotes: Vec<(&str, FakeQuote)>) -> Self {
        Self {
            quotes: quotes
                .into_iter()
                .map(|(symbol, quote)| (symbol.to_string(), quote))
                .collect(),
            ..Default::default()
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for FakeProvider {
    async fn tickers(&self, symbols: &[TickerSymbol]) -> Result<QuoteBatch, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested
            .lock()
            .unwrap()
            .push(symbols.iter().map(|s| s.to_string()).collect());

        if self.fail {
            return Err(ProviderError::Status {
                endpoint: "quote".to_string(),
                status: 429,
                body: "Too Many Requests".to_string(),
            });
        }

        Ok(symbols
            .iter()
            .filter_map(|symbol| {
                self.quotes.get(symbol.as_str()).map(|quote| {
                    let handle: Arc<dyn QuoteHandle> = Arc::new(FakeHandle {
                        symbol: symbol.to_string(),
                        quote: quote.clone(),
                    });
                    (symbol.clone(), handle)
                })
            })
            .collect())
    }
}

pub fn date(s: &str) -> DateTime<FixedOffset> {
    DateTime::parse_from_rfc3339(s).unwrap()
}

pub fn complete_info(name: &str, price: f64, dividend_yield: f64) -> QuoteInfo {
    QuoteInfo {
        long_name: Some(name.to_string()),
        sector: Some("Financial Services".to_string()),
        current_price: Some(price),
        previous_close: Some(price - 0.5),
        dividend_yield: Some(dividend_yield),
        trailing_peg_ratio: Some(1.2),
    }
}

pub fn quote(name: &str, price: f64, dividend_yield: f64) -> FakeQuote {
    FakeQuote {
        info: Some(complete_info(name, price, dividend_yield)),
        history: vec![
            PricePoint {
                date: date("2024-06-03T00:00:00-03:00"),
                close: price - 1.0,
            },
            PricePoint {
                date: date("2024-06-04T00:00:00-03:00"),
                close: price,
            },
        ],
        dividends: vec![DividendPoint {
            date: date("2024-03-01T00:00:00-03:00"),
            amount: 0.42,
        }],
        ..Default::default()
    }
}

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn spawn_mock_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    format!("http://{}", addr)
}
