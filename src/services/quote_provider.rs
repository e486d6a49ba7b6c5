use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ProviderError;
use crate::models::quote::{DividendPoint, PricePoint, QuoteInfo};
use crate::models::ticker::TickerSymbol;

/// Per-ticker capability handed out by a batched provider lookup.
#[async_trait]
pub trait QuoteHandle: Send + Sync {
    /// None when the provider has no metadata for the symbol.
    async fn info(&self) -> Result<Option<QuoteInfo>, ProviderError>;

    /// Daily closes over the trailing year, oldest first.
    async fn history_1y(&self) -> Result<Vec<PricePoint>, ProviderError>;

    /// Every dividend the provider knows about, oldest first.
    async fn dividends(&self) -> Result<Vec<DividendPoint>, ProviderError>;
}

#[async_trait]
pub trait QuoteProvider: Send + Sync {
    /// Resolve all symbols with one batched request.
    async fn tickers(&self, symbols: &[TickerSymbol]) -> Result<QuoteBatch, ProviderError>;
}

/// Ordered symbol -> handle mapping; iteration follows insertion order.
#[derive(Clone, Default)]
pub struct QuoteBatch {
    entries: Vec<(TickerSymbol, Arc<dyn QuoteHandle>)>,
}

impl QuoteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the handle when the symbol is already present.
    pub fn insert(&mut self, symbol: TickerSymbol, handle: Arc<dyn QuoteHandle>) {
        match self.entries.iter_mut().find(|(s, _)| *s == symbol) {
            Some(entry) => entry.1 = handle,
            None => self.entries.push((symbol, handle)),
        }
    }

    pub fn get(&self, symbol: &TickerSymbol) -> Option<&Arc<dyn QuoteHandle>> {
        self.entries
            .iter()
            .find(|(s, _)| s == symbol)
            .map(|(_, handle)| handle)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&TickerSymbol, &Arc<dyn QuoteHandle>)> {
        self.entries.iter().map(|(s, h)| (s, h))
    }
}

impl FromIterator<(TickerSymbol, Arc<dyn QuoteHandle>)> for QuoteBatch {
    fn from_iter<I: IntoIterator<Item = (TickerSymbol, Arc<dyn QuoteHandle>)>>(iter: I) -> Self {
        let mut batch = QuoteBatch::new();
        for (symbol, handle) in iter {
            batch.insert(symbol, handle);
        }
        batch
    }
}
