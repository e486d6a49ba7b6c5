//! Yahoo Finance quote provider.
//!
//! One `/v7/finance/quote` request resolves the whole ticker batch. Each
//! handle then pulls metadata from `quoteSummary` and history/dividends from
//! the v8 chart endpoint on demand.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone};
use reqwest::{Client, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::error::ProviderError;
use crate::models::quote::{DividendPoint, PricePoint, QuoteInfo};
use crate::models::ticker::TickerSymbol;
use crate::services::quote_provider::{QuoteBatch, QuoteHandle, QuoteProvider};

const SUMMARY_MODULES: &str = "price,assetProfile,summaryDetail,financialData,defaultKeyStatistics";
const MAX_ERROR_BODY: usize = 300;

#[derive(Clone)]
pub struct YahooFinanceService {
    inner: Arc<YahooInner>,
}

struct YahooInner {
    client: Client,
    base_url: String,
    cookie_url: String,
    crumb: OnceCell<Option<String>>,
}

// Batched quote response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteResponse,
}

#[derive(Debug, Deserialize)]
struct QuoteResponse {
    #[serde(default)]
    result: Option<Vec<QuoteSnapshot>>,
    #[serde(default)]
    error: Option<ApiError>,
}

/// Fields of the batched quote kept on each handle as a fallback.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteSnapshot {
    pub symbol: String,
    pub long_name: Option<String>,
    pub short_name: Option<String>,
    pub regular_market_price: Option<f64>,
    pub regular_market_previous_close: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    code: Option<String>,
    #[serde(default)]
    description: Option<String>,
}

impl ApiError {
    fn describe(&self) -> String {
        match (&self.code, &self.description) {
            (Some(code), Some(desc)) => format!("{}: {}", code, desc),
            (None, Some(desc)) => desc.clone(),
            (Some(code), None) => code.clone(),
            (None, None) => "unknown error".to_string(),
        }
    }
}

// quoteSummary response
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryEnvelope {
    quote_summary: SummaryResponse,
}

#[derive(Debug, Deserialize)]
struct SummaryResponse {
    #[serde(default)]
    result: Option<Vec<SummaryResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryResult {
    #[serde(default)]
    price: Option<PriceModule>,
    #[serde(default)]
    asset_profile: Option<AssetProfileModule>,
    #[serde(default)]
    summary_detail: Option<SummaryDetailModule>,
    #[serde(default)]
    financial_data: Option<FinancialDataModule>,
    #[serde(default)]
    default_key_statistics: Option<KeyStatisticsModule>,
}

/// `{"raw": 1.23, "fmt": "1.23"}`, or `{}` when Yahoo has no value.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    #[serde(default)]
    raw: Option<f64>,
}

fn raw(value: &Option<RawValue>) -> Option<f64> {
    value.as_ref().and_then(|v| v.raw).filter(|v| v.is_finite())
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceModule {
    long_name: Option<String>,
    short_name: Option<String>,
    regular_market_price: Option<RawValue>,
    regular_market_previous_close: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
struct AssetProfileModule {
    sector: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetailModule {
    previous_close: Option<RawValue>,
    dividend_yield: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FinancialDataModule {
    current_price: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatisticsModule {
    trailing_peg_ratio: Option<RawValue>,
}

// v8 chart response
#[derive(Debug, Deserialize)]
struct ChartEnvelope {
    chart: ChartResponse,
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartResult {
    #[serde(default)]
    meta: ChartMeta,
    #[serde(default)]
    timestamp: Vec<i64>,
    #[serde(default)]
    indicators: Option<ChartIndicators>,
    #[serde(default)]
    events: Option<ChartEvents>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartMeta {
    #[serde(default)]
    gmtoffset: i32,
}

#[derive(Debug, Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartQuote {
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[derive(Debug, Default, Deserialize)]
struct ChartEvents {
    #[serde(default)]
    dividends: HashMap<String, DividendEvent>,
}

#[derive(Debug, Deserialize)]
struct DividendEvent {
    amount: f64,
    date: i64,
}

impl YahooFinanceService {
    pub fn new(
        base_url: String,
        cookie_url: String,
        user_agent: &str,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .cookie_store(true)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            inner: Arc::new(YahooInner {
                client,
                base_url: base_url.trim_end_matches('/').to_string(),
                cookie_url,
                crumb: OnceCell::new(),
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Session crumb, fetched once per process. A failed fetch is not
    /// retried; requests then go out without one.
    async fn crumb(&self) -> Option<String> {
        self.inner
            .crumb
            .get_or_init(|| async {
                match self.fetch_crumb().await {
                    Ok(crumb) => {
                        tracing::debug!("Obtained Yahoo Finance crumb");
                        Some(crumb)
                    }
                    Err(e) => {
                        tracing::warn!("Failed to obtain Yahoo Finance crumb, continuing without: {}", e);
                        None
                    }
                }
            })
            .await
            .clone()
    }

    async fn fetch_crumb(&self) -> Result<String, ProviderError> {
        // Only the Set-Cookie matters here; the page itself usually 404s
        if let Err(e) = self.inner.client.get(&self.inner.cookie_url).send().await {
            tracing::debug!("Cookie request to {} failed: {}", self.inner.cookie_url, e);
        }

        let url = self.endpoint_url(&["v1", "test", "getcrumb"])?;
        let response = self.inner.client.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                endpoint: "getcrumb".to_string(),
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        let crumb = body.trim();
        if crumb.is_empty() || crumb.contains('<') || crumb.contains(char::is_whitespace) {
            return Err(ProviderError::InvalidData {
                symbol: "-".to_string(),
                reason: format!("unexpected crumb payload: {}", truncate(crumb)),
            });
        }

        Ok(crumb.to_string())
    }

    fn endpoint_url(&self, segments: &[&str]) -> Result<Url, ProviderError> {
        let mut url = Url::parse(&self.inner.base_url).map_err(|e| ProviderError::InvalidData {
            symbol: "-".to_string(),
            reason: format!("bad base url {}: {}", self.inner.base_url, e),
        })?;

        url.path_segments_mut()
            .map_err(|_| ProviderError::InvalidData {
                symbol: "-".to_string(),
                reason: format!("base url cannot take a path: {}", self.inner.base_url),
            })?
            .pop_if_empty()
            .extend(segments);

        Ok(url)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<T, ProviderError> {
        let url = self.endpoint_url(segments)?;
        let crumb = self.crumb().await;

        let mut request = self
            .inner
            .client
            .get(url)
            .header("accept", "application/json")
            .query(query);
        if let Some(crumb) = &crumb {
            request = request.query(&[("crumb", crumb.as_str())]);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ProviderError::Status {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
                body: truncate(&body),
            });
        }

        serde_json::from_str(&body).map_err(|source| ProviderError::Decode {
            endpoint: endpoint.to_string(),
            source,
        })
    }

    async fn chart(
        &self,
        symbol: &TickerSymbol,
        query: &[(&str, &str)],
    ) -> Result<Option<ChartResult>, ProviderError> {
        let envelope: ChartEnvelope = self
            .get_json("chart", &["v8", "finance", "chart", symbol.as_str()], query)
            .await?;

        if let Some(error) = envelope.chart.error {
            return Err(ProviderError::Api {
                symbol: symbol.to_string(),
                description: error.describe(),
            });
        }

        Ok(envelope.chart.result.and_then(|r| r.into_iter().next()))
    }
}

#[async_trait]
impl QuoteProvider for YahooFinanceService {
    async fn tickers(&self, symbols: &[TickerSymbol]) -> Result<QuoteBatch, ProviderError> {
        if symbols.is_empty() {
            return Ok(QuoteBatch::new());
        }

        let joined = symbols
            .iter()
            .map(|s| s.as_str())
            .collect::<Vec<_>>()
            .join(",");

        let envelope: QuoteEnvelope = self
            .get_json("quote", &["v7", "finance", "quote"], &[("symbols", joined.as_str())])
            .await?;

        if let Some(error) = envelope.quote_response.error {
            return Err(ProviderError::Api {
                symbol: joined,
                description: error.describe(),
            });
        }

        let mut snapshots: HashMap<String, QuoteSnapshot> = envelope
            .quote_response
            .result
            .unwrap_or_default()
            .into_iter()
            .map(|q| (q.symbol.to_uppercase(), q))
            .collect();

        tracing::debug!(
            "Batched quote returned {} of {} symbols",
            snapshots.len(),
            symbols.len()
        );

        let batch = symbols
            .iter()
            .map(|symbol| {
                let snapshot = snapshots.remove(&symbol.as_str().to_uppercase());
                if snapshot.is_none() {
                    tracing::debug!("No batched quote for {}", symbol);
                }
                let handle: Arc<dyn QuoteHandle> = Arc::new(YahooQuoteHandle {
                    service: self.clone(),
                    symbol: symbol.clone(),
                    snapshot,
                });
                (symbol.clone(), handle)
            })
            .collect();

        Ok(batch)
    }
}

pub struct YahooQuoteHandle {
    service: YahooFinanceService,
    symbol: TickerSymbol,
    snapshot: Option<QuoteSnapshot>,
}

#[async_trait]
impl QuoteHandle for YahooQuoteHandle {
    async fn info(&self) -> Result<Option<QuoteInfo>, ProviderError> {
        let result: Result<SummaryEnvelope, ProviderError> = self
            .service
            .get_json(
                "quoteSummary",
                &["v10", "finance", "quoteSummary", self.symbol.as_str()],
                &[("modules", SUMMARY_MODULES)],
            )
            .await;

        let envelope = match result {
            Ok(envelope) => envelope,
            Err(ProviderError::Status { status, .. }) if status == StatusCode::NOT_FOUND.as_u16() => {
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        if let Some(error) = envelope.quote_summary.error {
            tracing::debug!("quoteSummary error for {}: {}", self.symbol, error.describe());
            return Ok(None);
        }

        Ok(envelope
            .quote_summary
            .result
            .and_then(|r| r.into_iter().next())
            .map(|summary| quote_info_from_summary(summary, self.snapshot.as_ref())))
    }

    async fn history_1y(&self) -> Result<Vec<PricePoint>, ProviderError> {
        let chart = self
            .service
            .chart(&self.symbol, &[("range", "1y"), ("interval", "1d")])
            .await?;

        match chart {
            Some(chart) => chart_prices(&self.symbol, &chart),
            None => Ok(vec![]),
        }
    }

    async fn dividends(&self) -> Result<Vec<DividendPoint>, ProviderError> {
        let chart = self
            .service
            .chart(
                &self.symbol,
                &[("range", "max"), ("interval", "1d"), ("events", "div")],
            )
            .await?;

        match chart {
            Some(chart) => chart_dividends(&self.symbol, &chart),
            None => Ok(vec![]),
        }
    }
}

fn quote_info_from_summary(summary: SummaryResult, snapshot: Option<&QuoteSnapshot>) -> QuoteInfo {
    let price = summary.price.unwrap_or_default();
    let detail = summary.summary_detail.unwrap_or_default();
    let financial = summary.financial_data.unwrap_or_default();
    let stats = summary.default_key_statistics.unwrap_or_default();

    QuoteInfo {
        long_name: price
            .long_name
            .or(price.short_name)
            .or_else(|| snapshot.and_then(|s| s.long_name.clone().or(s.short_name.clone()))),
        sector: summary.asset_profile.and_then(|p| p.sector),
        current_price: raw(&financial.current_price)
            .or(raw(&price.regular_market_price))
            .or_else(|| snapshot.and_then(|s| s.regular_market_price)),
        previous_close: raw(&detail.previous_close)
            .or(raw(&price.regular_market_previous_close))
            .or_else(|| snapshot.and_then(|s| s.regular_market_previous_close)),
        dividend_yield: raw(&detail.dividend_yield),
        trailing_peg_ratio: raw(&stats.trailing_peg_ratio),
    }
}

/// Timestamp at local midnight of the exchange day, e.g. `2024-01-02T00:00:00-03:00`.
///
/// `gmtoffset` is the exchange's current offset, so rows from past DST
/// periods carry today's offset. The calendar day is unaffected since
/// chart timestamps fall inside the trading session.
fn exchange_day(timestamp: i64, gmtoffset: i32) -> Option<DateTime<FixedOffset>> {
    let offset = FixedOffset::east_opt(gmtoffset)?;
    let local = DateTime::from_timestamp(timestamp, 0)?.with_timezone(&offset);
    let midnight = local.date_naive().and_hms_opt(0, 0, 0)?;
    offset.from_local_datetime(&midnight).single()
}

fn chart_prices(symbol: &TickerSymbol, chart: &ChartResult) -> Result<Vec<PricePoint>, ProviderError> {
    let closes = chart
        .indicators
        .as_ref()
        .and_then(|i| i.quote.first())
        .map(|q| q.close.as_slice())
        .unwrap_or(&[]);

    if !closes.is_empty() && closes.len() != chart.timestamp.len() {
        return Err(ProviderError::InvalidData {
            symbol: symbol.to_string(),
            reason: format!(
                "{} timestamps but {} closes",
                chart.timestamp.len(),
                closes.len()
            ),
        });
    }

    let mut prices = Vec::with_capacity(closes.len());
    for (ts, close) in chart.timestamp.iter().zip(closes) {
        // Yahoo pads non-trading intervals with nulls
        let Some(close) = (*close).filter(|c| c.is_finite()) else {
            continue;
        };
        let date = exchange_day(*ts, chart.meta.gmtoffset).ok_or_else(|| {
            ProviderError::InvalidData {
                symbol: symbol.to_string(),
                reason: format!("invalid timestamp {}", ts),
            }
        })?;
        prices.push(PricePoint { date, close });
    }

    prices.sort_by_key(|p| p.date);
    Ok(prices)
}

fn chart_dividends(
    symbol: &TickerSymbol,
    chart: &ChartResult,
) -> Result<Vec<DividendPoint>, ProviderError> {
    let Some(events) = &chart.events else {
        return Ok(vec![]);
    };

    let mut dividends = events
        .dividends
        .values()
        .map(|event| {
            exchange_day(event.date, chart.meta.gmtoffset)
                .map(|date| DividendPoint {
                    date,
                    amount: event.amount,
                })
                .ok_or_else(|| ProviderError::InvalidData {
                    symbol: symbol.to_string(),
                    reason: format!("invalid dividend timestamp {}", event.date),
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    dividends.sort_by_key(|d| d.date);
    Ok(dividends)
}

fn truncate(body: &str) -> String {
    if body.len() <= MAX_ERROR_BODY {
        return body.to_string();
    }
    let mut end = MAX_ERROR_BODY;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}
