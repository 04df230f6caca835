use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use super::traits::QuoteProvider;
use crate::errors::CoreError;
use crate::models::quote::Quote;

const BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Yahoo Finance chart-endpoint provider for stock and crypto quotes.
///
/// - **Free**: no API key required (unofficial public endpoint).
/// - **Coverage**: global equities, ETFs, and crypto pairs (`BTC-USD`).
/// - One request per symbol at `interval=1d&range=1d` yields the current
///   price, the day's opening price, and the long display name.
pub struct YahooProvider {
    client: Client,
}

impl YahooProvider {
    pub fn new(timeout_secs: u64) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            // Yahoo rejects requests without a browser-ish user agent
            .user_agent("Mozilla/5.0 (compatible; stock-tracker)")
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client }
    }

    fn api_error(symbol: &str, message: impl std::fmt::Display) -> CoreError {
        CoreError::Api {
            provider: "Yahoo Finance".into(),
            message: format!("{symbol}: {message}"),
        }
    }
}

// ── Yahoo chart API response types ──────────────────────────────────

#[derive(Deserialize)]
struct ChartResponse {
    chart: ChartStatus,
}

#[derive(Deserialize)]
struct ChartStatus {
    result: Option<Vec<ChartData>>,
    error: Option<ChartError>,
}

#[derive(Deserialize)]
struct ChartError {
    description: String,
}

#[derive(Deserialize)]
struct ChartData {
    meta: ChartMeta,
    #[serde(default)]
    indicators: ChartIndicators,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChartMeta {
    symbol: String,
    regular_market_price: Option<f64>,
    #[serde(default)]
    long_name: Option<String>,
    #[serde(default)]
    short_name: Option<String>,
}

#[derive(Default, Deserialize)]
struct ChartIndicators {
    #[serde(default)]
    quote: Vec<ChartQuote>,
}

#[derive(Deserialize)]
struct ChartQuote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
}

#[async_trait]
impl QuoteProvider for YahooProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, CoreError> {
        let url = format!("{BASE_URL}/{symbol}?interval=1d&range=1d");

        let resp: ChartResponse = self.client.get(&url).send().await?.json().await?;

        if let Some(err) = resp.chart.error {
            return Err(Self::api_error(symbol, err.description));
        }

        let data = resp
            .chart
            .result
            .and_then(|mut r| if r.is_empty() { None } else { Some(r.remove(0)) })
            .ok_or_else(|| Self::api_error(symbol, "empty chart result"))?;

        let bars = data.indicators.quote.first();
        let open_price = bars
            .and_then(|q| q.open.iter().flatten().next().copied())
            .unwrap_or(0.0);

        // Prefer the meta price; fall back to the day's last close bar.
        let current_price = data
            .meta
            .regular_market_price
            .or_else(|| bars.and_then(|q| q.close.iter().flatten().next_back().copied()))
            .ok_or_else(|| Self::api_error(symbol, "no price data available"))?;

        let description = data
            .meta
            .long_name
            .or(data.meta.short_name)
            .unwrap_or_else(|| data.meta.symbol.clone());

        Ok(Quote {
            symbol: symbol.to_string(),
            current_price,
            open_price,
            description,
            fetched_at: 0,
        })
    }
}
