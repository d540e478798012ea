use crate::core::quote::{DataUnavailable, QuoteSource, RawCloses};
use crate::core::series::{Lookback, Ticker};
use crate::providers::util::{RetryPolicy, with_retry};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};
use url::{Url, form_urlencoded};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Daily closes from the Yahoo Finance chart API.
pub struct YahooQuoteSource {
    base_url: Url,
    client: reqwest::Client,
    retry: RetryPolicy,
}

impl YahooQuoteSource {
    pub fn new(base_url: &str) -> Result<Self> {
        Self::with_retry_policy(base_url, RetryPolicy::default())
    }

    pub fn with_retry_policy(base_url: &str, retry: RetryPolicy) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("pensionguard/0.1")
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        let base_url =
            Url::parse(base_url).with_context(|| format!("Invalid Yahoo base URL: {base_url}"))?;
        Ok(YahooQuoteSource {
            base_url,
            client,
            retry,
        })
    }

    fn chart_url(&self, ticker: &Ticker, lookback: Lookback) -> Url {
        // Path segments leave '^' unescaped, so every reserved byte is
        // encoded up front and `set_path` keeps the escapes.
        let symbol: String = form_urlencoded::byte_serialize(ticker.as_str().as_bytes()).collect();
        let mut url = self.base_url.clone();
        let path = format!(
            "{}/v8/finance/chart/{}",
            url.path().trim_end_matches('/'),
            symbol
        );
        url.set_path(&path);
        url.query_pairs_mut()
            .append_pair("interval", "1d")
            .append_pair("range", lookback.fetch_period().range());
        url
    }
}

#[derive(Deserialize, Debug)]
struct YahooChartResponse {
    chart: ChartResult,
}

#[derive(Deserialize, Debug)]
struct ChartResult {
    result: Option<Vec<ChartItem>>,
}

#[derive(Deserialize, Debug)]
struct ChartItem {
    timestamp: Option<Vec<i64>>,
    indicators: Option<Indicators>,
}

#[derive(Deserialize, Debug)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Deserialize, Debug)]
struct Quote {
    close: Option<Vec<Option<f64>>>,
}

/// Reduces a chart response to the close column of its first quote block.
fn extract_closes(ticker: &Ticker, data: YahooChartResponse) -> Result<RawCloses, DataUnavailable> {
    let empty = || DataUnavailable::Empty {
        ticker: ticker.to_string(),
    };

    let item = data
        .chart
        .result
        .and_then(|items| items.into_iter().next())
        .ok_or_else(empty)?;
    let timestamps = item.timestamp.ok_or_else(empty)?;
    let closes = item
        .indicators
        .and_then(|inds| inds.quote.into_iter().next())
        .and_then(|q| q.close)
        .ok_or_else(empty)?;

    if timestamps.len() != closes.len() {
        return Err(DataUnavailable::Malformed {
            ticker: ticker.to_string(),
            reason: format!(
                "{} timestamps but {} closes",
                timestamps.len(),
                closes.len()
            ),
        });
    }
    if timestamps.is_empty() {
        return Err(empty());
    }

    Ok(RawCloses { timestamps, closes })
}

#[async_trait]
impl QuoteSource for YahooQuoteSource {
    #[instrument(
        name = "YahooChartFetch",
        skip(self),
        fields(ticker = %ticker, lookback = %lookback)
    )]
    async fn fetch_closes(
        &self,
        ticker: &Ticker,
        lookback: Lookback,
    ) -> Result<RawCloses, DataUnavailable> {
        let url = self.chart_url(ticker, lookback);
        debug!("Requesting chart data from {}", url);

        let transport = |reason: String| DataUnavailable::Transport {
            ticker: ticker.to_string(),
            reason,
        };

        let response = with_retry(|| async { self.client.get(url.clone()).send().await }, self.retry)
            .await
            .map_err(|e| transport(e.to_string()))?;

        if !response.status().is_success() {
            return Err(transport(format!("HTTP error: {}", response.status())));
        }

        let text = response.text().await.map_err(|e| transport(e.to_string()))?;
        let data: YahooChartResponse =
            serde_json::from_str(&text).map_err(|e| DataUnavailable::Malformed {
                ticker: ticker.to_string(),
                reason: e.to_string(),
            })?;

        let raw = extract_closes(ticker, data)?;
        debug!(points = raw.timestamps.len(), "Received chart data");
        Ok(raw)
    }
}
