use anyhow::{Result, anyhow};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, instrument};

use super::util::with_retry;
use crate::core::cache::Cache;
use crate::core::price::{PriceProvider, PriceResult};

/// Brokerage tickers that Yahoo lists under a different symbol.
const SYMBOL_ALIASES: &[(&str, &str)] = &[("BRKB", "BRK-B"), ("BFB", "BF-B")];

fn yahoo_symbol(ticker: &str) -> &str {
    SYMBOL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == ticker)
        .map_or(ticker, |&(_, symbol)| symbol)
}

/// Latest market prices from Yahoo's chart endpoint.
pub struct YahooFinanceProvider {
    base_url: String,
    cache: Arc<Cache<String, PriceResult>>,
}

impl YahooFinanceProvider {
    pub fn new(base_url: &str, cache: Arc<Cache<String, PriceResult>>) -> Self {
        YahooFinanceProvider {
            base_url: base_url.to_string(),
            cache,
        }
    }
}

// Only the quote metadata of the chart response is read.
#[derive(Deserialize, Debug)]
struct ChartEnvelope {
    chart: Chart,
}

#[derive(Deserialize, Debug)]
struct Chart {
    result: Vec<ChartSeries>,
}

#[derive(Deserialize, Debug)]
struct ChartSeries {
    meta: QuoteMeta,
}

#[derive(Deserialize, Debug)]
struct QuoteMeta {
    #[serde(alias = "regularMarketPrice")]
    regular_market_price: f64,
    currency: String,
    #[serde(alias = "shortName")]
    short_name: Option<String>,
}

#[async_trait]
impl PriceProvider for YahooFinanceProvider {
    #[instrument(
        name = "YahooPriceFetch",
        skip(self),
        fields(symbol = %symbol)
    )]
    async fn fetch_price(&self, symbol: &str) -> Result<PriceResult> {
        if let Some(cached) = self.cache.get(&symbol.to_string()).await {
            return Ok(cached);
        }

        let url = format!(
            "{}/v8/finance/chart/{}?interval=1d&range=5d",
            self.base_url,
            yahoo_symbol(symbol)
        );
        debug!("Requesting price data from {}", url);

        let client = reqwest::Client::builder()
            .user_agent("folio-drift/0.1")
            .build()?;
        let response = with_retry(|| async { client.get(&url).send().await }, 2, 500)
            .await
            .map_err(|e| anyhow!("Request error: {} for symbol: {} URL: {}", e, symbol, url))?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "HTTP error: {} for symbol: {}",
                response.status(),
                symbol
            ));
        }

        let text = response.text().await?;
        let data: ChartEnvelope = serde_json::from_str(&text)
            .map_err(|e| anyhow!("Failed to parse JSON response for {}: {}", symbol, e))?;

        let item = data
            .chart
            .result
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No price data found for symbol: {}", symbol))?;

        let result = PriceResult {
            price: item.meta.regular_market_price,
            currency: item.meta.currency,
            short_name: item.meta.short_name,
        };

        self.cache.put(symbol.to_string(), result.clone()).await;

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chart_body(price: f64, short_name: Option<&str>) -> String {
        let short_name = short_name.map_or(String::new(), |n| format!(r#", "shortName": "{n}""#));
        format!(
            r#"{{"chart": {{"result": [{{"meta": {{"regularMarketPrice": {price}, "currency": "USD"{short_name}}}}}]}}}}"#
        )
    }

    async fn serve_chart(symbol: &str, body: String) -> MockServer {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("/v8/finance/chart/{symbol}")))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&mock_server)
            .await;
        mock_server
    }

    fn provider(server: &MockServer) -> YahooFinanceProvider {
        YahooFinanceProvider::new(&server.uri(), Arc::new(Cache::new()))
    }

    #[tokio::test]
    async fn test_successful_price_fetch() {
        let server = serve_chart(
            "ITOT",
            chart_body(120.65, Some("iShares Core S&P Total U.S. Stock Market ETF")),
        )
        .await;

        let result = provider(&server).fetch_price("ITOT").await.unwrap();
        assert_eq!(result.price, 120.65);
        assert_eq!(result.currency, "USD");
        assert_eq!(
            result.short_name.as_deref(),
            Some("iShares Core S&P Total U.S. Stock Market ETF")
        );
    }

    #[tokio::test]
    async fn test_aliased_symbol_is_requested() {
        let server = serve_chart("BRK-B", chart_body(410.0, None)).await;
        let result = provider(&server).fetch_price("BRKB").await.unwrap();
        assert_eq!(result.price, 410.0);
        assert_eq!(yahoo_symbol("ITOT"), "ITOT");
    }

    #[tokio::test]
    async fn test_cached_price_skips_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(chart_body(50.0, None)))
            .expect(1)
            .mount(&server)
            .await;

        let provider = provider(&server);
        assert_eq!(provider.fetch_price("VEA").await.unwrap().price, 50.0);
        assert_eq!(provider.fetch_price("VEA").await.unwrap().price, 50.0);
    }

    #[tokio::test]
    async fn test_empty_result_is_an_error() {
        let server = serve_chart("ZZZZ", r#"{"chart": {"result": []}}"#.to_string()).await;
        let err = provider(&server).fetch_price("ZZZZ").await.unwrap_err();
        assert_eq!(err.to_string(), "No price data found for symbol: ZZZZ");
    }

    #[tokio::test]
    async fn test_http_error_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v8/finance/chart/ITOT"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let err = provider(&server).fetch_price("ITOT").await.unwrap_err();
        assert_eq!(err.to_string(), "HTTP error: 404 Not Found for symbol: ITOT");
    }

    #[tokio::test]
    async fn test_malformed_response() {
        let server = serve_chart("ITOT", r#"{"chart": {"results": []}}"#.to_string()).await;
        let err = provider(&server).fetch_price("ITOT").await.unwrap_err();
        assert!(
            err.to_string()
                .contains("Failed to parse JSON response for ITOT")
        );
    }
}
