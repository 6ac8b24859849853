use governor::{Quota, DefaultDirectRateLimiter};
use nonzero_ext::*;
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::future::Future;
use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::types::{FetchError, MarketStats};
use crate::config::Config;

/// Anything that can produce buy-side market statistics for an item type.
pub trait MarketStatSource {
    fn fetch_buy_stats(
        &self,
        type_id: i64,
    ) -> impl Future<Output = Result<MarketStats, FetchError>> + Send;
}

/// Client for the eve-central `marketstat` XML endpoint.
#[derive(Clone)]
pub struct EveCentralClient {
    http_client: ClientWithMiddleware,
    base_url: Url,
    rate_limiter: Arc<DefaultDirectRateLimiter>,
}

impl EveCentralClient {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let reqwest_client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .build()?;

        let retry_policy = ExponentialBackoff::builder()
            .retry_bounds(Duration::from_millis(500), Duration::from_secs(2))
            .build_with_max_retries(config.http_max_retries);

        let http_client = ClientBuilder::new(reqwest_client)
            .with(RetryTransientMiddleware::new_with_policy(retry_policy))
            .build();

        let per_second = NonZeroU32::new(config.market_requests_per_second).unwrap_or(nonzero!(1u32));
        let rate_limiter = Arc::new(DefaultDirectRateLimiter::direct(Quota::per_second(per_second)));

        Ok(Self {
            http_client,
            base_url: config.market_stat_url.clone(),
            rate_limiter,
        })
    }

    #[instrument(level = "debug", skip(self))]
    async fn request_buy_stats(&self, type_id: i64) -> Result<MarketStats, FetchError> {
        self.rate_limiter.until_ready().await;

        let response = self
            .http_client
            .get(self.base_url.clone())
            .query(&[("typeid", type_id)])
            .send()
            .await
            .map_err(classify_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status));
        }

        let body = response.text().await?;
        let stats = parse_market_stat_xml(&body)?;
        debug!(type_id, median = %stats.median, "Received market stats");
        Ok(stats)
    }
}

impl MarketStatSource for EveCentralClient {
    async fn fetch_buy_stats(&self, type_id: i64) -> Result<MarketStats, FetchError> {
        self.request_buy_stats(type_id).await
    }
}

fn classify_transport_error(error: reqwest_middleware::Error) -> FetchError {
    match error {
        reqwest_middleware::Error::Reqwest(e) => FetchError::from(e),
        other => FetchError::Transport(other),
    }
}

// Only the buy side of the response is read; everything else is ignored
#[derive(Debug, Deserialize)]
struct EvecApi {
    marketstat: MarketStatNode,
}

#[derive(Debug, Deserialize)]
struct MarketStatNode {
    #[serde(rename = "type")]
    item_type: TypeNode,
}

#[derive(Debug, Deserialize)]
struct TypeNode {
    buy: BuyNode,
}

#[derive(Debug, Deserialize)]
struct BuyNode {
    median: String,
    avg: String,
    min: String,
    max: String,
}

/// Extract `buy/median`, `buy/avg`, `buy/min` and `buy/max` from a marketstat document.
pub fn parse_market_stat_xml(body: &str) -> Result<MarketStats, FetchError> {
    let document: EvecApi =
        quick_xml::de::from_str(body).map_err(|e| FetchError::Malformed(e.to_string()))?;
    let buy = document.marketstat.item_type.buy;

    Ok(MarketStats {
        median: parse_price("median", &buy.median)?,
        average: parse_price("avg", &buy.avg)?,
        min: parse_price("min", &buy.min)?,
        max: parse_price("max", &buy.max)?,
    })
}

fn parse_price(field: &str, raw: &str) -> Result<Decimal, FetchError> {
    let raw = raw.trim();
    Decimal::from_str(raw)
        .or_else(|_| Decimal::from_scientific(raw))
        .map_err(|_| FetchError::Malformed(format!("buy/{field} is not a number: {raw:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::dec;
    use std::collections::HashMap;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn marketstat_body(type_id: i64, median: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="utf-8"?>
<evec_api version="2.0" method="marketstat_xml">
  <marketstat>
    <type id="{type_id}">
      <buy>
        <volume>1000</volume>
        <avg>{median}</avg>
        <max>{median}</max>
        <min>{median}</min>
        <stddev>0.12</stddev>
        <median>{median}</median>
        <percentile>{median}</percentile>
      </buy>
      <sell>
        <volume>5</volume>
        <avg>9.99</avg>
        <max>9.99</max>
        <min>9.99</min>
        <stddev>0</stddev>
        <median>9.99</median>
        <percentile>9.99</percentile>
      </sell>
    </type>
  </marketstat>
</evec_api>"#
        )
    }

    fn test_config(server: &MockServer, extra: &[(&str, &str)]) -> Config {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("MARKET_STAT_URL".to_string(), format!("{}/api/marketstat", server.uri())),
            ("HTTP_MAX_RETRIES".to_string(), "0".to_string()),
            ("MARKET_REQUESTS_PER_SECOND".to_string(), "100".to_string()),
        ]);
        for (key, value) in extra {
            vars.insert(key.to_string(), value.to_string());
        }
        Config::from_lookup(|key| vars.get(key).cloned()).unwrap()
    }

    #[test]
    fn test_parse_buy_side() {
        let body = r#"<evec_api version="2.0" method="marketstat_xml"><marketstat><type id="34">
            <buy><volume>10</volume><avg>4.51</avg><max>5.00</max><min>3.75</min>
            <stddev>0.2</stddev><median>4.50</median><percentile>4.9</percentile></buy>
            <sell><avg>6</avg><max>7</max><min>5</min><median>6.1</median></sell>
            </type></marketstat></evec_api>"#;

        let stats = parse_market_stat_xml(body).unwrap();
        assert_eq!(stats.median, dec!(4.50));
        assert_eq!(stats.average, dec!(4.51));
        assert_eq!(stats.min, dec!(3.75));
        assert_eq!(stats.max, dec!(5.00));
    }

    #[test]
    fn test_parse_missing_field_is_malformed() {
        let body = r#"<evec_api><marketstat><type id="34">
            <buy><avg>4.51</avg><max>5.00</max><min>3.75</min></buy>
            </type></marketstat></evec_api>"#;
        assert!(matches!(parse_market_stat_xml(body), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_parse_missing_buy_section_is_malformed() {
        let body = r#"<evec_api><marketstat><type id="34">
            <sell><avg>6</avg><max>7</max><min>5</min><median>6.1</median></sell>
            </type></marketstat></evec_api>"#;
        assert!(matches!(parse_market_stat_xml(body), Err(FetchError::Malformed(_))));
    }

    #[test]
    fn test_parse_non_numeric_price_is_malformed() {
        let body = r#"<evec_api><marketstat><type id="34">
            <buy><avg>4.51</avg><max>5.00</max><min>3.75</min><median>n/a</median></buy>
            </type></marketstat></evec_api>"#;
        let error = parse_market_stat_xml(body).unwrap_err();
        assert!(error.to_string().contains("buy/median"));
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        assert!(matches!(
            parse_market_stat_xml("<html>Service Unavailable"),
            Err(FetchError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_client_fetches_buy_stats() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/api/marketstat"))
            .and(query_param("typeid", "34"))
            .respond_with(ResponseTemplate::new(200).set_body_string(marketstat_body(34, "5.25")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = EveCentralClient::new(&test_config(&mock_server, &[])).unwrap();
        let stats = client.fetch_buy_stats(34).await.unwrap();
        assert_eq!(stats.median, dec!(5.25));
    }

    #[tokio::test]
    async fn test_client_reports_bad_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&mock_server)
            .await;

        let client = EveCentralClient::new(&test_config(&mock_server, &[])).unwrap();
        let error = client.fetch_buy_stats(34).await.unwrap_err();
        assert!(matches!(error, FetchError::Status(status) if status.as_u16() == 503));
    }

    #[tokio::test]
    async fn test_client_times_out() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(marketstat_body(34, "5.25"))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let client =
            EveCentralClient::new(&test_config(&mock_server, &[("HTTP_TIMEOUT_SECS", "1")])).unwrap();
        let error = client.fetch_buy_stats(34).await.unwrap_err();
        assert!(matches!(error, FetchError::Timeout));
    }
}
