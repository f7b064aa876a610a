use crate::{FetchError, QuoteFetcher};
use async_trait::async_trait;
use crypto_tracker_common::{Quote, QuoteBatch, DEFAULT_API_BASE_URL, DEFAULT_REQUEST_TIMEOUT_SECS};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, info};

const API_KEY_HEADER: &str = "x-cg-demo-api-key";
const SIMPLE_PRICE_PATH: &str = "/simple/price";

/// One entry of the `/simple/price` response.
/// `{ "bitcoin": { "usd": 1.0, "usd_market_cap": 2.0, "usd_24h_change": -0.5 } }`
#[derive(Debug, Deserialize)]
struct SimplePriceEntry {
    usd: Option<f64>,
    usd_market_cap: Option<f64>,
    usd_24h_change: Option<f64>,
}

type SimplePriceResponse = HashMap<String, SimplePriceEntry>;

/// Client for CoinGecko's `/simple/price` endpoint.
pub struct CoinGeckoClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl CoinGeckoClient {
    /// Client for the public API with default timeout and no API key.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_options(
            DEFAULT_API_BASE_URL,
            None,
            Duration::from_secs(DEFAULT_REQUEST_TIMEOUT_SECS),
        )
    }

    /// Client for `base_url` (e.g. a proxy or the pro API), optional demo key and timeout.
    pub fn with_options(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent("crypto-tracker/0.1")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
        })
    }

    /// Base URL with any trailing slash removed.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn fetch_once(&self, asset_keys: &[String]) -> Result<QuoteBatch, FetchError> {
        let url = format!("{}{}", self.base_url, SIMPLE_PRICE_PATH);
        let ids = asset_keys.join(",");
        let params = [
            ("ids", ids.as_str()),
            ("vs_currencies", "usd"),
            ("include_market_cap", "true"),
            ("include_24hr_change", "true"),
        ];

        info!("Calling CoinGecko API: {} (ids={})", url, ids);

        let mut request = self.client.get(&url).query(&params);
        if let Some(key) = &self.api_key {
            request = request.header(API_KEY_HEADER, key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.bytes().await?;
        parse_simple_price(&body, asset_keys)
    }
}

/// Decode a `/simple/price` body into a batch covering exactly `asset_keys`.
///
/// Any missing asset or missing/non-finite field fails the whole batch.
pub fn parse_simple_price(body: &[u8], asset_keys: &[String]) -> Result<QuoteBatch, FetchError> {
    let parsed: SimplePriceResponse = serde_json::from_slice(body)?;

    let mut batch = QuoteBatch::with_capacity(asset_keys.len());
    for key in asset_keys {
        let entry = parsed
            .get(key)
            .ok_or_else(|| FetchError::MissingAsset(key.clone()))?;

        let quote = Quote {
            price: require_field(key, "usd", entry.usd)?,
            market_cap: require_field(key, "usd_market_cap", entry.usd_market_cap)?,
            change_24h: require_field(key, "usd_24h_change", entry.usd_24h_change)?,
        };
        debug!("{}: ${:.2}", key, quote.price);
        batch.insert(key.clone(), quote);
    }

    Ok(batch)
}

fn require_field(asset: &str, field: &'static str, value: Option<f64>) -> Result<f64, FetchError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(FetchError::InvalidField {
            asset: asset.to_string(),
            field,
        }),
    }
}

#[async_trait]
impl QuoteFetcher for CoinGeckoClient {
    async fn fetch_quotes(&self, asset_keys: &[String]) -> Result<QuoteBatch, FetchError> {
        self.fetch_once(asset_keys).await
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys() -> Vec<String> {
        vec!["bitcoin".into(), "matic-network".into(), "ethereum".into()]
    }

    const FULL_BODY: &str = r#"{
        "bitcoin": {"usd": 43000.5, "usd_market_cap": 842000000000.0, "usd_24h_change": 1.5},
        "matic-network": {"usd": 0.81, "usd_market_cap": 7500000000.0, "usd_24h_change": -3.2},
        "ethereum": {"usd": 2300.0, "usd_market_cap": 276000000000.0, "usd_24h_change": 0.0}
    }"#;

    #[test]
    fn test_parse_full_response() {
        let batch = parse_simple_price(FULL_BODY.as_bytes(), &keys()).unwrap();

        assert_eq!(batch.len(), 3);
        assert_eq!(
            batch["matic-network"],
            Quote {
                price: 0.81,
                market_cap: 7500000000.0,
                change_24h: -3.2,
            }
        );
        assert_eq!(batch["bitcoin"].price, 43000.5);
    }

    #[test]
    fn test_parse_ignores_unrequested_assets() {
        let only_btc = vec!["bitcoin".to_string()];
        let batch = parse_simple_price(FULL_BODY.as_bytes(), &only_btc).unwrap();
        assert_eq!(batch.len(), 1);
        assert!(batch.contains_key("bitcoin"));
    }

    #[test]
    fn test_parse_rejects_partial_payload() {
        let body = r#"{"bitcoin": {"usd": 1.0, "usd_market_cap": 2.0, "usd_24h_change": 3.0}}"#;
        let err = parse_simple_price(body.as_bytes(), &keys()).unwrap_err();
        assert!(matches!(err, FetchError::MissingAsset(key) if key == "matic-network"));
    }

    #[test]
    fn test_parse_rejects_null_field() {
        let body = r#"{"bitcoin": {"usd": 1.0, "usd_market_cap": null, "usd_24h_change": 3.0}}"#;
        let err = parse_simple_price(body.as_bytes(), &["bitcoin".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            FetchError::InvalidField { field: "usd_market_cap", .. }
        ));
    }

    #[test]
    fn test_parse_rejects_missing_field() {
        let body = r#"{"bitcoin": {"usd": 1.0, "usd_market_cap": 2.0}}"#;
        let err = parse_simple_price(body.as_bytes(), &["bitcoin".to_string()]).unwrap_err();
        assert!(matches!(
            err,
            FetchError::InvalidField { field: "usd_24h_change", .. }
        ));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = parse_simple_price(b"<html>rate limited</html>", &keys()).unwrap_err();
        assert!(matches!(err, FetchError::Decode(_)));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = CoinGeckoClient::with_options(
            "http://localhost:9000/api/v3/",
            None,
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(client.base_url(), "http://localhost:9000/api/v3");
        assert_eq!(client.name(), "coingecko");
    }

    // Hits the real API; run manually.
    #[tokio::test]
    #[ignore]
    async fn test_real_coingecko_api() {
        let client = CoinGeckoClient::new().unwrap();
        match client.fetch_quotes(&keys()).await {
            Ok(batch) => {
                assert_eq!(batch.len(), 3);
                println!("Real BTC price from CoinGecko: ${:.2}", batch["bitcoin"].price);
            }
            Err(e) => println!("CoinGecko API call failed (may be rate limited): {}", e),
        }
    }
}
