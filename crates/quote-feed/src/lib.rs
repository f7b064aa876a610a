pub mod coingecko;

pub use coingecko::CoinGeckoClient;
pub use crypto_tracker_common::{Quote, QuoteBatch};

use async_trait::async_trait;
use thiserror::Error;

/// Failure of a whole fetch. Partial batches are never returned.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upstream returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode upstream response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Upstream response is missing asset: {0}")]
    MissingAsset(String),

    #[error("Upstream response has no usable {field} for {asset}")]
    InvalidField { asset: String, field: &'static str },
}

/// Quote source interface.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    /// Fetch quotes for every key in `asset_keys` in one request.
    async fn fetch_quotes(&self, asset_keys: &[String]) -> Result<QuoteBatch, FetchError>;

    /// Name of the source, for logs.
    fn name(&self) -> &str;
}
