use crate::repositories::MarketStore;
use crate::statistics;
use crypto_tracker_common::{DeviationView, InvalidAssetError, Snapshot, StatsView};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Read-only accessors over the market store.
#[derive(Clone)]
pub struct QueryService {
    store: Arc<MarketStore>,
}

impl QueryService {
    /// Read-only query layer over `store`.
    pub fn new(store: Arc<MarketStore>) -> Self {
        Self { store }
    }

    /// Current snapshot per asset; assets never fetched are omitted.
    pub async fn get_snapshot(&self) -> BTreeMap<String, Snapshot> {
        self.store.snapshots().await
    }

    /// Price, market cap and 24h change from the asset's latest snapshot.
    pub async fn get_stats(&self, asset_key: &str) -> Result<StatsView, InvalidAssetError> {
        self.ensure_configured(asset_key)?;

        self.store
            .snapshot(asset_key)
            .await
            .map(|s| StatsView::from(&s))
            .ok_or_else(|| InvalidAssetError::NoSnapshot(asset_key.to_string()))
    }

    /// Population standard deviation of the asset's price history, rounded to 2dp.
    pub async fn get_deviation(&self, asset_key: &str) -> Result<DeviationView, InvalidAssetError> {
        self.ensure_configured(asset_key)?;

        let prices = self.store.prices(asset_key).await;
        statistics::deviation(&prices)
            .map(|deviation| DeviationView { deviation })
            .ok_or_else(|| InvalidAssetError::NoHistory(asset_key.to_string()))
    }

    fn ensure_configured(&self, asset_key: &str) -> Result<(), InvalidAssetError> {
        if self.store.is_configured(asset_key) {
            Ok(())
        } else {
            Err(InvalidAssetError::Unknown(asset_key.to_string()))
        }
    }
}
