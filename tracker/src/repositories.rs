use crypto_tracker_common::{Asset, Snapshot};
use std::collections::{BTreeMap, HashMap, VecDeque};
use tokio::sync::RwLock;

/// Bounded FIFO of recent prices, oldest first.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceHistory {
    prices: VecDeque<f64>,
    capacity: usize,
}

impl PriceHistory {
    /// Empty history holding at most `capacity` prices.
    pub fn new(capacity: usize) -> Self {
        Self {
            prices: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a price, evicting the oldest one when full.
    pub fn push(&mut self, price: f64) {
        if self.prices.len() >= self.capacity {
            self.prices.pop_front();
        }
        self.prices.push_back(price);
    }

    /// Number of prices held.
    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    /// Maximum number of prices held.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Prices oldest first.
    pub fn to_vec(&self) -> Vec<f64> {
        self.prices.iter().copied().collect()
    }
}

/// One asset's worth of a successful fetch, ready to apply.
#[derive(Debug, Clone, PartialEq)]
pub struct AssetUpdate {
    pub snapshot: Snapshot,
    pub price: f64,
}

#[derive(Debug)]
struct MarketData {
    snapshots: HashMap<String, Snapshot>,
    histories: HashMap<String, PriceHistory>,
}

/// Process-scoped market state: latest snapshot and price history per asset.
///
/// Both maps sit behind a single lock so a batch is applied atomically.
#[derive(Debug)]
pub struct MarketStore {
    assets: Vec<Asset>,
    data: RwLock<MarketData>,
}

impl MarketStore {
    /// Empty store for `assets`, each with a history bounded by `history_capacity`.
    pub fn new(assets: Vec<Asset>, history_capacity: usize) -> Self {
        let histories = assets
            .iter()
            .map(|a| (a.key.clone(), PriceHistory::new(history_capacity)))
            .collect();

        Self {
            assets,
            data: RwLock::new(MarketData {
                snapshots: HashMap::new(),
                histories,
            }),
        }
    }

    /// Configured assets in configuration order.
    pub fn assets(&self) -> &[Asset] {
        &self.assets
    }

    /// Configured asset by key.
    pub fn asset(&self, key: &str) -> Option<&Asset> {
        self.assets.iter().find(|a| a.key == key)
    }

    /// Whether `key` names a configured asset.
    pub fn is_configured(&self, key: &str) -> bool {
        self.asset(key).is_some()
    }

    /// Replace snapshots and extend histories for every update in one critical section.
    /// Updates for unconfigured keys are ignored.
    pub async fn apply_batch(&self, updates: Vec<AssetUpdate>) {
        let mut data = self.data.write().await;
        for update in updates {
            let key = update.snapshot.coin_id.clone();
            let Some(history) = data.histories.get_mut(&key) else {
                continue;
            };
            history.push(update.price);
            data.snapshots.insert(key, update.snapshot);
        }
    }

    /// All present snapshots, ordered by key.
    pub async fn snapshots(&self) -> BTreeMap<String, Snapshot> {
        let data = self.data.read().await;
        data.snapshots
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    /// Latest snapshot for `key`, if one has been applied.
    pub async fn snapshot(&self, key: &str) -> Option<Snapshot> {
        self.data.read().await.snapshots.get(key).cloned()
    }

    /// Prices currently held for `key`, oldest first. Empty for unknown keys.
    pub async fn prices(&self, key: &str) -> Vec<f64> {
        self.data
            .read()
            .await
            .histories
            .get(key)
            .map(PriceHistory::to_vec)
            .unwrap_or_default()
    }

    /// Number of prices held for `key`; zero for unknown keys.
    pub async fn history_len(&self, key: &str) -> usize {
        self.data
            .read()
            .await
            .histories
            .get(key)
            .map_or(0, PriceHistory::len)
    }
}
