use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A tracked cryptocurrency: stable key used upstream plus a display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub key: String,
    pub name: String,
}

impl Asset {
    pub fn new(key: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
        }
    }

    pub fn bitcoin() -> Self {
        Self::new("bitcoin", "Bitcoin")
    }

    pub fn matic() -> Self {
        Self::new("matic-network", "Matic")
    }

    pub fn ethereum() -> Self {
        Self::new("ethereum", "Ethereum")
    }

    /// The three assets the tracker ships with.
    pub fn default_set() -> Vec<Asset> {
        vec![Self::bitcoin(), Self::matic(), Self::ethereum()]
    }
}

/// One upstream quote, in the source's native (USD) units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub price: f64,
    pub market_cap: f64,
    pub change_24h: f64,
}

/// Quotes keyed by asset key, as returned by a single fetch.
pub type QuoteBatch = HashMap<String, Quote>;

/// Latest known market data for one asset. Always fully populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(rename = "coinId")]
    pub coin_id: String,
    pub name: String,
    pub current_price: f64,
    pub market_cap: f64,
    pub change_24h: f64,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn from_quote(asset: &Asset, quote: &Quote, updated_at: DateTime<Utc>) -> Self {
        Self {
            coin_id: asset.key.clone(),
            name: asset.name.clone(),
            current_price: quote.price,
            market_cap: quote.market_cap,
            change_24h: quote.change_24h,
            updated_at,
        }
    }
}

/// `GET /stats` payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatsView {
    pub price: f64,
    #[serde(rename = "marketCap")]
    pub market_cap: f64,
    #[serde(rename = "24hChange")]
    pub change_24h: f64,
}

impl From<&Snapshot> for StatsView {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            price: snapshot.current_price,
            market_cap: snapshot.market_cap,
            change_24h: snapshot.change_24h,
        }
    }
}

/// `GET /deviation` payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DeviationView {
    pub deviation: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_default_asset_set() {
        let keys: Vec<String> = Asset::default_set().into_iter().map(|a| a.key).collect();
        assert_eq!(keys, vec!["bitcoin", "matic-network", "ethereum"]);
    }

    #[test]
    fn test_snapshot_wire_names() {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 4, 0, 0).unwrap();
        let quote = Quote {
            price: 42000.5,
            market_cap: 8.2e11,
            change_24h: -1.25,
        };
        let snapshot = Snapshot::from_quote(&Asset::bitcoin(), &quote, ts);

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["coinId"], "bitcoin");
        assert_eq!(json["name"], "Bitcoin");
        assert_eq!(json["current_price"], 42000.5);
        assert_eq!(json["market_cap"], 8.2e11);
        assert_eq!(json["change_24h"], -1.25);
        assert_eq!(json["updated_at"], "2024-01-02T04:00:00Z");
    }

    #[test]
    fn test_stats_view_wire_names() {
        let stats = StatsView {
            price: 1.0,
            market_cap: 2.0,
            change_24h: -3.0,
        };
        let json = serde_json::to_value(stats).unwrap();
        assert_eq!(json, serde_json::json!({"price": 1.0, "marketCap": 2.0, "24hChange": -3.0}));
    }
}
