use crate::repositories::{AssetUpdate, MarketStore};
use chrono::{DateTime, Utc};
use crypto_tracker_common::{QuoteBatch, Snapshot, TrackerConfig};
use quote_feed::{FetchError, QuoteFetcher};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

/// Outcome of a successful update cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateReport {
    pub assets_updated: usize,
    pub updated_at: DateTime<Utc>,
}

/// One fetch-and-apply pass over every configured asset.
pub struct UpdateCycle {
    fetcher: Arc<dyn QuoteFetcher>,
    store: Arc<MarketStore>,
    asset_keys: Vec<String>,
}

impl UpdateCycle {
    pub fn new(fetcher: Arc<dyn QuoteFetcher>, store: Arc<MarketStore>) -> Self {
        let asset_keys = store.assets().iter().map(|a| a.key.clone()).collect();
        Self {
            fetcher,
            store,
            asset_keys,
        }
    }

    /// Fetch quotes and, only if every asset resolved, apply them as one batch.
    ///
    /// On failure nothing is mutated. The error is logged here; scheduled
    /// callers drop it.
    pub async fn run_update(&self) -> Result<UpdateReport, FetchError> {
        info!(
            "Fetching cryptocurrency data from {} ({} assets)",
            self.fetcher.name(),
            self.asset_keys.len()
        );

        match self.fetch_and_apply().await {
            Ok(report) => {
                info!(
                    "Crypto data updated successfully ({} assets)",
                    report.assets_updated
                );
                Ok(report)
            }
            Err(e) => {
                error!("Error fetching crypto data: {}", e);
                Err(e)
            }
        }
    }

    async fn fetch_and_apply(&self) -> Result<UpdateReport, FetchError> {
        let batch = self.fetcher.fetch_quotes(&self.asset_keys).await?;

        let updated_at = Utc::now();
        let updates = self.build_updates(&batch, updated_at)?;
        let assets_updated = updates.len();

        self.store.apply_batch(updates).await;

        Ok(UpdateReport {
            assets_updated,
            updated_at,
        })
    }

    fn build_updates(
        &self,
        batch: &QuoteBatch,
        updated_at: DateTime<Utc>,
    ) -> Result<Vec<AssetUpdate>, FetchError> {
        self.store
            .assets()
            .iter()
            .map(|asset| {
                let quote = batch
                    .get(&asset.key)
                    .ok_or_else(|| FetchError::MissingAsset(asset.key.clone()))?;
                Ok(AssetUpdate {
                    snapshot: Snapshot::from_quote(asset, quote, updated_at),
                    price: quote.price,
                })
            })
            .collect()
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum SchedulerError {
    #[error("update interval must be greater than zero")]
    ZeroInterval,
}

/// Fixed-interval trigger for [`UpdateCycle::run_update`].
///
/// Each run is spawned and not awaited, so a slow fetch never delays the next tick.
pub struct Scheduler {
    cycle: Arc<UpdateCycle>,
    interval: Duration,
    align_to_interval: bool,
    fetch_on_startup: bool,
}

impl Scheduler {
    /// Unaligned scheduler without a startup fetch. `interval` must be non-zero.
    pub fn new(cycle: Arc<UpdateCycle>, interval: Duration) -> Result<Self, SchedulerError> {
        if interval.is_zero() {
            return Err(SchedulerError::ZeroInterval);
        }
        Ok(Self {
            cycle,
            interval,
            align_to_interval: false,
            fetch_on_startup: false,
        })
    }

    pub fn from_config(
        cycle: Arc<UpdateCycle>,
        config: &TrackerConfig,
    ) -> Result<Self, SchedulerError> {
        Ok(Self::new(cycle, config.update_interval())?
            .align_to_interval(config.align_to_interval)
            .fetch_on_startup(config.fetch_on_startup))
    }

    pub fn align_to_interval(mut self, align: bool) -> Self {
        self.align_to_interval = align;
        self
    }

    pub fn fetch_on_startup(mut self, enabled: bool) -> Self {
        self.fetch_on_startup = enabled;
        self
    }

    /// Delay from `now` until the first scheduled tick.
    ///
    /// Aligned schedules fire on the next UTC multiple of the interval
    /// (00:00, 02:00, ... for two hours).
    pub fn first_tick_delay(&self, now: DateTime<Utc>) -> Duration {
        if !self.align_to_interval {
            return self.interval;
        }

        let period_ms = self.interval.as_millis().max(1);
        let now_ms = now.timestamp_millis().max(0) as u128;
        let remaining = period_ms - now_ms % period_ms;
        Duration::from_millis(remaining as u64)
    }

    /// Run one update in the background.
    pub fn trigger(&self) -> JoinHandle<()> {
        let cycle = self.cycle.clone();
        tokio::spawn(async move {
            // Failures are already logged; the next tick retries.
            let _ = cycle.run_update().await;
        })
    }

    pub async fn run(self) {
        if self.fetch_on_startup {
            info!("Running startup fetch");
            self.trigger();
        }

        let delay = self.first_tick_delay(Utc::now());
        info!(
            "Scheduler started: every {}s, first tick in {}s",
            self.interval.as_secs(),
            delay.as_secs()
        );

        let mut ticker = interval_at(Instant::now() + delay, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            info!("Running scheduled job: Fetching cryptocurrency data");
            self.trigger();
        }
    }

    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }
}
