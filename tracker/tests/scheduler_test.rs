use async_trait::async_trait;
use crypto_tracker::{MarketStore, Scheduler, UpdateCycle};
use crypto_tracker_common::{Asset, Quote};
use quote_feed::{FetchError, QuoteBatch, QuoteFetcher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TWO_HOURS: Duration = Duration::from_secs(2 * 60 * 60);

/// Counts calls; every odd call fails.
struct FlakySource {
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl QuoteFetcher for FlakySource {
    async fn fetch_quotes(&self, asset_keys: &[String]) -> Result<QuoteBatch, FetchError> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if n % 2 == 1 {
            return Err(FetchError::MissingAsset("bitcoin".into()));
        }
        Ok(asset_keys
            .iter()
            .map(|k| {
                (
                    k.clone(),
                    Quote {
                        price: n as f64,
                        market_cap: 1.0,
                        change_24h: 0.0,
                    },
                )
            })
            .collect())
    }

    fn name(&self) -> &str {
        "flaky"
    }
}

fn setup() -> (Arc<UpdateCycle>, Arc<MarketStore>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let store = Arc::new(MarketStore::new(Asset::default_set(), 100));
    let cycle = Arc::new(UpdateCycle::new(
        Arc::new(FlakySource {
            calls: calls.clone(),
        }),
        store.clone(),
    ));
    (cycle, store, calls)
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_ticks_every_interval_and_survives_failures() {
    // Given
    let (cycle, store, calls) = setup();
    let handle = Scheduler::new(cycle, TWO_HOURS)
        .unwrap()
        .fetch_on_startup(true)
        .spawn();

    // When - startup fetch (fails)
    tokio::time::sleep(Duration::from_secs(1)).await;

    // Then
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(store.snapshots().await.is_empty());

    // When - first tick (succeeds)
    tokio::time::sleep(TWO_HOURS).await;
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.prices("bitcoin").await, vec![2.0]);

    // When - two more ticks (fail, succeed)
    tokio::time::sleep(TWO_HOURS * 2).await;
    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(store.prices("bitcoin").await, vec![2.0, 4.0]);

    handle.abort();
}

#[tokio::test(start_paused = true)]
async fn test_scheduler_without_startup_fetch_waits_for_first_tick() {
    let (cycle, _store, calls) = setup();
    let handle = Scheduler::new(cycle, TWO_HOURS).unwrap().spawn();

    tokio::time::sleep(TWO_HOURS - Duration::from_secs(1)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 0);

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    handle.abort();
}

#[tokio::test]
async fn test_trigger_runs_on_demand() {
    let (cycle, store, calls) = setup();
    let scheduler = Scheduler::new(cycle, TWO_HOURS).unwrap();

    scheduler.trigger().await.unwrap();
    scheduler.trigger().await.unwrap();

    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(store.prices("ethereum").await, vec![2.0]);
}
