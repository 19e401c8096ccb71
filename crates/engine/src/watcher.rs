//! Periodic evaluation of the alert book against live quotes.

use crate::error::EngineError;
use crate::notify::Notify;
use crate::store::JsonStore;
use coinwatch_core::{Alert, AlertBook};
use coinwatch_feeds::PriceSource;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Watcher timing.
#[derive(Debug, Clone)]
pub struct WatcherConfig {
    /// Delay before the first cycle.
    pub initial_delay: Duration,
    /// Interval between cycle starts.
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            poll_interval: Duration::from_secs(15),
        }
    }
}

/// What a single cycle did, for logging and tests.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Alerts whose condition was satisfied (all were removed).
    pub triggered: usize,
    /// Notifications that failed to deliver; their alerts were removed
    /// regardless, delivery is at-most-once.
    pub delivery_failures: usize,
}

/// The recurring price evaluation task.
pub struct PriceWatcher {
    alerts: Arc<JsonStore<AlertBook>>,
    source: Arc<dyn PriceSource>,
    notifier: Arc<dyn Notify>,
    config: WatcherConfig,
}

impl PriceWatcher {
    pub fn new(
        alerts: Arc<JsonStore<AlertBook>>,
        source: Arc<dyn PriceSource>,
        notifier: Arc<dyn Notify>,
        config: WatcherConfig,
    ) -> Self {
        Self {
            alerts,
            source,
            notifier,
            config,
        }
    }

    /// Run one evaluation cycle.
    ///
    /// Loads the book once, quotes every referenced asset in one
    /// batched call, fires at most one notification per satisfied alert
    /// and writes the reduced book back in a single replace. An empty
    /// book skips the external call entirely; a failed quote fetch
    /// aborts the cycle before any mutation, so alerts are never lost
    /// to a transient outage. Alerts whose asset has no quote in the
    /// response are left in place for a future cycle.
    pub async fn run_cycle(&self) -> Result<CycleReport, EngineError> {
        let _guard = self.alerts.lock().await;
        let book = self.alerts.load().await;
        if book.is_empty() {
            return Ok(CycleReport::default());
        }

        let coins = book.distinct_coins();
        let quotes = self.source.lookup(&coins).await?;
        debug!(coins = coins.len(), quotes = quotes.len(), "evaluating alerts");

        let mut report = CycleReport::default();
        let mut reduced = AlertBook::default();
        for (user_id, alerts) in &book.users {
            let mut kept = Vec::with_capacity(alerts.len());
            for alert in alerts {
                let Some(&quote) = quotes.get(alert.coin.as_str()) else {
                    kept.push(alert.clone());
                    continue;
                };
                if !alert.is_triggered(quote) {
                    kept.push(alert.clone());
                    continue;
                }

                report.triggered += 1;
                info!(
                    user = %user_id,
                    symbol = %alert.symbol,
                    threshold = alert.price,
                    quote,
                    "alert triggered"
                );
                let text = trigger_message(alert, quote);
                if let Err(e) = self.notifier.notify(user_id, &text).await {
                    report.delivery_failures += 1;
                    warn!(user = %user_id, error = %e, "alert notification failed");
                }
            }
            if !kept.is_empty() {
                reduced.users.insert(user_id.clone(), kept);
            }
        }

        self.alerts.save(&reduced).await?;
        Ok(report)
    }

    /// Drive cycles on the configured interval until `shutdown` flips.
    ///
    /// A cycle that has started always runs to completion; shutdown is
    /// only observed between cycles, so the book is never left half
    /// evaluated.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.poll_interval.as_secs(),
            "price watcher started"
        );
        tokio::time::sleep(self.config.initial_delay).await;

        let mut ticker = tokio::time::interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle().await {
                        Ok(report) if report.triggered > 0 => {
                            info!(
                                triggered = report.triggered,
                                delivery_failures = report.delivery_failures,
                                "evaluation cycle complete"
                            );
                        }
                        Ok(_) => {}
                        Err(e) => warn!(error = %e, "evaluation cycle aborted"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("price watcher stopped");
                    return;
                }
            }
        }
    }
}

/// One-shot trigger notification text.
fn trigger_message(alert: &Alert, quote: f64) -> String {
    format!(
        "🚨 {} ${:.2} hit {} ${}!",
        alert.symbol.to_uppercase(),
        quote,
        alert.direction,
        alert.price
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{temp_path, FakeNotifier, FakeSource};
    use coinwatch_core::Direction;
    use pretty_assertions::assert_eq;

    fn alert(coin: &str, price: f64, direction: Direction) -> Alert {
        Alert {
            coin: coin.into(),
            symbol: coin[..3.min(coin.len())].into(),
            price,
            direction,
        }
    }

    struct Fixture {
        watcher: PriceWatcher,
        store: Arc<JsonStore<AlertBook>>,
        notifier: Arc<FakeNotifier>,
    }

    async fn fixture(name: &str, book: AlertBook, source: FakeSource, notifier: FakeNotifier) -> Fixture {
        let store = Arc::new(JsonStore::new(temp_path(name), AlertBook::default()));
        store.save(&book).await.unwrap();
        let notifier = Arc::new(notifier);
        let watcher = PriceWatcher::new(
            store.clone(),
            Arc::new(source),
            notifier.clone(),
            WatcherConfig::default(),
        );
        Fixture {
            watcher,
            store,
            notifier,
        }
    }

    #[tokio::test]
    async fn test_trigger_notifies_once_and_removes() {
        let mut book = AlertBook::default();
        book.push("u1", alert("bitcoin", 100_000.0, Direction::Above));
        let fx = fixture(
            "watch-trigger",
            book,
            FakeSource::with_quote("bitcoin", 100_000.0),
            FakeNotifier::default(),
        )
        .await;

        let report = fx.watcher.run_cycle().await.unwrap();
        assert_eq!(report.triggered, 1);
        assert_eq!(report.delivery_failures, 0);
        assert!(fx.store.load().await.is_empty());

        let deliveries = fx.notifier.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert_eq!(deliveries[0].0, "u1");
        assert!(deliveries[0].1.contains("BIT $100000.00 hit above $100000"));

        // Same quotes again: the alert is gone, nothing fires.
        let report = fx.watcher.run_cycle().await.unwrap();
        assert_eq!(report.triggered, 0);
        assert_eq!(fx.notifier.deliveries().len(), 1);
    }

    #[tokio::test]
    async fn test_unsatisfied_cycles_are_byte_for_byte_idempotent() {
        let mut book = AlertBook::default();
        book.push("u1", alert("bitcoin", 1_000_000.0, Direction::Above));
        let fx = fixture(
            "watch-idempotent",
            book,
            FakeSource::with_quote("bitcoin", 50_000.0),
            FakeNotifier::default(),
        )
        .await;

        fx.watcher.run_cycle().await.unwrap();
        let first = tokio::fs::read(fx.store_path()).await.unwrap();
        fx.watcher.run_cycle().await.unwrap();
        let second = tokio::fs::read(fx.store_path()).await.unwrap();

        assert_eq!(first, second);
        assert!(fx.notifier.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_missing_quote_leaves_alert_untouched() {
        let mut book = AlertBook::default();
        book.push("u1", alert("bitcoin", 10.0, Direction::Above));
        book.push("u1", alert("ethereum", 10.0, Direction::Above));
        let fx = fixture(
            "watch-partial",
            book,
            FakeSource::with_quote("bitcoin", 50.0),
            FakeNotifier::default(),
        )
        .await;

        let report = fx.watcher.run_cycle().await.unwrap();
        assert_eq!(report.triggered, 1);

        let remaining = fx.store.load().await;
        assert_eq!(remaining.user_alerts("u1").len(), 1);
        assert_eq!(remaining.user_alerts("u1")[0].coin.as_str(), "ethereum");
    }

    #[tokio::test]
    async fn test_fetch_failure_aborts_without_mutation() {
        let mut book = AlertBook::default();
        book.push("u1", alert("bitcoin", 10.0, Direction::Above));
        let fx = fixture(
            "watch-outage",
            book.clone(),
            FakeSource::failing(),
            FakeNotifier::default(),
        )
        .await;

        let err = fx.watcher.run_cycle().await;
        assert!(matches!(err, Err(EngineError::Upstream(_))));
        assert_eq!(fx.store.load().await, book);
        assert!(fx.notifier.deliveries().is_empty());
    }

    #[tokio::test]
    async fn test_empty_book_skips_the_source() {
        // A failing source proves the lookup is never attempted.
        let fx = fixture(
            "watch-empty",
            AlertBook::default(),
            FakeSource::failing(),
            FakeNotifier::default(),
        )
        .await;

        let report = fx.watcher.run_cycle().await.unwrap();
        assert_eq!(report, CycleReport::default());
    }

    #[tokio::test]
    async fn test_failed_delivery_still_removes_the_alert() {
        let mut book = AlertBook::default();
        book.push("u1", alert("bitcoin", 10.0, Direction::Above));
        let fx = fixture(
            "watch-delivery-failure",
            book,
            FakeSource::with_quote("bitcoin", 50.0),
            FakeNotifier::failing(),
        )
        .await;

        let report = fx.watcher.run_cycle().await.unwrap();
        assert_eq!(report.triggered, 1);
        assert_eq!(report.delivery_failures, 1);
        assert!(fx.store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_below_direction_triggers_at_or_under_threshold() {
        let mut book = AlertBook::default();
        book.push("u1", alert("bitcoin", 50_000.0, Direction::Below));
        book.push("u2", alert("bitcoin", 10_000.0, Direction::Below));
        let fx = fixture(
            "watch-below",
            book,
            FakeSource::with_quote("bitcoin", 45_000.0),
            FakeNotifier::default(),
        )
        .await;

        let report = fx.watcher.run_cycle().await.unwrap();
        assert_eq!(report.triggered, 1);

        let remaining = fx.store.load().await;
        assert!(remaining.user_alerts("u1").is_empty());
        assert_eq!(remaining.user_alerts("u2").len(), 1);
    }

    impl Fixture {
        fn store_path(&self) -> std::path::PathBuf {
            self.store.path().to_path_buf()
        }
    }
}
