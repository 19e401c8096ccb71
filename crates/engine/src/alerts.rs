//! Alert lifecycle: create, list and remove a user's price alerts.
//!
//! Alerts have no update-in-place: changing a threshold is a remove
//! followed by a fresh add. The evaluation loop in [`crate::watcher`]
//! is the only other writer of the alert book.

use crate::error::EngineError;
use crate::registry::AssetRegistry;
use crate::store::JsonStore;
use coinwatch_core::{AccessRoot, Alert, AlertBook, Direction, SymbolMap};
use std::sync::Arc;
use tracing::info;

/// Create/list/remove operations over the persisted alert book.
pub struct AlertService {
    alerts: Arc<JsonStore<AlertBook>>,
    access: Arc<JsonStore<AccessRoot>>,
    registry: Arc<AssetRegistry>,
}

impl AlertService {
    pub fn new(
        alerts: Arc<JsonStore<AlertBook>>,
        access: Arc<JsonStore<AccessRoot>>,
        registry: Arc<AssetRegistry>,
    ) -> Self {
        Self {
            alerts,
            access,
            registry,
        }
    }

    /// Append a new alert for `caller`.
    ///
    /// The threshold accepts any parseable float, negative and zero
    /// included; the source system behaves the same way and the
    /// looseness is kept as observed behavior. An unrecognized
    /// direction word silently means `above`.
    pub async fn add(
        &self,
        caller: &str,
        symbol: &str,
        price: &str,
        direction: Option<&str>,
    ) -> Result<Alert, EngineError> {
        let access = self.access.load().await;
        if !access.has_account(caller) {
            return Err(EngineError::NotAuthorized);
        }

        let symbol = SymbolMap::normalize(symbol);
        let coin = self
            .registry
            .resolve(&symbol)
            .ok_or_else(|| EngineError::UnknownAsset(symbol.to_string()))?;
        if !access.is_entitled(caller, &symbol) {
            return Err(EngineError::Forbidden(symbol.into()));
        }

        let price: f64 = price
            .trim()
            .parse()
            .map_err(|_| EngineError::InvalidPrice(price.to_string()))?;
        let alert = Alert {
            coin,
            symbol,
            price,
            direction: Direction::parse_or_default(direction),
        };

        let _guard = self.alerts.lock().await;
        let mut book = self.alerts.load().await;
        book.push(caller, alert.clone());
        self.alerts.save(&book).await?;

        info!(
            user = caller,
            symbol = %alert.symbol,
            price = alert.price,
            direction = %alert.direction,
            "alert added"
        );
        Ok(alert)
    }

    /// The caller's alerts in creation order (1-based for display).
    pub async fn list(&self, caller: &str) -> Result<Vec<Alert>, EngineError> {
        let access = self.access.load().await;
        if !access.has_account(caller) {
            return Err(EngineError::NotAuthorized);
        }
        let book = self.alerts.load().await;
        Ok(book.user_alerts(caller).to_vec())
    }

    /// Remove the caller's alert at 1-based `position`.
    ///
    /// Bounds are checked against the sequence as currently persisted,
    /// not against whatever listing the caller last saw; an alert the
    /// watcher resolved in between shifts the numbering, and the last
    /// committed write wins.
    pub async fn remove(&self, caller: &str, position: &str) -> Result<Alert, EngineError> {
        let access = self.access.load().await;
        if !access.has_account(caller) {
            return Err(EngineError::NotAuthorized);
        }

        let position: usize = position
            .trim()
            .parse()
            .map_err(|_| EngineError::InvalidPosition(position.to_string()))?;

        let _guard = self.alerts.lock().await;
        let mut book = self.alerts.load().await;
        let removed = position
            .checked_sub(1)
            .and_then(|index| book.remove_at(caller, index))
            .ok_or_else(|| EngineError::InvalidPosition(position.to_string()))?;
        self.alerts.save(&book).await?;

        info!(user = caller, symbol = %removed.symbol, "alert removed");
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{temp_path, FakeSource};
    use coinwatch_core::UserAccount;
    use pretty_assertions::assert_eq;

    const OWNER: &str = "owner-1";

    async fn service() -> AlertService {
        let access_store = Arc::new(JsonStore::new(
            temp_path("alerts-access"),
            AccessRoot::new(OWNER),
        ));
        let mut root = AccessRoot::new(OWNER);
        root.users
            .insert("u1".to_string(), UserAccount::seeded("alice"));
        access_store.save(&root).await.unwrap();

        let registry = Arc::new(
            AssetRegistry::open(
                Arc::new(JsonStore::new(
                    temp_path("alerts-symbols"),
                    SymbolMap::seeded(),
                )),
                access_store.clone(),
                Arc::new(FakeSource::default()),
            )
            .await,
        );
        AlertService::new(
            Arc::new(JsonStore::new(temp_path("alerts-book"), AlertBook::default())),
            access_store,
            registry,
        )
    }

    #[tokio::test]
    async fn test_add_list_remove_round_trip() {
        let svc = service().await;

        let added = svc.add("u1", "btc", "100000", Some("above")).await.unwrap();
        assert_eq!(added.coin.as_str(), "bitcoin");
        assert_eq!(added.price, 100000.0);
        assert_eq!(added.direction, Direction::Above);

        let listed = svc.list("u1").await.unwrap();
        assert_eq!(listed, vec![added.clone()]);

        let removed = svc.remove("u1", "1").await.unwrap();
        assert_eq!(removed, added);
        assert!(svc.list("u1").await.unwrap().is_empty());

        // The emptied user key is gone from the persisted book.
        assert!(!svc.alerts.load().await.users.contains_key("u1"));
    }

    #[tokio::test]
    async fn test_add_requires_account() {
        let svc = service().await;
        let err = svc.add("stranger", "btc", "1", None).await;
        assert!(matches!(err, Err(EngineError::NotAuthorized)));
        assert!(svc.alerts.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_add_requires_symbol_entitlement() {
        let svc = service().await;

        let err = svc.add("u1", "eth", "1", None).await;
        assert!(matches!(err, Err(EngineError::Forbidden(_))));
        assert!(svc.alerts.load().await.is_empty());

        // The owner is entitled to every registered symbol.
        svc.add(OWNER, "eth", "1", None).await.unwrap();
    }

    #[tokio::test]
    async fn test_add_rejects_unknown_symbol_before_entitlement() {
        let svc = service().await;
        let err = svc.add("u1", "zzz", "1", None).await;
        assert!(matches!(err, Err(EngineError::UnknownAsset(_))));
    }

    #[tokio::test]
    async fn test_add_accepts_any_float_threshold() {
        let svc = service().await;
        // Zero and negative thresholds are tolerated as-is.
        svc.add("u1", "btc", "0", None).await.unwrap();
        svc.add("u1", "btc", "-5.5", Some("below")).await.unwrap();

        let err = svc.add("u1", "btc", "12k", None).await;
        assert!(matches!(err, Err(EngineError::InvalidPrice(_))));
    }

    #[tokio::test]
    async fn test_add_defaults_unrecognized_direction_to_above() {
        let svc = service().await;
        let alert = svc.add("u1", "btc", "10", Some("sideways")).await.unwrap();
        assert_eq!(alert.direction, Direction::Above);
    }

    #[tokio::test]
    async fn test_remove_validates_position() {
        let svc = service().await;
        svc.add("u1", "btc", "10", None).await.unwrap();

        for bad in ["0", "2", "x", "-1"] {
            let err = svc.remove("u1", bad).await;
            assert!(matches!(err, Err(EngineError::InvalidPosition(_))), "{bad}");
        }
        assert_eq!(svc.list("u1").await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_remove_shifts_later_positions_down() {
        let svc = service().await;
        svc.add("u1", "btc", "1", None).await.unwrap();
        svc.add("u1", "btc", "2", None).await.unwrap();
        svc.add("u1", "btc", "3", None).await.unwrap();

        svc.remove("u1", "2").await.unwrap();
        let prices: Vec<f64> = svc
            .list("u1")
            .await
            .unwrap()
            .iter()
            .map(|a| a.price)
            .collect();
        assert_eq!(prices, vec![1.0, 3.0]);
    }
}
