//! Account and per-asset access workflows.
//!
//! Two independent request/approve tracks per user: account access
//! (`unregistered -> pending -> approved`) and per-symbol access
//! (`unrequested -> pending -> entitled`). The owner is the sole
//! approver for both. Requests are plain append/remove entries on
//! ordered lists; volume is low enough that a sequential scan keeps the
//! persisted state human-inspectable.

use crate::error::EngineError;
use crate::registry::AssetRegistry;
use crate::store::JsonStore;
use chrono::Utc;
use coinwatch_core::{
    AccessRequest, AccessRoot, CoinAccessRequest, SymbolMap, UserAccount,
};
use compact_str::CompactString;
use std::sync::Arc;
use tracing::info;

/// Outcome of a `request_access` call.
#[derive(Debug, PartialEq, Eq)]
pub enum RequestAccessOutcome {
    /// Caller already holds an account (or is the owner).
    AlreadyApproved,
    /// A request from this caller is already queued.
    AlreadyPending,
    /// Request queued; the owner should be told.
    Submitted {
        owner: String,
        pending: usize,
    },
}

/// Outcome of a `request_coin` call.
#[derive(Debug, PartialEq, Eq)]
pub enum RequestCoinOutcome {
    AlreadyEntitled,
    AlreadyPending,
    /// Request queued; the owner should be told.
    Submitted {
        owner: String,
    },
}

/// Owner's snapshot of users and both pending queues.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessOverview {
    pub users: Vec<(String, UserAccount)>,
    pub requests: Vec<AccessRequest>,
    pub coin_requests: Vec<CoinAccessRequest>,
}

/// The caller's own standing, for greetings and the coin catalog view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountSummary {
    Owner,
    User { coins: Vec<CompactString> },
    Unregistered,
}

/// Request/approve workflow over the persisted access root.
pub struct AccessControl {
    store: Arc<JsonStore<AccessRoot>>,
    registry: Arc<AssetRegistry>,
}

impl AccessControl {
    pub fn new(store: Arc<JsonStore<AccessRoot>>, registry: Arc<AssetRegistry>) -> Self {
        Self { store, registry }
    }

    /// Queue an account-access request from `caller`. Idempotent: a
    /// caller with an account or a queued request gets a no-op outcome.
    pub async fn request_access(
        &self,
        caller: &str,
        username: &str,
    ) -> Result<RequestAccessOutcome, EngineError> {
        let _guard = self.store.lock().await;
        let mut root = self.store.load().await;

        if root.has_account(caller) {
            return Ok(RequestAccessOutcome::AlreadyApproved);
        }
        if root.pending_request(caller).is_some() {
            return Ok(RequestAccessOutcome::AlreadyPending);
        }

        root.requests.push(AccessRequest {
            user_id: caller.to_string(),
            username: username.to_string(),
            timestamp: Utc::now(),
        });
        let owner = root.owner.clone();
        let pending = root.requests.len();
        self.store.save(&root).await?;

        info!(user = caller, pending, "access request queued");
        Ok(RequestAccessOutcome::Submitted { owner, pending })
    }

    /// Approve `target`'s pending account request, creating an account
    /// with the seed entitlement. Owner-only.
    pub async fn approve_user(&self, caller: &str, target: &str) -> Result<(), EngineError> {
        let _guard = self.store.lock().await;
        let mut root = self.store.load().await;

        if !root.is_owner(caller) {
            return Err(EngineError::NotAuthorized);
        }
        let idx = root
            .pending_request(target)
            .ok_or_else(|| EngineError::NoSuchRequest(target.to_string()))?;

        let request = root.requests.remove(idx);
        root.users
            .insert(target.to_string(), UserAccount::seeded(request.username));
        self.store.save(&root).await?;

        info!(user = target, "access approved");
        Ok(())
    }

    /// Remove `target`'s pending account request without creating an
    /// account. Owner-only.
    pub async fn decline_user(&self, caller: &str, target: &str) -> Result<(), EngineError> {
        let _guard = self.store.lock().await;
        let mut root = self.store.load().await;

        if !root.is_owner(caller) {
            return Err(EngineError::NotAuthorized);
        }
        let idx = root
            .pending_request(target)
            .ok_or_else(|| EngineError::NoSuchRequest(target.to_string()))?;

        root.requests.remove(idx);
        self.store.save(&root).await?;

        info!(user = target, "access declined");
        Ok(())
    }

    /// Queue a per-symbol request from `caller`. Requires an approved
    /// account (the owner has no use for one and is rejected too, as
    /// the owner already tracks everything).
    pub async fn request_coin(
        &self,
        caller: &str,
        username: &str,
        symbol: &str,
    ) -> Result<RequestCoinOutcome, EngineError> {
        let _guard = self.store.lock().await;
        let mut root = self.store.load().await;

        if !root.is_approved(caller) {
            return Err(EngineError::NotAuthorized);
        }
        let symbol = SymbolMap::normalize(symbol);
        if !self.registry.contains(&symbol) {
            return Err(EngineError::UnknownAsset(symbol.into()));
        }
        if root.is_entitled(caller, &symbol) {
            return Ok(RequestCoinOutcome::AlreadyEntitled);
        }
        if root.pending_coin_request(caller, &symbol).is_some() {
            return Ok(RequestCoinOutcome::AlreadyPending);
        }

        root.coin_requests.push(CoinAccessRequest {
            user_id: caller.to_string(),
            coin: symbol.clone(),
            username: username.to_string(),
            timestamp: Utc::now(),
        });
        let owner = root.owner.clone();
        self.store.save(&root).await?;

        info!(user = caller, symbol = %symbol, "coin request queued");
        Ok(RequestCoinOutcome::Submitted { owner })
    }

    /// Grant `symbol` to `target`, consuming the pending request.
    /// Owner-only. The grant is idempotent on the entitlement list; a
    /// target missing from the users map gets a fresh account with no
    /// other entitlements.
    pub async fn approve_coin(
        &self,
        caller: &str,
        target: &str,
        symbol: &str,
    ) -> Result<(), EngineError> {
        let _guard = self.store.lock().await;
        let mut root = self.store.load().await;

        if !root.is_owner(caller) {
            return Err(EngineError::NotAuthorized);
        }
        let symbol = SymbolMap::normalize(symbol);
        if !self.registry.contains(&symbol) {
            return Err(EngineError::UnknownAsset(symbol.into()));
        }
        let idx = root
            .pending_coin_request(target, &symbol)
            .ok_or_else(|| EngineError::NoSuchRequest(format!("{target} {symbol}")))?;

        let request = root.coin_requests.remove(idx);
        root.users
            .entry(target.to_string())
            .or_insert_with(|| UserAccount::empty(request.username))
            .grant_coin(symbol.clone());
        self.store.save(&root).await?;

        info!(user = target, symbol = %symbol, "coin approved");
        Ok(())
    }

    /// Remove the pending `(target, symbol)` request without granting
    /// anything. Owner-only.
    pub async fn decline_coin(
        &self,
        caller: &str,
        target: &str,
        symbol: &str,
    ) -> Result<(), EngineError> {
        let _guard = self.store.lock().await;
        let mut root = self.store.load().await;

        if !root.is_owner(caller) {
            return Err(EngineError::NotAuthorized);
        }
        let symbol = SymbolMap::normalize(symbol);
        let idx = root
            .pending_coin_request(target, &symbol)
            .ok_or_else(|| EngineError::NoSuchRequest(format!("{target} {symbol}")))?;

        root.coin_requests.remove(idx);
        self.store.save(&root).await?;

        info!(user = target, symbol = %symbol, "coin declined");
        Ok(())
    }

    /// Owner's snapshot of users and both pending queues.
    pub async fn overview(&self, caller: &str) -> Result<AccessOverview, EngineError> {
        let root = self.store.load().await;
        if !root.is_owner(caller) {
            return Err(EngineError::NotAuthorized);
        }
        Ok(AccessOverview {
            users: root.users.into_iter().collect(),
            requests: root.requests,
            coin_requests: root.coin_requests,
        })
    }

    /// The caller's own standing.
    pub async fn account_summary(&self, caller: &str) -> AccountSummary {
        let root = self.store.load().await;
        if root.is_owner(caller) {
            AccountSummary::Owner
        } else if let Some(account) = root.users.get(caller) {
            AccountSummary::User {
                coins: account.coins.clone(),
            }
        } else {
            AccountSummary::Unregistered
        }
    }
}
