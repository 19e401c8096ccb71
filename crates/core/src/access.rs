//! Entitlement state: approved users and pending request queues.

use crate::symbols::SymbolMap;
use chrono::{DateTime, Utc};
use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Symbol a freshly approved user is entitled to before requesting more.
pub const SEED_SYMBOL: &str = "btc";

/// An approved account and its per-asset entitlements.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    /// Display name captured from the access request.
    #[serde(default)]
    pub username: String,
    /// Entitled asset symbols, in grant order. No duplicates.
    pub coins: Vec<CompactString>,
}

impl UserAccount {
    /// Account with the seed entitlement, created on approval.
    pub fn seeded(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            coins: vec![CompactString::new(SEED_SYMBOL)],
        }
    }

    /// Account with no entitlements yet.
    pub fn empty(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            coins: Vec::new(),
        }
    }

    /// Whether this account may track `symbol`.
    pub fn has_coin(&self, symbol: &str) -> bool {
        let symbol = SymbolMap::normalize(symbol);
        self.coins.iter().any(|c| *c == symbol)
    }

    /// Append `symbol` to the entitlement list unless already present.
    pub fn grant_coin(&mut self, symbol: CompactString) {
        if !self.coins.contains(&symbol) {
            self.coins.push(symbol);
        }
    }
}

/// A pending account-access request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRequest {
    pub user_id: String,
    pub username: String,
    pub timestamp: DateTime<Utc>,
}

/// A pending per-asset access request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoinAccessRequest {
    pub user_id: String,
    pub coin: CompactString,
    pub username: String,
    pub timestamp: DateTime<Utc>,
}

/// Root of the persisted entitlement document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessRoot {
    /// Owner identity. Configured at install time, immutable at runtime;
    /// the owner bypasses every entitlement check.
    pub owner: String,
    /// Approved users keyed by transport-assigned id.
    pub users: BTreeMap<String, UserAccount>,
    /// Pending account-access requests, oldest first. At most one per
    /// user id.
    pub requests: Vec<AccessRequest>,
    /// Pending per-asset requests, oldest first. At most one per
    /// (user id, symbol) pair.
    pub coin_requests: Vec<CoinAccessRequest>,
}

impl AccessRoot {
    /// Fresh-install root for the configured owner.
    pub fn new(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            users: BTreeMap::new(),
            requests: Vec::new(),
            coin_requests: Vec::new(),
        }
    }

    pub fn is_owner(&self, user_id: &str) -> bool {
        self.owner == user_id
    }

    /// Whether `user_id` holds an approved account (owner excluded).
    pub fn is_approved(&self, user_id: &str) -> bool {
        self.users.contains_key(user_id)
    }

    /// Whether `user_id` may issue user commands at all.
    pub fn has_account(&self, user_id: &str) -> bool {
        self.is_owner(user_id) || self.is_approved(user_id)
    }

    /// Whether `user_id` may track `symbol`.
    pub fn is_entitled(&self, user_id: &str, symbol: &str) -> bool {
        if self.is_owner(user_id) {
            return true;
        }
        self.users
            .get(user_id)
            .is_some_and(|account| account.has_coin(symbol))
    }

    /// Index of the pending account request for `user_id`, if any.
    pub fn pending_request(&self, user_id: &str) -> Option<usize> {
        self.requests.iter().position(|r| r.user_id == user_id)
    }

    /// Index of the pending coin request for `(user_id, symbol)`, if any.
    pub fn pending_coin_request(&self, user_id: &str, symbol: &str) -> Option<usize> {
        let symbol = SymbolMap::normalize(symbol);
        self.coin_requests
            .iter()
            .position(|r| r.user_id == user_id && r.coin == symbol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn root() -> AccessRoot {
        let mut root = AccessRoot::new("owner-1");
        root.users
            .insert("user-1".to_string(), UserAccount::seeded("alice"));
        root
    }

    #[test]
    fn test_owner_bypasses_entitlement() {
        let root = root();
        assert!(root.is_owner("owner-1"));
        assert!(root.has_account("owner-1"));
        assert!(root.is_entitled("owner-1", "doge"));
        assert!(!root.is_approved("owner-1"));
    }

    #[test]
    fn test_seeded_account_has_only_seed_symbol() {
        let root = root();
        assert!(root.is_entitled("user-1", "btc"));
        assert!(root.is_entitled("user-1", "BTC"));
        assert!(!root.is_entitled("user-1", "eth"));
    }

    #[test]
    fn test_unregistered_user_has_nothing() {
        let root = root();
        assert!(!root.has_account("user-2"));
        assert!(!root.is_entitled("user-2", "btc"));
    }

    #[test]
    fn test_grant_coin_is_idempotent() {
        let mut account = UserAccount::seeded("alice");
        account.grant_coin("eth".into());
        account.grant_coin("eth".into());
        let coins: Vec<&str> = account.coins.iter().map(|c| c.as_str()).collect();
        assert_eq!(coins, vec!["btc", "eth"]);
    }

    #[test]
    fn test_pending_lookups_match_by_key() {
        let mut root = root();
        root.requests.push(AccessRequest {
            user_id: "user-2".to_string(),
            username: "bob".to_string(),
            timestamp: Utc::now(),
        });
        root.coin_requests.push(CoinAccessRequest {
            user_id: "user-1".to_string(),
            coin: "eth".into(),
            username: "alice".to_string(),
            timestamp: Utc::now(),
        });

        assert_eq!(root.pending_request("user-2"), Some(0));
        assert_eq!(root.pending_request("user-1"), None);
        assert_eq!(root.pending_coin_request("user-1", "ETH"), Some(0));
        assert_eq!(root.pending_coin_request("user-1", "sol"), None);
        assert_eq!(root.pending_coin_request("user-2", "eth"), None);
    }
}
