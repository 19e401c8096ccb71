//! Price alert types.

use compact_str::CompactString;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Which side of the threshold fires the alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Above,
    Below,
}

impl Direction {
    /// Parse a user-supplied direction word. Anything other than
    /// "below" (any casing) falls back to `Above`, matching the
    /// permissive command syntax.
    pub fn parse_or_default(arg: Option<&str>) -> Self {
        match arg {
            Some(word) if word.eq_ignore_ascii_case("below") => Self::Below,
            _ => Self::Above,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Above => write!(f, "above"),
            Self::Below => write!(f, "below"),
        }
    }
}

/// A one-shot price alert.
///
/// Fires at most once: the evaluation loop removes it the first cycle
/// its condition holds. The threshold is any float the user typed;
/// zero and negative values are accepted as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    /// Canonical identifier used for quote lookups.
    pub coin: CompactString,
    /// Short symbol shown back to the user.
    pub symbol: CompactString,
    /// Threshold price in USD.
    pub price: f64,
    /// Side of the threshold that triggers.
    pub direction: Direction,
}

impl Alert {
    /// Whether `quote` satisfies the trigger condition.
    pub fn is_triggered(&self, quote: f64) -> bool {
        match self.direction {
            Direction::Above => quote >= self.price,
            Direction::Below => quote <= self.price,
        }
    }
}

/// Every user's active alerts, keyed by user id.
///
/// Each user's vector is in creation order; index + 1 is the handle the
/// user quotes to `/remove`, so the order must stay stable between a
/// list and a subsequent removal. A user whose vector empties is
/// dropped from the map rather than kept as an empty list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertBook {
    pub users: BTreeMap<String, Vec<Alert>>,
}

impl AlertBook {
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// The caller's alerts in creation order.
    pub fn user_alerts(&self, user_id: &str) -> &[Alert] {
        self.users.get(user_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Append an alert for `user_id`.
    pub fn push(&mut self, user_id: &str, alert: Alert) {
        self.users.entry(user_id.to_string()).or_default().push(alert);
    }

    /// Remove the alert at zero-based `index` for `user_id`, dropping
    /// the user's key when the sequence empties.
    pub fn remove_at(&mut self, user_id: &str, index: usize) -> Option<Alert> {
        let alerts = self.users.get_mut(user_id)?;
        if index >= alerts.len() {
            return None;
        }
        let removed = alerts.remove(index);
        if alerts.is_empty() {
            self.users.remove(user_id);
        }
        Some(removed)
    }

    /// Distinct canonical identifiers across every user's alerts, so one
    /// batched quote lookup covers the whole book.
    pub fn distinct_coins(&self) -> Vec<String> {
        let mut coins = BTreeSet::new();
        for alerts in self.users.values() {
            for alert in alerts {
                coins.insert(alert.coin.to_string());
            }
        }
        coins.into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn alert(coin: &str, price: f64, direction: Direction) -> Alert {
        Alert {
            coin: coin.into(),
            symbol: coin.into(),
            price,
            direction,
        }
    }

    #[test]
    fn test_direction_parse_defaults_to_above() {
        assert_eq!(Direction::parse_or_default(None), Direction::Above);
        assert_eq!(Direction::parse_or_default(Some("below")), Direction::Below);
        assert_eq!(Direction::parse_or_default(Some("BELOW")), Direction::Below);
        assert_eq!(Direction::parse_or_default(Some("under")), Direction::Above);
    }

    #[test]
    fn test_trigger_is_inclusive() {
        let above = alert("bitcoin", 100_000.0, Direction::Above);
        assert!(above.is_triggered(100_000.0));
        assert!(above.is_triggered(100_001.0));
        assert!(!above.is_triggered(99_999.9));

        let below = alert("bitcoin", 100_000.0, Direction::Below);
        assert!(below.is_triggered(100_000.0));
        assert!(below.is_triggered(99_000.0));
        assert!(!below.is_triggered(100_000.1));
    }

    #[test]
    fn test_remove_at_drops_emptied_user() {
        let mut book = AlertBook::default();
        book.push("u1", alert("bitcoin", 1.0, Direction::Above));
        book.push("u1", alert("ethereum", 2.0, Direction::Below));

        let removed = book.remove_at("u1", 0).unwrap();
        assert_eq!(removed.coin.as_str(), "bitcoin");
        assert_eq!(book.user_alerts("u1").len(), 1);

        book.remove_at("u1", 0).unwrap();
        assert!(!book.users.contains_key("u1"));
    }

    #[test]
    fn test_remove_at_out_of_bounds_is_none() {
        let mut book = AlertBook::default();
        book.push("u1", alert("bitcoin", 1.0, Direction::Above));
        assert!(book.remove_at("u1", 1).is_none());
        assert!(book.remove_at("u2", 0).is_none());
        assert_eq!(book.user_alerts("u1").len(), 1);
    }

    #[test]
    fn test_distinct_coins_deduplicates_across_users() {
        let mut book = AlertBook::default();
        book.push("u1", alert("bitcoin", 1.0, Direction::Above));
        book.push("u1", alert("ethereum", 2.0, Direction::Above));
        book.push("u2", alert("bitcoin", 3.0, Direction::Below));

        assert_eq!(book.distinct_coins(), vec!["bitcoin", "ethereum"]);
    }

    #[test]
    fn test_direction_serializes_lowercase() {
        let alert = alert("bitcoin", 5.0, Direction::Below);
        let json = serde_json::to_string(&alert).unwrap();
        assert!(json.contains(r#""direction":"below""#));
    }
}
