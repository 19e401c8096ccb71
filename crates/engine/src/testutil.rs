//! Shared fakes and helpers for engine tests.

use crate::notify::{Notify, NotifyError};
use async_trait::async_trait;
use coinwatch_feeds::{FeedError, PriceSource, QuoteMap};
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

static NEXT_ID: AtomicU64 = AtomicU64::new(0);

/// A unique path under the system temp dir.
pub fn temp_path(name: &str) -> PathBuf {
    let id = NEXT_ID.fetch_add(1, Ordering::Relaxed);
    std::env::temp_dir().join(format!(
        "coinwatch-{}-{}-{}.json",
        name,
        std::process::id(),
        id
    ))
}

/// Price source serving a fixed quote map, or failing outright.
#[derive(Default)]
pub struct FakeSource {
    pub quotes: QuoteMap,
    pub fail: bool,
}

impl FakeSource {
    pub fn with_quote(id: &str, usd: f64) -> Self {
        let mut quotes = QuoteMap::new();
        quotes.insert(id.to_string(), usd);
        Self {
            quotes,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            quotes: QuoteMap::new(),
            fail: true,
        }
    }
}

#[async_trait]
impl PriceSource for FakeSource {
    async fn lookup(&self, ids: &[String]) -> Result<QuoteMap, FeedError> {
        if self.fail {
            return Err(FeedError::Parse("fake outage".to_string()));
        }
        Ok(ids
            .iter()
            .filter_map(|id| self.quotes.get(id).map(|usd| (id.clone(), *usd)))
            .collect())
    }
}

/// Notifier recording every delivery, optionally failing them all.
#[derive(Default)]
pub struct FakeNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
    pub fail: bool,
}

impl FakeNotifier {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn deliveries(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notify for FakeNotifier {
    async fn notify(&self, user_id: &str, text: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((user_id.to_string(), text.to_string()));
        if self.fail {
            return Err(NotifyError("fake delivery failure".to_string()));
        }
        Ok(())
    }
}
