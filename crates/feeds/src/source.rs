//! The quote-source trait the engine polls against.

use crate::FeedError;
use async_trait::async_trait;
use std::collections::HashMap;

/// USD quotes keyed by canonical asset identifier.
pub type QuoteMap = HashMap<String, f64>;

/// A quote source queried by canonical asset identifier.
///
/// Implementations may return partial results: identifiers the source
/// does not recognize are simply absent from the returned map, and the
/// caller treats them as "no quote this cycle". An error means the
/// lookup as a whole failed.
#[async_trait]
pub trait PriceSource: Send + Sync {
    /// Fetch quotes for every identifier in `ids` in one batched call.
    async fn lookup(&self, ids: &[String]) -> Result<QuoteMap, FeedError>;

    /// Fetch a single identifier; `None` when the source does not know it.
    async fn lookup_one(&self, id: &str) -> Result<Option<f64>, FeedError> {
        let ids = [id.to_string()];
        let quotes = self.lookup(&ids).await?;
        Ok(quotes.get(id).copied())
    }
}
