//! CoinGecko simple-price REST client.
//!
//! One `GET /api/v3/simple/price` call quotes any number of identifiers
//! at once, so the evaluation loop costs a single request per cycle
//! regardless of how many alerts are live.

use crate::{FeedError, PriceSource, QuoteMap};
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const BASE_URL: &str = "https://api.coingecko.com/api/v3";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Per-identifier entry in a simple/price response. The `usd` field is
/// missing for identifiers CoinGecko recognizes but has no quote for.
#[derive(Debug, Deserialize)]
struct SimplePriceEntry {
    usd: Option<f64>,
}

/// CoinGecko REST price source.
pub struct CoinGecko {
    client: reqwest::Client,
    base_url: String,
}

impl CoinGecko {
    /// Build a client with the default endpoint and request timeout.
    pub fn new() -> Result<Self, FeedError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            client,
            base_url: BASE_URL.to_string(),
        })
    }

    /// Point the client at a different host (mock servers in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn quotes_from_entries(entries: HashMap<String, SimplePriceEntry>) -> QuoteMap {
        entries
            .into_iter()
            .filter_map(|(id, entry)| entry.usd.map(|usd| (id, usd)))
            .collect()
    }
}

#[async_trait]
impl PriceSource for CoinGecko {
    async fn lookup(&self, ids: &[String]) -> Result<QuoteMap, FeedError> {
        if ids.is_empty() {
            return Ok(QuoteMap::new());
        }

        let url = format!("{}/simple/price", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", ids.join(",")), ("vs_currencies", "usd".to_string())])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(FeedError::Status(response.status()));
        }

        let entries: HashMap<String, SimplePriceEntry> = response
            .json()
            .await
            .map_err(|e| FeedError::Parse(e.to_string()))?;
        let quotes = Self::quotes_from_entries(entries);

        debug!(
            requested = ids.len(),
            returned = quotes.len(),
            "fetched quotes"
        );
        Ok(quotes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_response_keeps_known_ids_only() {
        let payload = r#"{"bitcoin":{"usd":100000.5},"stale-coin":{}}"#;
        let entries: HashMap<String, SimplePriceEntry> = serde_json::from_str(payload).unwrap();
        let quotes = CoinGecko::quotes_from_entries(entries);

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes["bitcoin"], 100000.5);
    }

    #[tokio::test]
    async fn test_empty_id_set_skips_the_request() {
        // Unroutable base URL: the call must succeed without any I/O.
        let source = CoinGecko::new()
            .unwrap()
            .with_base_url("http://127.0.0.1:1/api/v3");
        let quotes = source.lookup(&[]).await.unwrap();
        assert!(quotes.is_empty());
    }
}
