//! Asset registry: symbol table with an in-process read-through cache.

use crate::error::EngineError;
use crate::store::JsonStore;
use coinwatch_core::{AccessRoot, SymbolMap};
use coinwatch_feeds::PriceSource;
use compact_str::CompactString;
use std::sync::{Arc, RwLock};
use tracing::info;

/// Symbol table owned by the registry, cached in memory alongside its
/// persisted copy.
///
/// `resolve` reads the cache only; `register` persists first and then
/// swaps the cache so callers in the same process see the new entry
/// immediately after the document hits disk.
pub struct AssetRegistry {
    store: Arc<JsonStore<SymbolMap>>,
    access: Arc<JsonStore<AccessRoot>>,
    source: Arc<dyn PriceSource>,
    cache: RwLock<SymbolMap>,
}

impl AssetRegistry {
    /// Build the registry, hydrating the cache from disk.
    pub async fn open(
        store: Arc<JsonStore<SymbolMap>>,
        access: Arc<JsonStore<AccessRoot>>,
        source: Arc<dyn PriceSource>,
    ) -> Self {
        let map = store.load().await;
        info!(symbols = map.len(), "asset registry loaded");
        Self {
            store,
            access,
            source,
            cache: RwLock::new(map),
        }
    }

    /// Resolve a display symbol to its canonical identifier.
    pub fn resolve(&self, symbol: &str) -> Option<CompactString> {
        match self.cache.read() {
            Ok(cache) => cache.resolve(symbol).cloned(),
            Err(_) => None,
        }
    }

    /// Whether `symbol` is registered.
    pub fn contains(&self, symbol: &str) -> bool {
        self.resolve(symbol).is_some()
    }

    /// Snapshot of the full symbol table, for rendering.
    pub fn snapshot(&self) -> SymbolMap {
        match self.cache.read() {
            Ok(cache) => cache.clone(),
            Err(_) => SymbolMap::new(),
        }
    }

    /// Register a new symbol. Owner-only; the identifier must produce a
    /// quote from the price source before it is accepted.
    pub async fn register(
        &self,
        caller: &str,
        symbol: &str,
        coin_id: &str,
    ) -> Result<(), EngineError> {
        let access = self.access.load().await;
        if !access.is_owner(caller) {
            return Err(EngineError::NotAuthorized);
        }

        let symbol = SymbolMap::normalize(symbol);
        let coin_id = SymbolMap::normalize(coin_id);
        if self.contains(&symbol) {
            return Err(EngineError::AlreadyExists(symbol.into()));
        }

        let quote = self.source.lookup_one(&coin_id).await?;
        if quote.is_none() {
            return Err(EngineError::ValidationFailed(coin_id.into()));
        }

        let _guard = self.store.lock().await;
        let mut map = self.store.load().await;
        if map.contains(&symbol) {
            return Err(EngineError::AlreadyExists(symbol.into()));
        }
        map.insert(symbol.clone(), coin_id.clone());
        self.store.save(&map).await?;
        if let Ok(mut cache) = self.cache.write() {
            *cache = map;
        }

        info!(symbol = %symbol, coin_id = %coin_id, "asset registered");
        Ok(())
    }
}
