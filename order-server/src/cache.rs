//! In-memory order cache — the consistency core of the service
//!
//! `OrderCache` owns the map from order identifier to denormalized read
//! view. Three actors touch it concurrently: the stream consumer writes
//! through on save, HTTP readers serve from it and backfill on miss, and a
//! periodic evictor prunes entries whose TTL has elapsed. All mutation is
//! routed through this type; the map itself is never exposed.
//!
//! TTL is measured from the entry's last write. A cache hit deliberately
//! does not refresh the timestamp, so a frequently read order still expires
//! TTL after its last save and the next read goes back to the store.
//!
//! The store remains the system of record: `save` persists first and only
//! then publishes into the map, so a failed store write leaves the cache
//! untouched. A crash between the two steps merely leaves the entry stale
//! until the next read miss backfills it.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::db::{OrderStore, SaveOutcome};
use crate::error::ServiceError;
use crate::model::{Order, OrderPreview, OrderResponse};

/// Ownership pair of a read view and its last-write timestamp.
/// Callers always receive clones, never references into the map.
struct CacheEntry {
    order: OrderResponse,
    written_at: Instant,
}

pub struct OrderCache {
    store: Arc<dyn OrderStore>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl OrderCache {
    /// Build the cache and warm it from the store, bounded by `warm_limit`.
    ///
    /// Warm-load failure is fatal: the cache must never start half
    /// initialized, so the error propagates and aborts startup.
    pub async fn new(store: Arc<dyn OrderStore>, warm_limit: i64) -> Result<Self, ServiceError> {
        let cache = Self {
            store,
            entries: RwLock::new(HashMap::new()),
        };
        cache.warm_load(warm_limit).await?;
        Ok(cache)
    }

    async fn warm_load(&self, limit: i64) -> Result<(), ServiceError> {
        let orders = self.store.fetch_full(limit).await?;
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        for order in orders {
            entries.insert(
                order.order_uid.clone(),
                CacheEntry {
                    order,
                    written_at: now,
                },
            );
        }
        tracing::info!(loaded = entries.len(), "order cache warmed");
        Ok(())
    }

    async fn insert(&self, order: OrderResponse) {
        let mut entries = self.entries.write().await;
        entries.insert(
            order.order_uid.clone(),
            CacheEntry {
                order,
                written_at: Instant::now(),
            },
        );
    }

    async fn lookup(&self, id: &str) -> Option<OrderResponse> {
        let entries = self.entries.read().await;
        entries.get(id).map(|entry| entry.order.clone())
    }

    /// Persist the order, then publish its read view into the map.
    ///
    /// The store write happens outside any lock and must succeed first; on
    /// failure the cache keeps whatever it held before. A duplicate
    /// identifier is not republished: the store kept the original row, so
    /// the map must keep the original view too.
    pub async fn save(&self, order: &Order) -> Result<(), ServiceError> {
        if self.store.save(order).await? == SaveOutcome::Duplicate {
            tracing::debug!(order_uid = %order.order_uid, "redelivered order not republished");
            return Ok(());
        }
        self.insert(order.to_response()).await;
        Ok(())
    }

    /// Serve from the cache; on miss, query the store and backfill.
    ///
    /// A hit returns the cached view without touching the store and without
    /// extending its TTL.
    pub async fn get_by_id(&self, id: &str) -> Result<OrderResponse, ServiceError> {
        if let Some(order) = self.lookup(id).await {
            return Ok(order);
        }

        let order = self.store.get_by_id(id).await?;
        self.insert(order.clone()).await;
        Ok(order)
    }

    /// List previews straight from the store. The cache holds full read
    /// views only and is not an index for list queries.
    pub async fn list_previews(&self) -> Result<Vec<OrderPreview>, ServiceError> {
        self.store.list_previews().await
    }

    /// Remove every entry whose TTL has elapsed. Returns the eviction count.
    async fn evict_expired(&self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| now.duration_since(entry.written_at) < ttl);
        before - entries.len()
    }

    /// Periodic eviction loop, one per process, tied to the shutdown token.
    pub async fn run_evictor(
        self: Arc<Self>,
        ttl: Duration,
        cleanup_interval: Duration,
        shutdown: CancellationToken,
    ) {
        let mut ticker = tokio::time::interval(cleanup_interval);
        // the immediate first tick would evict nothing useful
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    tracing::info!("order cache evictor stopped");
                    break;
                }
                _ = ticker.tick() => {
                    let evicted = self.evict_expired(ttl).await;
                    if evicted > 0 {
                        tracing::debug!(evicted, "expired order cache entries removed");
                    }
                }
            }
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}
