use std::sync::Arc;

use tracing::info;

use crate::redis_client::RedisClient;
use crate::store::BookingStore;

pub mod seats;

/// Redis-backed read cache in front of the store.
///
/// Only seat maps are cached. A cached map may be slightly stale; that is
/// safe because the authoritative availability check happens inside the
/// booking transaction, never against the cache.
#[derive(Clone)]
pub struct CacheService {
    redis: RedisClient,
    store: Arc<dyn BookingStore>,
    seat_map_ttl_secs: u64,
}

impl CacheService {
    pub fn new(redis: RedisClient, store: Arc<dyn BookingStore>, seat_map_ttl_secs: u64) -> Self {
        Self {
            redis,
            store,
            seat_map_ttl_secs,
        }
    }

    pub async fn warmup_cache(&self) {
        info!("Starting cache warmup...");

        // Materializes and caches the first showtime's seat map
        let _ = self.get_seat_map("1").await;

        info!("Cache warmup done");
    }
}
