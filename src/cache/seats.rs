use redis::AsyncCommands;

use crate::cache::CacheService;
use crate::error::AppResult;
use crate::models::SeatMap;

impl CacheService {
    /// Seat map for a showtime, served from cache when possible. Errors
    /// from Redis degrade to a store read; errors from the store (unknown
    /// showtime) propagate.
    pub async fn get_seat_map(&self, showtime_id: &str) -> AppResult<SeatMap> {
        if let Ok(Some(map)) = self.read_cached_seat_map(showtime_id).await {
            return Ok(map);
        }

        let map = self.store.seat_map(showtime_id).await?;

        if let Err(e) = self.write_cached_seat_map(showtime_id, &map).await {
            tracing::debug!("failed to cache seat map for showtime {}: {:?}", showtime_id, e);
        }

        Ok(map)
    }

    /// Drop the cached seat map after a booking changed seat states.
    pub async fn invalidate_seats(&self, showtime_id: &str) {
        let mut conn = self.redis.conn.clone();
        let result: Result<(), redis::RedisError> = conn.del(seat_map_key(showtime_id)).await;
        if let Err(e) = result {
            tracing::debug!(
                "failed to invalidate seat map cache for showtime {}: {:?}",
                showtime_id,
                e
            );
        }
    }

    async fn read_cached_seat_map(
        &self,
        showtime_id: &str,
    ) -> Result<Option<SeatMap>, redis::RedisError> {
        let mut conn = self.redis.conn.clone();
        let data: Option<String> = conn.get(seat_map_key(showtime_id)).await?;
        match data {
            None => Ok(None),
            Some(data) => Ok(serde_json::from_str(&data).ok()),
        }
    }

    async fn write_cached_seat_map(
        &self,
        showtime_id: &str,
        map: &SeatMap,
    ) -> Result<(), redis::RedisError> {
        let data = serde_json::to_string(map).map_err(|_| {
            redis::RedisError::from((redis::ErrorKind::TypeError, "Serialize error"))
        })?;
        let mut conn = self.redis.conn.clone();
        conn.set_ex(seat_map_key(showtime_id), data, self.seat_map_ttl_secs)
            .await
    }
}

fn seat_map_key(showtime_id: &str) -> String {
    format!("seats:{}", showtime_id)
}
