use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub app: AppConfig,
    pub database: DatabaseConfig,
    pub redis: RedisConfig,
    pub hall: HallConfig,
    pub booking: BookingConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub rust_log: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub pool_size: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    pub url: String,
    pub seat_map_ttl_secs: u64,
}

// Seat grid dimensions. Rows are labelled A, B, C, ... so at most 26 rows;
// seat numbers are limited to two digits by the identifier format.
#[derive(Debug, Clone, Deserialize)]
pub struct HallConfig {
    pub rows: u8,
    pub seats_per_row: i32,
}

impl HallConfig {
    pub fn row_letters(&self) -> impl Iterator<Item = char> {
        ('A'..='Z').take(self.rows as usize)
    }
}

// Bounds for the booking transaction: lock waits are capped by
// lock_timeout_ms inside the transaction, and transient failures are
// retried at most max_retries times with linear backoff.
#[derive(Debug, Clone, Deserialize)]
pub struct BookingConfig {
    pub max_retries: u32,
    pub retry_backoff_ms: u64,
    pub lock_timeout_ms: u64,
    pub sweep_interval_secs: u64,
}

impl Config {
    pub fn from_env() -> Self {
        let config = Config {
            app: AppConfig {
                host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: env::var("PORT")
                    .unwrap_or_else(|_| "8000".to_string())
                    .parse()
                    .expect("PORT must be a valid number"),
                rust_log: env::var("RUST_LOG")
                    .unwrap_or_else(|_| "cinema_booking=debug,tower_http=debug".to_string()),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").expect("DATABASE_URL must be set"),
                pool_size: env::var("DB_POOL_SIZE")
                    .unwrap_or_else(|_| "20".to_string())
                    .parse()
                    .expect("DB_POOL_SIZE must be a valid number"),
            },
            redis: RedisConfig {
                url: env::var("REDIS_URL").expect("REDIS_URL must be set"),
                seat_map_ttl_secs: env::var("SEAT_MAP_TTL_SECS")
                    .unwrap_or_else(|_| "60".to_string())
                    .parse()
                    .expect("SEAT_MAP_TTL_SECS must be a valid number"),
            },
            hall: HallConfig {
                rows: env::var("HALL_ROWS")
                    .unwrap_or_else(|_| "8".to_string())
                    .parse()
                    .expect("HALL_ROWS must be a valid number"),
                seats_per_row: env::var("HALL_SEATS_PER_ROW")
                    .unwrap_or_else(|_| "12".to_string())
                    .parse()
                    .expect("HALL_SEATS_PER_ROW must be a valid number"),
            },
            booking: BookingConfig {
                max_retries: env::var("BOOKING_MAX_RETRIES")
                    .unwrap_or_else(|_| "3".to_string())
                    .parse()
                    .expect("BOOKING_MAX_RETRIES must be a valid number"),
                retry_backoff_ms: env::var("BOOKING_RETRY_BACKOFF_MS")
                    .unwrap_or_else(|_| "25".to_string())
                    .parse()
                    .expect("BOOKING_RETRY_BACKOFF_MS must be a valid number"),
                lock_timeout_ms: env::var("BOOKING_LOCK_TIMEOUT_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse()
                    .expect("BOOKING_LOCK_TIMEOUT_MS must be a valid number"),
                sweep_interval_secs: env::var("CONSISTENCY_SWEEP_INTERVAL_SECS")
                    .unwrap_or_else(|_| "300".to_string())
                    .parse()
                    .expect("CONSISTENCY_SWEEP_INTERVAL_SECS must be a valid number"),
            },
        };

        assert!(
            (1..=26).contains(&config.hall.rows),
            "HALL_ROWS must be between 1 and 26"
        );
        assert!(
            (1..=99).contains(&config.hall.seats_per_row),
            "HALL_SEATS_PER_ROW must be between 1 and 99"
        );

        config
    }
}
