use serde::{Deserialize, Serialize};
use sqlx::FromRow;

// Prices are integer minor currency units, so 1299 means $12.99.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Showtime {
    pub id: String,
    pub movie_id: String,
    pub theater_id: String,
    pub time: String,
    pub date: String,
    pub price: i64,
    pub available_seats: i32,
}

/// Showtime summary with resolved movie and theater names, as shown above
/// the seat map and on booking confirmations.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeInfo {
    pub id: String,
    pub movie_title: String,
    pub time: String,
    pub date: String,
    pub theater: String,
    pub price: i64,
}

/// One showtime row in a movie detail response.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShowtimeListing {
    pub id: String,
    pub time: String,
    pub date: String,
    pub price: i64,
    pub available_seats: i32,
    pub theater: String,
}
