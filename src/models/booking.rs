use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// Bookings are immutable once created. There is no update or cancel path,
// so a booked seat never goes back to available.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub showtime_id: String,
    pub customer_name: String,
    pub customer_email: String,
    pub total_amount: i64,
    pub created_at: DateTime<Utc>,
}

/// What a successful booking transaction hands back to the client: the
/// echoed seat identifiers are sorted by row then number.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingConfirmation {
    pub id: Uuid,
    pub movie_title: String,
    pub showtime: String,
    pub date: String,
    pub theater: String,
    pub seats: Vec<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub total_amount: i64,
    pub booking_date: DateTime<Utc>,
}

/// Full booking detail with resolved movie and theater names.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDetail {
    pub id: Uuid,
    pub movie_title: String,
    pub poster_url: String,
    pub showtime: String,
    pub date: String,
    pub theater: String,
    pub seats: Vec<String>,
    pub customer_name: String,
    pub customer_email: String,
    pub total_amount: i64,
    pub booking_date: DateTime<Utc>,
}
