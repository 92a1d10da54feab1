use std::collections::HashSet;
use std::time::Duration;

use validator::ValidateEmail;

use crate::config::BookingConfig;
use crate::error::{AppError, AppResult};
use crate::models::{BookingConfirmation, SeatId};
use crate::store::{BookingRequest, BookingStore};

/// Booking transaction coordinator.
///
/// Validates the request without touching state, then drives the store's
/// atomic booking operation, retrying transient storage failures a bounded
/// number of times with linear backoff. Validation failures, lost races and
/// unknown identifiers all leave seats, counter and bookings unchanged.
pub async fn create_booking(
    store: &dyn BookingStore,
    policy: &BookingConfig,
    showtime_id: &str,
    seat_identifiers: &[String],
    customer_name: &str,
    customer_email: &str,
) -> AppResult<BookingConfirmation> {
    if showtime_id.is_empty() || customer_name.trim().is_empty() {
        return Err(AppError::Validation("Missing required fields".to_string()));
    }
    if seat_identifiers.is_empty() {
        return Err(AppError::Validation("No seats selected".to_string()));
    }
    if !customer_email.validate_email() {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }

    let mut seats = Vec::with_capacity(seat_identifiers.len());
    let mut seen = HashSet::with_capacity(seat_identifiers.len());
    for raw in seat_identifiers {
        let seat: SeatId = raw.parse().map_err(|_| {
            AppError::Validation(format!("Malformed seat identifier: {raw}"))
        })?;
        if !seen.insert(seat) {
            return Err(AppError::Validation(format!(
                "Duplicate seat identifier: {raw}"
            )));
        }
        seats.push(seat);
    }
    // Row-then-number order; also the lock acquisition order in the store.
    seats.sort();

    let request = BookingRequest {
        showtime_id: showtime_id.to_string(),
        seats,
        customer_name: customer_name.to_string(),
        customer_email: customer_email.to_string(),
    };

    let mut attempt: u32 = 0;
    loop {
        match store.create_booking(&request).await {
            Err(AppError::Transient(reason)) if attempt < policy.max_retries => {
                attempt += 1;
                tracing::warn!(
                    "booking attempt {} for showtime {} hit transient storage failure, retrying: {}",
                    attempt,
                    request.showtime_id,
                    reason
                );
                tokio::time::sleep(Duration::from_millis(
                    policy.retry_backoff_ms * u64::from(attempt),
                ))
                .await;
            }
            other => return other,
        }
    }
}
