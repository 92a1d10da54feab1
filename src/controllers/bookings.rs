use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{BookingConfirmation, BookingDetail};
use crate::services;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/bookings", post(create_booking))
        .route("/bookings/{id}", get(get_booking))
}

// POST /api/bookings
//
// Fields default to empty when absent so that missing fields surface as a
// 400 from validation rather than a deserialization rejection.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct CreateBookingRequest {
    showtime_id: String,
    seat_identifiers: Vec<String>,
    customer_name: String,
    customer_email: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateBookingResponse {
    booking_id: Uuid,
    message: &'static str,
    booking: BookingConfirmation,
}

async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateBookingRequest>,
) -> AppResult<impl IntoResponse> {
    let confirmation = services::bookings::create_booking(
        state.store.as_ref(),
        &state.config.booking,
        &req.showtime_id,
        &req.seat_identifiers,
        &req.customer_name,
        &req.customer_email,
    )
    .await?;

    state.cache.invalidate_seats(&req.showtime_id).await;

    Ok((
        StatusCode::CREATED,
        Json(CreateBookingResponse {
            booking_id: confirmation.id,
            message: "Booking created successfully",
            booking: confirmation,
        }),
    ))
}

// GET /api/bookings/{id}
//
// An id that is not even a UUID cannot name a booking, so it is a plain 404.
async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<BookingDetail>> {
    let id = Uuid::parse_str(&id)
        .map_err(|_| crate::error::AppError::NotFound("Booking not found".to_string()))?;
    let detail = state.store.booking_detail(id).await?;
    Ok(Json(detail))
}
