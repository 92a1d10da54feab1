use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::SeatMap;
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new().route("/showtimes/{id}/seats", get(get_seat_map))
}

// GET /api/showtimes/{id}/seats
//
// First access materializes the grid; repeated reads with no intervening
// booking return identical statuses.
async fn get_seat_map(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<SeatMap>> {
    let map = state.cache.get_seat_map(&id).await?;
    Ok(Json(map))
}
