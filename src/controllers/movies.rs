use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use std::sync::Arc;

use crate::error::AppResult;
use crate::models::{Movie, MovieDetail};
use crate::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/movies", get(list_movies))
        .route("/movies/{id}", get(get_movie))
}

// GET /api/movies
async fn list_movies(State(state): State<Arc<AppState>>) -> AppResult<Json<Vec<Movie>>> {
    let movies = state.store.list_movies().await?;
    Ok(Json(movies))
}

// GET /api/movies/{id}
async fn get_movie(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<MovieDetail>> {
    let detail = state.store.movie_detail(&id).await?;
    Ok(Json(detail))
}
