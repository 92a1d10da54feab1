use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::models::ShowtimeListing;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Movie {
    pub id: String,
    pub title: String,
    pub description: String,
    pub poster_url: String,
    pub duration: i32,
    pub genre: String,
    pub rating: String,
    pub imdb_rating: Option<f64>,
    pub release_year: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieDetail {
    #[serde(flatten)]
    pub movie: Movie,
    pub showtimes: Vec<ShowtimeListing>,
}
