use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Theater {
    pub id: String,
    pub name: String,
    pub capacity: i32,
    #[serde(rename = "type")]
    #[sqlx(rename = "type")]
    pub theater_type: String,
}
