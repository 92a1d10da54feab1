pub mod cache;
pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod models;
pub mod redis_client;
pub mod services;
pub mod store;

use std::sync::Arc;

// Shared state for the whole application
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn store::BookingStore>,
    pub cache: cache::CacheService,
    pub config: config::Config,
}
