use axum::{routing::get, Router};
use mimalloc::MiMalloc;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::task;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cinema_booking::{
    cache::CacheService,
    config::Config,
    controllers,
    database::Database,
    redis_client::RedisClient,
    services,
    store::{BookingStore, PostgresStore},
    AppState,
};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.app.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cinema Booking API");

    // Connect to the database
    let db = Database::new(&config.database.url, config.database.pool_size)
        .await
        .expect("Failed to connect to database");
    info!("Database connected");

    // Run migrations
    db.run_migrations()
        .await
        .expect("Failed to run migrations");

    // Connect to Redis
    let redis = RedisClient::new(&config.redis.url)
        .await
        .expect("Failed to connect to Redis");
    info!("Redis connected");

    let store: Arc<dyn BookingStore> = Arc::new(PostgresStore::new(
        db.clone(),
        config.hall.clone(),
        config.booking.clone(),
    ));

    // Initialize the cache
    let cache = CacheService::new(redis.clone(), store.clone(), config.redis.seat_map_ttl_secs);
    cache.warmup_cache().await;
    info!("Cache warmed up");

    // Create the shared application state
    let app_state = Arc::new(AppState {
        store: store.clone(),
        cache,
        config: config.clone(),
    });

    // --- Start background tasks ---

    // Task to reconcile available-seat counters against seat records
    let sweep_store = store.clone();
    let sweep_interval = Duration::from_secs(config.booking.sweep_interval_secs);
    task::spawn(async move {
        loop {
            services::consistency::run_sweep(sweep_store.as_ref()).await;
            tokio::time::sleep(sweep_interval).await;
        }
    });

    // --- Start the web server ---

    // Create the main router
    let app = Router::new()
        .route("/", get(|| async { "Cinema Booking API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        // Mount the routes from the controllers module
        .nest("/api", controllers::routes())
        // Pass the application state to the router
        .with_state(app_state.clone())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.app.port));
    info!("Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind server address");
    axum::serve(listener, app.into_make_service())
        .await
        .expect("Server error");
}
