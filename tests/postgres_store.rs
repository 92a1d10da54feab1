use std::sync::Arc;

use cinema_booking::config::{BookingConfig, HallConfig};
use cinema_booking::database::Database;
use cinema_booking::error::AppError;
use cinema_booking::services::bookings;
use cinema_booking::store::{BookingStore, PostgresStore};

fn hall() -> HallConfig {
    HallConfig {
        rows: 8,
        seats_per_row: 12,
    }
}

fn policy() -> BookingConfig {
    BookingConfig {
        max_retries: 3,
        retry_backoff_ms: 10,
        lock_timeout_ms: 2000,
        sweep_interval_secs: 300,
    }
}

async fn setup_store(database_url: &str) -> anyhow::Result<Arc<PostgresStore>> {
    let db = Database::new(database_url, 10).await?;
    db.run_migrations().await?;

    // Clean booking state between runs; the seeded catalog stays.
    sqlx::query("DELETE FROM seats").execute(&db.pool).await?;
    sqlx::query("DELETE FROM bookings").execute(&db.pool).await?;
    sqlx::query("UPDATE showtimes SET available_seats = 96")
        .execute(&db.pool)
        .await?;

    Ok(Arc::new(PostgresStore::new(db, hall(), policy())))
}

// Integration flow against a real Postgres: materialization, booking,
// conflict, counter consistency. Skips when no database is configured.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn booking_flow_against_postgres() -> anyhow::Result<()> {
    let database_url = match std::env::var("TEST_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
    {
        Ok(url) => url,
        Err(_) => {
            eprintln!(
                "Skipping test: set TEST_DATABASE_URL or DATABASE_URL to run Postgres integration tests."
            );
            return Ok(());
        }
    };

    let store = setup_store(&database_url).await?;

    // Concurrent first reads materialize exactly one grid.
    let (first, second) = tokio::join!(store.seat_map("1"), store.seat_map("1"));
    let first = first?;
    let second = second?;
    assert_eq!(first.seats.len(), 96);
    assert_eq!(second.seats.len(), 96);
    assert_eq!(first.showtime.price, 1299);
    assert!(first.seats.iter().all(|seat| seat.status == "available"));

    // Book two seats; total is price times count.
    let seats = vec!["A1".to_string(), "A2".to_string()];
    let confirmation =
        bookings::create_booking(store.as_ref(), &policy(), "1", &seats, "Jane", "jane@x.com")
            .await?;
    assert_eq!(confirmation.total_amount, 2598);
    assert_eq!(confirmation.seats, vec!["A1", "A2"]);

    // The same seats again lose with a conflict and change nothing.
    let err =
        bookings::create_booking(store.as_ref(), &policy(), "1", &seats, "Jane", "jane@x.com")
            .await
            .unwrap_err();
    assert!(matches!(err, AppError::Conflict(_)), "got {err:?}");

    // Well-formed identifier outside the grid resolves to nothing.
    let err = bookings::create_booking(
        store.as_ref(),
        &policy(),
        "1",
        &["Z9".to_string()],
        "Jane",
        "jane@x.com",
    )
    .await
    .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)), "got {err:?}");

    // Race eight transactions for one seat: exactly one winner.
    let mut handles = Vec::new();
    for _ in 0..8 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            bookings::create_booking(
                store.as_ref(),
                &policy(),
                "1",
                &["B5".to_string()],
                "Jane",
                "jane@x.com",
            )
            .await
        }));
    }
    let results: Vec<_> = futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("booking task panicked"))
        .collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();
    assert_eq!(winners, 1);
    assert_eq!(conflicts, 7);

    // Counter agrees with the seat records: 96 - A1 - A2 - B5.
    let map = store.seat_map("1").await?;
    let booked = map.seats.iter().filter(|s| s.status == "booked").count();
    assert_eq!(booked, 3);
    assert_eq!(store.reconcile_available_seats("1").await?, None);

    // Booking detail round-trips with seats in row-then-number order.
    let detail = store.booking_detail(confirmation.id).await?;
    assert_eq!(detail.seats, vec!["A1", "A2"]);
    assert_eq!(detail.total_amount, 2598);
    assert_eq!(detail.movie_title, "The Dark Knight");

    Ok(())
}
