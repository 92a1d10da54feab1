use std::collections::HashSet;
use std::sync::Arc;

use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;
use proptest::prelude::*;

use cinema_booking::config::{BookingConfig, HallConfig};
use cinema_booking::error::{AppError, AppResult};
use cinema_booking::models::{BookingConfirmation, Movie, Showtime, Theater};
use cinema_booking::services::bookings;
use cinema_booking::store::{BookingStore, MemoryStore};

fn hall() -> HallConfig {
    HallConfig {
        rows: 8,
        seats_per_row: 12,
    }
}

fn policy() -> BookingConfig {
    BookingConfig {
        max_retries: 3,
        retry_backoff_ms: 1,
        lock_timeout_ms: 100,
        sweep_interval_secs: 300,
    }
}

async fn seeded_store() -> Arc<MemoryStore> {
    let store = MemoryStore::new(hall());
    store.add_movie(Movie {
        id: "1".into(),
        title: "The Dark Knight".into(),
        description: "Batman faces the Joker.".into(),
        poster_url: "/dark-knight-poster.png".into(),
        duration: 152,
        genre: "Action, Crime, Drama".into(),
        rating: "PG-13".into(),
        imdb_rating: Some(9.0),
        release_year: Some(2008),
    });
    store.add_theater(Theater {
        id: "theater-1".into(),
        name: "Cinema Hall 1".into(),
        capacity: 96,
        theater_type: "standard".into(),
    });
    store.add_showtime(Showtime {
        id: "1".into(),
        movie_id: "1".into(),
        theater_id: "theater-1".into(),
        time: "2:00 PM".into(),
        date: "Today".into(),
        price: 1299,
        available_seats: 96,
    });
    store.seat_map("1").await.expect("seed seat map");
    Arc::new(store)
}

async fn spawn_bookings(
    store: &Arc<MemoryStore>,
    seat_sets: Vec<Vec<String>>,
) -> Vec<AppResult<BookingConfirmation>> {
    let mut handles = Vec::with_capacity(seat_sets.len());
    for seats in seat_sets {
        let store = Arc::clone(store);
        handles.push(tokio::spawn(async move {
            let customer: String = Name().fake();
            let email: String = SafeEmail().fake();
            bookings::create_booking(store.as_ref(), &policy(), "1", &seats, &customer, &email)
                .await
        }));
    }

    futures::future::join_all(handles)
        .await
        .into_iter()
        .map(|joined| joined.expect("booking task panicked"))
        .collect()
}

async fn assert_consistent(store: &MemoryStore) {
    // The denormalized counter must equal the count of unbooked seats; a
    // reconcile pass finding nothing to repair proves it.
    assert_eq!(store.reconcile_available_seats("1").await.unwrap(), None);
}

/// 100 concurrent attempts at the same single seat: exactly one wins, the
/// rest lose with a conflict, and the seat ends booked exactly once.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn contested_seat_has_exactly_one_winner() {
    let store = seeded_store().await;

    let seat_sets: Vec<Vec<String>> = (0..100).map(|_| vec!["B5".to_string()]).collect();
    let results = spawn_bookings(&store, seat_sets).await;

    let successes: Vec<_> = results.iter().filter(|r| r.is_ok()).collect();
    let conflicts = results
        .iter()
        .filter(|r| matches!(r, Err(AppError::Conflict(_))))
        .count();

    assert_eq!(successes.len(), 1);
    assert_eq!(conflicts, 99);

    let map = store.seat_map("1").await.unwrap();
    let booked: Vec<_> = map.seats.iter().filter(|s| s.status == "booked").collect();
    assert_eq!(booked.len(), 1);
    assert_eq!(booked[0].id, "B5");

    assert_consistent(&store).await;
}

/// A chain of overlapping seat sets: winners never overlap each other, and
/// every loser lost to a committed winner.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn overlapping_sets_commit_disjointly() {
    let store = seeded_store().await;

    let seat_sets: Vec<Vec<String>> = vec![
        vec!["A1".into(), "A2".into()],
        vec!["A2".into(), "A3".into()],
        vec!["A3".into(), "A4".into()],
        vec!["A4".into(), "A1".into()],
    ];
    let results = spawn_bookings(&store, seat_sets.clone()).await;

    let mut winner_seats: Vec<String> = Vec::new();
    for result in &results {
        match result {
            Ok(confirmation) => winner_seats.extend(confirmation.seats.clone()),
            Err(AppError::Conflict(_)) => {}
            Err(other) => panic!("unexpected error: {other:?}"),
        }
    }

    // No seat appears in two committed bookings.
    let unique: HashSet<&String> = winner_seats.iter().collect();
    assert_eq!(unique.len(), winner_seats.len());

    let map = store.seat_map("1").await.unwrap();
    let booked: HashSet<String> = map
        .seats
        .iter()
        .filter(|s| s.status == "booked")
        .map(|s| s.id.clone())
        .collect();
    let winner_set: HashSet<String> = winner_seats.iter().cloned().collect();
    assert_eq!(booked, winner_set);

    assert_consistent(&store).await;
}

/* ---------- property: every interleaving ---------- */

// Seat pool the generated subsets draw from; two rows is enough to force
// heavy overlap.
fn pool_seat(index: usize) -> String {
    let row = if index < 12 { 'A' } else { 'B' };
    format!("{}{}", row, index % 12 + 1)
}

fn seat_set_strategy() -> impl Strategy<Value = Vec<Vec<String>>> {
    prop::collection::vec(
        prop::collection::btree_set(0usize..24, 1..5).prop_map(|set| {
            set.into_iter().map(pool_seat).collect::<Vec<String>>()
        }),
        2..8,
    )
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 24,
        .. ProptestConfig::default()
    })]

    /// For arbitrary overlapping seat sets raced against each other:
    /// committed bookings are pairwise disjoint, every loser overlaps a
    /// winner, and the counter matches the seat records afterwards.
    #[test]
    fn concurrent_overlapping_bookings_never_double_book(seat_sets in seat_set_strategy()) {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(4)
            .enable_all()
            .build()
            .expect("runtime");

        runtime.block_on(async {
            let store = seeded_store().await;
            let results = spawn_bookings(&store, seat_sets.clone()).await;

            // First pass: collect every committed seat and check
            // disjointness. Commit order is arbitrary, so losers are only
            // judged once all winners are known.
            let mut winner_seats: HashSet<String> = HashSet::new();
            for result in &results {
                if let Ok(confirmation) = result {
                    for seat in &confirmation.seats {
                        prop_assert!(
                            winner_seats.insert(seat.clone()),
                            "seat {} confirmed by two bookings",
                            seat
                        );
                    }
                }
            }

            for (result, requested) in results.iter().zip(&seat_sets) {
                match result {
                    Ok(_) => {}
                    Err(AppError::Conflict(_)) => {
                        // A loser must have collided with a committed winner.
                        prop_assert!(
                            requested.iter().any(|seat| winner_seats.contains(seat)),
                            "conflict without an overlapping winner: {:?}",
                            requested
                        );
                    }
                    Err(other) => prop_assert!(false, "unexpected error: {other:?}"),
                }
            }

            let map = store.seat_map("1").await.unwrap();
            let booked: HashSet<String> = map
                .seats
                .iter()
                .filter(|s| s.status == "booked")
                .map(|s| s.id.clone())
                .collect();
            prop_assert_eq!(&booked, &winner_seats);

            prop_assert_eq!(store.reconcile_available_seats("1").await.unwrap(), None);
            Ok(())
        })?;
    }
}
