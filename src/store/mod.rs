pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{BookingConfirmation, BookingDetail, Movie, MovieDetail, SeatId, SeatMap};

/// A validated booking request as handed to the store. The coordinator has
/// already parsed and deduplicated the seat identifiers and sorted them by
/// row then number, which is also the lock acquisition order.
#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub showtime_id: String,
    pub seats: Vec<SeatId>,
    pub customer_name: String,
    pub customer_email: String,
}

/// Result of a counter reconciliation: the value the counter held and the
/// value recomputed from seat records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CounterDrift {
    pub stored: i32,
    pub actual: i32,
}

/// Transactional port over the durable store.
///
/// `create_booking` is the atomic core: the availability check and all
/// mutations (seat flips, booking insert, counter decrement) commit as one
/// indivisible unit or not at all. Implementations must serialize the
/// check-then-act sequence against every concurrent booking touching any of
/// the same seats. `PostgresStore` does this with ordered row locks inside a
/// transaction; `MemoryStore` serializes through a single mutex and backs
/// the test suite.
#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn list_movies(&self) -> AppResult<Vec<Movie>>;

    async fn movie_detail(&self, movie_id: &str) -> AppResult<MovieDetail>;

    /// Idempotent create-if-absent of the full seat grid for a showtime.
    /// Concurrent first reads must not produce duplicates or partial grids.
    async fn materialize_seats(&self, showtime_id: &str) -> AppResult<()>;

    /// Seat map ordered by row then number. Materializes the grid on first
    /// access. Reads require no locking and may be slightly stale.
    async fn seat_map(&self, showtime_id: &str) -> AppResult<SeatMap>;

    /// The atomic booking transaction. Fails with `Conflict` if any
    /// requested seat is already booked, `NotFound` if the showtime or a
    /// requested seat record does not exist, `Transient` on lock-wait
    /// timeout / deadlock / serialization failure. Any failure leaves
    /// seats, counter and booking records untouched.
    async fn create_booking(&self, request: &BookingRequest) -> AppResult<BookingConfirmation>;

    async fn booking_detail(&self, booking_id: Uuid) -> AppResult<BookingDetail>;

    /// Ids of all showtimes, for the consistency sweep.
    async fn showtime_ids(&self) -> AppResult<Vec<String>>;

    /// Recompute the available-seat counter from seat records. Returns
    /// `Some(drift)` when the stored counter disagreed and was repaired,
    /// `None` when it was consistent. Showtimes whose grid has not been
    /// materialized yet are left alone.
    async fn reconcile_available_seats(&self, showtime_id: &str) -> AppResult<Option<CounterDrift>>;
}
