use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::config::{BookingConfig, HallConfig};
use crate::database::Database;
use crate::error::{AppError, AppResult};
use crate::models::{
    BookingConfirmation, BookingDetail, Movie, MovieDetail, Seat, SeatMap, SeatMapEntry,
    ShowtimeInfo, ShowtimeListing,
};
use crate::store::{BookingRequest, BookingStore, CounterDrift};

/// Authoritative store backed by Postgres.
///
/// The booking transaction locks the targeted seat rows with
/// `SELECT .. FOR UPDATE` in row/number order, so two bookings contending
/// for overlapping seats always acquire locks in the same order. Lock waits
/// are bounded by `lock_timeout`; timeouts, deadlocks and serialization
/// failures surface as `Transient` and are retried by the coordinator.
pub struct PostgresStore {
    db: Database,
    hall: HallConfig,
    booking: BookingConfig,
}

impl PostgresStore {
    pub fn new(db: Database, hall: HallConfig, booking: BookingConfig) -> Self {
        Self { db, hall, booking }
    }

    async fn showtime_info(&self, showtime_id: &str) -> AppResult<Option<ShowtimeInfo>> {
        let info = sqlx::query_as::<_, ShowtimeInfo>(
            r#"
            SELECT s.id, m.title AS movie_title, s.time, s.date, t.name AS theater, s.price
            FROM showtimes s
            JOIN movies m ON m.id = s.movie_id
            JOIN theaters t ON t.id = s.theater_id
            WHERE s.id = $1
            "#,
        )
        .bind(showtime_id)
        .fetch_optional(&self.db.pool)
        .await?;

        Ok(info)
    }
}

/* ---------- error mapping ---------- */

// serialization_failure, deadlock_detected, lock_not_available
const TRANSIENT_SQLSTATES: [&str; 3] = ["40001", "40P01", "55P03"];

fn map_storage_error(e: sqlx::Error) -> AppError {
    if let Some(code) = sqlstate(&e) {
        if TRANSIENT_SQLSTATES.contains(&code.as_str()) {
            return AppError::Transient("Storage is busy, please retry".to_string());
        }
    }
    AppError::Database(e)
}

fn is_check_violation(e: &sqlx::Error) -> bool {
    sqlstate(e).as_deref() == Some("23514")
}

fn sqlstate(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) => db.code().map(|c| c.to_string()),
        _ => None,
    }
}

#[derive(FromRow)]
struct LockedSeat {
    id: i64,
    booked: bool,
}

#[derive(FromRow)]
struct BookingRow {
    id: Uuid,
    movie_title: String,
    poster_url: String,
    time: String,
    date: String,
    theater: String,
    customer_name: String,
    customer_email: String,
    total_amount: i64,
    created_at: DateTime<Utc>,
}

#[async_trait]
impl BookingStore for PostgresStore {
    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let movies = sqlx::query_as::<_, Movie>(
            "SELECT id, title, description, poster_url, duration, genre, rating, imdb_rating, release_year
             FROM movies
             ORDER BY title",
        )
        .fetch_all(&self.db.pool)
        .await?;

        Ok(movies)
    }

    async fn movie_detail(&self, movie_id: &str) -> AppResult<MovieDetail> {
        let movie = sqlx::query_as::<_, Movie>(
            "SELECT id, title, description, poster_url, duration, genre, rating, imdb_rating, release_year
             FROM movies
             WHERE id = $1",
        )
        .bind(movie_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))?;

        let showtimes = sqlx::query_as::<_, ShowtimeListing>(
            r#"
            SELECT s.id, s.time, s.date, s.price, s.available_seats, t.name AS theater
            FROM showtimes s
            JOIN theaters t ON t.id = s.theater_id
            WHERE s.movie_id = $1
            ORDER BY s.id
            "#,
        )
        .bind(movie_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(MovieDetail { movie, showtimes })
    }

    async fn materialize_seats(&self, showtime_id: &str) -> AppResult<()> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM showtimes WHERE id = $1)",
        )
        .bind(showtime_id)
        .fetch_one(&self.db.pool)
        .await?;

        if !exists {
            return Err(AppError::NotFound("Showtime not found".to_string()));
        }

        let populated = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM seats WHERE showtime_id = $1)",
        )
        .bind(showtime_id)
        .fetch_one(&self.db.pool)
        .await?;

        if populated {
            return Ok(());
        }

        // Create-if-absent: the unique constraint on (showtime_id, row,
        // number) makes concurrent first reads converge on one grid.
        let rows: Vec<String> = self.hall.row_letters().map(String::from).collect();
        sqlx::query(
            r#"
            INSERT INTO seats (showtime_id, "row", number)
            SELECT $1, r.letter, n.num
            FROM unnest($2::text[]) AS r(letter)
            CROSS JOIN generate_series(1, $3) AS n(num)
            ON CONFLICT (showtime_id, "row", number) DO NOTHING
            "#,
        )
        .bind(showtime_id)
        .bind(&rows)
        .bind(self.hall.seats_per_row)
        .execute(&self.db.pool)
        .await?;

        Ok(())
    }

    async fn seat_map(&self, showtime_id: &str) -> AppResult<SeatMap> {
        let info = self
            .showtime_info(showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Showtime not found".to_string()))?;

        self.materialize_seats(showtime_id).await?;

        let seats = sqlx::query_as::<_, Seat>(
            r#"
            SELECT id, showtime_id, "row", number, booked, booking_id
            FROM seats
            WHERE showtime_id = $1
            ORDER BY "row", number
            "#,
        )
        .bind(showtime_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(SeatMap {
            showtime: info,
            seats: seats.iter().map(SeatMapEntry::from).collect(),
        })
    }

    async fn create_booking(&self, request: &BookingRequest) -> AppResult<BookingConfirmation> {
        let info = self
            .showtime_info(&request.showtime_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Showtime not found".to_string()))?;

        self.materialize_seats(&request.showtime_id).await?;

        let identifiers: Vec<String> = request.seats.iter().map(ToString::to_string).collect();

        let mut tx = self.db.pool.begin().await.map_err(map_storage_error)?;

        // Bounded lock wait; exceeding it raises 55P03 instead of hanging.
        sqlx::query(&format!(
            "SET LOCAL lock_timeout = {}",
            self.booking.lock_timeout_ms
        ))
        .execute(&mut *tx)
        .await
        .map_err(map_storage_error)?;

        // Lock the targeted seats in deterministic order, then re-check
        // availability under the lock. This closes the gap between what the
        // client saw on the seat map and what is true now.
        let locked = sqlx::query_as::<_, LockedSeat>(
            r#"
            SELECT id, booked
            FROM seats
            WHERE showtime_id = $1 AND "row" || number::text = ANY($2)
            ORDER BY "row", number
            FOR UPDATE
            "#,
        )
        .bind(&request.showtime_id)
        .bind(&identifiers)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_storage_error)?;

        if locked.len() != request.seats.len() {
            let _ = tx.rollback().await;
            return Err(AppError::NotFound(
                "Some selected seats do not exist".to_string(),
            ));
        }

        if locked.iter().any(|seat| seat.booked) {
            let _ = tx.rollback().await;
            return Err(AppError::Conflict(
                "Some selected seats are already booked".to_string(),
            ));
        }

        let booking_id = Uuid::new_v4();
        let seat_count = locked.len() as i64;
        let total_amount = info.price * seat_count;

        let created_at = sqlx::query_scalar::<_, DateTime<Utc>>(
            r#"
            INSERT INTO bookings (id, showtime_id, customer_name, customer_email, total_amount)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING created_at
            "#,
        )
        .bind(booking_id)
        .bind(&request.showtime_id)
        .bind(&request.customer_name)
        .bind(&request.customer_email)
        .bind(total_amount)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_storage_error)?;

        let seat_ids: Vec<i64> = locked.iter().map(|seat| seat.id).collect();
        sqlx::query("UPDATE seats SET booked = TRUE, booking_id = $1 WHERE id = ANY($2)")
            .bind(booking_id)
            .bind(&seat_ids)
            .execute(&mut *tx)
            .await
            .map_err(map_storage_error)?;

        let counter_update = sqlx::query(
            "UPDATE showtimes SET available_seats = available_seats - $1 WHERE id = $2",
        )
        .bind(seat_count as i32)
        .bind(&request.showtime_id)
        .execute(&mut *tx)
        .await;

        if let Err(e) = counter_update {
            let _ = tx.rollback().await;
            if is_check_violation(&e) {
                // The counter disagrees with the seat records. Repair it
                // from the authoritative rows instead of trusting it.
                tracing::warn!(
                    "available seats counter for showtime {} out of range, reconciling",
                    request.showtime_id
                );
                if let Err(re) = self.reconcile_available_seats(&request.showtime_id).await {
                    tracing::error!(
                        "failed to reconcile counter for showtime {}: {:?}",
                        request.showtime_id,
                        re
                    );
                }
                return Err(AppError::Transient(
                    "Seat availability is being recalculated, please retry".to_string(),
                ));
            }
            return Err(map_storage_error(e));
        }

        tx.commit().await.map_err(map_storage_error)?;

        Ok(BookingConfirmation {
            id: booking_id,
            movie_title: info.movie_title,
            showtime: info.time,
            date: info.date,
            theater: info.theater,
            seats: identifiers,
            customer_name: request.customer_name.clone(),
            customer_email: request.customer_email.clone(),
            total_amount,
            booking_date: created_at,
        })
    }

    async fn booking_detail(&self, booking_id: Uuid) -> AppResult<BookingDetail> {
        let row = sqlx::query_as::<_, BookingRow>(
            r#"
            SELECT b.id, m.title AS movie_title, m.poster_url, s.time, s.date,
                   t.name AS theater, b.customer_name, b.customer_email,
                   b.total_amount, b.created_at
            FROM bookings b
            JOIN showtimes s ON s.id = b.showtime_id
            JOIN movies m ON m.id = s.movie_id
            JOIN theaters t ON t.id = s.theater_id
            WHERE b.id = $1
            "#,
        )
        .bind(booking_id)
        .fetch_optional(&self.db.pool)
        .await?
        .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        let seats = sqlx::query_scalar::<_, String>(
            r#"
            SELECT "row" || number::text
            FROM seats
            WHERE booking_id = $1
            ORDER BY "row", number
            "#,
        )
        .bind(booking_id)
        .fetch_all(&self.db.pool)
        .await?;

        Ok(BookingDetail {
            id: row.id,
            movie_title: row.movie_title,
            poster_url: row.poster_url,
            showtime: row.time,
            date: row.date,
            theater: row.theater,
            seats,
            customer_name: row.customer_name,
            customer_email: row.customer_email,
            total_amount: row.total_amount,
            booking_date: row.created_at,
        })
    }

    async fn showtime_ids(&self) -> AppResult<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM showtimes ORDER BY id")
            .fetch_all(&self.db.pool)
            .await?;

        Ok(ids)
    }

    async fn reconcile_available_seats(&self, showtime_id: &str) -> AppResult<Option<CounterDrift>> {
        let mut tx = self.db.pool.begin().await.map_err(map_storage_error)?;

        let counts = sqlx::query_as::<_, (i32, i64, i64)>(
            r#"
            SELECT s.available_seats,
                   (SELECT COUNT(*) FROM seats WHERE showtime_id = s.id) AS total,
                   (SELECT COUNT(*) FROM seats WHERE showtime_id = s.id AND NOT booked) AS unbooked
            FROM showtimes s
            WHERE s.id = $1
            FOR UPDATE
            "#,
        )
        .bind(showtime_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(map_storage_error)?;

        let (stored, total, unbooked) = match counts {
            Some(counts) => counts,
            None => {
                let _ = tx.rollback().await;
                return Err(AppError::NotFound("Showtime not found".to_string()));
            }
        };

        // Not materialized yet: the counter is the only record there is.
        if total == 0 {
            let _ = tx.rollback().await;
            return Ok(None);
        }

        if i64::from(stored) == unbooked {
            let _ = tx.rollback().await;
            return Ok(None);
        }

        sqlx::query("UPDATE showtimes SET available_seats = $1 WHERE id = $2")
            .bind(unbooked as i32)
            .bind(showtime_id)
            .execute(&mut *tx)
            .await
            .map_err(map_storage_error)?;

        tx.commit().await.map_err(map_storage_error)?;

        Ok(Some(CounterDrift {
            stored,
            actual: unbooked as i32,
        }))
    }
}
