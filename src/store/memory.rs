use std::collections::{BTreeMap, HashMap};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::config::HallConfig;
use crate::error::{AppError, AppResult};
use crate::models::{
    Booking, BookingConfirmation, BookingDetail, Movie, MovieDetail, SeatId, SeatMap,
    SeatMapEntry, Showtime, ShowtimeInfo, ShowtimeListing, Theater,
};
use crate::store::{BookingRequest, BookingStore, CounterDrift};

/// In-memory store implementing the same atomicity contract as
/// `PostgresStore`: every operation runs under one mutex, so the
/// check-then-act sequence of a booking is serialized against all others.
/// This is the substitute the test suite runs against.
pub struct MemoryStore {
    hall: HallConfig,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    movies: BTreeMap<String, Movie>,
    theaters: HashMap<String, Theater>,
    showtimes: BTreeMap<String, Showtime>,
    // BTreeMap keyed by SeatId keeps each grid in row-then-number order.
    grids: HashMap<String, BTreeMap<SeatId, SeatSlot>>,
    bookings: HashMap<Uuid, StoredBooking>,
}

#[derive(Debug, Clone, Copy, Default)]
struct SeatSlot {
    booked: bool,
    booking_id: Option<Uuid>,
}

struct StoredBooking {
    booking: Booking,
    seats: Vec<SeatId>,
}

impl MemoryStore {
    pub fn new(hall: HallConfig) -> Self {
        Self {
            hall,
            inner: Mutex::new(Inner::default()),
        }
    }

    pub fn add_movie(&self, movie: Movie) {
        let mut inner = self.lock();
        inner.movies.insert(movie.id.clone(), movie);
    }

    pub fn add_theater(&self, theater: Theater) {
        let mut inner = self.lock();
        inner.theaters.insert(theater.id.clone(), theater);
    }

    pub fn add_showtime(&self, showtime: Showtime) {
        let mut inner = self.lock();
        inner.showtimes.insert(showtime.id.clone(), showtime);
    }

    /// Overwrite a showtime's counter, bypassing the booking transaction.
    /// Exists so tests can inject drift for the reconciliation path.
    pub fn force_available_seats(&self, showtime_id: &str, value: i32) {
        let mut inner = self.lock();
        if let Some(showtime) = inner.showtimes.get_mut(showtime_id) {
            showtime.available_seats = value;
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned mutex means a panic mid-mutation; tests should fail
        // loudly rather than observe torn state.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Inner {
    fn showtime_info(&self, showtime_id: &str) -> AppResult<ShowtimeInfo> {
        let showtime = self
            .showtimes
            .get(showtime_id)
            .ok_or_else(|| AppError::NotFound("Showtime not found".to_string()))?;
        let movie = self
            .movies
            .get(&showtime.movie_id)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("movie missing for showtime")))?;
        let theater = self
            .theaters
            .get(&showtime.theater_id)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("theater missing for showtime")))?;

        Ok(ShowtimeInfo {
            id: showtime.id.clone(),
            movie_title: movie.title.clone(),
            time: showtime.time.clone(),
            date: showtime.date.clone(),
            theater: theater.name.clone(),
            price: showtime.price,
        })
    }

    fn materialize(&mut self, hall: &HallConfig, showtime_id: &str) -> AppResult<()> {
        if !self.showtimes.contains_key(showtime_id) {
            return Err(AppError::NotFound("Showtime not found".to_string()));
        }

        self.grids.entry(showtime_id.to_string()).or_insert_with(|| {
            let mut grid = BTreeMap::new();
            for row in hall.row_letters() {
                for number in 1..=hall.seats_per_row {
                    grid.insert(SeatId { row, number }, SeatSlot::default());
                }
            }
            grid
        });

        Ok(())
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn list_movies(&self) -> AppResult<Vec<Movie>> {
        let inner = self.lock();
        let mut movies: Vec<Movie> = inner.movies.values().cloned().collect();
        movies.sort_by(|a, b| a.title.cmp(&b.title));
        Ok(movies)
    }

    async fn movie_detail(&self, movie_id: &str) -> AppResult<MovieDetail> {
        let inner = self.lock();
        let movie = inner
            .movies
            .get(movie_id)
            .cloned()
            .ok_or_else(|| AppError::NotFound("Movie not found".to_string()))?;

        let showtimes = inner
            .showtimes
            .values()
            .filter(|showtime| showtime.movie_id == movie_id)
            .map(|showtime| {
                let theater = inner
                    .theaters
                    .get(&showtime.theater_id)
                    .map(|theater| theater.name.clone())
                    .unwrap_or_default();
                ShowtimeListing {
                    id: showtime.id.clone(),
                    time: showtime.time.clone(),
                    date: showtime.date.clone(),
                    price: showtime.price,
                    available_seats: showtime.available_seats,
                    theater,
                }
            })
            .collect();

        Ok(MovieDetail { movie, showtimes })
    }

    async fn materialize_seats(&self, showtime_id: &str) -> AppResult<()> {
        let mut inner = self.lock();
        inner.materialize(&self.hall, showtime_id)
    }

    async fn seat_map(&self, showtime_id: &str) -> AppResult<SeatMap> {
        let mut inner = self.lock();
        let info = inner.showtime_info(showtime_id)?;
        inner.materialize(&self.hall, showtime_id)?;

        let grid = &inner.grids[showtime_id];
        let seats = grid
            .iter()
            .map(|(seat_id, slot)| SeatMapEntry {
                id: seat_id.to_string(),
                row: seat_id.row.to_string(),
                number: seat_id.number,
                status: if slot.booked { "booked" } else { "available" }.to_string(),
            })
            .collect();

        Ok(SeatMap {
            showtime: info,
            seats,
        })
    }

    async fn create_booking(&self, request: &BookingRequest) -> AppResult<BookingConfirmation> {
        let mut inner = self.lock();
        let info = inner.showtime_info(&request.showtime_id)?;
        inner.materialize(&self.hall, &request.showtime_id)?;

        // The availability check and the mutations below happen under one
        // lock, which is what makes this the same contract as the
        // Postgres transaction.
        {
            let grid = &inner.grids[&request.showtime_id];
            for seat in &request.seats {
                match grid.get(seat) {
                    None => {
                        return Err(AppError::NotFound(
                            "Some selected seats do not exist".to_string(),
                        ))
                    }
                    Some(slot) if slot.booked => {
                        return Err(AppError::Conflict(
                            "Some selected seats are already booked".to_string(),
                        ))
                    }
                    Some(_) => {}
                }
            }
        }

        let booking_id = Uuid::new_v4();
        let seat_count = request.seats.len() as i32;
        let total_amount = info.price * i64::from(seat_count);
        let created_at = Utc::now();

        let grid = inner
            .grids
            .get_mut(&request.showtime_id)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("grid missing after materialization")))?;
        for seat in &request.seats {
            if let Some(slot) = grid.get_mut(seat) {
                slot.booked = true;
                slot.booking_id = Some(booking_id);
            }
        }
        let unbooked = grid.values().filter(|slot| !slot.booked).count() as i32;

        let showtime = inner
            .showtimes
            .get_mut(&request.showtime_id)
            .ok_or_else(|| AppError::Internal(anyhow::anyhow!("showtime missing mid-transaction")))?;
        let remaining = showtime.available_seats - seat_count;
        if remaining < 0 {
            tracing::warn!(
                "available seats counter for showtime {} out of range, reconciling",
                request.showtime_id
            );
            showtime.available_seats = unbooked;
        } else {
            showtime.available_seats = remaining;
        }

        let booking = Booking {
            id: booking_id,
            showtime_id: request.showtime_id.clone(),
            customer_name: request.customer_name.clone(),
            customer_email: request.customer_email.clone(),
            total_amount,
            created_at,
        };
        inner.bookings.insert(
            booking_id,
            StoredBooking {
                booking,
                seats: request.seats.clone(),
            },
        );

        Ok(BookingConfirmation {
            id: booking_id,
            movie_title: info.movie_title,
            showtime: info.time,
            date: info.date,
            theater: info.theater,
            seats: request.seats.iter().map(ToString::to_string).collect(),
            customer_name: request.customer_name.clone(),
            customer_email: request.customer_email.clone(),
            total_amount,
            booking_date: created_at,
        })
    }

    async fn booking_detail(&self, booking_id: Uuid) -> AppResult<BookingDetail> {
        let inner = self.lock();
        let stored = inner
            .bookings
            .get(&booking_id)
            .ok_or_else(|| AppError::NotFound("Booking not found".to_string()))?;

        let info = inner.showtime_info(&stored.booking.showtime_id)?;
        let poster_url = inner
            .showtimes
            .get(&stored.booking.showtime_id)
            .and_then(|showtime| inner.movies.get(&showtime.movie_id))
            .map(|movie| movie.poster_url.clone())
            .unwrap_or_default();

        let mut seats = stored.seats.clone();
        seats.sort();

        Ok(BookingDetail {
            id: stored.booking.id,
            movie_title: info.movie_title,
            poster_url,
            showtime: info.time,
            date: info.date,
            theater: info.theater,
            seats: seats.iter().map(ToString::to_string).collect(),
            customer_name: stored.booking.customer_name.clone(),
            customer_email: stored.booking.customer_email.clone(),
            total_amount: stored.booking.total_amount,
            booking_date: stored.booking.created_at,
        })
    }

    async fn showtime_ids(&self) -> AppResult<Vec<String>> {
        let inner = self.lock();
        Ok(inner.showtimes.keys().cloned().collect())
    }

    async fn reconcile_available_seats(&self, showtime_id: &str) -> AppResult<Option<CounterDrift>> {
        let mut inner = self.lock();
        if !inner.showtimes.contains_key(showtime_id) {
            return Err(AppError::NotFound("Showtime not found".to_string()));
        }

        let unbooked = match inner.grids.get(showtime_id) {
            // Not materialized yet: the counter is the only record there is.
            None => return Ok(None),
            Some(grid) => grid.values().filter(|slot| !slot.booked).count() as i32,
        };

        let showtime = inner
            .showtimes
            .get_mut(showtime_id)
            .ok_or_else(|| AppError::NotFound("Showtime not found".to_string()))?;
        if showtime.available_seats == unbooked {
            return Ok(None);
        }

        let stored = showtime.available_seats;
        showtime.available_seats = unbooked;

        Ok(Some(CounterDrift {
            stored,
            actual: unbooked,
        }))
    }
}
