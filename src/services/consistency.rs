use crate::store::BookingStore;

/// One pass of the counter consistency sweep.
///
/// The available-seat counter is derived state; whenever it disagrees with
/// the seat records it is repaired from them, never the other way around.
/// Drift is logged for investigation and is not propagated into writes.
pub async fn run_sweep(store: &dyn BookingStore) {
    let ids = match store.showtime_ids().await {
        Ok(ids) => ids,
        Err(e) => {
            tracing::error!("failed to list showtimes for consistency sweep: {:?}", e);
            return;
        }
    };

    for id in ids {
        match store.reconcile_available_seats(&id).await {
            Ok(None) => {}
            Ok(Some(drift)) => {
                tracing::warn!(
                    "available seats counter for showtime {} drifted (stored {}, actual {}), repaired",
                    id,
                    drift.stored,
                    drift.actual
                );
            }
            Err(e) => {
                tracing::error!("consistency check failed for showtime {}: {:?}", id, e);
            }
        }
    }
}
