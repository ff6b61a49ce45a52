use time::UtcOffset;
use tracing::info;

use crate::db::{DatabaseError, NewReservation, Reservation};
use crate::error::AppError;

use super::clock::Clock;
use super::slots;
use super::store::ReservationStore;

/// Final authoritative check before committing a reservation, closing the
/// window between "client viewed availability" and "client submitted".
///
/// The pre-check here is only the friendly fast path; the store's uniqueness
/// constraint on occupying (date, slot) pairs is the guard of record, and a
/// duplicate on insert is reported as the same conflict.
pub async fn reserve_slot(
    store: &dyn ReservationStore,
    clock: &dyn Clock,
    business_offset: UtcOffset,
    buffer_minutes: u16,
    new: NewReservation,
) -> Result<Reservation, AppError> {
    if !slots::is_catalog_slot(new.start_time) {
        return Err(AppError::InvalidArgument(format!(
            "{} is not a bookable time",
            new.start_time
        )));
    }

    let local_now = clock.now_utc().to_offset(business_offset);
    let cutoff = local_now.hour() as u16 * 60 + local_now.minute() as u16 + buffer_minutes;
    if new.date < local_now.date()
        || (new.date == local_now.date() && new.start_time.minute_of_day() < cutoff)
    {
        return Err(AppError::InvalidArgument(
            "the requested time has already passed".into(),
        ));
    }

    // A retried submission with the same key gets the original reservation
    // back instead of a duplicate or a spurious conflict.
    if let Some(key) = new.idempotency_key.as_deref() {
        match store.find_by_idempotency_key(key).await {
            Ok(Some(existing)) => {
                info!(id = %existing.id, key, "idempotent replay, returning existing reservation");
                return Ok(existing);
            }
            Ok(None) => {}
            Err(err) => return Err(AppError::UpstreamUnavailable(err.to_string())),
        }
    }

    // A failed occupancy check is never treated as "no conflict".
    match store.slot_taken(new.date, new.start_time).await {
        Ok(true) => return Err(AppError::SlotConflict),
        Ok(false) => {}
        Err(err) => return Err(AppError::UpstreamUnavailable(err.to_string())),
    }

    match store.insert(&new).await {
        Ok(reservation) => {
            info!(
                id = %reservation.id,
                date = %reservation.date,
                slot = %reservation.start_time,
                kind = ?reservation.appointment_type,
                "reservation confirmed"
            );
            Ok(reservation)
        }
        Err(DatabaseError::Duplicate) => Err(AppError::SlotConflict),
        Err(err) => Err(AppError::WriteFailure(err.to_string())),
    }
}
