use serde::Serialize;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::warn;

use crate::db::Reservation;

use super::clock::Clock;
use super::slots::{self, Slot};
use super::store::ReservationStore;

/// The half-open minute range `[start, end)` a reservation blocks out.
/// Derived per request, never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OccupiedInterval {
    pub start: u16,
    pub end: u16,
}

impl OccupiedInterval {
    pub fn new(start: u16, duration_minutes: u16) -> Self {
        Self {
            start,
            end: start + duration_minutes,
        }
    }

    pub fn from_reservation(reservation: &Reservation) -> Self {
        Self::new(
            reservation.start_time.minute_of_day(),
            reservation.duration_minutes as u16,
        )
    }

    /// Strict half-open overlap test against `[start, end)`.
    pub fn overlaps(&self, start: u16, end: u16) -> bool {
        start < self.end && end > self.start
    }
}

/// Free and taken slots for one date. Computed fresh on every request;
/// `booked_slots` is always the catalog complement of `available_slots`.
#[derive(Debug, Clone, Serialize)]
pub struct Availability {
    pub date: Date,
    pub available_slots: Vec<Slot>,
    pub booked_slots: Vec<Slot>,
}

impl Availability {
    pub fn new(date: Date, available_slots: Vec<Slot>) -> Self {
        let booked_slots = slots::catalog()
            .iter()
            .copied()
            .filter(|slot| !available_slots.contains(slot))
            .collect();
        Self {
            date,
            available_slots,
            booked_slots,
        }
    }

    /// The fail-safe result used when the reservation lookup is unavailable:
    /// never offer a slot that might actually be taken.
    pub fn fully_booked(date: Date) -> Self {
        Self::new(date, Vec::new())
    }
}

/// Catalog slots whose `[start, start + slot_span_minutes)` interval clears
/// every occupied interval, in catalog order. `earliest_start` drops
/// same-day slots inside the booking buffer.
pub fn free_slots(
    occupied: &[OccupiedInterval],
    slot_span_minutes: u16,
    earliest_start: Option<u16>,
) -> Vec<Slot> {
    slots::catalog()
        .iter()
        .copied()
        .filter(|slot| {
            let start = slot.minute_of_day();
            if let Some(earliest) = earliest_start {
                if start < earliest {
                    return false;
                }
            }
            let end = start + slot_span_minutes;
            !occupied.iter().any(|interval| interval.overlaps(start, end))
        })
        .collect()
}

/// Business-local minute-of-day before which a same-day slot may no longer be
/// booked, or `None` when `date` is not "today" in the business timezone.
///
/// "Today" is decided by converting the current instant to the business
/// offset and comparing calendar dates. Comparing against the UTC date would
/// misclassify the hours around local midnight.
pub fn earliest_bookable_minute(
    now_utc: OffsetDateTime,
    business_offset: UtcOffset,
    buffer_minutes: u16,
    date: Date,
) -> Option<u16> {
    let local = now_utc.to_offset(business_offset);
    if local.date() != date {
        return None;
    }
    Some(local.hour() as u16 * 60 + local.minute() as u16 + buffer_minutes)
}

/// Resolve availability for `date`.
///
/// A failed reservation lookup degrades to a fully-booked result instead of
/// an error: the UI stays up and no possibly-taken slot is ever offered.
pub async fn get_availability(
    store: &dyn ReservationStore,
    clock: &dyn Clock,
    business_offset: UtcOffset,
    buffer_minutes: u16,
    date: Date,
    slot_span_minutes: u16,
) -> Availability {
    let occupied: Vec<OccupiedInterval> = match store.reservations_for_date(date).await {
        Ok(reservations) => reservations
            .iter()
            .map(OccupiedInterval::from_reservation)
            .collect(),
        Err(err) => {
            warn!(%date, error = %err, "reservation lookup failed, degrading to fully booked");
            return Availability::fully_booked(date);
        }
    };

    let earliest =
        earliest_bookable_minute(clock.now_utc(), business_offset, buffer_minutes, date);
    Availability::new(date, free_slots(&occupied, slot_span_minutes, earliest))
}
