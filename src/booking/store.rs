use async_trait::async_trait;
use time::Date;

use crate::db::{DatabaseError, NewReservation, Reservation};

use super::slots::Slot;

/// Persistence capability consumed by the availability resolver and the
/// booking conflict guard. The sqlx implementation lives in
/// `db::repositories`; tests substitute an in-memory store.
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// All reservations for `date` whose status still occupies a slot
    /// (pending or confirmed). Cancelled and completed rows are never
    /// returned.
    async fn reservations_for_date(&self, date: Date) -> Result<Vec<Reservation>, DatabaseError>;

    /// Whether an occupying reservation exists for the exact (date, slot)
    /// pair.
    async fn slot_taken(&self, date: Date, slot: Slot) -> Result<bool, DatabaseError>;

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Reservation>, DatabaseError>;

    /// Insert a new confirmed reservation. Must fail with
    /// `DatabaseError::Duplicate` when another occupying reservation holds
    /// the same (date, slot) pair; the backing store enforces this with a
    /// uniqueness constraint, not a read.
    async fn insert(&self, new: &NewReservation) -> Result<Reservation, DatabaseError>;
}
