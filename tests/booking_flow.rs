//! Service-level tests for the availability resolver and the booking
//! conflict guard, run against an in-memory reservation store and a fixed
//! clock.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use time::macros::{date, datetime, offset};
use time::{Date, OffsetDateTime, UtcOffset};
use uuid::Uuid;

use nutrivida_backend::booking::availability::{self, Availability};
use nutrivida_backend::booking::clock::Clock;
use nutrivida_backend::booking::guard;
use nutrivida_backend::booking::slots::{self, Slot, SLOT_GRID_MINUTES};
use nutrivida_backend::booking::store::ReservationStore;
use nutrivida_backend::db::{
    AppointmentType, DatabaseError, NewReservation, Reservation, ReservationStatus,
};
use nutrivida_backend::error::AppError;

const BUSINESS_TZ: UtcOffset = offset!(+8);
const BUFFER_MINUTES: u16 = 30;

struct FixedClock(OffsetDateTime);

impl Clock for FixedClock {
    fn now_utc(&self) -> OffsetDateTime {
        self.0
    }
}

// 2025-08-01 10:00 business-local.
fn morning_clock() -> FixedClock {
    FixedClock(datetime!(2025 - 08 - 01 02:00 UTC))
}

#[derive(Default)]
struct MemoryStore {
    rows: Mutex<Vec<Reservation>>,
    fail_reads: bool,
}

impl MemoryStore {
    fn failing() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            fail_reads: true,
        }
    }

    fn push(&self, date: Date, slot: &str, duration: i32, status: ReservationStatus) {
        let slot: Slot = slot.parse().unwrap();
        self.rows.lock().unwrap().push(Reservation {
            id: Uuid::now_v7(),
            date,
            start_time: slot,
            duration_minutes: duration,
            appointment_type: AppointmentType::FollowUp,
            status,
            client_name: "Dana Reyes".into(),
            client_email: "dana@example.com".into(),
            client_phone: None,
            notes: None,
            idempotency_key: None,
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        });
    }
}

#[async_trait]
impl ReservationStore for MemoryStore {
    async fn reservations_for_date(&self, date: Date) -> Result<Vec<Reservation>, DatabaseError> {
        if self.fail_reads {
            return Err(DatabaseError::Sqlx(sqlx::Error::PoolTimedOut));
        }
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .filter(|r| r.date == date && r.status.occupies_slot())
            .cloned()
            .collect())
    }

    async fn slot_taken(&self, date: Date, slot: Slot) -> Result<bool, DatabaseError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .any(|r| r.date == date && r.start_time == slot && r.status.occupies_slot()))
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Reservation>, DatabaseError> {
        let rows = self.rows.lock().unwrap();
        Ok(rows
            .iter()
            .find(|r| r.idempotency_key.as_deref() == Some(key))
            .cloned())
    }

    // Check and insert under one lock, the way the database's partial
    // unique index makes the real insert atomic.
    async fn insert(&self, new: &NewReservation) -> Result<Reservation, DatabaseError> {
        let mut rows = self.rows.lock().unwrap();
        if rows
            .iter()
            .any(|r| r.date == new.date && r.start_time == new.start_time && r.status.occupies_slot())
        {
            return Err(DatabaseError::Duplicate);
        }
        let reservation = Reservation {
            id: Uuid::now_v7(),
            date: new.date,
            start_time: new.start_time,
            duration_minutes: new.duration_minutes(),
            appointment_type: new.appointment_type,
            status: ReservationStatus::Confirmed,
            client_name: new.client_name.clone(),
            client_email: new.client_email.clone(),
            client_phone: new.client_phone.clone(),
            notes: new.notes.clone(),
            idempotency_key: new.idempotency_key.clone(),
            created_at: OffsetDateTime::now_utc(),
            updated_at: OffsetDateTime::now_utc(),
        };
        rows.push(reservation.clone());
        Ok(reservation)
    }
}

fn booking(date: Date, slot: &str, appointment_type: AppointmentType) -> NewReservation {
    NewReservation {
        date,
        start_time: slot.parse().unwrap(),
        appointment_type,
        client_name: "Dana Reyes".into(),
        client_email: "dana@example.com".into(),
        client_phone: None,
        notes: None,
        idempotency_key: None,
    }
}

fn contains(slots: &[Slot], label: &str) -> bool {
    slots.iter().any(|s| s.to_string() == label)
}

async fn availability_on(store: &MemoryStore, date: Date, span: u16) -> Availability {
    availability::get_availability(store, &morning_clock(), BUSINESS_TZ, BUFFER_MINUTES, date, span)
        .await
}

#[tokio::test]
async fn booked_slot_disappears_from_availability() {
    let store = MemoryStore::default();
    let date = date!(2025 - 09 - 01);

    guard::reserve_slot(
        &store,
        &morning_clock(),
        BUSINESS_TZ,
        BUFFER_MINUTES,
        booking(date, "9:00 AM", AppointmentType::FollowUp),
    )
    .await
    .unwrap();

    let availability = availability_on(&store, date, SLOT_GRID_MINUTES).await;
    assert!(!contains(&availability.available_slots, "9:00 AM"));
    assert!(contains(&availability.booked_slots, "9:00 AM"));
    assert_eq!(
        availability.available_slots.len() + availability.booked_slots.len(),
        slots::catalog().len()
    );
}

#[tokio::test]
async fn cancelled_reservation_does_not_block() {
    let store = MemoryStore::default();
    let date = date!(2025 - 09 - 01);
    store.push(date, "10:00 AM", 45, ReservationStatus::Cancelled);

    let availability = availability_on(&store, date, SLOT_GRID_MINUTES).await;
    assert!(contains(&availability.available_slots, "10:00 AM"));

    // A cancelled holder does not trip the conflict guard either.
    let result = guard::reserve_slot(
        &store,
        &morning_clock(),
        BUSINESS_TZ,
        BUFFER_MINUTES,
        booking(date, "10:00 AM", AppointmentType::FollowUp),
    )
    .await;
    assert!(result.is_ok());
}

#[tokio::test]
async fn second_booking_for_same_slot_conflicts() {
    let store = MemoryStore::default();
    let date = date!(2025 - 09 - 01);
    let first = booking(date, "2:00 PM", AppointmentType::InitialConsultation);
    let second = booking(date, "2:00 PM", AppointmentType::FollowUp);

    guard::reserve_slot(&store, &morning_clock(), BUSINESS_TZ, BUFFER_MINUTES, first)
        .await
        .unwrap();
    let result =
        guard::reserve_slot(&store, &morning_clock(), BUSINESS_TZ, BUFFER_MINUTES, second).await;

    assert!(matches!(result, Err(AppError::SlotConflict)));
    assert_eq!(store.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_bookings_yield_exactly_one_success() {
    let store = Arc::new(MemoryStore::default());
    let date = date!(2025 - 09 - 01);
    let clock = morning_clock();

    let (a, b) = tokio::join!(
        guard::reserve_slot(
            store.as_ref(),
            &clock,
            BUSINESS_TZ,
            BUFFER_MINUTES,
            booking(date, "3:00 PM", AppointmentType::FollowUp),
        ),
        guard::reserve_slot(
            store.as_ref(),
            &clock,
            BUSINESS_TZ,
            BUFFER_MINUTES,
            booking(date, "3:00 PM", AppointmentType::MealPlanReview),
        ),
    );

    let successes = [a.is_ok(), b.is_ok()].iter().filter(|ok| **ok).count();
    assert_eq!(successes, 1);
    assert!(matches!(
        [a, b].into_iter().find(|r| r.is_err()).unwrap(),
        Err(AppError::SlotConflict)
    ));
    assert_eq!(store.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn idempotent_retry_returns_the_original_reservation() {
    let store = MemoryStore::default();
    let date = date!(2025 - 09 - 01);
    let mut request = booking(date, "4:00 PM", AppointmentType::MetabolicAssessment);
    request.idempotency_key = Some("booking-wizard-7f3a91c2".into());

    let first = guard::reserve_slot(
        &store,
        &morning_clock(),
        BUSINESS_TZ,
        BUFFER_MINUTES,
        request.clone(),
    )
    .await
    .unwrap();
    let retried =
        guard::reserve_slot(&store, &morning_clock(), BUSINESS_TZ, BUFFER_MINUTES, request)
            .await
            .unwrap();

    assert_eq!(first.id, retried.id);
    assert_eq!(store.rows.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn past_and_buffered_times_are_rejected() {
    let store = MemoryStore::default();
    // Local now is 2025-08-01 10:00, buffer 30.
    let today = date!(2025 - 08 - 01);

    let earlier_today = guard::reserve_slot(
        &store,
        &morning_clock(),
        BUSINESS_TZ,
        BUFFER_MINUTES,
        booking(today, "9:00 AM", AppointmentType::FollowUp),
    )
    .await;
    assert!(matches!(earlier_today, Err(AppError::InvalidArgument(_))));

    let inside_buffer = guard::reserve_slot(
        &store,
        &morning_clock(),
        BUSINESS_TZ,
        BUFFER_MINUTES,
        booking(today, "10:00 AM", AppointmentType::FollowUp),
    )
    .await;
    assert!(matches!(inside_buffer, Err(AppError::InvalidArgument(_))));

    let yesterday = guard::reserve_slot(
        &store,
        &morning_clock(),
        BUSINESS_TZ,
        BUFFER_MINUTES,
        booking(date!(2025 - 07 - 31), "4:00 PM", AppointmentType::FollowUp),
    )
    .await;
    assert!(matches!(yesterday, Err(AppError::InvalidArgument(_))));

    // Past the buffer on the same day is fine.
    let later_today = guard::reserve_slot(
        &store,
        &morning_clock(),
        BUSINESS_TZ,
        BUFFER_MINUTES,
        booking(today, "11:00 AM", AppointmentType::FollowUp),
    )
    .await;
    assert!(later_today.is_ok());
}

#[tokio::test]
async fn off_catalog_times_are_rejected() {
    let store = MemoryStore::default();
    let result = guard::reserve_slot(
        &store,
        &morning_clock(),
        BUSINESS_TZ,
        BUFFER_MINUTES,
        booking(date!(2025 - 09 - 01), "12:00 PM", AppointmentType::FollowUp),
    )
    .await;
    assert!(matches!(result, Err(AppError::InvalidArgument(_))));
}

#[tokio::test]
async fn same_day_availability_applies_the_buffer() {
    let store = MemoryStore::default();
    // Local now 10:00 + 30 buffer: 10:00 is gone; 10:30 starts exactly at
    // the cutoff and stays bookable.
    let availability = availability_on(&store, date!(2025 - 08 - 01), SLOT_GRID_MINUTES).await;
    assert!(!contains(&availability.available_slots, "9:30 AM"));
    assert!(!contains(&availability.available_slots, "10:00 AM"));
    assert!(contains(&availability.available_slots, "10:30 AM"));
    assert!(contains(&availability.available_slots, "11:00 AM"));

    // Any other date gets the whole catalog.
    let tomorrow = availability_on(&store, date!(2025 - 08 - 02), SLOT_GRID_MINUTES).await;
    assert_eq!(tomorrow.available_slots.len(), slots::catalog().len());
}

#[tokio::test]
async fn fetch_failure_degrades_to_fully_booked() {
    let store = MemoryStore::failing();
    let availability = availability_on(&store, date!(2025 - 09 - 01), SLOT_GRID_MINUTES).await;
    assert!(availability.available_slots.is_empty());
    assert_eq!(availability.booked_slots.len(), slots::catalog().len());
}

#[tokio::test]
async fn intended_duration_exposes_hidden_overlaps() {
    let store = MemoryStore::default();
    let date = date!(2025 - 09 - 01);
    store.push(date, "10:00 AM", 45, ReservationStatus::Confirmed);

    // On the 30-minute grid 9:00 looks free,
    let grid = availability_on(&store, date, SLOT_GRID_MINUTES).await;
    assert!(contains(&grid.available_slots, "9:00 AM"));

    // but a 120-minute assessment starting at 9:00 would collide.
    let long = availability_on(&store, date, 120).await;
    assert!(!contains(&long.available_slots, "9:00 AM"));
}
