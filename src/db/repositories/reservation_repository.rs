use async_trait::async_trait;
use sqlx::PgPool;
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use crate::booking::slots::Slot;
use crate::booking::store::ReservationStore;
use crate::db::models::{AppointmentType, NewReservation, Reservation, ReservationStatus};
use crate::db::DatabaseError;

const RESERVATION_COLUMNS: &str = "id, date, start_time, duration_minutes, appointment_type, \
     status, client_name, client_email, client_phone, notes, idempotency_key, \
     created_at, updated_at";

/// sqlx-backed `ReservationStore`. The partial unique index
/// `reservations_active_slot_idx` makes the insert the authoritative
/// double-booking check.
#[derive(Clone)]
pub struct ReservationRepository {
    pool: PgPool,
}

impl ReservationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ReservationRow {
    id: Uuid,
    date: Date,
    start_time: String,
    duration_minutes: i32,
    appointment_type: String,
    status: String,
    client_name: String,
    client_email: String,
    client_phone: Option<String>,
    notes: Option<String>,
    idempotency_key: Option<String>,
    created_at: OffsetDateTime,
    updated_at: OffsetDateTime,
}

impl TryFrom<ReservationRow> for Reservation {
    type Error = DatabaseError;

    fn try_from(row: ReservationRow) -> Result<Self, Self::Error> {
        let start_time: Slot = row
            .start_time
            .parse()
            .map_err(|_| DatabaseError::InvalidInput(format!("bad start_time: {}", row.start_time)))?;
        let appointment_type: AppointmentType =
            row.appointment_type.parse().map_err(DatabaseError::InvalidInput)?;
        let status: ReservationStatus = row.status.parse().map_err(DatabaseError::InvalidInput)?;

        Ok(Reservation {
            id: row.id,
            date: row.date,
            start_time,
            duration_minutes: row.duration_minutes,
            appointment_type,
            status,
            client_name: row.client_name,
            client_email: row.client_email,
            client_phone: row.client_phone,
            notes: row.notes,
            idempotency_key: row.idempotency_key,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[async_trait]
impl ReservationStore for ReservationRepository {
    async fn reservations_for_date(&self, date: Date) -> Result<Vec<Reservation>, DatabaseError> {
        let rows = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE date = $1 AND status IN ('pending', 'confirmed')
            ORDER BY start_time
            "#
        ))
        .bind(date)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Reservation::try_from).collect()
    }

    async fn slot_taken(&self, date: Date, slot: Slot) -> Result<bool, DatabaseError> {
        let taken: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM reservations
                WHERE date = $1 AND start_time = $2
                  AND status IN ('pending', 'confirmed')
            )
            "#,
        )
        .bind(date)
        .bind(slot.to_string())
        .fetch_one(&self.pool)
        .await?;

        Ok(taken)
    }

    async fn find_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<Reservation>, DatabaseError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            SELECT {RESERVATION_COLUMNS}
            FROM reservations
            WHERE idempotency_key = $1
            "#
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Reservation::try_from).transpose()
    }

    async fn insert(&self, new: &NewReservation) -> Result<Reservation, DatabaseError> {
        let row = sqlx::query_as::<_, ReservationRow>(&format!(
            r#"
            INSERT INTO reservations
                (id, date, start_time, duration_minutes, appointment_type, status,
                 client_name, client_email, client_phone, notes, idempotency_key)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING {RESERVATION_COLUMNS}
            "#
        ))
        .bind(Uuid::now_v7())
        .bind(new.date)
        .bind(new.start_time.to_string())
        .bind(new.duration_minutes())
        .bind(new.appointment_type.as_str())
        .bind(ReservationStatus::Confirmed.as_str())
        .bind(&new.client_name)
        .bind(&new.client_email)
        .bind(&new.client_phone)
        .bind(&new.notes)
        .bind(&new.idempotency_key)
        .fetch_one(&self.pool)
        .await
        .map_err(map_insert_error)?;

        Reservation::try_from(row)
    }
}

fn map_insert_error(err: sqlx::Error) -> DatabaseError {
    if let sqlx::Error::Database(ref db_err) = err {
        if db_err.is_unique_violation() {
            return DatabaseError::Duplicate;
        }
    }
    DatabaseError::Sqlx(err)
}
