use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use time::macros::format_description;
use time::Date;
use validator::Validate;

use crate::app_state::AppState;
use crate::booking::availability::{self, Availability};
use crate::booking::guard;
use crate::booking::slots::SLOT_GRID_MINUTES;
use crate::db::{AppointmentType, NewReservation, Reservation};
use crate::error::{AppError, AppResult};

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    /// Calendar date in the business timezone, `YYYY-MM-DD`.
    pub date: String,
    /// Intended appointment length in minutes. Without it slots are tested
    /// on the plain 30-minute grid.
    pub duration: Option<u16>,
}

pub async fn get_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> AppResult<Json<Availability>> {
    let date = parse_date(&query.date)?;
    let slot_span = match query.duration {
        None => SLOT_GRID_MINUTES,
        Some(d)
            if d >= SLOT_GRID_MINUTES
                && i32::from(d) <= AppointmentType::MAX_DURATION_MINUTES =>
        {
            d
        }
        Some(d) => {
            return Err(AppError::InvalidArgument(format!(
                "unsupported appointment duration: {} minutes",
                d
            )))
        }
    };

    let booking = &state.env.booking;
    let availability = availability::get_availability(
        state.store.as_ref(),
        state.clock.as_ref(),
        booking.business_utc_offset,
        booking.buffer_minutes,
        date,
        slot_span,
    )
    .await;

    Ok(Json(availability))
}

pub async fn create_reservation(
    State(state): State<AppState>,
    Json(payload): Json<NewReservation>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    payload
        .validate()
        .map_err(|err| AppError::InvalidArgument(err.to_string()))?;

    let booking = &state.env.booking;
    let reservation = guard::reserve_slot(
        state.store.as_ref(),
        state.clock.as_ref(),
        booking.business_utc_offset,
        booking.buffer_minutes,
        payload,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(reservation)))
}

fn parse_date(raw: &str) -> AppResult<Date> {
    let format = format_description!("[year]-[month]-[day]");
    Date::parse(raw, &format)
        .map_err(|_| AppError::InvalidArgument(format!("malformed date: {:?}", raw)))
}
