use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sqlx::types::Uuid;
use time::{Date, OffsetDateTime};
use validator::Validate;

use crate::booking::slots::Slot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    Pending,
    Confirmed,
    Cancelled,
    Completed,
}

impl ReservationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReservationStatus::Pending => "pending",
            ReservationStatus::Confirmed => "confirmed",
            ReservationStatus::Cancelled => "cancelled",
            ReservationStatus::Completed => "completed",
        }
    }

    /// Only pending and confirmed reservations block a slot; a reservation
    /// stops occupying the moment it is cancelled or completed.
    pub fn occupies_slot(&self) -> bool {
        matches!(self, ReservationStatus::Pending | ReservationStatus::Confirmed)
    }
}

impl FromStr for ReservationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(ReservationStatus::Pending),
            "confirmed" => Ok(ReservationStatus::Confirmed),
            "cancelled" => Ok(ReservationStatus::Cancelled),
            "completed" => Ok(ReservationStatus::Completed),
            _ => Err(format!("Unknown reservation status: {}", s)),
        }
    }
}

/// The consultancy's appointment catalog. The type fixes the duration
/// recorded on the reservation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    InitialConsultation,
    FollowUp,
    MealPlanReview,
    MetabolicAssessment,
}

impl AppointmentType {
    pub const MAX_DURATION_MINUTES: i32 = 120;

    pub fn duration_minutes(&self) -> i32 {
        match self {
            AppointmentType::InitialConsultation => 90,
            AppointmentType::FollowUp => 45,
            AppointmentType::MealPlanReview => 60,
            AppointmentType::MetabolicAssessment => 120,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AppointmentType::InitialConsultation => "initial_consultation",
            AppointmentType::FollowUp => "follow_up",
            AppointmentType::MealPlanReview => "meal_plan_review",
            AppointmentType::MetabolicAssessment => "metabolic_assessment",
        }
    }
}

impl FromStr for AppointmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "initial_consultation" => Ok(AppointmentType::InitialConsultation),
            "follow_up" => Ok(AppointmentType::FollowUp),
            "meal_plan_review" => Ok(AppointmentType::MealPlanReview),
            "metabolic_assessment" => Ok(AppointmentType::MetabolicAssessment),
            _ => Err(format!("Unknown appointment type: {}", s)),
        }
    }
}

/// One booked appointment. `date` is the business-local calendar date and the
/// partition key for availability queries; `start_time` is a catalog slot.
#[derive(Debug, Clone, Serialize)]
pub struct Reservation {
    pub id: Uuid,
    pub date: Date,
    pub start_time: Slot,
    pub duration_minutes: i32,
    pub appointment_type: AppointmentType,
    pub status: ReservationStatus,
    pub client_name: String,
    pub client_email: String,
    pub client_phone: Option<String>,
    pub notes: Option<String>,
    pub idempotency_key: Option<String>,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewReservation {
    pub date: Date,
    pub start_time: Slot,
    pub appointment_type: AppointmentType,
    #[validate(length(min = 1, max = 120, message = "Name must be 1-120 characters"))]
    pub client_name: String,
    #[validate(email(message = "A valid email address is required"))]
    pub client_email: String,
    #[validate(length(max = 32))]
    pub client_phone: Option<String>,
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
    #[validate(length(min = 8, max = 64))]
    pub idempotency_key: Option<String>,
}

impl NewReservation {
    pub fn duration_minutes(&self) -> i32 {
        self.appointment_type.duration_minutes()
    }
}
