use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use shared_models::error::AppError;

// ==============================================================================
// CORE APPOINTMENT MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "appointment_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    Scheduled,
    CheckedIn,
    Completed,
    Canceled,
}

impl AppointmentStatus {
    /// Statuses that still occupy a doctor's or room's time.
    pub fn is_active(&self) -> bool {
        matches!(self, AppointmentStatus::Scheduled | AppointmentStatus::CheckedIn)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentStatus::Scheduled => write!(f, "scheduled"),
            AppointmentStatus::CheckedIn => write!(f, "checked_in"),
            AppointmentStatus::Completed => write!(f, "completed"),
            AppointmentStatus::Canceled => write!(f, "canceled"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash, sqlx::Type, ToSchema)]
#[sqlx(type_name = "appointment_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AppointmentType {
    #[default]
    Consultation,
    Procedure,
}

pub const SLOT_MINUTES: u32 = 20;

impl AppointmentType {
    pub fn duration_minutes(&self) -> u32 {
        match self {
            AppointmentType::Consultation => 20,
            AppointmentType::Procedure => 60,
        }
    }

    /// Unknown labels fall back to a consultation.
    pub fn from_label(label: &str) -> Self {
        match label {
            "procedure" => AppointmentType::Procedure,
            _ => AppointmentType::Consultation,
        }
    }

    pub fn polish_label(&self) -> &'static str {
        match self {
            AppointmentType::Consultation => "Konsultacja",
            AppointmentType::Procedure => "Zabieg",
        }
    }
}

impl fmt::Display for AppointmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppointmentType::Consultation => write!(f, "consultation"),
            AppointmentType::Procedure => write!(f, "procedure"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, sqlx::Type, ToSchema)]
#[sqlx(type_name = "prescription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum PrescriptionStatus {
    Active,
    Fulfilled,
}

// ==============================================================================
// TIME ARITHMETIC
// ==============================================================================

/// Half-open window `[start, end)` in minutes after local midnight.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: u32,
    pub end: u32,
}

impl TimeRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, other: &TimeRange) -> bool {
        other.start >= self.start && other.end <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SlotWindow {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorSlots {
    pub doctor_id: String,
    pub specialization_id: Option<i32>,
    pub specialization_name: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_email: Option<String>,
    pub slots: Vec<SlotWindow>,
}

#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub dates: Vec<NaiveDate>,
    pub window: Option<TimeRange>,
    pub kind: AppointmentType,
}

// ==============================================================================
// BOOKING
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoomSelection {
    /// Booked without a room; reception assigns one later.
    Unassigned,
    Requested(i32),
    FirstConfigured,
}

#[derive(Debug, Clone)]
pub struct BookingRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub start: DateTime<Utc>,
    pub kind: AppointmentType,
    pub is_online: bool,
    pub notes: Option<String>,
    pub room: RoomSelection,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookedAppointment {
    pub appointment_id: i32,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub room_id: Option<i32>,
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, thiserror::Error)]
pub enum BookingError {
    #[error("Doctor not found")]
    DoctorNotFound,

    #[error("Slot outside doctor availability")]
    OutsideAvailability,

    #[error("Slot already taken")]
    SlotTaken,

    #[error("No rooms configured")]
    NoRoomsConfigured,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Room not available")]
    RoomNotAvailable,

    #[error("Invalid datetime")]
    InvalidDatetime,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<BookingError> for AppError {
    fn from(err: BookingError) -> Self {
        match err {
            BookingError::DoctorNotFound | BookingError::RoomNotFound => {
                AppError::NotFound(err.to_string())
            }
            BookingError::OutsideAvailability
            | BookingError::NoRoomsConfigured
            | BookingError::InvalidDatetime => AppError::BadRequest(err.to_string()),
            BookingError::SlotTaken | BookingError::RoomNotAvailable => {
                AppError::Conflict(err.to_string())
            }
            BookingError::Database(e) => AppError::from(e),
        }
    }
}

pub const INVALID_APPOINTMENT_ID: &str = "Nieprawidłowy identyfikator wizyty";
pub const APPOINTMENT_NOT_FOUND: &str = "Nie znaleziono wizyty";
pub const ACCESS_DENIED: &str = "Brak dostępu";

/// Path ids arrive as strings so that malformed ids get the clinic's own message.
pub fn parse_appointment_id(raw: &str) -> Result<i32, AppError> {
    raw.trim()
        .parse::<i32>()
        .ok()
        .filter(|id| *id > 0)
        .ok_or_else(|| AppError::BadRequest(INVALID_APPOINTMENT_ID.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    #[test]
    fn durations_by_type() {
        assert_eq!(AppointmentType::Consultation.duration_minutes(), SLOT_MINUTES);
        assert_eq!(AppointmentType::Procedure.duration_minutes(), 60);
        assert_eq!(AppointmentType::from_label("surgery"), AppointmentType::Consultation);
        assert_eq!(AppointmentType::from_label("procedure"), AppointmentType::Procedure);
    }

    #[test]
    fn only_scheduled_and_checked_in_are_active() {
        assert!(AppointmentStatus::Scheduled.is_active());
        assert!(AppointmentStatus::CheckedIn.is_active());
        assert!(!AppointmentStatus::Canceled.is_active());
        assert!(!AppointmentStatus::Completed.is_active());
    }

    #[test]
    fn statuses_serialize_snake_case() {
        assert_eq!(
            serde_json::to_value(AppointmentStatus::CheckedIn).unwrap(),
            serde_json::json!("checked_in")
        );
        assert_eq!(AppointmentStatus::CheckedIn.to_string(), "checked_in");
    }

    #[test]
    fn booking_errors_map_to_http_errors() {
        assert_matches!(AppError::from(BookingError::SlotTaken), AppError::Conflict(m) if m == "Slot already taken");
        assert_matches!(AppError::from(BookingError::OutsideAvailability), AppError::BadRequest(_));
        assert_matches!(AppError::from(BookingError::RoomNotFound), AppError::NotFound(_));
    }

    #[test]
    fn appointment_ids_must_be_positive_integers() {
        assert_eq!(parse_appointment_id("42").unwrap(), 42);
        assert_matches!(parse_appointment_id("abc"), Err(AppError::BadRequest(m)) if m == INVALID_APPOINTMENT_ID);
        assert_matches!(parse_appointment_id("0"), Err(AppError::BadRequest(_)));
    }
}
