use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

use appointment_cell::{AppointmentStatus, AppointmentType, PrescriptionStatus};
use shared_models::error::AppError;

pub const UPCOMING_LIMIT: i64 = 2;
pub const DASHBOARD_RESULTS_LIMIT: i64 = 2;
pub const DASHBOARD_PRESCRIPTIONS_LIMIT: i64 = 4;
pub const RECENT_RESULTS_LIMIT: i64 = 3;
pub const OVERVIEW_APPOINTMENTS_LIMIT: usize = 3;
pub const OVERVIEW_LIST_LIMIT: usize = 5;

// ==============================================================================
// LISTINGS
// ==============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientVisit {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub doctor_id: String,
    pub doctor_name: Option<String>,
    pub doctor_email: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<i32>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionSummary {
    pub prescription_id: i32,
    pub issued_at: DateTime<Utc>,
    pub status: PrescriptionStatus,
    pub appointment_id: i32,
    pub appointment_datetime: DateTime<Utc>,
    pub doctor_id: String,
    pub doctor_name: Option<String>,
    pub doctor_email: Option<String>,
    pub medications: Vec<String>,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub test_id: i32,
    pub test_type: String,
    pub result: Option<String>,
    pub test_date: NaiveDate,
    pub file_path: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationEntry {
    pub recommendation_id: i32,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub appointment_id: i32,
    pub appointment_datetime: DateTime<Utc>,
    pub doctor_id: String,
    pub doctor_name: Option<String>,
    pub doctor_email: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
pub struct SpecializationOption {
    pub id: i32,
    pub name: String,
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[derive(Debug, sqlx::FromRow)]
pub struct AppointmentDetailRow {
    pub appointment_id: i32,
    pub patient_id: String,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub kind: AppointmentType,
    pub is_online: bool,
    pub notes: Option<String>,
    pub doctor_name: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<i32>,
    pub recommendation: Option<String>,
    pub prescription_id: Option<i32>,
    pub medications: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointmentDetail {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub is_online: bool,
    pub notes: Option<String>,
    pub doctor_name: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<String>,
    pub recommendation: Option<String>,
    pub prescription: Option<Vec<String>>,
}

impl From<AppointmentDetailRow> for PatientAppointmentDetail {
    fn from(row: AppointmentDetailRow) -> Self {
        // A linked prescription always yields a list, even when it has no medications yet.
        let prescription = row
            .prescription_id
            .map(|_| row.medications.unwrap_or_default());

        Self {
            appointment_id: row.appointment_id,
            datetime: row.datetime,
            status: row.status,
            kind: row.kind,
            is_online: row.is_online,
            notes: row.notes,
            doctor_name: row.doctor_name,
            room_id: row.room_id,
            room_number: row.room_number.map(|n| n.to_string()),
            recommendation: row.recommendation,
            prescription,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateAppointmentStatusRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentStatusResponse {
    pub appointment_id: i32,
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookVisitRequest {
    pub doctor_id: String,
    pub datetime: String,
    #[serde(default)]
    pub is_online: bool,
    pub room_id: Option<i32>,
    #[validate(length(max = 500, message = "Notatka może mieć maksymalnie 500 znaków"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookVisitResponse {
    pub appointment_id: i32,
    pub status: AppointmentStatus,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdatePrescriptionRequest {
    pub status: PrescriptionStatus,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionStatusResponse {
    pub prescription_id: i32,
    pub status: PrescriptionStatus,
}

// ==============================================================================
// DASHBOARD & OVERVIEW
// ==============================================================================

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientDashboard {
    pub upcoming_visits: Vec<PatientVisit>,
    pub recent_results: Vec<TestResult>,
    pub active_prescriptions: Vec<PrescriptionSummary>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub email_verified: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpcomingAppointment {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub doctor_id: String,
}

#[derive(Debug, Default, Serialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OverviewCounts {
    pub upcoming_appointments_count: usize,
    pub active_prescriptions_count: usize,
    pub test_results_count: usize,
    pub visits_count: i64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientOverview {
    pub user: AccountInfo,
    pub overview: OverviewCounts,
    pub next_appointments: Vec<UpcomingAppointment>,
    pub active_prescriptions: Vec<PrescriptionSummary>,
    pub latest_results: Vec<TestResult>,
}

impl PatientOverview {
    /// Counts cover the full lists; the lists themselves are capped.
    pub fn assemble(
        user: AccountInfo,
        mut upcoming: Vec<UpcomingAppointment>,
        mut prescriptions: Vec<PrescriptionSummary>,
        mut results: Vec<TestResult>,
        visits_count: i64,
    ) -> Self {
        let overview = OverviewCounts {
            upcoming_appointments_count: upcoming.len(),
            active_prescriptions_count: prescriptions.len(),
            test_results_count: results.len(),
            visits_count,
        };

        upcoming.truncate(OVERVIEW_APPOINTMENTS_LIMIT);
        prescriptions.truncate(OVERVIEW_LIST_LIMIT);
        results.truncate(OVERVIEW_LIST_LIMIT);

        Self {
            user,
            overview,
            next_appointments: upcoming,
            active_prescriptions: prescriptions,
            latest_results: results,
        }
    }
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Debug, Error)]
pub enum PatientError {
    #[error("Patient profile not found")]
    ProfileNotFound,

    #[error("Appointment not found")]
    AppointmentNotFound,

    #[error("Only scheduled appointments can be canceled")]
    NotCancelable,

    #[error("Prescription not found")]
    PrescriptionNotFound,

    #[error("Only active prescriptions can be fulfilled")]
    NotFulfillable,

    #[error("Nieprawidłowe dane wejściowe.")]
    UnsupportedStatus,

    #[error("Invalid prescription id")]
    InvalidPrescriptionId,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<PatientError> for AppError {
    fn from(err: PatientError) -> Self {
        match err {
            PatientError::ProfileNotFound
            | PatientError::AppointmentNotFound
            | PatientError::PrescriptionNotFound => AppError::NotFound(err.to_string()),
            PatientError::NotCancelable
            | PatientError::NotFulfillable
            | PatientError::InvalidPrescriptionId => AppError::BadRequest(err.to_string()),
            PatientError::UnsupportedStatus => AppError::ValidationError(err.to_string()),
            PatientError::Database(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn account() -> AccountInfo {
        AccountInfo {
            id: "u1".into(),
            email: "jan@example.com".into(),
            name: "Jan Kowalski".into(),
            role: "user".into(),
            email_verified: true,
            created_at: Utc::now(),
        }
    }

    fn upcoming(id: i32) -> UpcomingAppointment {
        UpcomingAppointment {
            appointment_id: id,
            datetime: Utc::now(),
            status: AppointmentStatus::Scheduled,
            doctor_id: "d1".into(),
        }
    }

    #[test]
    fn overview_counts_full_lists_but_caps_output() {
        let visits: Vec<_> = (1..=5).map(upcoming).collect();
        let overview = PatientOverview::assemble(account(), visits, vec![], vec![], 9);

        assert_eq!(overview.overview.upcoming_appointments_count, 5);
        assert_eq!(overview.overview.visits_count, 9);
        assert_eq!(overview.next_appointments.len(), OVERVIEW_APPOINTMENTS_LIMIT);
    }

    #[test]
    fn detail_without_prescription_serializes_null() {
        let row = AppointmentDetailRow {
            appointment_id: 3,
            patient_id: "p1".into(),
            datetime: Utc::now(),
            status: AppointmentStatus::Completed,
            kind: AppointmentType::Consultation,
            is_online: false,
            notes: None,
            doctor_name: Some("Anna Nowak".into()),
            room_id: Some(1),
            room_number: Some(101),
            recommendation: None,
            prescription_id: None,
            medications: None,
        };
        let value = serde_json::to_value(PatientAppointmentDetail::from(row)).unwrap();

        assert!(value["prescription"].is_null());
        assert_eq!(value["roomNumber"], "101");
        assert_eq!(value["type"], "consultation");
    }

    #[test]
    fn linked_prescription_without_medications_is_an_empty_list() {
        let row = AppointmentDetailRow {
            appointment_id: 3,
            patient_id: "p1".into(),
            datetime: Utc::now(),
            status: AppointmentStatus::Completed,
            kind: AppointmentType::Procedure,
            is_online: true,
            notes: None,
            doctor_name: None,
            room_id: None,
            room_number: None,
            recommendation: None,
            prescription_id: Some(8),
            medications: None,
        };
        let detail = PatientAppointmentDetail::from(row);
        assert_eq!(detail.prescription, Some(vec![]));
    }

    #[test]
    fn notes_are_limited_to_500_characters() {
        let request = BookVisitRequest {
            doctor_id: "d1".into(),
            datetime: "2030-01-07T09:00".into(),
            is_online: false,
            room_id: None,
            notes: Some("x".repeat(501)),
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn errors_map_to_statuses() {
        assert_matches!(AppError::from(PatientError::ProfileNotFound), AppError::NotFound(m) if m == "Patient profile not found");
        assert_matches!(AppError::from(PatientError::NotCancelable), AppError::BadRequest(_));
    }
}
