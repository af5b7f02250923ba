use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, NaiveTime, Timelike, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use appointment_cell::{
    AppointmentStatus, AppointmentType, BookingError, DoctorSlots, SlotQuery, TimeRange,
};
use shared_models::error::AppError;
use shared_utils::datetime::{build_date_range, parse_date, time_to_minutes, to_local};
use shared_utils::pesel::PeselError;

static PESEL_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{11}$").expect("valid PESEL regex"));

pub const DEFAULT_SPECIALIZATION_NAME: &str = "Brak specjalizacji";

// ==============================================================================
// FRONT DESK APPOINTMENTS
// ==============================================================================

#[derive(Debug, Deserialize, ToSchema)]
pub struct CancelAppointmentRequest {
    pub status: AppointmentStatus,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CanceledAppointment {
    pub appointment_id: i32,
    pub status: AppointmentStatus,
}

/// Row used to render the cancellation email.
#[derive(Debug, sqlx::FromRow)]
pub struct CancelTarget {
    pub status: AppointmentStatus,
    pub datetime: DateTime<Utc>,
    pub kind: AppointmentType,
    pub is_online: bool,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub doctor_name: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentRequest {
    pub patient_id: String,
    pub doctor_id: String,
    pub datetime: String,
    #[serde(default, rename = "type")]
    pub kind: AppointmentType,
    #[serde(default)]
    pub is_online: bool,
    #[validate(length(max = 500, message = "Notatka może mieć maksymalnie 500 znaków"))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateAppointmentResponse {
    pub appointment_id: i32,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PatientAppointment {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub is_online: bool,
    pub notes: Option<String>,
    pub doctor_id: String,
    pub doctor_name: Option<String>,
    pub doctor_email: Option<String>,
    pub specialization_id: Option<i32>,
    pub specialization_name: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<i32>,
}

// ==============================================================================
// CHECK-IN & TODAY'S VISITS
// ==============================================================================

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CheckInRequest {
    #[validate(range(min = 1, message = "Nieprawidłowy identyfikator wizyty"))]
    pub appointment_id: i32,
    #[validate(regex(path = *PESEL_REGEX, message = "PESEL musi mieć 11 cyfr"))]
    pub pesel: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct CheckInTarget {
    pub appointment_id: i32,
    pub status: AppointmentStatus,
    pub patient_id: Option<String>,
    pub pesel_hmac: Option<String>,
    pub is_online: bool,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInResponse {
    pub status: String,
    pub appointment_id: i32,
    pub visit_status: AppointmentStatus,
}

#[derive(Debug, sqlx::FromRow)]
pub struct TodayVisitRow {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub is_online: bool,
    pub kind: AppointmentType,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_email: Option<String>,
    pub room_number: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayVisit {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub is_online: bool,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub patient_name: String,
    pub patient_email: Option<String>,
    pub doctor_name: String,
    pub doctor_email: Option<String>,
    pub room_number: Option<i32>,
}

impl From<TodayVisitRow> for TodayVisit {
    fn from(row: TodayVisitRow) -> Self {
        Self {
            appointment_id: row.appointment_id,
            datetime: row.datetime,
            status: row.status,
            is_online: row.is_online,
            kind: row.kind,
            patient_name: row
                .patient_name
                .unwrap_or_else(|| shared_utils::names::DEFAULT_PATIENT_NAME.to_string()),
            patient_email: row.patient_email,
            doctor_name: row
                .doctor_name
                .unwrap_or_else(|| shared_utils::names::DEFAULT_DOCTOR_NAME.to_string()),
            doctor_email: row.doctor_email,
            room_number: row.room_number,
        }
    }
}

// ==============================================================================
// ROOM ASSIGNMENT
// ==============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(deny_unknown_fields)]
pub struct AssignRoomQuery {
    pub day: Option<String>,
}

impl AssignRoomQuery {
    pub fn day_or(&self, today: NaiveDate) -> Result<NaiveDate, ReceptionError> {
        match self.day.as_deref() {
            None => Ok(today),
            Some(raw) => strict_date(raw).ok_or(ReceptionError::InvalidDay),
        }
    }
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomOption {
    pub room_id: i32,
    pub number: i32,
    pub specialization_ids: Vec<i32>,
    pub specialization_names: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompatibleRoom {
    pub room_id: i32,
    pub number: i32,
}

#[derive(Debug, sqlx::FromRow)]
pub struct ScheduledFrameRow {
    pub schedule_id: String,
    pub day: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub room_id: Option<i32>,
    pub room_number: Option<i32>,
    pub doctor_id: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_email: Option<String>,
    pub specialization_id: Option<i32>,
    pub specialization_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ScheduledFrame {
    pub schedule_id: String,
    pub day: NaiveDate,
    pub start: NaiveTime,
    pub end: NaiveTime,
    pub doctor_id: Option<String>,
    pub doctor_name: String,
    pub doctor_email: String,
    pub specialization_id: Option<i32>,
    pub specialization_name: String,
    pub room_id: Option<i32>,
    pub room_number: Option<i32>,
    pub compatible_rooms: Vec<CompatibleRoom>,
}

impl ScheduledFrame {
    pub fn from_row(row: ScheduledFrameRow, rooms: &[RoomOption]) -> Self {
        Self {
            compatible_rooms: compatible_rooms(rooms, row.specialization_id),
            schedule_id: row.schedule_id,
            day: row.day,
            start: row.time_start,
            end: row.time_end,
            doctor_id: row.doctor_id,
            doctor_name: row
                .doctor_name
                .unwrap_or_else(|| shared_utils::names::DEFAULT_DOCTOR_NAME.to_string()),
            doctor_email: row.doctor_email.unwrap_or_default(),
            specialization_id: row.specialization_id,
            specialization_name: row
                .specialization_name
                .unwrap_or_else(|| DEFAULT_SPECIALIZATION_NAME.to_string()),
            room_id: row.room_id,
            room_number: row.room_number,
        }
    }
}

/// Rooms serving the given specialization; a doctor without one gets none.
pub fn compatible_rooms(rooms: &[RoomOption], specialization_id: Option<i32>) -> Vec<CompatibleRoom> {
    let Some(specialization_id) = specialization_id else {
        return Vec::new();
    };
    rooms
        .iter()
        .filter(|room| room.specialization_ids.contains(&specialization_id))
        .map(|room| CompatibleRoom {
            room_id: room.room_id,
            number: room.number,
        })
        .collect()
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomBoard {
    pub day: NaiveDate,
    pub timeframes: Vec<ScheduledFrame>,
    pub rooms: Vec<RoomOption>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct AssignRoomRequest {
    #[validate(length(min = 1, message = "Nieprawidłowe dane wejściowe."))]
    pub schedule_id: String,
    #[validate(range(min = 1, message = "Nieprawidłowe dane wejściowe."))]
    pub room_id: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AssignRoomResponse {
    pub status: String,
    pub room_id: Option<i32>,
}

// ==============================================================================
// AVAILABLE SLOTS
// ==============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsQuery {
    pub start_date: String,
    pub end_date: Option<String>,
    pub specialization_id: Option<i32>,
    pub doctor_id: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: AppointmentType,
}

/// Whose slots are listed: one doctor, or every doctor of a specialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotTarget {
    Doctor(String),
    Specialization(i32),
}

#[derive(Debug, Clone)]
pub struct SlotSearch {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target: SlotTarget,
    pub query: SlotQuery,
}

/// Longest slot search, in days, counting both ends.
pub const MAX_SLOT_RANGE_DAYS: i64 = 31;

impl AvailableSlotsQuery {
    pub fn into_search(self) -> Result<SlotSearch, ReceptionError> {
        let start_date = strict_date(&self.start_date).ok_or(ReceptionError::InvalidDate)?;
        let end_date = match self.end_date.as_deref() {
            Some(raw) => strict_date(raw).ok_or(ReceptionError::InvalidDate)?,
            None => start_date,
        };
        if (end_date - start_date).num_days() >= MAX_SLOT_RANGE_DAYS {
            return Err(ReceptionError::RangeTooLong);
        }

        let target = match (self.doctor_id.filter(|id| !id.trim().is_empty()), self.specialization_id) {
            (Some(doctor_id), _) => SlotTarget::Doctor(doctor_id),
            (None, Some(id)) if id != 0 => SlotTarget::Specialization(id),
            _ => return Err(ReceptionError::MissingSlotTarget),
        };

        let window = match (self.start_time.as_deref(), self.end_time.as_deref()) {
            (None, None) => None,
            (Some(from), Some(to)) => {
                let from = strict_time(from).ok_or(ReceptionError::InvalidTime)?;
                let to = strict_time(to).ok_or(ReceptionError::InvalidTime)?;
                if from >= to {
                    return Err(ReceptionError::InvalidTimeWindow);
                }
                Some(TimeRange::new(from, to))
            }
            _ => return Err(ReceptionError::InvalidTimeWindow),
        };

        Ok(SlotSearch {
            start_date,
            end_date,
            target,
            query: SlotQuery {
                dates: build_date_range(start_date, end_date),
                window,
                kind: self.kind,
            },
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct SlotDoctorRow {
    pub doctor_id: String,
    pub specialization_id: Option<i32>,
    pub specialization_name: Option<String>,
    pub doctor_name: Option<String>,
    pub doctor_email: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AvailableSlotsResponse {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub slots: Vec<DoctorSlots>,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
}

fn strict_date(raw: &str) -> Option<NaiveDate> {
    let bytes = raw.as_bytes();
    let shaped = bytes.len() == 10 && bytes[4] == b'-' && bytes[7] == b'-';
    if shaped {
        parse_date(raw)
    } else {
        None
    }
}

fn strict_time(raw: &str) -> Option<u32> {
    if raw.len() == 5 && raw.as_bytes()[2] == b':' {
        time_to_minutes(raw)
    } else {
        None
    }
}

// ==============================================================================
// STATISTICS & USERS
// ==============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct HourBucket {
    pub hour: u32,
    pub label: String,
    pub onsite: u32,
    pub remote: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct VisitTotals {
    pub onsite: u32,
    pub remote: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VisitsToday {
    pub day: NaiveDate,
    pub buckets: Vec<HourBucket>,
    pub totals: VisitTotals,
}

impl VisitsToday {
    /// Groups visits by their clinic-local starting hour.
    pub fn from_visits(day: NaiveDate, visits: &[(DateTime<Utc>, bool)]) -> Self {
        let mut by_hour: BTreeMap<u32, VisitTotals> = BTreeMap::new();
        for (datetime, is_online) in visits {
            let bucket = by_hour.entry(to_local(*datetime).hour()).or_default();
            if *is_online {
                bucket.remote += 1;
            } else {
                bucket.onsite += 1;
            }
        }

        let mut totals = VisitTotals::default();
        let buckets = by_hour
            .into_iter()
            .map(|(hour, counts)| {
                totals.onsite += counts.onsite;
                totals.remote += counts.remote;
                HourBucket {
                    hour,
                    label: format!("{:02}:00", hour),
                    onsite: counts.onsite,
                    remote: counts.remote,
                }
            })
            .collect();

        Self { day, buckets, totals }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct DirectoryUserRow {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub doctor_user_id: Option<String>,
    pub license_number: Option<String>,
    pub specialization_name: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DirectoryUser {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
    pub is_doctor: bool,
    pub license_number: Option<String>,
    pub specialization_name: Option<String>,
}

impl From<DirectoryUserRow> for DirectoryUser {
    fn from(row: DirectoryUserRow) -> Self {
        Self {
            is_doctor: row.doctor_user_id.is_some(),
            user_id: row.user_id,
            name: row.name,
            email: row.email,
            role: row.role,
            created_at: row.created_at,
            license_number: row.license_number,
            specialization_name: row.specialization_name,
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Error, Debug)]
pub enum ReceptionError {
    #[error("Wizyta nie została znaleziona")]
    AppointmentNotFound,

    #[error("Można anulować tylko zaplanowane lub potwierdzone wizyty")]
    NotCancelable,

    #[error("Patient not found")]
    PatientNotFound,

    #[error("Target user is not a patient")]
    NotAPatient,

    #[error("Patient profile not found")]
    PatientProfileNotFound,

    #[error("Patient ID is required")]
    MissingPatientId,

    #[error("Brak danych pacjenta dla wizyty")]
    MissingPatientData,

    #[error("Wizyta nie może zostać zameldowana")]
    NotCheckable,

    #[error("PESEL jest wymagany dla wizyt stacjonarnych")]
    PeselRequired,

    #[error("PESEL niezgodny z danymi pacjenta")]
    PeselMismatch,

    #[error("Slot not found")]
    SlotNotFound,

    #[error("Lekarz nie ma przypisanej specjalizacji")]
    DoctorWithoutSpecialization,

    #[error("Room not found")]
    RoomNotFound,

    #[error("Pokój nie jest przypisany do specjalizacji lekarza i nie może być wybrany")]
    RoomIncompatible,

    #[error("Pokój jest już przypisany do innego lekarza w tym czasie")]
    RoomTaken,

    #[error("Data musi być w formacie YYYY-MM-DD")]
    InvalidDay,

    #[error("Use YYYY-MM-DD")]
    InvalidDate,

    #[error("Use HH:MM")]
    InvalidTime,

    #[error("Provide specializationId or doctorId")]
    MissingSlotTarget,

    #[error("Provide a valid time window (from < to)")]
    InvalidTimeWindow,

    #[error("Zakres wyszukiwania może obejmować maksymalnie 31 dni")]
    RangeTooLong,

    #[error(transparent)]
    Booking(#[from] BookingError),

    #[error("PESEL error: {0}")]
    Pesel(#[from] PeselError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<ReceptionError> for AppError {
    fn from(err: ReceptionError) -> Self {
        match err {
            ReceptionError::AppointmentNotFound
            | ReceptionError::PatientNotFound
            | ReceptionError::PatientProfileNotFound
            | ReceptionError::SlotNotFound
            | ReceptionError::RoomNotFound => AppError::NotFound(err.to_string()),
            ReceptionError::NotCancelable
            | ReceptionError::NotAPatient
            | ReceptionError::MissingPatientId
            | ReceptionError::MissingPatientData
            | ReceptionError::NotCheckable
            | ReceptionError::PeselRequired
            | ReceptionError::PeselMismatch
            | ReceptionError::DoctorWithoutSpecialization
            | ReceptionError::RoomIncompatible
            | ReceptionError::RangeTooLong => AppError::BadRequest(err.to_string()),
            ReceptionError::InvalidDay
            | ReceptionError::InvalidDate
            | ReceptionError::InvalidTime
            | ReceptionError::MissingSlotTarget
            | ReceptionError::InvalidTimeWindow => AppError::ValidationError(err.to_string()),
            ReceptionError::RoomTaken => AppError::Conflict(err.to_string()),
            ReceptionError::Booking(e) => AppError::from(e),
            ReceptionError::Pesel(e) => AppError::Internal(e.to_string()),
            ReceptionError::Database(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::TimeZone;

    fn slots_query() -> AvailableSlotsQuery {
        AvailableSlotsQuery {
            start_date: "2025-03-10".into(),
            specialization_id: Some(2),
            ..Default::default()
        }
    }

    fn room(room_id: i32, number: i32, specializations: &[i32]) -> RoomOption {
        RoomOption {
            room_id,
            number,
            specialization_ids: specializations.to_vec(),
            specialization_names: Vec::new(),
        }
    }

    #[test]
    fn slot_search_spans_at_most_a_month() {
        let month = AvailableSlotsQuery {
            end_date: Some("2025-04-09".into()),
            ..slots_query()
        };
        assert_eq!(month.into_search().unwrap().query.dates.len(), 31);

        let year = AvailableSlotsQuery {
            end_date: Some("2026-03-10".into()),
            ..slots_query()
        };
        assert_matches!(year.into_search(), Err(ReceptionError::RangeTooLong));
    }

    #[test]
    fn single_day_search_by_specialization() {
        let search = slots_query().into_search().unwrap();
        assert_eq!(search.target, SlotTarget::Specialization(2));
        assert_eq!(search.start_date, search.end_date);
        assert_eq!(search.query.dates.len(), 1);
        assert!(search.query.window.is_none());
        assert_eq!(search.query.kind, AppointmentType::Consultation);
    }

    #[test]
    fn doctor_takes_precedence_over_specialization() {
        let search = AvailableSlotsQuery {
            doctor_id: Some("doc-1".into()),
            end_date: Some("2025-03-12".into()),
            ..slots_query()
        }
        .into_search()
        .unwrap();
        assert_eq!(search.target, SlotTarget::Doctor("doc-1".into()));
        assert_eq!(search.query.dates.len(), 3);
    }

    #[test]
    fn search_needs_a_doctor_or_specialization() {
        let query = AvailableSlotsQuery {
            start_date: "2025-03-10".into(),
            ..Default::default()
        };
        assert_matches!(query.into_search(), Err(ReceptionError::MissingSlotTarget));
    }

    #[test]
    fn time_window_needs_both_ends_in_order() {
        let half_open = AvailableSlotsQuery {
            start_time: Some("08:00".into()),
            ..slots_query()
        };
        assert_matches!(half_open.into_search(), Err(ReceptionError::InvalidTimeWindow));

        let reversed = AvailableSlotsQuery {
            start_time: Some("12:00".into()),
            end_time: Some("09:00".into()),
            ..slots_query()
        };
        assert_matches!(reversed.into_search(), Err(ReceptionError::InvalidTimeWindow));

        let window = AvailableSlotsQuery {
            start_time: Some("09:00".into()),
            end_time: Some("12:30".into()),
            ..slots_query()
        }
        .into_search()
        .unwrap()
        .query
        .window;
        assert_eq!(window, Some(TimeRange::new(540, 750)));
    }

    #[test]
    fn dates_and_times_must_be_zero_padded() {
        let date = AvailableSlotsQuery {
            start_date: "2025-3-10".into(),
            ..slots_query()
        };
        assert_matches!(date.into_search(), Err(ReceptionError::InvalidDate));

        let time = AvailableSlotsQuery {
            start_time: Some("9:00".into()),
            end_time: Some("12:00".into()),
            ..slots_query()
        };
        assert_matches!(time.into_search(), Err(ReceptionError::InvalidTime));
    }

    #[test]
    fn room_board_day_defaults_to_today() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        assert_eq!(AssignRoomQuery::default().day_or(today).unwrap(), today);

        let query = AssignRoomQuery { day: Some("10.03.2025".into()) };
        assert_matches!(query.day_or(today), Err(ReceptionError::InvalidDay));
    }

    #[test]
    fn compatible_rooms_follow_specialization() {
        let rooms = vec![room(1, 101, &[1, 2]), room(2, 102, &[3]), room(3, 103, &[2])];
        assert_eq!(
            compatible_rooms(&rooms, Some(2)),
            vec![
                CompatibleRoom { room_id: 1, number: 101 },
                CompatibleRoom { room_id: 3, number: 103 },
            ]
        );
        assert!(compatible_rooms(&rooms, None).is_empty());
    }

    #[test]
    fn visits_are_bucketed_by_local_hour() {
        // 07:10 and 07:50 UTC are 08:xx in Warsaw during winter time.
        let at = |h, m| Utc.with_ymd_and_hms(2025, 1, 15, h, m, 0).unwrap();
        let day = NaiveDate::from_ymd_opt(2025, 1, 15).unwrap();
        let stats = VisitsToday::from_visits(day, &[(at(7, 10), false), (at(7, 50), true), (at(12, 0), false)]);

        assert_eq!(
            stats.buckets,
            vec![
                HourBucket { hour: 8, label: "08:00".into(), onsite: 1, remote: 1 },
                HourBucket { hour: 13, label: "13:00".into(), onsite: 1, remote: 0 },
            ]
        );
        assert_eq!(stats.totals, VisitTotals { onsite: 2, remote: 1 });
    }

    #[test]
    fn checkin_pesel_must_have_eleven_digits() {
        let request = CheckInRequest {
            appointment_id: 4,
            pesel: Some("1234".into()),
        };
        assert!(request.validate().is_err());

        let online = CheckInRequest {
            appointment_id: 4,
            pesel: None,
        };
        assert!(online.validate().is_ok());
    }

    #[test]
    fn errors_map_to_http_statuses() {
        assert_matches!(AppError::from(ReceptionError::RoomTaken), AppError::Conflict(_));
        assert_matches!(AppError::from(ReceptionError::SlotNotFound), AppError::NotFound(m) if m == "Slot not found");
        assert_matches!(
            AppError::from(ReceptionError::NotCancelable),
            AppError::BadRequest(m) if m == "Można anulować tylko zaplanowane lub potwierdzone wizyty"
        );
    }
}
