use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use appointment_cell::{AppointmentStatus, AppointmentType};
use shared_utils::names::build_person_name;

pub const DOCTOR_PROFILE_NOT_FOUND: &str = "Nie znaleziono profilu lekarza.";
pub const NOT_CHECKED_IN: &str = "Wizyta nie została zameldowana przez recepcję";
pub const INVALID_DATE_FORMAT: &str = "Data musi być w formacie YYYY-MM-DD";
pub const EXAM_CODE_TEST_TYPE: &str = "Kod badania";

/// `None` when neither the profile nor the account carries a usable name.
pub fn optional_person_name(
    first_name: Option<&str>,
    last_name: Option<&str>,
    account_name: Option<&str>,
) -> Option<String> {
    Some(build_person_name(first_name, last_name, account_name, "")).filter(|name| !name.is_empty())
}

fn room_label(number: Option<i32>) -> Option<String> {
    number.map(|n| n.to_string())
}

// ==============================================================================
// APPOINTMENT DETAIL
// ==============================================================================

#[derive(Debug, sqlx::FromRow)]
pub struct AppointmentDetailRow {
    pub appointment_id: i32,
    pub doctor_id: String,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub kind: AppointmentType,
    pub is_online: bool,
    pub notes: Option<String>,
    pub patient_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub account_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<i32>,
    pub recommendation: Option<String>,
    pub medications: Option<Vec<String>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAppointmentDetail {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    #[serde(rename = "type")]
    pub kind: AppointmentType,
    pub is_online: bool,
    pub notes: Option<String>,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub patient_phone: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<String>,
    pub recommendation: Option<String>,
    pub prescription: Option<Vec<String>>,
}

impl From<AppointmentDetailRow> for DoctorAppointmentDetail {
    fn from(row: AppointmentDetailRow) -> Self {
        let patient_name = optional_person_name(
            row.first_name.as_deref(),
            row.last_name.as_deref(),
            row.account_name.as_deref(),
        );

        Self {
            appointment_id: row.appointment_id,
            datetime: row.datetime,
            status: row.status,
            kind: row.kind,
            is_online: row.is_online,
            notes: row.notes,
            patient_id: row.patient_id,
            patient_name,
            patient_email: row.patient_email,
            patient_phone: row.patient_phone,
            room_id: row.room_id,
            room_number: room_label(row.room_number),
            recommendation: row.recommendation,
            prescription: row.medications.filter(|list| !list.is_empty()),
        }
    }
}

// ==============================================================================
// VISIT COMPLETION
// ==============================================================================

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteVisitRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_visit_goal"))]
    pub visit_goal: String,
    pub symptoms: Option<String>,
    pub diagnosis_description: Option<String>,
    pub prescribed_medications: Option<String>,
    pub recommendations: Option<String>,
    pub procedures_performed: Option<String>,
    pub exam_result_codes: Option<Vec<String>>,
}

fn validate_visit_goal(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("required").with_message("Cel wizyty jest wymagany".into()))
    } else {
        Ok(())
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl CompleteVisitRequest {
    /// One medication per non-empty line.
    pub fn medications(&self) -> Vec<String> {
        non_empty(&self.prescribed_medications)
            .map(|text| {
                text.lines()
                    .map(str::trim)
                    .filter(|line| !line.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn recommendation(&self) -> Option<&str> {
        non_empty(&self.recommendations)
    }

    /// Trimmed exam codes in submission order, without duplicates.
    pub fn exam_codes(&self) -> Vec<String> {
        let mut codes: Vec<String> = Vec::new();
        for code in self.exam_result_codes.iter().flatten() {
            let code = code.trim();
            if !code.is_empty() && !codes.iter().any(|c| c == code) {
                codes.push(code.to_string());
            }
        }
        codes
    }

    pub fn compose_notes(&self) -> String {
        let sections = [
            ("Cel wizyty", Some(self.visit_goal.trim())),
            ("Objawy", non_empty(&self.symptoms)),
            ("Diagnoza", non_empty(&self.diagnosis_description)),
            ("Zalecenia", non_empty(&self.recommendations)),
            ("Procedury", non_empty(&self.procedures_performed)),
        ];

        sections
            .iter()
            .filter_map(|(label, value)| value.map(|v| format!("{}: {}", label, v)))
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompleteVisitResponse {
    pub appointment_id: i32,
    pub status: AppointmentStatus,
    pub recommendation_id: Option<i32>,
    pub prescription_id: Option<i32>,
}

// ==============================================================================
// DISPOSITIONS
// ==============================================================================

#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct DispositionRangeQuery {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DispositionSlot {
    pub schedule_id: String,
    pub day: NaiveDate,
    pub time_start: NaiveTime,
    pub time_end: NaiveTime,
    pub doctor_user_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_day_hours"))]
pub struct DispositionDay {
    pub date: NaiveDate,
    #[validate(range(min = 0, max = 23, message = "Godzina musi być z zakresu 0-23"))]
    pub start_hour: u32,
    #[validate(range(min = 0, max = 23, message = "Godzina musi być z zakresu 0-23"))]
    pub end_hour: u32,
}

fn validate_day_hours(day: &DispositionDay) -> Result<(), ValidationError> {
    if day.end_hour > day.start_hour {
        Ok(())
    } else {
        Err(ValidationError::new("end_hour")
            .with_message("Godzina zakończenia musi być późniejsza niż rozpoczęcia".into()))
    }
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SaveDispositionsRequest {
    pub period_start: NaiveDate,
    pub period_end: NaiveDate,
    #[validate(length(min = 1, message = "Wybierz przynajmniej jeden dzień"))]
    pub days: Vec<DispositionDay>,
}

impl SaveDispositionsRequest {
    /// Date rules that depend on the clinic's current day.
    pub fn check_dates(&self, today: NaiveDate) -> Result<(), &'static str> {
        if self.period_end < self.period_start {
            return Err("Data zakończenia musi być późniejsza lub równa dacie rozpoczęcia");
        }
        for day in &self.days {
            if day.date < today {
                return Err("Data nie może być w przeszłości");
            }
            if day.date < self.period_start || day.date > self.period_end {
                return Err("Data musi być w zakresie wybranego okresu");
            }
        }
        Ok(())
    }

    /// Field rules for the request and every listed day.
    pub fn validate_all(&self) -> Result<(), validator::ValidationErrors> {
        self.validate()?;
        self.days.iter().try_for_each(|day| day.validate())
    }

    pub fn unique_dates(&self) -> Vec<NaiveDate> {
        let mut dates: Vec<NaiveDate> = self.days.iter().map(|d| d.date).collect();
        dates.sort();
        dates.dedup();
        dates
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SaveDispositionsResponse {
    pub status: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Timeframe {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TodayDispositions {
    pub day: NaiveDate,
    pub timeframes: Vec<Timeframe>,
    pub room_number: Option<i32>,
}

// ==============================================================================
// VISITS, PATIENTS & STATS
// ==============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[serde(deny_unknown_fields)]
pub struct VisitsQuery {
    pub date: Option<String>,
}

#[derive(Debug, sqlx::FromRow)]
pub struct VisitRow {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub patient_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub account_name: Option<String>,
    pub patient_email: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorVisit {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub patient_id: String,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<String>,
}

impl From<VisitRow> for DoctorVisit {
    fn from(row: VisitRow) -> Self {
        let patient_name = optional_person_name(
            row.first_name.as_deref(),
            row.last_name.as_deref(),
            row.account_name.as_deref(),
        );

        Self {
            appointment_id: row.appointment_id,
            datetime: row.datetime,
            status: row.status,
            notes: row.notes,
            patient_id: row.patient_id,
            patient_name,
            patient_email: row.patient_email,
            room_id: row.room_id,
            room_number: room_label(row.room_number),
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorPatient {
    pub patient_id: String,
    pub last_appointment_id: i32,
    pub last_appointment_datetime: DateTime<Utc>,
    pub last_appointment_status: AppointmentStatus,
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyCount {
    pub week_start: String,
    pub count: i64,
}

#[derive(Debug, Default, Serialize, sqlx::FromRow, ToSchema)]
pub struct VisitTypeCounts {
    pub onsite: i64,
    pub remote: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared_models::error::first_validation_message;

    fn completion() -> CompleteVisitRequest {
        CompleteVisitRequest {
            visit_goal: "Kontrola".into(),
            ..Default::default()
        }
    }

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn visit_goal_is_required() {
        let mut request = completion();
        request.visit_goal = "   ".into();
        let errors = request.validate().unwrap_err();
        assert_eq!(first_validation_message(&errors).as_deref(), Some("Cel wizyty jest wymagany"));
    }

    #[test]
    fn notes_skip_empty_sections() {
        let mut request = completion();
        request.symptoms = Some("Kaszel".into());
        request.diagnosis_description = Some("  ".into());
        request.procedures_performed = Some("Osłuchanie".into());
        assert_eq!(
            request.compose_notes(),
            "Cel wizyty: Kontrola\n\nObjawy: Kaszel\n\nProcedury: Osłuchanie"
        );
    }

    #[test]
    fn medications_are_split_per_line() {
        let mut request = completion();
        request.prescribed_medications = Some("Ibuprofen 200mg\n\n  Witamina D \r\n".into());
        assert_eq!(request.medications(), vec!["Ibuprofen 200mg", "Witamina D"]);
        assert!(completion().medications().is_empty());
    }

    #[test]
    fn exam_codes_are_trimmed_and_deduplicated() {
        let mut request = completion();
        request.exam_result_codes = Some(vec![" MORF ".into(), "".into(), "MORF".into(), "CRP".into()]);
        assert_eq!(request.exam_codes(), vec!["MORF", "CRP"]);
    }

    #[test]
    fn disposition_hours_must_be_ordered() {
        let day = DispositionDay { date: date("2030-01-07"), start_hour: 12, end_hour: 12 };
        assert!(day.validate().is_err());
        let day = DispositionDay { date: date("2030-01-07"), start_hour: 8, end_hour: 12 };
        assert!(day.validate().is_ok());
    }

    #[test]
    fn disposition_dates_are_checked_against_period_and_today() {
        let request = SaveDispositionsRequest {
            period_start: date("2030-01-07"),
            period_end: date("2030-01-13"),
            days: vec![DispositionDay { date: date("2030-01-14"), start_hour: 8, end_hour: 12 }],
        };
        assert_eq!(
            request.check_dates(date("2030-01-01")),
            Err("Data musi być w zakresie wybranego okresu")
        );
        assert_eq!(request.check_dates(date("2030-01-20")), Err("Data nie może być w przeszłości"));
    }

    #[test]
    fn empty_days_are_rejected() {
        let request = SaveDispositionsRequest {
            period_start: date("2030-01-07"),
            period_end: date("2030-01-13"),
            days: vec![],
        };
        let errors = request.validate().unwrap_err();
        assert_eq!(first_validation_message(&errors).as_deref(), Some("Wybierz przynajmniej jeden dzień"));
    }

    #[test]
    fn missing_names_serialize_as_null() {
        assert_eq!(optional_person_name(None, None, Some(" ")), None);
        assert_eq!(optional_person_name(Some("Anna"), None, None).as_deref(), Some("Anna"));
    }
}
