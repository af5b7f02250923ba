use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use appointment_cell::{AppointmentStatus, AppointmentType};
use shared_database::{EmailJob, EmailQueueError, JobStatus};
use shared_models::db_error::map_db_error;
use shared_models::error::AppError;
use shared_utils::pesel::decrypt_pesel;

pub const NO_CHANGES: &str = "Brak zmian do zapisania.";
pub const DOCTOR_BAN_REASON: &str = "Konto wyłączone przez administratora";
pub const EMAIL_QUEUE_LABEL: &str = "Wysylka e-maili";
pub const QUEUE_JOB_LIMIT: usize = 25;

const NAME_TOO_SHORT: &str = "Imię i nazwisko musi zawierać co najmniej 2 znaki.";
const EMPTY_UPDATE: &str = "Brak danych do aktualizacji.";

// ==============================================================================
// SHARED SHAPES
// ==============================================================================

#[derive(Debug, Serialize, ToSchema)]
pub struct OkResponse {
    pub status: String,
}

impl OkResponse {
    pub fn ok() -> Self {
        Self { status: "ok".to_string() }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NoChanges {
    pub status: String,
    pub message: String,
}

impl Default for NoChanges {
    fn default() -> Self {
        Self {
            status: "noop".to_string(),
            message: NO_CHANGES.to_string(),
        }
    }
}

/// Body of a PATCH response: either the saved entity or a noop notice.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UpdateOutcome<T> {
    Saved(T),
    Unchanged(NoChanges),
}

/// What an update service did. The audit line is only produced when something changed.
#[derive(Debug)]
pub enum Change<T> {
    Applied { value: T, audit: String },
    Unchanged,
}

/// Distinguishes an explicit `null` from a missing field.
fn explicit_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

fn trimmed_len(value: &str) -> usize {
    value.trim().chars().count()
}

fn validate_person_name(value: &str) -> Result<(), ValidationError> {
    if trimmed_len(value) >= 2 {
        Ok(())
    } else {
        Err(ValidationError::new("length").with_message(NAME_TOO_SHORT.into()))
    }
}

fn validate_license_number(value: &str) -> Result<(), ValidationError> {
    match trimmed_len(value) {
        0..=2 => Err(ValidationError::new("length")
            .with_message("Numer licencji musi zawierać co najmniej 3 znaki.".into())),
        3..=50 => Ok(()),
        _ => Err(ValidationError::new("length")
            .with_message("Numer licencji może mieć maksymalnie 50 znaków.".into())),
    }
}

fn validate_specialization_name(value: &str) -> Result<(), ValidationError> {
    match trimmed_len(value) {
        0..=1 => Err(ValidationError::new("length")
            .with_message("Nazwa specjalizacji musi zawierać co najmniej 2 znaki.".into())),
        2..=120 => Ok(()),
        _ => Err(ValidationError::new("length")
            .with_message("Nazwa specjalizacji może mieć maksymalnie 120 znaków.".into())),
    }
}

fn validate_specialization_ids(ids: &[i32]) -> Result<(), ValidationError> {
    if ids.iter().all(|id| *id > 0) {
        Ok(())
    } else {
        Err(ValidationError::new("range").with_message("ID specjalizacji musi być liczbą dodatnią.".into()))
    }
}

fn empty_update() -> ValidationError {
    ValidationError::new("empty").with_message(EMPTY_UPDATE.into())
}

// ==============================================================================
// ADMINS
// ==============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AdminAccount {
    pub id: String,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateAdminRequest {
    #[validate(email(message = "Adres email jest nieprawidłowy."))]
    pub email: String,
    #[validate(custom(function = "validate_person_name"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_admin_update"))]
pub struct UpdateAdminRequest {
    pub name: Option<String>,
}

fn validate_admin_update(request: &UpdateAdminRequest) -> Result<(), ValidationError> {
    match request.name.as_deref() {
        None => Err(empty_update()),
        Some(name) => validate_person_name(name),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AdminSaved {
    pub status: String,
    pub admin: AdminAccount,
}

pub fn admin_created_audit(name: &str) -> String {
    format!("Utworzono konto administratora \"{}\" i wysłano link do ustawienia hasła.", name)
}

pub fn admin_renamed_audit(old: &str, new: &str) -> String {
    format!("Zaktualizowano administratora \"{}\": zmieniono imię i nazwisko na \"{}\"", old, new)
}

pub fn admin_deleted_audit(name: &str) -> String {
    format!("Usunięto administratora \"{}\" i zmieniono rolę na użytkownika.", name)
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DoctorAccount {
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
    pub specialization_id: Option<i32>,
    pub specialization_name: Option<String>,
    pub license_number: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateDoctorRequest {
    #[validate(email(message = "Adres email jest nieprawidłowy."))]
    pub email: String,
    #[validate(custom(function = "validate_person_name"))]
    pub name: String,
    #[validate(range(min = 1, message = "ID specjalizacji musi być liczbą dodatnią."))]
    pub specialization_id: Option<i32>,
    #[validate(custom(function = "validate_license_number"))]
    pub license_number: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
#[validate(schema(function = "validate_doctor_update"))]
pub struct UpdateDoctorRequest {
    /// `null` clears the specialization, a missing field keeps it.
    #[serde(default, deserialize_with = "explicit_null")]
    #[schema(value_type = Option<i32>)]
    pub specialization_id: Option<Option<i32>>,
    pub license_number: Option<String>,
}

fn validate_doctor_update(request: &UpdateDoctorRequest) -> Result<(), ValidationError> {
    if request.specialization_id.is_none() && request.license_number.is_none() {
        return Err(empty_update());
    }
    if let Some(Some(id)) = request.specialization_id {
        validate_specialization_ids(&[id])?;
    }
    match request.license_number.as_deref() {
        Some(license) => validate_license_number(license),
        None => Ok(()),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DoctorSaved {
    pub status: String,
    pub doctor: DoctorAccount,
}

/// Visit canceled because its doctor was removed; used for the patient notice.
#[derive(Debug, sqlx::FromRow)]
pub struct OrphanedVisit {
    pub patient_name: Option<String>,
    pub patient_email: Option<String>,
    pub datetime: DateTime<Utc>,
    pub is_online: bool,
    pub kind: AppointmentType,
}

pub fn doctor_created_audit(name: &str, license_number: &str) -> String {
    format!(
        "Utworzono konto lekarza \"{}\" (licencja: {}) i wysłano link do ustawienia hasła.",
        name, license_number
    )
}

pub fn doctor_deleted_audit(name: &str) -> String {
    format!("Usunięto lekarza \"{}\" i odwołano jego wizyty.", name)
}

// ==============================================================================
// RECEPTIONISTS
// ==============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReceptionistAccount {
    pub user_id: String,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateReceptionistRequest {
    #[validate(email(message = "Adres email jest nieprawidłowy."))]
    pub email: String,
    #[validate(custom(function = "validate_person_name"))]
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ReceptionistSaved {
    pub status: String,
    pub receptionist: ReceptionistAccount,
}

pub fn receptionist_created_audit(name: &str) -> String {
    format!("Utworzono konto rejestratora \"{}\" i wysłano link do ustawienia hasła.", name)
}

pub fn receptionist_deleted_audit(name: &str) -> String {
    format!("Usunięto rejestratora \"{}\".", name)
}

// ==============================================================================
// ROOMS
// ==============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub room_id: i32,
    pub number: i32,
    pub appointment_count: i64,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetails {
    pub room_id: i32,
    pub number: i32,
    pub appointment_count: i64,
    pub specialization_ids: Vec<i32>,
    pub specialization_names: Vec<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateRoomRequest {
    #[validate(range(min = 1, max = 9999, message = "Numer gabinetu musi być liczbą od 1 do 9999."))]
    pub number: i32,
    #[serde(default)]
    #[validate(custom(function = "validate_specialization_ids"))]
    pub specializations: Vec<i32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_room_update"))]
pub struct UpdateRoomRequest {
    pub number: Option<i32>,
    pub specializations: Option<Vec<i32>>,
}

fn validate_room_update(request: &UpdateRoomRequest) -> Result<(), ValidationError> {
    if request.number.is_none() && request.specializations.is_none() {
        return Err(empty_update());
    }
    if let Some(number) = request.number {
        if !(1..=9999).contains(&number) {
            return Err(ValidationError::new("range")
                .with_message("Numer gabinetu musi być liczbą od 1 do 9999.".into()));
        }
    }
    match request.specializations.as_deref() {
        Some(ids) => validate_specialization_ids(ids),
        None => Ok(()),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RoomSaved {
    pub status: String,
    pub room: RoomDetails,
}

/// Path ids for rooms and specializations are positive integers.
pub fn parse_positive_id(raw: &str, invalid: AdminError) -> Result<i32, AdminError> {
    match raw.trim().parse::<i32>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(invalid),
    }
}

/// Deduplicated, sorted set of specialization ids.
pub fn normalize_ids(ids: &[i32]) -> Vec<i32> {
    ids.iter().copied().collect::<BTreeSet<_>>().into_iter().collect()
}

/// The new specialization set when it differs from the current one.
pub fn specialization_change(current: &[i32], requested: Option<&[i32]>) -> Option<Vec<i32>> {
    let next = normalize_ids(requested?);
    (next != normalize_ids(current)).then_some(next)
}

pub fn room_created_audit(number: i32, specialization_names: &[String]) -> String {
    if specialization_names.is_empty() {
        format!("Dodano gabinet numer {}.", number)
    } else {
        format!(
            "Dodano gabinet numer {} (specjalizacje: {}).",
            number,
            specialization_names.join(", ")
        )
    }
}

pub fn room_updated_audit(number: i32, changes: &[String]) -> String {
    format!("Zaktualizowano gabinet {}: {}", number, changes.join(", "))
}

pub fn room_specializations_change_line(names: &[String]) -> String {
    if names.is_empty() {
        "usunięto wszystkie specjalizacje".to_string()
    } else {
        format!("zaktualizowano specjalizacje: {}", names.join(", "))
    }
}

pub fn room_deleted_audit(number: i32) -> String {
    format!("Usunięto gabinet numer {}.", number)
}

// ==============================================================================
// SPECIALIZATIONS
// ==============================================================================

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SpecializationSummary {
    pub id: i32,
    pub name: String,
    pub doctor_count: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CreateSpecializationRequest {
    #[validate(custom(function = "validate_specialization_name"))]
    pub name: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(deny_unknown_fields)]
#[validate(schema(function = "validate_specialization_update"))]
pub struct UpdateSpecializationRequest {
    pub name: Option<String>,
}

fn validate_specialization_update(request: &UpdateSpecializationRequest) -> Result<(), ValidationError> {
    match request.name.as_deref() {
        None => Err(empty_update()),
        Some(name) => validate_specialization_name(name),
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SpecializationSaved {
    pub status: String,
    pub specialization: SpecializationSummary,
}

pub fn specialization_created_audit(name: &str) -> String {
    format!("Dodano specjalizację \"{}\".", name)
}

pub fn specialization_renamed_audit(old: &str, new: &str) -> String {
    format!("Zaktualizowano specjalizację \"{}\": zmieniono nazwę na \"{}\"", old, new)
}

pub fn specialization_deleted_audit(name: &str) -> String {
    format!("Usunięto specjalizację \"{}\".", name)
}

// ==============================================================================
// OVERVIEW
// ==============================================================================

#[derive(Debug, sqlx::FromRow)]
pub struct ClinicAppointmentRow {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub patient_id: String,
    pub patient_first_name: Option<String>,
    pub patient_last_name: Option<String>,
    pub patient_pesel: Option<String>,
    pub doctor_id: String,
    pub doctor_name: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<i32>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicAppointment {
    pub appointment_id: i32,
    pub datetime: DateTime<Utc>,
    pub status: AppointmentStatus,
    pub notes: Option<String>,
    pub patient_id: String,
    pub patient_first_name: Option<String>,
    pub patient_last_name: Option<String>,
    pub patient_pesel: Option<String>,
    pub doctor_id: String,
    pub doctor_name: Option<String>,
    pub room_id: Option<i32>,
    pub room_number: Option<i32>,
}

impl ClinicAppointmentRow {
    pub fn reveal(self, pesel_key: &str) -> ClinicAppointment {
        ClinicAppointment {
            appointment_id: self.appointment_id,
            datetime: self.datetime,
            status: self.status,
            notes: self.notes,
            patient_id: self.patient_id,
            patient_first_name: self.patient_first_name,
            patient_last_name: self.patient_last_name,
            patient_pesel: self.patient_pesel.and_then(|p| reveal_pesel(pesel_key, &p)),
            doctor_id: self.doctor_id,
            doctor_name: self.doctor_name,
            room_id: self.room_id,
            room_number: self.room_number,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ClinicPatientRow {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub pesel: String,
    pub phone: Option<String>,
    pub address: String,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicPatient {
    pub user_id: String,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub pesel: Option<String>,
    pub phone: Option<String>,
    pub address: String,
    pub email: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

impl ClinicPatientRow {
    pub fn reveal(self, pesel_key: &str) -> ClinicPatient {
        ClinicPatient {
            pesel: reveal_pesel(pesel_key, &self.pesel),
            user_id: self.user_id,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            address: self.address,
            email: self.email,
            created_at: self.created_at,
        }
    }
}

/// Stored PESELs are encrypted; an unreadable payload is hidden rather than leaked.
fn reveal_pesel(key: &str, payload: &str) -> Option<String> {
    match decrypt_pesel(key, payload) {
        Ok(pesel) => Some(pesel),
        Err(e) => {
            tracing::warn!("Could not decrypt stored PESEL: {}", e);
            None
        }
    }
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub log_id: i32,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub ip_address: Option<String>,
    pub user_id: Option<String>,
    pub user_name: Option<String>,
    pub user_email: Option<String>,
}

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ClinicStatistics {
    pub total_admins: i64,
    pub total_doctors: i64,
    pub total_patients: i64,
    pub total_logs: i64,
}

#[derive(Debug, Default, Serialize, ToSchema)]
pub struct QueueCountsView {
    pub waiting: u64,
    pub active: u64,
    pub completed: u64,
    pub failed: u64,
    pub delayed: u64,
    pub paused: u64,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct QueueJobView {
    pub id: String,
    pub name: String,
    pub state: String,
    pub attempts_made: u32,
    pub timestamp: i64,
    pub processed_on: Option<i64>,
    pub finished_on: Option<i64>,
    pub failed_reason: Option<String>,
    pub to: String,
    pub subject: String,
}

impl From<EmailJob> for QueueJobView {
    fn from(job: EmailJob) -> Self {
        let state = match job.status {
            JobStatus::Waiting => "waiting",
            JobStatus::Active => "active",
            JobStatus::Delayed => "delayed",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        };
        Self {
            id: job.id.to_string(),
            name: job.name,
            state: state.to_string(),
            attempts_made: job.attempts_made,
            timestamp: job.created_at.timestamp_millis(),
            processed_on: job.processed_at.map(|t| t.timestamp_millis()),
            finished_on: job.finished_at.map(|t| t.timestamp_millis()),
            failed_reason: job.failed_reason,
            to: job.data.to,
            subject: job.data.subject,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct QueueSummary {
    pub name: String,
    pub label: String,
    pub counts: QueueCountsView,
    pub jobs: Vec<QueueJobView>,
}

// ==============================================================================
// ERRORS
// ==============================================================================

#[derive(Error, Debug)]
pub enum AdminError {
    #[error("Administrator nie został znaleziony.")]
    AdminNotFound,

    #[error("Nie możesz usunąć własnego konta administratora.")]
    SelfDelete,

    #[error("Nie można usunąć ostatniego administratora. Musi istnieć co najmniej jeden administrator.")]
    LastAdmin,

    #[error("Lekarz nie został znaleziony.")]
    DoctorNotFound,

    #[error("Lekarz o takim numerze licencji już istnieje.")]
    LicenseTaken,

    #[error("Rejestrator nie został znaleziony.")]
    ReceptionistNotFound,

    #[error("Gabinet nie został znaleziony.")]
    RoomNotFound,

    #[error("Identyfikator gabinetu jest wymagany.")]
    InvalidRoomId,

    #[error("Gabinet o tym numerze już istnieje.")]
    RoomNumberTaken,

    #[error("Nie można usunąć gabinetu, do którego przypisane są wizyty.")]
    RoomInUse,

    #[error("Jedna lub więcej specjalizacji nie istnieje.")]
    UnknownSpecializations,

    #[error("Specjalizacja nie została znaleziona.")]
    SpecializationNotFound,

    #[error("Identyfikator specjalizacji jest wymagany.")]
    InvalidSpecializationId,

    #[error("Specjalizacja o takiej nazwie już istnieje.")]
    SpecializationTaken,

    #[error("Nie można usunąć specjalizacji, do której przypisani są lekarze.")]
    SpecializationInUse,

    #[error(transparent)]
    Account(#[from] AppError),

    #[error("Email queue error: {0}")]
    Queue(#[from] EmailQueueError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl AdminError {
    /// Maps a unique violation to `conflict`, anything else stays a database error.
    pub fn unique_or(err: sqlx::Error, conflict: AdminError) -> AdminError {
        match map_db_error(&err).code.as_deref() {
            Some("23505") => conflict,
            _ => AdminError::Database(err),
        }
    }
}

impl From<AdminError> for AppError {
    fn from(err: AdminError) -> Self {
        match err {
            AdminError::AdminNotFound
            | AdminError::DoctorNotFound
            | AdminError::ReceptionistNotFound
            | AdminError::RoomNotFound
            | AdminError::SpecializationNotFound => AppError::NotFound(err.to_string()),
            AdminError::SelfDelete | AdminError::LastAdmin => AppError::Forbidden(err.to_string()),
            AdminError::LicenseTaken
            | AdminError::RoomNumberTaken
            | AdminError::SpecializationTaken => AppError::Conflict(err.to_string()),
            AdminError::InvalidRoomId
            | AdminError::RoomInUse
            | AdminError::UnknownSpecializations
            | AdminError::InvalidSpecializationId
            | AdminError::SpecializationInUse => AppError::BadRequest(err.to_string()),
            AdminError::Account(e) => e,
            AdminError::Queue(e) => AppError::from(e),
            AdminError::Database(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_models::error::first_validation_message;

    fn first_message<T: Validate>(request: &T) -> Option<String> {
        request.validate().err().and_then(|e| first_validation_message(&e))
    }

    #[test]
    fn specialization_change_ignores_order_and_duplicates() {
        assert_eq!(specialization_change(&[2, 1], Some(&[1, 2, 2])), None);
        assert_eq!(specialization_change(&[1], Some(&[3, 1])), Some(vec![1, 3]));
        assert_eq!(specialization_change(&[1], Some(&[])), Some(vec![]));
        assert_eq!(specialization_change(&[1], None), None);
    }

    #[test]
    fn path_ids_must_be_positive() {
        assert_eq!(parse_positive_id("7", AdminError::InvalidRoomId).unwrap(), 7);
        assert_matches!(parse_positive_id("0", AdminError::InvalidRoomId), Err(AdminError::InvalidRoomId));
        assert_matches!(
            parse_positive_id("abc", AdminError::InvalidSpecializationId),
            Err(AdminError::InvalidSpecializationId)
        );
    }

    #[test]
    fn room_audit_lines() {
        assert_eq!(room_created_audit(12, &[]), "Dodano gabinet numer 12.");
        assert_eq!(
            room_created_audit(3, &["Pediatria".to_string(), "Kardiologia".to_string()]),
            "Dodano gabinet numer 3 (specjalizacje: Pediatria, Kardiologia)."
        );
        let changes = vec![
            "zmieniono numer na 14".to_string(),
            room_specializations_change_line(&[]),
        ];
        assert_eq!(
            room_updated_audit(14, &changes),
            "Zaktualizowano gabinet 14: zmieniono numer na 14, usunięto wszystkie specjalizacje"
        );
    }

    #[test]
    fn doctor_update_distinguishes_null_from_missing() {
        let cleared: UpdateDoctorRequest = serde_json::from_str(r#"{"specializationId":null}"#).unwrap();
        assert_eq!(cleared.specialization_id, Some(None));

        let kept: UpdateDoctorRequest = serde_json::from_str(r#"{"licenseNumber":"PWZ-1234"}"#).unwrap();
        assert_eq!(kept.specialization_id, None);
        assert!(kept.validate().is_ok());
    }

    #[test]
    fn empty_updates_are_rejected() {
        let request: UpdateDoctorRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(first_message(&request).as_deref(), Some("Brak danych do aktualizacji."));

        let request: UpdateRoomRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(first_message(&request).as_deref(), Some("Brak danych do aktualizacji."));
    }

    #[test]
    fn unknown_fields_are_refused() {
        assert!(serde_json::from_str::<CreateRoomRequest>(r#"{"number":1,"floor":2}"#).is_err());
    }

    #[test]
    fn field_limits_carry_polish_messages() {
        let room = CreateRoomRequest { number: 10_000, specializations: vec![] };
        assert_eq!(
            first_message(&room).as_deref(),
            Some("Numer gabinetu musi być liczbą od 1 do 9999.")
        );

        let specialization = CreateSpecializationRequest { name: " a ".to_string() };
        assert_eq!(
            first_message(&specialization).as_deref(),
            Some("Nazwa specjalizacji musi zawierać co najmniej 2 znaki.")
        );

        let doctor = CreateDoctorRequest {
            email: "lekarz@example.com".to_string(),
            name: "Jan Kowalski".to_string(),
            specialization_id: None,
            license_number: "x".repeat(51),
        };
        assert_eq!(
            first_message(&doctor).as_deref(),
            Some("Numer licencji może mieć maksymalnie 50 znaków.")
        );
    }

    #[test]
    fn errors_map_to_http_statuses() {
        assert_matches!(AppError::from(AdminError::SelfDelete), AppError::Forbidden(_));
        assert_matches!(AppError::from(AdminError::RoomNumberTaken), AppError::Conflict(m) if m == "Gabinet o tym numerze już istnieje.");
        assert_matches!(AppError::from(AdminError::RoomInUse), AppError::BadRequest(_));
        assert_matches!(AppError::from(AdminError::SpecializationNotFound), AppError::NotFound(_));
        assert_matches!(
            AppError::from(AdminError::Account(AppError::Conflict("taken".into()))),
            AppError::Conflict(m) if m == "taken"
        );
    }

    #[test]
    fn unreadable_pesel_is_hidden() {
        let row = ClinicPatientRow {
            user_id: "p1".into(),
            first_name: Some("Anna".into()),
            last_name: Some("Nowak".into()),
            pesel: "not-base64".into(),
            phone: None,
            address: "Warszawa".into(),
            email: None,
            created_at: None,
        };
        assert_eq!(row.reveal("a2V5").pesel, None);
    }
}
