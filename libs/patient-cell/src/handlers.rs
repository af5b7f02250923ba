use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    Json,
};
use tracing::debug;
use validator::Validate;

use appointment_cell::{parse_appointment_id, AppointmentStatus, PrescriptionStatus};
use shared_database::AppState;
use shared_models::auth::{require_permission, require_role, Action, Resource, Role, SessionUser};
use shared_models::error::AppError;

use crate::models::{
    AppointmentStatusResponse, BookVisitRequest, BookVisitResponse, PatientAppointmentDetail,
    PatientDashboard, PatientError, PatientOverview, PatientVisit, PrescriptionStatusResponse,
    PrescriptionSummary, RecommendationEntry, SpecializationOption, TestResult,
    UpdateAppointmentStatusRequest, UpdatePrescriptionRequest, UPCOMING_LIMIT,
};
use crate::services::PatientService;

fn parse_prescription_id(raw: &str) -> Result<i32, PatientError> {
    raw.trim()
        .parse::<i32>()
        .map_err(|_| PatientError::InvalidPrescriptionId)
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[utoipa::path(get, path = "/api/patient/visits", responses((status = 200, body = [PatientVisit])), tag = "patient")]
#[axum::debug_handler]
pub async fn list_visits(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<PatientVisit>>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    let visits = PatientService::new(&state.db).visits(&user.id).await?;
    Ok(Json(visits))
}

#[utoipa::path(get, path = "/api/patient/upcomingVisits", responses((status = 200, body = [PatientVisit])), tag = "patient")]
#[axum::debug_handler]
pub async fn upcoming_visits(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<PatientVisit>>, AppError> {
    require_role(&user, &[Role::User])?;
    let service = PatientService::new(&state.db);
    service.ensure_profile(&user.id).await?;
    let visits = service.upcoming_visits(&user.id, false, UPCOMING_LIMIT).await?;
    Ok(Json(visits))
}

#[utoipa::path(
    get,
    path = "/api/patient/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, body = PatientAppointmentDetail),
        (status = 400, description = "Malformed appointment id"),
        (status = 403, description = "Appointment belongs to another patient"),
        (status = 404, description = "Unknown appointment"),
    ),
    tag = "patient"
)]
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<PatientAppointmentDetail>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::Read])?;
    let appointment_id = parse_appointment_id(&id)?;
    let detail = PatientService::new(&state.db)
        .appointment_detail(&user.id, appointment_id)
        .await?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/api/patient/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = UpdateAppointmentStatusRequest,
    responses(
        (status = 200, body = AppointmentStatusResponse),
        (status = 400, description = "Appointment is not scheduled"),
        (status = 404, description = "Unknown appointment"),
    ),
    tag = "patient"
)]
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAppointmentStatusRequest>, JsonRejection>,
) -> Result<Json<AppointmentStatusResponse>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::Update])?;
    let appointment_id = parse_appointment_id(&id)?;

    let Json(request) = payload?;
    if request.status != AppointmentStatus::Canceled {
        return Err(PatientError::UnsupportedStatus.into());
    }

    let service = PatientService::new(&state.db);
    service.ensure_profile(&user.id).await?;
    let updated = service.cancel_appointment(&user.id, appointment_id).await?;
    Ok(Json(updated))
}

#[utoipa::path(
    post,
    path = "/api/patient/appointments",
    request_body = BookVisitRequest,
    responses(
        (status = 200, body = BookVisitResponse),
        (status = 400, description = "Invalid datetime, slot outside availability or no rooms"),
        (status = 404, description = "Doctor, room or patient profile not found"),
        (status = 409, description = "Slot or room already taken"),
    ),
    tag = "patient"
)]
#[axum::debug_handler]
pub async fn book_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    payload: Result<Json<BookVisitRequest>, JsonRejection>,
) -> Result<Json<BookVisitResponse>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::Create])?;
    let Json(request) = payload?;
    request.validate()?;

    let service = PatientService::new(&state.db);
    service.ensure_profile(&user.id).await?;

    debug!("Patient {} booking with doctor {} at {}", user.id, request.doctor_id, request.datetime);
    let booked = service.book_visit(&user.id, &request).await?;

    Ok(Json(BookVisitResponse {
        appointment_id: booked.appointment_id,
        status: booked.status,
    }))
}

// ==============================================================================
// PRESCRIPTIONS
// ==============================================================================

#[utoipa::path(get, path = "/api/patient/prescriptions", responses((status = 200, body = [PrescriptionSummary])), tag = "patient")]
#[axum::debug_handler]
pub async fn list_prescriptions(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<PrescriptionSummary>>, AppError> {
    require_permission(&user, Resource::Prescriptions, &[Action::List])?;
    let prescriptions = PatientService::new(&state.db)
        .prescriptions(&user.id, None, None)
        .await?;
    Ok(Json(prescriptions))
}

#[utoipa::path(get, path = "/api/patient/activePrescriptions", responses((status = 200, body = [PrescriptionSummary])), tag = "patient")]
#[axum::debug_handler]
pub async fn active_prescriptions(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<PrescriptionSummary>>, AppError> {
    require_role(&user, &[Role::User])?;
    let service = PatientService::new(&state.db);
    service.ensure_profile(&user.id).await?;
    let prescriptions = service
        .prescriptions(&user.id, Some(PrescriptionStatus::Active), None)
        .await?;
    Ok(Json(prescriptions))
}

#[utoipa::path(
    patch,
    path = "/api/patient/prescriptions/{id}",
    params(("id" = String, Path, description = "Prescription id")),
    request_body = UpdatePrescriptionRequest,
    responses(
        (status = 200, body = PrescriptionStatusResponse),
        (status = 400, description = "Prescription is not active"),
        (status = 404, description = "Prescription not found"),
    ),
    tag = "patient"
)]
#[axum::debug_handler]
pub async fn update_prescription(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    payload: Result<Json<UpdatePrescriptionRequest>, JsonRejection>,
) -> Result<Json<PrescriptionStatusResponse>, AppError> {
    require_permission(&user, Resource::Prescriptions, &[Action::Update])?;
    let prescription_id = parse_prescription_id(&id)?;

    let Json(request) = payload?;
    if request.status != PrescriptionStatus::Fulfilled {
        return Err(PatientError::UnsupportedStatus.into());
    }

    let updated = PatientService::new(&state.db)
        .fulfill_prescription(&user.id, prescription_id)
        .await?;
    Ok(Json(updated))
}

// ==============================================================================
// RESULTS & RECOMMENDATIONS
// ==============================================================================

#[utoipa::path(get, path = "/api/patient/results", responses((status = 200, body = [TestResult])), tag = "patient")]
#[axum::debug_handler]
pub async fn list_results(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<TestResult>>, AppError> {
    require_role(&user, &[Role::User])?;
    let service = PatientService::new(&state.db);
    service.ensure_profile(&user.id).await?;
    Ok(Json(service.results(&user.id, None).await?))
}

#[utoipa::path(get, path = "/api/patient/recentResults", responses((status = 200, body = [TestResult])), tag = "patient")]
#[axum::debug_handler]
pub async fn recent_results(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<TestResult>>, AppError> {
    require_permission(&user, Resource::TestResults, &[Action::List])?;
    require_permission(&user, Resource::MedicalRecords, &[Action::Read])?;
    let service = PatientService::new(&state.db);
    service.ensure_profile(&user.id).await?;
    Ok(Json(service.recent_results(&user.id).await?))
}

#[utoipa::path(get, path = "/api/patient/recommendations", responses((status = 200, body = [RecommendationEntry])), tag = "patient")]
#[axum::debug_handler]
pub async fn list_recommendations(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<RecommendationEntry>>, AppError> {
    require_role(&user, &[Role::User])?;
    let service = PatientService::new(&state.db);
    service.ensure_profile(&user.id).await?;
    Ok(Json(service.recommendations(&user.id).await?))
}

#[utoipa::path(get, path = "/api/patient/specializations", responses((status = 200, body = [SpecializationOption])), tag = "patient")]
#[axum::debug_handler]
pub async fn list_specializations(
    State(state): State<AppState>,
    Extension(_user): Extension<SessionUser>,
) -> Result<Json<Vec<SpecializationOption>>, AppError> {
    Ok(Json(PatientService::new(&state.db).specializations().await?))
}

// ==============================================================================
// DASHBOARD & OVERVIEW
// ==============================================================================

#[utoipa::path(get, path = "/api/patient/dashboard", responses((status = 200, body = PatientDashboard)), tag = "patient")]
#[axum::debug_handler]
pub async fn dashboard(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<PatientDashboard>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    require_permission(&user, Resource::Prescriptions, &[Action::List])?;
    require_permission(&user, Resource::TestResults, &[Action::List])?;
    require_permission(&user, Resource::MedicalRecords, &[Action::Read])?;
    Ok(Json(PatientService::new(&state.db).dashboard(&user.id).await?))
}

#[utoipa::path(
    get,
    path = "/api/patient/me",
    responses(
        (status = 200, body = PatientOverview),
        (status = 404, description = "Patient profile not found"),
    ),
    tag = "patient"
)]
#[axum::debug_handler]
pub async fn me(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<PatientOverview>, AppError> {
    require_role(&user, &[Role::User])?;
    let overview = PatientService::new(&state.db).overview(&user.id).await?;
    Ok(Json(overview))
}
