use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    http::HeaderMap,
    Json,
};
use chrono::NaiveDate;
use tracing::debug;
use validator::Validate;

use appointment_cell::parse_appointment_id;
use shared_database::AppState;
use shared_models::auth::{require_permission, require_role, Action, Resource, Role, SessionUser};
use shared_models::error::AppError;
use shared_utils::audit::record_audit_log;
use shared_utils::datetime::{parse_date, today_local};

use crate::models::{
    CompleteVisitRequest, CompleteVisitResponse, DispositionRangeQuery, DispositionSlot,
    DoctorAppointmentDetail, DoctorPatient, DoctorVisit, SaveDispositionsRequest,
    SaveDispositionsResponse, TodayDispositions, VisitTypeCounts, VisitsQuery, WeeklyCount,
    INVALID_DATE_FORMAT,
};
use crate::services::{DispositionService, DoctorVisitService};

fn parse_query_date(value: Option<&str>) -> Result<Option<NaiveDate>, AppError> {
    match value {
        None => Ok(None),
        Some(raw) => parse_date(raw)
            .map(Some)
            .ok_or_else(|| AppError::ValidationError(INVALID_DATE_FORMAT.to_string())),
    }
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[utoipa::path(
    get,
    path = "/api/doctor/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    responses(
        (status = 200, body = DoctorAppointmentDetail),
        (status = 400, description = "Malformed appointment id"),
        (status = 403, description = "Appointment belongs to another doctor"),
        (status = 404, description = "Unknown appointment"),
    ),
    tag = "doctor"
)]
#[axum::debug_handler]
pub async fn get_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<DoctorAppointmentDetail>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::Read])?;
    require_permission(&user, Resource::Users, &[Action::Read])?;
    let appointment_id = parse_appointment_id(&id)?;

    let detail = DoctorVisitService::appointment_detail(&state.db, &user.id, appointment_id).await?;
    Ok(Json(detail))
}

#[utoipa::path(
    patch,
    path = "/api/doctor/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = CompleteVisitRequest,
    responses(
        (status = 200, body = CompleteVisitResponse),
        (status = 400, description = "Invalid body or visit not checked in"),
        (status = 403, description = "Appointment belongs to another doctor"),
        (status = 404, description = "Unknown appointment"),
    ),
    tag = "doctor"
)]
#[axum::debug_handler]
pub async fn complete_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    payload: Result<Json<CompleteVisitRequest>, JsonRejection>,
) -> Result<Json<CompleteVisitResponse>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::Update])?;
    let appointment_id = parse_appointment_id(&id)?;
    let Json(request) = payload?;
    request.validate()?;

    let response = DoctorVisitService::complete_visit(&state.db, &user.id, appointment_id, &request).await?;
    Ok(Json(response))
}

// ==============================================================================
// DISPOSITIONS
// ==============================================================================

#[utoipa::path(
    get,
    path = "/api/doctor/dispositions",
    params(DispositionRangeQuery),
    responses((status = 200, body = [DispositionSlot])),
    tag = "doctor"
)]
#[axum::debug_handler]
pub async fn list_dispositions(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    query: Result<Query<DispositionRangeQuery>, QueryRejection>,
) -> Result<Json<Vec<DispositionSlot>>, AppError> {
    require_permission(&user, Resource::Availability, &[Action::List])?;
    let Query(query) = query?;
    let start = parse_query_date(query.start_date.as_deref())?;
    let end = parse_query_date(query.end_date.as_deref())?;

    let slots = DispositionService::list(&state.db, &user.id, start, end).await?;
    Ok(Json(slots))
}

#[utoipa::path(
    post,
    path = "/api/doctor/dispositions",
    request_body = SaveDispositionsRequest,
    responses(
        (status = 200, body = SaveDispositionsResponse),
        (status = 400, description = "Invalid period or day"),
    ),
    tag = "doctor"
)]
#[axum::debug_handler]
pub async fn save_dispositions(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Result<Json<SaveDispositionsRequest>, JsonRejection>,
) -> Result<Json<SaveDispositionsResponse>, AppError> {
    require_permission(&user, Resource::Availability, &[Action::Create, Action::Update])?;
    let Json(request) = payload?;
    request.validate_all()?;
    request
        .check_dates(today_local())
        .map_err(|message| AppError::ValidationError(message.to_string()))?;

    debug!("Doctor {} saving {} disposition days", user.id, request.days.len());
    let count = DispositionService::replace(&state.db, &user.id, &request).await?;

    record_audit_log(
        &state.db,
        &headers,
        Some(&user.id),
        &format!(
            "Zapisano dyspozycje na okres {} - {} ({} slotów)",
            request.period_start, request.period_end, count
        ),
    )
    .await;

    Ok(Json(SaveDispositionsResponse {
        status: "ok".to_string(),
        count,
    }))
}

#[utoipa::path(
    get,
    path = "/api/doctor/dispositions/today",
    responses(
        (status = 200, body = TodayDispositions),
        (status = 404, description = "No doctor profile"),
    ),
    tag = "doctor"
)]
#[axum::debug_handler]
pub async fn today_dispositions(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<TodayDispositions>, AppError> {
    require_permission(&user, Resource::Availability, &[Action::List])?;
    let today = DispositionService::today(&state.db, &user.id).await?;
    Ok(Json(today))
}

// ==============================================================================
// PATIENTS, VISITS & STATS
// ==============================================================================

#[utoipa::path(get, path = "/api/doctor/patients", responses((status = 200, body = [DoctorPatient])), tag = "doctor")]
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<DoctorPatient>>, AppError> {
    require_role(&user, &[Role::Doctor])?;
    DoctorVisitService::ensure_doctor_profile(&state.db, &user.id).await?;
    let patients = DoctorVisitService::patients(&state.db, &user.id).await?;
    Ok(Json(patients))
}

#[utoipa::path(
    get,
    path = "/api/doctor/visits",
    params(VisitsQuery),
    responses((status = 200, body = [DoctorVisit])),
    tag = "doctor"
)]
#[axum::debug_handler]
pub async fn list_visits(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    query: Result<Query<VisitsQuery>, QueryRejection>,
) -> Result<Json<Vec<DoctorVisit>>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    require_permission(&user, Resource::Users, &[Action::Read])?;
    let Query(query) = query?;
    let date = parse_query_date(query.date.as_deref())?;

    DoctorVisitService::ensure_doctor_profile(&state.db, &user.id).await?;
    let visits = DoctorVisitService::visits(&state.db, &user.id, date).await?;
    Ok(Json(visits))
}

#[utoipa::path(get, path = "/api/doctor/visits/today", responses((status = 200, body = [DoctorVisit])), tag = "doctor")]
#[axum::debug_handler]
pub async fn today_visits(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<DoctorVisit>>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    require_permission(&user, Resource::Users, &[Action::Read])?;
    DoctorVisitService::ensure_doctor_profile(&state.db, &user.id).await?;
    let visits = DoctorVisitService::today_visits(&state.db, &user.id).await?;
    Ok(Json(visits))
}

#[utoipa::path(get, path = "/api/doctor/stats/handledVisits", responses((status = 200, body = [WeeklyCount])), tag = "doctor")]
#[axum::debug_handler]
pub async fn handled_visits(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<WeeklyCount>>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    DoctorVisitService::ensure_doctor_profile(&state.db, &user.id).await?;
    let weeks = DoctorVisitService::handled_visits(&state.db, &user.id).await?;
    Ok(Json(weeks))
}

#[utoipa::path(get, path = "/api/doctor/stats/visitTypes", responses((status = 200, body = VisitTypeCounts)), tag = "doctor")]
#[axum::debug_handler]
pub async fn visit_types(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<VisitTypeCounts>, AppError> {
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    DoctorVisitService::ensure_doctor_profile(&state.db, &user.id).await?;
    let counts = DoctorVisitService::visit_types(&state.db, &user.id).await?;
    Ok(Json(counts))
}
