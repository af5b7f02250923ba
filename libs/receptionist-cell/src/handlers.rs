use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Extension, Path, Query, State,
    },
    Json,
};
use tracing::debug;
use validator::Validate;

use appointment_cell::{parse_appointment_id, AppointmentStatus};
use notification_cell::Notifier;
use shared_database::AppState;
use shared_models::auth::{require_permission, require_role, Action, Resource, Role, SessionUser};
use shared_models::error::{AppError, INVALID_INPUT};
use shared_utils::datetime::today_local;

use crate::models::{
    AssignRoomQuery, AssignRoomRequest, AssignRoomResponse, AvailableSlotsQuery,
    AvailableSlotsResponse, CancelAppointmentRequest, CanceledAppointment, CheckInRequest,
    CheckInResponse, CreateAppointmentRequest, CreateAppointmentResponse, DirectoryUser,
    PatientAppointment, RoomBoard, TodayVisit, VisitsToday,
};
use crate::services::{FrontDeskService, RoomAssignmentService, ScheduleService};

/// Reception endpoints are for staff only, whatever the per-resource grants say.
fn require_front_desk(user: &SessionUser) -> Result<(), AppError> {
    require_role(user, &[Role::Receptionist, Role::Admin])
}

// ==============================================================================
// APPOINTMENTS
// ==============================================================================

#[utoipa::path(
    patch,
    path = "/api/receptionist/appointments/{id}",
    params(("id" = String, Path, description = "Appointment id")),
    request_body = CancelAppointmentRequest,
    responses(
        (status = 200, body = CanceledAppointment),
        (status = 400, description = "Visit already completed or canceled"),
        (status = 404, description = "Unknown appointment"),
    ),
    tag = "receptionist"
)]
#[axum::debug_handler]
pub async fn cancel_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
    payload: Result<Json<CancelAppointmentRequest>, JsonRejection>,
) -> Result<Json<CanceledAppointment>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Appointments, &[Action::Update])?;
    let appointment_id = parse_appointment_id(&id)?;

    let Json(request) = payload?;
    if request.status != AppointmentStatus::Canceled {
        return Err(AppError::ValidationError(INVALID_INPUT.to_string()));
    }

    let notifier = Notifier::new(state.email_queue.clone());
    let canceled = FrontDeskService::cancel_appointment(&state.db, &notifier, appointment_id).await?;
    Ok(Json(canceled))
}

#[utoipa::path(
    post,
    path = "/api/receptionist/appointments",
    request_body = CreateAppointmentRequest,
    responses(
        (status = 200, body = CreateAppointmentResponse),
        (status = 400, description = "Not a patient, invalid datetime or slot outside availability"),
        (status = 404, description = "Patient or doctor not found"),
        (status = 409, description = "Slot already taken"),
    ),
    tag = "receptionist"
)]
#[axum::debug_handler]
pub async fn create_appointment(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    payload: Result<Json<CreateAppointmentRequest>, JsonRejection>,
) -> Result<Json<CreateAppointmentResponse>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Appointments, &[Action::Create])?;
    require_permission(&user, Resource::Patients, &[Action::Read])?;
    let Json(request) = payload?;
    request.validate()?;

    debug!(
        "Reception {} booking {} for patient {} with doctor {}",
        user.id, request.kind, request.patient_id, request.doctor_id
    );
    let created = FrontDeskService::create_appointment(&state.db, &request).await?;
    Ok(Json(created))
}

#[utoipa::path(
    get,
    path = "/api/receptionist/patients/{patientId}/appointments",
    params(("patientId" = String, Path, description = "Patient user id")),
    responses((status = 200, body = [PatientAppointment])),
    tag = "receptionist"
)]
#[axum::debug_handler]
pub async fn patient_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(patient_id): Path<String>,
) -> Result<Json<Vec<PatientAppointment>>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    let rows = FrontDeskService::patient_appointments(&state.db, &patient_id).await?;
    Ok(Json(rows))
}

#[utoipa::path(
    get,
    path = "/api/receptionist/availableSlots",
    params(AvailableSlotsQuery),
    responses(
        (status = 200, body = AvailableSlotsResponse),
        (status = 400, description = "Missing doctor or specialization, or bad time window"),
    ),
    tag = "receptionist"
)]
#[axum::debug_handler]
pub async fn available_slots(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    query: Result<Query<AvailableSlotsQuery>, QueryRejection>,
) -> Result<Json<AvailableSlotsResponse>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    let Query(query) = query?;
    let search = query.into_search()?;

    let response = ScheduleService::available_slots(&state.db, search).await?;
    Ok(Json(response))
}

// ==============================================================================
// ROOMS
// ==============================================================================

#[utoipa::path(
    get,
    path = "/api/receptionist/assignRoom",
    params(AssignRoomQuery),
    responses((status = 200, body = RoomBoard)),
    tag = "receptionist"
)]
#[axum::debug_handler]
pub async fn room_board(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    query: Result<Query<AssignRoomQuery>, QueryRejection>,
) -> Result<Json<RoomBoard>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Availability, &[Action::List])?;
    require_permission(&user, Resource::Rooms, &[Action::List])?;
    require_permission(&user, Resource::Doctors, &[Action::List])?;
    let Query(query) = query?;
    let day = query.day_or(today_local())?;

    let board = RoomAssignmentService::board(&state.db, day).await?;
    Ok(Json(board))
}

#[utoipa::path(
    post,
    path = "/api/receptionist/assignRoom",
    request_body = AssignRoomRequest,
    responses(
        (status = 200, body = AssignRoomResponse),
        (status = 400, description = "Doctor without specialization or room of another specialization"),
        (status = 404, description = "Unknown frame or room"),
        (status = 409, description = "Room taken by another doctor"),
    ),
    tag = "receptionist"
)]
#[axum::debug_handler]
pub async fn assign_room(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    payload: Result<Json<AssignRoomRequest>, JsonRejection>,
) -> Result<Json<AssignRoomResponse>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Availability, &[Action::Update, Action::Read])?;
    require_permission(&user, Resource::Rooms, &[Action::Read])?;
    let Json(request) = payload?;
    request.validate()?;

    let response = RoomAssignmentService::assign(&state.db, &request).await?;
    Ok(Json(response))
}

// ==============================================================================
// VISITS, STATS & USERS
// ==============================================================================

#[utoipa::path(
    post,
    path = "/api/receptionist/visits/checkin",
    request_body = CheckInRequest,
    responses(
        (status = 200, body = CheckInResponse),
        (status = 400, description = "Visit closed, PESEL missing or not matching"),
        (status = 404, description = "Unknown appointment"),
    ),
    tag = "receptionist"
)]
#[axum::debug_handler]
pub async fn check_in(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    payload: Result<Json<CheckInRequest>, JsonRejection>,
) -> Result<Json<CheckInResponse>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Appointments, &[Action::Update])?;
    let Json(request) = payload?;
    request.validate()?;

    let response = FrontDeskService::check_in(&state.db, &state.config.pesel_hmac_key, &request).await?;
    Ok(Json(response))
}

#[utoipa::path(get, path = "/api/receptionist/visits/today", responses((status = 200, body = [TodayVisit])), tag = "receptionist")]
#[axum::debug_handler]
pub async fn today_visits(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<TodayVisit>>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    require_permission(&user, Resource::Users, &[Action::Read, Action::List])?;
    Ok(Json(FrontDeskService::today_visits(&state.db).await?))
}

#[utoipa::path(get, path = "/api/receptionist/stats/visitsToday", responses((status = 200, body = VisitsToday)), tag = "receptionist")]
#[axum::debug_handler]
pub async fn visits_today_stats(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<VisitsToday>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Appointments, &[Action::List])?;
    Ok(Json(FrontDeskService::visits_today_stats(&state.db).await?))
}

#[utoipa::path(get, path = "/api/receptionist/users", responses((status = 200, body = [DirectoryUser])), tag = "receptionist")]
#[axum::debug_handler]
pub async fn list_users(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<DirectoryUser>>, AppError> {
    require_front_desk(&user)?;
    require_permission(&user, Resource::Users, &[Action::List])?;
    Ok(Json(FrontDeskService::directory(&state.db).await?))
}
