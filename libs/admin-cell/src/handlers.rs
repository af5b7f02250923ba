use axum::{
    extract::{rejection::JsonRejection, Extension, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::debug;
use validator::Validate;

use notification_cell::Notifier;
use shared_database::AppState;
use shared_models::auth::{require_permission, require_role, Action, Resource, Role, SessionUser};
use shared_models::error::AppError;
use shared_utils::audit::record_audit_log;

use crate::models::{
    admin_created_audit, admin_deleted_audit, doctor_created_audit, doctor_deleted_audit,
    parse_positive_id, receptionist_created_audit, receptionist_deleted_audit, room_created_audit,
    room_deleted_audit, specialization_created_audit, specialization_deleted_audit, AdminAccount,
    AdminError, AdminSaved, AuditLogEntry, Change, ClinicAppointment, ClinicPatient,
    ClinicStatistics, CreateAdminRequest, CreateDoctorRequest, CreateReceptionistRequest,
    CreateRoomRequest, CreateSpecializationRequest, DoctorAccount, DoctorSaved, NoChanges,
    OkResponse, QueueSummary, ReceptionistAccount, ReceptionistSaved, RoomDetails, RoomSaved,
    RoomSummary, SpecializationSaved, SpecializationSummary, UpdateAdminRequest,
    UpdateDoctorRequest, UpdateOutcome, UpdateRoomRequest, UpdateSpecializationRequest,
};
use crate::services::{FacilityService, Invitation, OverviewService, StaffService};

/// Admin endpoints need the admin role on top of the resource grant.
fn require_admin(user: &SessionUser, resource: Resource, actions: &[Action]) -> Result<(), AppError> {
    require_role(user, &[Role::Admin])?;
    require_permission(user, resource, actions)
}

async fn audit(state: &AppState, headers: &HeaderMap, user: &SessionUser, action: &str) {
    record_audit_log(&state.db, headers, Some(&user.id), action).await;
}

/// Records the audit line of an applied change and shapes the PATCH body.
async fn finish_update<T, R>(
    state: &AppState,
    headers: &HeaderMap,
    user: &SessionUser,
    change: Change<T>,
    wrap: impl FnOnce(T) -> R,
) -> UpdateOutcome<R> {
    match change {
        Change::Applied { value, audit: line } => {
            audit(state, headers, user, &line).await;
            UpdateOutcome::Saved(wrap(value))
        }
        Change::Unchanged => UpdateOutcome::Unchanged(NoChanges::default()),
    }
}

// ==============================================================================
// ADMINS
// ==============================================================================

#[utoipa::path(get, path = "/api/admin/admins", responses((status = 200, body = [AdminAccount])), tag = "admin")]
#[axum::debug_handler]
pub async fn list_admins(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<AdminAccount>>, AppError> {
    require_admin(&user, Resource::Users, &[Action::List])?;
    Ok(Json(StaffService::list_admins(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/admins",
    request_body = CreateAdminRequest,
    responses(
        (status = 201, body = AdminSaved),
        (status = 409, description = "Email already registered"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn create_admin(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Result<Json<CreateAdminRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AdminSaved>), AppError> {
    require_admin(&user, Resource::Users, &[Action::Create])?;
    let Json(request) = payload?;
    request.validate()?;

    let notifier = Notifier::new(state.email_queue.clone());
    let invitation = Invitation { notifier: &notifier, app_url: &state.config.app_url };
    let admin = StaffService::create_admin(&state.db, &invitation, &request).await?;
    audit(&state, &headers, &user, &admin_created_audit(&admin.name)).await;

    Ok((
        StatusCode::CREATED,
        Json(AdminSaved { status: "ok".to_string(), admin }),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/admin/admins/{id}",
    params(("id" = String, Path, description = "Administrator user id")),
    request_body = UpdateAdminRequest,
    responses(
        (status = 200, description = "Saved entity or noop notice", body = AdminSaved),
        (status = 404, description = "Unknown administrator"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn update_admin(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAdminRequest>, JsonRejection>,
) -> Result<Json<UpdateOutcome<AdminSaved>>, AppError> {
    require_admin(&user, Resource::Users, &[Action::Update])?;
    let Json(request) = payload?;
    request.validate()?;

    let change = StaffService::rename_admin(&state.db, &id, &request).await?;
    let outcome = finish_update(&state, &headers, &user, change, |admin| AdminSaved {
        status: "ok".to_string(),
        admin,
    })
    .await;
    Ok(Json(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/admin/admins/{id}",
    params(("id" = String, Path, description = "Administrator user id")),
    responses(
        (status = 200, body = OkResponse),
        (status = 403, description = "Own account or last administrator"),
        (status = 404, description = "Unknown administrator"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn delete_admin(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    require_admin(&user, Resource::Users, &[Action::Delete])?;
    let name = StaffService::delete_admin(&state.db, &user.id, &id).await?;
    audit(&state, &headers, &user, &admin_deleted_audit(&name)).await;
    Ok(Json(OkResponse::ok()))
}

// ==============================================================================
// CLINIC OVERVIEW
// ==============================================================================

#[utoipa::path(get, path = "/api/admin/appointments", responses((status = 200, body = [ClinicAppointment])), tag = "admin")]
#[axum::debug_handler]
pub async fn list_appointments(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<ClinicAppointment>>, AppError> {
    require_admin(&user, Resource::Appointments, &[Action::List])?;
    let rows = OverviewService::appointments(&state.db, &state.config.pesel_enc_key).await?;
    Ok(Json(rows))
}

#[utoipa::path(get, path = "/api/admin/patients", responses((status = 200, body = [ClinicPatient])), tag = "admin")]
#[axum::debug_handler]
pub async fn list_patients(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<ClinicPatient>>, AppError> {
    require_admin(&user, Resource::Patients, &[Action::List])?;
    let rows = OverviewService::patients(&state.db, &state.config.pesel_enc_key).await?;
    Ok(Json(rows))
}

#[utoipa::path(get, path = "/api/admin/logs", responses((status = 200, body = [AuditLogEntry])), tag = "admin")]
#[axum::debug_handler]
pub async fn list_logs(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    require_admin(&user, Resource::Logs, &[Action::List])?;
    Ok(Json(OverviewService::logs(&state.db).await?))
}

#[utoipa::path(get, path = "/api/admin/statistics", responses((status = 200, body = ClinicStatistics)), tag = "admin")]
#[axum::debug_handler]
pub async fn statistics(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<ClinicStatistics>, AppError> {
    require_admin(&user, Resource::Statistics, &[Action::View])?;
    Ok(Json(OverviewService::statistics(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/queues",
    responses(
        (status = 200, body = [QueueSummary]),
        (status = 502, description = "Redis unavailable"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn list_queues(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<QueueSummary>>, AppError> {
    require_admin(&user, Resource::Queues, &[Action::List])?;
    Ok(Json(OverviewService::queues(&state.email_queue).await?))
}

// ==============================================================================
// DOCTORS
// ==============================================================================

#[utoipa::path(get, path = "/api/admin/doctors", responses((status = 200, body = [DoctorAccount])), tag = "admin")]
#[axum::debug_handler]
pub async fn list_doctors(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<DoctorAccount>>, AppError> {
    require_admin(&user, Resource::Doctors, &[Action::List])?;
    Ok(Json(StaffService::list_doctors(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/doctors",
    request_body = CreateDoctorRequest,
    responses(
        (status = 201, body = DoctorSaved),
        (status = 404, description = "Unknown specialization"),
        (status = 409, description = "Email or license number taken"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn create_doctor(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Result<Json<CreateDoctorRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<DoctorSaved>), AppError> {
    require_admin(&user, Resource::Doctors, &[Action::Create])?;
    let Json(request) = payload?;
    request.validate()?;

    let notifier = Notifier::new(state.email_queue.clone());
    let invitation = Invitation { notifier: &notifier, app_url: &state.config.app_url };
    let doctor = StaffService::create_doctor(&state.db, &invitation, &request).await?;

    let name = doctor.user_name.as_deref().unwrap_or(request.name.trim());
    audit(&state, &headers, &user, &doctor_created_audit(name, request.license_number.trim())).await;

    Ok((
        StatusCode::CREATED,
        Json(DoctorSaved { status: "ok".to_string(), doctor }),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/admin/doctors/{id}",
    params(("id" = String, Path, description = "Doctor user id")),
    request_body = UpdateDoctorRequest,
    responses(
        (status = 200, description = "Saved entity or noop notice", body = DoctorSaved),
        (status = 404, description = "Unknown doctor or specialization"),
        (status = 409, description = "License number taken"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn update_doctor(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateDoctorRequest>, JsonRejection>,
) -> Result<Json<UpdateOutcome<DoctorSaved>>, AppError> {
    require_admin(&user, Resource::Doctors, &[Action::Update])?;
    let Json(request) = payload?;
    request.validate()?;

    let change = StaffService::update_doctor(&state.db, &id, &request).await?;
    let outcome = finish_update(&state, &headers, &user, change, |doctor| DoctorSaved {
        status: "ok".to_string(),
        doctor,
    })
    .await;
    Ok(Json(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/admin/doctors/{id}",
    params(("id" = String, Path, description = "Doctor user id")),
    responses(
        (status = 200, body = OkResponse),
        (status = 404, description = "Unknown doctor"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn delete_doctor(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    require_admin(&user, Resource::Doctors, &[Action::Delete])?;
    let notifier = Notifier::new(state.email_queue.clone());
    let name = StaffService::delete_doctor(&state.db, &notifier, &id).await?;
    audit(&state, &headers, &user, &doctor_deleted_audit(&name)).await;
    Ok(Json(OkResponse::ok()))
}

// ==============================================================================
// RECEPTIONISTS
// ==============================================================================

#[utoipa::path(get, path = "/api/admin/receptionists", responses((status = 200, body = [ReceptionistAccount])), tag = "admin")]
#[axum::debug_handler]
pub async fn list_receptionists(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<ReceptionistAccount>>, AppError> {
    require_admin(&user, Resource::Users, &[Action::List])?;
    Ok(Json(StaffService::list_receptionists(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/receptionists/{id}",
    params(("id" = String, Path, description = "Receptionist user id")),
    responses(
        (status = 200, body = ReceptionistAccount),
        (status = 404, description = "Unknown receptionist"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn get_receptionist(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<ReceptionistAccount>, AppError> {
    require_admin(&user, Resource::Users, &[Action::Read])?;
    Ok(Json(StaffService::get_receptionist(&state.db, &id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/receptionists",
    request_body = CreateReceptionistRequest,
    responses(
        (status = 201, body = ReceptionistSaved),
        (status = 409, description = "Email already registered"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn create_receptionist(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Result<Json<CreateReceptionistRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReceptionistSaved>), AppError> {
    require_admin(&user, Resource::Users, &[Action::Create])?;
    let Json(request) = payload?;
    request.validate()?;

    let notifier = Notifier::new(state.email_queue.clone());
    let invitation = Invitation { notifier: &notifier, app_url: &state.config.app_url };
    let receptionist = StaffService::create_receptionist(&state.db, &invitation, &request).await?;

    let name = receptionist.user_name.as_deref().unwrap_or(request.name.trim());
    audit(&state, &headers, &user, &receptionist_created_audit(name)).await;

    Ok((
        StatusCode::CREATED,
        Json(ReceptionistSaved { status: "ok".to_string(), receptionist }),
    ))
}

/// Receptionists carry no editable profile fields yet; the call only confirms the account.
#[utoipa::path(
    patch,
    path = "/api/admin/receptionists/{id}",
    params(("id" = String, Path, description = "Receptionist user id")),
    responses(
        (status = 200, body = NoChanges),
        (status = 404, description = "Unknown receptionist"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn update_receptionist(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<NoChanges>, AppError> {
    require_admin(&user, Resource::Users, &[Action::Update])?;
    StaffService::get_receptionist(&state.db, &id).await?;
    Ok(Json(NoChanges::default()))
}

#[utoipa::path(
    delete,
    path = "/api/admin/receptionists/{id}",
    params(("id" = String, Path, description = "Receptionist user id")),
    responses(
        (status = 200, body = OkResponse),
        (status = 404, description = "Unknown receptionist"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn delete_receptionist(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    require_admin(&user, Resource::Users, &[Action::Delete])?;
    let name = StaffService::delete_receptionist(&state.db, &id).await?;
    audit(&state, &headers, &user, &receptionist_deleted_audit(&name)).await;
    Ok(Json(OkResponse::ok()))
}

// ==============================================================================
// ROOMS
// ==============================================================================

#[utoipa::path(get, path = "/api/admin/rooms", responses((status = 200, body = [RoomSummary])), tag = "admin")]
#[axum::debug_handler]
pub async fn list_rooms(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<RoomSummary>>, AppError> {
    require_admin(&user, Resource::Rooms, &[Action::List])?;
    Ok(Json(FacilityService::list_rooms(&state.db).await?))
}

#[utoipa::path(
    get,
    path = "/api/admin/rooms/{id}",
    params(("id" = String, Path, description = "Room id")),
    responses(
        (status = 200, body = RoomDetails),
        (status = 400, description = "Malformed room id"),
        (status = 404, description = "Unknown room"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn get_room(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    Path(id): Path<String>,
) -> Result<Json<RoomDetails>, AppError> {
    require_admin(&user, Resource::Rooms, &[Action::Read])?;
    let room_id = parse_positive_id(&id, AdminError::InvalidRoomId)?;
    Ok(Json(FacilityService::get_room(&state.db, room_id).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/rooms",
    request_body = CreateRoomRequest,
    responses(
        (status = 201, body = RoomSaved),
        (status = 400, description = "Unknown specialization"),
        (status = 409, description = "Room number taken"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn create_room(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Result<Json<CreateRoomRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<RoomSaved>), AppError> {
    require_admin(&user, Resource::Rooms, &[Action::Create])?;
    let Json(request) = payload?;
    request.validate()?;

    let room = FacilityService::create_room(&state.db, &request).await?;
    audit(&state, &headers, &user, &room_created_audit(room.number, &room.specialization_names)).await;

    Ok((
        StatusCode::CREATED,
        Json(RoomSaved { status: "ok".to_string(), room }),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/admin/rooms/{id}",
    params(("id" = String, Path, description = "Room id")),
    request_body = UpdateRoomRequest,
    responses(
        (status = 200, description = "Saved entity or noop notice", body = RoomSaved),
        (status = 400, description = "Malformed id or unknown specialization"),
        (status = 404, description = "Unknown room"),
        (status = 409, description = "Room number taken"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn update_room(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateRoomRequest>, JsonRejection>,
) -> Result<Json<UpdateOutcome<RoomSaved>>, AppError> {
    require_admin(&user, Resource::Rooms, &[Action::Update])?;
    let room_id = parse_positive_id(&id, AdminError::InvalidRoomId)?;
    let Json(request) = payload?;
    request.validate()?;

    debug!("Admin {} updating room {}", user.id, room_id);
    let change = FacilityService::update_room(&state.db, room_id, &request).await?;
    let outcome = finish_update(&state, &headers, &user, change, |room| RoomSaved {
        status: "ok".to_string(),
        room,
    })
    .await;
    Ok(Json(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/admin/rooms/{id}",
    params(("id" = String, Path, description = "Room id")),
    responses(
        (status = 200, body = OkResponse),
        (status = 400, description = "Room has appointments"),
        (status = 404, description = "Unknown room"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn delete_room(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    require_admin(&user, Resource::Rooms, &[Action::Delete])?;
    let room_id = parse_positive_id(&id, AdminError::InvalidRoomId)?;
    let number = FacilityService::delete_room(&state.db, room_id).await?;
    audit(&state, &headers, &user, &room_deleted_audit(number)).await;
    Ok(Json(OkResponse::ok()))
}

// ==============================================================================
// SPECIALIZATIONS
// ==============================================================================

#[utoipa::path(
    get,
    path = "/api/admin/specializations",
    responses((status = 200, body = [SpecializationSummary])),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn list_specializations(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
) -> Result<Json<Vec<SpecializationSummary>>, AppError> {
    require_admin(&user, Resource::Specializations, &[Action::List])?;
    Ok(Json(FacilityService::list_specializations(&state.db).await?))
}

#[utoipa::path(
    post,
    path = "/api/admin/specializations",
    request_body = CreateSpecializationRequest,
    responses(
        (status = 201, body = SpecializationSaved),
        (status = 409, description = "Name taken"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn create_specialization(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    payload: Result<Json<CreateSpecializationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SpecializationSaved>), AppError> {
    require_admin(&user, Resource::Specializations, &[Action::Create])?;
    let Json(request) = payload?;
    request.validate()?;

    let specialization = FacilityService::create_specialization(&state.db, &request).await?;
    audit(&state, &headers, &user, &specialization_created_audit(&specialization.name)).await;

    Ok((
        StatusCode::CREATED,
        Json(SpecializationSaved { status: "ok".to_string(), specialization }),
    ))
}

#[utoipa::path(
    patch,
    path = "/api/admin/specializations/{id}",
    params(("id" = String, Path, description = "Specialization id")),
    request_body = UpdateSpecializationRequest,
    responses(
        (status = 200, description = "Saved entity or noop notice", body = SpecializationSaved),
        (status = 400, description = "Malformed specialization id"),
        (status = 404, description = "Unknown specialization"),
        (status = 409, description = "Name taken"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn update_specialization(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<UpdateSpecializationRequest>, JsonRejection>,
) -> Result<Json<UpdateOutcome<SpecializationSaved>>, AppError> {
    require_admin(&user, Resource::Specializations, &[Action::Update])?;
    let specialization_id = parse_positive_id(&id, AdminError::InvalidSpecializationId)?;
    let Json(request) = payload?;
    request.validate()?;

    let change = FacilityService::rename_specialization(&state.db, specialization_id, &request).await?;
    let outcome = finish_update(&state, &headers, &user, change, |specialization| SpecializationSaved {
        status: "ok".to_string(),
        specialization,
    })
    .await;
    Ok(Json(outcome))
}

#[utoipa::path(
    delete,
    path = "/api/admin/specializations/{id}",
    params(("id" = String, Path, description = "Specialization id")),
    responses(
        (status = 200, body = OkResponse),
        (status = 400, description = "Doctors still assigned"),
        (status = 404, description = "Unknown specialization"),
    ),
    tag = "admin"
)]
#[axum::debug_handler]
pub async fn delete_specialization(
    State(state): State<AppState>,
    Extension(user): Extension<SessionUser>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<OkResponse>, AppError> {
    require_admin(&user, Resource::Specializations, &[Action::Delete])?;
    let specialization_id = parse_positive_id(&id, AdminError::InvalidSpecializationId)?;
    let name = FacilityService::delete_specialization(&state.db, specialization_id).await?;
    audit(&state, &headers, &user, &specialization_deleted_audit(&name)).await;
    Ok(Json(OkResponse::ok()))
}
