use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(title = "Przychodnia API", description = "Clinic management backend"),
    paths(
        auth_cell::handlers::register,
        auth_cell::handlers::verify_email,
        admin_cell::handlers::list_admins,
        admin_cell::handlers::create_admin,
        admin_cell::handlers::update_admin,
        admin_cell::handlers::delete_admin,
        admin_cell::handlers::list_appointments,
        admin_cell::handlers::list_patients,
        admin_cell::handlers::list_logs,
        admin_cell::handlers::statistics,
        admin_cell::handlers::list_queues,
        admin_cell::handlers::list_doctors,
        admin_cell::handlers::create_doctor,
        admin_cell::handlers::update_doctor,
        admin_cell::handlers::delete_doctor,
        admin_cell::handlers::list_receptionists,
        admin_cell::handlers::get_receptionist,
        admin_cell::handlers::create_receptionist,
        admin_cell::handlers::update_receptionist,
        admin_cell::handlers::delete_receptionist,
        admin_cell::handlers::list_rooms,
        admin_cell::handlers::get_room,
        admin_cell::handlers::create_room,
        admin_cell::handlers::update_room,
        admin_cell::handlers::delete_room,
        admin_cell::handlers::list_specializations,
        admin_cell::handlers::create_specialization,
        admin_cell::handlers::update_specialization,
        admin_cell::handlers::delete_specialization,
        doctor_cell::handlers::get_appointment,
        doctor_cell::handlers::complete_appointment,
        doctor_cell::handlers::list_dispositions,
        doctor_cell::handlers::save_dispositions,
        doctor_cell::handlers::today_dispositions,
        doctor_cell::handlers::list_patients,
        doctor_cell::handlers::list_visits,
        doctor_cell::handlers::today_visits,
        doctor_cell::handlers::handled_visits,
        doctor_cell::handlers::visit_types,
        patient_cell::handlers::list_visits,
        patient_cell::handlers::upcoming_visits,
        patient_cell::handlers::get_appointment,
        patient_cell::handlers::cancel_appointment,
        patient_cell::handlers::book_appointment,
        patient_cell::handlers::list_prescriptions,
        patient_cell::handlers::active_prescriptions,
        patient_cell::handlers::update_prescription,
        patient_cell::handlers::list_results,
        patient_cell::handlers::recent_results,
        patient_cell::handlers::list_recommendations,
        patient_cell::handlers::list_specializations,
        patient_cell::handlers::dashboard,
        patient_cell::handlers::me,
        receptionist_cell::handlers::cancel_appointment,
        receptionist_cell::handlers::create_appointment,
        receptionist_cell::handlers::patient_appointments,
        receptionist_cell::handlers::available_slots,
        receptionist_cell::handlers::room_board,
        receptionist_cell::handlers::assign_room,
        receptionist_cell::handlers::check_in,
        receptionist_cell::handlers::today_visits,
        receptionist_cell::handlers::visits_today_stats,
        receptionist_cell::handlers::list_users,
        public_cell::handlers::landing,
        public_cell::handlers::health,
    ),
    tags(
        (name = "auth", description = "Registration and email verification"),
        (name = "admin", description = "Staff, rooms, specializations and clinic overview"),
        (name = "doctor", description = "Doctor visits, schedules and statistics"),
        (name = "patient", description = "Patient visits, prescriptions and results"),
        (name = "receptionist", description = "Front desk booking, rooms and check-in"),
        (name = "public", description = "Landing data and health probe"),
    )
)]
pub struct ApiDoc;
