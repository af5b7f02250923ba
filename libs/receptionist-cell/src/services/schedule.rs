use sqlx::PgPool;
use tracing::debug;

use appointment_cell::{DoctorSlots, SlotService};

use crate::models::{AvailableSlotsResponse, ReceptionError, SlotDoctorRow, SlotSearch, SlotTarget};

pub struct ScheduleService;

impl ScheduleService {
    /// Free slots per doctor. Banned doctors keep their frames but take no new visits.
    pub async fn available_slots(pool: &PgPool, search: SlotSearch) -> Result<AvailableSlotsResponse, ReceptionError> {
        let (doctor_id, specialization_id) = match &search.target {
            SlotTarget::Doctor(id) => (Some(id.as_str()), None),
            SlotTarget::Specialization(id) => (None, Some(*id)),
        };

        let doctors = sqlx::query_as::<_, SlotDoctorRow>(
            r#"SELECT d.user_id AS doctor_id, d.specialization_id, s.name AS specialization_name,
                      u.name AS doctor_name, u.email AS doctor_email
               FROM doctors d
               LEFT JOIN specializations s ON s.id = d.specialization_id
               LEFT JOIN "user" u ON u.id = d.user_id
               WHERE ($1::text IS NOT NULL AND d.user_id = $1
                      OR $1::text IS NULL AND d.specialization_id = $2)
                 AND COALESCE(u.banned, FALSE) = FALSE
               ORDER BY u.name ASC"#,
        )
        .bind(doctor_id)
        .bind(specialization_id)
        .fetch_all(pool)
        .await?;

        let mut slots = Vec::with_capacity(doctors.len());
        for doctor in doctors {
            let windows = SlotService::doctor_slots(pool, &doctor.doctor_id, &search.query).await?;
            slots.push(DoctorSlots {
                doctor_id: doctor.doctor_id,
                specialization_id: doctor.specialization_id,
                specialization_name: doctor.specialization_name,
                doctor_name: doctor.doctor_name,
                doctor_email: doctor.doctor_email,
                slots: windows,
            });
        }

        debug!(
            "Slot search {:?} from {} to {} matched {} doctors",
            search.target,
            search.start_date,
            search.end_date,
            slots.len()
        );

        Ok(AvailableSlotsResponse {
            start_date: search.start_date,
            end_date: search.end_date,
            slots,
            kind: search.query.kind,
        })
    }
}
