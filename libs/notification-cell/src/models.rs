use serde::{Deserialize, Serialize};

use appointment_cell::AppointmentType;

pub const SUBJECT_REMINDER: &str = "Przypomnienie o wizycie";
pub const SUBJECT_CANCELED_BY_RECEPTION: &str = "Wizyta została anulowana";
pub const SUBJECT_CANCELED_DOCTOR_REMOVED: &str = "Potwierdzenie odwołania wizyty";
pub const SUBJECT_VERIFY_EMAIL: &str = "Potwierdź swój adres email";
pub const SUBJECT_SET_PASSWORD: &str = "Ustaw hasło do konta w przychodni";

/// Visit details rendered into reminder and cancellation emails.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppointmentEmail {
    pub patient_name: String,
    pub doctor_name: String,
    pub appointment_date_time: String,
    pub visit_mode: String,
    pub appointment_type: String,
}

impl AppointmentEmail {
    pub fn new(
        patient_name: String,
        doctor_name: String,
        appointment_date_time: String,
        is_online: bool,
        kind: AppointmentType,
    ) -> Self {
        Self {
            patient_name,
            doctor_name,
            appointment_date_time,
            visit_mode: visit_mode_label(is_online).to_string(),
            appointment_type: kind.polish_label().to_string(),
        }
    }
}

pub fn visit_mode_label(is_online: bool) -> &'static str {
    if is_online {
        "Online"
    } else {
        "Stacjonarna"
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReminderSummary {
    pub result: String,
    pub queued: usize,
    pub total: usize,
}

/// Worker pool settings.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub worker_id: String,
    pub concurrency: usize,
    pub idle_backoff_ms: u64,
    pub error_backoff_secs: u64,
    pub stalled_check_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            worker_id: "email-worker".to_string(),
            concurrency: 1,
            idle_backoff_ms: 250,
            error_backoff_secs: 5,
            stalled_check_secs: 60,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_follow_visit_kind() {
        let email = AppointmentEmail::new(
            "Jan Kowalski".into(),
            "Anna Nowak".into(),
            "5 marca 2025, 09:40".into(),
            true,
            AppointmentType::Procedure,
        );
        assert_eq!(email.visit_mode, "Online");
        assert_eq!(email.appointment_type, "Zabieg");
        assert_eq!(visit_mode_label(false), "Stacjonarna");
    }
}
