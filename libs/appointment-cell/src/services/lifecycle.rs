use tracing::{debug, warn};

use crate::models::AppointmentStatus;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot change appointment status from {from} to {to}")]
pub struct InvalidTransition {
    pub from: AppointmentStatus,
    pub to: AppointmentStatus,
}

pub struct AppointmentLifecycleService;

impl AppointmentLifecycleService {
    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        current: AppointmentStatus,
        next: AppointmentStatus,
    ) -> Result<(), InvalidTransition> {
        debug!("Validating status transition from {} to {}", current, next);

        if !Self::valid_transitions(current).contains(&next) {
            warn!("Invalid status transition attempted: {} -> {}", current, next);
            return Err(InvalidTransition { from: current, to: next });
        }

        Ok(())
    }

    pub fn valid_transitions(current: AppointmentStatus) -> Vec<AppointmentStatus> {
        match current {
            AppointmentStatus::Scheduled => {
                vec![AppointmentStatus::CheckedIn, AppointmentStatus::Canceled]
            }
            AppointmentStatus::CheckedIn => {
                vec![AppointmentStatus::Completed, AppointmentStatus::Canceled]
            }
            // Terminal states
            AppointmentStatus::Completed | AppointmentStatus::Canceled => vec![],
        }
    }

    /// Patients may only withdraw visits that nobody has acted on yet.
    pub fn patient_can_cancel(current: AppointmentStatus) -> bool {
        current == AppointmentStatus::Scheduled
    }

    pub fn staff_can_cancel(current: AppointmentStatus) -> bool {
        current.is_active()
    }

    pub fn is_terminal(current: AppointmentStatus) -> bool {
        Self::valid_transitions(current).is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_in_then_complete() {
        assert!(AppointmentLifecycleService::validate_status_transition(
            AppointmentStatus::Scheduled,
            AppointmentStatus::CheckedIn
        )
        .is_ok());
        assert!(AppointmentLifecycleService::validate_status_transition(
            AppointmentStatus::CheckedIn,
            AppointmentStatus::Completed
        )
        .is_ok());
    }

    #[test]
    fn cannot_complete_without_check_in() {
        let err = AppointmentLifecycleService::validate_status_transition(
            AppointmentStatus::Scheduled,
            AppointmentStatus::Completed,
        )
        .unwrap_err();
        assert_eq!(err.from, AppointmentStatus::Scheduled);
        assert_eq!(err.to, AppointmentStatus::Completed);
    }

    #[test]
    fn terminal_states() {
        assert!(AppointmentLifecycleService::is_terminal(AppointmentStatus::Canceled));
        assert!(AppointmentLifecycleService::is_terminal(AppointmentStatus::Completed));
        assert!(!AppointmentLifecycleService::is_terminal(AppointmentStatus::CheckedIn));
    }

    #[test]
    fn cancel_rules_differ_by_actor() {
        assert!(AppointmentLifecycleService::patient_can_cancel(AppointmentStatus::Scheduled));
        assert!(!AppointmentLifecycleService::patient_can_cancel(AppointmentStatus::CheckedIn));
        assert!(AppointmentLifecycleService::staff_can_cancel(AppointmentStatus::CheckedIn));
        assert!(!AppointmentLifecycleService::staff_can_cancel(AppointmentStatus::Completed));
    }
}
