use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use shared_models::error::AppError;

// ==============================================================================
// LANDING PAGE
// ==============================================================================

#[derive(Debug, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LandingSpecialization {
    pub id: i32,
    pub name: String,
    pub description: Option<String>,
    pub icon: String,
    /// First day with published availability among the specialization's doctors.
    pub next_available_date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LandingResponse {
    pub patients_count: i64,
    pub visits_today: i64,
    pub specializations: Vec<LandingSpecialization>,
}

// ==============================================================================
// HEALTH
// ==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentHealth {
    pub status: HealthStatus,
    pub response_time_ms: u64,
    pub error_message: Option<String>,
}

impl ComponentHealth {
    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub database: ComponentHealth,
    pub redis: ComponentHealth,
    pub timestamp: DateTime<Utc>,
}

impl HealthReport {
    pub fn new(database: ComponentHealth, redis: ComponentHealth) -> Self {
        let status = if database.is_healthy() && redis.is_healthy() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };
        Self {
            status,
            database,
            redis,
            timestamp: Utc::now(),
        }
    }
}

#[derive(Error, Debug)]
pub enum PublicError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl From<PublicError> for AppError {
    fn from(err: PublicError) -> Self {
        match err {
            PublicError::Database(e) => AppError::from(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn component(status: HealthStatus) -> ComponentHealth {
        ComponentHealth {
            status,
            response_time_ms: 3,
            error_message: None,
        }
    }

    #[test]
    fn one_failing_dependency_makes_the_service_unhealthy() {
        let report = HealthReport::new(component(HealthStatus::Healthy), component(HealthStatus::Unhealthy));
        assert_eq!(report.status, HealthStatus::Unhealthy);

        let report = HealthReport::new(component(HealthStatus::Healthy), component(HealthStatus::Healthy));
        assert_eq!(report.status, HealthStatus::Healthy);
    }

    #[test]
    fn landing_serializes_camel_case() {
        let landing = LandingResponse {
            patients_count: 4,
            visits_today: 2,
            specializations: vec![LandingSpecialization {
                id: 1,
                name: "Pediatria".into(),
                description: None,
                icon: "lucide:baby".into(),
                next_available_date: NaiveDate::from_ymd_opt(2025, 5, 6),
            }],
        };
        let json = serde_json::to_value(&landing).unwrap();
        assert_eq!(json["patientsCount"], 4);
        assert_eq!(json["specializations"][0]["nextAvailableDate"], "2025-05-06");
    }
}
