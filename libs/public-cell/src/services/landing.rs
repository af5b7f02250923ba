use sqlx::PgPool;
use tracing::debug;

use shared_utils::datetime::{today_local, today_range};

use crate::models::{LandingResponse, LandingSpecialization, PublicError};

pub struct LandingService;

impl LandingService {
    pub async fn landing(pool: &PgPool) -> Result<LandingResponse, PublicError> {
        let patients_count: i64 = sqlx::query_scalar("SELECT count(*) FROM patients")
            .fetch_one(pool)
            .await?;

        let visits_today: i64 = match today_range() {
            Some((start, end)) => {
                sqlx::query_scalar("SELECT count(*) FROM appointments WHERE datetime >= $1 AND datetime < $2")
                    .bind(start)
                    .bind(end)
                    .fetch_one(pool)
                    .await?
            }
            None => 0,
        };

        let specializations = sqlx::query_as::<_, LandingSpecialization>(
            r#"SELECT s.id, s.name, s.description, s.icon,
                      min(av.day) AS next_available_date
               FROM specializations s
               LEFT JOIN doctors d ON d.specialization_id = s.id
               LEFT JOIN availability av ON av.doctors_user_id = d.user_id AND av.day >= $1
               GROUP BY s.id, s.name, s.description, s.icon
               ORDER BY s.name ASC"#,
        )
        .bind(today_local())
        .fetch_all(pool)
        .await?;

        debug!("Landing: {} patients, {} visits today", patients_count, visits_today);
        Ok(LandingResponse {
            patients_count,
            visits_today,
            specializations,
        })
    }
}
