use sqlx::{PgConnection, PgPool};
use tracing::info;

use crate::models::{
    normalize_ids, room_specializations_change_line, room_updated_audit, specialization_change,
    specialization_renamed_audit, AdminError, Change, CreateRoomRequest, CreateSpecializationRequest,
    RoomDetails, RoomSummary, SpecializationSummary, UpdateRoomRequest, UpdateSpecializationRequest,
};

pub struct FacilityService;

impl FacilityService {
    // ==========================================================================
    // ROOMS
    // ==========================================================================

    pub async fn list_rooms(pool: &PgPool) -> Result<Vec<RoomSummary>, AdminError> {
        let rooms = sqlx::query_as::<_, RoomSummary>(
            r#"SELECT r.room_id, r.number, count(a.appointment_id) AS appointment_count
               FROM room r
               LEFT JOIN appointments a ON a.room_room_id = r.room_id
               GROUP BY r.room_id, r.number
               ORDER BY r.number ASC"#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rooms)
    }

    pub async fn get_room(pool: &PgPool, room_id: i32) -> Result<RoomDetails, AdminError> {
        let mut conn = pool.acquire().await?;
        Self::find_room(&mut conn, room_id).await
    }

    async fn find_room(conn: &mut PgConnection, room_id: i32) -> Result<RoomDetails, AdminError> {
        sqlx::query_as::<_, RoomDetails>(
            r#"SELECT r.room_id, r.number,
                      (SELECT count(*) FROM appointments a WHERE a.room_room_id = r.room_id) AS appointment_count,
                      COALESCE(array_agg(s.id ORDER BY s.id) FILTER (WHERE s.id IS NOT NULL), '{}') AS specialization_ids,
                      COALESCE(array_agg(s.name ORDER BY s.id) FILTER (WHERE s.id IS NOT NULL), '{}') AS specialization_names
               FROM room r
               LEFT JOIN room_specializations rs ON rs.room_id = r.room_id
               LEFT JOIN specializations s ON s.id = rs.specialization_id
               WHERE r.room_id = $1
               GROUP BY r.room_id, r.number"#,
        )
        .bind(room_id)
        .fetch_optional(conn)
        .await?
        .ok_or(AdminError::RoomNotFound)
    }

    /// Names of the given specializations, ordered by id. Every id must exist.
    async fn specialization_names(conn: &mut PgConnection, ids: &[i32]) -> Result<Vec<String>, AdminError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let names: Vec<String> = sqlx::query_scalar("SELECT name FROM specializations WHERE id = ANY($1) ORDER BY id")
            .bind(ids)
            .fetch_all(conn)
            .await?;
        if names.len() != ids.len() {
            return Err(AdminError::UnknownSpecializations);
        }
        Ok(names)
    }

    async fn replace_room_specializations(
        conn: &mut PgConnection,
        room_id: i32,
        ids: &[i32],
    ) -> Result<(), AdminError> {
        sqlx::query("DELETE FROM room_specializations WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *conn)
            .await?;
        sqlx::query(
            r#"INSERT INTO room_specializations (room_id, specialization_id)
               SELECT $1, unnest($2::int[])"#,
        )
        .bind(room_id)
        .bind(ids)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn create_room(pool: &PgPool, request: &CreateRoomRequest) -> Result<RoomDetails, AdminError> {
        let ids = normalize_ids(&request.specializations);
        let mut tx = pool.begin().await?;
        Self::specialization_names(&mut tx, &ids).await?;

        let room_id: i32 = sqlx::query_scalar("INSERT INTO room (number) VALUES ($1) RETURNING room_id")
            .bind(request.number)
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| AdminError::unique_or(e, AdminError::RoomNumberTaken))?;

        Self::replace_room_specializations(&mut tx, room_id, &ids).await?;
        let room = Self::find_room(&mut tx, room_id).await?;
        tx.commit().await?;

        info!("Created room {} (number {})", room_id, room.number);
        Ok(room)
    }

    pub async fn update_room(
        pool: &PgPool,
        room_id: i32,
        request: &UpdateRoomRequest,
    ) -> Result<Change<RoomDetails>, AdminError> {
        let mut tx = pool.begin().await?;
        let current = Self::find_room(&mut tx, room_id).await?;

        let mut changes = Vec::new();
        let number = request.number.filter(|next| *next != current.number);
        if let Some(number) = number {
            changes.push(format!("zmieniono numer na {}", number));
        }

        let specializations = specialization_change(&current.specialization_ids, request.specializations.as_deref());
        if let Some(ids) = &specializations {
            let names = Self::specialization_names(&mut tx, ids).await?;
            changes.push(room_specializations_change_line(&names));
        }

        if changes.is_empty() {
            return Ok(Change::Unchanged);
        }

        if let Some(number) = number {
            sqlx::query("UPDATE room SET number = $2 WHERE room_id = $1")
                .bind(room_id)
                .bind(number)
                .execute(&mut *tx)
                .await
                .map_err(|e| AdminError::unique_or(e, AdminError::RoomNumberTaken))?;
        }
        if let Some(ids) = &specializations {
            Self::replace_room_specializations(&mut tx, room_id, ids).await?;
        }

        let room = Self::find_room(&mut tx, room_id).await?;
        tx.commit().await?;

        Ok(Change::Applied {
            audit: room_updated_audit(room.number, &changes),
            value: room,
        })
    }

    /// Deletes a room nobody has visits in. Returns the room number.
    pub async fn delete_room(pool: &PgPool, room_id: i32) -> Result<i32, AdminError> {
        let mut tx = pool.begin().await?;
        let room = Self::find_room(&mut tx, room_id).await?;
        if room.appointment_count > 0 {
            return Err(AdminError::RoomInUse);
        }

        sqlx::query("DELETE FROM room WHERE room_id = $1")
            .bind(room_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Deleted room {} (number {})", room_id, room.number);
        Ok(room.number)
    }

    // ==========================================================================
    // SPECIALIZATIONS
    // ==========================================================================

    pub async fn list_specializations(pool: &PgPool) -> Result<Vec<SpecializationSummary>, AdminError> {
        let rows = sqlx::query_as::<_, SpecializationSummary>(
            r#"SELECT s.id, s.name, count(d.user_id) AS doctor_count
               FROM specializations s
               LEFT JOIN doctors d ON d.specialization_id = s.id
               GROUP BY s.id, s.name
               ORDER BY s.name ASC"#,
        )
        .fetch_all(pool)
        .await?;
        Ok(rows)
    }

    async fn find_specialization(conn: &mut PgConnection, id: i32) -> Result<SpecializationSummary, AdminError> {
        sqlx::query_as::<_, SpecializationSummary>(
            r#"SELECT s.id, s.name, count(d.user_id) AS doctor_count
               FROM specializations s
               LEFT JOIN doctors d ON d.specialization_id = s.id
               WHERE s.id = $1
               GROUP BY s.id, s.name"#,
        )
        .bind(id)
        .fetch_optional(conn)
        .await?
        .ok_or(AdminError::SpecializationNotFound)
    }

    pub async fn create_specialization(
        pool: &PgPool,
        request: &CreateSpecializationRequest,
    ) -> Result<SpecializationSummary, AdminError> {
        let (id, name): (i32, String) =
            sqlx::query_as("INSERT INTO specializations (name) VALUES ($1) RETURNING id, name")
                .bind(request.name.trim())
                .fetch_one(pool)
                .await
                .map_err(|e| AdminError::unique_or(e, AdminError::SpecializationTaken))?;

        info!("Created specialization {} ({})", id, name);
        Ok(SpecializationSummary { id, name, doctor_count: 0 })
    }

    pub async fn rename_specialization(
        pool: &PgPool,
        id: i32,
        request: &UpdateSpecializationRequest,
    ) -> Result<Change<SpecializationSummary>, AdminError> {
        let mut conn = pool.acquire().await?;
        let current = Self::find_specialization(&mut conn, id).await?;

        let Some(name) = request.name.as_deref().map(str::trim) else {
            return Ok(Change::Unchanged);
        };
        if name == current.name {
            return Ok(Change::Unchanged);
        }

        sqlx::query("UPDATE specializations SET name = $2 WHERE id = $1")
            .bind(id)
            .bind(name)
            .execute(&mut *conn)
            .await
            .map_err(|e| AdminError::unique_or(e, AdminError::SpecializationTaken))?;

        let updated = Self::find_specialization(&mut conn, id).await?;
        Ok(Change::Applied {
            audit: specialization_renamed_audit(&current.name, &updated.name),
            value: updated,
        })
    }

    /// Deletes a specialization no doctor uses. Returns its name.
    pub async fn delete_specialization(pool: &PgPool, id: i32) -> Result<String, AdminError> {
        let mut tx = pool.begin().await?;
        let current = Self::find_specialization(&mut tx, id).await?;
        if current.doctor_count > 0 {
            return Err(AdminError::SpecializationInUse);
        }

        sqlx::query("DELETE FROM specializations WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Deleted specialization {} ({})", id, current.name);
        Ok(current.name)
    }
}
