use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;
use tracing::{debug, info};

use appointment_cell::appointments_overlap;

use crate::models::{
    AssignRoomRequest, AssignRoomResponse, ReceptionError, RoomBoard, RoomOption, ScheduledFrame,
    ScheduledFrameRow,
};

pub struct RoomAssignmentService;

impl RoomAssignmentService {
    /// Rooms with their specializations, plus every availability frame of the day.
    pub async fn board(pool: &PgPool, day: NaiveDate) -> Result<RoomBoard, ReceptionError> {
        let rooms = sqlx::query_as::<_, RoomOption>(
            r#"SELECT r.room_id, r.number,
                      COALESCE(array_agg(s.id ORDER BY s.id) FILTER (WHERE s.id IS NOT NULL), '{}') AS specialization_ids,
                      COALESCE(array_agg(s.name ORDER BY s.id) FILTER (WHERE s.id IS NOT NULL), '{}') AS specialization_names
               FROM room r
               LEFT JOIN room_specializations rs ON rs.room_id = r.room_id
               LEFT JOIN specializations s ON s.id = rs.specialization_id
               GROUP BY r.room_id, r.number
               ORDER BY r.number ASC, r.room_id ASC"#,
        )
        .fetch_all(pool)
        .await?;

        let frames = sqlx::query_as::<_, ScheduledFrameRow>(
            r#"SELECT av.schedule_id, av.day, av.time_start, av.time_end,
                      av.room_room_id AS room_id, r.number AS room_number,
                      d.user_id AS doctor_id, u.name AS doctor_name, u.email AS doctor_email,
                      d.specialization_id, s.name AS specialization_name
               FROM availability av
               LEFT JOIN room r ON r.room_id = av.room_room_id
               LEFT JOIN doctors d ON d.user_id = av.doctors_user_id
               LEFT JOIN specializations s ON s.id = d.specialization_id
               LEFT JOIN "user" u ON u.id = d.user_id
               WHERE av.day = $1
               ORDER BY av.time_start ASC"#,
        )
        .bind(day)
        .fetch_all(pool)
        .await?;

        debug!("Room board for {}: {} rooms, {} frames", day, rooms.len(), frames.len());
        let timeframes = frames
            .into_iter()
            .map(|row| ScheduledFrame::from_row(row, &rooms))
            .collect();

        Ok(RoomBoard { day, timeframes, rooms })
    }

    /// Puts a room on an availability frame, or clears it when `room_id` is null.
    /// The room row is locked so two frames cannot claim it at once.
    pub async fn assign(pool: &PgPool, request: &AssignRoomRequest) -> Result<AssignRoomResponse, ReceptionError> {
        let mut tx = pool.begin().await?;

        let slot: Option<(NaiveDate, NaiveTime, NaiveTime, Option<i32>)> = sqlx::query_as(
            r#"SELECT av.day, av.time_start, av.time_end, d.specialization_id
               FROM availability av
               LEFT JOIN doctors d ON d.user_id = av.doctors_user_id
               WHERE av.schedule_id = $1
               FOR UPDATE OF av"#,
        )
        .bind(&request.schedule_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (day, start, end, specialization_id) = slot.ok_or(ReceptionError::SlotNotFound)?;
        let specialization_id = specialization_id.ok_or(ReceptionError::DoctorWithoutSpecialization)?;

        let Some(room_id) = request.room_id else {
            sqlx::query("UPDATE availability SET room_room_id = NULL WHERE schedule_id = $1")
                .bind(&request.schedule_id)
                .execute(&mut *tx)
                .await?;
            tx.commit().await?;
            info!("Cleared room of availability frame {}", request.schedule_id);
            return Ok(AssignRoomResponse {
                status: "ok".to_string(),
                room_id: None,
            });
        };

        let room: Option<(i32, Vec<i32>)> = sqlx::query_as(
            r#"SELECT r.room_id,
                      COALESCE((SELECT array_agg(rs.specialization_id)
                                  FROM room_specializations rs
                                 WHERE rs.room_id = r.room_id), '{}')
               FROM room r
               WHERE r.room_id = $1
               FOR UPDATE OF r"#,
        )
        .bind(room_id)
        .fetch_optional(&mut *tx)
        .await?;

        let (_, room_specializations) = room.ok_or(ReceptionError::RoomNotFound)?;
        if !room_specializations.contains(&specialization_id) {
            return Err(ReceptionError::RoomIncompatible);
        }

        let assigned: Vec<(NaiveTime, NaiveTime)> = sqlx::query_as(
            r#"SELECT time_start, time_end FROM availability
               WHERE room_room_id = $1 AND day = $2 AND schedule_id <> $3"#,
        )
        .bind(room_id)
        .bind(day)
        .bind(&request.schedule_id)
        .fetch_all(&mut *tx)
        .await?;

        if assigned
            .iter()
            .any(|(other_start, other_end)| appointments_overlap(start, end, *other_start, *other_end))
        {
            return Err(ReceptionError::RoomTaken);
        }

        sqlx::query("UPDATE availability SET room_room_id = $2 WHERE schedule_id = $1")
            .bind(&request.schedule_id)
            .bind(room_id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        info!("Assigned room {} to availability frame {}", room_id, request.schedule_id);
        Ok(AssignRoomResponse {
            status: "ok".to_string(),
            room_id: Some(room_id),
        })
    }
}
