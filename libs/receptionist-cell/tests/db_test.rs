//! Tests against a live database. Run with `DATABASE_URL=... cargo test -- --ignored`.

use std::time::Duration;

use assert_matches::assert_matches;
use chrono::{Days, NaiveDate};
use sqlx::PgPool;
use uuid::Uuid;

use receptionist_cell::models::*;
use receptionist_cell::services::{FrontDeskService, RoomAssignmentService};
use shared_utils::datetime::{local_datetime, today_local};

const HMAC_KEY: &str = "test-pesel-hmac-key";

async fn pool() -> PgPool {
    let url = std::env::var("DATABASE_URL").expect("DATABASE_URL");
    PgPool::connect(&url).await.unwrap()
}

fn unique_number() -> i32 {
    10_000 + (Uuid::new_v4().as_u128() % 1_000_000_000) as i32
}

async fn specialization(pool: &PgPool) -> i32 {
    sqlx::query_scalar("INSERT INTO specializations (name) VALUES ($1) RETURNING id")
        .bind(format!("Specjalizacja {}", Uuid::new_v4()))
        .fetch_one(pool)
        .await
        .unwrap()
}

async fn user(pool: &PgPool, role: &str) -> String {
    let id = Uuid::new_v4().to_string();
    sqlx::query(r#"INSERT INTO "user" (id, name, email, role) VALUES ($1, $2, $3, $4)"#)
        .bind(&id)
        .bind(format!("Test {}", role))
        .bind(format!("{}@example.com", id))
        .bind(role)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn doctor(pool: &PgPool, specialization_id: i32) -> String {
    let id = user(pool, "doctor").await;
    sqlx::query("INSERT INTO doctors (user_id, specialization_id) VALUES ($1, $2)")
        .bind(&id)
        .bind(specialization_id)
        .execute(pool)
        .await
        .unwrap();
    id
}

async fn patient(pool: &PgPool) -> String {
    let id = user(pool, "user").await;
    sqlx::query(
        "INSERT INTO patients (user_id, pesel, pesel_hmac, address) VALUES ($1, 'encrypted', $2, 'ul. Testowa 1')",
    )
    .bind(&id)
    .bind(Uuid::new_v4().to_string())
    .execute(pool)
    .await
    .unwrap();
    id
}

async fn room(pool: &PgPool, specializations: &[i32]) -> i32 {
    let room_id: i32 = sqlx::query_scalar("INSERT INTO room (number) VALUES ($1) RETURNING room_id")
        .bind(unique_number())
        .fetch_one(pool)
        .await
        .unwrap();
    sqlx::query("INSERT INTO room_specializations (room_id, specialization_id) SELECT $1, unnest($2::int[])")
        .bind(room_id)
        .bind(specializations)
        .execute(pool)
        .await
        .unwrap();
    room_id
}

async fn frame(pool: &PgPool, doctor_id: &str, day: NaiveDate, start: &str, end: &str) -> String {
    let schedule_id = Uuid::new_v4().to_string();
    sqlx::query(
        r#"INSERT INTO availability (schedule_id, day, time_start, time_end, doctors_user_id)
           VALUES ($1, $2, $3::time, $4::time, $5)"#,
    )
    .bind(&schedule_id)
    .bind(day)
    .bind(start)
    .bind(end)
    .bind(doctor_id)
    .execute(pool)
    .await
    .unwrap();
    schedule_id
}

fn future_day() -> NaiveDate {
    today_local() + Days::new(30)
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn room_outside_the_doctor_specialization_is_refused() {
    let pool = pool().await;
    let cardiology = specialization(&pool).await;
    let dermatology = specialization(&pool).await;
    let doctor_id = doctor(&pool, cardiology).await;
    let schedule_id = frame(&pool, &doctor_id, future_day(), "08:00", "12:00").await;
    let room_id = room(&pool, &[dermatology]).await;

    let result = RoomAssignmentService::assign(
        &pool,
        &AssignRoomRequest { schedule_id, room_id: Some(room_id) },
    )
    .await;
    assert_matches!(result, Err(ReceptionError::RoomIncompatible));
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn room_cannot_serve_two_overlapping_frames() {
    let pool = pool().await;
    let cardiology = specialization(&pool).await;
    let day = future_day();
    let first_doctor = doctor(&pool, cardiology).await;
    let second_doctor = doctor(&pool, cardiology).await;
    let morning = frame(&pool, &first_doctor, day, "08:00", "12:00").await;
    let late_morning = frame(&pool, &second_doctor, day, "11:00", "14:00").await;
    let afternoon = frame(&pool, &second_doctor, day, "12:00", "16:00").await;
    let room_id = room(&pool, &[cardiology]).await;

    let assigned = RoomAssignmentService::assign(
        &pool,
        &AssignRoomRequest { schedule_id: morning, room_id: Some(room_id) },
    )
    .await
    .unwrap();
    assert_eq!(assigned.room_id, Some(room_id));

    let clash = RoomAssignmentService::assign(
        &pool,
        &AssignRoomRequest { schedule_id: late_morning, room_id: Some(room_id) },
    )
    .await;
    assert_matches!(clash, Err(ReceptionError::RoomTaken));

    let back_to_back = RoomAssignmentService::assign(
        &pool,
        &AssignRoomRequest { schedule_id: afternoon, room_id: Some(room_id) },
    )
    .await;
    assert!(back_to_back.is_ok());
}

#[tokio::test]
#[ignore = "requires a running PostgreSQL instance"]
async fn check_in_does_not_revive_a_visit_canceled_meanwhile() {
    let pool = pool().await;
    let doctor_id = doctor(&pool, specialization(&pool).await).await;
    let patient_id = patient(&pool).await;
    let start = local_datetime(future_day(), 9 * 60).unwrap();

    let appointment_id: i32 = sqlx::query_scalar(
        r#"INSERT INTO appointments (patient_id, doctor_id, datetime, status, is_online)
           VALUES ($1, $2, $3, 'scheduled', TRUE)
           RETURNING appointment_id"#,
    )
    .bind(&patient_id)
    .bind(&doctor_id)
    .bind(start)
    .fetch_one(&pool)
    .await
    .unwrap();

    let mut cancel = pool.begin().await.unwrap();
    sqlx::query("SELECT 1 FROM appointments WHERE appointment_id = $1 FOR UPDATE")
        .bind(appointment_id)
        .execute(&mut *cancel)
        .await
        .unwrap();

    let check_in = tokio::spawn({
        let pool = pool.clone();
        let request = CheckInRequest { appointment_id, pesel: None };
        async move { FrontDeskService::check_in(&pool, HMAC_KEY, &request).await }
    });

    tokio::time::sleep(Duration::from_millis(500)).await;
    sqlx::query("UPDATE appointments SET status = 'canceled' WHERE appointment_id = $1")
        .bind(appointment_id)
        .execute(&mut *cancel)
        .await
        .unwrap();
    cancel.commit().await.unwrap();

    assert_matches!(check_in.await.unwrap(), Err(ReceptionError::NotCheckable));

    let status: String = sqlx::query_scalar("SELECT status::text FROM appointments WHERE appointment_id = $1")
        .bind(appointment_id)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(status, "canceled");
}
