use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    middleware::{get_current_user, require_permission},
    models::{Attendance, AttendanceDisplay, AttendanceInput, MealType},
};

#[derive(Debug, Deserialize)]
pub struct AttendanceFilters {
    pub date: Option<NaiveDate>,
    pub meal_type: Option<MealType>,
}

pub async fn list_attendances(
    State(db): State<Database>,
    headers: HeaderMap,
    Query(filters): Query<AttendanceFilters>,
) -> Result<Json<Vec<AttendanceDisplay>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_attendances").await?;

    let attendances = sqlx::query_as::<_, AttendanceDisplay>(
        r#"
        SELECT a.*, s.first_name, s.last_name, s.grade, s.class_name, u.username AS recorded_by_name
        FROM attendances a
        JOIN students s ON a.student_id = s.id
        JOIN users u ON a.recorded_by = u.id
        WHERE ($1::date IS NULL OR a.attendance_date = $1)
          AND ($2::meal_type IS NULL OR a.meal_type = $2)
        ORDER BY a.attendance_date DESC, s.last_name, s.first_name
        "#,
    )
    .bind(filters.date)
    .bind(filters.meal_type)
    .fetch_all(&db)
    .await?;

    Ok(Json(attendances))
}

/// Recording the same (student, date, meal) twice overwrites the first entry.
pub async fn record_attendance(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<AttendanceInput>,
) -> Result<(StatusCode, Json<Attendance>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_attendances").await?;

    let attendance = sqlx::query_as::<_, Attendance>(
        r#"
        INSERT INTO attendances (student_id, attendance_date, meal_type, is_present, notes, recorded_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (student_id, attendance_date, meal_type) DO UPDATE SET
            is_present = EXCLUDED.is_present,
            notes = EXCLUDED.notes,
            recorded_by = EXCLUDED.recorded_by,
            recorded_at = NOW()
        RETURNING *
        "#,
    )
    .bind(input.student_id)
    .bind(input.attendance_date)
    .bind(input.meal_type)
    .bind(input.is_present)
    .bind(&input.notes)
    .bind(current_user.id)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(attendance)))
}

pub async fn update_attendance(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(attendance_id): Path<Uuid>,
    Json(input): Json<AttendanceInput>,
) -> Result<Json<Attendance>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_attendances").await?;

    let attendance = sqlx::query_as::<_, Attendance>(
        r#"
        UPDATE attendances
        SET student_id = $1, attendance_date = $2, meal_type = $3, is_present = $4, notes = $5,
            recorded_by = $6, recorded_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(input.student_id)
    .bind(input.attendance_date)
    .bind(input.meal_type)
    .bind(input.is_present)
    .bind(&input.notes)
    .bind(current_user.id)
    .bind(attendance_id)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::NotFound("attendance not found"))?;

    Ok(Json(attendance))
}

pub async fn delete_attendance(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(attendance_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_attendances").await?;

    let result = sqlx::query("DELETE FROM attendances WHERE id = $1")
        .bind(attendance_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("attendance not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
