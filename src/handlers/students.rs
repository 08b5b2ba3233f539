use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    middleware::{get_current_user, require_permission},
    models::{AllergenProfileDisplay, AllergenProfileInput, Student, StudentInput},
};

pub async fn list_students(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<Student>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_students").await?;

    let students = sqlx::query_as::<_, Student>(
        "SELECT * FROM students WHERE is_active = true ORDER BY last_name, first_name",
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(students))
}

pub async fn create_student(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<StudentInput>,
) -> Result<(StatusCode, Json<Student>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_students").await?;

    let student = sqlx::query_as::<_, Student>(
        r#"
        INSERT INTO students (first_name, last_name, date_of_birth, gender, grade, class_name, parent_name, parent_phone, address, emergency_contact, emergency_phone, dietary_restrictions, allergies)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        RETURNING *
        "#,
    )
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(input.date_of_birth)
    .bind(&input.gender)
    .bind(&input.grade)
    .bind(&input.class_name)
    .bind(&input.parent_name)
    .bind(&input.parent_phone)
    .bind(&input.address)
    .bind(&input.emergency_contact)
    .bind(&input.emergency_phone)
    .bind(&input.dietary_restrictions)
    .bind(&input.allergies)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(student)))
}

pub async fn update_student(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(student_id): Path<Uuid>,
    Json(input): Json<StudentInput>,
) -> Result<Json<Student>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_students").await?;

    let student = sqlx::query_as::<_, Student>(
        r#"
        UPDATE students
        SET first_name = $1, last_name = $2, date_of_birth = $3, gender = $4, grade = $5, class_name = $6,
            parent_name = $7, parent_phone = $8, address = $9, emergency_contact = $10, emergency_phone = $11,
            dietary_restrictions = $12, allergies = $13, updated_at = NOW()
        WHERE id = $14
        RETURNING *
        "#,
    )
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(input.date_of_birth)
    .bind(&input.gender)
    .bind(&input.grade)
    .bind(&input.class_name)
    .bind(&input.parent_name)
    .bind(&input.parent_phone)
    .bind(&input.address)
    .bind(&input.emergency_contact)
    .bind(&input.emergency_phone)
    .bind(&input.dietary_restrictions)
    .bind(&input.allergies)
    .bind(student_id)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::NotFound("student not found"))?;

    Ok(Json(student))
}

pub async fn delete_student(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(student_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_students").await?;

    let result = sqlx::query(
        "UPDATE students SET is_active = false, updated_at = NOW() WHERE id = $1",
    )
    .bind(student_id)
    .execute(&db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("student not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_allergen_profiles(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<AllergenProfileDisplay>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_students").await?;

    let profiles = sqlx::query_as::<_, AllergenProfileDisplay>(
        r#"
        SELECT ap.*, s.first_name, s.last_name
        FROM allergen_profiles ap
        JOIN students s ON ap.student_id = s.id
        WHERE ap.is_active = true
        ORDER BY s.last_name, s.first_name
        "#,
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(profiles))
}

/// One profile per student; resubmitting replaces the existing one.
pub async fn upsert_allergen_profile(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<AllergenProfileInput>,
) -> Result<(StatusCode, Json<AllergenProfileDisplay>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_students").await?;

    let profile = sqlx::query_as::<_, AllergenProfileDisplay>(
        r#"
        WITH upserted AS (
            INSERT INTO allergen_profiles (student_id, allergies, dietary_restrictions, severity, emergency_contact)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (student_id) DO UPDATE SET
                allergies = EXCLUDED.allergies,
                dietary_restrictions = EXCLUDED.dietary_restrictions,
                severity = EXCLUDED.severity,
                emergency_contact = EXCLUDED.emergency_contact,
                updated_at = NOW()
            RETURNING *
        )
        SELECT up.*, s.first_name, s.last_name
        FROM upserted up
        JOIN students s ON up.student_id = s.id
        "#,
    )
    .bind(input.student_id)
    .bind(input.allergies.map(sqlx::types::Json))
    .bind(input.dietary_restrictions.map(sqlx::types::Json))
    .bind(input.severity.as_deref().unwrap_or("mild"))
    .bind(&input.emergency_contact)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(profile)))
}
