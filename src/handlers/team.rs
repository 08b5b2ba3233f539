use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    middleware::{get_current_user, require_permission},
    models::{
        AssignPermission, CreateUser, Permission, Role, RoleInput, RolePermissionView, UpdateUser,
        UserDisplay,
    },
    utils::hash_password,
};

// ---- Users ----

pub async fn list_users(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<UserDisplay>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_users").await?;

    let users = sqlx::query_as::<_, UserDisplay>(
        r#"
        SELECT u.id, u.username, u.email, u.first_name, u.last_name,
               u.is_active, u.last_login, u.created_at, r.name AS role_name
        FROM users u
        JOIN roles r ON u.role_id = r.id
        ORDER BY u.created_at DESC
        "#,
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(users))
}

pub async fn create_user(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<CreateUser>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_users").await?;

    let password_hash = hash_password(&input.password)
        .map_err(|err| AppError::Internal(err.to_string()))?;

    let user_id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (username, email, password_hash, first_name, last_name, role_id)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING id
        "#,
    )
    .bind(&input.username)
    .bind(&input.email)
    .bind(&password_hash)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(input.role_id)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(json!({ "id": user_id }))))
}

pub async fn update_user(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Json(input): Json<UpdateUser>,
) -> Result<Json<UserDisplay>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_users").await?;

    let user = sqlx::query_as::<_, UserDisplay>(
        r#"
        WITH updated AS (
            UPDATE users
            SET username = $1, email = $2, first_name = $3, last_name = $4, role_id = $5,
                is_active = $6, updated_at = NOW()
            WHERE id = $7
            RETURNING *
        )
        SELECT u.id, u.username, u.email, u.first_name, u.last_name,
               u.is_active, u.last_login, u.created_at, r.name AS role_name
        FROM updated u
        JOIN roles r ON u.role_id = r.id
        "#,
    )
    .bind(&input.username)
    .bind(&input.email)
    .bind(&input.first_name)
    .bind(&input.last_name)
    .bind(input.role_id)
    .bind(input.is_active)
    .bind(user_id)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::NotFound("user not found"))?;

    Ok(Json(user))
}

pub async fn delete_user(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_users").await?;

    let result = sqlx::query(
        "UPDATE users SET is_active = false, updated_at = NOW() WHERE id = $1",
    )
    .bind(user_id)
    .execute(&db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("user not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---- Roles ----

pub async fn list_roles(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<Role>>, AppError> {
    get_current_user(&headers)?;

    let roles = sqlx::query_as::<_, Role>("SELECT id, name FROM roles ORDER BY name")
        .fetch_all(&db)
        .await?;

    Ok(Json(roles))
}

pub async fn create_role(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<RoleInput>,
) -> Result<(StatusCode, Json<Role>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_users").await?;

    let role = sqlx::query_as::<_, Role>("INSERT INTO roles (name) VALUES ($1) RETURNING id, name")
        .bind(&input.name)
        .fetch_one(&db)
        .await?;

    Ok((StatusCode::CREATED, Json(role)))
}

pub async fn update_role(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(role_id): Path<Uuid>,
    Json(input): Json<RoleInput>,
) -> Result<Json<Role>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_users").await?;

    let role = sqlx::query_as::<_, Role>(
        "UPDATE roles SET name = $1 WHERE id = $2 RETURNING id, name",
    )
    .bind(&input.name)
    .bind(role_id)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::NotFound("role not found"))?;

    Ok(Json(role))
}

pub async fn delete_role(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(role_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_users").await?;

    let result = sqlx::query("DELETE FROM roles WHERE id = $1")
        .bind(role_id)
        .execute(&db)
        .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("role not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---- Permissions ----

pub async fn list_permissions(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<Permission>>, AppError> {
    get_current_user(&headers)?;

    let permissions = sqlx::query_as::<_, Permission>(
        "SELECT id, name, description FROM permissions ORDER BY name",
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(permissions))
}

pub async fn list_role_permissions(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(role_id): Path<Uuid>,
) -> Result<Json<Vec<RolePermissionView>>, AppError> {
    get_current_user(&headers)?;

    let permissions = sqlx::query_as::<_, RolePermissionView>(
        r#"
        SELECT p.id, p.name, p.description, rp.role_id IS NOT NULL AS assigned
        FROM permissions p
        LEFT JOIN role_permissions rp ON p.id = rp.permission_id AND rp.role_id = $1
        ORDER BY p.name
        "#,
    )
    .bind(role_id)
    .fetch_all(&db)
    .await?;

    Ok(Json(permissions))
}

pub async fn assign_permission(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<AssignPermission>,
) -> Result<StatusCode, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_users").await?;

    sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES ($1, $2)")
        .bind(input.role_id)
        .bind(input.permission_id)
        .execute(&db)
        .await?;

    Ok(StatusCode::CREATED)
}

pub async fn unassign_permission(
    State(db): State<Database>,
    headers: HeaderMap,
    Path((role_id, permission_id)): Path<(Uuid, Uuid)>,
) -> Result<StatusCode, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_users").await?;

    sqlx::query("DELETE FROM role_permissions WHERE role_id = $1 AND permission_id = $2")
        .bind(role_id)
        .bind(permission_id)
        .execute(&db)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
