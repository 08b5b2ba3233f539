use axum::{extract::State, response::Json};
use sqlx::FromRow;
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    models::{LoginRequest, LoginResponse, UserSummary},
    utils::{create_token, verify_password},
};

#[derive(Debug, FromRow)]
struct AuthRow {
    id: Uuid,
    username: String,
    email: String,
    password_hash: String,
    first_name: Option<String>,
    last_name: Option<String>,
    role_id: Uuid,
    role_name: String,
}

pub async fn login(
    State(db): State<Database>,
    Json(form): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, AppError> {
    let user = sqlx::query_as::<_, AuthRow>(
        r#"
        SELECT u.id, u.username, u.email, u.password_hash, u.first_name, u.last_name, u.role_id,
               r.name AS role_name
        FROM users u
        JOIN roles r ON u.role_id = r.id
        WHERE u.username = $1 AND u.is_active = true
        "#,
    )
    .bind(&form.username)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::InvalidCredentials)?;

    if !verify_password(&form.password, &user.password_hash).unwrap_or(false) {
        return Err(AppError::InvalidCredentials);
    }

    // Update last login
    let _ = sqlx::query("UPDATE users SET last_login = NOW() WHERE id = $1")
        .bind(user.id)
        .execute(&db)
        .await;

    let token = create_token(
        user.id,
        user.username.clone(),
        user.role_id,
        user.role_name.clone(),
    )
    .map_err(|err| AppError::Internal(err.to_string()))?;

    Ok(Json(LoginResponse {
        token,
        user: UserSummary {
            id: user.id,
            username: user.username,
            email: user.email,
            first_name: user.first_name,
            last_name: user.last_name,
            role_name: user.role_name,
        },
    }))
}
