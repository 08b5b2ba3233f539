use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    utils::verify_token,
};

/// Actor identity carried by every authenticated request. The claims are
/// trusted as issued; only the permission lookup goes back to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub username: String,
    pub role_id: Uuid,
    pub role_name: String,
}

pub fn get_current_user(headers: &HeaderMap) -> Result<CurrentUser, AppError> {
    // Try to get the bearer token from the Authorization header
    let token = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .ok_or(AppError::Unauthorized)?;

    let claims = verify_token(token).map_err(|_| AppError::Unauthorized)?;

    let user_id = Uuid::parse_str(&claims.sub).map_err(|_| AppError::Unauthorized)?;

    Ok(CurrentUser {
        id: user_id,
        username: claims.username,
        role_id: claims.role_id,
        role_name: claims.role_name,
    })
}

/// Checks the user's role against the named permission via the
/// role_permissions join.
pub async fn require_permission(
    db: &Database,
    user: &CurrentUser,
    permission: &str,
) -> Result<(), AppError> {
    let allowed = sqlx::query_scalar::<_, i64>(
        r#"
        SELECT COUNT(*)
        FROM permissions p
        JOIN role_permissions rp ON p.id = rp.permission_id
        WHERE rp.role_id = $1 AND p.name = $2
        "#,
    )
    .bind(user.role_id)
    .bind(permission)
    .fetch_one(db)
    .await?;

    if allowed == 0 {
        return Err(AppError::Forbidden);
    }
    Ok(())
}
