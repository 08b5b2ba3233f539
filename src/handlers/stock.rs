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
    models::{CreateStockMovement, StockAlert, StockAlertDisplay, StockMovement, StockMovementDisplay},
    stock,
};

pub async fn list_movements(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<StockMovementDisplay>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_stock_movements").await?;

    let movements = sqlx::query_as::<_, StockMovementDisplay>(
        r#"
        SELECT sm.*, i.name AS ingredient_name, i.unit, u.username AS created_by_name
        FROM stock_movements sm
        JOIN ingredients i ON sm.ingredient_id = i.id
        JOIN users u ON sm.created_by = u.id
        ORDER BY sm.created_at DESC
        LIMIT 100
        "#,
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(movements))
}

pub async fn create_movement(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(movement): Json<CreateStockMovement>,
) -> Result<(StatusCode, Json<StockMovement>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_stock_movements").await?;

    let recorded = stock::apply_movement(&db, current_user.id, movement).await?;

    Ok((StatusCode::CREATED, Json(recorded)))
}

pub async fn list_alerts(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<StockAlertDisplay>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_stock_movements").await?;

    let alerts = sqlx::query_as::<_, StockAlertDisplay>(
        r#"
        SELECT sa.*, i.name AS ingredient_name, i.unit, i.current_stock, i.critical_threshold
        FROM stock_alerts sa
        JOIN ingredients i ON sa.ingredient_id = i.id
        WHERE sa.is_resolved = false
        ORDER BY sa.created_at DESC
        "#,
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(alerts))
}

pub async fn resolve_alert(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(alert_id): Path<Uuid>,
) -> Result<Json<StockAlert>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_stock_movements").await?;

    let resolved = stock::resolve_alert(&db, current_user.id, alert_id).await?;

    Ok(Json(resolved))
}

/// Manual trigger for the reconciliation sweep normally run at startup.
pub async fn check_alerts(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Value>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_stock_movements").await?;

    let opened = stock::sweep(&db).await?;

    Ok(Json(json!({ "opened": opened })))
}
