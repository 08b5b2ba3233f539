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
    models::{Ingredient, IngredientInput},
    stock,
};

pub async fn list_ingredients(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<Ingredient>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_ingredients").await?;

    let ingredients = sqlx::query_as::<_, Ingredient>(
        "SELECT * FROM ingredients WHERE is_active = true ORDER BY name",
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(ingredients))
}

pub async fn create_ingredient(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<IngredientInput>,
) -> Result<(StatusCode, Json<Ingredient>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_ingredients").await?;

    let mut tx = db.begin().await?;

    let ingredient = sqlx::query_as::<_, Ingredient>(
        r#"
        INSERT INTO ingredients (name, description, unit, current_stock, critical_threshold, unit_price, supplier, expiry_date, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.unit)
    .bind(input.current_stock.unwrap_or_default())
    .bind(input.critical_threshold)
    .bind(input.unit_price)
    .bind(&input.supplier)
    .bind(input.expiry_date)
    .bind(current_user.id)
    .fetch_one(&mut *tx)
    .await?;

    // A new ingredient can already start below its threshold.
    stock::reconcile(&mut tx, ingredient.id).await?;

    tx.commit().await?;

    Ok((StatusCode::CREATED, Json(ingredient)))
}

pub async fn update_ingredient(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<IngredientInput>,
) -> Result<Json<Ingredient>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_ingredients").await?;

    let mut tx = db.begin().await?;

    let ingredient = sqlx::query_as::<_, Ingredient>(
        r#"
        UPDATE ingredients
        SET name = $1, description = $2, unit = $3, current_stock = $4, critical_threshold = $5,
            unit_price = $6, supplier = $7, expiry_date = $8, updated_at = NOW()
        WHERE id = $9
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.unit)
    .bind(input.current_stock.unwrap_or_default())
    .bind(input.critical_threshold)
    .bind(input.unit_price)
    .bind(&input.supplier)
    .bind(input.expiry_date)
    .bind(ingredient_id)
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(AppError::NotFound("ingredient not found"))?;

    // Same reconcile rule as the movement processor: editing stock or
    // threshold can open or resolve an alert.
    stock::reconcile(&mut tx, ingredient_id).await?;

    tx.commit().await?;

    Ok(Json(ingredient))
}

pub async fn delete_ingredient(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(ingredient_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_ingredients").await?;

    let result = sqlx::query(
        "UPDATE ingredients SET is_active = false, updated_at = NOW() WHERE id = $1",
    )
    .bind(ingredient_id)
    .execute(&db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("ingredient not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}
