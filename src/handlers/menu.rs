use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::Json,
};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::{
    database::Database,
    error::AppError,
    middleware::{get_current_user, require_permission},
    models::{
        MenuPlan, MenuPlanDisplay, MenuPlanInput, Recipe, RecipeDisplay, RecipeInput, Supplier,
        SupplierInput, SupplierOrder, SupplierOrderDisplay, SupplierOrderInput,
    },
};

// ---- Recipes ----

pub async fn list_recipes(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<RecipeDisplay>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_ingredients").await?;

    let recipes = sqlx::query_as::<_, RecipeDisplay>(
        r#"
        SELECT r.*, u.username AS created_by_name
        FROM recipes r
        LEFT JOIN users u ON r.created_by = u.id
        WHERE r.is_active = true
        ORDER BY r.created_at DESC
        "#,
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(recipes))
}

pub async fn create_recipe(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<RecipeInput>,
) -> Result<(StatusCode, Json<Recipe>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_ingredients").await?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        INSERT INTO recipes (name, description, instructions, prep_time, cook_time, servings, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.instructions)
    .bind(input.prep_time)
    .bind(input.cook_time)
    .bind(input.servings)
    .bind(current_user.id)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(recipe)))
}

pub async fn update_recipe(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(recipe_id): Path<Uuid>,
    Json(input): Json<RecipeInput>,
) -> Result<Json<Recipe>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_ingredients").await?;

    let recipe = sqlx::query_as::<_, Recipe>(
        r#"
        UPDATE recipes
        SET name = $1, description = $2, instructions = $3, prep_time = $4, cook_time = $5,
            servings = $6, updated_at = NOW()
        WHERE id = $7
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.description)
    .bind(&input.instructions)
    .bind(input.prep_time)
    .bind(input.cook_time)
    .bind(input.servings)
    .bind(recipe_id)
    .fetch_optional(&db)
    .await?
    .ok_or(AppError::NotFound("recipe not found"))?;

    Ok(Json(recipe))
}

pub async fn delete_recipe(
    State(db): State<Database>,
    headers: HeaderMap,
    Path(recipe_id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_ingredients").await?;

    let result = sqlx::query(
        "UPDATE recipes SET is_active = false, updated_at = NOW() WHERE id = $1",
    )
    .bind(recipe_id)
    .execute(&db)
    .await?;

    if result.rows_affected() == 0 {
        return Err(AppError::NotFound("recipe not found"));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ---- Suppliers ----

pub async fn list_suppliers(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<Supplier>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_ingredients").await?;

    let suppliers = sqlx::query_as::<_, Supplier>(
        "SELECT * FROM suppliers WHERE is_active = true ORDER BY name",
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(suppliers))
}

pub async fn create_supplier(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<SupplierInput>,
) -> Result<(StatusCode, Json<Supplier>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_ingredients").await?;

    let supplier = sqlx::query_as::<_, Supplier>(
        r#"
        INSERT INTO suppliers (name, category, contact_phone, contact_email, address, rating, delivery_time)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(&input.name)
    .bind(&input.category)
    .bind(&input.contact_phone)
    .bind(&input.contact_email)
    .bind(&input.address)
    .bind(input.rating.unwrap_or_default())
    .bind(&input.delivery_time)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(supplier)))
}

// ---- Supplier orders ----

pub async fn list_orders(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<SupplierOrderDisplay>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_ingredients").await?;

    let orders = sqlx::query_as::<_, SupplierOrderDisplay>(
        r#"
        SELECT o.*, s.name AS supplier_name, u.username AS created_by_name
        FROM orders o
        LEFT JOIN suppliers s ON o.supplier_id = s.id
        LEFT JOIN users u ON o.created_by = u.id
        ORDER BY o.created_at DESC
        "#,
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(orders))
}

pub async fn create_order(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<SupplierOrderInput>,
) -> Result<(StatusCode, Json<SupplierOrder>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_ingredients").await?;

    let total_amount: Decimal = input
        .items
        .iter()
        .map(|item| item.quantity * item.price)
        .sum();

    let order = sqlx::query_as::<_, SupplierOrder>(
        r#"
        INSERT INTO orders (supplier_id, delivery_date, priority, notes, total_amount, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(input.supplier_id)
    .bind(input.delivery_date)
    .bind(input.priority.as_deref().unwrap_or("normal"))
    .bind(&input.notes)
    .bind(total_amount)
    .bind(current_user.id)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(order)))
}

// ---- Menu plans ----

pub async fn list_menu_plans(
    State(db): State<Database>,
    headers: HeaderMap,
) -> Result<Json<Vec<MenuPlanDisplay>>, AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "view_ingredients").await?;

    let plans = sqlx::query_as::<_, MenuPlanDisplay>(
        r#"
        SELECT mp.*, r.name AS recipe_name, u.username AS created_by_name
        FROM menu_plans mp
        LEFT JOIN recipes r ON mp.recipe_id = r.id
        LEFT JOIN users u ON mp.created_by = u.id
        ORDER BY mp.planned_date DESC, mp.meal_type
        "#,
    )
    .fetch_all(&db)
    .await?;

    Ok(Json(plans))
}

pub async fn create_menu_plan(
    State(db): State<Database>,
    headers: HeaderMap,
    Json(input): Json<MenuPlanInput>,
) -> Result<(StatusCode, Json<MenuPlan>), AppError> {
    let current_user = get_current_user(&headers)?;
    require_permission(&db, &current_user, "manage_ingredients").await?;

    let plan = sqlx::query_as::<_, MenuPlan>(
        r#"
        INSERT INTO menu_plans (planned_date, meal_type, recipe_id, estimated_portions, cost_per_portion, created_by)
        VALUES ($1, $2, $3, $4, $5, $6)
        RETURNING *
        "#,
    )
    .bind(input.planned_date)
    .bind(input.meal_type)
    .bind(input.recipe_id)
    .bind(input.estimated_portions)
    .bind(input.cost_per_portion)
    .bind(current_user.id)
    .fetch_one(&db)
    .await?;

    Ok((StatusCode::CREATED, Json(plan)))
}
