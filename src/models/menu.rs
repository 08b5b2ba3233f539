use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

use crate::models::MealType;

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct RecipeDisplay {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub is_active: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub created_by_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RecipeInput {
    pub name: String,
    pub description: Option<String>,
    pub instructions: Option<String>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub category: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub rating: Decimal,
    pub delivery_time: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct SupplierInput {
    pub name: String,
    pub category: Option<String>,
    pub contact_phone: Option<String>,
    pub contact_email: Option<String>,
    pub address: Option<String>,
    pub rating: Option<Decimal>,
    pub delivery_time: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct SupplierOrder {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub delivery_date: Option<NaiveDate>,
    pub priority: String,
    pub notes: Option<String>,
    pub total_amount: Option<Decimal>,
    pub status: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct SupplierOrderDisplay {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub delivery_date: Option<NaiveDate>,
    pub priority: String,
    pub notes: Option<String>,
    pub total_amount: Option<Decimal>,
    pub status: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub supplier_name: Option<String>,
    pub created_by_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct OrderItemInput {
    pub quantity: Decimal,
    pub price: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct SupplierOrderInput {
    pub supplier_id: Uuid,
    pub delivery_date: Option<NaiveDate>,
    pub priority: Option<String>,
    pub notes: Option<String>,
    pub items: Vec<OrderItemInput>,
}

#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct MenuPlan {
    pub id: Uuid,
    pub planned_date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_id: Option<Uuid>,
    pub estimated_portions: Option<i32>,
    pub cost_per_portion: Option<Decimal>,
    pub status: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, FromRow)]
pub struct MenuPlanDisplay {
    pub id: Uuid,
    pub planned_date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_id: Option<Uuid>,
    pub estimated_portions: Option<i32>,
    pub cost_per_portion: Option<Decimal>,
    pub status: String,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub recipe_name: Option<String>,
    pub created_by_name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct MenuPlanInput {
    pub planned_date: NaiveDate,
    pub meal_type: MealType,
    pub recipe_id: Option<Uuid>,
    pub estimated_portions: Option<i32>,
    pub cost_per_portion: Option<Decimal>,
}
