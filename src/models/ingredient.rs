use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;

/// Ledger side of an ingredient: `current_stock` is mutated only by the
/// movement processor, the edit endpoint, and alert resolution, each inside
/// its own transaction. Ingredients are never deleted, only deactivated.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub current_stock: Decimal,
    pub critical_threshold: Decimal,
    pub unit_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub expiry_date: Option<NaiveDate>,
    pub is_active: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body shared by the create and update endpoints.
#[derive(Debug, Deserialize)]
pub struct IngredientInput {
    pub name: String,
    pub description: Option<String>,
    pub unit: String,
    pub current_stock: Option<Decimal>,
    pub critical_threshold: Decimal,
    pub unit_price: Option<Decimal>,
    pub supplier: Option<String>,
    pub expiry_date: Option<NaiveDate>,
}
