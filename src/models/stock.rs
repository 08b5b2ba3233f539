use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "movement_type", rename_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementType {
    In,
    Out,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "alert_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    LowStock,
    Expired,
    ExpiringSoon,
}

/// Immutable ledger fact. Rows are appended by the movement processor and by
/// alert resolution, and never updated or deleted afterwards.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct StockMovement {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub reason: String,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
pub struct CreateStockMovement {
    pub ingredient_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub reason: String,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
}

/// Movement list row, joined with ingredient and recorder names.
#[derive(Debug, Serialize, FromRow)]
pub struct StockMovementDisplay {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub movement_type: MovementType,
    pub quantity: Decimal,
    pub unit_price: Option<Decimal>,
    pub total_cost: Option<Decimal>,
    pub reason: String,
    pub reference_number: Option<String>,
    pub notes: Option<String>,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub ingredient_name: String,
    pub unit: String,
    pub created_by_name: String,
}

/// Derived alert state. At most one row per (ingredient, alert type) may be
/// unresolved at any time; the partial unique index in the schema backs this.
#[derive(Debug, Serialize, Deserialize, FromRow)]
pub struct StockAlert {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// Open-alert list row, joined with the live ingredient figures.
#[derive(Debug, Serialize, FromRow)]
pub struct StockAlertDisplay {
    pub id: Uuid,
    pub ingredient_id: Uuid,
    pub alert_type: AlertType,
    pub message: String,
    pub is_resolved: bool,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub ingredient_name: String,
    pub unit: String,
    pub current_stock: Decimal,
    pub critical_threshold: Decimal,
}
