use rust_decimal::Decimal;
use sqlx::{FromRow, PgConnection};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{CreateStockMovement, MovementType, StockMovement};

/// Balance columns of an ingredient, read back inside a ledger transaction.
#[derive(Debug, Clone, FromRow)]
pub struct IngredientBalance {
    pub id: Uuid,
    pub name: String,
    pub current_stock: Decimal,
    pub critical_threshold: Decimal,
}

/// Loads the balance row locked `FOR UPDATE`. Holding the lock until commit
/// serializes concurrent writers on the same ingredient, which makes the
/// check-then-insert sequence in the alert engine safe.
pub async fn balance_for_update(
    conn: &mut PgConnection,
    ingredient_id: Uuid,
) -> Result<Option<IngredientBalance>, AppError> {
    let balance = sqlx::query_as::<_, IngredientBalance>(
        "SELECT id, name, current_stock, critical_threshold FROM ingredients WHERE id = $1 FOR UPDATE",
    )
    .bind(ingredient_id)
    .fetch_optional(conn)
    .await?;

    Ok(balance)
}

/// Applies a signed delta to `current_stock`. Negative balances are allowed:
/// an OUT movement larger than the remaining stock goes through and leaves
/// the ledger negative.
pub async fn adjust_stock(
    conn: &mut PgConnection,
    ingredient_id: Uuid,
    delta: Decimal,
) -> Result<(), AppError> {
    sqlx::query("UPDATE ingredients SET current_stock = current_stock + $1, updated_at = NOW() WHERE id = $2")
        .bind(delta)
        .bind(ingredient_id)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn insert_movement(
    conn: &mut PgConnection,
    actor_id: Uuid,
    movement: &CreateStockMovement,
    total_cost: Option<Decimal>,
) -> Result<StockMovement, AppError> {
    let recorded = sqlx::query_as::<_, StockMovement>(
        r#"
        INSERT INTO stock_movements (ingredient_id, movement_type, quantity, unit_price, total_cost, reason, reference_number, notes, created_by)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
        RETURNING *
        "#,
    )
    .bind(movement.ingredient_id)
    .bind(movement.movement_type)
    .bind(movement.quantity)
    .bind(movement.unit_price)
    .bind(total_cost)
    .bind(&movement.reason)
    .bind(&movement.reference_number)
    .bind(&movement.notes)
    .bind(actor_id)
    .fetch_one(conn)
    .await?;

    Ok(recorded)
}

/// Signed balance change for a movement: IN adds, OUT subtracts.
pub fn stock_delta(movement_type: MovementType, quantity: Decimal) -> Decimal {
    match movement_type {
        MovementType::In => quantity,
        MovementType::Out => -quantity,
    }
}

/// `quantity * unit_price` when a price was given, otherwise no cost.
pub fn movement_total_cost(quantity: Decimal, unit_price: Option<Decimal>) -> Option<Decimal> {
    unit_price.map(|price| quantity * price)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn in_movements_add_stock() {
        assert_eq!(stock_delta(MovementType::In, dec("12.50")), dec("12.50"));
    }

    #[test]
    fn out_movements_subtract_stock() {
        assert_eq!(stock_delta(MovementType::Out, dec("6")), dec("-6"));
    }

    #[test]
    fn total_cost_multiplies_quantity_by_price() {
        assert_eq!(movement_total_cost(dec("4"), Some(dec("2.50"))), Some(dec("10.00")));
    }

    #[test]
    fn total_cost_is_absent_without_price() {
        assert_eq!(movement_total_cost(dec("4"), None), None);
    }
}
