use uuid::Uuid;

use crate::database::Database;
use crate::error::AppError;
use crate::models::{CreateStockMovement, StockMovement};
use crate::stock::{alerts, ledger};

/// Records a stock movement: one transaction inserting the movement row,
/// adjusting the ingredient balance, and reconciling alerts against the new
/// balance. Nothing is observable if any step fails.
pub async fn apply_movement(
    db: &Database,
    actor_id: Uuid,
    movement: CreateStockMovement,
) -> Result<StockMovement, AppError> {
    validate(&movement)?;

    let mut tx = db.begin().await?;

    // Lock the balance row first so concurrent movements on the same
    // ingredient serialize through the whole insert-adjust-reconcile chain.
    let balance = ledger::balance_for_update(&mut tx, movement.ingredient_id)
        .await?
        .ok_or(AppError::NotFound("ingredient not found"))?;

    let total_cost = ledger::movement_total_cost(movement.quantity, movement.unit_price);
    let recorded = ledger::insert_movement(&mut tx, actor_id, &movement, total_cost).await?;

    let delta = ledger::stock_delta(movement.movement_type, movement.quantity);
    ledger::adjust_stock(&mut tx, balance.id, delta).await?;

    alerts::reconcile(&mut tx, balance.id).await?;

    tx.commit().await?;

    tracing::info!(
        movement = %recorded.id,
        ingredient = %balance.id,
        movement_type = ?movement.movement_type,
        quantity = %movement.quantity,
        "stock movement recorded"
    );

    Ok(recorded)
}

fn validate(movement: &CreateStockMovement) -> Result<(), AppError> {
    if movement.quantity.is_sign_negative() || movement.quantity.is_zero() {
        return Err(AppError::Validation(
            "movement quantity must be greater than zero".to_string(),
        ));
    }
    if movement.reason.trim().is_empty() {
        return Err(AppError::Validation("movement reason is required".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MovementType;
    use rust_decimal::Decimal;

    fn movement(quantity: &str, reason: &str) -> CreateStockMovement {
        CreateStockMovement {
            ingredient_id: Uuid::new_v4(),
            movement_type: MovementType::Out,
            quantity: quantity.parse::<Decimal>().unwrap(),
            unit_price: None,
            reason: reason.to_string(),
            reference_number: None,
            notes: None,
        }
    }

    #[test]
    fn rejects_zero_quantity() {
        assert!(validate(&movement("0", "service déjeuner")).is_err());
    }

    #[test]
    fn rejects_negative_quantity() {
        assert!(validate(&movement("-2.5", "service déjeuner")).is_err());
    }

    #[test]
    fn rejects_blank_reason() {
        assert!(validate(&movement("3", "  ")).is_err());
    }

    #[test]
    fn accepts_a_positive_movement() {
        assert!(validate(&movement("3.25", "livraison")).is_ok());
    }
}
