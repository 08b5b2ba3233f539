use rust_decimal::Decimal;
use sqlx::PgConnection;
use uuid::Uuid;

use crate::database::Database;
use crate::error::AppError;
use crate::models::{AlertType, CreateStockMovement, MovementType, StockAlert};
use crate::stock::ledger::{self, IngredientBalance};

/// Reason recorded on the synthetic movement created by manual alert
/// resolution.
pub const RESOLUTION_REASON: &str = "Résolution d'alerte de stock";

/// What a reconciliation pass decided to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Opened,
    Resolved,
    Unchanged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum AlertAction {
    Open,
    Resolve,
    Nothing,
}

/// The one reconciliation rule, shared by the movement processor, the
/// ingredient edit path, and the sweep. The threshold is an inclusive lower
/// bound: stock exactly at the threshold counts as low.
fn alert_action(
    current_stock: Decimal,
    critical_threshold: Decimal,
    has_open_alert: bool,
) -> AlertAction {
    if current_stock <= critical_threshold {
        if has_open_alert {
            // The existing alert keeps its message as first observed.
            AlertAction::Nothing
        } else {
            AlertAction::Open
        }
    } else if has_open_alert {
        AlertAction::Resolve
    } else {
        AlertAction::Nothing
    }
}

fn low_stock_message(name: &str, current_stock: Decimal) -> String {
    format!("Stock faible pour {name}: {current_stock} restant")
}

async fn find_open_alert(
    conn: &mut PgConnection,
    ingredient_id: Uuid,
) -> Result<Option<Uuid>, AppError> {
    let id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM stock_alerts WHERE ingredient_id = $1 AND alert_type = $2 AND is_resolved = false",
    )
    .bind(ingredient_id)
    .bind(AlertType::LowStock)
    .fetch_optional(conn)
    .await?;

    Ok(id)
}

async fn insert_low_stock_alert(
    conn: &mut PgConnection,
    balance: &IngredientBalance,
) -> Result<(), AppError> {
    sqlx::query("INSERT INTO stock_alerts (ingredient_id, alert_type, message) VALUES ($1, $2, $3)")
        .bind(balance.id)
        .bind(AlertType::LowStock)
        .bind(low_stock_message(&balance.name, balance.current_stock))
        .execute(conn)
        .await?;

    Ok(())
}

async fn resolve_open_alerts(
    conn: &mut PgConnection,
    ingredient_id: Uuid,
) -> Result<u64, AppError> {
    let result = sqlx::query(
        "UPDATE stock_alerts SET is_resolved = true, resolved_at = NOW() WHERE ingredient_id = $1 AND alert_type = $2 AND is_resolved = false",
    )
    .bind(ingredient_id)
    .bind(AlertType::LowStock)
    .execute(conn)
    .await?;

    Ok(result.rows_affected())
}

/// Opens a `low_stock` alert unless one is already open. Returns whether a
/// row was inserted. The caller must hold the ingredient row lock.
pub(crate) async fn open_alert_if_absent(
    conn: &mut PgConnection,
    balance: &IngredientBalance,
) -> Result<bool, AppError> {
    if find_open_alert(conn, balance.id).await?.is_some() {
        return Ok(false);
    }
    insert_low_stock_alert(conn, balance).await?;
    Ok(true)
}

/// Brings `stock_alerts` in line with the ingredient's current balance.
/// Idempotent: a second call with no intervening stock change is a no-op.
/// Locks the ingredient row for the rest of the transaction, so two
/// concurrent reconciliations for the same ingredient cannot both pass the
/// open-alert check.
pub async fn reconcile(
    conn: &mut PgConnection,
    ingredient_id: Uuid,
) -> Result<ReconcileOutcome, AppError> {
    let balance = ledger::balance_for_update(conn, ingredient_id)
        .await?
        .ok_or(AppError::NotFound("ingredient not found"))?;

    reconcile_balance(conn, &balance).await
}

pub(crate) async fn reconcile_balance(
    conn: &mut PgConnection,
    balance: &IngredientBalance,
) -> Result<ReconcileOutcome, AppError> {
    let has_open_alert = find_open_alert(conn, balance.id).await?.is_some();

    let outcome = match alert_action(balance.current_stock, balance.critical_threshold, has_open_alert) {
        AlertAction::Open => {
            insert_low_stock_alert(conn, balance).await?;
            ReconcileOutcome::Opened
        }
        AlertAction::Resolve => {
            resolve_open_alerts(conn, balance.id).await?;
            ReconcileOutcome::Resolved
        }
        AlertAction::Nothing => ReconcileOutcome::Unchanged,
    };

    tracing::debug!(
        ingredient = %balance.id,
        stock = %balance.current_stock,
        threshold = %balance.critical_threshold,
        ?outcome,
        "stock reconciled"
    );

    Ok(outcome)
}

/// Manual resolution by stock injection: raises the balance to
/// `critical_threshold + 1`, above the threshold by construction, records the
/// injection as a synthetic IN movement, and marks the alert resolved. One
/// transaction; a missing alert or ingredient leaves the store untouched.
pub async fn resolve_alert(
    db: &Database,
    actor_id: Uuid,
    alert_id: Uuid,
) -> Result<StockAlert, AppError> {
    let mut tx = db.begin().await?;

    let alert = sqlx::query_as::<_, StockAlert>("SELECT * FROM stock_alerts WHERE id = $1 FOR UPDATE")
        .bind(alert_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or(AppError::NotFound("alert not found"))?;

    let balance = ledger::balance_for_update(&mut tx, alert.ingredient_id)
        .await?
        .ok_or(AppError::NotFound("ingredient not found"))?;

    let quantity_added = balance.critical_threshold + Decimal::ONE;
    ledger::adjust_stock(&mut tx, balance.id, quantity_added).await?;

    let injection = CreateStockMovement {
        ingredient_id: balance.id,
        movement_type: MovementType::In,
        quantity: quantity_added,
        unit_price: None,
        reason: RESOLUTION_REASON.to_string(),
        reference_number: None,
        notes: None,
    };
    ledger::insert_movement(&mut tx, actor_id, &injection, None).await?;

    let resolved = sqlx::query_as::<_, StockAlert>(
        "UPDATE stock_alerts SET is_resolved = true, resolved_at = NOW() WHERE id = $1 RETURNING *",
    )
    .bind(alert_id)
    .fetch_one(&mut *tx)
    .await?;

    tx.commit().await?;

    tracing::info!(
        alert = %alert_id,
        ingredient = %balance.id,
        %quantity_added,
        "alert resolved by stock injection"
    );

    Ok(resolved)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(value: &str) -> Decimal {
        value.parse().unwrap()
    }

    #[test]
    fn stock_below_threshold_opens_an_alert() {
        assert_eq!(alert_action(dec("4"), dec("5"), false), AlertAction::Open);
    }

    #[test]
    fn stock_at_threshold_counts_as_low() {
        assert_eq!(alert_action(dec("5"), dec("5"), false), AlertAction::Open);
    }

    #[test]
    fn existing_open_alert_is_left_untouched() {
        assert_eq!(alert_action(dec("2"), dec("5"), true), AlertAction::Nothing);
    }

    #[test]
    fn stock_above_threshold_resolves_the_open_alert() {
        assert_eq!(alert_action(dec("14"), dec("5"), true), AlertAction::Resolve);
    }

    #[test]
    fn healthy_stock_without_alert_is_a_noop() {
        assert_eq!(alert_action(dec("14"), dec("5"), false), AlertAction::Nothing);
    }

    #[test]
    fn negative_stock_still_opens_an_alert() {
        assert_eq!(alert_action(dec("-3"), dec("0"), false), AlertAction::Open);
    }

    #[test]
    fn message_snapshots_the_observed_stock() {
        let message = low_stock_message("Riz", dec("4.00"));
        assert_eq!(message, "Stock faible pour Riz: 4.00 restant");
        assert!(message.contains('4'));
    }
}
