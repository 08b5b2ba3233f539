use uuid::Uuid;

use crate::database::Database;
use crate::error::AppError;
use crate::stock::{alerts, ledger};

/// Full-table reconciliation pass: opens a `low_stock` alert for every active
/// ingredient at or below its threshold that doesn't already have one. Each
/// ingredient runs in its own transaction, so one failure doesn't abort the
/// rest of the pass. Returns the number of alerts opened.
///
/// Runs once at startup and on demand via the alert-check endpoint.
pub async fn sweep(db: &Database) -> Result<u64, AppError> {
    let low_ingredients = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM ingredients WHERE is_active = true AND current_stock <= critical_threshold",
    )
    .fetch_all(db)
    .await?;

    let mut opened = 0;
    for ingredient_id in low_ingredients {
        match open_if_still_low(db, ingredient_id).await {
            Ok(true) => opened += 1,
            Ok(false) => {}
            Err(err) => {
                tracing::warn!(ingredient = %ingredient_id, error = %err, "sweep: alert check failed");
            }
        }
    }

    tracing::info!(opened, "stock alert sweep finished");
    Ok(opened)
}

/// Re-reads the balance under lock before inserting: the ingredient may have
/// been restocked between the scan and this sub-transaction.
async fn open_if_still_low(db: &Database, ingredient_id: Uuid) -> Result<bool, AppError> {
    let mut tx = db.begin().await?;

    let Some(balance) = ledger::balance_for_update(&mut tx, ingredient_id).await? else {
        return Ok(false);
    };

    let opened = if balance.current_stock <= balance.critical_threshold {
        alerts::open_alert_if_absent(&mut tx, &balance).await?
    } else {
        false
    };

    tx.commit().await?;
    Ok(opened)
}
