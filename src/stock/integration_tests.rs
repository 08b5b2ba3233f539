//! End-to-end checks for the ledger and alert engine against a real
//! Postgres. Run with `cargo test -- --ignored` and `DATABASE_URL` pointing
//! at a disposable database; migrations are applied on first connect.

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::database::{create_database_pool, run_migrations, Database};
use crate::error::AppError;
use crate::models::{CreateStockMovement, MovementType};
use crate::stock::{self, alerts, ReconcileOutcome};

async fn test_pool() -> Database {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let db = create_database_pool(&database_url).await.expect("connect");
    run_migrations(&db).await.expect("migrate");
    db
}

async fn seed_user(db: &Database) -> Uuid {
    let suffix = Uuid::new_v4();
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO users (username, email, password_hash, role_id)
        SELECT $1, $2, 'x', r.id FROM roles r WHERE r.name = 'Agent de Saisie'
        RETURNING id
        "#,
    )
    .bind(format!("agent-{suffix}"))
    .bind(format!("agent-{suffix}@test.local"))
    .fetch_one(db)
    .await
    .expect("seed user")
}

async fn seed_ingredient(db: &Database, stock: &str, threshold: &str) -> Uuid {
    sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO ingredients (name, unit, current_stock, critical_threshold)
        VALUES ($1, 'kg', $2::numeric, $3::numeric)
        RETURNING id
        "#,
    )
    .bind(format!("ingredient-{}", Uuid::new_v4()))
    .bind(stock)
    .bind(threshold)
    .fetch_one(db)
    .await
    .expect("seed ingredient")
}

async fn current_stock(db: &Database, ingredient_id: Uuid) -> Decimal {
    sqlx::query_scalar::<_, Decimal>("SELECT current_stock FROM ingredients WHERE id = $1")
        .bind(ingredient_id)
        .fetch_one(db)
        .await
        .expect("read stock")
}

async fn open_alert_count(db: &Database, ingredient_id: Uuid) -> i64 {
    sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM stock_alerts WHERE ingredient_id = $1 AND is_resolved = false",
    )
    .bind(ingredient_id)
    .fetch_one(db)
    .await
    .expect("count alerts")
}

fn movement(ingredient_id: Uuid, movement_type: MovementType, quantity: &str) -> CreateStockMovement {
    CreateStockMovement {
        ingredient_id,
        movement_type,
        quantity: quantity.parse().unwrap(),
        unit_price: None,
        reason: "test".to_string(),
        reference_number: None,
        notes: None,
    }
}

fn dec(value: &str) -> Decimal {
    value.parse().unwrap()
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn out_movement_crossing_threshold_opens_one_alert() {
    let db = test_pool().await;
    let actor = seed_user(&db).await;
    let ingredient = seed_ingredient(&db, "10", "5").await;

    stock::apply_movement(&db, actor, movement(ingredient, MovementType::Out, "6"))
        .await
        .expect("apply OUT 6");

    assert_eq!(current_stock(&db, ingredient).await, dec("4.00"));
    assert_eq!(open_alert_count(&db, ingredient).await, 1);

    let message = sqlx::query_scalar::<_, String>(
        "SELECT message FROM stock_alerts WHERE ingredient_id = $1 AND is_resolved = false",
    )
    .bind(ingredient)
    .fetch_one(&db)
    .await
    .unwrap();
    assert!(message.contains('4'), "message should snapshot the low stock: {message}");
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn restocking_resolves_the_open_alert() {
    let db = test_pool().await;
    let actor = seed_user(&db).await;
    let ingredient = seed_ingredient(&db, "10", "5").await;

    stock::apply_movement(&db, actor, movement(ingredient, MovementType::Out, "6"))
        .await
        .unwrap();
    stock::apply_movement(&db, actor, movement(ingredient, MovementType::In, "10"))
        .await
        .unwrap();

    assert_eq!(current_stock(&db, ingredient).await, dec("14.00"));
    assert_eq!(open_alert_count(&db, ingredient).await, 0);

    let resolved_at = sqlx::query_scalar::<_, Option<chrono::DateTime<chrono::Utc>>>(
        "SELECT resolved_at FROM stock_alerts WHERE ingredient_id = $1 AND is_resolved = true",
    )
    .bind(ingredient)
    .fetch_one(&db)
    .await
    .unwrap();
    assert!(resolved_at.is_some());
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn further_drops_do_not_duplicate_the_alert() {
    let db = test_pool().await;
    let actor = seed_user(&db).await;
    let ingredient = seed_ingredient(&db, "3", "5").await;

    let mut conn = db.acquire().await.unwrap();
    assert_eq!(
        alerts::reconcile(&mut conn, ingredient).await.unwrap(),
        ReconcileOutcome::Opened
    );
    drop(conn);

    let first_message = sqlx::query_scalar::<_, String>(
        "SELECT message FROM stock_alerts WHERE ingredient_id = $1 AND is_resolved = false",
    )
    .bind(ingredient)
    .fetch_one(&db)
    .await
    .unwrap();

    stock::apply_movement(&db, actor, movement(ingredient, MovementType::Out, "1"))
        .await
        .unwrap();

    assert_eq!(current_stock(&db, ingredient).await, dec("2.00"));
    assert_eq!(open_alert_count(&db, ingredient).await, 1);

    // The alert keeps the message from when it was first observed.
    let message = sqlx::query_scalar::<_, String>(
        "SELECT message FROM stock_alerts WHERE ingredient_id = $1 AND is_resolved = false",
    )
    .bind(ingredient)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(message, first_message);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn reconcile_is_idempotent() {
    let db = test_pool().await;
    let ingredient = seed_ingredient(&db, "2", "5").await;

    let mut conn = db.acquire().await.unwrap();
    assert_eq!(
        alerts::reconcile(&mut conn, ingredient).await.unwrap(),
        ReconcileOutcome::Opened
    );
    assert_eq!(
        alerts::reconcile(&mut conn, ingredient).await.unwrap(),
        ReconcileOutcome::Unchanged
    );
    drop(conn);

    assert_eq!(open_alert_count(&db, ingredient).await, 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn sweep_opens_alerts_only_where_missing() {
    let db = test_pool().await;
    let low_without_alert_a = seed_ingredient(&db, "1", "5").await;
    let low_without_alert_b = seed_ingredient(&db, "0", "5").await;
    let low_with_alert = seed_ingredient(&db, "2", "5").await;

    let mut conn = db.acquire().await.unwrap();
    alerts::reconcile(&mut conn, low_with_alert).await.unwrap();
    drop(conn);

    let existing_alert = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM stock_alerts WHERE ingredient_id = $1 AND is_resolved = false",
    )
    .bind(low_with_alert)
    .fetch_one(&db)
    .await
    .unwrap();

    let opened = stock::sweep(&db).await.unwrap();
    assert!(opened >= 2, "sweep should open alerts for the two bare ingredients");

    for ingredient in [low_without_alert_a, low_without_alert_b, low_with_alert] {
        assert_eq!(open_alert_count(&db, ingredient).await, 1);
    }

    // The pre-existing alert survives untouched.
    let still_there = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM stock_alerts WHERE ingredient_id = $1 AND is_resolved = false",
    )
    .bind(low_with_alert)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(still_there, existing_alert);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn resolving_by_injection_lifts_stock_above_threshold() {
    let db = test_pool().await;
    let actor = seed_user(&db).await;
    let ingredient = seed_ingredient(&db, "0", "5").await;

    let mut conn = db.acquire().await.unwrap();
    alerts::reconcile(&mut conn, ingredient).await.unwrap();
    drop(conn);

    let alert_id = sqlx::query_scalar::<_, Uuid>(
        "SELECT id FROM stock_alerts WHERE ingredient_id = $1 AND is_resolved = false",
    )
    .bind(ingredient)
    .fetch_one(&db)
    .await
    .unwrap();

    let resolved = stock::resolve_alert(&db, actor, alert_id).await.unwrap();
    assert!(resolved.is_resolved);
    assert!(resolved.resolved_at.is_some());

    // threshold + 1 injected on top of zero stock
    assert_eq!(current_stock(&db, ingredient).await, dec("6.00"));

    let injections = sqlx::query_as::<_, (Decimal, String)>(
        "SELECT quantity, reason FROM stock_movements WHERE ingredient_id = $1 AND movement_type = 'IN'",
    )
    .bind(ingredient)
    .fetch_all(&db)
    .await
    .unwrap();
    assert_eq!(injections.len(), 1);
    assert_eq!(injections[0].0, dec("6.00"));
    assert_eq!(injections[0].1, alerts::RESOLUTION_REASON);

    assert_eq!(open_alert_count(&db, ingredient).await, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn balances_track_the_sum_of_movements() {
    let db = test_pool().await;
    let actor = seed_user(&db).await;
    let ingredient = seed_ingredient(&db, "20", "1").await;

    for (movement_type, quantity) in [
        (MovementType::In, "10"),
        (MovementType::Out, "3"),
        (MovementType::In, "2.5"),
        (MovementType::Out, "1"),
    ] {
        stock::apply_movement(&db, actor, movement(ingredient, movement_type, quantity))
            .await
            .unwrap();
    }

    // 20 + 10 - 3 + 2.5 - 1
    assert_eq!(current_stock(&db, ingredient).await, dec("28.50"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn invalid_movements_leave_no_trace() {
    let db = test_pool().await;
    let actor = seed_user(&db).await;
    let ingredient = seed_ingredient(&db, "10", "5").await;

    let err = stock::apply_movement(&db, actor, movement(ingredient, MovementType::Out, "0"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));

    let err = stock::apply_movement(&db, actor, movement(Uuid::new_v4(), MovementType::Out, "1"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));

    assert_eq!(current_stock(&db, ingredient).await, dec("10.00"));
    let recorded = sqlx::query_scalar::<_, i64>(
        "SELECT COUNT(*) FROM stock_movements WHERE ingredient_id = $1",
    )
    .bind(ingredient)
    .fetch_one(&db)
    .await
    .unwrap();
    assert_eq!(recorded, 0);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL pointing at a disposable Postgres"]
async fn out_movements_may_drive_stock_negative() {
    let db = test_pool().await;
    let actor = seed_user(&db).await;
    let ingredient = seed_ingredient(&db, "2", "0").await;

    stock::apply_movement(&db, actor, movement(ingredient, MovementType::Out, "5"))
        .await
        .unwrap();

    assert_eq!(current_stock(&db, ingredient).await, dec("-3.00"));
    assert_eq!(open_alert_count(&db, ingredient).await, 1);
}
