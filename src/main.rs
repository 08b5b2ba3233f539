mod database;
mod error;
mod handlers;
mod middleware;
mod models;
mod stock;
mod utils;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use std::env;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use dotenvy::dotenv;
use tracing_subscriber::EnvFilter;

use database::{create_database_pool, run_migrations, Database};

#[tokio::main]
async fn main() {
    // Load environment variables
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("cantine=debug,tower_http=info")))
        .init();

    // Initialize database
    let database_url = env::var("DATABASE_URL")
        .expect("DATABASE_URL must be set");

    let db = create_database_pool(&database_url).await
        .expect("Failed to connect to database");

    run_migrations(&db).await
        .expect("Failed to run database migrations");

    tracing::info!("database connection successful");

    // Reconcile stock alerts for anything already below threshold. A failed
    // sweep is logged but doesn't prevent startup.
    if let Err(err) = stock::sweep(&db).await {
        tracing::error!(error = %err, "startup stock alert sweep failed");
    }

    // Build the application router
    let app = create_router(db);

    // Get port from environment or use default
    let port = env::var("PORT").unwrap_or_else(|_| "4000".to_string());
    let addr = format!("0.0.0.0:{}", port);

    tracing::info!("cantine server starting on http://{}", addr);

    // Start the server
    let listener = tokio::net::TcpListener::bind(&addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}

fn create_router(db: Database) -> Router {
    Router::new()
        // Authentication
        .route("/api/auth/login", post(handlers::auth::login))

        // Roles and permissions
        .route("/api/roles", get(handlers::team::list_roles))
        .route("/api/roles", post(handlers::team::create_role))
        .route("/api/roles/:id", put(handlers::team::update_role))
        .route("/api/roles/:id", delete(handlers::team::delete_role))
        .route("/api/permissions", get(handlers::team::list_permissions))
        .route("/api/role-permissions/:role_id", get(handlers::team::list_role_permissions))
        .route("/api/role-permissions", post(handlers::team::assign_permission))
        .route("/api/role-permissions/:role_id/:permission_id", delete(handlers::team::unassign_permission))

        // Users
        .route("/api/users", get(handlers::team::list_users))
        .route("/api/users", post(handlers::team::create_user))
        .route("/api/users/:id", put(handlers::team::update_user))
        .route("/api/users/:id", delete(handlers::team::delete_user))
        .route("/api/users/:id/report", get(handlers::reports::user_report))

        // Ingredients
        .route("/api/ingredients", get(handlers::ingredients::list_ingredients))
        .route("/api/ingredients", post(handlers::ingredients::create_ingredient))
        .route("/api/ingredients/:id", put(handlers::ingredients::update_ingredient))
        .route("/api/ingredients/:id", delete(handlers::ingredients::delete_ingredient))

        // Stock movements and alerts
        .route("/api/stock-movements", get(handlers::stock::list_movements))
        .route("/api/stock-movements", post(handlers::stock::create_movement))
        .route("/api/stock-alerts", get(handlers::stock::list_alerts))
        .route("/api/stock-alerts/:id/resolve", put(handlers::stock::resolve_alert))
        .route("/api/stock-alerts/check", post(handlers::stock::check_alerts))

        // Students and allergen profiles
        .route("/api/students", get(handlers::students::list_students))
        .route("/api/students", post(handlers::students::create_student))
        .route("/api/students/:id", put(handlers::students::update_student))
        .route("/api/students/:id", delete(handlers::students::delete_student))
        .route("/api/allergen-profiles", get(handlers::students::list_allergen_profiles))
        .route("/api/allergen-profiles", post(handlers::students::upsert_allergen_profile))

        // Attendances
        .route("/api/attendances", get(handlers::attendances::list_attendances))
        .route("/api/attendances", post(handlers::attendances::record_attendance))
        .route("/api/attendances/:id", put(handlers::attendances::update_attendance))
        .route("/api/attendances/:id", delete(handlers::attendances::delete_attendance))

        // Recipes, suppliers, orders, menu plans
        .route("/api/recipes", get(handlers::menu::list_recipes))
        .route("/api/recipes", post(handlers::menu::create_recipe))
        .route("/api/recipes/:id", put(handlers::menu::update_recipe))
        .route("/api/recipes/:id", delete(handlers::menu::delete_recipe))
        .route("/api/suppliers", get(handlers::menu::list_suppliers))
        .route("/api/suppliers", post(handlers::menu::create_supplier))
        .route("/api/orders", get(handlers::menu::list_orders))
        .route("/api/orders", post(handlers::menu::create_order))
        .route("/api/menu-plans", get(handlers::menu::list_menu_plans))
        .route("/api/menu-plans", post(handlers::menu::create_menu_plan))

        // Analytics
        .route("/api/analytics", get(handlers::reports::analytics))

        // Middleware
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive())
        )
        .with_state(db)
}
