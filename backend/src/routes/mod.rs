//! Route definitions for the FarmStock inventory platform

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};

use crate::{handlers, middleware::tenant_middleware, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - inventory ledger
        .nest("/inventory", inventory_routes())
}

/// Inventory ledger routes (protected)
fn inventory_routes() -> Router<AppState> {
    Router::new()
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::record_transaction),
        )
        .route("/transactions/batch", post(handlers::replace_ledger))
        .route(
            "/transactions/:id",
            put(handlers::update_transaction).delete(handlers::delete_transaction),
        )
        // Current inventory snapshots
        .route("/items", get(handlers::list_inventory))
        .route("/items/:item_type", get(handlers::get_item_snapshot))
        .route(
            "/items/:item_type/transactions",
            get(handlers::get_item_transactions),
        )
        .route(
            "/items/:item_type/recalculate",
            post(handlers::rebuild_item_snapshot),
        )
        .route_layer(middleware::from_fn(tenant_middleware))
}
