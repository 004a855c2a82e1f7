//! HTTP handlers for inventory ledger endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use crate::error::AppResult;
use crate::models::StockSnapshot;
use crate::middleware::CurrentTenant;
use crate::services::inventory::{
    BulkTransactionRow, InventoryService, RecordTransactionInput, StockTransaction,
    UpdateTransactionInput,
};
use crate::AppState;

/// Record a ledger transaction
pub async fn record_transaction(
    State(state): State<AppState>,
    current_tenant: CurrentTenant,
    Json(input): Json<RecordTransactionInput>,
) -> AppResult<Json<StockTransaction>> {
    let service = InventoryService::new(state.db);
    let transaction = service.record_transaction(&current_tenant.0, input).await?;
    Ok(Json(transaction))
}

/// Update a ledger transaction
pub async fn update_transaction(
    State(state): State<AppState>,
    current_tenant: CurrentTenant,
    Path(id): Path<i64>,
    Json(input): Json<UpdateTransactionInput>,
) -> AppResult<Json<StockTransaction>> {
    let service = InventoryService::new(state.db);
    let transaction = service
        .update_transaction(&current_tenant.0, id, input)
        .await?;
    Ok(Json(transaction))
}

/// Delete a ledger transaction
pub async fn delete_transaction(
    State(state): State<AppState>,
    current_tenant: CurrentTenant,
    Path(id): Path<i64>,
) -> AppResult<Json<()>> {
    let service = InventoryService::new(state.db);
    service.delete_transaction(&current_tenant.0, id).await?;
    Ok(Json(()))
}

/// Replace the tenant's entire ledger (destructive bulk import)
pub async fn replace_ledger(
    State(state): State<AppState>,
    current_tenant: CurrentTenant,
    Json(rows): Json<Vec<BulkTransactionRow>>,
) -> AppResult<Json<Vec<StockTransaction>>> {
    let service = InventoryService::new(state.db);
    let inserted = service.replace_ledger(&current_tenant.0, rows).await?;
    Ok(Json(inserted))
}

/// List all transactions for the tenant
pub async fn list_transactions(
    State(state): State<AppState>,
    current_tenant: CurrentTenant,
) -> AppResult<Json<Vec<StockTransaction>>> {
    let service = InventoryService::new(state.db);
    let transactions = service.list_transactions(&current_tenant.0).await?;
    Ok(Json(transactions))
}

/// Get one item's transaction history
pub async fn get_item_transactions(
    State(state): State<AppState>,
    current_tenant: CurrentTenant,
    Path(item_type): Path<String>,
) -> AppResult<Json<Vec<StockTransaction>>> {
    let service = InventoryService::new(state.db);
    let transactions = service
        .item_transactions(&current_tenant.0, &item_type)
        .await?;
    Ok(Json(transactions))
}

/// Get one item's current snapshot
pub async fn get_item_snapshot(
    State(state): State<AppState>,
    current_tenant: CurrentTenant,
    Path(item_type): Path<String>,
) -> AppResult<Json<StockSnapshot>> {
    let service = InventoryService::new(state.db);
    let snapshot = service.get_snapshot(&current_tenant.0, &item_type).await?;
    Ok(Json(snapshot))
}

/// List the tenant's current inventory
pub async fn list_inventory(
    State(state): State<AppState>,
    current_tenant: CurrentTenant,
) -> AppResult<Json<Vec<StockSnapshot>>> {
    let service = InventoryService::new(state.db);
    let snapshots = service.list_snapshots(&current_tenant.0).await?;
    Ok(Json(snapshots))
}

/// Rebuild one item's snapshot from its ledger
pub async fn rebuild_item_snapshot(
    State(state): State<AppState>,
    current_tenant: CurrentTenant,
    Path(item_type): Path<String>,
) -> AppResult<Json<StockSnapshot>> {
    let service = InventoryService::new(state.db);
    let snapshot = service.recalculate(&current_tenant.0, &item_type).await?;
    Ok(Json(snapshot))
}
