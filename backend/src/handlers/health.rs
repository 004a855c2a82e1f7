//! Service health endpoints

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

/// Readiness report for the inventory service
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    /// Connectivity to the ledger database; snapshots cannot be trusted
    /// fresh while this is unreachable
    pub ledger_store: &'static str,
}

/// Readiness probe: degraded whenever the ledger store does not answer
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let reachable = sqlx::query("SELECT 1").execute(&state.db).await.is_ok();
    Json(health_payload(reachable))
}

fn health_payload(ledger_store_reachable: bool) -> HealthResponse {
    HealthResponse {
        status: if ledger_store_reachable {
            "healthy"
        } else {
            "degraded"
        },
        service: "farmstock-backend",
        version: env!("CARGO_PKG_VERSION"),
        ledger_store: if ledger_store_reachable {
            "reachable"
        } else {
            "unreachable"
        },
    }
}
