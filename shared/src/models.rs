//! Domain models for the FarmStock inventory platform

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::ledger::LedgerTotals;

/// Materialized current-state row for one (tenant, item) pair
///
/// Never edited directly; always the output of a ledger replay. The row is
/// zeroed, not deleted, when the last transaction for an item disappears.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockSnapshot {
    pub tenant_id: Uuid,
    pub item_type: String,
    pub quantity: Decimal,
    pub total_cost: Decimal,
    pub avg_price: Decimal,
    /// Sticky unit of measure, preserved across recalculations
    pub unit: String,
    /// Set when the replay clamped a depletion that overdrew the balance
    pub overdrawn: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl StockSnapshot {
    /// Assemble a snapshot from replay totals and a resolved unit.
    pub fn from_totals(tenant_id: Uuid, item_type: String, unit: String, totals: LedgerTotals) -> Self {
        Self {
            tenant_id,
            item_type,
            quantity: totals.quantity,
            total_cost: totals.total_cost,
            avg_price: totals.avg_price,
            unit,
            overdrawn: totals.overdrawn,
            updated_at: None,
        }
    }
}
