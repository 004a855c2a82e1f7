//! Ledger replay for moving-average inventory costing
//!
//! The transaction history is the source of truth; the materialized stock
//! snapshot is always a pure fold over that history sorted by
//! `(transaction_date, id)`. Depletions cost out at the weighted-average
//! price at the point they occur in ledger order, so the whole history is
//! replayed after any edit rather than adjusted incrementally — an
//! out-of-order edit legitimately changes every downstream average.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::TransactionKind;

/// One movement in an item's transaction history
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Insertion-order tie-breaker for entries sharing a date
    pub id: i64,
    pub kind: TransactionKind,
    /// Non-negative magnitude; direction is carried by `kind`
    pub quantity: Decimal,
    /// `quantity * price`, fixed at write time
    pub total_cost: Decimal,
    pub transaction_date: NaiveDate,
}

impl LedgerEntry {
    /// The replay ordering key: date ascending, id breaking ties.
    pub fn sort_key(&self) -> (NaiveDate, i64) {
        (self.transaction_date, self.id)
    }
}

/// Result of replaying one item's full ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerTotals {
    pub quantity: Decimal,
    pub total_cost: Decimal,
    pub avg_price: Decimal,
    /// True when any depletion exceeded the running balance and was
    /// clamped to zero. Likely a data-entry mistake; callers decide
    /// whether to surface it.
    pub overdrawn: bool,
}

impl LedgerTotals {
    pub fn empty() -> Self {
        Self {
            quantity: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            avg_price: Decimal::ZERO,
            overdrawn: false,
        }
    }
}

/// Replay an ordered ledger into current totals.
///
/// Entries must already be sorted by `(transaction_date, id)` ascending;
/// the caller owns the ordering because it normally comes straight from an
/// `ORDER BY` clause. Restocks add quantity and cost; depletions remove
/// quantity at the running weighted-average unit price. Quantity and cost
/// never go below zero.
pub fn replay(entries: &[LedgerEntry]) -> LedgerTotals {
    let mut qty = Decimal::ZERO;
    let mut cost = Decimal::ZERO;
    let mut overdrawn = false;

    for entry in entries {
        match entry.kind {
            TransactionKind::Restock => {
                qty += entry.quantity;
                cost += entry.total_cost;
            }
            TransactionKind::Deplete => {
                let avg = if qty > Decimal::ZERO { cost / qty } else { Decimal::ZERO };
                let depletion_cost = avg * entry.quantity;
                if entry.quantity > qty {
                    overdrawn = true;
                }
                qty = (qty - entry.quantity).max(Decimal::ZERO);
                cost = (cost - depletion_cost).max(Decimal::ZERO);
            }
        }
    }

    let avg_price = if qty > Decimal::ZERO { cost / qty } else { Decimal::ZERO };

    LedgerTotals {
        quantity: qty,
        total_cost: cost,
        avg_price,
        overdrawn,
    }
}
