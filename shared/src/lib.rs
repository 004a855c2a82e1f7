//! Shared domain types for the FarmStock inventory platform
//!
//! This crate contains the pure, I/O-free parts of the system: transaction
//! kinds, ledger entry types, and the replay fold that derives a stock
//! snapshot from an ordered transaction history. The backend crate layers
//! persistence and HTTP on top.

pub mod ledger;
pub mod models;
pub mod types;

pub use ledger::*;
pub use models::*;
pub use types::*;
