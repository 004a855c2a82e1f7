//! HTTP handlers for the FarmStock inventory platform

pub mod health;
pub mod inventory;

pub use health::*;
pub use inventory::*;
