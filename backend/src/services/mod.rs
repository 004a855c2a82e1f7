//! Business logic services for the FarmStock inventory platform

pub mod inventory;

pub use inventory::InventoryService;
