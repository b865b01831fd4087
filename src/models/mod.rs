//! Data models for the lending server

pub mod equipment;
pub mod request;
pub mod user;

// Re-export commonly used types
pub use equipment::{Equipment, EquipmentInput, EquipmentSearch};
pub use request::{
    ApprovalStatus, ApprovalView, BorrowRequest, InventoryEffect, RequestStatus, RequestView,
    Transition,
};
pub use user::{Identity, Role};
