//! Database models for the stock intake core
//!
//! Re-exports models from the shared crate and adds backend-specific models

mod inventory;
mod ledger;
mod purchase;

pub use inventory::*;
pub use ledger::*;
pub use purchase::*;
pub use shared::models::*;
