//! Domain models for the stock intake core

mod ledger;
mod purchase;

pub use ledger::*;
pub use purchase::*;
