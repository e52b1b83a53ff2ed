//! Shared types for the stock intake platform
//!
//! Pure, I/O-free pieces used by the backend: wire payloads, monetary
//! parsing, price derivation and field validation.

pub mod models;
pub mod money;
pub mod pricing;
pub mod validation;

pub use models::*;
pub use money::*;
pub use pricing::*;
pub use validation::*;
