//! Business logic services for purchase intake and product mutation

pub mod audit;
pub mod kardex;
pub mod product_mutation;
pub mod purchase_intake;

pub use product_mutation::{ProductDeletion, ProductMutationService, ProductUpdate, ProductUpdateOutcome};
pub use purchase_intake::{IntakeReceipt, LineOutcome, LotOutcome, PurchaseIntakeService};
