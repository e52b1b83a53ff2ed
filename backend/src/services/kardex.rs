//! Ledger (kardex) writer
//!
//! Every quantity movement of a product is appended as one kardex entry with
//! its opening and closing quantity. Entries are never updated or deleted.

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use shared::models::MovementType;

use crate::error::{AppError, AppResult};
use crate::models::{KardexEntry, NewKardexEntry};
use crate::repositories::KardexRepository;

/// A quantity movement to record
#[derive(Debug, Clone)]
pub struct StockMovement {
    pub product_id: i64,
    pub opening_quantity: i32,
    /// Signed change: positive is an entry, negative an exit
    pub delta: i32,
    pub unit_cost: Decimal,
    pub unit_price: Decimal,
    pub detail: String,
    pub document_number: Option<String>,
    pub movement_type: MovementType,
}

impl StockMovement {
    /// Goods received on a purchase invoice
    pub fn purchase(
        product_id: i64,
        opening_quantity: i32,
        quantity: i32,
        unit_cost: Decimal,
        unit_price: Decimal,
        invoice_number: &str,
    ) -> Self {
        Self {
            product_id,
            opening_quantity,
            delta: quantity,
            unit_cost,
            unit_price,
            detail: invoice_number.to_string(),
            document_number: Some(invoice_number.to_string()),
            movement_type: MovementType::Purchase,
        }
    }

    /// Direct correction of the aggregate quantity
    pub fn adjustment(
        product_id: i64,
        opening_quantity: i32,
        closing_quantity: i32,
        unit_cost: Decimal,
        unit_price: Decimal,
    ) -> Self {
        Self {
            product_id,
            opening_quantity,
            delta: closing_quantity - opening_quantity,
            unit_cost,
            unit_price,
            detail: "Manual stock adjustment".to_string(),
            document_number: None,
            movement_type: MovementType::Adjustment,
        }
    }

    pub fn to_entry(&self, movement_date: NaiveDate) -> AppResult<NewKardexEntry> {
        let closing_quantity = self
            .opening_quantity
            .checked_add(self.delta)
            .ok_or_else(|| AppError::Internal("kardex quantity overflow".to_string()))?;

        Ok(NewKardexEntry {
            product_id: self.product_id,
            movement_date,
            opening_quantity: self.opening_quantity,
            quantity_in: self.delta.max(0),
            quantity_out: (-self.delta).max(0),
            closing_quantity,
            unit_cost: self.unit_cost,
            unit_price: self.unit_price,
            detail: self.detail.clone(),
            document_number: self.document_number.clone(),
            movement_type: self.movement_type,
        })
    }
}

/// Append one kardex entry dated today
pub async fn record_movement<R>(repo: &mut R, movement: &StockMovement) -> AppResult<KardexEntry>
where
    R: KardexRepository + ?Sized,
{
    let entry = movement.to_entry(Utc::now().date_naive())?;
    repo.append_kardex(&entry).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 1).unwrap()
    }

    #[test]
    fn test_purchase_entry_balances() {
        let movement =
            StockMovement::purchase(5, 20, 10, Decimal::from(100), Decimal::from(130), "FAC-001");
        let entry = movement.to_entry(today()).unwrap();

        assert_eq!(entry.opening_quantity, 20);
        assert_eq!(entry.quantity_in, 10);
        assert_eq!(entry.quantity_out, 0);
        assert_eq!(entry.closing_quantity, 30);
        assert_eq!(entry.detail, "FAC-001");
        assert_eq!(entry.document_number.as_deref(), Some("FAC-001"));
        assert_eq!(entry.movement_type, MovementType::Purchase);
    }

    #[test]
    fn test_downward_adjustment_is_an_exit() {
        let movement = StockMovement::adjustment(5, 30, 25, Decimal::ONE, Decimal::TWO);
        let entry = movement.to_entry(today()).unwrap();

        assert_eq!(entry.quantity_in, 0);
        assert_eq!(entry.quantity_out, 5);
        assert_eq!(entry.closing_quantity, 25);
        assert_eq!(entry.movement_type, MovementType::Adjustment);
    }

    #[test]
    fn test_overflow_is_an_error() {
        let movement =
            StockMovement::purchase(5, i32::MAX, 1, Decimal::ONE, Decimal::ONE, "FAC-001");
        assert!(movement.to_entry(today()).is_err());
    }
}
