//! Field validation for inventory and purchase inputs

use rust_decimal::Decimal;

// ============================================================================
// Purchase Validations
// ============================================================================

/// Validate an invoice number (printable, non-blank)
pub fn validate_invoice_number(number: &str) -> Result<(), &'static str> {
    if number.trim().is_empty() {
        return Err("Invoice number cannot be empty");
    }
    if number.chars().any(|c| c.is_control()) {
        return Err("Invoice number contains control characters");
    }
    Ok(())
}

/// Validate a lot number (printable, non-blank, no surrounding spaces)
pub fn validate_lot_number(number: &str) -> Result<(), &'static str> {
    if number.trim().is_empty() {
        return Err("Lot number cannot be empty");
    }
    if number.trim() != number {
        return Err("Lot number cannot start or end with spaces");
    }
    if number.chars().any(|c| c.is_control()) {
        return Err("Lot number contains control characters");
    }
    Ok(())
}

/// Exclusive bound of a NUMERIC(14,2) amount
pub fn money_limit() -> Decimal {
    Decimal::new(1_000_000_000_000, 0)
}

/// Validate that an amount fits the stored monetary columns
pub fn validate_money_range(amount: Decimal) -> Result<(), &'static str> {
    if amount.abs() >= money_limit() {
        return Err("Amount is out of range");
    }
    Ok(())
}

/// Validate a unit cost
pub fn validate_unit_cost(cost: Decimal) -> Result<(), &'static str> {
    if cost < Decimal::ZERO {
        return Err("Unit cost cannot be negative");
    }
    validate_money_range(cost)
}

/// Validate a discount percentage (0-100)
pub fn validate_discount_percent(percent: Decimal) -> Result<(), &'static str> {
    if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
        return Err("Discount percentage must be between 0 and 100");
    }
    Ok(())
}

/// Validate that the lot allocations of a product cover exactly what was received
pub fn validate_lot_coverage(received: i64, allocated: i64) -> Result<(), &'static str> {
    if allocated != received {
        return Err("Lot quantities must add up to the received quantity");
    }
    Ok(())
}

// ============================================================================
// Inventory Validations
// ============================================================================

/// Validate a profit margin percentage (fits NUMERIC(7,2), not negative)
pub fn validate_margin(margin: Decimal) -> Result<(), &'static str> {
    if margin < Decimal::ZERO {
        return Err("Margin cannot be negative");
    }
    if margin >= Decimal::from(100_000) {
        return Err("Margin is out of range");
    }
    Ok(())
}

/// Validate a stock level (aggregate quantity or minimum threshold)
pub fn validate_stock_level(quantity: i32) -> Result<(), &'static str> {
    if quantity < 0 {
        return Err("Stock level cannot be negative");
    }
    Ok(())
}

/// Validate a sale price
pub fn validate_sale_price(price: Decimal) -> Result<(), &'static str> {
    if price < Decimal::ZERO {
        return Err("Sale price cannot be negative");
    }
    validate_money_range(price)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_validate_invoice_number() {
        assert!(validate_invoice_number("FAC-001").is_ok());
        assert!(validate_invoice_number("  ").is_err());
        assert!(validate_invoice_number("FAC\n001").is_err());
    }

    #[test]
    fn test_validate_lot_number() {
        assert!(validate_lot_number("L1").is_ok());
        assert!(validate_lot_number("").is_err());
        assert!(validate_lot_number(" L1").is_err());
    }

    #[test]
    fn test_validate_unit_cost() {
        assert!(validate_unit_cost(dec("0")).is_ok());
        assert!(validate_unit_cost(dec("100.00")).is_ok());
        assert!(validate_unit_cost(dec("-0.01")).is_err());
        assert!(validate_unit_cost(dec("999999999999.99")).is_ok());
        assert!(validate_unit_cost(dec("1000000000000")).is_err());
    }

    #[test]
    fn test_validate_money_range() {
        assert!(validate_money_range(dec("-999999999999.99")).is_ok());
        assert!(validate_money_range(dec("-1000000000000")).is_err());
        assert!(validate_money_range(Decimal::MAX).is_err());
    }

    #[test]
    fn test_validate_discount_percent() {
        assert!(validate_discount_percent(dec("0")).is_ok());
        assert!(validate_discount_percent(dec("100")).is_ok());
        assert!(validate_discount_percent(dec("100.01")).is_err());
        assert!(validate_discount_percent(dec("-1")).is_err());
    }

    #[test]
    fn test_validate_lot_coverage() {
        assert!(validate_lot_coverage(10, 10).is_ok());
        assert!(validate_lot_coverage(10, 9).is_err());
        assert!(validate_lot_coverage(10, 11).is_err());
    }

    #[test]
    fn test_validate_margin() {
        assert!(validate_margin(dec("30")).is_ok());
        assert!(validate_margin(dec("-5")).is_err());
        assert!(validate_margin(dec("100000")).is_err());
    }

    #[test]
    fn test_validate_stock_level() {
        assert!(validate_stock_level(0).is_ok());
        assert!(validate_stock_level(-1).is_err());
    }

    #[test]
    fn test_validate_sale_price() {
        assert!(validate_sale_price(dec("12.5")).is_ok());
        assert!(validate_sale_price(dec("-1")).is_err());
        assert!(validate_sale_price(dec("1000000000000.00")).is_err());
    }
}
