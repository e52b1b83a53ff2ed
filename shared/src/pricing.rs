//! Price and invoice total derivation

use chrono::{Duration, NaiveDate};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Scale of every stored monetary column
pub const MONEY_SCALE: u32 = 2;

/// Largest difference accepted between a supplied total and the derived one
pub fn total_tolerance() -> Decimal {
    Decimal::new(1, 2)
}

/// Round to the store's monetary precision
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Sale price = cost × (1 + margin / 100), `None` on overflow
pub fn derive_sale_price(unit_cost: Decimal, margin_percent: Decimal) -> Option<Decimal> {
    let factor = Decimal::ONE.checked_add(margin_percent.checked_div(Decimal::ONE_HUNDRED)?)?;
    unit_cost.checked_mul(factor).map(round_money)
}

/// Due date defaults to the issue date plus the payment term
pub fn derive_due_date(
    issue_date: NaiveDate,
    term_days: i32,
    explicit: Option<NaiveDate>,
) -> NaiveDate {
    explicit.unwrap_or_else(|| issue_date + Duration::days(i64::from(term_days)))
}

/// Header totals computed from the purchase lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceTotals {
    pub subtotal: Decimal,
    pub discount_percent: Decimal,
    pub discount_amount: Decimal,
    pub surcharge_amount: Decimal,
    pub total: Decimal,
}

impl InvoiceTotals {
    /// Derive the header totals.
    ///
    /// `discount = subtotal × pct / 100 + fixed`, `total = subtotal − discount + surcharges`.
    /// Returns `None` when any step overflows.
    pub fn derive(
        line_subtotals: impl IntoIterator<Item = Decimal>,
        discount_percent: Decimal,
        fixed_discount: Decimal,
        surcharge_amount: Decimal,
    ) -> Option<Self> {
        let subtotal = line_subtotals
            .into_iter()
            .try_fold(Decimal::ZERO, |acc, line| acc.checked_add(line))
            .map(round_money)?;
        let discount_amount = subtotal
            .checked_mul(discount_percent)?
            .checked_div(Decimal::ONE_HUNDRED)?
            .checked_add(fixed_discount)
            .map(round_money)?;
        let surcharge_amount = round_money(surcharge_amount);
        let total = subtotal
            .checked_sub(discount_amount)?
            .checked_add(surcharge_amount)?;

        Some(Self {
            subtotal,
            discount_percent,
            discount_amount,
            surcharge_amount,
            total,
        })
    }
}

/// Whether a client-supplied figure agrees with the derived one
pub fn amounts_agree(supplied: Decimal, derived: Decimal) -> bool {
    supplied
        .checked_sub(derived)
        .map_or(false, |diff| diff.abs() <= total_tolerance())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_sale_price_from_margin() {
        assert_eq!(derive_sale_price(dec("100.00"), dec("30")), Some(dec("130.00")));
        assert_eq!(derive_sale_price(dec("80"), dec("0")), Some(dec("80")));
        assert_eq!(derive_sale_price(dec("10.10"), dec("33.3")), Some(dec("13.46")));
    }

    #[test]
    fn test_sale_price_overflow_is_none() {
        assert_eq!(derive_sale_price(Decimal::MAX, dec("30")), None);
    }

    #[test]
    fn test_due_date_defaults_to_term() {
        let issue = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        assert_eq!(
            derive_due_date(issue, 30, None),
            NaiveDate::from_ymd_opt(2024, 2, 14).unwrap()
        );
    }

    #[test]
    fn test_due_date_explicit_wins() {
        let issue = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let explicit = NaiveDate::from_ymd_opt(2024, 1, 20).unwrap();
        assert_eq!(derive_due_date(issue, 30, Some(explicit)), explicit);
    }

    #[test]
    fn test_invoice_totals() {
        let totals = InvoiceTotals::derive(
            vec![dec("1000.00"), dec("500.00")],
            dec("10"),
            dec("50.00"),
            dec("25.00"),
        )
        .unwrap();

        assert_eq!(totals.subtotal, dec("1500.00"));
        // 150 percent-based + 50 fixed
        assert_eq!(totals.discount_amount, dec("200.00"));
        assert_eq!(totals.total, dec("1325.00"));
    }

    #[test]
    fn test_invoice_totals_overflow_is_none() {
        let totals = InvoiceTotals::derive(
            vec![Decimal::MAX, dec("1.00")],
            Decimal::ZERO,
            Decimal::ZERO,
            Decimal::ZERO,
        );
        assert!(totals.is_none());
    }

    #[test]
    fn test_amounts_agree_within_a_cent() {
        assert!(amounts_agree(dec("100.00"), dec("100.01")));
        assert!(!amounts_agree(dec("100.00"), dec("100.02")));
    }
}
