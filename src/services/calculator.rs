//! Document totals. Every path that shows or stores a total goes through
//! [`calculate_totals`], so a preview always matches what is persisted.

use crate::errors::ServiceError;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

const MONEY_SCALE: u32 = 2;

/// Largest amount a `decimal(15, 2)` money column holds.
pub const MAX_MONEY: Decimal = dec!(9999999999999.99);

/// Quantity and unit price of one line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineAmount {
    pub quantity: i32,
    pub unit_price: Decimal,
}

impl LineAmount {
    pub fn new(quantity: i32, unit_price: Decimal) -> Self {
        Self {
            quantity,
            unit_price,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Totals {
    pub subtotal: Decimal,
    pub after_reduction: Decimal,
    pub vat_amount: Decimal,
    pub grand_total: Decimal,
}

/// Per-line VAT breakdown used on invoice lines
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LineVat {
    pub total_ht: Decimal,
    pub vat_amount: Decimal,
    pub line_total: Decimal,
}

pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(MONEY_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// quantity × unit price, rounded to cents. Prices up to [`MAX_MONEY`] times
/// any `i32` quantity stay far inside `Decimal`'s range.
pub fn line_total(quantity: i32, unit_price: Decimal) -> Decimal {
    round_money(Decimal::from(quantity) * unit_price)
}

pub fn validate_vat_rate(vat_rate: Decimal) -> Result<(), ServiceError> {
    if vat_rate.is_sign_negative() || vat_rate > Decimal::ONE {
        return Err(ServiceError::ValidationError(format!(
            "vat_rate must be a fraction between 0 and 1, got {}",
            vat_rate
        )));
    }
    Ok(())
}

/// Computes subtotal, reduction, VAT and grand total.
///
/// Intermediate values keep full precision; each output is rounded once.
/// Rejects a negative reduction, a reduction above the subtotal, a VAT rate
/// outside [0, 1], and negative quantities or prices.
pub fn calculate_totals(
    lines: &[LineAmount],
    reduction: Decimal,
    vat_rate: Decimal,
) -> Result<Totals, ServiceError> {
    validate_vat_rate(vat_rate)?;
    if reduction.is_sign_negative() {
        return Err(ServiceError::ValidationError(format!(
            "reduction must not be negative, got {}",
            reduction
        )));
    }

    let mut subtotal = Decimal::ZERO;
    for line in lines {
        if line.quantity < 0 || line.unit_price.is_sign_negative() {
            return Err(ServiceError::ValidationError(format!(
                "line amounts must not be negative (quantity {}, unit price {})",
                line.quantity, line.unit_price
            )));
        }
        subtotal = Decimal::from(line.quantity)
            .checked_mul(line.unit_price)
            .and_then(|amount| subtotal.checked_add(amount))
            .ok_or_else(too_large)?;
    }

    if reduction > subtotal {
        return Err(ServiceError::ValidationError(format!(
            "reduction {} exceeds subtotal {}",
            reduction, subtotal
        )));
    }

    let after_reduction = subtotal - reduction;
    let vat_amount = after_reduction.checked_mul(vat_rate).ok_or_else(too_large)?;
    let grand_total = after_reduction
        .checked_add(vat_amount)
        .ok_or_else(too_large)?;

    Ok(Totals {
        subtotal: round_money(subtotal),
        after_reduction: round_money(after_reduction),
        vat_amount: round_money(vat_amount),
        grand_total: round_money(grand_total),
    })
}

fn too_large() -> ServiceError {
    ServiceError::ValidationError("line amounts are too large to total".into())
}

pub fn line_vat(quantity: i32, unit_price: Decimal, vat_rate: Decimal) -> LineVat {
    let total_ht = Decimal::from(quantity) * unit_price;
    let vat_amount = total_ht * vat_rate;
    LineVat {
        total_ht: round_money(total_ht),
        vat_amount: round_money(vat_amount),
        line_total: round_money(total_ht + vat_amount),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use rstest::rstest;
    use rust_decimal_macros::dec;

    #[test]
    fn two_line_quote_with_reduction() {
        let lines = [
            LineAmount::new(3, dec!(100.00)),
            LineAmount::new(1, dec!(50.00)),
        ];
        let totals = calculate_totals(&lines, dec!(20.00), dec!(0.20)).unwrap();
        assert_eq!(totals.subtotal, dec!(350.00));
        assert_eq!(totals.after_reduction, dec!(330.00));
        assert_eq!(totals.vat_amount, dec!(66.00));
        assert_eq!(totals.grand_total, dec!(396.00));
    }

    #[rstest]
    #[case(dec!(0), dec!(0.20), dec!(120.00))]
    #[case(dec!(100), dec!(0), dec!(0.00))]
    #[case(dec!(0), dec!(1), dec!(200.00))]
    fn boundary_rates_and_reductions(
        #[case] reduction: Decimal,
        #[case] vat_rate: Decimal,
        #[case] expected_grand: Decimal,
    ) {
        let totals =
            calculate_totals(&[LineAmount::new(2, dec!(50))], reduction, vat_rate).unwrap();
        assert_eq!(totals.grand_total, expected_grand);
    }

    #[test]
    fn rounding_happens_once_per_output() {
        // 3 × 0.335 = 1.005 must round half away from zero to 1.01
        let totals = calculate_totals(&[LineAmount::new(3, dec!(0.335))], dec!(0), dec!(0.10))
            .unwrap();
        assert_eq!(totals.subtotal, dec!(1.01));
        assert_eq!(totals.vat_amount, dec!(0.10));
        assert_eq!(totals.grand_total, dec!(1.11));
    }

    #[rstest]
    #[case(dec!(-1), dec!(0.2))]
    #[case(dec!(101), dec!(0.2))]
    #[case(dec!(0), dec!(1.01))]
    #[case(dec!(0), dec!(-0.01))]
    fn rejects_invalid_inputs(#[case] reduction: Decimal, #[case] vat_rate: Decimal) {
        assert_matches!(
            calculate_totals(&[LineAmount::new(1, dec!(100))], reduction, vat_rate),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn empty_line_set_totals_zero() {
        let totals = calculate_totals(&[], dec!(0), dec!(0.2)).unwrap();
        assert_eq!(totals.grand_total, Decimal::ZERO);
    }

    #[test]
    fn oversized_amounts_are_rejected_instead_of_overflowing() {
        let lines = [LineAmount::new(1000, Decimal::from_i128_with_scale(10_i128.pow(26), 0))];
        assert_matches!(
            calculate_totals(&lines, dec!(0), dec!(0.2)),
            Err(ServiceError::ValidationError(_))
        );
    }

    #[test]
    fn line_vat_breakdown() {
        let vat = line_vat(4, dec!(12.50), dec!(0.20));
        assert_eq!(vat.total_ht, dec!(50.00));
        assert_eq!(vat.vat_amount, dec!(10.00));
        assert_eq!(vat.line_total, dec!(60.00));
    }
}
