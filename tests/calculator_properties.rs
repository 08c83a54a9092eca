use orderchain_api::services::calculator::{calculate_totals, round_money, LineAmount};
use proptest::prelude::*;
use rust_decimal::Decimal;

fn cents(value: i64) -> Decimal {
    Decimal::new(value, 2)
}

fn line_strategy() -> impl Strategy<Value = LineAmount> {
    (0i32..500, 0i64..1_000_000).prop_map(|(quantity, price)| LineAmount::new(quantity, cents(price)))
}

fn rate_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..=10_000).prop_map(|basis_points| Decimal::new(basis_points, 4))
}

proptest! {
    #[test]
    fn totals_are_deterministic(
        lines in prop::collection::vec(line_strategy(), 0..12),
        vat_rate in rate_strategy(),
    ) {
        let first = calculate_totals(&lines, Decimal::ZERO, vat_rate).unwrap();
        let second = calculate_totals(&lines, Decimal::ZERO, vat_rate).unwrap();
        prop_assert_eq!(first, second);
    }

    #[test]
    fn grand_total_is_net_plus_vat_within_a_cent(
        lines in prop::collection::vec(line_strategy(), 1..12),
        reduction_share in 0u32..=100,
        vat_rate in rate_strategy(),
    ) {
        let subtotal: Decimal = lines
            .iter()
            .map(|l| Decimal::from(l.quantity) * l.unit_price)
            .sum();
        let reduction = round_money(subtotal * Decimal::new(reduction_share as i64, 2));
        let reduction = reduction.min(subtotal);

        let totals = calculate_totals(&lines, reduction, vat_rate).unwrap();
        let recombined = totals.after_reduction + totals.vat_amount;
        prop_assert!((totals.grand_total - recombined).abs() <= cents(1));
        prop_assert_eq!(totals.subtotal, round_money(subtotal));
    }

    #[test]
    fn valid_inputs_never_produce_negative_totals(
        lines in prop::collection::vec(line_strategy(), 0..12),
        vat_rate in rate_strategy(),
    ) {
        let totals = calculate_totals(&lines, Decimal::ZERO, vat_rate).unwrap();
        prop_assert!(!totals.subtotal.is_sign_negative());
        prop_assert!(!totals.vat_amount.is_sign_negative());
        prop_assert!(totals.grand_total >= totals.after_reduction);
    }

    #[test]
    fn reduction_above_subtotal_is_rejected(
        lines in prop::collection::vec(line_strategy(), 0..6),
        excess in 1i64..100_000,
    ) {
        let subtotal: Decimal = lines
            .iter()
            .map(|l| Decimal::from(l.quantity) * l.unit_price)
            .sum();
        prop_assert!(calculate_totals(&lines, subtotal + cents(excess), Decimal::ZERO).is_err());
    }
}
