//! Property-based tests for the RUT engine and DTE totals.
//!
//! Run with: `cargo test --test proptest_tests`

use proptest::prelude::*;
use rust_decimal::Decimal;
use sii_chile::core::*;

// ── Proptest Strategies ─────────────────────────────────────────────────────

/// Whole-peso price, 0 to 9.999.999.
fn arb_price() -> impl Strategy<Value = Decimal> {
    (0i64..10_000_000i64).prop_map(Decimal::from)
}

/// Quantity 0.5 to 100 in half units.
fn arb_quantity() -> impl Strategy<Value = Decimal> {
    (1u32..=200u32).prop_map(|halves| Decimal::from(halves) / Decimal::TWO)
}

fn arb_discount() -> impl Strategy<Value = Option<Decimal>> {
    prop_oneof![Just(None), (0u32..=100u32).prop_map(|p| Some(Decimal::from(p)))]
}

fn arb_line() -> impl Strategy<Value = LineItem> {
    (arb_quantity(), arb_price(), any::<bool>(), arb_discount()).prop_map(
        |(qty, price, exempt, discount)| LineItem {
            description: "Item".into(),
            quantity: qty,
            unit_price: price,
            exempt,
            discount_percent: discount,
        },
    )
}

fn arb_kind() -> impl Strategy<Value = DocumentKind> {
    prop::sample::select(DocumentKind::ALL.to_vec())
}

/// Cleaned RUT text: a digit body without leading zero plus a DV.
fn arb_cleaned_rut() -> impl Strategy<Value = String> {
    "[1-9][0-9]{0,8}[0-9K]"
}

// ── Property Tests ──────────────────────────────────────────────────────────

proptest! {
    #[test]
    fn computed_check_digit_always_validates(body in 1u64..1_000_000_000u64) {
        let computed = rut::compute_for_body(body);
        let check = rut::validate(&computed.combined);
        prop_assert!(check.valid);
        prop_assert_eq!(check.canonical.as_deref(), Some(computed.canonical.as_str()));
        prop_assert!(rut::validate(&computed.canonical).valid);
    }

    #[test]
    fn wrong_check_digit_never_validates(body in 1u64..1_000_000_000u64, offset in 1u8..11u8) {
        let right = calculate_check_digit(body);
        let index = |d: CheckDigit| match d {
            CheckDigit::Digit(n) => n,
            CheckDigit::K => 10,
        };
        let wrong = match (index(right) + offset) % 11 {
            10 => 'K',
            n => char::from(b'0' + n),
        };
        let check = rut::validate(&format!("{body}-{wrong}"));
        prop_assert!(!check.valid);
        prop_assert_eq!(check.check_digit, Some(right));
    }

    #[test]
    fn clean_inverts_canonical_format(cleaned in arb_cleaned_rut()) {
        let canonical = rut::canonical_format(&cleaned);
        prop_assert_eq!(rut::clean(&canonical), cleaned.clone());
        prop_assert_eq!(rut::canonical_format(&rut::clean(&canonical)), canonical);
    }

    #[test]
    fn validate_never_panics(input in "\\PC{0,30}") {
        let check = rut::validate(&input);
        prop_assert_eq!(check.canonical.is_none(), check.message == rut::MESSAGE_MALFORMED);
    }

    #[test]
    fn totals_satisfy_arithmetic(kind in arb_kind(), lines in prop::collection::vec(arb_line(), 1..=8)) {
        let totals = compute_totals(kind, &lines).unwrap();
        let errors = validate_totals(&totals);
        prop_assert!(errors.is_empty(), "arithmetic errors: {:?}", errors);
        prop_assert_eq!(
            totals.total_amount,
            totals.net_amount + totals.iva_amount + totals.exempt_amount
        );
        prop_assert!(totals.total_amount >= 0);
    }

    #[test]
    fn exempt_amount_is_sum_of_exempt_lines(kind in arb_kind(), lines in prop::collection::vec(arb_line(), 1..=8)) {
        let totals = compute_totals(kind, &lines).unwrap();
        let detail = build_line_detail(&lines).unwrap();
        let exempt: i64 = detail.iter().filter(|d| d.exempt).map(|d| d.line_amount).sum();
        prop_assert_eq!(totals.exempt_amount, exempt);
        prop_assert_eq!(detail.len(), lines.len());
    }

    #[test]
    fn boleta_total_stays_close_to_priced_sum(lines in prop::collection::vec(arb_line(), 1..=8)) {
        // The net and the quoted line amount are rounded separately, each
        // off by at most half a peso, so the total drifts by up to two pesos
        // per line.
        let totals = compute_totals(DocumentKind::Boleta, &lines).unwrap();
        let detail = build_line_detail(&lines).unwrap();
        let priced: i64 = detail.iter().map(|d| d.line_amount).sum();
        let slack = 2 * lines.len() as i64 + 1;
        prop_assert!((totals.total_amount - priced).abs() <= slack,
            "total {} vs priced {}", totals.total_amount, priced);
    }
}
