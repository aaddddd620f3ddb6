use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

use super::error::{SiiError, ValidationError};
use super::types::*;

/// Chilean IVA standard rate.
pub const IVA_RATE: Decimal = dec!(0.19);

/// IVA rate as a percentage (TasaIVA).
pub const IVA_PERCENT: u32 = 19;

const IVA_FACTOR: Decimal = dec!(1.19);
const HUNDRED: Decimal = dec!(100);

/// Compute document totals from line items.
///
/// Boleta prices include IVA, so each taxable line is converted back to net
/// with `round(subtotal / 1.19)` on the unrounded discounted subtotal before
/// accumulating; factura and note lines add their subtotal rounded to whole
/// pesos. Exempt lines go to MntExe untouched. IVA is
/// `round(net * 0.19)` over the accumulated net, and every rounding is
/// half-up to whole pesos.
///
/// # Errors
///
/// `SiiError::InvalidInput` for a non-positive quantity, a negative price or
/// a discount outside 0..=100; `SiiError::Arithmetic` on overflow.
pub fn compute_totals(kind: DocumentKind, items: &[LineItem]) -> Result<DocumentTotals, SiiError> {
    let mut net = Decimal::ZERO;
    let mut exempt = Decimal::ZERO;

    let overflow = || SiiError::Arithmetic("document totals overflow".into());

    for (idx, item) in items.iter().enumerate() {
        let subtotal = line_subtotal(item, idx + 1)?;
        if item.exempt {
            exempt = exempt
                .checked_add(round_half_up(subtotal, 0))
                .ok_or_else(overflow)?;
        } else if kind.prices_include_iva() {
            let line_net = round_half_up(subtotal / IVA_FACTOR, 0);
            net = net.checked_add(line_net).ok_or_else(overflow)?;
        } else {
            net = net
                .checked_add(round_half_up(subtotal, 0))
                .ok_or_else(overflow)?;
        }
    }

    let iva = round_half_up(net * IVA_RATE, 0);
    let total = net
        .checked_add(iva)
        .and_then(|sum| sum.checked_add(exempt))
        .ok_or_else(overflow)?;

    let totals = DocumentTotals {
        net_amount: to_pesos(net, "net amount")?,
        exempt_amount: to_pesos(exempt, "exempt amount")?,
        iva_amount: to_pesos(iva, "IVA amount")?,
        total_amount: to_pesos(total, "total amount")?,
    };
    tracing::debug!(
        kind = kind.code(),
        lines = items.len(),
        net = totals.net_amount,
        exempt = totals.exempt_amount,
        iva = totals.iva_amount,
        total = totals.total_amount,
        "computed DTE totals"
    );
    Ok(totals)
}

/// Build the detail section: one record per item, numbered from 1 in input
/// order. Line amounts are quoted as priced (tax-inclusive for boletas).
pub fn build_line_detail(items: &[LineItem]) -> Result<Vec<LineDetail>, SiiError> {
    items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let line_number = idx + 1;
            Ok(LineDetail {
                line_number: u32::try_from(line_number)
                    .map_err(|_| SiiError::Arithmetic("too many lines".into()))?,
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                discount_percent: item.discount_percent,
                line_amount: to_pesos(line_amount(item, line_number)?, "line amount")?,
                exempt: item.exempt,
            })
        })
        .collect()
}

/// Check the totals invariants the invoicing providers re-validate.
/// Returns all findings (not just the first).
pub fn validate_totals(totals: &DocumentTotals) -> Vec<ValidationError> {
    let mut errors = Vec::new();

    for (field, value, rule) in [
        ("totals.net_amount", totals.net_amount, "MntNeto"),
        ("totals.exempt_amount", totals.exempt_amount, "MntExe"),
        ("totals.iva_amount", totals.iva_amount, "IVA"),
        ("totals.total_amount", totals.total_amount, "MntTotal"),
    ] {
        if value < 0 {
            errors.push(ValidationError::with_rule(
                field,
                format!("amount {value} must not be negative"),
                rule,
            ));
        }
    }

    let expected_iva = round_half_up(Decimal::from(totals.net_amount) * IVA_RATE, 0);
    if Decimal::from(totals.iva_amount) != expected_iva {
        errors.push(ValidationError::with_rule(
            "totals.iva_amount",
            format!(
                "IVA {} does not match 19% of net {} ({})",
                totals.iva_amount, totals.net_amount, expected_iva
            ),
            "IVA",
        ));
    }

    let expected_total = i128::from(totals.net_amount)
        + i128::from(totals.iva_amount)
        + i128::from(totals.exempt_amount);
    if i128::from(totals.total_amount) != expected_total {
        errors.push(ValidationError::with_rule(
            "totals.total_amount",
            format!(
                "total {} does not match net {} + IVA {} + exempt {}",
                totals.total_amount, totals.net_amount, totals.iva_amount, totals.exempt_amount
            ),
            "MntTotal",
        ));
    }

    errors
}

/// Quantity × price less the percentage discount, rounded to whole pesos.
fn line_amount(item: &LineItem, line_number: usize) -> Result<Decimal, SiiError> {
    Ok(round_half_up(line_subtotal(item, line_number)?, 0))
}

/// Quantity × price less the percentage discount, unrounded.
fn line_subtotal(item: &LineItem, line_number: usize) -> Result<Decimal, SiiError> {
    if item.quantity <= Decimal::ZERO {
        return Err(SiiError::InvalidInput(format!(
            "line {line_number}: quantity {} must be greater than zero",
            item.quantity
        )));
    }
    if item.unit_price < Decimal::ZERO {
        return Err(SiiError::InvalidInput(format!(
            "line {line_number}: unit price {} must not be negative",
            item.unit_price
        )));
    }
    let discount = item.discount_percent.unwrap_or(Decimal::ZERO);
    if discount < Decimal::ZERO || discount > HUNDRED {
        return Err(SiiError::InvalidInput(format!(
            "line {line_number}: discount {discount}% must be between 0 and 100"
        )));
    }

    let overflow = || SiiError::Arithmetic(format!("line {line_number}: amount overflows"));
    let gross = item
        .quantity
        .checked_mul(item.unit_price)
        .ok_or_else(overflow)?;
    if discount.is_zero() {
        return Ok(gross);
    }
    Ok(gross
        .checked_mul(HUNDRED - discount)
        .ok_or_else(overflow)?
        / HUNDRED)
}

fn to_pesos(value: Decimal, what: &str) -> Result<i64, SiiError> {
    value
        .to_i64()
        .ok_or_else(|| SiiError::Arithmetic(format!("{what} {value} does not fit in i64")))
}

/// Round a Decimal to `dp` decimal places using half-up (commercial rounding).
pub(crate) fn round_half_up(value: Decimal, dp: u32) -> Decimal {
    value.round_dp_with_strategy(dp, RoundingStrategy::MidpointAwayFromZero)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(quantity: Decimal, price: Decimal, exempt: bool) -> LineItem {
        LineItem {
            description: "Item".into(),
            quantity,
            unit_price: price,
            exempt,
            discount_percent: None,
        }
    }

    #[test]
    fn boleta_price_includes_iva() {
        let t = compute_totals(DocumentKind::Boleta, &[item(dec!(1), dec!(1190), false)]).unwrap();
        assert_eq!(
            t,
            DocumentTotals {
                net_amount: 1000,
                exempt_amount: 0,
                iva_amount: 190,
                total_amount: 1190,
            }
        );
    }

    #[test]
    fn boleta_rounds_net_then_iva() {
        // 1000 / 1.19 = 840.34 -> 840; 840 * 0.19 = 159.6 -> 160
        let t = compute_totals(DocumentKind::Boleta, &[item(dec!(1), dec!(1000), false)]).unwrap();
        assert_eq!(t.net_amount, 840);
        assert_eq!(t.iva_amount, 160);
        assert_eq!(t.total_amount, 1000);
    }

    #[test]
    fn boleta_net_comes_from_unrounded_subtotal() {
        // 0.5 * 3 = 1.5; 1.5 / 1.19 = 1.26 -> 1, not round(1.5) = 2 / 1.19 -> 2
        let lines = [item(dec!(0.5), dec!(3), false)];
        let t = compute_totals(DocumentKind::Boleta, &lines).unwrap();
        assert_eq!(t.net_amount, 1);
        assert_eq!(t.iva_amount, 0);
        assert_eq!(t.total_amount, 1);
        assert_eq!(build_line_detail(&lines).unwrap()[0].line_amount, 2);
    }

    #[test]
    fn factura_price_is_net() {
        let t = compute_totals(DocumentKind::Factura, &[item(dec!(2), dec!(1000), false)]).unwrap();
        assert_eq!(t.net_amount, 2000);
        assert_eq!(t.iva_amount, 380);
        assert_eq!(t.total_amount, 2380);
    }

    #[test]
    fn mixed_exempt_and_taxable() {
        let t = compute_totals(
            DocumentKind::Factura,
            &[item(dec!(1), dec!(1000), false), item(dec!(1), dec!(500), true)],
        )
        .unwrap();
        assert_eq!(t.net_amount, 1000);
        assert_eq!(t.exempt_amount, 500);
        assert_eq!(t.iva_amount, 190);
        assert_eq!(t.total_amount, 1690);
    }

    #[test]
    fn iva_midpoint_rounds_up() {
        // 50 * 0.19 = 9.5 -> 10
        let t = compute_totals(DocumentKind::Factura, &[item(dec!(1), dec!(50), false)]).unwrap();
        assert_eq!(t.iva_amount, 10);
    }

    #[test]
    fn discount_reduces_line_before_iva() {
        let mut line = item(dec!(1), dec!(1000), false);
        line.discount_percent = Some(dec!(10));
        let t = compute_totals(DocumentKind::Factura, &[line]).unwrap();
        assert_eq!(t.net_amount, 900);
        assert_eq!(t.iva_amount, 171);
        assert_eq!(t.total_amount, 1071);
    }

    #[test]
    fn empty_items_give_zero_totals() {
        let t = compute_totals(DocumentKind::Factura, &[]).unwrap();
        assert_eq!(t, DocumentTotals::default());
    }

    #[test]
    fn negative_price_rejected() {
        let err = compute_totals(DocumentKind::Factura, &[item(dec!(1), dec!(-1), false)]);
        assert!(matches!(err, Err(SiiError::InvalidInput(_))));
    }

    #[test]
    fn zero_quantity_rejected() {
        let err = compute_totals(DocumentKind::Boleta, &[item(dec!(0), dec!(100), false)]);
        assert!(matches!(err, Err(SiiError::InvalidInput(_))));
    }

    #[test]
    fn discount_over_hundred_rejected() {
        let mut line = item(dec!(1), dec!(100), false);
        line.discount_percent = Some(dec!(101));
        let err = compute_totals(DocumentKind::Factura, &[line]).unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn overflow_is_an_error_not_a_panic() {
        let err = compute_totals(DocumentKind::Factura, &[item(Decimal::MAX, Decimal::MAX, false)]);
        assert!(matches!(err, Err(SiiError::Arithmetic(_))));
    }

    #[test]
    fn line_detail_numbers_from_one() {
        let detail = build_line_detail(&[
            item(dec!(2), dec!(500), false),
            item(dec!(1), dec!(300), true),
        ])
        .unwrap();
        assert_eq!(detail.len(), 2);
        assert_eq!(detail[0].line_number, 1);
        assert_eq!(detail[0].line_amount, 1000);
        assert_eq!(detail[1].line_number, 2);
        assert!(detail[1].exempt);
    }

    #[test]
    fn validate_totals_accepts_computed() {
        let t = compute_totals(DocumentKind::Boleta, &[item(dec!(3), dec!(4990), false)]).unwrap();
        assert!(validate_totals(&t).is_empty());
    }

    #[test]
    fn validate_totals_flags_wrong_sum() {
        let t = DocumentTotals {
            net_amount: 1000,
            exempt_amount: 0,
            iva_amount: 190,
            total_amount: 1200,
        };
        let errors = validate_totals(&t);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].rule.as_deref(), Some("MntTotal"));
    }

    #[test]
    fn validate_totals_flags_wrong_iva() {
        let t = DocumentTotals {
            net_amount: 1000,
            exempt_amount: 0,
            iva_amount: 200,
            total_amount: 1200,
        };
        let errors = validate_totals(&t);
        assert!(errors.iter().any(|e| e.rule.as_deref() == Some("IVA")));
    }
}
