use chrono::NaiveDate;
use rust_decimal_macros::dec;
use sii_chile::core::*;

fn taxable(qty: rust_decimal::Decimal, price: rust_decimal::Decimal) -> LineItem {
    LineItemBuilder::new("Item", qty, price).build()
}

fn exempt(qty: rust_decimal::Decimal, price: rust_decimal::Decimal) -> LineItem {
    LineItemBuilder::new("Exento", qty, price).exempt().build()
}

fn issuer() -> Rut {
    "76.123.456-0".parse().unwrap()
}

// ---------------------------------------------------------------------------
// compute_totals
// ---------------------------------------------------------------------------

#[test]
fn boleta_single_line() {
    let t = compute_totals(DocumentKind::Boleta, &[taxable(dec!(1), dec!(1190))]).unwrap();
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
fn factura_two_units() {
    let t = compute_totals(DocumentKind::Factura, &[taxable(dec!(2), dec!(1000))]).unwrap();
    assert_eq!(
        t,
        DocumentTotals {
            net_amount: 2000,
            exempt_amount: 0,
            iva_amount: 380,
            total_amount: 2380,
        }
    );
}

#[test]
fn factura_mixed_exempt() {
    let t = compute_totals(
        DocumentKind::Factura,
        &[taxable(dec!(1), dec!(1000)), exempt(dec!(1), dec!(500))],
    )
    .unwrap();
    assert_eq!(
        t,
        DocumentTotals {
            net_amount: 1000,
            exempt_amount: 500,
            iva_amount: 190,
            total_amount: 1690,
        }
    );
}

#[test]
fn boleta_nets_each_line_before_summing() {
    // 1000/1.19 = 840.336 -> 840 per line, twice -> 1680 (not round(2000/1.19) = 1681)
    let t = compute_totals(
        DocumentKind::Boleta,
        &[taxable(dec!(1), dec!(1000)), taxable(dec!(1), dec!(1000))],
    )
    .unwrap();
    assert_eq!(t.net_amount, 1680);
    assert_eq!(t.iva_amount, 319);
    assert_eq!(t.total_amount, 1999);
}

#[test]
fn boleta_exenta_exempt_lines_untouched() {
    let t = compute_totals(DocumentKind::BoletaExenta, &[exempt(dec!(3), dec!(990))]).unwrap();
    assert_eq!(t.net_amount, 0);
    assert_eq!(t.iva_amount, 0);
    assert_eq!(t.exempt_amount, 2970);
    assert_eq!(t.total_amount, 2970);
}

#[test]
fn notes_quote_net_prices() {
    for kind in [DocumentKind::NotaCredito, DocumentKind::NotaDebito, DocumentKind::FacturaExenta] {
        let t = compute_totals(kind, &[taxable(dec!(1), dec!(1000))]).unwrap();
        assert_eq!(t.net_amount, 1000, "{kind:?}");
        assert_eq!(t.total_amount, 1190, "{kind:?}");
    }
}

#[test]
fn fractional_quantity_rounds_line() {
    // 2.5 * 333 = 832.5 -> 833
    let t = compute_totals(DocumentKind::Factura, &[taxable(dec!(2.5), dec!(333))]).unwrap();
    assert_eq!(t.net_amount, 833);
    assert_eq!(t.iva_amount, 158);
}

#[test]
fn boleta_fractional_lines_net_from_unrounded_subtotal() {
    // 0.5 * 3 = 1.5 per line; 1.5 / 1.19 -> 1 each, quoted as 2 each
    let lines = [taxable(dec!(0.5), dec!(3)), taxable(dec!(0.5), dec!(3))];
    let t = compute_totals(DocumentKind::Boleta, &lines).unwrap();
    assert_eq!(t.net_amount, 2);
    assert_eq!(t.iva_amount, 0);
    assert_eq!(t.total_amount, 2);

    let detail = build_line_detail(&lines).unwrap();
    assert!(detail.iter().all(|d| d.line_amount == 2));
}

#[test]
fn discount_on_exempt_line() {
    let line = LineItemBuilder::new("Libro", dec!(1), dec!(10000))
        .exempt()
        .discount(dec!(25))
        .build();
    let t = compute_totals(DocumentKind::Factura, &[line]).unwrap();
    assert_eq!(t.exempt_amount, 7500);
    assert_eq!(t.total_amount, 7500);
}

#[test]
fn full_discount_is_free() {
    let line = LineItemBuilder::new("Regalo", dec!(1), dec!(5000))
        .discount(dec!(100))
        .build();
    let t = compute_totals(DocumentKind::Boleta, &[line]).unwrap();
    assert_eq!(t, DocumentTotals::default());
}

#[test]
fn invalid_inputs_fail_fast() {
    for item in [
        taxable(dec!(-1), dec!(100)),
        taxable(dec!(0), dec!(100)),
        taxable(dec!(1), dec!(-0.01)),
        LineItemBuilder::new("x", dec!(1), dec!(100))
            .discount(dec!(-5))
            .build(),
    ] {
        let err = compute_totals(DocumentKind::Factura, &[item]).unwrap_err();
        assert!(matches!(err, SiiError::InvalidInput(_)), "{err}");
    }
}

#[test]
fn error_names_the_offending_line() {
    let err = compute_totals(
        DocumentKind::Factura,
        &[taxable(dec!(1), dec!(100)), taxable(dec!(1), dec!(-5))],
    )
    .unwrap_err();
    assert!(err.to_string().contains("line 2"));
}

#[test]
fn zero_price_is_allowed() {
    let t = compute_totals(DocumentKind::Factura, &[taxable(dec!(1), dec!(0))]).unwrap();
    assert_eq!(t.total_amount, 0);
}

// ---------------------------------------------------------------------------
// build_line_detail
// ---------------------------------------------------------------------------

#[test]
fn line_detail_keeps_order_and_amounts() {
    let items = [
        taxable(dec!(2), dec!(1190)),
        exempt(dec!(1), dec!(500)),
        LineItemBuilder::new("Descuento", dec!(4), dec!(250))
            .discount(dec!(10))
            .build(),
    ];
    let detail = build_line_detail(&items).unwrap();
    let numbers: Vec<u32> = detail.iter().map(|d| d.line_number).collect();
    assert_eq!(numbers, vec![1, 2, 3]);
    assert_eq!(detail[0].line_amount, 2380);
    assert!(detail[1].exempt);
    assert_eq!(detail[2].line_amount, 900);
    assert_eq!(detail[2].description, "Descuento");
}

// ---------------------------------------------------------------------------
// DocumentBuilder
// ---------------------------------------------------------------------------

#[test]
fn factura_document_end_to_end() {
    let receptor = ReceptorBuilder::new("12.345.678-5".parse().unwrap())
        .business_name("Comercial Andes SpA")
        .activity("Venta al por menor")
        .address("Av. Providencia 1234")
        .commune("Providencia")
        .city("Santiago")
        .build();
    let doc = DocumentBuilder::new(DocumentKind::Factura, issuer())
        .issue_date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
        .receptor(receptor)
        .add_item(LineItemBuilder::new("Consultoría", dec!(2), dec!(50000)).build())
        .add_item(exempt(dec!(1), dec!(15000)))
        .build()
        .unwrap();

    assert_eq!(doc.totals.net_amount, 100_000);
    assert_eq!(doc.totals.exempt_amount, 15_000);
    assert_eq!(doc.totals.iva_amount, 19_000);
    assert_eq!(doc.totals.total_amount, 134_000);
    assert_eq!(doc.detail.len(), 2);
    assert_eq!(doc.receptor.city.as_deref(), Some("Santiago"));
    assert!(validate_totals(&doc.totals).is_empty());
}

#[test]
fn builder_items_accepts_iterators() {
    let doc = DocumentBuilder::new(DocumentKind::Boleta, issuer())
        .items((1..=3).map(|i| taxable(dec!(1), rust_decimal::Decimal::from(i * 1190))))
        .build()
        .unwrap();
    assert_eq!(doc.totals.total_amount, 7140);
    assert_eq!(doc.detail[2].line_number, 3);
}

#[test]
fn builder_rejects_too_many_items() {
    let items = std::iter::repeat_with(|| taxable(dec!(1), dec!(1))).take(MAX_LINE_ITEMS + 1);
    let err = DocumentBuilder::new(DocumentKind::Factura, issuer())
        .items(items)
        .build()
        .unwrap_err();
    assert!(matches!(err, SiiError::Builder(_)));
}

#[test]
fn document_kind_codes() {
    for kind in DocumentKind::ALL {
        assert_eq!(DocumentKind::try_from(kind.code()).unwrap(), kind);
    }
    assert!(matches!(
        DocumentKind::try_from(52),
        Err(SiiError::UnknownDocumentKind(52))
    ));
    assert_eq!(serde_json::to_string(&DocumentKind::NotaCredito).unwrap(), "61");
}

// ---------------------------------------------------------------------------
// validate_totals
// ---------------------------------------------------------------------------

#[test]
fn validate_totals_reports_all_findings() {
    let t = DocumentTotals {
        net_amount: -10,
        exempt_amount: 0,
        iva_amount: 5,
        total_amount: 0,
    };
    let errors = validate_totals(&t);
    let rules: Vec<_> = errors.iter().filter_map(|e| e.rule.as_deref()).collect();
    assert!(rules.contains(&"MntNeto"));
    assert!(rules.contains(&"IVA"));
    assert!(rules.contains(&"MntTotal"));
}
