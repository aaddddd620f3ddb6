#![no_main]

use libfuzzer_sys::fuzz_target;
use rust_decimal::Decimal;
use sii_chile::core::*;

fuzz_target!(|data: &[u8]| {
    // Each 9-byte chunk: quantity (u32), price (u32), flags (u8).
    let items: Vec<LineItem> = data
        .chunks_exact(9)
        .map(|c| LineItem {
            description: String::new(),
            quantity: Decimal::from(u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
            unit_price: Decimal::from(u32::from_le_bytes([c[4], c[5], c[6], c[7]])),
            exempt: c[8] & 1 == 1,
            discount_percent: Some(Decimal::from(c[8] >> 1)),
        })
        .collect();

    for kind in DocumentKind::ALL {
        if let Ok(totals) = compute_totals(kind, &items) {
            assert!(validate_totals(&totals).is_empty());
        }
    }
});
