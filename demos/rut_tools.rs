use rust_decimal_macros::dec;
use sii_chile::core::*;

fn main() {
    println!("=== RUT Validation ===\n");

    for input in ["12.345.678-5", "12345678-9", "8765432k", "abc"] {
        let check = rut::validate(input);
        match (&check.canonical, check.check_digit) {
            (Some(canonical), Some(dv)) => {
                println!("  {input} => {canonical} valid={} dv={dv} ({})", check.valid, check.message)
            }
            _ => println!("  {input} => {}", check.message),
        }
    }

    println!("\n=== Check Digits ===\n");

    for body in [76_123_456, 8_765_432, 66_666_666] {
        let computed = rut::compute_for_body(body);
        println!("  {body} => {}", computed.canonical);
    }
    println!("  random => {}", rut::generate_random().canonical);

    println!("\n=== Boleta Totals ===\n");

    let items = [
        LineItemBuilder::new("Café", dec!(2), dec!(1990)).build(),
        LineItemBuilder::new("Medialuna", dec!(3), dec!(890))
            .discount(dec!(10))
            .build(),
        LineItemBuilder::new("Diario", dec!(1), dec!(700)).exempt().build(),
    ];
    match compute_totals(DocumentKind::Boleta, &items) {
        Ok(totals) => {
            println!("  MntNeto  {}", totals.net_amount);
            println!("  IVA      {}", totals.iva_amount);
            println!("  MntExe   {}", totals.exempt_amount);
            println!("  MntTotal {}", totals.total_amount);
        }
        Err(e) => println!("  error: {e}"),
    }
}
