//! Issues a boleta in the OpenFactura certification environment when
//! `OPENFACTURA_API_KEY` and `SII_RUT_EMISOR` are set; otherwise prints the
//! request body that would be sent.

use rust_decimal_macros::dec;
use secrecy::SecretString;
use sii_chile::core::*;
use sii_chile::emision::*;

#[tokio::main]
async fn main() {
    let issuer: Rut = match std::env::var("SII_RUT_EMISOR") {
        Ok(text) => match text.parse() {
            Ok(rut) => rut,
            Err(e) => {
                eprintln!("SII_RUT_EMISOR: {e}");
                return;
            }
        },
        Err(_) => Rut::from_body(76_123_456),
    };

    let document = match DocumentBuilder::new(DocumentKind::Boleta, issuer)
        .add_item(LineItemBuilder::new("Café", dec!(2), dec!(1990)).build())
        .add_item(LineItemBuilder::new("Medialuna", dec!(1), dec!(890)).build())
        .build()
    {
        Ok(document) => document,
        Err(e) => {
            eprintln!("error: {e}");
            return;
        }
    };
    println!("MntTotal: {}", document.totals.total_amount);

    let Ok(api_key) = std::env::var("OPENFACTURA_API_KEY") else {
        let body = openfactura::build_request(&document);
        match serde_json::to_string_pretty(&body) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("error: {e}"),
        }
        return;
    };

    let provider = match OpenFactura::new(
        SecretString::new(api_key),
        issuer,
        OPENFACTURA_CERTIFICATION_URL,
        None,
    ) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("error: {e}");
            return;
        }
    };
    match provider.emit(&document).await {
        Ok(result) => println!("folio {:?}", result.folio),
        Err(e) => eprintln!("emission failed: {e}"),
    }
}
