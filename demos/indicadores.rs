use rust_decimal_macros::dec;
use sii_chile::indicadores::*;

#[tokio::main]
async fn main() {
    let client = match IndicatorClient::new(DEFAULT_BASE_URL, Some(std::time::Duration::from_secs(10))) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("error: {e}");
            return;
        }
    };

    println!("=== Indicadores (mindicador.cl) ===\n");

    for indicator in [Indicator::Uf, Indicator::Utm, Indicator::Dolar] {
        match client.get(indicator, None).await {
            Ok(value) => println!("  {} = {} ({})", value.indicator, value.value, value.date),
            Err(e) => println!("  {indicator}: {e}"),
        }
    }

    println!("\n=== Conversión ===\n");

    match client.convert(ConversionDirection::UfToClp, dec!(10)).await {
        Ok(Conversion::UfToClp { formatted, .. }) => println!("  10 UF = {formatted}"),
        Ok(other) => println!("  {other:?}"),
        Err(e) => println!("  error: {e}"),
    }
}
