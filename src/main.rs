use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json::{Value, json};

use sii_chile::config::{Config, load_config};
use sii_chile::dispatch::{Dispatcher, Operation};
use sii_chile::logging::init_logging;

/// Chilean DTE issuance, RUT tools and economic indicators.
///
/// Reads a JSON array of item parameters (or a single object) and writes a
/// JSON array with one result per item to stdout.
#[derive(Parser, Debug)]
#[command(name = "sii-chile", version, about, long_about = None)]
struct Cli {
    /// Path to configuration file; without it, configuration comes from SII_* variables
    #[arg(short, long, env = "SII_CONFIG")]
    config: Option<PathBuf>,

    /// Record failing items as {"error": ...} instead of aborting
    #[arg(long)]
    continue_on_fail: bool,

    /// Read items from this file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Log level override (trace, debug, info, warn, error)
    #[arg(short, long)]
    log_level: Option<String>,

    /// emitir, rut, indicadores or consultar
    resource: String,

    /// Operation within the resource, e.g. validar or emitirBoleta
    operation: String,
}

#[tokio::main]
async fn main() -> ExitCode {
    // .env is optional
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, "command failed");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::from_env(|name| std::env::var(name).ok())
            .context("loading configuration from environment")?,
    };
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    init_logging(&config.logging).map_err(anyhow::Error::msg)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        provider = config.credentials.provider_name(),
        "sii-chile"
    );

    let operation = Operation::parse(&cli.resource, &cli.operation)?;
    let items = read_items(cli.input.as_ref())?;
    let dispatcher = Dispatcher::from_config(&config)?;

    let results = dispatcher
        .run_batch(operation, &items, cli.continue_on_fail)
        .await?;

    let output = if cli.pretty {
        serde_json::to_string_pretty(&results)?
    } else {
        serde_json::to_string(&results)?
    };
    println!("{output}");
    Ok(())
}

/// Split the batch into raw items. Empty input is a single item with no
/// parameters. Items are decoded one by one when they run.
fn read_items(path: Option<&PathBuf>) -> anyhow::Result<Vec<Value>> {
    let text = match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?,
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("reading stdin")?;
            buf
        }
    };
    if text.trim().is_empty() {
        return Ok(vec![json!({})]);
    }

    let value: Value = serde_json::from_str(&text).context("input is not valid JSON")?;
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(_) => Ok(vec![value]),
        other => anyhow::bail!("expected a JSON array or object, got {other}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_positional_pair() {
        let cli = Cli::parse_from(["sii-chile", "rut", "validar"]);
        assert_eq!(cli.resource, "rut");
        assert_eq!(cli.operation, "validar");
        assert!(!cli.continue_on_fail);
    }

    #[test]
    fn parses_flags() {
        let cli = Cli::parse_from([
            "sii-chile",
            "--continue-on-fail",
            "--pretty",
            "--input",
            "items.json",
            "--log-level",
            "debug",
            "indicadores",
            "uf",
        ]);
        assert!(cli.continue_on_fail);
        assert!(cli.pretty);
        assert_eq!(cli.input, Some(PathBuf::from("items.json")));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
    }

    #[test]
    fn reads_items_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, r#"{"rut":"12.345.678-5"}"#).unwrap();
        let items = read_items(Some(&path)).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["rut"], "12.345.678-5");

        std::fs::write(&path, "  \n").unwrap();
        assert_eq!(read_items(Some(&path)).unwrap(), vec![json!({})]);

        std::fs::write(&path, "42").unwrap();
        assert!(read_items(Some(&path)).is_err());
    }

    #[test]
    fn badly_typed_item_does_not_reject_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("items.json");
        std::fs::write(&path, r#"[{"numeroRut":12345678},{"numeroRut":"abc"}]"#).unwrap();
        let items = read_items(Some(&path)).unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[1]["numeroRut"], "abc");
    }
}
