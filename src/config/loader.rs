use std::fs;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use secrecy::SecretString;

use super::{Config, ConfigError, LogFormat};
use crate::core::Rut;
use crate::emision::{Credentials, Environment};

static ENV_VAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").expect("static pattern"));

/// Load configuration from a TOML file, resolving `${VAR}` references and
/// `SII_*` overrides against the process environment.
///
/// # Errors
///
/// The file is missing or unreadable, a referenced variable is unset, the
/// TOML is malformed, or validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(ConfigError::NotFound(path.to_path_buf()));
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::debug!(path = %path.display(), "loading configuration");
    parse_config(&contents, |name| std::env::var(name).ok())
}

/// Parse configuration text with an explicit variable lookup.
pub fn parse_config<F>(contents: &str, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let contents = substitute_env_vars(contents, &lookup)?;
    let mut config: Config =
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))?;
    apply_env_overrides(&mut config, &lookup)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Defaults plus `SII_*` overrides, for hosts without a config file.
    pub fn from_env<F>(lookup: F) -> Result<Config, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Config::default();
        apply_env_overrides(&mut config, &lookup)?;
        config.validate()?;
        Ok(config)
    }
}

/// Replace `${VAR}` outside comment lines. Every missing variable is
/// reported at once.
fn substitute_env_vars<F>(input: &str, lookup: &F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut result = String::with_capacity(input.len());
    let mut missing: Vec<String> = Vec::new();

    for line in input.lines() {
        if line.trim_start().starts_with('#') {
            result.push_str(line);
            result.push('\n');
            continue;
        }

        let replaced = ENV_VAR.replace_all(line, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            match lookup(name) {
                Some(value) => value,
                None => {
                    if !missing.iter().any(|m| m == name) {
                        missing.push(name.to_string());
                    }
                    String::new()
                }
            }
        });
        result.push_str(&replaced);
        result.push('\n');
    }

    if !missing.is_empty() {
        return Err(ConfigError::MissingEnvVars(missing));
    }
    Ok(result)
}

fn apply_env_overrides<F>(config: &mut Config, lookup: &F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = lookup("SII_PROVIDER");
    let api_key = lookup("SII_API_KEY");
    let environment = lookup("SII_ENVIRONMENT");
    let issuer_rut = lookup("SII_RUT_EMISOR");

    if provider.is_some() || api_key.is_some() || environment.is_some() || issuer_rut.is_some() {
        let current = std::mem::take(&mut config.credentials);
        config.credentials =
            override_credentials(current, provider, api_key, environment, issuer_rut)?;
    }

    if let Some(level) = lookup("SII_LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = lookup("SII_LOG_FORMAT") {
        config.logging.format = match format.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "pretty" => LogFormat::Pretty,
            other => {
                return Err(ConfigError::Invalid(format!(
                    "SII_LOG_FORMAT must be json or pretty, got '{other}'"
                )));
            }
        };
    }
    if let Some(timeout) = lookup("SII_HTTP_TIMEOUT_SECONDS") {
        let seconds = timeout.parse::<u64>().map_err(|_| {
            ConfigError::Invalid(format!(
                "SII_HTTP_TIMEOUT_SECONDS must be a whole number, got '{timeout}'"
            ))
        })?;
        config.http.timeout_seconds = Some(seconds);
    }

    Ok(())
}

/// Merge overrides into the configured credentials. The provider tag may
/// change, in which case the remaining fields carry over where they apply.
fn override_credentials(
    current: Credentials,
    provider: Option<String>,
    api_key: Option<String>,
    environment: Option<String>,
    issuer_rut: Option<String>,
) -> Result<Credentials, ConfigError> {
    let provider = provider
        .map(|p| p.to_lowercase())
        .unwrap_or_else(|| current.provider_name().to_string());

    let (current_key, current_env, current_rut) = match current {
        Credentials::OpenFactura {
            api_key,
            environment,
            issuer_rut,
        } => (Some(api_key), Some(environment), Some(issuer_rut)),
        Credentials::SimpleApi {
            api_key,
            issuer_rut,
        } => (Some(api_key), None, Some(issuer_rut)),
        Credentials::LocalOnly => (None, None, None),
    };

    let api_key = api_key.map(SecretString::new).or(current_key);
    let environment = match environment {
        Some(env) => Some(
            env.parse::<Environment>()
                .map_err(|e| ConfigError::Invalid(format!("SII_ENVIRONMENT: {e}")))?,
        ),
        None => current_env,
    };
    let issuer_rut = match issuer_rut {
        Some(text) => Some(
            text.parse::<Rut>()
                .map_err(|e| ConfigError::Invalid(format!("SII_RUT_EMISOR: {e}")))?,
        ),
        None => current_rut,
    };

    let require = |what: &str| {
        ConfigError::Invalid(format!("provider '{provider}' requires credentials.{what}"))
    };

    match provider.as_str() {
        "openfactura" => Ok(Credentials::OpenFactura {
            api_key: api_key.ok_or_else(|| require("api_key"))?,
            environment: environment.unwrap_or_default(),
            issuer_rut: issuer_rut.ok_or_else(|| require("issuer_rut"))?,
        }),
        "simpleapi" => Ok(Credentials::SimpleApi {
            api_key: api_key.ok_or_else(|| require("api_key"))?,
            issuer_rut: issuer_rut.ok_or_else(|| require("issuer_rut"))?,
        }),
        "none" => Ok(Credentials::LocalOnly),
        other => Err(ConfigError::Invalid(format!(
            "unknown provider '{other}' (expected openfactura, simpleapi or none)"
        ))),
    }
}
