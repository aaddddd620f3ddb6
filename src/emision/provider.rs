use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;
use thiserror::Error;

use super::credentials::{Credentials, Environment};
use super::openfactura::OpenFactura;
use super::simpleapi::SimpleApi;
use crate::core::{Document, DocumentKind};

pub const OPENFACTURA_PRODUCTION_URL: &str = "https://api.openfactura.cl/v1";
pub const OPENFACTURA_CERTIFICATION_URL: &str = "https://dev-api.haulmer.com/v1";
pub const SIMPLEAPI_URL: &str = "https://api.simpleapi.cl/api/v1";

/// Errors from an invoicing provider.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProviderError {
    /// Connection, TLS or timeout failure.
    #[error("{provider} network error: {message}")]
    Network {
        provider: &'static str,
        message: String,
    },

    /// Non-2xx response; the body is kept verbatim.
    #[error("{provider} API error: HTTP {status}: {body}")]
    Api {
        provider: &'static str,
        status: u16,
        body: String,
    },

    /// Response body was not JSON or lacked a required field.
    #[error("{provider} parse error: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },

    /// The provider has no endpoint for this operation.
    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: &'static str,
        operation: &'static str,
    },
}

/// What to fetch for an already issued document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryKind {
    Status,
    Pdf,
    Xml,
}

impl QueryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Status => "status",
            Self::Pdf => "pdf",
            Self::Xml => "xml",
        }
    }
}

/// Outcome of a successful emission.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmissionResult {
    pub success: bool,
    pub provider: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folio: Option<Value>,
    #[serde(rename = "tipo")]
    pub kind: u16,
    #[serde(rename = "tipoNombre")]
    pub kind_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timbre: Option<Value>,
    #[serde(rename = "urlAutoservicio", skip_serializing_if = "Option::is_none")]
    pub self_service_url: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub track_id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub xml: Option<Value>,
    /// Full provider response.
    pub response: Value,
}

impl EmissionResult {
    pub(crate) fn new(provider: &'static str, kind: DocumentKind, response: Value) -> Self {
        Self {
            success: true,
            provider,
            folio: None,
            kind: kind.code(),
            kind_name: kind.name(),
            total: None,
            pdf: None,
            timbre: None,
            self_service_url: None,
            track_id: None,
            xml: None,
            response,
        }
    }
}

/// Payload of a query, keyed by what was asked for.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum QueryPayload {
    #[serde(rename = "estado")]
    Status(Value),
    #[serde(rename = "pdf")]
    Pdf(Value),
    #[serde(rename = "xml")]
    Xml(Value),
}

/// Outcome of a successful query: `{ folio, tipo, estado | pdf | xml }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QueryResult {
    pub folio: u64,
    #[serde(rename = "tipo")]
    pub kind: u16,
    #[serde(flatten)]
    pub payload: QueryPayload,
}

/// An invoicing service that signs, numbers and files documents with SII.
#[async_trait]
pub trait DteProvider: Send + Sync {
    /// Display name used in results and logs.
    fn name(&self) -> &'static str;

    /// Submit a built document.
    async fn emit(&self, document: &Document) -> Result<EmissionResult, ProviderError>;

    /// Look up an issued document by type and folio.
    async fn query(
        &self,
        kind: DocumentKind,
        folio: u64,
        query: QueryKind,
    ) -> Result<QueryResult, ProviderError>;
}

/// Base URLs of every provider, overridable for testing or proxies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderEndpoints {
    pub openfactura_production: String,
    pub openfactura_certification: String,
    pub simpleapi: String,
}

impl Default for ProviderEndpoints {
    fn default() -> Self {
        Self {
            openfactura_production: OPENFACTURA_PRODUCTION_URL.into(),
            openfactura_certification: OPENFACTURA_CERTIFICATION_URL.into(),
            simpleapi: SIMPLEAPI_URL.into(),
        }
    }
}

impl ProviderEndpoints {
    pub fn openfactura(&self, environment: Environment) -> &str {
        match environment {
            Environment::Production => &self.openfactura_production,
            Environment::Certification => &self.openfactura_certification,
        }
    }
}

/// Create the provider selected by `credentials`.
///
/// Returns `Ok(None)` for [`Credentials::LocalOnly`].
pub fn provider_from_credentials(
    credentials: &Credentials,
    endpoints: &ProviderEndpoints,
    timeout: Option<Duration>,
) -> Result<Option<Box<dyn DteProvider>>, ProviderError> {
    match credentials {
        Credentials::OpenFactura {
            api_key,
            environment,
            issuer_rut,
        } => {
            tracing::info!(environment = ?environment, "Creating OpenFactura provider");
            let provider = OpenFactura::new(
                copy_secret(api_key),
                *issuer_rut,
                endpoints.openfactura(*environment),
                timeout,
            )?;
            Ok(Some(Box::new(provider)))
        }
        Credentials::SimpleApi {
            api_key,
            issuer_rut: _,
        } => {
            tracing::info!("Creating SimpleAPI provider");
            let provider = SimpleApi::new(copy_secret(api_key), &endpoints.simpleapi, timeout)?;
            Ok(Some(Box::new(provider)))
        }
        Credentials::LocalOnly => Ok(None),
    }
}

fn copy_secret(secret: &SecretString) -> SecretString {
    SecretString::new(secret.expose_secret().clone())
}

pub(crate) fn http_client(
    provider: &'static str,
    timeout: Option<Duration>,
) -> Result<reqwest::Client, ProviderError> {
    let mut builder = reqwest::Client::builder();
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    builder.build().map_err(|e| ProviderError::Network {
        provider,
        message: e.to_string(),
    })
}

/// Send a prepared request and decode a JSON body, mapping failures the same
/// way for every provider.
pub(crate) async fn execute(
    provider: &'static str,
    request: reqwest::RequestBuilder,
) -> Result<Value, ProviderError> {
    let resp = request.send().await.map_err(|e| ProviderError::Network {
        provider,
        message: e.to_string(),
    })?;

    let status = resp.status();
    let body = resp.text().await.map_err(|e| ProviderError::Network {
        provider,
        message: e.to_string(),
    })?;
    tracing::debug!(provider, status = status.as_u16(), "provider response");

    if !status.is_success() {
        return Err(ProviderError::Api {
            provider,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| ProviderError::Parse {
        provider,
        message: e.to_string(),
    })
}

/// Non-null field of a JSON object.
pub(crate) fn field(response: &Value, key: &str) -> Option<Value> {
    response.get(key).filter(|v| !v.is_null()).cloned()
}

/// Decimals go out as JSON numbers: integers when they have no fractional
/// part, floats otherwise.
pub(crate) fn decimal_number<S: Serializer>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error> {
    let normalized = value.normalize();
    if normalized.scale() == 0 {
        if let Some(int) = normalized.to_i64() {
            return serializer.serialize_i64(int);
        }
    }
    match normalized.to_f64() {
        Some(float) => serializer.serialize_f64(float),
        None => Err(serde::ser::Error::custom(format!(
            "{value} cannot be represented as a JSON number"
        ))),
    }
}

pub(crate) fn decimal_number_opt<S: Serializer>(
    value: &Option<Decimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => decimal_number(value, serializer),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[derive(Serialize)]
    struct Wrapper {
        #[serde(serialize_with = "decimal_number")]
        value: Decimal,
    }

    fn render(value: Decimal) -> String {
        serde_json::to_string(&Wrapper { value }).unwrap()
    }

    #[test]
    fn integral_decimals_serialize_as_integers() {
        assert_eq!(render(dec!(2)), r#"{"value":2}"#);
        assert_eq!(render(dec!(1190.00)), r#"{"value":1190}"#);
    }

    #[test]
    fn fractional_decimals_serialize_as_floats() {
        assert_eq!(render(dec!(1.5)), r#"{"value":1.5}"#);
    }

    #[test]
    fn query_result_flattens_payload() {
        let result = QueryResult {
            folio: 42,
            kind: 39,
            payload: QueryPayload::Status(serde_json::json!({"ESTADO": "ACEPTADO"})),
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["folio"], 42);
        assert_eq!(json["tipo"], 39);
        assert_eq!(json["estado"]["ESTADO"], "ACEPTADO");
    }

    #[test]
    fn emission_result_omits_missing_fields() {
        let result = EmissionResult::new("SimpleAPI", DocumentKind::Boleta, Value::Null);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["tipoNombre"], "Boleta");
        assert!(json.get("folio").is_none());
        assert!(json.get("urlAutoservicio").is_none());
    }

    #[test]
    fn local_only_has_no_provider() {
        let provider =
            provider_from_credentials(&Credentials::LocalOnly, &ProviderEndpoints::default(), None)
                .unwrap();
        assert!(provider.is_none());
    }

    #[test]
    fn endpoints_follow_environment() {
        let endpoints = ProviderEndpoints::default();
        assert_eq!(
            endpoints.openfactura(Environment::Production),
            OPENFACTURA_PRODUCTION_URL
        );
        assert_eq!(
            endpoints.openfactura(Environment::Certification),
            OPENFACTURA_CERTIFICATION_URL
        );
    }
}
