//! Batch dispatcher: runs one (resource, operation) pair over a list of items.
//!
//! The pair is resolved against a static table before any item runs, so a
//! typo fails the whole batch up front. Items run sequentially; with
//! continue-on-fail a failing item yields `{"error": "<message>"}` and the
//! batch goes on, otherwise the first error is returned.
//!
//! ```ignore
//! use sii_chile::dispatch::*;
//!
//! let dispatcher = Dispatcher::from_config(&config)?;
//! let op = Operation::parse("rut", "validar")?;
//! let items = vec![serde_json::json!({ "rut": "12.345.678-5" })];
//! let results = dispatcher.run_batch(op, &items, false).await?;
//! ```

mod operation;
mod params;

use rust_decimal::Decimal;
use serde_json::{Value, json};
use thiserror::Error;

use crate::config::{Config, ConfigError};
use crate::core::{
    DocumentBuilder, DocumentKind, Receptor, ReceptorBuilder, Reference, Rut, SiiError, rut,
};
use crate::emision::{DteProvider, ProviderError, provider_from_credentials};
use crate::indicadores::{ConversionDirection, IndicatorClient, IndicatorError};

pub use operation::{
    EmitOperation, IndicatorOperation, Operation, QueryOperation, Resource, RutOperation,
};
pub use params::{DEFAULT_RECEPTOR_RUT, ItemList, ItemParam, ItemParams};

use params::non_empty;

/// Document types accepted by `consultar`.
const QUERYABLE_KINDS: [DocumentKind; 4] = [
    DocumentKind::Boleta,
    DocumentKind::BoletaExenta,
    DocumentKind::Factura,
    DocumentKind::FacturaExenta,
];

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DispatchError {
    #[error("unknown resource '{0}'")]
    UnknownResource(String),

    #[error("unknown operation '{operation}' for resource '{resource}'")]
    UnknownOperation { resource: String, operation: String },

    /// `emitir` and `consultar` need provider credentials.
    #[error("Configura credenciales de OpenFactura o SimpleAPI para {action}")]
    MissingCredentials { action: &'static str },

    #[error("missing parameter '{0}'")]
    MissingParameter(&'static str),

    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter { name: &'static str, message: String },

    #[error(transparent)]
    Document(#[from] SiiError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Indicator(#[from] IndicatorError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Provider plus the issuer it emits for.
struct Emitter {
    provider: Box<dyn DteProvider>,
    issuer_rut: Rut,
}

pub struct Dispatcher {
    indicators: IndicatorClient,
    emitter: Option<Emitter>,
}

impl Dispatcher {
    /// A dispatcher limited to local operations and public indicators.
    pub fn new(indicators: IndicatorClient) -> Self {
        Self {
            indicators,
            emitter: None,
        }
    }

    /// Enable `emitir` and `consultar` through `provider`.
    pub fn with_provider(mut self, provider: Box<dyn DteProvider>, issuer_rut: Rut) -> Self {
        self.emitter = Some(Emitter {
            provider,
            issuer_rut,
        });
        self
    }

    pub fn from_config(config: &Config) -> Result<Self, DispatchError> {
        let timeout = config.http.timeout();
        let indicators = IndicatorClient::new(&config.endpoints.mindicador, timeout)?;
        let mut dispatcher = Self::new(indicators);

        let provider =
            provider_from_credentials(&config.credentials, &config.endpoints.providers, timeout)?;
        if let (Some(provider), Some(issuer_rut)) = (provider, config.credentials.issuer_rut()) {
            dispatcher = dispatcher.with_provider(provider, *issuer_rut);
        }
        Ok(dispatcher)
    }

    pub fn has_provider(&self) -> bool {
        self.emitter.is_some()
    }

    /// Run `operation` for every item in order. Each raw item is decoded on
    /// its own, so a badly typed field fails only that item.
    ///
    /// # Errors
    ///
    /// Without `continue_on_fail`, the first failing item's error.
    #[tracing::instrument(skip(self, operation, items), fields(operation = %operation, items = items.len()))]
    pub async fn run_batch(
        &self,
        operation: Operation,
        items: &[Value],
        continue_on_fail: bool,
    ) -> Result<Vec<Value>, DispatchError> {
        tracing::info!("running batch");
        let mut results = Vec::with_capacity(items.len());
        for (index, raw) in items.iter().enumerate() {
            let outcome = match ItemParams::from_value(raw) {
                Ok(params) => self.run_item(operation, &params).await,
                Err(e) => Err(e),
            };
            match outcome {
                Ok(value) => results.push(value),
                Err(e) if continue_on_fail => {
                    tracing::warn!(item = index, error = %e, "item failed, continuing");
                    results.push(json!({ "error": e.to_string() }));
                }
                Err(e) => {
                    tracing::error!(item = index, error = %e, "item failed");
                    return Err(e);
                }
            }
        }
        Ok(results)
    }

    /// Run `operation` for a single item.
    pub async fn run_item(
        &self,
        operation: Operation,
        params: &ItemParams,
    ) -> Result<Value, DispatchError> {
        match operation {
            Operation::Rut(op) => run_rut(op, params),
            Operation::Indicadores(op) => self.run_indicator(op, params).await,
            Operation::Emitir(op) => self.run_emit(op, params).await,
            Operation::Consultar(op) => self.run_query(op, params).await,
        }
    }

    async fn run_indicator(
        &self,
        op: IndicatorOperation,
        params: &ItemParams,
    ) -> Result<Value, DispatchError> {
        match op {
            IndicatorOperation::Todos => to_json(&self.indicators.all().await?),
            IndicatorOperation::Single(indicator) => {
                let value = self.indicators.get(indicator, params.date()?).await?;
                to_json(&value)
            }
            IndicatorOperation::Convertir => {
                let direction = match non_empty(&params.direccion_conversion) {
                    Some(text) => text.parse()?,
                    None => ConversionDirection::UfToClp,
                };
                let amount: Decimal = params
                    .monto_conversion
                    .ok_or(DispatchError::MissingParameter("montoConversion"))?;
                to_json(&self.indicators.convert(direction, amount).await?)
            }
        }
    }

    async fn run_emit(&self, op: EmitOperation, params: &ItemParams) -> Result<Value, DispatchError> {
        let emitter = self.emitter.as_ref().ok_or(DispatchError::MissingCredentials {
            action: "emitir DTEs",
        })?;

        let kind = match params.tipo_dte {
            Some(code) => DocumentKind::try_from(code)?,
            None => op.default_kind(),
        };
        if !op.accepts(kind) {
            return Err(DispatchError::InvalidParameter {
                name: "tipoDte",
                message: format!(
                    "{} issues types {}, got {}",
                    op_name(op),
                    op.accepted_kinds()
                        .iter()
                        .map(|k| k.code().to_string())
                        .collect::<Vec<_>>()
                        .join(", "),
                    kind.code()
                ),
            });
        }

        let mut builder = DocumentBuilder::new(kind, emitter.issuer_rut)
            .receptor(build_receptor(kind, params)?)
            .items(params.items.as_slice().iter().map(|item| item.to_line_item()));

        if op.is_note() {
            let ref_kind = DocumentKind::try_from(params.ref_tipo.unwrap_or(33))?;
            builder = builder.reference(
                Reference::new(ref_kind, params.ref_folio.unwrap_or(0))
                    .reason(params.reference_reason()),
            );
        }

        let document = builder.build()?;
        tracing::debug!(
            provider = emitter.provider.name(),
            kind = kind.code(),
            total = document.totals.total_amount,
            "emitting document"
        );
        to_json(&emitter.provider.emit(&document).await?)
    }

    async fn run_query(
        &self,
        op: QueryOperation,
        params: &ItemParams,
    ) -> Result<Value, DispatchError> {
        let emitter = self.emitter.as_ref().ok_or(DispatchError::MissingCredentials {
            action: "consultar DTEs",
        })?;

        let folio = params
            .folio_consulta
            .filter(|folio| *folio > 0)
            .ok_or(DispatchError::MissingParameter("folioConsulta"))?;
        let kind = DocumentKind::try_from(params.tipo_consulta.unwrap_or(39))?;
        if !QUERYABLE_KINDS.contains(&kind) {
            return Err(DispatchError::InvalidParameter {
                name: "tipoConsulta",
                message: format!("documents of type {} cannot be queried", kind.code()),
            });
        }

        let result = emitter
            .provider
            .query(kind, folio, op.query_kind())
            .await?;
        to_json(&result)
    }
}

fn run_rut(op: RutOperation, params: &ItemParams) -> Result<Value, DispatchError> {
    let value = match op {
        RutOperation::Validar => {
            let check = rut::validate(params.require_rut()?);
            match (check.canonical, check.check_digit) {
                (Some(canonical), Some(dv)) => json!({
                    "valido": check.valid,
                    "rut": canonical,
                    "dv": dv,
                    "mensaje": check.message,
                }),
                _ => json!({ "valido": false, "error": check.message }),
            }
        }
        RutOperation::Formatear => {
            let formatted = rut::format(params.require_rut()?);
            json!({
                "original": formatted.original,
                "formateado": formatted.canonical,
                "sinFormato": formatted.cleaned,
            })
        }
        RutOperation::Limpiar => {
            let parts = rut::strip(params.require_rut()?);
            json!({
                "original": parts.original,
                "limpio": parts.cleaned,
                "cuerpo": parts.body,
                "dv": parts.check_digit,
            })
        }
        RutOperation::CalcularDv => {
            let body = params
                .numero_rut
                .ok_or(DispatchError::MissingParameter("numeroRut"))?;
            computed_json(rut::compute_for_body(body))
        }
        RutOperation::GenerarAleatorio => computed_json(rut::generate_random()),
    };
    Ok(value)
}

fn computed_json(computed: rut::RutComputed) -> Value {
    json!({
        "numero": computed.body,
        "dv": computed.check_digit,
        "rut": computed.combined,
        "formateado": computed.canonical,
    })
}

fn build_receptor(kind: DocumentKind, params: &ItemParams) -> Result<Receptor, DispatchError> {
    let rut: Rut = params.receptor_rut().parse()?;
    if !kind.carries_receptor_details() {
        return Ok(Receptor::new(rut));
    }
    let mut builder = ReceptorBuilder::new(rut);
    if let Some(name) = non_empty(&params.razon_social) {
        builder = builder.business_name(name);
    }
    if let Some(giro) = non_empty(&params.giro) {
        builder = builder.activity(giro);
    }
    if let Some(address) = non_empty(&params.direccion) {
        builder = builder.address(address);
    }
    if let Some(commune) = non_empty(&params.comuna) {
        builder = builder.commune(commune);
    }
    if let Some(city) = non_empty(&params.ciudad) {
        builder = builder.city(city);
    }
    Ok(builder.build())
}

fn op_name(op: EmitOperation) -> &'static str {
    Operation::Emitir(op).name()
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value, DispatchError> {
    serde_json::to_value(value).map_err(|e| DispatchError::InvalidParameter {
        name: "result",
        message: e.to_string(),
    })
}
