//! SimpleAPI REST client. Emission only.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::provider::*;
use crate::core::{Document, DocumentKind};

const PROVIDER: &str = "SimpleAPI";

/// Body of `POST /dte/emitir`.
#[derive(Debug, Serialize)]
pub struct EmitRequest {
    #[serde(rename = "TipoDTE")]
    pub kind: u16,
    #[serde(rename = "Receptor")]
    pub receptor: Receptor,
    #[serde(rename = "Detalle")]
    pub detail: Vec<DetailLine>,
    #[serde(rename = "Referencia", skip_serializing_if = "Option::is_none")]
    pub reference: Option<ReferenceSection>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Receptor {
    pub rut: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub razon_social: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub giro: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub direccion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comuna: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct DetailLine {
    pub nombre: String,
    #[serde(serialize_with = "decimal_number")]
    pub cantidad: Decimal,
    #[serde(serialize_with = "decimal_number")]
    pub precio: Decimal,
    pub exento: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ReferenceSection {
    pub tipo_documento: u16,
    pub folio: u64,
    pub razon: String,
}

pub fn build_request(document: &Document) -> EmitRequest {
    let receptor = &document.receptor;
    EmitRequest {
        kind: document.kind.code(),
        receptor: Receptor {
            rut: receptor.rut.compact(),
            razon_social: receptor.business_name.clone(),
            giro: receptor.activity.clone(),
            direccion: receptor.address.clone(),
            comuna: receptor.commune.clone(),
        },
        detail: document
            .items
            .iter()
            .map(|item| DetailLine {
                nombre: item.description.clone(),
                cantidad: item.quantity,
                precio: item.unit_price,
                exento: item.exempt,
            })
            .collect(),
        reference: document.reference.as_ref().map(|r| ReferenceSection {
            tipo_documento: r.kind.code(),
            folio: r.folio,
            razon: r.reason.clone(),
        }),
    }
}

pub struct SimpleApi {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl SimpleApi {
    pub fn new(
        api_key: SecretString,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(PROVIDER, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }
}

#[async_trait]
impl DteProvider for SimpleApi {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn emit(&self, document: &Document) -> Result<EmissionResult, ProviderError> {
        let url = format!("{}/dte/emitir", self.base_url);
        tracing::debug!(%url, kind = document.kind.code(), "emitting DTE");

        let request = self
            .http
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&build_request(document));
        let response = execute(PROVIDER, request).await?;

        let mut result = EmissionResult::new(PROVIDER, document.kind, response);
        result.folio = field(&result.response, "Folio");
        result.track_id = field(&result.response, "TrackId");
        result.pdf = field(&result.response, "Pdf");
        result.xml = field(&result.response, "Xml");
        Ok(result)
    }

    async fn query(
        &self,
        _kind: DocumentKind,
        _folio: u64,
        _query: QueryKind,
    ) -> Result<QueryResult, ProviderError> {
        Err(ProviderError::Unsupported {
            provider: PROVIDER,
            operation: "document queries",
        })
    }
}
