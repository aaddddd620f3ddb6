//! OpenFactura (Haulmer) REST client.

use std::time::Duration;

use async_trait::async_trait;
use rust_decimal::Decimal;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::provider::*;
use crate::core::{Document, DocumentKind, IVA_PERCENT, Rut};

const PROVIDER: &str = "OpenFactura";

/// Placeholder business name when the receptor has none.
pub const DEFAULT_BUSINESS_NAME: &str = "Sin Razón Social";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Body of `POST /dte/document`.
#[derive(Debug, Serialize)]
pub struct EmitRequest {
    /// Artifacts OpenFactura should return.
    pub response: [&'static str; 3],
    pub dte: Dte,
}

#[derive(Debug, Serialize)]
pub struct Dte {
    #[serde(rename = "Encabezado")]
    pub header: Header,
    #[serde(rename = "Detalle")]
    pub detail: Vec<DetailLine>,
    #[serde(rename = "Referencia", skip_serializing_if = "Option::is_none")]
    pub references: Option<Vec<ReferenceLine>>,
}

#[derive(Debug, Serialize)]
pub struct Header {
    #[serde(rename = "IdDoc")]
    pub id_doc: IdDoc,
    #[serde(rename = "Emisor")]
    pub issuer: Issuer,
    #[serde(rename = "Receptor")]
    pub receptor: ReceptorSection,
    #[serde(rename = "Totales")]
    pub totals: TotalsSection,
}

#[derive(Debug, Serialize)]
pub struct IdDoc {
    #[serde(rename = "TipoDTE")]
    pub kind: u16,
    #[serde(rename = "FchEmis")]
    pub issue_date: String,
}

#[derive(Debug, Serialize)]
pub struct Issuer {
    #[serde(rename = "RUTEmisor")]
    pub rut: String,
}

#[derive(Debug, Serialize)]
pub struct ReceptorSection {
    #[serde(rename = "RUTRecep")]
    pub rut: String,
    #[serde(rename = "RznSocRecep")]
    pub business_name: String,
    #[serde(rename = "GiroRecep", skip_serializing_if = "Option::is_none")]
    pub activity: Option<String>,
    #[serde(rename = "DirRecep", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(rename = "CmnaRecep", skip_serializing_if = "Option::is_none")]
    pub commune: Option<String>,
    #[serde(rename = "CiudadRecep", skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TotalsSection {
    #[serde(rename = "MntNeto")]
    pub net: i64,
    #[serde(rename = "MntExe", skip_serializing_if = "Option::is_none")]
    pub exempt: Option<i64>,
    #[serde(rename = "TasaIVA")]
    pub iva_rate: u32,
    #[serde(rename = "IVA")]
    pub iva: i64,
    #[serde(rename = "MntTotal")]
    pub total: i64,
}

#[derive(Debug, Serialize)]
pub struct DetailLine {
    #[serde(rename = "NroLinDet")]
    pub line_number: u32,
    #[serde(rename = "NmbItem")]
    pub name: String,
    #[serde(rename = "QtyItem", serialize_with = "decimal_number")]
    pub quantity: Decimal,
    #[serde(rename = "PrcItem", serialize_with = "decimal_number")]
    pub price: Decimal,
    #[serde(rename = "MontoItem")]
    pub amount: i64,
    #[serde(rename = "IndExe", skip_serializing_if = "Option::is_none")]
    pub exempt_indicator: Option<u8>,
    #[serde(
        rename = "DescuentoPct",
        serialize_with = "decimal_number_opt",
        skip_serializing_if = "Option::is_none"
    )]
    pub discount_percent: Option<Decimal>,
}

#[derive(Debug, Serialize)]
pub struct ReferenceLine {
    #[serde(rename = "NroLinRef")]
    pub line_number: u32,
    #[serde(rename = "TpoDocRef")]
    pub kind: u16,
    #[serde(rename = "FolioRef")]
    pub folio: u64,
    #[serde(rename = "FchRef")]
    pub date: String,
    #[serde(rename = "RazonRef")]
    pub reason: String,
    /// 1 = anula documento de referencia.
    #[serde(rename = "CodRef")]
    pub code: u8,
}

/// Map a built document onto the OpenFactura request body.
pub fn build_request(document: &Document) -> EmitRequest {
    let receptor = &document.receptor;
    let totals = &document.totals;
    let issue_date = document.issue_date.format(DATE_FORMAT).to_string();

    let detail = document
        .detail
        .iter()
        .map(|line| DetailLine {
            line_number: line.line_number,
            name: line.description.clone(),
            quantity: line.quantity,
            price: line.unit_price,
            amount: line.line_amount,
            exempt_indicator: line.exempt.then_some(1),
            discount_percent: line.discount_percent.filter(|d| !d.is_zero()),
        })
        .collect();

    let references = document.reference.as_ref().map(|reference| {
        vec![ReferenceLine {
            line_number: 1,
            kind: reference.kind.code(),
            folio: reference.folio,
            date: issue_date.clone(),
            reason: reference.reason.clone(),
            code: 1,
        }]
    });

    EmitRequest {
        response: ["PDF", "FOLIO", "TIMBRE"],
        dte: Dte {
            header: Header {
                id_doc: IdDoc {
                    kind: document.kind.code(),
                    issue_date,
                },
                issuer: Issuer {
                    rut: document.issuer_rut.compact(),
                },
                receptor: ReceptorSection {
                    rut: receptor.rut.compact(),
                    business_name: receptor
                        .business_name
                        .clone()
                        .filter(|name| !name.is_empty())
                        .unwrap_or_else(|| DEFAULT_BUSINESS_NAME.to_string()),
                    activity: receptor.activity.clone(),
                    address: receptor.address.clone(),
                    commune: receptor.commune.clone(),
                    city: receptor.city.clone(),
                },
                totals: TotalsSection {
                    net: totals.net_amount,
                    exempt: (totals.exempt_amount != 0).then_some(totals.exempt_amount),
                    iva_rate: IVA_PERCENT,
                    iva: totals.iva_amount,
                    total: totals.total_amount,
                },
            },
            detail,
            references,
        },
    }
}

pub struct OpenFactura {
    http: reqwest::Client,
    base_url: String,
    api_key: SecretString,
    issuer_rut: Rut,
}

impl OpenFactura {
    pub fn new(
        api_key: SecretString,
        issuer_rut: Rut,
        base_url: &str,
        timeout: Option<Duration>,
    ) -> Result<Self, ProviderError> {
        Ok(Self {
            http: http_client(PROVIDER, timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            issuer_rut,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl DteProvider for OpenFactura {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn emit(&self, document: &Document) -> Result<EmissionResult, ProviderError> {
        let body = build_request(document);
        let url = format!("{}/dte/document", self.base_url);
        tracing::debug!(%url, kind = document.kind.code(), "emitting DTE");

        let request = self
            .http
            .post(&url)
            .header("apikey", self.api_key.expose_secret())
            .json(&body);
        let response = execute(PROVIDER, request).await?;

        let mut result = EmissionResult::new(PROVIDER, document.kind, response);
        result.folio = field(&result.response, "FOLIO");
        result.total = Some(document.totals.total_amount);
        result.pdf = field(&result.response, "PDF");
        result.timbre = field(&result.response, "TIMBRE");
        result.self_service_url = field(&result.response, "SELF_SERVICE");
        Ok(result)
    }

    async fn query(
        &self,
        kind: DocumentKind,
        folio: u64,
        query: QueryKind,
    ) -> Result<QueryResult, ProviderError> {
        let url = format!(
            "{}/dte/document/{}/{}/{}",
            self.base_url,
            self.issuer_rut.compact(),
            kind.code(),
            folio
        );
        tracing::debug!(%url, query = query.as_str(), "querying DTE");

        let request = self
            .http
            .get(&url)
            .header("apikey", self.api_key.expose_secret());
        let response = execute(PROVIDER, request).await?;

        let missing = |key: &str| ProviderError::Parse {
            provider: PROVIDER,
            message: format!("response has no {key} field"),
        };
        let payload = match query {
            QueryKind::Status => QueryPayload::Status(response),
            QueryKind::Pdf => QueryPayload::Pdf(field(&response, "PDF").ok_or_else(|| missing("PDF"))?),
            QueryKind::Xml => QueryPayload::Xml(field(&response, "XML").ok_or_else(|| missing("XML"))?),
        };
        Ok(QueryResult {
            folio,
            kind: kind.code(),
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    fn boleta() -> Document {
        DocumentBuilder::new(DocumentKind::Boleta, Rut::from_body(76_123_456))
            .issue_date(NaiveDate::from_ymd_opt(2024, 6, 15).unwrap())
            .add_item(LineItemBuilder::new("Café", dec!(2), dec!(1190)).build())
            .build()
            .unwrap()
    }

    #[test]
    fn boleta_request_defaults() {
        let body = serde_json::to_value(build_request(&boleta())).unwrap();
        let header = &body["dte"]["Encabezado"];
        assert_eq!(body["response"], serde_json::json!(["PDF", "FOLIO", "TIMBRE"]));
        assert_eq!(header["IdDoc"]["TipoDTE"], 39);
        assert_eq!(header["IdDoc"]["FchEmis"], "2024-06-15");
        assert_eq!(header["Emisor"]["RUTEmisor"], "76123456-0");
        assert_eq!(header["Receptor"]["RUTRecep"], "66666666-6");
        assert_eq!(header["Receptor"]["RznSocRecep"], DEFAULT_BUSINESS_NAME);
        assert!(header["Receptor"].get("GiroRecep").is_none());
        assert!(header["Totales"].get("MntExe").is_none());
        assert_eq!(header["Totales"]["MntTotal"], 2380);
        assert!(body["dte"].get("Referencia").is_none());
    }

    #[test]
    fn detail_marks_exempt_and_discount() {
        let doc = DocumentBuilder::new(DocumentKind::Factura, Rut::from_body(76_123_456))
            .add_item(
                LineItemBuilder::new("Servicio", dec!(1), dec!(10000))
                    .discount(dec!(5))
                    .build(),
            )
            .add_item(LineItemBuilder::new("Libro", dec!(1), dec!(15000)).exempt().build())
            .build()
            .unwrap();
        let body = serde_json::to_value(build_request(&doc)).unwrap();
        let detail = &body["dte"]["Detalle"];
        assert_eq!(detail[0]["MontoItem"], 9500);
        assert_eq!(detail[0]["DescuentoPct"], 5);
        assert!(detail[0].get("IndExe").is_none());
        assert_eq!(detail[1]["IndExe"], 1);
        assert_eq!(body["dte"]["Encabezado"]["Totales"]["MntExe"], 15000);
    }

    #[test]
    fn credit_note_carries_reference() {
        let doc = DocumentBuilder::new(DocumentKind::NotaCredito, Rut::from_body(76_123_456))
            .issue_date(NaiveDate::from_ymd_opt(2024, 7, 1).unwrap())
            .add_item(LineItemBuilder::new("Devolución", dec!(1), dec!(5000)).build())
            .reference(Reference::new(DocumentKind::Factura, 881).reason("Error en monto"))
            .build()
            .unwrap();
        let body = serde_json::to_value(build_request(&doc)).unwrap();
        let reference = &body["dte"]["Referencia"][0];
        assert_eq!(reference["NroLinRef"], 1);
        assert_eq!(reference["TpoDocRef"], 33);
        assert_eq!(reference["FolioRef"], 881);
        assert_eq!(reference["FchRef"], "2024-07-01");
        assert_eq!(reference["RazonRef"], "Error en monto");
        assert_eq!(reference["CodRef"], 1);
    }
}
