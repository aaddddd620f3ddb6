//! mindicador.cl REST client.

use std::time::Duration;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use super::model::*;

/// Public endpoint; no authentication.
pub const DEFAULT_BASE_URL: &str = "https://mindicador.cl/api";

/// `{base}/{code}` or `{base}/{code}/{DD-MM-YYYY}`.
pub fn indicator_url(base_url: &str, indicator: Indicator, date: Option<NaiveDate>) -> String {
    let base = base_url.trim_end_matches('/');
    match date {
        Some(date) => format!("{base}/{}/{}", indicator.code(), date.format("%d-%m-%Y")),
        None => format!("{base}/{}", indicator.code()),
    }
}

/// Series response for a single indicator.
#[derive(Debug, Deserialize)]
struct SeriesResponse {
    unidad_medida: Option<String>,
    #[serde(default)]
    serie: Vec<SeriesPoint>,
}

#[derive(Debug, Deserialize)]
struct SeriesPoint {
    fecha: String,
    #[serde(with = "rust_decimal::serde::float")]
    valor: Decimal,
}

pub struct IndicatorClient {
    http: reqwest::Client,
    base_url: String,
}

impl IndicatorClient {
    /// Create a client against `base_url` (normally [`DEFAULT_BASE_URL`]).
    /// Without a timeout requests wait for the server.
    pub fn new(base_url: impl Into<String>, timeout: Option<Duration>) -> Result<Self, IndicatorError> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = timeout {
            builder = builder.timeout(timeout);
        }
        let http = builder
            .build()
            .map_err(|e| IndicatorError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Latest value of every indicator.
    pub async fn all(&self) -> Result<AllIndicators, IndicatorError> {
        let url = self.base_url.trim_end_matches('/').to_string();
        self.fetch(&url).await
    }

    /// First observation of `indicator`, optionally for a specific date.
    ///
    /// # Errors
    ///
    /// `IndicatorError::NoData` when the service returns an empty series
    /// (weekends for the dollar, future dates, ...).
    pub async fn get(
        &self,
        indicator: Indicator,
        date: Option<NaiveDate>,
    ) -> Result<IndicatorValue, IndicatorError> {
        let url = indicator_url(&self.base_url, indicator, date);
        let series: SeriesResponse = self.fetch(&url).await?;
        let point = series
            .serie
            .into_iter()
            .next()
            .ok_or_else(|| IndicatorError::NoData {
                indicator: indicator.code().to_string(),
            })?;
        Ok(IndicatorValue {
            indicator: indicator.code().to_uppercase(),
            value: point.valor,
            date: point.fecha,
            unit: series.unidad_medida,
        })
    }

    /// Convert with today's UF.
    pub async fn convert(
        &self,
        direction: ConversionDirection,
        amount: Decimal,
    ) -> Result<Conversion, IndicatorError> {
        let uf = self.get(Indicator::Uf, None).await?;
        match direction {
            ConversionDirection::UfToClp => uf_to_clp(amount, uf.value),
            ConversionDirection::ClpToUf => clp_to_uf(amount, uf.value),
        }
    }

    async fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, IndicatorError> {
        tracing::debug!(url, "GET mindicador");
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| IndicatorError::Network(e.to_string()))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| IndicatorError::Network(e.to_string()))?;

        if !status.is_success() {
            return Err(IndicatorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        serde_json::from_str(&body).map_err(|e| IndicatorError::Parse(e.to_string()))
    }
}
