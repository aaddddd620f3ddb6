use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::core::rut::group_thousands;

/// Decimal places kept for CLP → UF conversions.
const UF_DECIMALS: u32 = 4;

/// Errors from the indicator service or conversion arithmetic.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum IndicatorError {
    /// Connection, TLS or timeout failure.
    #[error("mindicador network error: {0}")]
    Network(String),

    /// Non-2xx response.
    #[error("mindicador API error: HTTP {status}: {body}")]
    Api { status: u16, body: String },

    /// Response body did not have the expected shape.
    #[error("mindicador parse error: {0}")]
    Parse(String),

    /// The series for the requested indicator/date is empty.
    #[error("Sin datos")]
    NoData { indicator: String },

    /// Unknown indicator code, unknown conversion direction or an amount
    /// that cannot be converted.
    #[error("invalid value: {0}")]
    InvalidValue(String),
}

/// Indicators that can be queried individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Indicator {
    /// Unidad de Fomento.
    Uf,
    /// Unidad Tributaria Mensual.
    Utm,
    /// Observed USD exchange rate.
    Dolar,
    Euro,
    /// Consumer price index.
    Ipc,
}

impl Indicator {
    /// Path segment used by mindicador.cl.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Uf => "uf",
            Self::Utm => "utm",
            Self::Dolar => "dolar",
            Self::Euro => "euro",
            Self::Ipc => "ipc",
        }
    }
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Indicator {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "uf" => Ok(Self::Uf),
            "utm" => Ok(Self::Utm),
            "dolar" => Ok(Self::Dolar),
            "euro" => Ok(Self::Euro),
            "ipc" => Ok(Self::Ipc),
            other => Err(IndicatorError::InvalidValue(format!(
                "unknown indicator '{other}'"
            ))),
        }
    }
}

/// Latest observation of an indicator as reported by the summary endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSnapshot {
    #[serde(rename = "valor", with = "rust_decimal::serde::float_option", default)]
    pub value: Option<Decimal>,
    #[serde(rename = "fecha", default)]
    pub date: Option<String>,
}

/// Summary of every indicator (`GET {base}`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllIndicators {
    #[serde(rename = "fecha", default)]
    pub date: Option<String>,
    #[serde(default)]
    pub uf: IndicatorSnapshot,
    #[serde(default)]
    pub utm: IndicatorSnapshot,
    #[serde(default)]
    pub dolar: IndicatorSnapshot,
    #[serde(default)]
    pub euro: IndicatorSnapshot,
    #[serde(default)]
    pub ipc: IndicatorSnapshot,
    #[serde(default)]
    pub bitcoin: IndicatorSnapshot,
}

/// A single observation of one indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorValue {
    /// Upper-cased indicator code, e.g. `UF`.
    #[serde(rename = "indicador")]
    pub indicator: String,
    #[serde(rename = "valor", with = "rust_decimal::serde::float")]
    pub value: Decimal,
    /// ISO-8601 timestamp as reported by the service.
    #[serde(rename = "fecha")]
    pub date: String,
    /// Unit of measure (`Pesos`, `Porcentaje`, ...).
    #[serde(rename = "unidad")]
    pub unit: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConversionDirection {
    #[serde(rename = "uf_to_clp")]
    UfToClp,
    #[serde(rename = "clp_to_uf")]
    ClpToUf,
}

impl FromStr for ConversionDirection {
    type Err = IndicatorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "uf_to_clp" => Ok(Self::UfToClp),
            "clp_to_uf" => Ok(Self::ClpToUf),
            other => Err(IndicatorError::InvalidValue(format!(
                "unknown conversion direction '{other}'"
            ))),
        }
    }
}

/// Result of a UF ↔ CLP conversion.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Conversion {
    UfToClp {
        #[serde(with = "rust_decimal::serde::float")]
        uf: Decimal,
        pesos: i64,
        #[serde(rename = "valorUf", with = "rust_decimal::serde::float")]
        uf_value: Decimal,
        /// `$1.234.567`.
        #[serde(rename = "formateado")]
        formatted: String,
    },
    ClpToUf {
        #[serde(with = "rust_decimal::serde::float")]
        pesos: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        uf: Decimal,
        #[serde(rename = "valorUf", with = "rust_decimal::serde::float")]
        uf_value: Decimal,
    },
}

/// `amount` UF in pesos, rounded half-up to whole pesos.
pub fn uf_to_clp(amount: Decimal, uf_value: Decimal) -> Result<Conversion, IndicatorError> {
    let pesos = amount
        .checked_mul(uf_value)
        .map(|p| p.round_dp_with_strategy(0, rust_decimal::RoundingStrategy::MidpointAwayFromZero))
        .and_then(|p| p.to_i64())
        .ok_or_else(|| {
            IndicatorError::InvalidValue(format!("{amount} UF does not fit in whole pesos"))
        })?;
    Ok(Conversion::UfToClp {
        uf: amount,
        pesos,
        uf_value,
        formatted: format_clp(pesos),
    })
}

/// `amount` pesos in UF, rounded half-up to four decimals.
pub fn clp_to_uf(amount: Decimal, uf_value: Decimal) -> Result<Conversion, IndicatorError> {
    if uf_value <= Decimal::ZERO {
        return Err(IndicatorError::InvalidValue(format!(
            "UF value {uf_value} must be positive"
        )));
    }
    let uf = amount
        .checked_div(uf_value)
        .ok_or_else(|| IndicatorError::InvalidValue(format!("cannot convert {amount} CLP")))?
        .round_dp_with_strategy(
            UF_DECIMALS,
            rust_decimal::RoundingStrategy::MidpointAwayFromZero,
        );
    Ok(Conversion::ClpToUf {
        pesos: amount,
        uf,
        uf_value,
    })
}

/// es-CL currency rendering: `$` then the amount with `.` thousands separators.
pub fn format_clp(pesos: i64) -> String {
    let digits = pesos.unsigned_abs().to_string();
    let sign = if pesos < 0 { "-" } else { "" };
    format!("${sign}{}", group_thousands(&digits, '.'))
}
