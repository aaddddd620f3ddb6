//! Economic indicators from mindicador.cl and UF ↔ CLP conversion.
//!
//! # Example
//!
//! ```ignore
//! use sii_chile::indicadores::*;
//!
//! let client = IndicatorClient::new(DEFAULT_BASE_URL, None)?;
//! let uf = client.get(Indicator::Uf, None).await?;
//! let conversion = client.convert(ConversionDirection::UfToClp, dec!(2.5)).await?;
//! ```
//!
//! The conversion arithmetic is exposed separately ([`uf_to_clp`],
//! [`clp_to_uf`]) so it can be used with a UF value obtained elsewhere.

mod client;
mod model;

pub use client::{DEFAULT_BASE_URL, IndicatorClient, indicator_url};
pub use model::{
    AllIndicators, Conversion, ConversionDirection, Indicator, IndicatorError, IndicatorSnapshot,
    IndicatorValue, clp_to_uf, format_clp, uf_to_clp,
};
