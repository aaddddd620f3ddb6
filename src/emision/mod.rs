//! DTE emission through third-party invoicing providers.
//!
//! The providers hold the CAF folios and the digital certificate; this
//! crate only builds the request from a [`Document`](crate::core::Document)
//! and interprets the response.
//!
//! # Example
//!
//! ```ignore
//! use sii_chile::emision::*;
//!
//! let provider = provider_from_credentials(&credentials, &ProviderEndpoints::default(), None)?
//!     .expect("credentials configured");
//! let result = provider.emit(&document).await?;
//! println!("folio {:?}", result.folio);
//! ```

mod credentials;
pub mod openfactura;
mod provider;
pub mod simpleapi;

pub use credentials::{Credentials, Environment};
pub use openfactura::OpenFactura;
pub use provider::{
    DteProvider, EmissionResult, OPENFACTURA_CERTIFICATION_URL, OPENFACTURA_PRODUCTION_URL,
    ProviderEndpoints, ProviderError, QueryKind, QueryPayload, QueryResult, SIMPLEAPI_URL,
    provider_from_credentials,
};
pub use simpleapi::SimpleApi;
