//! # sii-chile
//!
//! Chilean electronic tax documents (DTE) and RUT utilities: modulo-11 check
//! digits, canonical RUT formatting, boleta/factura totals, emission through
//! OpenFactura or SimpleAPI, and UF/UTM indicators from mindicador.cl.
//!
//! All currency arithmetic uses [`rust_decimal::Decimal`] and is rounded
//! half-up to whole pesos, never floating point.
//!
//! ## Quick Start
//!
//! ```rust
//! use rust_decimal_macros::dec;
//! use sii_chile::core::*;
//!
//! let check = rut::validate("12.345.678-5");
//! assert!(check.valid);
//! assert_eq!(check.canonical.as_deref(), Some("12.345.678-5"));
//!
//! let items = [LineItemBuilder::new("Café", dec!(1), dec!(1190)).build()];
//! let totals = compute_totals(DocumentKind::Boleta, &items).unwrap();
//! assert_eq!(totals.net_amount, 1000);
//! assert_eq!(totals.iva_amount, 190);
//! assert_eq!(totals.total_amount, 1190);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | RUT engine, DTE totals, document builder |
//! | `indicadores` | mindicador.cl client, UF ↔ CLP conversion |
//! | `emision` | OpenFactura / SimpleAPI providers, credentials |
//! | `dispatch` | (resource, operation) batch dispatcher, TOML config |
//! | `cli` | `sii-chile` binary, structured logging |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "indicadores")]
pub mod indicadores;

#[cfg(feature = "emision")]
pub mod emision;

#[cfg(feature = "dispatch")]
pub mod config;

#[cfg(feature = "dispatch")]
pub mod dispatch;

#[cfg(feature = "cli")]
pub mod logging;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
