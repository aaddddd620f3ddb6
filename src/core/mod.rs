//! Core DTE types, RUT engine, and totals computation.
//!
//! Everything here is pure and synchronous: no I/O, no shared state.

mod builder;
mod error;
pub mod rut;
mod totals;
mod types;

pub use builder::*;
pub use error::*;
pub use rut::{CheckDigit, Rut, calculate_check_digit};
pub use totals::*;
pub use types::*;
