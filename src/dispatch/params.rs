use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use super::DispatchError;
use crate::core::{DEFAULT_REFERENCE_REASON, LineItem};

/// Default `rutReceptor`: the anonymous final consumer.
pub const DEFAULT_RECEPTOR_RUT: &str = "66666666-6";

/// Parameters of one batch item. Every field is optional on the wire; each
/// operation reads the ones it needs.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ItemParams {
    pub rut: Option<String>,
    pub numero_rut: Option<u64>,
    pub tipo_dte: Option<u16>,
    pub rut_receptor: Option<String>,
    pub razon_social: Option<String>,
    pub giro: Option<String>,
    pub direccion: Option<String>,
    pub comuna: Option<String>,
    pub ciudad: Option<String>,
    pub items: ItemList,
    pub ref_tipo: Option<u16>,
    pub ref_folio: Option<u64>,
    pub ref_razon: Option<String>,
    /// `DD-MM-YYYY`; empty means today.
    pub fecha: Option<String>,
    pub direccion_conversion: Option<String>,
    pub monto_conversion: Option<Decimal>,
    pub folio_consulta: Option<u64>,
    pub tipo_consulta: Option<u16>,
}

/// Line items either as a bare list or wrapped as `{ "item": [...] }`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum ItemList {
    List(Vec<ItemParam>),
    Wrapped {
        #[serde(default)]
        item: Vec<ItemParam>,
    },
}

impl Default for ItemList {
    fn default() -> Self {
        Self::List(Vec::new())
    }
}

impl ItemList {
    pub fn as_slice(&self) -> &[ItemParam] {
        match self {
            Self::List(items) | Self::Wrapped { item: items } => items,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ItemParam {
    pub nombre: String,
    pub cantidad: Decimal,
    pub precio: Decimal,
    pub exento: bool,
    pub descuento: Option<Decimal>,
}

impl Default for ItemParam {
    fn default() -> Self {
        Self {
            nombre: String::new(),
            cantidad: Decimal::ONE,
            precio: Decimal::ZERO,
            exento: false,
            descuento: None,
        }
    }
}

impl ItemParam {
    pub fn to_line_item(&self) -> LineItem {
        LineItem {
            description: self.nombre.clone(),
            quantity: self.cantidad,
            unit_price: self.precio,
            exempt: self.exento,
            discount_percent: self.descuento.filter(|d| !d.is_zero()),
        }
    }
}

impl ItemParams {
    /// Decode one raw batch item. A badly typed field fails only this item.
    pub fn from_value(value: &Value) -> Result<Self, DispatchError> {
        Self::deserialize(value).map_err(|e| DispatchError::InvalidParameter {
            name: "item",
            message: e.to_string(),
        })
    }

    pub(crate) fn require_rut(&self) -> Result<&str, DispatchError> {
        self.rut
            .as_deref()
            .ok_or(DispatchError::MissingParameter("rut"))
    }

    pub(crate) fn receptor_rut(&self) -> &str {
        non_empty(&self.rut_receptor).unwrap_or(DEFAULT_RECEPTOR_RUT)
    }

    pub(crate) fn reference_reason(&self) -> &str {
        non_empty(&self.ref_razon).unwrap_or(DEFAULT_REFERENCE_REASON)
    }

    /// `fecha` as a date; `None` when absent or empty.
    pub(crate) fn date(&self) -> Result<Option<NaiveDate>, DispatchError> {
        match non_empty(&self.fecha) {
            None => Ok(None),
            Some(text) => NaiveDate::parse_from_str(text, "%d-%m-%Y")
                .map(Some)
                .map_err(|e| DispatchError::InvalidParameter {
                    name: "fecha",
                    message: format!("'{text}' is not DD-MM-YYYY: {e}"),
                }),
        }
    }
}

/// Empty strings count as absent, as they do in form-driven callers.
pub(crate) fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
