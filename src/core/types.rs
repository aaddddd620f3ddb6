use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::error::SiiError;
use super::rut::Rut;

/// Body of the generic "consumidor final" RUT (66.666.666-6), used when a
/// boleta has no identified buyer.
pub const ANONYMOUS_RECEPTOR_BODY: u64 = 66_666_666;

/// SII document type (TipoDTE).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub enum DocumentKind {
    /// 33: Factura electrónica.
    Factura,
    /// 34: Factura no afecta o exenta.
    FacturaExenta,
    /// 39: Boleta electrónica.
    Boleta,
    /// 41: Boleta exenta.
    BoletaExenta,
    /// 56: Nota de débito.
    NotaDebito,
    /// 61: Nota de crédito.
    NotaCredito,
}

impl DocumentKind {
    pub const ALL: [DocumentKind; 6] = [
        Self::Factura,
        Self::FacturaExenta,
        Self::Boleta,
        Self::BoletaExenta,
        Self::NotaDebito,
        Self::NotaCredito,
    ];

    /// Numeric TipoDTE code.
    pub fn code(&self) -> u16 {
        match self {
            Self::Factura => 33,
            Self::FacturaExenta => 34,
            Self::Boleta => 39,
            Self::BoletaExenta => 41,
            Self::NotaDebito => 56,
            Self::NotaCredito => 61,
        }
    }

    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            33 => Some(Self::Factura),
            34 => Some(Self::FacturaExenta),
            39 => Some(Self::Boleta),
            41 => Some(Self::BoletaExenta),
            56 => Some(Self::NotaDebito),
            61 => Some(Self::NotaCredito),
            _ => None,
        }
    }

    /// Display name used in emission results.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Factura => "Factura",
            Self::FacturaExenta => "Factura Exenta",
            Self::Boleta => "Boleta",
            Self::BoletaExenta => "Boleta Exenta",
            Self::NotaDebito => "Nota Débito",
            Self::NotaCredito => "Nota Crédito",
        }
    }

    /// Boletas quote unit prices with IVA included; everything else is net.
    pub fn prices_include_iva(&self) -> bool {
        matches!(self, Self::Boleta | Self::BoletaExenta)
    }

    /// Credit and debit notes must reference the document they amend.
    pub fn is_note(&self) -> bool {
        matches!(self, Self::NotaCredito | Self::NotaDebito)
    }

    /// Facturas and notes identify the buyer by name, activity and address.
    pub fn carries_receptor_details(&self) -> bool {
        !self.prices_include_iva()
    }

    /// Kinds a credit/debit note may reference.
    pub fn is_referenceable(&self) -> bool {
        matches!(self, Self::Factura | Self::FacturaExenta | Self::Boleta)
    }
}

impl TryFrom<u16> for DocumentKind {
    type Error = SiiError;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        Self::from_code(code).ok_or(SiiError::UnknownDocumentKind(code))
    }
}

impl From<DocumentKind> for u16 {
    fn from(kind: DocumentKind) -> Self {
        kind.code()
    }
}

/// One line of goods or services as entered by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    /// Item name (NmbItem).
    pub description: String,
    /// Must be strictly positive.
    pub quantity: Decimal,
    /// Must not be negative. Tax-inclusive for boletas, net otherwise.
    pub unit_price: Decimal,
    /// Exempt lines are carried verbatim into MntExe.
    pub exempt: bool,
    /// Percentage discount, 0 to 100.
    pub discount_percent: Option<Decimal>,
}

/// One line of the outgoing document detail section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LineDetail {
    /// NroLinDet, 1-based.
    pub line_number: u32,
    pub description: String,
    pub quantity: Decimal,
    pub unit_price: Decimal,
    pub discount_percent: Option<Decimal>,
    /// MontoItem: quantity × price less discount, whole pesos.
    pub line_amount: i64,
    pub exempt: bool,
}

/// Document-level amounts in whole pesos.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentTotals {
    /// MntNeto.
    pub net_amount: i64,
    /// MntExe.
    pub exempt_amount: i64,
    /// IVA.
    pub iva_amount: i64,
    /// MntTotal = net + IVA + exempt.
    pub total_amount: i64,
}

/// Buyer (Receptor).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Receptor {
    pub rut: Rut,
    /// RznSocRecep.
    pub business_name: Option<String>,
    /// GiroRecep.
    pub activity: Option<String>,
    /// DirRecep.
    pub address: Option<String>,
    /// CmnaRecep.
    pub commune: Option<String>,
    /// CiudadRecep.
    pub city: Option<String>,
}

impl Receptor {
    pub fn new(rut: Rut) -> Self {
        Self {
            rut,
            business_name: None,
            activity: None,
            address: None,
            commune: None,
            city: None,
        }
    }

    /// The generic final-consumer receptor, 66.666.666-6.
    pub fn anonymous() -> Self {
        Self::new(Rut::from_body(ANONYMOUS_RECEPTOR_BODY))
    }

    pub(crate) fn without_details(self) -> Self {
        Self::new(self.rut)
    }
}

/// Referenced document for credit/debit notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reference {
    /// TpoDocRef.
    pub kind: DocumentKind,
    /// FolioRef.
    pub folio: u64,
    /// RazonRef.
    pub reason: String,
}

pub const DEFAULT_REFERENCE_REASON: &str = "Anula documento";

impl Reference {
    pub fn new(kind: DocumentKind, folio: u64) -> Self {
        Self {
            kind,
            folio,
            reason: DEFAULT_REFERENCE_REASON.into(),
        }
    }

    pub fn reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = reason.into();
        self
    }
}

/// A document ready for submission to an invoicing provider.
#[derive(Debug, Clone, Serialize)]
pub struct Document {
    /// TipoDTE.
    pub kind: DocumentKind,
    /// FchEmis.
    pub issue_date: NaiveDate,
    /// RUTEmisor.
    pub issuer_rut: Rut,
    pub receptor: Receptor,
    pub items: Vec<LineItem>,
    pub reference: Option<Reference>,
    /// Computed by the builder.
    pub totals: DocumentTotals,
    /// Computed by the builder, one entry per item.
    pub detail: Vec<LineDetail>,
}
