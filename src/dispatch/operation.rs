use std::fmt;
use std::str::FromStr;

use super::DispatchError;
use crate::core::DocumentKind;
use crate::emision::QueryKind;
use crate::indicadores::Indicator;

/// Top-level operation group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Emitir,
    Rut,
    Indicadores,
    Consultar,
}

impl Resource {
    pub const ALL: [Resource; 4] = [
        Self::Emitir,
        Self::Rut,
        Self::Indicadores,
        Self::Consultar,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Emitir => "emitir",
            Self::Rut => "rut",
            Self::Indicadores => "indicadores",
            Self::Consultar => "consultar",
        }
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Resource {
    type Err = DispatchError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|r| r.as_str() == s)
            .ok_or_else(|| DispatchError::UnknownResource(s.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EmitOperation {
    Boleta,
    Factura,
    NotaCredito,
    NotaDebito,
}

impl EmitOperation {
    /// Document type used when the item does not name one.
    pub fn default_kind(&self) -> DocumentKind {
        match self {
            Self::Boleta => DocumentKind::Boleta,
            Self::Factura => DocumentKind::Factura,
            Self::NotaCredito => DocumentKind::NotaCredito,
            Self::NotaDebito => DocumentKind::NotaDebito,
        }
    }

    /// Document types this operation may issue.
    pub fn accepted_kinds(&self) -> &'static [DocumentKind] {
        match self {
            Self::Boleta => &[DocumentKind::Boleta, DocumentKind::BoletaExenta],
            Self::Factura => &[DocumentKind::Factura, DocumentKind::FacturaExenta],
            Self::NotaCredito => &[DocumentKind::NotaCredito],
            Self::NotaDebito => &[DocumentKind::NotaDebito],
        }
    }

    pub fn accepts(&self, kind: DocumentKind) -> bool {
        self.accepted_kinds().contains(&kind)
    }

    pub fn is_note(&self) -> bool {
        matches!(self, Self::NotaCredito | Self::NotaDebito)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RutOperation {
    Validar,
    Formatear,
    Limpiar,
    CalcularDv,
    GenerarAleatorio,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndicatorOperation {
    Todos,
    Single(Indicator),
    Convertir,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryOperation {
    EstadoDte,
    DescargarPdf,
    DescargarXml,
}

impl QueryOperation {
    pub fn query_kind(&self) -> QueryKind {
        match self {
            Self::EstadoDte => QueryKind::Status,
            Self::DescargarPdf => QueryKind::Pdf,
            Self::DescargarXml => QueryKind::Xml,
        }
    }
}

/// Every supported (resource, operation) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Emitir(EmitOperation),
    Rut(RutOperation),
    Indicadores(IndicatorOperation),
    Consultar(QueryOperation),
}

const TABLE: &[(&str, Operation)] = &[
    ("emitirBoleta", Operation::Emitir(EmitOperation::Boleta)),
    ("emitirFactura", Operation::Emitir(EmitOperation::Factura)),
    ("emitirNotaCredito", Operation::Emitir(EmitOperation::NotaCredito)),
    ("emitirNotaDebito", Operation::Emitir(EmitOperation::NotaDebito)),
    ("validar", Operation::Rut(RutOperation::Validar)),
    ("formatear", Operation::Rut(RutOperation::Formatear)),
    ("limpiar", Operation::Rut(RutOperation::Limpiar)),
    ("calcularDv", Operation::Rut(RutOperation::CalcularDv)),
    ("generarAleatorio", Operation::Rut(RutOperation::GenerarAleatorio)),
    ("todos", Operation::Indicadores(IndicatorOperation::Todos)),
    ("uf", Operation::Indicadores(IndicatorOperation::Single(Indicator::Uf))),
    ("utm", Operation::Indicadores(IndicatorOperation::Single(Indicator::Utm))),
    ("dolar", Operation::Indicadores(IndicatorOperation::Single(Indicator::Dolar))),
    ("euro", Operation::Indicadores(IndicatorOperation::Single(Indicator::Euro))),
    ("ipc", Operation::Indicadores(IndicatorOperation::Single(Indicator::Ipc))),
    ("convertir", Operation::Indicadores(IndicatorOperation::Convertir)),
    ("estadoDte", Operation::Consultar(QueryOperation::EstadoDte)),
    ("descargarPdf", Operation::Consultar(QueryOperation::DescargarPdf)),
    ("descargarXml", Operation::Consultar(QueryOperation::DescargarXml)),
];

impl Operation {
    /// Look up the operation `name` within `resource`.
    ///
    /// # Errors
    ///
    /// `DispatchError::UnknownOperation` when the pair is not in the table,
    /// including names that exist under a different resource.
    pub fn resolve(resource: Resource, name: &str) -> Result<Self, DispatchError> {
        TABLE
            .iter()
            .find(|(op_name, op)| *op_name == name && op.resource() == resource)
            .map(|(_, op)| *op)
            .ok_or_else(|| DispatchError::UnknownOperation {
                resource: resource.as_str().to_string(),
                operation: name.to_string(),
            })
    }

    /// [`resolve`](Self::resolve) from two strings.
    pub fn parse(resource: &str, name: &str) -> Result<Self, DispatchError> {
        Self::resolve(resource.parse()?, name)
    }

    pub fn resource(&self) -> Resource {
        match self {
            Self::Emitir(_) => Resource::Emitir,
            Self::Rut(_) => Resource::Rut,
            Self::Indicadores(_) => Resource::Indicadores,
            Self::Consultar(_) => Resource::Consultar,
        }
    }

    /// Wire name, e.g. `emitirBoleta`.
    pub fn name(&self) -> &'static str {
        TABLE
            .iter()
            .find(|(_, op)| op == self)
            .map(|(name, _)| *name)
            .unwrap_or("unknown")
    }

    /// All operations in table order.
    pub fn all() -> impl Iterator<Item = Operation> {
        TABLE.iter().map(|(_, op)| *op)
    }

    /// Operations that talk to an invoicing provider.
    pub fn needs_credentials(&self) -> bool {
        matches!(self, Self::Emitir(_) | Self::Consultar(_))
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.resource(), self.name())
    }
}
