use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;

use super::error::SiiError;
use super::rut::Rut;
use super::totals::{build_line_detail, compute_totals};
use super::types::*;

/// Upper bound on detail lines accepted per document.
pub const MAX_LINE_ITEMS: usize = 10_000;

/// Builder for documents ready to hand to a provider.
///
/// ```
/// use rust_decimal_macros::dec;
/// use sii_chile::core::*;
///
/// let issuer: Rut = "76123456-0".parse().unwrap();
/// let doc = DocumentBuilder::new(DocumentKind::Factura, issuer)
///     .receptor(ReceptorBuilder::new("12.345.678-5".parse().unwrap())
///         .business_name("Comercial Andes SpA")
///         .build())
///     .add_item(LineItemBuilder::new("Consultoría", dec!(2), dec!(50000)).build())
///     .build()
///     .unwrap();
///
/// assert_eq!(doc.totals.net_amount, 100_000);
/// assert_eq!(doc.totals.total_amount, 119_000);
/// ```
pub struct DocumentBuilder {
    kind: DocumentKind,
    issuer_rut: Rut,
    issue_date: Option<NaiveDate>,
    receptor: Option<Receptor>,
    items: Vec<LineItem>,
    reference: Option<Reference>,
}

impl DocumentBuilder {
    pub fn new(kind: DocumentKind, issuer_rut: Rut) -> Self {
        Self {
            kind,
            issuer_rut,
            issue_date: None,
            receptor: None,
            items: Vec::new(),
            reference: None,
        }
    }

    /// Defaults to today (UTC) when not set.
    pub fn issue_date(mut self, date: NaiveDate) -> Self {
        self.issue_date = Some(date);
        self
    }

    /// Defaults to the anonymous final consumer (66.666.666-6).
    pub fn receptor(mut self, receptor: Receptor) -> Self {
        self.receptor = Some(receptor);
        self
    }

    pub fn add_item(mut self, item: LineItem) -> Self {
        self.items.push(item);
        self
    }

    pub fn items(mut self, items: impl IntoIterator<Item = LineItem>) -> Self {
        self.items.extend(items);
        self
    }

    pub fn reference(mut self, reference: Reference) -> Self {
        self.reference = Some(reference);
        self
    }

    /// Build the document, computing totals and line detail.
    pub fn build(self) -> Result<Document, SiiError> {
        if self.items.is_empty() {
            return Err(SiiError::Builder(
                "at least one line item is required".into(),
            ));
        }
        if self.items.len() > MAX_LINE_ITEMS {
            return Err(SiiError::Builder(format!(
                "document cannot have more than {MAX_LINE_ITEMS} line items"
            )));
        }

        if self.kind.is_note() && self.reference.is_none() {
            return Err(SiiError::Builder(format!(
                "{} requires a reference document",
                self.kind.name()
            )));
        }
        if let Some(reference) = &self.reference {
            if !reference.kind.is_referenceable() {
                return Err(SiiError::Builder(format!(
                    "reference must point to a factura, factura exenta or boleta, got {}",
                    reference.kind.code()
                )));
            }
        }

        let receptor = self.receptor.unwrap_or_else(Receptor::anonymous);
        let receptor = if self.kind.carries_receptor_details() {
            receptor
        } else {
            receptor.without_details()
        };

        let totals = compute_totals(self.kind, &self.items)?;
        let detail = build_line_detail(&self.items)?;

        Ok(Document {
            kind: self.kind,
            issue_date: self.issue_date.unwrap_or_else(|| Utc::now().date_naive()),
            issuer_rut: self.issuer_rut,
            receptor,
            items: self.items,
            reference: self.reference,
            totals,
            detail,
        })
    }
}

/// Builder for Receptor.
pub struct ReceptorBuilder {
    receptor: Receptor,
}

impl ReceptorBuilder {
    pub fn new(rut: Rut) -> Self {
        Self {
            receptor: Receptor::new(rut),
        }
    }

    pub fn business_name(mut self, name: impl Into<String>) -> Self {
        self.receptor.business_name = Some(name.into());
        self
    }

    pub fn activity(mut self, activity: impl Into<String>) -> Self {
        self.receptor.activity = Some(activity.into());
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.receptor.address = Some(address.into());
        self
    }

    pub fn commune(mut self, commune: impl Into<String>) -> Self {
        self.receptor.commune = Some(commune.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.receptor.city = Some(city.into());
        self
    }

    pub fn build(self) -> Receptor {
        self.receptor
    }
}

/// Builder for LineItem.
pub struct LineItemBuilder {
    description: String,
    quantity: Decimal,
    unit_price: Decimal,
    exempt: bool,
    discount_percent: Option<Decimal>,
}

impl LineItemBuilder {
    pub fn new(description: impl Into<String>, quantity: Decimal, unit_price: Decimal) -> Self {
        Self {
            description: description.into(),
            quantity,
            unit_price,
            exempt: false,
            discount_percent: None,
        }
    }

    pub fn exempt(mut self) -> Self {
        self.exempt = true;
        self
    }

    pub fn discount(mut self, percent: Decimal) -> Self {
        self.discount_percent = Some(percent);
        self
    }

    pub fn build(self) -> LineItem {
        LineItem {
            description: self.description,
            quantity: self.quantity,
            unit_price: self.unit_price,
            exempt: self.exempt,
            discount_percent: self.discount_percent,
        }
    }
}
