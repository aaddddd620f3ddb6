use thiserror::Error;

/// Errors that can occur while building documents or computing totals.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SiiError {
    /// A numeric input is out of range (negative price, zero quantity, ...).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A value failed a structural or check-digit rule.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Builder encountered invalid or missing configuration.
    #[error("builder error: {0}")]
    Builder(String),

    /// Amount overflowed or could not be represented in whole pesos.
    #[error("arithmetic error: {0}")]
    Arithmetic(String),

    /// Numeric TipoDTE code not in the supported set.
    #[error("unsupported document type {0}")]
    UnknownDocumentKind(u16),
}

/// A single validation finding with field path and message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Path to the offending field (e.g. "totals.iva_amount").
    pub field: String,
    /// Human-readable error description.
    pub message: String,
    /// SII element name the finding refers to, if any (e.g. "MntTotal").
    pub rule: Option<String>,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(rule) = &self.rule {
            write!(f, "[{}] {}: {}", rule, self.field, self.message)
        } else {
            write!(f, "{}: {}", self.field, self.message)
        }
    }
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: None,
        }
    }

    pub fn with_rule(
        field: impl Into<String>,
        message: impl Into<String>,
        rule: impl Into<String>,
    ) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            rule: Some(rule.into()),
        }
    }
}
