//! Document domain errors

use rust_decimal::Decimal;
use thiserror::Error;

use crate::status::StatusTransitionError;

/// Errors from document construction, validation, and storage
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Lifecycle guard refused the action
    #[error(transparent)]
    Transition(#[from] StatusTransitionError),

    /// A document needs at least one line item
    #[error("Document has no line items: {0}")]
    NoLineItems(String),

    /// Quantities and unit prices must be strictly positive
    #[error("Line item '{description}' has a non-positive amount")]
    NonPositiveLine { description: String },

    /// Declared total does not reconcile with the line item sum
    #[error("Declared total {declared} does not match line sum {computed} (tolerance {tolerance})")]
    TotalMismatch {
        declared: Decimal,
        computed: Decimal,
        tolerance: Decimal,
    },

    /// Document not found in the store
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Document ID already present in the store
    #[error("Document already exists: {0}")]
    DuplicateDocument(String),

    /// Settlement would exceed the document total
    #[error("Settlement {amount} exceeds open amount {open} on document {number}")]
    SettlementExceedsOpen {
        number: String,
        amount: Decimal,
        open: Decimal,
    },
}
