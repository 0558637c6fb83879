//! Posting domain errors
//!
//! The posting crate sits on top of the ledger and document domains, so
//! its error type absorbs theirs and adds the failures specific to
//! carrying documents and payments into the journal.

use rust_decimal::Decimal;
use thiserror::Error;

use domain_documents::{DocumentError, StatusTransitionError};
use domain_ledger::{LedgerError, ValidationError};

/// Errors from posting, reversal, and payment allocation
#[derive(Debug, Error)]
pub enum PostingError {
    /// Ledger invariant violation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Document lifecycle guard refused the action
    #[error(transparent)]
    Status(#[from] StatusTransitionError),

    /// Document-level failure
    #[error(transparent)]
    Document(#[from] DocumentError),

    /// Ledger storage failure
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    /// Payment not found
    #[error("Payment not found: {0}")]
    PaymentNotFound(String),

    /// Partner not found
    #[error("Partner not found: {0}")]
    PartnerNotFound(String),

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Partner lacks a usable control account for this posting
    #[error("Partner {partner} has no {required} control account")]
    PartnerAccountMissing { partner: String, required: String },

    /// Partner's control account exists but is of the wrong type
    #[error("Partner {partner} control account must be {expected}, got {actual}")]
    PartnerAccountTypeMismatch {
        partner: String,
        expected: String,
        actual: String,
    },

    /// Documents must carry a number before posting locks it
    #[error("Document has no number: {0}")]
    MissingDocumentNumber(String),

    /// Document or payment is already in the ledger
    #[error("Already posted: {0}")]
    AlreadyPosted(String),

    /// Operation requires a posted document or payment
    #[error("Not posted: {0}")]
    NotPosted(String),

    /// Payments must carry a strictly positive amount
    #[error("Payment amount must be positive: {0}")]
    NonPositivePayment(Decimal),

    /// Payment exceeds the partner's total open amount; nothing is written
    #[error("Payment {payment} exceeds total open amount {open}")]
    Overallocation { payment: Decimal, open: Decimal },

    /// Settled documents cannot be unposted while allocations remain
    #[error("Document {0} has payment allocations; unpost the payments first")]
    AllocationsExist(String),
}
