//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Violations of the double-entry invariants, checked in order before a
/// transaction is accepted into the journal.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A transaction needs at least one debit and one credit
    #[error("Transaction needs at least two entries, got {count}")]
    TooFewEntries { count: usize },

    /// Entry amounts must be strictly positive; direction carries the sign
    #[error("Entry amount must be positive: {amount} on account {account}")]
    NonPositiveAmount { account: String, amount: Decimal },

    /// Referenced account does not exist
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Referenced account has been deactivated
    #[error("Account is inactive: {code} {name}")]
    InactiveAccount { code: String, name: String },

    /// Summary accounts cannot carry postings directly
    #[error("Cannot post to non-leaf account: {code} {name}")]
    NonLeafAccount { code: String, name: String },

    /// Total debits do not equal total credits
    #[error("Unbalanced transaction: debits={debit_total}, credits={credit_total}, difference={difference}")]
    Imbalance {
        debit_total: Decimal,
        credit_total: Decimal,
        difference: Decimal,
    },

    /// Referenced partner does not exist
    #[error("Partner not found: {0}")]
    PartnerNotFound(String),

    /// Entry tagged with a partner of the wrong kind
    #[error("Partner kind mismatch for {partner}: expected {expected}, got {actual}")]
    PartnerKindMismatch {
        partner: String,
        expected: String,
        actual: String,
    },

    /// Partner-tagged entry posted to an account other than the partner's
    /// linked subledger account
    #[error("Partner {partner} is not linked to account {account}")]
    PartnerAccountMismatch { partner: String, account: String },

    /// Asset accounts may never go below zero
    #[error("Transaction would drive asset account {code} negative: balance {current}, after {projected}")]
    NegativeAssetBalance {
        code: String,
        current: Decimal,
        projected: Decimal,
    },
}

/// Errors from ledger storage and transaction lifecycle operations
#[derive(Debug, Error)]
pub enum LedgerError {
    /// Invariant violation detected during validation
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Account code or ID already registered
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    /// Account not registered in the chart
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Partner already registered
    #[error("Partner already exists: {0}")]
    PartnerAlreadyExists(String),

    /// Transaction not found in the journal
    #[error("Transaction not found: {0}")]
    TransactionNotFound(String),

    /// Transaction ID already present in the journal
    #[error("Transaction already exists: {0}")]
    DuplicateTransaction(String),

    /// Audited transactions are immutable and undeletable
    #[error("Transaction is already audited: {0}")]
    TransactionAudited(String),

    /// Draft-only operation attempted on the wrong status
    #[error("Transaction is not audited: {0}")]
    TransactionNotAudited(String),
}
