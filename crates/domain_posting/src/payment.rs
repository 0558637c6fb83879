//! Payments and their allocations
//!
//! A payment settles a partner's open documents. The split across
//! documents is recorded as allocation rows, which are immutable once
//! written; withdrawing a payment deletes its rows rather than editing
//! them.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

use core_kernel::{AccountId, AllocationId, DocumentId, Money, PartnerId, PaymentId, TransactionId};

use domain_documents::DocumentKind;

use crate::error::PostingError;

/// Direction of a payment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentKind {
    /// Money received from a customer
    Receipt,
    /// Money paid out to a vendor
    Disbursement,
}

impl PaymentKind {
    /// The document kind this payment settles
    pub fn document_kind(&self) -> DocumentKind {
        match self {
            PaymentKind::Receipt => DocumentKind::Invoice,
            PaymentKind::Disbursement => DocumentKind::Bill,
        }
    }
}

/// A payment received or made
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    /// Unique identifier
    pub id: PaymentId,
    /// Payment number (human-readable)
    pub number: String,
    /// Payment date
    pub date: NaiveDate,
    /// Direction
    pub kind: PaymentKind,
    /// Partner the payment settles documents for
    pub partner_id: PartnerId,
    /// Cash or bank account the money moves through
    pub settlement_account_id: AccountId,
    /// Payment amount
    pub amount: Money,
    /// Whether the payment has been carried into the ledger
    pub posted: bool,
    /// The ledger transaction created by posting
    pub transaction_id: Option<TransactionId>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Creates a new unposted payment
    pub fn new(
        number: impl Into<String>,
        date: NaiveDate,
        kind: PaymentKind,
        partner_id: PartnerId,
        settlement_account_id: AccountId,
        amount: Money,
    ) -> Self {
        Self {
            id: PaymentId::new_v7(),
            number: number.into(),
            date,
            kind,
            partner_id,
            settlement_account_id,
            amount,
            posted: false,
            transaction_id: None,
            created_at: Utc::now(),
        }
    }
}

/// Whether an allocation fully settled its document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AllocationStatus {
    /// The document still has an open amount afterwards
    Partial,
    /// The allocation brought the document's open amount to zero
    Full,
}

/// One payment-to-document allocation row
///
/// Rows record the open amount before and after so the settlement history
/// can be audited without replaying every payment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Allocation {
    /// Unique identifier
    pub id: AllocationId,
    /// Payment this row belongs to
    pub payment_id: PaymentId,
    /// Kind of the document being settled
    pub document_kind: DocumentKind,
    /// Document being settled
    pub document_id: DocumentId,
    /// Amount allocated to the document
    pub amount: Money,
    /// Document's open amount before this allocation
    pub previous_open_amount: Money,
    /// Document's open amount after this allocation
    pub remaining_open_amount: Money,
    /// Full or partial settlement of the document
    pub status: AllocationStatus,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
}

/// Storage port for payments
pub trait PaymentStore: Send + Sync {
    /// Inserts a new payment
    fn insert(&self, payment: Payment) -> Result<(), PostingError>;

    /// Retrieves a payment by ID
    fn get(&self, id: PaymentId) -> Option<Payment>;

    /// Persists an updated payment
    fn save(&self, payment: Payment) -> Result<(), PostingError>;
}

/// Storage port for allocation rows
pub trait AllocationStore: Send + Sync {
    /// Inserts a batch of allocation rows
    fn insert_all(&self, allocations: Vec<Allocation>);

    /// Rows written by one payment
    fn for_payment(&self, payment_id: PaymentId) -> Vec<Allocation>;

    /// Rows settling one document, across all payments
    fn for_document(&self, document_id: DocumentId) -> Vec<Allocation>;

    /// Deletes and returns the rows written by one payment
    fn remove_for_payment(&self, payment_id: PaymentId) -> Vec<Allocation>;
}

/// In-memory payment store
#[derive(Debug, Default)]
pub struct InMemoryPaymentStore {
    payments: RwLock<HashMap<PaymentId, Payment>>,
}

impl InMemoryPaymentStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl PaymentStore for InMemoryPaymentStore {
    fn insert(&self, payment: Payment) -> Result<(), PostingError> {
        let mut payments = self.payments.write().expect("payment lock poisoned");
        if payments.contains_key(&payment.id) {
            return Err(PostingError::AlreadyPosted(payment.id.to_string()));
        }
        payments.insert(payment.id, payment);
        Ok(())
    }

    fn get(&self, id: PaymentId) -> Option<Payment> {
        self.payments
            .read()
            .expect("payment lock poisoned")
            .get(&id)
            .cloned()
    }

    fn save(&self, payment: Payment) -> Result<(), PostingError> {
        let mut payments = self.payments.write().expect("payment lock poisoned");
        if !payments.contains_key(&payment.id) {
            return Err(PostingError::PaymentNotFound(payment.id.to_string()));
        }
        payments.insert(payment.id, payment);
        Ok(())
    }
}

/// In-memory allocation store
#[derive(Debug, Default)]
pub struct InMemoryAllocationStore {
    allocations: RwLock<Vec<Allocation>>,
}

impl InMemoryAllocationStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl AllocationStore for InMemoryAllocationStore {
    fn insert_all(&self, mut rows: Vec<Allocation>) {
        self.allocations
            .write()
            .expect("allocation lock poisoned")
            .append(&mut rows);
    }

    fn for_payment(&self, payment_id: PaymentId) -> Vec<Allocation> {
        self.allocations
            .read()
            .expect("allocation lock poisoned")
            .iter()
            .filter(|a| a.payment_id == payment_id)
            .cloned()
            .collect()
    }

    fn for_document(&self, document_id: DocumentId) -> Vec<Allocation> {
        self.allocations
            .read()
            .expect("allocation lock poisoned")
            .iter()
            .filter(|a| a.document_id == document_id)
            .cloned()
            .collect()
    }

    fn remove_for_payment(&self, payment_id: PaymentId) -> Vec<Allocation> {
        let mut allocations = self.allocations.write().expect("allocation lock poisoned");
        let (removed, kept): (Vec<_>, Vec<_>) = allocations
            .drain(..)
            .partition(|a| a.payment_id == payment_id);
        *allocations = kept;
        removed
    }
}
