//! Ledger transactions
//!
//! A transaction groups the debit and credit entries of one business event.
//! It starts as a draft, receives a voucher number when accepted into the
//! journal, and becomes immutable once audited.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use core_kernel::{AccountId, DocumentId, Money, TransactionId};

use crate::entry::{Entry, EntryDirection};

/// Lifecycle status of a transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Editable and deletable
    Draft,
    /// Locked into the journal; only reversible
    Audited,
}

/// A double-entry transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerTransaction {
    /// Unique identifier
    pub id: TransactionId,
    /// Voucher number, assigned when the transaction is accepted
    pub number: Option<String>,
    /// Accounting date
    pub date: NaiveDate,
    /// Description of the business event
    pub description: String,
    /// Lifecycle status
    pub status: TransactionStatus,
    /// Debit and credit lines
    pub entries: Vec<Entry>,
    /// Source document that produced this transaction, if any
    pub source_document: Option<DocumentId>,
    /// Transaction this one reverses, if any
    pub reverses: Option<TransactionId>,
    /// When the transaction was created
    pub created_at: DateTime<Utc>,
}

impl LedgerTransaction {
    /// Creates a new draft transaction with no entries
    pub fn new(date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            id: TransactionId::new_v7(),
            number: None,
            date,
            description: description.into(),
            status: TransactionStatus::Draft,
            entries: Vec::new(),
            source_document: None,
            reverses: None,
            created_at: Utc::now(),
        }
    }

    /// Sets the voucher number
    pub fn numbered(mut self, number: impl Into<String>) -> Self {
        self.number = Some(number.into());
        self
    }

    /// Records the source document
    pub fn for_document(mut self, document_id: DocumentId) -> Self {
        self.source_document = Some(document_id);
        self
    }

    /// Adds a debit entry
    pub fn debit(mut self, account_id: AccountId, amount: Money) -> Self {
        self.entries.push(Entry::debit(account_id, amount));
        self
    }

    /// Adds a credit entry
    pub fn credit(mut self, account_id: AccountId, amount: Money) -> Self {
        self.entries.push(Entry::credit(account_id, amount));
        self
    }

    /// Adds a custom entry
    pub fn entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Sum of all debit amounts
    pub fn debit_total(&self) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.direction == EntryDirection::Debit)
            .map(|e| e.amount.amount())
            .sum()
    }

    /// Sum of all credit amounts
    pub fn credit_total(&self) -> Decimal {
        self.entries
            .iter()
            .filter(|e| e.direction == EntryDirection::Credit)
            .map(|e| e.amount.amount())
            .sum()
    }

    /// Checks exact decimal equality of debit and credit totals
    pub fn is_balanced(&self) -> bool {
        self.debit_total() == self.credit_total()
    }

    /// Returns true if the transaction is still a draft
    pub fn is_draft(&self) -> bool {
        self.status == TransactionStatus::Draft
    }

    /// Builds the reversing transaction: same entries, directions flipped
    ///
    /// The reversal starts as an unnumbered draft and records which
    /// transaction it undoes.
    pub fn reversal(&self, date: NaiveDate, description: impl Into<String>) -> Self {
        Self {
            id: TransactionId::new_v7(),
            number: None,
            date,
            description: description.into(),
            status: TransactionStatus::Draft,
            entries: self.entries.iter().map(Entry::mirrored).collect(),
            source_document: self.source_document,
            reverses: Some(self.id),
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_kernel::Currency;
    use rust_decimal_macros::dec;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    #[test]
    fn test_builder_and_totals() {
        let a = AccountId::new();
        let b = AccountId::new();

        let txn = LedgerTransaction::new(date(), "Office supplies")
            .debit(a, Money::new(dec!(120), Currency::USD))
            .credit(b, Money::new(dec!(120), Currency::USD));

        assert_eq!(txn.debit_total(), dec!(120));
        assert_eq!(txn.credit_total(), dec!(120));
        assert!(txn.is_balanced());
        assert!(txn.is_draft());
    }

    #[test]
    fn test_unbalanced_detection() {
        let txn = LedgerTransaction::new(date(), "Lopsided")
            .debit(AccountId::new(), Money::new(dec!(100), Currency::USD))
            .credit(AccountId::new(), Money::new(dec!(90), Currency::USD));

        assert!(!txn.is_balanced());
    }

    #[test]
    fn test_reversal_mirrors_entries() {
        let a = AccountId::new();
        let b = AccountId::new();
        let txn = LedgerTransaction::new(date(), "Sale")
            .debit(a, Money::new(dec!(500), Currency::USD))
            .credit(b, Money::new(dec!(500), Currency::USD));

        let reversal = txn.reversal(date(), "Reversal of sale");

        assert_eq!(reversal.reverses, Some(txn.id));
        assert_eq!(reversal.entries.len(), 2);
        assert_eq!(reversal.debit_total(), txn.credit_total());
        assert_eq!(reversal.credit_total(), txn.debit_total());
        assert_eq!(reversal.entries[0].direction, EntryDirection::Credit);
        assert_eq!(reversal.entries[0].account_id, a);
        assert!(reversal.is_balanced());
    }
}
