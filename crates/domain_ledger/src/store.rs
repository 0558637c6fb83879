//! Transaction storage port and in-memory adapter
//!
//! The journal is append-mostly: transactions enter as drafts, get audited,
//! and audited transactions only leave through the explicit unpost removal.

use chrono::NaiveDate;
use std::collections::HashMap;
use std::sync::RwLock;

use core_kernel::TransactionId;

use crate::error::LedgerError;
use crate::transaction::{LedgerTransaction, TransactionStatus};

/// Storage port for ledger transactions
pub trait TransactionStore: Send + Sync {
    /// Inserts a transaction
    ///
    /// # Errors
    ///
    /// Returns an error if a transaction with the same ID already exists.
    fn insert(&self, transaction: LedgerTransaction) -> Result<(), LedgerError>;

    /// Retrieves a transaction by ID
    fn get(&self, id: TransactionId) -> Option<LedgerTransaction>;

    /// Marks a transaction as audited, locking it
    fn mark_audited(&self, id: TransactionId) -> Result<(), LedgerError>;

    /// Removes a draft transaction
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is audited; withdrawing an
    /// audited transaction goes through [`Self::remove_audited`].
    fn remove(&self, id: TransactionId) -> Result<LedgerTransaction, LedgerError>;

    /// Removes an audited transaction when its source document or payment
    /// is withdrawn from the ledger
    ///
    /// This is the one sanctioned exit for audited transactions; there is
    /// no way to revert one to draft.
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction is still a draft.
    fn remove_audited(&self, id: TransactionId) -> Result<LedgerTransaction, LedgerError>;

    /// Returns all audited transactions dated on or before `date`
    fn audited_through(&self, date: NaiveDate) -> Vec<LedgerTransaction>;

    /// Returns all audited transactions dated within `[start, end]`
    fn audited_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<LedgerTransaction>;
}

/// In-memory transaction store
#[derive(Debug, Default)]
pub struct InMemoryTransactionStore {
    transactions: RwLock<HashMap<TransactionId, LedgerTransaction>>,
}

impl InMemoryTransactionStore {
    /// Creates an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn audited_matching(
        &self,
        predicate: impl Fn(&LedgerTransaction) -> bool,
    ) -> Vec<LedgerTransaction> {
        self.transactions
            .read()
            .expect("transaction lock poisoned")
            .values()
            .filter(|t| t.status == TransactionStatus::Audited && predicate(t))
            .cloned()
            .collect()
    }
}

impl TransactionStore for InMemoryTransactionStore {
    fn insert(&self, transaction: LedgerTransaction) -> Result<(), LedgerError> {
        let mut transactions = self
            .transactions
            .write()
            .expect("transaction lock poisoned");
        if transactions.contains_key(&transaction.id) {
            return Err(LedgerError::DuplicateTransaction(transaction.id.to_string()));
        }
        transactions.insert(transaction.id, transaction);
        Ok(())
    }

    fn get(&self, id: TransactionId) -> Option<LedgerTransaction> {
        self.transactions
            .read()
            .expect("transaction lock poisoned")
            .get(&id)
            .cloned()
    }

    fn mark_audited(&self, id: TransactionId) -> Result<(), LedgerError> {
        let mut transactions = self
            .transactions
            .write()
            .expect("transaction lock poisoned");
        let transaction = transactions
            .get_mut(&id)
            .ok_or_else(|| LedgerError::TransactionNotFound(id.to_string()))?;
        if transaction.status == TransactionStatus::Audited {
            return Err(LedgerError::TransactionAudited(id.to_string()));
        }
        transaction.status = TransactionStatus::Audited;
        Ok(())
    }

    fn remove(&self, id: TransactionId) -> Result<LedgerTransaction, LedgerError> {
        let mut transactions = self
            .transactions
            .write()
            .expect("transaction lock poisoned");
        match transactions.get(&id) {
            None => Err(LedgerError::TransactionNotFound(id.to_string())),
            Some(t) if t.status == TransactionStatus::Audited => {
                Err(LedgerError::TransactionAudited(id.to_string()))
            }
            Some(_) => Ok(transactions.remove(&id).expect("checked above")),
        }
    }

    fn remove_audited(&self, id: TransactionId) -> Result<LedgerTransaction, LedgerError> {
        let mut transactions = self
            .transactions
            .write()
            .expect("transaction lock poisoned");
        match transactions.get(&id) {
            None => Err(LedgerError::TransactionNotFound(id.to_string())),
            Some(t) if t.status == TransactionStatus::Draft => {
                Err(LedgerError::TransactionNotAudited(id.to_string()))
            }
            Some(_) => Ok(transactions.remove(&id).expect("checked above")),
        }
    }

    fn audited_through(&self, date: NaiveDate) -> Vec<LedgerTransaction> {
        self.audited_matching(|t| t.date <= date)
    }

    fn audited_between(&self, start: NaiveDate, end: NaiveDate) -> Vec<LedgerTransaction> {
        self.audited_matching(|t| t.date >= start && t.date <= end)
    }
}
