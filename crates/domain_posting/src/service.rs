//! Accounting service facade
//!
//! One entry point wiring the posting engine, the allocation engine, and
//! the balance calculator over a shared set of stores. Callers hand in
//! identifiers and value objects and get typed results or a
//! [`PostingError`] back.

use std::sync::Arc;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use core_kernel::{AccountId, DocumentId, Money, PartnerId, PaymentId, SequenceGenerator, TransactionId};
use domain_documents::DocumentStore;
use domain_ledger::{
    AccountDirectory, BalanceCalculator, PartnerDirectory, TransactionStore, TrialBalance,
};

use crate::allocation::PaymentAllocationEngine;
use crate::config::PostingConfig;
use crate::engine::PostingEngine;
use crate::error::PostingError;
use crate::payment::{AllocationStore, Payment, PaymentKind, PaymentStore};

/// Facade over document posting, payment allocation, and balances
pub struct AccountingService {
    accounts: Arc<dyn AccountDirectory>,
    transactions: Arc<dyn TransactionStore>,
    posting: PostingEngine,
    allocation: PaymentAllocationEngine,
}

impl AccountingService {
    /// Wires the service over a shared set of collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        partners: Arc<dyn PartnerDirectory>,
        documents: Arc<dyn DocumentStore>,
        transactions: Arc<dyn TransactionStore>,
        payments: Arc<dyn PaymentStore>,
        allocations: Arc<dyn AllocationStore>,
        sequences: Arc<dyn SequenceGenerator>,
        config: PostingConfig,
    ) -> Self {
        let posting = PostingEngine::new(
            Arc::clone(&accounts),
            Arc::clone(&partners),
            Arc::clone(&documents),
            Arc::clone(&transactions),
            Arc::clone(&sequences),
            config.clone(),
        );
        let allocation = PaymentAllocationEngine::new(
            Arc::clone(&accounts),
            partners,
            documents,
            Arc::clone(&transactions),
            payments,
            allocations,
            sequences,
            config,
        );
        Self {
            accounts,
            transactions,
            posting,
            allocation,
        }
    }

    /// Validates a draft document and freezes it
    pub fn validate_document(&self, document_id: DocumentId) -> Result<(), PostingError> {
        self.posting.validate(document_id)
    }

    /// Posts a validated document to the ledger
    pub fn post_document(&self, document_id: DocumentId) -> Result<TransactionId, PostingError> {
        self.posting.post(document_id)
    }

    /// Withdraws a posted document from the ledger
    pub fn unpost_document(&self, document_id: DocumentId) -> Result<(), PostingError> {
        self.posting.unpost(document_id)
    }

    /// Cancels a document, reversing it first when posted
    ///
    /// Returns the credit note ID when a reversal was issued.
    pub fn cancel_document(
        &self,
        document_id: DocumentId,
        date: NaiveDate,
        reason: &str,
    ) -> Result<Option<DocumentId>, PostingError> {
        self.posting.cancel(document_id, date, reason)
    }

    /// Reverses a posted document with a credit note
    pub fn reverse_document(
        &self,
        document_id: DocumentId,
        date: NaiveDate,
        reason: &str,
    ) -> Result<(DocumentId, TransactionId), PostingError> {
        self.posting.reverse(document_id, date, reason)
    }

    /// Allocates a payment across the partner's open documents
    pub fn process_payment(
        &self,
        partner_id: PartnerId,
        amount: Money,
        settlement_account_id: AccountId,
        kind: PaymentKind,
        date: NaiveDate,
    ) -> Result<Payment, PostingError> {
        self.allocation
            .process_payment(partner_id, amount, settlement_account_id, kind, date)
    }

    /// Posts an allocated payment to the ledger
    pub fn post_payment(&self, payment_id: PaymentId) -> Result<Payment, PostingError> {
        self.allocation.post_payment(payment_id)
    }

    /// Withdraws a posted payment and restores document settlements
    pub fn unpost_payment(&self, payment_id: PaymentId) -> Result<(), PostingError> {
        self.allocation.unpost_payment(payment_id)
    }

    /// Signed balance of one account through `date`
    pub fn calculate_balance(
        &self,
        account_id: AccountId,
        date: NaiveDate,
    ) -> Result<Decimal, PostingError> {
        BalanceCalculator::new(self.accounts.as_ref(), self.transactions.as_ref())
            .balance_through(account_id, date)
            .ok_or_else(|| PostingError::AccountNotFound(account_id.to_string()))
    }

    /// Signed balances for several accounts in one pass
    pub fn calculate_balances(
        &self,
        account_ids: &[AccountId],
        date: NaiveDate,
    ) -> std::collections::HashMap<AccountId, Decimal> {
        BalanceCalculator::new(self.accounts.as_ref(), self.transactions.as_ref())
            .balances_through(account_ids, date)
    }

    /// Builds a trial balance for the period
    pub fn generate_trial_balance(&self, start: NaiveDate, end: NaiveDate) -> TrialBalance {
        BalanceCalculator::new(self.accounts.as_ref(), self.transactions.as_ref())
            .trial_balance(start, end)
    }

    /// Checks that cumulative debits equal cumulative credits through `date`
    pub fn verify_trial_balance(&self, date: NaiveDate) -> bool {
        BalanceCalculator::new(self.accounts.as_ref(), self.transactions.as_ref())
            .verify_through(date)
    }
}
