//! Payment allocation engine
//!
//! Payments settle a partner's open documents first-in-first-out: the
//! oldest open document absorbs as much of the payment as it can, then the
//! next, until the payment is used up. A payment larger than the partner's
//! total open amount is refused outright; nothing is written.
//!
//! Callers serialize allocation per partner. The engine stages every
//! mutation and persists only after all checks pass, so a failed run
//! leaves no partial writes.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::{debug, info};

use core_kernel::{AccountId, AllocationId, Money, PartnerId, PaymentId, SequenceGenerator};
use domain_documents::DocumentStore;
use domain_ledger::{
    AccountDirectory, BalanceCalculator, Entry, LedgerTransaction, LedgerValidator,
    PartnerDirectory, TransactionStore,
};

use crate::config::PostingConfig;
use crate::error::PostingError;
use crate::payment::{
    Allocation, AllocationStatus, AllocationStore, Payment, PaymentKind, PaymentStore,
};

/// Allocates payments across open documents and posts them
pub struct PaymentAllocationEngine {
    accounts: Arc<dyn AccountDirectory>,
    partners: Arc<dyn PartnerDirectory>,
    documents: Arc<dyn DocumentStore>,
    transactions: Arc<dyn TransactionStore>,
    payments: Arc<dyn PaymentStore>,
    allocations: Arc<dyn AllocationStore>,
    sequences: Arc<dyn SequenceGenerator>,
    config: PostingConfig,
}

impl PaymentAllocationEngine {
    /// Creates an allocation engine over the given collaborators
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
        Self {
            accounts,
            partners,
            documents,
            transactions,
            payments,
            allocations,
            sequences,
            config,
        }
    }

    /// Allocates a payment across the partner's open documents, oldest first
    ///
    /// Each document absorbs `min(remaining, open)`. Every allocation row
    /// records the document's open amount before and after, and whether it
    /// settled the document in full. The payment is stored unposted;
    /// [`Self::post_payment`] carries it into the ledger.
    ///
    /// # Errors
    ///
    /// Returns `NonPositivePayment` for a zero or negative amount, and
    /// `Overallocation` when the payment exceeds the partner's total open
    /// amount. Neither writes anything.
    pub fn process_payment(
        &self,
        partner_id: PartnerId,
        amount: Money,
        settlement_account_id: AccountId,
        kind: PaymentKind,
        date: NaiveDate,
    ) -> Result<Payment, PostingError> {
        if !amount.is_positive() {
            return Err(PostingError::NonPositivePayment(amount.amount()));
        }
        let partner = self
            .partners
            .get(partner_id)
            .ok_or_else(|| PostingError::PartnerNotFound(partner_id.to_string()))?;
        self.accounts
            .get(settlement_account_id)
            .ok_or_else(|| PostingError::AccountNotFound(settlement_account_id.to_string()))?;

        let mut open_documents = self
            .documents
            .open_for_partner(partner_id, kind.document_kind());
        let total_open: Decimal = open_documents
            .iter()
            .map(|d| d.open_amount().amount())
            .sum();
        if amount.amount() > total_open {
            return Err(PostingError::Overallocation {
                payment: amount.amount(),
                open: total_open,
            });
        }

        let number = self
            .sequences
            .next_number(&self.config.payment_prefix, date);
        let payment = Payment::new(
            number,
            date,
            kind,
            partner_id,
            settlement_account_id,
            amount,
        );

        // Stage the FIFO walk; nothing is persisted until it completes
        let mut rows = Vec::new();
        let mut remaining = amount;
        for document in &mut open_documents {
            if remaining.is_zero() {
                break;
            }
            let open = document.open_amount();
            let slice = Money::new(remaining.amount().min(open.amount()), amount.currency());
            document.record_settlement(slice)?;
            remaining = remaining - slice;

            debug!(
                payment = %payment.number,
                document = %document.number,
                amount = %slice.amount(),
                "allocated"
            );
            rows.push(Allocation {
                id: AllocationId::new_v7(),
                payment_id: payment.id,
                document_kind: document.kind,
                document_id: document.id,
                amount: slice,
                previous_open_amount: open,
                remaining_open_amount: open - slice,
                status: if document.open_amount().is_zero() {
                    AllocationStatus::Full
                } else {
                    AllocationStatus::Partial
                },
                created_at: Utc::now(),
            });
        }

        let touched = rows.len();
        self.payments.insert(payment.clone())?;
        self.allocations.insert_all(rows);
        for document in open_documents.into_iter().take(touched) {
            self.documents.save(document)?;
        }

        info!(
            payment = %payment.number,
            partner = %partner.name,
            amount = %amount.amount(),
            documents = touched,
            "payment allocated"
        );
        Ok(payment)
    }

    /// Posts an allocated payment to the ledger
    ///
    /// One settlement-account entry for the full amount, and one
    /// partner-account entry per allocation in the opposite direction, so
    /// the subledger shows which documents the money settled.
    pub fn post_payment(&self, payment_id: PaymentId) -> Result<Payment, PostingError> {
        let mut payment = self
            .payments
            .get(payment_id)
            .ok_or_else(|| PostingError::PaymentNotFound(payment_id.to_string()))?;
        if payment.posted {
            return Err(PostingError::AlreadyPosted(payment.number.clone()));
        }

        let partner = self
            .partners
            .get(payment.partner_id)
            .ok_or_else(|| PostingError::PartnerNotFound(payment.partner_id.to_string()))?;
        let partner_account =
            partner
                .linked_account_id
                .ok_or_else(|| PostingError::PartnerAccountMissing {
                    partner: partner.name.clone(),
                    required: "control".to_string(),
                })?;
        let rows = self.allocations.for_payment(payment_id);

        // Receipts debit the settlement account and credit the partner;
        // disbursements run the other way.
        let receipt = payment.kind == PaymentKind::Receipt;
        let mut transaction = LedgerTransaction::new(
            payment.date,
            format!("Payment {}", payment.number),
        )
        .numbered(
            self.sequences
                .next_number(&self.config.voucher_prefix, payment.date),
        );

        let settlement_entry = if receipt {
            Entry::debit(payment.settlement_account_id, payment.amount)
        } else {
            Entry::credit(payment.settlement_account_id, payment.amount)
        }
        .with_memo(payment.number.clone());
        transaction = transaction.entry(settlement_entry);

        for row in &rows {
            let partner_entry = if receipt {
                Entry::credit(partner_account, row.amount)
            } else {
                Entry::debit(partner_account, row.amount)
            }
            .with_partner(partner.id, partner.kind)
            .with_memo(format!("Settles {}", row.document_id));
            transaction = transaction.entry(partner_entry);
        }

        let mut involved: Vec<AccountId> =
            transaction.entries.iter().map(|e| e.account_id).collect();
        involved.sort_unstable();
        involved.dedup();
        let calculator =
            BalanceCalculator::new(self.accounts.as_ref(), self.transactions.as_ref());
        let balances = calculator.balances_through(&involved, payment.date);
        LedgerValidator::new(self.accounts.as_ref(), self.partners.as_ref())
            .validate_with_balances(&transaction, &balances)?;

        let transaction_id = transaction.id;
        self.transactions.insert(transaction)?;
        self.transactions.mark_audited(transaction_id)?;

        payment.posted = true;
        payment.transaction_id = Some(transaction_id);
        self.payments.save(payment.clone())?;

        info!(payment = %payment.number, transaction = %transaction_id, "payment posted");
        Ok(payment)
    }

    /// Withdraws a posted payment
    ///
    /// Deletes the payment's transaction and allocation rows, then
    /// recomputes each affected document's settlement from the rows that
    /// remain, so allocations from other payments stay intact.
    pub fn unpost_payment(&self, payment_id: PaymentId) -> Result<(), PostingError> {
        let mut payment = self
            .payments
            .get(payment_id)
            .ok_or_else(|| PostingError::PaymentNotFound(payment_id.to_string()))?;
        let transaction_id = payment
            .transaction_id
            .ok_or_else(|| PostingError::NotPosted(payment.number.clone()))?;

        self.transactions.remove_audited(transaction_id)?;

        let removed = self.allocations.remove_for_payment(payment_id);
        for row in &removed {
            let mut document = self.documents.get(row.document_id).ok_or_else(|| {
                PostingError::DocumentNotFound(row.document_id.to_string())
            })?;
            let settled: Decimal = self
                .allocations
                .for_document(row.document_id)
                .iter()
                .map(|a| a.amount.amount())
                .sum();
            document.reset_settlement(Money::new(settled, document.currency));
            self.documents.save(document)?;
        }

        payment.posted = false;
        payment.transaction_id = None;
        let number = payment.number.clone();
        self.payments.save(payment)?;

        info!(payment = %number, rows = removed.len(), "payment unposted");
        Ok(())
    }
}
