//! Document posting engine
//!
//! Posting carries a validated document into the ledger as one balanced
//! transaction:
//!
//! - one gross entry on the partner's control account, partner-tagged
//! - one net entry per line item on its GL account
//! - one aggregated tax entry on the configured tax account, when tax > 0
//!
//! Invoices debit the partner and credit income and tax; bills and credit
//! notes run the other way. Entry amounts come from the line items, so the
//! transaction balances exactly even when the document's declared header
//! total is off by the reconciliation tolerance.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::info;

use core_kernel::{AccountId, DocumentId, SequenceGenerator, TransactionId};
use domain_documents::{
    Document, DocumentAction, DocumentKind, DocumentStatus, DocumentStore,
};
use domain_ledger::{
    AccountDirectory, AccountType, BalanceCalculator, Entry, LedgerError, LedgerTransaction,
    LedgerValidator, Partner, PartnerDirectory, TransactionStore,
};

use crate::config::PostingConfig;
use crate::error::PostingError;

/// Posts, unposts, reverses, and cancels documents
pub struct PostingEngine {
    accounts: Arc<dyn AccountDirectory>,
    partners: Arc<dyn PartnerDirectory>,
    documents: Arc<dyn DocumentStore>,
    transactions: Arc<dyn TransactionStore>,
    sequences: Arc<dyn SequenceGenerator>,
    config: PostingConfig,
}

impl PostingEngine {
    /// Creates a posting engine over the given collaborators
    pub fn new(
        accounts: Arc<dyn AccountDirectory>,
        partners: Arc<dyn PartnerDirectory>,
        documents: Arc<dyn DocumentStore>,
        transactions: Arc<dyn TransactionStore>,
        sequences: Arc<dyn SequenceGenerator>,
        config: PostingConfig,
    ) -> Self {
        Self {
            accounts,
            partners,
            documents,
            transactions,
            sequences,
            config,
        }
    }

    /// Validates a draft document and freezes it
    pub fn validate(&self, document_id: DocumentId) -> Result<(), PostingError> {
        let mut document = self.load(document_id)?;
        document.validate(self.config.reconciliation_tolerance)?;
        self.documents.save(document)?;
        Ok(())
    }

    /// Posts a validated document, creating its ledger transaction
    ///
    /// The document's checks are re-run here even though validation already
    /// passed once: the chart or partner registry may have changed in
    /// between, and posting is the last gate before the journal.
    pub fn post(&self, document_id: DocumentId) -> Result<TransactionId, PostingError> {
        let mut document = self.load(document_id)?;
        document.status.guard(DocumentAction::Post)?;
        if document.posted {
            return Err(PostingError::AlreadyPosted(document.number.clone()));
        }
        if document.number.trim().is_empty() {
            return Err(PostingError::MissingDocumentNumber(document.id.to_string()));
        }

        let partner = self
            .partners
            .get(document.partner_id)
            .ok_or_else(|| PostingError::PartnerNotFound(document.partner_id.to_string()))?;
        let partner_account = self.resolve_partner_account(&document, &partner)?;

        if document.items.is_empty() {
            return Err(PostingError::Document(
                domain_documents::DocumentError::NoLineItems(document.number.clone()),
            ));
        }
        let item_accounts: Vec<AccountId> =
            document.items.iter().map(|i| i.gl_account_id).collect();
        let resolved = self.accounts.get_many(&item_accounts);
        for item in &document.items {
            if !resolved.contains_key(&item.gl_account_id) {
                return Err(PostingError::AccountNotFound(
                    item.gl_account_id.to_string(),
                ));
            }
        }
        document.reconcile(self.config.reconciliation_tolerance)?;

        let number = self
            .sequences
            .next_number(&self.config.voucher_prefix, document.date);
        let transaction = self
            .build_transaction(&document, &partner, partner_account)
            .numbered(number);

        self.check_against_ledger(&transaction, document.date)?;
        let transaction_id = transaction.id;
        self.transactions.insert(transaction)?;
        self.transactions.mark_audited(transaction_id)?;

        document.mark_posted(transaction_id)?;
        let number = document.number.clone();
        self.documents.save(document)?;

        info!(document = %number, transaction = %transaction_id, "document posted");
        Ok(transaction_id)
    }

    /// Withdraws a posted document from the ledger
    ///
    /// The posting transaction is deleted outright and the document returns
    /// to validated. Refused while payment allocations exist.
    pub fn unpost(&self, document_id: DocumentId) -> Result<(), PostingError> {
        let mut document = self.load(document_id)?;
        document.status.guard(DocumentAction::Unpost)?;
        if document.settled_amount.is_positive() {
            return Err(PostingError::AllocationsExist(document.number.clone()));
        }
        let transaction_id = document
            .transaction_id
            .ok_or_else(|| PostingError::NotPosted(document.number.clone()))?;

        self.transactions.remove_audited(transaction_id)?;

        document.mark_unposted()?;
        let number = document.number.clone();
        self.documents.save(document)?;

        info!(document = %number, "document unposted");
        Ok(())
    }

    /// Reverses a posted document with a credit note
    ///
    /// A mirror transaction (directions flipped, amounts identical) is
    /// posted, and a credit note referencing the original is stored already
    /// posted. The original document and its transaction stay untouched.
    pub fn reverse(
        &self,
        document_id: DocumentId,
        date: NaiveDate,
        reason: &str,
    ) -> Result<(DocumentId, TransactionId), PostingError> {
        let document = self.load(document_id)?;
        document.status.guard(DocumentAction::Reverse)?;
        let original_id = document
            .transaction_id
            .ok_or_else(|| PostingError::NotPosted(document.number.clone()))?;
        let original = self
            .transactions
            .get(original_id)
            .ok_or_else(|| LedgerError::TransactionNotFound(original_id.to_string()))?;

        let number = self.sequences.next_number(&self.config.voucher_prefix, date);
        let reversal = original
            .reversal(date, format!("Reversal of {}: {}", document.number, reason))
            .numbered(number);

        self.check_against_ledger(&reversal, date)?;
        let reversal_id = reversal.id;
        self.transactions.insert(reversal)?;
        self.transactions.mark_audited(reversal_id)?;

        let note_number = self
            .sequences
            .next_number(&self.config.credit_note_prefix, date);
        let mut note = Document::credit_note_for(&document, note_number, date, reason);
        note.validate(self.config.reconciliation_tolerance)?;
        note.mark_posted(reversal_id)?;
        let note_id = note.id;
        self.documents.insert(note)?;

        info!(
            document = %document.number,
            reversal = %reversal_id,
            "document reversed"
        );
        Ok((note_id, reversal_id))
    }

    /// Cancels a document, reversing it first when it is posted
    ///
    /// Returns the credit note's ID when a reversal was needed.
    pub fn cancel(
        &self,
        document_id: DocumentId,
        date: NaiveDate,
        reason: &str,
    ) -> Result<Option<DocumentId>, PostingError> {
        let document = self.load(document_id)?;
        document.status.guard(DocumentAction::Cancel)?;

        let note = if document.status == DocumentStatus::Posted {
            Some(self.reverse(document_id, date, reason)?.0)
        } else {
            None
        };

        let mut document = self.load(document_id)?;
        document.cancel()?;
        let number = document.number.clone();
        self.documents.save(document)?;

        info!(document = %number, "document cancelled");
        Ok(note)
    }

    fn load(&self, document_id: DocumentId) -> Result<Document, PostingError> {
        self.documents
            .get(document_id)
            .ok_or_else(|| PostingError::DocumentNotFound(document_id.to_string()))
    }

    /// The partner's control account, checked against the type the
    /// document kind requires
    fn resolve_partner_account(
        &self,
        document: &Document,
        partner: &Partner,
    ) -> Result<AccountId, PostingError> {
        let required = match document.kind {
            DocumentKind::Invoice => Some(AccountType::Asset),
            DocumentKind::Bill => Some(AccountType::Liability),
            DocumentKind::CreditNote => partner.kind.required_account_type(),
        };
        let required_name = match required {
            Some(AccountType::Asset) => "receivable",
            Some(AccountType::Liability) => "payable",
            _ => "control",
        };

        let account_id = partner
            .linked_account_id
            .ok_or_else(|| PostingError::PartnerAccountMissing {
                partner: partner.name.clone(),
                required: required_name.to_string(),
            })?;
        let account = self
            .accounts
            .get(account_id)
            .ok_or_else(|| PostingError::AccountNotFound(account_id.to_string()))?;
        if let Some(required) = required {
            if account.account_type != required {
                return Err(PostingError::PartnerAccountTypeMismatch {
                    partner: partner.name.clone(),
                    expected: format!("{required:?}"),
                    actual: format!("{:?}", account.account_type),
                });
            }
        }
        Ok(account_id)
    }

    /// Builds the posting transaction from the document's line items
    fn build_transaction(
        &self,
        document: &Document,
        partner: &Partner,
        partner_account: AccountId,
    ) -> LedgerTransaction {
        let gross = document.computed_total();
        let tax = document.tax_total();
        // Invoices debit the partner; bills and credit notes credit it
        let partner_debits = matches!(document.kind, DocumentKind::Invoice);

        let label = match document.kind {
            DocumentKind::Invoice => "Invoice",
            DocumentKind::Bill => "Bill",
            DocumentKind::CreditNote => "Credit note",
        };
        let mut transaction =
            LedgerTransaction::new(document.date, format!("{label} {}", document.number))
                .for_document(document.id);

        let partner_entry = if partner_debits {
            Entry::debit(partner_account, gross)
        } else {
            Entry::credit(partner_account, gross)
        }
        .with_partner(partner.id, partner.kind)
        .with_memo(document.number.clone());
        transaction = transaction.entry(partner_entry);

        for item in &document.items {
            let item_entry = if partner_debits {
                Entry::credit(item.gl_account_id, item.amount)
            } else {
                Entry::debit(item.gl_account_id, item.amount)
            }
            .with_memo(item.description.clone());
            transaction = transaction.entry(item_entry);
        }

        if tax.is_positive() {
            let tax_entry = if partner_debits {
                Entry::credit(self.config.tax_account_id, tax)
            } else {
                Entry::debit(self.config.tax_account_id, tax)
            }
            .with_memo(format!("Tax on {}", document.number));
            transaction = transaction.entry(tax_entry);
        }

        transaction
    }

    /// Runs structural validation plus the negative-balance guard against
    /// balances as of the transaction date
    fn check_against_ledger(
        &self,
        transaction: &LedgerTransaction,
        date: NaiveDate,
    ) -> Result<(), PostingError> {
        let mut involved: Vec<AccountId> =
            transaction.entries.iter().map(|e| e.account_id).collect();
        involved.sort_unstable();
        involved.dedup();

        let calculator =
            BalanceCalculator::new(self.accounts.as_ref(), self.transactions.as_ref());
        let balances = calculator.balances_through(&involved, date);

        let validator = LedgerValidator::new(self.accounts.as_ref(), self.partners.as_ref());
        validator.validate_with_balances(transaction, &balances)?;
        Ok(())
    }
}
