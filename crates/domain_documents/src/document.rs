//! Business document aggregate
//!
//! Invoices, bills, and credit notes share one aggregate with a kind
//! discriminant. A document carries declared header totals alongside its
//! line items; validation reconciles the two within a small tolerance
//! because imported documents round their headers independently.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{AccountId, Currency, DocumentId, Money, PartnerId, Rate, TransactionId};

use crate::error::DocumentError;
use crate::status::{DocumentAction, DocumentStatus};

/// Kind of business document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentKind {
    /// Sale on credit; money owed to us
    Invoice,
    /// Purchase on credit; money we owe
    Bill,
    /// Reversal of an earlier document
    CreditNote,
}

/// Settlement progress of a posted document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SettlementStatus {
    /// Nothing allocated against it yet
    Open,
    /// Partially covered by payments
    Partial,
    /// Fully covered
    Paid,
}

/// A line item on a document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItem {
    /// Item ID
    pub id: Uuid,
    /// Description
    pub description: String,
    /// General ledger account this line posts to
    pub gl_account_id: AccountId,
    /// Quantity
    pub quantity: Decimal,
    /// Unit price
    pub unit_price: Money,
    /// Net amount (quantity x unit price)
    pub amount: Money,
    /// Tax rate applied to the net amount
    pub tax_rate: Option<Rate>,
    /// Tax amount
    pub tax_amount: Money,
}

impl LineItem {
    /// Creates a line item with quantity one and no tax
    pub fn new(
        description: impl Into<String>,
        gl_account_id: AccountId,
        unit_price: Money,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            description: description.into(),
            gl_account_id,
            quantity: Decimal::ONE,
            unit_price,
            amount: unit_price,
            tax_rate: None,
            tax_amount: Money::zero(unit_price.currency()),
        }
    }

    /// Sets the quantity, recomputing the net amount
    pub fn with_quantity(mut self, quantity: Decimal) -> Self {
        self.quantity = quantity;
        self.amount = self.unit_price.multiply(quantity).round_to_currency();
        self.recompute_tax();
        self
    }

    /// Applies a tax rate, computing the tax amount
    pub fn with_tax_rate(mut self, rate: Rate) -> Self {
        self.tax_rate = Some(rate);
        self.recompute_tax();
        self
    }

    /// Gross amount of this line (net plus tax)
    pub fn total(&self) -> Money {
        self.amount + self.tax_amount
    }

    fn recompute_tax(&mut self) {
        self.tax_amount = match self.tax_rate {
            Some(rate) => rate.apply(&self.amount),
            None => Money::zero(self.amount.currency()),
        };
    }
}

/// A business document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: DocumentId,
    /// Document number (human-readable)
    pub number: String,
    /// Document kind
    pub kind: DocumentKind,
    /// Partner the document is addressed to
    pub partner_id: PartnerId,
    /// Document date
    pub date: NaiveDate,
    /// Payment due date
    pub due_date: NaiveDate,
    /// Currency
    pub currency: Currency,
    /// Line items
    pub items: Vec<LineItem>,
    /// Declared header total (net plus tax)
    pub total_amount: Money,
    /// Lifecycle status
    pub status: DocumentStatus,
    /// Settlement progress; meaningful once posted
    pub settlement: SettlementStatus,
    /// Amount settled by payment allocations
    pub settled_amount: Money,
    /// Whether the document has been carried into the ledger
    pub posted: bool,
    /// The ledger transaction created by posting
    pub transaction_id: Option<TransactionId>,
    /// Document this credit note reverses
    pub original_document: Option<DocumentId>,
    /// Reason for a credit note
    pub reason: Option<String>,
    /// Created timestamp
    pub created_at: DateTime<Utc>,
    /// Updated timestamp
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Creates a new draft document with no line items
    pub fn new(
        number: impl Into<String>,
        kind: DocumentKind,
        partner_id: PartnerId,
        date: NaiveDate,
        due_date: NaiveDate,
        currency: Currency,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: DocumentId::new_v7(),
            number: number.into(),
            kind,
            partner_id,
            date,
            due_date,
            currency,
            items: Vec::new(),
            total_amount: Money::zero(currency),
            status: DocumentStatus::Draft,
            settlement: SettlementStatus::Open,
            settled_amount: Money::zero(currency),
            posted: false,
            transaction_id: None,
            original_document: None,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Builds the credit note that reverses this document
    ///
    /// Line items are cloned with fresh IDs; the header total matches the
    /// original so the mirror transaction nets everything to zero.
    pub fn credit_note_for(
        original: &Document,
        number: impl Into<String>,
        date: NaiveDate,
        reason: impl Into<String>,
    ) -> Self {
        let mut note = Self::new(
            number,
            DocumentKind::CreditNote,
            original.partner_id,
            date,
            date,
            original.currency,
        );
        note.items = original
            .items
            .iter()
            .map(|item| LineItem {
                id: Uuid::new_v4(),
                ..item.clone()
            })
            .collect();
        note.total_amount = original.total_amount;
        note.original_document = Some(original.id);
        note.reason = Some(reason.into());
        note
    }

    /// Adds a line item, keeping the declared total in step
    ///
    /// # Errors
    ///
    /// Returns an error unless the document is a draft.
    pub fn add_item(&mut self, item: LineItem) -> Result<(), DocumentError> {
        self.status.guard(DocumentAction::Update)?;
        self.items.push(item);
        self.total_amount = self.computed_total();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Overrides the declared header total
    ///
    /// Imported documents carry their own header total, which may differ
    /// from the line sum by rounding. Validation reconciles the two.
    pub fn set_total(&mut self, total: Money) -> Result<(), DocumentError> {
        self.status.guard(DocumentAction::Update)?;
        self.total_amount = total;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Sum of line net amounts
    pub fn net_total(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(self.currency), |acc, item| acc + item.amount)
    }

    /// Sum of line tax amounts
    pub fn tax_total(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(self.currency), |acc, item| acc + item.tax_amount)
    }

    /// Sum of line gross amounts
    pub fn computed_total(&self) -> Money {
        self.items
            .iter()
            .fold(Money::zero(self.currency), |acc, item| acc + item.total())
    }

    /// Validates the draft and freezes it
    ///
    /// Checks that at least one line exists, every line is positive, and
    /// the declared total reconciles with the line sum within `tolerance`.
    pub fn validate(&mut self, tolerance: Decimal) -> Result<(), DocumentError> {
        self.status.guard(DocumentAction::Validate)?;

        if self.items.is_empty() {
            return Err(DocumentError::NoLineItems(self.number.clone()));
        }
        for item in &self.items {
            if !item.amount.is_positive() {
                return Err(DocumentError::NonPositiveLine {
                    description: item.description.clone(),
                });
            }
        }
        self.reconcile(tolerance)?;

        self.status = DocumentStatus::Validated;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Checks the declared total against the line sum
    pub fn reconcile(&self, tolerance: Decimal) -> Result<(), DocumentError> {
        let declared = self.total_amount.amount();
        let computed = self.computed_total().amount();
        if (declared - computed).abs() > tolerance {
            return Err(DocumentError::TotalMismatch {
                declared,
                computed,
                tolerance,
            });
        }
        Ok(())
    }

    /// Records that posting carried this document into the ledger
    pub fn mark_posted(&mut self, transaction_id: TransactionId) -> Result<(), DocumentError> {
        self.status.guard(DocumentAction::Post)?;
        self.status = DocumentStatus::Posted;
        self.posted = true;
        self.transaction_id = Some(transaction_id);
        self.settlement = SettlementStatus::Open;
        self.settled_amount = Money::zero(self.currency);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Withdraws the document from the ledger, back to validated
    pub fn mark_unposted(&mut self) -> Result<(), DocumentError> {
        self.status.guard(DocumentAction::Unpost)?;
        self.status = DocumentStatus::Validated;
        self.posted = false;
        self.transaction_id = None;
        self.settlement = SettlementStatus::Open;
        self.settled_amount = Money::zero(self.currency);
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Cancels the document
    pub fn cancel(&mut self) -> Result<(), DocumentError> {
        self.status.guard(DocumentAction::Cancel)?;
        self.status = DocumentStatus::Cancelled;
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Amount still unpaid
    pub fn open_amount(&self) -> Money {
        self.total_amount - self.settled_amount
    }

    /// Posted and not yet fully paid
    pub fn is_open(&self) -> bool {
        self.status == DocumentStatus::Posted && self.settlement != SettlementStatus::Paid
    }

    /// Applies a settlement amount from a payment allocation
    pub fn record_settlement(&mut self, amount: Money) -> Result<(), DocumentError> {
        let open = self.open_amount();
        if amount > open {
            return Err(DocumentError::SettlementExceedsOpen {
                number: self.number.clone(),
                amount: amount.amount(),
                open: open.amount(),
            });
        }
        self.settled_amount = self.settled_amount + amount;
        self.refresh_settlement();
        self.updated_at = Utc::now();
        Ok(())
    }

    /// Replaces the settled amount outright, e.g. after allocations were
    /// withdrawn, and recomputes the settlement status
    pub fn reset_settlement(&mut self, settled: Money) {
        self.settled_amount = settled;
        self.refresh_settlement();
        self.updated_at = Utc::now();
    }

    fn refresh_settlement(&mut self) {
        self.settlement = if self.settled_amount >= self.total_amount {
            SettlementStatus::Paid
        } else if self.settled_amount.is_positive() {
            SettlementStatus::Partial
        } else {
            SettlementStatus::Open
        };
    }
}
