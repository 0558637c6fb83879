//! Journal entry lines
//!
//! An entry is one debit or credit line of a transaction. Amounts are
//! always positive; the direction carries the sign.

use serde::{Deserialize, Serialize};
use rust_decimal::Decimal;

use core_kernel::{AccountId, EntryId, Money, PartnerId};

use crate::account::AccountType;
use crate::partner::PartnerKind;

/// Direction of an entry (debit or credit)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntryDirection {
    /// Debit entry
    Debit,
    /// Credit entry
    Credit,
}

impl EntryDirection {
    /// Returns the opposite direction
    pub fn opposite(&self) -> Self {
        match self {
            EntryDirection::Debit => EntryDirection::Credit,
            EntryDirection::Credit => EntryDirection::Debit,
        }
    }
}

/// Partner attribution for a subledger entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerTag {
    /// The partner this line belongs to
    pub partner_id: PartnerId,
    /// Expected partner kind, cross-checked at validation
    pub kind: PartnerKind,
}

/// A single line in a ledger transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Entry {
    /// Unique entry identifier
    pub id: EntryId,
    /// Account to post to
    pub account_id: AccountId,
    /// Debit or credit
    pub direction: EntryDirection,
    /// Amount (always positive)
    pub amount: Money,
    /// Optional line memo
    pub memo: Option<String>,
    /// Optional partner attribution
    pub partner: Option<PartnerTag>,
}

impl Entry {
    /// Creates a new debit entry
    pub fn debit(account_id: AccountId, amount: Money) -> Self {
        Self {
            id: EntryId::new_v7(),
            account_id,
            direction: EntryDirection::Debit,
            amount,
            memo: None,
            partner: None,
        }
    }

    /// Creates a new credit entry
    pub fn credit(account_id: AccountId, amount: Money) -> Self {
        Self {
            id: EntryId::new_v7(),
            account_id,
            direction: EntryDirection::Credit,
            amount,
            memo: None,
            partner: None,
        }
    }

    /// Adds a memo to the entry
    pub fn with_memo(mut self, memo: impl Into<String>) -> Self {
        self.memo = Some(memo.into());
        self
    }

    /// Tags the entry with a partner
    pub fn with_partner(mut self, partner_id: PartnerId, kind: PartnerKind) -> Self {
        self.partner = Some(PartnerTag { partner_id, kind });
        self
    }

    /// Returns this entry's contribution to the account's signed balance
    ///
    /// Debit-normal accounts grow on debits, credit-normal accounts grow
    /// on credits.
    pub fn signed_amount(&self, account_type: AccountType) -> Decimal {
        match (account_type.is_debit_normal(), self.direction) {
            (true, EntryDirection::Debit) => self.amount.amount(),
            (true, EntryDirection::Credit) => -self.amount.amount(),
            (false, EntryDirection::Debit) => -self.amount.amount(),
            (false, EntryDirection::Credit) => self.amount.amount(),
        }
    }

    /// Creates the mirror of this entry with the direction flipped
    ///
    /// The mirror gets a fresh ID but keeps the amount, memo, and partner
    /// attribution, so a reversal touches the same subledgers.
    pub fn mirrored(&self) -> Self {
        Self {
            id: EntryId::new_v7(),
            account_id: self.account_id,
            direction: self.direction.opposite(),
            amount: self.amount,
            memo: self.memo.clone(),
            partner: self.partner,
        }
    }
}
