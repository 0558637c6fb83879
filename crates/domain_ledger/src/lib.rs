//! Ledger Domain - Double-Entry Journal
//!
//! This crate implements the general ledger: a chart of accounts, business
//! partners with subledger links, balanced transactions, invariant
//! validation, and derived balances.
//!
//! # Double-Entry Accounting Principles
//!
//! Every transaction creates balanced debits and credits:
//! - Debits increase asset/expense accounts
//! - Credits increase liability/equity/income accounts
//! - The sum of all debits must exactly equal the sum of all credits
//!
//! # Lifecycle
//!
//! Transactions enter the journal as drafts and become immutable once
//! audited. Audited transactions are never edited or deleted in place;
//! corrections go through mirror-image reversals.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{LedgerTransaction, LedgerValidator};
//!
//! let txn = LedgerTransaction::new(date, "Cash sale")
//!     .debit(cash_account, amount)
//!     .credit(income_account, amount);
//!
//! let validator = LedgerValidator::new(&chart, &partners);
//! validator.validate(&txn)?;
//! ```

pub mod account;
pub mod partner;
pub mod entry;
pub mod transaction;
pub mod store;
pub mod validator;
pub mod balance;
pub mod error;

pub use account::{
    Account, AccountDirectory, AccountType, ChartOfAccounts, StandardChartOfAccounts,
};
pub use partner::{Partner, PartnerDirectory, PartnerKind, PartnerRegistry};
pub use entry::{Entry, EntryDirection, PartnerTag};
pub use transaction::{LedgerTransaction, TransactionStatus};
pub use store::{InMemoryTransactionStore, TransactionStore};
pub use validator::LedgerValidator;
pub use balance::{AccountActivity, BalanceCalculator, TrialBalance, TrialBalanceRow};
pub use error::{LedgerError, ValidationError};
