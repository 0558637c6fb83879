//! Core Kernel - Foundational types for the ledger system
//!
//! This crate provides the building blocks used across all domain modules:
//! - Money types with precise decimal arithmetic
//! - Strongly-typed identifiers
//! - Date-stamped document number sequences

pub mod money;
pub mod identifiers;
pub mod sequence;

pub use money::{Money, Currency, MoneyError, Rate};
pub use identifiers::{
    AccountId, PartnerId, TransactionId, EntryId,
    DocumentId, PaymentId, AllocationId,
};
pub use sequence::{SequenceGenerator, DailySequences};
