//! Posting Domain - From Documents and Payments to the Ledger
//!
//! This crate connects the document and ledger domains:
//!
//! - [`PostingEngine`] turns validated documents into balanced ledger
//!   transactions, and handles unposting, reversal, and cancellation
//! - [`PaymentAllocationEngine`] settles a partner's open documents
//!   first-in-first-out and posts the resulting payments
//! - [`AccountingService`] is the facade applications talk to
//!
//! Nothing here writes partially: every engine stages its mutations and
//! persists only after all checks pass.

pub mod engine;
pub mod allocation;
pub mod payment;
pub mod service;
pub mod config;
pub mod error;

pub use engine::PostingEngine;
pub use allocation::PaymentAllocationEngine;
pub use payment::{
    Allocation, AllocationStatus, AllocationStore, InMemoryAllocationStore, InMemoryPaymentStore,
    Payment, PaymentKind, PaymentStore,
};
pub use service::AccountingService;
pub use config::PostingConfig;
pub use error::PostingError;
