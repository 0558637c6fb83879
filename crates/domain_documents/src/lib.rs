//! Document Domain - Invoices, Bills, and Credit Notes
//!
//! This crate models business documents and their lifecycle. A document
//! moves DRAFT → VALIDATED → POSTED → CANCELLED; it is editable only as a
//! draft, locked once posted, and cancelled terminally. Posted documents
//! additionally track settlement (OPEN → PARTIAL → PAID) as payments are
//! allocated against them.
//!
//! Posting itself lives in the posting crate; this crate owns the
//! aggregate, the state machine, and document storage.

pub mod document;
pub mod status;
pub mod store;
pub mod error;

pub use document::{Document, DocumentKind, LineItem, SettlementStatus};
pub use status::{DocumentAction, DocumentStatus, StatusTransitionError};
pub use store::{DocumentStore, InMemoryDocumentStore};
pub use error::DocumentError;
