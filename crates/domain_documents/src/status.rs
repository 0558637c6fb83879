//! Document lifecycle state machine
//!
//! Documents move DRAFT → VALIDATED → POSTED → CANCELLED. Every mutation
//! asks the status first; a refused action produces a
//! [`StatusTransitionError`] naming the current status and what was
//! attempted.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Lifecycle status of a business document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// Being drafted; the only editable status
    Draft,
    /// Checked and frozen, ready to post
    Validated,
    /// Carried into the ledger; locked
    Posted,
    /// Terminal; nothing further is allowed
    Cancelled,
}

/// Action attempted against a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentAction {
    /// Edit header or line items
    Update,
    /// Delete the document
    Delete,
    /// Promote draft to validated
    Validate,
    /// Carry into the ledger
    Post,
    /// Withdraw from the ledger
    Unpost,
    /// Cancel the document
    Cancel,
    /// Issue a reversing credit note
    Reverse,
}

impl fmt::Display for DocumentAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DocumentAction::Update => "update",
            DocumentAction::Delete => "delete",
            DocumentAction::Validate => "validate",
            DocumentAction::Post => "post",
            DocumentAction::Unpost => "unpost",
            DocumentAction::Cancel => "cancel",
            DocumentAction::Reverse => "reverse",
        };
        write!(f, "{s}")
    }
}

/// Action refused by the document's current status
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Cannot {attempted} a {current:?} document")]
pub struct StatusTransitionError {
    /// Status the document was in
    pub current: DocumentStatus,
    /// What was attempted
    pub attempted: DocumentAction,
}

impl DocumentStatus {
    /// Header and line items may change
    pub fn can_update(&self) -> bool {
        matches!(self, DocumentStatus::Draft)
    }

    /// The document may be deleted outright
    pub fn can_delete(&self) -> bool {
        matches!(self, DocumentStatus::Draft)
    }

    /// The document may be validated
    pub fn can_validate(&self) -> bool {
        matches!(self, DocumentStatus::Draft)
    }

    /// The document may be posted to the ledger
    pub fn can_post(&self) -> bool {
        matches!(self, DocumentStatus::Validated)
    }

    /// The document may be withdrawn from the ledger
    pub fn can_unpost(&self) -> bool {
        matches!(self, DocumentStatus::Posted)
    }

    /// The document may be cancelled
    ///
    /// Posted documents additionally require a reversal first; the posting
    /// layer enforces that.
    pub fn can_cancel(&self) -> bool {
        !matches!(self, DocumentStatus::Cancelled)
    }

    /// A reversing credit note may be issued
    pub fn can_reverse(&self) -> bool {
        matches!(self, DocumentStatus::Posted)
    }

    /// No further changes of any kind
    pub fn is_locked(&self) -> bool {
        matches!(self, DocumentStatus::Posted | DocumentStatus::Cancelled)
    }

    /// Checks a guard, building the error on refusal
    pub fn guard(&self, action: DocumentAction) -> Result<(), StatusTransitionError> {
        let allowed = match action {
            DocumentAction::Update => self.can_update(),
            DocumentAction::Delete => self.can_delete(),
            DocumentAction::Validate => self.can_validate(),
            DocumentAction::Post => self.can_post(),
            DocumentAction::Unpost => self.can_unpost(),
            DocumentAction::Cancel => self.can_cancel(),
            DocumentAction::Reverse => self.can_reverse(),
        };
        if allowed {
            Ok(())
        } else {
            Err(StatusTransitionError {
                current: *self,
                attempted: action,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use DocumentStatus::*;

    #[test]
    fn test_draft_is_the_only_editable_status() {
        assert!(Draft.can_update());
        assert!(Draft.can_delete());
        assert!(!Validated.can_update());
        assert!(!Posted.can_update());
        assert!(!Cancelled.can_update());
    }

    #[test]
    fn test_post_requires_validated() {
        assert!(!Draft.can_post());
        assert!(Validated.can_post());
        assert!(!Posted.can_post());
        assert!(!Cancelled.can_post());
    }

    #[test]
    fn test_cancelled_is_terminal() {
        assert!(!Cancelled.can_cancel());
        assert!(!Cancelled.can_validate());
        assert!(!Cancelled.can_post());
        assert!(Cancelled.is_locked());
    }

    #[test]
    fn test_guard_names_current_and_attempted() {
        let err = Posted.guard(DocumentAction::Update).unwrap_err();
        assert_eq!(err.current, Posted);
        assert_eq!(err.attempted, DocumentAction::Update);

        assert!(Posted.guard(DocumentAction::Unpost).is_ok());
        assert!(Posted.guard(DocumentAction::Reverse).is_ok());
        assert!(Validated.guard(DocumentAction::Unpost).is_err());
    }
}
