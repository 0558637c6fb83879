//! Business partners and their subledger links
//!
//! Customers, vendors, and employees are tracked against dedicated control
//! accounts. An entry tagged with a partner must post to that partner's
//! linked account, which keeps the subledger and the general ledger in step.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::RwLock;

use core_kernel::{AccountId, PartnerId};

use crate::account::AccountType;
use crate::error::LedgerError;

/// Kind of business partner
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartnerKind {
    /// Buys from us; tracked through a receivable account
    Customer,
    /// Sells to us; tracked through a payable account
    Vendor,
    /// Staff advances and reimbursements
    Employee,
}

impl PartnerKind {
    /// Returns the account type a partner of this kind must be linked to,
    /// if the kind constrains it
    pub fn required_account_type(&self) -> Option<AccountType> {
        match self {
            PartnerKind::Customer => Some(AccountType::Asset),
            PartnerKind::Vendor => Some(AccountType::Liability),
            PartnerKind::Employee => None,
        }
    }
}

impl fmt::Display for PartnerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PartnerKind::Customer => "customer",
            PartnerKind::Vendor => "vendor",
            PartnerKind::Employee => "employee",
        };
        write!(f, "{s}")
    }
}

/// A business partner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Partner {
    /// Unique identifier
    pub id: PartnerId,
    /// Display name
    pub name: String,
    /// Partner kind
    pub kind: PartnerKind,
    /// Control account this partner's balance lives on
    pub linked_account_id: Option<AccountId>,
    /// Whether the partner is active
    pub is_active: bool,
}

impl Partner {
    /// Creates a new active partner without a linked account
    pub fn new(id: PartnerId, name: impl Into<String>, kind: PartnerKind) -> Self {
        Self {
            id,
            name: name.into(),
            kind,
            linked_account_id: None,
            is_active: true,
        }
    }

    /// Links the partner to its control account
    pub fn with_linked_account(mut self, account_id: AccountId) -> Self {
        self.linked_account_id = Some(account_id);
        self
    }
}

/// Read access to registered partners
pub trait PartnerDirectory: Send + Sync {
    /// Retrieves a partner by ID
    fn get(&self, id: PartnerId) -> Option<Partner>;
}

/// In-memory partner registry
#[derive(Debug, Default)]
pub struct PartnerRegistry {
    partners: RwLock<HashMap<PartnerId, Partner>>,
}

impl PartnerRegistry {
    /// Creates an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a partner
    ///
    /// # Errors
    ///
    /// Returns an error if the ID is already registered.
    pub fn add(&self, partner: Partner) -> Result<(), LedgerError> {
        let mut partners = self.partners.write().expect("partner lock poisoned");
        if partners.contains_key(&partner.id) {
            return Err(LedgerError::PartnerAlreadyExists(partner.id.to_string()));
        }
        partners.insert(partner.id, partner);
        Ok(())
    }
}

impl PartnerDirectory for PartnerRegistry {
    fn get(&self, id: PartnerId) -> Option<Partner> {
        self.partners
            .read()
            .expect("partner lock poisoned")
            .get(&id)
            .cloned()
    }
}
