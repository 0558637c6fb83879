//! Account types for the chart of accounts
//!
//! This module defines the account structure for double-entry bookkeeping.
//! Accounts form a hierarchy; only leaf accounts carry postings, parent
//! accounts exist for grouping and reporting.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use core_kernel::AccountId;

use crate::error::LedgerError;

/// Types of accounts in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccountType {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Equity accounts (credit normal balance)
    Equity,
    /// Income accounts (credit normal balance)
    Income,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountType {
    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }
}

/// An account in the chart of accounts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Account code (e.g., "1001")
    pub code: String,
    /// Account name
    pub name: String,
    /// Account type
    pub account_type: AccountType,
    /// Parent account ID (for hierarchical charts)
    pub parent_id: Option<AccountId>,
    /// Whether account is active
    pub is_active: bool,
}

impl Account {
    /// Creates a new active account without a parent
    pub fn new(
        id: AccountId,
        code: impl Into<String>,
        name: impl Into<String>,
        account_type: AccountType,
    ) -> Self {
        Self {
            id,
            code: code.into(),
            name: name.into(),
            account_type,
            parent_id: None,
            is_active: true,
        }
    }

    /// Sets the parent account
    pub fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Read access to the chart of accounts
///
/// Validation and balance calculation only need lookups, so they depend on
/// this trait rather than a concrete chart. A database-backed directory can
/// be substituted without touching the callers.
pub trait AccountDirectory: Send + Sync {
    /// Retrieves an account by ID
    fn get(&self, id: AccountId) -> Option<Account>;

    /// Retrieves several accounts in one call
    ///
    /// Missing IDs are simply absent from the result map.
    fn get_many(&self, ids: &[AccountId]) -> HashMap<AccountId, Account>;

    /// Returns true if the account exists and no other account names it
    /// as parent
    fn is_leaf(&self, id: AccountId) -> bool;

    /// Returns every registered account
    fn all(&self) -> Vec<Account>;
}

/// In-memory chart of accounts
#[derive(Debug, Default)]
pub struct ChartOfAccounts {
    accounts: RwLock<HashMap<AccountId, Account>>,
    parents: RwLock<HashSet<AccountId>>,
}

impl ChartOfAccounts {
    /// Creates an empty chart
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chart pre-populated with the given accounts
    pub fn with_accounts(accounts: Vec<Account>) -> Result<Self, LedgerError> {
        let chart = Self::new();
        for account in accounts {
            chart.add(account)?;
        }
        Ok(chart)
    }

    /// Adds an account to the chart
    ///
    /// # Errors
    ///
    /// Returns an error if the ID or code is already registered.
    pub fn add(&self, account: Account) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.write().expect("chart lock poisoned");
        if accounts.contains_key(&account.id) {
            return Err(LedgerError::AccountAlreadyExists(account.id.to_string()));
        }
        if accounts.values().any(|a| a.code == account.code) {
            return Err(LedgerError::AccountAlreadyExists(account.code.clone()));
        }
        if let Some(parent_id) = account.parent_id {
            self.parents
                .write()
                .expect("chart lock poisoned")
                .insert(parent_id);
        }
        accounts.insert(account.id, account);
        Ok(())
    }

    /// Deactivates an account so new postings are rejected
    pub fn deactivate(&self, id: AccountId) -> Result<(), LedgerError> {
        let mut accounts = self.accounts.write().expect("chart lock poisoned");
        let account = accounts
            .get_mut(&id)
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))?;
        account.is_active = false;
        Ok(())
    }

    /// Finds an account by its code
    pub fn find_by_code(&self, code: &str) -> Option<Account> {
        self.accounts
            .read()
            .expect("chart lock poisoned")
            .values()
            .find(|a| a.code == code)
            .cloned()
    }
}

impl AccountDirectory for ChartOfAccounts {
    fn get(&self, id: AccountId) -> Option<Account> {
        self.accounts
            .read()
            .expect("chart lock poisoned")
            .get(&id)
            .cloned()
    }

    fn get_many(&self, ids: &[AccountId]) -> HashMap<AccountId, Account> {
        let accounts = self.accounts.read().expect("chart lock poisoned");
        ids.iter()
            .filter_map(|id| accounts.get(id).map(|a| (*id, a.clone())))
            .collect()
    }

    fn is_leaf(&self, id: AccountId) -> bool {
        let accounts = self.accounts.read().expect("chart lock poisoned");
        let parents = self.parents.read().expect("chart lock poisoned");
        accounts.contains_key(&id) && !parents.contains(&id)
    }

    fn all(&self) -> Vec<Account> {
        self.accounts
            .read()
            .expect("chart lock poisoned")
            .values()
            .cloned()
            .collect()
    }
}

/// Standard chart of accounts for a trading business
pub struct StandardChartOfAccounts;

impl StandardChartOfAccounts {
    /// Creates the standard account set
    ///
    /// The chart is two-level: summary accounts like "1000 Current Assets"
    /// group the postable leaves beneath them.
    pub fn create_standard_accounts() -> Vec<Account> {
        let current_assets = AccountId::new();
        let current_liabilities = AccountId::new();

        vec![
            // Assets
            Account::new(current_assets, "1000", "Current Assets", AccountType::Asset),
            Account::new(AccountId::new(), "1001", "Cash", AccountType::Asset)
                .with_parent(current_assets),
            Account::new(AccountId::new(), "1002", "Bank Deposits", AccountType::Asset)
                .with_parent(current_assets),
            Account::new(AccountId::new(), "1122", "Accounts Receivable", AccountType::Asset)
                .with_parent(current_assets),

            // Liabilities
            Account::new(current_liabilities, "2000", "Current Liabilities", AccountType::Liability),
            Account::new(AccountId::new(), "2202", "Accounts Payable", AccountType::Liability)
                .with_parent(current_liabilities),
            Account::new(AccountId::new(), "2221", "Tax Payable", AccountType::Liability)
                .with_parent(current_liabilities),

            // Equity
            Account::new(AccountId::new(), "3001", "Paid-in Capital", AccountType::Equity),

            // Income
            Account::new(AccountId::new(), "6001", "Operating Income", AccountType::Income),

            // Expenses
            Account::new(AccountId::new(), "6601", "Selling Expense", AccountType::Expense),
            Account::new(AccountId::new(), "6602", "Administrative Expense", AccountType::Expense),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debit_normal_types() {
        assert!(AccountType::Asset.is_debit_normal());
        assert!(AccountType::Expense.is_debit_normal());
        assert!(!AccountType::Liability.is_debit_normal());
        assert!(!AccountType::Equity.is_debit_normal());
        assert!(!AccountType::Income.is_debit_normal());
    }

    #[test]
    fn test_duplicate_code_rejected() {
        let chart = ChartOfAccounts::new();
        chart
            .add(Account::new(AccountId::new(), "1001", "Cash", AccountType::Asset))
            .unwrap();

        let result = chart.add(Account::new(
            AccountId::new(),
            "1001",
            "Cash again",
            AccountType::Asset,
        ));
        assert!(matches!(result, Err(LedgerError::AccountAlreadyExists(_))));
    }

    #[test]
    fn test_leaf_detection() {
        let chart =
            ChartOfAccounts::with_accounts(StandardChartOfAccounts::create_standard_accounts())
                .unwrap();

        let summary = chart.find_by_code("1000").unwrap();
        let cash = chart.find_by_code("1001").unwrap();

        assert!(!chart.is_leaf(summary.id));
        assert!(chart.is_leaf(cash.id));
        assert!(!chart.is_leaf(AccountId::new()));
    }

    #[test]
    fn test_deactivate() {
        let chart = ChartOfAccounts::new();
        let account = Account::new(AccountId::new(), "1001", "Cash", AccountType::Asset);
        let id = account.id;
        chart.add(account).unwrap();

        chart.deactivate(id).unwrap();
        assert!(!chart.get(id).unwrap().is_active);
    }
}
