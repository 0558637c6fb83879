//! Balance calculation and trial balance reporting
//!
//! Balances are derived, never stored: the calculator folds audited
//! transactions into per-account debit and credit sums in one pass over
//! the journal. Draft transactions are invisible here.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use core_kernel::AccountId;

use crate::account::{AccountDirectory, AccountType};
use crate::entry::EntryDirection;
use crate::store::TransactionStore;
use crate::transaction::LedgerTransaction;

/// Accumulated debit and credit sums for one account
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountActivity {
    /// Sum of debit amounts
    pub debit_total: Decimal,
    /// Sum of credit amounts
    pub credit_total: Decimal,
}

impl AccountActivity {
    /// Signed balance under the account type's normal-balance convention
    ///
    /// Debit-normal accounts report debits minus credits, credit-normal
    /// accounts the other way around.
    pub fn net(&self, account_type: AccountType) -> Decimal {
        if account_type.is_debit_normal() {
            self.debit_total - self.credit_total
        } else {
            self.credit_total - self.debit_total
        }
    }

    fn accumulate(&mut self, direction: EntryDirection, amount: Decimal) {
        match direction {
            EntryDirection::Debit => self.debit_total += amount,
            EntryDirection::Credit => self.credit_total += amount,
        }
    }
}

/// One account's row in a trial balance
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalanceRow {
    /// Account ID
    pub account_id: AccountId,
    /// Account code
    pub code: String,
    /// Account name
    pub name: String,
    /// Account type
    pub account_type: AccountType,
    /// Debit sum before the period
    pub opening_debit: Decimal,
    /// Credit sum before the period
    pub opening_credit: Decimal,
    /// Debit sum within the period
    pub period_debit: Decimal,
    /// Credit sum within the period
    pub period_credit: Decimal,
    /// Cumulative debit sum through the period end
    pub closing_debit: Decimal,
    /// Cumulative credit sum through the period end
    pub closing_credit: Decimal,
}

/// Trial balance report for a period
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrialBalance {
    /// First day of the period
    pub period_start: NaiveDate,
    /// Last day of the period
    pub period_end: NaiveDate,
    /// Per-account rows, sorted by account code; all-zero rows omitted
    pub rows: Vec<TrialBalanceRow>,
    /// Sum of all closing debit columns
    pub total_debits: Decimal,
    /// Sum of all closing credit columns
    pub total_credits: Decimal,
    /// Whether total debits equal total credits
    pub is_balanced: bool,
}

/// Derives account balances from the audited journal
pub struct BalanceCalculator<'a> {
    accounts: &'a dyn AccountDirectory,
    store: &'a dyn TransactionStore,
}

impl<'a> BalanceCalculator<'a> {
    /// Creates a calculator over the given chart and journal
    pub fn new(accounts: &'a dyn AccountDirectory, store: &'a dyn TransactionStore) -> Self {
        Self { accounts, store }
    }

    /// Debit and credit sums per account through `date`, inclusive
    ///
    /// Accounts with no activity are absent from the result.
    pub fn activity_through(
        &self,
        account_ids: &[AccountId],
        date: NaiveDate,
    ) -> HashMap<AccountId, AccountActivity> {
        Self::fold(&self.store.audited_through(date), account_ids)
    }

    /// Debit and credit sums per account within `[start, end]`
    pub fn activity_between(
        &self,
        account_ids: &[AccountId],
        start: NaiveDate,
        end: NaiveDate,
    ) -> HashMap<AccountId, AccountActivity> {
        Self::fold(&self.store.audited_between(start, end), account_ids)
    }

    /// Signed balance of one account through `date`
    ///
    /// Returns `None` if the account is not in the chart; an account with
    /// no activity reports zero.
    pub fn balance_through(&self, account_id: AccountId, date: NaiveDate) -> Option<Decimal> {
        let account = self.accounts.get(account_id)?;
        let activity = self
            .activity_through(&[account_id], date)
            .remove(&account_id)
            .unwrap_or_default();
        Some(activity.net(account.account_type))
    }

    /// Signed balances for several accounts in one journal pass
    ///
    /// Accounts not in the chart are absent from the result.
    pub fn balances_through(
        &self,
        account_ids: &[AccountId],
        date: NaiveDate,
    ) -> HashMap<AccountId, Decimal> {
        let accounts = self.accounts.get_many(account_ids);
        let mut activity = self.activity_through(account_ids, date);
        accounts
            .into_iter()
            .map(|(id, account)| {
                let net = activity
                    .remove(&id)
                    .unwrap_or_default()
                    .net(account.account_type);
                (id, net)
            })
            .collect()
    }

    /// Builds a trial balance for the period `[start, end]`
    ///
    /// Each row shows opening sums (activity before `start`), period sums,
    /// and closing sums. Every audited transaction balances, so the report
    /// balances unless the journal has been corrupted.
    pub fn trial_balance(&self, start: NaiveDate, end: NaiveDate) -> TrialBalance {
        let mut accounts = self.accounts.all();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        let ids: Vec<AccountId> = accounts.iter().map(|a| a.id).collect();

        let opening = match start.pred_opt() {
            Some(day_before) => self.activity_through(&ids, day_before),
            None => HashMap::new(),
        };
        let period = self.activity_between(&ids, start, end);

        let mut rows = Vec::new();
        let mut total_debits = Decimal::ZERO;
        let mut total_credits = Decimal::ZERO;

        for account in accounts {
            let open = opening.get(&account.id).copied().unwrap_or_default();
            let during = period.get(&account.id).copied().unwrap_or_default();
            let closing_debit = open.debit_total + during.debit_total;
            let closing_credit = open.credit_total + during.credit_total;

            if closing_debit.is_zero() && closing_credit.is_zero() {
                continue;
            }

            total_debits += closing_debit;
            total_credits += closing_credit;
            rows.push(TrialBalanceRow {
                account_id: account.id,
                code: account.code,
                name: account.name,
                account_type: account.account_type,
                opening_debit: open.debit_total,
                opening_credit: open.credit_total,
                period_debit: during.debit_total,
                period_credit: during.credit_total,
                closing_debit,
                closing_credit,
            });
        }

        TrialBalance {
            period_start: start,
            period_end: end,
            rows,
            total_debits,
            total_credits,
            is_balanced: total_debits == total_credits,
        }
    }

    /// Checks that cumulative debits equal cumulative credits through `date`
    pub fn verify_through(&self, date: NaiveDate) -> bool {
        let ids: Vec<AccountId> = self.accounts.all().into_iter().map(|a| a.id).collect();
        let activity = self.activity_through(&ids, date);

        let mut debits = Decimal::ZERO;
        let mut credits = Decimal::ZERO;
        for a in activity.values() {
            debits += a.debit_total;
            credits += a.credit_total;
        }
        debits == credits
    }

    fn fold(
        transactions: &[LedgerTransaction],
        account_ids: &[AccountId],
    ) -> HashMap<AccountId, AccountActivity> {
        let wanted: HashSet<AccountId> = account_ids.iter().copied().collect();
        let mut activity: HashMap<AccountId, AccountActivity> = HashMap::new();

        for transaction in transactions {
            for entry in &transaction.entries {
                if !wanted.contains(&entry.account_id) {
                    continue;
                }
                activity
                    .entry(entry.account_id)
                    .or_default()
                    .accumulate(entry.direction, entry.amount.amount());
            }
        }

        activity
    }
}
