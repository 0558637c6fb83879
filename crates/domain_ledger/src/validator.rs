//! Double-entry invariant validation
//!
//! The validator runs a fixed sequence of checks and fails fast on the
//! first violation:
//!
//! 1. at least two entries
//! 2. every amount strictly positive
//! 3. every account exists, is active, and is a leaf
//! 4. total debits equal total credits, exactly
//! 5. partner-tagged entries use the partner's linked account
//!
//! A second pass, [`LedgerValidator::validate_with_balances`], projects the
//! transaction's net effect per account. Asset accounts may never go
//! negative; other account types only log a warning.

use rust_decimal::Decimal;
use std::collections::HashMap;
use tracing::warn;

use core_kernel::AccountId;

use crate::account::{Account, AccountDirectory, AccountType};
use crate::entry::{Entry, EntryDirection};
use crate::error::ValidationError;
use crate::partner::PartnerDirectory;
use crate::transaction::LedgerTransaction;

/// Validates transactions against the double-entry invariants
pub struct LedgerValidator<'a> {
    accounts: &'a dyn AccountDirectory,
    partners: &'a dyn PartnerDirectory,
}

impl<'a> LedgerValidator<'a> {
    /// Creates a validator over the given directories
    pub fn new(accounts: &'a dyn AccountDirectory, partners: &'a dyn PartnerDirectory) -> Self {
        Self { accounts, partners }
    }

    /// Validates a transaction's structural invariants
    pub fn validate(&self, transaction: &LedgerTransaction) -> Result<(), ValidationError> {
        self.validate_entries(&transaction.entries)?;
        Ok(())
    }

    /// Validates structural invariants and the negative-balance guard
    ///
    /// `balances` holds the current signed balance per account; accounts
    /// absent from the map are treated as zero.
    pub fn validate_with_balances(
        &self,
        transaction: &LedgerTransaction,
        balances: &HashMap<AccountId, Decimal>,
    ) -> Result<(), ValidationError> {
        let accounts = self.validate_entries(&transaction.entries)?;

        // Net signed effect per account, so offsetting lines within the
        // same transaction do not trip the guard.
        let mut net: HashMap<AccountId, Decimal> = HashMap::new();
        for entry in &transaction.entries {
            let account = &accounts[&entry.account_id];
            *net.entry(entry.account_id).or_default() +=
                entry.signed_amount(account.account_type);
        }

        for (account_id, delta) in net {
            let account = &accounts[&account_id];
            let current = balances.get(&account_id).copied().unwrap_or(Decimal::ZERO);
            let projected = current + delta;
            if projected < Decimal::ZERO {
                if account.account_type == AccountType::Asset {
                    return Err(ValidationError::NegativeAssetBalance {
                        code: account.code.clone(),
                        current,
                        projected,
                    });
                }
                warn!(
                    account = %account.code,
                    %current,
                    %projected,
                    "transaction drives balance negative"
                );
            }
        }

        Ok(())
    }

    /// Runs the ordered structural checks over a set of entries
    ///
    /// Returns the loaded accounts so callers can reuse them without a
    /// second directory round trip.
    fn validate_entries(
        &self,
        entries: &[Entry],
    ) -> Result<HashMap<AccountId, Account>, ValidationError> {
        if entries.len() < 2 {
            return Err(ValidationError::TooFewEntries {
                count: entries.len(),
            });
        }

        for entry in entries {
            if !entry.amount.is_positive() {
                return Err(ValidationError::NonPositiveAmount {
                    account: entry.account_id.to_string(),
                    amount: entry.amount.amount(),
                });
            }
        }

        // One directory round trip for all referenced accounts
        let mut ids: Vec<AccountId> = entries.iter().map(|e| e.account_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let accounts = self.accounts.get_many(&ids);

        for entry in entries {
            let account = accounts
                .get(&entry.account_id)
                .ok_or_else(|| ValidationError::AccountNotFound(entry.account_id.to_string()))?;
            if !account.is_active {
                return Err(ValidationError::InactiveAccount {
                    code: account.code.clone(),
                    name: account.name.clone(),
                });
            }
            if !self.accounts.is_leaf(account.id) {
                return Err(ValidationError::NonLeafAccount {
                    code: account.code.clone(),
                    name: account.name.clone(),
                });
            }
        }

        let mut debit_total = Decimal::ZERO;
        let mut credit_total = Decimal::ZERO;
        for entry in entries {
            match entry.direction {
                EntryDirection::Debit => debit_total += entry.amount.amount(),
                EntryDirection::Credit => credit_total += entry.amount.amount(),
            }
        }
        if debit_total != credit_total {
            return Err(ValidationError::Imbalance {
                debit_total,
                credit_total,
                difference: debit_total - credit_total,
            });
        }

        for entry in entries {
            let Some(tag) = entry.partner else { continue };
            let partner = self
                .partners
                .get(tag.partner_id)
                .ok_or_else(|| ValidationError::PartnerNotFound(tag.partner_id.to_string()))?;
            if partner.kind != tag.kind {
                return Err(ValidationError::PartnerKindMismatch {
                    partner: partner.name.clone(),
                    expected: tag.kind.to_string(),
                    actual: partner.kind.to_string(),
                });
            }
            if partner.linked_account_id != Some(entry.account_id) {
                return Err(ValidationError::PartnerAccountMismatch {
                    partner: partner.name.clone(),
                    account: entry.account_id.to_string(),
                });
            }
            // Kind constrains the control account's type as well
            if let Some(required) = partner.kind.required_account_type() {
                let account = &accounts[&entry.account_id];
                if account.account_type != required {
                    return Err(ValidationError::PartnerAccountMismatch {
                        partner: partner.name.clone(),
                        account: account.code.clone(),
                    });
                }
            }
        }

        Ok(accounts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::ChartOfAccounts;
    use crate::partner::{Partner, PartnerKind, PartnerRegistry};
    use chrono::NaiveDate;
    use core_kernel::{Currency, Money, PartnerId};
    use rust_decimal_macros::dec;

    struct Fixture {
        chart: ChartOfAccounts,
        partners: PartnerRegistry,
        cash: AccountId,
        receivable: AccountId,
        income: AccountId,
    }

    fn fixture() -> Fixture {
        let chart = ChartOfAccounts::new();
        let cash = Account::new(AccountId::new(), "1001", "Cash", AccountType::Asset);
        let receivable = Account::new(
            AccountId::new(),
            "1122",
            "Accounts Receivable",
            AccountType::Asset,
        );
        let income = Account::new(AccountId::new(), "6001", "Operating Income", AccountType::Income);
        let (cash_id, receivable_id, income_id) = (cash.id, receivable.id, income.id);
        chart.add(cash).unwrap();
        chart.add(receivable).unwrap();
        chart.add(income).unwrap();

        Fixture {
            chart,
            partners: PartnerRegistry::new(),
            cash: cash_id,
            receivable: receivable_id,
            income: income_id,
        }
    }

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
    }

    fn usd(amount: Decimal) -> Money {
        Money::new(amount, Currency::USD)
    }

    #[test]
    fn test_accepts_balanced_transaction() {
        let f = fixture();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        let txn = LedgerTransaction::new(date(), "Cash sale")
            .debit(f.cash, usd(dec!(100)))
            .credit(f.income, usd(dec!(100)));

        assert!(validator.validate(&txn).is_ok());
    }

    #[test]
    fn test_rejects_single_entry() {
        let f = fixture();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        let txn = LedgerTransaction::new(date(), "Half a sale").debit(f.cash, usd(dec!(100)));

        assert!(matches!(
            validator.validate(&txn),
            Err(ValidationError::TooFewEntries { count: 1 })
        ));
    }

    #[test]
    fn test_rejects_zero_amount() {
        let f = fixture();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        let txn = LedgerTransaction::new(date(), "Nothing")
            .debit(f.cash, usd(dec!(0)))
            .credit(f.income, usd(dec!(0)));

        assert!(matches!(
            validator.validate(&txn),
            Err(ValidationError::NonPositiveAmount { .. })
        ));
    }

    #[test]
    fn test_rejects_unknown_account() {
        let f = fixture();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        let txn = LedgerTransaction::new(date(), "Ghost account")
            .debit(AccountId::new(), usd(dec!(100)))
            .credit(f.income, usd(dec!(100)));

        assert!(matches!(
            validator.validate(&txn),
            Err(ValidationError::AccountNotFound(_))
        ));
    }

    #[test]
    fn test_rejects_non_leaf_account() {
        let f = fixture();
        let child = Account::new(AccountId::new(), "1123", "Sub-receivable", AccountType::Asset)
            .with_parent(f.receivable);
        f.chart.add(child).unwrap();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        let txn = LedgerTransaction::new(date(), "Posting to summary")
            .debit(f.receivable, usd(dec!(100)))
            .credit(f.income, usd(dec!(100)));

        assert!(matches!(
            validator.validate(&txn),
            Err(ValidationError::NonLeafAccount { .. })
        ));
    }

    #[test]
    fn test_rejects_imbalance_with_amounts() {
        let f = fixture();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        let txn = LedgerTransaction::new(date(), "Lopsided")
            .debit(f.cash, usd(dec!(100)))
            .credit(f.income, usd(dec!(80)));

        match validator.validate(&txn) {
            Err(ValidationError::Imbalance {
                debit_total,
                credit_total,
                difference,
            }) => {
                assert_eq!(debit_total, dec!(100));
                assert_eq!(credit_total, dec!(80));
                assert_eq!(difference, dec!(20));
            }
            other => panic!("expected imbalance, got {other:?}"),
        }
    }

    #[test]
    fn test_partner_must_use_linked_account() {
        let f = fixture();
        let partner = Partner::new(PartnerId::new(), "Acme Ltd", PartnerKind::Customer)
            .with_linked_account(f.receivable);
        let partner_id = partner.id;
        f.partners.add(partner).unwrap();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        // Tagged entry on the wrong account
        let txn = LedgerTransaction::new(date(), "Mislinked")
            .entry(Entry::debit(f.cash, usd(dec!(100))).with_partner(partner_id, PartnerKind::Customer))
            .credit(f.income, usd(dec!(100)));

        assert!(matches!(
            validator.validate(&txn),
            Err(ValidationError::PartnerAccountMismatch { .. })
        ));

        // Tagged entry on the linked account is fine
        let txn = LedgerTransaction::new(date(), "Linked")
            .entry(
                Entry::debit(f.receivable, usd(dec!(100)))
                    .with_partner(partner_id, PartnerKind::Customer),
            )
            .credit(f.income, usd(dec!(100)));

        assert!(validator.validate(&txn).is_ok());
    }

    #[test]
    fn test_partner_kind_mismatch() {
        let f = fixture();
        let partner = Partner::new(PartnerId::new(), "Acme Ltd", PartnerKind::Customer)
            .with_linked_account(f.receivable);
        let partner_id = partner.id;
        f.partners.add(partner).unwrap();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        let txn = LedgerTransaction::new(date(), "Wrong kind")
            .entry(
                Entry::debit(f.receivable, usd(dec!(100)))
                    .with_partner(partner_id, PartnerKind::Vendor),
            )
            .credit(f.income, usd(dec!(100)));

        assert!(matches!(
            validator.validate(&txn),
            Err(ValidationError::PartnerKindMismatch { .. })
        ));
    }

    #[test]
    fn test_asset_cannot_go_negative() {
        let f = fixture();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        // Paying out 150 from a cash balance of 100
        let txn = LedgerTransaction::new(date(), "Overdraft")
            .debit(f.receivable, usd(dec!(150)))
            .credit(f.cash, usd(dec!(150)));

        let mut balances = HashMap::new();
        balances.insert(f.cash, dec!(100));
        balances.insert(f.receivable, dec!(0));

        match validator.validate_with_balances(&txn, &balances) {
            Err(ValidationError::NegativeAssetBalance {
                current, projected, ..
            }) => {
                assert_eq!(current, dec!(100));
                assert_eq!(projected, dec!(-50));
            }
            other => panic!("expected negative balance error, got {other:?}"),
        }
    }

    #[test]
    fn test_offsetting_lines_do_not_trip_guard() {
        let f = fixture();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        // Cash is credited 150 but also debited 150: net zero
        let txn = LedgerTransaction::new(date(), "Wash")
            .debit(f.cash, usd(dec!(150)))
            .credit(f.cash, usd(dec!(150)));

        let balances = HashMap::from([(f.cash, dec!(0))]);
        assert!(validator.validate_with_balances(&txn, &balances).is_ok());
    }

    #[test]
    fn test_income_going_negative_is_allowed() {
        let f = fixture();
        let validator = LedgerValidator::new(&f.chart, &f.partners);

        // Debiting income below zero only warns
        let txn = LedgerTransaction::new(date(), "Income reversal")
            .debit(f.income, usd(dec!(50)))
            .credit(f.cash, usd(dec!(50)));

        let balances = HashMap::from([(f.income, dec!(20)), (f.cash, dec!(100))]);
        assert!(validator.validate_with_balances(&txn, &balances).is_ok());
    }
}
