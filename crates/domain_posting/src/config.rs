//! Posting configuration

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;

use core_kernel::AccountId;

/// Configuration for the posting and allocation engines
#[derive(Debug, Clone, Deserialize)]
pub struct PostingConfig {
    /// Liability account that collects tax on posted documents
    pub tax_account_id: AccountId,
    /// Allowed difference between a document's declared total and its
    /// line item sum
    #[serde(default = "default_tolerance")]
    pub reconciliation_tolerance: Decimal,
    /// Prefix for generated voucher numbers
    #[serde(default = "default_voucher_prefix")]
    pub voucher_prefix: String,
    /// Prefix for generated payment numbers
    #[serde(default = "default_payment_prefix")]
    pub payment_prefix: String,
    /// Prefix for generated credit note numbers
    #[serde(default = "default_credit_note_prefix")]
    pub credit_note_prefix: String,
}

impl PostingConfig {
    /// Creates a config with the default tolerance and prefixes
    pub fn new(tax_account_id: AccountId) -> Self {
        Self {
            tax_account_id,
            reconciliation_tolerance: default_tolerance(),
            voucher_prefix: default_voucher_prefix(),
            payment_prefix: default_payment_prefix(),
            credit_note_prefix: default_credit_note_prefix(),
        }
    }
}

fn default_tolerance() -> Decimal {
    dec!(0.01)
}

fn default_voucher_prefix() -> String {
    "V".to_string()
}

fn default_payment_prefix() -> String {
    "PAY".to_string()
}

fn default_credit_note_prefix() -> String {
    "CN".to_string()
}
