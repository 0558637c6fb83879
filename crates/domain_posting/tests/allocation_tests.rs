//! Integration tests for payment allocation
//!
//! Payments settle a partner's open documents oldest-first. These tests
//! post real invoices through the engine, then allocate, post, and
//! withdraw payments against them.

use std::sync::Arc;

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{AccountId, Currency, DailySequences, DocumentId, Money, PartnerId};
use domain_documents::{
    Document, DocumentKind, DocumentStore, InMemoryDocumentStore, LineItem, SettlementStatus,
};
use domain_ledger::{
    ChartOfAccounts, InMemoryTransactionStore, Partner, PartnerKind, PartnerRegistry,
    StandardChartOfAccounts, TransactionStore,
};
use domain_posting::{
    AccountingService, AllocationStatus, AllocationStore, InMemoryAllocationStore,
    InMemoryPaymentStore, PaymentKind, PaymentStore, PostingConfig, PostingError,
};

struct World {
    service: AccountingService,
    chart: Arc<ChartOfAccounts>,
    partners: Arc<PartnerRegistry>,
    documents: Arc<InMemoryDocumentStore>,
    transactions: Arc<InMemoryTransactionStore>,
    payments: Arc<InMemoryPaymentStore>,
    allocations: Arc<InMemoryAllocationStore>,
}

impl World {
    fn new() -> Self {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        let chart = Arc::new(
            ChartOfAccounts::with_accounts(StandardChartOfAccounts::create_standard_accounts())
                .unwrap(),
        );
        let partners = Arc::new(PartnerRegistry::new());
        let documents = Arc::new(InMemoryDocumentStore::new());
        let transactions = Arc::new(InMemoryTransactionStore::new());
        let payments = Arc::new(InMemoryPaymentStore::new());
        let allocations = Arc::new(InMemoryAllocationStore::new());
        let config = PostingConfig::new(chart.find_by_code("2221").unwrap().id);

        let service = AccountingService::new(
            chart.clone(),
            partners.clone(),
            documents.clone(),
            transactions.clone(),
            payments.clone(),
            allocations.clone(),
            Arc::new(DailySequences::new()),
            config,
        );

        Self {
            service,
            chart,
            partners,
            documents,
            transactions,
            payments,
            allocations,
        }
    }

    fn account(&self, code: &str) -> AccountId {
        self.chart.find_by_code(code).unwrap().id
    }

    fn customer(&self) -> PartnerId {
        let partner = Partner::new(PartnerId::new(), "Acme Ltd", PartnerKind::Customer)
            .with_linked_account(self.account("1122"));
        let id = partner.id;
        self.partners.add(partner).unwrap();
        id
    }

    fn vendor(&self) -> PartnerId {
        let partner = Partner::new(PartnerId::new(), "Supplies Inc", PartnerKind::Vendor)
            .with_linked_account(self.account("2202"));
        let id = partner.id;
        self.partners.add(partner).unwrap();
        id
    }

    /// Invoice for `amount` on the income account, validated and posted
    fn posted_invoice(&self, partner: PartnerId, day: u32, amount: Decimal) -> DocumentId {
        let mut doc = Document::new(
            format!("INV2025030{day}"),
            DocumentKind::Invoice,
            partner,
            d(day),
            d(28),
            Currency::USD,
        );
        doc.add_item(LineItem::new("Services", self.account("6001"), usd(amount)))
            .unwrap();
        let id = doc.id;
        self.documents.insert(doc).unwrap();
        self.service.validate_document(id).unwrap();
        self.service.post_document(id).unwrap();
        id
    }

    fn posted_bill(&self, partner: PartnerId, day: u32, amount: Decimal) -> DocumentId {
        let mut doc = Document::new(
            format!("BILL2025030{day}"),
            DocumentKind::Bill,
            partner,
            d(day),
            d(28),
            Currency::USD,
        );
        doc.add_item(LineItem::new("Supplies", self.account("6601"), usd(amount)))
            .unwrap();
        let id = doc.id;
        self.documents.insert(doc).unwrap();
        self.service.validate_document(id).unwrap();
        self.service.post_document(id).unwrap();
        id
    }

    fn balance(&self, code: &str) -> Decimal {
        self.service
            .calculate_balance(self.account(code), d(28))
            .unwrap()
    }
}

fn usd(amount: Decimal) -> Money {
    Money::new(amount, Currency::USD)
}

fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, day).unwrap()
}

#[test]
fn test_fifo_settles_oldest_first() {
    let world = World::new();
    let customer = world.customer();
    let older = world.posted_invoice(customer, 1, dec!(3000));
    let newer = world.posted_invoice(customer, 2, dec!(4000));

    let payment = world
        .service
        .process_payment(
            customer,
            usd(dec!(5000)),
            world.account("1001"),
            PaymentKind::Receipt,
            d(10),
        )
        .unwrap();

    let rows = world.allocations.for_payment(payment.id);
    assert_eq!(rows.len(), 2);

    assert_eq!(rows[0].document_id, older);
    assert_eq!(rows[0].amount, usd(dec!(3000)));
    assert_eq!(rows[0].previous_open_amount, usd(dec!(3000)));
    assert_eq!(rows[0].remaining_open_amount, usd(dec!(0)));
    assert_eq!(rows[0].status, AllocationStatus::Full);

    assert_eq!(rows[1].document_id, newer);
    assert_eq!(rows[1].amount, usd(dec!(2000)));
    assert_eq!(rows[1].previous_open_amount, usd(dec!(4000)));
    assert_eq!(rows[1].remaining_open_amount, usd(dec!(2000)));
    assert_eq!(rows[1].status, AllocationStatus::Partial);

    let first = world.documents.get(older).unwrap();
    assert_eq!(first.settlement, SettlementStatus::Paid);
    assert!(!first.is_open());

    let second = world.documents.get(newer).unwrap();
    assert_eq!(second.settlement, SettlementStatus::Partial);
    assert_eq!(second.settled_amount, usd(dec!(2000)));
    assert_eq!(second.open_amount(), usd(dec!(2000)));

    assert!(payment.number.starts_with("PAY20250310"));
    assert!(!payment.posted);
}

#[test]
fn test_overpayment_is_refused_without_writes() {
    let world = World::new();
    let customer = world.customer();
    let a = world.posted_invoice(customer, 1, dec!(3000));
    let b = world.posted_invoice(customer, 2, dec!(4000));

    let result = world.service.process_payment(
        customer,
        usd(dec!(8000)),
        world.account("1001"),
        PaymentKind::Receipt,
        d(10),
    );
    assert!(matches!(
        result,
        Err(PostingError::Overallocation { payment, open })
            if payment == dec!(8000) && open == dec!(7000)
    ));

    // Nothing was touched
    assert!(world.allocations.for_document(a).is_empty());
    assert!(world.allocations.for_document(b).is_empty());
    let doc = world.documents.get(a).unwrap();
    assert_eq!(doc.settlement, SettlementStatus::Open);
    assert!(doc.settled_amount.is_zero());
}

#[test]
fn test_posted_receipt_moves_cash_against_receivable() {
    let world = World::new();
    let customer = world.customer();
    world.posted_invoice(customer, 1, dec!(3000));
    world.posted_invoice(customer, 2, dec!(4000));
    assert_eq!(world.balance("1122"), dec!(7000));

    let payment = world
        .service
        .process_payment(
            customer,
            usd(dec!(5000)),
            world.account("1001"),
            PaymentKind::Receipt,
            d(10),
        )
        .unwrap();
    let payment = world.service.post_payment(payment.id).unwrap();
    assert!(payment.posted);

    let txn = world.transactions.get(payment.transaction_id.unwrap()).unwrap();
    // One cash debit plus one partner credit per allocation row
    assert_eq!(txn.entries.len(), 3);
    assert!(txn.is_balanced());

    assert_eq!(world.balance("1001"), dec!(5000));
    assert_eq!(world.balance("1122"), dec!(2000));
    assert!(world.service.verify_trial_balance(d(28)));

    // Second post is refused
    assert!(matches!(
        world.service.post_payment(payment.id),
        Err(PostingError::AlreadyPosted(_))
    ));
}

#[test]
fn test_disbursement_settles_bills() {
    let world = World::new();
    let vendor = world.vendor();
    let bill = world.posted_bill(vendor, 1, dec!(2500));
    assert_eq!(world.balance("2202"), dec!(2500));

    // Fund the bank account so paying out does not overdraw it
    let funding = domain_ledger::LedgerTransaction::new(d(1), "Opening deposit")
        .debit(world.account("1002"), usd(dec!(10000)))
        .credit(world.account("3001"), usd(dec!(10000)));
    let funding_id = funding.id;
    world.transactions.insert(funding).unwrap();
    world.transactions.mark_audited(funding_id).unwrap();

    let payment = world
        .service
        .process_payment(
            vendor,
            usd(dec!(2500)),
            world.account("1002"),
            PaymentKind::Disbursement,
            d(10),
        )
        .unwrap();
    world.service.post_payment(payment.id).unwrap();

    assert_eq!(world.balance("2202"), dec!(0));
    assert_eq!(world.balance("1002"), dec!(7500));

    let doc = world.documents.get(bill).unwrap();
    assert_eq!(doc.settlement, SettlementStatus::Paid);
}

#[test]
fn test_unpost_payment_restores_settlements() {
    let world = World::new();
    let customer = world.customer();
    let older = world.posted_invoice(customer, 1, dec!(3000));
    let newer = world.posted_invoice(customer, 2, dec!(4000));

    let payment = world
        .service
        .process_payment(
            customer,
            usd(dec!(5000)),
            world.account("1001"),
            PaymentKind::Receipt,
            d(10),
        )
        .unwrap();
    let payment = world.service.post_payment(payment.id).unwrap();
    let txn_id = payment.transaction_id.unwrap();

    world.service.unpost_payment(payment.id).unwrap();

    assert!(world.transactions.get(txn_id).is_none());
    assert!(world.allocations.for_payment(payment.id).is_empty());
    assert_eq!(world.balance("1001"), dec!(0));
    assert_eq!(world.balance("1122"), dec!(7000));

    for id in [older, newer] {
        let doc = world.documents.get(id).unwrap();
        assert_eq!(doc.settlement, SettlementStatus::Open);
        assert!(doc.settled_amount.is_zero());
    }

    let payment = world.payments.get(payment.id).unwrap();
    assert!(!payment.posted);
    assert!(payment.transaction_id.is_none());
}

#[test]
fn test_unpost_keeps_other_payments_allocations() {
    let world = World::new();
    let customer = world.customer();
    let invoice = world.posted_invoice(customer, 1, dec!(6000));

    let first = world
        .service
        .process_payment(
            customer,
            usd(dec!(2000)),
            world.account("1001"),
            PaymentKind::Receipt,
            d(10),
        )
        .unwrap();
    world.service.post_payment(first.id).unwrap();

    let second = world
        .service
        .process_payment(
            customer,
            usd(dec!(1500)),
            world.account("1001"),
            PaymentKind::Receipt,
            d(11),
        )
        .unwrap();
    world.service.post_payment(second.id).unwrap();

    let doc = world.documents.get(invoice).unwrap();
    assert_eq!(doc.settled_amount, usd(dec!(3500)));

    world.service.unpost_payment(first.id).unwrap();

    // The second payment's allocation survives the first one's withdrawal
    let doc = world.documents.get(invoice).unwrap();
    assert_eq!(doc.settled_amount, usd(dec!(1500)));
    assert_eq!(doc.settlement, SettlementStatus::Partial);
    assert_eq!(world.allocations.for_document(invoice).len(), 1);
}

#[test]
fn test_settled_document_cannot_be_unposted() {
    let world = World::new();
    let customer = world.customer();
    let invoice = world.posted_invoice(customer, 1, dec!(3000));

    world
        .service
        .process_payment(
            customer,
            usd(dec!(1000)),
            world.account("1001"),
            PaymentKind::Receipt,
            d(10),
        )
        .unwrap();

    assert!(matches!(
        world.service.unpost_document(invoice),
        Err(PostingError::AllocationsExist(_))
    ));
}

#[test]
fn test_non_positive_payments_are_refused_without_writes() {
    let world = World::new();
    let customer = world.customer();
    let invoice = world.posted_invoice(customer, 1, dec!(3000));

    for bad in [dec!(0), dec!(-100)] {
        let result = world.service.process_payment(
            customer,
            usd(bad),
            world.account("1001"),
            PaymentKind::Receipt,
            d(10),
        );
        assert!(matches!(result, Err(PostingError::NonPositivePayment(_))));
    }

    // A negative amount must not slip past the FIFO walk into settlement
    let doc = world.documents.get(invoice).unwrap();
    assert!(doc.settled_amount.is_zero());
    assert_eq!(doc.settlement, SettlementStatus::Open);
    assert!(world.allocations.for_document(invoice).is_empty());
}

#[test]
fn test_payment_for_unknown_partner_is_refused() {
    let world = World::new();
    let result = world.service.process_payment(
        PartnerId::new(),
        usd(dec!(100)),
        world.account("1001"),
        PaymentKind::Receipt,
        d(10),
    );
    assert!(matches!(result, Err(PostingError::PartnerNotFound(_))));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Allocation conserves value: the rows sum to the payment amount and
    /// no document's open amount ever goes negative.
    #[test]
    fn prop_allocation_conserves_value(
        amounts in proptest::collection::vec(1u32..=10_000, 1..5),
        pct in 1u32..=100,
    ) {
        let world = World::new();
        let customer = world.customer();
        let mut ids = Vec::new();
        for (i, cents) in amounts.iter().enumerate() {
            let amount = Decimal::from(*cents) / dec!(100);
            ids.push(world.posted_invoice(customer, (i + 1) as u32, amount));
        }

        let total: Decimal = amounts.iter().map(|c| Decimal::from(*c)).sum::<Decimal>() / dec!(100);
        let payment_amount = (total * Decimal::from(pct) / dec!(100)).round_dp(2);
        prop_assume!(payment_amount > Decimal::ZERO);

        let payment = world
            .service
            .process_payment(
                customer,
                usd(payment_amount),
                world.account("1001"),
                PaymentKind::Receipt,
                d(20),
            )
            .unwrap();

        let rows = world.allocations.for_payment(payment.id);
        let allocated: Decimal = rows.iter().map(|r| r.amount.amount()).sum();
        prop_assert_eq!(allocated, payment_amount);

        for row in &rows {
            prop_assert!(row.remaining_open_amount.amount() >= Decimal::ZERO);
            prop_assert_eq!(
                row.previous_open_amount.amount() - row.amount.amount(),
                row.remaining_open_amount.amount()
            );
        }

        let settled: Decimal = ids
            .iter()
            .map(|id| world.documents.get(*id).unwrap().settled_amount.amount())
            .sum();
        prop_assert_eq!(settled, payment_amount);
    }
}
