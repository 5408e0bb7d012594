//! Credit marketplace flows against an in-memory chain.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use creditcoin_sdk::chain::scale_value::Value;
use creditcoin_sdk::chain::{ChainError, StorageEntry};
use creditcoin_sdk::config::SdkConfig;
use creditcoin_sdk::marketplace::{DealStatus, LoanTerms, OrderStatus, OrderType};

mod common;
use common::*;

fn order_value(owner_field: &str, owner: [u8; 32], status: &str) -> Value {
    Value::named_composite([
        (owner_field, Value::from_bytes(owner)),
        ("principal", Value::u128(100 * ONE_CTC)),
        ("interest_rate", Value::u128(750)),
        ("duration", Value::u128(90)),
        ("collateral_required", Value::bool(false)),
        ("expiry", Value::u128(20_000)),
        ("status", Value::unnamed_variant(status, Vec::<Value>::new())),
        ("created_block", Value::u128(10)),
    ])
}

fn deal_value(lender: [u8; 32], borrower: [u8; 32], status: &str) -> Value {
    Value::named_composite([
        ("ask_order_id", Value::from_bytes([0x0a, 0x01])),
        ("bid_order_id", Value::from_bytes([0x0b, 0x01])),
        ("lender", Value::from_bytes(lender)),
        ("borrower", Value::from_bytes(borrower)),
        ("principal", Value::u128(100 * ONE_CTC)),
        ("interest_rate", Value::u128(1_000)),
        ("duration", Value::u128(365)),
        ("collateral_required", Value::bool(true)),
        ("collateral_amount", Value::u128(150 * ONE_CTC)),
        ("amount", Value::u128(100 * ONE_CTC)),
        ("status", Value::unnamed_variant(status, Vec::<Value>::new())),
        ("created_block", Value::u128(40)),
        ("start_block", Value::u128(41)),
        ("repaid_amount", Value::u128(30 * ONE_CTC)),
    ])
}

/// 32-byte order or deal hash filled with `n`.
fn hash(n: u8) -> [u8; 32] {
    [n; 32]
}

fn hash_id(n: u8) -> String {
    format!("0x{}", hex::encode(hash(n)))
}

/// Map entry keyed by `hash(n)` under a `Blake2_128Concat` hasher.
fn entry(n: u8, value: Value) -> StorageEntry {
    let mut key = vec![0x5a; 16];
    key.extend_from_slice(&hash(n));
    StorageEntry {
        key,
        keys: vec![Value::from_bytes(hash(n))],
        value,
    }
}

#[tokio::test]
async fn test_create_ask_order_call() {
    let backend = MockBackend::new("ws://node").with_blocks(5, 6_000).into_arc();
    let client = client_with(vec![backend.clone()]);

    let terms = LoanTerms::new(dec!(1000), dec!(5.25), 30).with_collateral(dec!(1500));
    let receipt = client
        .marketplace()
        .create_ask_order(&alice(), &terms, None)
        .await
        .unwrap();
    assert_eq!(receipt.fee, DEFAULT_FEE);
    assert!(receipt.events.contains(&"System.ExtrinsicSuccess".to_string()));

    let submitted = backend.submitted();
    let call = &submitted[0].0;
    assert_eq!(call.name(), "Credit.create_ask_order");
    assert_eq!(call.field("principal"), Some(&Value::u128(1000 * ONE_CTC)));
    assert_eq!(call.field("interest_rate"), Some(&Value::u128(525)));
    assert_eq!(call.field("duration"), Some(&Value::u128(30)));
    assert_eq!(call.field("collateral_required"), Some(&Value::bool(true)));
    assert_eq!(call.field("collateral_amount"), Some(&Value::u128(1500 * ONE_CTC)));
    assert_eq!(call.field("expiry"), Some(&Value::u128(14_400)));
}

#[tokio::test]
async fn test_create_bid_order_without_collateral() {
    let backend = MockBackend::new("ws://node").into_arc();
    let client = client_with(vec![backend.clone()]);

    let terms = LoanTerms::new(dec!(250), dec!(8), 60);
    client
        .marketplace()
        .create_bid_order(&bob(), &terms, Some(600))
        .await
        .unwrap();

    let call = &backend.submitted()[0].0;
    assert_eq!(call.name(), "Credit.create_bid_order");
    assert_eq!(call.field("collateral_required"), Some(&Value::bool(false)));
    assert!(call.field("collateral_amount").is_none());
    assert_eq!(call.field("expiry"), Some(&Value::u128(600)));
}

#[tokio::test]
async fn test_configured_pallet_and_expiry() {
    let backend = MockBackend::new("ws://node").into_arc();
    let mut config = SdkConfig::default();
    config.marketplace.pallet = "CreditV2".to_string();
    config.marketplace.default_expiry_blocks = 100;
    let client = client_with_config(vec![backend.clone()], config);

    let terms = LoanTerms::new(dec!(1), dec!(1), 1);
    client
        .marketplace()
        .create_ask_order(&alice(), &terms, None)
        .await
        .unwrap();

    let call = &backend.submitted()[0].0;
    assert_eq!(call.name(), "CreditV2.create_ask_order");
    assert_eq!(call.field("expiry"), Some(&Value::u128(100)));
}

#[tokio::test]
async fn test_invalid_terms_are_not_submitted() {
    let backend = MockBackend::new("ws://node").into_arc();
    let client = client_with(vec![backend.clone()]);
    let marketplace = client.marketplace();

    let zero_principal = LoanTerms::new(dec!(0), dec!(5), 30);
    assert!(matches!(
        marketplace.create_ask_order(&alice(), &zero_principal, None).await,
        Err(ChainError::InvalidAmount(_))
    ));

    let no_duration = LoanTerms::new(dec!(10), dec!(5), 0);
    assert!(matches!(
        marketplace.create_bid_order(&bob(), &no_duration, None).await,
        Err(ChainError::InvalidAmount(_))
    ));

    let valid = LoanTerms::new(dec!(10), dec!(5), 30);
    assert!(matches!(
        marketplace.create_bid_order(&bob(), &valid, Some(0)).await,
        Err(ChainError::InvalidAmount(_))
    ));

    assert!(backend.submitted().is_empty());
}

#[tokio::test]
async fn test_accept_offer() {
    let backend = MockBackend::new("ws://node").into_arc();
    let client = client_with(vec![backend.clone()]);
    let marketplace = client.marketplace();

    marketplace
        .accept_offer(&bob(), "0xa1b2", OrderType::Ask)
        .await
        .unwrap();
    marketplace
        .accept_offer(&alice(), "c3d4", OrderType::Bid)
        .await
        .unwrap();

    let submitted = backend.submitted();
    assert_eq!(submitted[0].0.name(), "Credit.accept_ask_order");
    assert_eq!(
        submitted[0].0.field("order_id"),
        Some(&Value::from_bytes([0xa1, 0xb2]))
    );
    assert_eq!(submitted[1].0.name(), "Credit.accept_bid_order");
    assert_eq!(
        submitted[1].0.field("order_id"),
        Some(&Value::from_bytes([0xc3, 0xd4]))
    );

    assert!(matches!(
        marketplace.accept_offer(&bob(), "not-hex", OrderType::Ask).await,
        Err(ChainError::Decode(_))
    ));
}

#[tokio::test]
async fn test_repay_loan() {
    let backend = MockBackend::new("ws://node").into_arc();
    let client = client_with(vec![backend.clone()]);
    let marketplace = client.marketplace();

    marketplace
        .repay_loan(&bob(), "0x0c01", dec!(12.5))
        .await
        .unwrap();

    let call = &backend.submitted()[0].0;
    assert_eq!(call.name(), "Credit.repay_loan");
    assert_eq!(call.field("deal_id"), Some(&Value::from_bytes([0x0c, 0x01])));
    assert_eq!(call.field("amount"), Some(&Value::u128(12 * ONE_CTC + ONE_CTC / 2)));

    assert!(matches!(
        marketplace.repay_loan(&bob(), "0x0c01", dec!(0)).await,
        Err(ChainError::InvalidAmount(_))
    ));
}

#[tokio::test]
async fn test_get_ask_orders_with_filters() {
    let backend = MockBackend::new("ws://node")
        .with_storage(
            "Credit",
            "AskOrders",
            vec![
                entry(0x01, order_value("lender", ALICE_KEY, "Active")),
                entry(0x02, order_value("lender", BOB_KEY, "Active")),
                entry(0x03, order_value("lender", ALICE_KEY, "Filled")),
                // Missing the lender field; skipped.
                entry(0x04, order_value("owner", ALICE_KEY, "Active")),
            ],
        )
        .into_arc();
    let client = client_with(vec![backend]);
    let marketplace = client.marketplace();

    let all = marketplace.get_ask_orders(None, None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert_eq!(all[0].order_id, hash_id(0x01));
    assert_eq!(all[0].terms.principal, dec!(100));
    assert_eq!(all[0].terms.interest_rate, dec!(7.5));

    let alices = marketplace
        .get_ask_orders(Some(ALICE_ADDRESS), None)
        .await
        .unwrap();
    assert_eq!(alices.len(), 2);
    assert!(alices.iter().all(|o| o.lender_address == ALICE_ADDRESS));

    let active = marketplace
        .get_ask_orders(Some(ALICE_ADDRESS), Some(OrderStatus::Active))
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].order_id, hash_id(0x01));

    assert!(matches!(
        marketplace.get_ask_orders(Some("invalid_address"), None).await,
        Err(ChainError::InvalidAddress(_))
    ));
}

#[tokio::test]
async fn test_get_bid_orders() {
    let backend = MockBackend::new("ws://node")
        .with_storage(
            "Credit",
            "BidOrders",
            vec![
                entry(0x11, order_value("borrower", BOB_KEY, "Active")),
                entry(0x12, order_value("borrower", BOB_KEY, "Expired")),
            ],
        )
        .into_arc();
    let client = client_with(vec![backend]);

    let expired = client
        .marketplace()
        .get_bid_orders(Some(BOB_ADDRESS), Some(OrderStatus::Expired))
        .await
        .unwrap();
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].order_id, hash_id(0x12));
    assert_eq!(expired[0].borrower_address, BOB_ADDRESS);

    let none = client
        .marketplace()
        .get_bid_orders(Some(ALICE_ADDRESS), None)
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn test_get_credit_deals() {
    let other = [9u8; 32];
    let backend = MockBackend::new("ws://node")
        .with_storage(
            "Credit",
            "Deals",
            vec![
                entry(0x21, deal_value(ALICE_KEY, BOB_KEY, "Pending")),
                entry(0x22, deal_value(other, ALICE_KEY, "Completed")),
                entry(0x23, deal_value(other, other, "Pending")),
            ],
        )
        .into_arc();
    let client = client_with(vec![backend]);
    let marketplace = client.marketplace();

    let alices = marketplace
        .get_credit_deals(Some(ALICE_ADDRESS), None)
        .await
        .unwrap();
    assert_eq!(alices.len(), 2);

    let pending = marketplace
        .get_credit_deals(Some(ALICE_ADDRESS), Some(DealStatus::Pending))
        .await
        .unwrap();
    assert_eq!(pending.len(), 1);
    let deal = &pending[0];
    assert_eq!(deal.deal_id, hash_id(0x21));
    assert_eq!(deal.ask_order_id, "0x0a01");
    assert_eq!(deal.borrower_address, BOB_ADDRESS);
    // 100 CTC at 10% for a year, 30 already repaid.
    assert_eq!(deal.total_due().unwrap(), dec!(110));
    assert_eq!(deal.outstanding().unwrap(), dec!(80));

    let collateral = deal.collateral_info().unwrap();
    assert_eq!(collateral.collateral_amount, dec!(150));
    assert_eq!(collateral.locked_block, 41);

    let everyone = marketplace.get_credit_deals(None, None).await.unwrap();
    assert_eq!(everyone.len(), 3);
}

#[tokio::test]
async fn test_marketplace_reads_are_retried() {
    let backend = MockBackend::new("ws://node")
        .with_storage(
            "Credit",
            "AskOrders",
            vec![entry(0x01, order_value("lender", ALICE_KEY, "Active"))],
        )
        .with_failing_reads(1)
        .into_arc();
    let client = client_with(vec![backend.clone()]);

    let orders = client.marketplace().get_ask_orders(None, None).await.unwrap();
    assert_eq!(orders.len(), 1);
    assert_eq!(backend.reads(), 2);
}

#[tokio::test]
async fn test_listed_order_ids_are_accepted_as_is() {
    let backend = MockBackend::new("ws://node")
        .with_storage(
            "Credit",
            "AskOrders",
            vec![entry(0x31, order_value("lender", ALICE_KEY, "Active"))],
        )
        .into_arc();
    let client = client_with(vec![backend.clone()]);
    let marketplace = client.marketplace();

    let orders = marketplace.get_ask_orders(None, None).await.unwrap();
    marketplace
        .accept_offer(&bob(), &orders[0].order_id, OrderType::Ask)
        .await
        .unwrap();

    // The key itself goes back, not the hashed storage key.
    let call = &backend.submitted()[0].0;
    assert_eq!(call.field("order_id"), Some(&Value::from_bytes(hash(0x31))));
}

#[tokio::test]
async fn test_double_map_keys_round_trip() {
    // Keyed by (expiry block, hash), each part behind its own hasher.
    let mut key = vec![0x11; 8];
    key.extend_from_slice(&20_000u32.to_le_bytes());
    key.extend_from_slice(&[0x22; 16]);
    key.extend_from_slice(&hash(0x41));
    let backend = MockBackend::new("ws://node")
        .with_storage(
            "Credit",
            "Deals",
            vec![StorageEntry {
                key,
                keys: vec![Value::u128(20_000), Value::from_bytes(hash(0x41))],
                value: deal_value(ALICE_KEY, BOB_KEY, "Pending"),
            }],
        )
        .into_arc();
    let client = client_with(vec![backend.clone()]);
    let marketplace = client.marketplace();

    let deals = marketplace.get_credit_deals(None, None).await.unwrap();
    assert_eq!(deals[0].deal_id, format!("20000/{}", hash_id(0x41)));

    marketplace
        .repay_loan(&bob(), &deals[0].deal_id, dec!(1))
        .await
        .unwrap();
    let call = &backend.submitted()[0].0;
    assert_eq!(
        call.field("deal_id"),
        Some(&Value::unnamed_composite([
            Value::u128(20_000),
            Value::from_bytes(hash(0x41))
        ]))
    );
}

#[tokio::test]
async fn test_out_of_range_rate_is_rejected() {
    let backend = MockBackend::new("ws://node").into_arc();
    let client = client_with(vec![backend.clone()]);

    let terms = LoanTerms::new(dec!(1000), Decimal::MAX, 30);
    assert!(matches!(
        client.marketplace().create_ask_order(&alice(), &terms, None).await,
        Err(ChainError::InvalidAmount(_))
    ));
    assert!(backend.submitted().is_empty());
}
