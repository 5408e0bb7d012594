//! Walk through the credit marketplace: publish an offer and a request,
//! accept the first active offer, then list deals.
//!
//! Run against a development node:
//! ```text
//! CREDITCOIN_RPC_URL=ws://127.0.0.1:9944 cargo run --example credit_marketplace
//! ```

use rust_decimal::Decimal;

use creditcoin_sdk::config::load_with_env;
use creditcoin_sdk::observability::init_logging;
use creditcoin_sdk::{CreditcoinClient, LoanTerms, OrderStatus, OrderType};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = load_with_env(None)?;
    init_logging(&config.observability);

    let client = CreditcoinClient::connect(config).await?;

    // Funded development accounts.
    let lender = client.import_account_from_uri("//Alice")?;
    let borrower = client.import_account_from_uri("//Bob")?;
    println!("Lender:   {}", lender.address());
    println!("Borrower: {}", borrower.address());

    let marketplace = client.marketplace();

    println!("\n1. Creating lend offer...");
    let lend_terms = LoanTerms::new(Decimal::from(1000), Decimal::from(5), 90)
        .with_collateral(Decimal::from(1200));
    let receipt = marketplace.create_ask_order(&lender, &lend_terms, None).await?;
    println!("Lend offer created: {} (fee {} CTC)", receipt.tx_hash, receipt.fee_ctc());

    println!("\n2. Creating borrow request...");
    let borrow_terms = LoanTerms::new(Decimal::from(800), Decimal::from(7), 60)
        .with_collateral(Decimal::from(1000));
    let receipt = marketplace
        .create_bid_order(&borrower, &borrow_terms, Some(14_400))
        .await?;
    println!("Borrow request created: {}", receipt.tx_hash);

    println!("\n3. Active orders:");
    let asks = marketplace.get_ask_orders(None, Some(OrderStatus::Active)).await?;
    let bids = marketplace.get_bid_orders(None, Some(OrderStatus::Active)).await?;
    println!("Active lend offers: {}", asks.len());
    println!("Active borrow requests: {}", bids.len());

    if let Some(offer) = asks.first() {
        println!("\n4. Accepting lend offer {}...", offer.order_id);
        let receipt = marketplace
            .accept_offer(&borrower, &offer.order_id, OrderType::Ask)
            .await?;
        println!("Offer accepted: {}", receipt.tx_hash);
    }

    println!("\n5. Credit deals:");
    for deal in marketplace.get_credit_deals(None, None).await? {
        println!(
            "Deal {}: {} -> {}",
            deal.deal_id, deal.lender_address, deal.borrower_address
        );
        println!(
            "  Amount: {} CTC, outstanding: {} CTC, status: {}",
            deal.amount,
            deal.outstanding()?,
            deal.status
        );
    }

    client.close();
    Ok(())
}
