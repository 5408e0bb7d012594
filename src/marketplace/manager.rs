//! Credit marketplace operations.
//!
//! # Responsibilities
//! - Compose `Credit` pallet calls for orders, acceptance and repayment
//! - Read and filter the `AskOrders`, `BidOrders` and `Deals` maps

use rust_decimal::Decimal;

use crate::account::{ss58, Account};
use crate::chain::backend::{RuntimeCall, StorageEntry};
use crate::chain::client::ChainClient;
use crate::chain::decode;
use crate::chain::scale_value::Value;
use crate::chain::types::{ChainError, ChainResult, TransactionReceipt};
use crate::chain::units;
use crate::config::MarketplaceConfig;
use crate::marketplace::types::{
    CreditAskOrder, CreditBidOrder, CreditDeal, DealStatus, LoanTerms, OrderStatus, OrderType,
};

const ASK_ORDERS: &str = "AskOrders";
const BID_ORDERS: &str = "BidOrders";
const DEALS: &str = "Deals";

/// Manager for the credit marketplace.
///
/// Borrowed from a `CreditcoinClient`; holds no state of its own.
pub struct CreditMarketplace<'a> {
    chain: &'a ChainClient,
    config: &'a MarketplaceConfig,
}

impl<'a> CreditMarketplace<'a> {
    pub fn new(chain: &'a ChainClient, config: &'a MarketplaceConfig) -> Self {
        Self { chain, config }
    }

    /// Offer to lend on the given terms.
    pub async fn create_ask_order(
        &self,
        lender: &Account,
        terms: &LoanTerms,
        expiry_blocks: Option<u32>,
    ) -> ChainResult<TransactionReceipt> {
        let call = self.order_call("create_ask_order", terms, expiry_blocks)?;
        self.submit(lender, &call).await
    }

    /// Request to borrow on the given terms.
    pub async fn create_bid_order(
        &self,
        borrower: &Account,
        terms: &LoanTerms,
        expiry_blocks: Option<u32>,
    ) -> ChainResult<TransactionReceipt> {
        let call = self.order_call("create_bid_order", terms, expiry_blocks)?;
        self.submit(borrower, &call).await
    }

    /// Accept an ask or bid order, creating a deal.
    ///
    /// `order_id` is the identifier returned by `get_ask_orders` or
    /// `get_bid_orders`.
    pub async fn accept_offer(
        &self,
        counterparty: &Account,
        order_id: &str,
        order_type: OrderType,
    ) -> ChainResult<TransactionReceipt> {
        let function = match order_type {
            OrderType::Ask => "accept_ask_order",
            OrderType::Bid => "accept_bid_order",
        };
        let call = RuntimeCall::new(self.config.pallet.as_str(), function)
            .arg("order_id", decode::id_value(order_id)?);
        self.submit(counterparty, &call).await
    }

    /// Repay `amount` CTC of a deal.
    pub async fn repay_loan(
        &self,
        borrower: &Account,
        deal_id: &str,
        amount: Decimal,
    ) -> ChainResult<TransactionReceipt> {
        let planck = units::to_planck(amount)?;
        if planck == 0 {
            return Err(ChainError::InvalidAmount(
                "repayment must be greater than zero".to_string(),
            ));
        }
        let call = RuntimeCall::new(self.config.pallet.as_str(), "repay_loan")
            .arg("deal_id", decode::id_value(deal_id)?)
            .arg("amount", Value::u128(planck));
        self.submit(borrower, &call).await
    }

    /// Ask orders, optionally filtered by lender and status.
    pub async fn get_ask_orders(
        &self,
        lender: Option<&str>,
        status: Option<OrderStatus>,
    ) -> ChainResult<Vec<CreditAskOrder>> {
        let lender = lender.map(|a| self.normalize(a)).transpose()?;
        let format = self.ss58_format();
        let entries = self.entries(ASK_ORDERS).await?;

        Ok(decode_all(&entries, ASK_ORDERS, |e| CreditAskOrder::from_entry(e, format))
            .into_iter()
            .filter(|o| lender.as_ref().map_or(true, |l| &o.lender_address == l))
            .filter(|o| status.map_or(true, |s| o.status == s))
            .collect())
    }

    /// Bid orders, optionally filtered by borrower and status.
    pub async fn get_bid_orders(
        &self,
        borrower: Option<&str>,
        status: Option<OrderStatus>,
    ) -> ChainResult<Vec<CreditBidOrder>> {
        let borrower = borrower.map(|a| self.normalize(a)).transpose()?;
        let format = self.ss58_format();
        let entries = self.entries(BID_ORDERS).await?;

        Ok(decode_all(&entries, BID_ORDERS, |e| CreditBidOrder::from_entry(e, format))
            .into_iter()
            .filter(|o| borrower.as_ref().map_or(true, |b| &o.borrower_address == b))
            .filter(|o| status.map_or(true, |s| o.status == s))
            .collect())
    }

    /// Deals where `participant` is lender or borrower, optionally by status.
    pub async fn get_credit_deals(
        &self,
        participant: Option<&str>,
        status: Option<DealStatus>,
    ) -> ChainResult<Vec<CreditDeal>> {
        let participant = participant.map(|a| self.normalize(a)).transpose()?;
        let format = self.ss58_format();
        let entries = self.entries(DEALS).await?;

        Ok(decode_all(&entries, DEALS, |e| CreditDeal::from_entry(e, format))
            .into_iter()
            .filter(|d| participant.as_ref().map_or(true, |p| d.involves(p)))
            .filter(|d| status.map_or(true, |s| d.status == s))
            .collect())
    }

    fn order_call(
        &self,
        function: &str,
        terms: &LoanTerms,
        expiry_blocks: Option<u32>,
    ) -> ChainResult<RuntimeCall> {
        terms.validate()?;
        let expiry = expiry_blocks.unwrap_or(self.config.default_expiry_blocks);
        if expiry == 0 {
            return Err(ChainError::InvalidAmount(
                "expiry must be at least one block".to_string(),
            ));
        }

        let mut call = RuntimeCall::new(self.config.pallet.as_str(), function)
            .arg("principal", Value::u128(units::to_planck(terms.principal)?))
            .arg(
                "interest_rate",
                Value::u128(u128::from(units::percent_to_basis_points(terms.interest_rate)?)),
            )
            .arg("duration", Value::u128(u128::from(terms.duration_days)))
            .arg("collateral_required", Value::bool(terms.collateral_required))
            .arg("expiry", Value::u128(u128::from(expiry)));

        if terms.collateral_required {
            if let Some(collateral) = terms.collateral_amount.filter(|c| !c.is_zero()) {
                call = call.arg("collateral_amount", Value::u128(units::to_planck(collateral)?));
            }
        }
        Ok(call)
    }

    async fn submit(&self, account: &Account, call: &RuntimeCall) -> ChainResult<TransactionReceipt> {
        let fee = self.chain.estimate_fee(call, account.keypair()).await?;
        let submitted = self
            .chain
            .submit(call, account.keypair(), self.chain.network().wait_for)
            .await?;
        Ok(TransactionReceipt::new(submitted, fee))
    }

    async fn entries(&self, entry: &str) -> ChainResult<Vec<StorageEntry>> {
        self.chain.storage_entries(&self.config.pallet, entry).await
    }

    fn ss58_format(&self) -> u16 {
        self.chain.network().ss58_format
    }

    /// Re-encode a filter address in the configured format.
    fn normalize(&self, address: &str) -> ChainResult<String> {
        ss58::reformat(address, self.ss58_format())
    }
}

/// Decode every entry, skipping the ones that do not fit the model.
fn decode_all<T, F>(entries: &[StorageEntry], map: &str, decode: F) -> Vec<T>
where
    F: Fn(&StorageEntry) -> ChainResult<T>,
{
    entries
        .iter()
        .filter_map(|entry| match decode(entry) {
            Ok(item) => Some(item),
            Err(e) => {
                tracing::warn!(map, key = %entry.key_hex(), error = %e, "Skipping undecodable entry");
                None
            }
        })
        .collect()
}
