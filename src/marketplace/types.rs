//! Credit marketplace models.
//!
//! Amounts are CTC (`Decimal`); interest and late-fee rates are annual
//! percentages. On chain they are planck and basis points respectively.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use subxt::ext::scale_value::Value;

use crate::account::ss58;
use crate::chain::backend::StorageEntry;
use crate::chain::decode;
use crate::chain::types::{ChainError, ChainResult};
use crate::chain::units;

const DAYS_PER_YEAR: u32 = 365;

fn overflow(what: &str) -> ChainError {
    ChainError::InvalidAmount(format!("{} overflows", what))
}

/// CTC value of a planck amount read from chain.
fn ctc(planck: u128, field: &str) -> ChainResult<Decimal> {
    units::try_from_planck(planck)
        .ok_or_else(|| ChainError::Decode(format!("{} of {} planck is out of range", field, planck)))
}

/// `start` plus `days`, or the latest representable time.
fn add_days(start: DateTime<Utc>, days: u32) -> DateTime<Utc> {
    start
        .checked_add_days(Days::new(u64::from(days)))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Terms of a loan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    /// Principal in CTC.
    pub principal: Decimal,
    /// Annual percentage rate.
    pub interest_rate: Decimal,
    pub duration_days: u32,
    pub collateral_required: bool,
    /// Collateral in CTC.
    pub collateral_amount: Option<Decimal>,
    pub grace_period_days: u32,
    /// Percentage of the amount due charged once the grace period is over.
    pub late_fee_percentage: Decimal,
}

impl LoanTerms {
    /// Unsecured terms with no grace period or late fee.
    pub fn new(principal: Decimal, interest_rate: Decimal, duration_days: u32) -> Self {
        Self {
            principal,
            interest_rate,
            duration_days,
            collateral_required: false,
            collateral_amount: None,
            grace_period_days: 0,
            late_fee_percentage: Decimal::ZERO,
        }
    }

    pub fn with_collateral(mut self, amount: Decimal) -> Self {
        self.collateral_required = true;
        self.collateral_amount = Some(amount);
        self
    }

    pub fn with_grace_period(mut self, days: u32) -> Self {
        self.grace_period_days = days;
        self
    }

    pub fn with_late_fee(mut self, percentage: Decimal) -> Self {
        self.late_fee_percentage = percentage;
        self
    }

    /// Reject terms the marketplace cannot represent.
    pub fn validate(&self) -> ChainResult<()> {
        if self.principal <= Decimal::ZERO {
            return Err(ChainError::InvalidAmount(
                "principal must be greater than zero".to_string(),
            ));
        }
        if self.interest_rate.is_sign_negative() {
            return Err(ChainError::InvalidAmount(
                "interest rate cannot be negative".to_string(),
            ));
        }
        if self.duration_days == 0 {
            return Err(ChainError::InvalidAmount(
                "duration must be at least one day".to_string(),
            ));
        }
        if self.late_fee_percentage.is_sign_negative() {
            return Err(ChainError::InvalidAmount(
                "late fee cannot be negative".to_string(),
            ));
        }
        if let Some(collateral) = self.collateral_amount {
            if collateral.is_sign_negative() {
                return Err(ChainError::InvalidAmount(
                    "collateral cannot be negative".to_string(),
                ));
            }
        }
        self.total_due()?;
        Ok(())
    }

    /// Simple interest on `amount` over the loan duration.
    pub fn interest_on(&self, amount: Decimal) -> ChainResult<Decimal> {
        amount
            .checked_mul(self.interest_rate)
            .and_then(|v| v.checked_mul(Decimal::from(self.duration_days)))
            .and_then(|v| v.checked_div(Decimal::from(100 * DAYS_PER_YEAR)))
            .ok_or_else(|| overflow("interest"))
    }

    /// Simple interest on the principal.
    pub fn interest_due(&self) -> ChainResult<Decimal> {
        self.interest_on(self.principal)
    }

    /// Principal plus interest.
    pub fn total_due(&self) -> ChainResult<Decimal> {
        self.principal
            .checked_add(self.interest_due()?)
            .ok_or_else(|| overflow("total due"))
    }

    /// Late fee on `amount_due`.
    pub fn late_fee_on(&self, amount_due: Decimal) -> ChainResult<Decimal> {
        amount_due
            .checked_mul(self.late_fee_percentage)
            .and_then(|v| v.checked_div(Decimal::ONE_HUNDRED))
            .ok_or_else(|| overflow("late fee"))
    }

    /// Decode the term fields shared by orders and deals.
    pub(crate) fn from_value(value: &Value) -> ChainResult<Self> {
        let principal = decode::require_u128(value, &["principal"])?;
        let interest_bps = decode::require_u128(value, &["interest_rate"])?;
        let duration = decode::field(value, &["duration", "duration_days"])
            .and_then(decode::as_u64)
            .and_then(|d| u32::try_from(d).ok())
            .ok_or_else(|| ChainError::Decode("missing numeric field duration".to_string()))?;
        let collateral_required = decode::field(value, &["collateral_required"])
            .and_then(decode::as_bool)
            .unwrap_or(false);
        let collateral = decode::u128_field_or_zero(value, &["collateral_amount"]);
        let grace_period_days = decode::field(value, &["grace_period", "grace_period_days"])
            .and_then(decode::as_u64)
            .and_then(|d| u32::try_from(d).ok())
            .unwrap_or(0);
        let late_fee_bps = decode::u128_field_or_zero(value, &["late_fee", "late_fee_rate"]);

        Ok(Self {
            principal: ctc(principal, "principal")?,
            interest_rate: units::basis_points_to_percent(interest_bps),
            duration_days: duration,
            collateral_required,
            collateral_amount: match collateral {
                0 => None,
                planck => Some(ctc(planck, "collateral_amount")?),
            },
            grace_period_days,
            late_fee_percentage: units::basis_points_to_percent(late_fee_bps),
        })
    }
}

/// Side of the order book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderType {
    /// Lender offering credit.
    Ask,
    /// Borrower requesting credit.
    Bid,
}

impl FromStr for OrderType {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ask" => Ok(OrderType::Ask),
            "bid" => Ok(OrderType::Bid),
            other => Err(ChainError::Decode(format!("unknown order type '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderStatus {
    Active,
    Filled,
    Cancelled,
    Expired,
}

impl FromStr for OrderStatus {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "active" => Ok(OrderStatus::Active),
            "filled" => Ok(OrderStatus::Filled),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            "expired" => Ok(OrderStatus::Expired),
            other => Err(ChainError::Decode(format!("unknown order status '{}'", other))),
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OrderStatus::Active => "active",
            OrderStatus::Filled => "filled",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::Expired => "expired",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Pending,
    Completed,
    Disputed,
    Cancelled,
}

impl FromStr for DealStatus {
    type Err = ChainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pending" => Ok(DealStatus::Pending),
            "completed" => Ok(DealStatus::Completed),
            "disputed" => Ok(DealStatus::Disputed),
            "cancelled" | "canceled" => Ok(DealStatus::Cancelled),
            other => Err(ChainError::Decode(format!("unknown deal status '{}'", other))),
        }
    }
}

impl fmt::Display for DealStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DealStatus::Pending => "pending",
            DealStatus::Completed => "completed",
            DealStatus::Disputed => "disputed",
            DealStatus::Cancelled => "cancelled",
        };
        f.write_str(s)
    }
}

fn status_text(value: &Value) -> ChainResult<String> {
    decode::field(value, &["status"])
        .and_then(decode::as_text)
        .ok_or_else(|| ChainError::Decode("missing status field".to_string()))
}

fn account_field(value: &Value, names: &[&str], ss58_format: u16) -> ChainResult<String> {
    let account = decode::require_account(value, names)?;
    ss58::encode(&account, ss58_format)
}

fn block_field(value: &Value, names: &[&str]) -> Option<u64> {
    decode::field(value, names).and_then(decode::as_u64)
}

fn id_field(value: &Value, names: &[&str]) -> ChainResult<String> {
    let field = decode::field(value, names)
        .ok_or_else(|| ChainError::Decode(format!("missing id field {}", names.join("|"))))?;
    decode::id_text(field)
        .ok_or_else(|| ChainError::Decode(format!("unreadable id field {}", names.join("|"))))
}

fn amount_field(value: &Value, names: &[&str]) -> ChainResult<Decimal> {
    ctc(decode::u128_field_or_zero(value, names), names[0])
}

/// Lender's offer of credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditAskOrder {
    pub order_id: String,
    pub lender_address: String,
    pub terms: LoanTerms,
    pub expiry_block: u64,
    pub status: OrderStatus,
    pub created_block: u64,
    /// CTC already lent against this order.
    pub filled_amount: Decimal,
}

impl CreditAskOrder {
    pub fn from_entry(entry: &StorageEntry, ss58_format: u16) -> ChainResult<Self> {
        let value = &entry.value;
        Ok(Self {
            order_id: entry.id()?,
            lender_address: account_field(value, &["lender", "who"], ss58_format)?,
            terms: LoanTerms::from_value(value)?,
            expiry_block: block_field(value, &["expiry", "expiry_block"]).unwrap_or(0),
            status: status_text(value)?.parse()?,
            created_block: block_field(value, &["created_block", "block"]).unwrap_or(0),
            filled_amount: amount_field(value, &["filled_amount"])?,
        })
    }

    /// CTC still available to borrowers.
    pub fn remaining_amount(&self) -> Decimal {
        (self.terms.principal - self.filled_amount).max(Decimal::ZERO)
    }

    pub fn is_expired_at(&self, block: u64) -> bool {
        self.status == OrderStatus::Expired || (self.expiry_block > 0 && block >= self.expiry_block)
    }
}

/// Borrower's request for credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditBidOrder {
    pub order_id: String,
    pub borrower_address: String,
    pub terms: LoanTerms,
    pub expiry_block: u64,
    pub status: OrderStatus,
    pub created_block: u64,
    pub filled_amount: Decimal,
}

impl CreditBidOrder {
    pub fn from_entry(entry: &StorageEntry, ss58_format: u16) -> ChainResult<Self> {
        let value = &entry.value;
        Ok(Self {
            order_id: entry.id()?,
            borrower_address: account_field(value, &["borrower", "who"], ss58_format)?,
            terms: LoanTerms::from_value(value)?,
            expiry_block: block_field(value, &["expiry", "expiry_block"]).unwrap_or(0),
            status: status_text(value)?.parse()?,
            created_block: block_field(value, &["created_block", "block"]).unwrap_or(0),
            filled_amount: amount_field(value, &["filled_amount"])?,
        })
    }

    pub fn remaining_amount(&self) -> Decimal {
        (self.terms.principal - self.filled_amount).max(Decimal::ZERO)
    }

    pub fn is_expired_at(&self, block: u64) -> bool {
        self.status == OrderStatus::Expired || (self.expiry_block > 0 && block >= self.expiry_block)
    }
}

/// Matched loan between a lender and a borrower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreditDeal {
    pub deal_id: String,
    pub ask_order_id: String,
    pub bid_order_id: String,
    pub lender_address: String,
    pub borrower_address: String,
    pub terms: LoanTerms,
    /// CTC lent.
    pub amount: Decimal,
    pub status: DealStatus,
    pub created_block: u64,
    pub start_block: Option<u64>,
    pub end_block: Option<u64>,
    pub repaid_amount: Decimal,
    pub collateral_liquidated: bool,
}

impl CreditDeal {
    pub fn from_entry(entry: &StorageEntry, ss58_format: u16) -> ChainResult<Self> {
        let value = &entry.value;
        Ok(Self {
            deal_id: entry.id()?,
            ask_order_id: id_field(value, &["ask_order_id"])?,
            bid_order_id: id_field(value, &["bid_order_id"])?,
            lender_address: account_field(value, &["lender"], ss58_format)?,
            borrower_address: account_field(value, &["borrower"], ss58_format)?,
            terms: LoanTerms::from_value(value)?,
            amount: ctc(decode::require_u128(value, &["amount"])?, "amount")?,
            status: status_text(value)?.parse()?,
            created_block: block_field(value, &["created_block", "block"]).unwrap_or(0),
            start_block: block_field(value, &["start_block"]),
            end_block: block_field(value, &["end_block"]),
            repaid_amount: amount_field(value, &["repaid_amount"])?,
            collateral_liquidated: decode::field(value, &["liquidated"])
                .and_then(decode::as_bool)
                .unwrap_or(false),
        })
    }

    pub fn involves(&self, address: &str) -> bool {
        self.lender_address == address || self.borrower_address == address
    }

    /// Amount plus simple interest over the loan duration.
    pub fn total_due(&self) -> ChainResult<Decimal> {
        self.amount
            .checked_add(self.terms.interest_on(self.amount)?)
            .ok_or_else(|| overflow("total due"))
    }

    /// What the borrower still owes, never negative.
    pub fn outstanding(&self) -> ChainResult<Decimal> {
        let total = self.total_due()?;
        Ok(total
            .checked_sub(self.repaid_amount)
            .unwrap_or(Decimal::ZERO)
            .max(Decimal::ZERO))
    }

    /// Repayment schedule for a deal that started at `start`, evaluated at `now`.
    ///
    /// Overdue once `now` passes the due date plus the grace period; the late
    /// fee is then added to the outstanding amount. Dates past chrono's range
    /// clamp to the latest representable time.
    pub fn repayment_schedule(
        &self,
        start: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> ChainResult<RepaymentSchedule> {
        let due_date = add_days(start, self.terms.duration_days);
        let grace_end = add_days(due_date, self.terms.grace_period_days);
        let outstanding = self.outstanding()?;

        let status = if outstanding.is_zero() || self.status == DealStatus::Completed {
            RepaymentStatus::Paid
        } else if now > grace_end {
            RepaymentStatus::Overdue
        } else {
            RepaymentStatus::Pending
        };

        let late_fee = match status {
            RepaymentStatus::Overdue => self.terms.late_fee_on(outstanding)?,
            _ => Decimal::ZERO,
        };

        Ok(RepaymentSchedule {
            deal_id: self.deal_id.clone(),
            total_amount: self
                .total_due()?
                .checked_add(late_fee)
                .ok_or_else(|| overflow("total amount"))?,
            principal: self.amount,
            interest: self.terms.interest_on(self.amount)?,
            late_fee,
            outstanding: outstanding
                .checked_add(late_fee)
                .ok_or_else(|| overflow("outstanding amount"))?,
            due_date,
            status,
        })
    }

    /// Collateral backing this deal, if the terms require any.
    pub fn collateral_info(&self) -> Option<CollateralInfo> {
        if !self.terms.collateral_required {
            return None;
        }
        Some(CollateralInfo {
            deal_id: self.deal_id.clone(),
            collateral_amount: self.terms.collateral_amount.unwrap_or(Decimal::ZERO),
            collateral_asset: units::SYMBOL.to_string(),
            locked_block: self.start_block.unwrap_or(self.created_block),
            release_block: match self.status {
                DealStatus::Completed | DealStatus::Cancelled => self.end_block,
                _ => None,
            },
            liquidated: self.collateral_liquidated,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepaymentStatus {
    Pending,
    Paid,
    Overdue,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepaymentSchedule {
    pub deal_id: String,
    pub total_amount: Decimal,
    pub principal: Decimal,
    pub interest: Decimal,
    pub late_fee: Decimal,
    pub outstanding: Decimal,
    pub due_date: DateTime<Utc>,
    pub status: RepaymentStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollateralInfo {
    pub deal_id: String,
    pub collateral_amount: Decimal,
    pub collateral_asset: String,
    pub locked_block: u64,
    pub release_block: Option<u64>,
    pub liquidated: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use rust_decimal_macros::dec;

    const ALICE: [u8; 32] = [
        0xd4, 0x35, 0x93, 0xc7, 0x15, 0xfd, 0xd3, 0x1c, 0x61, 0x14, 0x1a, 0xbd, 0x04, 0xa9, 0x9f,
        0xd6, 0x82, 0x2c, 0x85, 0x58, 0x85, 0x4c, 0xcd, 0xe3, 0x9a, 0x56, 0x84, 0xe7, 0xa5, 0x6d,
        0xa2, 0x7d,
    ];
    const ALICE_ADDRESS: &str = "5GrwvaEF5zXb26Fz9rcQpDWS57CtERHpNehXCPcNoHGKutQY";
    const ONE_CTC: u128 = 1_000_000_000_000_000_000;

    fn order_value(owner_field: &str, status: &str) -> Value {
        Value::named_composite([
            (owner_field, Value::from_bytes(ALICE)),
            ("principal", Value::u128(1_000 * ONE_CTC)),
            ("interest_rate", Value::u128(500)),
            ("duration", Value::u128(30)),
            ("collateral_required", Value::bool(true)),
            ("collateral_amount", Value::u128(1_500 * ONE_CTC)),
            ("expiry", Value::u128(14_400)),
            ("status", Value::unnamed_variant(status, Vec::<Value>::new())),
            ("created_block", Value::u128(100)),
            ("filled_amount", Value::u128(250 * ONE_CTC)),
        ])
    }

    #[test]
    fn test_simple_interest() {
        let terms = LoanTerms::new(dec!(1000), dec!(5), 365);
        assert_eq!(terms.interest_due().unwrap(), dec!(50));
        assert_eq!(terms.total_due().unwrap(), dec!(1050));

        let short = LoanTerms::new(dec!(730), dec!(10), 30);
        assert_eq!(short.interest_due().unwrap(), dec!(6));
    }

    #[test]
    fn test_interest_overflow_is_an_error() {
        let terms = LoanTerms::new(dec!(1000), Decimal::MAX, 30);
        assert!(matches!(terms.interest_due(), Err(ChainError::InvalidAmount(_))));
        assert!(matches!(terms.total_due(), Err(ChainError::InvalidAmount(_))));
        assert!(matches!(terms.validate(), Err(ChainError::InvalidAmount(_))));

        let fee = LoanTerms::new(dec!(1), dec!(1), 1).with_late_fee(Decimal::MAX);
        assert!(matches!(fee.late_fee_on(dec!(1000)), Err(ChainError::InvalidAmount(_))));
    }

    #[test]
    fn test_terms_validation() {
        assert!(LoanTerms::new(dec!(100), dec!(5), 30).validate().is_ok());
        assert!(LoanTerms::new(dec!(0), dec!(5), 30).validate().is_err());
        assert!(LoanTerms::new(dec!(100), dec!(-1), 30).validate().is_err());
        assert!(LoanTerms::new(dec!(100), dec!(5), 0).validate().is_err());
        assert!(LoanTerms::new(dec!(100), dec!(5), 30)
            .with_collateral(dec!(-5))
            .validate()
            .is_err());
    }

    #[test]
    fn test_status_parsing_is_case_insensitive() {
        assert_eq!("Active".parse::<OrderStatus>().unwrap(), OrderStatus::Active);
        assert_eq!("FILLED".parse::<OrderStatus>().unwrap(), OrderStatus::Filled);
        assert_eq!("canceled".parse::<DealStatus>().unwrap(), DealStatus::Cancelled);
        assert_eq!("bid".parse::<OrderType>().unwrap(), OrderType::Bid);
        assert!("open".parse::<OrderStatus>().is_err());
    }

    fn entry(id: &[u8], value: Value) -> StorageEntry {
        // Blake2_128Concat hash bytes ahead of the key itself.
        let mut key = vec![0x77; 16];
        key.extend_from_slice(id);
        StorageEntry {
            key,
            keys: vec![Value::from_bytes(id)],
            value,
        }
    }

    #[test]
    fn test_ask_order_from_entry() {
        let entry = entry(&[0xab, 0xcd], order_value("lender", "Active"));
        let order = CreditAskOrder::from_entry(&entry, 42).unwrap();

        assert_eq!(order.order_id, "0xabcd");
        assert_eq!(order.lender_address, ALICE_ADDRESS);
        assert_eq!(order.terms.principal, dec!(1000));
        assert_eq!(order.terms.interest_rate, dec!(5));
        assert_eq!(order.terms.duration_days, 30);
        assert_eq!(order.terms.collateral_amount, Some(dec!(1500)));
        assert_eq!(order.status, OrderStatus::Active);
        assert_eq!(order.expiry_block, 14_400);
        assert_eq!(order.created_block, 100);
        assert_eq!(order.remaining_amount(), dec!(750));
        assert!(!order.is_expired_at(14_399));
        assert!(order.is_expired_at(14_400));
    }

    #[test]
    fn test_out_of_range_amount_is_undecodable() {
        let mut value = order_value("lender", "Active");
        if let subxt::ext::scale_value::ValueDef::Composite(
            subxt::ext::scale_value::Composite::Named(fields),
        ) = &mut value.value
        {
            for (name, field) in fields.iter_mut() {
                if name == "principal" {
                    *field = Value::u128(u128::MAX);
                }
            }
        }
        let result = CreditAskOrder::from_entry(&entry(&[0xab, 0xcd], value), 42);
        assert!(matches!(result, Err(ChainError::Decode(_))));
    }

    #[test]
    fn test_bid_order_requires_borrower() {
        let bad = entry(&[1, 1], order_value("lender", "Active"));
        assert!(CreditBidOrder::from_entry(&bad, 42).is_err());

        let entry = entry(&[1, 1], order_value("borrower", "Expired"));
        let order = CreditBidOrder::from_entry(&entry, 42).unwrap();
        assert_eq!(order.status, OrderStatus::Expired);
        assert!(order.is_expired_at(0));
    }

    fn deal() -> CreditDeal {
        CreditDeal {
            deal_id: "0x01".to_string(),
            ask_order_id: "0x02".to_string(),
            bid_order_id: "0x03".to_string(),
            lender_address: ALICE_ADDRESS.to_string(),
            borrower_address: "borrower".to_string(),
            terms: LoanTerms::new(dec!(1000), dec!(10), 73)
                .with_collateral(dec!(200))
                .with_grace_period(5)
                .with_late_fee(dec!(2)),
            amount: dec!(1000),
            status: DealStatus::Pending,
            created_block: 10,
            start_block: Some(12),
            end_block: None,
            repaid_amount: dec!(500),
            collateral_liquidated: false,
        }
    }

    #[test]
    fn test_deal_outstanding() {
        let deal = deal();
        // 1000 * 10% * 73 / 365 = 20
        assert_eq!(deal.total_due().unwrap(), dec!(1020));
        assert_eq!(deal.outstanding().unwrap(), dec!(520));
        assert!(deal.involves(ALICE_ADDRESS));
        assert!(deal.involves("borrower"));
        assert!(!deal.involves("someone"));

        let mut overpaid = deal;
        overpaid.repaid_amount = dec!(2000);
        assert_eq!(overpaid.outstanding().unwrap(), Decimal::ZERO);
    }

    #[test]
    fn test_repayment_schedule_states() {
        let deal = deal();
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let pending = deal.repayment_schedule(start, start + Duration::days(10)).unwrap();
        assert_eq!(pending.status, RepaymentStatus::Pending);
        assert_eq!(pending.due_date, start + Duration::days(73));
        assert_eq!(pending.interest, dec!(20));
        assert_eq!(pending.outstanding, dec!(520));

        // Inside the grace period.
        let grace = deal.repayment_schedule(start, start + Duration::days(76)).unwrap();
        assert_eq!(grace.status, RepaymentStatus::Pending);

        let overdue = deal.repayment_schedule(start, start + Duration::days(80)).unwrap();
        assert_eq!(overdue.status, RepaymentStatus::Overdue);
        assert_eq!(overdue.late_fee, dec!(10.4));
        assert_eq!(overdue.outstanding, dec!(530.4));

        let mut repaid = deal;
        repaid.repaid_amount = dec!(1020);
        let paid = repaid
            .repayment_schedule(start, start + Duration::days(400))
            .unwrap();
        assert_eq!(paid.status, RepaymentStatus::Paid);
        assert_eq!(paid.late_fee, Decimal::ZERO);
    }

    #[test]
    fn test_repayment_schedule_clamps_far_due_dates() {
        let mut deal = deal();
        deal.terms.duration_days = u32::MAX;
        deal.terms.interest_rate = Decimal::ZERO;
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();

        let schedule = deal.repayment_schedule(start, start).unwrap();
        assert_eq!(schedule.due_date, DateTime::<Utc>::MAX_UTC);
        assert_eq!(schedule.status, RepaymentStatus::Pending);
        assert_eq!(schedule.outstanding, dec!(500));
    }

    #[test]
    fn test_collateral_info() {
        let mut deal = deal();
        let info = deal.collateral_info().unwrap();
        assert_eq!(info.collateral_amount, dec!(200));
        assert_eq!(info.collateral_asset, "CTC");
        assert_eq!(info.locked_block, 12);
        assert_eq!(info.release_block, None);

        deal.status = DealStatus::Completed;
        deal.end_block = Some(900);
        assert_eq!(deal.collateral_info().unwrap().release_block, Some(900));

        deal.terms.collateral_required = false;
        assert!(deal.collateral_info().is_none());
    }

    #[test]
    fn test_deal_from_entry() {
        let value = Value::named_composite([
            ("ask_order_id", Value::from_bytes([0xaa, 0xbb])),
            (
                "bid_order_id",
                Value::unnamed_composite([Value::u128(7), Value::from_bytes([0xcc, 0xdd])]),
            ),
            ("lender", Value::from_bytes(ALICE)),
            ("borrower", Value::from_bytes(ALICE)),
            ("principal", Value::u128(100 * ONE_CTC)),
            ("interest_rate", Value::u128(1_250)),
            ("duration", Value::u128(90)),
            ("collateral_required", Value::bool(false)),
            ("amount", Value::u128(100 * ONE_CTC)),
            ("status", Value::string("Completed")),
            ("created_block", Value::u128(5)),
            ("start_block", Value::u128(6)),
            ("repaid_amount", Value::u128(ONE_CTC)),
        ]);
        let entry = StorageEntry {
            key: vec![0x99; 20],
            keys: vec![Value::u128(9)],
            value,
        };
        let deal = CreditDeal::from_entry(&entry, 42).unwrap();

        assert_eq!(deal.deal_id, "9");
        assert_eq!(deal.ask_order_id, "0xaabb");
        assert_eq!(deal.bid_order_id, "7/0xccdd");
        assert_eq!(deal.terms.interest_rate, dec!(12.5));
        assert_eq!(deal.amount, dec!(100));
        assert_eq!(deal.repaid_amount, dec!(1));
        assert_eq!(deal.status, DealStatus::Completed);
        assert_eq!(deal.start_block, Some(6));
        assert_eq!(deal.end_block, None);
    }
}
