//! Credit marketplace.
//!
//! Lenders publish ask orders, borrowers publish bid orders, and accepting
//! either side creates a credit deal that the borrower repays over time.

pub mod manager;
pub mod types;

pub use manager::CreditMarketplace;
pub use types::{
    CollateralInfo, CreditAskOrder, CreditBidOrder, CreditDeal, DealStatus, LoanTerms,
    OrderStatus, OrderType, RepaymentSchedule, RepaymentStatus,
};
