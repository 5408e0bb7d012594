//! CTC ⇄ planck conversion.
//!
//! The chain stores amounts as integers of planck (10^-18 CTC). Human-facing
//! amounts are `Decimal` so that conversions are exact.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::chain::types::{ChainError, ChainResult};

/// Number of decimals of the native token.
pub const DECIMALS: u32 = 18;

/// Native token symbol.
pub const SYMBOL: &str = "CTC";

/// One CTC in planck.
pub const PLANCK_PER_CTC: u128 = 1_000_000_000_000_000_000;

/// Convert planck to CTC, or `None` if the value exceeds `Decimal`'s range.
pub fn try_from_planck(planck: u128) -> Option<Decimal> {
    let mantissa = i128::try_from(planck).ok()?;
    Decimal::try_from_i128_with_scale(mantissa, DECIMALS)
        .ok()
        .map(|d| d.normalize())
}

/// Convert planck to CTC, saturating at `Decimal::MAX`.
///
/// Use [`try_from_planck`] where an out-of-range amount must not be shown.
pub fn from_planck(planck: u128) -> Decimal {
    try_from_planck(planck).unwrap_or_else(|| {
        tracing::warn!(planck = %planck, "Amount exceeds decimal range, saturating");
        Decimal::MAX
    })
}

/// Convert a CTC amount to planck.
///
/// Rejects negative amounts, amounts finer than one planck and amounts that
/// overflow.
pub fn to_planck(amount: Decimal) -> ChainResult<u128> {
    if amount.is_sign_negative() && !amount.is_zero() {
        return Err(ChainError::InvalidAmount(format!(
            "{} is negative",
            amount
        )));
    }
    if amount.normalize().scale() > DECIMALS {
        return Err(ChainError::InvalidAmount(format!(
            "{} has more than {} decimals",
            amount, DECIMALS
        )));
    }

    let scaled = amount
        .checked_mul(Decimal::from(PLANCK_PER_CTC as u64))
        .ok_or_else(|| ChainError::InvalidAmount(format!("{} is too large", amount)))?;

    scaled
        .trunc()
        .to_u128()
        .ok_or_else(|| ChainError::InvalidAmount(format!("{} is not representable", amount)))
}

/// Parse a human amount such as `"12.5"`.
pub fn parse_ctc(input: &str) -> ChainResult<u128> {
    let amount: Decimal = input
        .trim()
        .parse()
        .map_err(|e| ChainError::InvalidAmount(format!("'{}': {}", input, e)))?;
    to_planck(amount)
}

/// Format planck as `"<amount> CTC"`, or `"<planck> planck"` when out of range.
pub fn format_ctc(planck: u128) -> String {
    match try_from_planck(planck) {
        Some(amount) => format!("{} {}", amount, SYMBOL),
        None => format!("{} planck", planck),
    }
}

/// Convert an interest rate in percent to basis points.
pub fn percent_to_basis_points(percent: Decimal) -> ChainResult<u32> {
    if percent.is_sign_negative() && !percent.is_zero() {
        return Err(ChainError::InvalidAmount(format!(
            "interest rate {} is negative",
            percent
        )));
    }
    percent
        .checked_mul(Decimal::ONE_HUNDRED)
        .and_then(|bps| bps.round().to_u32())
        .ok_or_else(|| ChainError::InvalidAmount(format!("interest rate {} is too large", percent)))
}

/// Convert basis points back to percent.
pub fn basis_points_to_percent(bps: u128) -> Decimal {
    Decimal::from_i128_with_scale(bps.min(i64::MAX as u128) as i128, 2).normalize()
}
