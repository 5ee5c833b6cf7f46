pub mod compound;
pub mod late_fee;
pub mod simple;

use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::types::{InterestRegime, RateSnapshot};

pub use compound::CompoundInterest;
pub use late_fee::LateFee;
pub use simple::SimpleInterest;

/// per-installment value for a principal spread over `term` periods
pub trait InstallmentCalculator {
    fn installment_value(&self, principal: Money, term: u32, rate: Rate) -> Result<Money>;

    fn regime(&self) -> InterestRegime;
}

impl InterestRegime {
    /// calculator implementing this regime
    pub fn calculator(&self) -> &'static dyn InstallmentCalculator {
        match self {
            InterestRegime::Simple => &SimpleInterest,
            InterestRegime::Compound => &CompoundInterest,
        }
    }
}

/// installment value for a regime, picking the periodic rate from the snapshot
pub fn installment_value(
    principal: Money,
    term: u32,
    regime: InterestRegime,
    rates: &RateSnapshot,
) -> Result<Money> {
    regime
        .calculator()
        .installment_value(principal, term, regime.rate_from(rates))
}

/// principal must be positive and the term at least one installment
pub fn validate_terms(principal: Money, term: u32) -> Result<()> {
    if !principal.is_positive() {
        return Err(LoanError::InvalidPrincipal { amount: principal });
    }
    if term < 1 {
        return Err(LoanError::InvalidTerm { term });
    }
    Ok(())
}

fn overflow(what: &str) -> LoanError {
    LoanError::CalculationError {
        message: format!("decimal overflow while computing {}", what),
    }
}

pub(crate) fn checked_add(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_add(b).ok_or_else(|| overflow(what))
}

pub(crate) fn checked_sub(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_sub(b).ok_or_else(|| overflow(what))
}

pub(crate) fn checked_mul(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_mul(b).ok_or_else(|| overflow(what))
}

pub(crate) fn checked_div(a: Decimal, b: Decimal, what: &str) -> Result<Decimal> {
    a.checked_div(b).ok_or_else(|| LoanError::CalculationError {
        message: format!("division overflow or by zero while computing {}", what),
    })
}
