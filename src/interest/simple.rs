use rust_decimal::Decimal;

use crate::decimal::{Money, Rate};
use crate::errors::Result;
use crate::interest::{checked_add, checked_div, checked_mul, validate_terms, InstallmentCalculator};
use crate::types::InterestRegime;

/// flat interest: every period charges `rate` on the original principal
#[derive(Debug, Clone, Copy, Default)]
pub struct SimpleInterest;

impl SimpleInterest {
    /// total interest over the whole term, P × r × n
    pub fn total_interest(principal: Money, term: u32, rate: Rate) -> Result<Decimal> {
        let per_period = checked_mul(principal.as_decimal(), rate.as_decimal(), "simple interest")?;
        checked_mul(per_period, Decimal::from(term), "simple interest")
    }
}

impl InstallmentCalculator for SimpleInterest {
    fn installment_value(&self, principal: Money, term: u32, rate: Rate) -> Result<Money> {
        validate_terms(principal, term)?;

        let interest = Self::total_interest(principal, term, rate)?;
        let total = checked_add(principal.as_decimal(), interest, "simple interest")?;

        Ok(Money::from_decimal(checked_div(total, Decimal::from(term), "simple installment")?))
    }

    fn regime(&self) -> InterestRegime {
        InterestRegime::Simple
    }
}
