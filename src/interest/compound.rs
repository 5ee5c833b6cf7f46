use rust_decimal::{Decimal, MathematicalOps};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::interest::{checked_add, checked_div, checked_mul, checked_sub, validate_terms, InstallmentCalculator};
use crate::types::InterestRegime;

/// amortized loan with equal installments (annuity / price table)
#[derive(Debug, Clone, Copy, Default)]
pub struct CompoundInterest;

impl CompoundInterest {
    /// growth factor (1 + r)^n
    pub fn growth_factor(rate: Rate, periods: u32) -> Result<Decimal> {
        let base = checked_add(Decimal::ONE, rate.as_decimal(), "growth factor")?;
        base.checked_powu(u64::from(periods))
            .ok_or_else(|| LoanError::CalculationError {
                message: format!("decimal overflow while computing growth factor over {} periods", periods),
            })
    }
}

impl InstallmentCalculator for CompoundInterest {
    fn installment_value(&self, principal: Money, term: u32, rate: Rate) -> Result<Money> {
        validate_terms(principal, term)?;

        if rate.is_zero() {
            let share = checked_div(principal.as_decimal(), Decimal::from(term), "annuity")?;
            return Ok(Money::from_decimal(share));
        }

        // V = P * r * (1 + r)^n / ((1 + r)^n - 1)
        let r = rate.as_decimal();
        let factor = Self::growth_factor(rate, term)?;
        let numerator = checked_mul(principal.as_decimal(), checked_mul(r, factor, "annuity")?, "annuity")?;
        let denominator = checked_sub(factor, Decimal::ONE, "annuity")?;

        Ok(Money::from_decimal(checked_div(numerator, denominator, "annuity")?))
    }

    fn regime(&self) -> InterestRegime {
        InterestRegime::Compound
    }
}
