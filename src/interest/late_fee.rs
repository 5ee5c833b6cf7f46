use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};

/// late fee ("mora") applied by hand to an overdue installment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LateFee {
    pub rate: Rate,
}

impl LateFee {
    pub fn new(rate: Rate) -> Self {
        Self { rate }
    }

    /// new installment value, round(value × (1 + rate), 2)
    pub fn apply(&self, value: Money) -> Result<Money> {
        value.increase_by(self.rate)
    }

    /// the charged amount on its own
    pub fn fee_on(&self, value: Money) -> Result<Money> {
        self.apply(value)?
            .checked_sub(value)
            .ok_or_else(|| LoanError::CalculationError {
                message: "decimal overflow while computing late fee".to_string(),
            })
    }
}

/// an override may only keep or raise an installment's value
pub fn check_override(current: Money, requested: Money) -> Result<Money> {
    if requested < current {
        return Err(LoanError::InvalidOverride { current, requested });
    }
    Ok(requested)
}
