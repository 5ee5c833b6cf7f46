use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::interest::installment_value;
use crate::state::LoanTerms;
use crate::types::{InterestRegime, RateSnapshot};

/// fixed spacing between due dates; not calendar-month aware
pub const INSTALLMENT_INTERVAL_DAYS: i64 = 30;

/// one generated installment, before it has a store id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInstallment {
    pub number: u32,
    pub due_date: NaiveDate,
    pub value: Money,
}

/// installment schedule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallmentSchedule {
    pub principal: Money,
    pub term: u32,
    pub start_date: NaiveDate,
    pub regime: InterestRegime,
    pub rate: Rate,
    pub installment_value: Money,
    pub installments: Vec<ScheduledInstallment>,
    pub total_payment: Money,
    pub total_interest: Money,
}

impl InstallmentSchedule {
    /// generate the full schedule for a loan
    pub fn generate(terms: &LoanTerms, rates: &RateSnapshot) -> Result<Self> {
        let value = installment_value(terms.principal, terms.term, terms.regime, rates)?;

        let installments = (1..=terms.term)
            .map(|number| {
                Ok(ScheduledInstallment {
                    number,
                    due_date: due_date(terms.start_date, number)?,
                    value,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let total_payment = Money::checked_sum(installments.iter().map(|i| i.value), "schedule total")?;
        let total_interest = total_payment
            .checked_sub(terms.principal)
            .ok_or_else(|| LoanError::CalculationError {
                message: "decimal overflow while computing schedule interest".to_string(),
            })?;

        Ok(Self {
            principal: terms.principal,
            term: terms.term,
            start_date: terms.start_date,
            regime: terms.regime,
            rate: terms.regime.rate_from(rates),
            installment_value: value,
            installments,
            total_payment,
            total_interest,
        })
    }

    /// get installment by its 1-based number
    pub fn get(&self, number: u32) -> Option<&ScheduledInstallment> {
        number
            .checked_sub(1)
            .and_then(|index| self.installments.get(index as usize))
    }

    pub fn final_due_date(&self) -> Option<NaiveDate> {
        self.installments.last().map(|i| i.due_date)
    }
}

/// due date of installment `number`: start + 30 × number days
pub fn due_date(start_date: NaiveDate, number: u32) -> Result<NaiveDate> {
    let offset = Duration::days(INSTALLMENT_INTERVAL_DAYS * number as i64);
    start_date
        .checked_add_signed(offset)
        .ok_or_else(|| LoanError::CalculationError {
            message: format!("due date of installment {} is out of range", number),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn rates() -> RateSnapshot {
        RateSnapshot {
            simple: Rate::from_decimal(dec!(0.02)),
            compound: Rate::from_decimal(dec!(0.03)),
            late_fee: Rate::from_decimal(dec!(0.01)),
        }
    }

    fn terms(principal: i64, term: u32, regime: InterestRegime) -> LoanTerms {
        LoanTerms {
            principal: Money::from_major(principal),
            term,
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            regime,
        }
    }

    #[test]
    fn test_simple_schedule() {
        let schedule = InstallmentSchedule::generate(&terms(1200, 12, InterestRegime::Simple), &rates()).unwrap();

        assert_eq!(schedule.installments.len(), 12);
        assert_eq!(schedule.installment_value, Money::from_major(124));
        assert!(schedule.installments.iter().all(|i| i.value == Money::from_major(124)));
        assert_eq!(schedule.total_payment, Money::from_major(1488));
        assert_eq!(schedule.total_interest, Money::from_major(288));
        assert_eq!(schedule.rate, Rate::from_decimal(dec!(0.02)));
    }

    #[test]
    fn test_due_dates_every_thirty_days() {
        let schedule = InstallmentSchedule::generate(&terms(1200, 12, InterestRegime::Simple), &rates()).unwrap();

        // 2024-01-01 + 30 days, not 2024-02-01
        assert_eq!(schedule.get(1).unwrap().due_date, NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(schedule.get(2).unwrap().due_date, NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
        assert_eq!(schedule.final_due_date(), NaiveDate::from_ymd_opt(2024, 12, 26));

        for pair in schedule.installments.windows(2) {
            assert_eq!((pair[1].due_date - pair[0].due_date).num_days(), 30);
            assert_eq!(pair[1].number, pair[0].number + 1);
        }
    }

    #[test]
    fn test_compound_schedule() {
        let schedule = InstallmentSchedule::generate(&terms(1000, 10, InterestRegime::Compound), &rates()).unwrap();

        assert_eq!(schedule.installment_value, Money::from_str_exact("117.23").unwrap());
        assert_eq!(schedule.total_payment, Money::from_str_exact("1172.30").unwrap());
        assert_eq!(schedule.total_interest, Money::from_str_exact("172.30").unwrap());
    }

    #[test]
    fn test_get_out_of_range() {
        let schedule = InstallmentSchedule::generate(&terms(100, 2, InterestRegime::Simple), &rates()).unwrap();
        assert!(schedule.get(0).is_none());
        assert!(schedule.get(3).is_none());
    }

    #[test]
    fn test_invalid_terms_rejected() {
        assert!(matches!(
            InstallmentSchedule::generate(&terms(0, 12, InterestRegime::Simple), &rates()),
            Err(LoanError::InvalidPrincipal { .. })
        ));
        assert!(matches!(
            InstallmentSchedule::generate(&terms(100, 0, InterestRegime::Compound), &rates()),
            Err(LoanError::InvalidTerm { .. })
        ));
    }
}
