//! Read-only portfolio reports.
//!
//! Every report is computed from the store on demand; "today" and the current
//! month come from the book's clock.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::book::LoanBook;
use crate::decimal::Money;
use crate::errors::{LoanError, Result};
use crate::interest::{checked_add, checked_div, checked_sub};
use crate::state::{Client, Installment, Loan};
use crate::store::LoanStore;
use crate::types::{InstallmentId, LoanId};

/// headline numbers for the dashboard
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DashboardIndicators {
    /// loans with at least one unpaid installment
    pub active_loans: usize,
    /// unpaid installments whose due date has passed
    pub overdue_installments: usize,
    pub outstanding: Money,
    pub total_lent: Money,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinancialSummary {
    pub total_lent: Money,
    pub total_collected: Money,
    pub total_outstanding: Money,
    /// outstanding minus the principal still to be repaid, never negative
    pub estimated_future_interest: Money,
}

/// collections for the calendar month containing `today`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub year: i32,
    pub month: u32,
    /// installments paid this month, by payment date
    pub collected: Money,
    /// unpaid installments falling due this month
    pub pending: Money,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpcomingInstallment {
    pub installment_id: InstallmentId,
    pub client_name: String,
    pub loan_id: LoanId,
    pub number: u32,
    pub due_date: NaiveDate,
    pub value: Money,
}

/// everything needed to render one loan's report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanStatement {
    pub client: Client,
    pub loan: Loan,
    pub installments: Vec<Installment>,
    pub total_scheduled: Money,
    pub total_paid: Money,
    pub total_outstanding: Money,
    pub generated_on: NaiveDate,
}

impl LoanStatement {
    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn outstanding_of(total: Money, paid: Money) -> Result<Money> {
    total.checked_sub(paid).ok_or_else(|| LoanError::CalculationError {
        message: "decimal overflow while computing outstanding balance".to_string(),
    })
}

fn same_month(date: NaiveDate, today: NaiveDate) -> bool {
    date.year() == today.year() && date.month() == today.month()
}

impl<S: LoanStore> LoanBook<S> {
    pub fn dashboard_indicators(&self) -> Result<DashboardIndicators> {
        let today = self.today();
        let installments = self.store.list_installments()?;

        let mut active = BTreeSet::new();
        let mut overdue_installments = 0;
        for inst in installments.iter().filter(|i| !i.paid) {
            active.insert(inst.loan_id);
            if inst.is_overdue(today) {
                overdue_installments += 1;
            }
        }

        let outstanding = Money::checked_sum(
            installments.iter().filter(|i| !i.paid).map(|i| i.value),
            "outstanding",
        )?;
        let total_lent = Money::checked_sum(self.store.list_loans()?.iter().map(|l| l.principal), "total lent")?;

        Ok(DashboardIndicators {
            active_loans: active.len(),
            overdue_installments,
            outstanding,
            total_lent,
        })
    }

    pub fn financial_summary(&self) -> Result<FinancialSummary> {
        let loans: BTreeMap<LoanId, Loan> = self
            .store
            .list_loans()?
            .into_iter()
            .map(|l| (l.id, l))
            .collect();
        let installments = self.store.list_installments()?;

        let total_lent = Money::checked_sum(loans.values().map(|l| l.principal), "total lent")?;
        let total_collected = Money::checked_sum(
            installments.iter().filter(|i| i.paid).map(|i| i.value),
            "total collected",
        )?;
        let total_outstanding = Money::checked_sum(
            installments.iter().filter(|i| !i.paid).map(|i| i.value),
            "outstanding",
        )?;

        // principal share counted once per unpaid installment row
        let principal_due = installments
            .iter()
            .filter(|i| !i.paid)
            .filter_map(|i| loans.get(&i.loan_id))
            .try_fold(Decimal::ZERO, |acc, l| {
                let share = checked_div(l.principal.as_decimal(), Decimal::from(l.term), "principal due")?;
                checked_add(acc, share, "principal due")
            })?;

        let interest = checked_sub(total_outstanding.as_decimal(), principal_due, "future interest")?.max(Decimal::ZERO);

        Ok(FinancialSummary {
            total_lent,
            total_collected,
            total_outstanding,
            estimated_future_interest: Money::from_decimal(interest),
        })
    }

    pub fn monthly_summary(&self) -> Result<MonthlySummary> {
        let today = self.today();
        let installments = self.store.list_installments()?;

        let collected = Money::checked_sum(
            installments
                .iter()
                .filter(|i| i.paid && i.payment_date.is_some_and(|paid_on| same_month(paid_on, today)))
                .map(|i| i.value),
            "monthly collections",
        )?;
        let pending = Money::checked_sum(
            installments
                .iter()
                .filter(|i| !(i.paid && i.payment_date.is_some()) && same_month(i.due_date, today))
                .map(|i| i.value),
            "monthly pending",
        )?;

        Ok(MonthlySummary {
            year: today.year(),
            month: today.month(),
            collected,
            pending,
        })
    }

    /// Unpaid installments due today or later, soonest first.
    ///
    /// `None` uses the configured limit.
    pub fn upcoming_due(&self, limit: Option<usize>) -> Result<Vec<UpcomingInstallment>> {
        let today = self.today();
        let limit = limit.unwrap_or(self.config.upcoming_limit);

        let mut due: Vec<Installment> = self
            .store
            .list_installments()?
            .into_iter()
            .filter(|i| !i.paid && i.due_date >= today)
            .collect();
        due.sort_by_key(|i| (i.due_date, i.loan_id, i.number));
        due.truncate(limit);

        let mut rows = Vec::with_capacity(due.len());
        for inst in due {
            let loan = self.loan(inst.loan_id)?;
            let client = self.client(loan.client_id)?;
            rows.push(UpcomingInstallment {
                installment_id: inst.id,
                client_name: client.name,
                loan_id: inst.loan_id,
                number: inst.number,
                due_date: inst.due_date,
                value: inst.value,
            });
        }

        debug!(rows = rows.len(), limit, "upcoming installments");
        Ok(rows)
    }

    pub fn loan_statement(&self, loan_id: LoanId) -> Result<LoanStatement> {
        let schedule = self.loan_schedule(loan_id)?;
        let client = self.client(schedule.loan.client_id)?;

        let total_scheduled = Money::checked_sum(schedule.installments.iter().map(|i| i.value), "scheduled total")?;
        let total_paid = Money::checked_sum(
            schedule.installments.iter().filter(|i| i.paid).map(|i| i.value),
            "paid total",
        )?;

        Ok(LoanStatement {
            client,
            loan: schedule.loan,
            total_outstanding: outstanding_of(total_scheduled, total_paid)?,
            installments: schedule.installments,
            total_scheduled,
            total_paid,
            generated_on: self.today(),
        })
    }
}
