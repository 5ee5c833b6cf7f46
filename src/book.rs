use chrono::{DateTime, NaiveDate, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, instrument, warn};

use crate::config::BookConfig;
use crate::decimal::{Money, Rate};
use crate::errors::{LoanError, Result};
use crate::events::{Event, EventStore};
use crate::interest::late_fee::check_override;
use crate::interest::{installment_value, validate_terms, LateFee};
use crate::payments::InstallmentSchedule;
use crate::state::{Installment, Loan, LoanDraft, LoanTerms, NewLoan};
use crate::store::{JsonFileStore, LoanStore, MemoryStore};
use crate::types::{ClientId, EntityKind, InstallmentId, InterestRegime, LoanId};

/// a loan together with its installments, ordered by number
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanSchedule {
    pub loan: Loan,
    pub installments: Vec<Installment>,
}

impl LoanSchedule {
    pub fn has_paid_installments(&self) -> bool {
        self.installments.iter().any(|i| i.paid)
    }
}

/// The loan book service.
///
/// Owns the store and the clock. Every write runs inside one store
/// transaction; events are only emitted once that transaction committed.
pub struct LoanBook<S: LoanStore> {
    pub(crate) store: S,
    pub(crate) time: SafeTimeProvider,
    pub(crate) config: BookConfig,
    pub(crate) events: EventStore,
}

impl LoanBook<MemoryStore> {
    pub fn in_memory(time: SafeTimeProvider) -> Self {
        Self::new(MemoryStore::new(), time)
    }
}

impl LoanBook<JsonFileStore> {
    /// open a file-backed book at the configured store path
    pub fn open(config: BookConfig, time: SafeTimeProvider) -> Result<Self> {
        let path = config.store_path.clone().ok_or_else(|| LoanError::Configuration {
            message: "store_path is not set".to_string(),
        })?;
        let store = JsonFileStore::open(path)?;
        Ok(Self::new(store, time).with_config(config))
    }
}

impl<S: LoanStore> LoanBook<S> {
    pub fn new(store: S, time: SafeTimeProvider) -> Self {
        Self {
            store,
            time,
            config: BookConfig::default(),
            events: EventStore::new(),
        }
    }

    pub fn with_config(mut self, config: BookConfig) -> Self {
        self.config = config;
        self
    }

    pub fn config(&self) -> &BookConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// direct store access; writes made here bypass events and validation
    pub fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn time(&self) -> &SafeTimeProvider {
        &self.time
    }

    pub(crate) fn now(&self) -> DateTime<Utc> {
        self.time.now()
    }

    /// business date according to the clock
    pub fn today(&self) -> NaiveDate {
        self.time.now().date_naive()
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// Run `work` inside a store transaction.
    ///
    /// Commits when `work` succeeds; any error rolls the store back to the
    /// state seen before the call and is returned unchanged.
    pub fn in_transaction<T>(
        &mut self,
        operation: &str,
        work: impl FnOnce(&mut S) -> Result<T>,
    ) -> Result<T> {
        self.store.begin()?;

        let outcome = work(&mut self.store).and_then(|value| {
            self.store.commit()?;
            Ok(value)
        });

        if let Err(err) = &outcome {
            warn!(operation, error = %err, "transaction failed, rolling back");
            if self.store.in_transaction() {
                if let Err(rollback_err) = self.store.rollback() {
                    error!(operation, error = %rollback_err, "rollback failed");
                }
            }
        }

        outcome
    }

    /// create a loan and its full installment schedule
    #[instrument(skip(self, request), fields(client_id = request.client_id))]
    pub fn create_loan(&mut self, request: NewLoan) -> Result<LoanSchedule> {
        let terms = request.terms;
        validate_terms(terms.principal, terms.term)?;

        if self.store.get_client(request.client_id)?.is_none() {
            return Err(LoanError::not_found(EntityKind::Client, request.client_id));
        }

        let rates = self
            .store
            .rate_configuration()?
            .ok_or(LoanError::MissingRateConfiguration)?
            .snapshot();

        let schedule = InstallmentSchedule::generate(&terms, &rates)?;
        let now = self.now();

        let created = self.in_transaction("create_loan", |store| {
            let loan = store.insert_loan(LoanDraft {
                client_id: request.client_id,
                terms,
                rates,
                created_at: now,
            })?;

            let installments = schedule
                .installments
                .iter()
                .map(|scheduled| store.insert_installment(loan.id, scheduled))
                .collect::<Result<Vec<_>>>()?;

            Ok(LoanSchedule { loan, installments })
        })?;

        info!(
            loan_id = created.loan.id,
            principal = %terms.principal,
            term = terms.term,
            regime = %terms.regime,
            installment_value = %schedule.installment_value,
            "loan created"
        );

        self.events.emit(Event::LoanCreated {
            loan_id: created.loan.id,
            client_id: request.client_id,
            principal: terms.principal,
            term: terms.term,
            regime: terms.regime,
            installment_value: schedule.installment_value,
            timestamp: now,
        });

        Ok(created)
    }

    /// Change a loan's terms and regenerate its whole schedule.
    ///
    /// The rate snapshot taken at creation is kept. The principal is frozen
    /// once any installment has been paid.
    #[instrument(skip(self, terms), fields(loan_id = id))]
    pub fn edit_loan(&mut self, id: LoanId, terms: LoanTerms) -> Result<LoanSchedule> {
        validate_terms(terms.principal, terms.term)?;

        let mut loan = self.loan(id)?;
        let current = self.store.installments_for_loan(id)?;

        if current.iter().any(|i| i.paid) && terms.principal != loan.principal {
            return Err(LoanError::PrincipalLocked { loan_id: id });
        }

        let schedule = InstallmentSchedule::generate(&terms, &loan.rates)?;
        let old_principal = loan.principal;
        let now = self.now();
        loan.apply_terms(terms, now);

        let edited = self.in_transaction("edit_loan", |store| {
            store.delete_installments_for_loan(id)?;
            store.update_loan(&loan)?;

            let installments = schedule
                .installments
                .iter()
                .map(|scheduled| store.insert_installment(id, scheduled))
                .collect::<Result<Vec<_>>>()?;

            Ok(LoanSchedule { loan, installments })
        })?;

        info!(
            discarded = current.len(),
            term = terms.term,
            installment_value = %schedule.installment_value,
            "loan schedule regenerated"
        );

        self.events.emit(Event::ScheduleRegenerated {
            loan_id: id,
            old_principal,
            new_principal: terms.principal,
            term: terms.term,
            installment_value: schedule.installment_value,
            discarded_installments: current.len(),
            timestamp: now,
        });

        Ok(edited)
    }

    /// delete a loan and all of its installments
    #[instrument(skip(self), fields(loan_id = id))]
    pub fn delete_loan(&mut self, id: LoanId) -> Result<()> {
        self.loan(id)?;
        let paid = self
            .store
            .installments_for_loan(id)?
            .iter()
            .filter(|i| i.paid)
            .count();
        if paid > 0 {
            warn!(paid_installments = paid, "deleting loan with payment history");
        }

        let removed = self.in_transaction("delete_loan", |store| {
            let removed = store.delete_installments_for_loan(id)?;
            store.delete_loan(id)?;
            Ok(removed)
        })?;

        info!(removed_installments = removed, "loan deleted");
        let now = self.now();
        self.events.emit(Event::LoanDeleted {
            loan_id: id,
            removed_installments: removed,
            timestamp: now,
        });
        Ok(())
    }

    /// mark an unpaid installment as paid today
    #[instrument(skip(self), fields(installment_id = id))]
    pub fn register_payment(&mut self, id: InstallmentId) -> Result<Installment> {
        let mut installment = self.installment(id)?;
        if installment.paid {
            debug!(payment_date = ?installment.payment_date, "installment already paid");
            return Err(LoanError::AlreadyPaid { installment_id: id });
        }

        let today = self.today();
        installment.mark_paid(today);

        let paid = self.in_transaction("register_payment", |store| {
            store.update_installment(&installment)?;
            Ok(installment)
        })?;

        info!(loan_id = paid.loan_id, number = paid.number, amount = %paid.value, "payment registered");
        self.events.emit(Event::PaymentRegistered {
            loan_id: paid.loan_id,
            installment_id: id,
            number: paid.number,
            amount: paid.value,
            payment_date: today,
        });

        Ok(paid)
    }

    /// replace the value of an unpaid installment; the value may not go down
    #[instrument(skip(self), fields(installment_id = id))]
    pub fn override_installment_value(&mut self, id: InstallmentId, new_value: Money) -> Result<Installment> {
        let installment = self.installment(id)?;
        self.store_override(installment, new_value)
    }

    /// Raise an unpaid installment by a late fee.
    ///
    /// Uses the loan's snapshotted late-fee rate unless `rate` is given.
    #[instrument(skip(self), fields(installment_id = id))]
    pub fn apply_late_fee(&mut self, id: InstallmentId, rate: Option<Rate>) -> Result<Installment> {
        let installment = self.installment(id)?;
        let loan = self.loan(installment.loan_id)?;

        let fee = LateFee::new(rate.unwrap_or(loan.rates.late_fee));
        let old_value = installment.value;
        let days_overdue = installment.days_overdue(self.today());

        let raised = fee.apply(old_value)?;
        let updated = self.store_override(installment, raised)?;

        let now = self.now();
        self.events.emit(Event::LateFeeApplied {
            loan_id: updated.loan_id,
            installment_id: id,
            rate: fee.rate,
            fee_amount: updated.value - old_value,
            days_overdue,
            timestamp: now,
        });

        Ok(updated)
    }

    fn store_override(&mut self, mut installment: Installment, new_value: Money) -> Result<Installment> {
        if installment.paid {
            return Err(LoanError::AlreadyPaid {
                installment_id: installment.id,
            });
        }

        let old_value = installment.value;
        installment.value = check_override(old_value, new_value)?;

        let updated = self.in_transaction("override_installment_value", |store| {
            store.update_installment(&installment)?;
            Ok(installment)
        })?;

        info!(old_value = %old_value, new_value = %updated.value, "installment value overridden");
        let now = self.now();
        self.events.emit(Event::InstallmentValueOverridden {
            loan_id: updated.loan_id,
            installment_id: updated.id,
            old_value,
            new_value: updated.value,
            timestamp: now,
        });

        Ok(updated)
    }

    /// schedule a loan would get with the current rates, without storing anything
    pub fn preview_schedule(&self, terms: &LoanTerms) -> Result<InstallmentSchedule> {
        let rates = self
            .store
            .rate_configuration()?
            .ok_or(LoanError::MissingRateConfiguration)?
            .snapshot();
        InstallmentSchedule::generate(terms, &rates)
    }

    /// estimated installment value for the given terms with the current rates
    pub fn installment_preview(&self, principal: Money, term: u32, regime: InterestRegime) -> Result<Money> {
        let rates = self
            .store
            .rate_configuration()?
            .ok_or(LoanError::MissingRateConfiguration)?
            .snapshot();
        installment_value(principal, term, regime, &rates)
    }

    pub fn loan(&self, id: LoanId) -> Result<Loan> {
        self.store
            .get_loan(id)?
            .ok_or_else(|| LoanError::not_found(EntityKind::Loan, id))
    }

    pub fn loans(&self) -> Result<Vec<Loan>> {
        self.store.list_loans()
    }

    pub fn loan_schedule(&self, id: LoanId) -> Result<LoanSchedule> {
        let loan = self.loan(id)?;
        let installments = self.store.installments_for_loan(id)?;
        Ok(LoanSchedule { loan, installments })
    }

    pub fn loans_for_client(&self, client_id: ClientId) -> Result<Vec<Loan>> {
        if self.store.get_client(client_id)?.is_none() {
            return Err(LoanError::not_found(EntityKind::Client, client_id));
        }
        self.store.loans_for_client(client_id)
    }

    pub fn installment(&self, id: InstallmentId) -> Result<Installment> {
        self.store
            .get_installment(id)?
            .ok_or_else(|| LoanError::not_found(EntityKind::Installment, id))
    }

    pub fn installments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        self.loan(loan_id)?;
        self.store.installments_for_loan(loan_id)
    }

    pub fn has_paid_installments(&self, loan_id: LoanId) -> Result<bool> {
        Ok(self.installments_for_loan(loan_id)?.iter().any(|i| i.paid))
    }
}
