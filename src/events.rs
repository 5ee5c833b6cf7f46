use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{ClientId, InstallmentId, InterestRegime, LoanId, UserId, UserRole};

/// all events emitted by the loan book
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // client events
    ClientRegistered {
        client_id: ClientId,
        name: String,
        timestamp: DateTime<Utc>,
    },
    ClientUpdated {
        client_id: ClientId,
        timestamp: DateTime<Utc>,
    },
    ClientRemoved {
        client_id: ClientId,
        timestamp: DateTime<Utc>,
    },

    // loan lifecycle events
    LoanCreated {
        loan_id: LoanId,
        client_id: ClientId,
        principal: Money,
        term: u32,
        regime: InterestRegime,
        installment_value: Money,
        timestamp: DateTime<Utc>,
    },
    ScheduleRegenerated {
        loan_id: LoanId,
        old_principal: Money,
        new_principal: Money,
        term: u32,
        installment_value: Money,
        discarded_installments: usize,
        timestamp: DateTime<Utc>,
    },
    LoanDeleted {
        loan_id: LoanId,
        removed_installments: usize,
        timestamp: DateTime<Utc>,
    },

    // installment events
    PaymentRegistered {
        loan_id: LoanId,
        installment_id: InstallmentId,
        number: u32,
        amount: Money,
        payment_date: NaiveDate,
    },
    InstallmentValueOverridden {
        loan_id: LoanId,
        installment_id: InstallmentId,
        old_value: Money,
        new_value: Money,
        timestamp: DateTime<Utc>,
    },
    LateFeeApplied {
        loan_id: LoanId,
        installment_id: InstallmentId,
        rate: Rate,
        fee_amount: Money,
        days_overdue: u32,
        timestamp: DateTime<Utc>,
    },

    // user events
    UserRegistered {
        user_id: UserId,
        email: String,
        role: UserRole,
        timestamp: DateTime<Utc>,
    },
    UserUpdated {
        user_id: UserId,
        password_changed: bool,
        timestamp: DateTime<Utc>,
    },
    UserRemoved {
        user_id: UserId,
        timestamp: DateTime<Utc>,
    },

    // configuration events
    RatesUpdated {
        simple: Rate,
        compound: Rate,
        late_fee: Rate,
        timestamp: DateTime<Utc>,
    },
}

/// event store for collecting events during operations
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    pub fn emit(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        std::mem::take(&mut self.events)
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
