use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::{Money, Rate};
use crate::types::{ClientId, InstallmentId, InterestRegime, LoanId, RateSnapshot, UserId, UserRole};

/// borrower record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Client {
    pub id: ClientId,
    pub name: String,
    /// national tax id (CPF), unique across clients
    pub tax_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// editable client fields, used for both creation and update
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClientDetails {
    pub name: String,
    pub tax_id: String,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub address: Option<String>,
}

impl ClientDetails {
    pub fn new(name: impl Into<String>, tax_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tax_id: tax_id.into(),
            ..Default::default()
        }
    }

    pub fn phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn address(mut self, address: impl Into<String>) -> Self {
        self.address = Some(address.into());
        self
    }

    /// trimmed copy, blank optional fields dropped
    pub fn normalized(&self) -> Self {
        fn optional(value: &Option<String>) -> Option<String> {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        }

        Self {
            name: self.name.trim().to_string(),
            tax_id: self.tax_id.trim().to_string(),
            phone: optional(&self.phone),
            email: optional(&self.email),
            address: optional(&self.address),
        }
    }
}

/// the parameters of a loan that an edit may change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoanTerms {
    pub principal: Money,
    /// number of installments
    pub term: u32,
    pub start_date: NaiveDate,
    pub regime: InterestRegime,
}

/// loan creation request from the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewLoan {
    pub client_id: ClientId,
    pub terms: LoanTerms,
}

impl NewLoan {
    pub fn new(
        client_id: ClientId,
        principal: Money,
        term: u32,
        start_date: NaiveDate,
        regime: InterestRegime,
    ) -> Self {
        Self {
            client_id,
            terms: LoanTerms {
                principal,
                term,
                start_date,
                regime,
            },
        }
    }
}

/// a loan ready to be inserted, rates already snapshotted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoanDraft {
    pub client_id: ClientId,
    pub terms: LoanTerms,
    pub rates: RateSnapshot,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    pub id: LoanId,
    pub client_id: ClientId,
    pub principal: Money,
    pub term: u32,
    pub start_date: NaiveDate,
    pub regime: InterestRegime,
    /// rates captured at creation, never refreshed
    pub rates: RateSnapshot,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Loan {
    pub fn terms(&self) -> LoanTerms {
        LoanTerms {
            principal: self.principal,
            term: self.term,
            start_date: self.start_date,
            regime: self.regime,
        }
    }

    pub fn apply_terms(&mut self, terms: LoanTerms, timestamp: DateTime<Utc>) {
        self.principal = terms.principal;
        self.term = terms.term;
        self.start_date = terms.start_date;
        self.regime = terms.regime;
        self.updated_at = timestamp;
    }

    /// periodic rate used for this loan's regime
    pub fn rate(&self) -> Rate {
        self.regime.rate_from(&self.rates)
    }
}

/// one scheduled payment of a loan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Installment {
    pub id: InstallmentId,
    pub loan_id: LoanId,
    /// 1-based position in the schedule
    pub number: u32,
    pub value: Money,
    pub due_date: NaiveDate,
    pub paid: bool,
    pub payment_date: Option<NaiveDate>,
}

impl Installment {
    pub fn is_overdue(&self, today: NaiveDate) -> bool {
        !self.paid && self.due_date < today
    }

    /// days past the due date, zero when paid or not yet due
    pub fn days_overdue(&self, today: NaiveDate) -> u32 {
        if !self.is_overdue(today) {
            return 0;
        }
        (today - self.due_date).num_days().max(0) as u32
    }

    pub fn mark_paid(&mut self, on: NaiveDate) {
        self.paid = true;
        self.payment_date = Some(on);
    }
}

/// global rates used as the snapshot source for new loans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateConfiguration {
    pub simple: Rate,
    pub compound: Rate,
    pub late_fee: Rate,
    pub updated_at: DateTime<Utc>,
}

impl RateConfiguration {
    pub fn zero(timestamp: DateTime<Utc>) -> Self {
        Self {
            simple: Rate::ZERO,
            compound: Rate::ZERO,
            late_fee: Rate::ZERO,
            updated_at: timestamp,
        }
    }

    pub fn snapshot(&self) -> RateSnapshot {
        RateSnapshot {
            simple: self.simple,
            compound: self.compound,
            late_fee: self.late_fee,
        }
    }
}

/// back-office account; only the bcrypt hash of the password is kept
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// unique regardless of case
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl std::fmt::Debug for User {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// key used for email comparisons
pub fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

/// input for registering a user, password in clear text
#[derive(Clone, PartialEq, Eq)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password: String,
    pub role: UserRole,
}

impl NewUser {
    pub fn new(name: impl Into<String>, email: impl Into<String>, password: impl Into<String>, role: UserRole) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
            password: password.into(),
            role,
        }
    }
}

/// partial update; `None` keeps the stored value
#[derive(Clone, Default, PartialEq, Eq)]
pub struct UserUpdate {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub role: Option<UserRole>,
}

impl UserUpdate {
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    pub fn role(mut self, role: UserRole) -> Self {
        self.role = Some(role);
        self
    }
}

/// a user ready to be inserted, password already hashed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserDraft {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}
