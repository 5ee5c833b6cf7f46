use thiserror::Error;

use crate::decimal::Money;
use crate::types::EntityKind;

#[derive(Error, Debug)]
pub enum LoanError {
    #[error("invalid principal: {amount} (must be greater than zero)")]
    InvalidPrincipal {
        amount: Money,
    },

    #[error("invalid term: {term} (at least one installment is required)")]
    InvalidTerm {
        term: u32,
    },

    #[error("interest rates are not configured")]
    MissingRateConfiguration,

    #[error("principal of loan {loan_id} cannot change while it has paid installments")]
    PrincipalLocked {
        loan_id: u64,
    },

    #[error("invalid override: new value {requested} is below the current value {current}")]
    InvalidOverride {
        current: Money,
        requested: Money,
    },

    #[error("{entity} not found: {id}")]
    NotFound {
        entity: EntityKind,
        id: u64,
    },

    #[error("installment {installment_id} is already paid")]
    AlreadyPaid {
        installment_id: u64,
    },

    #[error("invalid client: {message}")]
    InvalidClient {
        message: String,
    },

    #[error("tax id already registered: {tax_id}")]
    DuplicateTaxId {
        tax_id: String,
    },

    #[error("client {client_id} still owns {loan_count} loan(s)")]
    ClientHasLoans {
        client_id: u64,
        loan_count: usize,
    },

    #[error("invalid user: {message}")]
    InvalidUser {
        message: String,
    },

    #[error("email already registered: {email}")]
    DuplicateEmail {
        email: String,
    },

    #[error("password hashing failed: {message}")]
    PasswordHash {
        message: String,
    },

    #[error("calculation error: {message}")]
    CalculationError {
        message: String,
    },

    #[error("persistence error: {message}")]
    Persistence {
        message: String,
    },

    #[error("invalid transaction state: {message}")]
    TransactionState {
        message: String,
    },

    #[error("invalid configuration: {message}")]
    Configuration {
        message: String,
    },
}

impl LoanError {
    pub fn not_found(entity: EntityKind, id: u64) -> Self {
        LoanError::NotFound { entity, id }
    }
}

impl From<std::io::Error> for LoanError {
    fn from(err: std::io::Error) -> Self {
        LoanError::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for LoanError {
    fn from(err: serde_json::Error) -> Self {
        LoanError::Persistence {
            message: err.to_string(),
        }
    }
}

impl From<bcrypt::BcryptError> for LoanError {
    fn from(err: bcrypt::BcryptError) -> Self {
        LoanError::PasswordHash {
            message: err.to_string(),
        }
    }
}

impl From<config::ConfigError> for LoanError {
    fn from(err: config::ConfigError) -> Self {
        LoanError::Configuration {
            message: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, LoanError>;
