pub mod book;
pub mod clients;
pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod interest;
pub mod logging;
pub mod payments;
pub mod rates;
pub mod reports;
pub mod state;
pub mod store;
pub mod types;
pub mod users;

// re-export key types
pub use book::{LoanBook, LoanSchedule};
pub use config::BookConfig;
pub use decimal::{Money, Rate};
pub use errors::{LoanError, Result};
pub use events::{Event, EventStore};
pub use interest::{CompoundInterest, InstallmentCalculator, LateFee, SimpleInterest};
pub use payments::{InstallmentSchedule, ScheduledInstallment, INSTALLMENT_INTERVAL_DAYS};
pub use reports::{DashboardIndicators, FinancialSummary, LoanStatement, MonthlySummary, UpcomingInstallment};
pub use state::{
    Client, ClientDetails, Installment, Loan, LoanDraft, LoanTerms, NewLoan, NewUser, RateConfiguration, User, UserDraft,
    UserUpdate,
};
pub use store::{BookTables, JsonFileStore, LoanStore, MemoryStore};
pub use types::{ClientId, EntityKind, InstallmentId, InterestRegime, LoanId, Page, RateSnapshot, UserId, UserRole};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
