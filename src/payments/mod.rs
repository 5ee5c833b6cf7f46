pub mod amortization;

pub use amortization::{
    due_date, InstallmentSchedule, ScheduledInstallment, INSTALLMENT_INTERVAL_DAYS,
};
