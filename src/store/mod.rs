//! Persistence port for the loan book.
//!
//! The service layer only talks to a [`LoanStore`]; it never touches tables
//! directly. Implementations must enforce the referential rules of the book:
//!
//! * a loan can only be inserted for an existing client
//! * an installment can only be inserted for an existing loan, with a number
//!   unique within that loan
//! * deleting a loan deletes its installments
//! * a client that still owns loans cannot be deleted
//! * tax ids are unique across clients
//! * user emails are unique across users, ignoring case and surrounding spaces
//!
//! Writes between [`LoanStore::begin`] and [`LoanStore::commit`] become
//! visible together; [`LoanStore::rollback`] restores the state seen at
//! `begin`.

pub mod file;
pub mod memory;

use chrono::{DateTime, Utc};

use crate::errors::Result;
use crate::payments::ScheduledInstallment;
use crate::state::{Client, ClientDetails, Installment, Loan, LoanDraft, RateConfiguration, User, UserDraft};
use crate::types::{ClientId, InstallmentId, LoanId, UserId};

pub use file::JsonFileStore;
pub use memory::{BookTables, MemoryStore};

pub trait LoanStore: Send {
    // transactions
    fn begin(&mut self) -> Result<()>;
    fn commit(&mut self) -> Result<()>;
    fn rollback(&mut self) -> Result<()>;
    fn in_transaction(&self) -> bool;

    // clients
    fn insert_client(&mut self, details: ClientDetails, created_at: DateTime<Utc>) -> Result<Client>;
    fn get_client(&self, id: ClientId) -> Result<Option<Client>>;
    fn update_client(&mut self, client: &Client) -> Result<()>;
    fn delete_client(&mut self, id: ClientId) -> Result<()>;
    /// all clients ordered by id
    fn list_clients(&self) -> Result<Vec<Client>>;
    fn find_client_by_tax_id(&self, tax_id: &str) -> Result<Option<Client>>;

    // loans
    fn insert_loan(&mut self, draft: LoanDraft) -> Result<Loan>;
    fn get_loan(&self, id: LoanId) -> Result<Option<Loan>>;
    fn update_loan(&mut self, loan: &Loan) -> Result<()>;
    /// delete a loan together with its installments
    fn delete_loan(&mut self, id: LoanId) -> Result<()>;
    /// all loans ordered by id
    fn list_loans(&self) -> Result<Vec<Loan>>;
    fn loans_for_client(&self, client_id: ClientId) -> Result<Vec<Loan>>;

    // installments
    fn insert_installment(&mut self, loan_id: LoanId, scheduled: &ScheduledInstallment) -> Result<Installment>;
    fn get_installment(&self, id: InstallmentId) -> Result<Option<Installment>>;
    fn update_installment(&mut self, installment: &Installment) -> Result<()>;
    /// returns the number of deleted rows
    fn delete_installments_for_loan(&mut self, loan_id: LoanId) -> Result<usize>;
    /// installments of one loan ordered by number
    fn installments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>>;
    /// all installments ordered by id
    fn list_installments(&self) -> Result<Vec<Installment>>;

    // rate configuration (single row)
    fn rate_configuration(&self) -> Result<Option<RateConfiguration>>;
    fn save_rate_configuration(&mut self, config: RateConfiguration) -> Result<()>;

    // users
    fn insert_user(&mut self, draft: UserDraft) -> Result<User>;
    fn get_user(&self, id: UserId) -> Result<Option<User>>;
    fn update_user(&mut self, user: &User) -> Result<()>;
    fn delete_user(&mut self, id: UserId) -> Result<()>;
    /// all users ordered by id
    fn list_users(&self) -> Result<Vec<User>>;
    /// lookup ignoring case and surrounding spaces
    fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;
}
