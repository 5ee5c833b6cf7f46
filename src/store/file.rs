use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::errors::Result;
use crate::payments::ScheduledInstallment;
use crate::state::{Client, ClientDetails, Installment, Loan, LoanDraft, RateConfiguration, User, UserDraft};
use crate::store::{BookTables, LoanStore, MemoryStore};
use crate::types::{ClientId, InstallmentId, LoanId, UserId};

/// JSON document store: the whole book lives in one file.
///
/// Reads are served from memory. The file is rewritten on every commit, and
/// after every write made outside a transaction. Writes go to a sibling temp
/// file first and are renamed into place.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    inner: MemoryStore,
}

impl JsonFileStore {
    /// open the book at `path`; a missing file is an empty book
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let tables = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str::<BookTables>(&raw)?
        } else {
            BookTables::default()
        };

        info!(
            path = %path.display(),
            clients = tables.clients.len(),
            loans = tables.loans.len(),
            "opened loan book"
        );

        Ok(Self {
            path,
            inner: MemoryStore::from_tables(tables),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// write the current tables to disk
    pub fn flush(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(self.inner.tables())?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), "loan book flushed");
        Ok(())
    }

    fn written(&self) -> Result<()> {
        if self.inner.in_transaction() {
            Ok(())
        } else {
            self.flush()
        }
    }
}

impl LoanStore for JsonFileStore {
    fn begin(&mut self) -> Result<()> {
        self.inner.begin()
    }

    fn commit(&mut self) -> Result<()> {
        // disk first; the transaction stays open if the write fails
        if !self.inner.in_transaction() {
            return self.inner.commit();
        }
        self.flush()?;
        self.inner.commit()
    }

    fn rollback(&mut self) -> Result<()> {
        self.inner.rollback()
    }

    fn in_transaction(&self) -> bool {
        self.inner.in_transaction()
    }

    fn insert_client(&mut self, details: ClientDetails, created_at: DateTime<Utc>) -> Result<Client> {
        let client = self.inner.insert_client(details, created_at)?;
        self.written()?;
        Ok(client)
    }

    fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        self.inner.get_client(id)
    }

    fn update_client(&mut self, client: &Client) -> Result<()> {
        self.inner.update_client(client)?;
        self.written()
    }

    fn delete_client(&mut self, id: ClientId) -> Result<()> {
        self.inner.delete_client(id)?;
        self.written()
    }

    fn list_clients(&self) -> Result<Vec<Client>> {
        self.inner.list_clients()
    }

    fn find_client_by_tax_id(&self, tax_id: &str) -> Result<Option<Client>> {
        self.inner.find_client_by_tax_id(tax_id)
    }

    fn insert_loan(&mut self, draft: LoanDraft) -> Result<Loan> {
        let loan = self.inner.insert_loan(draft)?;
        self.written()?;
        Ok(loan)
    }

    fn get_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        self.inner.get_loan(id)
    }

    fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        self.inner.update_loan(loan)?;
        self.written()
    }

    fn delete_loan(&mut self, id: LoanId) -> Result<()> {
        self.inner.delete_loan(id)?;
        self.written()
    }

    fn list_loans(&self) -> Result<Vec<Loan>> {
        self.inner.list_loans()
    }

    fn loans_for_client(&self, client_id: ClientId) -> Result<Vec<Loan>> {
        self.inner.loans_for_client(client_id)
    }

    fn insert_installment(&mut self, loan_id: LoanId, scheduled: &ScheduledInstallment) -> Result<Installment> {
        let installment = self.inner.insert_installment(loan_id, scheduled)?;
        self.written()?;
        Ok(installment)
    }

    fn get_installment(&self, id: InstallmentId) -> Result<Option<Installment>> {
        self.inner.get_installment(id)
    }

    fn update_installment(&mut self, installment: &Installment) -> Result<()> {
        self.inner.update_installment(installment)?;
        self.written()
    }

    fn delete_installments_for_loan(&mut self, loan_id: LoanId) -> Result<usize> {
        let deleted = self.inner.delete_installments_for_loan(loan_id)?;
        self.written()?;
        Ok(deleted)
    }

    fn installments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        self.inner.installments_for_loan(loan_id)
    }

    fn list_installments(&self) -> Result<Vec<Installment>> {
        self.inner.list_installments()
    }

    fn rate_configuration(&self) -> Result<Option<RateConfiguration>> {
        self.inner.rate_configuration()
    }

    fn save_rate_configuration(&mut self, config: RateConfiguration) -> Result<()> {
        self.inner.save_rate_configuration(config)?;
        self.written()
    }

    fn insert_user(&mut self, draft: UserDraft) -> Result<User> {
        let user = self.inner.insert_user(draft)?;
        self.written()?;
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        self.inner.get_user(id)
    }

    fn update_user(&mut self, user: &User) -> Result<()> {
        self.inner.update_user(user)?;
        self.written()
    }

    fn delete_user(&mut self, id: UserId) -> Result<()> {
        self.inner.delete_user(id)?;
        self.written()
    }

    fn list_users(&self) -> Result<Vec<User>> {
        self.inner.list_users()
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.inner.find_user_by_email(email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_missing_file_is_empty_book() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("book.json")).unwrap();
        assert!(store.list_clients().unwrap().is_empty());
        assert!(store.rate_configuration().unwrap().is_none());
    }

    #[test]
    fn test_writes_outside_transaction_are_flushed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.insert_client(ClientDetails::new("Ana", "1"), now()).unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.list_clients().unwrap().len(), 1);
    }

    #[test]
    fn test_rolled_back_writes_never_reach_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("book.json");

        let mut store = JsonFileStore::open(&path).unwrap();
        store.insert_client(ClientDetails::new("Ana", "1"), now()).unwrap();

        store.begin().unwrap();
        store.insert_client(ClientDetails::new("Bruno", "2"), now()).unwrap();
        store.rollback().unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        let names: Vec<String> = reopened.list_clients().unwrap().into_iter().map(|c| c.name).collect();
        assert_eq!(names, vec!["Ana".to_string()]);
    }

    #[test]
    fn test_book_without_users_still_opens() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        fs::write(
            &path,
            r#"{ "clients": {}, "sequences": { "client": 3, "loan": 0, "installment": 0 } }"#,
        )
        .unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.list_users().unwrap().is_empty());
        assert_eq!(store.inner.tables().sequences.client, 3);
    }

    #[test]
    fn test_corrupt_file_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(
            JsonFileStore::open(&path),
            Err(crate::errors::LoanError::Persistence { .. })
        ));
    }
}
