use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::errors::{LoanError, Result};
use crate::payments::ScheduledInstallment;
use crate::state::{email_key, Client, ClientDetails, Installment, Loan, LoanDraft, RateConfiguration, User, UserDraft};
use crate::store::LoanStore;
use crate::types::{ClientId, EntityKind, InstallmentId, LoanId, UserId};

/// last id handed out per table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Sequences {
    pub client: u64,
    pub loan: u64,
    pub installment: u64,
    pub user: u64,
}

/// every table of the book, serialisable as one document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookTables {
    pub clients: BTreeMap<ClientId, Client>,
    pub loans: BTreeMap<LoanId, Loan>,
    pub installments: BTreeMap<InstallmentId, Installment>,
    pub rates: Option<RateConfiguration>,
    pub users: BTreeMap<UserId, User>,
    pub sequences: Sequences,
}

impl BookTables {
    fn tax_id_taken(&self, tax_id: &str, except: Option<ClientId>) -> bool {
        self.clients
            .values()
            .any(|c| c.tax_id == tax_id && Some(c.id) != except)
    }

    fn email_taken(&self, email: &str, except: Option<UserId>) -> bool {
        let key = email_key(email);
        self.users
            .values()
            .any(|u| email_key(&u.email) == key && Some(u.id) != except)
    }
}

/// in-memory store; a transaction checkpoints the tables and restores them on rollback
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: BookTables,
    checkpoint: Option<BookTables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_tables(tables: BookTables) -> Self {
        Self {
            tables,
            checkpoint: None,
        }
    }

    pub fn tables(&self) -> &BookTables {
        &self.tables
    }
}

impl LoanStore for MemoryStore {
    fn begin(&mut self) -> Result<()> {
        if self.checkpoint.is_some() {
            return Err(LoanError::TransactionState {
                message: "a transaction is already open".to_string(),
            });
        }
        self.checkpoint = Some(self.tables.clone());
        debug!("transaction started");
        Ok(())
    }

    fn commit(&mut self) -> Result<()> {
        if self.checkpoint.take().is_none() {
            return Err(LoanError::TransactionState {
                message: "commit without an open transaction".to_string(),
            });
        }
        debug!("transaction committed");
        Ok(())
    }

    fn rollback(&mut self) -> Result<()> {
        match self.checkpoint.take() {
            Some(tables) => {
                self.tables = tables;
                debug!("transaction rolled back");
                Ok(())
            }
            None => Err(LoanError::TransactionState {
                message: "rollback without an open transaction".to_string(),
            }),
        }
    }

    fn in_transaction(&self) -> bool {
        self.checkpoint.is_some()
    }

    fn insert_client(&mut self, details: ClientDetails, created_at: DateTime<Utc>) -> Result<Client> {
        if self.tables.tax_id_taken(&details.tax_id, None) {
            return Err(LoanError::DuplicateTaxId {
                tax_id: details.tax_id,
            });
        }

        self.tables.sequences.client += 1;
        let client = Client {
            id: self.tables.sequences.client,
            name: details.name,
            tax_id: details.tax_id,
            phone: details.phone,
            email: details.email,
            address: details.address,
            created_at,
            updated_at: created_at,
        };
        self.tables.clients.insert(client.id, client.clone());
        Ok(client)
    }

    fn get_client(&self, id: ClientId) -> Result<Option<Client>> {
        Ok(self.tables.clients.get(&id).cloned())
    }

    fn update_client(&mut self, client: &Client) -> Result<()> {
        if !self.tables.clients.contains_key(&client.id) {
            return Err(LoanError::not_found(EntityKind::Client, client.id));
        }
        if self.tables.tax_id_taken(&client.tax_id, Some(client.id)) {
            return Err(LoanError::DuplicateTaxId {
                tax_id: client.tax_id.clone(),
            });
        }
        self.tables.clients.insert(client.id, client.clone());
        Ok(())
    }

    fn delete_client(&mut self, id: ClientId) -> Result<()> {
        if !self.tables.clients.contains_key(&id) {
            return Err(LoanError::not_found(EntityKind::Client, id));
        }
        let loan_count = self
            .tables
            .loans
            .values()
            .filter(|l| l.client_id == id)
            .count();
        if loan_count > 0 {
            return Err(LoanError::ClientHasLoans {
                client_id: id,
                loan_count,
            });
        }
        self.tables.clients.remove(&id);
        Ok(())
    }

    fn list_clients(&self) -> Result<Vec<Client>> {
        Ok(self.tables.clients.values().cloned().collect())
    }

    fn find_client_by_tax_id(&self, tax_id: &str) -> Result<Option<Client>> {
        Ok(self
            .tables
            .clients
            .values()
            .find(|c| c.tax_id == tax_id)
            .cloned())
    }

    fn insert_loan(&mut self, draft: LoanDraft) -> Result<Loan> {
        if !self.tables.clients.contains_key(&draft.client_id) {
            return Err(LoanError::not_found(EntityKind::Client, draft.client_id));
        }

        self.tables.sequences.loan += 1;
        let loan = Loan {
            id: self.tables.sequences.loan,
            client_id: draft.client_id,
            principal: draft.terms.principal,
            term: draft.terms.term,
            start_date: draft.terms.start_date,
            regime: draft.terms.regime,
            rates: draft.rates,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        };
        self.tables.loans.insert(loan.id, loan.clone());
        Ok(loan)
    }

    fn get_loan(&self, id: LoanId) -> Result<Option<Loan>> {
        Ok(self.tables.loans.get(&id).cloned())
    }

    fn update_loan(&mut self, loan: &Loan) -> Result<()> {
        if !self.tables.loans.contains_key(&loan.id) {
            return Err(LoanError::not_found(EntityKind::Loan, loan.id));
        }
        if !self.tables.clients.contains_key(&loan.client_id) {
            return Err(LoanError::not_found(EntityKind::Client, loan.client_id));
        }
        self.tables.loans.insert(loan.id, loan.clone());
        Ok(())
    }

    fn delete_loan(&mut self, id: LoanId) -> Result<()> {
        if self.tables.loans.remove(&id).is_none() {
            return Err(LoanError::not_found(EntityKind::Loan, id));
        }
        self.tables.installments.retain(|_, i| i.loan_id != id);
        Ok(())
    }

    fn list_loans(&self) -> Result<Vec<Loan>> {
        Ok(self.tables.loans.values().cloned().collect())
    }

    fn loans_for_client(&self, client_id: ClientId) -> Result<Vec<Loan>> {
        Ok(self
            .tables
            .loans
            .values()
            .filter(|l| l.client_id == client_id)
            .cloned()
            .collect())
    }

    fn insert_installment(&mut self, loan_id: LoanId, scheduled: &ScheduledInstallment) -> Result<Installment> {
        if !self.tables.loans.contains_key(&loan_id) {
            return Err(LoanError::not_found(EntityKind::Loan, loan_id));
        }
        let duplicate = self
            .tables
            .installments
            .values()
            .any(|i| i.loan_id == loan_id && i.number == scheduled.number);
        if duplicate {
            return Err(LoanError::Persistence {
                message: format!(
                    "installment {} already exists for loan {}",
                    scheduled.number, loan_id
                ),
            });
        }

        self.tables.sequences.installment += 1;
        let installment = Installment {
            id: self.tables.sequences.installment,
            loan_id,
            number: scheduled.number,
            value: scheduled.value,
            due_date: scheduled.due_date,
            paid: false,
            payment_date: None,
        };
        self.tables.installments.insert(installment.id, installment.clone());
        Ok(installment)
    }

    fn get_installment(&self, id: InstallmentId) -> Result<Option<Installment>> {
        Ok(self.tables.installments.get(&id).cloned())
    }

    fn update_installment(&mut self, installment: &Installment) -> Result<()> {
        match self.tables.installments.get_mut(&installment.id) {
            Some(existing) => {
                *existing = installment.clone();
                Ok(())
            }
            None => Err(LoanError::not_found(EntityKind::Installment, installment.id)),
        }
    }

    fn delete_installments_for_loan(&mut self, loan_id: LoanId) -> Result<usize> {
        let before = self.tables.installments.len();
        self.tables.installments.retain(|_, i| i.loan_id != loan_id);
        Ok(before - self.tables.installments.len())
    }

    fn installments_for_loan(&self, loan_id: LoanId) -> Result<Vec<Installment>> {
        let mut installments: Vec<Installment> = self
            .tables
            .installments
            .values()
            .filter(|i| i.loan_id == loan_id)
            .cloned()
            .collect();
        installments.sort_by_key(|i| i.number);
        Ok(installments)
    }

    fn list_installments(&self) -> Result<Vec<Installment>> {
        Ok(self.tables.installments.values().cloned().collect())
    }

    fn rate_configuration(&self) -> Result<Option<RateConfiguration>> {
        Ok(self.tables.rates)
    }

    fn save_rate_configuration(&mut self, config: RateConfiguration) -> Result<()> {
        self.tables.rates = Some(config);
        Ok(())
    }

    fn insert_user(&mut self, draft: UserDraft) -> Result<User> {
        if self.tables.email_taken(&draft.email, None) {
            return Err(LoanError::DuplicateEmail { email: draft.email });
        }

        self.tables.sequences.user += 1;
        let user = User {
            id: self.tables.sequences.user,
            name: draft.name,
            email: draft.email,
            password_hash: draft.password_hash,
            role: draft.role,
            created_at: draft.created_at,
            updated_at: draft.created_at,
        };
        self.tables.users.insert(user.id, user.clone());
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.tables.users.get(&id).cloned())
    }

    fn update_user(&mut self, user: &User) -> Result<()> {
        if !self.tables.users.contains_key(&user.id) {
            return Err(LoanError::not_found(EntityKind::User, user.id));
        }
        if self.tables.email_taken(&user.email, Some(user.id)) {
            return Err(LoanError::DuplicateEmail {
                email: user.email.clone(),
            });
        }
        self.tables.users.insert(user.id, user.clone());
        Ok(())
    }

    fn delete_user(&mut self, id: UserId) -> Result<()> {
        match self.tables.users.remove(&id) {
            Some(_) => Ok(()),
            None => Err(LoanError::not_found(EntityKind::User, id)),
        }
    }

    fn list_users(&self) -> Result<Vec<User>> {
        Ok(self.tables.users.values().cloned().collect())
    }

    fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let key = email_key(email);
        if key.is_empty() {
            return Ok(None);
        }
        Ok(self
            .tables
            .users
            .values()
            .find(|u| email_key(&u.email) == key)
            .cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::state::LoanTerms;
    use crate::types::{InterestRegime, RateSnapshot};
    use chrono::{NaiveDate, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn draft(client_id: ClientId) -> LoanDraft {
        LoanDraft {
            client_id,
            terms: LoanTerms {
                principal: Money::from_major(1000),
                term: 2,
                start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                regime: InterestRegime::Simple,
            },
            rates: RateSnapshot::default(),
            created_at: now(),
        }
    }

    fn scheduled(number: u32) -> ScheduledInstallment {
        ScheduledInstallment {
            number,
            due_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            value: Money::from_major(500),
        }
    }

    #[test]
    fn test_ids_are_sequential() {
        let mut store = MemoryStore::new();
        let a = store.insert_client(ClientDetails::new("Ana", "1"), now()).unwrap();
        let b = store.insert_client(ClientDetails::new("Bruno", "2"), now()).unwrap();
        assert_eq!((a.id, b.id), (1, 2));

        store.delete_client(b.id).unwrap();
        let c = store.insert_client(ClientDetails::new("Carla", "3"), now()).unwrap();
        assert_eq!(c.id, 3);
    }

    #[test]
    fn test_unique_tax_id() {
        let mut store = MemoryStore::new();
        store.insert_client(ClientDetails::new("Ana", "111"), now()).unwrap();
        let result = store.insert_client(ClientDetails::new("Outra Ana", "111"), now());
        assert!(matches!(result, Err(LoanError::DuplicateTaxId { .. })));
    }

    fn user(email: &str) -> UserDraft {
        UserDraft {
            name: "Ana".to_string(),
            email: email.to_string(),
            password_hash: "hash".to_string(),
            role: crate::types::UserRole::Operator,
            created_at: now(),
        }
    }

    #[test]
    fn test_unique_email_ignores_case() {
        let mut store = MemoryStore::new();
        let ana = store.insert_user(user("ana@example.com")).unwrap();
        let bia = store.insert_user(user("bia@example.com")).unwrap();

        assert!(matches!(
            store.insert_user(user(" ANA@example.com")),
            Err(LoanError::DuplicateEmail { .. })
        ));

        let mut renamed = bia.clone();
        renamed.email = "Ana@Example.com".to_string();
        assert!(matches!(store.update_user(&renamed), Err(LoanError::DuplicateEmail { .. })));

        assert_eq!(store.find_user_by_email("  ANA@EXAMPLE.COM ").unwrap(), Some(ana));
        assert_eq!(store.find_user_by_email("").unwrap(), None);

        store.delete_user(bia.id).unwrap();
        assert!(matches!(
            store.delete_user(bia.id),
            Err(LoanError::NotFound { entity: EntityKind::User, .. })
        ));
    }

    #[test]
    fn test_loan_requires_client() {
        let mut store = MemoryStore::new();
        let result = store.insert_loan(draft(42));
        assert!(matches!(
            result,
            Err(LoanError::NotFound { entity: EntityKind::Client, id: 42 })
        ));
    }

    #[test]
    fn test_installment_requires_loan_and_unique_number() {
        let mut store = MemoryStore::new();
        assert!(store.insert_installment(7, &scheduled(1)).is_err());

        let client = store.insert_client(ClientDetails::new("Ana", "1"), now()).unwrap();
        let loan = store.insert_loan(draft(client.id)).unwrap();
        store.insert_installment(loan.id, &scheduled(1)).unwrap();
        assert!(matches!(
            store.insert_installment(loan.id, &scheduled(1)),
            Err(LoanError::Persistence { .. })
        ));
    }

    #[test]
    fn test_delete_loan_cascades() {
        let mut store = MemoryStore::new();
        let client = store.insert_client(ClientDetails::new("Ana", "1"), now()).unwrap();
        let loan = store.insert_loan(draft(client.id)).unwrap();
        let other = store.insert_loan(draft(client.id)).unwrap();
        store.insert_installment(loan.id, &scheduled(1)).unwrap();
        store.insert_installment(loan.id, &scheduled(2)).unwrap();
        store.insert_installment(other.id, &scheduled(1)).unwrap();

        store.delete_loan(loan.id).unwrap();

        assert!(store.installments_for_loan(loan.id).unwrap().is_empty());
        assert_eq!(store.list_installments().unwrap().len(), 1);
    }

    #[test]
    fn test_client_with_loans_cannot_be_deleted() {
        let mut store = MemoryStore::new();
        let client = store.insert_client(ClientDetails::new("Ana", "1"), now()).unwrap();
        store.insert_loan(draft(client.id)).unwrap();

        assert!(matches!(
            store.delete_client(client.id),
            Err(LoanError::ClientHasLoans { loan_count: 1, .. })
        ));
    }

    #[test]
    fn test_rollback_restores_tables() {
        let mut store = MemoryStore::new();
        let client = store.insert_client(ClientDetails::new("Ana", "1"), now()).unwrap();
        let before = store.tables().clone();

        store.begin().unwrap();
        let loan = store.insert_loan(draft(client.id)).unwrap();
        store.insert_installment(loan.id, &scheduled(1)).unwrap();
        assert!(store.in_transaction());
        store.rollback().unwrap();

        assert_eq!(store.tables(), &before);
        assert!(!store.in_transaction());
    }

    #[test]
    fn test_nested_or_dangling_transactions_rejected() {
        let mut store = MemoryStore::new();
        assert!(store.commit().is_err());
        assert!(store.rollback().is_err());

        store.begin().unwrap();
        assert!(matches!(store.begin(), Err(LoanError::TransactionState { .. })));
        store.commit().unwrap();
    }
}
