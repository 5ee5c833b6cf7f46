//! Back-office user accounts.
//!
//! Passwords are hashed with bcrypt at the configured cost and never stored
//! in clear text. Emails are matched ignoring case and surrounding spaces.

use tracing::{debug, info, instrument, warn};

use crate::book::LoanBook;
use crate::errors::{LoanError, Result};
use crate::events::Event;
use crate::state::{email_key, NewUser, User, UserDraft, UserUpdate};
use crate::store::LoanStore;
use crate::types::{EntityKind, Page, UserId};

fn required(value: &str, field: &str) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(LoanError::InvalidUser {
            message: format!("{} is required", field),
        });
    }
    Ok(value.to_string())
}

fn valid_email(email: &str) -> Result<String> {
    let email = required(email, "email")?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(LoanError::InvalidUser {
            message: format!("malformed email: {}", email),
        }),
    }
}

fn valid_password(password: &str) -> Result<&str> {
    if password.is_empty() {
        return Err(LoanError::InvalidUser {
            message: "password is required".to_string(),
        });
    }
    Ok(password)
}

fn matches_term(user: &User, needle: &str) -> bool {
    needle.is_empty() || user.name.to_lowercase().contains(needle) || user.email.to_lowercase().contains(needle)
}

impl<S: LoanStore> LoanBook<S> {
    fn hash_password(&self, password: &str) -> Result<String> {
        Ok(bcrypt::hash(password, self.config.password_cost)?)
    }

    #[instrument(skip(self, new_user), fields(role = %new_user.role))]
    pub fn create_user(&mut self, new_user: NewUser) -> Result<User> {
        let name = required(&new_user.name, "name")?;
        let email = valid_email(&new_user.email)?;
        let password = valid_password(&new_user.password)?;

        if self.store.find_user_by_email(&email)?.is_some() {
            return Err(LoanError::DuplicateEmail { email });
        }

        let draft = UserDraft {
            name,
            email,
            password_hash: self.hash_password(password)?,
            role: new_user.role,
            created_at: self.now(),
        };
        let user = self.in_transaction("create_user", |store| store.insert_user(draft))?;

        info!(user_id = user.id, "user registered");
        self.events.emit(Event::UserRegistered {
            user_id: user.id,
            email: user.email.clone(),
            role: user.role,
            timestamp: user.created_at,
        });
        Ok(user)
    }

    /// Apply the given fields; a new password is hashed before it is stored.
    #[instrument(skip(self, update), fields(user_id = id))]
    pub fn update_user(&mut self, id: UserId, update: UserUpdate) -> Result<User> {
        let mut user = self.user(id)?;

        if let Some(name) = &update.name {
            user.name = required(name, "name")?;
        }
        if let Some(email) = &update.email {
            let email = valid_email(email)?;
            if let Some(other) = self.store.find_user_by_email(&email)? {
                if other.id != id {
                    return Err(LoanError::DuplicateEmail { email });
                }
            }
            user.email = email;
        }
        let password_changed = match &update.password {
            Some(password) => {
                user.password_hash = self.hash_password(valid_password(password)?)?;
                true
            }
            None => false,
        };
        if let Some(role) = update.role {
            user.role = role;
        }

        let now = self.now();
        user.updated_at = now;
        let user = self.in_transaction("update_user", |store| {
            store.update_user(&user)?;
            Ok(user)
        })?;

        info!(password_changed, "user updated");
        self.events.emit(Event::UserUpdated {
            user_id: id,
            password_changed,
            timestamp: now,
        });
        Ok(user)
    }

    #[instrument(skip(self), fields(user_id = id))]
    pub fn delete_user(&mut self, id: UserId) -> Result<()> {
        self.user(id)?;
        self.in_transaction("delete_user", |store| store.delete_user(id))?;

        info!("user removed");
        let now = self.now();
        self.events.emit(Event::UserRemoved {
            user_id: id,
            timestamp: now,
        });
        Ok(())
    }

    pub fn user(&self, id: UserId) -> Result<User> {
        self.store
            .get_user(id)?
            .ok_or_else(|| LoanError::not_found(EntityKind::User, id))
    }

    /// `None` for a blank or unknown email
    pub fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.store.find_user_by_email(email)
    }

    /// users ordered by id
    pub fn users(&self, page: Page) -> Result<Vec<User>> {
        Ok(page.apply(self.store.list_users()?))
    }

    /// Case-insensitive substring search over name and email, ordered by name
    /// then id. `None` uses the configured page size.
    pub fn search_users(&self, term: &str, page: Option<Page>) -> Result<Vec<User>> {
        let needle = term.trim().to_lowercase();
        let page = page.unwrap_or_else(|| Page::new(0, self.config.client_page_size));

        let mut found: Vec<User> = self
            .store
            .list_users()?
            .into_iter()
            .filter(|u| matches_term(u, &needle))
            .collect();
        found.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        debug!(term, matched = found.len(), "user search");
        Ok(page.apply(found))
    }

    /// Returns the user when the email exists and the password matches its
    /// hash. A corrupt stored hash counts as a mismatch.
    #[instrument(skip(self, email, password), fields(email = %email_key(email)))]
    pub fn verify_credentials(&self, email: &str, password: &str) -> Result<Option<User>> {
        let user = match self.store.find_user_by_email(email)? {
            Some(user) if !password.is_empty() => user,
            _ => {
                warn!("login rejected");
                return Ok(None);
            }
        };

        match bcrypt::verify(password, &user.password_hash) {
            Ok(true) => {
                info!(user_id = user.id, "credentials accepted");
                Ok(Some(user))
            }
            Ok(false) => {
                warn!("login rejected");
                Ok(None)
            }
            Err(err) => {
                warn!(user_id = user.id, error = %err, "stored password hash is unreadable");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::UserRole;
    use crate::{BookConfig, MemoryStore, SafeTimeProvider, TimeSource};
    use chrono::{TimeZone, Utc};

    fn book() -> LoanBook<MemoryStore> {
        let config = BookConfig {
            password_cost: 4,
            ..BookConfig::default()
        };
        LoanBook::in_memory(SafeTimeProvider::new(TimeSource::Test(
            Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap(),
        )))
        .with_config(config)
    }

    fn ana() -> NewUser {
        NewUser::new("Ana Souza", " Ana@Example.com ", "s3nha-forte", UserRole::Admin)
    }

    #[test]
    fn test_create_user_hashes_password() {
        let mut book = book();
        let user = book.create_user(ana()).unwrap();

        assert_eq!(user.id, 1);
        assert_eq!(user.email, "Ana@Example.com");
        assert_ne!(user.password_hash, "s3nha-forte");
        assert!(bcrypt::verify("s3nha-forte", &user.password_hash).unwrap());
        assert!(matches!(book.events()[0], Event::UserRegistered { role: UserRole::Admin, .. }));
    }

    #[test]
    fn test_email_must_be_unique_ignoring_case() {
        let mut book = book();
        book.create_user(ana()).unwrap();
        let bia = book
            .create_user(NewUser::new("Bia", "bia@example.com", "x", UserRole::Operator))
            .unwrap();

        assert!(matches!(
            book.create_user(NewUser::new("Other Ana", "ana@EXAMPLE.com", "y", UserRole::Manager)),
            Err(LoanError::DuplicateEmail { .. })
        ));
        assert!(matches!(
            book.update_user(bia.id, UserUpdate::default().email("  ANA@example.com")),
            Err(LoanError::DuplicateEmail { .. })
        ));
        assert_eq!(book.users(Page::all()).unwrap().len(), 2);

        // keeping your own email is fine
        let renamed = book
            .update_user(bia.id, UserUpdate::default().name("Bia Lima").email("BIA@example.com"))
            .unwrap();
        assert_eq!(renamed.name, "Bia Lima");
    }

    #[test]
    fn test_invalid_input_rejected() {
        let mut book = book();
        for new_user in [
            NewUser::new("  ", "a@b.c", "x", UserRole::Operator),
            NewUser::new("Ana", "not-an-email", "x", UserRole::Operator),
            NewUser::new("Ana", "a@b.c", "", UserRole::Operator),
        ] {
            assert!(matches!(book.create_user(new_user), Err(LoanError::InvalidUser { .. })));
        }
        assert!(book.users(Page::all()).unwrap().is_empty());
    }

    #[test]
    fn test_verify_credentials() {
        let mut book = book();
        let user = book.create_user(ana()).unwrap();

        let found = book.verify_credentials("  ana@example.COM", "s3nha-forte").unwrap();
        assert_eq!(found.map(|u| u.id), Some(user.id));

        assert!(book.verify_credentials("ana@example.com", "wrong").unwrap().is_none());
        assert!(book.verify_credentials("ana@example.com", "").unwrap().is_none());
        assert!(book.verify_credentials("nobody@example.com", "s3nha-forte").unwrap().is_none());
        assert!(book.verify_credentials("", "").unwrap().is_none());
    }

    #[test]
    fn test_password_change_replaces_hash() {
        let mut book = book();
        let user = book.create_user(ana()).unwrap();

        let updated = book
            .update_user(user.id, UserUpdate::default().password("nova-senha").role(UserRole::Manager))
            .unwrap();
        assert_eq!(updated.role, UserRole::Manager);
        assert!(book.verify_credentials("ana@example.com", "s3nha-forte").unwrap().is_none());
        assert!(book.verify_credentials("ana@example.com", "nova-senha").unwrap().is_some());
        assert!(matches!(
            book.events().last(),
            Some(Event::UserUpdated { password_changed: true, .. })
        ));
    }

    #[test]
    fn test_corrupt_hash_is_a_mismatch() {
        let mut book = book();
        let mut user = book.create_user(ana()).unwrap();
        user.password_hash = "not a bcrypt hash".to_string();
        book.store.update_user(&user).unwrap();

        assert!(book.verify_credentials("ana@example.com", "s3nha-forte").unwrap().is_none());
    }

    #[test]
    fn test_search_and_delete() {
        let mut book = book();
        for (name, email) in [
            ("Carlos", "carlos@loja.com"),
            ("ana lima", "ana@example.com"),
            ("Bruno", "bruno@example.com"),
        ] {
            book.create_user(NewUser::new(name, email, "x", UserRole::Operator)).unwrap();
        }

        let names: Vec<String> = book
            .search_users("EXAMPLE", None)
            .unwrap()
            .into_iter()
            .map(|u| u.name)
            .collect();
        assert_eq!(names, vec!["Bruno".to_string(), "ana lima".to_string()]);
        assert_eq!(book.search_users("", None).unwrap().len(), 3);
        assert_eq!(book.search_users("", Some(Page::new(1, 1))).unwrap()[0].name, "Carlos");

        let carlos = book.user_by_email("CARLOS@loja.com").unwrap().unwrap();
        book.delete_user(carlos.id).unwrap();
        assert!(book.user_by_email("carlos@loja.com").unwrap().is_none());
        assert!(matches!(
            book.delete_user(carlos.id),
            Err(LoanError::NotFound { entity: EntityKind::User, .. })
        ));
    }
}
