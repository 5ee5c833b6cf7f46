//! Loan book configuration.
//!
//! Values come from, in increasing priority: built-in defaults, an optional
//! config file (any format the `config` crate recognises by extension) and
//! `LOAN_BOOK_*` environment variables.
//!
//! * `LOAN_BOOK_STORE_PATH` - JSON file holding the book (in-memory when unset)
//! * `LOAN_BOOK_UPCOMING_LIMIT` - rows in the upcoming-due list (default: 10)
//! * `LOAN_BOOK_CLIENT_PAGE_SIZE` - page size for client search (default: 10)
//! * `LOAN_BOOK_PASSWORD_COST` - bcrypt cost for user passwords (default: 12)
//! * `LOAN_BOOK_LOG_LEVEL` - tracing filter (default: info)

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{LoanError, Result};

pub const ENV_PREFIX: &str = "LOAN_BOOK";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BookConfig {
    pub store_path: Option<PathBuf>,
    pub upcoming_limit: usize,
    pub client_page_size: usize,
    pub password_cost: u32,
    pub log_level: String,
}

impl Default for BookConfig {
    fn default() -> Self {
        Self {
            store_path: None,
            upcoming_limit: 10,
            client_page_size: 10,
            password_cost: bcrypt::DEFAULT_COST,
            log_level: "info".to_string(),
        }
    }
}

impl BookConfig {
    /// load from an optional file plus `LOAN_BOOK_*` environment variables
    pub fn load(file: Option<&Path>) -> Result<Self> {
        Self::load_with_prefix(file, ENV_PREFIX)
    }

    pub fn load_with_prefix(file: Option<&Path>, env_prefix: &str) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }

        let loaded: BookConfig = builder
            .add_source(config::Environment::with_prefix(env_prefix))
            .build()?
            .try_deserialize()?;

        loaded.validate()?;
        Ok(loaded)
    }

    pub fn validate(&self) -> Result<()> {
        if self.upcoming_limit == 0 {
            return Err(LoanError::Configuration {
                message: "upcoming_limit must be at least 1".to_string(),
            });
        }
        if self.client_page_size == 0 {
            return Err(LoanError::Configuration {
                message: "client_page_size must be at least 1".to_string(),
            });
        }
        if !(4..=31).contains(&self.password_cost) {
            return Err(LoanError::Configuration {
                message: "password_cost must be between 4 and 31".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_defaults() {
        let config = BookConfig::default();
        assert_eq!(config.upcoming_limit, 10);
        assert_eq!(config.store_path, None);
        assert_eq!(config.password_cost, 12);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = BookConfig::load_with_prefix(
            Some(&dir.path().join("absent.json")),
            "LOAN_BOOK_TEST_ABSENT",
        )
        .unwrap();
        assert_eq!(config, BookConfig::default());
    }

    #[test]
    fn test_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        fs::write(
            &path,
            r#"{ "store_path": "/var/lib/loans/book.json", "upcoming_limit": 25 }"#,
        )
        .unwrap();

        let config = BookConfig::load_with_prefix(Some(&path), "LOAN_BOOK_TEST_FILE").unwrap();
        assert_eq!(config.upcoming_limit, 25);
        assert_eq!(config.store_path, Some(PathBuf::from("/var/lib/loans/book.json")));
        assert_eq!(config.client_page_size, 10);
    }

    #[test]
    fn test_zero_limit_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("book.json");
        fs::write(&path, r#"{ "upcoming_limit": 0 }"#).unwrap();

        assert!(matches!(
            BookConfig::load_with_prefix(Some(&path), "LOAN_BOOK_TEST_ZERO"),
            Err(LoanError::Configuration { .. })
        ));

        fs::write(&path, r#"{ "password_cost": 2 }"#).unwrap();
        assert!(matches!(
            BookConfig::load_with_prefix(Some(&path), "LOAN_BOOK_TEST_ZERO"),
            Err(LoanError::Configuration { .. })
        ));
    }
}
