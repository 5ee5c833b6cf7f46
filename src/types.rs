use serde::{Deserialize, Serialize};
use std::fmt;

use crate::decimal::Rate;

/// store-assigned identifiers
pub type ClientId = u64;
pub type LoanId = u64;
pub type InstallmentId = u64;
pub type UserId = u64;

/// entity kinds known to the store, used in not-found errors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EntityKind {
    Client,
    Loan,
    Installment,
    User,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EntityKind::Client => "client",
            EntityKind::Loan => "loan",
            EntityKind::Installment => "installment",
            EntityKind::User => "user",
        };
        f.write_str(name)
    }
}

/// access level of a back-office user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    Admin,
    Manager,
    #[default]
    Operator,
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRole::Admin => f.write_str("admin"),
            UserRole::Manager => f.write_str("manager"),
            UserRole::Operator => f.write_str("operator"),
        }
    }
}

/// interest calculation method
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterestRegime {
    /// flat interest on the original principal for every period
    Simple,
    /// amortized annuity, equal installments
    Compound,
}

impl InterestRegime {
    /// pick the periodic rate for this regime out of a snapshot
    pub fn rate_from(&self, rates: &RateSnapshot) -> Rate {
        match self {
            InterestRegime::Simple => rates.simple,
            InterestRegime::Compound => rates.compound,
        }
    }
}

impl fmt::Display for InterestRegime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InterestRegime::Simple => f.write_str("simple"),
            InterestRegime::Compound => f.write_str("compound"),
        }
    }
}

/// rates in force when a loan was created.
///
/// Copied by value onto each loan; later configuration changes never reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RateSnapshot {
    pub simple: Rate,
    pub compound: Rate,
    pub late_fee: Rate,
}

/// offset/limit pagination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: Option<usize>,
}

impl Page {
    pub fn all() -> Self {
        Self { offset: 0, limit: None }
    }

    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit: Some(limit) }
    }

    /// apply this page to an already ordered iterator
    pub fn apply<T>(&self, items: impl IntoIterator<Item = T>) -> Vec<T> {
        let iter = items.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => iter.take(limit).collect(),
            None => iter.collect(),
        }
    }
}

impl Default for Page {
    fn default() -> Self {
        Self::all()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_regime_picks_rate() {
        let rates = RateSnapshot {
            simple: Rate::from_decimal(dec!(0.02)),
            compound: Rate::from_decimal(dec!(0.03)),
            late_fee: Rate::from_decimal(dec!(0.01)),
        };
        assert_eq!(InterestRegime::Simple.rate_from(&rates), rates.simple);
        assert_eq!(InterestRegime::Compound.rate_from(&rates), rates.compound);
    }

    #[test]
    fn test_page_apply() {
        let items: Vec<u32> = (1..=10).collect();
        assert_eq!(Page::new(2, 3).apply(items.clone()), vec![3, 4, 5]);
        assert_eq!(Page::new(8, 5).apply(items.clone()), vec![9, 10]);
        assert_eq!(Page::all().apply(items).len(), 10);
    }
}
