// Account Entity - the single resource exposed by the API
//
// Identity: `id` (server-assigned, never changes, never reused)
// Values: name, currency, country (change through partial updates)
// Server-owned: account_number, balance, status, created_at

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of decimal digits in a generated account number
pub const ACCOUNT_NUMBER_LEN: usize = 20;

/// Status given to every newly opened account
pub const DEFAULT_STATUS: &str = "Active";

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

/// A bank account as stored and returned by the API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Stable identity, assigned by the database
    pub id: i64,

    /// Account holder name (e.g., "John Doe")
    pub name: String,

    /// Currency symbol or code (e.g., "€", "£", "USD")
    pub currency: String,

    /// Country of the account (e.g., "Spain")
    pub country: String,

    /// Generated 20-digit account number
    pub account_number: String,

    /// Current balance; opens at 0.0 and is never set by clients
    pub balance: f64,

    /// Lifecycle status (e.g., "Active")
    pub status: String,

    /// When the account was opened (UTC)
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// INPUTS
// ============================================================================

/// Fields a client supplies to open an account
#[derive(Debug, Clone, Deserialize)]
pub struct NewAccount {
    pub name: String,
    pub currency: String,
    pub country: String,
}

impl NewAccount {
    pub fn new(name: &str, currency: &str, country: &str) -> Self {
        NewAccount {
            name: name.to_string(),
            currency: currency.to_string(),
            country: country.to_string(),
        }
    }

    /// Reject blank fields; returns the name of the first offending field
    pub fn validate(&self) -> Result<(), String> {
        require_non_blank("name", &self.name)?;
        require_non_blank("currency", &self.currency)?;
        require_non_blank("country", &self.country)?;
        Ok(())
    }
}

/// Partial update: `None` keeps the stored value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AccountUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

impl AccountUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.currency.is_none() && self.country.is_none()
    }

    /// Supplied fields must not be blank
    pub fn validate(&self) -> Result<(), String> {
        if let Some(name) = &self.name {
            require_non_blank("name", name)?;
        }
        if let Some(currency) = &self.currency {
            require_non_blank("currency", currency)?;
        }
        if let Some(country) = &self.country {
            require_non_blank("country", country)?;
        }
        Ok(())
    }

    /// Apply onto an in-memory account, leaving unspecified fields alone
    pub fn apply_to(&self, account: &mut Account) {
        if let Some(name) = &self.name {
            account.name = name.clone();
        }
        if let Some(currency) = &self.currency {
            account.currency = currency.clone();
        }
        if let Some(country) = &self.country {
            account.country = country.clone();
        }
    }
}

fn require_non_blank(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{} must not be blank", field));
    }
    Ok(())
}

// ============================================================================
// ACCOUNT NUMBERS
// ============================================================================

/// Generate a random 20-digit account number
///
/// Digits come from a v4 UUID, so leading zeros are possible and kept.
pub fn generate_account_number() -> String {
    let raw = uuid::Uuid::new_v4().as_u128();
    let digits = format!("{:0>39}", raw);
    digits[digits.len() - ACCOUNT_NUMBER_LEN..].to_string()
}

// ============================================================================
// TESTS
// ============================================================================
