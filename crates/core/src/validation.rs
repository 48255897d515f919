//! Form validation performed before any request is made.
//!
//! A form that fails here never reaches the HTTP layer.

use core::fmt;

use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;

use crate::types::{Email, EmailError, ItemUpdate, NewItem};

/// Minimum password length accepted by the backend.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Client-side validation failures.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is blank.
    #[error("{0} is required")]
    EmptyField(&'static str),

    /// The email is malformed or outside the allowed domain.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// The password is shorter than the backend accepts.
    #[error("password must be at least {min} characters")]
    PasswordTooShort {
        /// Minimum length.
        min: usize,
    },

    /// A price is negative.
    #[error("cost cannot be negative")]
    NegativeCost,

    /// A stock count is negative.
    #[error("quantity cannot be negative")]
    NegativeQuantity,

    /// An update carries no changes.
    #[error("nothing to update")]
    NothingToUpdate,
}

/// Credentials for `auth/user/login`.
#[derive(Clone, Serialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

impl LoginForm {
    #[must_use]
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }

    /// Both fields must be present and the email well formed.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self) -> Result<(), ValidationError> {
        require("email", &self.email)?;
        require("password", &self.password)?;
        Email::parse(&self.email)?;
        Ok(())
    }
}

impl fmt::Debug for LoginForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// Registration data for `auth/user/signup`.
#[derive(Clone, Serialize)]
pub struct SignupForm {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(rename = "isVendor")]
    pub is_vendor: bool,
}

impl SignupForm {
    /// Name, email and password must be present; the email must parse (and
    /// match `required_domain` when one is configured); the password must
    /// meet the backend minimum length.
    ///
    /// # Errors
    ///
    /// Returns the first failing rule.
    pub fn validate(&self, required_domain: Option<&str>) -> Result<(), ValidationError> {
        require("name", &self.name)?;
        require("email", &self.email)?;
        require("password", &self.password)?;
        match required_domain {
            Some(domain) => Email::parse_with_domain(&self.email, domain)?,
            None => Email::parse(&self.email)?,
        };
        validate_password_length(&self.password)
    }
}

impl fmt::Debug for SignupForm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupForm")
            .field("email", &self.email)
            .field("password", &"[REDACTED]")
            .field("name", &self.name)
            .field("is_vendor", &self.is_vendor)
            .finish()
    }
}

fn require(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(())
    }
}

/// Length check used at signup.
///
/// # Errors
///
/// Returns [`ValidationError::PasswordTooShort`].
pub fn validate_password_length(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::PasswordTooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    Ok(())
}

/// Validate a listing before `vendor/item/add`.
///
/// # Errors
///
/// Returns the first failing rule.
pub fn validate_new_item(item: &NewItem) -> Result<(), ValidationError> {
    require("name", &item.name)?;
    require("vendor id", item.vid.as_str())?;
    if item.cost < Decimal::ZERO {
        return Err(ValidationError::NegativeCost);
    }
    if item.quantity < 0 {
        return Err(ValidationError::NegativeQuantity);
    }
    Ok(())
}

/// Validate a listing change before `vendor/item/update`.
///
/// # Errors
///
/// Returns the first failing rule.
pub fn validate_item_update(update: &ItemUpdate) -> Result<(), ValidationError> {
    require("item id", update.iid.as_str())?;
    if !update.has_changes() {
        return Err(ValidationError::NothingToUpdate);
    }
    if let Some(name) = &update.name {
        require("name", name)?;
    }
    if update.cost.is_some_and(|c| c < Decimal::ZERO) {
        return Err(ValidationError::NegativeCost);
    }
    if update.quantity.is_some_and(|q| q < 0) {
        return Err(ValidationError::NegativeQuantity);
    }
    Ok(())
}
