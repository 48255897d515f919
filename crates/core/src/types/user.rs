//! Users and their roles.

use core::fmt;

use serde::{Deserialize, Serialize};

use super::id::UserId;
use crate::route::Route;

/// The role of a marketplace account.
///
/// Resolved once when a session is established and carried on [`User`];
/// never re-derived from loose strings at read sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Shops and checks out carts.
    #[default]
    Buyer,
    /// Lists inventory and sees sales.
    Vendor,
    /// Manages users and listings.
    Admin,
}

impl UserType {
    /// The landing route for this role after sign-in.
    #[must_use]
    pub const fn dashboard(self) -> Route {
        match self {
            Self::Buyer => Route::BuyerHome,
            Self::Vendor => Route::VendorDashboard,
            Self::Admin => Route::AdminDashboard,
        }
    }

    /// Wire name of the role.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buyer => "buyer",
            Self::Vendor => "vendor",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for UserType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "buyer" => Ok(Self::Buyer),
            "vendor" => Ok(Self::Vendor),
            "admin" => Ok(Self::Admin),
            other => Err(format!("invalid user type: {other}")),
        }
    }
}

/// The signed-in account as returned by login/signup.
///
/// Treated as immutable-by-replacement: the client store swaps whole records
/// or sets single fields through explicit setters.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct User {
    /// Account ID (empty for the anonymous user).
    #[serde(default)]
    pub uid: UserId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Account email. Kept as a plain string because the anonymous user has none.
    #[serde(default)]
    pub email: String,
    /// Bearer token for authenticated calls.
    #[serde(default)]
    pub token: String,
    /// Account role.
    #[serde(default)]
    pub user_type: UserType,
}

impl User {
    /// The default, signed-out user: empty fields, buyer role.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Whether this record identifies a signed-in account.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        !self.uid.is_empty() && !self.token.trim().is_empty()
    }

    /// The bearer token with embedded whitespace removed, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<String> {
        let token: String = self.token.chars().filter(|c| !c.is_whitespace()).collect();
        (!token.is_empty()).then_some(token)
    }
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("uid", &self.uid)
            .field("name", &self.name)
            .field("email", &self.email)
            .field("token", &if self.token.is_empty() { "" } else { "[REDACTED]" })
            .field("user_type", &self.user_type)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_defaults() {
        let user = User::anonymous();
        assert!(user.uid.is_empty());
        assert_eq!(user.user_type, UserType::Buyer);
        assert!(!user.is_authenticated());
    }

    #[test]
    fn test_deserialize_login_payload() {
        let json = r#"{"uid":"u-1","email":"a@b.io","name":"Ama","user_type":"vendor","token":"tok"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.uid.as_str(), "u-1");
        assert_eq!(user.user_type, UserType::Vendor);
        assert!(user.is_authenticated());
    }

    #[test]
    fn test_bearer_token_strips_whitespace() {
        let user = User {
            token: " ab c\n".to_string(),
            ..User::default()
        };
        assert_eq!(user.bearer_token().as_deref(), Some("abc"));
        assert_eq!(User::anonymous().bearer_token(), None);
    }

    #[test]
    fn test_debug_redacts_token() {
        let user = User {
            token: "super-secret".to_string(),
            ..User::default()
        };
        let debug = format!("{user:?}");
        assert!(debug.contains("[REDACTED]"));
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_user_type_round_trip() {
        assert_eq!("Vendor".parse::<UserType>().unwrap(), UserType::Vendor);
        assert!("staff".parse::<UserType>().is_err());
        assert_eq!(UserType::Admin.to_string(), "admin");
        assert_eq!(UserType::Vendor.dashboard(), Route::VendorDashboard);
    }
}
