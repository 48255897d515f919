//! Client-side routes the core can ask a front-end to navigate to.
//!
//! Only the routes the session and checkout logic redirect to are modelled;
//! rendering them is up to the front-end.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A named client route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Route {
    Landing,
    SignIn,
    SignUp,
    BuyerHome,
    VendorDashboard,
    AdminDashboard,
    Checkout,
    OrderConfirmation,
    UserProfile,
}

impl Route {
    /// URL path of the route.
    #[must_use]
    pub const fn path(self) -> &'static str {
        match self {
            Self::Landing => "/landing",
            Self::SignIn => "/signin",
            Self::SignUp => "/signup",
            Self::BuyerHome => "/buyer",
            Self::VendorDashboard => "/vendor-dashboard",
            Self::AdminDashboard => "/admin-dashboard",
            Self::Checkout => "/checkout-payment",
            Self::OrderConfirmation => "/order-confirmation",
            Self::UserProfile => "/user-profile",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// How a navigation affects history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum NavigationMode {
    /// Add a history entry.
    #[default]
    Push,
    /// Replace the current entry, so "back" cannot return to it.
    Replace,
}
