//! Vendor listings and sales records.

use core::fmt;

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ItemId, VendorId};

/// Listing category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Category {
    Fashion,
    BooksSupplies,
    Services,
    Electronics,
}

impl Category {
    /// All categories in display order.
    pub const ALL: [Self; 4] = [
        Self::Fashion,
        Self::BooksSupplies,
        Self::Services,
        Self::Electronics,
    ];

    /// Wire name of the category.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fashion => "FASHION",
            Self::BooksSupplies => "BOOKS_SUPPLIES",
            Self::Services => "SERVICES",
            Self::Electronics => "ELECTRONICS",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace([' ', '-'], "_");
        Self::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| format!("invalid category: {s}"))
    }
}

/// A product listed by a vendor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub iid: ItemId,
    pub vid: VendorId,
    pub name: String,
    #[serde(default)]
    pub pictureurl: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub category: Option<Category>,
    /// Units in stock.
    #[serde(default)]
    pub quantity: i32,
    /// Unit price.
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
}

/// A listing a vendor is about to create (no item ID yet).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewItem {
    pub vid: VendorId,
    pub name: String,
    pub pictureurl: Option<String>,
    pub description: Option<String>,
    pub category: Category,
    pub quantity: i32,
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
}

/// A partial update to an existing listing. Unset fields are left unchanged
/// server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ItemUpdate {
    pub iid: ItemId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pictureurl: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quantity: Option<i32>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "rust_decimal::serde::float_option"
    )]
    pub cost: Option<Decimal>,
}

impl ItemUpdate {
    /// An update touching nothing but identifying `iid`.
    #[must_use]
    pub fn new(iid: ItemId) -> Self {
        Self {
            iid,
            ..Self::default()
        }
    }

    /// Whether any field besides the ID is set.
    #[must_use]
    pub const fn has_changes(&self) -> bool {
        self.name.is_some()
            || self.pictureurl.is_some()
            || self.description.is_some()
            || self.category.is_some()
            || self.quantity.is_some()
            || self.cost.is_some()
    }
}

/// A completed sale, as reported to the vendor. Read-only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Item (or buyer) name shown on the sales page.
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub amt: Decimal,
    #[serde(deserialize_with = "super::timestamp::deserialize")]
    pub t_time: NaiveDateTime,
}

/// Sum of a vendor's transaction amounts.
#[must_use]
pub fn total_earnings(transactions: &[Transaction]) -> Decimal {
    transactions
        .iter()
        .fold(Decimal::ZERO, |total, t| total.saturating_add(t.amt))
}
