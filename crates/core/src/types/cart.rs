//! Shopping cart lines and the cart collection.
//!
//! A cart line is identified by its `(iid, vid)` pair: adding the same item
//! from the same vendor twice bumps the quantity of the existing line instead
//! of creating a second one. Line order carries no meaning.

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{ItemId, VendorId};
use super::item::Item;

/// One line of a buyer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub iid: ItemId,
    pub vid: VendorId,
    pub name: String,
    #[serde(default)]
    pub pictureurl: Option<String>,
    /// Unit price.
    #[serde(with = "rust_decimal::serde::float")]
    pub cost: Decimal,
    pub quantity: u32,
    #[serde(default)]
    pub vendor_name: String,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "super::timestamp::deserialize_option"
    )]
    pub added_time: Option<NaiveDateTime>,
}

impl CartItem {
    /// A fresh line for `item` with quantity 1.
    #[must_use]
    pub fn from_item(item: &Item) -> Self {
        Self {
            iid: item.iid.clone(),
            vid: item.vid.clone(),
            name: item.name.clone(),
            pictureurl: item.pictureurl.clone(),
            cost: item.cost,
            quantity: 1,
            vendor_name: String::new(),
            added_time: None,
        }
    }

    fn matches(&self, iid: &ItemId, vid: &VendorId) -> bool {
        &self.iid == iid && &self.vid == vid
    }

    /// `cost × quantity`, saturating at the representable range.
    #[must_use]
    pub fn line_total(&self) -> Decimal {
        self.cost.saturating_mul(Decimal::from(self.quantity))
    }
}

/// A buyer's cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Cart {
    items: Vec<CartItem>,
}

impl Cart {
    #[must_use]
    pub const fn new() -> Self {
        Self { items: Vec::new() }
    }

    /// Build a cart from server lines, collapsing duplicate keys.
    #[must_use]
    pub fn from_items(items: Vec<CartItem>) -> Self {
        let mut cart = Self::new();
        for item in items {
            cart.add_line(item);
        }
        cart
    }

    #[must_use]
    pub fn items(&self) -> &[CartItem] {
        &self.items
    }

    #[must_use]
    pub fn into_items(self) -> Vec<CartItem> {
        self.items
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Total units across all lines.
    #[must_use]
    pub fn total_quantity(&self) -> u32 {
        self.items
            .iter()
            .fold(0, |total: u32, i| total.saturating_add(i.quantity))
    }

    #[must_use]
    pub fn get(&self, iid: &ItemId, vid: &VendorId) -> Option<&CartItem> {
        self.items.iter().find(|i| i.matches(iid, vid))
    }

    #[must_use]
    pub fn contains(&self, iid: &ItemId, vid: &VendorId) -> bool {
        self.get(iid, vid).is_some()
    }

    /// Add one unit of `item`. Returns the line's new quantity.
    pub fn add(&mut self, item: &Item) -> u32 {
        self.add_quantity(item, 1)
    }

    /// Add `quantity` units of `item`, merging with an existing line for the
    /// same `(iid, vid)`. Returns the line's new quantity.
    pub fn add_quantity(&mut self, item: &Item, quantity: u32) -> u32 {
        let line = CartItem {
            quantity,
            ..CartItem::from_item(item)
        };
        self.add_line(line)
    }

    /// Merge a complete line into the cart. Returns the line's new quantity.
    pub fn add_line(&mut self, line: CartItem) -> u32 {
        if let Some(existing) = self.items.iter_mut().find(|i| i.matches(&line.iid, &line.vid)) {
            existing.quantity = existing.quantity.saturating_add(line.quantity);
            existing.quantity
        } else {
            let quantity = line.quantity;
            self.items.push(line);
            quantity
        }
    }

    /// Set the quantity of an existing line. A quantity of zero removes it.
    /// Returns `false` when no line matches.
    pub fn set_quantity(&mut self, iid: &ItemId, vid: &VendorId, quantity: u32) -> bool {
        if quantity == 0 {
            return self.remove(iid, vid).is_some();
        }
        match self.items.iter_mut().find(|i| i.matches(iid, vid)) {
            Some(line) => {
                line.quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// Remove the line with exactly this `(iid, vid)`.
    pub fn remove(&mut self, iid: &ItemId, vid: &VendorId) -> Option<CartItem> {
        let index = self.items.iter().position(|i| i.matches(iid, vid))?;
        Some(self.items.remove(index))
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }

    /// Σ cost × quantity over all lines, saturating like
    /// [`CartItem::line_total`].
    #[must_use]
    pub fn subtotal(&self) -> Decimal {
        self.items
            .iter()
            .fold(Decimal::ZERO, |total, line| total.saturating_add(line.line_total()))
    }
}

impl From<Vec<CartItem>> for Cart {
    fn from(items: Vec<CartItem>) -> Self {
        Self::from_items(items)
    }
}

impl<'a> IntoIterator for &'a Cart {
    type Item = &'a CartItem;
    type IntoIter = std::slice::Iter<'a, CartItem>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}
