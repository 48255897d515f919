//! Cart pricing using decimal arithmetic.
//!
//! total = subtotal + delivery fee + tax, where tax is a fixed percentage of
//! the subtotal rounded to cents.

use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

use crate::types::Cart;

/// Flat delivery fee charged per order: 5.00.
pub const DEFAULT_DELIVERY_FEE: Decimal = Decimal::from_parts(500, 0, 0, false, 2);

/// Tax rate applied to the subtotal: 5%.
pub const DEFAULT_TAX_RATE: Decimal = Decimal::from_parts(5, 0, 0, false, 2);

/// Fee and tax settings for an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pricing {
    pub delivery_fee: Decimal,
    /// Fraction of the subtotal, e.g. `0.05` for 5%.
    pub tax_rate: Decimal,
}

impl Default for Pricing {
    fn default() -> Self {
        Self {
            delivery_fee: DEFAULT_DELIVERY_FEE,
            tax_rate: DEFAULT_TAX_RATE,
        }
    }
}

/// The itemized price of a cart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceBreakdown {
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Pricing {
    #[must_use]
    pub const fn new(delivery_fee: Decimal, tax_rate: Decimal) -> Self {
        Self {
            delivery_fee,
            tax_rate,
        }
    }

    /// Tax on a subtotal, rounded half away from zero to two places.
    #[must_use]
    pub fn tax_on(&self, subtotal: Decimal) -> Decimal {
        subtotal
            .saturating_mul(self.tax_rate)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
    }

    /// Price a subtotal. Amounts saturate instead of overflowing.
    #[must_use]
    pub fn quote_subtotal(&self, subtotal: Decimal) -> PriceBreakdown {
        let tax = self.tax_on(subtotal);
        PriceBreakdown {
            subtotal,
            delivery_fee: self.delivery_fee,
            tax,
            total: subtotal.saturating_add(self.delivery_fee).saturating_add(tax),
        }
    }

    /// Price a cart.
    #[must_use]
    pub fn quote(&self, cart: &Cart) -> PriceBreakdown {
        self.quote_subtotal(cart.subtotal())
    }
}

/// Format an amount for display (e.g. `$18.65`).
#[must_use]
pub fn format_amount(amount: Decimal) -> String {
    let rounded = amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    format!("${rounded:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{CartItem, ItemId, VendorId};

    fn line(iid: &str, cost: Decimal, quantity: u32) -> CartItem {
        CartItem {
            iid: ItemId::new(iid),
            vid: VendorId::new("v-1"),
            name: iid.to_string(),
            pictureurl: None,
            cost,
            quantity,
            vendor_name: String::new(),
            added_time: None,
        }
    }

    #[test]
    fn test_defaults() {
        let pricing = Pricing::default();
        assert_eq!(pricing.delivery_fee, Decimal::new(5, 0));
        assert_eq!(pricing.tax_rate, Decimal::new(5, 2));
    }

    #[test]
    fn test_quote_two_line_cart() {
        let cart = Cart::from_items(vec![
            line("notebook", Decimal::new(70, 1), 1),
            line("flash-drive", Decimal::new(60, 1), 1),
        ]);
        let quote = Pricing::default().quote(&cart);
        assert_eq!(quote.subtotal, Decimal::new(1300, 2));
        assert_eq!(quote.delivery_fee, Decimal::new(500, 2));
        assert_eq!(quote.tax, Decimal::new(65, 2));
        assert_eq!(quote.total, Decimal::new(1865, 2));
    }

    #[test]
    fn test_quote_uses_quantity() {
        let cart = Cart::from_items(vec![line("pen", Decimal::new(250, 2), 4)]);
        let quote = Pricing::default().quote(&cart);
        assert_eq!(quote.subtotal, Decimal::new(10, 0));
        assert_eq!(quote.tax, Decimal::new(50, 2));
        assert_eq!(quote.total, Decimal::new(1550, 2));
    }

    #[test]
    fn test_tax_rounds_half_away_from_zero() {
        // 0.05 * 0.30 = 0.015 -> 0.02
        assert_eq!(Pricing::default().tax_on(Decimal::new(30, 2)), Decimal::new(2, 2));
    }

    #[test]
    fn test_empty_cart_still_pays_delivery() {
        let quote = Pricing::default().quote(&Cart::new());
        assert_eq!(quote.subtotal, Decimal::ZERO);
        assert_eq!(quote.total, Decimal::new(5, 0));
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(Decimal::new(1865, 2)), "$18.65");
        assert_eq!(format_amount(Decimal::new(5, 0)), "$5.00");
    }

    #[test]
    fn test_quote_saturates_instead_of_overflowing() {
        let cart = Cart::from_items(vec![line("gold", Decimal::MAX, 3)]);
        let quote = Pricing::default().quote(&cart);
        assert_eq!(quote.subtotal, Decimal::MAX);
        assert_eq!(quote.total, Decimal::MAX);
    }
}
