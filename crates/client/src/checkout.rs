//! Checkout: one payment per cart line, all-or-nothing cart clearing.

use futures::future::join_all;
use thiserror::Error;
use tracing::{error, info, instrument};

use dwa_core::{Cart, CartItem, PriceBreakdown, Pricing};

use crate::api::PaymentRequest;
use crate::error::ClientError;
use crate::http::ApiClient;
use crate::store::ClientStore;

/// A cart line whose payment failed.
#[derive(Debug)]
pub struct LineFailure {
    pub line: CartItem,
    pub error: ClientError,
}

/// Checkout failures.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Cart is empty")]
    EmptyCart,

    #[error("Not signed in")]
    NotAuthenticated,

    /// At least one payment failed. The cart is left untouched; lines in
    /// `succeeded` were charged and are not rolled back.
    #[error("{} of {} payments failed", failed.len(), failed.len() + succeeded.len())]
    PaymentsFailed {
        succeeded: Vec<CartItem>,
        failed: Vec<LineFailure>,
    },

    /// Payments went through but the cart could not be cleared.
    #[error("Payments succeeded but the cart could not be cleared: {0}")]
    Clear(#[source] ClientError),
}

/// A completed order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderReceipt {
    pub lines: Vec<CartItem>,
    pub breakdown: PriceBreakdown,
}

/// Pay for every line of the stored cart.
///
/// Payments are issued concurrently and all of them are awaited. The cart
/// (in memory and persisted) is cleared only when every payment succeeded.
///
/// # Errors
///
/// See [`CheckoutError`].
#[instrument(skip_all)]
pub async fn place_order(
    client: &ApiClient,
    store: &ClientStore,
    pricing: &Pricing,
) -> Result<OrderReceipt, CheckoutError> {
    let state = store.snapshot();
    if !state.user.is_authenticated() {
        return Err(CheckoutError::NotAuthenticated);
    }
    if state.cart.is_empty() {
        return Err(CheckoutError::EmptyCart);
    }

    let breakdown = pricing.quote(&state.cart);
    let lines = state.cart.into_items();
    let buyer = state.user.uid;
    info!(lines = lines.len(), total = %breakdown.total, "Placing order");

    let api = client.api();
    let results = join_all(lines.iter().map(|line| {
        let payment = PaymentRequest::for_line(&buyer, line);
        async move { api.initialize_payment(&payment).await }
    }))
    .await;

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();
    for (line, result) in lines.iter().zip(results) {
        match result {
            Ok(_) => succeeded.push(line.clone()),
            Err(error) => {
                error!(iid = %line.iid, error = %error, "Payment failed");
                failed.push(LineFailure {
                    line: line.clone(),
                    error,
                });
            }
        }
    }

    if !failed.is_empty() {
        return Err(CheckoutError::PaymentsFailed { succeeded, failed });
    }

    store.set_cart(Cart::new()).map_err(CheckoutError::Clear)?;
    info!("Order placed");
    Ok(OrderReceipt { lines, breakdown })
}
