//! Integration tests for the server-synced cart and checkout.
//!
//! Run with: cargo test -p dwa-integration-tests

use std::sync::Arc;

use rust_decimal::Decimal;
use serde_json::Value;

use dwa_client::checkout::CheckoutError;
use dwa_client::session;
use dwa_client::storage::CART_KEY;
use dwa_client::{ApiClient, CartService, ClientStore, FaultPolicy, MemoryStorage, SessionStorage, place_order};
use dwa_core::validation::LoginForm;
use dwa_core::{Cart, ItemId, Pricing};
use dwa_integration_tests::{BUYER_EMAIL, FakeBackend, PASSWORD};

struct Shop {
    backend: FakeBackend,
    storage: Arc<MemoryStorage>,
    client: ApiClient,
    store: ClientStore,
    cart: CartService,
}

impl Shop {
    async fn signed_in() -> Self {
        let backend = FakeBackend::spawn().await;
        let storage = Arc::new(MemoryStorage::new());
        let store = ClientStore::new(storage.clone());
        let anonymous = ApiClient::new(&backend.config(&std::env::temp_dir()), FaultPolicy::new())
            .expect("Failed to build client");

        let signed = session::sign_in(&anonymous, &store, &LoginForm::new(BUYER_EMAIL, PASSWORD))
            .await
            .expect("sign in failed");
        let cart = CartService::new(signed.client.clone(), store.clone());

        Self {
            backend,
            storage,
            client: signed.client,
            store,
            cart,
        }
    }

    fn cart_path(&self) -> String {
        format!("/buyer/cart/{}", self.backend.state().buyer_id)
    }

    fn persisted_cart(&self) -> Cart {
        let raw = self
            .storage
            .get(CART_KEY)
            .expect("storage read failed")
            .expect("cart was not persisted");
        serde_json::from_str(&raw).expect("persisted cart does not decode")
    }
}

// ============================================================================
// Cart
// ============================================================================

#[tokio::test]
async fn test_add_new_line_then_bump() {
    let shop = Shop::signed_in().await;
    let mug = shop.backend.item(0);

    let cart = shop.cart.add_item(&mug).await.expect("first add failed");
    assert_eq!(cart.get(&mug.iid, &mug.vid).map(|l| l.quantity), Some(1));

    let cart = shop.cart.add_item(&mug).await.expect("second add failed");
    assert_eq!(cart.get(&mug.iid, &mug.vid).map(|l| l.quantity), Some(2));
    assert_eq!(cart.len(), 1);

    assert_eq!(shop.backend.requests_to("POST", "/buyer/cart/add").len(), 1);
    assert_eq!(shop.backend.requests_to("PUT", "/buyer/cart/update").len(), 1);
    assert_eq!(shop.backend.server_cart()[0]["quantity"], 2);
    assert_eq!(shop.persisted_cart(), cart);
}

#[tokio::test]
async fn test_add_falls_back_to_update_when_line_exists_on_server() {
    let shop = Shop::signed_in().await;
    shop.backend.seed_server_cart(0, 3);
    let mug = shop.backend.item(0);

    let cart = shop.cart.add_item(&mug).await.expect("add failed");

    let sequence: Vec<(String, String)> = shop
        .backend
        .requests()
        .into_iter()
        .filter(|r| r.path.starts_with("/buyer/cart"))
        .map(|r| (r.method, r.path))
        .collect();
    assert_eq!(
        sequence,
        vec![
            ("POST".to_string(), "/buyer/cart/add".to_string()),
            ("PUT".to_string(), "/buyer/cart/update".to_string()),
            ("GET".to_string(), shop.cart_path()),
        ]
    );

    let line = cart.get(&mug.iid, &mug.vid).expect("line missing");
    assert_eq!(line.quantity, 1);
    assert_eq!(line.vendor_name, "Campus Crafts");
}

#[tokio::test]
async fn test_failed_add_resyncs_from_server() {
    let shop = Shop::signed_in().await;
    shop.backend.seed_server_cart(1, 2);
    let mut ghost = shop.backend.item(0);
    ghost.iid = ItemId::new("no-such-item");

    let err = shop.cart.add_item(&ghost).await.expect_err("unknown item should fail");

    assert_eq!(err.status().map(|s| s.as_u16()), Some(404));
    assert_eq!(shop.backend.requests_to("GET", &shop.cart_path()).len(), 1);

    let notebook = shop.backend.item(1);
    let cart = shop.store.cart();
    assert_eq!(cart.len(), 1);
    assert_eq!(cart.get(&notebook.iid, &notebook.vid).map(|l| l.quantity), Some(2));
}

#[tokio::test]
async fn test_set_quantity_remove_and_clear() {
    let shop = Shop::signed_in().await;
    let mug = shop.backend.item(0);
    let notebook = shop.backend.item(1);
    shop.cart.add_item(&mug).await.expect("add failed");
    shop.cart.add_item(&notebook).await.expect("add failed");

    let cart = shop
        .cart
        .set_quantity(&mug.iid, &mug.vid, 4)
        .await
        .expect("set quantity failed");
    assert_eq!(cart.total_quantity(), 5);

    let cart = shop
        .cart
        .set_quantity(&notebook.iid, &notebook.vid, 0)
        .await
        .expect("set quantity failed");
    assert!(!cart.contains(&notebook.iid, &notebook.vid));
    assert_eq!(shop.backend.requests_to("POST", "/buyer/cart/remove").len(), 1);
    assert_eq!(shop.backend.server_cart().len(), 1);

    shop.cart.clear().await.expect("clear failed");
    assert!(shop.store.cart().is_empty());
    assert!(shop.backend.server_cart().is_empty());
    assert!(shop.persisted_cart().is_empty());
}

#[tokio::test]
async fn test_refresh_replaces_local_cart() {
    let shop = Shop::signed_in().await;
    shop.backend.seed_server_cart(0, 1);
    shop.backend.seed_server_cart(1, 5);

    let cart = shop.cart.refresh().await.expect("refresh failed");

    assert_eq!(cart.len(), 2);
    assert_eq!(cart.total_quantity(), 6);
    assert_eq!(shop.store.cart(), cart);
}

// ============================================================================
// Checkout
// ============================================================================

fn payment_for<'a>(payments: &'a [Value], iid: &ItemId) -> &'a Value {
    payments
        .iter()
        .find(|p| p["iid"] == iid.as_str())
        .expect("no payment for line")
}

#[tokio::test]
async fn test_checkout_pays_every_line_and_clears_cart() {
    let shop = Shop::signed_in().await;
    let mug = shop.backend.item(0);
    let notebook = shop.backend.item(1);
    shop.cart.add_item(&mug).await.expect("add failed");
    shop.cart.add_item(&notebook).await.expect("add failed");

    let receipt = place_order(&shop.client, &shop.store, &Pricing::default())
        .await
        .expect("checkout failed");

    assert_eq!(receipt.lines.len(), 2);
    assert_eq!(receipt.breakdown.subtotal, Decimal::new(1300, 2));
    assert_eq!(receipt.breakdown.tax, Decimal::new(65, 2));
    assert_eq!(receipt.breakdown.total, Decimal::new(1865, 2));

    let payments = shop.backend.payments();
    assert_eq!(payments.len(), 2);
    let buyer_id = shop.backend.state().buyer_id.clone();

    let mug_payment = payment_for(&payments, &mug.iid);
    assert_eq!(mug_payment["amt"], 7.0);
    assert_eq!(mug_payment["qty_bought"], 1);
    assert_eq!(mug_payment["bid"], buyer_id.as_str());
    assert_eq!(mug_payment["vid"], mug.vid.as_str());

    let notebook_payment = payment_for(&payments, &notebook.iid);
    assert_eq!(notebook_payment["amt"], 6.0);

    assert!(shop.store.cart().is_empty());
    assert!(shop.persisted_cart().is_empty());
}

#[tokio::test]
async fn test_partial_payment_failure_keeps_cart() {
    let shop = Shop::signed_in().await;
    let mug = shop.backend.item(0);
    let notebook = shop.backend.item(1);
    shop.cart.add_item(&mug).await.expect("add failed");
    shop.cart.add_item(&notebook).await.expect("add failed");
    shop.backend.fail_payments_for(notebook.iid.as_str());

    let err = place_order(&shop.client, &shop.store, &Pricing::default())
        .await
        .expect_err("one payment should fail");

    assert_eq!(err.to_string(), "1 of 2 payments failed");
    let CheckoutError::PaymentsFailed { succeeded, failed } = err else {
        panic!("expected a payment failure");
    };
    assert_eq!(succeeded.len(), 1);
    assert_eq!(succeeded[0].iid, mug.iid);
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].line.iid, notebook.iid);
    assert_eq!(failed[0].error.status().map(|s| s.as_u16()), Some(500));

    assert_eq!(shop.backend.payments().len(), 2);
    assert_eq!(shop.store.cart().len(), 2);
    assert_eq!(shop.persisted_cart().len(), 2);
}

#[tokio::test]
async fn test_checkout_with_empty_cart() {
    let shop = Shop::signed_in().await;

    let err = place_order(&shop.client, &shop.store, &Pricing::default())
        .await
        .expect_err("empty cart should fail");

    assert!(matches!(err, CheckoutError::EmptyCart));
    assert!(shop.backend.payments().is_empty());
}
