//! Integration tests for the DWA Market client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p dwa-integration-tests
//! ```
//!
//! No external services are needed: [`FakeBackend::spawn`] serves the
//! backend's routes from an in-process `axum` router on `127.0.0.1:0`, with
//! the same `{"data": ...}` envelopes and status codes. Handlers keep their
//! state in memory and record every request so tests can assert on what the
//! client sent.
//!
//! # Test Categories
//!
//! - `http_layer` - Envelope unwrapping, bearer tokens, status handlers
//! - `session` - Sign-in, 401 redirection, startup liveness check
//! - `cart_checkout` - Server-synced cart and checkout
//! - `vendor` - Listing management and sales records

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::HashSet;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::extract::{Path as UrlPath, Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{Next, from_fn_with_state};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use uuid::Uuid;

use dwa_client::ClientConfig;

/// Password every fixture account accepts.
pub const PASSWORD: &str = "correct-horse-1";

/// Email of the fixture buyer.
pub const BUYER_EMAIL: &str = "ama@ashesi.edu.gh";

/// Email of the fixture vendor.
pub const VENDOR_EMAIL: &str = "kofi@ashesi.edu.gh";

/// A request as seen by the fake backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
}

/// In-memory backend state.
#[derive(Debug)]
pub struct BackendState {
    pub buyer_id: String,
    pub vendor_id: String,
    pub token: String,
    items: Mutex<Vec<Value>>,
    vendor_writes: Mutex<Vec<Value>>,
    health: Mutex<String>,
    token_revoked: Mutex<bool>,
    cart: Mutex<Vec<Value>>,
    failing_payments: Mutex<HashSet<String>>,
    payments: Mutex<Vec<Value>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl BackendState {
    fn new() -> Self {
        let vendor_id = Uuid::new_v4().to_string();
        let other_vendor = Uuid::new_v4().to_string();
        let items = vec![
            json!({
                "iid": Uuid::new_v4().to_string(),
                "vid": vendor_id,
                "name": "Ceramic mug",
                "pictureurl": "https://img.example/mug.png",
                "description": "Holds coffee",
                "category": "SERVICES",
                "quantity": 10,
                "cost": 7.0
            }),
            json!({
                "iid": Uuid::new_v4().to_string(),
                "vid": other_vendor,
                "name": "Lecture notebook",
                "pictureurl": null,
                "description": null,
                "category": "BOOKS_SUPPLIES",
                "quantity": 25,
                "cost": 6.0
            }),
        ];
        Self {
            buyer_id: Uuid::new_v4().to_string(),
            vendor_id,
            token: format!("tok-{}", Uuid::new_v4().simple()),
            items: Mutex::new(items),
            vendor_writes: Mutex::new(Vec::new()),
            health: Mutex::new("Dwa backend is healthy".to_string()),
            token_revoked: Mutex::new(false),
            cart: Mutex::new(Vec::new()),
            failing_payments: Mutex::new(HashSet::new()),
            payments: Mutex::new(Vec::new()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn authorized(&self, headers: &HeaderMap) -> bool {
        let expected = format!("Bearer {}", self.token);
        !*lock(&self.token_revoked)
            && headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == expected)
    }

    fn item(&self, iid: &str) -> Option<Value> {
        lock(&self.items).iter().find(|i| i["iid"] == iid).cloned()
    }
}

// =============================================================================
// FakeBackend
// =============================================================================

/// A running fake backend. The server stops when this is dropped.
pub struct FakeBackend {
    pub base_url: String,
    state: Arc<BackendState>,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Start a backend on an ephemeral port.
    ///
    /// # Panics
    ///
    /// Panics if the listener cannot be bound.
    pub async fn spawn() -> Self {
        let state = Arc::new(BackendState::new());
        let app = router(Arc::clone(&state));

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind fake backend");
        let addr = listener.local_addr().expect("Failed to read local address");
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}/"),
            state,
            server,
        }
    }

    /// Client configuration pointing at this backend, persisting sessions
    /// under `session_dir`.
    ///
    /// # Panics
    ///
    /// Panics if the base URL does not parse.
    #[must_use]
    pub fn config(&self, session_dir: &Path) -> ClientConfig {
        let mut config = ClientConfig::new(&self.base_url).expect("Invalid fake backend URL");
        config.session_dir = session_dir.to_path_buf();
        config
    }

    #[must_use]
    pub fn state(&self) -> &BackendState {
        &self.state
    }

    /// Items for sale, as the backend serves them.
    #[must_use]
    pub fn items(&self) -> Vec<Value> {
        lock(&self.state.items).clone()
    }

    /// The `GET items/:iid` payload of the `index`th fixture item.
    ///
    /// # Panics
    ///
    /// Panics if there is no such fixture.
    #[must_use]
    pub fn item(&self, index: usize) -> dwa_core::Item {
        let raw = self.items().get(index).expect("No such fixture item").clone();
        serde_json::from_value(raw).expect("Fixture item does not decode")
    }

    /// Every request received so far.
    #[must_use]
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.state.requests).clone()
    }

    /// Requests whose method and path match.
    #[must_use]
    pub fn requests_to(&self, method: &str, path: &str) -> Vec<RecordedRequest> {
        self.requests()
            .into_iter()
            .filter(|r| r.method == method && r.path == path)
            .collect()
    }

    /// Bodies received by `buyer/pay/initialize`.
    #[must_use]
    pub fn payments(&self) -> Vec<Value> {
        lock(&self.state.payments).clone()
    }

    /// Bodies received by `vendor/item/add` and `vendor/item/update`, in
    /// arrival order.
    #[must_use]
    pub fn vendor_writes(&self) -> Vec<Value> {
        lock(&self.state.vendor_writes).clone()
    }

    /// Lines currently in the server-side cart.
    #[must_use]
    pub fn server_cart(&self) -> Vec<Value> {
        lock(&self.state.cart).clone()
    }

    /// Put a line in the server-side cart behind the client's back.
    ///
    /// # Panics
    ///
    /// Panics if there is no such fixture.
    pub fn seed_server_cart(&self, index: usize, quantity: u32) {
        let items = self.items();
        let item = items.get(index).expect("No such fixture item");
        lock(&self.state.cart).push(cart_line(item, quantity));
    }

    /// Make `auth/ping` and every protected route answer 401.
    pub fn revoke_token(&self) {
        *lock(&self.state.token_revoked) = true;
    }

    /// Change the `msg` served by `health`.
    pub fn set_health(&self, msg: &str) {
        *lock(&self.state.health) = msg.to_string();
    }

    /// Make payments for `iid` fail with 500.
    pub fn fail_payments_for(&self, iid: &str) {
        lock(&self.state.failing_payments).insert(iid.to_string());
    }

    /// The login payload the backend returns for the buyer.
    #[must_use]
    pub fn buyer_json(&self) -> Value {
        json!({
            "uid": self.state.buyer_id,
            "name": "Ama Mensah",
            "email": BUYER_EMAIL,
            "token": self.state.token,
            "user_type": "buyer"
        })
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

// =============================================================================
// Routes
// =============================================================================

type Shared = Arc<BackendState>;

fn router(state: Shared) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/plain", get(plain))
        .route("/auth/ping", get(ping))
        .route("/auth/user/login", post(login))
        .route("/auth/user/signup", post(signup))
        .route("/auth/user/update", put(update_user))
        .route("/auth/user/delete/{uid}", delete(delete_user))
        .route("/items/all", get(all_items))
        .route("/items/{iid}", get(item))
        .route("/vendor/item/add", post(add_item))
        .route("/vendor/item/update", put(update_item))
        .route("/vendor/item/delete/{iid}", delete(delete_item))
        .route("/vendor/item/{vid}", get(vendor_items))
        .route("/vendor/transactions/{vid}", get(transactions))
        .route("/buyer/cart/add", post(cart_add))
        .route("/buyer/cart/update", put(cart_update))
        .route("/buyer/cart/remove", post(cart_remove))
        .route("/buyer/cart/{bid}", get(cart_get))
        .route("/buyer/cart/{bid}/clear", post(cart_clear))
        .route("/buyer/pay/initialize", post(pay))
        .layer(from_fn_with_state(Arc::clone(&state), record))
        .with_state(state)
}

async fn record(State(state): State<Shared>, request: Request, next: Next) -> Response {
    lock(&state.requests).push(RecordedRequest {
        method: request.method().to_string(),
        path: request.uri().path().to_string(),
        authorization: request
            .headers()
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
    });
    next.run(request).await
}

fn data(status: StatusCode, data: Value) -> Response {
    (status, Json(json!({ "data": data }))).into_response()
}

fn ok(payload: Value) -> Response {
    data(StatusCode::OK, payload)
}

fn msg(text: &str) -> Response {
    ok(json!({ "msg": text }))
}

fn fail(status: StatusCode, err: &str) -> Response {
    data(status, json!({ "err": err }))
}

fn unauthorized() -> Response {
    fail(StatusCode::UNAUTHORIZED, "invalid or expired token")
}

fn cart_line(item: &Value, quantity: u32) -> Value {
    json!({
        "iid": item["iid"],
        "vid": item["vid"],
        "name": item["name"],
        "pictureurl": item["pictureurl"],
        "cost": item["cost"],
        "quantity": quantity,
        "vendor_name": "Campus Crafts",
        "added_time": "2025-03-01T10:00:00Z"
    })
}

async fn health(State(state): State<Shared>) -> Response {
    let text = lock(&state.health).clone();
    msg(&text)
}

async fn plain() -> Response {
    Json(json!({ "msg": "no envelope" })).into_response()
}

async fn ping(State(state): State<Shared>, headers: HeaderMap) -> Response {
    if state.authorized(&headers) {
        msg("pong")
    } else {
        unauthorized()
    }
}

async fn login(State(state): State<Shared>, Json(body): Json<Value>) -> Response {
    let email = body["email"].as_str().unwrap_or_default();
    if body["password"] != PASSWORD {
        return fail(StatusCode::BAD_REQUEST, "invalid email or password");
    }
    match email {
        BUYER_EMAIL => ok(json!({
            "uid": state.buyer_id,
            "name": "Ama Mensah",
            "email": BUYER_EMAIL,
            "token": state.token,
            "user_type": "buyer"
        })),
        VENDOR_EMAIL => ok(json!({
            "uid": state.vendor_id,
            "name": "Kofi Boateng",
            "email": VENDOR_EMAIL,
            "token": state.token,
            "user_type": "vendor"
        })),
        _ => fail(StatusCode::BAD_REQUEST, "invalid email or password"),
    }
}

async fn signup(Json(body): Json<Value>) -> Response {
    if body["email"] == BUYER_EMAIL {
        return fail(StatusCode::CONFLICT, "email already registered");
    }
    msg("user created")
}

async fn update_user(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if body["user"]["email"].is_null() {
        return fail(StatusCode::BAD_REQUEST, "email required");
    }
    msg("user updated")
}

async fn delete_user(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(uid): UrlPath<String>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if uid != state.buyer_id && uid != state.vendor_id {
        return fail(StatusCode::NOT_FOUND, "user not found");
    }
    msg("user deleted")
}

async fn all_items(State(state): State<Shared>) -> Response {
    let items = lock(&state.items).clone();
    ok(json!({ "items": items }))
}

async fn item(State(state): State<Shared>, UrlPath(iid): UrlPath<String>) -> Response {
    state
        .item(&iid)
        .map_or_else(|| fail(StatusCode::NOT_FOUND, "item not found"), ok)
}

async fn vendor_items(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(vid): UrlPath<String>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let listed: Vec<Value> = lock(&state.items)
        .iter()
        .filter(|i| i["vid"] == vid.as_str())
        .cloned()
        .collect();
    if listed.is_empty() {
        return ok(json!({ "items": null }));
    }
    ok(json!({ "items": listed }))
}

async fn add_item(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    lock(&state.vendor_writes).push(body.clone());
    if body["name"].as_str().is_none_or(str::is_empty) {
        return fail(StatusCode::BAD_REQUEST, "name required");
    }
    let iid = Uuid::new_v4().to_string();
    let mut item = body;
    item["iid"] = json!(iid);
    lock(&state.items).push(item);
    data(StatusCode::CREATED, json!({ "iid": iid }))
}

async fn update_item(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    lock(&state.vendor_writes).push(body.clone());
    let mut items = lock(&state.items);
    let Some(item) = items.iter_mut().find(|i| i["iid"] == body["iid"]) else {
        return fail(StatusCode::NOT_FOUND, "item not found");
    };
    if let Some(fields) = body.as_object() {
        for (key, value) in fields {
            item[key.as_str()] = value.clone();
        }
    }
    msg("item updated")
}

async fn delete_item(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(iid): UrlPath<String>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let mut items = lock(&state.items);
    let before = items.len();
    items.retain(|i| i["iid"] != iid.as_str());
    if items.len() == before {
        return fail(StatusCode::NOT_FOUND, "item not found");
    }
    msg("item deleted")
}

async fn transactions(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(vid): UrlPath<String>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if vid != state.vendor_id {
        return ok(json!({ "transactions": null }));
    }
    ok(json!({
        "transactions": [
            { "name": "Ceramic mug", "amt": 14.0, "t_time": "2025-03-01T10:00:00Z" },
            { "name": "Ceramic mug", "amt": 7.0, "t_time": "2025-03-02 09:30:00" }
        ]
    }))
}

fn same_line(line: &Value, body: &Value) -> bool {
    line["iid"] == body["iid"] && line["vid"] == body["vid"]
}

async fn cart_add(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let Some(item) = body["iid"].as_str().and_then(|iid| state.item(iid)) else {
        return fail(StatusCode::NOT_FOUND, "item not found");
    };
    let mut cart = lock(&state.cart);
    if cart.iter().any(|line| same_line(line, &body)) {
        return fail(StatusCode::BAD_REQUEST, "item already in cart");
    }
    let quantity = body["quantity"].as_u64().unwrap_or(1);
    cart.push(cart_line(&item, u32::try_from(quantity).unwrap_or(u32::MAX)));
    ok(json!({ "message": "Item added to cart!" }))
}

async fn cart_update(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    let mut cart = lock(&state.cart);
    match cart.iter_mut().find(|line| same_line(line, &body)) {
        Some(line) => {
            line["quantity"] = body["quantity"].clone();
            ok(json!({ "message": "item quantity updated" }))
        }
        None => fail(StatusCode::NOT_FOUND, "item not in cart"),
    }
}

async fn cart_remove(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    lock(&state.cart).retain(|line| !same_line(line, &body));
    ok(json!({ "message": "item removed from cart" }))
}

async fn cart_get(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(bid): UrlPath<String>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if bid != state.buyer_id {
        return fail(StatusCode::FORBIDDEN, "not your cart");
    }
    let items = lock(&state.cart).clone();
    ok(json!({ "items": items }))
}

async fn cart_clear(
    State(state): State<Shared>,
    headers: HeaderMap,
    UrlPath(bid): UrlPath<String>,
) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    if bid != state.buyer_id {
        return fail(StatusCode::FORBIDDEN, "not your cart");
    }
    lock(&state.cart).clear();
    ok(json!({ "message": "Cart cleared" }))
}

async fn pay(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if !state.authorized(&headers) {
        return unauthorized();
    }
    lock(&state.payments).push(body.clone());
    let iid = body["iid"].as_str().unwrap_or_default();
    if lock(&state.failing_payments).contains(iid) {
        return fail(StatusCode::INTERNAL_SERVER_ERROR, "payment provider unavailable");
    }
    ok(json!({ "reference": Uuid::new_v4().to_string(), "status": "initialized" }))
}
