//! DWA Market client.
//!
//! Everything a front-end needs to talk to the DWA backend: the configured
//! HTTP layer with its status handlers, the typed endpoints, the persisted
//! session store, the 401 bridge, cart sync and checkout.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fault;
pub mod http;
pub mod session;
pub mod startup;
pub mod storage;
pub mod store;

pub use api::Api;
pub use cart::CartService;
pub use checkout::{CheckoutError, OrderReceipt, place_order};
pub use config::{ClientConfig, ConfigError};
pub use error::{ClientError, Result};
pub use fault::{FaultPolicy, HttpFailure};
pub use http::ApiClient;
pub use session::{Navigator, SessionGuard};
pub use startup::{SessionStatus, verify_session};
pub use storage::{FileStorage, MemoryStorage, SessionStorage};
pub use store::{ClientStore, ResetOptions, StoreState};
