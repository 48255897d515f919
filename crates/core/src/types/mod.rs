//! Core types for DWA Market.
//!
//! This module provides the domain records exchanged with the backend and
//! held in the client store.

pub mod cart;
pub mod email;
pub mod id;
pub mod item;
pub mod timestamp;
pub mod user;

pub use cart::{Cart, CartItem};
pub use email::{Email, EmailError};
pub use id::*;
pub use item::{Category, Item, ItemUpdate, NewItem, Transaction, total_earnings};
pub use user::{User, UserType};
