//! Client-side session store.
//!
//! Holds exactly one [`User`] and one [`Cart`], shared by every handle
//! cloned from the same store. Each mutation writes the touched record
//! through to [`SessionStorage`] so a restarted client can pick the session
//! back up with [`ClientStore::restore`].

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use dwa_core::{Cart, CartItem, User, UserId, UserType};

use crate::error::Result;
use crate::storage::{CART_KEY, SessionStorage, StorageError, USER_KEY};

/// The store's contents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreState {
    pub user: User,
    pub cart: Cart,
}

/// Fields to overwrite on a partial reset. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResetOptions {
    pub uid: Option<UserId>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub token: Option<String>,
    pub user_type: Option<UserType>,
    pub cart: Option<Vec<CartItem>>,
}

/// Which records a mutation touched.
#[derive(Clone, Copy)]
enum Dirty {
    User,
    Cart,
    Both,
}

/// Shared handle to the session store.
#[derive(Clone)]
pub struct ClientStore {
    state: Arc<RwLock<StoreState>>,
    storage: Arc<dyn SessionStorage>,
}

impl ClientStore {
    /// A store with default contents. Nothing is read from or written to
    /// `storage` until the first mutation.
    #[must_use]
    pub fn new(storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            state: Arc::new(RwLock::new(StoreState::default())),
            storage,
        }
    }

    /// Rebuild the store from what `storage` holds.
    ///
    /// Missing or unreadable records fall back to their defaults. This never
    /// talks to the backend; validating the restored session is a separate
    /// step (see [`crate::startup::verify_session`]).
    #[must_use]
    pub fn restore(storage: Arc<dyn SessionStorage>) -> Self {
        let user: User = load(storage.as_ref(), USER_KEY).unwrap_or_default();
        let cart: Cart = load(storage.as_ref(), CART_KEY).unwrap_or_default();
        debug!(
            authenticated = user.is_authenticated(),
            cart_lines = cart.len(),
            "Restored client store"
        );
        Self {
            state: Arc::new(RwLock::new(StoreState { user, cart })),
            storage,
        }
    }

    // =========================================================================
    // Readers
    // =========================================================================

    /// A copy of the whole state.
    #[must_use]
    pub fn snapshot(&self) -> StoreState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn user(&self) -> User {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user
            .clone()
    }

    #[must_use]
    pub fn cart(&self) -> Cart {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .cart
            .clone()
    }

    // =========================================================================
    // Mutators
    // =========================================================================

    /// Replace the user. The cart is left as is.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if persisting fails; the in-memory
    /// state is updated regardless.
    pub fn set_user(&self, user: User) -> Result<()> {
        self.mutate(Dirty::User, |state| state.user = user)
    }

    /// Replace the cart. The user is left as is.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if persisting fails.
    pub fn set_cart(&self, cart: Cart) -> Result<()> {
        self.mutate(Dirty::Cart, |state| state.cart = cart)
    }

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if persisting fails.
    pub fn update_name(&self, name: impl Into<String>) -> Result<()> {
        let name = name.into();
        self.mutate(Dirty::User, |state| state.user.name = name)
    }

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if persisting fails.
    pub fn update_email(&self, email: impl Into<String>) -> Result<()> {
        let email = email.into();
        self.mutate(Dirty::User, |state| state.user.email = email)
    }

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if persisting fails.
    pub fn update_uid(&self, uid: impl Into<UserId>) -> Result<()> {
        let uid = uid.into();
        self.mutate(Dirty::User, |state| state.user.uid = uid)
    }

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if persisting fails.
    pub fn update_token(&self, token: impl Into<String>) -> Result<()> {
        let token = token.into();
        self.mutate(Dirty::User, |state| state.user.token = token)
    }

    /// # Errors
    ///
    /// Returns `ClientError::Storage` if persisting fails.
    pub fn update_user_type(&self, user_type: UserType) -> Result<()> {
        self.mutate(Dirty::User, |state| state.user.user_type = user_type)
    }

    /// Edit the cart in place and persist it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if persisting fails.
    pub fn update_cart<R>(&self, f: impl FnOnce(&mut Cart) -> R) -> Result<R> {
        self.mutate(Dirty::Cart, |state| f(&mut state.cart))
    }

    /// Without options, restore the anonymous user and an empty cart. With
    /// options, overwrite exactly the provided fields.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if persisting fails.
    pub fn reset(&self, options: Option<ResetOptions>) -> Result<()> {
        let Some(opts) = options else {
            return self.mutate(Dirty::Both, |state| *state = StoreState::default());
        };

        let dirty = match (opts.cart.is_some(), touches_user(&opts)) {
            (true, true) => Dirty::Both,
            (true, false) => Dirty::Cart,
            _ => Dirty::User,
        };
        self.mutate(dirty, |state| {
            let user = &mut state.user;
            if let Some(uid) = opts.uid {
                user.uid = uid;
            }
            if let Some(name) = opts.name {
                user.name = name;
            }
            if let Some(email) = opts.email {
                user.email = email;
            }
            if let Some(token) = opts.token {
                user.token = token;
            }
            if let Some(user_type) = opts.user_type {
                user.user_type = user_type;
            }
            if let Some(cart) = opts.cart {
                state.cart = Cart::from_items(cart);
            }
        })
    }

    /// Remove the persisted user and cart. In-memory state is untouched.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Storage` if the storage cannot be written.
    pub fn clear_persisted(&self) -> Result<()> {
        self.storage.clear()?;
        Ok(())
    }

    /// Apply `f` under the write lock, then persist the touched records
    /// while still holding it so storage order matches memory order.
    fn mutate<R>(&self, dirty: Dirty, f: impl FnOnce(&mut StoreState) -> R) -> Result<R> {
        let mut state = self.write();
        let out = f(&mut state);
        if matches!(dirty, Dirty::User | Dirty::Both) {
            save(self.storage.as_ref(), USER_KEY, &state.user)?;
        }
        if matches!(dirty, Dirty::Cart | Dirty::Both) {
            save(self.storage.as_ref(), CART_KEY, &state.cart)?;
        }
        Ok(out)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ClientStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientStore")
            .field("state", &self.snapshot())
            .finish_non_exhaustive()
    }
}

const fn touches_user(opts: &ResetOptions) -> bool {
    opts.uid.is_some()
        || opts.name.is_some()
        || opts.email.is_some()
        || opts.token.is_some()
        || opts.user_type.is_some()
}

fn save<T: Serialize>(storage: &dyn SessionStorage, key: &str, value: &T) -> Result<()> {
    let raw = serde_json::to_string(value).map_err(StorageError::from)?;
    storage.set(key, &raw)?;
    Ok(())
}

fn load<T: DeserializeOwned>(storage: &dyn SessionStorage, key: &str) -> Option<T> {
    let raw = match storage.get(key) {
        Ok(raw) => raw?,
        Err(e) => {
            warn!(key, error = %e, "Could not read persisted session");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(key, error = %e, "Discarding unreadable persisted value");
            None
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use dwa_core::{ItemId, VendorId};
    use rust_decimal::Decimal;

    use crate::storage::MemoryStorage;

    use super::*;

    fn signed_in() -> User {
        User {
            uid: UserId::new("u-1"),
            name: "Ama".to_string(),
            email: "ama@b.io".to_string(),
            token: "tok".to_string(),
            user_type: UserType::Vendor,
        }
    }

    fn line(iid: &str) -> CartItem {
        CartItem {
            iid: ItemId::new(iid),
            vid: VendorId::new("v-1"),
            name: "Mug".to_string(),
            pictureurl: None,
            cost: Decimal::new(700, 2),
            quantity: 1,
            vendor_name: String::new(),
            added_time: None,
        }
    }

    fn store() -> (Arc<MemoryStorage>, ClientStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = ClientStore::new(storage.clone());
        (storage, store)
    }

    #[test]
    fn test_set_user_keeps_cart() {
        let (_, store) = store();
        store.set_cart(Cart::from_items(vec![line("i-1")])).unwrap();
        store.set_user(signed_in()).unwrap();
        assert_eq!(store.cart().len(), 1);
        assert_eq!(store.user(), signed_in());
    }

    #[test]
    fn test_field_setters() {
        let (_, store) = store();
        store.update_uid("u-9").unwrap();
        store.update_name("Kofi").unwrap();
        store.update_email("kofi@b.io").unwrap();
        store.update_token("t-9").unwrap();
        store.update_user_type(UserType::Admin).unwrap();
        let user = store.user();
        assert_eq!(user.uid.as_str(), "u-9");
        assert_eq!(user.name, "Kofi");
        assert_eq!(user.email, "kofi@b.io");
        assert_eq!(user.token, "t-9");
        assert_eq!(user.user_type, UserType::Admin);
    }

    #[test]
    fn test_full_reset() {
        let (_, store) = store();
        store.set_user(signed_in()).unwrap();
        store.set_cart(Cart::from_items(vec![line("i-1")])).unwrap();
        store.reset(None).unwrap();
        assert_eq!(store.snapshot(), StoreState::default());
    }

    #[test]
    fn test_partial_reset_only_touches_given_fields() {
        let (_, store) = store();
        store.set_user(signed_in()).unwrap();
        store.set_cart(Cart::from_items(vec![line("i-1")])).unwrap();

        store
            .reset(Some(ResetOptions {
                name: Some("X".to_string()),
                ..ResetOptions::default()
            }))
            .unwrap();

        let state = store.snapshot();
        assert_eq!(state.user.name, "X");
        assert_eq!(state.user.uid.as_str(), "u-1");
        assert_eq!(state.user.email, "ama@b.io");
        assert_eq!(state.user.token, "tok");
        assert_eq!(state.user.user_type, UserType::Vendor);
        assert_eq!(state.cart.len(), 1);
    }

    #[test]
    fn test_partial_reset_cart() {
        let (_, store) = store();
        store.set_cart(Cart::from_items(vec![line("i-1")])).unwrap();
        store
            .reset(Some(ResetOptions {
                cart: Some(vec![line("i-2"), line("i-3")]),
                ..ResetOptions::default()
            }))
            .unwrap();
        let cart = store.cart();
        assert_eq!(cart.len(), 2);
        assert!(!cart.contains(&ItemId::new("i-1"), &VendorId::new("v-1")));
    }

    #[test]
    fn test_mutations_persist_and_restore() {
        let (storage, store) = store();
        store.set_user(signed_in()).unwrap();
        store
            .update_cart(|cart| cart.add_line(line("i-1")))
            .unwrap();

        let restored = ClientStore::restore(storage);
        assert_eq!(restored.snapshot(), store.snapshot());
    }

    #[test]
    fn test_restore_falls_back_on_corrupt_values() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(USER_KEY, "{not json").unwrap();
        storage.set(CART_KEY, "[]").unwrap();
        let store = ClientStore::restore(storage);
        assert_eq!(store.snapshot(), StoreState::default());
    }

    #[test]
    fn test_clear_persisted_keeps_memory() {
        let (storage, store) = store();
        store.set_user(signed_in()).unwrap();
        store.clear_persisted().unwrap();
        assert_eq!(storage.get(USER_KEY).unwrap(), None);
        assert_eq!(store.user(), signed_in());
    }

    #[test]
    fn test_clones_share_state() {
        let (_, store) = store();
        let other = store.clone();
        other.update_name("Efua").unwrap();
        assert_eq!(store.user().name, "Efua");
    }
}
