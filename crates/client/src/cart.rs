//! Server-synced cart operations.
//!
//! The backend owns the buyer's cart; the store keeps a local copy. Each
//! operation updates the server first and then the local copy, and a
//! failed add re-syncs the local copy from the server before returning
//! the error.

use reqwest::StatusCode;
use tokio::sync::Mutex;
use tracing::{debug, instrument, warn};

use dwa_core::{Cart, Item, ItemId, User, VendorId};

use crate::api::{CartLineRef, CartLineRequest};
use crate::error::{ClientError, Result};
use crate::http::{ApiClient, is_status};
use crate::store::ClientStore;

/// Cart operations for the signed-in buyer.
///
/// Operations on one service run one at a time.
#[derive(Debug)]
pub struct CartService {
    client: ApiClient,
    store: ClientStore,
    busy: Mutex<()>,
}

impl CartService {
    #[must_use]
    pub fn new(client: ApiClient, store: ClientStore) -> Self {
        Self {
            client,
            store,
            busy: Mutex::new(()),
        }
    }

    fn buyer(&self) -> Result<User> {
        let user = self.store.user();
        if user.is_authenticated() {
            Ok(user)
        } else {
            Err(ClientError::NotAuthenticated)
        }
    }

    /// Add one unit of `item`.
    ///
    /// A line already in the local cart is bumped with `buyer/cart/update`.
    /// Otherwise the line is created with `buyer/cart/add`; if the server
    /// already has it (400) the quantity is set with `buyer/cart/update`
    /// instead, and the cart is then re-fetched.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or the
    /// first failing request (after re-syncing the local cart).
    #[instrument(skip(self, item), fields(iid = %item.iid, vid = %item.vid))]
    pub async fn add_item(&self, item: &Item) -> Result<Cart> {
        let _busy = self.busy.lock().await;
        let buyer = self.buyer()?;

        let existing = self
            .store
            .cart()
            .get(&item.iid, &item.vid)
            .map(|line| line.quantity);
        let line = CartLineRequest {
            bid: buyer.uid.clone(),
            iid: item.iid.clone(),
            vid: item.vid.clone(),
            quantity: existing.map_or(1, |q| q.saturating_add(1)),
        };

        let synced = if existing.is_some() {
            self.bump(item, &line).await
        } else {
            self.create(&buyer, &line).await
        };

        if let Err(e) = synced {
            warn!(error = %e, "Cart update failed, re-syncing from server");
            if let Err(resync) = self.fetch(&buyer).await {
                warn!(error = %resync, "Cart re-sync failed");
            }
            return Err(e);
        }
        Ok(self.store.cart())
    }

    async fn bump(&self, item: &Item, line: &CartLineRequest) -> Result<()> {
        self.client.api().cart_update(line).await?;
        self.store.update_cart(|cart| cart.add(item))?;
        Ok(())
    }

    async fn create(&self, buyer: &User, line: &CartLineRequest) -> Result<()> {
        let api = self.client.api();
        match api.cart_add(line).await {
            Ok(_) => {}
            Err(e) if is_status(&e, StatusCode::BAD_REQUEST) => {
                debug!("Line already on the server, updating quantity instead");
                api.cart_update(line).await?;
            }
            Err(e) => return Err(e),
        }
        self.fetch(buyer).await?;
        Ok(())
    }

    /// Set a line's quantity; zero removes it.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or the
    /// request failure (the local cart is left unchanged).
    #[instrument(skip(self), fields(iid = %iid, vid = %vid))]
    pub async fn set_quantity(&self, iid: &ItemId, vid: &VendorId, quantity: u32) -> Result<Cart> {
        if quantity == 0 {
            return self.remove_item(iid, vid).await;
        }
        let _busy = self.busy.lock().await;
        let buyer = self.buyer()?;
        let line = CartLineRequest {
            bid: buyer.uid,
            iid: iid.clone(),
            vid: vid.clone(),
            quantity,
        };
        self.client.api().cart_update(&line).await?;
        self.store
            .update_cart(|cart| cart.set_quantity(iid, vid, quantity))?;
        Ok(self.store.cart())
    }

    /// Remove a line.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or the
    /// request failure (the local cart is left unchanged).
    #[instrument(skip(self), fields(iid = %iid, vid = %vid))]
    pub async fn remove_item(&self, iid: &ItemId, vid: &VendorId) -> Result<Cart> {
        let _busy = self.busy.lock().await;
        let buyer = self.buyer()?;
        let line = CartLineRef {
            bid: buyer.uid,
            iid: iid.clone(),
            vid: vid.clone(),
        };
        self.client.api().cart_remove(&line).await?;
        self.store.update_cart(|cart| cart.remove(iid, vid))?;
        Ok(self.store.cart())
    }

    /// Empty the cart.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or the
    /// request failure (the local cart is left unchanged).
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<()> {
        let _busy = self.busy.lock().await;
        let buyer = self.buyer()?;
        self.client.api().cart_clear(&buyer.uid).await?;
        self.store.update_cart(Cart::clear)?;
        Ok(())
    }

    /// Replace the local cart with the server's.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NotAuthenticated` without a session, or the
    /// request failure.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Cart> {
        let _busy = self.busy.lock().await;
        let buyer = self.buyer()?;
        self.fetch(&buyer).await
    }

    async fn fetch(&self, buyer: &User) -> Result<Cart> {
        let items = self.client.api().cart(&buyer.uid).await?;
        let cart = Cart::from_items(items);
        self.store.set_cart(cart.clone())?;
        debug!(lines = cart.len(), "Cart synced from server");
        Ok(cart)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use rust_decimal::Decimal;

    use crate::config::ClientConfig;
    use crate::fault::FaultPolicy;
    use crate::storage::MemoryStorage;

    use super::*;

    fn item() -> Item {
        Item {
            iid: ItemId::new("i-1"),
            vid: VendorId::new("v-1"),
            name: "Mug".to_string(),
            pictureurl: None,
            description: None,
            category: None,
            quantity: 4,
            cost: Decimal::new(700, 2),
        }
    }

    fn service() -> CartService {
        let config = ClientConfig::new("http://127.0.0.1:9").unwrap();
        let client = ApiClient::new(&config, FaultPolicy::new()).unwrap();
        CartService::new(client, ClientStore::new(Arc::new(MemoryStorage::new())))
    }

    #[tokio::test]
    async fn test_anonymous_buyer_is_rejected_without_request() {
        let service = service();
        assert!(matches!(
            service.add_item(&item()).await,
            Err(ClientError::NotAuthenticated)
        ));
        assert!(matches!(service.refresh().await, Err(ClientError::NotAuthenticated)));
        assert!(matches!(service.clear().await, Err(ClientError::NotAuthenticated)));
        assert!(service.store.cart().is_empty());
    }
}
