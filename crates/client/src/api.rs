//! Typed backend endpoints.
//!
//! Each function is a thin call through [`ApiClient`]; request and response
//! shapes mirror the backend's JSON after envelope unwrapping.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::instrument;

use dwa_core::validation::{LoginForm, SignupForm};
use dwa_core::{CartItem, Item, ItemId, ItemUpdate, NewItem, Transaction, User, UserId, UserType, VendorId};

use crate::error::Result;
use crate::http::ApiClient;

// =============================================================================
// Wire types
// =============================================================================

/// `{"msg": "..."}` acknowledgement.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct MsgResponse {
    #[serde(default, alias = "message")]
    pub msg: String,
}

#[derive(Deserialize)]
struct ItemsResponse<T> {
    items: Option<Vec<T>>,
}

#[derive(Deserialize)]
struct TransactionsResponse {
    #[serde(default)]
    transactions: Option<Vec<Transaction>>,
}

#[derive(Deserialize)]
struct CreatedItem {
    iid: ItemId,
}

/// Result of `auth/user/signup`: some backends sign the new account in
/// straight away, others only acknowledge it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignupOutcome {
    /// The account was created and a session issued.
    SignedIn(User),
    /// The account was created; the user must sign in.
    Created(String),
}

impl SignupOutcome {
    fn from_payload(payload: Value) -> Result<Self> {
        if payload.get("token").is_some() {
            return Ok(Self::SignedIn(serde_json::from_value(payload)?));
        }
        let ack: MsgResponse = serde_json::from_value(payload)?;
        Ok(Self::Created(ack.msg))
    }
}

/// Body of `buyer/cart/add` and `buyer/cart/update`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineRequest {
    pub bid: UserId,
    pub iid: ItemId,
    pub vid: VendorId,
    pub quantity: u32,
}

/// Body of `buyer/cart/remove`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CartLineRef {
    pub bid: UserId,
    pub iid: ItemId,
    pub vid: VendorId,
}

/// Body of `buyer/pay/initialize`, one per cart line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentRequest {
    pub bid: UserId,
    pub vid: VendorId,
    pub iid: ItemId,
    /// Unit cost of the line.
    #[serde(with = "rust_decimal::serde::float")]
    pub amt: Decimal,
    pub qty_bought: u32,
}

impl PaymentRequest {
    #[must_use]
    pub fn for_line(buyer: &UserId, line: &CartItem) -> Self {
        Self {
            bid: buyer.clone(),
            vid: line.vid.clone(),
            iid: line.iid.clone(),
            amt: line.cost,
            qty_bought: line.quantity,
        }
    }
}

/// Body of `auth/user/update`.
///
/// Serializes as `{"user": {"user_type", "email"}, "user_types": {"<role>":
/// {"uid", "name"}}}`, the role key matching `user.user_type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileUpdate {
    pub user: ProfileAccount,
    pub user_types: RoleProfiles,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProfileAccount {
    pub user_type: UserType,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleProfile {
    pub uid: UserId,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoleProfiles {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buyer: Option<RoleProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<RoleProfile>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin: Option<RoleProfile>,
}

impl ProfileUpdate {
    /// New `email` and `name` for `user`, keyed under its role.
    #[must_use]
    pub fn new(user: &User, email: impl Into<String>, name: impl Into<String>) -> Self {
        let profile = Some(RoleProfile {
            uid: user.uid.clone(),
            name: name.into(),
        });
        let mut user_types = RoleProfiles::default();
        match user.user_type {
            UserType::Buyer => user_types.buyer = profile,
            UserType::Vendor => user_types.vendor = profile,
            UserType::Admin => user_types.admin = profile,
        }
        Self {
            user: ProfileAccount {
                user_type: user.user_type,
                email: email.into(),
            },
            user_types,
        }
    }
}

// =============================================================================
// Api
// =============================================================================

/// Typed view over an [`ApiClient`].
#[derive(Clone, Copy)]
pub struct Api<'a> {
    client: &'a ApiClient,
}

impl fmt::Debug for Api<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Api").field(self.client).finish()
    }
}

impl<'a> Api<'a> {
    #[must_use]
    pub const fn new(client: &'a ApiClient) -> Self {
        Self { client }
    }

    // =========================================================================
    // Liveness
    // =========================================================================

    /// `GET health`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn health(&self) -> Result<String> {
        let ack: MsgResponse = self.client.get("health").await?;
        Ok(ack.msg)
    }

    /// `GET auth/ping`. Succeeds only with a valid bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the token is rejected.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<String> {
        let ack: MsgResponse = self.client.get("auth/ping").await?;
        Ok(ack.msg)
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    /// `POST auth/user/login`.
    ///
    /// # Errors
    ///
    /// Returns an error if the credentials are rejected or the request fails.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn login(&self, form: &LoginForm) -> Result<User> {
        self.client.post("auth/user/login", form).await
    }

    /// `POST auth/user/signup`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend refuses the account or the request fails.
    #[instrument(skip(self, form), fields(email = %form.email, vendor = form.is_vendor))]
    pub async fn signup(&self, form: &SignupForm) -> Result<SignupOutcome> {
        let payload = self.client.post_value("auth/user/signup", form).await?;
        SignupOutcome::from_payload(payload)
    }

    /// `PUT auth/user/update`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, update))]
    pub async fn update_user(&self, update: &ProfileUpdate) -> Result<String> {
        let ack: MsgResponse = self.client.put("auth/user/update", update).await?;
        Ok(ack.msg)
    }

    /// `DELETE auth/user/delete/:uid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(uid = %uid))]
    pub async fn delete_user(&self, uid: &UserId) -> Result<String> {
        let ack: MsgResponse = self.client.delete(&format!("auth/user/delete/{uid}")).await?;
        Ok(ack.msg)
    }

    // =========================================================================
    // Catalogue
    // =========================================================================

    /// `GET items/all`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self))]
    pub async fn all_items(&self) -> Result<Vec<Item>> {
        let res: ItemsResponse<Item> = self.client.get("items/all").await?;
        Ok(res.items.unwrap_or_default())
    }

    /// `GET items/:iid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the item does not exist or the request fails.
    #[instrument(skip(self), fields(iid = %iid))]
    pub async fn item(&self, iid: &ItemId) -> Result<Item> {
        self.client.get(&format!("items/{iid}")).await
    }

    // =========================================================================
    // Vendor
    // =========================================================================

    /// `GET vendor/item/:vid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(vid = %vid))]
    pub async fn vendor_items(&self, vid: &VendorId) -> Result<Vec<Item>> {
        let res: ItemsResponse<Item> = self.client.get(&format!("vendor/item/{vid}")).await?;
        Ok(res.items.unwrap_or_default())
    }

    /// `POST vendor/item/add`. Returns the new item's ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, item), fields(name = %item.name))]
    pub async fn add_item(&self, item: &NewItem) -> Result<ItemId> {
        let created: CreatedItem = self.client.post("vendor/item/add", item).await?;
        Ok(created.iid)
    }

    /// `PUT vendor/item/update`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, update), fields(iid = %update.iid))]
    pub async fn update_item(&self, update: &ItemUpdate) -> Result<String> {
        let ack: MsgResponse = self.client.put("vendor/item/update", update).await?;
        Ok(ack.msg)
    }

    /// `DELETE vendor/item/delete/:iid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(iid = %iid))]
    pub async fn delete_item(&self, iid: &ItemId) -> Result<String> {
        let ack: MsgResponse = self.client.delete(&format!("vendor/item/delete/{iid}")).await?;
        Ok(ack.msg)
    }

    /// `GET vendor/transactions/:vid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(vid = %vid))]
    pub async fn transactions(&self, vid: &VendorId) -> Result<Vec<Transaction>> {
        let res: TransactionsResponse = self
            .client
            .get(&format!("vendor/transactions/{vid}"))
            .await?;
        Ok(res.transactions.unwrap_or_default())
    }

    // =========================================================================
    // Buyer cart
    // =========================================================================

    /// `GET buyer/cart/:bid`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(bid = %bid))]
    pub async fn cart(&self, bid: &UserId) -> Result<Vec<CartItem>> {
        let res: ItemsResponse<CartItem> = self.client.get(&format!("buyer/cart/{bid}")).await?;
        Ok(res.items.unwrap_or_default())
    }

    /// `POST buyer/cart/add`. The backend answers 400 if the line exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, line), fields(iid = %line.iid, quantity = line.quantity))]
    pub async fn cart_add(&self, line: &CartLineRequest) -> Result<String> {
        let ack: MsgResponse = self.client.post("buyer/cart/add", line).await?;
        Ok(ack.msg)
    }

    /// `PUT buyer/cart/update`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, line), fields(iid = %line.iid, quantity = line.quantity))]
    pub async fn cart_update(&self, line: &CartLineRequest) -> Result<String> {
        let ack: MsgResponse = self.client.put("buyer/cart/update", line).await?;
        Ok(ack.msg)
    }

    /// `POST buyer/cart/remove`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, line), fields(iid = %line.iid))]
    pub async fn cart_remove(&self, line: &CartLineRef) -> Result<String> {
        let ack: MsgResponse = self.client.post("buyer/cart/remove", line).await?;
        Ok(ack.msg)
    }

    /// `POST buyer/cart/:bid/clear`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self), fields(bid = %bid))]
    pub async fn cart_clear(&self, bid: &UserId) -> Result<String> {
        let ack: MsgResponse = self
            .client
            .post(&format!("buyer/cart/{bid}/clear"), &Value::Null)
            .await?;
        Ok(ack.msg)
    }

    // =========================================================================
    // Payments
    // =========================================================================

    /// `POST buyer/pay/initialize`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    #[instrument(skip(self, payment), fields(iid = %payment.iid, qty = payment.qty_bought))]
    pub async fn initialize_payment(&self, payment: &PaymentRequest) -> Result<Value> {
        self.client.post_value("buyer/pay/initialize", payment).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_profile_update_shape() {
        let user = User {
            uid: UserId::new("u-1"),
            name: "Ama".to_string(),
            email: "ama@b.io".to_string(),
            token: "tok".to_string(),
            user_type: UserType::Vendor,
        };
        let update = ProfileUpdate::new(&user, "new@b.io", "Ama K");
        assert_eq!(
            serde_json::to_value(&update).unwrap(),
            json!({
                "user": {"user_type": "vendor", "email": "new@b.io"},
                "user_types": {"vendor": {"uid": "u-1", "name": "Ama K"}}
            })
        );
    }

    #[test]
    fn test_payment_request_shape() {
        let line = CartItem {
            iid: ItemId::new("i-1"),
            vid: VendorId::new("v-1"),
            name: "Mug".to_string(),
            pictureurl: None,
            cost: Decimal::new(700, 2),
            quantity: 3,
            vendor_name: String::new(),
            added_time: None,
        };
        let payment = PaymentRequest::for_line(&UserId::new("b-1"), &line);
        assert_eq!(
            serde_json::to_value(&payment).unwrap(),
            json!({"bid": "b-1", "vid": "v-1", "iid": "i-1", "amt": 7.0, "qty_bought": 3})
        );
    }

    #[test]
    fn test_signup_outcome() {
        let signed_in = SignupOutcome::from_payload(json!({
            "uid": "u-1", "name": "Ama", "email": "a@b.io", "token": "t", "user_type": "buyer"
        }))
        .unwrap();
        assert!(matches!(signed_in, SignupOutcome::SignedIn(u) if u.uid.as_str() == "u-1"));

        let created = SignupOutcome::from_payload(json!({"msg": "user created"})).unwrap();
        assert_eq!(created, SignupOutcome::Created("user created".to_string()));
    }

    #[test]
    fn test_items_response_tolerates_null() {
        let res: ItemsResponse<Item> = serde_json::from_value(json!({"items": null})).unwrap();
        assert!(res.items.unwrap_or_default().is_empty());
    }

    #[test]
    fn test_msg_response_accepts_message_key() {
        let ack: MsgResponse = serde_json::from_value(json!({"message": "Cart cleared"})).unwrap();
        assert_eq!(ack.msg, "Cart cleared");
    }

    #[test]
    fn test_items_response_without_items() {
        let missing: ItemsResponse<Item> = serde_json::from_value(json!({})).unwrap();
        assert!(missing.items.is_none());

        let null: ItemsResponse<CartItem> = serde_json::from_value(json!({"items": null})).unwrap();
        assert!(null.items.is_none());

        let listed: ItemsResponse<Item> = serde_json::from_value(json!({"items": [
            {"iid": "i-1", "vid": "v-1", "name": "Mug", "cost": 7.0}
        ]}))
        .unwrap();
        assert_eq!(listed.items.map(|items| items.len()), Some(1));
    }
}
