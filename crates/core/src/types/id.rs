//! Newtype IDs for type-safe entity references.
//!
//! The backend issues UUID text for every entity. Use the `define_id!` macro
//! to create string-backed wrappers that prevent accidentally passing an item
//! ID where a vendor ID is expected.

/// Macro to define a type-safe, string-backed ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `Default`
/// - Conversion methods: `new()`, `as_str()`, `is_empty()`, `into_inner()`
/// - `From<String>`, `From<&str>` and `Display` implementations
///
/// The empty ID is the default and marks "no entity" (e.g. the anonymous user).
///
/// # Example
///
/// ```rust
/// # use dwa_core::define_id;
/// define_id!(OrderId);
/// define_id!(ShopId);
///
/// let order = OrderId::new("0b9f");
/// let shop = ShopId::new("0b9f");
///
/// // These are different types, so this won't compile:
/// // let _: OrderId = shop;
/// assert_eq!(order.as_str(), shop.as_str());
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            Default,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string value.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Whether this is the empty (unset) ID.
            #[must_use]
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }

            /// Consume the ID and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id!(UserId);
define_id!(VendorId);
define_id!(ItemId);

impl From<&UserId> for VendorId {
    /// A vendor's ID is the user ID of the vendor account.
    fn from(uid: &UserId) -> Self {
        Self(uid.as_str().to_owned())
    }
}
