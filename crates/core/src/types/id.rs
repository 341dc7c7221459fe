//! Newtype IDs for type-safe entity references.
//!
//! Use the `define_id!` macro to create type-safe ID wrappers that prevent
//! accidentally mixing IDs from different entity types.
//!
//! IDs are string-backed. Records created by this crate get a random UUID v4
//! (see [`new_unique_id`]); records written by older app versions carry
//! millisecond timestamps as IDs and still deserialize unchanged.

use uuid::Uuid;

/// Macro to define a type-safe ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`, `PartialOrd`, `Ord`
/// - Conversion methods: `new()`, `as_str()`, `into_inner()`
/// - `From<&str>`, `From<String>` and `Display` implementations
///
/// # Example
///
/// ```rust
/// # use torodo_core::define_id;
/// define_id!(DriverId);
/// define_id!(RouteId);
///
/// let driver = DriverId::new("d-1");
/// let route = RouteId::new("d-1");
///
/// // These are different types, so this won't compile:
/// // let _: DriverId = route;
/// assert_eq!(driver.as_str(), route.as_str());
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
            PartialOrd,
            Ord,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create an ID from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying string.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
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

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

/// Adds a `generate()` constructor backed by [`new_unique_id`].
macro_rules! impl_generated_id {
    ($($name:ident),* $(,)?) => {
        $(
            impl $name {
                /// Generate a fresh, collision-resistant ID.
                #[must_use]
                pub fn generate() -> Self {
                    Self(new_unique_id())
                }
            }
        )*
    };
}

// Catalog references (assigned by the catalog, never generated)
define_id!(ProductId);
define_id!(WarehouseId);

// Records created at runtime
define_id!(CustomerId);
define_id!(SubscriptionId);
define_id!(SaleId);
define_id!(AccountId);

impl_generated_id!(CustomerId, SubscriptionId, SaleId, AccountId);

/// Produce a new unique identifier string (hyphenated UUID v4).
#[must_use]
pub fn new_unique_id() -> String {
    Uuid::new_v4().to_string()
}
