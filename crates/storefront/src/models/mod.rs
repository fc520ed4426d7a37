//! Domain models for the storefront.
//!
//! Rows read from the store and the identity stored in the HTTP session.
//! Cart lines and analytics events live in `neonmart-core`.

pub mod product;
pub mod profile;
pub mod session;

pub use product::{Product, ProductFilter, ProductSort};
pub use profile::Profile;
pub use session::{CurrentUser, keys as session_keys};
