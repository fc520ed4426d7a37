//! Business logic services for the storefront.
//!
//! # Services
//!
//! - `client` - Per-browser client sessions and their registry
//! - `cart` - Cart operations over a client session
//! - `cart_sync` - Serialized background persistence of cart changes
//! - `notices` - Toast messages for failures in background work
//! - `identity` - Hosted identity service client
//! - `analytics` - Fire-and-forget analytics tracking
//! - `catalog` - Product listing and search tracking

pub mod analytics;
pub mod cart;
pub mod catalog;
pub mod cart_sync;
pub mod client;
pub mod identity;
pub mod notices;
