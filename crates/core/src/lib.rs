//! NeonMart Core - Shared types and client-state containers.
//!
//! This crate provides the types used across all NeonMart components:
//! - `storefront` - JSON API server for the shop and its admin dashboard
//! - `cli` - Command-line tools for migrations
//!
//! # Architecture
//!
//! The core crate contains only types and pure state transitions - no I/O, no
//! database access, no HTTP clients. This keeps it lightweight and lets the
//! state containers be unit tested in isolation.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, and statuses
//! - [`cart`] - Cart state container and its reductions
//! - [`theme`] - Theme state container and stored preference parsing
//! - [`analytics`] - Analytics events and dashboard aggregation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod analytics;
pub mod cart;
pub mod theme;
pub mod types;

pub use types::*;
