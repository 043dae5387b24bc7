//! Ataka Core - Shared types library.
//!
//! This crate provides common types used across all Ataka Books components:
//! - `commerce` - Cart, checkout and order orchestration core
//! - the presentation layer that consumes it
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no storage access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
