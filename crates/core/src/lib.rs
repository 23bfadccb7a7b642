//! Lovevote Core - Shared types library.
//!
//! This crate provides common types used across all lovevote components:
//! - `server` - The anonymous vote endpoint
//! - `client` - Local vote cache and optimistic vote controls
//! - `cli` - Command-line tools for migrations and inspection
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype identifiers, vote tallies and registries, wire payloads

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
