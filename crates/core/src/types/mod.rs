//! Core types for lovevote.
//!
//! This module provides type-safe wrappers for the voting domain.

pub mod id;
pub mod vote;

pub use id::*;
pub use vote::*;
