//! Shipline Core - Shared types library.
//!
//! This crate provides common types used across all Shipline components:
//! - `server` - Tracking reconciliation engine and seller API
//! - `integration-tests` - Cross-module test harness
//!
//! # Architecture
//!
//! The core crate contains only types - no I/O, no database access, no HTTP
//! clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, order statuses, and
//!   phone normalization

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
