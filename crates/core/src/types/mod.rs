//! Core types for Shipline.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod phone;
pub mod status;

pub use id::*;
pub use phone::normalize_phone;
pub use status::OrderStatus;
