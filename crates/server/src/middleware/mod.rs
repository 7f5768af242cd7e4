//! HTTP middleware and extractors.

pub mod auth;

pub use auth::{RequireSeller, mint_seller_token};
