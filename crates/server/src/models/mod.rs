//! Domain models for the reconciliation engine.

pub mod order;

pub use order::{Address, LineItem, Order, OrderContact, Pickup};
