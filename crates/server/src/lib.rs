//! Shipline server library.
//!
//! The order tracking reconciliation engine as a library, allowing it to be
//! tested and reused. The binary in `main.rs` wires this into an axum
//! server.
//!
//! # Subsystems
//!
//! - [`carrier`] - Delhivery adapter: tracking, manifest, pickup calls
//! - [`resolver`] - Free-form query to order resolution
//! - [`policy`] - Pure refetch decision
//! - [`reconcile`] - Single-order and bulk enrichment orchestration
//! - [`dispatch`] - Status transitions and notification fan-out
//! - [`notify`] - Email and SMS side channels
//! - [`db`] - Order store trait plus Postgres and in-memory backends

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod carrier;
pub mod config;
pub mod db;
pub mod dispatch;
pub mod error;
pub mod middleware;
pub mod models;
pub mod notify;
pub mod policy;
pub mod reconcile;
pub mod resolver;
pub mod routes;
pub mod state;
