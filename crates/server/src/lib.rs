//! Clients Finder server library.
//!
//! Discovers local businesses through the Geoapify places API, keeps them as
//! CRM clients in `PostgreSQL`, and drives email outreach to them.
//!
//! The binary in `main.rs` wires these modules into an axum server; the CLI
//! and the integration tests use them directly.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod app;
pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod models;
pub mod routes;
pub mod services;
pub mod state;
