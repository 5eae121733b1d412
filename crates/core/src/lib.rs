//! Clients Finder Core - Shared domain types.
//!
//! This crate provides the types shared by every Clients Finder component:
//! - `server` - JSON API for clients, templates, outreach and ingestion
//! - `cli` - Command-line tools for migrations, ingestion and seeding
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no database
//! access, no HTTP clients. Database encoding is gated behind the `postgres`
//! feature so the types stay usable anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype IDs, lifecycle enums, email addresses and template placeholders

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
