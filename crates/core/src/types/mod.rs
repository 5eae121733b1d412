//! Core types for Clients Finder.
//!
//! This module provides type-safe wrappers for the CRM's domain concepts.

pub mod email;
pub mod id;
pub mod placeholder;
pub mod status;

pub use email::{EmailAddress, EmailAddressError};
pub use id::*;
pub use placeholder::{Placeholder, PlaceholderSource, render_placeholders};
pub use status::*;
