//! Domain models for the CRM.
//!
//! Rows map straight onto these types via `sqlx::FromRow`; the JSON API
//! serializes them in `camelCase`.

pub mod client;
pub mod email_history;
pub mod note;
pub mod target_type;
pub mod template;

pub use client::{Client, NewClient};
pub use email_history::{EmailHistory, NewEmailHistory};
pub use note::Note;
pub use target_type::{CustomTargetType, DEFAULT_TARGET_COLOR, NewCustomTargetType};
pub use template::{EmailTemplate, NewEmailTemplate, RenderedTemplate, TemplateChanges};
