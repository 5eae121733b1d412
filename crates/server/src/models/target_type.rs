//! User-defined audience labels for templates.

use chrono::{DateTime, Utc};
use serde::Serialize;

use clients_finder_core::TargetTypeId;

/// Color assigned when none is given.
pub const DEFAULT_TARGET_COLOR: &str = "#3B82F6";

/// A custom audience label, e.g. "Hotels without booking engine".
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct CustomTargetType {
    pub id: TargetTypeId,
    pub name: String,
    pub description: Option<String>,
    pub color: String,
    pub created_at: DateTime<Utc>,
}

/// Validated fields for a new custom target type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomTargetType {
    pub name: String,
    pub description: Option<String>,
    pub color: String,
}

impl NewCustomTargetType {
    /// Normalize raw input.
    ///
    /// The name is trimmed and must not be blank. A blank description becomes
    /// `None`, and a blank color falls back to [`DEFAULT_TARGET_COLOR`].
    ///
    /// # Errors
    ///
    /// Returns a message when the name is missing.
    pub fn parse(
        name: Option<&str>,
        description: Option<&str>,
        color: Option<&str>,
    ) -> Result<Self, &'static str> {
        let name = name
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .ok_or("Missing required field: name")?;
        let description = description
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(String::from);
        let color = color
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_TARGET_COLOR);

        Ok(Self {
            name: name.to_string(),
            description,
            color: color.to_string(),
        })
    }
}
