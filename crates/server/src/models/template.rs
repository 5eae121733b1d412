//! Email template domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use clients_finder_core::{
    EmailTemplateId, PlaceholderSource, TargetTypeId, TemplateTargetType, render_placeholders,
};

/// A reusable outreach email with `{{PLACEHOLDER}}` tokens.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct EmailTemplate {
    pub id: EmailTemplateId,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub target_type: TemplateTargetType,
    pub custom_target_id: Option<TargetTypeId>,
    /// Public attachment URLs.
    pub attachments: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl EmailTemplate {
    /// Substitute placeholders in subject and body.
    #[must_use]
    pub fn render<S: PlaceholderSource + ?Sized>(&self, source: &S) -> RenderedTemplate {
        RenderedTemplate {
            id: self.id,
            name: self.name.clone(),
            subject: render_placeholders(&self.subject, source),
            body: render_placeholders(&self.body, source),
            target_type: self.target_type,
            custom_target_id: self.custom_target_id,
            attachments: self.attachments.clone(),
        }
    }
}

/// A template with placeholders filled in for one client.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedTemplate {
    pub id: EmailTemplateId,
    pub name: String,
    pub subject: String,
    pub body: String,
    pub target_type: TemplateTargetType,
    pub custom_target_id: Option<TargetTypeId>,
    pub attachments: Vec<String>,
}

/// Fields for a new template.
#[derive(Debug, Clone)]
pub struct NewEmailTemplate {
    pub name: String,
    pub subject: String,
    pub body: String,
    pub target_type: TemplateTargetType,
    pub custom_target_id: Option<TargetTypeId>,
    pub attachments: Vec<String>,
}

/// Partial update; `None` leaves a field unchanged.
///
/// `custom_target_id` distinguishes "absent" (`None`) from an explicit
/// `null` (`Some(None)`), which clears the link.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateChanges {
    pub name: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub target_type: Option<TemplateTargetType>,
    #[serde(default, deserialize_with = "present")]
    pub custom_target_id: Option<Option<TargetTypeId>>,
    pub attachments: Option<Vec<String>>,
}

impl TemplateChanges {
    /// Whether the update touches no field.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.subject.is_none()
            && self.body.is_none()
            && self.target_type.is_none()
            && self.custom_target_id.is_none()
            && self.attachments.is_none()
    }
}

/// Wrap any present value (including `null`) in `Some`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
