//! Lifecycle and classification enums.
//!
//! All of these are stored as `PostgreSQL` enum types and travel over the API
//! in `SCREAMING_SNAKE_CASE`, matching the database labels.

use serde::{Deserialize, Serialize};

/// Sales lifecycle of a client.
///
/// Every ingested client starts as [`ClientStatus::Pending`]. A successful
/// outreach email moves it to [`ClientStatus::Contacted`]; the remaining
/// transitions are made by hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "client_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClientStatus {
    #[default]
    Pending,
    Lead,
    Rejected,
    Contacted,
    Closed,
}

impl ClientStatus {
    /// All statuses, in lifecycle order.
    pub const ALL: [Self; 5] = [
        Self::Pending,
        Self::Lead,
        Self::Rejected,
        Self::Contacted,
        Self::Closed,
    ];

    /// Database / wire label.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "PENDING",
            Self::Lead => "LEAD",
            Self::Rejected => "REJECTED",
            Self::Contacted => "CONTACTED",
            Self::Closed => "CLOSED",
        }
    }

    /// Interpret a query-string status filter.
    ///
    /// `all`, blank and unrecognised values mean "no status filter".
    #[must_use]
    pub fn from_filter(value: &str) -> Option<Self> {
        value.parse().ok()
    }

    /// Status after an outreach email was delivered.
    ///
    /// Only pending clients move; anything already triaged keeps its status.
    #[must_use]
    pub const fn after_outreach(self) -> Self {
        match self {
            Self::Pending => Self::Contacted,
            other => other,
        }
    }
}

impl std::fmt::Display for ClientStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ClientStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == upper)
            .ok_or_else(|| {
                format!(
                    "invalid status '{s}'. Must be one of: PENDING, LEAD, REJECTED, CONTACTED, CLOSED"
                )
            })
    }
}

/// Audience an email template is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "template_target_type", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TemplateTargetType {
    /// Any client.
    #[default]
    All,
    /// Clients that already have a website.
    HasWebsite,
    /// Clients without a website.
    NoWebsite,
}

impl TemplateTargetType {
    /// Whether a template with this target applies to a client.
    #[must_use]
    pub const fn applies_to(self, client_has_website: bool) -> bool {
        match self {
            Self::All => true,
            Self::HasWebsite => client_has_website,
            Self::NoWebsite => !client_has_website,
        }
    }
}

impl std::str::FromStr for TemplateTargetType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "ALL" => Ok(Self::All),
            "HAS_WEBSITE" => Ok(Self::HasWebsite),
            "NO_WEBSITE" => Ok(Self::NoWebsite),
            _ => Err(format!(
                "invalid target type '{s}'. Must be: ALL, HAS_WEBSITE, or NO_WEBSITE"
            )),
        }
    }
}

/// Transport used for an outreach email.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "email_method", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EmailMethod {
    Smtp,
    Brevo,
}

impl std::fmt::Display for EmailMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Smtp => write!(f, "SMTP"),
            Self::Brevo => write!(f, "BREVO"),
        }
    }
}

/// Outcome of a single send attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "email_delivery_status", rename_all = "SCREAMING_SNAKE_CASE")
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DeliveryStatus {
    Sent,
    Failed,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_client_status_parse_is_case_insensitive() {
        assert_eq!("lead".parse::<ClientStatus>().unwrap(), ClientStatus::Lead);
        assert_eq!(
            " CONTACTED ".parse::<ClientStatus>().unwrap(),
            ClientStatus::Contacted
        );
        assert!("archived".parse::<ClientStatus>().is_err());
    }

    #[test]
    fn test_client_status_filter_ignores_all() {
        assert_eq!(ClientStatus::from_filter("all"), None);
        assert_eq!(ClientStatus::from_filter(""), None);
        assert_eq!(
            ClientStatus::from_filter("REJECTED"),
            Some(ClientStatus::Rejected)
        );
    }

    #[test]
    fn test_after_outreach_only_moves_pending() {
        assert_eq!(
            ClientStatus::Pending.after_outreach(),
            ClientStatus::Contacted
        );
        assert_eq!(ClientStatus::Lead.after_outreach(), ClientStatus::Lead);
        assert_eq!(ClientStatus::Closed.after_outreach(), ClientStatus::Closed);
    }

    #[test]
    fn test_client_status_wire_format() {
        assert_eq!(
            serde_json::to_string(&ClientStatus::Contacted).unwrap(),
            "\"CONTACTED\""
        );
        let status: ClientStatus = serde_json::from_str("\"PENDING\"").unwrap();
        assert_eq!(status, ClientStatus::Pending);
    }

    #[test]
    fn test_target_type_applicability() {
        assert!(TemplateTargetType::All.applies_to(true));
        assert!(TemplateTargetType::All.applies_to(false));
        assert!(TemplateTargetType::HasWebsite.applies_to(true));
        assert!(!TemplateTargetType::HasWebsite.applies_to(false));
        assert!(TemplateTargetType::NoWebsite.applies_to(false));
        assert!(!TemplateTargetType::NoWebsite.applies_to(true));
    }

    #[test]
    fn test_target_type_wire_format() {
        assert_eq!(
            serde_json::to_string(&TemplateTargetType::HasWebsite).unwrap(),
            "\"HAS_WEBSITE\""
        );
        assert_eq!(
            "no_website".parse::<TemplateTargetType>().unwrap(),
            TemplateTargetType::NoWebsite
        );
    }
}
