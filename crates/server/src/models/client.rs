//! Client (business lead) domain types.

use chrono::{DateTime, Utc};
use serde::Serialize;

use clients_finder_core::{ClientId, ClientStatus, Placeholder, PlaceholderSource};

/// A discovered business tracked through the sales lifecycle.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Client {
    pub id: ClientId,
    /// Places-provider identifier; unique across the table.
    pub place_id: String,
    pub name: String,
    pub category: Option<String>,
    /// Full formatted address.
    pub address: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub status: ClientStatus,
    /// JSON-encoded opening hours as delivered by the provider.
    pub opening_hours: Option<String>,
    /// JSON-encoded facilities as delivered by the provider.
    pub facilities: Option<String>,
    /// Upstream data source name (e.g. "openstreetmap").
    pub datasource: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Client {
    /// Whether the client has a non-blank website.
    #[must_use]
    pub fn has_website(&self) -> bool {
        non_blank(self.website.as_deref()).is_some()
    }
}

impl PlaceholderSource for Client {
    fn placeholder_value(&self, placeholder: Placeholder) -> Option<&str> {
        match placeholder {
            Placeholder::ClientName => Some(&self.name),
            Placeholder::ClientAddress => Some(&self.address),
            Placeholder::ClientEmail => non_blank(self.email.as_deref()),
            Placeholder::ClientPhone => non_blank(self.phone.as_deref()),
            Placeholder::ClientWebsite => non_blank(self.website.as_deref()),
            Placeholder::ClientCity => non_blank(self.city.as_deref()),
            Placeholder::ClientState => non_blank(self.state.as_deref()),
        }
    }
}

/// Fields for inserting a newly discovered client.
///
/// Status always starts as [`ClientStatus::Pending`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewClient {
    pub place_id: String,
    pub name: String,
    pub category: Option<String>,
    pub address: String,
    pub street: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub postcode: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub website: Option<String>,
    pub latitude: f64,
    pub longitude: f64,
    pub opening_hours: Option<String>,
    pub facilities: Option<String>,
    pub datasource: Option<String>,
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
pub(crate) mod tests {
    use clients_finder_core::render_placeholders;

    use super::*;

    pub(crate) fn sample_client() -> Client {
        let now = Utc::now();
        Client {
            id: ClientId::new(1),
            place_id: "51a8f3".to_string(),
            name: "Himalayan Java".to_string(),
            category: Some("catering.cafe".to_string()),
            address: "Thamel Marg, Kathmandu 44600, Nepal".to_string(),
            street: Some("Thamel Marg".to_string()),
            city: Some("Kathmandu".to_string()),
            state: Some("Bagmati Province".to_string()),
            postcode: Some("44600".to_string()),
            country: Some("Nepal".to_string()),
            country_code: Some("np".to_string()),
            phone: Some("+977 1-4422519".to_string()),
            email: None,
            website: Some(String::new()),
            latitude: 27.7154,
            longitude: 85.3123,
            status: ClientStatus::Pending,
            opening_hours: None,
            facilities: None,
            datasource: Some("openstreetmap".to_string()),
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_blank_website_counts_as_missing() {
        let mut client = sample_client();
        assert!(!client.has_website());
        client.website = Some("https://himalayanjava.com".to_string());
        assert!(client.has_website());
    }

    #[test]
    fn test_client_renders_placeholders() {
        let client = sample_client();
        let out = render_placeholders(
            "{{CLIENT_NAME}} in {{CLIENT_CITY}}, {{CLIENT_STATE}} / {{CLIENT_EMAIL}}",
            &client,
        );
        assert_eq!(out, "Himalayan Java in Kathmandu, Bagmati Province / ");
    }

    #[test]
    fn test_client_serializes_camel_case() {
        let json = serde_json::to_value(sample_client()).unwrap_or_default();
        assert_eq!(json["placeId"], "51a8f3");
        assert_eq!(json["countryCode"], "np");
        assert_eq!(json["status"], "PENDING");
    }
}
