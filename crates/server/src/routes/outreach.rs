//! Outreach email handler.

use axum::{Router, extract::State, routing::post};
use serde::Deserialize;

use clients_finder_core::{ClientId, EmailAddress, EmailTemplateId};

use crate::db::{ClientRepository, TemplateRepository};
use crate::error::AppError;
use crate::extract::Json;
use crate::services::{OutgoingEmail, SendOutcome};
use crate::state::AppState;

/// Build the outreach router.
pub fn router() -> Router<AppState> {
    Router::new().route("/api/send-email", post(send_email))
}

/// Body of a send request.
///
/// Either `subject` and `body` are given directly, or `templateId` names a
/// template that is rendered for `clientId`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendEmailRequest {
    pub to: Option<String>,
    pub subject: Option<String>,
    pub body: Option<String>,
    pub client_id: Option<ClientId>,
    pub client_name: Option<String>,
    /// Reply-to address.
    pub client_email: Option<String>,
    #[serde(default)]
    pub use_brevo: bool,
    #[serde(default = "default_update_status")]
    pub update_status: bool,
    pub template_id: Option<EmailTemplateId>,
}

const fn default_update_status() -> bool {
    true
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

fn parse_address(value: &str) -> Result<EmailAddress, AppError> {
    EmailAddress::parse(value)
        .map_err(|_| AppError::BadRequest(format!("Invalid email address: {value}")))
}

impl SendEmailRequest {
    /// Recipient and reply-to, validated.
    fn addresses(&self) -> Result<(EmailAddress, Option<EmailAddress>), AppError> {
        let to = non_blank(self.to.as_deref())
            .ok_or_else(|| AppError::BadRequest("Missing required field: to".to_string()))?;
        let reply_to = non_blank(self.client_email.as_deref())
            .map(parse_address)
            .transpose()?;
        Ok((parse_address(to)?, reply_to))
    }

    /// Build an email from an explicit subject and body.
    fn direct_email(&self) -> Result<OutgoingEmail, AppError> {
        let (to, reply_to) = self.addresses()?;
        let missing =
            || AppError::BadRequest("Missing required fields: to, subject, body".to_string());
        let subject = non_blank(self.subject.as_deref()).ok_or_else(missing)?;
        let body = non_blank(self.body.as_deref()).ok_or_else(missing)?;

        Ok(OutgoingEmail {
            to,
            recipient_name: self.client_name.clone(),
            reply_to,
            subject: subject.to_string(),
            body: body.to_string(),
            attachments: Vec::new(),
        })
    }
}

/// Send an outreach email, optionally logged against a client.
#[tracing::instrument(skip(state, request), fields(client_id = ?request.client_id))]
async fn send_email(
    State(state): State<AppState>,
    Json(request): Json<SendEmailRequest>,
) -> Result<Json<SendOutcome>, AppError> {
    let email = match request.template_id {
        Some(template_id) => template_email(&state, &request, template_id).await?,
        None => request.direct_email()?,
    };

    let outcome = state
        .outreach()
        .send(
            state.pool(),
            &email,
            request.client_id,
            request.use_brevo,
            request.update_status,
        )
        .await?;

    tracing::info!(
        success = outcome.success,
        method = %outcome.method,
        "Outreach email processed"
    );
    Ok(Json(outcome))
}

/// Render a stored template for the request's client.
async fn template_email(
    state: &AppState,
    request: &SendEmailRequest,
    template_id: EmailTemplateId,
) -> Result<OutgoingEmail, AppError> {
    let client_id = request.client_id.ok_or_else(|| {
        AppError::BadRequest("clientId is required when sending a template".to_string())
    })?;
    let (to, reply_to) = request.addresses()?;

    let template = TemplateRepository::new(state.pool())
        .get(template_id)
        .await?
        .ok_or(AppError::NotFound("Template"))?;
    let client = ClientRepository::new(state.pool())
        .get(client_id)
        .await?
        .ok_or(AppError::NotFound("Client"))?;

    let rendered = template.render(&client);
    Ok(OutgoingEmail {
        to,
        recipient_name: request
            .client_name
            .clone()
            .or_else(|| Some(client.name.clone())),
        reply_to,
        subject: rendered.subject,
        body: rendered.body,
        attachments: rendered.attachments,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn request(json: serde_json::Value) -> SendEmailRequest {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn test_defaults() {
        let req = request(serde_json::json!({
            "to": "owner@himalayanjava.com.np",
            "subject": "Hello",
            "body": "Namaste"
        }));
        assert!(req.update_status);
        assert!(!req.use_brevo);
        assert!(req.client_id.is_none());
    }

    #[test]
    fn test_direct_email_requires_fields() {
        let req = request(serde_json::json!({ "to": "owner@example.com", "body": "Hi" }));
        assert!(matches!(req.direct_email(), Err(AppError::BadRequest(_))));

        let req = request(serde_json::json!({ "subject": "Hi", "body": "Hi" }));
        assert!(matches!(req.direct_email(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_direct_email_rejects_invalid_addresses() {
        let req = request(serde_json::json!({
            "to": "not-an-address",
            "subject": "Hi",
            "body": "Hi"
        }));
        assert!(matches!(req.direct_email(), Err(AppError::BadRequest(_))));

        let req = request(serde_json::json!({
            "to": "owner@example.com",
            "clientEmail": "nope",
            "subject": "Hi",
            "body": "Hi"
        }));
        assert!(matches!(req.direct_email(), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn test_direct_email_builds_message() {
        let req = request(serde_json::json!({
            "to": " owner@example.com ",
            "clientName": "Himalayan Java",
            "clientEmail": "sales@agency.example",
            "subject": "A website for you",
            "body": "Line one\nLine two",
            "clientId": 12,
            "updateStatus": false
        }));
        let email = req.direct_email().unwrap();
        assert_eq!(email.to.as_str(), "owner@example.com");
        assert_eq!(
            email.reply_to.as_ref().map(EmailAddress::as_str),
            Some("sales@agency.example")
        );
        assert_eq!(email.recipient_name.as_deref(), Some("Himalayan Java"));
        assert!(email.attachments.is_empty());
        assert!(!req.update_status);
    }
}
