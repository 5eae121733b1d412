//! Outreach email delivery via SMTP or the Brevo transactional API.
//!
//! A send attempt tied to a client is always written to the email history,
//! whichever way it ends. A successful send also moves a `PENDING` client
//! to `CONTACTED` unless the caller opts out.

use std::sync::Arc;

use askama::Template;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{Attachment, Mailbox, MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use thiserror::Error;
use tracing::{info, instrument, warn};

use clients_finder_core::{ClientId, ClientStatus, DeliveryStatus, EmailAddress, EmailMethod};

use crate::config::{AppConfig, BrevoConfig, SmtpConfig};
use crate::db::{ClientRepository, EmailHistoryRepository, RepositoryError};
use crate::models::NewEmailHistory;

const BREVO_SEND_URL: &str = "https://api.brevo.com/v3/smtp/email";
const DEFAULT_RECIPIENT_NAME: &str = "Recipient";

/// HTML shell that keeps the plain-text body's line breaks.
#[derive(Template)]
#[template(path = "email/outreach.html")]
struct OutreachEmailHtml<'a> {
    body: &'a str,
}

/// Errors that can occur when sending outreach email.
#[derive(Debug, Error)]
pub enum OutreachError {
    /// The selected transport has no configuration.
    #[error("{0} is not configured")]
    NotConfigured(EmailMethod),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),

    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Brevo rejected the request.
    #[error("Brevo API error: {status} - {message}")]
    Brevo { status: u16, message: String },

    /// An attachment could not be fetched.
    #[error("Failed to fetch attachment {url}: {reason}")]
    Attachment { url: String, reason: String },

    /// History or status update failed.
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// A fully resolved outgoing email.
#[derive(Debug, Clone)]
pub struct OutgoingEmail {
    pub to: EmailAddress,
    pub recipient_name: Option<String>,
    /// Where replies go; defaults to the sender.
    pub reply_to: Option<EmailAddress>,
    pub subject: String,
    pub body: String,
    /// Public attachment URLs.
    pub attachments: Vec<String>,
}

/// Transport result of a successful send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub method: EmailMethod,
    pub message_id: Option<String>,
}

/// Outcome of a send attempt as reported to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendOutcome {
    pub success: bool,
    pub method: EmailMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// The client's new status, when the send moved it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_status: Option<ClientStatus>,
}

// =============================================================================
// SMTP
// =============================================================================

/// SMTP mailer.
#[derive(Clone)]
pub struct SmtpMailer {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from_address: Mailbox,
    http: reqwest::Client,
}

impl SmtpMailer {
    /// Create a mailer from configuration.
    ///
    /// Uses implicit TLS when `secure` is set and STARTTLS otherwise.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured or the sender address
    /// is invalid.
    pub fn new(config: &SmtpConfig, http: reqwest::Client) -> Result<Self, OutreachError> {
        let credentials = Credentials::new(
            config.username.clone(),
            config.password.expose_secret().to_string(),
        );

        let builder = if config.secure {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.host)?
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
        };
        let mailer = builder
            .port(config.port)
            .credentials(credentials)
            .build();

        let from_address = config
            .from_address
            .parse()
            .map_err(|_| OutreachError::InvalidAddress(config.from_address.clone()))?;

        Ok(Self {
            mailer,
            from_address,
            http,
        })
    }

    /// Send an HTML email, downloading and attaching any attachments.
    ///
    /// # Errors
    ///
    /// Returns error if an attachment cannot be fetched, the message cannot be
    /// built, or the relay rejects it.
    #[instrument(skip(self, email), fields(to = %email.to))]
    pub async fn send(&self, email: &OutgoingEmail) -> Result<Delivery, OutreachError> {
        let html = SinglePart::builder()
            .header(ContentType::TEXT_HTML)
            .body(email.body.clone());

        let mut builder = Message::builder()
            .from(self.from_address.clone())
            .to(mailbox(&email.to, email.recipient_name.as_deref())?)
            .subject(email.subject.as_str());
        if let Some(reply_to) = &email.reply_to {
            builder = builder.reply_to(mailbox(reply_to, None)?);
        }

        let message = if email.attachments.is_empty() {
            builder.singlepart(html)?
        } else {
            let mut parts = MultiPart::mixed().singlepart(html);
            for url in &email.attachments {
                parts = parts.singlepart(self.fetch_attachment(url).await?);
            }
            builder.multipart(parts)?
        };

        let message_id = message
            .headers()
            .get_raw("Message-ID")
            .map(ToString::to_string);

        self.mailer.send(message).await?;

        info!(subject = %email.subject, "Email sent via SMTP");
        Ok(Delivery {
            method: EmailMethod::Smtp,
            message_id,
        })
    }

    async fn fetch_attachment(&self, url: &str) -> Result<SinglePart, OutreachError> {
        let attachment_error = |reason: String| OutreachError::Attachment {
            url: url.to_string(),
            reason,
        };

        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| attachment_error(e.to_string()))?;
        if !response.status().is_success() {
            return Err(attachment_error(format!("status {}", response.status())));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| ContentType::parse(v).ok())
            .unwrap_or_else(octet_stream);
        let bytes = response
            .bytes()
            .await
            .map_err(|e| attachment_error(e.to_string()))?;

        Ok(Attachment::new(attachment_filename(url)).body(bytes.to_vec(), content_type))
    }
}

fn octet_stream() -> ContentType {
    ContentType::parse("application/octet-stream").unwrap_or(ContentType::TEXT_PLAIN)
}

fn mailbox(address: &EmailAddress, name: Option<&str>) -> Result<Mailbox, OutreachError> {
    let parsed = address
        .as_str()
        .parse()
        .map_err(|_| OutreachError::InvalidAddress(address.to_string()))?;
    Ok(Mailbox::new(name.map(String::from), parsed))
}

/// File name for an attachment: the last path segment of its URL.
fn attachment_filename(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|u| {
            u.path_segments()
                .and_then(|mut segments| segments.next_back().map(String::from))
        })
        .filter(|name| !name.is_empty())
        .map(|name| {
            urlencoding::decode(&name)
                .map(std::borrow::Cow::into_owned)
                .unwrap_or(name)
        })
        .unwrap_or_else(|| "attachment".to_string())
}

// =============================================================================
// Brevo
// =============================================================================

/// Brevo transactional email client.
#[derive(Clone)]
pub struct BrevoClient {
    inner: Arc<BrevoClientInner>,
}

struct BrevoClientInner {
    client: reqwest::Client,
    api_key: SecretString,
    sender_email: String,
    sender_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BrevoEmail<'a> {
    sender: BrevoContact<'a>,
    to: [BrevoContact<'a>; 1],
    subject: &'a str,
    html_content: String,
    reply_to: BrevoContact<'a>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    attachment: Vec<BrevoAttachment<'a>>,
}

#[derive(Debug, Serialize)]
struct BrevoContact<'a> {
    email: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct BrevoAttachment<'a> {
    url: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BrevoResponse {
    message_id: Option<String>,
}

impl BrevoClient {
    /// Create a Brevo client.
    #[must_use]
    pub fn new(config: &BrevoConfig, client: reqwest::Client) -> Self {
        Self {
            inner: Arc::new(BrevoClientInner {
                client,
                api_key: config.api_key.clone(),
                sender_email: config.sender_email.clone(),
                sender_name: config.sender_name.clone(),
            }),
        }
    }

    /// Send an email; attachments are passed by URL.
    ///
    /// # Errors
    ///
    /// Returns error on transport failure or a non-success response.
    #[instrument(skip(self, email), fields(to = %email.to))]
    pub async fn send(&self, email: &OutgoingEmail) -> Result<Delivery, OutreachError> {
        let payload = brevo_payload(email, &self.inner.sender_email, &self.inner.sender_name)?;

        let response = self
            .inner
            .client
            .post(BREVO_SEND_URL)
            .header("api-key", self.inner.api_key.expose_secret())
            .header(reqwest::header::ACCEPT, "application/json")
            .json(&payload)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(OutreachError::Brevo {
                status: status.as_u16(),
                message,
            });
        }

        let body: BrevoResponse = response.json().await?;
        info!(subject = %email.subject, "Email sent via Brevo");
        Ok(Delivery {
            method: EmailMethod::Brevo,
            message_id: body.message_id,
        })
    }
}

fn brevo_payload<'a>(
    email: &'a OutgoingEmail,
    sender_email: &'a str,
    sender_name: &'a str,
) -> Result<BrevoEmail<'a>, askama::Error> {
    let html_content = OutreachEmailHtml { body: &email.body }.render()?;
    let reply_to = email
        .reply_to
        .as_ref()
        .map_or(sender_email, EmailAddress::as_str);

    Ok(BrevoEmail {
        sender: BrevoContact {
            email: sender_email,
            name: Some(sender_name),
        },
        to: [BrevoContact {
            email: email.to.as_str(),
            name: Some(
                email
                    .recipient_name
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
                    .unwrap_or(DEFAULT_RECIPIENT_NAME),
            ),
        }],
        subject: &email.subject,
        html_content,
        reply_to: BrevoContact {
            email: reply_to,
            name: None,
        },
        attachment: email
            .attachments
            .iter()
            .map(|url| BrevoAttachment { url })
            .collect(),
    })
}

// =============================================================================
// Outreach service
// =============================================================================

/// Routes sends to the configured transport and records the outcome.
#[derive(Clone, Default)]
pub struct OutreachService {
    smtp: Option<SmtpMailer>,
    brevo: Option<BrevoClient>,
}

impl OutreachService {
    /// Build the transports present in configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the SMTP relay cannot be configured or the HTTP client
    /// fails to build.
    pub fn from_config(config: &AppConfig) -> Result<Self, OutreachError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()?;

        let smtp = config
            .smtp
            .as_ref()
            .map(|c| SmtpMailer::new(c, http.clone()))
            .transpose()?;
        let brevo = config.brevo.as_ref().map(|c| BrevoClient::new(c, http));

        Ok(Self { smtp, brevo })
    }

    /// Brevo when requested and configured, SMTP otherwise.
    #[must_use]
    pub const fn select_method(&self, use_brevo: bool) -> EmailMethod {
        if use_brevo && self.brevo.is_some() {
            EmailMethod::Brevo
        } else {
            EmailMethod::Smtp
        }
    }

    /// Send through the selected transport.
    ///
    /// # Errors
    ///
    /// Returns `OutreachError::NotConfigured` if the transport is missing, or
    /// the transport's error.
    pub async fn deliver(
        &self,
        email: &OutgoingEmail,
        method: EmailMethod,
    ) -> Result<Delivery, OutreachError> {
        match method {
            EmailMethod::Brevo => match &self.brevo {
                Some(brevo) => brevo.send(email).await,
                None => Err(OutreachError::NotConfigured(method)),
            },
            EmailMethod::Smtp => match &self.smtp {
                Some(smtp) => smtp.send(email).await,
                None => Err(OutreachError::NotConfigured(method)),
            },
        }
    }

    /// Send an email and, for a known client, log the attempt.
    ///
    /// Without a `client_id` a failed send is returned as an error. With one,
    /// the failure is recorded and reported in the outcome instead.
    ///
    /// # Errors
    ///
    /// Returns the transport error when no client is involved.
    #[instrument(skip(self, pool, email), fields(to = %email.to))]
    pub async fn send(
        &self,
        pool: &PgPool,
        email: &OutgoingEmail,
        client_id: Option<ClientId>,
        use_brevo: bool,
        update_status: bool,
    ) -> Result<SendOutcome, OutreachError> {
        let method = self.select_method(use_brevo);
        let result = self.deliver(email, method).await;

        let Some(client_id) = client_id else {
            let delivery = result?;
            return Ok(SendOutcome {
                success: true,
                method,
                message_id: delivery.message_id,
                error: None,
                new_status: None,
            });
        };

        let (outcome, entry_status, error_message) = match result {
            Ok(delivery) => (
                SendOutcome {
                    success: true,
                    method,
                    message_id: delivery.message_id,
                    error: None,
                    new_status: None,
                },
                DeliveryStatus::Sent,
                None,
            ),
            Err(e) => {
                warn!(error = %e, "Outreach send failed");
                (
                    SendOutcome {
                        success: false,
                        method,
                        message_id: None,
                        error: Some(e.to_string()),
                        new_status: None,
                    },
                    DeliveryStatus::Failed,
                    Some(e.to_string()),
                )
            }
        };

        let entry = NewEmailHistory {
            client_id,
            recipient: email.to.to_string(),
            subject: email.subject.clone(),
            body: email.body.clone(),
            method,
            status: entry_status,
            error_message,
            message_id: outcome.message_id.clone(),
        };
        if let Err(e) = EmailHistoryRepository::new(pool).record(&entry).await {
            warn!(error = %e, "Failed to record email history");
        }

        if !outcome.success || !update_status {
            return Ok(outcome);
        }

        match ClientRepository::new(pool)
            .advance_after_outreach(client_id)
            .await
        {
            Ok(new_status) => Ok(SendOutcome {
                new_status,
                ..outcome
            }),
            Err(e) => {
                warn!(error = %e, "Failed to update client status after send");
                Ok(outcome)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn email() -> OutgoingEmail {
        OutgoingEmail {
            to: EmailAddress::parse("owner@himalayanjava.com").unwrap(),
            recipient_name: None,
            reply_to: None,
            subject: "Hello Himalayan Java".to_string(),
            body: "Namaste,\n\nWe build websites.".to_string(),
            attachments: vec![],
        }
    }

    fn brevo_service() -> OutreachService {
        OutreachService {
            smtp: None,
            brevo: Some(BrevoClient::new(
                &BrevoConfig {
                    api_key: SecretString::from("xkeysib-test".to_string()),
                    sender_email: "sales@agency.com.np".to_string(),
                    sender_name: "Clients Finder".to_string(),
                },
                reqwest::Client::new(),
            )),
        }
    }

    #[test]
    fn test_select_method() {
        let none = OutreachService::default();
        assert_eq!(none.select_method(true), EmailMethod::Smtp);

        let brevo = brevo_service();
        assert_eq!(brevo.select_method(true), EmailMethod::Brevo);
        assert_eq!(brevo.select_method(false), EmailMethod::Smtp);
    }

    #[tokio::test]
    async fn test_missing_transport_fails() {
        let service = brevo_service();
        let err = service
            .deliver(&email(), EmailMethod::Smtp)
            .await
            .unwrap_err();
        assert!(matches!(err, OutreachError::NotConfigured(EmailMethod::Smtp)));
        assert_eq!(err.to_string(), "SMTP is not configured");
    }

    #[test]
    fn test_brevo_payload_defaults() {
        let email = email();
        let payload = brevo_payload(&email, "sales@agency.com.np", "Clients Finder").unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["sender"]["email"], "sales@agency.com.np");
        assert_eq!(json["sender"]["name"], "Clients Finder");
        assert_eq!(json["to"][0]["email"], "owner@himalayanjava.com");
        assert_eq!(json["to"][0]["name"], "Recipient");
        assert_eq!(json["replyTo"]["email"], "sales@agency.com.np");
        assert!(json.get("attachment").is_none());

        let html = json["htmlContent"].as_str().unwrap();
        assert!(html.contains("white-space: pre-wrap"));
        assert!(html.contains("Namaste,\n\nWe build websites."));
    }

    #[test]
    fn test_brevo_payload_with_reply_to_and_attachments() {
        let mut email = email();
        email.recipient_name = Some("Himalayan Java".to_string());
        email.reply_to = Some(EmailAddress::parse("info@himalayanjava.com").unwrap());
        email.attachments = vec!["https://cdn.example.com/brochure.pdf".to_string()];

        let payload = brevo_payload(&email, "sales@agency.com.np", "Agency").unwrap();
        let json = serde_json::to_value(&payload).unwrap();

        assert_eq!(json["to"][0]["name"], "Himalayan Java");
        assert_eq!(json["replyTo"]["email"], "info@himalayanjava.com");
        assert_eq!(
            json["attachment"][0]["url"],
            "https://cdn.example.com/brochure.pdf"
        );
    }

    #[test]
    fn test_attachment_filename() {
        assert_eq!(
            attachment_filename("https://cdn.example.com/t/1718000000000-price%20list.pdf"),
            "1718000000000-price list.pdf"
        );
        assert_eq!(attachment_filename("https://cdn.example.com/"), "attachment");
        assert_eq!(attachment_filename("not a url"), "attachment");
    }

    #[test]
    fn test_send_outcome_json() {
        let outcome = SendOutcome {
            success: false,
            method: EmailMethod::Brevo,
            message_id: None,
            error: Some("Brevo API error: 401 - unauthorized".to_string()),
            new_status: None,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["method"], "BREVO");
        assert!(json.get("messageId").is_none());
        assert!(json["error"].as_str().unwrap().contains("401"));
    }
}
