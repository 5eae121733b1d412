//! Email address type for outreach recipients.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing an [`EmailAddress`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum EmailAddressError {
    #[error("email address cannot be empty")]
    Empty,
    #[error("email address must be at most {max} characters")]
    TooLong { max: usize },
    #[error("email address must contain exactly one @ symbol")]
    AtSymbol,
    #[error("email address cannot contain whitespace")]
    Whitespace,
    #[error("email address local part cannot be empty")]
    EmptyLocalPart,
    #[error("email address domain must contain a dot")]
    InvalidDomain,
}

/// A syntactically plausible email address.
///
/// Scraped contact fields are messy, so parsing trims surrounding whitespace
/// before validating. Deliverability is left to the transport.
///
/// ```
/// use clients_finder_core::EmailAddress;
///
/// let addr = EmailAddress::parse("  info@cafe.com.np ").unwrap();
/// assert_eq!(addr.as_str(), "info@cafe.com.np");
/// assert_eq!(addr.domain(), "cafe.com.np");
///
/// assert!(EmailAddress::parse("no-at-symbol").is_err());
/// assert!(EmailAddress::parse("user@localhost").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Maximum length of an address (RFC 5321).
    pub const MAX_LENGTH: usize = 254;

    /// Parse and validate an address.
    ///
    /// # Errors
    ///
    /// Returns an [`EmailAddressError`] describing the first failed check.
    pub fn parse(s: &str) -> Result<Self, EmailAddressError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(EmailAddressError::Empty);
        }
        if s.len() > Self::MAX_LENGTH {
            return Err(EmailAddressError::TooLong {
                max: Self::MAX_LENGTH,
            });
        }
        if s.chars().any(char::is_whitespace) {
            return Err(EmailAddressError::Whitespace);
        }

        let (local, domain) = s.split_once('@').ok_or(EmailAddressError::AtSymbol)?;
        if domain.contains('@') {
            return Err(EmailAddressError::AtSymbol);
        }
        if local.is_empty() {
            return Err(EmailAddressError::EmptyLocalPart);
        }
        if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
            return Err(EmailAddressError::InvalidDomain);
        }

        Ok(Self(s.to_owned()))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }

    /// Part after the `@`.
    #[must_use]
    pub fn domain(&self) -> &str {
        self.0.split_once('@').map_or("", |(_, domain)| domain)
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for EmailAddress {
    type Err = EmailAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = EmailAddressError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl AsRef<str> for EmailAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
