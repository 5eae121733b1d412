//! `{{PLACEHOLDER}}` substitution for email templates.
//!
//! Templates reference client fields with double-brace tokens such as
//! `{{CLIENT_NAME}}`. Rendering replaces every known token with the value
//! supplied by a [`PlaceholderSource`]; a missing optional value renders as
//! an empty string. Unknown tokens and unterminated braces are copied through
//! untouched.

use serde::Serialize;

/// A client field that templates may reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Placeholder {
    ClientName,
    ClientAddress,
    ClientEmail,
    ClientPhone,
    ClientWebsite,
    ClientCity,
    ClientState,
}

impl Placeholder {
    pub const ALL: [Self; 7] = [
        Self::ClientName,
        Self::ClientAddress,
        Self::ClientEmail,
        Self::ClientPhone,
        Self::ClientWebsite,
        Self::ClientCity,
        Self::ClientState,
    ];

    /// Name written between the braces.
    #[must_use]
    pub const fn key(&self) -> &'static str {
        match self {
            Self::ClientName => "CLIENT_NAME",
            Self::ClientAddress => "CLIENT_ADDRESS",
            Self::ClientEmail => "CLIENT_EMAIL",
            Self::ClientPhone => "CLIENT_PHONE",
            Self::ClientWebsite => "CLIENT_WEBSITE",
            Self::ClientCity => "CLIENT_CITY",
            Self::ClientState => "CLIENT_STATE",
        }
    }

    /// Look up a placeholder by the name written between the braces.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.key() == key)
    }
}

/// Supplies values for placeholders.
pub trait PlaceholderSource {
    /// Value for `placeholder`, or `None` when the field is not set.
    fn placeholder_value(&self, placeholder: Placeholder) -> Option<&str>;
}

impl<T: PlaceholderSource + ?Sized> PlaceholderSource for &T {
    fn placeholder_value(&self, placeholder: Placeholder) -> Option<&str> {
        (**self).placeholder_value(placeholder)
    }
}

/// Substitute every known `{{TOKEN}}` in `text`.
///
/// Whitespace inside the braces is ignored, so `{{ CLIENT_NAME }}` works too.
///
/// ```
/// use clients_finder_core::{Placeholder, PlaceholderSource, render_placeholders};
///
/// struct Cafe;
/// impl PlaceholderSource for Cafe {
///     fn placeholder_value(&self, p: Placeholder) -> Option<&str> {
///         match p {
///             Placeholder::ClientName => Some("Himalayan Java"),
///             _ => None,
///         }
///     }
/// }
///
/// let out = render_placeholders("Hi {{CLIENT_NAME}} ({{CLIENT_PHONE}}) {{OTHER}}", &Cafe);
/// assert_eq!(out, "Hi Himalayan Java () {{OTHER}}");
/// ```
pub fn render_placeholders<S: PlaceholderSource + ?Sized>(text: &str, source: &S) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;

    while let Some(open) = rest.find("{{") {
        let (before, after_open) = rest.split_at(open);
        out.push_str(before);

        let inner_start = after_open.get(2..).unwrap_or_default();
        let Some(close) = inner_start.find("}}") else {
            out.push_str(after_open);
            return out;
        };

        let (inner, after_close) = inner_start.split_at(close);
        match Placeholder::from_key(inner.trim()) {
            Some(placeholder) => {
                out.push_str(source.placeholder_value(placeholder).unwrap_or_default());
            }
            None => {
                out.push_str("{{");
                out.push_str(inner);
                out.push_str("}}");
            }
        }
        rest = after_close.get(2..).unwrap_or_default();
    }

    out.push_str(rest);
    out
}
