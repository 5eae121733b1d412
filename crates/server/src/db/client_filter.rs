//! Dynamic `WHERE` clause for client listings.
//!
//! Every optional query parameter becomes one predicate; predicates are
//! joined with `AND`, so each additional filter can only narrow the result.
//! Free-text search splits on whitespace and requires every word to appear in
//! at least one searchable column.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use clients_finder_core::ClientStatus;

/// Columns matched by free-text search.
const SEARCH_COLUMNS: [&str; 7] = [
    "name", "category", "address", "city", "email", "phone", "website",
];

/// Raw client filter parameters as they arrive in the query string.
///
/// Every field is a string so that `all`, blanks and typos are ignored rather
/// than rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientQuery {
    pub status: Option<String>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub has_website: Option<String>,
    pub has_phone: Option<String>,
    pub has_email: Option<String>,
    pub search: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// Parsed client filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientFilter {
    pub status: Option<ClientStatus>,
    pub category: Option<String>,
    pub city: Option<String>,
    pub has_website: Option<bool>,
    pub has_phone: Option<bool>,
    pub has_email: Option<bool>,
    pub search_words: Vec<String>,
}

impl From<&ClientQuery> for ClientFilter {
    fn from(query: &ClientQuery) -> Self {
        Self {
            status: query.status.as_deref().and_then(ClientStatus::from_filter),
            category: non_blank(query.category.as_deref()),
            city: non_blank(query.city.as_deref()),
            has_website: tri_state(query.has_website.as_deref()),
            has_phone: tri_state(query.has_phone.as_deref()),
            has_email: tri_state(query.has_email.as_deref()),
            search_words: query
                .search
                .as_deref()
                .unwrap_or_default()
                .split_whitespace()
                .map(String::from)
                .collect(),
        }
    }
}

/// Tracks whether `WHERE` has been emitted yet.
#[derive(Debug, Default)]
pub struct Conditions {
    started: bool,
}

impl Conditions {
    /// Push the keyword that introduces the next predicate.
    pub fn next(&mut self, qb: &mut QueryBuilder<'_, Postgres>) {
        qb.push(if self.started { " AND " } else { " WHERE " });
        self.started = true;
    }
}

impl ClientFilter {
    /// Append this filter's predicates to `qb`.
    ///
    /// Returns the [`Conditions`] state so callers can append further
    /// predicates (e.g. a cursor) to the same clause.
    pub fn push_where(&self, qb: &mut QueryBuilder<'_, Postgres>) -> Conditions {
        let mut conds = Conditions::default();

        if let Some(status) = self.status {
            conds.next(qb);
            qb.push("status = ").push_bind(status);
        }
        if let Some(category) = &self.category {
            conds.next(qb);
            qb.push("category ILIKE ").push_bind(contains_pattern(category));
        }
        if let Some(city) = &self.city {
            conds.next(qb);
            qb.push("city ILIKE ").push_bind(contains_pattern(city));
        }
        for (column, wanted) in [
            ("website", self.has_website),
            ("phone", self.has_phone),
            ("email", self.has_email),
        ] {
            if let Some(present) = wanted {
                conds.next(qb);
                qb.push(presence_predicate(column, present));
            }
        }
        for word in &self.search_words {
            conds.next(qb);
            let pattern = contains_pattern(word);
            qb.push("(");
            for (i, column) in SEARCH_COLUMNS.iter().enumerate() {
                if i > 0 {
                    qb.push(" OR ");
                }
                qb.push(*column)
                    .push(" ILIKE ")
                    .push_bind(pattern.clone());
            }
            qb.push(")");
        }

        conds
    }
}

fn presence_predicate(column: &str, present: bool) -> String {
    if present {
        format!("({column} IS NOT NULL AND {column} <> '')")
    } else {
        format!("({column} IS NULL OR {column} = '')")
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

fn tri_state(value: Option<&str>) -> Option<bool> {
    match value.map(|v| v.trim().to_ascii_lowercase()).as_deref() {
        Some("true") => Some(true),
        Some("false") => Some(false),
        _ => None,
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
#[must_use]
pub fn escape_like(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '\\' | '%' | '_') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

fn contains_pattern(input: &str) -> String {
    format!("%{}%", escape_like(input))
}
