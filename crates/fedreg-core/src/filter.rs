//! Sparse search predicates for a single query.
//!
//! A [`SearchFilter`] is built fresh for every search and discarded once the
//! store answers. Its serialized form is the filter map handed to stores and
//! tools: unset predicates are left out entirely, while `limit` and `offset`
//! are always present.

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

/// Page size used when the caller does not pick one.
pub const DEFAULT_LIMIT: i64 = 10;

/// Structured search options with one optional field per supported predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    /// Matched against title and abstract.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,
    /// Inclusive lower bound on the publication date.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_from: Option<NaiveDate>,
    /// Inclusive upper bound on the publication date.
    #[serde(
        default,
        deserialize_with = "blank_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub date_to: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agency: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topic: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub presidential_doc_type: Option<String>,
    /// Executive order number, matched exactly.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executive_order: Option<String>,
    #[serde(default = "default_limit")]
    pub limit: i64,
    #[serde(default)]
    pub offset: i64,
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

/// `YYYY-MM-DD`, with `null` and blank strings read as unset.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => NaiveDate::parse_from_str(value, "%Y-%m-%d")
            .map(Some)
            .map_err(serde::de::Error::custom),
    }
}

impl Default for SearchFilter {
    fn default() -> Self {
        Self {
            keywords: None,
            date_from: None,
            date_to: None,
            document_type: None,
            agency: None,
            topic: None,
            presidential_doc_type: None,
            executive_order: None,
            limit: DEFAULT_LIMIT,
            offset: 0,
        }
    }
}

impl SearchFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keywords(mut self, keywords: impl Into<String>) -> Self {
        self.keywords = Some(keywords.into());
        self
    }

    pub fn date_from(mut self, date: NaiveDate) -> Self {
        self.date_from = Some(date);
        self
    }

    pub fn date_to(mut self, date: NaiveDate) -> Self {
        self.date_to = Some(date);
        self
    }

    pub fn document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = Some(document_type.into());
        self
    }

    pub fn agency(mut self, agency: impl Into<String>) -> Self {
        self.agency = Some(agency.into());
        self
    }

    pub fn topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = Some(topic.into());
        self
    }

    pub fn presidential_doc_type(mut self, doc_type: impl Into<String>) -> Self {
        self.presidential_doc_type = Some(doc_type.into());
        self
    }

    pub fn executive_order(mut self, number: impl Into<String>) -> Self {
        self.executive_order = Some(number.into());
        self
    }

    pub fn limit(mut self, limit: i64) -> Self {
        self.limit = limit;
        self
    }

    pub fn offset(mut self, offset: i64) -> Self {
        self.offset = offset;
        self
    }
}

/// Returns the predicate value only when it is set and non-empty.
///
/// Stores skip empty strings the same way they skip unset predicates.
pub fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|s| !s.is_empty())
}
