//! Document types that flow between stores, the query facade, and front ends.
//!
//! The facade never interprets these fields; schema ownership lives in the
//! [`DocumentStore`](crate::store::DocumentStore) implementations.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A Federal Registry record as returned by a store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: i64,
    pub document_number: String,
    pub document_type: Option<String>,
    pub title: Option<String>,
    /// Serialized as `YYYY-MM-DD`.
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    pub html_url: Option<String>,
    pub pdf_url: Option<String>,
    pub full_text_xml_url: Option<String>,
    pub presidential_document_type: Option<String>,
    pub signing_date: Option<NaiveDate>,
    pub executive_order_number: Option<String>,
    #[serde(default)]
    pub agencies: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
    pub created_at: Option<String>,
    pub updated_at: Option<String>,
}

/// A record to be loaded into a store.
///
/// Upserts are keyed by `document_number`; agency and topic associations
/// are replaced wholesale on update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentInput {
    pub document_number: String,
    #[serde(default, alias = "type")]
    pub document_type: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub publication_date: Option<NaiveDate>,
    #[serde(default, rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(default)]
    pub html_url: Option<String>,
    #[serde(default)]
    pub pdf_url: Option<String>,
    #[serde(default)]
    pub full_text_xml_url: Option<String>,
    #[serde(default)]
    pub presidential_document_type: Option<String>,
    #[serde(default)]
    pub signing_date: Option<NaiveDate>,
    #[serde(default)]
    pub executive_order_number: Option<String>,
    #[serde(default)]
    pub agencies: Vec<String>,
    #[serde(default)]
    pub topics: Vec<String>,
}

/// Condensed view of a [`Document`] handed to the chat model.
///
/// Presidential fields are omitted when unset, keeping tool results short.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: i64,
    pub document_number: String,
    pub document_type: Option<String>,
    pub title: Option<String>,
    pub publication_date: Option<NaiveDate>,
    #[serde(rename = "abstract")]
    pub abstract_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub presidential_document_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub executive_order_number: Option<String>,
    pub agencies: Vec<String>,
    pub topics: Vec<String>,
}

impl From<&Document> for DocumentSummary {
    fn from(doc: &Document) -> Self {
        Self {
            id: doc.id,
            document_number: doc.document_number.clone(),
            document_type: doc.document_type.clone(),
            title: doc.title.clone(),
            publication_date: doc.publication_date,
            abstract_text: doc.abstract_text.clone(),
            presidential_document_type: doc
                .presidential_document_type
                .clone()
                .filter(|s| !s.is_empty()),
            executive_order_number: doc.executive_order_number.clone().filter(|s| !s.is_empty()),
            agencies: doc.agencies.clone(),
            topics: doc.topics.clone(),
        }
    }
}
