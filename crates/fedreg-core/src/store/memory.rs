//! In-memory [`DocumentStore`] implementation for tests and embedding.
//!
//! Documents live in a `Vec` behind `std::sync::RwLock`. Filtering follows
//! the same rules as the SQLite backend: substring predicates compare
//! case-insensitively, date bounds are inclusive, and documents without a
//! publication date sort last.

use std::collections::BTreeSet;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;

use crate::filter::{active, SearchFilter};
use crate::models::{Document, DocumentInput};

use super::DocumentStore;

struct State {
    docs: Vec<Document>,
    next_id: i64,
}

/// In-memory store for tests and embedded use.
pub struct InMemoryStore {
    state: RwLock<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(State {
                docs: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Build a store pre-loaded with `documents`.
    pub fn with_documents(documents: &[DocumentInput]) -> Result<Self> {
        let store = Self::new();
        {
            let mut state = store.write()?;
            for input in documents {
                upsert(&mut state, input)?;
            }
        }
        Ok(store)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| anyhow!("in-memory store lock poisoned"))
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

fn now_timestamp() -> String {
    chrono::Utc::now().format("%Y-%m-%d %H:%M:%S").to_string()
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Returns `true` when the document was newly inserted.
fn upsert(state: &mut State, input: &DocumentInput) -> Result<bool> {
    if input.document_number.trim().is_empty() {
        bail!("document_number must not be empty");
    }

    let now = now_timestamp();
    let agencies: Vec<String> = input
        .agencies
        .iter()
        .filter(|a| !a.is_empty())
        .cloned()
        .collect();
    let topics: Vec<String> = input
        .topics
        .iter()
        .filter(|t| !t.is_empty())
        .cloned()
        .collect();

    let existing = state
        .docs
        .iter()
        .find(|d| d.document_number == input.document_number);

    let (id, created_at, inserted) = match existing {
        Some(doc) => (doc.id, doc.created_at.clone(), false),
        None => {
            let id = state.next_id;
            state.next_id += 1;
            (id, Some(now.clone()), true)
        }
    };

    let doc = Document {
        id,
        document_number: input.document_number.clone(),
        document_type: input.document_type.clone(),
        title: input.title.clone(),
        publication_date: input.publication_date,
        abstract_text: input.abstract_text.clone(),
        html_url: input.html_url.clone(),
        pdf_url: input.pdf_url.clone(),
        full_text_xml_url: input.full_text_xml_url.clone(),
        presidential_document_type: input.presidential_document_type.clone(),
        signing_date: input.signing_date,
        executive_order_number: input.executive_order_number.clone(),
        agencies,
        topics,
        created_at,
        updated_at: Some(now),
    };

    if inserted {
        state.docs.push(doc);
    } else if let Some(slot) = state.docs.iter_mut().find(|d| d.id == id) {
        *slot = doc;
    }
    Ok(inserted)
}

fn matches(doc: &Document, filter: &SearchFilter) -> bool {
    if let Some(from) = filter.date_from {
        if !doc.publication_date.is_some_and(|d| d >= from) {
            return false;
        }
    }
    if let Some(to) = filter.date_to {
        if !doc.publication_date.is_some_and(|d| d <= to) {
            return false;
        }
    }
    if let Some(doc_type) = active(&filter.document_type) {
        if doc.document_type.as_deref() != Some(doc_type) {
            return false;
        }
    }
    if let Some(agency) = active(&filter.agency) {
        if !doc.agencies.iter().any(|a| contains_ci(a, agency)) {
            return false;
        }
    }
    if let Some(topic) = active(&filter.topic) {
        if !doc.topics.iter().any(|t| contains_ci(t, topic)) {
            return false;
        }
    }
    if let Some(pres_type) = active(&filter.presidential_doc_type) {
        if !doc
            .presidential_document_type
            .as_deref()
            .is_some_and(|p| contains_ci(p, pres_type))
        {
            return false;
        }
    }
    if let Some(keywords) = active(&filter.keywords) {
        let in_title = doc.title.as_deref().is_some_and(|t| contains_ci(t, keywords));
        let in_abstract = doc
            .abstract_text
            .as_deref()
            .is_some_and(|a| contains_ci(a, keywords));
        if !in_title && !in_abstract {
            return false;
        }
    }
    if let Some(number) = active(&filter.executive_order) {
        if doc.executive_order_number.as_deref() != Some(number) {
            return false;
        }
    }
    true
}

fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    values
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    async fn close(&self) -> Result<()> {
        Ok(())
    }

    async fn search(&self, filter: &SearchFilter) -> Result<Vec<Document>> {
        let state = self.read()?;
        let mut hits: Vec<&Document> = state.docs.iter().filter(|d| matches(d, filter)).collect();
        // Option<NaiveDate> orders None first, so descending puts undated documents last.
        hits.sort_by(|a, b| {
            b.publication_date
                .cmp(&a.publication_date)
                .then(b.id.cmp(&a.id))
        });
        Ok(hits
            .into_iter()
            .skip(filter.offset.max(0) as usize)
            .take(filter.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn recent_documents(&self, limit: i64) -> Result<Vec<Document>> {
        self.search(&SearchFilter::new().limit(limit)).await
    }

    async fn document_by_id(&self, id: i64) -> Result<Option<Document>> {
        let state = self.read()?;
        Ok(state.docs.iter().find(|d| d.id == id).cloned())
    }

    async fn document_types(&self) -> Result<Vec<String>> {
        let state = self.read()?;
        Ok(distinct(
            state.docs.iter().filter_map(|d| d.document_type.as_deref()),
        ))
    }

    async fn agencies(&self) -> Result<Vec<String>> {
        let state = self.read()?;
        Ok(distinct(
            state
                .docs
                .iter()
                .flat_map(|d| d.agencies.iter().map(String::as_str)),
        ))
    }

    async fn topics(&self) -> Result<Vec<String>> {
        let state = self.read()?;
        Ok(distinct(
            state
                .docs
                .iter()
                .flat_map(|d| d.topics.iter().map(String::as_str)),
        ))
    }

    async fn presidential_document_types(&self) -> Result<Vec<String>> {
        let state = self.read()?;
        Ok(distinct(
            state
                .docs
                .iter()
                .filter_map(|d| d.presidential_document_type.as_deref()),
        ))
    }

    async fn store_documents(&self, documents: &[DocumentInput]) -> Result<usize> {
        let mut state = self.write()?;
        let mut inserted = 0;
        for input in documents {
            match upsert(&mut state, input) {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        document_number = %input.document_number,
                        "Error storing document: {e}"
                    );
                }
            }
        }
        Ok(inserted)
    }
}
