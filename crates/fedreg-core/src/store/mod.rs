//! Storage abstraction for Federal Registry documents.
//!
//! The [`DocumentStore`] trait is the black box the query facade delegates
//! to. It owns the schema, the connection, and all SQL (or other) query
//! construction. Implementations must be `Send + Sync` to be shared across
//! request handlers.

pub mod memory;

use anyhow::Result;
use async_trait::async_trait;

use crate::filter::SearchFilter;
use crate::models::{Document, DocumentInput};

/// Abstract document backend.
///
/// # Operations
///
/// | Method | Purpose |
/// |--------|---------|
/// | [`connect`](DocumentStore::connect) / [`close`](DocumentStore::close) | Acquire and release the connection |
/// | [`search`](DocumentStore::search) | Filtered search, newest first |
/// | [`recent_documents`](DocumentStore::recent_documents) | Newest documents, unfiltered |
/// | [`document_by_id`](DocumentStore::document_by_id) | Single lookup |
/// | [`document_types`](DocumentStore::document_types) and friends | Distinct value listings |
/// | [`store_documents`](DocumentStore::store_documents) | Upsert records by document number |
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Open the underlying connection. Calling it on an open store is a no-op.
    async fn connect(&self) -> Result<()>;

    /// Release the underlying connection. Calling it on a closed store is a no-op.
    async fn close(&self) -> Result<()>;

    /// Run a filtered search.
    ///
    /// `keywords` matches title or abstract; `agency`, `topic`, and
    /// `presidential_doc_type` are case-insensitive substring matches;
    /// `document_type` and `executive_order` match exactly; the date bounds
    /// are inclusive. Results are ordered by publication date, newest first,
    /// and carry their agencies and topics.
    async fn search(&self, filter: &SearchFilter) -> Result<Vec<Document>>;

    /// The newest documents, equivalent to an unfiltered search.
    async fn recent_documents(&self, limit: i64) -> Result<Vec<Document>>;

    async fn document_by_id(&self, id: i64) -> Result<Option<Document>>;

    async fn document_types(&self) -> Result<Vec<String>>;

    /// Agency names, sorted.
    async fn agencies(&self) -> Result<Vec<String>>;

    /// Topic names, sorted.
    async fn topics(&self) -> Result<Vec<String>>;

    async fn presidential_document_types(&self) -> Result<Vec<String>>;

    /// Insert or update documents keyed by `document_number`.
    ///
    /// Returns how many documents were newly inserted. A document that
    /// fails to store is logged and skipped.
    async fn store_documents(&self, documents: &[DocumentInput]) -> Result<usize>;
}
