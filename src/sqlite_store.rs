//! SQLite-backed [`DocumentStore`].
//!
//! Documents live in a `documents` table; agencies and topics are
//! normalized into their own tables and linked through the
//! `document_agencies` and `document_topics` join tables. The pool is
//! opened lazily on first use and the schema is bootstrapped on connect.

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use fedreg_core::filter::active;
use fedreg_core::{Document, DocumentInput, DocumentStore, QueryFacade, SearchFilter};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::config::{Config, DbConfig};
use crate::db;
use crate::migrate::initialize_schema;

const DOCUMENT_COLUMNS: &str = "d.id, d.document_number, d.document_type, d.title, \
    d.publication_date, d.abstract, d.html_url, d.pdf_url, d.full_text_xml_url, \
    d.presidential_document_type, d.signing_date, d.executive_order_number, \
    d.created_at, d.updated_at";

/// A positional bind value for a dynamically assembled query.
enum Bind {
    Text(String),
    Integer(i64),
}

pub struct SqliteStore {
    config: DbConfig,
    pool: Mutex<Option<SqlitePool>>,
}

impl SqliteStore {
    pub fn new(config: &DbConfig) -> Self {
        Self {
            config: config.clone(),
            pool: Mutex::new(None),
        }
    }

    /// The open pool. The first call connects and bootstraps the schema.
    async fn pool(&self) -> Result<SqlitePool> {
        let mut guard = self.pool.lock().await;
        if let Some(pool) = guard.as_ref() {
            return Ok(pool.clone());
        }
        let pool = db::connect(&self.config).await?;
        initialize_schema(&pool).await?;
        tracing::info!(path = %self.config.path.display(), "connected to database");
        *guard = Some(pool.clone());
        Ok(pool)
    }

    async fn load_associations(&self, pool: &SqlitePool, doc: &mut Document) -> Result<()> {
        doc.agencies = sqlx::query_scalar(
            "SELECT a.agency_name FROM agencies a \
             JOIN document_agencies da ON a.id = da.agency_id \
             WHERE da.document_id = ? ORDER BY a.agency_name",
        )
        .bind(doc.id)
        .fetch_all(pool)
        .await?;

        doc.topics = sqlx::query_scalar(
            "SELECT t.topic_name FROM topics t \
             JOIN document_topics dt ON t.id = dt.topic_id \
             WHERE dt.document_id = ? ORDER BY t.topic_name",
        )
        .bind(doc.id)
        .fetch_all(pool)
        .await?;

        Ok(())
    }

    async fn distinct_column(&self, sql: &str) -> Result<Vec<String>> {
        let pool = self.pool().await?;
        let values: Vec<Option<String>> = sqlx::query_scalar(sql).fetch_all(&pool).await?;
        Ok(values
            .into_iter()
            .flatten()
            .filter(|v| !v.is_empty())
            .collect())
    }
}

fn parse_date(value: Option<String>) -> Option<NaiveDate> {
    value.and_then(|s| NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok())
}

fn row_to_document(row: &SqliteRow) -> Result<Document> {
    Ok(Document {
        id: row.try_get("id")?,
        document_number: row.try_get("document_number")?,
        document_type: row.try_get("document_type")?,
        title: row.try_get("title")?,
        publication_date: parse_date(row.try_get("publication_date")?),
        abstract_text: row.try_get("abstract")?,
        html_url: row.try_get("html_url")?,
        pdf_url: row.try_get("pdf_url")?,
        full_text_xml_url: row.try_get("full_text_xml_url")?,
        presidential_document_type: row.try_get("presidential_document_type")?,
        signing_date: parse_date(row.try_get("signing_date")?),
        executive_order_number: row.try_get("executive_order_number")?,
        agencies: Vec::new(),
        topics: Vec::new(),
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Build the search statement and its binds, in placeholder order.
fn build_search(filter: &SearchFilter) -> (String, Vec<Bind>) {
    let mut sql = format!(
        "SELECT DISTINCT {DOCUMENT_COLUMNS} FROM documents d \
         LEFT JOIN document_agencies da ON d.id = da.document_id \
         LEFT JOIN agencies a ON da.agency_id = a.id \
         LEFT JOIN document_topics dt ON d.id = dt.document_id \
         LEFT JOIN topics t ON dt.topic_id = t.id \
         WHERE 1=1"
    );
    let mut binds = Vec::new();

    if let Some(from) = filter.date_from {
        sql.push_str(" AND d.publication_date >= ?");
        binds.push(Bind::Text(from.to_string()));
    }
    if let Some(to) = filter.date_to {
        sql.push_str(" AND d.publication_date <= ?");
        binds.push(Bind::Text(to.to_string()));
    }
    if let Some(doc_type) = active(&filter.document_type) {
        sql.push_str(" AND d.document_type = ?");
        binds.push(Bind::Text(doc_type.to_string()));
    }
    if let Some(agency) = active(&filter.agency) {
        sql.push_str(" AND a.agency_name LIKE ?");
        binds.push(Bind::Text(format!("%{agency}%")));
    }
    if let Some(topic) = active(&filter.topic) {
        sql.push_str(" AND t.topic_name LIKE ?");
        binds.push(Bind::Text(format!("%{topic}%")));
    }
    if let Some(pres_type) = active(&filter.presidential_doc_type) {
        sql.push_str(" AND d.presidential_document_type LIKE ?");
        binds.push(Bind::Text(format!("%{pres_type}%")));
    }
    if let Some(keywords) = active(&filter.keywords) {
        sql.push_str(" AND (d.title LIKE ? OR d.abstract LIKE ?)");
        binds.push(Bind::Text(format!("%{keywords}%")));
        binds.push(Bind::Text(format!("%{keywords}%")));
    }
    if let Some(number) = active(&filter.executive_order) {
        sql.push_str(" AND d.executive_order_number = ?");
        binds.push(Bind::Text(number.to_string()));
    }

    sql.push_str(" ORDER BY d.publication_date DESC, d.id DESC LIMIT ? OFFSET ?");
    binds.push(Bind::Integer(filter.limit.max(0)));
    binds.push(Bind::Integer(filter.offset.max(0)));

    (sql, binds)
}

/// Upsert one document and replace its associations. Returns `true` on insert.
async fn store_one(pool: &SqlitePool, input: &DocumentInput) -> Result<bool> {
    if input.document_number.trim().is_empty() {
        bail!("document_number must not be empty");
    }

    let publication_date = input.publication_date.map(|d| d.to_string());
    let signing_date = input.signing_date.map(|d| d.to_string());

    let mut tx = pool.begin().await?;

    let existing: Option<i64> =
        sqlx::query_scalar("SELECT id FROM documents WHERE document_number = ?")
            .bind(&input.document_number)
            .fetch_optional(&mut *tx)
            .await?;

    let (document_id, inserted) = match existing {
        Some(id) => {
            sqlx::query(
                "UPDATE documents SET document_type = ?, title = ?, publication_date = ?, \
                 abstract = ?, html_url = ?, pdf_url = ?, full_text_xml_url = ?, \
                 presidential_document_type = ?, signing_date = ?, executive_order_number = ?, \
                 updated_at = CURRENT_TIMESTAMP WHERE id = ?",
            )
            .bind(&input.document_type)
            .bind(&input.title)
            .bind(&publication_date)
            .bind(&input.abstract_text)
            .bind(&input.html_url)
            .bind(&input.pdf_url)
            .bind(&input.full_text_xml_url)
            .bind(&input.presidential_document_type)
            .bind(&signing_date)
            .bind(&input.executive_order_number)
            .bind(id)
            .execute(&mut *tx)
            .await?;

            sqlx::query("DELETE FROM document_agencies WHERE document_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            sqlx::query("DELETE FROM document_topics WHERE document_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            (id, false)
        }
        None => {
            let result = sqlx::query(
                "INSERT INTO documents (document_number, document_type, title, publication_date, \
                 abstract, html_url, pdf_url, full_text_xml_url, presidential_document_type, \
                 signing_date, executive_order_number) \
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&input.document_number)
            .bind(&input.document_type)
            .bind(&input.title)
            .bind(&publication_date)
            .bind(&input.abstract_text)
            .bind(&input.html_url)
            .bind(&input.pdf_url)
            .bind(&input.full_text_xml_url)
            .bind(&input.presidential_document_type)
            .bind(&signing_date)
            .bind(&input.executive_order_number)
            .execute(&mut *tx)
            .await?;
            (result.last_insert_rowid(), true)
        }
    };

    for agency in input.agencies.iter().filter(|a| !a.is_empty()) {
        sqlx::query("INSERT OR IGNORE INTO agencies (agency_name) VALUES (?)")
            .bind(agency)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT OR IGNORE INTO document_agencies (document_id, agency_id) \
             SELECT ?, id FROM agencies WHERE agency_name = ?",
        )
        .bind(document_id)
        .bind(agency)
        .execute(&mut *tx)
        .await?;
    }

    for topic in input.topics.iter().filter(|t| !t.is_empty()) {
        sqlx::query("INSERT OR IGNORE INTO topics (topic_name) VALUES (?)")
            .bind(topic)
            .execute(&mut *tx)
            .await?;
        sqlx::query(
            "INSERT OR IGNORE INTO document_topics (document_id, topic_id) \
             SELECT ?, id FROM topics WHERE topic_name = ?",
        )
        .bind(document_id)
        .bind(topic)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    Ok(inserted)
}

#[async_trait]
impl DocumentStore for SqliteStore {
    async fn connect(&self) -> Result<()> {
        self.pool().await.map(|_| ())
    }

    async fn close(&self) -> Result<()> {
        if let Some(pool) = self.pool.lock().await.take() {
            pool.close().await;
            tracing::info!("database connection closed");
        }
        Ok(())
    }

    async fn search(&self, filter: &SearchFilter) -> Result<Vec<Document>> {
        let pool = self.pool().await?;
        let (sql, binds) = build_search(filter);
        tracing::debug!(%sql, "running document search");

        let mut query = sqlx::query(&sql);
        for bind in binds {
            query = match bind {
                Bind::Text(v) => query.bind(v),
                Bind::Integer(v) => query.bind(v),
            };
        }

        let rows = query.fetch_all(&pool).await?;
        let mut documents = Vec::with_capacity(rows.len());
        for row in &rows {
            let mut doc = row_to_document(row)?;
            self.load_associations(&pool, &mut doc).await?;
            documents.push(doc);
        }
        Ok(documents)
    }

    async fn recent_documents(&self, limit: i64) -> Result<Vec<Document>> {
        self.search(&SearchFilter::new().limit(limit)).await
    }

    async fn document_by_id(&self, id: i64) -> Result<Option<Document>> {
        let pool = self.pool().await?;
        let row = sqlx::query(&format!(
            "SELECT {DOCUMENT_COLUMNS} FROM documents d WHERE d.id = ?"
        ))
        .bind(id)
        .fetch_optional(&pool)
        .await?;

        match row {
            Some(row) => {
                let mut doc = row_to_document(&row)?;
                self.load_associations(&pool, &mut doc).await?;
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    async fn document_types(&self) -> Result<Vec<String>> {
        self.distinct_column(
            "SELECT DISTINCT document_type FROM documents \
             WHERE document_type IS NOT NULL ORDER BY document_type",
        )
        .await
    }

    async fn agencies(&self) -> Result<Vec<String>> {
        self.distinct_column("SELECT agency_name FROM agencies ORDER BY agency_name")
            .await
    }

    async fn topics(&self) -> Result<Vec<String>> {
        self.distinct_column("SELECT topic_name FROM topics ORDER BY topic_name")
            .await
    }

    async fn presidential_document_types(&self) -> Result<Vec<String>> {
        self.distinct_column(
            "SELECT DISTINCT presidential_document_type FROM documents \
             WHERE presidential_document_type IS NOT NULL ORDER BY presidential_document_type",
        )
        .await
    }

    async fn store_documents(&self, documents: &[DocumentInput]) -> Result<usize> {
        let pool = self.pool().await?;
        let mut inserted = 0;
        for input in documents {
            match store_one(&pool, input).await {
                Ok(true) => inserted += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::error!(
                        document_number = %input.document_number,
                        "Error storing document: {e:#}"
                    );
                }
            }
        }
        tracing::info!(stored = inserted, total = documents.len(), "stored documents");
        Ok(inserted)
    }
}

/// Open a connected [`QueryFacade`] over the configured SQLite database.
pub async fn open_facade(config: &Config) -> Result<Arc<QueryFacade>> {
    let store = Arc::new(SqliteStore::new(&config.db));
    let span = tracing::info_span!("query_facade", db = %config.db.path.display());
    let facade = QueryFacade::with_span(store, span);
    facade.connect().await?;
    Ok(Arc::new(facade))
}
