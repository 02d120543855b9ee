//! Named tools over the query facade.
//!
//! Each [`Tool`] wraps one facade operation behind a JSON interface: a name,
//! a description, a JSON Schema for its parameters, and an async
//! [`execute`](Tool::execute). The same [`ToolRegistry`] backs both the
//! HTTP `POST /tools/{name}` route and the chat agent's tool calls.
//!
//! ```text
//! ┌──────────────────────────────────────────┐
//! │              ToolRegistry                │
//! │  search_documents   get_recent_documents │
//! │  get_document_by_id get_agencies  ...    │
//! └──────────────┬───────────────────────────┘
//!                ▼
//!      ToolContext ──▶ QueryFacade ──▶ DocumentStore
//! ```
//!
//! Tools call the facade's `try_*` operations so a store outage surfaces as
//! an error instead of an empty result. Document lists are condensed into
//! [`DocumentSummary`] values before they are returned.

use anyhow::{anyhow, bail, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use fedreg_core::facade::DEFAULT_EXECUTIVE_ORDER_DAYS;
use fedreg_core::filter::DEFAULT_LIMIT;
use fedreg_core::{Document, DocumentSummary, QueryFacade, SearchFilter};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

/// A callable operation exposed to agents and HTTP clients.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Lowercase identifier with underscores, used as the route path.
    fn name(&self) -> &str;

    /// One-line description for agent discovery.
    fn description(&self) -> &str;

    /// JSON Schema (`type: "object"`) describing the accepted parameters.
    fn parameters_schema(&self) -> Value;

    /// Run the tool. `params` is a JSON object or `null`.
    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value>;
}

/// Tool metadata as listed by `GET /tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

/// Bridge from a tool invocation to the shared facade.
#[derive(Clone)]
pub struct ToolContext {
    facade: Arc<QueryFacade>,
}

impl ToolContext {
    pub fn new(facade: Arc<QueryFacade>) -> Self {
        Self { facade }
    }

    pub fn facade(&self) -> &QueryFacade {
        &self.facade
    }
}

/// Deserialize tool parameters, treating `null` as an empty object.
fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T> {
    let params = if params.is_null() { json!({}) } else { params };
    serde_json::from_value(params).map_err(|e| anyhow!("invalid parameters: {e}"))
}

fn summaries(documents: &[Document]) -> Result<Value> {
    let condensed: Vec<DocumentSummary> = documents.iter().map(DocumentSummary::from).collect();
    Ok(serde_json::to_value(condensed)?)
}

fn default_limit() -> i64 {
    DEFAULT_LIMIT
}

fn default_days() -> i64 {
    DEFAULT_EXECUTIVE_ORDER_DAYS
}

fn no_params_schema() -> Value {
    json!({ "type": "object", "properties": {}, "required": [] })
}

#[derive(Deserialize)]
struct LimitParams {
    #[serde(default = "default_limit")]
    limit: i64,
}

// ============ Search tools ============

pub struct SearchDocumentsTool;

#[async_trait]
impl Tool for SearchDocumentsTool {
    fn name(&self) -> &str {
        "search_documents"
    }

    fn description(&self) -> &str {
        "Search for documents in the Federal Registry database based on various criteria"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "keywords": { "type": "string", "description": "Search terms to look for in title and abstract" },
                "date_from": { "type": "string", "description": "Start date for publication_date filter (YYYY-MM-DD)" },
                "date_to": { "type": "string", "description": "End date for publication_date filter (YYYY-MM-DD)" },
                "document_type": { "type": "string", "description": "Filter by document type" },
                "agency": { "type": "string", "description": "Filter by agency name" },
                "topic": { "type": "string", "description": "Filter by topic name" },
                "presidential_doc_type": { "type": "string", "description": "Filter by presidential document type" },
                "executive_order": { "type": "string", "description": "Filter by executive order number" },
                "limit": { "type": "integer", "description": "Maximum number of results to return", "default": DEFAULT_LIMIT },
                "offset": { "type": "integer", "description": "Offset for pagination", "default": 0 }
            },
            "required": []
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let filter: SearchFilter = parse_params(params)?;
        let documents = ctx.facade().try_search(&filter).await?;
        summaries(&documents)
    }
}

pub struct RecentDocumentsTool;

#[async_trait]
impl Tool for RecentDocumentsTool {
    fn name(&self) -> &str {
        "get_recent_documents"
    }

    fn description(&self) -> &str {
        "Get the most recent documents in the Federal Registry"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "limit": { "type": "integer", "description": "Maximum number of documents to return", "default": DEFAULT_LIMIT }
            },
            "required": []
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let LimitParams { limit } = parse_params(params)?;
        let documents = ctx.facade().try_recent(limit).await?;
        summaries(&documents)
    }
}

#[derive(Deserialize)]
struct DocumentIdParams {
    document_id: i64,
}

pub struct DocumentByIdTool;

#[async_trait]
impl Tool for DocumentByIdTool {
    fn name(&self) -> &str {
        "get_document_by_id"
    }

    fn description(&self) -> &str {
        "Get a document by its ID"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "document_id": { "type": "integer", "description": "The document ID" }
            },
            "required": ["document_id"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let DocumentIdParams { document_id } = parse_params(params)?;
        match ctx.facade().try_by_id(document_id).await? {
            Some(doc) => Ok(serde_json::to_value(doc)?),
            None => bail!("document {document_id} not found"),
        }
    }
}

#[derive(Deserialize)]
struct ExecutiveOrderParams {
    #[serde(default = "default_days")]
    days: i64,
    #[serde(default = "default_limit")]
    limit: i64,
}

pub struct RecentExecutiveOrdersTool;

#[async_trait]
impl Tool for RecentExecutiveOrdersTool {
    fn name(&self) -> &str {
        "search_recent_executive_orders"
    }

    fn description(&self) -> &str {
        "Search for recent executive orders"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "days": { "type": "integer", "description": "Number of days in the past to search", "default": DEFAULT_EXECUTIVE_ORDER_DAYS },
                "limit": { "type": "integer", "description": "Maximum number of results to return", "default": DEFAULT_LIMIT }
            },
            "required": []
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let ExecutiveOrderParams { days, limit } = parse_params(params)?;
        let today = chrono::Local::now().date_naive();
        let documents = ctx
            .facade()
            .try_recent_executive_orders_as_of(today, days, limit)
            .await?;
        summaries(&documents)
    }
}

#[derive(Deserialize)]
struct DateRangeParams {
    start_date: NaiveDate,
    end_date: NaiveDate,
    #[serde(default = "default_limit")]
    limit: i64,
}

pub struct DateRangeTool;

#[async_trait]
impl Tool for DateRangeTool {
    fn name(&self) -> &str {
        "search_documents_by_date_range"
    }

    fn description(&self) -> &str {
        "Search for documents within a date range"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "start_date": { "type": "string", "description": "Start date (YYYY-MM-DD)" },
                "end_date": { "type": "string", "description": "End date (YYYY-MM-DD)" },
                "limit": { "type": "integer", "description": "Maximum number of results to return", "default": DEFAULT_LIMIT }
            },
            "required": ["start_date", "end_date"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let DateRangeParams {
            start_date,
            end_date,
            limit,
        } = parse_params(params)?;
        let documents = ctx
            .facade()
            .try_by_date_range(start_date, end_date, limit)
            .await?;
        summaries(&documents)
    }
}

#[derive(Deserialize)]
struct AgencyTopicParams {
    agency: String,
    topic: String,
    #[serde(default = "default_limit")]
    limit: i64,
}

pub struct AgencyTopicTool;

#[async_trait]
impl Tool for AgencyTopicTool {
    fn name(&self) -> &str {
        "search_by_agency_and_topic"
    }

    fn description(&self) -> &str {
        "Search for documents by agency and topic"
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "agency": { "type": "string", "description": "Agency name" },
                "topic": { "type": "string", "description": "Topic name" },
                "limit": { "type": "integer", "description": "Maximum number of results to return", "default": DEFAULT_LIMIT }
            },
            "required": ["agency", "topic"]
        })
    }

    async fn execute(&self, params: Value, ctx: &ToolContext) -> Result<Value> {
        let AgencyTopicParams {
            agency,
            topic,
            limit,
        } = parse_params(params)?;
        if agency.trim().is_empty() {
            bail!("agency must not be empty");
        }
        if topic.trim().is_empty() {
            bail!("topic must not be empty");
        }
        let documents = ctx
            .facade()
            .try_by_agency_and_topic(&agency, &topic, limit)
            .await?;
        summaries(&documents)
    }
}

// ============ Listing tools ============

/// Which distinct-value listing a [`ListingTool`] returns.
#[derive(Debug, Clone, Copy)]
pub enum Listing {
    DocumentTypes,
    Agencies,
    Topics,
    PresidentialDocumentTypes,
}

/// Parameterless tool returning one of the facade's distinct-value listings.
pub struct ListingTool {
    listing: Listing,
}

impl ListingTool {
    pub fn new(listing: Listing) -> Self {
        Self { listing }
    }
}

#[async_trait]
impl Tool for ListingTool {
    fn name(&self) -> &str {
        match self.listing {
            Listing::DocumentTypes => "get_document_types",
            Listing::Agencies => "get_agencies",
            Listing::Topics => "get_topics",
            Listing::PresidentialDocumentTypes => "get_presidential_document_types",
        }
    }

    fn description(&self) -> &str {
        match self.listing {
            Listing::DocumentTypes => "Get all document types in the database",
            Listing::Agencies => "Get all agencies in the database",
            Listing::Topics => "Get all topics in the database",
            Listing::PresidentialDocumentTypes => {
                "Get all presidential document types in the database"
            }
        }
    }

    fn parameters_schema(&self) -> Value {
        no_params_schema()
    }

    async fn execute(&self, _params: Value, ctx: &ToolContext) -> Result<Value> {
        let facade = ctx.facade();
        let values = match self.listing {
            Listing::DocumentTypes => facade.try_list_document_types().await?,
            Listing::Agencies => facade.try_list_agencies().await?,
            Listing::Topics => facade.try_list_topics().await?,
            Listing::PresidentialDocumentTypes => facade.try_list_presidential_doc_types().await?,
        };
        Ok(json!(values))
    }
}

// ============ Registry ============

/// Ordered collection of tools, looked up by name.
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self { tools: Vec::new() }
    }

    /// Registry holding the ten built-in Federal Registry tools.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(SearchDocumentsTool));
        registry.register(Box::new(RecentDocumentsTool));
        registry.register(Box::new(DocumentByIdTool));
        registry.register(Box::new(ListingTool::new(Listing::DocumentTypes)));
        registry.register(Box::new(ListingTool::new(Listing::Agencies)));
        registry.register(Box::new(ListingTool::new(Listing::Topics)));
        registry.register(Box::new(ListingTool::new(
            Listing::PresidentialDocumentTypes,
        )));
        registry.register(Box::new(RecentExecutiveOrdersTool));
        registry.register(Box::new(DateRangeTool));
        registry.register(Box::new(AgencyTopicTool));
        registry
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        self.tools.push(tool);
    }

    pub fn tools(&self) -> &[Box<dyn Tool>] {
        &self.tools
    }

    pub fn find(&self, name: &str) -> Option<&dyn Tool> {
        self.tools
            .iter()
            .find(|t| t.name() == name)
            .map(|t| t.as_ref())
    }

    pub fn infos(&self) -> Vec<ToolInfo> {
        self.tools
            .iter()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
