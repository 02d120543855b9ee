//! HTTP front end.
//!
//! Serves the chat search endpoint used by the web UI plus direct access to
//! every registered tool.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/search` | Ask the chat agent; body `{"query", "chat_id"?}` |
//! | `GET`  | `/tools/list` | List all registered tools with schemas |
//! | `POST` | `/tools/{name}` | Call a tool by name |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "query must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_found` (404), `tool_error` (500),
//! `internal` (500).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted so a browser UI served
//! from another origin can call the API.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use fedreg_core::QueryFacade;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::agent::{Agent, ChatModel, OllamaClient};
use crate::config::Config;
use crate::sqlite_store::open_facade;
use crate::tools::{ToolContext, ToolInfo, ToolRegistry};

/// Shared state handed to every route handler.
#[derive(Clone)]
pub struct AppState {
    tools: Arc<ToolRegistry>,
    ctx: ToolContext,
    agent: Arc<Agent>,
}

impl AppState {
    /// State for one server; the agent keeps at most `max_sessions` chats.
    pub fn new(facade: Arc<QueryFacade>, model: Arc<dyn ChatModel>, max_sessions: usize) -> Self {
        let tools = Arc::new(ToolRegistry::with_builtins());
        let agent = Arc::new(
            Agent::with_tools(facade.clone(), model, tools.clone()).with_max_sessions(max_sessions),
        );
        Self {
            tools,
            ctx: ToolContext::new(facade),
            agent,
        }
    }

    pub fn agent(&self) -> &Arc<Agent> {
        &self.agent
    }
}

/// Build the application router with CORS enabled.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(handle_health))
        .route("/search", post(handle_search))
        .route("/tools/list", get(handle_list_tools))
        .route("/tools/{name}", post(handle_tool_call))
        .layer(cors)
        .with_state(state)
}

/// Starts the HTTP server on `[server].bind` and runs until Ctrl-C.
///
/// The database connection is opened before binding and closed after the
/// server drains.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let facade = open_facade(config).await?;
    let model = Arc::new(OllamaClient::new(&config.agent)?);
    let state = AppState::new(facade.clone(), model, config.agent.max_sessions);

    tracing::info!(
        tools = state.tools.len(),
        model = %config.agent.model,
        max_sessions = config.agent.max_sessions,
        ollama = %config.agent.base_url,
        "starting server"
    );

    let listener = tokio::net::TcpListener::bind(&config.server.bind).await?;
    println!("Federal Registry search listening on http://{}", config.server.bind);

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    facade.close().await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Handler error rendered as the JSON error envelope.
#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request",
        message: message.into(),
    }
}

fn not_found(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::NOT_FOUND,
        code: "not_found",
        message: message.into(),
    }
}

fn tool_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "tool_error",
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal",
        message: message.into(),
    }
}

/// Map a tool failure to a status from its message: lookups that miss are
/// 404, parameter problems are 400, everything else is a 500.
fn classify_tool_error(tool_name: &str, err: anyhow::Error) -> AppError {
    let msg = err.to_string();

    if msg.contains("not found") {
        not_found(format!("{}: {}", tool_name, msg))
    } else if msg.contains("must not be empty") || msg.starts_with("invalid parameters") {
        bad_request(format!("{}: {}", tool_name, msg))
    } else {
        tracing::error!(tool = tool_name, "tool call failed: {msg}");
        tool_error(format!("{}: {}", tool_name, msg))
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchRequest {
    query: String,
    #[serde(default)]
    chat_id: Option<String>,
}

#[derive(Serialize)]
struct SearchResponse {
    response: String,
    chat_id: String,
}

/// Runs one agent turn. A conversation without a `chat_id` gets a fresh one,
/// which the client sends back to continue it.
async fn handle_search(
    State(state): State<AppState>,
    Json(req): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    let query = req.query.trim();
    if query.is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let chat_id = req
        .chat_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let agent = state.agent.clone();
    let turn_chat_id = chat_id.clone();
    let turn_query = query.to_string();
    // A dropped request must not cancel a turn halfway.
    let response = tokio::spawn(async move {
        agent.process_message(&turn_query, &turn_chat_id).await
    })
    .await
    .map_err(|e| internal(format!("search task failed: {e}")))?;

    Ok(Json(SearchResponse { response, chat_id }))
}

// ============ GET /tools/list ============

#[derive(Serialize)]
struct ToolListResponse {
    tools: Vec<ToolInfo>,
}

async fn handle_list_tools(State(state): State<AppState>) -> Json<ToolListResponse> {
    Json(ToolListResponse {
        tools: state.tools.infos(),
    })
}

// ============ POST /tools/{name} ============

async fn handle_tool_call(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Json(params): Json<serde_json::Value>,
) -> Result<Json<serde_json::Value>, AppError> {
    let tool = state
        .tools
        .find(&name)
        .ok_or_else(|| not_found(format!("no tool registered with name: {}", name)))?;

    if !(params.is_object() || params.is_null()) {
        return Err(bad_request("tool parameters must be a JSON object"));
    }

    let result = tool
        .execute(params, &state.ctx)
        .await
        .map_err(|e| classify_tool_error(&name, e))?;

    Ok(Json(serde_json::json!({ "result": result })))
}
