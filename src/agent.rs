//! Chat agent that answers questions by calling Federal Registry tools.
//!
//! A turn runs as follows:
//!
//! 1. The user message is appended to the chat's history and sent to the
//!    model together with a system prompt that lists every tool.
//! 2. Tool calls are extracted from fenced ```` ```json ```` blocks in the
//!    reply, each shaped as `{"name": ..., "parameters": {...}}`.
//! 3. With no tool calls the reply is returned as is. Otherwise each tool
//!    runs, the results are appended as a system message, and a second
//!    completion produces the final answer.
//!
//! History is kept per `chat_id`. A failed model call is logged and turned
//! into a fixed apology so the HTTP front end always has text to show.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use fedreg_core::QueryFacade;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use crate::config::{AgentConfig, Config};
use crate::sqlite_store::open_facade;
use crate::tools::{ToolContext, ToolRegistry};

/// Reply used when the model cannot be reached or answers with an error.
pub const APOLOGY: &str =
    "I'm sorry, but I encountered an error while processing your request. Please try again later.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: "assistant".to_string(),
            content: content.into(),
        }
    }
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Complete the conversation and return the assistant's reply text.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

// ============ Ollama ============

/// Non-streaming client for Ollama's `POST /api/chat`.
pub struct OllamaClient {
    client: reqwest::Client,
    config: AgentConfig,
}

impl OllamaClient {
    pub fn new(config: &AgentConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/api/chat", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatModel for OllamaClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let endpoint = self.endpoint();
        let body = json!({
            "model": self.config.model,
            "messages": messages,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "top_p": self.config.top_p,
                "num_predict": self.config.num_predict,
            }
        });

        tracing::info!(%endpoint, model = %self.config.model, messages = messages.len(), "sending chat request");
        tracing::debug!(payload = %body, "chat request payload");

        let response = self
            .client
            .post(&endpoint)
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Ollama request to {endpoint} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().await.unwrap_or_default();
            bail!("Ollama API error {}: {}", status, body_text);
        }

        let json: Value = response.json().await?;
        tracing::debug!(response = %json, "chat response");
        parse_chat_response(&json)
    }
}

fn parse_chat_response(json: &Value) -> Result<String> {
    let message = json
        .get("message")
        .ok_or_else(|| anyhow::anyhow!("Invalid Ollama response: missing message"))?;
    Ok(message
        .get("content")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}

// ============ Tool-call extraction ============

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ToolCall {
    pub name: String,
    pub parameters: Value,
}

fn json_fence() -> &'static Regex {
    static FENCE: OnceLock<Regex> = OnceLock::new();
    FENCE.get_or_init(|| Regex::new(r"```json\s*([\s\S]*?)\s*```").expect("valid fence pattern"))
}

/// Tool calls found in fenced JSON blocks, in order of appearance.
///
/// Blocks that are not valid JSON or lack `name` or `parameters` are skipped.
pub fn extract_tool_calls(text: &str) -> Vec<ToolCall> {
    json_fence()
        .captures_iter(text)
        .filter_map(|caps| {
            let block = caps.get(1)?.as_str();
            match serde_json::from_str::<ToolCall>(block) {
                Ok(call) => Some(call),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping fenced block that is not a tool call");
                    None
                }
            }
        })
        .collect()
}

// ============ Agent ============

/// Chat histories keyed by `chat_id`, capped at `limit` entries.
struct Sessions {
    chats: HashMap<String, Session>,
    clock: u64,
    limit: usize,
}

struct Session {
    messages: Vec<ChatMessage>,
    last_used: u64,
}

impl Sessions {
    fn new(limit: usize) -> Self {
        Self {
            chats: HashMap::new(),
            clock: 0,
            limit: limit.max(1),
        }
    }

    fn save(&mut self, chat_id: &str, messages: Vec<ChatMessage>) {
        self.clock += 1;
        self.chats.insert(
            chat_id.to_string(),
            Session {
                messages,
                last_used: self.clock,
            },
        );
        while self.chats.len() > self.limit {
            let Some(oldest) = self
                .chats
                .iter()
                .min_by_key(|(_, session)| session.last_used)
                .map(|(id, _)| id.clone())
            else {
                break;
            };
            self.chats.remove(&oldest);
            tracing::debug!(chat_id = %oldest, "evicted chat history");
        }
    }
}

/// Default cap on in-memory conversations.
pub const DEFAULT_MAX_SESSIONS: usize = 1000;

pub struct Agent {
    model: Arc<dyn ChatModel>,
    tools: Arc<ToolRegistry>,
    ctx: ToolContext,
    sessions: Mutex<Sessions>,
}

impl Agent {
    /// Agent over the built-in tool set.
    pub fn new(facade: Arc<QueryFacade>, model: Arc<dyn ChatModel>) -> Self {
        Self::with_tools(facade, model, Arc::new(ToolRegistry::with_builtins()))
    }

    pub fn with_tools(
        facade: Arc<QueryFacade>,
        model: Arc<dyn ChatModel>,
        tools: Arc<ToolRegistry>,
    ) -> Self {
        Self {
            model,
            tools,
            ctx: ToolContext::new(facade),
            sessions: Mutex::new(Sessions::new(DEFAULT_MAX_SESSIONS)),
        }
    }

    /// Keep at most `limit` conversations, dropping the least recently used.
    pub fn with_max_sessions(self, limit: usize) -> Self {
        Self {
            sessions: Mutex::new(Sessions::new(limit)),
            ..self
        }
    }

    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Answer `message` within the conversation `chat_id`. Never fails.
    ///
    /// A turn that fails leaves the stored history as it was.
    pub async fn process_message(&self, message: &str, chat_id: &str) -> String {
        let mut history = self.history(chat_id);
        history.push(ChatMessage::user(message));

        match self.converse(&mut history).await {
            Ok(reply) => {
                self.save_history(chat_id, history);
                reply
            }
            Err(e) => {
                tracing::error!(chat_id, "Error processing message: {e:#}");
                APOLOGY.to_string()
            }
        }
    }

    async fn converse(&self, history: &mut Vec<ChatMessage>) -> Result<String> {
        let today = chrono::Local::now().date_naive();
        let mut messages = Vec::with_capacity(history.len() + 3);
        messages.push(ChatMessage::system(system_prompt(&self.tools, today)));
        messages.extend(history.iter().cloned());

        let reply = self.model.complete(&messages).await?;
        let calls = extract_tool_calls(&reply);
        if calls.is_empty() {
            history.push(ChatMessage::assistant(reply.clone()));
            return Ok(reply);
        }

        let mut results = Vec::with_capacity(calls.len());
        for call in calls {
            let result = self.execute_tool(&call.name, call.parameters.clone()).await;
            results.push(json!({
                "tool_name": call.name,
                "parameters": call.parameters,
                "result": result,
            }));
        }

        let assistant = ChatMessage::assistant(reply);
        let tool_results = ChatMessage::system(format!(
            "Tool call results: {}",
            Value::Array(results)
        ));
        history.push(assistant.clone());
        history.push(tool_results.clone());
        messages.push(assistant);
        messages.push(tool_results);

        let answer = self.model.complete(&messages).await?;
        history.push(ChatMessage::assistant(answer.clone()));
        Ok(answer)
    }

    /// Run one tool. Failures become an `{"error": ...}` value for the model to read.
    pub async fn execute_tool(&self, name: &str, parameters: Value) -> Value {
        tracing::info!(tool = name, %parameters, "executing tool");
        let Some(tool) = self.tools.find(name) else {
            return json!({ "error": format!("Tool not found: {name}") });
        };
        match tool.execute(parameters, &self.ctx).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!(tool = name, "Error executing tool: {e:#}");
                json!({ "error": format!("Error executing tool {name}: {e}") })
            }
        }
    }

    /// Messages exchanged so far in `chat_id`, without the system prompt.
    pub fn history(&self, chat_id: &str) -> Vec<ChatMessage> {
        self.sessions
            .lock()
            .map(|sessions| {
                sessions
                    .chats
                    .get(chat_id)
                    .map(|session| session.messages.clone())
                    .unwrap_or_default()
            })
            .unwrap_or_default()
    }

    /// Number of conversations currently held in memory.
    pub fn session_count(&self) -> usize {
        self.sessions
            .lock()
            .map(|sessions| sessions.chats.len())
            .unwrap_or(0)
    }

    fn save_history(&self, chat_id: &str, history: Vec<ChatMessage>) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.save(chat_id, history);
        }
    }

    /// Forget the conversation `chat_id`.
    pub fn reset_chat(&self, chat_id: &str) {
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.chats.remove(chat_id);
        }
    }
}

/// System prompt describing the available tools and the call format.
pub fn system_prompt(tools: &ToolRegistry, today: NaiveDate) -> String {
    let mut prompt = String::from(
        "You are a helpful assistant that can access and search through the Federal Registry database.\n\
         Your goal is to help users find information about federal documents, executive orders, rules, and notices.\n\n\
         You have access to the following tools:\n",
    );

    for (i, tool) in tools.tools().iter().enumerate() {
        prompt.push_str(&format!("{}. {} - {}\n", i + 1, tool.name(), tool.description()));
        let schema = tool.parameters_schema();
        let mut params: Vec<&str> = schema["properties"]
            .as_object()
            .map(|props| props.keys().map(String::as_str).collect())
            .unwrap_or_default();
        params.sort_unstable();
        if !params.is_empty() {
            prompt.push_str(&format!("   Parameters: {}\n", params.join(", ")));
        }
    }

    prompt.push_str(
        "\nTo use a tool, format your tool call as follows:\n\
         ```json\n\
         {\n  \"name\": \"tool_name\",\n  \"parameters\": {\n    \"param1\": \"value1\"\n  }\n}\n\
         ```\n\n\
         For example, to search recent executive orders:\n\
         ```json\n\
         {\n  \"name\": \"search_recent_executive_orders\",\n  \"parameters\": {\n    \"days\": 30,\n    \"limit\": 10\n  }\n}\n\
         ```\n\n\
         Always use these exact tool names and parameters. Do not invent new tool names.\n",
    );
    prompt.push_str(&format!("The current date is {}.\n", today.format("%Y-%m-%d")));
    prompt
}

/// `fedreg ask`: answer one question against the configured database.
pub async fn run_ask(config: &Config, question: &str, chat_id: Option<&str>) -> Result<()> {
    let facade = open_facade(config).await?;
    let model = Arc::new(OllamaClient::new(&config.agent)?);
    let agent = Agent::new(facade.clone(), model).with_max_sessions(config.agent.max_sessions);

    let chat_id = chat_id
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    let reply = agent.process_message(question, &chat_id).await;
    println!("{}", reply);

    facade.close().await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use fedreg_core::{DocumentInput, InMemoryStore};
    use std::collections::VecDeque;

    /// Replays canned replies and records every conversation it was sent.
    struct ScriptedModel {
        replies: Mutex<VecDeque<Result<String>>>,
        seen: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedModel {
        fn new(replies: Vec<Result<String>>) -> Arc<Self> {
            Arc::new(Self {
                replies: Mutex::new(replies.into()),
                seen: Mutex::new(Vec::new()),
            })
        }

        fn calls(&self) -> Vec<Vec<ChatMessage>> {
            self.seen.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedModel {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.seen.lock().unwrap().push(messages.to_vec());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok("out of script".to_string()))
        }
    }

    fn facade() -> Arc<QueryFacade> {
        let store = InMemoryStore::with_documents(&[DocumentInput {
            document_number: "2024-001".to_string(),
            title: Some("Clean Air Rule".to_string()),
            agencies: vec!["Environmental Protection Agency".to_string()],
            ..Default::default()
        }])
        .unwrap();
        Arc::new(QueryFacade::new(Arc::new(store)))
    }

    fn fenced(body: &str) -> String {
        format!("Let me look that up.\n```json\n{body}\n```\n")
    }

    #[test]
    fn test_extracts_only_well_formed_calls() {
        let text = format!(
            "{}{}```json\n{{ not json }}\n```\n```json\n{{\"name\": \"get_topics\"}}\n```\n```rust\nfn main() {{}}\n```",
            fenced(r#"{"name": "get_agencies", "parameters": {}}"#),
            fenced(r#"{"name": "search_documents", "parameters": {"keywords": "ozone"}}"#),
        );
        let calls = extract_tool_calls(&text);
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0].name, "get_agencies");
        assert_eq!(calls[1].parameters, json!({ "keywords": "ozone" }));
    }

    #[test]
    fn test_plain_text_has_no_calls() {
        assert!(extract_tool_calls("No tools needed here.").is_empty());
    }

    #[test]
    fn test_parse_chat_response() {
        let reply = parse_chat_response(&json!({ "message": { "role": "assistant", "content": "hi" } }));
        assert_eq!(reply.unwrap(), "hi");
        assert!(parse_chat_response(&json!({ "error": "model not found" })).is_err());
    }

    #[test]
    fn test_system_prompt_lists_tools_and_date() {
        let prompt = system_prompt(
            &ToolRegistry::with_builtins(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
        );
        assert!(prompt.contains("1. search_documents - "));
        assert!(prompt.contains("10. search_by_agency_and_topic - "));
        assert!(prompt.contains("Parameters: agency, limit, topic"));
        assert!(prompt.contains("The current date is 2025-01-15."));
    }

    #[tokio::test]
    async fn test_reply_without_tools_is_returned_directly() {
        let model = ScriptedModel::new(vec![Ok("Hello there.".to_string())]);
        let agent = Agent::new(facade(), model.clone());

        let reply = agent.process_message("hi", "chat-1").await;
        assert_eq!(reply, "Hello there.");
        assert_eq!(model.calls().len(), 1);
        assert_eq!(model.calls()[0][0].role, "system");
        assert_eq!(agent.history("chat-1").len(), 2);
    }

    #[tokio::test]
    async fn test_tool_results_feed_second_completion() {
        let model = ScriptedModel::new(vec![
            Ok(fenced(r#"{"name": "get_agencies", "parameters": {}}"#)),
            Ok("The EPA is listed.".to_string()),
        ]);
        let agent = Agent::new(facade(), model.clone());

        let reply = agent.process_message("which agencies?", "chat-1").await;
        assert_eq!(reply, "The EPA is listed.");

        let calls = model.calls();
        assert_eq!(calls.len(), 2);
        let results = calls[1].last().unwrap();
        assert_eq!(results.role, "system");
        assert!(results.content.starts_with("Tool call results: "));
        assert!(results.content.contains("Environmental Protection Agency"));
        assert!(results.content.contains("\"tool_name\":\"get_agencies\""));
    }

    #[tokio::test]
    async fn test_unknown_tool_reports_error_to_model() {
        let agent = Agent::new(facade(), ScriptedModel::new(vec![]));
        let result = agent.execute_tool("delete_everything", json!({})).await;
        assert_eq!(result, json!({ "error": "Tool not found: delete_everything" }));
    }

    #[tokio::test]
    async fn test_model_failure_returns_apology() {
        let model = ScriptedModel::new(vec![Err(anyhow::anyhow!("connection refused"))]);
        let agent = Agent::new(facade(), model);
        assert_eq!(agent.process_message("hi", "chat-1").await, APOLOGY);
    }

    #[tokio::test]
    async fn test_failed_turn_is_not_kept_in_history() {
        let model = ScriptedModel::new(vec![
            Ok("first answer".to_string()),
            Err(anyhow::anyhow!("connection refused")),
            Ok("third answer".to_string()),
        ]);
        let agent = Agent::new(facade(), model.clone());

        agent.process_message("one", "chat-1").await;
        assert_eq!(agent.process_message("two", "chat-1").await, APOLOGY);
        assert_eq!(agent.history("chat-1").len(), 2);

        agent.process_message("three", "chat-1").await;
        let calls = model.calls();
        let roles: Vec<&str> = calls[2].iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(model.calls()[2][3].content, "three");
    }

    #[tokio::test]
    async fn test_sessions_evict_least_recently_used() {
        let model = ScriptedModel::new(vec![]);
        let agent = Agent::new(facade(), model).with_max_sessions(2);

        agent.process_message("hi", "a").await;
        agent.process_message("hi", "b").await;
        agent.process_message("again", "a").await;
        agent.process_message("hi", "c").await;

        assert_eq!(agent.session_count(), 2);
        assert!(agent.history("b").is_empty());
        assert_eq!(agent.history("a").len(), 4);
        assert_eq!(agent.history("c").len(), 2);
    }

    #[tokio::test]
    async fn test_histories_are_per_chat_and_resettable() {
        let model = ScriptedModel::new(vec![
            Ok("one".to_string()),
            Ok("two".to_string()),
            Ok("three".to_string()),
        ]);
        let agent = Agent::new(facade(), model.clone());

        agent.process_message("first", "a").await;
        agent.process_message("second", "b").await;
        agent.process_message("third", "a").await;

        // Third call sees system + a's first exchange + the new question.
        assert_eq!(model.calls()[2].len(), 4);
        assert_eq!(agent.history("a").len(), 4);
        assert_eq!(agent.history("b").len(), 2);

        agent.reset_chat("a");
        assert!(agent.history("a").is_empty());
        assert_eq!(agent.history("b").len(), 2);
    }
}
