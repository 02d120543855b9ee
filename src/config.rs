use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    pub path: PathBuf,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
}

fn default_bind() -> String {
    "127.0.0.1:8000".to_string()
}

/// Settings for the Ollama chat model behind `POST /search` and `fedreg ask`.
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
    #[serde(default = "default_num_predict")]
    pub num_predict: i64,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Conversations kept in memory; the least recently used is dropped first.
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_model(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            num_predict: default_num_predict(),
            timeout_secs: default_timeout_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "llama3".to_string()
}
fn default_temperature() -> f64 {
    0.7
}
fn default_top_p() -> f64 {
    0.9
}
fn default_num_predict() -> i64 {
    1000
}
fn default_timeout_secs() -> u64 {
    120
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    /// A `tracing` filter directive, e.g. `"info"` or `"fedreg_search=debug,sqlx=warn"`.
    #[serde(default = "default_level")]
    pub level: String,
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            ansi: default_ansi(),
        }
    }
}

fn default_max_sessions() -> usize {
    crate::agent::DEFAULT_MAX_SESSIONS
}

fn default_level() -> String {
    "info".to_string()
}
fn default_ansi() -> bool {
    true
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &Config) -> Result<()> {
    if config.db.path.as_os_str().is_empty() {
        anyhow::bail!("db.path must not be empty");
    }

    if config.server.bind.trim().is_empty() {
        anyhow::bail!("server.bind must not be empty");
    }

    let agent = &config.agent;
    if agent.base_url.trim().is_empty() {
        anyhow::bail!("agent.base_url must not be empty");
    }
    if !(0.0..=2.0).contains(&agent.temperature) {
        anyhow::bail!("agent.temperature must be in [0.0, 2.0]");
    }
    if !(agent.top_p > 0.0 && agent.top_p <= 1.0) {
        anyhow::bail!("agent.top_p must be in (0.0, 1.0]");
    }
    if agent.num_predict < 1 {
        anyhow::bail!("agent.num_predict must be >= 1");
    }
    if agent.max_sessions < 1 {
        anyhow::bail!("agent.max_sessions must be >= 1");
    }

    EnvFilter::try_new(&config.logging.level).with_context(|| {
        format!(
            "logging.level is not a valid filter directive: '{}'",
            config.logging.level
        )
    })?;

    Ok(())
}
