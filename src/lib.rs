//! # Federal Registry Search
//!
//! Search over a local SQLite store of Federal Registry documents, exposed
//! through a CLI and a chat-style HTTP API whose model calls the search
//! operations as tools.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────┐   ┌─────────────┐   ┌──────────┐
//! │   CLI    │──▶│            │   │             │   │          │
//! │ (fedreg) │   │ QueryFacade│──▶│ SqliteStore │──▶│  SQLite  │
//! └──────────┘   │  (core)    │   │             │   │          │
//! ┌──────────┐   │            │   └─────────────┘   └──────────┘
//! │   HTTP   │──▶│            │
//! │  /search │   └────────────┘
//! └────┬─────┘         ▲
//!      ▼               │
//!   Agent ──▶ ToolRegistry
//!      │
//!      ▼
//!   Ollama
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing and validation |
//! | [`logging`] | `tracing` subscriber setup |
//! | [`db`] | SQLite pool |
//! | [`migrate`] | Schema bootstrap |
//! | [`sqlite_store`] | SQLite [`DocumentStore`](fedreg_core::DocumentStore) |
//! | [`import`] | JSON document loading |
//! | [`tools`] | Named tools over the query facade |
//! | [`agent`] | Ollama chat agent |
//! | [`server`] | HTTP API |
//! | [`search`], [`get`], [`catalog`] | CLI output |

pub mod agent;
pub mod catalog;
pub mod config;
pub mod db;
pub mod get;
pub mod import;
pub mod logging;
pub mod migrate;
pub mod search;
pub mod server;
pub mod sqlite_store;
pub mod tools;
