//! # Federal Registry Search Core
//!
//! Runtime-agnostic logic shared by every front end: the document model,
//! the structured [`filter::SearchFilter`], the [`store::DocumentStore`]
//! abstraction, and the [`facade::QueryFacade`] that turns high-level
//! lookup intents into store calls.
//!
//! This crate contains no tokio, sqlx, or HTTP dependencies. The SQLite
//! backend, configuration, and servers live in the `fedreg-search` crate.

pub mod error;
pub mod facade;
pub mod filter;
pub mod models;
pub mod store;

pub use error::StoreFailure;
pub use facade::QueryFacade;
pub use filter::SearchFilter;
pub use models::{Document, DocumentInput, DocumentSummary};
pub use store::memory::InMemoryStore;
pub use store::DocumentStore;
