//! Document search commands.
//!
//! `fedreg search`, `fedreg recent`, and `fedreg executive-orders` all open
//! the configured store, run one facade lookup, and print the hits
//! newest first. A store failure is logged by the facade and shows up here
//! as "No documents found."

use anyhow::Result;
use fedreg_core::{Document, QueryFacade, SearchFilter};
use std::future::Future;
use std::sync::Arc;

use crate::config::Config;
use crate::sqlite_store::open_facade;

pub async fn run_search(config: &Config, filter: &SearchFilter) -> Result<()> {
    run_with_facade(config, |facade| async move { facade.search(filter).await }).await
}

pub async fn run_recent(config: &Config, limit: i64) -> Result<()> {
    run_with_facade(config, |facade| async move { facade.recent(limit).await }).await
}

pub async fn run_executive_orders(config: &Config, days: i64, limit: i64) -> Result<()> {
    run_with_facade(config, |facade| async move {
        facade.recent_executive_orders(days, limit).await
    })
    .await
}

async fn run_with_facade<F, Fut>(config: &Config, lookup: F) -> Result<()>
where
    F: FnOnce(Arc<QueryFacade>) -> Fut,
    Fut: Future<Output = Vec<Document>>,
{
    let facade = open_facade(config).await?;
    let documents = lookup(facade.clone()).await;
    print_documents(&documents);
    facade.close().await?;
    Ok(())
}

pub fn print_documents(documents: &[Document]) {
    if documents.is_empty() {
        println!("No documents found.");
        return;
    }

    for (i, doc) in documents.iter().enumerate() {
        println!("{}", headline(i + 1, doc));
        println!("    id: {}  number: {}", doc.id, doc.document_number);
        if let Some(eo) = doc.executive_order_number.as_deref().filter(|s| !s.is_empty()) {
            println!("    executive order: {}", eo);
        }
        if !doc.agencies.is_empty() {
            println!("    agencies: {}", doc.agencies.join(", "));
        }
        if !doc.topics.is_empty() {
            println!("    topics: {}", doc.topics.join(", "));
        }
        if let Some(url) = doc.html_url.as_deref() {
            println!("    url: {}", url);
        }
        println!();
    }
}

fn headline(rank: usize, doc: &Document) -> String {
    let date = doc
        .publication_date
        .map(|d| d.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| "----------".to_string());
    let doc_type = doc.document_type.as_deref().unwrap_or("Document");
    let title = doc.title.as_deref().unwrap_or("(untitled)");
    format!("{}. [{}] {} / {}", rank, date, doc_type, title)
}
