//! `fedreg import <file.json>`: load documents from a local JSON export.
//!
//! The file holds either a JSON array of documents or an object wrapping
//! them in a `results` array. Documents are upserted by `document_number`,
//! so importing the same file twice inserts nothing new. A record that does
//! not parse is logged and skipped; the rest of the file still loads.

use anyhow::{Context, Result};
use fedreg_core::DocumentInput;
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

use crate::config::Config;
use crate::sqlite_store::open_facade;

#[derive(Deserialize)]
#[serde(untagged)]
enum ImportFile {
    Documents(Vec<Value>),
    Page { results: Vec<Value> },
}

/// Records read from an import file.
#[derive(Debug, Default)]
pub struct ParsedDocuments {
    pub documents: Vec<DocumentInput>,
    pub skipped: usize,
}

pub fn read_documents(path: &Path) -> Result<ParsedDocuments> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read import file: {}", path.display()))?;
    parse_documents(&content)
        .with_context(|| format!("Failed to parse import file: {}", path.display()))
}

fn parse_documents(content: &str) -> Result<ParsedDocuments> {
    let file: ImportFile = serde_json::from_str(content).map_err(|_| {
        anyhow::anyhow!("expected a JSON array of documents or an object with a `results` array")
    })?;
    let records = match file {
        ImportFile::Documents(records) => records,
        ImportFile::Page { results } => results,
    };

    let mut parsed = ParsedDocuments::default();
    for (index, record) in records.into_iter().enumerate() {
        let number = record
            .get("document_number")
            .and_then(Value::as_str)
            .unwrap_or("?")
            .to_string();
        match serde_json::from_value::<DocumentInput>(record) {
            Ok(doc) => parsed.documents.push(doc),
            Err(e) => {
                tracing::error!(index, document_number = %number, "Skipping document: {e}");
                parsed.skipped += 1;
            }
        }
    }
    Ok(parsed)
}

pub async fn run_import(config: &Config, path: &Path) -> Result<()> {
    let ParsedDocuments { documents, skipped } = read_documents(path)?;
    let facade = open_facade(config).await?;
    let inserted = facade
        .store()
        .store_documents(&documents)
        .await
        .with_context(|| "Failed to store documents")?;
    facade.close().await?;

    println!(
        "Imported {} documents ({} new) from {}",
        documents.len(),
        inserted,
        path.display()
    );
    if skipped > 0 {
        println!("Skipped {} malformed documents", skipped);
    }
    Ok(())
}
