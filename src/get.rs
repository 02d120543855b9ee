//! `fedreg get <id>`: print one document in full.

use anyhow::Result;
use fedreg_core::Document;

use crate::config::Config;
use crate::sqlite_store::open_facade;

pub async fn run_get(config: &Config, id: i64) -> Result<()> {
    let facade = open_facade(config).await?;
    let found = facade.try_by_id(id).await;
    facade.close().await?;

    match found? {
        Some(doc) => {
            print_document(&doc);
            Ok(())
        }
        None => {
            eprintln!("Error: document {} not found", id);
            std::process::exit(1);
        }
    }
}

fn field(label: &str, value: Option<&str>) {
    if let Some(v) = value.filter(|v| !v.is_empty()) {
        println!("{:<28}{}", format!("{}:", label), v);
    }
}

fn print_document(doc: &Document) {
    let publication_date = doc.publication_date.map(|d| d.to_string());
    let signing_date = doc.signing_date.map(|d| d.to_string());

    println!("--- Document ---");
    println!("{:<28}{}", "id:", doc.id);
    println!("{:<28}{}", "document_number:", doc.document_number);
    field("document_type", doc.document_type.as_deref());
    field("title", doc.title.as_deref());
    field("publication_date", publication_date.as_deref());
    field("presidential_document_type", doc.presidential_document_type.as_deref());
    field("executive_order_number", doc.executive_order_number.as_deref());
    field("signing_date", signing_date.as_deref());
    field("html_url", doc.html_url.as_deref());
    field("pdf_url", doc.pdf_url.as_deref());
    field("full_text_xml_url", doc.full_text_xml_url.as_deref());
    if !doc.agencies.is_empty() {
        println!("{:<28}{}", "agencies:", doc.agencies.join(", "));
    }
    if !doc.topics.is_empty() {
        println!("{:<28}{}", "topics:", doc.topics.join(", "));
    }
    println!();

    println!("--- Abstract ---");
    println!("{}", doc.abstract_text.as_deref().unwrap_or("(none)"));
}
