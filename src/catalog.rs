//! `fedreg list <catalog>`: distinct values known to the store.

use anyhow::Result;
use clap::ValueEnum;

use crate::config::Config;
use crate::sqlite_store::open_facade;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Catalog {
    DocumentTypes,
    Agencies,
    Topics,
    PresidentialTypes,
}

pub async fn run_list(config: &Config, catalog: Catalog) -> Result<()> {
    let facade = open_facade(config).await?;
    let values = match catalog {
        Catalog::DocumentTypes => facade.list_document_types().await,
        Catalog::Agencies => facade.list_agencies().await,
        Catalog::Topics => facade.list_topics().await,
        Catalog::PresidentialTypes => facade.list_presidential_doc_types().await,
    };
    facade.close().await?;

    if values.is_empty() {
        println!("No entries.");
    }
    for value in values {
        println!("{}", value);
    }
    Ok(())
}
