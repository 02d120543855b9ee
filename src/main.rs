//! # Federal Registry Search CLI (`fedreg`)
//!
//! ## Usage
//!
//! ```bash
//! fedreg --config ./config/fedreg.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `fedreg init` | Create the SQLite database and schema |
//! | `fedreg import <file>` | Load documents from a JSON file |
//! | `fedreg search [filters]` | Filtered document search |
//! | `fedreg recent` | Newest documents |
//! | `fedreg get <id>` | Print one document |
//! | `fedreg list <catalog>` | Distinct document types, agencies, topics, or presidential types |
//! | `fedreg executive-orders` | Executive orders from the last N days |
//! | `fedreg ask "<question>"` | One chat turn against the local model |
//! | `fedreg serve` | Start the HTTP server |
//!
//! ## Examples
//!
//! ```bash
//! fedreg init
//! fedreg import ./data/documents.json
//! fedreg search --agency "Environmental Protection" --topic "Air" --limit 5
//! fedreg executive-orders --days 7
//! fedreg ask "What executive orders were signed this month?"
//! fedreg serve
//! ```

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use fedreg_core::facade::DEFAULT_EXECUTIVE_ORDER_DAYS;
use fedreg_core::filter::DEFAULT_LIMIT;
use fedreg_core::SearchFilter;
use std::path::PathBuf;

use fedreg_search::catalog::{self, Catalog};
use fedreg_search::{agent, config, get, import, logging, migrate, search, server};

/// Federal Registry Search: query a local store of Federal Registry
/// documents directly or through a chat model.
#[derive(Parser)]
#[command(
    name = "fedreg",
    about = "Federal Registry Search: filtered and chat-driven search over Federal Registry documents",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/fedreg.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema. Safe to run repeatedly.
    Init,

    /// Load documents from a JSON file, upserting by document number.
    Import {
        /// JSON array of documents, or an object with a `results` array.
        file: PathBuf,
    },

    /// Search documents with any combination of filters.
    Search {
        /// Matched against title and abstract.
        #[arg(long)]
        keywords: Option<String>,

        /// Earliest publication date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        from: Option<NaiveDate>,

        /// Latest publication date (YYYY-MM-DD), inclusive.
        #[arg(long)]
        to: Option<NaiveDate>,

        /// Exact document type, e.g. `Rule` or `Executive Order`.
        #[arg(long = "type")]
        document_type: Option<String>,

        #[arg(long)]
        agency: Option<String>,

        #[arg(long)]
        topic: Option<String>,

        #[arg(long)]
        presidential_type: Option<String>,

        /// Exact executive order number.
        #[arg(long)]
        executive_order: Option<String>,

        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: i64,

        #[arg(long, default_value_t = 0)]
        offset: i64,
    },

    /// Show the newest documents.
    Recent {
        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: i64,
    },

    /// Print a document by its numeric ID.
    Get { id: i64 },

    /// List distinct values known to the store.
    List {
        #[arg(value_enum)]
        catalog: Catalog,
    },

    /// Executive orders published in the last N days.
    ExecutiveOrders {
        #[arg(long, default_value_t = DEFAULT_EXECUTIVE_ORDER_DAYS)]
        days: i64,

        #[arg(long, default_value_t = DEFAULT_LIMIT)]
        limit: i64,
    },

    /// Ask the chat agent a question.
    Ask {
        question: String,

        /// Conversation to continue. A new one is started when omitted.
        #[arg(long)]
        chat_id: Option<String>,
    },

    /// Start the HTTP server on `[server].bind`.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    logging::init_logging(&cfg.logging);

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Import { file } => {
            import::run_import(&cfg, &file).await?;
        }
        Commands::Search {
            keywords,
            from,
            to,
            document_type,
            agency,
            topic,
            presidential_type,
            executive_order,
            limit,
            offset,
        } => {
            let filter = SearchFilter {
                keywords,
                date_from: from,
                date_to: to,
                document_type,
                agency,
                topic,
                presidential_doc_type: presidential_type,
                executive_order,
                limit,
                offset,
            };
            search::run_search(&cfg, &filter).await?;
        }
        Commands::Recent { limit } => {
            search::run_recent(&cfg, limit).await?;
        }
        Commands::Get { id } => {
            get::run_get(&cfg, id).await?;
        }
        Commands::List { catalog } => {
            catalog::run_list(&cfg, catalog).await?;
        }
        Commands::ExecutiveOrders { days, limit } => {
            search::run_executive_orders(&cfg, days, limit).await?;
        }
        Commands::Ask { question, chat_id } => {
            agent::run_ask(&cfg, &question, chat_id.as_deref()).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
