//! Command-line front end for the knowledge base store.
//!
//! # Responsibility
//! - Map subcommands onto `KnowledgeBaseService` operations.
//! - Print results as pretty JSON; report not-found on stderr with exit code 1.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use kbstore_core::{
    core_version, default_log_level, init_logging, open_store, FsKnowledgeBaseRepository,
    KnowledgeBasePatch, KnowledgeBaseService, Prompts, Schema, StoreConfig,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "kbstore")]
#[command(about = "File-system knowledge base store", long_about = None)]
#[command(version)]
struct Cli {
    /// Storage root (defaults to $KB_STORE_ROOT or ./kb_store)
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Log level: trace|debug|info|warn|error
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// Absolute directory for rolling log files; logging is off without it
    #[arg(long, global = true)]
    log_dir: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List knowledge base summaries
    List,

    /// Show one knowledge base with schema and prompts
    Show { id: String },

    /// Create a knowledge base
    Create {
        #[arg(long)]
        name: String,

        #[arg(long)]
        dataset: String,

        /// JSON file with {Nodes, Relations, Attributes}
        #[arg(long)]
        schema_file: Option<PathBuf>,

        /// JSON file with {construction, decomposition, retrieval}
        #[arg(long)]
        prompts_file: Option<PathBuf>,
    },

    /// Update selected fields of a knowledge base
    Update {
        id: String,

        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        dataset: Option<String>,

        #[arg(long)]
        schema_file: Option<PathBuf>,

        #[arg(long)]
        prompts_file: Option<PathBuf>,
    },

    /// Delete a knowledge base and its directory
    Delete { id: String },

    /// Print the path of a knowledge base's schema.json
    SchemaPath { id: String },

    /// Print a knowledge base's schema
    Schema {
        id: String,

        /// Print schema.json as stored instead of the parsed vocabulary
        #[arg(long)]
        raw: bool,
    },

    /// Print a knowledge base's prompts
    Prompts { id: String },

    /// Regenerate index.json from record directories
    Reindex,

    /// Print the core library version
    Version,
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        let level = cli.log_level.as_deref().unwrap_or(default_log_level());
        init_logging(level, log_dir).context("failed to initialize logging")?;
    }

    let config = match cli.root {
        Some(root) => StoreConfig::new(root),
        None => StoreConfig::from_env(),
    };
    let service = open_store(&config);

    run(&service, cli.command)
}

fn run(
    service: &KnowledgeBaseService<FsKnowledgeBaseRepository>,
    command: Commands,
) -> Result<ExitCode> {
    match command {
        Commands::List => print_json(&service.list_knowledge_bases()?),
        Commands::Show { id } => print_found(&id, service.get_knowledge_base(&id)?),
        Commands::Create {
            name,
            dataset,
            schema_file,
            prompts_file,
        } => {
            let schema = read_optional::<Schema>(schema_file.as_deref())?;
            let prompts = read_optional::<Prompts>(prompts_file.as_deref())?;
            print_json(&service.create_knowledge_base(name, dataset, schema, prompts)?)
        }
        Commands::Update {
            id,
            name,
            dataset,
            schema_file,
            prompts_file,
        } => {
            let patch = KnowledgeBasePatch {
                name,
                dataset_name: dataset,
                schema: read_optional(schema_file.as_deref())?,
                prompts: read_optional(prompts_file.as_deref())?,
            };
            print_found(&id, service.update_knowledge_base(&id, &patch)?)
        }
        Commands::Delete { id } => {
            if service.delete_knowledge_base(&id)? {
                println!("deleted {id}");
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(not_found(&id))
            }
        }
        Commands::SchemaPath { id } => match service.schema_path_for(&id) {
            Some(path) => {
                println!("{}", path.display());
                Ok(ExitCode::SUCCESS)
            }
            None => Ok(not_found(&id)),
        },
        Commands::Schema { id, raw: false } => print_found(&id, service.schema_for(&id)?),
        Commands::Schema { id, raw: true } => {
            print_found(&id, service.schema_document_for(&id)?)
        }
        Commands::Prompts { id } => print_found(&id, service.prompts_for(&id)?),
        Commands::Reindex => print_json(&service.rebuild_index()?),
        Commands::Version => {
            println!("kbstore_core version={}", core_version());
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn read_optional<T: DeserializeOwned>(path: Option<&Path>) -> Result<Option<T>> {
    let Some(path) = path else {
        return Ok(None);
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let value = serde_json::from_str(&text)
        .with_context(|| format!("failed to parse {}", path.display()))?;
    Ok(Some(value))
}

fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<ExitCode> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(ExitCode::SUCCESS)
}

fn print_found<T: Serialize>(id: &str, value: Option<T>) -> Result<ExitCode> {
    match value {
        Some(value) => print_json(&value),
        None => Ok(not_found(id)),
    }
}

fn not_found(id: &str) -> ExitCode {
    log::info!("event=cli_lookup module=cli status=not_found kb_id={id}");
    eprintln!("knowledge base not found: {id}");
    ExitCode::FAILURE
}
