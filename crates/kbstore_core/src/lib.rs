//! Core domain logic for the knowledge base store.
//! This crate is the single source of truth for record layout and defaults.

pub mod config;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;
pub mod store;

pub use config::StoreConfig;
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::knowledge_base::{
    generate_kb_id, is_valid_kb_id, KbId, KbMeta, KbSummary, KnowledgeBase, KnowledgeBasePatch,
    NewKnowledgeBase, Prompts, Schema, Timestamp,
};
pub use repo::kb_repo::{FsKnowledgeBaseRepository, KnowledgeBaseRepository};
pub use service::kb_service::KnowledgeBaseService;
pub use store::{StoreError, StoreResult};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

/// Opens the file-system store described by `config`.
pub fn open_store(config: &StoreConfig) -> KnowledgeBaseService<FsKnowledgeBaseRepository> {
    KnowledgeBaseService::new(FsKnowledgeBaseRepository::from_config(config))
}
