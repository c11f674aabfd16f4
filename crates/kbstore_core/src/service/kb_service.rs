//! Knowledge base use-case service.
//!
//! # Responsibility
//! - Provide stable CRUD entry points for request-handling callers.
//! - Expose narrow schema/prompt accessors for downstream extraction code.
//!
//! # Invariants
//! - Service APIs never bypass repository persistence contracts.
//! - Accessors return `None` only when the record itself does not exist.

use crate::model::knowledge_base::{
    KbSummary, KnowledgeBase, KnowledgeBasePatch, NewKnowledgeBase, Prompts, Schema,
};
use crate::repo::kb_repo::KnowledgeBaseRepository;
use crate::store::StoreResult;
use serde_json::Value;
use std::path::PathBuf;

/// Use-case service wrapper for knowledge base operations.
pub struct KnowledgeBaseService<R: KnowledgeBaseRepository> {
    repo: R,
}

impl<R: KnowledgeBaseRepository> KnowledgeBaseService<R> {
    /// Creates a service using the provided repository implementation.
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Lists record summaries in index order.
    pub fn list_knowledge_bases(&self) -> StoreResult<Vec<KbSummary>> {
        self.repo.list_knowledge_bases()
    }

    /// Gets one full record, or `None` when its directory is absent.
    pub fn get_knowledge_base(&self, id: &str) -> StoreResult<Option<KnowledgeBase>> {
        self.repo.get_knowledge_base(id)
    }

    /// Creates a record with a generated id.
    ///
    /// # Contract
    /// - `None` schema/prompts persist the defaults.
    /// - Returns the record as read back from disk.
    pub fn create_knowledge_base(
        &self,
        name: impl Into<String>,
        dataset_name: impl Into<String>,
        schema: Option<Schema>,
        prompts: Option<Prompts>,
    ) -> StoreResult<KnowledgeBase> {
        let request = NewKnowledgeBase {
            name: name.into(),
            dataset_name: dataset_name.into(),
            schema,
            prompts,
        };
        self.repo.create_knowledge_base(&request)
    }

    /// Applies a partial update.
    ///
    /// # Contract
    /// - Unset patch fields are left untouched.
    /// - A set schema or prompts replaces the whole document.
    /// - `updated_at` is refreshed even for an empty patch.
    pub fn update_knowledge_base(
        &self,
        id: &str,
        patch: &KnowledgeBasePatch,
    ) -> StoreResult<Option<KnowledgeBase>> {
        self.repo.update_knowledge_base(id, patch)
    }

    /// Deletes a record. Returns `false` when it did not exist.
    pub fn delete_knowledge_base(&self, id: &str) -> StoreResult<bool> {
        self.repo.delete_knowledge_base(id)
    }

    /// File-system path of the record's schema document, for collaborators
    /// that load schemas by path. No parsing happens here.
    pub fn schema_path_for(&self, id: &str) -> Option<PathBuf> {
        self.repo.schema_path(id)
    }

    /// Parsed schema of an existing record (default when its file is absent).
    pub fn schema_for(&self, id: &str) -> StoreResult<Option<Schema>> {
        Ok(self.repo.get_knowledge_base(id)?.map(|kb| kb.schema))
    }

    /// Schema of an existing record as stored, without narrowing it to
    /// string lists.
    pub fn schema_document_for(&self, id: &str) -> StoreResult<Option<Value>> {
        self.repo.schema_document(id)
    }

    /// Parsed prompts of an existing record (empty templates when absent).
    pub fn prompts_for(&self, id: &str) -> StoreResult<Option<Prompts>> {
        Ok(self.repo.get_knowledge_base(id)?.map(|kb| kb.prompts))
    }

    /// Regenerates the index from record directories on disk.
    pub fn rebuild_index(&self) -> StoreResult<Vec<KbSummary>> {
        self.repo.rebuild_index()
    }
}
