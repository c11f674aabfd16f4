//! Knowledge base repository contract and file-system implementation.
//!
//! # Responsibility
//! - Provide CRUD over record directories plus the denormalized index.
//! - Keep file layout and JSON details inside the persistence boundary.
//!
//! # Invariants
//! - A present record directory means the record exists, whatever the index
//!   says.
//! - Metadata wins over index entries; the index only lists known ids.
//! - Read paths default or omit malformed documents instead of failing.
//! - Mutations of one repository instance are serialized by `write_lock`.

use crate::config::StoreConfig;
use crate::model::knowledge_base::{
    generate_kb_id, is_valid_kb_id, now_utc, timestamp_value, KbId, KbMeta, KbSummary,
    KnowledgeBase, KnowledgeBasePatch, NewKnowledgeBase, Prompts, RawMeta, Schema,
};
use crate::store::{
    load_index, read_document, save_index, write_document, DocumentRead, StoreError,
    StoreLayout, StoreResult,
};
use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

/// Repository interface for knowledge base records.
pub trait KnowledgeBaseRepository {
    fn list_knowledge_bases(&self) -> StoreResult<Vec<KbSummary>>;
    fn get_knowledge_base(&self, id: &str) -> StoreResult<Option<KnowledgeBase>>;
    fn create_knowledge_base(&self, request: &NewKnowledgeBase) -> StoreResult<KnowledgeBase>;
    fn update_knowledge_base(
        &self,
        id: &str,
        patch: &KnowledgeBasePatch,
    ) -> StoreResult<Option<KnowledgeBase>>;
    fn delete_knowledge_base(&self, id: &str) -> StoreResult<bool>;
    /// Path of the record's schema document, if that file exists.
    fn schema_path(&self, id: &str) -> Option<PathBuf>;
    /// Schema document exactly as stored, for vocabularies that do not fit
    /// `Schema`. The default schema when the file is missing or not JSON.
    fn schema_document(&self, id: &str) -> StoreResult<Option<Value>>;
    /// Regenerates the index from the record directories on disk.
    fn rebuild_index(&self) -> StoreResult<Vec<KbSummary>>;
}

/// Directory-per-record repository rooted at one storage path.
#[derive(Debug)]
pub struct FsKnowledgeBaseRepository {
    layout: StoreLayout,
    write_lock: Mutex<()>,
}

impl FsKnowledgeBaseRepository {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: StoreLayout::new(root),
            write_lock: Mutex::new(()),
        }
    }

    pub fn from_config(config: &StoreConfig) -> Self {
        Self::new(config.root.clone())
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        // Poisoning is ignored: the lock guards no in-memory state.
        self.write_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the record directory when `id` is valid and the directory exists.
    fn existing_kb_dir(&self, id: &str) -> Option<PathBuf> {
        if !is_valid_kb_id(id) {
            warn!("event=kb_lookup module=repo status=rejected error=invalid_id");
            return None;
        }
        let dir = self.layout.kb_dir(id);
        dir.is_dir().then_some(dir)
    }

    fn read_meta(&self, id: &str) -> Option<KbMeta> {
        match read_document::<KbMeta>(&self.layout.meta_path(id)) {
            DocumentRead::Loaded(meta) => Some(meta),
            DocumentRead::Missing => None,
            DocumentRead::Malformed(reason) => {
                warn!("event=kb_meta_load module=repo status=error kb_id={id} error={reason}");
                None
            }
        }
    }

    /// Stored `meta.json` object; empty when missing, malformed or not an object.
    fn read_raw_meta(&self, id: &str) -> RawMeta {
        match read_document::<Value>(&self.layout.meta_path(id)) {
            DocumentRead::Loaded(Value::Object(raw)) => raw,
            DocumentRead::Loaded(_) => {
                warn!("event=kb_meta_load module=repo status=error kb_id={id} error=not_an_object");
                RawMeta::new()
            }
            DocumentRead::Missing => RawMeta::new(),
            DocumentRead::Malformed(reason) => {
                warn!("event=kb_meta_load module=repo status=error kb_id={id} error={reason}");
                RawMeta::new()
            }
        }
    }

    fn read_schema(&self, id: &str) -> Schema {
        match read_document::<Value>(&self.layout.schema_path(id)) {
            DocumentRead::Loaded(raw) => match Schema::deserialize(&raw) {
                Ok(schema) => schema,
                Err(err) => {
                    warn!(
                        "event=kb_schema_load module=repo status=error kb_id={id} keys={} error={err}",
                        Schema::invalid_keys(&raw).join(",")
                    );
                    Schema::default()
                }
            },
            DocumentRead::Missing => Schema::default(),
            DocumentRead::Malformed(reason) => {
                warn!("event=kb_schema_load module=repo status=error kb_id={id} error={reason}");
                Schema::default()
            }
        }
    }

    fn read_prompts(&self, id: &str) -> Prompts {
        match read_document::<Prompts>(&self.layout.prompts_path(id)) {
            DocumentRead::Loaded(prompts) => prompts,
            DocumentRead::Missing => Prompts::default(),
            DocumentRead::Malformed(reason) => {
                warn!("event=kb_prompts_load module=repo status=error kb_id={id} error={reason}");
                Prompts::default()
            }
        }
    }

    fn load_record(&self, id: &str) -> KnowledgeBase {
        let meta = self.read_meta(id).unwrap_or_default();
        KnowledgeBase {
            id: id.to_string(),
            name: meta.name,
            dataset_name: meta.dataset_name,
            created_at: meta.created_at,
            updated_at: meta.updated_at,
            schema: self.read_schema(id),
            prompts: self.read_prompts(id),
        }
    }

    fn reload(&self, id: &str) -> StoreResult<KnowledgeBase> {
        self.get_knowledge_base(id)?
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }
}

impl KnowledgeBaseRepository for FsKnowledgeBaseRepository {
    fn list_knowledge_bases(&self) -> StoreResult<Vec<KbSummary>> {
        let index = load_index(&self.layout);
        let summaries: Vec<KbSummary> = index
            .iter()
            .map(|entry| {
                if !is_valid_kb_id(&entry.id) {
                    return entry.clone();
                }
                match self.read_meta(&entry.id) {
                    Some(meta) => entry.merged_with(&meta),
                    None => entry.clone(),
                }
            })
            .collect();

        debug!(
            "event=kb_list module=repo status=ok count={}",
            summaries.len()
        );
        Ok(summaries)
    }

    fn get_knowledge_base(&self, id: &str) -> StoreResult<Option<KnowledgeBase>> {
        if self.existing_kb_dir(id).is_none() {
            return Ok(None);
        }
        Ok(Some(self.load_record(id)))
    }

    fn create_knowledge_base(&self, request: &NewKnowledgeBase) -> StoreResult<KnowledgeBase> {
        let _guard = self.lock_writes();
        self.layout.ensure_root()?;

        let id: KbId = generate_kb_id();
        let kb_dir = self.layout.kb_dir(&id);
        fs::create_dir_all(&kb_dir).map_err(|err| StoreError::io(&kb_dir, err))?;

        let meta = KbMeta::new_record(
            id.as_str(),
            request.name.as_str(),
            request.dataset_name.as_str(),
            now_utc(),
        );
        write_document(&self.layout.meta_path(&id), &meta)?;

        let schema = request.schema.clone().unwrap_or_default();
        write_document(&self.layout.schema_path(&id), &schema)?;
        let prompts = request.prompts.clone().unwrap_or_default();
        write_document(&self.layout.prompts_path(&id), &prompts)?;

        let mut index = load_index(&self.layout);
        index.push(KbSummary::from_meta(&id, &meta));
        save_index(&self.layout, &index)?;

        info!("event=kb_create module=repo status=ok kb_id={id}");
        self.reload(&id)
    }

    fn update_knowledge_base(
        &self,
        id: &str,
        patch: &KnowledgeBasePatch,
    ) -> StoreResult<Option<KnowledgeBase>> {
        let _guard = self.lock_writes();
        if self.existing_kb_dir(id).is_none() {
            return Ok(None);
        }

        let mut index = load_index(&self.layout);
        let position = index.iter().position(|entry| entry.id == id);

        let indexed_created_at = position.and_then(|pos| index[pos].created_at);
        let mut raw_meta = self.read_raw_meta(id);
        patch.apply_to(&mut raw_meta);
        raw_meta.insert("id".to_string(), Value::String(id.to_string()));
        if raw_meta.get("created_at").map_or(true, Value::is_null) {
            if let Some(created_at) = indexed_created_at {
                raw_meta.insert("created_at".to_string(), timestamp_value(created_at));
            }
        }
        raw_meta.insert("updated_at".to_string(), timestamp_value(now_utc()));
        write_document(&self.layout.meta_path(id), &raw_meta)?;

        if let Some(schema) = &patch.schema {
            write_document(&self.layout.schema_path(id), schema)?;
        }
        if let Some(prompts) = &patch.prompts {
            write_document(&self.layout.prompts_path(id), prompts)?;
        }

        let mut meta = serde_json::from_value::<KbMeta>(Value::Object(raw_meta))
            .unwrap_or_else(|err| {
                warn!("event=kb_meta_load module=repo status=error kb_id={id} error={err}");
                KbMeta::default()
            });
        meta.created_at = meta.created_at.or(indexed_created_at);
        let summary = KbSummary::from_meta(id, &meta);
        match position {
            Some(pos) => index[pos] = summary,
            None => {
                info!("event=kb_index_repair module=repo status=ok kb_id={id} action=insert");
                index.push(summary);
            }
        }
        save_index(&self.layout, &index)?;

        info!("event=kb_update module=repo status=ok kb_id={id}");
        self.reload(id).map(Some)
    }

    fn delete_knowledge_base(&self, id: &str) -> StoreResult<bool> {
        let _guard = self.lock_writes();
        let Some(kb_dir) = self.existing_kb_dir(id) else {
            return Ok(false);
        };

        fs::remove_dir_all(&kb_dir).map_err(|err| StoreError::io(&kb_dir, err))?;

        let mut index = load_index(&self.layout);
        index.retain(|entry| entry.id != id);
        save_index(&self.layout, &index)?;

        info!("event=kb_delete module=repo status=ok kb_id={id}");
        Ok(true)
    }

    fn schema_path(&self, id: &str) -> Option<PathBuf> {
        if !is_valid_kb_id(id) {
            return None;
        }
        let path = self.layout.schema_path(id);
        path.is_file().then_some(path)
    }

    fn schema_document(&self, id: &str) -> StoreResult<Option<Value>> {
        if self.existing_kb_dir(id).is_none() {
            return Ok(None);
        }
        let path = self.layout.schema_path(id);
        let raw = match read_document::<Value>(&path) {
            DocumentRead::Loaded(raw) => raw,
            DocumentRead::Missing => Value::Null,
            DocumentRead::Malformed(reason) => {
                warn!("event=kb_schema_load module=repo status=error kb_id={id} error={reason}");
                Value::Null
            }
        };
        if !raw.is_null() {
            return Ok(Some(raw));
        }
        serde_json::to_value(Schema::default())
            .map(Some)
            .map_err(|source| StoreError::Serialize { path, source })
    }

    fn rebuild_index(&self) -> StoreResult<Vec<KbSummary>> {
        let _guard = self.lock_writes();
        let previous = load_index(&self.layout);

        let mut present = Vec::new();
        match fs::read_dir(self.layout.root()) {
            Ok(entries) => {
                for entry in entries {
                    let entry = entry.map_err(|err| StoreError::io(self.layout.root(), err))?;
                    if !entry.path().is_dir() {
                        continue;
                    }
                    let Some(id) = entry.file_name().to_str().map(str::to_string) else {
                        continue;
                    };
                    if is_valid_kb_id(&id) {
                        present.push(id);
                    }
                }
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(StoreError::io(self.layout.root(), err)),
        }

        let summary_for = |id: &str| {
            let meta = self.read_meta(id).unwrap_or_default();
            match previous.iter().find(|entry| entry.id == id) {
                Some(entry) => entry.merged_with(&meta),
                None => KbSummary::from_meta(id, &meta),
            }
        };

        // Known ids keep their index position; newly found ones follow in
        // creation order.
        let mut seen = HashSet::new();
        let mut rebuilt: Vec<KbSummary> = previous
            .iter()
            .filter(|entry| present.contains(&entry.id) && seen.insert(entry.id.clone()))
            .map(|entry| summary_for(entry.id.as_str()))
            .collect();
        let kept_count = rebuilt.len();

        let mut discovered: Vec<KbSummary> = present
            .iter()
            .filter(|id| !seen.contains(*id))
            .map(|id| summary_for(id.as_str()))
            .collect();
        discovered.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        let discovered_count = discovered.len();
        rebuilt.extend(discovered);

        save_index(&self.layout, &rebuilt)?;
        info!(
            "event=kb_index_rebuild module=repo status=ok count={} discovered={} dropped={}",
            rebuilt.len(),
            discovered_count,
            previous.len() - kept_count
        );
        Ok(rebuilt)
    }
}

#[cfg(test)]
mod tests {
    use super::{FsKnowledgeBaseRepository, KnowledgeBaseRepository};
    use crate::model::knowledge_base::NewKnowledgeBase;

    #[test]
    fn invalid_ids_are_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsKnowledgeBaseRepository::new(dir.path().join("store"));
        std::fs::create_dir_all(dir.path().join("outside")).unwrap();

        assert!(repo.get_knowledge_base("../outside").unwrap().is_none());
        assert!(!repo.delete_knowledge_base("../outside").unwrap());
        assert!(repo.schema_path("../outside").is_none());
        assert!(dir.path().join("outside").exists());
    }

    #[test]
    fn create_writes_three_documents_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let repo = FsKnowledgeBaseRepository::new(dir.path());

        let kb = repo
            .create_knowledge_base(&NewKnowledgeBase::new("Movies", "imdb_sample"))
            .unwrap();

        let kb_dir = dir.path().join(&kb.id);
        assert!(kb_dir.join("meta.json").is_file());
        assert!(kb_dir.join("schema.json").is_file());
        assert!(kb_dir.join("prompts.json").is_file());
        assert!(dir.path().join("index.json").is_file());
    }
}
