//! On-disk layout, JSON document I/O and the record index.
//!
//! # Responsibility
//! - Map record ids to directories and document paths under one root.
//! - Read documents leniently and write them as indented JSON.
//! - Load and persist the denormalized `index.json`.
//!
//! # Invariants
//! - Reads never fail: absent or malformed documents surface as
//!   `DocumentRead` outcomes for the caller to default.
//! - Writes replace a document via temp file + rename.

use crate::model::knowledge_base::KbId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

pub mod document;
pub mod index;

pub use document::{read_document, write_document, DocumentRead};
pub use index::{load_index, save_index};

/// Index file name at the storage root.
pub const INDEX_FILE: &str = "index.json";
/// Per-record metadata document.
pub const META_FILE: &str = "meta.json";
/// Per-record schema document.
pub const SCHEMA_FILE: &str = "schema.json";
/// Per-record prompts document.
pub const PROMPTS_FILE: &str = "prompts.json";

pub type StoreResult<T> = Result<T, StoreError>;

/// Write-side failures. Read-side problems are never reported as errors.
#[derive(Debug)]
pub enum StoreError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    /// The record directory disappeared between writing and reading back.
    NotFound(KbId),
}

impl StoreError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "i/o error at `{}`: {source}", path.display()),
            Self::Serialize { path, source } => {
                write!(f, "failed to serialize `{}`: {source}", path.display())
            }
            Self::NotFound(id) => write!(f, "knowledge base not found: {id}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize { source, .. } => Some(source),
            Self::NotFound(_) => None,
        }
    }
}

/// Path resolution for one storage root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreLayout {
    root: PathBuf,
}

impl StoreLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    /// Directory of one record. Callers must validate `id` first.
    pub fn kb_dir(&self, id: &str) -> PathBuf {
        self.root.join(id)
    }

    pub fn meta_path(&self, id: &str) -> PathBuf {
        self.kb_dir(id).join(META_FILE)
    }

    pub fn schema_path(&self, id: &str) -> PathBuf {
        self.kb_dir(id).join(SCHEMA_FILE)
    }

    pub fn prompts_path(&self, id: &str) -> PathBuf {
        self.kb_dir(id).join(PROMPTS_FILE)
    }

    /// Creates the storage root if missing.
    pub fn ensure_root(&self) -> StoreResult<()> {
        std::fs::create_dir_all(&self.root).map_err(|err| StoreError::io(&self.root, err))
    }
}
