//! Knowledge base domain model.
//!
//! # Responsibility
//! - Define the full record, its summary projection and the three on-disk
//!   documents (`meta.json`, `schema.json`, `prompts.json`).
//! - Own the default vocabularies and empty prompt templates.
//!
//! # Invariants
//! - `id` is assigned at creation and never changes.
//! - `created_at <= updated_at` whenever both are present.
//! - Default construction lives here only; readers never invent defaults.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Opaque knowledge base identifier (also the record directory name).
pub type KbId = String;

/// UTC timestamp, serialized as ISO-8601 with a trailing `Z`.
pub type Timestamp = DateTime<Utc>;

/// `meta.json` as stored, every key preserved.
pub type RawMeta = Map<String, Value>;

/// Length of generated identifiers.
pub const KB_ID_LEN: usize = 8;

const MAX_KB_ID_LEN: usize = 64;

const DEFAULT_NODES: &[&str] = &[
    "person",
    "location",
    "organization",
    "event",
    "object",
    "concept",
    "time_period",
    "creative_work",
    "biological_entity",
    "natural_phenomenon",
];

const DEFAULT_RELATIONS: &[&str] = &[
    "is_a",
    "part_of",
    "located_in",
    "created_by",
    "used_by",
    "participates_in",
    "related_to",
    "belongs_to",
    "influences",
    "precedes",
    "arrives_in",
    "comparable_to",
];

const DEFAULT_ATTRIBUTES: &[&str] = &[
    "name",
    "date",
    "size",
    "type",
    "description",
    "status",
    "quantity",
    "value",
    "position",
    "duration",
    "time",
];

/// Generates a short identifier from the leading segment of a random UUID.
///
/// Collisions are not checked; 32 bits of randomness is accepted as enough
/// for a single deployment.
pub fn generate_kb_id() -> KbId {
    Uuid::new_v4()
        .simple()
        .to_string()
        .chars()
        .take(KB_ID_LEN)
        .collect()
}

/// Returns whether `id` can safely name a record directory under the root.
///
/// Accepts ASCII alphanumerics, `-` and `_` only, so ids can never contain
/// path separators or `..`.
pub fn is_valid_kb_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_KB_ID_LEN
        && id
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_')
}

/// Current time in UTC.
pub fn now_utc() -> Timestamp {
    Utc::now()
}

/// Renders a timestamp exactly as serde writes it into JSON documents.
pub fn timestamp_value(timestamp: Timestamp) -> Value {
    Value::String(timestamp.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Vocabulary of allowed node, relation and attribute types.
///
/// Missing keys deserialize as empty lists. `Schema::default()` is the
/// built-in vocabulary, not an empty one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "Nodes", default)]
    pub nodes: Vec<String>,
    #[serde(rename = "Relations", default)]
    pub relations: Vec<String>,
    #[serde(rename = "Attributes", default)]
    pub attributes: Vec<String>,
}

impl Default for Schema {
    fn default() -> Self {
        Self {
            nodes: to_owned_list(DEFAULT_NODES),
            relations: to_owned_list(DEFAULT_RELATIONS),
            attributes: to_owned_list(DEFAULT_ATTRIBUTES),
        }
    }
}

impl Schema {
    /// Keys whose value is present but not a list of strings. A non-object
    /// document reports every key.
    pub fn invalid_keys(raw: &Value) -> Vec<&'static str> {
        let keys = ["Nodes", "Relations", "Attributes"];
        let Some(object) = raw.as_object() else {
            return keys.to_vec();
        };
        keys.into_iter()
            .filter(|key| match object.get(*key) {
                None => false,
                Some(Value::Array(items)) => !items.iter().all(Value::is_string),
                Some(_) => true,
            })
            .collect()
    }
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|item| (*item).to_string()).collect()
}

/// Prompt templates for downstream construction/decomposition/retrieval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Prompts {
    pub construction: String,
    pub decomposition: String,
    pub retrieval: String,
}

/// Contents of `meta.json`.
///
/// Every field is optional so hand-edited or partially written files still
/// load; unparsable timestamps read as absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbMeta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<KbId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub created_at: Option<Timestamp>,
    #[serde(
        default,
        deserialize_with = "lenient_timestamp",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_at: Option<Timestamp>,
}

impl KbMeta {
    /// Metadata for a freshly created record, both timestamps set to `now`.
    pub fn new_record(
        id: impl Into<KbId>,
        name: impl Into<String>,
        dataset_name: impl Into<String>,
        now: Timestamp,
    ) -> Self {
        Self {
            id: Some(id.into()),
            name: Some(name.into()),
            dataset_name: Some(dataset_name.into()),
            created_at: Some(now),
            updated_at: Some(now),
        }
    }
}

/// Lightweight listing projection; also the shape of one `index.json` entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KbSummary {
    pub id: KbId,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub dataset_name: String,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub created_at: Option<Timestamp>,
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub updated_at: Option<Timestamp>,
}

impl KbSummary {
    /// Builds a summary from metadata alone. Name falls back to the id.
    pub fn from_meta(id: &str, meta: &KbMeta) -> Self {
        Self {
            id: id.to_string(),
            name: meta.name.clone().unwrap_or_else(|| id.to_string()),
            dataset_name: meta.dataset_name.clone().unwrap_or_default(),
            created_at: meta.created_at,
            updated_at: meta.updated_at,
        }
    }

    /// Merges metadata over this summary, metadata winning field by field.
    pub fn merged_with(&self, meta: &KbMeta) -> Self {
        Self {
            id: self.id.clone(),
            name: meta.name.clone().unwrap_or_else(|| self.name.clone()),
            dataset_name: meta
                .dataset_name
                .clone()
                .unwrap_or_else(|| self.dataset_name.clone()),
            created_at: meta.created_at.or(self.created_at),
            updated_at: meta.updated_at.or(self.updated_at),
        }
    }
}

/// Full knowledge base record as returned by detail reads.
///
/// Metadata fields are `None` when `meta.json` is missing or malformed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeBase {
    pub id: KbId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataset_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<Timestamp>,
    pub schema: Schema,
    pub prompts: Prompts,
}

/// Create request. `None` schema/prompts fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKnowledgeBase {
    pub name: String,
    pub dataset_name: String,
    pub schema: Option<Schema>,
    pub prompts: Option<Prompts>,
}

impl NewKnowledgeBase {
    pub fn new(name: impl Into<String>, dataset_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            dataset_name: dataset_name.into(),
            schema: None,
            prompts: None,
        }
    }
}

/// Partial update. Unset fields are left untouched; a set schema or prompts
/// replaces the whole document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeBasePatch {
    pub name: Option<String>,
    pub dataset_name: Option<String>,
    pub schema: Option<Schema>,
    pub prompts: Option<Prompts>,
}

impl KnowledgeBasePatch {
    /// Patch that only renames the record.
    pub fn rename(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Applies name/dataset changes to a stored `meta.json` object. Keys the
    /// patch does not name, including unknown ones, are left as they are.
    pub fn apply_to(&self, meta: &mut RawMeta) {
        if let Some(name) = &self.name {
            meta.insert("name".to_string(), Value::String(name.clone()));
        }
        if let Some(dataset_name) = &self.dataset_name {
            meta.insert(
                "dataset_name".to_string(),
                Value::String(dataset_name.clone()),
            );
        }
    }
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<Timestamp>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw
        .as_ref()
        .and_then(serde_json::Value::as_str)
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|parsed| parsed.with_timezone(&Utc)))
}
