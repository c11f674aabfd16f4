//! Knowledge base data model.
//!
//! # Responsibility
//! - Define the record, summary and per-file document shapes.
//! - Centralize default schema/prompt construction.
//!
//! # Invariants
//! - Every record is identified by a stable `KbId` that doubles as its
//!   directory name.
//! - Deletion is a hard delete; there are no tombstones.

pub mod knowledge_base;
