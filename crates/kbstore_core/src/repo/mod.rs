//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the knowledge base data access contract.
//! - Isolate directory layout and JSON file details from service callers.
//!
//! # Invariants
//! - Missing records are reported as `None`/`false`, never as errors.
//! - Only write-side I/O failures surface as `StoreError`.

pub mod kb_repo;
