//! Metadata document database access.
//!
//! Records are JSON documents made of named top-level sections. This crate
//! provides the filter and projection language used to select them, the
//! [`RecordStore`] seam every consumer depends on, an HTTP client for the
//! metadata API and an in-memory store for tests and local runs.

pub mod client;
pub mod error;
pub mod filter;
pub mod memory;
pub mod record;
pub mod store;

pub use client::MetadataDbClient;
pub use error::{DocDbError, DocDbResult};
pub use filter::{Filter, Projection};
pub use memory::{InMemoryStore, WriteLogEntry};
pub use record::{Record, KNOWN_SECTIONS};
pub use store::{retrieve_by_ids, RecordStore, DEFAULT_BATCH_SIZE};
