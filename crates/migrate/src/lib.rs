//! Guarded record migrations.
//!
//! A [`MigrationJob`] couples a selector, a declared [`Scope`] of sections,
//! and a [`RecordTransform`]. Every job runs as a dry run first, producing a
//! [`MigrationReport`] of before/after section diffs; a committed run is only
//! accepted after that dry run unless the operator opted out explicitly.
//! Transforms that touch sections outside the scope are rejected per record.

pub mod batch;
pub mod blob;
pub mod callbacks;
pub mod error;
pub mod job;
pub mod report;
pub mod scope;
pub mod transform;

pub use batch::IdList;
pub use blob::{BlobStore, S3BlobStore, InMemoryBlobStore, S3Location};
pub use error::{MigrationError, MigrationResult};
pub use job::{MigrationJob, MigrationSummary, MigrationTargets, RunMode};
pub use report::{FailedRecord, FailureStage, MigrationReport, RecordDiff, RejectedRecord, SectionChange};
pub use scope::Scope;
pub use transform::{transform_fn, FnTransform, RecordTransform};
