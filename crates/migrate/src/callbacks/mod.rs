//! Bundled record transforms and the registry the CLI resolves them from.

mod channels;
mod experimenter;
mod modality;
mod processing;

pub use channels::{fix_channel_names, UpdateChannelName, AFFECTED_PROJECT};
pub use experimenter::fix_experimenter_full_name;
pub use modality::{fix_modality_type, Modality};
pub use processing::RepairProcessing;

use crate::blob::BlobStore;
use crate::error::{MigrationError, MigrationResult};
use crate::scope::Scope;
use crate::transform::{transform_fn, RecordTransform};
use docdb::Filter;
use serde_json::{json, Value};
use std::sync::Arc;

/// Static description of a bundled callback
#[derive(Debug, Clone, Copy)]
pub struct CallbackSpec {
    pub name: &'static str,
    pub description: &'static str,
    pub scope: &'static [&'static str],
    /// Whether the default selector is meaningful; id-list callbacks need `--ids`
    pub needs_ids: bool,
    pub needs_blobs: bool,
    default_selector: fn() -> Value,
}

impl CallbackSpec {
    pub fn scope(&self) -> MigrationResult<Scope> {
        Scope::new(self.scope)
    }

    pub fn default_selector(&self) -> MigrationResult<Filter> {
        Ok(Filter::new((self.default_selector)())?)
    }
}

fn match_all() -> Value {
    json!({})
}

fn affected_project() -> Value {
    json!({"data_description.project_name": AFFECTED_PROJECT})
}

fn with_location() -> Value {
    json!({"location": {"$exists": true}})
}

pub const BUILTIN: &[CallbackSpec] = &[
    CallbackSpec {
        name: "fix_modality_type",
        description: "Convert string modalities into lists of modality objects",
        scope: &["metadata", "modality"],
        needs_ids: true,
        needs_blobs: false,
        default_selector: match_all,
    },
    CallbackSpec {
        name: "update_channel_name",
        description: "Turn decimal tile channel names (\"488.0\") into integers",
        scope: &["acquisition"],
        needs_ids: false,
        needs_blobs: false,
        default_selector: affected_project,
    },
    CallbackSpec {
        name: "fix_channel_names",
        description: "Render numeric tile channel names as integer strings",
        scope: &["acquisition", "data_description"],
        needs_ids: true,
        needs_blobs: false,
        default_selector: affected_project,
    },
    CallbackSpec {
        name: "fix_experimenter_full_name",
        description: "Wrap a single experimenter_full_name string in a list",
        scope: &["acquisition"],
        needs_ids: false,
        needs_blobs: false,
        default_selector: match_all,
    },
    CallbackSpec {
        name: "repair_processing",
        description: "Restore the processing section from processing.json in the asset location",
        scope: &["processing"],
        needs_ids: false,
        needs_blobs: true,
        default_selector: with_location,
    },
];

pub fn find(name: &str) -> MigrationResult<&'static CallbackSpec> {
    BUILTIN
        .iter()
        .find(|spec| spec.name == name)
        .ok_or_else(|| MigrationError::UnknownCallback(name.to_string()))
}

/// Instantiate a bundled callback by name
pub fn build(name: &str, blobs: Arc<dyn BlobStore>) -> MigrationResult<Arc<dyn RecordTransform>> {
    let spec = find(name)?;
    let transform: Arc<dyn RecordTransform> = match spec.name {
        "fix_modality_type" => Arc::new(transform_fn(spec.name, fix_modality_type)),
        "update_channel_name" => {
            let fix = UpdateChannelName::new()?;
            Arc::new(transform_fn(spec.name, move |record| fix.apply(record)))
        }
        "fix_channel_names" => Arc::new(transform_fn(spec.name, fix_channel_names)),
        "fix_experimenter_full_name" => {
            Arc::new(transform_fn(spec.name, fix_experimenter_full_name))
        }
        "repair_processing" => Arc::new(RepairProcessing::new(blobs)),
        other => return Err(MigrationError::UnknownCallback(other.to_string())),
    };
    Ok(transform)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blob::InMemoryBlobStore;

    #[test]
    fn test_every_builtin_resolves_with_valid_scope_and_selector() {
        let blobs: Arc<dyn BlobStore> = Arc::new(InMemoryBlobStore::new());
        for spec in BUILTIN {
            assert!(spec.scope().is_ok(), "{}", spec.name);
            assert!(spec.default_selector().is_ok(), "{}", spec.name);
            let transform = build(spec.name, blobs.clone()).unwrap();
            assert_eq!(transform.name(), spec.name);
        }
        assert!(matches!(
            build("drop_everything", blobs),
            Err(MigrationError::UnknownCallback(_))
        ));
    }
}
