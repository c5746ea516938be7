use crate::error::{MigrationError, MigrationResult};
use crate::report::{RecordDiff, SectionChange};
use docdb::Record;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// Closed, ordered set of top-level sections a migration may modify
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct Scope(Vec<String>);

impl Scope {
    pub fn new<S: AsRef<str>>(sections: &[S]) -> MigrationResult<Self> {
        if sections.is_empty() {
            return Err(MigrationError::InvalidScope(
                "at least one section is required".to_string(),
            ));
        }

        let mut seen = BTreeSet::new();
        let mut names = Vec::with_capacity(sections.len());
        for section in sections {
            let name = section.as_ref().trim();
            if name.is_empty() {
                return Err(MigrationError::InvalidScope("empty section name".to_string()));
            }
            if name == "_id" {
                return Err(MigrationError::InvalidScope(
                    "_id can never be modified".to_string(),
                ));
            }
            if name.contains('.') {
                return Err(MigrationError::InvalidScope(format!(
                    "'{}' is not a top-level section",
                    name
                )));
            }
            if !seen.insert(name.to_string()) {
                return Err(MigrationError::InvalidScope(format!(
                    "duplicate section '{}'",
                    name
                )));
            }
            names.push(name.to_string());
        }
        Ok(Self(names))
    }

    pub fn sections(&self) -> &[String] {
        &self.0
    }

    pub fn contains(&self, section: &str) -> bool {
        self.0.iter().any(|s| s == section)
    }

    /// Top-level keys outside the scope whose value differs between the two records
    pub fn violations(&self, before: &Record, after: &Record) -> Vec<String> {
        let keys: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
        keys.into_iter()
            .filter(|key| !self.contains(key))
            .filter(|key| before.section(key) != after.section(key))
            .cloned()
            .collect()
    }

    /// In-scope sections that changed, in scope order. Absent sections diff as `null`.
    pub fn diff(&self, record_id: &str, before: &Record, after: &Record) -> RecordDiff {
        let sections = self
            .0
            .iter()
            .filter(|name| before.section(name) != after.section(name))
            .map(|name| SectionChange {
                section: name.clone(),
                before: before.section(name).cloned().unwrap_or(Value::Null),
                after: after.section(name).cloned().unwrap_or(Value::Null),
            })
            .collect();
        RecordDiff {
            record_id: record_id.to_string(),
            sections,
        }
    }

    /// The payload for a section replacement: only the changed in-scope sections
    pub fn write_set(&self, diff: &RecordDiff) -> Map<String, Value> {
        diff.sections
            .iter()
            .filter(|change| self.contains(&change.section))
            .map(|change| (change.section.clone(), change.after.clone()))
            .collect()
    }

    /// Current values of the in-scope sections a record carries
    pub fn present_sections(&self, record: &Record) -> Map<String, Value> {
        self.0
            .iter()
            .filter_map(|name| record.section(name).map(|v| (name.clone(), v.clone())))
            .collect()
    }
}

impl TryFrom<Vec<String>> for Scope {
    type Error = MigrationError;

    fn try_from(sections: Vec<String>) -> Result<Self, Self::Error> {
        Scope::new(&sections)
    }
}

impl From<Scope> for Vec<String> {
    fn from(scope: Scope) -> Self {
        scope.0
    }
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.0.join(", "))
    }
}
