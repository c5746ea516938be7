use crate::error::MigrationResult;
use chrono::{DateTime, Utc};
use common::TargetEnv;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use tracing::info;

/// Before/after value of one changed scope section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionChange {
    pub section: String,
    pub before: Value,
    pub after: Value,
}

/// Changed scope sections of one candidate record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDiff {
    pub record_id: String,
    pub sections: Vec<SectionChange>,
}

impl RecordDiff {
    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    pub fn section_names(&self) -> Vec<&str> {
        self.sections.iter().map(|c| c.section.as_str()).collect()
    }
}

/// Record whose transform touched sections outside the declared scope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RejectedRecord {
    pub record_id: String,
    pub out_of_scope: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Identify,
    Transform,
    Write,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedRecord {
    pub record_id: String,
    pub stage: FailureStage,
    pub error: String,
}

/// Review artifact written by every run, dry or committed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    pub job: String,
    pub callback: String,
    pub full_run: bool,
    pub target: TargetEnv,
    pub selector: Value,
    pub scope: Vec<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub candidates: usize,
    pub changed: Vec<RecordDiff>,
    pub unchanged: Vec<String>,
    pub rejected: Vec<RejectedRecord>,
    pub failed: Vec<FailedRecord>,
    pub writes: usize,
}

impl MigrationReport {
    pub fn new(
        job: impl Into<String>,
        callback: impl Into<String>,
        full_run: bool,
        target: TargetEnv,
        selector: Value,
        scope: Vec<String>,
    ) -> Self {
        Self {
            job: job.into(),
            callback: callback.into(),
            full_run,
            target,
            selector,
            scope,
            started_at: Utc::now(),
            finished_at: None,
            candidates: 0,
            changed: Vec::new(),
            unchanged: Vec::new(),
            rejected: Vec::new(),
            failed: Vec::new(),
            writes: 0,
        }
    }

    pub fn mode_label(&self) -> &'static str {
        if self.full_run {
            "full_run"
        } else {
            "dry_run"
        }
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty() && self.failed.is_empty()
    }

    /// Write as `{dir}/{mode}_{timestamp}.json`, creating `dir` as needed
    pub fn write_to(&self, dir: &Path) -> MigrationResult<PathBuf> {
        std::fs::create_dir_all(dir)?;
        let stamp = self.started_at.format("%Y%m%dT%H%M%S%.3fZ");
        let path = dir.join(format!("{}_{}.json", self.mode_label(), stamp));
        std::fs::write(&path, serde_json::to_string_pretty(self)?)?;
        info!(path = %path.display(), "Migration report written");
        Ok(path)
    }

    pub fn read_from(path: &Path) -> MigrationResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Human-readable summary for terminal output
    pub fn format_summary(&self) -> String {
        let mut output = String::new();
        output.push_str(&format!(
            "{} '{}' against {}: {} candidates, {} changed, {} unchanged, {} rejected, {} failed, {} writes\n",
            self.mode_label(),
            self.job,
            self.target,
            self.candidates,
            self.changed.len(),
            self.unchanged.len(),
            self.rejected.len(),
            self.failed.len(),
            self.writes,
        ));
        for diff in &self.changed {
            output.push_str(&format!(
                "  ~ {} [{}]\n",
                diff.record_id,
                diff.section_names().join(", ")
            ));
        }
        for rejected in &self.rejected {
            output.push_str(&format!(
                "  ! {} touched out-of-scope sections [{}]\n",
                rejected.record_id,
                rejected.out_of_scope.join(", ")
            ));
        }
        for failed in &self.failed {
            output.push_str(&format!(
                "  x {} ({:?}): {}\n",
                failed.record_id, failed.stage, failed.error
            ));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_report_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut report = MigrationReport::new(
            "fix",
            "fix_experimenter_full_name",
            false,
            TargetEnv::Development,
            json!({}),
            vec!["acquisition".to_string()],
        );
        report.candidates = 1;
        report.changed.push(RecordDiff {
            record_id: "A".to_string(),
            sections: vec![SectionChange {
                section: "acquisition".to_string(),
                before: json!({"experimenter_full_name": "Jane"}),
                after: json!({"experimenter_full_name": ["Jane"]}),
            }],
        });
        report.finish();

        let path = report.write_to(&dir.path().join("nested")).unwrap();
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert!(name.starts_with("dry_run_"));
        assert!(name.ends_with(".json"));

        let loaded = MigrationReport::read_from(&path).unwrap();
        assert_eq!(loaded.changed, report.changed);
        assert!(loaded.is_clean());

        let summary = loaded.format_summary();
        assert!(summary.contains("1 changed"));
        assert!(summary.contains("~ A [acquisition]"));
    }
}
