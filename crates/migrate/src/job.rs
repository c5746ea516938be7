use crate::error::{MigrationError, MigrationResult};
use crate::report::{FailedRecord, FailureStage, MigrationReport, RejectedRecord};
use crate::scope::Scope;
use crate::transform::RecordTransform;
use common::{OperationTimer, TargetEnv};
use docdb::{Filter, RecordStore};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// How a single [`MigrationJob::run`] executes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RunMode {
    /// Persist changes instead of only reporting them
    pub full_run: bool,
    /// Read from and write to the test store instead of the job's environment
    pub test_mode: bool,
}

impl RunMode {
    pub fn dry_run() -> Self {
        Self::default()
    }

    pub fn committed() -> Self {
        Self {
            full_run: true,
            test_mode: false,
        }
    }

    pub fn in_test(mut self) -> Self {
        self.test_mode = true;
        self
    }
}

/// Record stores a job may be pointed at, one per environment
#[derive(Clone, Default)]
pub struct MigrationTargets {
    stores: HashMap<TargetEnv, Arc<dyn RecordStore>>,
}

impl MigrationTargets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, env: TargetEnv, store: Arc<dyn RecordStore>) -> Self {
        self.stores.insert(env, store);
        self
    }

    pub fn get(&self, env: TargetEnv) -> MigrationResult<Arc<dyn RecordStore>> {
        self.stores
            .get(&env)
            .cloned()
            .ok_or(MigrationError::MissingStore(env))
    }
}

/// Outcome of one run
#[derive(Debug, Clone)]
pub struct MigrationSummary {
    pub report: MigrationReport,
    pub report_path: PathBuf,
}

impl MigrationSummary {
    pub fn is_clean(&self) -> bool {
        self.report.is_clean()
    }

    pub fn writes(&self) -> usize {
        self.report.writes
    }
}

/// A guarded migration: selector, scope, transform and where to report.
///
/// Constructed once per invocation. A committed run is refused until a dry
/// run against the same target has completed on this job, unless
/// [`MigrationJob::allow_skip_dry_run`] was called.
pub struct MigrationJob {
    name: String,
    selector: Filter,
    scope: Scope,
    transform: Arc<dyn RecordTransform>,
    output_path: PathBuf,
    env: TargetEnv,
    targets: MigrationTargets,
    skip_dry_run: bool,
    dry_run_primary: AtomicBool,
    dry_run_test: AtomicBool,
}

impl MigrationJob {
    pub fn new(
        name: impl Into<String>,
        selector: Filter,
        scope: Scope,
        transform: Arc<dyn RecordTransform>,
        targets: MigrationTargets,
    ) -> Self {
        let name = name.into();
        Self {
            output_path: PathBuf::from(".").join(&name),
            name,
            selector,
            scope,
            transform,
            env: TargetEnv::Production,
            targets,
            skip_dry_run: false,
            dry_run_primary: AtomicBool::new(false),
            dry_run_test: AtomicBool::new(false),
        }
    }

    pub fn with_output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    pub fn with_env(mut self, env: TargetEnv) -> Self {
        self.env = env;
        self
    }

    /// Operator opt-in to committed runs without a preceding dry run
    pub fn allow_skip_dry_run(mut self) -> Self {
        self.skip_dry_run = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn selector(&self) -> &Filter {
        &self.selector
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn env(&self) -> TargetEnv {
        self.env
    }

    fn dry_run_flag(&self, test_mode: bool) -> &AtomicBool {
        if test_mode {
            &self.dry_run_test
        } else {
            &self.dry_run_primary
        }
    }

    pub fn dry_run_completed(&self, test_mode: bool) -> bool {
        self.dry_run_flag(test_mode).load(Ordering::SeqCst)
    }

    pub async fn run(&self, mode: RunMode) -> MigrationResult<MigrationSummary> {
        if mode.full_run && !self.skip_dry_run && !self.dry_run_completed(mode.test_mode) {
            return Err(MigrationError::DryRunRequired {
                job: self.name.clone(),
            });
        }

        let target = if mode.test_mode {
            TargetEnv::Test
        } else {
            self.env
        };
        let store = self.targets.get(target)?;

        let mut timer = OperationTimer::new(format!("migration:{}", self.name));
        timer.add_field("full_run", mode.full_run);
        timer.add_field("target", target.to_string());

        info!(
            job = %self.name,
            callback = self.transform.name(),
            store = store.name(),
            scope = %self.scope,
            full_run = mode.full_run,
            "Starting migration run"
        );

        let mut report = MigrationReport::new(
            &self.name,
            self.transform.name(),
            mode.full_run,
            target,
            self.selector.to_value(),
            self.scope.sections().to_vec(),
        );

        let candidates = store.retrieve(&self.selector, None, None).await?;
        report.candidates = candidates.len();

        for record in candidates {
            let record_id = match record.require_id() {
                Ok(id) => id.to_string(),
                Err(e) => {
                    warn!(job = %self.name, error = %e, "Skipping record without _id");
                    report.failed.push(FailedRecord {
                        record_id: String::new(),
                        stage: FailureStage::Identify,
                        error: e.to_string(),
                    });
                    continue;
                }
            };

            let before = record.clone();
            let after = match self.transform.apply(record).await {
                Ok(after) => after,
                Err(e) => {
                    warn!(job = %self.name, record_id = %record_id, error = %e, "Transform failed");
                    report.failed.push(FailedRecord {
                        record_id,
                        stage: FailureStage::Transform,
                        error: format!("{:#}", e),
                    });
                    continue;
                }
            };

            let violations = self.scope.violations(&before, &after);
            if !violations.is_empty() {
                warn!(
                    job = %self.name,
                    record_id = %record_id,
                    sections = ?violations,
                    "Transform modified sections outside scope; record rejected"
                );
                report.rejected.push(RejectedRecord {
                    record_id,
                    out_of_scope: violations,
                });
                continue;
            }

            let diff = self.scope.diff(&record_id, &before, &after);
            let sections = if diff.is_empty() {
                debug!(job = %self.name, record_id = %record_id, "Record already up to date");
                self.scope.present_sections(&after)
            } else {
                self.scope.write_set(&diff)
            };

            // committed runs write every matched record once; up-to-date records
            // get their current in-scope sections back
            if mode.full_run {
                if let Err(e) = store.replace_sections(&record_id, &sections).await {
                    warn!(job = %self.name, record_id = %record_id, error = %e, "Write failed");
                    report.failed.push(FailedRecord {
                        record_id,
                        stage: FailureStage::Write,
                        error: e.to_string(),
                    });
                    continue;
                }
                report.writes += 1;
            }

            if diff.is_empty() {
                report.unchanged.push(record_id);
            } else {
                report.changed.push(diff);
            }
        }

        report.finish();
        let report_path = match report.write_to(&self.output_path) {
            Ok(path) => path,
            Err(e) => {
                error!(
                    job = %self.name,
                    full_run = mode.full_run,
                    candidates = report.candidates,
                    changed = report.changed.len(),
                    writes = report.writes,
                    failed = report.failed.len(),
                    error = %e,
                    "Report could not be written"
                );
                timer.finish_with_result(&Err::<(), _>(e.to_string()));
                return Err(MigrationError::ReportNotWritten {
                    report: Box::new(report),
                    dir: self.output_path.display().to_string(),
                    source: Box::new(e),
                });
            }
        };

        if !mode.full_run {
            self.dry_run_flag(mode.test_mode).store(true, Ordering::SeqCst);
        }

        timer.add_field("changed", report.changed.len());
        timer.add_field("writes", report.writes);
        timer.finish();

        if !report.is_clean() {
            warn!(
                job = %self.name,
                rejected = report.rejected.len(),
                failed = report.failed.len(),
                "Migration run finished with problems"
            );
        }

        Ok(MigrationSummary {
            report,
            report_path,
        })
    }
}
