use crate::context::AppContext;
use crate::progress::ProgressType;
use anyhow::{bail, Context, Result};
use clap::Args;
use common::TargetEnv;
use console::style;
use docdb::Filter;
use migrate::callbacks::{self, CallbackSpec, BUILTIN};
use migrate::{IdList, InMemoryBlobStore, MigrationJob, MigrationSummary, RecordTransform, RunMode};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Args)]
pub struct MigrateCommand {
    /// Bundled callback to apply
    pub callback: Option<String>,

    /// Target the development store instead of production
    #[arg(long)]
    pub dev: bool,

    /// Commit changes after the dry run
    #[arg(long)]
    pub full_run: bool,

    /// Run against the test store
    #[arg(long)]
    pub test: bool,

    /// CSV (with a record_id column) or newline-separated id list
    #[arg(long, value_name = "FILE")]
    pub ids: Option<PathBuf>,

    /// Ids per job when --ids is given
    #[arg(long, default_value_t = docdb::DEFAULT_BATCH_SIZE)]
    pub batch_size: usize,

    /// Selector overriding the callback's default
    #[arg(long, value_name = "JSON")]
    pub query: Option<String>,

    /// Directory reports are written under
    #[arg(long, value_name = "DIR", default_value = ".")]
    pub out: PathBuf,

    /// Commit without a preceding dry run
    #[arg(long)]
    pub skip_dry_run: bool,

    /// List bundled callbacks and exit
    #[arg(long)]
    pub list: bool,
}

impl MigrateCommand {
    /// Returns whether every run finished without failed or rejected records
    pub async fn execute(self, ctx: &AppContext) -> Result<bool> {
        if self.list {
            print_callbacks();
            return Ok(true);
        }
        let Some(name) = self.callback.as_deref() else {
            bail!("no callback given; use --list to see the bundled callbacks");
        };
        let spec = callbacks::find(name)?;

        if self.skip_dry_run && !self.full_run {
            bail!("--skip-dry-run only makes sense together with --full-run");
        }
        if spec.needs_ids && self.ids.is_none() && self.query.is_none() {
            bail!(
                "callback '{}' targets specific records; pass --ids or --query",
                spec.name
            );
        }

        let env = if self.dev {
            TargetEnv::Development
        } else {
            TargetEnv::Production
        };
        let transform = self.transform(spec, ctx).await?;
        let jobs = self.plan(spec, transform, env, ctx)?;

        let mut clean = true;
        for job in &jobs {
            clean &= self.run_job(job).await?;
        }

        if clean {
            println!("{} {}", style("✓").green(), style("Migration finished").bold());
        } else {
            println!(
                "{} {}",
                style("✗").red(),
                style("Migration finished with failed or rejected records").red()
            );
        }
        Ok(clean)
    }

    async fn transform(&self, spec: &CallbackSpec, ctx: &AppContext) -> Result<Arc<dyn RecordTransform>> {
        let blobs = if spec.needs_blobs {
            ctx.blobs().await
        } else {
            Arc::new(InMemoryBlobStore::new())
        };
        Ok(callbacks::build(spec.name, blobs)?)
    }

    fn plan(
        &self,
        spec: &CallbackSpec,
        transform: Arc<dyn RecordTransform>,
        env: TargetEnv,
        ctx: &AppContext,
    ) -> Result<Vec<MigrationJob>> {
        let scope = spec.scope()?;
        let targets = if self.test {
            ctx.migration_targets(TargetEnv::Test)?
        } else {
            ctx.migration_targets(env)?
        };

        let build = |selector: Filter, output: PathBuf| {
            let job = MigrationJob::new(
                spec.name,
                selector,
                scope.clone(),
                transform.clone(),
                targets.clone(),
            )
            .with_env(env)
            .with_output_path(output);
            if self.skip_dry_run {
                job.allow_skip_dry_run()
            } else {
                job
            }
        };

        if let Some(path) = &self.ids {
            if self.query.is_some() {
                warn!("--query is ignored when --ids is given");
            }
            let ids = IdList::from_path(path)?;
            if ids.is_empty() {
                bail!("id list {} is empty", path.display());
            }
            let batches = ids.batches(self.batch_size);
            info!(ids = ids.len(), batches = batches.len(), "Planned id batches");
            return Ok(batches
                .into_iter()
                .map(|batch| {
                    let output = batch.output_dir(&self.out, spec.name);
                    build(batch.selector, output)
                })
                .collect());
        }

        let selector = match &self.query {
            Some(query) => {
                let value = serde_json::from_str(query).context("--query is not valid JSON")?;
                Filter::new(value)?
            }
            None => spec.default_selector()?,
        };
        Ok(vec![build(selector, self.out.join(spec.name))])
    }

    async fn run_job(&self, job: &MigrationJob) -> Result<bool> {
        let base = if self.test {
            RunMode::dry_run().in_test()
        } else {
            RunMode::dry_run()
        };

        let mut clean = true;
        if !self.skip_dry_run {
            let summary = run_with_spinner(job, base, "Dry run").await?;
            clean &= summary.is_clean();
        }

        if self.full_run {
            let mode = RunMode {
                full_run: true,
                ..base
            };
            let summary = run_with_spinner(job, mode, "Committing").await?;
            clean &= summary.is_clean();
        }
        Ok(clean)
    }
}

async fn run_with_spinner(
    job: &MigrationJob,
    mode: RunMode,
    label: &str,
) -> Result<MigrationSummary> {
    let spinner = ProgressType::Fast.spinner(&format!(
        "{} '{}' into {}",
        label,
        job.name(),
        job.output_path().display()
    ));
    match job.run(mode).await {
        Ok(summary) => {
            spinner.finish_success(&format!(
                "{} done, report at {}",
                label,
                summary.report_path.display()
            ));
            print!("{}", summary.report.format_summary());
            Ok(summary)
        }
        Err(e) => {
            spinner.finish_error(&format!("{} failed", label));
            Err(e.into())
        }
    }
}

fn print_callbacks() {
    println!("{}", style("Bundled callbacks").bold());
    for spec in BUILTIN {
        println!(
            "  {} [{}]\n      {}",
            style(spec.name).cyan(),
            spec.scope.join(", "),
            style(spec.description).dim()
        );
    }
}
