use crate::context::AppContext;
use crate::progress::ProgressType;
use agent::IssueSolver;
use anyhow::Result;
use clap::Args;
use console::style;

#[derive(Debug, Args)]
pub struct SolveCommand {
    /// Issue number; every open issue on the first page when omitted
    #[arg(long)]
    pub issue: Option<u64>,
}

impl SolveCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let solver = IssueSolver::new(ctx.inference()?, ctx.tracker()?)
            .with_schema_context(ctx.schema_context()?)
            .with_max_tokens(ctx.config.inference.max_tokens);

        let spinner = ProgressType::Slow.spinner("Drafting migration scripts...");
        let fixes = match solver.run(self.issue).await {
            Ok(fixes) => {
                spinner.finish_success(&format!("Opened {} pull request(s)", fixes.len()));
                fixes
            }
            Err(e) => {
                spinner.finish_error("Drafting failed");
                return Err(e.into());
            }
        };

        for fix in fixes {
            println!(
                "{} {} -> {} ({})",
                style(format!("#{}", fix.issue)).cyan().bold(),
                fix.path,
                style(&fix.branch).green(),
                fix.pull_request.html_url.as_deref().unwrap_or("no url"),
            );
        }
        Ok(())
    }
}
