use crate::context::AppContext;
use crate::progress::ProgressType;
use agent::IssueExplorer;
use anyhow::Result;
use clap::Args;
use common::TargetEnv;
use console::style;

#[derive(Debug, Args)]
pub struct ExploreCommand {
    /// Issue number; every open issue on the first page when omitted
    #[arg(long)]
    pub issue: Option<u64>,

    /// Query the development store
    #[arg(long)]
    pub dev: bool,

    /// Print the analysis instead of commenting on the issue
    #[arg(long)]
    pub no_comment: bool,
}

impl ExploreCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let store = ctx.store(TargetEnv::from_prod_flag(!self.dev))?;
        let mut explorer = IssueExplorer::new(ctx.inference()?, store, ctx.tracker()?)
            .with_schema_context(ctx.schema_context()?)
            .with_max_tokens(ctx.config.inference.max_tokens);
        if self.no_comment {
            explorer = explorer.without_comments();
        }

        let spinner = ProgressType::Slow.spinner("Exploring issues...");
        let explorations = match explorer.run(self.issue).await {
            Ok(found) => {
                spinner.finish_success(&format!("Explored {} issue(s)", found.len()));
                found
            }
            Err(e) => {
                spinner.finish_error("Exploration failed");
                return Err(e.into());
            }
        };

        for exploration in explorations {
            println!(
                "{} {}  {} matching record(s){}",
                style(format!("#{}", exploration.issue)).cyan().bold(),
                style(exploration.query.to_string()).dim(),
                exploration.total,
                if exploration.retried { " after retry" } else { "" }
            );
            if self.no_comment {
                println!("{}\n", exploration.analysis);
            }
        }
        Ok(())
    }
}
