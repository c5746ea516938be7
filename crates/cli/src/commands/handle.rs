use crate::context::AppContext;
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use common::TargetEnv;
use handlers::{DocDbHandler, GithubActionHandler, GithubAgentHandler, HandlerResponse};
use serde_json::Value;
use std::path::PathBuf;
use tracing::info;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum HandlerKind {
    /// count / filter / aggregation against the record store
    Docdb,
    /// Agent-routed GitHub operations
    GithubAgent,
    /// Action-routed GitHub listings
    GithubAction,
}

#[derive(Debug, Args)]
pub struct HandleCommand {
    /// Which handler receives the event
    #[arg(value_enum)]
    pub handler: HandlerKind,

    /// JSON file holding the event, `-` for stdin
    pub event: PathBuf,

    /// Query the development store (docdb handler only)
    #[arg(long)]
    pub dev: bool,

    /// Indent the printed envelope
    #[arg(long)]
    pub pretty: bool,
}

impl HandleCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let event = self.read_event()?;
        info!(handler = ?self.handler, "Dispatching event");

        let response: HandlerResponse = match self.handler {
            HandlerKind::Docdb => {
                let store = ctx.store(TargetEnv::from_prod_flag(!self.dev))?;
                DocDbHandler::new(store).handle(&event).await.into()
            }
            HandlerKind::GithubAgent => GithubAgentHandler::new(ctx.tracker()?).handle(&event).await,
            HandlerKind::GithubAction => {
                GithubActionHandler::new(ctx.tracker()?).handle(&event).await.into()
            }
        };

        let text = if self.pretty {
            serde_json::to_string_pretty(&response)?
        } else {
            serde_json::to_string(&response)?
        };
        println!("{}", text);
        Ok(())
    }

    fn read_event(&self) -> Result<Value> {
        let raw = if self.event.as_os_str() == "-" {
            std::io::read_to_string(std::io::stdin()).context("failed to read event from stdin")?
        } else {
            std::fs::read_to_string(&self.event)
                .with_context(|| format!("failed to read event file {}", self.event.display()))?
        };
        serde_json::from_str(&raw).context("event is not valid JSON")
    }
}
