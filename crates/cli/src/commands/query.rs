use crate::context::AppContext;
use anyhow::{Context, Result};
use clap::Args;
use common::TargetEnv;
use docdb::{Filter, Projection, Record};
use serde_json::Value;

#[derive(Debug, Args)]
pub struct QueryCommand {
    /// Filter document, e.g. '{"subject.subject_id": "123456"}'
    pub filter: String,

    /// Projection document limiting the returned fields
    #[arg(long, value_name = "JSON")]
    pub projection: Option<String>,

    #[arg(long)]
    pub limit: Option<usize>,

    /// Print only the number of matching records
    #[arg(long)]
    pub count: bool,

    /// Query the development store
    #[arg(long)]
    pub dev: bool,
}

impl QueryCommand {
    pub async fn execute(self, ctx: &AppContext) -> Result<()> {
        let filter = Filter::new(parse_json("filter", &self.filter)?)?;
        let store = ctx.store(TargetEnv::from_prod_flag(!self.dev))?;

        if self.count {
            println!("{}", store.count(&filter).await?);
            return Ok(());
        }

        let projection = match &self.projection {
            Some(raw) => Some(Projection::new(parse_json("projection", raw)?)?),
            None => None,
        };
        let records = store
            .retrieve(&filter, projection.as_ref(), self.limit)
            .await?;

        // one record per line
        for record in records.into_iter().map(Record::into_value) {
            println!("{}", serde_json::to_string(&record)?);
        }
        Ok(())
    }
}

fn parse_json(what: &str, raw: &str) -> Result<Value> {
    serde_json::from_str(raw).with_context(|| format!("{} is not valid JSON", what))
}
