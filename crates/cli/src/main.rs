use anyhow::Result;
use clap::{Parser, Subcommand};
use common::{init_structured_logging, AppConfig, LoggingConfig};
use console::style;
use std::process::ExitCode;
use tracing::Level;

mod commands;
mod context;
mod progress;

use commands::{ExploreCommand, HandleCommand, MigrateCommand, QueryCommand, SolveCommand};
use context::AppContext;

#[derive(Parser)]
#[command(name = "nautilex")]
#[command(about = "Metadata maintenance: guarded migrations, handler invocations and issue agents")]
#[command(version)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON log lines (also NAUTILEX_LOG_JSON=1)
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a bundled callback as a dry run, then optionally commit it
    Migrate(MigrateCommand),
    /// Feed an event file to one of the handlers and print the envelope
    Handle(HandleCommand),
    /// Query the record store for open issues and report back on them
    Explore(ExploreCommand),
    /// Draft migration scripts for open issues as pull requests
    Solve(SolveCommand),
    /// Run a filter against the record store
    Query(QueryCommand),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    match run(cli).await {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red().bold(), e);
            ExitCode::from(2)
        }
    }
}

async fn run(cli: Cli) -> Result<bool> {
    let config = AppConfig::from_env()?;

    let logging = LoggingConfig {
        level: if cli.verbose { Level::DEBUG } else { Level::WARN },
        json_output: cli.json_logs || config.log_json,
        color_output: console::colors_enabled_stderr(),
        ..LoggingConfig::default()
    };
    init_structured_logging(logging)?;

    let ctx = AppContext::new(config);
    match cli.command {
        Commands::Migrate(cmd) => cmd.execute(&ctx).await,
        Commands::Handle(cmd) => cmd.execute(&ctx).await.map(|_| true),
        Commands::Explore(cmd) => cmd.execute(&ctx).await.map(|_| true),
        Commands::Solve(cmd) => cmd.execute(&ctx).await.map(|_| true),
        Commands::Query(cmd) => cmd.execute(&ctx).await.map(|_| true),
    }
}
