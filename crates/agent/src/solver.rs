use crate::error::{AgentError, AgentResult};
use crate::prompts;
use chrono::Local;
use github::{Issue, IssueTracker, NewPullRequest, PullRequest};
use llm::{extract_code, InferenceProvider, InferenceRequest};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// The pull request opened for one issue
#[derive(Debug, Clone, Serialize)]
pub struct ProposedFix {
    pub issue: u64,
    pub branch: String,
    pub path: String,
    pub script: String,
    pub pull_request: PullRequest,
}

type Clock = Box<dyn Fn() -> String + Send + Sync>;

/// Asks the model for a migration script and proposes it as a pull request
pub struct IssueSolver {
    llm: Arc<dyn InferenceProvider>,
    tracker: Arc<dyn IssueTracker>,
    schema_context: String,
    max_tokens: u32,
    stamp: Clock,
}

impl IssueSolver {
    pub fn new(llm: Arc<dyn InferenceProvider>, tracker: Arc<dyn IssueTracker>) -> Self {
        Self {
            llm,
            tracker,
            schema_context: String::new(),
            max_tokens: 4096,
            stamp: Box::new(|| Local::now().format("%Y-%m-%dT%H-%M-%S%.6f").to_string()),
        }
    }

    pub fn with_schema_context(mut self, context: impl Into<String>) -> Self {
        self.schema_context = context.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_clock(mut self, stamp: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.stamp = Box::new(stamp);
        self
    }

    pub async fn solve(&self, issue: &Issue) -> AgentResult<ProposedFix> {
        info!(issue = issue.number, title = %issue.title, "Drafting fix");
        let response = self
            .llm
            .complete(
                InferenceRequest::new(format!(
                    "Issue Content:\n{}",
                    prompts::issue_content(&issue.title, issue.body_text())
                ))
                .with_system_prompt(prompts::solver_system(&self.schema_context))
                .with_parameters(Some(self.max_tokens), None),
            )
            .await?;
        let script = extract_code(&response.content);
        if script.trim().is_empty() {
            return Err(AgentError::EmptyScript {
                issue: issue.number,
            });
        }

        let stamp = (self.stamp)();
        let base = self.tracker.default_branch().await?;
        let sha = self.tracker.branch_sha(&base).await?;
        let branch = format!("fix/issue-{}-{}", issue.number, stamp);
        self.tracker.create_branch(&branch, &sha).await?;

        let path = format!("scripts/{}/run.py", stamp);
        self.tracker
            .create_file(
                &branch,
                &path,
                &format!("Add script for issue #{}", issue.number),
                &script,
            )
            .await?;

        let pull_request = self
            .tracker
            .create_pull_request(&NewPullRequest {
                title: format!("Fix for issue #{}", issue.number),
                body: format!("Resolves #{}", issue.number),
                head: branch.clone(),
                base,
            })
            .await?;
        info!(issue = issue.number, pr = pull_request.number, "Opened fix pull request");

        Ok(ProposedFix {
            issue: issue.number,
            branch,
            path,
            script,
            pull_request,
        })
    }

    pub async fn run(&self, issue: Option<u64>) -> AgentResult<Vec<ProposedFix>> {
        let issues = match issue {
            Some(number) => vec![self.tracker.get_issue(number).await?],
            None => self.tracker.list_open_issues().await?,
        };
        let mut fixes = Vec::with_capacity(issues.len());
        for issue in &issues {
            fixes.push(self.solve(issue).await?);
        }
        Ok(fixes)
    }
}
