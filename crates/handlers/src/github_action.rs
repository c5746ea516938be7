use crate::envelope::HttpEnvelope;
use github::{GithubError, IssueTracker};
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GithubAction {
    GetIssues,
    GetBranches,
    GetPullRequests,
}

const ACTIONS: &[(&str, GithubAction)] = &[
    ("get_issues", GithubAction::GetIssues),
    ("get_branches", GithubAction::GetBranches),
    ("get_pull_requests", GithubAction::GetPullRequests),
];

impl GithubAction {
    pub fn lookup(name: &str) -> Option<Self> {
        ACTIONS
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, action)| *action)
    }
}

/// Direct-invocation handler: `{"action": "get_issues"}` and friends
pub struct GithubActionHandler {
    tracker: Arc<dyn IssueTracker>,
}

impl GithubActionHandler {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self { tracker }
    }

    pub async fn handle(&self, event: &Value) -> HttpEnvelope {
        let raw = event.get("action").and_then(Value::as_str).unwrap_or("");
        let Some(action) = GithubAction::lookup(raw) else {
            warn!(action = raw, "Unknown github action");
            return HttpEnvelope::error(400, format!("Unknown action: {}", raw));
        };

        info!(?action, repo = %self.tracker.repo(), "Handling github action");
        match self.run(action).await {
            Ok(payload) => HttpEnvelope::ok(&payload),
            Err(e) => {
                error!(error = %e, ?action, "GitHub action failed");
                HttpEnvelope::error(500, e.to_string())
            }
        }
    }

    async fn run(&self, action: GithubAction) -> Result<Value, GithubError> {
        Ok(match action {
            GithubAction::GetIssues => serde_json::to_value(self.tracker.list_open_issues().await?)?,
            GithubAction::GetBranches => serde_json::to_value(self.tracker.list_branches().await?)?,
            GithubAction::GetPullRequests => {
                serde_json::to_value(self.tracker.list_open_pull_requests().await?)?
            }
        })
    }
}
