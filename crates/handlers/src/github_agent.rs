use crate::envelope::{AgentEnvelope, HandlerResponse, HttpEnvelope};
use chrono::Local;
use github::{GithubError, IssueTracker, NewPullRequest};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentParameter {
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
    pub value: Value,
}

/// Invocation sent by the conversational agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentEvent {
    #[serde(default)]
    pub action_group: String,
    pub api_path: String,
    pub http_method: String,
    #[serde(default)]
    pub parameters: Vec<AgentParameter>,
    #[serde(default)]
    pub request_body: Option<Value>,
    #[serde(default)]
    pub message_version: Value,
}

impl AgentEvent {
    fn parameter(&self, name: &str) -> Option<&Value> {
        self.parameters
            .iter()
            .find(|p| p.name == name)
            .or_else(|| self.parameters.first())
            .map(|p| &p.value)
    }

    /// `code` from either a plain `{code}` body or the agent's property list
    pub fn code(&self) -> Option<String> {
        let body = self.request_body.as_ref()?;
        if let Some(code) = body.get("code").and_then(Value::as_str) {
            return Some(code.to_string());
        }
        body.get("content")?
            .get("application/json")?
            .get("properties")?
            .as_array()?
            .iter()
            .find(|p| p.get("name").and_then(Value::as_str) == Some("code"))?
            .get("value")?
            .as_str()
            .map(str::to_string)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AgentRoute {
    ListIssues,
    GetIssue(u64),
    ListBranches,
    ListPullRequests,
    GetPullRequest(u64),
    CreatePullRequest(u64),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RouteError {
    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Unknown action: {0}")]
    UnknownAction(String),

    #[error("Invalid {name} in {path}")]
    InvalidNumber { name: &'static str, path: String },
}

#[derive(Debug, Clone, Copy)]
enum PathKind {
    Fixed(AgentRoute),
    Numbered(&'static str, fn(u64) -> AgentRoute),
}

const GET_ROUTES: &[(&str, PathKind)] = &[
    ("/issues", PathKind::Fixed(AgentRoute::ListIssues)),
    ("/issue/", PathKind::Numbered("issueNumber", AgentRoute::GetIssue)),
    ("/branches", PathKind::Fixed(AgentRoute::ListBranches)),
    ("/pull-requests", PathKind::Fixed(AgentRoute::ListPullRequests)),
    (
        "/pull-request/",
        PathKind::Numbered("pullRequestNumber", AgentRoute::GetPullRequest),
    ),
];

const POST_ROUTES: &[(&str, PathKind)] = &[(
    "/pull-request/",
    PathKind::Numbered("issueNumber", AgentRoute::CreatePullRequest),
)];

impl AgentRoute {
    /// Resolve method and path; numbered paths take the number from the path or,
    /// for templated paths like `/issue/{issueNumber}`, from the parameters
    pub fn resolve(event: &AgentEvent) -> Result<Self, RouteError> {
        let table = match event.http_method.to_ascii_uppercase().as_str() {
            "GET" => GET_ROUTES,
            "POST" => POST_ROUTES,
            _ => return Err(RouteError::UnsupportedMethod(event.http_method.clone())),
        };
        let path = event.api_path.as_str();

        for (pattern, kind) in table {
            match kind {
                PathKind::Fixed(route) if path == *pattern => return Ok(*route),
                PathKind::Numbered(name, make) => {
                    let Some(tail) = path.strip_prefix(pattern) else {
                        continue;
                    };
                    if tail.is_empty() || tail.contains('/') {
                        continue;
                    }
                    let number = tail.parse::<u64>().ok().or_else(|| {
                        event.parameter(name).and_then(|v| match v {
                            Value::Number(n) => n.as_u64(),
                            Value::String(s) => s.trim().parse().ok(),
                            _ => None,
                        })
                    });
                    return number.map(make).ok_or_else(|| RouteError::InvalidNumber {
                        name: *name,
                        path: path.to_string(),
                    });
                }
                _ => {}
            }
        }
        Err(RouteError::UnknownAction(path.to_string()))
    }
}

type Clock = Box<dyn Fn() -> String + Send + Sync>;

/// GitHub operations exposed to the agent as an HTTP-like API
pub struct GithubAgentHandler {
    tracker: Arc<dyn IssueTracker>,
    stamp: Clock,
}

impl GithubAgentHandler {
    pub fn new(tracker: Arc<dyn IssueTracker>) -> Self {
        Self {
            tracker,
            stamp: Box::new(|| Local::now().format("%Y%m%d%H%M%S").to_string()),
        }
    }

    /// Replace the timestamp used in generated branch and folder names
    pub fn with_clock(mut self, stamp: impl Fn() -> String + Send + Sync + 'static) -> Self {
        self.stamp = Box::new(stamp);
        self
    }

    /// Handle a raw event. Malformed events and routing failures get a plain 400.
    pub async fn handle(&self, event: &Value) -> HandlerResponse {
        let event: AgentEvent = match serde_json::from_value(event.clone()) {
            Ok(event) => event,
            Err(e) => {
                warn!(error = %e, "Malformed agent event");
                return HttpEnvelope::error(400, format!("Malformed agent event: {}", e)).into();
            }
        };
        self.handle_event(&event).await
    }

    pub async fn handle_event(&self, event: &AgentEvent) -> HandlerResponse {
        let route = match AgentRoute::resolve(event) {
            Ok(route) => route,
            Err(e) => {
                warn!(method = %event.http_method, path = %event.api_path, "{}", e);
                return HttpEnvelope::error(400, e.to_string()).into();
            }
        };

        info!(?route, action_group = %event.action_group, "Handling agent event");
        let (status, payload) = match self.run(route, event).await {
            Ok(payload) => (200, payload),
            Err(GithubError::NotFound(what)) => (404, json!(format!("Not found: {}", what))),
            Err(e) => {
                error!(error = %e, ?route, "GitHub operation failed");
                (500, json!(e.to_string()))
            }
        };

        AgentEnvelope::new(
            event.action_group.clone(),
            event.api_path.clone(),
            event.http_method.clone(),
            status,
            event.message_version.clone(),
            &payload,
        )
        .into()
    }

    async fn run(&self, route: AgentRoute, event: &AgentEvent) -> Result<Value, GithubError> {
        let tracker = &self.tracker;
        Ok(match route {
            AgentRoute::ListIssues => serde_json::to_value(tracker.list_open_issues().await?)?,
            AgentRoute::GetIssue(n) => serde_json::to_value(tracker.get_issue(n).await?)?,
            AgentRoute::ListBranches => serde_json::to_value(tracker.list_branches().await?)?,
            AgentRoute::ListPullRequests => {
                serde_json::to_value(tracker.list_open_pull_requests().await?)?
            }
            AgentRoute::GetPullRequest(n) => {
                serde_json::to_value(tracker.get_pull_request(n).await?)?
            }
            AgentRoute::CreatePullRequest(n) => {
                serde_json::to_value(self.create_pull_request(n, event).await?)?
            }
        })
    }

    async fn create_pull_request(
        &self,
        issue_number: u64,
        event: &AgentEvent,
    ) -> Result<github::PullRequest, GithubError> {
        let issue = self.tracker.get_issue(issue_number).await?;
        let code = event.code().unwrap_or_else(|| "print('Hello World')".to_string());
        let stamp = (self.stamp)();

        let base = self.tracker.default_branch().await?;
        let sha = self.tracker.branch_sha(&base).await?;
        let branch = format!("autofix-issue-{}-{}", issue_number, stamp);
        self.tracker.create_branch(&branch, &sha).await?;

        let path = format!("scripts/{}-{}/run.py", issue_number, stamp);
        self.tracker
            .create_file(
                &branch,
                &path,
                &format!("feat: add script for issue {}", issue_number),
                &code,
            )
            .await?;

        self.tracker
            .create_pull_request(&NewPullRequest {
                title: format!("Fix: {} ({})", issue.title, stamp),
                body: format!("Auto-fix for issue {}", issue_number),
                head: branch,
                base,
            })
            .await
    }
}
