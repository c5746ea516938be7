use crate::error::{GithubError, GithubResult};
use crate::model::{Branch, Comment, Issue, NewPullRequest, PullRequest, RepoId};
use crate::tracker::{IssueTracker, PAGE_SIZE};
use async_trait::async_trait;
use serde_json::Map;
use std::collections::BTreeMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq)]
pub struct CommittedFile {
    pub branch: String,
    pub path: String,
    pub message: String,
    pub content: String,
}

#[derive(Debug, Default)]
struct TrackerState {
    issues: BTreeMap<u64, Issue>,
    branches: BTreeMap<String, String>,
    pulls: Vec<PullRequest>,
    files: Vec<CommittedFile>,
    comments: Vec<(u64, Comment)>,
    calls: usize,
}

/// In-process tracker for tests and offline runs
#[derive(Debug)]
pub struct InMemoryTracker {
    repo: RepoId,
    default_branch: String,
    state: Mutex<TrackerState>,
}

impl InMemoryTracker {
    pub fn new(repo: RepoId) -> Self {
        let mut state = TrackerState::default();
        state
            .branches
            .insert("main".to_string(), "0000000000000000000000000000000000000000".to_string());
        Self {
            repo,
            default_branch: "main".to_string(),
            state: Mutex::new(state),
        }
    }

    pub async fn add_issue(&self, issue: Issue) {
        self.state.lock().await.issues.insert(issue.number, issue);
    }

    pub async fn files(&self) -> Vec<CommittedFile> {
        self.state.lock().await.files.clone()
    }

    pub async fn comments(&self) -> Vec<(u64, String)> {
        self.state
            .lock()
            .await
            .comments
            .iter()
            .map(|(issue, c)| (*issue, c.body.clone()))
            .collect()
    }

    pub async fn pull_requests(&self) -> Vec<PullRequest> {
        self.state.lock().await.pulls.clone()
    }

    pub async fn branch_names(&self) -> Vec<String> {
        self.state.lock().await.branches.keys().cloned().collect()
    }

    /// Number of trait calls served so far
    pub async fn calls(&self) -> usize {
        self.state.lock().await.calls
    }
}

#[async_trait]
impl IssueTracker for InMemoryTracker {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    async fn list_open_issues(&self) -> GithubResult<Vec<Issue>> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        Ok(state
            .issues
            .values()
            .filter(|i| i.state == "open")
            .take(PAGE_SIZE as usize)
            .cloned()
            .collect())
    }

    async fn get_issue(&self, number: u64) -> GithubResult<Issue> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        state
            .issues
            .get(&number)
            .cloned()
            .ok_or_else(|| GithubError::NotFound(format!("issue #{}", number)))
    }

    async fn list_branches(&self) -> GithubResult<Vec<Branch>> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        Ok(state
            .branches
            .iter()
            .take(PAGE_SIZE as usize)
            .map(|(name, sha)| Branch::new(name.clone(), sha.clone()))
            .collect())
    }

    async fn list_open_pull_requests(&self) -> GithubResult<Vec<PullRequest>> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        Ok(state
            .pulls
            .iter()
            .filter(|p| p.state == "open")
            .take(PAGE_SIZE as usize)
            .cloned()
            .collect())
    }

    async fn get_pull_request(&self, number: u64) -> GithubResult<PullRequest> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        state
            .pulls
            .iter()
            .find(|p| p.number == number)
            .cloned()
            .ok_or_else(|| GithubError::NotFound(format!("pull request #{}", number)))
    }

    async fn default_branch(&self) -> GithubResult<String> {
        self.state.lock().await.calls += 1;
        Ok(self.default_branch.clone())
    }

    async fn branch_sha(&self, branch: &str) -> GithubResult<String> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        state
            .branches
            .get(branch)
            .cloned()
            .ok_or_else(|| GithubError::NotFound(format!("branch {}", branch)))
    }

    async fn create_branch(&self, name: &str, from_sha: &str) -> GithubResult<()> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if state.branches.contains_key(name) {
            return Err(GithubError::UnexpectedStatus {
                status: 422,
                body: "Reference already exists".to_string(),
            });
        }
        state.branches.insert(name.to_string(), from_sha.to_string());
        Ok(())
    }

    async fn create_file(
        &self,
        branch: &str,
        path: &str,
        message: &str,
        content: &str,
    ) -> GithubResult<()> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if !state.branches.contains_key(branch) {
            return Err(GithubError::NotFound(format!("branch {}", branch)));
        }
        state.files.push(CommittedFile {
            branch: branch.to_string(),
            path: path.to_string(),
            message: message.to_string(),
            content: content.to_string(),
        });
        Ok(())
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> GithubResult<PullRequest> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if !state.branches.contains_key(&request.head) {
            return Err(GithubError::UnexpectedStatus {
                status: 422,
                body: format!("head branch {} does not exist", request.head),
            });
        }
        let number = state
            .issues
            .keys()
            .chain(state.pulls.iter().map(|p| &p.number))
            .max()
            .copied()
            .unwrap_or(0)
            + 1;
        let pr = PullRequest {
            number,
            title: request.title.clone(),
            body: Some(request.body.clone()),
            state: "open".to_string(),
            html_url: Some(format!("https://github.com/{}/pull/{}", self.repo, number)),
            extra: Map::new(),
        };
        state.pulls.push(pr.clone());
        Ok(pr)
    }

    async fn post_comment(&self, issue: u64, body: &str) -> GithubResult<Comment> {
        let mut state = self.state.lock().await;
        state.calls += 1;
        if !state.issues.contains_key(&issue) {
            return Err(GithubError::NotFound(format!("issue #{}", issue)));
        }
        let comment = Comment {
            id: state.comments.len() as u64 + 1,
            body: body.to_string(),
            extra: Map::new(),
        };
        state.comments.push((issue, comment.clone()));
        Ok(comment)
    }
}
