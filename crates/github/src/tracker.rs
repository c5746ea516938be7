use crate::error::GithubResult;
use crate::model::{Branch, Comment, Issue, NewPullRequest, PullRequest, RepoId};
use async_trait::async_trait;

/// Listings only ever return the first page of this many items
pub const PAGE_SIZE: u32 = 30;

/// Read and write operations against the fixed upstream repository
#[async_trait]
pub trait IssueTracker: Send + Sync {
    fn repo(&self) -> &RepoId;

    async fn list_open_issues(&self) -> GithubResult<Vec<Issue>>;

    async fn get_issue(&self, number: u64) -> GithubResult<Issue>;

    async fn list_branches(&self) -> GithubResult<Vec<Branch>>;

    async fn list_open_pull_requests(&self) -> GithubResult<Vec<PullRequest>>;

    async fn get_pull_request(&self, number: u64) -> GithubResult<PullRequest>;

    async fn default_branch(&self) -> GithubResult<String>;

    /// Head commit of `branch`
    async fn branch_sha(&self, branch: &str) -> GithubResult<String>;

    async fn create_branch(&self, name: &str, from_sha: &str) -> GithubResult<()>;

    /// Commit a new file; `content` is plain text and encoded by the implementation
    async fn create_file(
        &self,
        branch: &str,
        path: &str,
        message: &str,
        content: &str,
    ) -> GithubResult<()>;

    async fn create_pull_request(&self, request: &NewPullRequest) -> GithubResult<PullRequest>;

    async fn post_comment(&self, issue: u64, body: &str) -> GithubResult<Comment>;
}
