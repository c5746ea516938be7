use crate::error::{GithubError, GithubResult};
use crate::model::{Branch, Comment, Issue, NewPullRequest, PullRequest, RepoId};
use crate::tracker::{IssueTracker, PAGE_SIZE};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use common::GithubConfig;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error, info};

const USER_AGENT: &str = concat!("nautilex/", env!("CARGO_PKG_VERSION"));
const API_VERSION: &str = "2022-11-28";

/// REST client for one repository.
///
/// Built without a token it still constructs, but every call fails with
/// [`GithubError::Unauthenticated`] before touching the network.
#[derive(Debug, Clone)]
pub struct GithubClient {
    client: Client,
    api_url: String,
    repo: RepoId,
    token: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RepoInfo {
    default_branch: String,
}

impl GithubClient {
    pub fn new(repo: RepoId, token: Option<String>) -> GithubResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self {
            client,
            api_url: "https://api.github.com".to_string(),
            repo,
            token: token.filter(|t| !t.trim().is_empty()),
        })
    }

    pub fn from_config(config: &GithubConfig) -> GithubResult<Self> {
        let repo = RepoId::parse(&config.repo)?;
        Ok(Self::new(repo, config.token.clone())?.with_api_url(&config.api_url))
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_authenticated(&self) -> bool {
        self.token.is_some()
    }

    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}{}",
            self.api_url, self.repo.owner, self.repo.name, path
        )
    }

    fn request(&self, method: Method, path: &str) -> GithubResult<RequestBuilder> {
        let token = self.token.as_ref().ok_or(GithubError::Unauthenticated)?;
        Ok(self
            .client
            .request(method, self.repo_url(path))
            .bearer_auth(token)
            .header("Accept", "application/vnd.github+json")
            .header("X-GitHub-Api-Version", API_VERSION))
    }

    async fn check(response: Response, what: &str) -> GithubResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        if status.as_u16() == 404 {
            return Err(GithubError::NotFound(what.to_string()));
        }
        error!(status = status.as_u16(), what, "Unexpected response from GitHub");
        Err(GithubError::UnexpectedStatus {
            status: status.as_u16(),
            body,
        })
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: RequestBuilder,
        what: &str,
    ) -> GithubResult<T> {
        let response = Self::check(builder.send().await?, what).await?;
        Ok(serde_json::from_str(&response.text().await?)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str, what: &str) -> GithubResult<T> {
        debug!(repo = %self.repo, path, "GitHub GET");
        self.send_json(self.request(Method::GET, path)?, what).await
    }

    async fn first_page<T: DeserializeOwned>(
        &self,
        path: &str,
        open_only: bool,
        what: &str,
    ) -> GithubResult<Vec<T>> {
        let mut builder = self
            .request(Method::GET, path)?
            .query(&[("per_page", PAGE_SIZE), ("page", 1)]);
        if open_only {
            builder = builder.query(&[("state", "open")]);
        }
        self.send_json(builder, what).await
    }
}

#[async_trait]
impl IssueTracker for GithubClient {
    fn repo(&self) -> &RepoId {
        &self.repo
    }

    async fn list_open_issues(&self) -> GithubResult<Vec<Issue>> {
        self.first_page("/issues", true, "issues").await
    }

    async fn get_issue(&self, number: u64) -> GithubResult<Issue> {
        self.get_json(&format!("/issues/{}", number), &format!("issue #{}", number))
            .await
    }

    async fn list_branches(&self) -> GithubResult<Vec<Branch>> {
        self.first_page("/branches", false, "branches").await
    }

    async fn list_open_pull_requests(&self) -> GithubResult<Vec<PullRequest>> {
        self.first_page("/pulls", true, "pull requests").await
    }

    async fn get_pull_request(&self, number: u64) -> GithubResult<PullRequest> {
        self.get_json(
            &format!("/pulls/{}", number),
            &format!("pull request #{}", number),
        )
        .await
    }

    async fn default_branch(&self) -> GithubResult<String> {
        let info: RepoInfo = self.get_json("", "repository").await?;
        Ok(info.default_branch)
    }

    async fn branch_sha(&self, branch: &str) -> GithubResult<String> {
        let branch: Branch = self
            .get_json(
                &format!("/branches/{}", urlencoding::encode(branch)),
                &format!("branch {}", branch),
            )
            .await?;
        Ok(branch.commit.sha)
    }

    async fn create_branch(&self, name: &str, from_sha: &str) -> GithubResult<()> {
        let builder = self.request(Method::POST, "/git/refs")?.json(&json!({
            "ref": format!("refs/heads/{}", name),
            "sha": from_sha,
        }));
        let _: Value = self.send_json(builder, "git refs").await?;
        info!(repo = %self.repo, branch = name, "Created branch");
        Ok(())
    }

    async fn create_file(
        &self,
        branch: &str,
        path: &str,
        message: &str,
        content: &str,
    ) -> GithubResult<()> {
        let builder = self
            .request(Method::PUT, &format!("/contents/{}", path))?
            .json(&json!({
                "message": message,
                "content": STANDARD.encode(content.as_bytes()),
                "branch": branch,
            }));
        let _: Value = self.send_json(builder, "contents").await?;
        info!(repo = %self.repo, branch, path, "Committed file");
        Ok(())
    }

    async fn create_pull_request(&self, request: &NewPullRequest) -> GithubResult<PullRequest> {
        let builder = self.request(Method::POST, "/pulls")?.json(request);
        let pr: PullRequest = self.send_json(builder, "pulls").await?;
        info!(repo = %self.repo, number = pr.number, "Opened pull request");
        Ok(pr)
    }

    async fn post_comment(&self, issue: u64, body: &str) -> GithubResult<Comment> {
        let builder = self
            .request(Method::POST, &format!("/issues/{}/comments", issue))?
            .json(&json!({ "body": body }));
        self.send_json(builder, &format!("issue #{}", issue)).await
    }
}
