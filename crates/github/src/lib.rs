//! Issue and pull-request access for one fixed upstream repository.

pub mod client;
pub mod error;
pub mod memory;
pub mod model;
pub mod tracker;

pub use client::GithubClient;
pub use error::{GithubError, GithubResult};
pub use memory::{CommittedFile, InMemoryTracker};
pub use model::{Branch, Comment, Issue, NewPullRequest, PullRequest, RepoId};
pub use tracker::{IssueTracker, PAGE_SIZE};
