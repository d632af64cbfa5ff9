// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use serde::{Deserialize, Serialize};

/// Snapshot of the pull request under evaluation, as supplied by the event
/// ingestion collaborator. The runtime never refreshes it mid-run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub owner: String,
    pub repo: String,
    pub title: String,
    #[serde(default)]
    pub body: String,
    pub author: String,
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub labels: Vec<String>,
    #[serde(default)]
    pub assignees: Vec<String>,
    #[serde(default)]
    pub requested_reviewers: Vec<String>,
    pub base_ref: String,
    pub head_ref: String,
}

/// One changed file as reported by the code host. `patch` carries raw
/// unified-diff text and is absent for binary files.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CommitFile {
    pub filename: String,
    #[serde(default)]
    pub patch: Option<String>,
}

/// A submitted pull request review.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Review {
    pub user: String,
    pub state: String,
}

/// One entry of the repository issue listing. The code host reports pull
/// requests through the same listing, flagged by `is_pull_request`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    pub author: String,
    pub state: String,
    #[serde(default)]
    pub is_pull_request: bool,
}

/// The host-API capability. Implemented over HTTP by the code-host client
/// collaborator; implemented as a recorder by the test doubles. Retry of
/// failed calls is this collaborator's concern, never the runtime's.
pub trait CodeHost {
    /// Look up a repository label by name; `None` when it does not exist.
    fn get_label(&self, owner: &str, repo: &str, name: &str) -> anyhow::Result<Option<String>>;

    fn add_label(&self, owner: &str, repo: &str, number: u64, label: &str) -> anyhow::Result<()>;

    fn remove_label(&self, owner: &str, repo: &str, number: u64, label: &str)
        -> anyhow::Result<()>;

    fn create_comment(&self, owner: &str, repo: &str, number: u64, body: &str)
        -> anyhow::Result<()>;

    fn request_reviewers(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        reviewers: &[String],
    ) -> anyhow::Result<()>;

    fn add_assignees(
        &self,
        owner: &str,
        repo: &str,
        number: u64,
        assignees: &[String],
    ) -> anyhow::Result<()>;

    fn list_collaborators(&self, owner: &str, repo: &str) -> anyhow::Result<Vec<String>>;

    /// Every issue and pull request of the repository, regardless of state.
    fn list_issues(&self, owner: &str, repo: &str) -> anyhow::Result<Vec<Issue>>;

    fn list_reviews(&self, owner: &str, repo: &str, number: u64) -> anyhow::Result<Vec<Review>>;

    fn merge(&self, owner: &str, repo: &str, number: u64, method: &str) -> anyhow::Result<()>;
}
