// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

//! Mock wiring for exercising built-ins and programs without a live code
//! host. Used by this crate's tests and by downstream plugin tests.

use crate::builtins::BuiltIns;
use crate::codehost::{CodeHost, CommitFile, Issue, PullRequest, Review};
use crate::env::{CancelToken, Collector, Env, NoopCollector};
use crate::errors::Result;

use core::cell::RefCell;
use std::rc::Rc;

use anyhow::anyhow;

pub const DEFAULT_OWNER: &str = "mock-owner";
pub const DEFAULT_REPO: &str = "mock-repo";
pub const DEFAULT_AUTHOR: &str = "john";
pub const DEFAULT_PR_NUMBER: u64 = 6;

/// A recording code host. Every call is logged; `fail_on` forces one method
/// to fail so host-API error paths can be exercised.
#[derive(Default)]
pub struct MockHost {
    repo_labels: Vec<String>,
    collaborators: Vec<String>,
    reviews: Vec<Review>,
    issues: Vec<Issue>,
    fail_on: Option<String>,
    calls: RefCell<Vec<String>>,
}

impl MockHost {
    pub fn new() -> MockHost {
        MockHost::default()
    }

    pub fn with_repo_labels(mut self, labels: &[&str]) -> Self {
        self.repo_labels = labels.iter().map(|l| l.to_string()).collect();
        self
    }

    pub fn with_collaborators(mut self, collaborators: &[&str]) -> Self {
        self.collaborators = collaborators.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_reviews(mut self, reviews: Vec<Review>) -> Self {
        self.reviews = reviews;
        self
    }

    pub fn with_issues(mut self, issues: Vec<Issue>) -> Self {
        self.issues = issues;
        self
    }

    pub fn failing_on(mut self, method: &str) -> Self {
        self.fail_on = Some(method.to_string());
        self
    }

    /// Every network invocation recorded so far, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    fn record(&self, call: String) -> anyhow::Result<()> {
        let method = call.split('(').next().unwrap_or("").to_string();
        if self.fail_on.as_deref() == Some(method.as_str()) {
            return Err(anyhow!("{method}: mocked request failure"));
        }
        self.calls.borrow_mut().push(call);
        Ok(())
    }
}

impl CodeHost for MockHost {
    fn get_label(&self, _owner: &str, _repo: &str, name: &str) -> anyhow::Result<Option<String>> {
        self.record(format!("get_label({name})"))?;
        Ok(self
            .repo_labels
            .iter()
            .find(|l| l.as_str() == name)
            .cloned())
    }

    fn add_label(&self, _owner: &str, _repo: &str, number: u64, label: &str) -> anyhow::Result<()> {
        self.record(format!("add_label(#{number}, {label})"))
    }

    fn remove_label(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        label: &str,
    ) -> anyhow::Result<()> {
        self.record(format!("remove_label(#{number}, {label})"))
    }

    fn create_comment(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        body: &str,
    ) -> anyhow::Result<()> {
        self.record(format!("create_comment(#{number}, {body})"))
    }

    fn request_reviewers(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        reviewers: &[String],
    ) -> anyhow::Result<()> {
        self.record(format!("request_reviewers(#{number}, {})", reviewers.join(", ")))
    }

    fn add_assignees(
        &self,
        _owner: &str,
        _repo: &str,
        number: u64,
        assignees: &[String],
    ) -> anyhow::Result<()> {
        self.record(format!("add_assignees(#{number}, {})", assignees.join(", ")))
    }

    fn list_collaborators(&self, _owner: &str, _repo: &str) -> anyhow::Result<Vec<String>> {
        self.record("list_collaborators()".to_string())?;
        Ok(self.collaborators.clone())
    }

    fn list_reviews(&self, _owner: &str, _repo: &str, _number: u64) -> anyhow::Result<Vec<Review>> {
        self.record("list_reviews()".to_string())?;
        Ok(self.reviews.clone())
    }

    fn list_issues(&self, _owner: &str, _repo: &str) -> anyhow::Result<Vec<Issue>> {
        self.record("list_issues()".to_string())?;
        Ok(self.issues.clone())
    }

    fn merge(&self, _owner: &str, _repo: &str, number: u64, method: &str) -> anyhow::Result<()> {
        self.record(format!("merge(#{number}, {method})"))
    }
}

pub fn mock_pull_request() -> PullRequest {
    PullRequest {
        number: DEFAULT_PR_NUMBER,
        owner: DEFAULT_OWNER.to_string(),
        repo: DEFAULT_REPO.to_string(),
        title: "Amazing new feature".to_string(),
        body: "Please pull these awesome changes in!".to_string(),
        author: DEFAULT_AUTHOR.to_string(),
        draft: false,
        labels: vec!["enhancement".to_string()],
        assignees: vec![],
        requested_reviewers: vec![],
        base_ref: "main".to_string(),
        head_ref: "new-topic".to_string(),
    }
}

/// One file with four changed lines (two removed, two added).
pub fn mock_commit_files() -> Vec<CommitFile> {
    vec![CommitFile {
        filename: "src/main.go".to_string(),
        patch: Some(
            "@@ -2,4 +2,4 @@ package main\n context line\n-func previous1() {\n-func previous2() {\n+func new1() {\n+func new2() {\n context line"
                .to_string(),
        ),
    }]
}

/// Build a mock environment over the default pull request. The random
/// source is seeded so selections are deterministic.
pub fn mock_env(host: Rc<MockHost>, dry_run: bool) -> Result<Env> {
    mock_env_with(host, dry_run, mock_pull_request(), mock_commit_files())
}

pub fn mock_env_with(
    host: Rc<MockHost>,
    dry_run: bool,
    pull_request: PullRequest,
    files: Vec<CommitFile>,
) -> Result<Env> {
    let collector: Rc<dyn Collector> = Rc::new(NoopCollector);
    Env::new(
        CancelToken::new(),
        dry_run,
        host,
        collector,
        pull_request,
        files,
        serde_json::Value::Null,
        Rc::new(BuiltIns::defaults()?),
        Some(42),
    )
}
