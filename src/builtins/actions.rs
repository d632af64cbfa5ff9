// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::BuiltIns;
use crate::env::Env;
use crate::errors::{Error, Result};
use crate::value::{Kind, Value};

use anyhow::anyhow;

pub fn register(builtins: &mut BuiltIns) -> Result<()> {
    builtins.add_action("addLabel", vec![Kind::String], add_label)?;
    builtins.add_action("removeLabel", vec![Kind::String], remove_label)?;
    builtins.add_action("comment", vec![Kind::String], comment)?;
    builtins.add_action(
        "assignReviewer",
        vec![Kind::Array, Kind::Int],
        assign_reviewer,
    )?;
    builtins.add_action("assignRandomReviewer", vec![], assign_random_reviewer)?;
    builtins.add_action("assignAssignees", vec![Kind::Array], assign_assignees)?;
    builtins.add_action("merge", vec![Kind::String], merge)?;
    Ok(())
}

const MAX_ASSIGNEES: usize = 10;

/// Adds a label to the pull request. The label must already exist in the
/// repository.
fn add_label(env: &mut Env, args: &[Value]) -> Result<()> {
    let label = args[0].as_str("addLabel")?;
    let pr = env.pull_request().clone();

    let known = env
        .host()
        .get_label(&pr.owner, &pr.repo, &label)
        .map_err(Error::HostApi)?;
    if known.is_none() {
        return Err(Error::HostApi(anyhow!(
            "label `{label}` is not defined in the repository"
        )));
    }

    env.host()
        .add_label(&pr.owner, &pr.repo, pr.number, &label)
        .map_err(Error::HostApi)
}

/// Removes a label from the pull request; a label that is not applied is a
/// no-op. The label must already exist in the repository.
fn remove_label(env: &mut Env, args: &[Value]) -> Result<()> {
    let label = args[0].as_str("removeLabel")?;
    let pr = env.pull_request().clone();

    let known = env
        .host()
        .get_label(&pr.owner, &pr.repo, &label)
        .map_err(Error::HostApi)?;
    if known.is_none() {
        return Err(Error::HostApi(anyhow!(
            "label `{label}` is not defined in the repository"
        )));
    }

    if !pr.labels.iter().any(|l| l.as_str() == label.as_ref()) {
        return Ok(());
    }

    env.host()
        .remove_label(&pr.owner, &pr.repo, pr.number, &label)
        .map_err(Error::HostApi)
}

fn comment(env: &mut Env, args: &[Value]) -> Result<()> {
    let body = args[0].as_str("comment")?;
    let pr = env.pull_request().clone();
    env.host()
        .create_comment(&pr.owner, &pr.repo, pr.number, &body)
        .map_err(Error::HostApi)
}

/// Requests reviews from `total` members of the provided pool.
///
/// The author never reviews their own pull request. Reviewers who already
/// submitted a review are re-requested; reviewers with a pending request are
/// left alone. When the pool cannot cover the requested total, the total
/// clamps to the pool with a recorded warning. The remainder is drawn from
/// the environment's random source.
fn assign_reviewer(env: &mut Env, args: &[Value]) -> Result<()> {
    let pool = args[0].as_string_array("assignReviewer")?;
    let total = args[1].as_int("assignReviewer")?;
    if total <= 0 {
        return Err(Error::invalid_argument(
            "assignReviewer",
            format!("total of reviewers must be positive, got {total}"),
        ));
    }

    let pr = env.pull_request().clone();
    let mut available: Vec<String> = pool
        .iter()
        .map(|r| r.to_string())
        .filter(|r| *r != pr.author)
        .collect();

    let mut required = total as usize;
    if required > available.len() {
        env.report_mut().add_warning(format!(
            "assignReviewer: total of required reviewers {required} exceeds the total of available reviewers {}",
            available.len()
        ));
        required = available.len();
    }

    let mut reviewers: Vec<String> = vec![];

    // Reviewers from the pool who already reviewed get re-requested.
    let reviews = env
        .host()
        .list_reviews(&pr.owner, &pr.repo, pr.number)
        .map_err(Error::HostApi)?;
    for review in &reviews {
        if let Some(pos) = available.iter().position(|r| *r == review.user) {
            required = required.saturating_sub(1);
            reviewers.push(available.remove(pos));
        }
    }

    // Reviewers from the pool with a pending request count towards the
    // total but are not requested again.
    for requested in &pr.requested_reviewers {
        if let Some(pos) = available.iter().position(|r| r == requested) {
            required = required.saturating_sub(1);
            available.remove(pos);
        }
    }

    for _ in 0..required.min(available.len()) {
        let lucky = env.draw_index(available.len());
        reviewers.push(available.remove(lucky));
    }

    if reviewers.is_empty() {
        env.report_mut().add_warning(
            "assignReviewer: no reviewers to request; the pull request already has its reviewers"
                .to_string(),
        );
        return Ok(());
    }

    env.host()
        .request_reviewers(&pr.owner, &pr.repo, pr.number, &reviewers)
        .map_err(Error::HostApi)
}

/// Requests a review from a random repository collaborator other than the
/// author. Does nothing when reviewers are already requested, so repeated
/// pull request updates do not pile up reviewers.
fn assign_random_reviewer(env: &mut Env, _args: &[Value]) -> Result<()> {
    let pr = env.pull_request().clone();
    if !pr.requested_reviewers.is_empty() {
        return Ok(());
    }

    let collaborators = env
        .host()
        .list_collaborators(&pr.owner, &pr.repo)
        .map_err(Error::HostApi)?;
    let pool: Vec<String> = collaborators
        .into_iter()
        .filter(|c| *c != pr.author)
        .collect();
    if pool.is_empty() {
        return Err(Error::invalid_argument(
            "assignRandomReviewer",
            "there are no collaborators to assign".to_string(),
        ));
    }

    let lucky = env.draw_index(pool.len());
    env.host()
        .request_reviewers(&pr.owner, &pr.repo, pr.number, &pool[lucky..=lucky])
        .map_err(Error::HostApi)
}

fn assign_assignees(env: &mut Env, args: &[Value]) -> Result<()> {
    let assignees = args[0].as_string_array("assignAssignees")?;
    if assignees.is_empty() {
        env.report_mut()
            .add_warning("assignAssignees: list of assignees is empty".to_string());
        return Ok(());
    }

    let mut logins: Vec<String> = assignees.iter().map(|a| a.to_string()).collect();
    if logins.len() > MAX_ASSIGNEES {
        env.report_mut().add_warning(format!(
            "assignAssignees: clamping {} assignees to the maximum of {MAX_ASSIGNEES}",
            logins.len()
        ));
        logins.truncate(MAX_ASSIGNEES);
    }

    let pr = env.pull_request().clone();
    env.host()
        .add_assignees(&pr.owner, &pr.repo, pr.number, &logins)
        .map_err(Error::HostApi)
}

/// Merges the pull request with the given method (merge, rebase or squash).
fn merge(env: &mut Env, args: &[Value]) -> Result<()> {
    let method = args[0].as_str("merge")?;
    match method.as_ref() {
        "merge" | "rebase" | "squash" => (),
        other => {
            return Err(Error::invalid_argument(
                "merge",
                format!("unexpected merge method `{other}`"),
            ))
        }
    }

    let pr = env.pull_request().clone();
    env.host()
        .merge(&pr.owner, &pr.repo, pr.number, &method)
        .map_err(Error::HostApi)
}
