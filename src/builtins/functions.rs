// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::BuiltIns;
use crate::env::Env;
use crate::errors::{Error, Result};
use crate::value::{Kind, Value};

use regex::Regex;

pub fn register(builtins: &mut BuiltIns) -> Result<()> {
    builtins.add_function("size", vec![], Kind::Int, size)?;
    builtins.add_function("fileCount", vec![], Kind::Int, file_count)?;
    builtins.add_function("hasFileName", vec![Kind::String], Kind::Bool, has_file_name)?;
    builtins.add_function(
        "hasFileExtension",
        vec![Kind::Array],
        Kind::Bool,
        has_file_extension,
    )?;
    builtins.add_function(
        "hasFilePattern",
        vec![Kind::String],
        Kind::Bool,
        has_file_pattern,
    )?;
    builtins.add_function(
        "hasCodePattern",
        vec![Kind::String],
        Kind::Bool,
        has_code_pattern,
    )?;
    builtins.add_function("author", vec![], Kind::String, author)?;
    builtins.add_function("title", vec![], Kind::String, title)?;
    builtins.add_function("description", vec![], Kind::String, description)?;
    builtins.add_function("isDraft", vec![], Kind::Bool, is_draft)?;
    builtins.add_function("labels", vec![], Kind::Array, labels)?;
    builtins.add_function("assignees", vec![], Kind::Array, assignees)?;
    builtins.add_function("reviewers", vec![], Kind::Array, reviewers)?;
    builtins.add_function("base", vec![], Kind::String, base)?;
    builtins.add_function("head", vec![], Kind::String, head)?;
    builtins.add_function("group", vec![Kind::String], Kind::Array, group)?;
    builtins.add_function(
        "pullRequestCountBy",
        vec![Kind::String, Kind::String],
        Kind::Int,
        pull_request_count_by,
    )?;
    builtins.add_function(
        "isElementOf",
        vec![Kind::String, Kind::Array],
        Kind::Bool,
        is_element_of,
    )?;
    builtins.add_function(
        "contains",
        vec![Kind::String, Kind::String],
        Kind::Bool,
        contains,
    )?;
    Ok(())
}

fn compile_pattern(fcn: &str, pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| Error::invalid_argument(fcn, e.to_string()))
}

fn string_array(items: impl IntoIterator<Item = String>) -> Value {
    Value::from_array(items.into_iter().map(Value::from).collect())
}

/// Total added plus removed lines across the patch.
fn size(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(Value::Int(env.patch().total_changed_lines() as i64))
}

fn file_count(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(Value::Int(env.patch().len() as i64))
}

fn has_file_name(env: &Env, args: &[Value]) -> Result<Value> {
    let name = args[0].as_str("hasFileName")?;
    Ok(Value::Bool(env.patch().get(&name).is_some()))
}

fn has_file_extension(env: &Env, args: &[Value]) -> Result<Value> {
    let extensions = args[0].as_string_array("hasFileExtension")?;
    let matched = env.patch().iter().any(|file| {
        let name = file.filename().to_lowercase();
        extensions
            .iter()
            .any(|ext| name.ends_with(&ext.to_lowercase()))
    });
    Ok(Value::Bool(matched))
}

fn has_file_pattern(env: &Env, args: &[Value]) -> Result<Value> {
    let pattern = args[0].as_str("hasFilePattern")?;
    let re = compile_pattern("hasFilePattern", &pattern)?;
    let matched = env.patch().iter().any(|file| re.is_match(file.filename()));
    Ok(Value::Bool(matched))
}

/// True when any changed line in the patch matches the pattern.
fn has_code_pattern(env: &Env, args: &[Value]) -> Result<Value> {
    let pattern = args[0].as_str("hasCodePattern")?;
    let re = compile_pattern("hasCodePattern", &pattern)?;
    let matched = env.patch().iter().any(|file| file.diff().has_pattern(&re));
    Ok(Value::Bool(matched))
}

fn author(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(env.pull_request().author.as_str()))
}

fn title(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(env.pull_request().title.as_str()))
}

fn description(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(env.pull_request().body.as_str()))
}

fn is_draft(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(Value::Bool(env.pull_request().draft))
}

fn labels(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(string_array(env.pull_request().labels.clone()))
}

fn assignees(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(string_array(env.pull_request().assignees.clone()))
}

/// The currently requested reviewers.
fn reviewers(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(string_array(env.pull_request().requested_reviewers.clone()))
}

fn base(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(env.pull_request().base_ref.as_str()))
}

fn head(env: &Env, _args: &[Value]) -> Result<Value> {
    Ok(Value::from(env.pull_request().head_ref.as_str()))
}

/// Resolve a registered group to its member list.
fn group(env: &Env, args: &[Value]) -> Result<Value> {
    let name = args[0].as_str("group")?;
    match env.lookup(&name) {
        Some(value) => value.as_array("group").map(Value::Array),
        None => Err(Error::UndefinedName(name.to_string())),
    }
}

/// Number of repository pull requests by author login and state. An empty
/// login or state matches everything.
fn pull_request_count_by(env: &Env, args: &[Value]) -> Result<Value> {
    let login = args[0].as_str("pullRequestCountBy")?;
    let state = args[1].as_str("pullRequestCountBy")?;

    let pr = env.pull_request();
    let issues = env
        .host()
        .list_issues(&pr.owner, &pr.repo)
        .map_err(Error::HostApi)?;
    let count = issues
        .iter()
        .filter(|issue| issue.is_pull_request)
        .filter(|issue| login.is_empty() || issue.author.as_str() == login.as_ref())
        .filter(|issue| state.is_empty() || issue.state.as_str() == state.as_ref())
        .count();
    Ok(Value::Int(count as i64))
}

fn is_element_of(_env: &Env, args: &[Value]) -> Result<Value> {
    let needle = args[0].clone();
    let haystack = args[1].as_array("isElementOf")?;
    Ok(Value::Bool(haystack.iter().any(|v| *v == needle)))
}

fn contains(_env: &Env, args: &[Value]) -> Result<Value> {
    let text = args[0].as_str("contains")?;
    let fragment = args[1].as_str("contains")?;
    Ok(Value::Bool(text.contains(fragment.as_ref())))
}
