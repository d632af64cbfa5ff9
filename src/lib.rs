// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

// Use README.md as crate documentation.
#![doc = include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/README.md"))]

mod ast;
mod builtins;
mod codehost;
mod engine;
mod env;
mod errors;
mod interpreter;
mod lexer;
mod parser;
mod patch;
mod value;

pub mod test_utils;

pub use builtins::{ActionCode, BuiltInAction, BuiltInFunction, BuiltIns, FunctionCode};
pub use codehost::{CodeHost, CommitFile, Issue, PullRequest, Review};
pub use engine::{
    Engine, ExitStatus, Group, GroupKind, GroupType, Label, Program, ReportMode, Rule, Statement,
};
pub use env::{CancelToken, Collector, Env, NoopCollector, RegisterMap, Report};
pub use errors::{Error, Result};
pub use interpreter::{Interpreter, ParseCache};
pub use patch::{diff_from_hunks, parse_file_patch, Diff, File, Hunk, HunkLine, Line, LineKind, Patch};
pub use value::{FunctionType, Kind, Lambda, Value};

/// Items in `unstable` are likely to change.
pub mod unstable {
    pub use crate::ast::*;
    pub use crate::lexer::*;
    pub use crate::parser::*;
}
