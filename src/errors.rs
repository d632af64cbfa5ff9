// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::value::Kind;

use thiserror::Error;

/// Errors raised by parsing, evaluation and action dispatch.
#[derive(Debug, Error)]
pub enum Error {
    /// Lexical, syntactic or structural failure. Parse errors carry the
    /// caret-annotated message produced at the offending span.
    #[error("{0}")]
    Parse(String),

    /// A value had the wrong kind for where it was used. There are no
    /// implicit conversions.
    #[error("{context}: expected {expected} value, got {got} value")]
    TypeMismatch {
        context: String,
        expected: Kind,
        got: Kind,
    },

    /// A call supplied the wrong number of arguments. Raised before any
    /// argument is evaluated.
    #[error("`{name}` expects {expected} argument(s), got {got}")]
    ArgumentCount {
        name: String,
        expected: usize,
        got: usize,
    },

    /// A name was neither registered nor known to the built-in registry.
    #[error("`{0}` is not defined")]
    UndefinedName(String),

    /// A registration collided with an existing binding of the same name.
    #[error("`{0}` is already defined")]
    DuplicateDefinition(String),

    /// A rule expansion referred back to a rule currently being expanded.
    #[error("cyclic reference while evaluating rule `{0}`")]
    CyclicReference(String),

    /// An argument had the right kind but an unusable value.
    #[error("`{name}`: {reason}")]
    InvalidArgument { name: String, reason: String },

    /// A code-host request failed.
    #[error("host api error: {0}")]
    HostApi(#[source] anyhow::Error),

    /// The run was cancelled before this operation could proceed.
    #[error("execution cancelled")]
    Cancelled,
}

impl Error {
    pub(crate) fn type_mismatch(context: &str, expected: Kind, got: Kind) -> Error {
        Error::TypeMismatch {
            context: context.to_string(),
            expected,
            got,
        }
    }

    pub(crate) fn invalid_argument(name: impl Into<String>, reason: impl Into<String>) -> Error {
        Error::InvalidArgument {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = core::result::Result<T, Error>;
