// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::ExprRef;
use crate::errors::{Error, Result};

use core::fmt;
use std::rc::Rc;

/// A lambda value: named parameters over a side-effect-free body.
///
/// Rules are registered as zero-parameter lambdas; filter groups bind one
/// parameter per candidate developer.
#[derive(Debug)]
pub struct Lambda {
    pub params: Vec<Rc<str>>,
    pub body: ExprRef,
}

/// An Aladino runtime value.
///
/// The set of kinds is closed; every operation dispatches exhaustively on
/// kind and fails with a kind mismatch rather than converting implicitly.
/// Construction sites enforce kind/payload agreement, so a tag can never
/// disagree with its payload.
#[derive(Debug, Clone)]
pub enum Value {
    Bool(bool),
    Int(i64),
    String(Rc<str>),
    Array(Rc<Vec<Value>>),
    Function(Rc<Lambda>),
}

/// The kind tag of a [`Value`], used in function signatures and call-site
/// checking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Bool,
    Int,
    String,
    Array,
    Function,
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Kind::Bool => "bool",
            Kind::Int => "int",
            Kind::String => "string",
            Kind::Array => "array",
            Kind::Function => "function",
        })
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            // Strings display bare; the report format relies on this.
            Value::String(s) => f.write_str(s),
            Value::Array(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{item}")?;
                }
                f.write_str("]")
            }
            Value::Function(_) => f.write_str("<function>"),
        }
    }
}

impl Value {
    pub fn kind(&self) -> Kind {
        match self {
            Value::Bool(_) => Kind::Bool,
            Value::Int(_) => Kind::Int,
            Value::String(_) => Kind::String,
            Value::Array(_) => Kind::Array,
            Value::Function(_) => Kind::Function,
        }
    }

    pub fn from_array(items: Vec<Value>) -> Value {
        Value::Array(Rc::new(items))
    }

    pub fn as_bool(&self, context: &str) -> Result<bool> {
        match self {
            Value::Bool(b) => Ok(*b),
            v => Err(Error::type_mismatch(context, Kind::Bool, v.kind())),
        }
    }

    pub fn as_int(&self, context: &str) -> Result<i64> {
        match self {
            Value::Int(n) => Ok(*n),
            v => Err(Error::type_mismatch(context, Kind::Int, v.kind())),
        }
    }

    pub fn as_str(&self, context: &str) -> Result<Rc<str>> {
        match self {
            Value::String(s) => Ok(s.clone()),
            v => Err(Error::type_mismatch(context, Kind::String, v.kind())),
        }
    }

    pub fn as_array(&self, context: &str) -> Result<Rc<Vec<Value>>> {
        match self {
            Value::Array(items) => Ok(items.clone()),
            v => Err(Error::type_mismatch(context, Kind::Array, v.kind())),
        }
    }

    pub fn as_function(&self, context: &str) -> Result<Rc<Lambda>> {
        match self {
            Value::Function(l) => Ok(l.clone()),
            v => Err(Error::type_mismatch(context, Kind::Function, v.kind())),
        }
    }

    /// Collect an array of strings, failing on the first non-string element.
    pub fn as_string_array(&self, context: &str) -> Result<Vec<Rc<str>>> {
        let items = self.as_array(context)?;
        items.iter().map(|v| v.as_str(context)).collect()
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Value {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Value {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Value {
        Value::String(s.into())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Value {
        Value::String(s.into())
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Value {
        Value::from_array(items)
    }
}

/// Most builtins take a handful of arguments; a longer signature is a
/// registration bug, not a runtime condition.
pub const MAX_ARITY: usize = 8;

/// A callable's signature: ordered parameter kinds and an optional return
/// kind. Actions carry no return kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionType {
    params: Vec<Kind>,
    ret: Option<Kind>,
}

impl FunctionType {
    /// Build a signature, validating it at registry construction time.
    pub fn new(params: Vec<Kind>, ret: Option<Kind>) -> Result<FunctionType> {
        if params.len() > MAX_ARITY {
            return Err(Error::Parse(format!(
                "signature declares {} parameters; at most {MAX_ARITY} are supported",
                params.len()
            )));
        }
        Ok(FunctionType { params, ret })
    }

    pub fn params(&self) -> &[Kind] {
        &self.params
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn ret(&self) -> Option<Kind> {
        self.ret
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_tags_match_payloads() {
        assert_eq!(Value::from(true).kind(), Kind::Bool);
        assert_eq!(Value::from(4i64).kind(), Kind::Int);
        assert_eq!(Value::from("x").kind(), Kind::String);
        assert_eq!(Value::from_array(vec![]).kind(), Kind::Array);
    }

    #[test]
    fn accessors_reject_wrong_kind() {
        let err = Value::from(1i64).as_str("test").unwrap_err();
        assert!(err.to_string().contains("expected string"));
    }

    #[test]
    fn display_is_report_friendly() {
        assert_eq!(Value::from("small").to_string(), "small");
        assert_eq!(
            Value::from_array(vec![Value::from("a"), Value::from(2i64)]).to_string(),
            "[a, 2]"
        );
    }

    #[test]
    fn oversized_signature_is_rejected() {
        assert!(FunctionType::new(vec![Kind::Int; MAX_ARITY + 1], None).is_err());
        assert!(FunctionType::new(vec![Kind::Int], Some(Kind::Bool)).is_ok());
    }
}
