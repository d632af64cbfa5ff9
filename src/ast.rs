// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::lexer::Span;

use core::fmt;
use std::rc::Rc;

pub type ExprRef = Rc<Expr>;

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BinOp {
    And,
    Or,
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum BoolOp {
    Lt,
    Le,
    Eq,
    Ge,
    Gt,
    Ne,
}

impl fmt::Display for BoolOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BoolOp::Lt => "<",
            BoolOp::Le => "<=",
            BoolOp::Eq => "==",
            BoolOp::Ge => ">=",
            BoolOp::Gt => ">",
            BoolOp::Ne => "!=",
        })
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl fmt::Display for ArithOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ArithOp::Add => "+",
            ArithOp::Sub => "-",
            ArithOp::Mul => "*",
            ArithOp::Div => "/",
            ArithOp::Mod => "%",
        })
    }
}

/// An Aladino expression.
///
/// Expressions are side-effect free; actions are dispatched by the engine
/// only after a guard expression has evaluated to a boolean.
#[derive(Debug)]
pub enum Expr {
    Bool {
        span: Span,
        value: bool,
    },

    Int {
        span: Span,
        value: i64,
    },

    String {
        span: Span,
        value: Rc<str>,
    },

    Array {
        span: Span,
        items: Vec<ExprRef>,
    },

    // A `$name` reference without a call: a variable bound by an enclosing
    // lambda or filter-group parameter.
    Variable {
        span: Span,
        name: Rc<str>,
    },

    Not {
        span: Span,
        expr: ExprRef,
    },

    // && and ||
    BinExpr {
        span: Span,
        op: BinOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },

    // == != < <= > >=
    BoolExpr {
        span: Span,
        op: BoolOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },

    // + - * / %
    ArithExpr {
        span: Span,
        op: ArithOp,
        lhs: ExprRef,
        rhs: ExprRef,
    },

    // array[index]
    Index {
        span: Span,
        array: ExprRef,
        index: ExprRef,
    },

    // $name(args...)
    Call {
        span: Span,
        name: Rc<str>,
        args: Vec<ExprRef>,
    },

    // ($x, $y: body)
    Lambda {
        span: Span,
        params: Vec<Rc<str>>,
        body: ExprRef,
    },
}

impl Expr {
    pub fn span(&self) -> &Span {
        use Expr::*;
        match self {
            Bool { span, .. }
            | Int { span, .. }
            | String { span, .. }
            | Array { span, .. }
            | Variable { span, .. }
            | Not { span, .. }
            | BinExpr { span, .. }
            | BoolExpr { span, .. }
            | ArithExpr { span, .. }
            | Index { span, .. }
            | Call { span, .. }
            | Lambda { span, .. } => span,
        }
    }
}
