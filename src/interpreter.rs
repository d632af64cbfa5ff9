// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::*;
use crate::env::Env;
use crate::errors::{Error, Result};
use crate::lexer::Span;
use crate::parser::parse_expression;
use crate::value::{Lambda, Value};

use core::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Cache of parsed expressions, keyed by distinct expression text. Owned by
/// the engine and shared across interpreter instances of one run.
pub type ParseCache = RefCell<HashMap<String, ExprRef>>;

/// Evaluates Aladino expressions against an environment and its register
/// map. Expressions are side-effect free; the interpreter never dispatches
/// actions.
pub struct Interpreter<'a> {
    env: &'a Env,
    cache: &'a ParseCache,
    // Lambda/filter parameter bindings, innermost last.
    bindings: Vec<(Rc<str>, Value)>,
    // Rules currently being expanded, for cyclic reference detection.
    rule_stack: Vec<String>,
}

impl<'a> Interpreter<'a> {
    pub fn new(env: &'a Env, cache: &'a ParseCache) -> Self {
        Self {
            env,
            cache,
            bindings: vec![],
            rule_stack: vec![],
        }
    }

    pub(crate) fn parse_cached(&self, file: &str, text: &str) -> Result<ExprRef> {
        if let Some(expr) = self.cache.borrow().get(text) {
            return Ok(expr.clone());
        }
        let expr = parse_expression(file, text)?;
        self.cache
            .borrow_mut()
            .insert(text.to_string(), expr.clone());
        Ok(expr)
    }

    pub fn eval(&mut self, file: &str, text: &str) -> Result<Value> {
        let expr = self.parse_cached(file, text)?;
        self.eval_expr(&expr)
    }

    pub fn eval_bool(&mut self, file: &str, text: &str) -> Result<bool> {
        self.eval(file, text)?.as_bool("expression")
    }

    /// Expand a registered rule and evaluate it to a boolean. Rules may
    /// reference other rules; a reference back into a rule currently being
    /// expanded is a structural error.
    pub fn eval_rule(&mut self, name: &str) -> Result<bool> {
        if self.rule_stack.iter().any(|n| n == name) {
            return Err(Error::CyclicReference(name.to_string()));
        }
        let value = self
            .env
            .lookup(name)
            .ok_or_else(|| Error::UndefinedName(name.to_string()))?
            .clone();
        let lambda = value.as_function(&format!("rule `{name}`"))?;

        self.rule_stack.push(name.to_string());
        let result = self.eval_expr(&lambda.body);
        self.rule_stack.pop();
        result?.as_bool(&format!("rule `{name}`"))
    }

    /// Apply a lambda value to already-evaluated arguments.
    pub(crate) fn apply(&mut self, lambda: &Lambda, args: Vec<Value>) -> Result<Value> {
        if lambda.params.len() != args.len() {
            return Err(Error::ArgumentCount {
                name: "<lambda>".to_string(),
                expected: lambda.params.len(),
                got: args.len(),
            });
        }
        let depth = self.bindings.len();
        self.bindings
            .extend(lambda.params.iter().cloned().zip(args));
        let result = self.eval_expr(&lambda.body);
        self.bindings.truncate(depth);
        result
    }

    pub(crate) fn eval_expr(&mut self, expr: &ExprRef) -> Result<Value> {
        match expr.as_ref() {
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::Int { value, .. } => Ok(Value::Int(*value)),
            Expr::String { value, .. } => Ok(Value::String(value.clone())),
            Expr::Array { items, .. } => {
                let values: Result<Vec<Value>> =
                    items.iter().map(|item| self.eval_expr(item)).collect();
                Ok(Value::from_array(values?))
            }
            Expr::Variable { name, .. } => self
                .bindings
                .iter()
                .rev()
                .find(|(n, _)| n == name)
                .map(|(_, v)| v.clone())
                .ok_or_else(|| Error::UndefinedName(name.to_string())),
            Expr::Not { expr, .. } => {
                let value = self.eval_expr(expr)?.as_bool("`!` operand")?;
                Ok(Value::Bool(!value))
            }
            Expr::BinExpr { op, lhs, rhs, .. } => self.eval_bin_expr(*op, lhs, rhs),
            Expr::BoolExpr {
                span, op, lhs, rhs, ..
            } => {
                let lhs = self.eval_expr(lhs)?;
                let rhs = self.eval_expr(rhs)?;
                compare(span, *op, &lhs, &rhs)
            }
            Expr::ArithExpr {
                span, op, lhs, rhs, ..
            } => {
                let lhs = self.eval_expr(lhs)?.as_int(&format!("`{op}` operand"))?;
                let rhs = self.eval_expr(rhs)?.as_int(&format!("`{op}` operand"))?;
                arithmetic(span, *op, lhs, rhs)
            }
            Expr::Index {
                span, array, index, ..
            } => {
                let items = self.eval_expr(array)?.as_array("index expression")?;
                let idx = self.eval_expr(index)?.as_int("array index")?;
                if idx < 0 || idx as usize >= items.len() {
                    return Err(span.error(&format!(
                        "index {idx} out of bounds for array of length {}",
                        items.len()
                    )));
                }
                Ok(items[idx as usize].clone())
            }
            Expr::Lambda { params, body, .. } => Ok(Value::Function(Rc::new(Lambda {
                params: params.clone(),
                body: body.clone(),
            }))),
            Expr::Call {
                span, name, args, ..
            } => self.eval_call(span, name, args),
        }
    }

    // Short-circuit connectives: the right-hand side is not evaluated when
    // the left-hand side decides the result.
    fn eval_bin_expr(&mut self, op: BinOp, lhs: &ExprRef, rhs: &ExprRef) -> Result<Value> {
        let lhs = self.eval_expr(lhs)?.as_bool("logical operand")?;
        match (op, lhs) {
            (BinOp::And, false) => Ok(Value::Bool(false)),
            (BinOp::Or, true) => Ok(Value::Bool(true)),
            _ => {
                let rhs = self.eval_expr(rhs)?.as_bool("logical operand")?;
                Ok(Value::Bool(rhs))
            }
        }
    }

    fn eval_call(&mut self, span: &Span, name: &str, args: &[ExprRef]) -> Result<Value> {
        let env = self.env;

        // Rule references resolve through the register map and expand
        // recursively; they are a language form, not a registry entry.
        if name == "rule" {
            if args.len() != 1 {
                return Err(Error::ArgumentCount {
                    name: "rule".to_string(),
                    expected: 1,
                    got: args.len(),
                });
            }
            let rule_name = self.eval_expr(&args[0])?.as_str("rule")?;
            return self.eval_rule(&rule_name).map(Value::Bool);
        }

        let arity = match env.builtins().function(name) {
            Some(function) => function.ty.arity(),
            None if env.builtins().action(name).is_some() => {
                return Err(span.error(&format!(
                    "action `{name}` cannot be called in an expression"
                )));
            }
            None => return Err(Error::UndefinedName(name.to_string())),
        };

        // Arity is checked before any argument is evaluated.
        if arity != args.len() {
            return Err(Error::ArgumentCount {
                name: name.to_string(),
                expected: arity,
                got: args.len(),
            });
        }

        let values: Result<Vec<Value>> = args.iter().map(|arg| self.eval_expr(arg)).collect();
        env.builtins().call_function(env, name, &values?)
    }
}

fn compare(span: &Span, op: BoolOp, lhs: &Value, rhs: &Value) -> Result<Value> {
    if lhs.kind() != rhs.kind() {
        return Err(Error::type_mismatch(
            &format!("`{op}` right operand"),
            lhs.kind(),
            rhs.kind(),
        ));
    }

    let ordering = match (lhs, rhs) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        _ => {
            // Equality is defined for every kind; ordering only for ints
            // and strings.
            return match op {
                BoolOp::Eq => Ok(Value::Bool(lhs == rhs)),
                BoolOp::Ne => Ok(Value::Bool(lhs != rhs)),
                _ => Err(span.error(&format!(
                    "`{op}` is not defined for {} values",
                    lhs.kind()
                ))),
            };
        }
    };

    Ok(Value::Bool(match op {
        BoolOp::Lt => ordering.is_lt(),
        BoolOp::Le => ordering.is_le(),
        BoolOp::Eq => ordering.is_eq(),
        BoolOp::Ge => ordering.is_ge(),
        BoolOp::Gt => ordering.is_gt(),
        BoolOp::Ne => ordering.is_ne(),
    }))
}

fn arithmetic(span: &Span, op: ArithOp, lhs: i64, rhs: i64) -> Result<Value> {
    let result = match op {
        ArithOp::Add => lhs.checked_add(rhs),
        ArithOp::Sub => lhs.checked_sub(rhs),
        ArithOp::Mul => lhs.checked_mul(rhs),
        ArithOp::Div if rhs == 0 => return Err(span.error("division by zero")),
        ArithOp::Div => lhs.checked_div(rhs),
        ArithOp::Mod if rhs == 0 => return Err(span.error("modulo by zero")),
        ArithOp::Mod => lhs.checked_rem(rhs),
    };
    match result {
        Some(n) => Ok(Value::Int(n)),
        None => Err(span.error("integer overflow")),
    }
}
