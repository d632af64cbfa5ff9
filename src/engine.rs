// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::ast::Expr;
use crate::env::Env;
use crate::errors::{Error, Result};
use crate::interpreter::{Interpreter, ParseCache};
use crate::value::{Lambda, Value};

use std::rc::Rc;

use serde::{Deserialize, Serialize};
use serde_json::json;

/// Outcome of one program run, consumed by the invoking process as its exit
/// code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitStatus {
    Success,
    Failure,
}

impl ExitStatus {
    pub fn code(self) -> i32 {
        match self {
            ExitStatus::Success => 0,
            ExitStatus::Failure => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupKind {
    Developer,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupType {
    Static,
    Filter,
}

/// A named set of developers: either a static member list or a filter over
/// the repository collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub kind: GroupKind,
    #[serde(rename = "type")]
    pub group_type: GroupType,
    pub expr: String,
    #[serde(default)]
    pub param: Option<String>,
    #[serde(default, rename = "where")]
    pub where_expr: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Label {
    pub id: String,
    pub name: String,
}

/// A named boolean expression over pull-request and patch state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub name: String,
    pub spec: String,
}

/// A rule-set-guarded, ordered list of action calls. The guard is the
/// conjunction of the named rules.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Statement {
    pub rules: Vec<String>,
    pub actions: Vec<String>,
}

/// A pre-parsed policy document. The config-loading collaborator produces
/// this; the runtime only ever parses the expression strings inside it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Program {
    #[serde(default)]
    pub groups: Vec<Group>,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub rules: Vec<Rule>,
    #[serde(default)]
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportMode {
    Concise,
    Verbose,
}

/// The Aladino program execution engine.
///
/// Execution is two-phase: registration populates the register map (groups,
/// labels, rules) with uniqueness and parse checks; execution then walks the
/// statements in program order. Registration completes fully before any
/// statement runs, so rules may reference rules defined later in the
/// document.
pub struct Engine {
    env: Env,
    cache: ParseCache,
}

impl Engine {
    pub fn new(env: Env) -> Engine {
        Engine {
            env,
            cache: ParseCache::default(),
        }
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    /// Register a group binding. Static groups evaluate their member
    /// expression immediately; filter groups evaluate their `where`
    /// expression once per repository collaborator with the parameter
    /// variable bound.
    pub fn process_group(&mut self, group: &Group) -> Result<()> {
        if self.env.lookup(&group.name).is_some() {
            return Err(Error::DuplicateDefinition(group.name.clone()));
        }

        let members = match group.group_type {
            GroupType::Static => {
                let mut interpreter = Interpreter::new(&self.env, &self.cache);
                let value = interpreter.eval(&group.name, &group.expr)?;
                value.as_array(&format!("group `{}`", group.name))?;
                value
            }
            GroupType::Filter => self.eval_filter_group(group)?,
        };

        self.env.register(group.name.as_str().into(), members)
    }

    fn eval_filter_group(&mut self, group: &Group) -> Result<Value> {
        let param = match &group.param {
            Some(p) => p.clone(),
            None => {
                return Err(Error::Parse(format!(
                    "filter group `{}` is missing its parameter",
                    group.name
                )))
            }
        };
        let where_expr = match &group.where_expr {
            Some(w) => w.clone(),
            None => {
                return Err(Error::Parse(format!(
                    "filter group `{}` is missing its where expression",
                    group.name
                )))
            }
        };

        let mut interpreter = Interpreter::new(&self.env, &self.cache);
        let param_ast = interpreter.parse_cached(&group.name, &param)?;
        let param_name = match param_ast.as_ref() {
            Expr::Variable { name, .. } => name.clone(),
            _ => {
                return Err(Error::Parse(format!(
                    "filter group `{}` parameter must be a `$name` variable",
                    group.name
                )))
            }
        };
        let body = interpreter.parse_cached(&group.name, &where_expr)?;
        let predicate = Lambda {
            params: vec![param_name],
            body,
        };

        let pr = self.env.pull_request();
        let collaborators = self
            .env
            .host()
            .list_collaborators(&pr.owner, &pr.repo)
            .map_err(Error::HostApi)?;

        let mut members = vec![];
        for login in collaborators {
            let keep = interpreter
                .apply(&predicate, vec![Value::from(login.as_str())])?
                .as_bool(&format!("group `{}` where expression", group.name))?;
            if keep {
                members.push(Value::from(login));
            }
        }
        Ok(Value::from_array(members))
    }

    /// Register a label binding under its document id.
    pub fn process_label(&mut self, label: &Label) -> Result<()> {
        self.env.register(
            label.id.as_str().into(),
            Value::from(label.name.as_str()),
        )
    }

    /// Register a rule. The spec must parse at registration time; deferring
    /// structural validation to first use is not allowed.
    pub fn process_rule(&mut self, rule: &Rule) -> Result<()> {
        if self.env.lookup(&rule.name).is_some() {
            return Err(Error::DuplicateDefinition(rule.name.clone()));
        }
        let interpreter = Interpreter::new(&self.env, &self.cache);
        let body = interpreter.parse_cached(&rule.name, &rule.spec)?;
        self.env.register(
            rule.name.as_str().into(),
            Value::Function(Rc::new(Lambda {
                params: vec![],
                body,
            })),
        )
    }

    /// Evaluate one boolean guard expression against the environment.
    pub fn eval_expr(&self, expr: &str) -> Result<bool> {
        let mut interpreter = Interpreter::new(&self.env, &self.cache);
        interpreter.eval_bool("<guard>", expr)
    }

    /// Execute one statement: evaluate its governing rule-set and, when
    /// every rule holds, dispatch its actions in declared order. The first
    /// failing action aborts the remainder of this statement.
    pub fn exec_statement(&mut self, statement: &Statement) -> Result<()> {
        for rule_name in &statement.rules {
            let mut interpreter = Interpreter::new(&self.env, &self.cache);
            if !interpreter.eval_rule(rule_name)? {
                return Ok(());
            }
        }

        for action in &statement.actions {
            self.env.check_cancelled()?;
            self.dispatch_action(action)?;
        }
        Ok(())
    }

    fn dispatch_action(&mut self, action: &str) -> Result<()> {
        let mut interpreter = Interpreter::new(&self.env, &self.cache);
        let ast = interpreter.parse_cached("<action>", action)?;
        let (span, name, args) = match ast.as_ref() {
            Expr::Call {
                span, name, args, ..
            } => (span, name.clone(), args),
            _ => {
                return Err(Error::Parse(format!(
                    "statement action `{action}` must be a built-in action call"
                )))
            }
        };

        let arity = match self.env.builtins().action(&name) {
            Some(action) => action.ty.arity(),
            None if self.env.builtins().function(&name).is_some() => {
                return Err(span.error(&format!(
                    "`{name}` is a pure function and cannot be used as a statement action"
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

        let values: Result<Vec<Value>> = args.iter().map(|arg| interpreter.eval_expr(arg)).collect();
        let values = values?;
        drop(interpreter);

        let builtins = self.env.builtins_rc();
        builtins.call_action(&mut self.env, &name, &values)
    }

    /// Run a program: register every group, label and rule, then execute
    /// the statements in order. Statement failures are aggregated into the
    /// exit status while later statements still run; registration failures
    /// abort the run with an error.
    pub fn exec_program(&mut self, program: &Program) -> Result<ExitStatus> {
        for group in &program.groups {
            self.process_group(group)?;
        }
        for label in &program.labels {
            self.process_label(label)?;
        }
        for rule in &program.rules {
            self.process_rule(rule)?;
        }

        let mut failed = false;
        for statement in &program.statements {
            match self.exec_statement(statement) {
                Ok(()) => (),
                Err(Error::Cancelled) => {
                    failed = true;
                    self.env
                        .report_mut()
                        .add_error(Error::Cancelled.to_string());
                    break;
                }
                Err(e) => {
                    // Statements are independent units; the failure is
                    // aggregated and later statements still run.
                    failed = true;
                    self.env.report_mut().add_error(e.to_string());
                }
            }
        }

        let status = if failed {
            ExitStatus::Failure
        } else {
            ExitStatus::Success
        };
        self.env.collector().collect(
            "exec_program",
            &json!({
                "statements": program.statements.len(),
                "actions": self.env.report().actions().len(),
                "errors": self.env.report().errors().len(),
                "exit_code": status.code(),
            }),
        );
        Ok(status)
    }

    /// Render the accumulated report. Rendering is a pure projection of the
    /// recorded report; with `safe_mode` disabled a single telemetry event
    /// is emitted as well, with it enabled nothing outside the returned
    /// string happens.
    pub fn report(&self, mode: ReportMode, safe_mode: bool) -> String {
        let report = self.env.report();
        let rendered = match mode {
            ReportMode::Concise => report.actions().join("\n"),
            ReportMode::Verbose => {
                let pr = self.env.pull_request();
                let mut out = format!("Aladino report for {}/{}#{}\n", pr.owner, pr.repo, pr.number);
                if report.actions().is_empty() {
                    out.push_str("\nno actions executed\n");
                } else {
                    out.push_str("\nexecuted actions:\n");
                    for action in report.actions() {
                        out.push_str(&format!("- {action}\n"));
                    }
                }
                if !report.warnings().is_empty() {
                    out.push_str("\nwarnings:\n");
                    for warning in report.warnings() {
                        out.push_str(&format!("- {warning}\n"));
                    }
                }
                if !report.errors().is_empty() {
                    out.push_str("\nerrors:\n");
                    for error in report.errors() {
                        out.push_str(&format!("- {error}\n"));
                    }
                }
                out
            }
        };

        if !safe_mode {
            self.env
                .collector()
                .collect("report_rendered", &json!({ "bytes": rendered.len() }));
        }
        rendered
    }
}
