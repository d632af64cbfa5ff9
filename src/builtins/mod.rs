// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

pub mod actions;
pub mod functions;

use crate::env::Env;
use crate::errors::{Error, Result};
use crate::value::{FunctionType, Kind, Value};

use std::collections::HashMap;

pub type FunctionCode = fn(&Env, &[Value]) -> Result<Value>;
pub type ActionCode = fn(&mut Env, &[Value]) -> Result<()>;

/// A pure built-in: reads the environment, returns a value, never touches
/// the report or the host API. The read-only receiver enforces the contract
/// by shape.
pub struct BuiltInFunction {
    pub ty: FunctionType,
    pub code: FunctionCode,
}

/// An effectful built-in: may mutate the report and invoke the host API.
pub struct BuiltInAction {
    pub ty: FunctionType,
    pub code: ActionCode,
}

/// Catalog of built-in functions and actions, validated at construction:
/// names are unique across both tables, functions declare a return kind and
/// actions never do.
#[derive(Default)]
pub struct BuiltIns {
    functions: HashMap<&'static str, BuiltInFunction>,
    actions: HashMap<&'static str, BuiltInAction>,
}

impl BuiltIns {
    pub fn empty() -> BuiltIns {
        BuiltIns::default()
    }

    /// The full built-in catalog.
    pub fn defaults() -> Result<BuiltIns> {
        let mut builtins = BuiltIns::empty();
        functions::register(&mut builtins)?;
        actions::register(&mut builtins)?;
        Ok(builtins)
    }

    fn check_free(&self, name: &'static str) -> Result<()> {
        if self.functions.contains_key(name) || self.actions.contains_key(name) {
            return Err(Error::DuplicateDefinition(name.to_string()));
        }
        Ok(())
    }

    pub fn add_function(
        &mut self,
        name: &'static str,
        params: Vec<Kind>,
        ret: Kind,
        code: FunctionCode,
    ) -> Result<()> {
        self.check_free(name)?;
        let ty = FunctionType::new(params, Some(ret))?;
        self.functions.insert(name, BuiltInFunction { ty, code });
        Ok(())
    }

    pub fn add_action(
        &mut self,
        name: &'static str,
        params: Vec<Kind>,
        code: ActionCode,
    ) -> Result<()> {
        self.check_free(name)?;
        let ty = FunctionType::new(params, None)?;
        self.actions.insert(name, BuiltInAction { ty, code });
        Ok(())
    }

    pub fn function(&self, name: &str) -> Option<&BuiltInFunction> {
        self.functions.get(name)
    }

    pub fn action(&self, name: &str) -> Option<&BuiltInAction> {
        self.actions.get(name)
    }

    /// Invoke a pure built-in with already-evaluated arguments.
    pub fn call_function(&self, env: &Env, name: &str, args: &[Value]) -> Result<Value> {
        let function = self
            .functions
            .get(name)
            .ok_or_else(|| Error::UndefinedName(name.to_string()))?;
        check_arity(name, &function.ty, args.len())?;
        check_kinds(name, &function.ty, args)?;
        let result = (function.code)(env, args)?;
        match function.ty.ret() {
            Some(ret) if result.kind() != ret => Err(Error::type_mismatch(
                &format!("`{name}` return value"),
                ret,
                result.kind(),
            )),
            _ => Ok(result),
        }
    }

    /// Dispatch an action. The report entry is appended for every
    /// invocation; with dry-run enabled the implementation — the network
    /// side of the action — is skipped.
    pub fn call_action(&self, env: &mut Env, name: &str, args: &[Value]) -> Result<()> {
        let action = self
            .actions
            .get(name)
            .ok_or_else(|| Error::UndefinedName(name.to_string()))?;
        check_arity(name, &action.ty, args.len())?;
        check_kinds(name, &action.ty, args)?;
        let code = action.code;

        env.report_mut().add_action(format_call(name, args));
        if env.dry_run() {
            return Ok(());
        }
        code(env, args)
    }
}

pub(crate) fn check_arity(name: &str, ty: &FunctionType, got: usize) -> Result<()> {
    if ty.arity() != got {
        return Err(Error::ArgumentCount {
            name: name.to_string(),
            expected: ty.arity(),
            got,
        });
    }
    Ok(())
}

pub(crate) fn check_kinds(name: &str, ty: &FunctionType, args: &[Value]) -> Result<()> {
    for (i, (param, arg)) in ty.params().iter().zip(args.iter()).enumerate() {
        if arg.kind() != *param {
            return Err(Error::type_mismatch(
                &format!("`{name}` argument {}", i + 1),
                *param,
                arg.kind(),
            ));
        }
    }
    Ok(())
}

/// Render a call for the report, e.g. `addLabel(small)`.
pub(crate) fn format_call(name: &str, args: &[Value]) -> String {
    let rendered: Vec<String> = args.iter().map(|a| a.to_string()).collect();
    format!("{name}({})", rendered.join(", "))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_catalog_is_well_formed() -> Result<()> {
        let builtins = BuiltIns::defaults()?;
        assert!(builtins.function("size").is_some());
        assert!(builtins.action("addLabel").is_some());
        // Pure/effectful tables are disjoint.
        assert!(builtins.action("size").is_none());
        assert!(builtins.function("addLabel").is_none());
        Ok(())
    }

    #[test]
    fn duplicate_names_are_rejected_across_tables() -> Result<()> {
        fn noop(_: &mut Env, _: &[Value]) -> Result<()> {
            Ok(())
        }
        let mut builtins = BuiltIns::defaults()?;
        assert!(matches!(
            builtins.add_action("size", vec![], noop),
            Err(Error::DuplicateDefinition(_))
        ));
        Ok(())
    }

    #[test]
    fn call_formatting() {
        assert_eq!(
            format_call("addLabel", &[Value::from("small")]),
            "addLabel(small)"
        );
        assert_eq!(
            format_call(
                "assignReviewer",
                &[
                    Value::from_array(vec![Value::from("john"), Value::from("marie")]),
                    Value::from(2i64)
                ]
            ),
            "assignReviewer([john, marie], 2)"
        );
    }
}
