// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use aladino::test_utils::{mock_env, MockHost};
use aladino::{Engine, Env, Error, Interpreter, Issue, ParseCache, Rule, Value};

use std::rc::Rc;

fn env() -> anyhow::Result<Env> {
    Ok(mock_env(Rc::new(MockHost::new()), false)?)
}

fn eval(env: &Env, expr: &str) -> aladino::Result<Value> {
    let cache = ParseCache::default();
    Interpreter::new(env, &cache).eval("<test>", expr)
}

#[test]
fn arithmetic_precedence() -> anyhow::Result<()> {
    let env = env()?;
    assert_eq!(eval(&env, "1 + 2 * 3")?, Value::Int(7));
    assert_eq!(eval(&env, "(1 + 2) * 3")?, Value::Int(9));
    assert_eq!(eval(&env, "10 % 3 - 5 / 2")?, Value::Int(-1));
    Ok(())
}

#[test]
fn subtraction_and_negation() -> anyhow::Result<()> {
    let env = env()?;
    assert_eq!(eval(&env, "1-2")?, Value::Int(-1));
    assert_eq!(eval(&env, "-42")?, Value::Int(-42));
    assert_eq!(eval(&env, "$size()-1")?, Value::Int(3));
    assert_eq!(eval(&env, "2 - -3")?, Value::Int(5));
    assert_eq!(eval(&env, "-2 * 3")?, Value::Int(-6));
    Ok(())
}

#[test]
fn division_by_zero_is_an_error() -> anyhow::Result<()> {
    let env = env()?;
    let err = eval(&env, "1 / 0").unwrap_err();
    assert!(err.to_string().contains("division by zero"));
    let err = eval(&env, "1 % 0").unwrap_err();
    assert!(err.to_string().contains("modulo by zero"));
    Ok(())
}

#[test]
fn comparisons_and_connectives() -> anyhow::Result<()> {
    let env = env()?;
    assert_eq!(eval(&env, r#"1 < 2 && "a" != "b""#)?, Value::Bool(true));
    assert_eq!(eval(&env, r#""abc" >= "abd" || false"#)?, Value::Bool(false));
    assert_eq!(eval(&env, "!(2 >= 3)")?, Value::Bool(true));
    Ok(())
}

#[test]
fn mixed_kind_comparison_is_rejected() -> anyhow::Result<()> {
    let env = env()?;
    assert!(matches!(
        eval(&env, r#"1 == "one""#),
        Err(Error::TypeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn ordering_is_only_defined_for_ints_and_strings() -> anyhow::Result<()> {
    let env = env()?;
    // Equality works for every kind.
    assert_eq!(eval(&env, "[1, 2] == [1, 2]")?, Value::Bool(true));
    assert_eq!(eval(&env, "[1] != [2]")?, Value::Bool(true));
    // Ordering on arrays does not.
    let err = eval(&env, "[1] < [2]").unwrap_err();
    assert!(err.to_string().contains("not defined for array"));
    Ok(())
}

#[test]
fn connectives_short_circuit() -> anyhow::Result<()> {
    // The right-hand side references an unknown builtin; it must never be
    // evaluated when the left-hand side decides the result.
    let env = env()?;
    assert_eq!(eval(&env, "false && $undefined()")?, Value::Bool(false));
    assert_eq!(eval(&env, "true || $undefined()")?, Value::Bool(true));
    assert!(matches!(
        eval(&env, "true && $undefined()"),
        Err(Error::UndefinedName(_))
    ));
    Ok(())
}

#[test]
fn pull_request_queries() -> anyhow::Result<()> {
    let env = env()?;
    assert_eq!(eval(&env, "$author()")?, Value::from("john"));
    assert_eq!(eval(&env, "$isDraft()")?, Value::Bool(false));
    assert_eq!(eval(&env, "$base()")?, Value::from("main"));
    assert_eq!(eval(&env, "$head()")?, Value::from("new-topic"));
    assert_eq!(
        eval(&env, r#"$isElementOf("enhancement", $labels())"#)?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(&env, r#"$contains($title(), "new feature")"#)?,
        Value::Bool(true)
    );
    Ok(())
}

#[test]
fn patch_queries() -> anyhow::Result<()> {
    // The mock patch changes four lines of src/main.go.
    let env = env()?;
    assert_eq!(eval(&env, "$size()")?, Value::Int(4));
    assert_eq!(eval(&env, "$fileCount()")?, Value::Int(1));
    assert_eq!(
        eval(&env, r#"$hasFileName("src/main.go")"#)?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(&env, r#"$hasFileExtension([".go"])"#)?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(&env, r#"$hasFilePattern("^src/")"#)?,
        Value::Bool(true)
    );
    assert_eq!(
        eval(&env, r#"$hasCodePattern("func new")"#)?,
        Value::Bool(true)
    );
    // Context lines are not part of the change.
    assert_eq!(
        eval(&env, r#"$hasCodePattern("context line")"#)?,
        Value::Bool(false)
    );
    Ok(())
}

#[test]
fn pull_request_count_by_filters_on_login_and_state() -> anyhow::Result<()> {
    fn issue(author: &str, state: &str, is_pull_request: bool) -> Issue {
        Issue {
            author: author.to_string(),
            state: state.to_string(),
            is_pull_request,
        }
    }

    // The listing mixes plain issues and pull requests; only pull requests
    // count. An empty login or state matches everything.
    let host = Rc::new(MockHost::new().with_issues(vec![
        issue("marie", "open", false),
        issue("marie", "closed", true),
        issue("steve", "closed", false),
        issue("steve", "open", true),
    ]));
    let env = mock_env(host, false)?;

    assert_eq!(
        eval(&env, r#"$pullRequestCountBy("", "")"#)?,
        Value::Int(2)
    );
    assert_eq!(
        eval(&env, r#"$pullRequestCountBy("", "closed")"#)?,
        Value::Int(1)
    );
    assert_eq!(
        eval(&env, r#"$pullRequestCountBy("steve", "")"#)?,
        Value::Int(1)
    );
    assert_eq!(
        eval(&env, r#"$pullRequestCountBy("steve", "closed")"#)?,
        Value::Int(0)
    );
    Ok(())
}

#[test]
fn indexing() -> anyhow::Result<()> {
    let env = env()?;
    assert_eq!(eval(&env, "[10, 20, 30][1]")?, Value::Int(20));
    let err = eval(&env, "[1][5]").unwrap_err();
    assert!(err.to_string().contains("out of bounds"));
    Ok(())
}

#[test]
fn unbound_variable_is_an_error() -> anyhow::Result<()> {
    let env = env()?;
    assert!(matches!(eval(&env, "$x + 1"), Err(Error::UndefinedName(_))));
    Ok(())
}

#[test]
fn arity_is_checked_before_arguments_are_evaluated() -> anyhow::Result<()> {
    let env = env()?;
    assert!(matches!(
        eval(&env, r#"$contains("a")"#),
        Err(Error::ArgumentCount { .. })
    ));
    // The single argument is itself invalid, but the arity failure is
    // raised first.
    assert!(matches!(
        eval(&env, "$isElementOf($nope)"),
        Err(Error::ArgumentCount { .. })
    ));
    Ok(())
}

#[test]
fn argument_kinds_are_checked() -> anyhow::Result<()> {
    let env = env()?;
    assert!(matches!(
        eval(&env, "$hasFileName(4)"),
        Err(Error::TypeMismatch { .. })
    ));
    Ok(())
}

#[test]
fn invalid_pattern_is_rejected() -> anyhow::Result<()> {
    let env = env()?;
    assert!(matches!(
        eval(&env, r#"$hasFilePattern("[")"#),
        Err(Error::InvalidArgument { .. })
    ));
    Ok(())
}

#[test]
fn actions_cannot_appear_in_expressions() -> anyhow::Result<()> {
    let env = env()?;
    let err = eval(&env, r#"$addLabel("small")"#).unwrap_err();
    assert!(err.to_string().contains("cannot be called in an expression"));
    Ok(())
}

#[test]
fn rules_reference_other_rules() -> anyhow::Result<()> {
    let env = env()?;
    let mut engine = Engine::new(env);
    engine.process_rule(&Rule {
        name: "isSmall".to_string(),
        spec: "$size() < 10".to_string(),
    })?;
    engine.process_rule(&Rule {
        name: "isSmallGoChange".to_string(),
        spec: r#"$rule("isSmall") && $hasFileExtension([".go"])"#.to_string(),
    })?;

    let cache = ParseCache::default();
    let mut interpreter = Interpreter::new(engine.env(), &cache);
    assert!(interpreter.eval_rule("isSmallGoChange")?);
    Ok(())
}

#[test]
fn cyclic_rule_references_are_detected() -> anyhow::Result<()> {
    let env = env()?;
    let mut engine = Engine::new(env);
    engine.process_rule(&Rule {
        name: "a".to_string(),
        spec: r#"$rule("b")"#.to_string(),
    })?;
    engine.process_rule(&Rule {
        name: "b".to_string(),
        spec: r#"$rule("a")"#.to_string(),
    })?;

    let cache = ParseCache::default();
    let mut interpreter = Interpreter::new(engine.env(), &cache);
    assert!(matches!(
        interpreter.eval_rule("a"),
        Err(Error::CyclicReference(_))
    ));
    // The stack unwinds; an acyclic evaluation afterwards still works.
    engine.process_rule(&Rule {
        name: "c".to_string(),
        spec: "true".to_string(),
    })?;
    let mut interpreter = Interpreter::new(engine.env(), &cache);
    assert!(interpreter.eval_rule("c")?);
    Ok(())
}

#[test]
fn unknown_rule_reference_is_an_error() -> anyhow::Result<()> {
    let env = env()?;
    assert!(matches!(
        eval(&env, r#"$rule("missing")"#),
        Err(Error::UndefinedName(_))
    ));
    Ok(())
}
