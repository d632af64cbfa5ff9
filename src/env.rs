// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

use crate::builtins::BuiltIns;
use crate::codehost::{CodeHost, CommitFile, PullRequest};
use crate::errors::{Error, Result};
use crate::patch::Patch;
use crate::value::Value;

use core::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Cancellation signal threaded through the run. Once triggered, the engine
/// stops issuing actions and the run fails with a cancellation error.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> CancelToken {
        CancelToken::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Telemetry capability. The concrete backend is an external collaborator.
pub trait Collector {
    fn collect(&self, event: &str, properties: &serde_json::Value);
}

/// Collector that drops every event.
#[derive(Debug, Default)]
pub struct NoopCollector;

impl Collector for NoopCollector {
    fn collect(&self, _event: &str, _properties: &serde_json::Value) {}
}

/// Ordered audit log for one program run. Actions are appended by registry
/// dispatch only, in program order; nothing is ever rolled back.
#[derive(Debug, Default)]
pub struct Report {
    actions: Vec<String>,
    warnings: Vec<String>,
    errors: Vec<String>,
}

impl Report {
    pub fn add_action(&mut self, description: String) {
        self.actions.push(description);
    }

    pub fn add_warning(&mut self, warning: String) {
        self.warnings.push(warning);
    }

    pub fn add_error(&mut self, error: String) {
        self.errors.push(error);
    }

    pub fn actions(&self) -> &[String] {
        &self.actions
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }
}

/// Name bindings produced by the registration phase: groups, labels and
/// rules. Populated before any statement executes, read-only afterwards.
pub type RegisterMap = BTreeMap<Rc<str>, Value>;

/// Execution context for one pull-request event.
///
/// Built-ins depend on the capability accessors rather than on concrete
/// fields, so the same built-in runs against production wiring or the
/// `test_utils` doubles without structural change.
pub struct Env {
    ctx: CancelToken,
    dry_run: bool,
    host: Rc<dyn CodeHost>,
    collector: Rc<dyn Collector>,
    pull_request: PullRequest,
    event_payload: serde_json::Value,
    patch: Patch,
    register_map: RegisterMap,
    report: Report,
    builtins: Rc<BuiltIns>,
    rng: RefCell<StdRng>,
}

impl Env {
    /// Build the environment for one run. The patch is computed here, once,
    /// and is immutable for the lifetime of the environment.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        ctx: CancelToken,
        dry_run: bool,
        host: Rc<dyn CodeHost>,
        collector: Rc<dyn Collector>,
        pull_request: PullRequest,
        files: Vec<CommitFile>,
        event_payload: serde_json::Value,
        builtins: Rc<BuiltIns>,
        seed: Option<u64>,
    ) -> Result<Env> {
        let patch = Patch::from_files(files)?;
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Env {
            ctx,
            dry_run,
            host,
            collector,
            pull_request,
            event_payload,
            patch,
            register_map: RegisterMap::new(),
            report: Report::default(),
            builtins,
            rng: RefCell::new(rng),
        })
    }

    pub fn ctx(&self) -> &CancelToken {
        &self.ctx
    }

    pub fn dry_run(&self) -> bool {
        self.dry_run
    }

    pub fn host(&self) -> &dyn CodeHost {
        self.host.as_ref()
    }

    pub fn collector(&self) -> &dyn Collector {
        self.collector.as_ref()
    }

    pub fn pull_request(&self) -> &PullRequest {
        &self.pull_request
    }

    pub fn event_payload(&self) -> &serde_json::Value {
        &self.event_payload
    }

    pub fn patch(&self) -> &Patch {
        &self.patch
    }

    pub fn builtins(&self) -> &BuiltIns {
        &self.builtins
    }

    pub(crate) fn builtins_rc(&self) -> Rc<BuiltIns> {
        self.builtins.clone()
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.register_map.get(name)
    }

    /// Bind a name during the registration phase. Collisions are a
    /// registration error; nothing is overwritten.
    pub(crate) fn register(&mut self, name: Rc<str>, value: Value) -> Result<()> {
        if self.register_map.contains_key(&name) {
            return Err(Error::DuplicateDefinition(name.to_string()));
        }
        self.register_map.insert(name, value);
        Ok(())
    }

    pub fn report(&self) -> &Report {
        &self.report
    }

    pub fn report_mut(&mut self) -> &mut Report {
        &mut self.report
    }

    pub fn check_cancelled(&self) -> Result<()> {
        if self.ctx.is_cancelled() {
            return Err(Error::Cancelled);
        }
        Ok(())
    }

    /// Draw an index below `len` from the injected random source. Callers
    /// guarantee `len > 0`.
    pub fn draw_index(&self, len: usize) -> usize {
        if len <= 1 {
            return 0;
        }
        self.rng.borrow_mut().gen_range(0..len)
    }
}
