//! Shared test utilities for `relay_chain` integration tests.
//!
//! Import via `mod test_utils;` in test files.

#![allow(
    dead_code,
    missing_docs,
    reason = "shared test utilities, not all items used in every test binary"
)]

use relay_chain::prelude::*;
use std::sync::{Arc, Mutex};

// ═══════════════════════════════════════════════════════════════════════════════
// CALL LOG
// ═══════════════════════════════════════════════════════════════════════════════

/// Records the order in which steps and scopes ran.
#[derive(Clone, Default)]
pub struct CallLog {
    entries: Arc<Mutex<Vec<String>>>,
}

impl CallLog {
    pub fn push(&self, entry: impl Into<String>) {
        self.entries.lock().unwrap().push(entry.into());
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// A step that logs its name and returns nothing.
pub fn logging_step(log: &CallLog, name: &str) -> Step {
    let log = log.clone();
    let entry = name.to_string();
    Step::new(move |_| {
        log.push(entry.clone());
        Ok(Returned::None)
    })
    .named(name)
}

/// A step that fails with `message`.
pub fn failing_step(log: &CallLog, name: &str, message: &'static str) -> Step {
    let log = log.clone();
    let entry = name.to_string();
    Step::new(move |_| {
        log.push(entry.clone());
        Err(message.into())
    })
    .named(name)
}

/// Names of a runner's steps in chain order.
pub fn step_names(runner: &Runner) -> Vec<String> {
    runner
        .points()
        .map(|point| point.step().name().to_string())
        .collect()
}

/// Labels of each point in chain order.
pub fn point_labels(runner: &Runner) -> Vec<Vec<String>> {
    runner
        .points()
        .map(|point| point.labels().map(str::to_string).collect())
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════════════
// SCOPES
// ═══════════════════════════════════════════════════════════════════════════════

/// What a [`RecordingScope`] does on exit.
#[derive(Clone, Copy, PartialEq, Eq)]
pub enum ExitBehavior {
    Propagate,
    Swallow,
    Raise,
}

/// A scope that logs enter and exit, along with the error it exited with.
pub struct RecordingScope {
    pub name: String,
    pub log: CallLog,
    pub entered: Option<Value>,
    pub on_exit: ExitBehavior,
}

impl RecordingScope {
    pub fn new(log: &CallLog, name: &str, on_exit: ExitBehavior) -> Self {
        Self {
            name: name.to_string(),
            log: log.clone(),
            entered: None,
            on_exit,
        }
    }

    pub fn entering(mut self, value: Value) -> Self {
        self.entered = Some(value);
        self
    }
}

impl Scope for RecordingScope {
    fn enter(&self) -> Result<Option<Value>, BoxError> {
        self.log.push(format!("enter {}", self.name));
        Ok(self.entered.clone())
    }

    fn exit(
        &self,
        error: Option<&(dyn core::error::Error + Send + Sync + 'static)>,
    ) -> Result<bool, BoxError> {
        let detail = match error.and_then(|error| error.downcast_ref::<RunError>()) {
            Some(RunError::Step { source, .. }) => format!("Err({source})"),
            Some(other) => format!("Err({other})"),
            None => "Ok".to_string(),
        };
        self.log.push(format!("exit {} {detail}", self.name));
        match self.on_exit {
            ExitBehavior::Propagate => Ok(false),
            ExitBehavior::Swallow => Ok(true),
            ExitBehavior::Raise => Err(format!("{} cleanup failed", self.name).into()),
        }
    }
}

/// A step returning a fresh [`RecordingScope`] each time it runs.
pub fn scope_step<F>(name: &str, make: F) -> Step
where
    F: Fn() -> RecordingScope + Send + Sync + 'static,
{
    Step::new(move |_| Ok(Returned::scoped(make())))
        .named(name)
        .returns(ReturnsDeclaration::Ignore)
}
