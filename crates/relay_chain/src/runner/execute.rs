//! Running a chain against a context.
//!
//! Points run strictly in chain order. When a point returns a scoped value,
//! the rest of the chain runs inside that scope:
//!
//! ```text
//! run_from(start)
//!   ├── point 1
//!   ├── point 2 ── returns Scope A
//!   │     enter A
//!   │     run_from(point 3) in child context
//!   │       ├── point 3 ── returns Scope B
//!   │       │     enter B
//!   │       │     run_from(point 4) in child context
//!   │       │     exit B
//!   │       └── (done)
//!   │     exit A
//!   └── (done)
//! ```
//!
//! Exits therefore run in reverse entry order, whether the body succeeded
//! or failed.

use std::sync::Arc;

use relay_context::context::Context;
use relay_context::error::CallError;
use relay_context::resource::{Scope, Value};
use relay_context::step::Returned;

use super::Runner;
use crate::error::RunError;
use crate::point::PointId;

impl Runner {
    /// Runs the chain in a fresh context.
    ///
    /// Returns the result of the last point run, or [`Returned::None`] if a
    /// scope swallowed an error.
    ///
    /// # Errors
    ///
    /// Any [`RunError`] not swallowed by an enclosing scope.
    pub fn run(&self) -> Result<Returned, RunError> {
        let context = Context::new();
        self.run_in(&context)
    }

    /// Runs the chain against a caller-owned context.
    ///
    /// Lazy providers are registered into `context` first.
    ///
    /// # Errors
    ///
    /// [`RunError::Providers`] if a provider key is already present in
    /// `context`, otherwise as for [`run`](Self::run).
    pub fn run_in(&self, context: &Context<'_>) -> Result<Returned, RunError> {
        for (key, provider) in &self.lazy {
            context
                .add_resolver(key.clone(), provider.resolver(key.clone()))
                .map_err(RunError::Providers)?;
        }
        tracing::debug!(points = self.len(), "running chain");
        self.run_from(self.start, context, 0)
    }

    fn run_from(
        &self,
        mut cursor: Option<PointId>,
        context: &Context<'_>,
        depth: usize,
    ) -> Result<Returned, RunError> {
        let mut result = Returned::None;
        while let Some(id) = cursor {
            let Some(point) = self.points.get(&id) else {
                break;
            };
            tracing::debug!(point = %point.step().name(), "invoking call point");
            result = point
                .invoke(context)
                .map_err(|error| self.locate(id, error))?;
            cursor = point.next();

            if let (Some(scope), Some(resource)) = (result.scope(), result.as_value()) {
                return self.run_scope(id, Arc::clone(scope), resource, cursor, context, depth);
            }
        }
        Ok(result)
    }

    fn run_scope(
        &self,
        id: PointId,
        scope: Arc<dyn Scope>,
        resource: &Value,
        rest: Option<PointId>,
        context: &Context<'_>,
        depth: usize,
    ) -> Result<Returned, RunError> {
        let depth = depth + 1;
        if depth > self.max_scope_depth {
            return Err(RunError::ScopeDepthExceeded {
                depth,
                max: self.max_scope_depth,
            });
        }

        let name = self.step_name(id);
        tracing::debug!(point = %name, depth, "entering scope");
        let entered = scope.enter().map_err(|source| RunError::ScopeEnter {
            point: name.clone(),
            source,
        })?;

        let body = context.child();
        let outcome = match entered {
            Some(value) if !value.ptr_eq(resource) => body
                .add_value(value)
                .map_err(|error| self.locate(id, CallError::Resource(error))),
            _ => Ok(()),
        }
        .and_then(|()| self.run_from(rest, &body, depth));

        let error = outcome
            .as_ref()
            .err()
            .map(|error| error as &(dyn core::error::Error + Send + Sync + 'static));
        match scope.exit(error) {
            Ok(true) if outcome.is_err() => {
                tracing::debug!(point = %name, "scope swallowed error");
                Ok(Returned::None)
            }
            Ok(_) => {
                tracing::debug!(point = %name, "exited scope");
                outcome
            }
            Err(source) => {
                tracing::warn!(point = %name, error = %source, "scope exit raised");
                Err(RunError::ScopeExit {
                    point: name,
                    source,
                })
            }
        }
    }

    fn step_name(&self, id: PointId) -> String {
        self.points
            .get(&id)
            .map_or_else(|| id.to_string(), |point| point.step().name().to_string())
    }

    /// Attaches chain position to an error raised by the point `id`.
    fn locate(&self, id: PointId, error: CallError) -> RunError {
        match error {
            CallError::Resource(source) => {
                let order: Vec<PointId> = self.ids().collect();
                let at = order.iter().position(|candidate| *candidate == id);
                let (ran, remaining) = match at {
                    Some(at) => (&order[..at], &order[at + 1..]),
                    None => (&order[..0], &order[..0]),
                };
                RunError::Resolution {
                    point: self.describe(id),
                    source,
                    ran: ran.iter().map(|id| self.describe(*id)).collect(),
                    remaining: remaining.iter().map(|id| self.describe(*id)).collect(),
                }
            }
            CallError::Callable { source, .. } => RunError::Step {
                point: self.step_name(id),
                source,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_context::error::BoxError;
    use relay_context::step::Step;

    struct Nested;

    impl Scope for Nested {
        fn enter(&self) -> Result<Option<Value>, BoxError> {
            Ok(None)
        }

        fn exit(
            &self,
            _error: Option<&(dyn core::error::Error + Send + Sync + 'static)>,
        ) -> Result<bool, BoxError> {
            Ok(false)
        }
    }

    #[test]
    fn scope_depth_is_bounded() {
        let mut runner = Runner::new().with_max_scope_depth(2);
        for i in 0..3 {
            runner
                .add(
                    Step::new(|_| Ok(Returned::scoped(Nested)))
                        .named(format!("scope_{i}"))
                        .returns(relay_context::declaration::ReturnsDeclaration::Ignore),
                )
                .unwrap();
        }

        let error = runner.run().unwrap_err();
        assert!(matches!(error, RunError::ScopeDepthExceeded { depth: 3, max: 2 }));
    }

    #[test]
    fn empty_chain_returns_none() {
        assert!(Runner::new().run().unwrap().is_none());
    }
}
