//! What gets added to a chain.

use relay_context::declaration::{RequirementsDeclaration, ReturnsDeclaration};
use relay_context::step::Step;

use crate::runner::Runner;

/// A step plus the declarations and label it is added with.
///
/// Requirements given here are merged over the step's own; a returns
/// declaration given here replaces the step's.
#[derive(Debug, Clone)]
pub struct Registration {
    step: Step,
    requires: RequirementsDeclaration,
    returns: Option<ReturnsDeclaration>,
    label: Option<String>,
    cached: bool,
}

impl Registration {
    /// Registers `step` with its own declarations.
    #[must_use]
    pub fn new(step: Step) -> Self {
        Self {
            step,
            requires: RequirementsDeclaration::new(),
            returns: None,
            label: None,
            cached: true,
        }
    }

    /// Adds requirements, replacing the step's ones with the same target.
    #[must_use]
    pub fn requires(mut self, requires: impl Into<RequirementsDeclaration>) -> Self {
        self.requires = self.requires.merge(&requires.into());
        self
    }

    /// Overrides how the result is filed.
    #[must_use]
    pub fn returns(mut self, returns: ReturnsDeclaration) -> Self {
        self.returns = Some(returns);
        self
    }

    /// Labels the new point.
    #[must_use]
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// For lazy registrations: whether the first result is memoized.
    #[must_use]
    pub fn cached(mut self, cached: bool) -> Self {
        self.cached = cached;
        self
    }

    /// Returns the registered step.
    #[must_use]
    pub fn step(&self) -> &Step {
        &self.step
    }

    pub(crate) fn label_name(&self) -> Option<&str> {
        self.label.as_deref()
    }

    pub(crate) fn is_cached(&self) -> bool {
        self.cached
    }

    /// The declarations the point will run with.
    pub(crate) fn declarations(&self) -> (RequirementsDeclaration, ReturnsDeclaration) {
        let requires = self.step.requirements().merge(&self.requires);
        let returns = self
            .returns
            .clone()
            .unwrap_or_else(|| self.step.returns_declaration().clone());
        (requires, returns)
    }

    pub(crate) fn into_parts(self) -> (Step, Option<String>) {
        (self.step, self.label)
    }
}

impl From<Step> for Registration {
    fn from(step: Step) -> Self {
        Self::new(step)
    }
}

/// Anything [`Runner::extend`] accepts.
#[derive(Debug, Clone)]
pub enum Chainable {
    /// A step appended as a call point.
    Step(Registration),
    /// A step registered as a lazy provider.
    Lazy(Registration),
    /// A whole chain, copied in point by point.
    Runner(Runner),
}

impl Chainable {
    /// Wraps a registration as a lazy provider.
    #[must_use]
    pub fn lazy(registration: impl Into<Registration>) -> Self {
        Self::Lazy(registration.into())
    }
}

impl From<Step> for Chainable {
    fn from(step: Step) -> Self {
        Self::Step(step.into())
    }
}

impl From<Registration> for Chainable {
    fn from(registration: Registration) -> Self {
        Self::Step(registration)
    }
}

impl From<Runner> for Chainable {
    fn from(runner: Runner) -> Self {
        Self::Runner(runner)
    }
}

impl From<&Runner> for Chainable {
    fn from(runner: &Runner) -> Self {
        Self::Runner(runner.clone())
    }
}
