//! Call points: the nodes of a chain.

use core::fmt;
use std::collections::BTreeSet;

use relay_context::context::Context;
use relay_context::declaration::{RequirementsDeclaration, ReturnsDeclaration};
use relay_context::error::CallError;
use relay_context::step::{Returned, Step};

/// Handle of a call point within its runner's arena.
///
/// Handles are only meaningful for the runner that issued them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PointId(pub(crate) usize);

impl PointId {
    /// Returns the raw handle value.
    #[must_use]
    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for PointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "point_{}", self.0)
    }
}

/// One step of a chain, with the declarations it runs with.
#[derive(Debug, Clone)]
pub struct CallPoint {
    pub(crate) step: Step,
    pub(crate) requires: RequirementsDeclaration,
    pub(crate) returns: ReturnsDeclaration,
    pub(crate) labels: BTreeSet<String>,
    pub(crate) added_using: BTreeSet<String>,
    pub(crate) previous: Option<PointId>,
    pub(crate) next: Option<PointId>,
}

impl CallPoint {
    pub(crate) fn new(
        step: Step,
        requires: RequirementsDeclaration,
        returns: ReturnsDeclaration,
    ) -> Self {
        Self {
            step,
            requires,
            returns,
            labels: BTreeSet::new(),
            added_using: BTreeSet::new(),
            previous: None,
            next: None,
        }
    }

    /// Copies the point's step, declarations and tags, without links.
    pub(crate) fn detached(&self) -> Self {
        Self {
            previous: None,
            next: None,
            ..self.clone()
        }
    }

    /// Returns the step this point invokes.
    #[must_use]
    pub fn step(&self) -> &Step {
        &self.step
    }

    /// Returns the requirements resolved for this point.
    #[must_use]
    pub fn requirements(&self) -> &RequirementsDeclaration {
        &self.requires
    }

    /// Returns how this point's result is filed.
    #[must_use]
    pub fn returns(&self) -> &ReturnsDeclaration {
        &self.returns
    }

    /// Returns the labels attached to this point.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Returns the labels of the modifier this point was inserted through.
    pub fn added_using(&self) -> impl Iterator<Item = &str> {
        self.added_using.iter().map(String::as_str)
    }

    /// Returns the preceding point, if any.
    #[must_use]
    pub fn previous(&self) -> Option<PointId> {
        self.previous
    }

    /// Returns the following point, if any.
    #[must_use]
    pub fn next(&self) -> Option<PointId> {
        self.next
    }

    /// Calls the step in `context` and files its result.
    ///
    /// # Errors
    ///
    /// See [`Context::extract`].
    pub fn invoke(&self, context: &Context<'_>) -> Result<Returned, CallError> {
        context.extract(&self.step, &self.requires, &self.returns)
    }
}

impl fmt::Display for CallPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {}", self.step, self.requires, self.returns)?;
        if !self.labels.is_empty() {
            f.write_str(" <-- ")?;
            for (i, label) in self.labels.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                f.write_str(label)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use relay_context::declaration::Requirement;

    struct Input;

    #[test]
    fn display_lists_declarations_and_labels() {
        let step = Step::new(|_| Ok(Returned::None)).named("load");
        let mut point = CallPoint::new(
            step,
            Requirement::of::<Input>().into(),
            ReturnsDeclaration::Ignore,
        );
        assert_eq!(
            point.to_string(),
            "load requires(<Input>) returns(<ignored>)",
        );

        point.labels.insert("setup".to_string());
        point.labels.insert("io".to_string());
        assert_eq!(
            point.to_string(),
            "load requires(<Input>) returns(<ignored>) <-- io, setup"
        );
    }

    #[test]
    fn detached_copy_drops_links_only() {
        let mut point = CallPoint::new(
            Step::new(|_| Ok(Returned::None)),
            RequirementsDeclaration::new(),
            ReturnsDeclaration::Infer,
        );
        point.labels.insert("a".to_string());
        point.previous = Some(PointId(1));
        point.next = Some(PointId(3));

        let copy = point.detached();
        assert!(copy.previous().is_none() && copy.next().is_none());
        assert_eq!(copy.labels().collect::<Vec<_>>(), ["a"]);
        assert!(copy.step().same_callable(point.step()));
    }
}
