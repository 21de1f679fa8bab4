//! Requirement and return declarations.
//!
//! Declarations are plain values built at registration time. They describe
//! what a callable needs from the context and how its result is filed back:
//!
//! - [`Requirement`] - One input: candidate keys, default, projections, target
//! - [`RequirementsDeclaration`] - The ordered inputs of a callable
//! - [`ReturnsDeclaration`] - How the result is stored
//!
//! Declarations never change once built. Combining two of them goes through
//! [`RequirementsDeclaration::merge`], which returns a new declaration.
//!
//! # Example
//!
//! ```
//! use relay_context::declaration::{Requirement, RequirementsDeclaration, ReturnsDeclaration};
//!
//! struct Config;
//! struct Connection;
//!
//! let requires = RequirementsDeclaration::new()
//!     .with(Requirement::of::<Config>())
//!     .with(Requirement::name("retries").optional().target("retries"));
//! let returns = ReturnsDeclaration::of::<Connection>();
//!
//! assert_eq!(requires.len(), 2);
//! assert_eq!(requires.to_string(), "requires(<Config>, 'retries' = None as retries)");
//! assert_eq!(returns.to_string(), "returns(<Connection>)");
//! ```

mod requirement;
mod returns;

use core::fmt;

pub use requirement::{DefaultValue, Projection, ProjectionKind, Requirement, Target};
pub use returns::ReturnsDeclaration;

/// The ordered requirements of a callable.
#[derive(Debug, Clone, Default)]
pub struct RequirementsDeclaration {
    requirements: Vec<Requirement>,
}

impl RequirementsDeclaration {
    /// Creates an empty declaration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder pattern: appends a requirement.
    #[must_use]
    pub fn with(mut self, requirement: Requirement) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Returns the requirements in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Requirement> {
        self.requirements.iter()
    }

    /// Returns the number of requirements.
    #[must_use]
    pub fn len(&self) -> usize {
        self.requirements.len()
    }

    /// Returns `true` if nothing is required.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.requirements.is_empty()
    }

    /// Combines two declarations into a new one.
    ///
    /// Named requirements in `other` replace those with the same target name.
    /// The *i*-th positional requirement in `other` replaces the *i*-th
    /// positional requirement here. Everything else in `other` is appended.
    #[must_use]
    pub fn merge(&self, other: &RequirementsDeclaration) -> Self {
        let mut merged = self.requirements.clone();
        let positions: Vec<usize> = merged
            .iter()
            .enumerate()
            .filter(|(_, r)| *r.target_slot() == Target::Positional)
            .map(|(i, _)| i)
            .collect();
        let mut positional = positions.into_iter();

        for requirement in &other.requirements {
            let slot = match requirement.target_slot() {
                Target::Positional => positional.next(),
                Target::Named(name) => merged.iter().position(
                    |existing| matches!(existing.target_slot(), Target::Named(n) if n == name),
                ),
            };
            match slot {
                Some(index) => merged[index] = requirement.clone(),
                None => merged.push(requirement.clone()),
            }
        }

        Self {
            requirements: merged,
        }
    }
}

impl From<Requirement> for RequirementsDeclaration {
    fn from(requirement: Requirement) -> Self {
        Self::new().with(requirement)
    }
}

impl FromIterator<Requirement> for RequirementsDeclaration {
    fn from_iter<I: IntoIterator<Item = Requirement>>(iter: I) -> Self {
        Self {
            requirements: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a RequirementsDeclaration {
    type Item = &'a Requirement;
    type IntoIter = core::slice::Iter<'a, Requirement>;

    fn into_iter(self) -> Self::IntoIter {
        self.requirements.iter()
    }
}

impl fmt::Display for RequirementsDeclaration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("requires(")?;
        for (i, requirement) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{requirement}")?;
        }
        f.write_str(")")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::ResourceKey;

    struct A;
    struct B;
    struct C;

    fn keys(declaration: &RequirementsDeclaration) -> Vec<ResourceKey> {
        declaration.iter().map(|r| r.key().clone()).collect()
    }

    #[test]
    fn merge_replaces_positionals_in_order() {
        let base = RequirementsDeclaration::new()
            .with(Requirement::of::<A>())
            .with(Requirement::of::<B>());
        let explicit = RequirementsDeclaration::from(Requirement::of::<C>());

        let merged = base.merge(&explicit);
        assert_eq!(
            keys(&merged),
            vec![ResourceKey::of::<C>(), ResourceKey::of::<B>()]
        );
    }

    #[test]
    fn merge_replaces_named_by_target() {
        let base = RequirementsDeclaration::new()
            .with(Requirement::of::<A>().target("x"))
            .with(Requirement::of::<B>().target("y"));
        let explicit = RequirementsDeclaration::from(Requirement::of::<C>().target("y"));

        let merged = base.merge(&explicit);
        assert_eq!(
            keys(&merged),
            vec![ResourceKey::of::<A>(), ResourceKey::of::<C>()]
        );
    }

    #[test]
    fn merge_appends_extras() {
        let base = RequirementsDeclaration::from(Requirement::of::<A>());
        let explicit: RequirementsDeclaration = [
            Requirement::of::<B>(),
            Requirement::of::<C>(),
            Requirement::name("z").target("z"),
        ]
        .into_iter()
        .collect();

        let merged = base.merge(&explicit);
        assert_eq!(
            keys(&merged),
            vec![
                ResourceKey::of::<B>(),
                ResourceKey::of::<C>(),
                ResourceKey::name("z")
            ]
        );
        // The source declarations are unchanged.
        assert_eq!(keys(&base), vec![ResourceKey::of::<A>()]);
    }

    #[test]
    fn returns_display() {
        assert_eq!(
            ReturnsDeclaration::sequence([ResourceKey::of::<A>(), ResourceKey::name("b")])
                .to_string(),
            "returns(<A>, 'b')"
        );
        assert_eq!(ReturnsDeclaration::Infer.to_string(), "returns(<inferred>)");
    }
}
