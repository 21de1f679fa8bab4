//! Cursors for inserting into a chain.

use std::collections::BTreeSet;

use crate::error::ChainError;
use crate::point::{CallPoint, PointId};
use crate::registration::Registration;
use crate::runner::Runner;

/// A cursor positioned on one point of a [`Runner`].
///
/// Points added through a modifier are inserted right after its position,
/// and the modifier then moves onto the new point. Labels the modifier
/// carries (the label it was obtained with, or the last explicit label it
/// added) follow each unlabelled insertion, so
/// `runner.at("a")?.add(step)?` moves `"a"` onto `step`.
#[derive(Debug)]
pub struct Modifier<'r> {
    runner: &'r mut Runner,
    point: Option<PointId>,
    labels: BTreeSet<String>,
}

impl<'r> Modifier<'r> {
    pub(crate) fn new(
        runner: &'r mut Runner,
        point: Option<PointId>,
        label: Option<String>,
    ) -> Self {
        Self {
            runner,
            point,
            labels: label.into_iter().collect(),
        }
    }

    /// Returns the point the modifier is positioned on, if the chain is not empty.
    #[must_use]
    pub fn point(&self) -> Option<PointId> {
        self.point
    }

    /// Returns the labels that follow insertions made through this modifier.
    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.labels.iter().map(String::as_str)
    }

    /// Inserts a point after the current position and moves onto it.
    ///
    /// # Errors
    ///
    /// [`ChainError::DuplicateLabel`] if the registration's label is already
    /// in use.
    pub fn add(&mut self, registration: impl Into<Registration>) -> Result<&mut Self, ChainError> {
        let registration = registration.into();
        if let Some(label) = registration.label_name() {
            self.runner.check_label_free(label, None)?;
        }

        let (requires, returns) = registration.declarations();
        let (step, label) = registration.into_parts();
        let mut point = CallPoint::new(step, requires, returns);
        point.added_using = self.labels.clone();

        tracing::trace!(point = %point, "inserting call point");
        let id = self.runner.insert_after(self.point, point);
        self.point = Some(id);

        match label {
            Some(label) => {
                self.runner.move_label(&label, id);
                self.labels = BTreeSet::from([label]);
            }
            None => {
                for label in &self.labels {
                    self.runner.move_label(label, id);
                }
            }
        }
        Ok(self)
    }

    /// Attaches `label` to the current point.
    ///
    /// # Errors
    ///
    /// [`ChainError::EmptyChain`] if there is no current point and
    /// [`ChainError::DuplicateLabel`] if another point carries the label.
    pub fn add_label(&mut self, label: impl Into<String>) -> Result<&mut Self, ChainError> {
        let label = label.into();
        let Some(point) = self.point else {
            return Err(ChainError::EmptyChain(label));
        };
        self.runner.check_label_free(&label, Some(point))?;
        self.runner.move_label(&label, point);
        self.labels.insert(label);
        Ok(self)
    }
}
