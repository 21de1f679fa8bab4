//! The chain owner.
//!
//! A [`Runner`] keeps its call points in an arena keyed by [`PointId`] and
//! links them into a doubly linked list. Labels index into the same arena:
//!
//! ```text
//! start                                          end
//!   │                                             │
//!   ▼                                             ▼
//! [load] ◀──▶ [parse] ◀──▶ [transaction] ◀──▶ [store]
//!   ▲                            ▲
//!   └── "input"                  └── "body"
//! ```
//!
//! Execution lives in the `execute` submodule.

mod execute;

use core::fmt;
use core::ops::Add;

use hashbrown::HashMap;
use relay_context::provider::Provider;
use relay_context::resource::ResourceKey;
use relay_context::step::Step;

use crate::error::ChainError;
use crate::modifier::Modifier;
use crate::point::{CallPoint, PointId};
use crate::registration::{Chainable, Registration};

/// An ordered, label-addressable chain of call points.
#[derive(Debug)]
pub struct Runner {
    points: HashMap<PointId, CallPoint>,
    start: Option<PointId>,
    end: Option<PointId>,
    labels: HashMap<String, PointId>,
    lazy: HashMap<ResourceKey, Provider>,
    next_id: usize,
    max_scope_depth: usize,
}

/// Which declarations a replaced point keeps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclarationSource {
    /// Keep the declarations of the point being replaced.
    Original,
    /// Take the replacement step's own declarations.
    Replacement,
}

/// The sub-range copied by [`Runner::clone_range`].
///
/// Without bounds the whole chain is copied. A bound excludes its own point
/// unless the matching `include_*` flag is set.
#[derive(Debug, Clone, Default)]
pub struct CloneRange {
    start: Option<String>,
    end: Option<String>,
    include_start: bool,
    include_end: bool,
    added_using: Option<String>,
}

impl CloneRange {
    /// Copies the whole chain.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts the copy at the labelled point.
    #[must_use]
    pub fn start(mut self, label: impl Into<String>) -> Self {
        self.start = Some(label.into());
        self
    }

    /// Ends the copy at the labelled point.
    #[must_use]
    pub fn end(mut self, label: impl Into<String>) -> Self {
        self.end = Some(label.into());
        self
    }

    /// Includes the start point itself.
    #[must_use]
    pub fn include_start(mut self, include: bool) -> Self {
        self.include_start = include;
        self
    }

    /// Includes the end point itself.
    #[must_use]
    pub fn include_end(mut self, include: bool) -> Self {
        self.include_end = include;
        self
    }

    /// Copies only points inserted through a modifier carrying `label`.
    #[must_use]
    pub fn added_using(mut self, label: impl Into<String>) -> Self {
        self.added_using = Some(label.into());
        self
    }
}

impl Default for Runner {
    fn default() -> Self {
        Self::new()
    }
}

impl Runner {
    /// Default bound on nested scopes during execution.
    pub const DEFAULT_MAX_SCOPE_DEPTH: usize = 64;

    /// Creates an empty runner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            points: HashMap::new(),
            start: None,
            end: None,
            labels: HashMap::new(),
            lazy: HashMap::new(),
            next_id: 0,
            max_scope_depth: Self::DEFAULT_MAX_SCOPE_DEPTH,
        }
    }

    /// Sets how deeply scopes may nest during execution.
    #[must_use]
    pub fn with_max_scope_depth(mut self, max: usize) -> Self {
        self.max_scope_depth = max;
        self
    }

    // ─────────────────────────────────────────────────────────────────────
    // Inspection
    // ─────────────────────────────────────────────────────────────────────

    /// Returns the number of call points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Returns `true` if the chain has no call points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.start.is_none()
    }

    /// Returns the first point.
    #[must_use]
    pub fn start(&self) -> Option<PointId> {
        self.start
    }

    /// Returns the last point.
    #[must_use]
    pub fn end(&self) -> Option<PointId> {
        self.end
    }

    /// Looks up a point by handle.
    #[must_use]
    pub fn get(&self, id: PointId) -> Option<&CallPoint> {
        self.points.get(&id)
    }

    /// Returns the point carrying `label`.
    #[must_use]
    pub fn labelled(&self, label: &str) -> Option<PointId> {
        self.labels.get(label).copied()
    }

    /// Returns all labels, sorted.
    #[must_use]
    pub fn labels(&self) -> Vec<&str> {
        let mut labels: Vec<&str> = self.labels.keys().map(String::as_str).collect();
        labels.sort_unstable();
        labels
    }

    /// Returns the keys with a lazy provider registered.
    pub fn lazy_keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.lazy.keys()
    }

    /// Iterates the points in chain order.
    pub fn points(&self) -> Points<'_> {
        Points {
            runner: self,
            cursor: self.start,
        }
    }

    /// Iterates the point handles in chain order.
    pub fn ids(&self) -> impl Iterator<Item = PointId> + '_ {
        let mut cursor = self.start;
        core::iter::from_fn(move || {
            let id = cursor?;
            cursor = self.points.get(&id).and_then(CallPoint::next);
            Some(id)
        })
    }

    // ─────────────────────────────────────────────────────────────────────
    // Building
    // ─────────────────────────────────────────────────────────────────────

    /// Appends a call point at the end of the chain.
    ///
    /// The returned modifier is positioned on the new point.
    ///
    /// # Errors
    ///
    /// [`ChainError::DuplicateLabel`] if the registration's label is taken.
    pub fn add(
        &mut self,
        registration: impl Into<Registration>,
    ) -> Result<Modifier<'_>, ChainError> {
        let mut modifier = self.modifier_at_end();
        modifier.add(registration)?;
        Ok(modifier)
    }

    /// Registers a step as a lazy provider of its single return key.
    ///
    /// The step runs on first read of that key, not as part of the chain.
    ///
    /// # Errors
    ///
    /// [`ChainError::LazyNeedsKey`] unless the step returns a single key, and
    /// [`ChainError::LazyProviderCollision`] if the key is already provided.
    pub fn add_lazy(&mut self, registration: impl Into<Registration>) -> Result<(), ChainError> {
        let registration = registration.into();
        let (requires, returns) = registration.declarations();
        let Some(key) = returns.single_key().cloned() else {
            return Err(ChainError::LazyNeedsKey {
                step: registration.step().name().to_string(),
            });
        };
        let provider = Provider::new(registration.step().clone())
            .with_requirements(requires)
            .cached(registration.is_cached());
        self.check_lazy_free(&key, &provider)?;
        tracing::trace!(key = %key, step = %provider.step().name(), "registering lazy provider");
        self.lazy.insert(key, provider);
        Ok(())
    }

    /// Appends a copy of every point and lazy provider of `other`.
    ///
    /// # Errors
    ///
    /// [`ChainError::DuplicateLabel`] or [`ChainError::LazyProviderCollision`]
    /// if `other` reuses a label or lazy key of this runner. Nothing is
    /// copied on error.
    pub fn add_runner(&mut self, other: &Runner) -> Result<&mut Self, ChainError> {
        let ids: Vec<PointId> = other.ids().collect();
        self.copy_from(other, &ids, None)?;
        Ok(self)
    }

    /// Appends each item in turn.
    ///
    /// # Errors
    ///
    /// The first error raised by [`add`](Self::add),
    /// [`add_lazy`](Self::add_lazy) or [`add_runner`](Self::add_runner).
    pub fn extend<I>(&mut self, items: I) -> Result<&mut Self, ChainError>
    where
        I: IntoIterator,
        I::Item: Into<Chainable>,
    {
        for item in items {
            match item.into() {
                Chainable::Step(registration) => {
                    self.add(registration)?;
                }
                Chainable::Lazy(registration) => self.add_lazy(registration)?,
                Chainable::Runner(runner) => {
                    self.add_runner(&runner)?;
                }
            }
        }
        Ok(self)
    }

    /// Returns a modifier positioned on the point carrying `label`.
    ///
    /// # Errors
    ///
    /// [`ChainError::UnknownLabel`] if no point carries it.
    pub fn at(&mut self, label: &str) -> Result<Modifier<'_>, ChainError> {
        let point = self
            .labelled(label)
            .ok_or_else(|| ChainError::UnknownLabel(label.to_string()))?;
        Ok(Modifier::new(self, Some(point), Some(label.to_string())))
    }

    /// Returns a modifier positioned on the last point.
    pub fn modifier_at_end(&mut self) -> Modifier<'_> {
        let end = self.end;
        Modifier::new(self, end, None)
    }

    /// Labels the last point.
    ///
    /// # Errors
    ///
    /// See [`Modifier::add_label`].
    pub fn add_label(&mut self, label: impl Into<String>) -> Result<&mut Self, ChainError> {
        self.modifier_at_end().add_label(label)?;
        Ok(self)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Copying and reshaping
    // ─────────────────────────────────────────────────────────────────────

    /// Copies a contiguous sub-range into a new, independent runner.
    ///
    /// The copy shares steps with this runner but none of its structure. An
    /// inverted or empty range yields an empty runner. Lazy providers are
    /// copied as well.
    ///
    /// # Errors
    ///
    /// [`ChainError::UnknownLabel`] if a bound names an unknown label.
    pub fn clone_range(&self, range: &CloneRange) -> Result<Runner, ChainError> {
        let order: Vec<PointId> = self.ids().collect();
        let position = |label: &str| -> Result<usize, ChainError> {
            let id = self
                .labelled(label)
                .ok_or_else(|| ChainError::UnknownLabel(label.to_string()))?;
            Ok(order
                .iter()
                .position(|candidate| *candidate == id)
                .unwrap_or(order.len()))
        };

        let first = match &range.start {
            Some(label) => position(label)? + usize::from(!range.include_start),
            None => 0,
        };
        let last = match &range.end {
            Some(label) => position(label)? + usize::from(range.include_end),
            None => order.len(),
        };

        let mut runner = Runner::new().with_max_scope_depth(self.max_scope_depth);
        let ids = order.get(first..last).unwrap_or_default();
        runner.copy_from(self, ids, range.added_using.as_deref())?;
        Ok(runner)
    }

    /// Replaces every point invoking `original` with one invoking `replacement`.
    ///
    /// Matching is by step identity (see [`Step::same_callable`]). The new
    /// point takes the old one's position, labels and provenance; its
    /// requirements and returns each come from the source chosen.
    ///
    /// Returns the number of points replaced.
    pub fn replace(
        &mut self,
        original: &Step,
        replacement: &Step,
        requires_from: DeclarationSource,
        returns_from: DeclarationSource,
    ) -> usize {
        let targets: Vec<PointId> = self
            .ids()
            .filter(|id| {
                self.points
                    .get(id)
                    .is_some_and(|point| point.step().same_callable(original))
            })
            .collect();

        for old in &targets {
            let Some(existing) = self.points.remove(old) else {
                continue;
            };
            let requires = match requires_from {
                DeclarationSource::Original => existing.requires,
                DeclarationSource::Replacement => replacement.requirements().clone(),
            };
            let returns = match returns_from {
                DeclarationSource::Original => existing.returns,
                DeclarationSource::Replacement => replacement.returns_declaration().clone(),
            };
            let point = CallPoint {
                step: replacement.clone(),
                requires,
                returns,
                labels: existing.labels,
                added_using: existing.added_using,
                previous: existing.previous,
                next: existing.next,
            };
            self.splice_in(point);
        }

        if !targets.is_empty() {
            tracing::debug!(
                original = %original.name(),
                replacement = %replacement.name(),
                count = targets.len(),
                "replaced call points"
            );
        }
        targets.len()
    }

    /// Returns a new runner holding this chain followed by `other`.
    ///
    /// # Errors
    ///
    /// See [`add_runner`](Self::add_runner).
    pub fn concat(&self, other: &Runner) -> Result<Runner, ChainError> {
        let mut runner = self.clone();
        runner.add_runner(other)?;
        Ok(runner)
    }

    // ─────────────────────────────────────────────────────────────────────
    // Arena plumbing
    // ─────────────────────────────────────────────────────────────────────

    fn allocate(&mut self) -> PointId {
        let id = PointId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Links `point` in after `after`, or at the head when `after` is `None`.
    pub(crate) fn insert_after(&mut self, after: Option<PointId>, mut point: CallPoint) -> PointId {
        let id = self.allocate();
        let next = match after {
            Some(previous) => self.points.get(&previous).and_then(CallPoint::next),
            None => self.start,
        };
        point.previous = after;
        point.next = next;
        self.points.insert(id, point);
        self.relink(after, next, id);
        id
    }

    /// Links a point whose `previous`/`next` are already set into its
    /// neighbours, relabelling under the new handle.
    fn splice_in(&mut self, point: CallPoint) -> PointId {
        let id = self.allocate();
        let (previous, next) = (point.previous, point.next);
        for label in &point.labels {
            self.labels.insert(label.clone(), id);
        }
        self.points.insert(id, point);
        self.relink(previous, next, id);
        id
    }

    fn relink(&mut self, previous: Option<PointId>, next: Option<PointId>, id: PointId) {
        match previous.and_then(|previous| self.points.get_mut(&previous)) {
            Some(point) => point.next = Some(id),
            None => self.start = Some(id),
        }
        match next.and_then(|next| self.points.get_mut(&next)) {
            Some(point) => point.previous = Some(id),
            None => self.end = Some(id),
        }
    }

    /// Moves `label` onto `to`, detaching it from its previous owner.
    pub(crate) fn move_label(&mut self, label: &str, to: PointId) {
        if let Some(old) = self.labels.insert(label.to_string(), to)
            && let Some(point) = self.points.get_mut(&old)
        {
            point.labels.remove(label);
        }
        if let Some(point) = self.points.get_mut(&to) {
            point.labels.insert(label.to_string());
        }
    }

    /// Fails if `label` is owned by a point other than `allowed`.
    pub(crate) fn check_label_free(
        &self,
        label: &str,
        allowed: Option<PointId>,
    ) -> Result<(), ChainError> {
        match self.labels.get(label) {
            Some(owner) if Some(*owner) != allowed => Err(ChainError::DuplicateLabel {
                label: label.to_string(),
                owner: self.describe(*owner),
            }),
            _ => Ok(()),
        }
    }

    fn check_lazy_free(&self, key: &ResourceKey, incoming: &Provider) -> Result<(), ChainError> {
        match self.lazy.get(key) {
            Some(existing) => Err(ChainError::LazyProviderCollision {
                key: key.clone(),
                existing: existing.step().name().to_string(),
                incoming: incoming.step().name().to_string(),
            }),
            None => Ok(()),
        }
    }

    pub(crate) fn describe(&self, id: PointId) -> String {
        self.points
            .get(&id)
            .map_or_else(|| id.to_string(), ToString::to_string)
    }

    /// Appends copies of `ids` (points of `source`) and merges its lazy
    /// providers, validating every label and key before changing anything.
    fn copy_from(
        &mut self,
        source: &Runner,
        ids: &[PointId],
        added_using: Option<&str>,
    ) -> Result<(), ChainError> {
        let copies: Vec<CallPoint> = ids
            .iter()
            .filter_map(|id| source.points.get(id))
            .filter(|point| added_using.is_none_or(|label| point.added_using.contains(label)))
            .map(CallPoint::detached)
            .collect();

        for point in &copies {
            for label in &point.labels {
                self.check_label_free(label, None)?;
            }
        }
        for (key, provider) in &source.lazy {
            self.check_lazy_free(key, provider)?;
        }

        for point in copies {
            let labels = point.labels.clone();
            let id = self.insert_after(self.end, point);
            for label in labels {
                self.labels.insert(label, id);
            }
        }
        self.lazy.extend(
            source
                .lazy
                .iter()
                .map(|(key, provider)| (key.clone(), provider.clone())),
        );
        Ok(())
    }
}

impl Clone for Runner {
    fn clone(&self) -> Self {
        let mut runner = Runner::new().with_max_scope_depth(self.max_scope_depth);
        let ids: Vec<PointId> = self.ids().collect();
        // An empty runner cannot collide with anything.
        let _ = runner.copy_from(self, &ids, None);
        runner
    }
}

impl Add for &Runner {
    type Output = Result<Runner, ChainError>;

    fn add(self, other: &Runner) -> Self::Output {
        self.concat(other)
    }
}

impl fmt::Display for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("<Runner></Runner>");
        }
        f.write_str("<Runner>\n")?;
        for point in self.points() {
            writeln!(f, "    {point}")?;
        }
        f.write_str("</Runner>")
    }
}

/// Iterator over a runner's points in chain order.
pub struct Points<'a> {
    runner: &'a Runner,
    cursor: Option<PointId>,
}

impl<'a> Iterator for Points<'a> {
    type Item = &'a CallPoint;

    fn next(&mut self) -> Option<Self::Item> {
        let point = self.runner.points.get(&self.cursor?)?;
        self.cursor = point.next;
        Some(point)
    }
}
