//! A buffered report that is only published if the pipeline succeeds.

use parking_lot::Mutex;
use std::sync::Arc;

use relay_context::error::BoxError;
use relay_context::resource::{Scope, Value};

/// Lines written while the report is open.
#[derive(Debug, Clone, Default)]
pub struct Report {
    lines: Arc<Mutex<Vec<String>>>,
}

impl Report {
    /// Appends a line.
    pub fn line(&self, line: impl Into<String>) {
        self.lines.lock().push(line.into());
    }

    /// Returns the lines written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().clone()
    }
}

/// Where a finished report goes.
pub type Publisher = Arc<dyn Fn(&[String]) + Send + Sync>;

/// Scope around the rest of the pipeline.
///
/// Entering hands out an empty [`Report`]. On a clean exit the report is
/// published; on failure it is discarded and the error propagates.
pub struct ReportScope {
    report: Report,
    publish: Publisher,
}

impl ReportScope {
    /// Creates a scope publishing through `publish`.
    #[must_use]
    pub fn new(publish: Publisher) -> Self {
        Self {
            report: Report::default(),
            publish,
        }
    }
}

impl Scope for ReportScope {
    fn enter(&self) -> Result<Option<Value>, BoxError> {
        tracing::debug!("report opened");
        Ok(Some(Value::new(self.report.clone())))
    }

    fn exit(
        &self,
        error: Option<&(dyn core::error::Error + Send + Sync + 'static)>,
    ) -> Result<bool, BoxError> {
        match error {
            None => (self.publish)(&self.report.lines()),
            Some(error) => tracing::warn!(%error, "discarding report"),
        }
        Ok(false)
    }
}
