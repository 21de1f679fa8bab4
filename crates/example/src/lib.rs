//! Example word-frequency pipeline built with relay.
//!
//! ```text
//! (lazy) text  <── Input
//!   │
//!   ▼
//! tokenize ──▶ count ──▶ open_report ─┬─▶ summarize
//!                                     └── publishes on clean exit
//! ```
//!
//! The text is only read when `tokenize` asks for it, and the report is
//! only published if every step inside it succeeds.

mod report;

pub use report::{Publisher, Report, ReportScope};

use std::collections::BTreeMap;
use std::path::PathBuf;

use relay_chain::error::ChainError;
use relay_chain::registration::Registration;
use relay_chain::runner::Runner;
use relay_context::context::Arguments;
use relay_context::declaration::{
    Projection, Requirement, RequirementsDeclaration, ReturnsDeclaration,
};
use relay_context::error::BoxError;
use relay_context::step::{Returned, Step};

/// Where the text comes from.
#[derive(Debug, Clone)]
pub enum Input {
    /// Read the file at this path.
    File(PathBuf),
    /// Use this text directly.
    Text(String),
}

/// Settings for a pipeline run.
#[derive(Debug, Clone)]
pub struct Settings {
    /// How many of the most frequent words to report.
    pub top: usize,
    /// Words shorter than this are ignored.
    pub min_length: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            top: 10,
            min_length: 1,
        }
    }
}

/// The normalized words of the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Words(pub Vec<String>);

/// How often each word occurs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Counts(pub BTreeMap<String, usize>);

/// Errors raised by pipeline steps.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// The input file could not be read.
    #[error("cannot read {path}: {source}")]
    Read {
        /// The file that failed.
        path: PathBuf,
        /// The I/O error.
        source: std::io::Error,
    },

    /// The input held no words.
    #[error("the input holds no words")]
    Empty,
}

fn read_text(args: Arguments<'_>) -> Result<Returned, BoxError> {
    let text = match args.value::<Input>(0)? {
        Input::Text(text) => text.clone(),
        Input::File(path) => {
            std::fs::read_to_string(path).map_err(|source| PipelineError::Read {
                path: path.clone(),
                source,
            })?
        }
    };
    Ok(Returned::value(text))
}

fn tokenize(args: Arguments<'_>) -> Result<Returned, BoxError> {
    let text = args.value::<String>(0)?;
    let min_length = args.named::<usize>("min_length")?;
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() >= *min_length)
        .map(str::to_lowercase)
        .collect();
    if words.is_empty() {
        return Err(PipelineError::Empty.into());
    }
    Ok(Returned::value(Words(words)))
}

fn count(args: Arguments<'_>) -> Result<Returned, BoxError> {
    let Words(words) = args.value::<Words>(0)?;
    let mut counts = BTreeMap::new();
    for word in words {
        *counts.entry(word.clone()).or_insert(0) += 1;
    }
    Ok(Returned::value(Counts(counts)))
}

fn summarize(args: Arguments<'_>) -> Result<Returned, BoxError> {
    let Counts(counts) = args.value::<Counts>(0)?;
    let report = args.value::<Report>(1)?;
    let top = args.named::<usize>("top")?;

    let mut ranked: Vec<(&String, &usize)> = counts.iter().collect();
    ranked.sort_by(|a, b| b.1.cmp(a.1).then_with(|| a.0.cmp(b.0)));
    for (word, n) in ranked.into_iter().take(*top) {
        report.line(format!("{n:>6} {word}"));
    }
    Ok(Returned::value(counts.len()))
}

/// Builds the pipeline, publishing the report through `publish`.
///
/// The caller's context must hold an [`Input`] and [`Settings`].
///
/// # Errors
///
/// Only if the chain itself is malformed.
pub fn pipeline(publish: Publisher) -> Result<Runner, ChainError> {
    let settings = |field: &'static str, project: fn(&Settings) -> usize| {
        Requirement::of::<Settings>()
            .project(Projection::attr(field, move |s: &Settings| Some(project(s))))
            .target(field)
    };

    let mut runner = Runner::new();
    runner.add_lazy(
        Registration::new(
            Step::new(read_text)
                .named("read_text")
                .requires(Requirement::of::<Input>()),
        )
        .returns(ReturnsDeclaration::single("text")),
    )?;
    runner.add(
        Registration::new(
            Step::new(tokenize)
                .named("tokenize")
                .requires(Requirement::name("text"))
                .requires(settings("min_length", |s| s.min_length)),
        )
        .label("input"),
    )?;
    runner.add(
        Step::new(count)
            .named("count")
            .requires(Requirement::of::<Words>()),
    )?;
    runner.add(
        Registration::new(
            Step::new(move |_| Ok(Returned::scoped(ReportScope::new(publish.clone()))))
                .named("open_report")
                .returns(ReturnsDeclaration::Ignore),
        )
        .label("report"),
    )?;
    runner.add(
        Step::new(summarize)
            .named("summarize")
            .requires(
                RequirementsDeclaration::new()
                    .with(Requirement::of::<Counts>())
                    .with(Requirement::of::<Report>())
                    .with(settings("top", |s| s.top)),
            )
            .returns(ReturnsDeclaration::Ignore),
    )?;
    Ok(runner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use relay_chain::error::RunError;
    use relay_context::context::Context;
    use std::sync::Arc;

    fn capture() -> (Publisher, Arc<Mutex<Vec<String>>>) {
        let published = Arc::new(Mutex::new(Vec::new()));
        let sink = published.clone();
        let publish: Publisher =
            Arc::new(move |lines: &[String]| sink.lock().extend_from_slice(lines));
        (publish, published)
    }

    fn context(text: &str, settings: Settings) -> Context<'static> {
        Context::new()
            .with(Input::Text(text.to_string()))
            .and_then(|context| context.with(settings))
            .unwrap()
    }

    #[test]
    fn reports_most_frequent_words() {
        let (publish, published) = capture();
        let runner = pipeline(publish).unwrap();
        let context = context(
            "the cat and the hat and the bat",
            Settings {
                top: 2,
                min_length: 1,
            },
        );

        let result = runner.run_in(&context).unwrap();
        assert_eq!(result.downcast_ref::<usize>(), Some(&5));
        assert_eq!(*published.lock(), ["     3 the", "     2 and"]);
    }

    #[test]
    fn short_words_are_skipped() {
        let (publish, published) = capture();
        let runner = pipeline(publish).unwrap();
        let context = context(
            "a an ant",
            Settings {
                top: 10,
                min_length: 3,
            },
        );

        runner.run_in(&context).unwrap();
        assert_eq!(*published.lock(), ["     1 ant"]);
    }

    #[test]
    fn empty_input_fails_before_report() {
        let (publish, published) = capture();
        let runner = pipeline(publish).unwrap();
        let context = context("  ...  ", Settings::default());

        let error = runner.run_in(&context).unwrap_err();
        assert!(matches!(error, RunError::Step { ref point, .. } if point == "tokenize"));
        assert!(published.lock().is_empty());
    }

    #[test]
    fn missing_file_is_reported() {
        let (publish, _) = capture();
        let runner = pipeline(publish).unwrap();
        let context = Context::new()
            .with(Input::File(PathBuf::from("/nonexistent/relay/input.txt")))
            .and_then(|context| context.with(Settings::default()))
            .unwrap();

        let error = runner.run_in(&context).unwrap_err();
        assert!(matches!(
            error,
            RunError::Resolution { ref point, .. } if point.starts_with("tokenize")
        ));
    }
}
