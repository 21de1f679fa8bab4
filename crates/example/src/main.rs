//! Word-frequency CLI.
//!
//! Prints the most frequent words of a file.
//!
//! # Usage
//!
//! ```bash
//! wordfreq <file> [top] [min_length]
//! ```
//!
//! Set `RELAY_LOG` to a filter such as `relay_chain=debug` to see each step
//! run, and `RELAY_LOG_FORMAT` to `pretty`, `compact` or `json`.

use example::{Input, Publisher, Settings, pipeline};
use relay_chain::error::RunError;
use relay_context::context::Context;
use relay_tracing::{TracingConfig, TracingFormat};
use std::io::Write as _;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::Level;

fn main() -> ExitCode {
    let mut tracing = TracingConfig::new().with_level(Level::WARN);
    if let Ok(filter) = std::env::var("RELAY_LOG") {
        tracing = tracing.with_env_filter(filter);
    }
    if let Some(format) = std::env::var("RELAY_LOG_FORMAT")
        .ok()
        .and_then(|name| TracingFormat::parse(&name))
    {
        tracing = tracing.with_format(format);
    }
    tracing.init();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        eprintln!("Usage: <file> [top] [min_length]");
        eprintln!("Example: ./README.md 5 4");
        return ExitCode::from(64);
    }

    let defaults = Settings::default();
    let settings = Settings {
        top: parse_or(args.get(2), defaults.top),
        min_length: parse_or(args.get(3), defaults.min_length),
    };

    let publish: Publisher = Arc::new(|lines: &[String]| {
        let mut stdout = std::io::stdout().lock();
        for line in lines {
            let _ = writeln!(stdout, "{line}");
        }
    });

    let runner = match pipeline(publish) {
        Ok(runner) => runner,
        Err(e) => {
            eprintln!("Error: {e}");
            return ExitCode::from(70);
        }
    };

    let context = Context::new();
    let seeded = context
        .add(Input::File(PathBuf::from(&args[1])))
        .and_then(|()| context.add(settings));
    if let Err(e) = seeded {
        eprintln!("Error: {e}");
        return ExitCode::from(70);
    }

    match runner.run_in(&context) {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            exit_code(&e)
        }
    }
}

fn parse_or(arg: Option<&String>, default: usize) -> usize {
    arg.and_then(|value| value.parse().ok()).unwrap_or(default)
}

/// Input problems map to `EX_DATAERR`, everything else to failure.
fn exit_code(error: &RunError) -> ExitCode {
    match error {
        RunError::Resolution { .. } | RunError::Step { .. } => ExitCode::from(65),
        _ => ExitCode::FAILURE,
    }
}
