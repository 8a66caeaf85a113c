// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Turns the lifecycle events of a test run into terminal and machine-readable output.
//!
//! The main trait in this module is [`Reporter`], which the test engine drives. Three backends
//! implement it:
//!
//! * [`StreamReporter`] prints one plain line per event, and is suitable for log files.
//! * [`TapReporter`] prints the [Test Anything Protocol](https://testanything.org/).
//! * [`CursesReporter`] keeps a live view of running suites and tests in a terminal.
//!
//! Backends are created through [`ReporterBuilder`].

mod aggregator;
mod curses;
mod events;
mod helpers;
mod stream;
mod tap;

pub use aggregator::*;
pub use curses::{CursesReporter, LineRenderer, LineStatus, TermCaps, TextLayout, wrap_words};
pub use events::*;
pub use stream::StreamReporter;
pub use tap::TapReporter;

use crate::{
    classify::{ErrorClassifier, Failure},
    config::ReporterConfig,
    errors::{ReportError, ReporterKindParseError},
    output::Color,
};
use camino::Utf8PathBuf;
use helpers::{DisplaySettings, ReporterCore, Styles};
use serde::Deserialize;
use std::{
    fmt,
    io::{self, IsTerminal, Write},
    str::FromStr,
};
use tracing::debug;

/// The callbacks a test engine invokes over the course of a run.
///
/// Calls are serialized by the engine, but calls for different tests and suites may interleave
/// arbitrarily. Implementations handle unpaired or repeated calls without failing; errors are
/// only returned if the output can't be written, or if the display state is corrupted.
pub trait Reporter {
    /// Called once, before anything else, with every test and suite of the run.
    fn begin(&mut self, definitions: &TestDefinitions) -> Result<(), ReportError>;

    /// A test started running.
    fn start_test(&mut self, identity: &str, test: &TestHandle) -> Result<(), ReportError>;

    /// A test finished. `failure` is the failure that produced a non-`OK` outcome, if any.
    fn stop_test(
        &mut self,
        identity: &str,
        test: &TestHandle,
        outcome: Outcome,
        failure: Option<&Failure>,
    ) -> Result<(), ReportError>;

    /// A suite started setting up.
    fn start_setup_suite(&mut self, identity: &str, suite: &SuiteHandle)
    -> Result<(), ReportError>;

    /// A suite finished setting up.
    fn stop_setup_suite(&mut self, identity: &str, suite: &SuiteHandle) -> Result<(), ReportError>;

    /// A suite started tearing down.
    fn start_teardown_suite(
        &mut self,
        identity: &str,
        suite: &SuiteHandle,
    ) -> Result<(), ReportError>;

    /// A suite finished tearing down.
    fn stop_teardown_suite(
        &mut self,
        identity: &str,
        suite: &SuiteHandle,
    ) -> Result<(), ReportError>;

    /// Setting up a suite failed.
    fn suite_setup_failure(&mut self, identity: &str, failure: &Failure)
    -> Result<(), ReportError>;

    /// Tearing down a suite failed.
    fn suite_teardown_failure(
        &mut self,
        identity: &str,
        failure: &Failure,
    ) -> Result<(), ReportError>;

    /// The engine itself failed, and the run can't continue normally.
    fn harness_failure(&mut self, failure: &Failure) -> Result<(), ReportError>;

    /// A free-form message from the engine or a test.
    fn log(&mut self, message: &str) -> Result<(), ReportError>;

    /// Called once, after everything else.
    fn end(&mut self, finished: &RunFinished) -> Result<(), ReportError>;
}

/// Which backend to report with.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ReporterKind {
    /// Curses if the output is a terminal, stream otherwise.
    #[default]
    Auto,

    /// Plain sequential lines.
    Stream,

    /// The Test Anything Protocol.
    Tap,

    /// A live terminal view.
    Curses,
}

impl ReporterKind {
    /// String representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["auto", "stream", "tap", "curses"]
    }

    /// Resolves [`Auto`](Self::Auto) depending on whether the output is a terminal. TAP is never
    /// selected automatically.
    pub fn resolve(self, is_terminal: bool) -> Self {
        match self {
            ReporterKind::Auto if is_terminal => ReporterKind::Curses,
            ReporterKind::Auto => ReporterKind::Stream,
            other => other,
        }
    }
}

impl FromStr for ReporterKind {
    type Err = ReporterKindParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let val = match s {
            "auto" => ReporterKind::Auto,
            "stream" => ReporterKind::Stream,
            "tap" => ReporterKind::Tap,
            "curses" => ReporterKind::Curses,
            other => return Err(ReporterKindParseError::new(other)),
        };
        Ok(val)
    }
}

impl fmt::Display for ReporterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReporterKind::Auto => write!(f, "auto"),
            ReporterKind::Stream => write!(f, "stream"),
            ReporterKind::Tap => write!(f, "tap"),
            ReporterKind::Curses => write!(f, "curses"),
        }
    }
}

/// Reporter builder.
///
/// Settings left unset are taken from the [`ReporterConfig`] passed to
/// [`build`](Self::build).
#[derive(Debug, Default)]
pub struct ReporterBuilder {
    kind: Option<ReporterKind>,
    show_timing_info: Option<bool>,
    show_line_numbers: Option<bool>,
    color: Option<Color>,
    helper_frames: Option<Vec<String>>,
    base_dir: Option<Utf8PathBuf>,
    term_caps: Option<TermCaps>,
}

impl ReporterBuilder {
    /// Sets the backend to use.
    pub fn set_kind(&mut self, kind: ReporterKind) -> &mut Self {
        self.kind = Some(kind);
        self
    }

    /// Sets whether the summary includes the elapsed time.
    pub fn set_show_timing_info(&mut self, show_timing_info: bool) -> &mut Self {
        self.show_timing_info = Some(show_timing_info);
        self
    }

    /// Sets whether source locations include line numbers.
    pub fn set_show_line_numbers(&mut self, show_line_numbers: bool) -> &mut Self {
        self.show_line_numbers = Some(show_line_numbers);
        self
    }

    /// Sets when to use colors.
    pub fn set_color(&mut self, color: Color) -> &mut Self {
        self.color = Some(color);
        self
    }

    /// Sets the names of helper functions that are skipped when locating a failure.
    pub fn set_helper_frames(
        &mut self,
        helper_frames: impl IntoIterator<Item = impl Into<String>>,
    ) -> &mut Self {
        self.helper_frames = Some(helper_frames.into_iter().map(Into::into).collect());
        self
    }

    /// Sets the directory source locations are shown relative to. Defaults to the current
    /// directory.
    pub fn set_base_dir(&mut self, base_dir: impl Into<Utf8PathBuf>) -> &mut Self {
        self.base_dir = Some(base_dir.into());
        self
    }

    /// Sets the terminal capabilities used by the curses backend. Defaults to
    /// [`TermCaps::detect`].
    pub fn set_term_caps(&mut self, term_caps: TermCaps) -> &mut Self {
        self.term_caps = Some(term_caps);
        self
    }
}

impl ReporterBuilder {
    /// Creates a reporter writing results to `out` and diagnostics to `errs`.
    ///
    /// `is_terminal` selects the backend if the kind is [`ReporterKind::Auto`].
    pub fn build<'a>(
        &self,
        config: &ReporterConfig,
        is_terminal: bool,
        out: impl Write + 'a,
        errs: impl Write + 'a,
    ) -> Box<dyn Reporter + 'a> {
        let kind = self.kind.unwrap_or_else(|| config.kind()).resolve(is_terminal);
        let settings = DisplaySettings {
            show_timing_info: self
                .show_timing_info
                .unwrap_or_else(|| config.show_timing_info()),
            show_line_numbers: self
                .show_line_numbers
                .unwrap_or_else(|| config.show_line_numbers()),
        };

        let mut styles = Styles::default();
        let color = self.color.unwrap_or_else(|| config.color());
        if color.should_colorize(supports_color::Stream::Stdout) {
            styles.colorize();
        }

        let classifier = match &self.base_dir {
            Some(base_dir) => ErrorClassifier::new(base_dir.clone()),
            None => ErrorClassifier::from_current_dir(),
        };
        let helper_frames = self
            .helper_frames
            .as_deref()
            .unwrap_or_else(|| config.helper_frames());
        let classifier = classifier.with_helper_frames(helper_frames.iter().cloned());

        debug!(%kind, ?settings, "building reporter");
        let core = ReporterCore::new(settings, styles, classifier);
        match kind {
            ReporterKind::Stream | ReporterKind::Auto => {
                Box::new(StreamReporter::new(out, errs, core))
            }
            ReporterKind::Tap => Box::new(TapReporter::new(out, core)),
            ReporterKind::Curses => {
                let caps = self.term_caps.clone().unwrap_or_else(TermCaps::detect);
                Box::new(CursesReporter::new(caps, out, errs, core))
            }
        }
    }

    /// Creates a reporter writing to standard output and standard error.
    pub fn build_stdio(&self, config: &ReporterConfig) -> Box<dyn Reporter> {
        let is_terminal = io::stdout().is_terminal();
        self.build(config, is_terminal, io::stdout(), io::stderr())
    }
}
