// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of failures produced by the test engine.
//!
//! The engine hands the reporter opaque [`Failure`] values. A failure may wrap another one any
//! number of times: once for every "first error among several concurrent operations" and every
//! "error raised while handling another error" it travelled through. [`ErrorClassifier`] unwraps
//! such chains and turns the innermost error into an [`ErrorRecord`]: a canonical kind, a
//! message, optional details, and the user-facing source location the failure originated from.

use camino::{Utf8Path, Utf8PathBuf};
use std::{borrow::Cow, fmt};
use swrite::{SWrite, swrite};
use tracing::debug;

/// A failure reported by the test engine, with the traceback it was raised with, if any.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Failure {
    /// The error itself.
    pub error: FailureError,

    /// The traceback captured when the error was raised.
    pub traceback: Option<Traceback>,
}

impl Failure {
    /// Creates a new failure without a traceback.
    pub fn new(error: FailureError) -> Self {
        Self {
            error,
            traceback: None,
        }
    }

    /// Attaches a traceback to this failure.
    pub fn with_traceback(mut self, traceback: Traceback) -> Self {
        self.traceback = Some(traceback);
        self
    }

    /// A failed check inside a test.
    pub fn test_failure(message: impl Into<String>, details: Option<String>) -> Self {
        Self::new(FailureError::TestFailure {
            message: message.into(),
            details,
        })
    }

    /// Wraps `inner` as the first error among several concurrent operations.
    pub fn first_error(inner: Failure) -> Self {
        Self::new(FailureError::Wrapped {
            reason: WrapReason::FirstError,
            inner: Box::new(inner),
        })
    }

    /// Wraps `inner` as an error raised while another one was being handled.
    pub fn during_handling(inner: Failure) -> Self {
        Self::new(FailureError::Wrapped {
            reason: WrapReason::DuringHandling,
            inner: Box::new(inner),
        })
    }
}

/// The kinds of errors the engine produces.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum FailureError {
    /// Wraps another failure on its way through the engine's coordination layer.
    Wrapped {
        /// Why the failure was wrapped.
        reason: WrapReason,

        /// The wrapped failure.
        inner: Box<Failure>,
    },

    /// Several operations failed concurrently.
    Collection(Vec<Failure>),

    /// A check inside a test failed.
    TestFailure {
        /// A short, single-line description of the failure.
        message: String,

        /// Extended details, such as a diff of the compared values.
        details: Option<String>,
    },

    /// An operation exceeded its deadline.
    Timeout {
        /// What timed out.
        message: String,
    },

    /// The test opted out of running.
    Skipped {
        /// Why the test was skipped.
        reason: String,
    },

    /// A precondition for running the test was not met.
    UnableToRun {
        /// The unmet precondition.
        message: String,
    },

    /// A test or suite was wired up incorrectly.
    Definition {
        /// What is wrong with the definition.
        message: String,
    },

    /// A dependency the test requires has failed.
    FailedDependencies {
        /// Which dependencies failed.
        message: String,
    },

    /// Any other error.
    Other {
        /// The name of the error's type, e.g. `OSError`.
        type_name: String,

        /// The error's message.
        message: String,
    },
}

impl fmt::Display for FailureError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureError::Wrapped { reason, inner } => write!(f, "{reason}: {}", inner.error),
            FailureError::Collection(failures) => {
                write!(f, "{} concurrent failures", failures.len())
            }
            FailureError::TestFailure { message, .. } => write!(f, "{message}"),
            FailureError::Timeout { message } => write!(f, "timeout: {message}"),
            FailureError::Skipped { reason } => write!(f, "skipped: {reason}"),
            FailureError::UnableToRun { message }
            | FailureError::Definition { message }
            | FailureError::FailedDependencies { message } => write!(f, "{message}"),
            FailureError::Other { type_name, message } => {
                if type_name.is_empty() {
                    write!(f, "{message}")
                } else if message.is_empty() {
                    write!(f, "{type_name}")
                } else {
                    write!(f, "{type_name}: {message}")
                }
            }
        }
    }
}

/// Why a failure was wrapped by another one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WrapReason {
    /// The first failure among several concurrently awaited operations.
    FirstError,

    /// Raised while another error was being handled.
    DuringHandling,
}

impl fmt::Display for WrapReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WrapReason::FirstError => write!(f, "first error"),
            WrapReason::DuringHandling => write!(f, "raised during error handling"),
        }
    }
}

/// A traceback, ordered from the outermost frame to the innermost one.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Traceback {
    frames: Vec<Frame>,
    rendered: Option<String>,
}

impl Traceback {
    /// Creates a traceback from its frames, outermost first.
    pub fn new(frames: impl IntoIterator<Item = Frame>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            rendered: None,
        }
    }

    /// Uses the engine's own rendering of the traceback instead of the default one.
    pub fn with_rendered(mut self, rendered: impl Into<String>) -> Self {
        self.rendered = Some(rendered.into());
        self
    }

    /// Returns the frames, outermost first.
    pub fn frames(&self) -> &[Frame] {
        &self.frames
    }

    /// Returns the traceback as text.
    pub fn render(&self) -> Cow<'_, str> {
        if let Some(rendered) = &self.rendered {
            return Cow::Borrowed(rendered);
        }

        let mut out = String::from("Traceback (most recent call last):\n");
        for frame in &self.frames {
            swrite!(out, "  {}:{} in {}\n", frame.file, frame.line, frame.function);
        }
        Cow::Owned(out)
    }
}

/// A single traceback frame.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// The source file.
    pub file: Utf8PathBuf,

    /// The line within the file, starting at 1.
    pub line: u32,

    /// The name of the function executing in this frame.
    pub function: String,
}

impl Frame {
    /// Creates a new frame.
    pub fn new(file: impl Into<Utf8PathBuf>, line: u32, function: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            line,
            function: function.into(),
        }
    }
}

/// The canonical kind of a classified failure.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A check inside a test failed.
    TestFailure,

    /// An operation exceeded its deadline.
    Timeout,

    /// The test opted out of running.
    Skipped,

    /// A precondition for running the test was not met.
    UnableToRun,

    /// A test or suite was wired up incorrectly.
    DefinitionError,

    /// A dependency the test requires has failed.
    FailedDependencies,

    /// Several operations failed concurrently.
    FailureCollection,

    /// Anything else.
    Unknown,
}

impl ErrorKind {
    /// Whether failures of this kind carry a meaningful source location.
    ///
    /// Errors about the wiring of tests rather than about a particular check would point at
    /// engine internals, so their location is always suppressed.
    pub fn has_location(self) -> bool {
        !matches!(
            self,
            ErrorKind::UnableToRun | ErrorKind::DefinitionError | ErrorKind::FailedDependencies
        )
    }
}

/// A source location, relative to the working directory where possible.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Location {
    /// The source file.
    pub file: Utf8PathBuf,

    /// The line within the file.
    pub line: u32,
}

impl Location {
    /// Displays the location as `file:line`, or just `file` if `show_line` is false.
    pub fn display(&self, show_line: bool) -> DisplayLocation<'_> {
        DisplayLocation {
            location: self,
            show_line,
        }
    }
}

/// Displays a [`Location`]. Returned by [`Location::display`].
#[derive(Clone, Copy, Debug)]
pub struct DisplayLocation<'a> {
    location: &'a Location,
    show_line: bool,
}

impl fmt::Display for DisplayLocation<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.show_line {
            write!(f, "{}:{}", self.location.file, self.location.line)
        } else {
            write!(f, "{}", self.location.file)
        }
    }
}

/// A failure, classified into its canonical form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ErrorRecord {
    /// The kind of failure.
    pub kind: ErrorKind,

    /// A short message describing the failure.
    pub message: String,

    /// Longer details: extended test failure output or a full traceback.
    pub detail: Option<String>,

    /// Where the failure originated.
    pub location: Option<Location>,

    /// The classified member failures, for [`ErrorKind::FailureCollection`] only.
    pub children: Vec<ErrorRecord>,
}

impl ErrorRecord {
    /// Returns true if the failure is a skip, which callers print nothing for.
    pub fn is_skip(&self) -> bool {
        self.kind == ErrorKind::Skipped
    }
}

/// Turns [`Failure`]s into [`ErrorRecord`]s.
#[derive(Clone, Debug)]
pub struct ErrorClassifier {
    base_dir: Option<Utf8PathBuf>,
    helper_frames: Vec<String>,
}

impl ErrorClassifier {
    /// Functions whose frames are never shown as a failure's location: the engine's assertion
    /// and synchronization helpers.
    pub const DEFAULT_HELPER_FRAMES: &'static [&'static str] =
        &["assertEqual", "assertNotEqual", "syncCall"];

    /// Creates a classifier reporting locations relative to `base_dir`.
    pub fn new(base_dir: impl Into<Utf8PathBuf>) -> Self {
        Self {
            base_dir: Some(base_dir.into()),
            helper_frames: Self::default_helper_frames(),
        }
    }

    /// Creates a classifier reporting locations relative to the current working directory.
    ///
    /// If the working directory cannot be determined or is not valid UTF-8, locations are
    /// reported as the engine supplied them.
    pub fn from_current_dir() -> Self {
        let base_dir = std::env::current_dir()
            .ok()
            .and_then(|dir| Utf8PathBuf::from_path_buf(dir).ok());
        if base_dir.is_none() {
            debug!("working directory unavailable, reporting locations unchanged");
        }
        Self {
            base_dir,
            helper_frames: Self::default_helper_frames(),
        }
    }

    /// Replaces the list of helper functions whose frames are skipped.
    pub fn with_helper_frames(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.helper_frames = names.into_iter().map(Into::into).collect();
        self
    }

    /// Classifies a failure.
    pub fn classify(&self, failure: &Failure) -> ErrorRecord {
        let (innermost, traceback) = unwrap_chain(failure);

        let (kind, message, detail, children) = match &innermost.error {
            FailureError::Wrapped { .. } => {
                unreachable!("unwrap_chain returns the innermost non-wrapper failure")
            }
            FailureError::Collection(failures) => (
                ErrorKind::FailureCollection,
                innermost.error.to_string(),
                None,
                failures.iter().map(|f| self.classify(f)).collect(),
            ),
            FailureError::TestFailure { message, details } => (
                ErrorKind::TestFailure,
                message.clone(),
                details.clone(),
                Vec::new(),
            ),
            FailureError::Timeout { message } => (
                ErrorKind::Timeout,
                message.clone(),
                traceback.map(|tb| tb.render().into_owned()),
                Vec::new(),
            ),
            FailureError::Skipped { reason } => {
                (ErrorKind::Skipped, reason.clone(), None, Vec::new())
            }
            FailureError::UnableToRun { message } => {
                (ErrorKind::UnableToRun, message.clone(), None, Vec::new())
            }
            FailureError::Definition { message } => {
                (ErrorKind::DefinitionError, message.clone(), None, Vec::new())
            }
            FailureError::FailedDependencies { message } => (
                ErrorKind::FailedDependencies,
                message.clone(),
                None,
                Vec::new(),
            ),
            FailureError::Other { .. } => (
                ErrorKind::Unknown,
                innermost.error.to_string(),
                traceback.map(|tb| tb.render().into_owned()),
                Vec::new(),
            ),
        };

        let location = if kind.has_location() {
            traceback.and_then(|tb| self.locate(tb))
        } else {
            None
        };

        ErrorRecord {
            kind,
            message,
            detail,
            location,
            children,
        }
    }

    fn default_helper_frames() -> Vec<String> {
        Self::DEFAULT_HELPER_FRAMES
            .iter()
            .map(|&name| name.to_owned())
            .collect()
    }

    /// Finds the innermost frame that isn't a helper.
    fn locate(&self, traceback: &Traceback) -> Option<Location> {
        let frame = traceback
            .frames()
            .iter()
            .rev()
            .find(|frame| !self.helper_frames.iter().any(|h| *h == frame.function))?;

        Some(Location {
            file: self.relative_path(&frame.file),
            line: frame.line,
        })
    }

    fn relative_path(&self, file: &Utf8Path) -> Utf8PathBuf {
        match &self.base_dir {
            Some(base_dir) if file.is_absolute() => {
                pathdiff::diff_utf8_paths(file, base_dir).unwrap_or_else(|| file.to_owned())
            }
            _ => file.to_owned(),
        }
    }
}

/// Unwraps chain wrappers, returning the innermost failure and the innermost traceback found on
/// the way down.
fn unwrap_chain(failure: &Failure) -> (&Failure, Option<&Traceback>) {
    let mut current = failure;
    let mut traceback = failure.traceback.as_ref();
    while let FailureError::Wrapped { inner, .. } = &current.error {
        current = inner;
        if let Some(tb) = &current.traceback {
            traceback = Some(tb);
        }
    }
    (current, traceback)
}
