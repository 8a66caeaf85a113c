// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by the dtester reporter.

use crate::reporter::ReporterKind;
use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::io;
use thiserror::Error;

/// An error that occurred while reading or parsing a reporter config file.
#[derive(Debug, Error)]
#[error("failed to parse reporter config at `{config_file}`")]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, err: ConfigError) -> Self {
        Self {
            config_file: config_file.into(),
            err,
        }
    }

    /// Returns the config file that failed to parse.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }
}

/// Error returned while parsing a [`ReporterKind`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for reporter kind: {input}\n(known values: {})",
    ReporterKind::variants().join(", "),
)]
pub struct ReporterKindParseError {
    input: String,
}

impl ReporterKindParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// A precondition of the line renderer was violated.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum RenderError {
    /// A status line was dropped that is not currently tracked.
    #[error("status line `{id}` is not being displayed")]
    UnknownStatusLine {
        /// The id of the line.
        id: String,
    },

    /// A line was added with an id that is already tracked.
    #[error("line `{id}` is already being displayed")]
    DuplicateLine {
        /// The id of the line.
        id: String,
    },
}

/// An error that occurred while reporting a lifecycle event.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReportError {
    /// An error occurred while writing to the output or error stream.
    #[error("error writing to output")]
    Io(#[from] io::Error),

    /// The terminal line renderer rejected an operation.
    #[error("error rendering terminal lines")]
    Render(#[from] RenderError),
}
