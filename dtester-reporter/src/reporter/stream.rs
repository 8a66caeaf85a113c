// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    FailurePhase, Outcome, Reporter, RunFinished, SuiteHandle, TestDefinitions, TestHandle,
    helpers::{ReporterCore, displayed_record},
};
use crate::{classify::Failure, errors::ReportError};
use owo_colors::{OwoColorize, Style};
use std::io::{self, Write};
use swrite::{SWrite, swrite};
use tracing::debug;

/// Width of the longest status word (`SKIPPED:`, `TIMEOUT:`, `UX-SKIP:`), colon included.
const WORD_WIDTH: usize = 8;

/// Reports one plain line per event, without ever rewriting earlier output.
///
/// Passing tests without a description aren't printed at all, which keeps the output of large
/// passing runs down to the summary.
#[derive(Debug)]
pub struct StreamReporter<W, E> {
    out: W,
    errs: E,
    core: ReporterCore,
}

impl<W: Write, E: Write> StreamReporter<W, E> {
    pub(super) fn new(out: W, errs: E, core: ReporterCore) -> Self {
        Self { out, errs, core }
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        writeln!(self.out, "{line}")?;
        self.out.flush()
    }

    fn write_suite_phase(&mut self, identity: &str, description: Option<&str>) -> io::Result<()> {
        match description {
            Some(description) => self.write_line(&format!(
                "{:width$}{identity}: {description}",
                "",
                width = WORD_WIDTH + 1
            )),
            None => Ok(()),
        }
    }

    fn write_suite_failure(
        &mut self,
        identity: &str,
        phase: FailurePhase,
        failure: &Failure,
    ) -> Result<(), ReportError> {
        let record = self.core.phase_failure(identity, phase, failure);
        let what = match phase {
            FailurePhase::SetUp => "failed setting up",
            FailurePhase::TearDown => "failed tearing down",
            FailurePhase::Test | FailurePhase::Harness => "failed",
        };
        let line = format!(
            "{}{identity}: {what}: {}",
            word("ERROR", self.core.styles.fail),
            record.message
        );
        self.write_line(&line)?;
        Ok(())
    }
}

/// Formats a status word followed by a colon, padded to a fixed width.
fn word(word: &str, style: Style) -> String {
    let padded = format!("{:<WORD_WIDTH$} ", format!("{word}:"));
    padded.style(style).to_string()
}

impl<W: Write, E: Write> Reporter for StreamReporter<W, E> {
    fn begin(&mut self, definitions: &TestDefinitions) -> Result<(), ReportError> {
        debug!(definitions = definitions.len(), "stream reporter starting");
        self.core.begin();
        Ok(())
    }

    fn start_test(&mut self, _identity: &str, _test: &TestHandle) -> Result<(), ReportError> {
        Ok(())
    }

    fn stop_test(
        &mut self,
        identity: &str,
        test: &TestHandle,
        outcome: Outcome,
        failure: Option<&Failure>,
    ) -> Result<(), ReportError> {
        let record = self.core.stop_test(identity, outcome, failure);
        if outcome == Outcome::Ok && test.description().is_none() {
            return Ok(());
        }

        let mut line = word(outcome.as_str(), self.core.styles.for_outcome(outcome));
        line.push_str(identity);
        if let Some(description) = test.description() {
            swrite!(line, ": {description}");
        }
        if let Some(record) = displayed_record(record.as_ref()) {
            swrite!(line, " - {}", record.message);
            if let Some(location) = &record.location {
                swrite!(
                    line,
                    " in {}",
                    location.display(self.core.settings.show_line_numbers)
                );
            }
        }
        self.write_line(&line)?;
        Ok(())
    }

    fn start_setup_suite(
        &mut self,
        identity: &str,
        suite: &SuiteHandle,
    ) -> Result<(), ReportError> {
        self.write_suite_phase(identity, suite.setup_description())?;
        Ok(())
    }

    fn stop_setup_suite(&mut self, _identity: &str, _suite: &SuiteHandle) -> Result<(), ReportError> {
        Ok(())
    }

    fn start_teardown_suite(
        &mut self,
        identity: &str,
        suite: &SuiteHandle,
    ) -> Result<(), ReportError> {
        self.write_suite_phase(identity, suite.teardown_description())?;
        Ok(())
    }

    fn stop_teardown_suite(
        &mut self,
        _identity: &str,
        _suite: &SuiteHandle,
    ) -> Result<(), ReportError> {
        Ok(())
    }

    fn suite_setup_failure(
        &mut self,
        identity: &str,
        failure: &Failure,
    ) -> Result<(), ReportError> {
        self.write_suite_failure(identity, FailurePhase::SetUp, failure)
    }

    fn suite_teardown_failure(
        &mut self,
        identity: &str,
        failure: &Failure,
    ) -> Result<(), ReportError> {
        self.write_suite_failure(identity, FailurePhase::TearDown, failure)
    }

    fn harness_failure(&mut self, failure: &Failure) -> Result<(), ReportError> {
        let record = self
            .core
            .phase_failure("harness", FailurePhase::Harness, failure);
        let line = format!(
            "{}test harness: {}",
            word("ERROR", self.core.styles.fail),
            record.message
        );
        self.write_line(&line)?;
        Ok(())
    }

    fn log(&mut self, message: &str) -> Result<(), ReportError> {
        let prefix = word("LOG", self.core.styles.log);
        for line in message.lines() {
            writeln!(self.out, "{prefix}{line}")?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn end(&mut self, finished: &RunFinished) -> Result<(), ReportError> {
        let summary = self.core.finish(finished);
        self.core.write_failures(&mut self.errs)?;
        self.write_line(
            &summary
                .display(self.core.settings.show_timing_info)
                .to_string(),
        )?;
        Ok(())
    }
}
