// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! A live terminal view of the run.
//!
//! Tests get a permanent result line, created when the test starts and rewritten in place when
//! it finishes. Suites being set up or torn down get a transient status line at the bottom of
//! the screen, which disappears when that phase ends.

mod layout;
mod renderer;

pub use layout::{LineStatus, TextLayout, wrap_words};
pub use renderer::{LineRenderer, TermCaps};

use super::{
    FailurePhase, Outcome, Reporter, RunFinished, SuiteHandle, TestDefinitions, TestHandle,
    helpers::{ReporterCore, displayed_record},
};
use crate::{classify::Failure, errors::ReportError};
use owo_colors::OwoColorize;
use std::io::Write;
use tracing::{debug, warn};

/// Width of the status word at the start of each result line.
const STATUS_WIDTH: usize = 7;

/// Reports to an interactive terminal, keeping a live view of running tests and suites.
#[derive(Debug)]
pub struct CursesReporter<W, E> {
    renderer: LineRenderer<W>,
    layout: TextLayout,
    errs: E,
    core: ReporterCore,
    log_lines: usize,
}

impl<W: Write, E: Write> CursesReporter<W, E> {
    pub(super) fn new(caps: TermCaps, out: W, errs: E, core: ReporterCore) -> Self {
        // Writing to the last column makes some terminals wrap early.
        let width = caps.columns().saturating_sub(1);
        let mut layout = TextLayout::new(width, STATUS_WIDTH);
        layout
            .set_show_line_numbers(core.settings.show_line_numbers)
            .set_styles(core.styles.clone());

        Self {
            renderer: LineRenderer::new(caps, out),
            layout,
            errs,
            core,
            log_lines: 0,
        }
    }

    /// Returns the line renderer.
    pub fn renderer(&self) -> &LineRenderer<W> {
        &self.renderer
    }

    fn show_result(&mut self, id: &str, line: &str) -> Result<(), ReportError> {
        if self.renderer.text(id).is_some() {
            self.renderer.update_result(id, line)
        } else {
            self.renderer.add_result(id, line)
        }
    }

    fn start_status(
        &mut self,
        key: String,
        identity: &str,
        description: Option<&str>,
    ) -> Result<(), ReportError> {
        let Some(description) = description else {
            return Ok(());
        };
        if self.renderer.has_status(&key) {
            debug!(key = %key, "status line already shown");
            return Ok(());
        }
        let text = self.layout.render_status(identity, description);
        self.renderer.add_status(&key, &text)
    }

    fn stop_status(&mut self, key: &str) -> Result<(), ReportError> {
        // No line exists if the phase had no description.
        if self.renderer.has_status(key) {
            self.renderer.drop_status(key)?;
        }
        Ok(())
    }

    fn failure_line(&mut self, identity: &str, phase: FailurePhase, failure: &Failure) -> String {
        let record = self.core.phase_failure(identity, phase, failure);
        let what = match phase {
            FailurePhase::SetUp => "failed setting up",
            FailurePhase::TearDown => "failed tearing down",
            FailurePhase::Test | FailurePhase::Harness => "failed",
        };
        let description = format!("{what}: {}", record.message);
        self.layout.render_line(
            LineStatus::Finished(Outcome::Failed),
            identity,
            Some(&description),
            None,
            record.location.as_ref(),
        )
    }
}

fn setup_key(identity: &str) -> String {
    format!("setup__{identity}")
}

fn teardown_key(identity: &str) -> String {
    format!("teardown__{identity}")
}

impl<W: Write, E: Write> Reporter for CursesReporter<W, E> {
    fn begin(&mut self, definitions: &TestDefinitions) -> Result<(), ReportError> {
        debug!(definitions = definitions.len(), "curses reporter starting");
        self.core.begin();
        Ok(())
    }

    fn start_test(&mut self, identity: &str, test: &TestHandle) -> Result<(), ReportError> {
        // Quiet tests get their line when they finish.
        let Some(description) = test.description() else {
            return Ok(());
        };
        let line =
            self.layout
                .render_line(LineStatus::Running, identity, Some(description), None, None);
        self.show_result(identity, &line)
    }

    fn stop_test(
        &mut self,
        identity: &str,
        test: &TestHandle,
        outcome: Outcome,
        failure: Option<&Failure>,
    ) -> Result<(), ReportError> {
        let record = self.core.stop_test(identity, outcome, failure);
        let shown = displayed_record(record.as_ref());
        let line = self.layout.render_line(
            LineStatus::Finished(outcome),
            identity,
            test.description(),
            shown.map(|record| record.message.as_str()),
            shown.and_then(|record| record.location.as_ref()),
        );
        self.renderer.update_result(identity, &line)
    }

    fn start_setup_suite(
        &mut self,
        identity: &str,
        suite: &SuiteHandle,
    ) -> Result<(), ReportError> {
        self.start_status(setup_key(identity), identity, suite.setup_description())
    }

    fn stop_setup_suite(&mut self, identity: &str, _suite: &SuiteHandle) -> Result<(), ReportError> {
        self.stop_status(&setup_key(identity))
    }

    fn start_teardown_suite(
        &mut self,
        identity: &str,
        suite: &SuiteHandle,
    ) -> Result<(), ReportError> {
        self.start_status(teardown_key(identity), identity, suite.teardown_description())
    }

    fn stop_teardown_suite(
        &mut self,
        identity: &str,
        _suite: &SuiteHandle,
    ) -> Result<(), ReportError> {
        self.stop_status(&teardown_key(identity))
    }

    fn suite_setup_failure(
        &mut self,
        identity: &str,
        failure: &Failure,
    ) -> Result<(), ReportError> {
        let line = self.failure_line(identity, FailurePhase::SetUp, failure);
        self.show_result(&format!("failed__{}", setup_key(identity)), &line)
    }

    fn suite_teardown_failure(
        &mut self,
        identity: &str,
        failure: &Failure,
    ) -> Result<(), ReportError> {
        let line = self.failure_line(identity, FailurePhase::TearDown, failure);
        self.show_result(&format!("failed__{}", teardown_key(identity)), &line)
    }

    fn harness_failure(&mut self, failure: &Failure) -> Result<(), ReportError> {
        let record = self
            .core
            .phase_failure("harness", FailurePhase::Harness, failure);
        let message = format!("ERROR: {}", record.message);
        self.log(&message)
    }

    fn log(&mut self, message: &str) -> Result<(), ReportError> {
        for line in wrap_words(message, self.layout.width()) {
            let id = format!("log__{}", self.log_lines);
            self.log_lines += 1;
            let text = line.style(self.core.styles.log).to_string();
            self.renderer.add_result(&id, &text)?;
        }
        Ok(())
    }

    fn end(&mut self, finished: &RunFinished) -> Result<(), ReportError> {
        let dropped = self.renderer.drop_all_status()?;
        if !dropped.is_empty() {
            warn!(
                "{} status lines were still open at the end of the run: {}",
                dropped.len(),
                dropped.join(", "),
            );
        }

        let summary = self.core.finish(finished);
        self.core.write_failures(&mut self.errs)?;

        let show_timing_info = self.core.settings.show_timing_info;
        let out = self.renderer.writer_mut();
        writeln!(out, "{}", summary.display(show_timing_info))?;
        out.flush()?;
        Ok(())
    }
}
