// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    FailurePhase, Outcome, Reporter, RunFinished, SuiteHandle, TestClass, TestDefinitions,
    TestHandle, helpers::ReporterCore,
};
use crate::{
    classify::{ErrorRecord, Failure},
    errors::ReportError,
};
use std::{collections::HashMap, io::Write};
use swrite::{SWrite, swrite};
use tracing::debug;

/// Reports in the Test Anything Protocol, version 13.
///
/// Test points are numbered in definition order. Everything that isn't a test result is written
/// as a comment.
#[derive(Debug)]
pub struct TapReporter<W> {
    out: W,
    core: ReporterCore,
    numbers: HashMap<String, usize>,
    next_number: usize,
}

impl<W: Write> TapReporter<W> {
    pub(super) fn new(out: W, core: ReporterCore) -> Self {
        Self {
            out,
            core,
            numbers: HashMap::new(),
            next_number: 1,
        }
    }

    fn write_lines(&mut self, text: &str) -> Result<(), ReportError> {
        for line in text.lines() {
            writeln!(self.out, "{line}")?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn comment(&mut self, text: &str) -> Result<(), ReportError> {
        let commented: String = text.lines().map(|line| format!("# {line}\n")).collect();
        self.write_lines(&commented)
    }

    fn number(&mut self, identity: &str) -> usize {
        if let Some(&number) = self.numbers.get(identity) {
            return number;
        }
        debug!(identity, "test is not part of the plan");
        let number = self.next_number;
        self.next_number += 1;
        self.numbers.insert(identity.to_owned(), number);
        number
    }

    fn suite_failure(
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
        self.comment(&format!(
            "ERROR: {identity}: {what}: {}",
            single_line(&record.message)
        ))
    }
}

fn single_line(text: &str) -> String {
    text.replace('\n', " ")
}

fn escape(text: &str) -> String {
    text.replace('\\', "\\\\").replace('#', "\\#")
}

fn annotation(record: &ErrorRecord, show_line_numbers: bool) -> String {
    let mut out = single_line(&record.message);
    if let Some(location) = &record.location {
        swrite!(out, " in {}", location.display(show_line_numbers));
    }
    out
}

impl<W: Write> Reporter for TapReporter<W> {
    fn begin(&mut self, definitions: &TestDefinitions) -> Result<(), ReportError> {
        self.core.begin();
        self.numbers.clear();
        self.next_number = 1;

        for (identity, definition) in definitions {
            if definition.class == TestClass::Test {
                self.numbers.insert(identity.clone(), self.next_number);
                self.next_number += 1;
            }
        }

        let plan = self.numbers.len();
        self.write_lines(&format!("TAP version 13\n1..{plan}\n"))
    }

    fn start_test(&mut self, identity: &str, test: &TestHandle) -> Result<(), ReportError> {
        match test.description() {
            Some(description) => self.comment(&format!("running {identity}: {description}")),
            None => self.comment(&format!("running {identity}")),
        }
    }

    fn stop_test(
        &mut self,
        identity: &str,
        test: &TestHandle,
        outcome: Outcome,
        failure: Option<&Failure>,
    ) -> Result<(), ReportError> {
        let record = self.core.stop_test(identity, outcome, failure);
        let number = self.number(identity);
        let show_line_numbers = self.core.settings.show_line_numbers;

        let mut line = String::new();
        match outcome {
            Outcome::Ok | Outcome::Skipped => {
                swrite!(line, "ok {number} - {}", escape(identity));
                if let Some(description) = test.description() {
                    swrite!(line, ": {}", escape(&single_line(description)));
                }
                if outcome == Outcome::Skipped {
                    line.push_str(" # SKIP");
                    if let Some(record) = &record {
                        swrite!(line, " {}", single_line(&record.message));
                    }
                }
            }
            _ => {
                swrite!(line, "not ok {number} - {} ({outcome})", escape(identity));
                let directive = if outcome == Outcome::Xfail { "TODO " } else { "" };
                match &record {
                    Some(record) => {
                        swrite!(line, " # {directive}{}", annotation(record, show_line_numbers));
                    }
                    None if outcome == Outcome::Xfail => line.push_str(" # TODO"),
                    None => {}
                }
            }
        }
        line.push('\n');
        self.write_lines(&line)
    }

    fn start_setup_suite(
        &mut self,
        identity: &str,
        suite: &SuiteHandle,
    ) -> Result<(), ReportError> {
        match suite.setup_description() {
            Some(description) => self.comment(&format!("setting up {identity}: {description}")),
            None => self.comment(&format!("setting up {identity}")),
        }
    }

    fn stop_setup_suite(&mut self, identity: &str, _suite: &SuiteHandle) -> Result<(), ReportError> {
        self.comment(&format!("set up {identity}"))
    }

    fn start_teardown_suite(
        &mut self,
        identity: &str,
        suite: &SuiteHandle,
    ) -> Result<(), ReportError> {
        match suite.teardown_description() {
            Some(description) => self.comment(&format!("tearing down {identity}: {description}")),
            None => self.comment(&format!("tearing down {identity}")),
        }
    }

    fn stop_teardown_suite(
        &mut self,
        identity: &str,
        _suite: &SuiteHandle,
    ) -> Result<(), ReportError> {
        self.comment(&format!("torn down {identity}"))
    }

    fn suite_setup_failure(
        &mut self,
        identity: &str,
        failure: &Failure,
    ) -> Result<(), ReportError> {
        self.suite_failure(identity, FailurePhase::SetUp, failure)
    }

    fn suite_teardown_failure(
        &mut self,
        identity: &str,
        failure: &Failure,
    ) -> Result<(), ReportError> {
        self.suite_failure(identity, FailurePhase::TearDown, failure)
    }

    fn harness_failure(&mut self, failure: &Failure) -> Result<(), ReportError> {
        let record = self
            .core
            .phase_failure("harness", FailurePhase::Harness, failure);
        self.write_lines(&format!("Bail out! {}\n", single_line(&record.message)))
    }

    fn log(&mut self, message: &str) -> Result<(), ReportError> {
        self.comment(message)
    }

    fn end(&mut self, finished: &RunFinished) -> Result<(), ReportError> {
        let summary = self.core.finish(finished);
        let show_timing_info = self.core.settings.show_timing_info;
        self.comment(&summary.display(show_timing_info).to_string())
    }
}
