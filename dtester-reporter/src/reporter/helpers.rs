// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{FailurePhase, Outcome, ReportedError, ResultAggregator, RunFinished, RunSummary};
use crate::classify::{ErrorClassifier, ErrorKind, ErrorRecord, Failure};
use owo_colors::{OwoColorize, Style};
use std::io::{self, Write};
use tracing::{debug, warn};

const HEAVY_RULE: &str = "====================";
const LIGHT_RULE: &str = "--------------------";

#[derive(Debug, Default, Clone)]
pub(super) struct Styles {
    pub(super) pass: Style,
    pub(super) fail: Style,
    pub(super) skip: Style,
    pub(super) xfail: Style,
    pub(super) log: Style,
}

impl Styles {
    pub(super) fn colorize(&mut self) {
        self.pass = Style::new().green().bold();
        self.fail = Style::new().red().bold();
        self.skip = Style::new().blue().bold();
        self.xfail = Style::new().yellow().bold();
        self.log = Style::new().magenta();
    }

    pub(super) fn for_outcome(&self, outcome: Outcome) -> Style {
        match outcome {
            Outcome::Ok => self.pass,
            Outcome::Skipped => self.skip,
            Outcome::Xfail => self.xfail,
            Outcome::Failed | Outcome::Timeout | Outcome::UxOk | Outcome::UxSkip => self.fail,
        }
    }
}

/// Settings shared by all backends.
#[derive(Clone, Copy, Debug)]
pub(super) struct DisplaySettings {
    pub(super) show_timing_info: bool,
    pub(super) show_line_numbers: bool,
}

/// State every backend composes: classification, outcome counts, and the failures to dump at
/// the end of the run.
#[derive(Debug)]
pub(super) struct ReporterCore {
    pub(super) settings: DisplaySettings,
    pub(super) styles: Styles,
    pub(super) classifier: ErrorClassifier,
    pub(super) aggregator: ResultAggregator,
    failures: Vec<RecordedFailure>,
}

#[derive(Debug)]
struct RecordedFailure {
    identity: String,
    phase: FailurePhase,
    record: ErrorRecord,
}

impl ReporterCore {
    pub(super) fn new(
        settings: DisplaySettings,
        styles: Styles,
        classifier: ErrorClassifier,
    ) -> Self {
        Self {
            settings,
            styles,
            classifier,
            aggregator: ResultAggregator::new(),
            failures: Vec::new(),
        }
    }

    pub(super) fn begin(&mut self) {
        self.aggregator.begin();
        self.failures.clear();
    }

    /// Records a finished test and classifies its failure, if any.
    pub(super) fn stop_test(
        &mut self,
        identity: &str,
        outcome: Outcome,
        failure: Option<&Failure>,
    ) -> Option<ErrorRecord> {
        self.aggregator.record(identity, outcome);
        let record = failure.map(|failure| self.classifier.classify(failure));
        match displayed_record(record.as_ref()) {
            Some(shown) => self.remember(identity, FailurePhase::Test, shown.clone()),
            None if outcome.is_failure() => {
                debug!(identity, %outcome, "test finished with a failing outcome but no failure");
                let synthetic = outcome_record(outcome, record.as_ref());
                self.remember(identity, FailurePhase::Test, synthetic);
            }
            None => {}
        }
        record
    }

    /// Classifies and remembers a failure outside of a test.
    pub(super) fn phase_failure(
        &mut self,
        identity: &str,
        phase: FailurePhase,
        failure: &Failure,
    ) -> ErrorRecord {
        let record = self.classifier.classify(failure);
        self.remember(identity, phase, record.clone());
        record
    }

    fn remember(&mut self, identity: &str, phase: FailurePhase, record: ErrorRecord) {
        if record.is_skip() {
            return;
        }
        // A second report for the same test replaces the first, matching the aggregator.
        self.failures
            .retain(|f| !(f.identity == identity && f.phase == phase));
        self.failures.push(RecordedFailure {
            identity: identity.to_owned(),
            phase,
            record,
        });
    }

    /// Adds failures the engine lists that were never reported through a callback.
    pub(super) fn finish(&mut self, finished: &RunFinished) -> RunSummary {
        for ReportedError {
            identity,
            phase,
            failure,
        } in &finished.errors
        {
            let seen = self
                .failures
                .iter()
                .any(|f| f.identity == *identity && f.phase == *phase);
            if !seen {
                debug!(identity = %identity, ?phase, "dumping failure not reported through a callback");
                let record = self.classifier.classify(failure);
                self.remember(identity, *phase, record);
            }
        }

        let summary = self.aggregator.finish();
        if finished.total != summary.total || finished.succeeded != summary.succeeded {
            warn!(
                "engine counted {} of {} tests as succeeded, reporter counted {} of {}",
                finished.succeeded, finished.total, summary.succeeded, summary.total,
            );
        }
        summary
    }

    /// Writes one diagnostic block per remembered failure.
    pub(super) fn write_failures(&self, mut writer: impl Write) -> io::Result<()> {
        for failure in &self.failures {
            write_diagnostic(
                &failure.identity,
                failure.phase,
                &failure.record,
                self.settings.show_line_numbers,
                &self.styles,
                &mut writer,
            )?;
        }
        writer.flush()
    }
}

/// Describes a failing outcome the engine reported without a displayable failure. `skip` is
/// the classified skip for `UX-SKIP`, if any.
fn outcome_record(outcome: Outcome, skip: Option<&ErrorRecord>) -> ErrorRecord {
    let (kind, message) = match outcome {
        Outcome::UxOk => (
            ErrorKind::TestFailure,
            "expected to fail, but passed".to_owned(),
        ),
        Outcome::UxSkip => {
            let message = match skip {
                Some(skip) => format!("expected to fail, but was skipped: {}", skip.message),
                None => "expected to fail, but was skipped".to_owned(),
            };
            (ErrorKind::TestFailure, message)
        }
        Outcome::Timeout => (ErrorKind::Timeout, "no details reported".to_owned()),
        Outcome::Failed | Outcome::Ok | Outcome::Skipped | Outcome::Xfail => {
            (ErrorKind::TestFailure, "no details reported".to_owned())
        }
    };
    ErrorRecord {
        kind,
        message,
        detail: None,
        location: None,
        children: Vec::new(),
    }
}

/// Returns the record to show next to a test: skips show no error text.
pub(super) fn displayed_record(record: Option<&ErrorRecord>) -> Option<&ErrorRecord> {
    record.filter(|record| !record.is_skip())
}

/// Writes a diagnostic block for a failure.
pub(super) fn write_diagnostic(
    identity: &str,
    phase: FailurePhase,
    record: &ErrorRecord,
    show_line_numbers: bool,
    styles: &Styles,
    mut writer: impl Write,
) -> io::Result<()> {
    if record.is_skip() {
        return Ok(());
    }

    let subject = match phase {
        FailurePhase::Test => identity.to_owned(),
        FailurePhase::SetUp => format!("{identity} (setting up)"),
        FailurePhase::TearDown => format!("{identity} (tearing down)"),
        FailurePhase::Harness => "test harness".to_owned(),
    };

    writeln!(writer, "{HEAVY_RULE}")?;
    write_record_body(&subject, record, show_line_numbers, styles, &mut writer)?;
    writeln!(writer)
}

fn write_record_body(
    subject: &str,
    record: &ErrorRecord,
    show_line_numbers: bool,
    styles: &Styles,
    writer: &mut dyn Write,
) -> io::Result<()> {
    let headline = match record.kind {
        ErrorKind::TestFailure => format!("{subject} failed: {}", record.message),
        ErrorKind::Timeout => format!("{subject} timed out: {}", record.message),
        ErrorKind::UnableToRun => format!("{subject} unable to run: {}", record.message),
        ErrorKind::DefinitionError => {
            format!("{subject} is not defined correctly: {}", record.message)
        }
        ErrorKind::FailedDependencies => {
            format!("{subject} has failed dependencies: {}", record.message)
        }
        ErrorKind::FailureCollection => format!("{subject} failed: {}", record.message),
        ErrorKind::Unknown => format!("Error in {subject}:"),
        ErrorKind::Skipped => return Ok(()),
    };
    writeln!(writer, "{}", headline.style(styles.fail))?;

    if let Some(location) = &record.location {
        writeln!(writer, "at {}", location.display(show_line_numbers))?;
    }

    if record.kind == ErrorKind::Unknown {
        writeln!(writer, "{LIGHT_RULE}")?;
        writeln!(writer, "{}", record.message)?;
    }

    if let Some(detail) = &record.detail {
        writeln!(writer, "{LIGHT_RULE}")?;
        writeln!(writer, "{}", detail.trim_end_matches('\n'))?;
    }

    for child in &record.children {
        if child.is_skip() {
            continue;
        }
        writeln!(writer, "{LIGHT_RULE}")?;
        write_record_body(subject, child, show_line_numbers, styles, writer)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::{FailureError, Location};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    fn record(kind: ErrorKind, message: &str) -> ErrorRecord {
        ErrorRecord {
            kind,
            message: message.to_owned(),
            detail: None,
            location: None,
            children: Vec::new(),
        }
    }

    fn diagnostic(identity: &str, phase: FailurePhase, record: &ErrorRecord) -> String {
        let mut out = Vec::new();
        write_diagnostic(identity, phase, record, true, &Styles::default(), &mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_failure_block() {
        let mut record = record(ErrorKind::TestFailure, "1 != 2");
        record.detail = Some("left: 1\nright: 2\n".to_owned());
        record.location = Some(Location {
            file: "tests/test_math.py".into(),
            line: 12,
        });

        assert_eq!(
            diagnostic("test_add", FailurePhase::Test, &record),
            indoc! {"
                ====================
                test_add failed: 1 != 2
                at tests/test_math.py:12
                --------------------
                left: 1
                right: 2

            "}
        );
    }

    #[test]
    fn unknown_error_block() {
        let mut record = record(ErrorKind::Unknown, "KeyError: 'db'");
        record.detail = Some("Traceback (most recent call last):\n  a.py:1 in f\n".to_owned());

        assert_eq!(
            diagnostic("db", FailurePhase::SetUp, &record),
            indoc! {"
                ====================
                Error in db (setting up):
                --------------------
                KeyError: 'db'
                --------------------
                Traceback (most recent call last):
                  a.py:1 in f

            "}
        );
    }

    #[test]
    fn collection_block_renders_children() {
        let mut record = record(ErrorKind::FailureCollection, "2 concurrent failures");
        record.children = vec![
            self::record(ErrorKind::TestFailure, "a broke"),
            self::record(ErrorKind::Skipped, "ignored"),
            self::record(ErrorKind::FailedDependencies, "ssh failed"),
        ];

        assert_eq!(
            diagnostic("test_pair", FailurePhase::Test, &record),
            indoc! {"
                ====================
                test_pair failed: 2 concurrent failures
                --------------------
                test_pair failed: a broke
                --------------------
                test_pair has failed dependencies: ssh failed

            "}
        );
    }

    #[test]
    fn skips_produce_no_block() {
        let record = record(ErrorKind::Skipped, "no network");
        assert_eq!(diagnostic("t", FailurePhase::Test, &record), "");
    }

    fn core() -> ReporterCore {
        let settings = DisplaySettings {
            show_timing_info: false,
            show_line_numbers: true,
        };
        let mut core = ReporterCore::new(settings, Styles::default(), ErrorClassifier::new("/"));
        core.begin();
        core
    }

    fn dump(core: &ReporterCore) -> String {
        let mut out = Vec::new();
        core.write_failures(&mut out).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn failing_outcomes_without_failure_are_dumped() {
        let mut core = core();
        let skip = Failure::new(FailureError::Skipped {
            reason: "no network".to_owned(),
        });
        core.stop_test("t1", Outcome::UxOk, None);
        core.stop_test("t2", Outcome::UxSkip, Some(&skip));
        core.stop_test("t3", Outcome::Timeout, None);
        core.stop_test("t4", Outcome::Failed, None);
        core.stop_test("ok", Outcome::Ok, None);
        core.stop_test("skip", Outcome::Skipped, Some(&skip));
        core.stop_test("xfail", Outcome::Xfail, None);

        assert_eq!(
            dump(&core),
            indoc! {"
                ====================
                t1 failed: expected to fail, but passed

                ====================
                t2 failed: expected to fail, but was skipped: no network

                ====================
                t3 timed out: no details reported

                ====================
                t4 failed: no details reported

            "}
        );
    }

    #[test]
    fn remembered_failures_are_replaced_per_identity() {
        let mut core = core();
        core.stop_test("t", Outcome::Failed, Some(&Failure::test_failure("first", None)));
        core.stop_test("t", Outcome::Failed, Some(&Failure::test_failure("second", None)));

        let out = dump(&core);
        assert!(!out.contains("first"), "first failure was replaced: {out}");
        assert!(out.contains("t failed: second"), "second failure is shown: {out}");
    }
}
