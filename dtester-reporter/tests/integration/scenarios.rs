// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use dtester_reporter::{
    classify::{Failure, FailureError},
    errors::{RenderError, ReportError},
    reporter::{
        LineRenderer, Outcome, ReporterKind, SuiteHandle, TermCaps, TestDefinition, TestHandle,
    },
};
use pretty_assertions::assert_eq;
use test_case::test_case;

#[test]
fn stream_quiet_passing_test_prints_only_summary() {
    let captured = run_reporter(ReporterKind::Stream, true, |reporter| {
        reporter.begin(&tests(&["t1"])).unwrap();
        reporter.start_test("t1", &TestHandle::new()).unwrap();
        reporter
            .stop_test("t1", &TestHandle::new(), Outcome::Ok, None)
            .unwrap();
        reporter.end(&finished(1, 1)).unwrap();
    });

    let out = &captured.out;
    assert!(
        out.starts_with("1 tests successfully processed in "),
        "summary line: {out:?}"
    );
    assert!(out.ends_with(" seconds.\n"), "summary line: {out:?}");
    assert_eq!(out.lines().count(), 1, "only the summary is printed");
    assert_eq!(captured.errs, "");
}

#[test]
fn stream_failure_shows_message_and_location() {
    let captured = run_reporter(ReporterKind::Stream, true, |reporter| {
        reporter.begin(&tests(&["t1"])).unwrap();
        reporter.start_test("t1", &TestHandle::new()).unwrap();
        reporter
            .stop_test("t1", &TestHandle::new(), Outcome::Failed, Some(&boom()))
            .unwrap();
        reporter.end(&finished(1, 0)).unwrap();
    });

    let failed_line = captured
        .out
        .lines()
        .find(|line| line.contains("boom"))
        .expect("a line mentions the failure");
    assert!(failed_line.contains("file.py:42"), "{failed_line:?}");
    assert!(
        captured.out.contains("0 of 1 tests succeeded"),
        "{:?}",
        captured.out
    );
    assert!(captured.errs.contains("t1 failed: boom\nat file.py:42\n"));
}

#[test]
fn tap_two_tests() {
    let captured = run_reporter(ReporterKind::Tap, true, |reporter| {
        reporter.begin(&tests(&["t1", "t2"])).unwrap();
        reporter.start_test("t1", &TestHandle::new()).unwrap();
        reporter
            .stop_test("t1", &TestHandle::new(), Outcome::Ok, None)
            .unwrap();
        reporter.start_test("t2", &TestHandle::new()).unwrap();
        reporter
            .stop_test("t2", &TestHandle::new(), Outcome::Failed, Some(&boom()))
            .unwrap();
        reporter.end(&finished(2, 1)).unwrap();
    });

    let out = &captured.out;
    assert!(out.starts_with("TAP version 13\n1..2\n"), "{out:?}");

    let lines: Vec<_> = out.lines().collect();
    let ok = lines
        .iter()
        .position(|line| line.starts_with("ok 1 - t1"))
        .expect("ok line for t1");
    let not_ok = lines
        .iter()
        .position(|line| line.starts_with("not ok 2 - t2 (FAILED) # "))
        .expect("not ok line for t2");
    assert!(ok < not_ok, "results are in call order");
    assert_eq!(lines[not_ok], "not ok 2 - t2 (FAILED) # boom in file.py:42");
    assert_eq!(
        lines.iter().filter(|line| line.contains("ok ")).count(),
        2,
        "one result line per test"
    );
}

#[test]
fn status_lines_add_and_drop() {
    let mut renderer = LineRenderer::new(TermCaps::ansi(80), Vec::new());
    renderer.add_status("a", "x").unwrap();
    renderer.add_status("b", "y").unwrap();
    renderer.drop_status("a").unwrap();

    assert_eq!(renderer.status_ids(), ["b"]);
    assert!(!renderer.has_status("a"));

    let error = renderer.drop_status("a").unwrap_err();
    assert!(
        matches!(
            error,
            ReportError::Render(RenderError::UnknownStatusLine { ref id }) if id == "a"
        ),
        "dropping an untracked status line fails: {error}"
    );
}

#[test]
fn curses_run_clears_status_lines() {
    let captured = run_reporter(ReporterKind::Curses, false, |reporter| {
        let mut definitions = tests(&["t1"]);
        definitions.insert("db".to_owned(), TestDefinition::suite());
        reporter.begin(&definitions).unwrap();

        let suite = SuiteHandle::with_description("starting database");
        reporter.start_setup_suite("db", &suite).unwrap();
        let test = TestHandle::with_description("inserts a row");
        reporter.start_test("t1", &test).unwrap();
        reporter.stop_setup_suite("db", &suite).unwrap();
        // A stop without a matching start is tolerated.
        reporter.stop_teardown_suite("db", &suite).unwrap();
        reporter
            .stop_test("t1", &test, Outcome::Failed, Some(&boom()))
            .unwrap();
        reporter.log("all done").unwrap();
        reporter.end(&finished(1, 0)).unwrap();
    });

    let visible = strip_ansi_escapes::strip_str(&captured.out);
    assert!(visible.contains("db: starting database"), "{visible:?}");
    assert!(visible.contains(" FAILED t1: inserts a row"), "{visible:?}");
    assert!(visible.contains(" boom file.py:42"), "{visible:?}");
    assert!(visible.contains("all done"), "{visible:?}");
    assert!(
        visible.ends_with("0 of 1 tests succeeded (0.0%).\n"),
        "{visible:?}"
    );
    assert!(captured.errs.contains("t1 failed: boom"));
}

#[test_case(ReporterKind::Stream ; "stream")]
#[test_case(ReporterKind::Tap ; "tap")]
#[test_case(ReporterKind::Curses ; "curses")]
fn backends_agree_on_summary(kind: ReporterKind) {
    let captured = run_reporter(kind, false, |reporter| {
        let mut definitions = tests(&["a", "b", "c", "d"]);
        definitions.insert("suite".to_owned(), TestDefinition::suite());
        reporter.begin(&definitions).unwrap();

        let suite = SuiteHandle::with_description("suite");
        reporter.start_setup_suite("suite", &suite).unwrap();
        reporter.stop_setup_suite("suite", &suite).unwrap();

        let skipped = Failure::new(FailureError::Skipped {
            reason: "no network".to_owned(),
        });
        let events = [
            ("a", Outcome::Ok, None),
            ("b", Outcome::Skipped, Some(&skipped)),
            ("c", Outcome::Xfail, None),
            ("d", Outcome::Ok, None),
        ];
        for (identity, outcome, failure) in events {
            reporter.start_test(identity, &TestHandle::new()).unwrap();
            reporter
                .stop_test(identity, &TestHandle::new(), outcome, failure)
                .unwrap();
        }

        reporter.start_teardown_suite("suite", &suite).unwrap();
        reporter.stop_teardown_suite("suite", &suite).unwrap();
        reporter.end(&finished(4, 2)).unwrap();
    });

    let summary = "4 tests successfully processed (1 skipped, 1 expected failures).\n";
    assert!(
        captured.out.ends_with(summary),
        "{kind} output ends with summary: {:?}",
        captured.out
    );
    assert_eq!(captured.errs, "", "skips and expected failures are not dumped");
}
