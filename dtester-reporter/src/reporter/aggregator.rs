// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-run accumulation of test outcomes.

use super::Outcome;
use crate::stopwatch::{StopwatchStart, stopwatch};
use indexmap::IndexMap;
use std::{fmt, time::Duration};

/// Accumulates the outcome of every test in a run.
#[derive(Clone, Debug)]
pub struct ResultAggregator {
    results: IndexMap<String, Outcome>,
    stopwatch: StopwatchStart,
    elapsed: Option<Duration>,
}

impl Default for ResultAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl ResultAggregator {
    /// Creates a new aggregator. The run's clock starts now, and is restarted by
    /// [`begin`](Self::begin).
    pub fn new() -> Self {
        Self {
            results: IndexMap::new(),
            stopwatch: stopwatch(),
            elapsed: None,
        }
    }

    /// Marks the start of a run.
    pub fn begin(&mut self) {
        self.results.clear();
        self.stopwatch = stopwatch();
        self.elapsed = None;
    }

    /// Records the outcome of a test, replacing any earlier outcome for the same identity.
    pub fn record(&mut self, identity: &str, outcome: Outcome) {
        self.results.insert(identity.to_owned(), outcome);
    }

    /// Returns the outcome recorded for a test, if any.
    pub fn outcome(&self, identity: &str) -> Option<Outcome> {
        self.results.get(identity).copied()
    }

    /// Marks the end of a run, fixing the elapsed time reported by [`summary`](Self::summary).
    pub fn finish(&mut self) -> RunSummary {
        self.elapsed = Some(self.stopwatch.snapshot().duration);
        self.summary()
    }

    /// Returns the counts so far.
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary {
            elapsed: self
                .elapsed
                .unwrap_or_else(|| self.stopwatch.snapshot().duration),
            ..RunSummary::default()
        };

        for outcome in self.results.values() {
            summary.total += 1;
            match outcome {
                Outcome::Ok => summary.succeeded += 1,
                Outcome::Skipped => summary.skipped += 1,
                Outcome::Xfail => summary.expected_failures += 1,
                Outcome::Failed | Outcome::Timeout | Outcome::UxOk | Outcome::UxSkip => {
                    summary.failed += 1
                }
            }
        }

        summary
    }
}

/// Final counts of a run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RunSummary {
    /// The number of tests that completed.
    pub total: usize,

    /// The number of tests that passed.
    pub succeeded: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,

    /// The number of tests that failed as expected.
    pub expected_failures: usize,

    /// The number of tests that failed, timed out, or behaved unexpectedly.
    pub failed: usize,

    /// Wall-clock time between the start and the end of the run.
    pub elapsed: Duration,
}

impl RunSummary {
    /// Returns true if no test failed. This is also the case if no tests ran.
    pub fn is_success(&self) -> bool {
        self.succeeded + self.skipped + self.expected_failures == self.total
    }

    /// Returns the percentage of tests that passed, or 100 if no tests ran.
    pub fn success_percentage(&self) -> f64 {
        if self.total == 0 {
            return 100.0;
        }
        self.succeeded as f64 / self.total as f64 * 100.0
    }

    /// Displays the summary as a single line, without a trailing newline.
    pub fn display(&self, show_timing_info: bool) -> DisplaySummary<'_> {
        DisplaySummary {
            summary: self,
            show_timing_info,
        }
    }
}

/// Displays a [`RunSummary`]. Returned by [`RunSummary::display`].
#[derive(Clone, Copy, Debug)]
pub struct DisplaySummary<'a> {
    summary: &'a RunSummary,
    show_timing_info: bool,
}

impl fmt::Display for DisplaySummary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let summary = self.summary;
        let success = summary.is_success();

        if success {
            write!(f, "{} tests successfully processed", summary.total)?;
        } else {
            write!(
                f,
                "{} of {} tests succeeded ({:.1}%)",
                summary.succeeded,
                summary.total,
                summary.success_percentage(),
            )?;
        }

        let mut extra = Vec::with_capacity(2);
        if summary.skipped > 0 {
            extra.push(format!("{} skipped", summary.skipped));
        }
        if summary.expected_failures > 0 {
            extra.push(format!("{} expected failures", summary.expected_failures));
        }
        if !extra.is_empty() {
            write!(f, " ({})", extra.join(", "))?;
        }

        if self.show_timing_info {
            let secs = summary.elapsed.as_secs_f64();
            if success {
                write!(f, " in {secs:.1} seconds")?;
            } else {
                write!(f, ", processed in {secs:.1} seconds")?;
            }
        }

        write!(f, ".")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use test_case::test_case;

    fn summary(total: usize, succeeded: usize, skipped: usize, xfail: usize) -> RunSummary {
        RunSummary {
            total,
            succeeded,
            skipped,
            expected_failures: xfail,
            failed: total - succeeded - skipped - xfail,
            elapsed: Duration::from_millis(2345),
        }
    }

    #[test_case(summary(1, 1, 0, 0), true, "1 tests successfully processed in 2.3 seconds." ; "all passed")]
    #[test_case(summary(1, 1, 0, 0), false, "1 tests successfully processed." ; "all passed without timing")]
    #[test_case(summary(0, 0, 0, 0), true, "0 tests successfully processed in 2.3 seconds." ; "no tests")]
    #[test_case(summary(1, 0, 0, 0), true, "0 of 1 tests succeeded (0.0%), processed in 2.3 seconds." ; "one failed")]
    #[test_case(summary(4, 1, 1, 1), false, "1 of 4 tests succeeded (25.0%) (1 skipped, 1 expected failures)." ; "mixed")]
    #[test_case(summary(3, 1, 2, 0), false, "3 tests successfully processed (2 skipped)." ; "skips are not failures")]
    fn summary_line(summary: RunSummary, show_timing_info: bool, expected: &str) {
        assert_eq!(summary.display(show_timing_info).to_string(), expected);
    }

    #[test]
    fn record_buckets_outcomes() {
        let mut aggregator = ResultAggregator::new();
        aggregator.begin();
        aggregator.record("a", Outcome::Ok);
        aggregator.record("b", Outcome::Failed);
        aggregator.record("c", Outcome::Skipped);
        aggregator.record("d", Outcome::Xfail);
        aggregator.record("e", Outcome::UxOk);
        aggregator.record("f", Outcome::Timeout);

        let summary = aggregator.finish();
        assert_eq!(summary.total, 6);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.expected_failures, 1);
        assert_eq!(summary.failed, 3);
        assert!(!summary.is_success());
    }

    #[test]
    fn record_overwrites() {
        let mut aggregator = ResultAggregator::new();
        aggregator.record("a", Outcome::Failed);
        aggregator.record("a", Outcome::Ok);

        let summary = aggregator.summary();
        assert_eq!(summary.total, 1);
        assert_eq!(summary.succeeded, 1);
        assert_eq!(aggregator.outcome("a"), Some(Outcome::Ok));
    }

    #[test]
    fn empty_run_has_full_percentage() {
        let summary = ResultAggregator::new().finish();
        assert!(summary.is_success());
        assert_eq!(summary.success_percentage(), 100.0);
    }

    #[test]
    fn finish_fixes_elapsed() {
        let mut aggregator = ResultAggregator::new();
        let finished = aggregator.finish();
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(aggregator.summary().elapsed, finished.elapsed);
    }
}
