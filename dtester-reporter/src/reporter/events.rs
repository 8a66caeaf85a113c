// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::classify::Failure;
use indexmap::IndexMap;
use std::{fmt, time::Duration};

/// The outcome of a completed test.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum Outcome {
    /// The test passed.
    Ok,

    /// The test failed.
    Failed,

    /// The test was skipped.
    Skipped,

    /// The test exceeded its deadline.
    Timeout,

    /// The test was expected to fail, and did.
    Xfail,

    /// The test was expected to fail, but passed.
    UxOk,

    /// The test was expected to fail, but was skipped.
    UxSkip,
}

impl Outcome {
    /// Returns the upper-case word this outcome is displayed as.
    pub fn as_str(self) -> &'static str {
        match self {
            Outcome::Ok => "OK",
            Outcome::Failed => "FAILED",
            Outcome::Skipped => "SKIPPED",
            Outcome::Timeout => "TIMEOUT",
            Outcome::Xfail => "XFAIL",
            Outcome::UxOk => "UX-OK",
            Outcome::UxSkip => "UX-SKIP",
        }
    }

    /// Returns true if the run counts this outcome as a failure.
    pub fn is_failure(self) -> bool {
        match self {
            Outcome::Ok | Outcome::Skipped | Outcome::Xfail => false,
            Outcome::Failed | Outcome::Timeout | Outcome::UxOk | Outcome::UxSkip => true,
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a definition describes a leaf test or a suite.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TestClass {
    /// A leaf test.
    Test,

    /// A suite with setup and teardown phases.
    Suite,
}

/// The definition of a test or suite, as passed to [`Reporter::begin`](super::Reporter::begin).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TestDefinition {
    /// Whether this is a leaf test or a suite.
    pub class: TestClass,
}

impl TestDefinition {
    /// A leaf test.
    pub fn test() -> Self {
        Self {
            class: TestClass::Test,
        }
    }

    /// A suite.
    pub fn suite() -> Self {
        Self {
            class: TestClass::Suite,
        }
    }
}

/// All tests and suites of a run, keyed by identity, in definition order.
pub type TestDefinitions = IndexMap<String, TestDefinition>;

/// The reporter's view of a running test.
///
/// The description is resolved by the engine before calling into the reporter. If computing it
/// failed, the engine supplies a fallback string instead.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct TestHandle {
    description: Option<String>,
}

impl TestHandle {
    /// Creates a handle without a description.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle with the given description.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
        }
    }

    /// Returns the description, if any.
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

/// The reporter's view of a suite.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SuiteHandle {
    description: Option<String>,
    setup_description: Option<String>,
    teardown_description: Option<String>,
}

impl SuiteHandle {
    /// Creates a handle without any descriptions.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a handle with a description used for both phases.
    pub fn with_description(description: impl Into<String>) -> Self {
        Self {
            description: Some(description.into()),
            ..Self::default()
        }
    }

    /// Sets the description shown while the suite is being set up.
    pub fn set_setup_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.setup_description = Some(description.into());
        self
    }

    /// Sets the description shown while the suite is being torn down.
    pub fn set_teardown_description(&mut self, description: impl Into<String>) -> &mut Self {
        self.teardown_description = Some(description.into());
        self
    }

    /// Returns the description for the setup phase, falling back to the suite's description.
    pub fn setup_description(&self) -> Option<&str> {
        self.setup_description
            .as_deref()
            .or(self.description.as_deref())
    }

    /// Returns the description for the teardown phase, falling back to the suite's description.
    pub fn teardown_description(&self) -> Option<&str> {
        self.teardown_description
            .as_deref()
            .or(self.description.as_deref())
    }
}

/// The phase of the run a failure happened in.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum FailurePhase {
    /// While running a test.
    Test,

    /// While setting up a suite.
    SetUp,

    /// While tearing down a suite.
    TearDown,

    /// In the engine itself.
    Harness,
}

/// A failure as listed by the engine at the end of a run.
#[derive(Clone, Debug)]
pub struct ReportedError {
    /// The test or suite that failed.
    pub identity: String,

    /// The phase the failure happened in.
    pub phase: FailurePhase,

    /// The failure.
    pub failure: Failure,
}

/// The engine's account of a finished run, passed to [`Reporter::end`](super::Reporter::end).
#[derive(Clone, Debug, Default)]
pub struct RunFinished {
    /// Time elapsed since the engine started the run.
    pub elapsed: Duration,

    /// The number of tests that completed.
    pub total: usize,

    /// The number of tests that passed.
    pub succeeded: usize,

    /// The number of tests that were skipped.
    pub skipped: usize,

    /// The number of tests that failed as expected.
    pub expected_failures: usize,

    /// The failures of the run.
    pub errors: Vec<ReportedError>,
}
