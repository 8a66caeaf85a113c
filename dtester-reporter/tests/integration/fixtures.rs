// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use dtester_reporter::{
    classify::{Failure, Frame, Traceback},
    config::ReporterConfig,
    output::Color,
    reporter::{
        Reporter, ReporterBuilder, ReporterKind, RunFinished, TermCaps, TestDefinition,
        TestDefinitions,
    },
};

/// Output captured from a run.
#[derive(Debug)]
pub(crate) struct Captured {
    pub(crate) out: String,
    pub(crate) errs: String,
}

/// Drives a reporter of the given kind with `events`, capturing what it writes.
pub(crate) fn run_reporter(
    kind: ReporterKind,
    show_timing_info: bool,
    events: impl FnOnce(&mut dyn Reporter),
) -> Captured {
    let config = ReporterConfig::default_config();
    let mut out = Vec::new();
    let mut errs = Vec::new();
    {
        let mut builder = ReporterBuilder::default();
        builder
            .set_kind(kind)
            .set_show_timing_info(show_timing_info)
            .set_color(Color::Never)
            .set_base_dir("/work")
            .set_term_caps(TermCaps::ansi(81));
        let mut reporter = builder.build(&config, false, &mut out, &mut errs);
        events(&mut *reporter);
    }
    Captured {
        out: String::from_utf8(out).expect("output is UTF-8"),
        errs: String::from_utf8(errs).expect("error output is UTF-8"),
    }
}

pub(crate) fn tests(names: &[&str]) -> TestDefinitions {
    names
        .iter()
        .map(|name| ((*name).to_owned(), TestDefinition::test()))
        .collect()
}

/// A failed check at `file.py:42`, reached through the engine's assertion helper.
pub(crate) fn boom() -> Failure {
    Failure::test_failure("boom", None).with_traceback(Traceback::new([
        Frame::new("file.py", 42, "test_t1"),
        Frame::new("/work/dtester/test.py", 120, "assertEqual"),
    ]))
}

pub(crate) fn finished(total: usize, succeeded: usize) -> RunFinished {
    RunFinished {
        total,
        succeeded,
        ..RunFinished::default()
    }
}
