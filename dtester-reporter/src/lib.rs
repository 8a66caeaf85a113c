// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Result reporting for the dtester distributed test harness.
//!
//! The test engine drives a [`Reporter`](reporter::Reporter) with lifecycle events as tests and
//! suites run. The reporter classifies failures into a canonical form (see [`classify`]), keeps
//! count of outcomes, and renders the run as plain text, as TAP, or as a live terminal view.
//!
//! ```no_run
//! use dtester_reporter::{config::ReporterConfig, output::Color, reporter::ReporterBuilder};
//!
//! Color::Auto.init();
//! let config = ReporterConfig::from_sources(".", None).expect("config is valid");
//! let reporter = ReporterBuilder::default().build_stdio(&config);
//! ```

pub mod classify;
pub mod config;
pub mod errors;
pub mod output;
pub mod reporter;
mod stopwatch;
