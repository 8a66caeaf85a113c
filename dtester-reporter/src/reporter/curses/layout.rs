// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fitting result lines into the terminal width.
//!
//! A result line looks like:
//!
//! ```text
//!  FAILED test_insert: inserts a row              1 != 2 tests/test_db.py:42
//! ```
//!
//! The status word and identity are always printed in full. The right-aligned tail (error
//! message and source location) claims its share of the width before the description does, so
//! that failure diagnostics are never dropped in favor of a longer description. All lengths are
//! counted in characters; escape sequences used for coloring don't count.

use super::super::{Outcome, helpers::Styles};
use crate::classify::Location;
use owo_colors::OwoColorize;
use std::borrow::Cow;
use swrite::{SWrite, swrite};

/// Files longer than this are shortened to their last [`FILE_TAIL`] characters.
const MAX_FILE_LEN: usize = 20;
const FILE_TAIL: usize = 17;

/// Text fields shorter than this aren't worth printing.
const MIN_FIELD_LEN: isize = 5;

/// The status shown at the start of a result line.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum LineStatus {
    /// The test is still running.
    Running,

    /// The test finished with this outcome.
    Finished(Outcome),
}

impl LineStatus {
    fn word(self) -> &'static str {
        match self {
            LineStatus::Running => "running",
            LineStatus::Finished(outcome) => outcome.as_str(),
        }
    }
}

/// Lays out result lines for a terminal of a given width.
#[derive(Clone, Debug)]
pub struct TextLayout {
    width: usize,
    status_width: usize,
    show_line_numbers: bool,
    styles: Styles,
}

impl TextLayout {
    /// Creates a layout producing lines of at most `width` characters, with the status word
    /// right-aligned in a field of `status_width` characters.
    pub fn new(width: usize, status_width: usize) -> Self {
        Self {
            width,
            status_width,
            show_line_numbers: true,
            styles: Styles::default(),
        }
    }

    /// Sets whether locations include line numbers.
    pub fn set_show_line_numbers(&mut self, show_line_numbers: bool) -> &mut Self {
        self.show_line_numbers = show_line_numbers;
        self
    }

    pub(in crate::reporter) fn set_styles(&mut self, styles: Styles) -> &mut Self {
        self.styles = styles;
        self
    }

    /// Returns the maximum width of a line.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Renders a result line.
    ///
    /// Only an identity longer than the whole width can make the line wider than
    /// [`width`](Self::width).
    pub fn render_line(
        &self,
        status: LineStatus,
        identity: &str,
        description: Option<&str>,
        errmsg: Option<&str>,
        location: Option<&Location>,
    ) -> String {
        let style = match status {
            LineStatus::Running => owo_colors::Style::new(),
            LineStatus::Finished(outcome) => self.styles.for_outcome(outcome),
        };
        let word = format!("{:>width$}", status.word(), width = self.status_width);
        let identity = one_line(identity);

        let mut left = String::new();
        swrite!(left, "{} {identity}: ", word.style(style));

        let fixed = self.status_width + 3 + identity.chars().count();
        let mut remaining = self.width as isize - fixed as isize;

        let mut right = String::new();
        if let Some(location) = location {
            let file = shorten_file(location.file.as_str());
            let mut tail = if self.show_line_numbers {
                format!("{file}:{}", location.line)
            } else {
                file
            };
            // One column goes to the separating space.
            let available = remaining - 1;
            if tail.chars().count() as isize > available {
                tail = if available > 2 {
                    format!("..{}", last_chars(&tail, available - 2))
                } else {
                    String::new()
                };
            }
            if !tail.is_empty() {
                swrite!(right, " {tail}");
                remaining -= right.chars().count() as isize;
            }
        }

        if let Some(errmsg) = errmsg {
            if remaining > MIN_FIELD_LEN {
                let errmsg = one_line(errmsg);
                let len = errmsg.chars().count() as isize;
                if len + 1 > remaining {
                    let truncated = take_chars(&errmsg, remaining - 4);
                    right = format!(" {truncated}..{right}");
                    remaining = 0;
                } else {
                    right = format!(" {errmsg}{right}");
                    remaining -= len + 1;
                }
            }
        }

        if let Some(description) = description {
            if remaining > MIN_FIELD_LEN {
                let description = one_line(description);
                let len = description.chars().count() as isize;
                if len > remaining {
                    left.push_str(take_chars(&description, remaining - 3));
                    left.push_str("..");
                    remaining = 0;
                } else {
                    left.push_str(&description);
                    remaining -= len;
                }
            }
        }

        for _ in 0..remaining.max(0) {
            left.push(' ');
        }
        left.push_str(&right);
        left
    }

    /// Renders a status line as `identity: description`, cut to fit on a single row.
    pub fn render_status(&self, identity: &str, description: &str) -> String {
        let text = one_line(&format!("{identity}: {description}")).into_owned();
        let width = self.width as isize;
        if text.chars().count() as isize <= width {
            text
        } else if width > 2 {
            format!("{}..", take_chars(&text, width - 2))
        } else {
            take_chars(&text, width).to_owned()
        }
    }
}

/// Splits a log message into lines of at most `width` characters, breaking at whitespace where
/// possible. Nothing is dropped: words longer than a line are split across lines.
pub fn wrap_words(message: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();

    for paragraph in message.split('\n') {
        let mut line = String::new();
        let mut line_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word = word;
            let mut word_len = word.chars().count();

            if line_len > 0 && line_len + 1 + word_len > width {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }

            while word_len > width {
                if line_len > 0 {
                    lines.push(std::mem::take(&mut line));
                    line_len = 0;
                }
                let head = take_chars(word, width as isize);
                lines.push(head.to_owned());
                word = &word[head.len()..];
                word_len -= width;
            }

            if word_len == 0 {
                continue;
            }
            if line_len > 0 {
                line.push(' ');
                line_len += 1;
            }
            line.push_str(word);
            line_len += word_len;
        }

        lines.push(line);
    }

    lines
}

fn shorten_file(file: &str) -> String {
    let len = file.chars().count();
    if len > MAX_FILE_LEN {
        let tail: String = file.chars().skip(len - FILE_TAIL).collect();
        format!("..{tail}")
    } else {
        file.to_owned()
    }
}

/// Replaces line breaks, which would make a line take up more than one row.
fn one_line(s: &str) -> Cow<'_, str> {
    if s.contains(['\n', '\r']) {
        Cow::Owned(s.replace("\r\n", " ").replace(['\n', '\r'], " "))
    } else {
        Cow::Borrowed(s)
    }
}

/// Returns the last `n` characters of `s`.
fn last_chars(s: &str, n: isize) -> &str {
    let len = s.chars().count() as isize;
    let skip = (len - n.max(0)).max(0) as usize;
    match s.char_indices().nth(skip) {
        Some((idx, _)) => &s[idx..],
        None => "",
    }
}

/// Returns the first `n` characters of `s`, or an empty string if `n` is negative.
fn take_chars(s: &str, n: isize) -> &str {
    if n <= 0 {
        return "";
    }
    match s.char_indices().nth(n as usize) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
