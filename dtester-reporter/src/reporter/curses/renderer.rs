// Copyright (c) The dtester Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Differential rendering of a growing set of terminal lines.
//!
//! The screen below the point where the run started is split into two groups of lines:
//!
//! * result lines, which are permanent and only ever replaced in place;
//! * status lines, which are transient and always sit below the result lines.
//!
//! The cursor rests on the row just below the last status line between calls. Every operation
//! moves relative to that row, so the renderer works in an ordinary terminal without taking over
//! the screen, and output already scrolled off the top is never touched.

use crate::errors::{RenderError, ReportError};
use crossterm::{
    Command,
    cursor::MoveUp,
    terminal::{self, Clear, ClearType},
};
use std::{collections::HashMap, io::Write};
use tracing::debug;

/// Fallback width when the output isn't a terminal.
const DEFAULT_COLUMNS: usize = 80;

/// Cursor-movement strings used by a [`LineRenderer`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TermCaps {
    cursor_up: String,
    cursor_bol: String,
    cursor_down: String,
    clear_eol: String,
    columns: usize,
}

impl TermCaps {
    /// Creates capabilities from explicit strings. `cursor_up` and `cursor_down` move by exactly
    /// one row.
    pub fn new(
        cursor_up: impl Into<String>,
        cursor_bol: impl Into<String>,
        cursor_down: impl Into<String>,
        clear_eol: impl Into<String>,
        columns: usize,
    ) -> Self {
        Self {
            cursor_up: cursor_up.into(),
            cursor_bol: cursor_bol.into(),
            cursor_down: cursor_down.into(),
            clear_eol: clear_eol.into(),
            columns,
        }
    }

    /// ANSI capabilities for a terminal with the given number of columns.
    ///
    /// Moving down is done with a newline rather than a cursor-down sequence, so that adding a
    /// line at the bottom of the screen scrolls instead of overwriting the last row.
    pub fn ansi(columns: usize) -> Self {
        Self::new(
            ansi_string(MoveUp(1)),
            "\r",
            "\n",
            ansi_string(Clear(ClearType::UntilNewLine)),
            columns,
        )
    }

    /// ANSI capabilities for the terminal attached to the process, if any.
    pub fn detect() -> Self {
        let columns = match terminal::size() {
            Ok((columns, _)) if columns > 0 => usize::from(columns),
            Ok(_) => DEFAULT_COLUMNS,
            Err(error) => {
                debug!("unable to query terminal size, assuming {DEFAULT_COLUMNS} columns: {error}");
                DEFAULT_COLUMNS
            }
        };
        Self::ansi(columns)
    }

    /// Returns the width of the terminal.
    pub fn columns(&self) -> usize {
        self.columns
    }
}

fn ansi_string(command: impl Command) -> String {
    let mut out = String::new();
    command
        .write_ansi(&mut out)
        .expect("writing to a String is infallible");
    out
}

/// Keeps result and status lines on screen up to date with minimal cursor movement.
#[derive(Debug)]
pub struct LineRenderer<W> {
    caps: TermCaps,
    writer: W,
    lines: HashMap<String, String>,
    result_lines: Vec<String>,
    status_lines: Vec<String>,
}

impl<W: Write> LineRenderer<W> {
    /// Creates a renderer writing to `writer`, with the cursor at the start of an empty line.
    pub fn new(caps: TermCaps, writer: W) -> Self {
        Self {
            caps,
            writer,
            lines: HashMap::new(),
            result_lines: Vec::new(),
            status_lines: Vec::new(),
        }
    }

    /// Returns the capabilities this renderer was created with.
    pub fn caps(&self) -> &TermCaps {
        &self.caps
    }

    /// Appends a result line above the status lines.
    pub fn add_result(&mut self, id: &str, text: &str) -> Result<(), ReportError> {
        self.check_new(id)?;
        self.result_lines.push(id.to_owned());
        self.lines.insert(id.to_owned(), text.to_owned());

        let mut buf = String::new();
        self.push_up(&mut buf, self.status_lines.len());
        self.push_line(&mut buf, text);
        // The new line took the row of the first status line: move the whole group down.
        for status in &self.status_lines {
            self.push_line(&mut buf, &self.lines[status]);
        }
        self.emit(&buf)
    }

    /// Replaces the text of a result line, or appends it if it doesn't exist yet.
    pub fn update_result(&mut self, id: &str, text: &str) -> Result<(), ReportError> {
        let Some(index) = self.result_lines.iter().position(|line| line == id) else {
            debug!(id, "updating unknown result line, adding it instead");
            return self.add_result(id, text);
        };
        self.lines.insert(id.to_owned(), text.to_owned());

        let offset = self.status_lines.len() + self.result_lines.len() - index;
        let mut buf = String::new();
        self.push_up(&mut buf, offset);
        buf.push_str(&self.caps.cursor_bol);
        buf.push_str(text);
        buf.push_str(&self.caps.clear_eol);
        for _ in 0..offset {
            buf.push_str(&self.caps.cursor_down);
        }
        self.emit(&buf)
    }

    /// Appends a status line at the bottom.
    pub fn add_status(&mut self, id: &str, text: &str) -> Result<(), ReportError> {
        self.check_new(id)?;
        self.status_lines.push(id.to_owned());
        self.lines.insert(id.to_owned(), text.to_owned());

        let mut buf = String::new();
        self.push_line(&mut buf, text);
        self.emit(&buf)
    }

    /// Removes a status line, moving the status lines below it up by one row.
    ///
    /// Returns an error if no status line with this id exists.
    pub fn drop_status(&mut self, id: &str) -> Result<(), ReportError> {
        let index = self
            .status_lines
            .iter()
            .position(|line| line == id)
            .ok_or_else(|| RenderError::UnknownStatusLine { id: id.to_owned() })?;

        let offset = self.status_lines.len() - index;
        let mut buf = String::new();
        self.push_up(&mut buf, offset);
        buf.push_str(&self.caps.cursor_bol);
        buf.push_str(&self.caps.clear_eol);

        self.status_lines.remove(index);
        self.lines.remove(id);

        if index < self.status_lines.len() {
            for status in &self.status_lines[index..] {
                self.push_line(&mut buf, &self.lines[status]);
            }
            // The old last row still shows the line that moved up.
            buf.push_str(&self.caps.cursor_bol);
            buf.push_str(&self.caps.clear_eol);
        }
        self.emit(&buf)
    }

    /// Removes every status line, bottom first. Returns the ids that were removed.
    pub fn drop_all_status(&mut self) -> Result<Vec<String>, ReportError> {
        let mut dropped = Vec::with_capacity(self.status_lines.len());
        while let Some(id) = self.status_lines.last().cloned() {
            self.drop_status(&id)?;
            dropped.push(id);
        }
        Ok(dropped)
    }

    /// Returns true if a status line with this id is on screen.
    pub fn has_status(&self, id: &str) -> bool {
        self.status_lines.iter().any(|line| line == id)
    }

    /// Returns the ids of the status lines, top to bottom.
    pub fn status_ids(&self) -> &[String] {
        &self.status_lines
    }

    /// Returns the ids of the result lines, top to bottom.
    pub fn result_ids(&self) -> &[String] {
        &self.result_lines
    }

    /// Returns the current text of a line in either group.
    pub fn text(&self, id: &str) -> Option<&str> {
        self.lines.get(id).map(String::as_str)
    }

    /// Returns the underlying writer, for output below the managed lines.
    pub fn writer_mut(&mut self) -> &mut W {
        &mut self.writer
    }

    /// Consumes the renderer, returning the underlying writer.
    pub fn into_writer(self) -> W {
        self.writer
    }

    fn check_new(&self, id: &str) -> Result<(), RenderError> {
        if self.lines.contains_key(id) {
            Err(RenderError::DuplicateLine { id: id.to_owned() })
        } else {
            Ok(())
        }
    }

    fn push_up(&self, buf: &mut String, rows: usize) {
        for _ in 0..rows {
            buf.push_str(&self.caps.cursor_up);
        }
    }

    fn push_line(&self, buf: &mut String, text: &str) {
        buf.push_str(&self.caps.cursor_bol);
        buf.push_str(text);
        buf.push_str(&self.caps.clear_eol);
        buf.push_str(&self.caps.cursor_down);
    }

    fn emit(&mut self, buf: &str) -> Result<(), ReportError> {
        self.writer.write_all(buf.as_bytes())?;
        self.writer.flush()?;
        Ok(())
    }
}
