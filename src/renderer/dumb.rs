//! Dumb Terminal Renderer
//!
//! Renders the active window as a plain scroll of text.
//! - Buffer windows: paragraphs become lines, appends continue the line
//! - Grid windows: each row becomes a line (no cursor addressing)
//! - Styles are dropped

use std::io::{self, Write};

use crate::protocol::{ContentRun, ContentUpdate, Metrics, WindowKind};
use crate::state::WindowDescriptor;
use crate::terminal;
use super::Renderer;

/// ANSI escape sequences
const CSI: &str = "\x1b[";
const SAVE_CURSOR: &str = "\x1b7";
const RESTORE_CURSOR: &str = "\x1b8";

/// Plain text renderer
pub struct DumbRenderer<W: Write> {
    out: W,
    /// Output is a terminal, so cursor control is available
    tty: bool,
    /// Typed text is not echoed while muted
    muted: bool,
}

impl DumbRenderer<io::Stdout> {
    /// Render to stdout, detecting whether it is a terminal
    pub fn stdout() -> Self {
        Self::new(io::stdout(), terminal::stdout_is_tty())
    }
}

impl<W: Write> DumbRenderer<W> {
    pub fn new(out: W, tty: bool) -> Self {
        Self {
            out,
            tty,
            muted: false,
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }

    pub fn is_muted(&self) -> bool {
        self.muted
    }

    /// Start a new line; raw mode turns off output processing, so a tty
    /// needs the carriage return spelled out
    fn newline(&mut self) -> io::Result<()> {
        let eol: &[u8] = if self.tty { b"\r\n" } else { b"\n" };
        self.out.write_all(eol)
    }

    fn write_runs(&mut self, runs: &[ContentRun]) -> io::Result<()> {
        for run in runs {
            self.out.write_all(run.text().as_bytes())?;
        }
        Ok(())
    }
}

impl<W: Write> Renderer for DumbRenderer<W> {
    fn name(&self) -> &str {
        "dumb"
    }

    fn is_tty(&self) -> bool {
        self.tty
    }

    fn metrics(&self) -> Metrics {
        terminal::measure(self.tty)
    }

    fn write_content(&mut self, window: &WindowDescriptor, content: &ContentUpdate) -> io::Result<()> {
        match window.kind {
            WindowKind::Grid => {
                for line in &content.lines {
                    self.newline()?;
                    self.write_runs(&line.content)?;
                }
            }
            _ => {
                for line in &content.text {
                    if !line.append {
                        self.newline()?;
                    }
                    self.write_runs(&line.content)?;
                }
            }
        }
        self.out.flush()
    }

    fn begin_line_input(&mut self) -> io::Result<()> {
        if self.tty {
            self.out.write_all(SAVE_CURSOR.as_bytes())?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn end_line_input(&mut self) -> io::Result<()> {
        if self.tty {
            // Back to where input started and erase what was typed
            write!(self.out, "{}{}J", RESTORE_CURSOR, CSI)?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn echo(&mut self, text: &str) -> io::Result<()> {
        if self.tty && !self.muted {
            self.out.write_all(text.as_bytes())?;
            self.out.flush()?;
        }
        Ok(())
    }

    fn prompt(&mut self, text: &str) -> io::Result<()> {
        self.newline()?;
        self.out.write_all(text.as_bytes())?;
        self.out.flush()
    }

    fn shutdown(&mut self) -> io::Result<()> {
        self.newline()?;
        self.out.flush()
    }
}
