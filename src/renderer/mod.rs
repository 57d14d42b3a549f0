//! Renderer Module
//!
//! Renderers turn window content into terminal output.

pub mod dumb;

pub use dumb::DumbRenderer;

use std::io;

use crate::protocol::{ContentUpdate, Metrics};
use crate::state::WindowDescriptor;

/// Trait for renderers
pub trait Renderer {
    /// Renderer name
    fn name(&self) -> &str;

    /// Whether output goes to a real terminal
    fn is_tty(&self) -> bool;

    /// Current display size
    fn metrics(&self) -> Metrics;

    /// Append content for the active window
    fn write_content(&mut self, window: &WindowDescriptor, content: &ContentUpdate) -> io::Result<()>;

    /// Line input is starting at the current position
    fn begin_line_input(&mut self) -> io::Result<()>;

    /// A line was entered; remove the typed text
    fn end_line_input(&mut self) -> io::Result<()>;

    /// Stop or resume echoing typed text
    fn set_muted(&mut self, muted: bool);

    /// Echo typed text unless muted
    fn echo(&mut self, text: &str) -> io::Result<()>;

    /// Show a dialog prompt on a fresh line
    fn prompt(&mut self, text: &str) -> io::Result<()>;

    /// Final newline and flush
    fn shutdown(&mut self) -> io::Result<()>;
}
