//! File Dialog
//!
//! Answers fileref prompts by asking for a file name on the terminal.
//! The answer arrives later as an ordinary finished line.

use log::debug;
use thiserror::Error;

use crate::protocol::FileRef;

/// Dialog failures; the prompt is answered with `null`
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DialogError {
    #[error("no file filter for usage {0:?}")]
    UnsupportedUsage(String),

    #[error("a file prompt is already open")]
    AlreadyOpen,
}

/// File selection collaborator
pub trait FileDialog {
    /// Start a prompt, returning the text to show
    fn open(&mut self, for_save: bool, usage: &str, game_id: Option<&str>) -> Result<String, DialogError>;

    /// Whether a prompt is waiting for its answer
    fn is_open(&self) -> bool;

    /// Resolve the open prompt; an empty answer cancels it
    fn answer(&mut self, line: &str) -> Option<FileRef>;
}

/// File extension for a Glk file usage
pub fn extension_for(usage: &str) -> Option<&'static str> {
    match usage {
        "save" => Some("glksave"),
        "data" => Some("glkdata"),
        "transcript" | "command" => Some("txt"),
        _ => None,
    }
}

struct Pending {
    usage: String,
    extension: &'static str,
}

/// Asks for a bare file name and adds the extension
#[derive(Default)]
pub struct PromptDialog {
    pending: Option<Pending>,
}

impl PromptDialog {
    pub const PROMPT: &'static str = "Please enter a file name (without an extension): ";

    pub fn new() -> Self {
        Self::default()
    }
}

impl FileDialog for PromptDialog {
    fn open(&mut self, for_save: bool, usage: &str, game_id: Option<&str>) -> Result<String, DialogError> {
        if self.pending.is_some() {
            return Err(DialogError::AlreadyOpen);
        }
        let extension = extension_for(usage).ok_or_else(|| DialogError::UnsupportedUsage(usage.to_string()))?;
        debug!(
            "Opening {} dialog for {} files (game {})",
            if for_save { "save" } else { "load" },
            usage,
            game_id.unwrap_or("-")
        );
        self.pending = Some(Pending { usage: usage.to_string(), extension });
        Ok(Self::PROMPT.to_string())
    }

    fn is_open(&self) -> bool {
        self.pending.is_some()
    }

    fn answer(&mut self, line: &str) -> Option<FileRef> {
        let pending = self.pending.take()?;
        let name = line.trim();
        if name.is_empty() {
            return None;
        }
        Some(FileRef {
            filename: format!("{}.{}", name, pending.extension),
            usage: Some(pending.usage),
        })
    }
}
