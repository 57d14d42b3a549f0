//! Input Router
//!
//! Arms at most one input channel at a time. The armed channel lives in a
//! single `Option`, so a character channel and a line channel can never be
//! armed together and one key press can never be answered twice.

use crate::input::Key;
use crate::protocol::WindowId;
use crate::state::InputMode;

/// An armed capture channel and the window it answers for
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Channel {
    Char(WindowId),
    Line(WindowId),
}

/// Input captured from an armed channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Captured {
    pub window: WindowId,
    pub value: String,
}

/// Arms and disarms the character and line channels
#[derive(Debug, Default)]
pub struct InputRouter {
    armed: Option<Channel>,
}

impl InputRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Arm the channel matching `mode`, replacing whatever was armed
    pub fn arm(&mut self, mode: &InputMode) {
        self.armed = match mode {
            InputMode::None => None,
            InputMode::Char(id) => Some(Channel::Char(id.clone())),
            InputMode::Line(id) => Some(Channel::Line(id.clone())),
        };
    }

    pub fn disarm(&mut self) {
        self.armed = None;
    }

    pub fn armed(&self) -> Option<&Channel> {
        self.armed.as_ref()
    }

    pub fn char_armed(&self) -> bool {
        matches!(self.armed, Some(Channel::Char(_)))
    }

    pub fn line_armed(&self) -> bool {
        matches!(self.armed, Some(Channel::Line(_)))
    }

    /// Capture a key press if the character channel is armed.
    /// Keys without a Glk name are left for the line editor.
    pub fn capture_key(&mut self, key: Key) -> Option<Captured> {
        if !self.char_armed() {
            return None;
        }
        let value = key_name(key)?;
        match self.armed.take() {
            Some(Channel::Char(window)) => Some(Captured { window, value }),
            _ => None,
        }
    }

    /// Capture a finished line if the line channel is armed
    pub fn capture_line(&mut self, line: String) -> Option<Captured> {
        if !self.line_armed() {
            return None;
        }
        match self.armed.take() {
            Some(Channel::Line(window)) => Some(Captured { window, value: line }),
            _ => None,
        }
    }
}

/// Glk name for a key press
pub fn key_name(key: Key) -> Option<String> {
    let name = match key {
        Key::Char('\x7f') | Key::Backspace | Key::Delete => "delete",
        Key::Char('\t') | Key::Tab => "tab",
        Key::Enter => "return",
        Key::Escape => "escape",
        Key::Left => "left",
        Key::Right => "right",
        Key::Up => "up",
        Key::Down => "down",
        Key::Home => "home",
        Key::End => "end",
        Key::PageUp => "pageup",
        Key::PageDown => "pagedown",
        Key::F(n) => return Some(format!("func{}", n)),
        Key::Char(c) => return Some(c.to_string()),
        Key::Insert | Key::Interrupt => return None,
    };
    Some(name.to_string())
}
