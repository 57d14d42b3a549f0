//! Display State
//!
//! Generation counter, active window, input mode and the disabled flag.
//! Only the update engine mutates this.

use std::str::FromStr;

use crate::protocol::{InputKind, InputRequest, WindowId, WindowKind, WindowSpec};

/// The one window this frontend renders
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowDescriptor {
    pub id: WindowId,
    pub kind: WindowKind,
}

impl From<&WindowSpec> for WindowDescriptor {
    fn from(spec: &WindowSpec) -> Self {
        Self {
            id: spec.id.clone(),
            kind: spec.kind,
        }
    }
}

/// How to pick the active window out of a multi-window layout
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WindowPolicy {
    /// First window in the list, whatever its type
    First,
    /// Last buffer window, else the first window
    #[default]
    LastBuffer,
}

impl WindowPolicy {
    pub fn select(self, windows: &[WindowSpec]) -> Option<WindowDescriptor> {
        let chosen = match self {
            WindowPolicy::First => windows.first(),
            WindowPolicy::LastBuffer => windows
                .iter()
                .rev()
                .find(|w| w.kind == WindowKind::Buffer)
                .or_else(|| windows.first()),
        };
        chosen.map(WindowDescriptor::from)
    }
}

impl FromStr for WindowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "first" => Ok(WindowPolicy::First),
            "last-buffer" | "lastbuffer" | "buffer" => Ok(WindowPolicy::LastBuffer),
            other => Err(format!("unknown window policy: {}", other)),
        }
    }
}

/// Requested input mode, with the window that asked for it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum InputMode {
    #[default]
    None,
    Char(WindowId),
    Line(WindowId),
}

impl InputMode {
    pub fn window(&self) -> Option<&WindowId> {
        match self {
            InputMode::None => None,
            InputMode::Char(id) | InputMode::Line(id) => Some(id),
        }
    }
}

impl From<&InputRequest> for InputMode {
    fn from(request: &InputRequest) -> Self {
        match request.kind {
            InputKind::Char => InputMode::Char(request.id.clone()),
            InputKind::Line => InputMode::Line(request.id.clone()),
        }
    }
}

/// Outcome of checking an incoming generation number
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GenCheck {
    Accepted,
    Repeated,
    OutOfOrder,
}

/// Display state
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplayState {
    generation: u64,
    /// Active window, replaced wholesale by each windows section
    pub window: Option<WindowDescriptor>,
    pub input: InputMode,
    pub disabled: bool,
}

impl DisplayState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Advance to `gen` if it is newer; never rewinds
    pub fn advance(&mut self, gen: u64) -> GenCheck {
        if gen == self.generation {
            GenCheck::Repeated
        } else if gen < self.generation {
            GenCheck::OutOfOrder
        } else {
            self.generation = gen;
            GenCheck::Accepted
        }
    }
}
