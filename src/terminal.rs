//! Terminal Control
//!
//! Raw mode for the input device and the metrics probe.

use std::io::{self, IsTerminal};

use crossterm::terminal::{disable_raw_mode, enable_raw_mode, size};
use log::{debug, warn};

use crate::protocol::Metrics;

pub fn stdin_is_tty() -> bool {
    io::stdin().is_terminal()
}

pub fn stdout_is_tty() -> bool {
    io::stdout().is_terminal()
}

/// Measure the terminal, or fall back to 80x25 when output is not one
pub fn measure(tty: bool) -> Metrics {
    if !tty {
        return Metrics::default();
    }
    match size() {
        Ok((cols, rows)) if cols > 0 && rows > 0 => Metrics::with_size(cols as u32, rows as u32),
        Ok(_) => Metrics::default(),
        Err(e) => {
            warn!("Could not measure terminal: {}", e);
            Metrics::default()
        }
    }
}

/// Keeps the input device in raw mode until released or dropped
pub struct RawMode {
    active: bool,
}

impl RawMode {
    /// Enter raw mode if stdin is a terminal
    pub fn enable() -> io::Result<Self> {
        let active = stdin_is_tty();
        if active {
            enable_raw_mode()?;
            debug!("Raw mode enabled");
        }
        Ok(Self { active })
    }

    /// A guard that never touches the terminal
    pub fn inactive() -> Self {
        Self { active: false }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Restore the terminal's previous mode
    pub fn release(&mut self) {
        if self.active {
            self.active = false;
            if let Err(e) = disable_raw_mode() {
                warn!("Could not leave raw mode: {}", e);
            } else {
                debug!("Raw mode released");
            }
        }
    }
}

impl Drop for RawMode {
    fn drop(&mut self) {
        self.release();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_measure_without_terminal() {
        let metrics = measure(false);
        assert_eq!((metrics.width, metrics.height), (80, 25));
    }

    #[test]
    fn test_inactive_guard() {
        let mut guard = RawMode::inactive();
        assert!(!guard.is_active());
        guard.release();
        assert!(!guard.is_active());
    }
}
