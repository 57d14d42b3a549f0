//! Frontend contract
//!
//! A frontend sits between the interpreter and the player. The session
//! drives it with interpreter messages, user input bytes and resizes;
//! everything it sends back goes through the [`Host`].

use serde_json::Value;

use crate::emitter::Host;
use crate::error::Result;

/// Whether the session keeps running
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Exit,
}

/// Shared interface of the dumb terminal and RemGlk transports
pub trait Frontend {
    /// Frontend name for logs
    fn name(&self) -> &str;

    /// Start the session; no generation check applies
    fn init(&mut self, host: &mut dyn Host) -> Result<()>;

    /// Handle one message from the interpreter
    fn update(&mut self, message: Value, host: &mut dyn Host) -> Result<Flow>;

    /// Handle bytes typed by the player
    fn input(&mut self, data: &[u8], host: &mut dyn Host) -> Result<Flow>;

    /// The terminal changed size
    fn resize(&mut self, host: &mut dyn Host) -> Result<()>;

    /// Release the terminal; safe to call more than once
    fn shutdown(&mut self) -> Result<()>;
}
