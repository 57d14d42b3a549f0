//! glkterm - GlkOte frontends for plain terminals
//!
//! Plays interactive fiction through any interpreter that speaks the RemGlk
//! JSON protocol.
//!
//! # Overview
//!
//! glkterm provides:
//! - An update engine that applies display updates in generation order
//! - An input router that arms either character or line input, never both
//! - A dumb terminal renderer for the active window
//! - A RemGlk passthrough for driving the protocol from another program
//! - A session loop that runs the interpreter as a child process
//!
//! # Example
//!
//! ```no_run
//! use glkterm::{Frontend, PromptDialog, Response, UpdateEngine, WindowPolicy};
//! use glkterm::protocol::parse_update;
//! use glkterm::renderer::DumbRenderer;
//!
//! let mut engine = UpdateEngine::new(DumbRenderer::stdout(), PromptDialog::new(), WindowPolicy::LastBuffer);
//! let mut responses: Vec<Response> = Vec::new();
//! engine.init(&mut responses).unwrap();
//!
//! let update = parse_update(r#"{"type":"update","gen":1,"windows":[{"id":1,"type":"buffer"}],
//!     "content":[{"id":1,"text":[{"content":["Hello"]}]}],"input":[{"type":"line","id":1}]}"#).unwrap();
//! engine.process(update, &mut responses).unwrap();
//! ```

pub mod config;
pub mod dialog;
pub mod emitter;
pub mod engine;
pub mod error;
pub mod frontend;
pub mod input;
pub mod protocol;
pub mod remglk;
pub mod renderer;
pub mod router;
pub mod session;
pub mod state;
pub mod terminal;

// Re-export commonly used types
pub use config::{Cli, Config, Mode};
pub use dialog::{FileDialog, PromptDialog};
pub use emitter::{Host, ResponseEmitter};
pub use engine::UpdateEngine;
pub use error::{GlkError, Result};
pub use frontend::{Flow, Frontend};
pub use input::{InputParser, Key, LineEditor};
pub use protocol::{Metrics, Response, ResponseKind, ResponseValue, Update, WindowId};
pub use remglk::RemGlkFrontend;
pub use renderer::{DumbRenderer, Renderer};
pub use router::InputRouter;
pub use state::{DisplayState, InputMode, WindowPolicy};
