//! Configuration
//!
//! Command line surface and the settings the session runs with.

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::state::WindowPolicy;

/// Transport variant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Render to this terminal
    Dumb,
    /// Relay the protocol as JSON on stdin/stdout
    RemGlk,
}

/// Command line arguments
#[derive(Debug, Parser)]
#[command(name = "glkterm", version, about = "Play interactive fiction through a RemGlk interpreter in a plain terminal")]
pub struct Cli {
    /// Story file to run
    pub story: PathBuf,

    /// Speak the RemGlk JSON protocol on stdin/stdout instead of rendering
    #[arg(long)]
    pub rem: bool,

    /// RemGlk interpreter to run the story with
    #[arg(short, long, env = "GLKTERM_INTERPRETER", default_value = "glulxe")]
    pub interpreter: String,

    /// Extra interpreter argument, placed before the story path
    #[arg(long = "arg", value_name = "ARG", allow_hyphen_values = true)]
    pub interpreter_args: Vec<String>,

    /// Which window to show when the game opens several: first, last-buffer
    #[arg(long, default_value = "last-buffer")]
    pub window_policy: WindowPolicy,

    /// Show more log output (repeatable)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Show no log output
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Session settings
#[derive(Debug, Clone)]
pub struct Config {
    pub story: PathBuf,
    pub mode: Mode,
    pub interpreter: String,
    pub interpreter_args: Vec<String>,
    pub window_policy: WindowPolicy,
    pub verbosity: i8,
}

impl Config {
    pub fn new(story: impl Into<PathBuf>) -> Self {
        Self {
            story: story.into(),
            mode: Mode::Dumb,
            interpreter: "glulxe".to_string(),
            interpreter_args: Vec::new(),
            window_policy: WindowPolicy::default(),
            verbosity: 0,
        }
    }

    /// Default `env_logger` filter; `RUST_LOG` still wins
    pub fn log_filter(&self) -> &'static str {
        match self.verbosity {
            i8::MIN..=-1 => "off",
            0 => "error",
            1 => "warn",
            2 => "info",
            3 => "debug",
            _ => "trace",
        }
    }
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        Self {
            story: cli.story,
            mode: if cli.rem { Mode::RemGlk } else { Mode::Dumb },
            interpreter: cli.interpreter,
            interpreter_args: cli.interpreter_args,
            window_policy: cli.window_policy,
            verbosity: if cli.quiet { -1 } else { cli.verbose.min(i8::MAX as u8) as i8 },
        }
    }
}
