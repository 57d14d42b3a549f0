//! glkterm binary
//!
//! Run with: cargo run -- [options] <story>
//!
//! Options:
//!   -i, --interpreter <cmd>   RemGlk interpreter (default: glulxe)
//!   --arg <arg>               Extra interpreter argument (repeatable)
//!   --rem                     Relay RemGlk JSON on stdin/stdout
//!   --window-policy <policy>  first | last-buffer
//!   -v / -q                   More or less log output

use clap::Parser;
use log::info;

use glkterm::{session, Cli, Config};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from(Cli::parse());

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(config.log_filter())).init();

    info!("glkterm v{}", env!("CARGO_PKG_VERSION"));

    // Single-threaded: updates and input are handled one at a time
    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build()?;
    let result = runtime.block_on(session::run(config));
    // Don't wait on the blocking stdin reader
    runtime.shutdown_background();

    if let Err(e) = result {
        eprintln!("glkterm: {}", e);
        std::process::exit(1);
    }
    Ok(())
}
