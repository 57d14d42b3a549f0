//! Session
//!
//! Runs a RemGlk interpreter as a child process and connects it to a
//! frontend. One task owns the frontend and handles, in arrival order,
//! interpreter output, bytes typed by the player and terminal resizes.
//! Responses travel to the interpreter's stdin through a writer task.

use std::process::Stdio;

use log::{debug, error, info, warn};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::Command;
use tokio::sync::mpsc;

use crate::config::{Config, Mode};
use crate::dialog::PromptDialog;
use crate::emitter::Host;
use crate::engine::UpdateEngine;
use crate::error::{GlkError, Result};
use crate::frontend::{Flow, Frontend};
use crate::protocol::{serialize_response, JsonFramer, Response};
use crate::remglk::RemGlkFrontend;
use crate::renderer::DumbRenderer;
use crate::terminal::RawMode;

/// Start the interpreter and run until the game or the player quits
pub async fn run(config: Config) -> Result<()> {
    info!(
        "Starting {} {:?} for {}",
        config.interpreter,
        config.interpreter_args,
        config.story.display()
    );

    let mut child = Command::new(&config.interpreter)
        .args(&config.interpreter_args)
        .arg(&config.story)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::inherit())
        .kill_on_drop(true)
        .spawn()?;

    let (Some(stdin), Some(stdout)) = (child.stdin.take(), child.stdout.take()) else {
        return Err(GlkError::NoInterface);
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_responses(stdin, rx));
    let mut host = tx;

    let result = match config.mode {
        Mode::Dumb => {
            let mut frontend = UpdateEngine::new(DumbRenderer::stdout(), PromptDialog::new(), config.window_policy)
                .with_raw_mode(RawMode::enable()?);
            run_frontend(&mut frontend, stdout, tokio::io::stdin(), &mut host).await
        }
        Mode::RemGlk => {
            let mut frontend = RemGlkFrontend::new(std::io::stdout());
            run_frontend(&mut frontend, stdout, tokio::io::stdin(), &mut host).await
        }
    };

    // Closing the channel ends the writer, which closes the interpreter's stdin
    drop(host);
    if let Err(e) = writer.await {
        warn!("Response writer failed: {}", e);
    }

    match child.try_wait()? {
        Some(status) => debug!("Interpreter exited with {}", status),
        None => {
            debug!("Stopping interpreter");
            child.start_kill()?;
            let status = child.wait().await?;
            debug!("Interpreter stopped with {}", status);
        }
    }

    result
}

/// Drive `frontend` until either stream closes or the game exits
pub async fn run_frontend<F, U, I>(frontend: &mut F, mut updates: U, mut input: I, host: &mut dyn Host) -> Result<()>
where
    F: Frontend + ?Sized,
    U: AsyncRead + Unpin,
    I: AsyncRead + Unpin,
{
    info!("Running {} frontend", frontend.name());
    let result = pump(frontend, &mut updates, &mut input, host).await;
    // Restore the terminal even when the session failed
    let closed = frontend.shutdown();
    result.and(closed)
}

async fn pump<F, U, I>(frontend: &mut F, updates: &mut U, input: &mut I, host: &mut dyn Host) -> Result<()>
where
    F: Frontend + ?Sized,
    U: AsyncRead + Unpin,
    I: AsyncRead + Unpin,
{
    frontend.init(host)?;

    let mut framer = JsonFramer::new();
    let mut update_buf = vec![0u8; 8192];
    let mut input_buf = vec![0u8; 1024];
    let mut resizes = ResizeSignal::new();

    loop {
        let flow = tokio::select! {
            biased;

            // Interpreter output
            read = updates.read(&mut update_buf) => {
                let n = read?;
                if n == 0 {
                    info!("Interpreter closed its output");
                    Flow::Exit
                } else {
                    let mut flow = Flow::Continue;
                    for message in framer.push(&update_buf[..n]) {
                        flow = frontend.update(message?, host)?;
                        if flow == Flow::Exit {
                            break;
                        }
                    }
                    flow
                }
            }

            // Player input
            read = input.read(&mut input_buf) => {
                let n = read?;
                if n == 0 {
                    info!("Input closed");
                    Flow::Exit
                } else {
                    frontend.input(&input_buf[..n], host)?
                }
            }

            () = resizes.recv() => {
                frontend.resize(host)?;
                Flow::Continue
            }
        };

        if flow == Flow::Exit {
            break;
        }
    }

    if framer.pending() > 0 {
        debug!("Discarding {} bytes of unfinished interpreter output", framer.pending());
    }
    Ok(())
}

/// Write each response as one JSON line on the interpreter's stdin
async fn write_responses<W: AsyncWrite + Unpin>(mut stdin: W, mut rx: mpsc::UnboundedReceiver<Response>) {
    while let Some(response) = rx.recv().await {
        let json = serialize_response(&response);
        debug!("Response: {}", json);
        if let Err(e) = stdin.write_all(format!("{}\n", json).as_bytes()).await {
            error!("Failed to send response to interpreter: {}", e);
            break;
        }
        if let Err(e) = stdin.flush().await {
            error!("Failed to flush response to interpreter: {}", e);
            break;
        }
    }
}

/// Terminal resize notifications (SIGWINCH); never fires elsewhere
struct ResizeSignal {
    #[cfg(unix)]
    signal: Option<tokio::signal::unix::Signal>,
}

impl ResizeSignal {
    #[cfg(unix)]
    fn new() -> Self {
        use tokio::signal::unix::{signal, SignalKind};
        let signal = match signal(SignalKind::window_change()) {
            Ok(signal) => Some(signal),
            Err(e) => {
                warn!("Resize notifications unavailable: {}", e);
                None
            }
        };
        Self { signal }
    }

    #[cfg(not(unix))]
    fn new() -> Self {
        Self {}
    }

    #[cfg(unix)]
    async fn recv(&mut self) {
        if let Some(signal) = self.signal.as_mut() {
            if signal.recv().await.is_some() {
                return;
            }
            self.signal = None;
        }
        std::future::pending::<()>().await
    }

    #[cfg(not(unix))]
    async fn recv(&mut self) {
        std::future::pending::<()>().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emitter::ResponseEmitter;
    use crate::protocol::{ResponseKind, ResponseValue, WindowId};
    use crate::state::WindowPolicy;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::duplex;

    /// Accepts writes but never manages to flush them
    #[derive(Default)]
    struct StuckPipe {
        written: Vec<u8>,
    }

    impl AsyncWrite for StuckPipe {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
            self.written.extend_from_slice(buf);
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "interpreter gone")))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    fn engine() -> UpdateEngine<DumbRenderer<Vec<u8>>> {
        UpdateEngine::new(DumbRenderer::new(Vec::new(), false), PromptDialog::new(), WindowPolicy::LastBuffer)
    }

    #[tokio::test]
    async fn test_session_ends_on_exit_update() {
        let mut frontend = engine();
        let mut host: Vec<Response> = Vec::new();
        let updates: &[u8] = b"{\"type\":\"update\",\"gen\":1,\"windows\":[{\"id\":1,\"type\":\"buffer\"}],\
            \"content\":[{\"id\":1,\"text\":[{\"content\":[\"Goodbye\"]}]}]}\n\n{\"type\":\"exit\"}\n\n";
        let (_keyboard, input) = duplex(64);

        run_frontend(&mut frontend, updates, input, &mut host).await.unwrap();

        assert_eq!(host.len(), 1);
        assert_eq!(host[0].kind, ResponseKind::Init);
        let output = String::from_utf8(frontend.renderer().get_ref().clone()).unwrap();
        assert_eq!(output, "\nGoodbye\n");
    }

    #[tokio::test]
    async fn test_session_ends_when_interpreter_closes() {
        let mut frontend = engine();
        let mut host: Vec<Response> = Vec::new();
        let (_keyboard, input) = duplex(64);

        run_frontend(&mut frontend, tokio::io::empty(), input, &mut host).await.unwrap();
        assert_eq!(host.len(), 1);
    }

    #[tokio::test]
    async fn test_session_reports_interpreter_error() {
        let mut frontend = engine();
        let mut host: Vec<Response> = Vec::new();
        let updates: &[u8] = br#"{"type":"error","message":"Could not load story"}"#;
        let (_keyboard, input) = duplex(64);

        let err = run_frontend(&mut frontend, updates, input, &mut host).await.unwrap_err();
        assert!(matches!(err, GlkError::Host(ref m) if m == "Could not load story"));
    }

    #[tokio::test]
    async fn test_session_routes_typed_line() {
        let mut frontend = engine();
        let mut host: Vec<Response> = Vec::new();
        let (mut game, updates) = duplex(1024);
        let (mut keyboard, input) = duplex(64);

        let script = tokio::spawn(async move {
            game.write_all(br#"{"type":"update","gen":1,"windows":[{"id":1,"type":"buffer"}],"input":[{"type":"line","id":1}]}"#)
                .await
                .unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            keyboard.write_all(b"look\r").await.unwrap();
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            game.write_all(br#"{"type":"exit"}"#).await.unwrap();
            (game, keyboard)
        });

        run_frontend(&mut frontend, updates, input, &mut host).await.unwrap();
        let _ = script.await.unwrap();

        assert_eq!(host.len(), 2);
        assert_eq!(host[1].kind, ResponseKind::Line);
        assert_eq!(host[1].value, Some(ResponseValue::Text("look".to_string())));
    }

    #[tokio::test]
    async fn test_writer_stops_when_flush_fails() {
        let (tx, rx) = mpsc::unbounded_channel();
        tx.send(ResponseEmitter::line(1, WindowId::Num(1), "look".to_string())).unwrap();
        tx.send(ResponseEmitter::line(2, WindowId::Num(1), "north".to_string())).unwrap();

        let mut pipe = StuckPipe::default();
        tokio::time::timeout(Duration::from_secs(1), write_responses(&mut pipe, rx))
            .await
            .expect("writer should give up after the failed flush");

        let written = String::from_utf8(pipe.written).unwrap();
        assert_eq!(written.lines().count(), 1);
        assert!(written.contains("\"look\""));
        assert!(tx.send(ResponseEmitter::line(3, WindowId::Num(1), "south".to_string())).is_err());
    }
}
