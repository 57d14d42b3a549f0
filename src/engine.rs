//! Update Engine
//!
//! The dumb terminal frontend. Applies interpreter updates in generation
//! order, renders the active window, and routes key presses to whichever
//! input channel is armed.
//!
//! An accepted update is applied in a fixed order:
//! 1. re-enable input if the previous update disabled it
//! 2. an empty input list cancels input
//! 3. windows replace the active window
//! 4. content is rendered
//! 5. input requests arm a channel
//! 6. `disabled` or a special input request disarms everything

use log::{debug, info, warn};
use serde_json::Value;

use crate::dialog::{FileDialog, PromptDialog};
use crate::emitter::{Host, ResponseEmitter};
use crate::error::{GlkError, Result};
use crate::frontend::{Flow, Frontend};
use crate::input::{Edit, InputParser, Key, LineEditor};
use crate::protocol::{ContentUpdate, InputRequest, Metrics, SpecialInput, StateUpdate, Update};
use crate::renderer::Renderer;
use crate::router::InputRouter;
use crate::state::{DisplayState, GenCheck, InputMode, WindowPolicy};
use crate::terminal::RawMode;

/// Dumb terminal implementation of the display protocol
pub struct UpdateEngine<R: Renderer, D: FileDialog = PromptDialog> {
    state: DisplayState,
    router: InputRouter,
    emitter: ResponseEmitter,
    renderer: R,
    dialog: D,
    parser: InputParser,
    editor: LineEditor,
    policy: WindowPolicy,
    raw_mode: RawMode,
    /// Last metrics sent to the interpreter
    metrics: Option<Metrics>,
    closed: bool,
}

impl<R: Renderer, D: FileDialog> UpdateEngine<R, D> {
    pub fn new(renderer: R, dialog: D, policy: WindowPolicy) -> Self {
        Self {
            state: DisplayState::new(),
            router: InputRouter::new(),
            emitter: ResponseEmitter::new(),
            renderer,
            dialog,
            parser: InputParser::new(),
            editor: LineEditor::new(),
            policy,
            raw_mode: RawMode::inactive(),
            metrics: None,
            closed: false,
        }
    }

    /// Hand over the input device; released on exit
    pub fn with_raw_mode(mut self, raw_mode: RawMode) -> Self {
        self.raw_mode = raw_mode;
        self
    }

    pub fn state(&self) -> &DisplayState {
        &self.state
    }

    pub fn router(&self) -> &InputRouter {
        &self.router
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    /// Apply one interpreter message
    pub fn process(&mut self, update: Update, host: &mut dyn Host) -> Result<Flow> {
        match update {
            Update::Error { message } => Err(GlkError::Host(message)),
            Update::Pass => Ok(Flow::Continue),
            Update::Exit => {
                self.shutdown()?;
                Ok(Flow::Exit)
            }
            Update::Unknown(kind) => {
                warn!("Ignoring unknown message type: {}", kind);
                Ok(Flow::Continue)
            }
            Update::State(update) => {
                self.apply(update)?;
                // Responses raised while applying go out only now
                self.emitter.flush(host);
                Ok(Flow::Continue)
            }
        }
    }

    fn apply(&mut self, update: StateUpdate) -> Result<()> {
        match self.state.advance(update.gen) {
            GenCheck::Accepted => {}
            GenCheck::Repeated => {
                debug!("Ignoring repeated generation number: {}", update.gen);
                return Ok(());
            }
            GenCheck::OutOfOrder => {
                debug!(
                    "Ignoring out-of-order generation number: got {}, currently at {}",
                    update.gen,
                    self.state.generation()
                );
                return Ok(());
            }
        }

        if self.state.disabled {
            self.set_disabled(false)?;
        }

        if update.input.as_ref().is_some_and(Vec::is_empty) {
            self.cancel_input();
        }
        if let Some(windows) = &update.windows {
            self.state.window = self.policy.select(windows);
            debug!("Active window: {:?}", self.state.window);
        }
        if let Some(content) = &update.content {
            self.update_content(content)?;
        }
        if let Some(requests) = update.input.as_deref().filter(|r| !r.is_empty()) {
            self.request_input(requests)?;
        }

        if update.disabled || update.specialinput.is_some() {
            self.set_disabled(true)?;
        }
        if let Some(special) = &update.specialinput {
            self.accept_specialinput(special)?;
        }
        Ok(())
    }

    /// Stop or restart input capture without forgetting the input mode
    pub fn set_disabled(&mut self, disabled: bool) -> Result<()> {
        self.state.disabled = disabled;
        if disabled {
            self.disarm();
            Ok(())
        } else {
            self.arm()
        }
    }

    fn arm(&mut self) -> Result<()> {
        self.router.arm(&self.state.input);
        match self.state.input {
            InputMode::Char(_) => self.renderer.set_muted(true),
            InputMode::Line(_) => {
                self.renderer.set_muted(false);
                self.renderer.begin_line_input()?;
            }
            InputMode::None => self.renderer.set_muted(false),
        }
        Ok(())
    }

    fn disarm(&mut self) {
        self.router.disarm();
        self.renderer.set_muted(false);
    }

    fn cancel_input(&mut self) {
        self.state.input = InputMode::None;
        self.disarm();
    }

    fn update_content(&mut self, content: &[ContentUpdate]) -> Result<()> {
        let Some(window) = &self.state.window else {
            debug!("Content with no active window");
            return Ok(());
        };
        for update in content.iter().filter(|c| c.id == window.id) {
            self.renderer.write_content(window, update)?;
        }
        Ok(())
    }

    fn request_input(&mut self, requests: &[InputRequest]) -> Result<()> {
        let active = self.state.window.as_ref().map(|w| &w.id);
        let request = requests
            .iter()
            .find(|r| Some(&r.id) == active)
            .or_else(|| requests.first());
        if let Some(request) = request {
            self.state.input = InputMode::from(request);
            self.arm()?;
        }
        Ok(())
    }

    fn accept_specialinput(&mut self, special: &SpecialInput) -> Result<()> {
        if special.kind != "fileref_prompt" {
            warn!("Request for unknown special input type: {}", special.kind);
            return Ok(());
        }
        match self.dialog.open(special.filemode.for_save(), &special.filetype, special.gameid.as_deref()) {
            Ok(prompt) => {
                self.editor.clear();
                self.renderer.prompt(&prompt)?;
            }
            Err(e) => {
                warn!("Unable to open file dialog: {}", e);
                self.emitter.defer(ResponseEmitter::fileref(self.state.generation(), None));
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: Key, host: &mut dyn Host) -> Result<()> {
        if let Some(captured) = self.router.capture_key(key) {
            // Keep the key out of the next line input
            self.editor.clear();
            self.state.input = InputMode::None;
            self.renderer.set_muted(false);
            let response = ResponseEmitter::char(self.state.generation(), captured.window, captured.value);
            self.emitter.send(host, response);
            return Ok(());
        }

        match self.editor.feed(key) {
            Edit::Echo(text) => self.renderer.echo(&text)?,
            Edit::Line(line) => self.handle_line(line, host)?,
            Edit::Ignored => {}
        }
        Ok(())
    }

    fn handle_line(&mut self, line: String, host: &mut dyn Host) -> Result<()> {
        if self.dialog.is_open() {
            let file = self.dialog.answer(&line);
            let response = ResponseEmitter::fileref(self.state.generation(), file);
            self.emitter.send(host, response);
            return Ok(());
        }

        match self.router.capture_line(line) {
            Some(captured) => {
                self.renderer.end_line_input()?;
                self.state.input = InputMode::None;
                let response = ResponseEmitter::line(self.state.generation(), captured.window, captured.value);
                self.emitter.send(host, response);
            }
            None => debug!("Dropping line typed while no line input was requested"),
        }
        Ok(())
    }
}

impl<R: Renderer, D: FileDialog> Frontend for UpdateEngine<R, D> {
    fn name(&self) -> &str {
        self.renderer.name()
    }

    fn init(&mut self, host: &mut dyn Host) -> Result<()> {
        let metrics = self.renderer.metrics();
        self.metrics = Some(metrics);
        info!("Terminal is {}x{}", metrics.width, metrics.height);
        let response = ResponseEmitter::init(self.state.generation(), metrics);
        self.emitter.send(host, response);
        Ok(())
    }

    fn update(&mut self, message: Value, host: &mut dyn Host) -> Result<Flow> {
        let update = Update::from_value(message)?;
        self.process(update, host)
    }

    fn input(&mut self, data: &[u8], host: &mut dyn Host) -> Result<Flow> {
        for key in self.parser.parse(data) {
            if key == Key::Interrupt {
                info!("Interrupted");
                self.shutdown()?;
                return Ok(Flow::Exit);
            }
            self.handle_key(key, host)?;
        }
        Ok(Flow::Continue)
    }

    fn resize(&mut self, host: &mut dyn Host) -> Result<()> {
        if !self.renderer.is_tty() {
            return Ok(());
        }
        let metrics = self.renderer.metrics();
        if self.metrics != Some(metrics) {
            self.metrics = Some(metrics);
            debug!("Terminal resized to {}x{}", metrics.width, metrics.height);
            let response = ResponseEmitter::arrange(self.state.generation(), metrics);
            self.emitter.send(host, response);
        }
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.disarm();
        self.editor.clear();
        let result = self.renderer.shutdown();
        self.raw_mode.release();
        result.map_err(GlkError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{parse_update, ResponseKind, ResponseValue, WindowId};
    use crate::renderer::DumbRenderer;

    type TestEngine = UpdateEngine<DumbRenderer<Vec<u8>>, PromptDialog>;

    fn engine() -> TestEngine {
        UpdateEngine::new(DumbRenderer::new(Vec::new(), false), PromptDialog::new(), WindowPolicy::LastBuffer)
    }

    fn send(engine: &mut TestEngine, host: &mut Vec<crate::protocol::Response>, json: &str) -> Flow {
        engine.process(parse_update(json).unwrap(), host).unwrap()
    }

    fn output(engine: &TestEngine) -> String {
        String::from_utf8(engine.renderer().get_ref().clone()).unwrap()
    }

    const LINE_UPDATE: &str = r#"{"type":"update","gen":1,"windows":[{"id":1,"type":"buffer"}],
        "content":[{"id":1,"text":[{"append":false,"content":["Hello"]}]}],
        "input":[{"type":"line","id":1}]}"#;

    const CHAR_UPDATE: &str = r#"{"type":"update","gen":1,"windows":[{"id":1,"type":"buffer"}],
        "input":[{"type":"char","id":1}]}"#;

    #[test]
    fn test_line_input_round_trip() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, LINE_UPDATE);
        assert_eq!(output(&engine), "\nHello");
        assert!(engine.router().line_armed());

        engine.input(b"look\r", &mut host).unwrap();
        assert_eq!(host.len(), 1);
        assert_eq!(host[0].kind, ResponseKind::Line);
        assert_eq!(host[0].gen, 1);
        assert_eq!(host[0].window, Some(WindowId::Num(1)));
        assert_eq!(host[0].value, Some(ResponseValue::Text("look".to_string())));
        assert_eq!(engine.state().input, InputMode::None);
        assert!(engine.router().armed().is_none());
    }

    #[test]
    fn test_repeated_generation_is_dropped() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, LINE_UPDATE);
        engine.input(b"look\r", &mut host).unwrap();
        let before = engine.state().clone();

        send(&mut engine, &mut host, LINE_UPDATE);
        assert_eq!(output(&engine), "\nHello");
        assert_eq!(engine.state(), &before);
        assert!(engine.router().armed().is_none());
        assert_eq!(host.len(), 1);
    }

    #[test]
    fn test_stale_generation_is_dropped() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, r#"{"type":"update","gen":5,"windows":[{"id":1,"type":"buffer"}],"input":[{"type":"char","id":1}]}"#);
        let before = engine.state().clone();

        send(&mut engine, &mut host, r#"{"type":"update","gen":2,"input":[],"content":[{"id":1,"text":[{"content":["late"]}]}]}"#);
        assert_eq!(engine.state(), &before);
        assert!(engine.router().char_armed());
        assert_eq!(output(&engine), "");
    }

    #[test]
    fn test_char_input_key_names() {
        let cases: [(&[u8], &str); 4] = [(b"\t", "tab"), (b"\x7f", "delete"), (b"\x1b[15~", "func5"), (b"x", "x")];
        for (bytes, expected) in cases {
            let mut engine = engine();
            let mut host = Vec::new();
            send(&mut engine, &mut host, CHAR_UPDATE);
            assert!(engine.renderer().is_muted());

            engine.input(bytes, &mut host).unwrap();
            assert_eq!(host.len(), 1, "key {:?}", bytes);
            assert_eq!(host[0].kind, ResponseKind::Char);
            assert_eq!(host[0].value, Some(ResponseValue::Text(expected.to_string())));
            assert!(!engine.renderer().is_muted());
        }
    }

    #[test]
    fn test_char_capture_clears_line_residue() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, r#"{"type":"update","gen":1,"windows":[{"id":1,"type":"buffer"}]}"#);
        engine.input(b"ab", &mut host).unwrap();

        send(&mut engine, &mut host, r#"{"type":"update","gen":2,"input":[{"type":"char","id":1}]}"#);
        engine.input(b"c", &mut host).unwrap();
        send(&mut engine, &mut host, r#"{"type":"update","gen":3,"input":[{"type":"line","id":1}]}"#);
        engine.input(b"look\r", &mut host).unwrap();

        assert_eq!(host.len(), 2);
        assert_eq!(host[1].value, Some(ResponseValue::Text("look".to_string())));
    }

    #[test]
    fn test_cancellation_disarms() {
        for json in [LINE_UPDATE, CHAR_UPDATE] {
            let mut engine = engine();
            let mut host = Vec::new();
            send(&mut engine, &mut host, json);
            send(&mut engine, &mut host, r#"{"type":"update","gen":2,"input":[]}"#);
            assert_eq!(engine.state().input, InputMode::None);
            assert!(!engine.router().char_armed() && !engine.router().line_armed());

            engine.input(b"q\r", &mut host).unwrap();
            assert!(host.is_empty());
        }
    }

    #[test]
    fn test_missing_input_section_keeps_request() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, LINE_UPDATE);
        send(&mut engine, &mut host, r#"{"type":"update","gen":2,"content":[{"id":1,"text":[{"append":true,"content":[" again"]}]}]}"#);
        assert!(engine.router().line_armed());
        assert_eq!(output(&engine), "\nHello again");
    }

    #[test]
    fn test_disable_then_enable_restores_channel() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, CHAR_UPDATE);

        engine.set_disabled(true).unwrap();
        assert!(engine.router().armed().is_none());
        assert!(matches!(engine.state().input, InputMode::Char(_)));
        engine.input(b"x", &mut host).unwrap();
        assert!(host.is_empty());

        engine.set_disabled(false).unwrap();
        assert!(engine.router().char_armed());
    }

    #[test]
    fn test_disabled_update_reenabled_by_next_update() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, r#"{"type":"update","gen":1,"windows":[{"id":1,"type":"buffer"}],"input":[{"type":"line","id":1}],"disabled":true}"#);
        assert!(engine.state().disabled);
        assert!(engine.router().armed().is_none());

        send(&mut engine, &mut host, r#"{"type":"update","gen":2}"#);
        assert!(!engine.state().disabled);
        assert!(engine.router().line_armed());
    }

    #[test]
    fn test_content_for_other_windows_is_skipped() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, r#"{"type":"update","gen":1,
            "windows":[{"id":1,"type":"grid"},{"id":2,"type":"buffer"}],
            "content":[{"id":1,"lines":[{"line":0,"content":["Status"]}]},{"id":2,"text":[{"content":["Story"]}]}],
            "input":[{"type":"char","id":1}]}"#);
        assert_eq!(output(&engine), "\nStory");

        engine.input(b" ", &mut host).unwrap();
        assert_eq!(host[0].window, Some(WindowId::Num(1)));
    }

    #[test]
    fn test_file_prompt() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, LINE_UPDATE);
        send(&mut engine, &mut host, r#"{"type":"update","gen":2,
            "specialinput":{"type":"fileref_prompt","filemode":"write","filetype":"save","gameid":"GAME"}}"#);
        assert!(engine.state().disabled);
        assert!(engine.router().armed().is_none());
        assert!(output(&engine).ends_with(PromptDialog::PROMPT));
        assert!(host.is_empty());

        engine.input(b"slot1\r", &mut host).unwrap();
        assert_eq!(host.len(), 1);
        assert_eq!(host[0].kind, ResponseKind::SpecialResponse);
        let value = serde_json::to_value(&host[0]).unwrap();
        assert_eq!(value["value"]["filename"], "slot1.glksave");

        send(&mut engine, &mut host, r#"{"type":"update","gen":3}"#);
        assert!(engine.router().line_armed());
    }

    #[test]
    fn test_dialog_failure_is_deferred() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, r#"{"type":"update","gen":1,
            "specialinput":{"type":"fileref_prompt","filemode":"read","filetype":"picture"}}"#);
        assert_eq!(host.len(), 1);
        assert_eq!(host[0].kind, ResponseKind::SpecialResponse);
        assert_eq!(host[0].value, Some(ResponseValue::Null));
        assert_eq!(host[0].gen, 1);
    }

    #[test]
    fn test_unknown_special_input_ignored() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, r#"{"type":"update","gen":1,"specialinput":{"type":"color_prompt"}}"#);
        assert!(host.is_empty());
        assert_eq!(engine.state().generation(), 1);
    }

    #[test]
    fn test_control_messages() {
        let mut engine = engine();
        let mut host = Vec::new();
        assert_eq!(send(&mut engine, &mut host, r#"{"type":"pass"}"#), Flow::Continue);
        assert_eq!(send(&mut engine, &mut host, r#"{"type":"redraw"}"#), Flow::Continue);

        let err = engine.process(Update::Error { message: "boom".to_string() }, &mut host).unwrap_err();
        assert_eq!(err.to_string(), "boom");

        assert_eq!(send(&mut engine, &mut host, r#"{"type":"exit"}"#), Flow::Exit);
        assert_eq!(output(&engine), "\n");
        engine.shutdown().unwrap();
        assert_eq!(output(&engine), "\n");
    }

    #[test]
    fn test_init_sends_default_metrics() {
        let mut engine = engine();
        let mut host = Vec::new();
        engine.init(&mut host).unwrap();
        assert_eq!(host[0].kind, ResponseKind::Init);
        assert_eq!(host[0].gen, 0);
        assert_eq!(host[0].metrics, Some(Metrics::default()));
        assert_eq!(host[0].support, Some(vec![]));

        // Not a terminal, so no arrange
        engine.resize(&mut host).unwrap();
        assert_eq!(host.len(), 1);
    }

    #[test]
    fn test_interrupt_exits() {
        let mut engine = engine();
        let mut host = Vec::new();
        send(&mut engine, &mut host, LINE_UPDATE);
        assert_eq!(engine.input(b"lo\x03ok\r", &mut host).unwrap(), Flow::Exit);
        assert!(host.is_empty());
    }
}
