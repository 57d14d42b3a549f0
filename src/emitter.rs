//! Response Emitter
//!
//! Builds outgoing protocol events and hands them to the host. Responses
//! raised while an update is still being applied are held back until
//! [`ResponseEmitter::flush`] runs at the end of that update.

use std::collections::VecDeque;

use log::{debug, error};
use tokio::sync::mpsc;

use crate::protocol::{FileRef, Metrics, Response, ResponseKind, ResponseValue, WindowId};

/// The game side of the protocol
pub trait Host {
    /// Deliver one response event
    fn accept(&mut self, response: Response);
}

/// Collects responses; used by tests and embedders
impl Host for Vec<Response> {
    fn accept(&mut self, response: Response) {
        self.push(response);
    }
}

impl Host for mpsc::UnboundedSender<Response> {
    fn accept(&mut self, response: Response) {
        if self.send(response).is_err() {
            error!("Interpreter input closed, dropping response");
        }
    }
}

/// Builds and delivers response events
#[derive(Debug, Default)]
pub struct ResponseEmitter {
    deferred: VecDeque<Response>,
}

impl ResponseEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handshake event; advertises no optional capabilities
    pub fn init(gen: u64, metrics: Metrics) -> Response {
        let mut response = Response::new(ResponseKind::Init, gen);
        response.metrics = Some(metrics);
        response.support = Some(Vec::new());
        response
    }

    pub fn arrange(gen: u64, metrics: Metrics) -> Response {
        let mut response = Response::new(ResponseKind::Arrange, gen);
        response.metrics = Some(metrics);
        response
    }

    pub fn line(gen: u64, window: WindowId, value: String) -> Response {
        Self::input(ResponseKind::Line, gen, window, value)
    }

    pub fn char(gen: u64, window: WindowId, value: String) -> Response {
        Self::input(ResponseKind::Char, gen, window, value)
    }

    fn input(kind: ResponseKind, gen: u64, window: WindowId, value: String) -> Response {
        let mut response = Response::new(kind, gen);
        response.window = Some(window);
        response.value = Some(ResponseValue::Text(value));
        response
    }

    /// Answer to a fileref prompt; `None` means cancelled or failed
    pub fn fileref(gen: u64, file: Option<FileRef>) -> Response {
        let mut response = Response::new(ResponseKind::SpecialResponse, gen);
        response.response = Some("fileref_prompt".to_string());
        response.value = Some(file.map_or(ResponseValue::Null, ResponseValue::File));
        response
    }

    /// Deliver immediately
    pub fn send(&mut self, host: &mut dyn Host, response: Response) {
        debug!("Sending {:?} response (gen {})", response.kind, response.gen);
        host.accept(response);
    }

    /// Hold a response until the current update has been applied
    pub fn defer(&mut self, response: Response) {
        self.deferred.push_back(response);
    }

    /// Deliver held responses in the order they were raised
    pub fn flush(&mut self, host: &mut dyn Host) {
        while let Some(response) = self.deferred.pop_front() {
            self.send(host, response);
        }
    }

    pub fn has_deferred(&self) -> bool {
        !self.deferred.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    #[test]
    fn test_init_response() {
        let response = ResponseEmitter::init(0, Metrics::default());
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["type"], json!("init"));
        assert_eq!(value["gen"], json!(0));
        assert_eq!(value["metrics"]["width"], json!(80));
        assert_eq!(value["metrics"]["height"], json!(25));
        assert_eq!(value["support"], json!([]));
        assert_eq!(value.get("window"), None);
    }

    #[test]
    fn test_char_response() {
        let response = ResponseEmitter::char(7, WindowId::Num(2), "func5".to_string());
        let value: Value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"type": "char", "gen": 7, "window": 2, "value": "func5"}));
    }

    #[test]
    fn test_fileref_response() {
        let file = FileRef { filename: "game.glksave".to_string(), usage: Some("save".to_string()) };
        let value = serde_json::to_value(ResponseEmitter::fileref(3, Some(file))).unwrap();
        assert_eq!(value["value"], json!({"filename": "game.glksave", "usage": "save"}));
        assert_eq!(value["response"], json!("fileref_prompt"));
    }

    #[test]
    fn test_deferred_responses_wait_for_flush() {
        let mut emitter = ResponseEmitter::new();
        let mut host: Vec<Response> = Vec::new();

        emitter.defer(ResponseEmitter::fileref(1, None));
        emitter.defer(ResponseEmitter::arrange(1, Metrics::default()));
        assert!(host.is_empty());
        assert!(emitter.has_deferred());

        emitter.flush(&mut host);
        assert_eq!(host.len(), 2);
        assert_eq!(host[0].kind, ResponseKind::SpecialResponse);
        assert_eq!(host[1].kind, ResponseKind::Arrange);
        assert!(!emitter.has_deferred());
    }

    #[test]
    fn test_channel_host() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut host = tx;
        host.accept(ResponseEmitter::line(1, WindowId::Num(1), "look".to_string()));
        assert_eq!(rx.try_recv().unwrap().kind, ResponseKind::Line);
    }
}
