//! RemGlk Frontend
//!
//! Relays the display protocol as a JSON stream instead of rendering it.
//! Updates go to the output as compact JSON followed by a blank line;
//! responses typed or piped into the input are tidied up and forwarded to
//! the interpreter. The remote peer owns generation tracking.

use std::io::Write;

use log::{debug, info, warn};
use serde_json::{json, Value};

use crate::emitter::Host;
use crate::error::{GlkError, Result};
use crate::frontend::{Flow, Frontend};
use crate::protocol::{JsonFramer, Metrics, Response, ResponseKind, ResponseValue};

/// JSON passthrough frontend
pub struct RemGlkFrontend<W: Write> {
    out: W,
    framer: JsonFramer,
}

impl<W: Write> RemGlkFrontend<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            framer: JsonFramer::new(),
        }
    }

    pub fn get_ref(&self) -> &W {
        &self.out
    }
}

/// Fill in what remote clients are allowed to leave out
pub fn normalize_response(mut message: Value) -> std::result::Result<Response, serde_json::Error> {
    let kind = message.get("type").and_then(Value::as_str).unwrap_or_default().to_string();
    if let Some(obj) = message.as_object_mut() {
        match kind.as_str() {
            "init" => {
                let given = obj.remove("metrics").unwrap_or_else(|| json!({}));
                let metrics: Metrics = serde_json::from_value(given)?;
                obj.insert("metrics".to_string(), serde_json::to_value(metrics)?);
            }
            "specialresponse" => {
                if let Some(Value::String(name)) = obj.get("value") {
                    let file = json!({ "filename": name });
                    obj.insert("value".to_string(), file);
                }
            }
            _ => {}
        }
    }

    let mut response: Response = serde_json::from_value(message)?;
    if response.kind == ResponseKind::SpecialResponse && response.value.is_none() {
        response.value = Some(ResponseValue::Null);
    }
    Ok(response)
}

impl<W: Write> Frontend for RemGlkFrontend<W> {
    fn name(&self) -> &str {
        "remglk"
    }

    fn init(&mut self, _host: &mut dyn Host) -> Result<()> {
        info!("Waiting for the remote client to send init");
        Ok(())
    }

    fn update(&mut self, message: Value, _host: &mut dyn Host) -> Result<Flow> {
        serde_json::to_writer(&mut self.out, &message)?;
        self.out.write_all(b"\n\n")?;
        self.out.flush()?;

        // Only the control tags matter here; update bodies pass through untouched
        match message.get("type").and_then(Value::as_str) {
            Some("error") => {
                let text = message.get("message").and_then(Value::as_str).unwrap_or("Unknown error");
                Err(GlkError::Host(text.to_string()))
            }
            Some("exit") => Ok(Flow::Exit),
            _ => Ok(Flow::Continue),
        }
    }

    fn input(&mut self, data: &[u8], host: &mut dyn Host) -> Result<Flow> {
        for message in self.framer.push(data) {
            let response = match message.and_then(normalize_response) {
                Ok(response) => response,
                Err(e) => {
                    warn!("Ignoring malformed response: {}", e);
                    continue;
                }
            };
            debug!("Relaying {:?} response (gen {})", response.kind, response.gen);
            host.accept(response);
        }
        Ok(Flow::Continue)
    }

    fn resize(&mut self, _host: &mut dyn Host) -> Result<()> {
        // The remote client measures its own display
        Ok(())
    }

    fn shutdown(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }
}
