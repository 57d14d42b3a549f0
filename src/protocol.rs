//! GlkOte Protocol
//!
//! JSON wire types for the GlkOte display protocol.
//! The interpreter sends updates, the frontend answers with responses.
//!
//! ## Framing
//!
//! RemGlk interpreters write one JSON object per update with no length
//! prefix, usually separated by a blank line. [`JsonFramer`] reassembles
//! objects that arrive split across reads.
//!
//! Example update:
//! ```json
//! {"type": "update", "gen": 1, "windows": [{"id": 1, "type": "buffer"}],
//!  "content": [{"id": 1, "text": [{"content": ["Hello"]}]}],
//!  "input": [{"type": "line", "id": 1}]}
//! ```

use std::fmt;

use bytes::{Buf, BytesMut};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque window identifier, numeric for RemGlk
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindowId {
    Num(u64),
    Str(String),
}

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WindowId::Num(n) => write!(f, "{}", n),
            WindowId::Str(s) => f.write_str(s),
        }
    }
}

impl From<u64> for WindowId {
    fn from(n: u64) -> Self {
        WindowId::Num(n)
    }
}

/// Messages from interpreter to frontend
#[derive(Debug, Clone, PartialEq)]
pub enum Update {
    /// Fatal error reported by the interpreter
    Error { message: String },

    /// Nothing to do
    Pass,

    /// The game has finished
    Exit,

    /// A state update carrying a generation number
    State(StateUpdate),

    /// Any other `type` tag
    Unknown(String),
}

impl Update {
    /// Classify a raw message by its `type` tag
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        Ok(match kind.as_str() {
            "update" => Update::State(serde_json::from_value(value)?),
            "error" => Update::Error {
                message: value
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("Unknown error")
                    .to_string(),
            },
            "pass" => Update::Pass,
            "exit" => Update::Exit,
            _ => Update::Unknown(kind),
        })
    }
}

/// Body of a `{"type": "update"}` message
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StateUpdate {
    pub gen: u64,
    /// Full window layout, replaces the previous one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows: Option<Vec<WindowSpec>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Vec<ContentUpdate>>,
    /// Input requests; an empty list cancels all input
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Vec<InputRequest>>,
    #[serde(default)]
    pub disabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specialinput: Option<SpecialInput>,
}

/// Window types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowKind {
    Buffer,
    Grid,
    /// Graphics and pair windows, never rendered
    #[serde(other)]
    Other,
}

/// One entry of the `windows` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSpec {
    pub id: WindowId,
    #[serde(rename = "type")]
    pub kind: WindowKind,
    #[serde(default)]
    pub rock: u32,
}

/// Content for one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentUpdate {
    pub id: WindowId,
    /// Buffer windows only; scrollback is never erased here
    #[serde(default)]
    pub clear: bool,
    /// Buffer window paragraphs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub text: Vec<TextLine>,
    /// Grid window rows
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lines: Vec<GridLine>,
}

/// A buffer window paragraph
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    /// Continue the previous line instead of starting a new one
    #[serde(default)]
    pub append: bool,
    #[serde(default)]
    pub content: Vec<ContentRun>,
}

/// A grid window row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridLine {
    pub line: usize,
    #[serde(default)]
    pub content: Vec<ContentRun>,
}

/// A run of text, plain or styled
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContentRun {
    Plain(String),
    Styled(StyledRun),
}

impl ContentRun {
    /// The text to display; styles are dropped
    pub fn text(&self) -> &str {
        match self {
            ContentRun::Plain(s) => s,
            ContentRun::Styled(run) => &run.text,
        }
    }
}

/// A styled run; image and other special runs carry no text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyledRun {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<String>,
}

/// Input types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InputKind {
    Char,
    Line,
}

/// One entry of the `input` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputRequest {
    pub id: WindowId,
    #[serde(rename = "type")]
    pub kind: InputKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gen: Option<u64>,
}

/// File access mode of a fileref prompt
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileMode {
    #[default]
    Read,
    Write,
    ReadWrite,
    WriteAppend,
}

impl FileMode {
    /// Everything except plain reads needs a save dialog
    pub fn for_save(self) -> bool {
        self != FileMode::Read
    }
}

/// Request for out-of-band input
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpecialInput {
    /// Only "fileref_prompt" is defined
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub filemode: FileMode,
    #[serde(default)]
    pub filetype: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gameid: Option<String>,
}

/// Response types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseKind {
    Init,
    Arrange,
    Line,
    Char,
    SpecialResponse,
    // Only seen when relaying a remote client's responses
    Timer,
    Hyperlink,
    Mouse,
    Redraw,
    Refresh,
    External,
    DebugInput,
}

/// Response from frontend to interpreter
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    #[serde(rename = "type")]
    pub kind: ResponseKind,
    #[serde(default)]
    pub gen: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<WindowId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<Metrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub support: Option<Vec<String>>,
    /// Special input type being answered
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<ResponseValue>,
    /// Fields this frontend does not interpret, kept for relaying
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    pub fn new(kind: ResponseKind, gen: u64) -> Self {
        Self {
            kind,
            gen,
            window: None,
            metrics: None,
            support: None,
            response: None,
            value: None,
            extra: Map::new(),
        }
    }
}

/// Payload of a line, char or special response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResponseValue {
    Text(String),
    File(FileRef),
    /// Cancelled or failed special input
    Null,
}

/// A file chosen through a fileref prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    pub filename: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<String>,
}

/// Display measurements, in characters for a terminal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Metrics {
    pub width: u32,
    pub height: u32,
    pub buffercharwidth: u32,
    pub buffercharheight: u32,
    pub buffermarginx: u32,
    pub buffermarginy: u32,
    pub gridcharwidth: u32,
    pub gridcharheight: u32,
    pub gridmarginx: u32,
    pub gridmarginy: u32,
    pub graphicsmarginx: u32,
    pub graphicsmarginy: u32,
    pub inspacingx: u32,
    pub inspacingy: u32,
    pub outspacingx: u32,
    pub outspacingy: u32,
}

impl Metrics {
    /// Character-cell metrics for a `width` x `height` terminal
    pub fn with_size(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self {
            width: 80,
            height: 25,
            buffercharwidth: 1,
            buffercharheight: 1,
            buffermarginx: 0,
            buffermarginy: 0,
            gridcharwidth: 1,
            gridcharheight: 1,
            gridmarginx: 0,
            gridmarginy: 0,
            graphicsmarginx: 0,
            graphicsmarginy: 0,
            inspacingx: 0,
            inspacingy: 0,
            outspacingx: 0,
            outspacingy: 0,
        }
    }
}

/// Reassembles a stream of concatenated JSON objects
pub struct JsonFramer {
    buffer: BytesMut,
}

impl JsonFramer {
    pub fn new() -> Self {
        Self {
            buffer: BytesMut::with_capacity(4096),
        }
    }

    /// Feed bytes, returning every complete value now available.
    /// A syntax error discards everything buffered so far.
    pub fn push(&mut self, data: &[u8]) -> Vec<Result<Value, serde_json::Error>> {
        self.buffer.extend_from_slice(data);

        let mut values = Vec::new();
        let consumed = {
            let mut stream = serde_json::Deserializer::from_slice(&self.buffer).into_iter::<Value>();
            loop {
                match stream.next() {
                    Some(Ok(value)) => values.push(Ok(value)),
                    Some(Err(e)) if e.is_eof() => break stream.byte_offset(),
                    Some(Err(e)) => {
                        values.push(Err(e));
                        break self.buffer.len();
                    }
                    None => break stream.byte_offset(),
                }
            }
        };

        self.buffer.advance(consumed);
        values
    }

    /// Bytes waiting for the rest of an object
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for JsonFramer {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse an update from JSON
pub fn parse_update(json: &str) -> Result<Update, serde_json::Error> {
    Update::from_value(serde_json::from_str(json)?)
}

/// Serialize a response to JSON
pub fn serialize_response(response: &Response) -> String {
    serde_json::to_string(response).unwrap_or_else(|_| r#"{"type":"pass"}"#.to_string())
}
