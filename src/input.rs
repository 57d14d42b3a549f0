//! Terminal Input
//!
//! Parses raw terminal input into key presses, and keeps the line being
//! typed for line input. Handles:
//! - Regular characters (UTF-8)
//! - Control characters
//! - Arrow, editing and function keys (CSI and SS3 sequences)

/// A key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// A printable or unmapped control character
    Char(char),
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    Insert,
    Delete,
    Escape,
    Enter,
    Tab,
    Backspace,
    /// Ctrl+C; raw mode swallows the signal
    Interrupt,
    /// Function key F1-F12
    F(u8),
}

/// Input parser state machine
pub struct InputParser {
    /// Buffer for incomplete escape sequences
    buffer: Vec<u8>,
}

impl InputParser {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(32),
        }
    }

    /// Parse input bytes into key presses.
    /// Incomplete sequences stay buffered for the next call.
    pub fn parse(&mut self, data: &[u8]) -> Vec<Key> {
        let mut keys = Vec::new();
        self.buffer.extend_from_slice(data);

        while !self.buffer.is_empty() {
            match self.try_parse_one() {
                ParseResult::Key(key) => {
                    keys.push(key);
                }
                ParseResult::Incomplete => {
                    // Need more data
                    break;
                }
                ParseResult::Invalid(skip) => {
                    self.buffer.drain(0..skip);
                }
            }
        }

        // A read that ends on a bare ESC is the Escape key itself
        if self.buffer == [0x1b] {
            self.buffer.clear();
            keys.push(Key::Escape);
        }

        keys
    }

    /// Try to parse one key from the buffer
    fn try_parse_one(&mut self) -> ParseResult {
        if self.buffer.is_empty() {
            return ParseResult::Incomplete;
        }

        let first = self.buffer[0];

        if first == 0x1b {
            return self.parse_escape();
        }

        // Control characters (< 32) and DEL (0x7f)
        if first < 32 || first == 0x7f {
            let key = match first {
                0x0d | 0x0a => Key::Enter,
                0x09 => Key::Tab,
                0x7f | 0x08 => Key::Backspace,
                0x03 => Key::Interrupt,
                _ => Key::Char(first as char),
            };
            self.buffer.remove(0);
            // Swallow the LF of a CRLF pair
            if first == 0x0d && self.buffer.first() == Some(&0x0a) {
                self.buffer.remove(0);
            }
            return ParseResult::Key(key);
        }

        if let Some((ch, len)) = self.decode_utf8() {
            self.buffer.drain(0..len);
            return ParseResult::Key(Key::Char(ch));
        }

        // Wait for the rest of a multi-byte character
        if self.utf8_len(first).is_some_and(|len| self.buffer.len() < len) {
            return ParseResult::Incomplete;
        }

        ParseResult::Invalid(1)
    }

    /// Parse an escape sequence
    fn parse_escape(&mut self) -> ParseResult {
        if self.buffer.len() < 2 {
            return ParseResult::Incomplete;
        }

        match self.buffer[1] {
            // CSI sequence: ESC [
            b'[' => self.parse_csi(),
            // SS3 sequence: ESC O (for F1-F4 on some terminals)
            b'O' => self.parse_ss3(),
            // ESC ESC: the first one was a plain Escape
            0x1b => {
                self.buffer.remove(0);
                ParseResult::Key(Key::Escape)
            }
            // Alt+key arrives as ESC key; keep the key
            c if c >= 32 => {
                self.buffer.remove(0);
                ParseResult::Invalid(0)
            }
            _ => {
                self.buffer.remove(0);
                ParseResult::Key(Key::Escape)
            }
        }
    }

    /// Parse CSI (Control Sequence Introducer) sequence: ESC [
    fn parse_csi(&mut self) -> ParseResult {
        if self.buffer.len() < 3 {
            return ParseResult::Incomplete;
        }

        // Find the end of the sequence (a letter)
        let end = self.buffer[2..].iter().position(|&b| b.is_ascii_alphabetic() || b == b'~');

        match end {
            None => ParseResult::Incomplete,
            Some(pos) => {
                let end_idx = 2 + pos;
                let final_byte = self.buffer[end_idx];
                let params: Vec<u8> = self.buffer[2..end_idx].to_vec();

                let key = decode_csi(&params, final_byte);
                self.buffer.drain(0..=end_idx);

                key.map(ParseResult::Key).unwrap_or(ParseResult::Invalid(0))
            }
        }
    }

    /// Parse SS3 sequence: ESC O
    fn parse_ss3(&mut self) -> ParseResult {
        if self.buffer.len() < 3 {
            return ParseResult::Incomplete;
        }

        let key = match self.buffer[2] {
            b'P' => Some(Key::F(1)),
            b'Q' => Some(Key::F(2)),
            b'R' => Some(Key::F(3)),
            b'S' => Some(Key::F(4)),
            b'A' => Some(Key::Up),
            b'B' => Some(Key::Down),
            b'C' => Some(Key::Right),
            b'D' => Some(Key::Left),
            b'H' => Some(Key::Home),
            b'F' => Some(Key::End),
            _ => None,
        };

        self.buffer.drain(0..3);
        key.map(ParseResult::Key).unwrap_or(ParseResult::Invalid(0))
    }

    /// Expected length of a UTF-8 sequence starting with `first`
    fn utf8_len(&self, first: u8) -> Option<usize> {
        if first < 128 {
            Some(1)
        } else if first & 0xE0 == 0xC0 {
            Some(2)
        } else if first & 0xF0 == 0xE0 {
            Some(3)
        } else if first & 0xF8 == 0xF0 {
            Some(4)
        } else {
            None
        }
    }

    /// Decode a UTF-8 character from the buffer
    fn decode_utf8(&self) -> Option<(char, usize)> {
        let len = self.utf8_len(*self.buffer.first()?)?;
        if self.buffer.len() < len {
            return None;
        }

        let s = std::str::from_utf8(&self.buffer[0..len]).ok()?;
        s.chars().next().map(|c| (c, len))
    }
}

impl Default for InputParser {
    fn default() -> Self {
        Self::new()
    }
}

enum ParseResult {
    Key(Key),
    Incomplete,
    Invalid(usize),
}

/// Decode CSI parameters into a key
fn decode_csi(params: &[u8], final_byte: u8) -> Option<Key> {
    match final_byte {
        b'A' => Some(Key::Up),
        b'B' => Some(Key::Down),
        b'C' => Some(Key::Right),
        b'D' => Some(Key::Left),
        b'H' => Some(Key::Home),
        b'F' => Some(Key::End),
        b'~' => {
            // Parse the number before ~, ignoring modifiers after ';'
            let num: u16 = params
                .iter()
                .take_while(|&&b| b.is_ascii_digit())
                .fold(0, |acc, &b| acc.saturating_mul(10).saturating_add((b - b'0') as u16));
            match num {
                1 | 7 => Some(Key::Home),
                2 => Some(Key::Insert),
                3 => Some(Key::Delete),
                4 | 8 => Some(Key::End),
                5 => Some(Key::PageUp),
                6 => Some(Key::PageDown),
                11 => Some(Key::F(1)),
                12 => Some(Key::F(2)),
                13 => Some(Key::F(3)),
                14 => Some(Key::F(4)),
                15 => Some(Key::F(5)),
                17 => Some(Key::F(6)),
                18 => Some(Key::F(7)),
                19 => Some(Key::F(8)),
                20 => Some(Key::F(9)),
                21 => Some(Key::F(10)),
                23 => Some(Key::F(11)),
                24 => Some(Key::F(12)),
                _ => None,
            }
        }
        _ => None,
    }
}

/// What the line editor did with a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Text to echo to the terminal
    Echo(String),
    /// A finished line
    Line(String),
    Ignored,
}

/// Minimal line editor standing in for a full readline
#[derive(Debug, Default)]
pub struct LineEditor {
    line: String,
}

impl LineEditor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn feed(&mut self, key: Key) -> Edit {
        match key {
            Key::Enter => Edit::Line(std::mem::take(&mut self.line)),
            Key::Backspace => match self.line.pop() {
                Some(_) => Edit::Echo("\x08 \x08".to_string()),
                None => Edit::Ignored,
            },
            // Ctrl+U
            Key::Char('\x15') => {
                let erase = "\x08 \x08".repeat(self.line.chars().count());
                self.line.clear();
                if erase.is_empty() {
                    Edit::Ignored
                } else {
                    Edit::Echo(erase)
                }
            }
            Key::Char(c) if !c.is_control() => {
                self.line.push(c);
                Edit::Echo(c.to_string())
            }
            _ => Edit::Ignored,
        }
    }

    /// Drop whatever was typed so far
    pub fn clear(&mut self) {
        self.line.clear();
    }

    pub fn pending(&self) -> &str {
        &self.line
    }
}
