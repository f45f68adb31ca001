//! Streaming partial-field extraction for the Planner's `"thinking"` value.
//!
//! The Planner asks the model for a single JSON object and streams its
//! response; rather than buffer the whole document before showing anything,
//! this scans the arriving bytes for the `"thinking": "..."` string value and
//! emits its characters (unescaped) to the transport as they become
//! available, then goes quiet for the rest of the document. This is a small
//! explicit state machine (`spec.md` §9) — no streaming-JSON library, because
//! the grammar subset handled here is tiny: one known key, one string value.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    SeekingKey,
    InKey,
    AfterColon,
    InStringValue,
    InEscape,
    Done,
}

/// Feed arbitrary chunks of a streaming JSON document in; get back the
/// unescaped characters of `"thinking"`'s string value as they become
/// available. Once the closing quote is seen the extractor goes `Done` and
/// emits nothing further, even if fed more text (the remainder completes the
/// JSON silently, per `spec.md` §4.5).
pub struct ThinkingExtractor {
    state: State,
    key_match: usize,
}

const KEY: &str = "\"thinking\"";

impl ThinkingExtractor {
    pub fn new() -> Self {
        Self { state: State::SeekingKey, key_match: 0 }
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Process one chunk, returning the characters (if any) that belong to
    /// the `thinking` value's unescaped text.
    pub fn feed(&mut self, chunk: &str) -> String {
        let mut out = String::new();
        for c in chunk.chars() {
            match self.state {
                State::Done => break,
                State::SeekingKey => {
                    if c == KEY.chars().nth(self.key_match).unwrap() {
                        self.key_match += 1;
                        if self.key_match == KEY.len() {
                            self.state = State::InKey;
                        }
                    } else {
                        self.key_match = if c == '"' { 1 } else { 0 };
                    }
                }
                State::InKey => {
                    if c == ':' {
                        self.state = State::AfterColon;
                    }
                }
                State::AfterColon => {
                    if c == '"' {
                        self.state = State::InStringValue;
                    } else if !c.is_whitespace() {
                        // Malformed — not a string value; stop looking.
                        self.state = State::Done;
                    }
                }
                State::InStringValue => {
                    if c == '\\' {
                        self.state = State::InEscape;
                    } else if c == '"' {
                        self.state = State::Done;
                    } else {
                        out.push(c);
                    }
                }
                State::InEscape => {
                    out.push(match c {
                        'n' => '\n',
                        't' => '\t',
                        'r' => '\r',
                        '"' => '"',
                        '\\' => '\\',
                        other => other,
                    });
                    self.state = State::InStringValue;
                }
            }
        }
        out
    }
}

impl Default for ThinkingExtractor {
    fn default() -> Self {
        Self::new()
    }
}
