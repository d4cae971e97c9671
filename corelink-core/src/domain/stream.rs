//! Live output stream types
//!
//! When a job is dispatched with `stream` set, the agent pushes each chunk of
//! output onto `stream:<id>`. The `meta` integer packs the output level in
//! its high 16 bits and a flag byte in its low 8 bits.

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Level of process stdout lines
pub const LEVEL_STDOUT: u16 = 1;

/// Level of process stderr lines
pub const LEVEL_STDERR: u16 = 2;

/// End of stream, job exited successfully
pub const FLAG_EOF_SUCCESS: u8 = 0x2;

/// End of stream, job exited with an error
pub const FLAG_EOF_ERROR: u8 = 0x4;

const FLAG_EOF_MASK: u8 = FLAG_EOF_SUCCESS | FLAG_EOF_ERROR;

/// One chunk of live job output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMessage {
    pub message: String,
    pub meta: u32,
}

/// Stream payloads arrive wrapped in a `message` object; bare messages are
/// accepted too.
#[derive(Deserialize)]
#[serde(untagged)]
enum StreamFrame {
    Wrapped { message: StreamMessage },
    Flat(StreamMessage),
}

impl StreamMessage {
    pub fn new(message: impl Into<String>, level: u16, flag: u8) -> Self {
        Self {
            message: message.into(),
            meta: encode_meta(level, flag),
        }
    }

    /// Decodes a raw payload popped from a stream list
    pub fn decode(raw: &str) -> Result<Self, DecodeError> {
        let frame: StreamFrame =
            serde_json::from_str(raw).map_err(|e| DecodeError::malformed("stream message", e))?;
        Ok(match frame {
            StreamFrame::Wrapped { message } => message,
            StreamFrame::Flat(message) => message,
        })
    }

    /// Encodes this message the way the agent writes it
    pub fn encode(&self) -> String {
        serde_json::json!({ "message": self }).to_string()
    }

    pub fn level(&self) -> u16 {
        (self.meta >> 16) as u16
    }

    pub fn flag(&self) -> u8 {
        (self.meta & 0xff) as u8
    }

    /// True for the last message a stream will ever carry
    pub fn is_eof(&self) -> bool {
        self.flag() & FLAG_EOF_MASK != 0
    }
}

pub fn encode_meta(level: u16, flag: u8) -> u32 {
    (u32::from(level) << 16) | u32::from(flag)
}
