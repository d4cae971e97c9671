//! Default destination for live job output

use std::io::{self, Write};

use corelink_core::domain::stream::LEVEL_STDOUT;
use tracing::warn;

/// Writes stdout-level messages to one writer and everything else to another
///
/// Messages are written verbatim; the agent already includes line endings.
pub struct StdioSink<O, E> {
    out: O,
    err: E,
}

impl StdioSink<io::Stdout, io::Stderr> {
    /// Sink writing to the process stdout and stderr
    pub fn stdio() -> Self {
        Self::new(io::stdout(), io::stderr())
    }
}

impl<O: Write, E: Write> StdioSink<O, E> {
    pub fn new(out: O, err: E) -> Self {
        Self { out, err }
    }

    /// Routes one stream message by level
    pub fn write(&mut self, level: u16, message: &str, _flag: u8) {
        let result = if level == LEVEL_STDOUT {
            self.out
                .write_all(message.as_bytes())
                .and_then(|_| self.out.flush())
        } else {
            self.err
                .write_all(message.as_bytes())
                .and_then(|_| self.err.flush())
        };

        if let Err(e) = result {
            warn!("Failed to write stream output: {}", e);
        }
    }

    pub fn into_parts(self) -> (O, E) {
        (self.out, self.err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routes_by_level() {
        let mut sink = StdioSink::new(Vec::new(), Vec::new());
        sink.write(1, "out\n", 0);
        sink.write(2, "err\n", 0);
        sink.write(30, "meta\n", 0x2);

        let (out, err) = sink.into_parts();
        assert_eq!(String::from_utf8(out).unwrap(), "out\n");
        assert_eq!(String::from_utf8(err).unwrap(), "err\nmeta\n");
    }
}
