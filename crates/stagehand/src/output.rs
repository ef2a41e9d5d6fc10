//! Output produced while handling one command line.
//!
//! The controller never writes to a terminal directly: the invocation may
//! have come from another process. Text is captured here, tagged with the
//! stream it belongs to, and replayed by whichever side owns the terminal.

use std::io::{self, Write};

use serde::{Deserialize, Serialize};

/// Standard stream a chunk of output belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTarget {
    /// Standard output.
    Stdout,
    /// Standard error.
    Stderr,
}

/// One write to a stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputChunk {
    /// Destination stream.
    pub stream: StreamTarget,
    /// Text written.
    pub data: String,
}

/// Ordered capture of everything an invocation printed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    chunks: Vec<OutputChunk>,
}

impl CommandOutput {
    /// Builds an empty capture.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends text destined for standard output.
    pub fn stdout(&mut self, data: impl Into<String>) {
        self.push(StreamTarget::Stdout, data.into());
    }

    /// Appends text destined for standard error.
    pub fn stderr(&mut self, data: impl Into<String>) {
        self.push(StreamTarget::Stderr, data.into());
    }

    /// Captured chunks in write order.
    #[must_use]
    pub fn chunks(&self) -> &[OutputChunk] {
        &self.chunks
    }

    /// Concatenated text written to `stream`.
    #[must_use]
    pub fn text(&self, stream: StreamTarget) -> String {
        self.chunks
            .iter()
            .filter(|chunk| chunk.stream == stream)
            .map(|chunk| chunk.data.as_str())
            .collect()
    }

    /// Writes every chunk to the matching writer and flushes both.
    pub fn replay<W, E>(&self, stdout: &mut W, stderr: &mut E) -> io::Result<()>
    where
        W: Write,
        E: Write,
    {
        for chunk in &self.chunks {
            match chunk.stream {
                StreamTarget::Stdout => stdout.write_all(chunk.data.as_bytes())?,
                StreamTarget::Stderr => stderr.write_all(chunk.data.as_bytes())?,
            }
        }
        stdout.flush()?;
        stderr.flush()
    }

    fn push(&mut self, stream: StreamTarget, data: String) {
        if data.is_empty() {
            return;
        }
        self.chunks.push(OutputChunk { stream, data });
    }
}
