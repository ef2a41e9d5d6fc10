//! JSONL messages exchanged between a secondary invocation and the primary.
//!
//! The secondary sends one [`Request`] line. The primary answers with zero or
//! more [`Response::Stream`] lines followed by exactly one
//! [`Response::Exit`], or with a lone [`Response::ShuttingDown`] when its
//! event loop has already stopped and the command line was not arbitrated.

use std::io::{self, BufRead, Read, Write};

use serde::{Deserialize, Serialize};

use crate::output::{CommandOutput, StreamTarget};

use super::errors::BrokerError;

const MAX_REQUEST_BYTES: usize = 64 * 1024;
const EMPTY_LINE_LIMIT: usize = 10;

/// Message sent by a secondary invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Request {
    /// Forwarded argument vector, program name first.
    CommandLine {
        /// Arguments after configuration flags were stripped.
        arguments: Vec<String>,
    },
}

/// Message sent back by the primary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Response {
    /// Text the invocation printed.
    Stream {
        /// Destination stream on the secondary.
        stream: StreamTarget,
        /// Text to print.
        data: String,
    },
    /// Final status of the invocation.
    Exit {
        /// Exit status for the secondary process.
        status: i32,
    },
    /// The primary is exiting and did not look at the command line.
    ShuttingDown,
}

/// What became of a forwarded command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Forwarded {
    /// The primary arbitrated it and assigned this exit status.
    Exit(i32),
    /// The primary was exiting; the identity is about to be free.
    ShuttingDown,
}

/// Builds the response sequence for a handled invocation.
#[must_use]
pub fn responses_for(status: i32, output: &CommandOutput) -> Vec<Response> {
    output
        .chunks()
        .iter()
        .map(|chunk| Response::Stream {
            stream: chunk.stream,
            data: chunk.data.clone(),
        })
        .chain(std::iter::once(Response::Exit { status }))
        .collect()
}

/// Serialises `message` as one JSON line.
pub fn write_message<W, T>(writer: &mut W, message: &T) -> io::Result<()>
where
    W: Write,
    T: Serialize,
{
    serde_json::to_writer(&mut *writer, message).map_err(io::Error::other)?;
    writer.write_all(b"\n")?;
    writer.flush()
}

/// Reads one request line of at most 64 KiB; `None` on a closed stream.
pub fn read_request_line<R: Read>(stream: &mut R) -> io::Result<Option<Vec<u8>>> {
    let mut buffer = Vec::new();
    let mut chunk = [0_u8; 1024];
    loop {
        let bytes_read = read_chunk_with_retry(stream, &mut chunk)?;
        if bytes_read == 0 {
            return Ok((!buffer.is_empty()).then_some(buffer));
        }
        if let Some(position) = chunk[..bytes_read].iter().position(|byte| *byte == b'\n') {
            buffer.extend_from_slice(&chunk[..=position]);
            enforce_request_limit(buffer.len())?;
            return Ok(Some(buffer));
        }
        buffer.extend_from_slice(&chunk[..bytes_read]);
        enforce_request_limit(buffer.len())?;
    }
}

fn read_chunk_with_retry<R: Read>(stream: &mut R, chunk: &mut [u8]) -> io::Result<usize> {
    loop {
        match stream.read(chunk) {
            Ok(read) => return Ok(read),
            Err(error) if error.kind() == io::ErrorKind::Interrupted => continue,
            Err(error) => return Err(error),
        }
    }
}

fn enforce_request_limit(length: usize) -> io::Result<()> {
    if length > MAX_REQUEST_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("request exceeds {MAX_REQUEST_BYTES} bytes"),
        ));
    }
    Ok(())
}

/// Parses a request line.
pub fn parse_request(line: &[u8]) -> Result<Request, serde_json::Error> {
    serde_json::from_slice(line)
}

/// Prints forwarded streams and returns what the primary did with the
/// command line.
pub fn relay_responses<R, W, E>(
    connection: &mut R,
    stdout: &mut W,
    stderr: &mut E,
) -> Result<Forwarded, BrokerError>
where
    R: Read,
    W: Write,
    E: Write,
{
    let mut reader = io::BufReader::new(connection);
    let mut line = String::new();
    let mut outcome = None;
    let mut consecutive_empty_lines = 0;

    while reader
        .read_line(&mut line)
        .map_err(|source| BrokerError::ReadResponse { source })?
        != 0
    {
        if line.trim().is_empty() {
            consecutive_empty_lines += 1;
            if consecutive_empty_lines >= EMPTY_LINE_LIMIT {
                break;
            }
            line.clear();
            continue;
        }
        consecutive_empty_lines = 0;

        let message: Response =
            serde_json::from_str(&line).map_err(|source| BrokerError::ParseMessage { source })?;
        match message {
            Response::Stream { stream, data } => match stream {
                StreamTarget::Stdout => stdout.write_all(data.as_bytes()),
                StreamTarget::Stderr => stderr.write_all(data.as_bytes()),
            }
            .map_err(|source| BrokerError::ForwardOutput { source })?,
            Response::Exit { status } => outcome = Some(Forwarded::Exit(status)),
            Response::ShuttingDown => outcome = Some(Forwarded::ShuttingDown),
        }
        line.clear();
    }

    stdout
        .flush()
        .map_err(|source| BrokerError::ForwardOutput { source })?;
    stderr
        .flush()
        .map_err(|source| BrokerError::ForwardOutput { source })?;

    outcome.ok_or(BrokerError::MissingExit)
}
