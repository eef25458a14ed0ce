//! Line-delimited event stream reading shared by all streaming providers.
//!
//! Bytes are split into lines, `data:` payloads are handed to a provider
//! specific handler, and text fragments are collected in a
//! [`StreamAccumulator`]. Cancellation is checked before every payload.

use crate::error::CompletionError;
use futures_util::StreamExt;
use std::ops::ControlFlow;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Longest line accepted from a stream before it is treated as broken.
pub(crate) const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into lines without breaking multi-byte characters
/// across network chunks.
#[derive(Debug, Default)]
pub(crate) struct LineDecoder {
    buffer: Vec<u8>,
    /// Bytes of `buffer` already known to contain no newline.
    scanned: usize,
}

impl LineDecoder {
    /// Feed bytes and return every line they complete.
    ///
    /// Fails once an unterminated line grows past [`MAX_LINE_BYTES`].
    pub(crate) fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, CompletionError> {
        self.buffer.extend_from_slice(bytes);

        let mut lines = Vec::new();
        let mut start = 0;
        let mut scan = self.scanned;
        while let Some(offset) = self.buffer[scan..].iter().position(|&b| b == b'\n') {
            let end = scan + offset;
            lines.push(decode_line(&self.buffer[start..end]));
            start = end + 1;
            scan = start;
        }
        self.buffer.drain(..start);
        self.scanned = self.buffer.len();

        if self.buffer.len() > MAX_LINE_BYTES {
            return Err(CompletionError::network(format!(
                "Stream line exceeds {MAX_LINE_BYTES} bytes"
            )));
        }
        Ok(lines)
    }

    /// Flush a trailing line that had no terminating newline.
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            return None;
        }
        self.scanned = 0;
        let raw = std::mem::take(&mut self.buffer);
        Some(decode_line(&raw))
    }
}

fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

/// Payload of an SSE `data:` line, if this is one.
pub(crate) fn data_payload(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("data:")?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Owns the text of one streaming request and forwards fragments to the
/// caller's chunk callback.
pub(crate) struct StreamAccumulator<'a> {
    text: String,
    on_chunk: &'a mut (dyn FnMut(&str) + Send),
}

impl<'a> StreamAccumulator<'a> {
    pub(crate) fn new(on_chunk: &'a mut (dyn FnMut(&str) + Send)) -> Self {
        Self {
            text: String::new(),
            on_chunk,
        }
    }

    /// Append a text fragment and deliver it. Empty fragments are dropped.
    pub(crate) fn push(&mut self, fragment: &str) {
        if fragment.is_empty() {
            return;
        }
        self.text.push_str(fragment);
        (self.on_chunk)(fragment);
    }

    /// Record an abnormal finish reason in the output.
    pub(crate) fn annotate_finish(&mut self, reason: &str) {
        tracing::debug!(reason, "Stream finished abnormally");
        self.push(&format!(" [finish_reason: {reason}]"));
    }

    pub(crate) fn text(&self) -> &str {
        &self.text
    }

    /// Final result: blank output is never a success.
    pub(crate) fn into_result(self) -> Result<String, CompletionError> {
        if self.text.trim().is_empty() {
            Err(CompletionError::EmptyResponse)
        } else {
            Ok(self.text)
        }
    }
}

/// Read `data:` payloads from a streaming response until the handler breaks,
/// the body ends, or the token is cancelled.
///
/// A body that sends nothing for `idle_timeout` fails as a transport error.
///
/// Handler results:
/// - `Ok(Continue)` keeps reading, `Ok(Break)` ends the stream normally
/// - `Err(MalformedChunk)` is logged and skipped
/// - any other error ends the stream with that error
///
/// Errors returned here carry no partial text; the caller attaches it.
pub(crate) async fn read_data_lines<F>(
    response: reqwest::Response,
    cancel: &CancellationToken,
    idle_timeout: Duration,
    mut handle: F,
) -> Result<(), CompletionError>
where
    F: FnMut(&str) -> Result<ControlFlow<()>, CompletionError>,
{
    let mut body = response.bytes_stream();
    let mut decoder = LineDecoder::default();

    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                return Err(CompletionError::Cancelled { partial: String::new() });
            }
            next = tokio::time::timeout(idle_timeout, body.next()) => match next {
                Ok(next) => next,
                Err(_) => {
                    tracing::warn!(idle_ms = idle_timeout.as_millis() as u64, "Stream stalled");
                    return Err(CompletionError::network(format!(
                        "No data received for {} ms",
                        idle_timeout.as_millis()
                    )));
                }
            },
        };

        let lines = match next {
            Some(Ok(bytes)) => decoder.push(&bytes)?,
            Some(Err(e)) => return Err(CompletionError::network(e)),
            None => {
                if let Some(line) = decoder.finish() {
                    if let ControlFlow::Break(()) = dispatch_line(&line, cancel, &mut handle)? {
                        return Ok(());
                    }
                }
                return Ok(());
            }
        };

        for line in lines {
            if let ControlFlow::Break(()) = dispatch_line(&line, cancel, &mut handle)? {
                return Ok(());
            }
        }
    }
}

fn dispatch_line<F>(
    line: &str,
    cancel: &CancellationToken,
    handle: &mut F,
) -> Result<ControlFlow<()>, CompletionError>
where
    F: FnMut(&str) -> Result<ControlFlow<()>, CompletionError>,
{
    if cancel.is_cancelled() {
        return Err(CompletionError::Cancelled {
            partial: String::new(),
        });
    }

    let Some(data) = data_payload(line) else {
        if !line.is_empty() {
            tracing::trace!(line, "Skipping non-data line");
        }
        return Ok(ControlFlow::Continue(()));
    };

    match handle(data) {
        Err(CompletionError::MalformedChunk(message)) => {
            tracing::warn!(%message, chunk = data, "Skipping malformed stream chunk");
            Ok(ControlFlow::Continue(()))
        }
        other => other,
    }
}
