//! Incremental decoder for `text/event-stream` bodies.

use futures::stream::{self, Stream, StreamExt};

use crate::error::ImportError;

/// Splits a chunked SSE body into the `data` payload of each event.
///
/// Only `data:` fields are kept; `event`, `id`, `retry` and comment lines are
/// dropped. An event without data is not dispatched.
#[derive(Debug, Default)]
pub struct SseDecoder {
    /// Bytes of the current, not yet terminated line.
    line: Vec<u8>,
    /// `data` lines collected for the event being built.
    data: Vec<String>,
}

impl SseDecoder {
    /// Feed one body chunk and return every event payload it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut out = Vec::new();
        for &b in chunk {
            if b == b'\n' {
                let mut line = std::mem::take(&mut self.line);
                if line.last() == Some(&b'\r') {
                    line.pop();
                }
                if let Some(payload) = self.process_line(&String::from_utf8_lossy(&line)) {
                    out.push(payload);
                }
            } else {
                self.line.push(b);
            }
        }
        out
    }

    fn process_line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            // blank line terminates the event
            if self.data.is_empty() {
                return None;
            }
            let payload = self.data.join("\n");
            self.data.clear();
            return Some(payload);
        }
        if line.starts_with(':') {
            return None;
        }
        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }
}

/// Adapt a byte stream into a stream of event payloads.
///
/// A chunk error is surfaced as [`ImportError::Transport`].
pub fn data_frames<S, B, E>(bytes: S) -> impl Stream<Item = Result<String, ImportError>>
where
    S: Stream<Item = Result<B, E>>,
    B: AsRef<[u8]>,
    E: std::fmt::Display,
{
    let mut decoder = SseDecoder::default();
    bytes.flat_map(move |chunk| {
        let items: Vec<Result<String, ImportError>> = match chunk {
            Ok(c) => decoder.push(c.as_ref()).into_iter().map(Ok).collect(),
            Err(e) => vec![Err(ImportError::Transport(e.to_string()))],
        };
        stream::iter(items)
    })
}
