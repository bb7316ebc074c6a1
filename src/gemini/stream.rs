use std::collections::VecDeque;
use std::fmt::Display;
use std::pin::Pin;

use futures_util::{Stream, StreamExt, stream};
use log::{debug, warn};
use serde_json::Value;

use crate::gemini::{ProviderError, TextChunkStream};

/// Adapts a raw SSE response body into a stream of decoded text chunks.
///
/// Frames are relayed as they arrive; nothing is buffered beyond the bytes
/// of the line currently being assembled. A transport error mid-flight is
/// yielded once and terminates the stream; whatever the consumer already
/// received stays flushed.
pub fn relay_sse<S, B, E>(body: S) -> TextChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    struct Relay<S> {
        body: Pin<Box<S>>,
        buf: Vec<u8>,
        pending: VecDeque<String>,
        done: bool,
    }

    let relay = Relay {
        body: Box::pin(body),
        buf: Vec::new(),
        pending: VecDeque::new(),
        done: false,
    };

    Box::pin(stream::unfold(relay, |mut relay| async move {
        loop {
            if let Some(text) = relay.pending.pop_front() {
                return Some((Ok(text), relay));
            }
            if relay.done {
                return None;
            }

            match relay.body.next().await {
                Some(Ok(chunk)) => {
                    relay.buf.extend_from_slice(chunk.as_ref());
                    drain_lines(&mut relay.buf, &mut relay.pending);
                }
                Some(Err(e)) => {
                    relay.done = true;
                    return Some((Err(ProviderError::Stream(e.to_string())), relay));
                }
                None => relay.done = true,
            }
        }
    }))
}

/// Consumes every complete line in `buf`, queueing the decoded text of each
/// `data:` frame. A trailing partial line is left for the next chunk.
fn drain_lines(buf: &mut Vec<u8>, pending: &mut VecDeque<String>) {
    while let Some(newline) = buf.iter().position(|&b| b == b'\n') {
        let line: Vec<u8> = buf.drain(..=newline).collect();
        let line = String::from_utf8_lossy(&line);
        let line = line.trim_end_matches(['\r', '\n']);

        let Some(data) = line.strip_prefix("data:") else {
            continue;
        };
        match frame_text(data.strip_prefix(' ').unwrap_or(data)) {
            Some(text) => pending.push_back(text),
            None => debug!("skipping SSE frame without text content"),
        }
    }
}

/// Extracts the concatenated candidate part texts from one SSE data frame.
fn frame_text(data: &str) -> Option<String> {
    let frame: Value = match serde_json::from_str(data) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("ignoring undecodable SSE frame: {e}");
            return None;
        }
    };

    let parts = frame.pointer("/candidates/0/content/parts")?.as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|part| part.get("text").and_then(Value::as_str))
        .collect();
    (!text.is_empty()).then_some(text)
}
