//! Incremental decoder for assistant run event streams.

use serde_json::Value;

use crate::relay::RunEvent;

const MESSAGE_DELTA: &str = "thread.message.delta";

/// Buffers raw bytes and yields events for every complete frame.
///
/// Frames end with a blank line; partial frames (including split UTF-8
/// sequences) stay buffered until the rest arrives.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk, returning the events completed by it.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<RunEvent> {
        self.buffer.extend_from_slice(chunk);
        let mut events = Vec::new();
        while let Some((end, separator_len)) = frame_boundary(&self.buffer) {
            let frame: Vec<u8> = self.buffer.drain(..end + separator_len).collect();
            events.extend(parse_frame(&String::from_utf8_lossy(&frame[..end])));
        }
        events
    }

    /// Flush a trailing frame that was not terminated by a blank line.
    pub fn finish(&mut self) -> Vec<RunEvent> {
        let rest = std::mem::take(&mut self.buffer);
        let text = String::from_utf8_lossy(&rest);
        if text.trim().is_empty() {
            Vec::new()
        } else {
            parse_frame(&text)
        }
    }
}

fn frame_boundary(buffer: &[u8]) -> Option<(usize, usize)> {
    let lf = buffer.windows(2).position(|window| window == b"\n\n");
    let crlf = buffer.windows(4).position(|window| window == b"\r\n\r\n");
    match (lf, crlf) {
        (Some(lf), Some(crlf)) if crlf < lf => Some((crlf, 4)),
        (Some(lf), _) => Some((lf, 2)),
        (None, Some(crlf)) => Some((crlf, 4)),
        (None, None) => None,
    }
}

/// Translate one `event:`/`data:` frame into run events.
fn parse_frame(frame: &str) -> Vec<RunEvent> {
    let mut event_name: Option<&str> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in frame.lines() {
        let line = line.trim_end_matches('\r');
        if let Some(value) = line.strip_prefix("event:") {
            event_name = Some(value.trim());
        } else if let Some(value) = line.strip_prefix("data:") {
            data_lines.push(value.strip_prefix(' ').unwrap_or(value));
        }
    }

    let data = data_lines.join("\n");
    if data.trim() == "[DONE]" {
        return vec![RunEvent::Done];
    }

    match event_name {
        Some(MESSAGE_DELTA) => message_deltas(&data),
        Some("error") => vec![RunEvent::Error(error_message(&data))],
        Some("done") => vec![RunEvent::Done],
        Some(other) => vec![RunEvent::Other(other.to_string())],
        None if data.is_empty() => Vec::new(),
        None => vec![RunEvent::Other("message".to_string())],
    }
}

fn message_deltas(data: &str) -> Vec<RunEvent> {
    let Ok(payload) = serde_json::from_str::<Value>(data) else {
        return vec![RunEvent::Error("malformed message delta".to_string())];
    };
    payload
        .pointer("/delta/content")
        .and_then(Value::as_array)
        .map(|blocks| {
            blocks
                .iter()
                .filter_map(|block| block.pointer("/text/value").and_then(Value::as_str))
                .map(|text| RunEvent::MessageDelta(text.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn error_message(data: &str) -> String {
    serde_json::from_str::<Value>(data)
        .ok()
        .and_then(|payload| {
            payload
                .pointer("/message")
                .or_else(|| payload.pointer("/error/message"))
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or_else(|| "upstream stream error".to_string())
}
