//! SSE framing helpers for C9. Encoding reuses `tokio_sse_codec::SseEncoder`, mirroring the
//! `EventStreamCodec`/`SseEncoder` pairing in the teacher's `parse/aws_sse.rs` (there pairing an
//! AWS-eventstream decoder with the same plain-SSE encoder used here). Decoding of the upstream
//! byte stream is hand-rolled: `tokio_sse_codec`'s decode-side API targets the AWS eventstream
//! binary framing in the teacher's use, not plain-text SSE, so a small line-oriented parser is
//! used instead of guessing an unverified symbol surface.

use std::borrow::Cow;

use bytes::{Bytes, BytesMut};
use tokio_sse_codec::{Event, Frame, SseEncoder};
use tokio_util::codec::Encoder;

/// Serialize `data` as a single `data:`-framed SSE event, optionally named (`event: <name>`).
pub fn encode_event(data: Bytes, name: Option<&str>) -> Bytes {
	let mut encoder = SseEncoder::new();
	let mut buf = BytesMut::new();
	let frame = Frame::Event(Event {
		data,
		name: name.map(Cow::Borrowed).unwrap_or(Cow::Borrowed("")),
		id: None,
	});
	encoder
		.encode(frame, &mut buf)
		.expect("in-memory SSE encoding is infallible");
	buf.freeze()
}

/// Serialize a JSON value as a single SSE `data:` event.
pub fn encode_json_event(value: &serde_json::Value) -> Bytes {
	encode_event(Bytes::from(serde_json::to_vec(value).unwrap_or_default()), None)
}

/// The literal `data: [DONE]\n\n` sentinel OpenAI-shaped streams terminate with.
pub fn done_sentinel() -> Bytes {
	Bytes::from_static(b"data: [DONE]\n\n")
}

/// One decoded upstream SSE event: an optional `event:` name and the `data:` payload (multiple
/// `data:` lines within one event are joined with `\n`, per the SSE spec).
#[derive(Debug, Clone)]
pub struct RawSseEvent {
	pub name: Option<String>,
	pub data: String,
}

/// Incremental line-oriented SSE decoder. Feed raw upstream bytes via [`Self::push`]; complete
/// events (terminated by a blank line) are drained via [`Self::pop_event`].
#[derive(Default)]
pub struct SseDecoder {
	buf: String,
	pending_name: Option<String>,
	pending_data: Vec<String>,
}

impl SseDecoder {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn push(&mut self, chunk: &[u8]) {
		self.buf.push_str(&String::from_utf8_lossy(chunk));
	}

	/// Pop the next complete event, if the buffered bytes contain one. Returns `None` when more
	/// bytes are needed; call repeatedly after each [`Self::push`] to drain all complete events.
	pub fn pop_event(&mut self) -> Option<RawSseEvent> {
		loop {
			let Some(newline_pos) = self.buf.find('\n') else {
				return None;
			};
			let line = self.buf[..newline_pos].trim_end_matches('\r').to_string();
			self.buf.drain(..=newline_pos);

			if line.is_empty() {
				if self.pending_data.is_empty() && self.pending_name.is_none() {
					continue;
				}
				let event = RawSseEvent {
					name: self.pending_name.take(),
					data: self.pending_data.join("\n"),
				};
				self.pending_data.clear();
				return Some(event);
			}
			if let Some(rest) = line.strip_prefix("event:") {
				self.pending_name = Some(rest.trim().to_string());
			} else if let Some(rest) = line.strip_prefix("data:") {
				self.pending_data.push(rest.trim_start().to_string());
			}
			// Other fields (id:, retry:, comments) are intentionally ignored; no consumer needs them.
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn decodes_a_single_event_split_across_pushes() {
		let mut dec = SseDecoder::new();
		dec.push(b"event: message_start\ndata: {\"a\":1");
		assert!(dec.pop_event().is_none());
		dec.push(b"}\n\n");
		let ev = dec.pop_event().expect("event should be complete");
		assert_eq!(ev.name.as_deref(), Some("message_start"));
		assert_eq!(ev.data, r#"{"a":1}"#);
		assert!(dec.pop_event().is_none());
	}

	#[test]
	fn decodes_multiple_data_lines_joined_with_newline() {
		let mut dec = SseDecoder::new();
		dec.push(b"data: line one\ndata: line two\n\n");
		let ev = dec.pop_event().unwrap();
		assert_eq!(ev.data, "line one\nline two");
	}

	#[test]
	fn decodes_back_to_back_events_from_one_push() {
		let mut dec = SseDecoder::new();
		dec.push(b"data: first\n\ndata: second\n\n");
		assert_eq!(dec.pop_event().unwrap().data, "first");
		assert_eq!(dec.pop_event().unwrap().data, "second");
		assert!(dec.pop_event().is_none());
	}
}
