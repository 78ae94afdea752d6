//! Streaming Proxy (C9): pipes an upstream HTTP response to the client without buffering beyond
//! a small bounded channel, translating SSE events chunk-by-chunk when source_format !=
//! target_format, and emitting hook events. Concurrency follows the Design Note in spec.md §9
//! ("map to native tasks + channels: one task per I/O direction... fire-and-forget for hook
//! subscribers"): an upstream-reader task feeds a bounded `mpsc` channel that axum drains as the
//! response body; hook emission for the terminal events is fire-and-forget on a spawned task so
//! a slow subscriber never stalls the data path.

pub mod server;
pub mod sse;

use std::sync::Arc;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::context::RequestContext;
use crate::error::CcproxyError;
use crate::hooks::{EventKind, HookBus, HookContext};
use crate::proxy::sse::{RawSseEvent, SseDecoder};

/// Channel capacity for the upstream-reader -> downstream-writer pipe, per spec.md §4.9/§5
/// ("size ≥ 16, ≤ 256 chunks").
const CHANNEL_CAPACITY: usize = 64;

/// How the upstream byte stream is turned into client-bound SSE bytes.
pub enum ChunkTransform {
	/// `source_format == target_format`: forward upstream bytes unchanged, byte-for-byte
	/// (spec.md §4.9).
	Passthrough,
	/// Each parsed upstream SSE event is fed through the format translator, producing zero or
	/// more pre-encoded target-format SSE byte sequences.
	Translate(Box<dyn FnMut(RawSseEvent) -> Vec<Bytes> + Send>),
}

/// Drives one upstream streaming response to completion, returning the `axum` response body and
/// spawning the reader/hook-emitter tasks described above. `on_error_event` synthesizes a
/// terminal error event in the target format when the upstream connection fails mid-stream
/// (spec.md §4.9, §7: "the client never sees a dangling connection").
pub fn stream_response(
	ctx: Arc<RequestContext>,
	hooks: HookBus,
	mut upstream: reqwest::Response,
	mut transform: ChunkTransform,
	on_error_event: impl Fn(&str) -> Bytes + Send + 'static,
) -> axum::body::Body {
	let (tx, rx) = mpsc::channel::<Bytes>(CHANNEL_CAPACITY);

	tokio::spawn(async move {
		let mut decoder = SseDecoder::new();
		let mut collected = Vec::new();
		let mut failed_reason: Option<String> = None;

		loop {
			let next = tokio::select! {
				biased;
				_ = ctx.cancel.cancelled() => {
					failed_reason = Some("client_disconnected".to_string());
					break;
				}
				chunk = upstream.chunk() => chunk,
			};

			let bytes = match next {
				Ok(Some(bytes)) => bytes,
				Ok(None) => break,
				Err(e) => {
					failed_reason = Some(e.to_string());
					let err_bytes = on_error_event(&e.to_string());
					collected.extend_from_slice(&err_bytes);
					if tx.send(err_bytes).await.is_err() {
						ctx.cancel.cancel();
					}
					break;
				},
			};

			match &mut transform {
				ChunkTransform::Passthrough => {
					collected.extend_from_slice(&bytes);
					if tx.send(bytes).await.is_err() {
						ctx.cancel.cancel();
						failed_reason = Some("client_disconnected".to_string());
						break;
					}
				},
				ChunkTransform::Translate(f) => {
					decoder.push(&bytes);
					while let Some(event) = decoder.pop_event() {
						for out in f(event) {
							collected.extend_from_slice(&out);
							if tx.send(out).await.is_err() {
								ctx.cancel.cancel();
								failed_reason = Some("client_disconnected".to_string());
								break;
							}
						}
						if ctx.cancel.is_cancelled() {
							break;
						}
					}
				},
			}
			if ctx.cancel.is_cancelled() {
				break;
			}
		}
		drop(tx);

		finish_stream(&ctx, &hooks, collected, failed_reason).await;
	});

	let stream = tokio_stream::wrappers::ReceiverStream::new(rx).map(Ok::<_, std::io::Error>);
	axum::body::Body::from_stream(stream)
}

use futures_util::StreamExt as _;

async fn finish_stream(ctx: &RequestContext, hooks: &HookBus, collected: Vec<Bytes>, failed_reason: Option<String>) {
	let body_text = collected
		.iter()
		.map(|b| String::from_utf8_lossy(b))
		.collect::<Vec<_>>()
		.join("");

	hooks
		.emit(
			HookContext::new(
				EventKind::HttpResponse,
				ctx,
				serde_json::json!({ "streamed": true, "body": body_text }),
			),
			Some(ctx),
		)
		.await;

	match failed_reason {
		Some(reason) => {
			hooks
				.emit(
					HookContext::new(EventKind::RequestFailed, ctx, serde_json::json!({ "error": reason })),
					Some(ctx),
				)
				.await;
		},
		None => {
			let metadata = ctx.metadata_snapshot();
			hooks
				.emit(
					HookContext::new(
						EventKind::RequestCompleted,
						ctx,
						serde_json::json!({
							"duration_ms": ctx.duration_ms(),
							"tokens_input": metadata.tokens_input,
							"tokens_output": metadata.tokens_output,
							"cost_usd": metadata.cost_usd,
						}),
					),
					Some(ctx),
				)
				.await;
		},
	}
}

/// Build the error envelope JSON for a mid-stream upstream failure; callers in [`server`] wrap
/// this per target format (Anthropic `error` event vs an OpenAI-shaped terminal chunk).
pub fn upstream_error_message(err: &CcproxyError) -> String {
	err.to_string()
}
