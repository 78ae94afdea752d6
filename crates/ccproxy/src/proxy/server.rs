//! Request Router (C10): the routing table from spec.md §4.10, wired to an `axum::Router`.
//! For each request: authenticate the client (C3) → build a `RequestContext` (C6) → validate
//! and translate the request (C5) → resolve the provider's access token (C2/C3) → apply the
//! adapter's header/body transforms (C8) → invoke the streaming proxy (C9) or buffer a
//! single JSON response → translate back to `source_format` → write to the client.

use std::sync::Arc;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use bytes::Bytes;

use crate::auth::manager::AuthManager;
use crate::context::{self, RequestContext};
use crate::error::CcproxyError;
use crate::formats::anthropic::{self, typed::StreamEvent as AStreamEvent};
use crate::formats::openai_chat::{self as chat};
use crate::formats::openai_responses::{self as responses, StreamEvent as RStreamEvent};
use crate::formats::{Format, RequestType, ResponseType};
use crate::hooks::{EventKind, HookBus, HookContext};
use crate::providers::ProviderAdapter;
use crate::proxy::sse::{self, RawSseEvent};
use crate::proxy::ChunkTransform;
use crate::translate::{anthropic_chat, anthropic_responses, chat_responses};

pub struct AppState {
	pub http: reqwest::Client,
	pub hooks: HookBus,
	pub auth: Arc<AuthManager>,
	pub anthropic: Arc<dyn ProviderAdapter>,
	pub anthropic_passthrough: Arc<dyn ProviderAdapter>,
	pub openai_chat: Arc<dyn ProviderAdapter>,
	pub openai_responses: Arc<dyn ProviderAdapter>,
	pub copilot: Arc<dyn ProviderAdapter>,
	pub claude_code: Arc<dyn ProviderAdapter>,
	/// spec.md §6 `LLM__OPENAI_THINKING_XML`: whether OpenAI-Responses reasoning deltas are
	/// serialized as `<thinking signature="…">` text for Chat/Anthropic consumers.
	pub openai_thinking_xml: bool,
}

#[derive(Clone)]
struct RouteSpec {
	source_format: Format,
	target_format: Format,
	adapter: Arc<dyn ProviderAdapter>,
}

/// Registers one route at `path`, resolving its `RouteSpec` from shared state via `pick` on
/// every request so the table below stays a flat list of (path, format triple) entries.
fn route(router: Router<Arc<AppState>>, path: &str, pick: fn(&AppState) -> RouteSpec) -> Router<Arc<AppState>> {
	router.route(
		path,
		post(move |State(state): State<Arc<AppState>>, headers: HeaderMap, body: Bytes| {
			let spec = pick(&state);
			dispatch(state, spec, headers, body)
		}),
	)
}

pub fn build_router(state: AppState) -> Router {
	let router = Router::new();
	let router = route(router, "/v1/messages", |s| RouteSpec {
		source_format: Format::Anthropic,
		target_format: Format::Anthropic,
		adapter: s.anthropic.clone(),
	});
	let router = route(router, "/v1/chat/completions", |s| RouteSpec {
		source_format: Format::OpenAiChat,
		target_format: Format::Anthropic,
		adapter: s.anthropic.clone(),
	});
	let router = route(router, "/v1/responses", |s| RouteSpec {
		source_format: Format::OpenAiResponses,
		target_format: Format::Anthropic,
		adapter: s.anthropic.clone(),
	});
	let router = route(router, "/openai/v1/chat/completions", |s| RouteSpec {
		source_format: Format::OpenAiChat,
		target_format: Format::OpenAiChat,
		adapter: s.openai_chat.clone(),
	});
	let router = route(router, "/claude/v1/messages", |s| RouteSpec {
		source_format: Format::Anthropic,
		target_format: Format::Anthropic,
		adapter: s.claude_code.clone(),
	});
	let router = route(router, "/codex/v1/chat/completions", |s| RouteSpec {
		source_format: Format::OpenAiChat,
		target_format: Format::OpenAiChat,
		adapter: s.openai_chat.clone(),
	});
	let router = route(router, "/codex/v1/responses", |s| RouteSpec {
		source_format: Format::OpenAiResponses,
		target_format: Format::OpenAiResponses,
		adapter: s.openai_responses.clone(),
	});
	let router = route(router, "/copilot/v1/chat/completions", |s| RouteSpec {
		source_format: Format::OpenAiChat,
		target_format: Format::OpenAiChat,
		adapter: s.copilot.clone(),
	});
	let router = route(router, "/unclaude/v1/messages", |s| RouteSpec {
		source_format: Format::Anthropic,
		target_format: Format::Anthropic,
		adapter: s.anthropic_passthrough.clone(),
	});
	router.with_state(Arc::new(state))
}

fn error_response(format: Format, request_id: &str, err: CcproxyError) -> Response {
	let mut headers = HeaderMap::new();
	if matches!(err, CcproxyError::AuthError) {
		headers.insert("WWW-Authenticate", "Bearer".parse().unwrap());
	}
	if let Ok(value) = request_id.parse() {
		headers.insert("X-Request-ID", value);
	}
	(err.status(), headers, Json(err.to_envelope(format))).into_response()
}

fn request_id_from(headers: &HeaderMap) -> String {
	headers
		.get("x-request-id")
		.and_then(|v| v.to_str().ok())
		.map(String::from)
		.unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

async fn dispatch(state: Arc<AppState>, spec: RouteSpec, headers: HeaderMap, body: Bytes) -> Response {
	let request_id = request_id_from(&headers);
	let bearer = headers
		.get(axum::http::header::AUTHORIZATION)
		.and_then(|v| v.to_str().ok())
		.and_then(|v| v.strip_prefix("Bearer "));

	if let Err(e) = state.auth.authenticate_client(bearer) {
		return error_response(spec.source_format, &request_id, e);
	}

	let ctx = Arc::new(RequestContext::new(
		request_id.clone(),
		axum::http::Method::POST,
		String::new(),
		None,
		headers
			.get(axum::http::header::USER_AGENT)
			.and_then(|v| v.to_str().ok())
			.map(String::from),
		spec.source_format,
		spec.target_format,
		spec.adapter.name(),
	));

	context::scope(ctx.clone(), handle_request(state, spec, ctx, body)).await
}

async fn handle_request(state: Arc<AppState>, spec: RouteSpec, ctx: Arc<RequestContext>, body: Bytes) -> Response {
	state
		.hooks
		.emit(
			HookContext::new(EventKind::HttpRequest, ctx.as_ref(), serde_json::json!({ "path": ctx.path })),
			Some(ctx.as_ref()),
		)
		.await;

	match run_request(&state, &spec, &ctx, body).await {
		Ok(response) => response,
		Err(err) => {
			state
				.hooks
				.emit(
					HookContext::new(
						EventKind::RequestFailed,
						ctx.as_ref(),
						serde_json::json!({ "error": err.to_string() }),
					),
					Some(ctx.as_ref()),
				)
				.await;
			error_response(spec.source_format, &ctx.request_id, err)
		},
	}
}

async fn run_request(
	state: &Arc<AppState>,
	spec: &RouteSpec,
	ctx: &Arc<RequestContext>,
	body: Bytes,
) -> Result<Response, CcproxyError> {
	let (target_bytes, is_streaming) = build_upstream_request(spec, &body)?;

	let access_token = state
		.auth
		.capability_for_adapter(spec.adapter.name())?
		.get_access_token()
		.await?;

	let url = format!("{}{}", spec.adapter.base_url(), spec.adapter.upstream_path());
	let builder = spec.adapter.apply_headers(state.http.post(&url), &access_token);
	let upstream = builder.body(target_bytes).send().await.map_err(|e| CcproxyError::UpstreamHttpError {
		status: e.status().unwrap_or(http::StatusCode::BAD_GATEWAY),
		body: e.to_string(),
	})?;

	if !upstream.status().is_success() {
		let status = upstream.status();
		let body = upstream.text().await.unwrap_or_default();
		return Err(CcproxyError::UpstreamHttpError { status, body });
	}

	if is_streaming {
		Ok(stream_body(state, spec, ctx, upstream))
	} else {
		buffer_response(state, spec, ctx, upstream).await
	}
}

/// Deserialize + validate the ingress body in `source_format`, translate to `target_format`
/// (skipped when the two are equal, per spec.md §4.9's byte-exact passthrough rule), apply the
/// adapter's model alias and system-prompt injection, and serialize the result.
fn build_upstream_request(spec: &RouteSpec, body: &[u8]) -> Result<(Vec<u8>, bool), CcproxyError> {
	match (spec.source_format, spec.target_format) {
		(Format::Anthropic, Format::Anthropic) => {
			let mut req: anthropic::Request =
				serde_json::from_slice(body).map_err(|e| CcproxyError::InputError(e.to_string()))?;
			req.validate()?;
			let streaming = req.is_streaming();
			req.model = spec.adapter.alias_model(&req.model);
			spec.adapter.inject_system_prompt(&mut req);
			Ok((req.serialize()?, streaming))
		},
		(Format::OpenAiChat, Format::OpenAiChat) => {
			let mut req: chat::Request = serde_json::from_slice(body).map_err(|e| CcproxyError::InputError(e.to_string()))?;
			req.validate()?;
			let streaming = req.is_streaming();
			req.model = spec.adapter.alias_model(&req.model);
			Ok((req.serialize()?, streaming))
		},
		(Format::OpenAiResponses, Format::OpenAiResponses) => {
			let mut req: responses::Request =
				serde_json::from_slice(body).map_err(|e| CcproxyError::InputError(e.to_string()))?;
			req.validate()?;
			let streaming = req.is_streaming();
			if let Some(model) = &req.model {
				req.model = Some(spec.adapter.alias_model(model));
			}
			Ok((req.serialize()?, streaming))
		},
		(Format::OpenAiChat, Format::Anthropic) => {
			let chat_req: chat::Request = serde_json::from_slice(body).map_err(|e| CcproxyError::InputError(e.to_string()))?;
			chat_req.validate()?;
			let streaming = chat_req.is_streaming();
			let mut req = anthropic_chat::chat_to_anthropic(&chat_req)?;
			req.model = spec.adapter.alias_model(&req.model);
			spec.adapter.inject_system_prompt(&mut req);
			Ok((req.serialize()?, streaming))
		},
		(Format::OpenAiResponses, Format::Anthropic) => {
			let r_req: responses::Request = serde_json::from_slice(body).map_err(|e| CcproxyError::InputError(e.to_string()))?;
			r_req.validate()?;
			let streaming = r_req.is_streaming();
			let mut req = anthropic_responses::responses_to_anthropic(&r_req)?;
			req.model = spec.adapter.alias_model(&req.model);
			spec.adapter.inject_system_prompt(&mut req);
			Ok((req.serialize()?, streaming))
		},
		(src, tgt) => Err(CcproxyError::UnsupportedConversion(format!(
			"no route wires {src:?} -> {tgt:?}"
		))),
	}
}

fn stream_body(state: &Arc<AppState>, spec: &RouteSpec, ctx: &Arc<RequestContext>, upstream: reqwest::Response) -> Response {
	let transform = match (spec.target_format, spec.source_format) {
		(a, b) if a == b => ChunkTransform::Passthrough,
		(Format::Anthropic, Format::OpenAiChat) => {
			let mut st = anthropic_chat::ChatStreamState::default();
			ChunkTransform::Translate(Box::new(move |event| {
				let Some(parsed) = parse_anthropic_event(&event) else {
					return vec![];
				};
				let is_stop = matches!(parsed, AStreamEvent::MessageStop);
				let mut out: Vec<Bytes> = anthropic_chat::translate_anthropic_stream_to_chat(&mut st, &parsed)
					.iter()
					.map(encode_chat_event)
					.collect();
				if is_stop {
					out.push(sse::done_sentinel());
				}
				out
			}))
		},
		(Format::Anthropic, Format::OpenAiResponses) => {
			let mut st = anthropic_responses::ResponsesFromAnthropicState::default();
			let thinking_xml = state.openai_thinking_xml;
			ChunkTransform::Translate(Box::new(move |event| {
				let Some(parsed) = parse_anthropic_event(&event) else {
					return vec![];
				};
				anthropic_responses::translate_anthropic_stream_to_responses(&mut st, &parsed, thinking_xml)
					.iter()
					.map(encode_responses_event)
					.collect()
			}))
		},
		(Format::OpenAiChat, Format::Anthropic) => {
			let mut st = anthropic_chat::ChatToAnthropicState::default();
			ChunkTransform::Translate(Box::new(move |event| {
				let Some(chunk) = parse_chat_event(&event) else {
					return vec![];
				};
				anthropic_chat::translate_chat_stream_to_anthropic(&mut st, &chunk)
					.iter()
					.map(encode_anthropic_event)
					.collect()
			}))
		},
		(Format::OpenAiResponses, Format::Anthropic) => {
			let mut st = anthropic_responses::AnthropicFromResponsesState::default();
			let thinking_xml = state.openai_thinking_xml;
			ChunkTransform::Translate(Box::new(move |event| {
				let Some(parsed) = parse_responses_event(&event) else {
					return vec![];
				};
				anthropic_responses::translate_responses_stream_to_anthropic(&mut st, &parsed, thinking_xml)
					.iter()
					.map(encode_anthropic_event)
					.collect()
			}))
		},
		(Format::OpenAiChat, Format::OpenAiResponses) => {
			let mut st = chat_responses::ResponsesFromChatState::default();
			let thinking_xml = state.openai_thinking_xml;
			ChunkTransform::Translate(Box::new(move |event| {
				let Some(chunk) = parse_chat_event(&event) else {
					return vec![];
				};
				chat_responses::translate_chat_stream_to_responses(&mut st, &chunk, thinking_xml)
					.iter()
					.map(encode_responses_event)
					.collect()
			}))
		},
		(Format::OpenAiResponses, Format::OpenAiChat) => {
			let mut st = chat_responses::ChatFromResponsesState::default();
			let thinking_xml = state.openai_thinking_xml;
			ChunkTransform::Translate(Box::new(move |event| {
				let Some(parsed) = parse_responses_event(&event) else {
					return vec![];
				};
				let chunks = chat_responses::translate_responses_stream_to_chat(&mut st, &parsed, thinking_xml);
				let is_done = matches!(parsed, RStreamEvent::Completed { .. } | RStreamEvent::Failed { .. });
				let mut out: Vec<Bytes> = chunks.iter().map(encode_chat_event).collect();
				if is_done {
					out.push(sse::done_sentinel());
				}
				out
			}))
		},
	};

	let source_format = spec.source_format;
	let body = crate::proxy::stream_response(ctx.clone(), state.hooks.clone(), upstream, transform, move |message| {
		synthesize_error_event(source_format, message)
	});
	Response::builder()
		.status(StatusCode::OK)
		.header("content-type", "text/event-stream")
		.header("X-Request-ID", ctx.request_id.clone())
		.body(body)
		.unwrap_or_else(|_| StatusCode::INTERNAL_SERVER_ERROR.into_response())
}

fn parse_anthropic_event(event: &RawSseEvent) -> Option<AStreamEvent> {
	serde_json::from_str(&event.data).ok()
}

fn parse_chat_event(event: &RawSseEvent) -> Option<chat::StreamChunk> {
	if event.data.trim() == "[DONE]" {
		return None;
	}
	serde_json::from_str(&event.data).ok()
}

fn parse_responses_event(event: &RawSseEvent) -> Option<RStreamEvent> {
	serde_json::from_str(&event.data).ok()
}

fn encode_anthropic_event(event: &AStreamEvent) -> Bytes {
	sse::encode_json_event(&serde_json::to_value(event).unwrap_or(serde_json::Value::Null))
}

fn encode_chat_event(chunk: &chat::StreamChunk) -> Bytes {
	sse::encode_json_event(&serde_json::to_value(chunk).unwrap_or(serde_json::Value::Null))
}

fn encode_responses_event(event: &RStreamEvent) -> Bytes {
	sse::encode_json_event(&serde_json::to_value(event).unwrap_or(serde_json::Value::Null))
}

/// Synthesize a terminal error event in `format` when the upstream connection fails mid-stream,
/// per spec.md §4.9/§7 ("the client never sees a dangling connection").
fn synthesize_error_event(format: Format, message: &str) -> Bytes {
	match format {
		Format::Anthropic => encode_anthropic_event(&AStreamEvent::Error {
			error: crate::formats::anthropic::typed::StreamErrorBody {
				kind: "api_error".to_string(),
				message: message.to_string(),
			},
		}),
		Format::OpenAiChat => {
			let mut bytes = encode_chat_event(&chat::StreamChunk {
				id: "error".to_string(),
				object: "chat.completion.chunk",
				model: String::new(),
				choices: vec![chat::StreamChoice {
					index: 0,
					delta: chat::StreamDelta {
						content: Some(format!("[error: {message}]")),
						..Default::default()
					},
					finish_reason: Some(async_openai::types::FinishReason::Stop),
				}],
				usage: None,
			})
			.to_vec();
			bytes.extend_from_slice(&sse::done_sentinel());
			Bytes::from(bytes)
		},
		Format::OpenAiResponses => encode_responses_event(&RStreamEvent::Failed {
			response: Box::new(responses::Response {
				id: "error".to_string(),
				status: "failed".to_string(),
				output: vec![],
				model: String::new(),
				usage: None,
				rest: serde_json::json!({ "error": message }),
			}),
		}),
	}
}

async fn buffer_response(
	state: &Arc<AppState>,
	spec: &RouteSpec,
	ctx: &Arc<RequestContext>,
	upstream: reqwest::Response,
) -> Result<Response, CcproxyError> {
	let bytes = upstream.bytes().await.map_err(|_| CcproxyError::UpstreamTimeout)?;

	let (body_json, usage) = translate_non_stream(spec, &bytes)?;
	ctx.update_metadata(|m| {
		m.tokens_input = usage.prompt_tokens;
		m.tokens_output = usage.completion_tokens;
		m.cache_read_tokens = usage.cache_read_tokens;
		m.cache_write_tokens = usage.cache_write_tokens;
		m.reasoning_tokens = usage.reasoning_tokens;
	});

	state
		.hooks
		.emit(
			HookContext::new(EventKind::HttpResponse, ctx.as_ref(), serde_json::json!({ "streamed": false })),
			Some(ctx.as_ref()),
		)
		.await;
	state
		.hooks
		.emit(
			HookContext::new(
				EventKind::RequestCompleted,
				ctx.as_ref(),
				serde_json::json!({ "duration_ms": ctx.duration_ms() }),
			),
			Some(ctx.as_ref()),
		)
		.await;

	Ok((StatusCode::OK, [("X-Request-ID", ctx.request_id.clone())], Json(body_json)).into_response())
}

fn translate_non_stream(spec: &RouteSpec, bytes: &[u8]) -> Result<(serde_json::Value, crate::formats::Usage), CcproxyError> {
	match (spec.target_format, spec.source_format) {
		(Format::Anthropic, Format::Anthropic) => {
			let r: anthropic::Response = serde_json::from_slice(bytes).map_err(|e| CcproxyError::TranslationError(e.to_string()))?;
			let usage = r.usage();
			let value = serde_json::to_value(&r).map_err(|e| CcproxyError::TranslationError(e.to_string()))?;
			Ok((value, usage))
		},
		(Format::OpenAiChat, Format::OpenAiChat) => {
			let r: chat::Response = serde_json::from_slice(bytes).map_err(|e| CcproxyError::TranslationError(e.to_string()))?;
			let usage = r.usage();
			let value = serde_json::to_value(&r).map_err(|e| CcproxyError::TranslationError(e.to_string()))?;
			Ok((value, usage))
		},
		(Format::OpenAiResponses, Format::OpenAiResponses) => {
			let r: responses::Response = serde_json::from_slice(bytes).map_err(|e| CcproxyError::TranslationError(e.to_string()))?;
			let usage = r.usage();
			let value = serde_json::to_value(&r).map_err(|e| CcproxyError::TranslationError(e.to_string()))?;
			Ok((value, usage))
		},
		(Format::Anthropic, Format::OpenAiChat) => {
			let upstream: anthropic::Response = serde_json::from_slice(bytes).map_err(|e| CcproxyError::TranslationError(e.to_string()))?;
			let usage = upstream.usage();
			let converted = anthropic_chat::anthropic_response_to_chat(&upstream);
			Ok((
				serde_json::to_value(&converted).map_err(|e| CcproxyError::TranslationError(e.to_string()))?,
				usage,
			))
		},
		(Format::Anthropic, Format::OpenAiResponses) => {
			let upstream: anthropic::Response = serde_json::from_slice(bytes).map_err(|e| CcproxyError::TranslationError(e.to_string()))?;
			let usage = upstream.usage();
			let converted = anthropic_responses::anthropic_response_to_responses(&upstream);
			Ok((
				serde_json::to_value(&converted).map_err(|e| CcproxyError::TranslationError(e.to_string()))?,
				usage,
			))
		},
		(tgt, src) => Err(CcproxyError::UnsupportedConversion(format!(
			"no non-stream route wires target {tgt:?} -> source {src:?}"
		))),
	}
}
