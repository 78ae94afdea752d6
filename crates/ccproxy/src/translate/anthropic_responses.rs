//! Anthropic Messages ⇄ OpenAI Responses, composed through OpenAI Chat (spec.md §4.5, §9).
//!
//! This module intentionally does not duplicate block/role mapping logic: it delegates to
//! [`super::anthropic_chat`] and [`super::chat_responses`] and pays the cost of two hops rather
//! than maintaining a third, independent pairwise mapping.

use super::anthropic_chat::{self, ChatStreamState, ChatToAnthropicState};
use super::chat_responses::{self, ChatFromResponsesState, ResponsesFromChatState};
use crate::error::CcproxyError;
use crate::formats::anthropic::{self, typed::StreamEvent as AStreamEvent};
use crate::formats::openai_responses::{self as responses, StreamEvent as RStreamEvent};

pub fn anthropic_to_responses(req: &anthropic::Request) -> Result<responses::Request, CcproxyError> {
	let chat_req = anthropic_chat::anthropic_to_chat(req)?;
	Ok(chat_responses::chat_to_responses(&chat_req))
}

pub fn responses_to_anthropic(req: &responses::Request) -> Result<anthropic::Request, CcproxyError> {
	let chat_req = chat_responses::responses_to_chat(req);
	anthropic_chat::chat_to_anthropic(&chat_req)
}

pub fn anthropic_response_to_responses(resp: &anthropic::Response) -> responses::Response {
	let chat_resp = anthropic_chat::anthropic_response_to_chat(resp);
	chat_responses::chat_response_to_responses(&chat_resp)
}

pub fn responses_response_to_anthropic(resp: &responses::Response) -> Result<anthropic::Response, CcproxyError> {
	let chat_resp = chat_responses::responses_response_to_chat(resp)?;
	anthropic_chat::chat_response_to_anthropic(&chat_resp)
}

/// Two-hop streaming state: Anthropic events fold into Chat chunks, which then fold into
/// Responses events. Composed rather than re-derived per the module-level note above.
#[derive(Default)]
pub struct ResponsesFromAnthropicState {
	chat_state: ChatStreamState,
	responses_state: ResponsesFromChatState,
}

pub fn translate_anthropic_stream_to_responses(
	state: &mut ResponsesFromAnthropicState,
	event: &AStreamEvent,
	thinking_xml: bool,
) -> Vec<RStreamEvent> {
	let chat_chunks = anthropic_chat::translate_anthropic_stream_to_chat(&mut state.chat_state, event);
	chat_chunks
		.iter()
		.flat_map(|chunk| chat_responses::translate_chat_stream_to_responses(&mut state.responses_state, chunk, thinking_xml))
		.collect()
}

/// Two-hop streaming state for the reverse direction: Responses events fold into Chat chunks,
/// which then fold into Anthropic SSE events.
#[derive(Default)]
pub struct AnthropicFromResponsesState {
	chat_state: ChatFromResponsesState,
	anthropic_state: ChatToAnthropicState,
}

pub fn translate_responses_stream_to_anthropic(
	state: &mut AnthropicFromResponsesState,
	event: &RStreamEvent,
	thinking_xml: bool,
) -> Vec<AStreamEvent> {
	let chat_chunks = chat_responses::translate_responses_stream_to_chat(&mut state.chat_state, event, thinking_xml);
	chat_chunks
		.iter()
		.flat_map(|chunk| anthropic_chat::translate_chat_stream_to_anthropic(&mut state.anthropic_state, chunk))
		.collect()
}
