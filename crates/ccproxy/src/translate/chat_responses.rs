//! OpenAI Chat Completions ⇄ OpenAI Responses (spec.md §4.5).

use async_openai::types::responses::{ContentType, Input, InputContent, InputItem, InputMessage, Role as RRole};
use async_openai::types::Role as ChatRole;

use crate::error::CcproxyError;
use crate::formats::openai_chat::{self as chat, Message as ChatMessage, MessageContent as ChatContent};
use crate::formats::openai_responses::{self as responses};

/// Chat request -> Responses request.
pub fn chat_to_responses(req: &chat::Request) -> responses::Request {
	let mut instructions = Vec::new();
	let mut items = Vec::new();

	for m in &req.messages {
		if matches!(m.role, ChatRole::System | ChatRole::Developer) {
			instructions.push(m.content.as_ref().map(|c| c.to_text()).unwrap_or_default());
			continue;
		}
		let role = match m.role {
			ChatRole::Assistant => RRole::Assistant,
			ChatRole::Developer => RRole::Developer,
			_ => RRole::User,
		};
		items.push(InputItem::Message(InputMessage {
			kind: Default::default(),
			role,
			content: InputContent::TextInput(m.content.as_ref().map(|c| c.to_text()).unwrap_or_default()),
		}));
	}

	responses::Request {
		input: Input::Items(items),
		model: Some(req.model.clone()),
		instructions: (!instructions.is_empty()).then(|| instructions.join("\n\n")),
		max_output_tokens: req.effective_max_tokens(),
		temperature: req.temperature,
		top_p: req.top_p,
		stream: req.stream,
		rest: serde_json::json!({}),
	}
}

/// Responses request -> Chat request.
pub fn responses_to_chat(req: &responses::Request) -> chat::Request {
	let mut messages = Vec::new();
	if let Some(instructions) = &req.instructions {
		messages.push(ChatMessage {
			role: ChatRole::System,
			content: Some(ChatContent::Text(instructions.clone())),
			tool_call_id: None,
			rest: serde_json::json!({}),
		});
	}

	match &req.input {
		Input::Text(text) => messages.push(ChatMessage {
			role: ChatRole::User,
			content: Some(ChatContent::Text(text.clone())),
			tool_call_id: None,
			rest: serde_json::json!({}),
		}),
		Input::Items(items) => {
			for item in items {
				let InputItem::Message(msg) = item else { continue };
				let text = match &msg.content {
					InputContent::TextInput(t) => t.clone(),
					InputContent::InputItemContentList(parts) => parts
						.iter()
						.filter_map(|p| match p {
							ContentType::InputText(t) => Some(t.text.as_str()),
							_ => None,
						})
						.collect::<Vec<_>>()
						.join("\n"),
				};
				let role = match msg.role {
					RRole::Assistant => ChatRole::Assistant,
					RRole::System => ChatRole::System,
					RRole::Developer => ChatRole::Developer,
					RRole::User => ChatRole::User,
				};
				messages.push(ChatMessage {
					role,
					content: Some(ChatContent::Text(text)),
					tool_call_id: None,
					rest: serde_json::json!({}),
				});
			}
		},
	}

	chat::Request {
		model: req.model.clone().unwrap_or_default(),
		messages,
		max_tokens: None,
		max_completion_tokens: req.max_output_tokens,
		temperature: req.temperature,
		top_p: req.top_p,
		stream: req.stream,
		stop: None,
		reasoning_effort: None,
		rest: serde_json::json!({}),
	}
}

/// Non-streaming Chat response -> Responses response.
pub fn chat_response_to_responses(resp: &chat::Response) -> responses::Response {
	let text = resp
		.choices
		.first()
		.and_then(|c| c.message.content.as_ref())
		.map(|c| c.to_text())
		.unwrap_or_default();

	responses::Response {
		id: resp.id.clone(),
		status: "completed".to_string(),
		output: vec![responses::text_output(text)],
		model: resp.model.clone(),
		usage: resp.usage.as_ref().map(|u| responses::ResponseUsage {
			input_tokens: u.prompt_tokens,
			output_tokens: u.completion_tokens,
			rest: serde_json::json!({}),
		}),
		rest: serde_json::json!({}),
	}
}

/// Non-streaming Responses response -> Chat response.
pub fn responses_response_to_chat(resp: &responses::Response) -> Result<chat::Response, CcproxyError> {
	let text = responses::extract_output_text(&resp.output);
	let finish_reason = if resp.status == "incomplete" {
		Some(async_openai::types::FinishReason::Length)
	} else {
		Some(async_openai::types::FinishReason::Stop)
	};

	Ok(chat::Response {
		id: resp.id.clone(),
		object: "chat.completion".to_string(),
		model: resp.model.clone(),
		choices: vec![chat::Choice {
			index: 0,
			message: ChatMessage {
				role: ChatRole::Assistant,
				content: (!text.is_empty()).then_some(ChatContent::Text(text)),
				tool_call_id: None,
				rest: serde_json::json!({}),
			},
			finish_reason,
		}],
		usage: resp.usage.as_ref().map(|u| chat::CompletionUsage {
			prompt_tokens: u.input_tokens,
			completion_tokens: u.output_tokens,
			total_tokens: u.input_tokens + u.output_tokens,
			prompt_tokens_details: None,
			completion_tokens_details: None,
		}),
	})
}

/// Streaming state for the Responses -> Chat direction: the Responses API emits one
/// `item_id`-scoped delta stream per output item, which collapses onto Chat's single
/// `choices[0].delta` per spec.md §4.5.
#[derive(Default)]
pub struct ChatFromResponsesState {
	id: String,
	model: String,
	/// Set once the first reasoning delta of the current item has opened a `<thinking>` tag in
	/// the Chat text stream (spec.md §6 `LLM__OPENAI_THINKING_XML`); cleared once a non-reasoning
	/// delta or `Completed` closes it.
	thinking_open: bool,
}

/// Reasoning deltas carry no upstream signature the way Anthropic's native thinking blocks do;
/// the Responses `item_id` stands in as the `signature` attribute so the tag is at least stable
/// and traceable back to its source item.
pub fn translate_responses_stream_to_chat(
	state: &mut ChatFromResponsesState,
	event: &responses::StreamEvent,
	thinking_xml: bool,
) -> Vec<chat::StreamChunk> {
	match event {
		responses::StreamEvent::Created { response } | responses::StreamEvent::InProgress { response } => {
			state.id = response.id.clone();
			state.model = response.model.clone();
			vec![]
		},
		responses::StreamEvent::OutputTextDelta { delta, .. } => {
			let mut out = Vec::new();
			if state.thinking_open {
				state.thinking_open = false;
				out.push(chunk(
					state,
					chat::StreamDelta {
						content: Some("</thinking>".to_string()),
						..Default::default()
					},
					None,
				));
			}
			out.push(chunk(
				state,
				chat::StreamDelta {
					content: Some(delta.clone()),
					..Default::default()
				},
				None,
			));
			out
		},
		responses::StreamEvent::ReasoningSummaryTextDelta { item_id, delta } => {
			if !thinking_xml {
				return vec![chunk(
					state,
					chat::StreamDelta {
						reasoning_content: Some(delta.clone()),
						..Default::default()
					},
					None,
				)];
			}
			let mut out = Vec::new();
			if !state.thinking_open {
				state.thinking_open = true;
				out.push(chunk(
					state,
					chat::StreamDelta {
						content: Some(format!("<thinking signature=\"{item_id}\">")),
						..Default::default()
					},
					None,
				));
			}
			out.push(chunk(
				state,
				chat::StreamDelta {
					content: Some(delta.clone()),
					..Default::default()
				},
				None,
			));
			out
		},
		responses::StreamEvent::Completed { response } => {
			let mut out = Vec::new();
			if state.thinking_open {
				state.thinking_open = false;
				out.push(chunk(
					state,
					chat::StreamDelta {
						content: Some("</thinking>".to_string()),
						..Default::default()
					},
					None,
				));
			}
			out.push(chunk(
				state,
				chat::StreamDelta::default(),
				Some(
					response
						.usage
						.as_ref()
						.map(|_| async_openai::types::FinishReason::Stop)
						.unwrap_or(async_openai::types::FinishReason::Stop),
				),
			));
			out
		},
		responses::StreamEvent::Failed { .. } => vec![chunk(
			state,
			chat::StreamDelta {
				content: Some(String::new()),
				..Default::default()
			},
			Some(async_openai::types::FinishReason::Stop),
		)],
	}
}

fn chunk(
	state: &ChatFromResponsesState,
	delta: chat::StreamDelta,
	finish_reason: Option<async_openai::types::FinishReason>,
) -> chat::StreamChunk {
	chat::StreamChunk {
		id: state.id.clone(),
		object: "chat.completion.chunk",
		model: state.model.clone(),
		choices: vec![chat::StreamChoice {
			index: 0,
			delta,
			finish_reason,
		}],
		usage: None,
	}
}

/// Streaming state for the Chat -> Responses direction: Chat's flat delta stream is re-wrapped
/// into `item_id`-scoped Responses events, synthesizing `response.created`/`response.completed`
/// bookends since Chat never emits either explicitly.
#[derive(Default)]
pub struct ResponsesFromChatState {
	started: bool,
	item_id: String,
	model: String,
	accumulated: String,
	scanner: ThinkingXmlScanner,
}

pub fn translate_chat_stream_to_responses(
	state: &mut ResponsesFromChatState,
	chunk: &chat::StreamChunk,
	thinking_xml: bool,
) -> Vec<responses::StreamEvent> {
	let mut out = Vec::new();
	if !state.started {
		state.started = true;
		state.item_id = chunk.id.clone();
		state.model = chunk.model.clone();
		out.push(responses::StreamEvent::Created {
			response: Box::new(empty_response(state, "in_progress")),
		});
	}

	let Some(choice) = chunk.choices.first() else {
		return out;
	};

	if let Some(delta) = &choice.delta.content {
		if thinking_xml {
			let (reasoning, text) = state.scanner.scan(delta);
			if !reasoning.is_empty() {
				out.push(responses::StreamEvent::ReasoningSummaryTextDelta {
					item_id: state.item_id.clone(),
					delta: reasoning,
				});
			}
			if !text.is_empty() {
				state.accumulated.push_str(&text);
				out.push(responses::StreamEvent::OutputTextDelta {
					item_id: state.item_id.clone(),
					delta: text,
				});
			}
		} else {
			state.accumulated.push_str(delta);
			out.push(responses::StreamEvent::OutputTextDelta {
				item_id: state.item_id.clone(),
				delta: delta.clone(),
			});
		}
	}
	if let Some(delta) = &choice.delta.reasoning_content {
		out.push(responses::StreamEvent::ReasoningSummaryTextDelta {
			item_id: state.item_id.clone(),
			delta: delta.clone(),
		});
	}
	if choice.finish_reason.is_some() {
		let mut response = empty_response(state, "completed");
		response.output = vec![responses::text_output(state.accumulated.clone())];
		out.push(responses::StreamEvent::Completed {
			response: Box::new(response),
		});
	}
	out
}

/// Best-effort `<thinking signature="…">…</thinking>` tag scanner for the Chat -> Responses
/// reverse direction (spec.md §6 `LLM__OPENAI_THINKING_XML`). Splits each incoming delta into
/// reasoning text (tag contents) and plain output text, tracking open/close state across chunk
/// boundaries. An opening tag split across two chunks is not reassembled — the partial tag is
/// passed through as plain text instead, which is the honest "best-effort" the spec names rather
/// than a buffering guarantee.
#[derive(Default)]
struct ThinkingXmlScanner {
	in_thinking: bool,
}

impl ThinkingXmlScanner {
	fn scan(&mut self, delta: &str) -> (String, String) {
		let mut reasoning = String::new();
		let mut output = String::new();
		let mut rest = delta;
		loop {
			if self.in_thinking {
				if let Some(pos) = rest.find("</thinking>") {
					reasoning.push_str(&rest[..pos]);
					rest = &rest[pos + "</thinking>".len()..];
					self.in_thinking = false;
				} else {
					reasoning.push_str(rest);
					break;
				}
			} else if let Some(pos) = rest.find("<thinking") {
				output.push_str(&rest[..pos]);
				let after = &rest[pos..];
				let Some(tag_end) = after.find('>') else {
					output.push_str(after);
					break;
				};
				rest = &after[tag_end + 1..];
				self.in_thinking = true;
			} else {
				output.push_str(rest);
				break;
			}
		}
		(reasoning, output)
	}
}

fn empty_response(state: &ResponsesFromChatState, status: &str) -> responses::Response {
	responses::Response {
		id: state.item_id.clone(),
		status: status.to_string(),
		output: vec![],
		model: state.model.clone(),
		usage: None,
		rest: serde_json::json!({}),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn chat_chunk(id: &str, content: Option<&str>, finish: Option<async_openai::types::FinishReason>) -> chat::StreamChunk {
		chat::StreamChunk {
			id: id.to_string(),
			object: "chat.completion.chunk",
			model: "gpt-4o".to_string(),
			choices: vec![chat::StreamChoice {
				index: 0,
				delta: chat::StreamDelta {
					content: content.map(String::from),
					..Default::default()
				},
				finish_reason: finish,
			}],
			usage: None,
		}
	}

	fn responses_response(id: &str, status: &str) -> Box<responses::Response> {
		Box::new(responses::Response {
			id: id.to_string(),
			status: status.to_string(),
			output: vec![],
			model: "gpt-4o".to_string(),
			usage: None,
			rest: serde_json::json!({}),
		})
	}

	#[test]
	fn reasoning_deltas_are_wrapped_in_thinking_tags_when_enabled() {
		let mut state = ChatFromResponsesState::default();
		let created = responses::StreamEvent::Created {
			response: responses_response("resp_1", "in_progress"),
		};
		translate_responses_stream_to_chat(&mut state, &created, true);

		let reasoning = responses::StreamEvent::ReasoningSummaryTextDelta {
			item_id: "item_1".to_string(),
			delta: "Thoughts".to_string(),
		};
		let chunks = translate_responses_stream_to_chat(&mut state, &reasoning, true);
		let text: String = chunks
			.iter()
			.filter_map(|c| c.choices[0].delta.content.clone())
			.collect();
		assert_eq!(text, "<thinking signature=\"item_1\">Thoughts");

		let output = responses::StreamEvent::OutputTextDelta {
			item_id: "item_1".to_string(),
			delta: "Final".to_string(),
		};
		let chunks = translate_responses_stream_to_chat(&mut state, &output, true);
		let text: String = chunks
			.iter()
			.filter_map(|c| c.choices[0].delta.content.clone())
			.collect();
		assert_eq!(text, "</thinking>Final");
	}

	#[test]
	fn reasoning_deltas_stay_in_the_native_field_when_disabled() {
		let mut state = ChatFromResponsesState::default();
		let reasoning = responses::StreamEvent::ReasoningSummaryTextDelta {
			item_id: "item_1".to_string(),
			delta: "Thoughts".to_string(),
		};
		let chunks = translate_responses_stream_to_chat(&mut state, &reasoning, false);
		assert_eq!(chunks.len(), 1);
		assert_eq!(chunks[0].choices[0].delta.reasoning_content.as_deref(), Some("Thoughts"));
		assert!(chunks[0].choices[0].delta.content.is_none());
	}

	#[test]
	fn open_thinking_tag_closes_before_stream_completion() {
		let mut state = ChatFromResponsesState::default();
		let reasoning = responses::StreamEvent::ReasoningSummaryTextDelta {
			item_id: "item_1".to_string(),
			delta: "Thoughts".to_string(),
		};
		translate_responses_stream_to_chat(&mut state, &reasoning, true);

		let completed = responses::StreamEvent::Completed {
			response: responses_response("resp_1", "completed"),
		};
		let chunks = translate_responses_stream_to_chat(&mut state, &completed, true);
		assert_eq!(chunks[0].choices[0].delta.content.as_deref(), Some("</thinking>"));
		assert_eq!(chunks.last().unwrap().choices[0].finish_reason, Some(async_openai::types::FinishReason::Stop));
	}

	#[test]
	fn scanner_splits_thinking_tag_from_surrounding_text() {
		let mut scanner = ThinkingXmlScanner::default();
		let (reasoning, output) = scanner.scan("before <thinking signature=\"x\">inner</thinking> after");
		assert_eq!(reasoning, "inner");
		assert_eq!(output, "before  after");
	}

	#[test]
	fn scanner_handles_a_thinking_block_split_across_chunks() {
		let mut scanner = ThinkingXmlScanner::default();
		let (r1, o1) = scanner.scan("<thinking signature=\"x\">part one ");
		assert_eq!(o1, "");
		assert_eq!(r1, "");
		let (r2, o2) = scanner.scan("part two</thinking>tail");
		assert_eq!(r2, "part one part two");
		assert_eq!(o2, "tail");
	}

	#[test]
	fn chat_stream_with_thinking_tag_splits_into_reasoning_and_output_events() {
		let mut state = ResponsesFromChatState::default();
		let c1 = chat_chunk("chatcmpl-1", Some("<thinking signature=\"x\">hmm</thinking>answer"), None);
		let events = translate_chat_stream_to_responses(&mut state, &c1, true);
		let reasoning_delta = events.iter().find_map(|e| match e {
			responses::StreamEvent::ReasoningSummaryTextDelta { delta, .. } => Some(delta.clone()),
			_ => None,
		});
		let output_delta = events.iter().find_map(|e| match e {
			responses::StreamEvent::OutputTextDelta { delta, .. } => Some(delta.clone()),
			_ => None,
		});
		assert_eq!(reasoning_delta.as_deref(), Some("hmm"));
		assert_eq!(output_delta.as_deref(), Some("answer"));

		let c2 = chat_chunk("chatcmpl-1", None, Some(async_openai::types::FinishReason::Stop));
		let events = translate_chat_stream_to_responses(&mut state, &c2, true);
		let completed = events.iter().find_map(|e| match e {
			responses::StreamEvent::Completed { response } => Some(response.clone()),
			_ => None,
		});
		assert_eq!(responses::extract_output_text(&completed.unwrap().output), "answer");
	}

	#[test]
	fn chat_stream_passes_content_through_unchanged_when_disabled() {
		let mut state = ResponsesFromChatState::default();
		let c1 = chat_chunk("chatcmpl-1", Some("<thinking>hmm</thinking>answer"), None);
		let events = translate_chat_stream_to_responses(&mut state, &c1, false);
		let output_delta = events.iter().find_map(|e| match e {
			responses::StreamEvent::OutputTextDelta { delta, .. } => Some(delta.clone()),
			_ => None,
		});
		assert_eq!(output_delta.as_deref(), Some("<thinking>hmm</thinking>answer"));
	}
}
