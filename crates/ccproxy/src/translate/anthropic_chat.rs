//! Anthropic Messages ⇄ OpenAI Chat Completions (spec.md §4.5).

use async_openai::types::Role as ChatRole;

use super::StopReason;
use crate::error::CcproxyError;
use crate::formats::anthropic::typed::{
	ContentBlock, ImageSource, MessageContent, StreamEvent as AStreamEvent, Tool as ATool,
	ToolChoice as AToolChoice, ToolResultContent,
};
use crate::formats::anthropic::{self, Role as ARole};
use crate::formats::openai_chat::{
	self as chat, ContentPart as ChatContentPart, ImageUrl as ChatImageUrl, Message as ChatMessage, MessageContent as ChatContent,
};

const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Anthropic request -> OpenAI Chat request.
pub fn anthropic_to_chat(req: &anthropic::Request) -> Result<chat::Request, CcproxyError> {
	let mut messages = Vec::new();

	if let Some(system) = &req.system {
		messages.push(ChatMessage {
			role: ChatRole::System,
			content: Some(ChatContent::Text(system.to_text())),
			tool_call_id: None,
			rest: serde_json::json!({}),
		});
	}

	for m in &req.messages {
		messages.extend(anthropic_message_to_chat(m)?);
	}

	let tools = req.tools.as_ref().map(|tools| {
		tools
			.iter()
			.map(|t| {
				serde_json::json!({
					"type": "function",
					"function": {
						"name": t.name,
						"description": t.description,
						"parameters": t.input_schema,
					}
				})
			})
			.collect::<Vec<_>>()
	});

	let tool_choice = req.tool_choice.as_ref().map(tool_choice_to_chat);

	let mut rest = serde_json::json!({});
	if let Some(tools) = tools {
		rest["tools"] = serde_json::Value::Array(tools);
	}
	if let Some(tc) = tool_choice {
		rest["tool_choice"] = tc;
	}

	Ok(chat::Request {
		model: req.model.clone(),
		messages,
		max_tokens: None,
		max_completion_tokens: Some(req.max_tokens),
		temperature: req.temperature,
		top_p: req.top_p,
		stream: req.stream,
		stop: req
			.stop_sequences
			.clone()
			.map(chat::StopSequences::Many),
		reasoning_effort: None,
		rest,
	})
}

fn anthropic_message_to_chat(m: &anthropic::RequestMessage) -> Result<Vec<ChatMessage>, CcproxyError> {
	let role = match m.role {
		ARole::User => ChatRole::User,
		ARole::Assistant => ChatRole::Assistant,
	};
	let blocks = match &m.content {
		MessageContent::Text(t) => {
			return Ok(vec![ChatMessage {
				role,
				content: Some(ChatContent::Text(t.clone())),
				tool_call_id: None,
				rest: serde_json::json!({}),
			}]);
		},
		MessageContent::Blocks(blocks) => blocks,
	};

	// Tool-result blocks become a standalone `role:tool` message (spec.md §4.5); everything
	// else collapses into one message for this role in arrival order. A base64 image source is
	// restated as a full `data:` URL so it round-trips losslessly rather than as a text
	// placeholder (spec.md §4.5 line 104).
	let mut out = Vec::new();
	let mut parts = Vec::new();
	let mut has_image = false;
	for block in blocks {
		match block {
			ContentBlock::Text { text } => parts.push(ChatContentPart::Text { text: text.clone() }),
			ContentBlock::Image { source } => {
				has_image = true;
				let url = match source {
					ImageSource::Base64 { media_type, data } => format!("data:{media_type};base64,{data}"),
					ImageSource::Url { url } => url.clone(),
				};
				parts.push(ChatContentPart::ImageUrl { image_url: ChatImageUrl { url } });
			},
			ContentBlock::ToolUse { .. } | ContentBlock::Thinking { .. } | ContentBlock::RedactedThinking { .. } => {},
			ContentBlock::ToolResult {
				tool_use_id,
				content,
				..
			} => {
				let text = match content {
					ToolResultContent::Text(t) => t.clone(),
					ToolResultContent::Blocks(blocks) => blocks
						.iter()
						.filter_map(|b| match b {
							ContentBlock::Text { text } => Some(text.clone()),
							_ => None,
						})
						.collect::<Vec<_>>()
						.join("\n"),
					ToolResultContent::Empty => String::new(),
				};
				out.push(ChatMessage {
					role: ChatRole::Tool,
					content: Some(ChatContent::Text(text)),
					tool_call_id: Some(tool_use_id.clone()),
					rest: serde_json::json!({}),
				});
			},
			ContentBlock::Unknown => {},
		}
	}
	if has_image {
		out.insert(
			0,
			ChatMessage {
				role,
				content: Some(ChatContent::Parts(parts)),
				tool_call_id: None,
				rest: serde_json::json!({}),
			},
		);
	} else {
		let text_parts: Vec<String> = parts
			.into_iter()
			.map(|p| match p {
				ChatContentPart::Text { text } => text,
				ChatContentPart::ImageUrl { .. } => unreachable!("no ImageUrl part without has_image"),
			})
			.collect();
		if !text_parts.is_empty() || out.is_empty() {
			out.insert(
				0,
				ChatMessage {
					role,
					content: Some(ChatContent::Text(text_parts.join("\n"))),
					tool_call_id: None,
					rest: serde_json::json!({}),
				},
			);
		}
	}
	Ok(out)
}

fn tool_choice_to_chat(tc: &AToolChoice) -> serde_json::Value {
	match tc {
		AToolChoice::Auto => serde_json::json!("auto"),
		AToolChoice::Any => serde_json::json!("required"),
		AToolChoice::None => serde_json::json!("none"),
		AToolChoice::Tool { name } => serde_json::json!({"type": "function", "function": {"name": name}}),
	}
}

/// Splits a `data:<media-type>;base64,<data>` URL into its media type and payload. Any other
/// URL (remote `http(s)://`, ...) returns `None` — those stay a text placeholder rather than
/// being fetched or fabricated into an Anthropic image source (spec.md §4.5 line 104).
fn parse_data_url(url: &str) -> Option<(String, String)> {
	let rest = url.strip_prefix("data:")?;
	let (media_type, data) = rest.split_once(";base64,")?;
	Some((media_type.to_string(), data.to_string()))
}

/// Converts a Chat message's content into Anthropic `MessageContent`, reconstructing a base64
/// `data:` image URL as a real `image` block rather than dropping it via `to_text()`.
fn chat_content_to_anthropic(content: Option<&ChatContent>) -> MessageContent {
	let parts = match content {
		Some(ChatContent::Parts(parts)) => parts,
		Some(ChatContent::Text(t)) => return MessageContent::Text(t.clone()),
		None => return MessageContent::Text(String::new()),
	};

	let blocks: Vec<ContentBlock> = parts
		.iter()
		.map(|part| match part {
			ChatContentPart::Text { text } => ContentBlock::Text { text: text.clone() },
			ChatContentPart::ImageUrl { image_url } => match parse_data_url(&image_url.url) {
				Some((media_type, data)) => ContentBlock::Image {
					source: ImageSource::Base64 { media_type, data },
				},
				None => ContentBlock::Text {
					text: format!("[Image: {}]", image_url.url),
				},
			},
		})
		.collect();

	if blocks.iter().any(|b| matches!(b, ContentBlock::Image { .. })) {
		MessageContent::Blocks(blocks)
	} else {
		let text = blocks
			.into_iter()
			.filter_map(|b| match b {
				ContentBlock::Text { text } => Some(text),
				_ => None,
			})
			.collect::<Vec<_>>()
			.join("\n");
		MessageContent::Text(text)
	}
}

fn chat_tool_choice_to_anthropic(v: &serde_json::Value) -> Option<AToolChoice> {
	match v {
		serde_json::Value::String(s) => match s.as_str() {
			"none" => Some(AToolChoice::None),
			"required" => Some(AToolChoice::Any),
			_ => Some(AToolChoice::Auto),
		},
		serde_json::Value::Object(o) => {
			let name = o.get("function")?.get("name")?.as_str()?.to_string();
			Some(AToolChoice::Tool { name })
		},
		_ => None,
	}
}

/// OpenAI Chat request -> Anthropic request.
pub fn chat_to_anthropic(req: &chat::Request) -> Result<anthropic::Request, CcproxyError> {
	let mut system_texts = Vec::new();
	let mut messages = Vec::new();
	let mut leading_system = true;

	for m in &req.messages {
		if matches!(m.role, ChatRole::System | ChatRole::Developer) && leading_system {
			system_texts.push(m.content.as_ref().map(|c| c.to_text()).unwrap_or_default());
			continue;
		}
		leading_system = false;

		if matches!(m.role, ChatRole::Tool) {
			let tool_use_id = m.tool_call_id.clone().unwrap_or_default();
			messages.push(anthropic::RequestMessage {
				role: ARole::User,
				content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
					tool_use_id,
					content: ToolResultContent::Text(m.content.as_ref().map(|c| c.to_text()).unwrap_or_default()),
					is_error: false,
				}]),
			});
			continue;
		}

		let role = if matches!(m.role, ChatRole::Assistant) {
			ARole::Assistant
		} else {
			ARole::User
		};
		messages.push(anthropic::RequestMessage {
			role,
			content: chat_content_to_anthropic(m.content.as_ref()),
		});
	}

	let tools: Option<Vec<ATool>> = req.rest.get("tools").and_then(|v| v.as_array()).map(|arr| {
		arr
			.iter()
			.filter_map(|t| {
				let f = t.get("function")?;
				Some(ATool {
					name: f.get("name")?.as_str()?.to_string(),
					description: f.get("description").and_then(|d| d.as_str()).map(String::from),
					input_schema: f.get("parameters").cloned().unwrap_or(serde_json::json!({})),
				})
			})
			.collect()
	});

	let tool_choice = req
		.rest
		.get("tool_choice")
		.and_then(chat_tool_choice_to_anthropic);

	Ok(anthropic::Request {
		model: req.model.clone(),
		max_tokens: req.effective_max_tokens().unwrap_or(DEFAULT_MAX_TOKENS),
		messages,
		system: (!system_texts.is_empty()).then(|| anthropic::SystemPrompt::Text(system_texts.join("\n\n"))),
		temperature: req.temperature,
		top_p: req.top_p,
		top_k: None,
		stream: req.stream,
		stop_sequences: match &req.stop {
			Some(chat::StopSequences::Single(s)) => Some(vec![s.clone()]),
			Some(chat::StopSequences::Many(v)) => Some(v.clone()),
			None => None,
		},
		tools,
		tool_choice,
		thinking: req
			.reasoning_effort
			.as_deref()
			.map(reasoning_effort_to_thinking),
		metadata: None,
		rest: serde_json::json!({}),
	})
}

/// LiteLLM-derived constants for mapping a Chat `reasoning_effort` string onto an Anthropic
/// `thinking.budget_tokens` value.
fn reasoning_effort_to_thinking(effort: &str) -> anthropic::ThinkingConfig {
	let budget = match effort {
		"minimal" | "low" => 1024,
		"medium" => 2048,
		"high" | "xhigh" => 4096,
		_ => 2048,
	};
	anthropic::ThinkingConfig {
		kind: "enabled".to_string(),
		budget_tokens: Some(budget),
	}
}

/// Non-streaming Anthropic response -> OpenAI Chat response.
pub fn anthropic_response_to_chat(resp: &anthropic::Response) -> chat::Response {
	let mut text = String::new();
	let mut tool_calls = Vec::new();
	for block in &resp.content {
		match block {
			ContentBlock::Text { text: t } => text.push_str(t),
			ContentBlock::ToolUse { id, name, input } => {
				tool_calls.push(serde_json::json!({
					"id": id,
					"type": "function",
					"function": { "name": name, "arguments": serde_json::to_string(input).unwrap_or_default() }
				}));
			},
			_ => {},
		}
	}

	let mut rest = serde_json::Value::Null;
	if !tool_calls.is_empty() {
		rest = serde_json::json!({ "tool_calls": tool_calls });
	}

	let finish_reason = resp
		.stop_reason
		.map(StopReason::from_anthropic)
		.map(StopReason::to_openai_finish_reason);

	chat::Response {
		id: resp.id.clone(),
		object: "chat.completion".to_string(),
		model: resp.model.clone(),
		choices: vec![chat::Choice {
			index: 0,
			message: ChatMessage {
				role: ChatRole::Assistant,
				content: (!text.is_empty()).then_some(ChatContent::Text(text)),
				tool_call_id: None,
				rest,
			},
			finish_reason,
		}],
		usage: Some(chat::CompletionUsage {
			prompt_tokens: resp.usage.input_tokens,
			completion_tokens: resp.usage.output_tokens,
			total_tokens: resp.usage.input_tokens + resp.usage.output_tokens,
			prompt_tokens_details: resp.usage.cache_read_input_tokens.map(|c| chat::PromptTokensDetails {
				cached_tokens: c,
			}),
			completion_tokens_details: None,
		}),
	}
}

/// Non-streaming OpenAI Chat response -> Anthropic response.
pub fn chat_response_to_anthropic(resp: &chat::Response) -> Result<anthropic::Response, CcproxyError> {
	let choice = resp
		.choices
		.first()
		.ok_or_else(|| CcproxyError::TranslationError("chat response has no choices".into()))?;

	let mut content = Vec::new();
	if let Some(c) = &choice.message.content {
		let text = c.to_text();
		if !text.is_empty() {
			content.push(ContentBlock::Text { text });
		}
	}
	if let Some(calls) = choice.message.rest.get("tool_calls").and_then(|v| v.as_array()) {
		for call in calls {
			let Some(f) = call.get("function") else { continue };
			let input = f
				.get("arguments")
				.and_then(|a| a.as_str())
				.and_then(|s| serde_json::from_str(s).ok())
				.unwrap_or(serde_json::json!({}));
			content.push(ContentBlock::ToolUse {
				id: call.get("id").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
				name: f.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
				input,
			});
		}
	}

	let usage = resp.usage.clone().unwrap_or_default();
	Ok(anthropic::Response {
		id: resp.id.clone(),
		kind: "message".to_string(),
		role: ARole::Assistant,
		content,
		model: resp.model.clone(),
		stop_reason: choice
			.finish_reason
			.map(StopReason::from_openai_finish_reason)
			.map(StopReason::to_anthropic),
		stop_sequence: None,
		usage: anthropic::ResponseUsage {
			input_tokens: usage.prompt_tokens,
			output_tokens: usage.completion_tokens,
			cache_creation_input_tokens: None,
			cache_read_input_tokens: usage.prompt_tokens_details.map(|d| d.cached_tokens),
			rest: serde_json::json!({}),
		},
	})
}

/// Streaming state carried across the fold in [`translate_anthropic_stream_to_chat`].
#[derive(Default)]
pub struct ChatStreamState {
	message_id: String,
	model: String,
	emitted_role: bool,
	active_tool_call_index: Option<u32>,
}

/// Anthropic SSE event -> zero or more OpenAI Chat stream chunks. Grounded on the teacher's
/// `translate_stream` fold in `llm::conversion::messages`: one Anthropic event maps to zero,
/// one, or two Chat chunks (e.g. `message_start` both seeds state and emits a role-only delta).
pub fn translate_anthropic_stream_to_chat(
	state: &mut ChatStreamState,
	event: &AStreamEvent,
) -> Vec<chat::StreamChunk> {
	match event {
		AStreamEvent::MessageStart { message } => {
			state.message_id = message.id.clone();
			state.model = message.model.clone();
			state.emitted_role = true;
			vec![chunk(
				state,
				chat::StreamDelta {
					role: Some(ChatRole::Assistant),
					..Default::default()
				},
				None,
			)]
		},
		AStreamEvent::ContentBlockStart {
			content_block: ContentBlock::ToolUse { id, name, .. },
			index,
		} => {
			state.active_tool_call_index = Some(*index);
			vec![chunk(
				state,
				chat::StreamDelta {
					tool_calls: Some(vec![chat::StreamToolCall {
						index: *index,
						id: Some(id.clone()),
						function: Some(chat::StreamFunctionCall {
							name: Some(name.clone()),
							arguments: Some(String::new()),
						}),
					}]),
					..Default::default()
				},
				None,
			)]
		},
		AStreamEvent::ContentBlockDelta { index, delta } => match delta {
			crate::formats::anthropic::typed::ContentBlockDelta::TextDelta { text } => vec![chunk(
				state,
				chat::StreamDelta {
					content: Some(text.clone()),
					..Default::default()
				},
				None,
			)],
			crate::formats::anthropic::typed::ContentBlockDelta::ThinkingDelta { thinking } => vec![chunk(
				state,
				chat::StreamDelta {
					reasoning_content: Some(thinking.clone()),
					..Default::default()
				},
				None,
			)],
			crate::formats::anthropic::typed::ContentBlockDelta::InputJsonDelta { partial_json } => {
				vec![chunk(
					state,
					chat::StreamDelta {
						tool_calls: Some(vec![chat::StreamToolCall {
							index: *index,
							id: None,
							function: Some(chat::StreamFunctionCall {
								name: None,
								arguments: Some(partial_json.clone()),
							}),
						}]),
						..Default::default()
					},
					None,
				)]
			},
			crate::formats::anthropic::typed::ContentBlockDelta::SignatureDelta { .. } => vec![],
		},
		AStreamEvent::MessageDelta { delta, usage } => {
			let finish_reason = delta
				.stop_reason
				.map(StopReason::from_anthropic)
				.map(StopReason::to_openai_finish_reason);
			vec![chat::StreamChunk {
				id: state.message_id.clone(),
				object: "chat.completion.chunk",
				model: state.model.clone(),
				choices: vec![chat::StreamChoice {
					index: 0,
					delta: chat::StreamDelta::default(),
					finish_reason,
				}],
				usage: Some(chat::CompletionUsage {
					prompt_tokens: 0,
					completion_tokens: usage.output_tokens,
					total_tokens: usage.output_tokens,
					prompt_tokens_details: None,
					completion_tokens_details: None,
				}),
			}]
		},
		AStreamEvent::ContentBlockStop { .. } | AStreamEvent::MessageStop | AStreamEvent::Ping => vec![],
		AStreamEvent::Error { error } => vec![chunk(
			state,
			chat::StreamDelta {
				content: Some(format!("[error: {}]", error.message)),
				..Default::default()
			},
			Some(async_openai::types::FinishReason::Stop),
		)],
	}
}

fn chunk(
	state: &ChatStreamState,
	delta: chat::StreamDelta,
	finish_reason: Option<async_openai::types::FinishReason>,
) -> chat::StreamChunk {
	chat::StreamChunk {
		id: state.message_id.clone(),
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

/// Reverse streaming direction: OpenAI Chat stream chunks -> Anthropic SSE events. The text
/// block always occupies index 0; each distinct `tool_calls[].index` from the Chat side opens
/// its own Anthropic content block at `index + 1`.
#[derive(Default)]
pub struct ChatToAnthropicState {
	message_id: String,
	model: String,
	message_start_sent: bool,
	text_block_open: bool,
	open_tool_blocks: Vec<u32>,
}

pub fn translate_chat_stream_to_anthropic(state: &mut ChatToAnthropicState, chunk: &chat::StreamChunk) -> Vec<AStreamEvent> {
	let mut out = Vec::new();
	if !state.message_start_sent {
		state.message_start_sent = true;
		state.message_id = chunk.id.clone();
		state.model = chunk.model.clone();
		out.push(AStreamEvent::MessageStart {
			message: Box::new(anthropic::Response {
				id: state.message_id.clone(),
				kind: "message".to_string(),
				role: ARole::Assistant,
				content: vec![],
				model: state.model.clone(),
				stop_reason: None,
				stop_sequence: None,
				usage: anthropic::ResponseUsage {
					input_tokens: 0,
					output_tokens: 0,
					cache_creation_input_tokens: None,
					cache_read_input_tokens: None,
					rest: serde_json::json!({}),
				},
			}),
		});
	}

	let Some(choice) = chunk.choices.first() else {
		return out;
	};

	if let Some(text) = &choice.delta.content {
		if !state.text_block_open {
			state.text_block_open = true;
			out.push(AStreamEvent::ContentBlockStart {
				index: 0,
				content_block: ContentBlock::Text { text: String::new() },
			});
		}
		out.push(AStreamEvent::ContentBlockDelta {
			index: 0,
			delta: crate::formats::anthropic::typed::ContentBlockDelta::TextDelta { text: text.clone() },
		});
	}
	if let Some(thinking) = &choice.delta.reasoning_content {
		out.push(AStreamEvent::ContentBlockDelta {
			index: 0,
			delta: crate::formats::anthropic::typed::ContentBlockDelta::ThinkingDelta {
				thinking: thinking.clone(),
			},
		});
	}
	if let Some(tool_calls) = &choice.delta.tool_calls {
		for call in tool_calls {
			let block_index = call.index + 1;
			if !state.open_tool_blocks.contains(&block_index) {
				state.open_tool_blocks.push(block_index);
				out.push(AStreamEvent::ContentBlockStart {
					index: block_index,
					content_block: ContentBlock::ToolUse {
						id: call.id.clone().unwrap_or_default(),
						name: call.function.as_ref().and_then(|f| f.name.clone()).unwrap_or_default(),
						input: serde_json::json!({}),
					},
				});
			}
			if let Some(args) = call.function.as_ref().and_then(|f| f.arguments.clone()) {
				out.push(AStreamEvent::ContentBlockDelta {
					index: block_index,
					delta: crate::formats::anthropic::typed::ContentBlockDelta::InputJsonDelta { partial_json: args },
				});
			}
		}
	}

	if let Some(finish_reason) = choice.finish_reason {
		if state.text_block_open {
			out.push(AStreamEvent::ContentBlockStop { index: 0 });
		}
		for index in state.open_tool_blocks.drain(..).collect::<Vec<_>>() {
			out.push(AStreamEvent::ContentBlockStop { index });
		}
		out.push(AStreamEvent::MessageDelta {
			delta: crate::formats::anthropic::typed::MessageDeltaFields {
				stop_reason: Some(StopReason::from_openai_finish_reason(finish_reason).to_anthropic()),
				stop_sequence: None,
			},
			usage: crate::formats::anthropic::typed::MessageDeltaUsage {
				output_tokens: chunk.usage.as_ref().map(|u| u.completion_tokens).unwrap_or(0),
			},
		});
		out.push(AStreamEvent::MessageStop);
	}

	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn simple_anthropic_request() -> anthropic::Request {
		anthropic::Request {
			model: "claude-3-5-sonnet-latest".to_string(),
			max_tokens: 1024,
			messages: vec![anthropic::RequestMessage {
				role: ARole::User,
				content: MessageContent::Text("hello".to_string()),
			}],
			system: Some(anthropic::SystemPrompt::Text("be nice".to_string())),
			temperature: None,
			top_p: None,
			top_k: None,
			stream: false,
			stop_sequences: None,
			tools: None,
			tool_choice: None,
			thinking: None,
			metadata: None,
			rest: serde_json::json!({}),
		}
	}

	#[test]
	fn system_prompt_becomes_a_leading_system_message() {
		let chat = anthropic_to_chat(&simple_anthropic_request()).unwrap();
		assert_eq!(chat.messages.len(), 2);
		assert_eq!(chat.messages[0].role, ChatRole::System);
		assert_eq!(chat.messages[0].content.as_ref().unwrap().to_text(), "be nice");
		assert_eq!(chat.messages[1].role, ChatRole::User);
	}

	#[test]
	fn max_tokens_maps_to_max_completion_tokens() {
		let chat = anthropic_to_chat(&simple_anthropic_request()).unwrap();
		assert_eq!(chat.max_completion_tokens, Some(1024));
		assert_eq!(chat.max_tokens, None);
	}

	#[test]
	fn tool_result_block_becomes_standalone_tool_message() {
		let mut req = simple_anthropic_request();
		req.messages.push(anthropic::RequestMessage {
			role: ARole::User,
			content: MessageContent::Blocks(vec![ContentBlock::ToolResult {
				tool_use_id: "call_1".to_string(),
				content: ToolResultContent::Text("42".to_string()),
				is_error: false,
			}]),
		});
		let chat = anthropic_to_chat(&req).unwrap();
		let tool_msg = chat.messages.last().unwrap();
		assert_eq!(tool_msg.role, ChatRole::Tool);
		assert_eq!(tool_msg.tool_call_id.as_deref(), Some("call_1"));
		assert_eq!(tool_msg.content.as_ref().unwrap().to_text(), "42");
	}

	#[test]
	fn leading_system_and_developer_messages_collapse_to_system_field() {
		let req = chat::Request {
			model: "gpt-4o".to_string(),
			messages: vec![
				ChatMessage {
					role: ChatRole::System,
					content: Some(ChatContent::Text("sys 1".to_string())),
					tool_call_id: None,
					rest: serde_json::json!({}),
				},
				ChatMessage {
					role: ChatRole::User,
					content: Some(ChatContent::Text("hi".to_string())),
					tool_call_id: None,
					rest: serde_json::json!({}),
				},
			],
			max_tokens: None,
			max_completion_tokens: None,
			temperature: None,
			top_p: None,
			stream: false,
			stop: None,
			reasoning_effort: None,
			rest: serde_json::json!({}),
		};
		let anthropic_req = chat_to_anthropic(&req).unwrap();
		assert!(matches!(anthropic_req.system, Some(anthropic::SystemPrompt::Text(ref t)) if t == "sys 1"));
		assert_eq!(anthropic_req.messages.len(), 1);
	}

	#[test]
	fn reasoning_effort_maps_to_a_thinking_budget() {
		assert_eq!(reasoning_effort_to_thinking("low").budget_tokens, Some(1024));
		assert_eq!(reasoning_effort_to_thinking("medium").budget_tokens, Some(2048));
		assert_eq!(reasoning_effort_to_thinking("high").budget_tokens, Some(4096));
	}

	#[test]
	fn tool_choice_round_trips_through_chat_shape() {
		assert_eq!(tool_choice_to_chat(&AToolChoice::Any), serde_json::json!("required"));
		assert_eq!(
			chat_tool_choice_to_anthropic(&serde_json::json!("required")),
			Some(AToolChoice::Any)
		);
	}

	#[test]
	fn chat_base64_image_url_becomes_an_anthropic_image_block() {
		let req = chat::Request {
			model: "gpt-4o".to_string(),
			messages: vec![ChatMessage {
				role: ChatRole::User,
				content: Some(ChatContent::Parts(vec![
					ChatContentPart::Text { text: "what is this?".to_string() },
					ChatContentPart::ImageUrl {
						image_url: ChatImageUrl {
							url: "data:image/png;base64,aGVsbG8=".to_string(),
						},
					},
				])),
				tool_call_id: None,
				rest: serde_json::json!({}),
			}],
			max_tokens: None,
			max_completion_tokens: None,
			temperature: None,
			top_p: None,
			stream: false,
			stop: None,
			reasoning_effort: None,
			rest: serde_json::json!({}),
		};
		let anthropic_req = chat_to_anthropic(&req).unwrap();
		let MessageContent::Blocks(blocks) = &anthropic_req.messages[0].content else {
			panic!("expected block content");
		};
		assert!(matches!(
			blocks[1],
			ContentBlock::Image {
				source: ImageSource::Base64 { ref media_type, ref data }
			} if media_type == "image/png" && data == "aGVsbG8="
		));
	}

	#[test]
	fn chat_remote_image_url_becomes_a_text_placeholder() {
		let content = Some(ChatContent::Parts(vec![ChatContentPart::ImageUrl {
			image_url: ChatImageUrl {
				url: "https://example.com/cat.png".to_string(),
			},
		}]));
		let MessageContent::Text(text) = chat_content_to_anthropic(content.as_ref()) else {
			panic!("expected text content");
		};
		assert_eq!(text, "[Image: https://example.com/cat.png]");
	}

	#[test]
	fn anthropic_base64_image_round_trips_through_chat_as_a_data_url() {
		let mut req = simple_anthropic_request();
		req.messages.push(anthropic::RequestMessage {
			role: ARole::User,
			content: MessageContent::Blocks(vec![ContentBlock::Image {
				source: ImageSource::Base64 {
					media_type: "image/jpeg".to_string(),
					data: "aGVsbG8=".to_string(),
				},
			}]),
		});
		let chat = anthropic_to_chat(&req).unwrap();
		let image_msg = chat.messages.last().unwrap();
		let Some(ChatContent::Parts(parts)) = &image_msg.content else {
			panic!("expected parts content");
		};
		assert!(matches!(
			&parts[0],
			ChatContentPart::ImageUrl { image_url } if image_url.url == "data:image/jpeg;base64,aGVsbG8="
		));

		// Round-trip back to Anthropic reconstructs the same base64 image block.
		let back = chat_to_anthropic(&chat).unwrap();
		let MessageContent::Blocks(blocks) = &back.messages.last().unwrap().content else {
			panic!("expected block content");
		};
		assert!(matches!(
			blocks[0],
			ContentBlock::Image {
				source: ImageSource::Base64 { ref media_type, ref data }
			} if media_type == "image/jpeg" && data == "aGVsbG8="
		));
	}

	#[test]
	fn anthropic_response_with_tool_use_surfaces_tool_calls() {
		let resp = anthropic::Response {
			id: "msg_1".to_string(),
			kind: "message".to_string(),
			role: ARole::Assistant,
			content: vec![ContentBlock::ToolUse {
				id: "call_1".to_string(),
				name: "get_weather".to_string(),
				input: serde_json::json!({"city": "nyc"}),
			}],
			model: "claude-3-5-sonnet-latest".to_string(),
			stop_reason: Some(crate::formats::anthropic::typed::StopReason::ToolUse),
			stop_sequence: None,
			usage: anthropic::ResponseUsage {
				input_tokens: 10,
				output_tokens: 5,
				cache_creation_input_tokens: None,
				cache_read_input_tokens: None,
				rest: serde_json::json!({}),
			},
		};
		let chat_resp = anthropic_response_to_chat(&resp);
		let tool_calls = chat_resp.choices[0].message.rest.get("tool_calls").unwrap().as_array().unwrap();
		assert_eq!(tool_calls.len(), 1);
		assert_eq!(tool_calls[0]["function"]["name"], "get_weather");
	}
}
