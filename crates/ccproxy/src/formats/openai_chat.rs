//! OpenAI Chat Completions wire types. The role and finish-reason enums are the long-stable
//! `async-openai` types (re-used rather than re-declared, following the architectural choice
//! the teacher makes for `llm::types::responses`); the request/response envelope itself is
//! hand-rolled with a `rest: serde_json::Value` passthrough tail, the same shape used
//! throughout `llm::types` for fields the router never needs to interpret (tools,
//! `response_format`, `parallel_tool_calls`, ...).

use async_openai::types::Role;
use serde::{Deserialize, Serialize};

use super::{RequestType, ResponseType, SimpleChatMessage, Usage};
use crate::error::CcproxyError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
	pub role: Role,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub content: Option<MessageContent>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub tool_call_id: Option<String>,
	#[serde(flatten, default)]
	pub rest: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
	Text(String),
	Parts(Vec<ContentPart>),
}

impl MessageContent {
	pub fn to_text(&self) -> String {
		match self {
			MessageContent::Text(s) => s.clone(),
			MessageContent::Parts(parts) => parts
				.iter()
				.filter_map(|p| match p {
					ContentPart::Text { text } => Some(text.as_str()),
					_ => None,
				})
				.collect::<Vec<_>>()
				.join("\n"),
		}
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
	Text { text: String },
	ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageUrl {
	pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	pub model: String,
	pub messages: Vec<Message>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_tokens: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_completion_tokens: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub top_p: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stream: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stop: Option<StopSequences>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reasoning_effort: Option<String>,
	#[serde(flatten, default)]
	pub rest: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StopSequences {
	Single(String),
	Many(Vec<String>),
}

impl Request {
	pub fn validate(&self) -> Result<(), CcproxyError> {
		if self.model.is_empty() {
			return Err(CcproxyError::InputError("model is required".into()));
		}
		if self.messages.is_empty() {
			return Err(CcproxyError::InputError("messages must be non-empty".into()));
		}
		if let Some(StopSequences::Many(v)) = &self.stop
			&& v.len() > 4
		{
			return Err(CcproxyError::InputError("stop accepts at most 4 entries".into()));
		}
		Ok(())
	}

	/// `max_completion_tokens ?? max_tokens`, per spec.md §4.5.
	pub fn effective_max_tokens(&self) -> Option<u32> {
		self.max_completion_tokens.or(self.max_tokens)
	}
}

impl RequestType for Request {
	fn model(&self) -> Option<&str> {
		Some(&self.model)
	}

	fn set_model(&mut self, model: String) {
		self.model = model;
	}

	fn is_streaming(&self) -> bool {
		self.stream.unwrap_or(false)
	}

	fn messages(&self) -> Vec<SimpleChatMessage> {
		self
			.messages
			.iter()
			.map(|m| SimpleChatMessage {
				role: role_to_str(m.role).to_string(),
				content: m.content.as_ref().map(|c| c.to_text()).unwrap_or_default(),
			})
			.collect()
	}

	fn set_messages(&mut self, messages: Vec<SimpleChatMessage>) {
		self.messages = messages
			.into_iter()
			.map(|m| Message {
				role: str_to_role(&m.role),
				content: Some(MessageContent::Text(m.content)),
				tool_call_id: None,
				rest: serde_json::Value::Null,
			})
			.collect();
	}

	fn serialize(&self) -> Result<Vec<u8>, CcproxyError> {
		serde_json::to_vec(self).map_err(|e| CcproxyError::TranslationError(e.to_string()))
	}
}

pub fn role_to_str(role: Role) -> &'static str {
	match role {
		Role::System => "system",
		Role::User => "user",
		Role::Assistant => "assistant",
		Role::Tool => "tool",
		Role::Function => "function",
		Role::Developer => "developer",
	}
}

pub fn str_to_role(s: &str) -> Role {
	match s {
		"system" => Role::System,
		"assistant" => Role::Assistant,
		"tool" => Role::Tool,
		"function" => Role::Function,
		"developer" => Role::Developer,
		_ => Role::User,
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Choice {
	pub index: u32,
	pub message: Message,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub finish_reason: Option<async_openai::types::FinishReason>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionUsage {
	pub prompt_tokens: u64,
	pub completion_tokens: u64,
	pub total_tokens: u64,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub prompt_tokens_details: Option<PromptTokensDetails>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub completion_tokens_details: Option<CompletionTokensDetails>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PromptTokensDetails {
	#[serde(default)]
	pub cached_tokens: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionTokensDetails {
	#[serde(default)]
	pub reasoning_tokens: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	pub id: String,
	pub object: String,
	pub model: String,
	pub choices: Vec<Choice>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub usage: Option<CompletionUsage>,
}

impl ResponseType for Response {
	fn usage(&self) -> Usage {
		let Some(u) = &self.usage else {
			return Usage::default();
		};
		Usage {
			prompt_tokens: Some(u.prompt_tokens),
			completion_tokens: Some(u.completion_tokens),
			cache_read_tokens: u.prompt_tokens_details.as_ref().map(|d| d.cached_tokens),
			cache_write_tokens: None,
			reasoning_tokens: u
				.completion_tokens_details
				.as_ref()
				.map(|d| d.reasoning_tokens),
			total_tokens: Some(u.total_tokens),
		}
	}

	fn model(&self) -> Option<&str> {
		Some(&self.model)
	}

	fn serialize(&self) -> Result<Vec<u8>, CcproxyError> {
		serde_json::to_vec(self).map_err(|e| CcproxyError::TranslationError(e.to_string()))
	}
}

/// A single `chat.completion.chunk` SSE event. Hand-rolled (rather than
/// `async_openai::types::CreateChatCompletionStreamResponse`) because the translator needs a
/// non-standard `reasoning_content` delta field for the `<thinking>` round-trip (spec.md
/// §4.5), which the official wire format doesn't carry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChunk {
	pub id: String,
	pub object: &'static str,
	pub model: String,
	pub choices: Vec<StreamChoice>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub usage: Option<CompletionUsage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamChoice {
	pub index: u32,
	pub delta: StreamDelta,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub finish_reason: Option<async_openai::types::FinishReason>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamDelta {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub role: Option<Role>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub content: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub reasoning_content: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tool_calls: Option<Vec<StreamToolCall>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamToolCall {
	pub index: u32,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub id: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub function: Option<StreamFunctionCall>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamFunctionCall {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub name: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub arguments: Option<String>,
}
