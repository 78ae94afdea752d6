//! Hand-rolled Anthropic Messages API types. Unlike the OpenAI formats (which reuse
//! `async-openai`'s types), there is no general-purpose Anthropic crate in the dependency
//! stack, so these are modeled directly against the wire format, following the same
//! `rest: serde_json::Value` passthrough-plus-typed-accessors pattern the teacher uses for its
//! loosely-typed request/response structs, plus a `typed` submodule with the fully-tagged
//! content block enum for the translator to pattern-match on.

use serde::{Deserialize, Serialize};

use super::{RequestType, ResponseType, SimpleChatMessage, Usage};
use crate::error::CcproxyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
	User,
	Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SystemPrompt {
	Text(String),
	Blocks(Vec<typed::TextBlock>),
}

impl SystemPrompt {
	/// Flatten into a single string for prompt-enrichment purposes.
	pub fn to_text(&self) -> String {
		match self {
			SystemPrompt::Text(s) => s.clone(),
			SystemPrompt::Blocks(blocks) => blocks
				.iter()
				.map(|b| b.text.as_str())
				.collect::<Vec<_>>()
				.join("\n\n"),
		}
	}

	/// Prepend `text` as the first block, per spec.md §4.8's Claude-Code system-prompt
	/// injection rule: string system prompt becomes `[text, existing]`; list system prompt
	/// becomes `[text, *existing]`; if `text` is already first, leave as-is.
	pub fn prepend(self, text: &str) -> SystemPrompt {
		let mut blocks = match self {
			SystemPrompt::Text(s) => vec![typed::TextBlock::new(s)],
			SystemPrompt::Blocks(b) => b,
		};
		if blocks.first().map(|b| b.text.as_str()) == Some(text) {
			return SystemPrompt::Blocks(blocks);
		}
		blocks.insert(0, typed::TextBlock::new(text.to_string()));
		SystemPrompt::Blocks(blocks)
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestMessage {
	pub role: Role,
	pub content: typed::MessageContent,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThinkingConfig {
	#[serde(rename = "type")]
	pub kind: String, // "enabled" | "disabled"
	pub budget_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub user_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	pub model: String,
	pub max_tokens: u32,
	pub messages: Vec<RequestMessage>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub system: Option<SystemPrompt>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub top_p: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub top_k: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stream: Option<bool>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stop_sequences: Option<Vec<String>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tools: Option<Vec<typed::Tool>>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub tool_choice: Option<typed::ToolChoice>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub thinking: Option<ThinkingConfig>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub metadata: Option<Metadata>,
	/// Everything not modeled above, preserved byte-for-byte on re-serialization.
	#[serde(flatten, default)]
	pub rest: serde_json::Value,
}

impl Request {
	pub fn validate(&self) -> Result<(), CcproxyError> {
		if self.model.is_empty() {
			return Err(CcproxyError::InputError("model is required".into()));
		}
		if self.max_tokens < 1 {
			return Err(CcproxyError::InputError("max_tokens must be >= 1".into()));
		}
		if let Some(stops) = &self.stop_sequences
			&& stops.len() > 4
		{
			return Err(CcproxyError::InputError(
				"stop_sequences accepts at most 4 entries".into(),
			));
		}
		if self.messages.is_empty() {
			return Err(CcproxyError::InputError("messages must be non-empty".into()));
		}
		if !matches!(self.messages[0].role, Role::User) {
			return Err(CcproxyError::InputError(
				"the first message must have role user".into(),
			));
		}
		Ok(())
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
		let mut out = Vec::new();
		if let Some(system) = &self.system {
			out.push(SimpleChatMessage {
				role: "system".into(),
				content: system.to_text(),
			});
		}
		for m in &self.messages {
			out.push(SimpleChatMessage {
				role: match m.role {
					Role::User => "user".into(),
					Role::Assistant => "assistant".into(),
				},
				content: m.content.to_text(),
			});
		}
		out
	}

	fn set_messages(&mut self, messages: Vec<SimpleChatMessage>) {
		let mut system_texts = Vec::new();
		let mut rest = Vec::new();
		for m in messages {
			if m.role == "system" {
				system_texts.push(m.content);
			} else {
				let role = if m.role == "assistant" {
					Role::Assistant
				} else {
					Role::User
				};
				rest.push(RequestMessage {
					role,
					content: typed::MessageContent::Text(m.content),
				});
			}
		}
		if !system_texts.is_empty() {
			self.system = Some(SystemPrompt::Text(system_texts.join("\n\n")));
		}
		self.messages = rest;
	}

	fn serialize(&self) -> Result<Vec<u8>, CcproxyError> {
		serde_json::to_vec(self).map_err(|e| CcproxyError::TranslationError(e.to_string()))
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseUsage {
	pub input_tokens: u64,
	pub output_tokens: u64,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cache_creation_input_tokens: Option<u64>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub cache_read_input_tokens: Option<u64>,
	#[serde(flatten, default)]
	pub rest: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	pub id: String,
	#[serde(rename = "type")]
	pub kind: String, // always "message"
	pub role: Role,
	pub content: Vec<typed::ContentBlock>,
	pub model: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stop_reason: Option<typed::StopReason>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stop_sequence: Option<String>,
	pub usage: ResponseUsage,
}

impl ResponseType for Response {
	fn usage(&self) -> Usage {
		Usage {
			prompt_tokens: Some(self.usage.input_tokens),
			completion_tokens: Some(self.usage.output_tokens),
			cache_read_tokens: self.usage.cache_read_input_tokens,
			cache_write_tokens: self.usage.cache_creation_input_tokens,
			reasoning_tokens: None,
			total_tokens: Some(self.usage.input_tokens + self.usage.output_tokens),
		}
	}

	fn model(&self) -> Option<&str> {
		Some(&self.model)
	}

	fn serialize(&self) -> Result<Vec<u8>, CcproxyError> {
		serde_json::to_vec(self).map_err(|e| CcproxyError::TranslationError(e.to_string()))
	}
}

/// The fully-tagged types used by the translator and stream state machine, split out from the
/// passthrough-friendly `Request`/`Response` above the way the teacher splits `messages.rs`
/// into loosely-typed wire structs plus a `typed` submodule of exhaustively-tagged enums.
pub mod typed {
	use serde::{Deserialize, Serialize};

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct TextBlock {
		#[serde(rename = "type")]
		pub kind: TextBlockType,
		pub text: String,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	#[serde(rename_all = "snake_case")]
	pub enum TextBlockType {
		Text,
	}

	impl TextBlock {
		pub fn new(text: String) -> Self {
			Self {
				kind: TextBlockType::Text,
				text,
			}
		}
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	#[serde(untagged)]
	pub enum MessageContent {
		Text(String),
		Blocks(Vec<ContentBlock>),
	}

	impl MessageContent {
		pub fn to_text(&self) -> String {
			match self {
				MessageContent::Text(s) => s.clone(),
				MessageContent::Blocks(blocks) => blocks
					.iter()
					.filter_map(|b| match b {
						ContentBlock::Text { text } => Some(text.as_str()),
						_ => None,
					})
					.collect::<Vec<_>>()
					.join("\n"),
			}
		}
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	#[serde(tag = "type", rename_all = "snake_case")]
	pub enum ContentBlock {
		Text {
			text: String,
		},
		Image {
			source: ImageSource,
		},
		Thinking {
			thinking: String,
			signature: String,
		},
		RedactedThinking {
			data: String,
		},
		ToolUse {
			id: String,
			name: String,
			input: serde_json::Value,
		},
		ToolResult {
			tool_use_id: String,
			#[serde(default)]
			content: ToolResultContent,
			#[serde(default, skip_serializing_if = "std::ops::Not::not")]
			is_error: bool,
		},
		#[serde(other)]
		Unknown,
	}

	#[derive(Debug, Clone, Default, Serialize, Deserialize)]
	#[serde(untagged)]
	pub enum ToolResultContent {
		#[default]
		Empty,
		Text(String),
		Blocks(Vec<ContentBlock>),
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	#[serde(tag = "type", rename_all = "snake_case")]
	pub enum ImageSource {
		Base64 { media_type: String, data: String },
		Url { url: String },
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct Tool {
		pub name: String,
		#[serde(skip_serializing_if = "Option::is_none")]
		pub description: Option<String>,
		pub input_schema: serde_json::Value,
	}

	#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
	#[serde(tag = "type", rename_all = "snake_case")]
	pub enum ToolChoice {
		Auto,
		Any,
		None,
		Tool { name: String },
	}

	#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
	#[serde(rename_all = "snake_case")]
	pub enum StopReason {
		EndTurn,
		MaxTokens,
		ToolUse,
		StopSequence,
	}

	/// Tagged union of every Anthropic Messages streaming event kind named in spec.md §3.
	#[derive(Debug, Clone, Serialize, Deserialize)]
	#[serde(tag = "type", rename_all = "snake_case")]
	pub enum StreamEvent {
		MessageStart {
			message: Box<super::Response>,
		},
		ContentBlockStart {
			index: u32,
			content_block: ContentBlock,
		},
		ContentBlockDelta {
			index: u32,
			delta: ContentBlockDelta,
		},
		ContentBlockStop {
			index: u32,
		},
		MessageDelta {
			delta: MessageDeltaFields,
			usage: MessageDeltaUsage,
		},
		MessageStop,
		Ping,
		Error {
			error: StreamErrorBody,
		},
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	#[serde(tag = "type", rename_all = "snake_case")]
	pub enum ContentBlockDelta {
		TextDelta { text: String },
		InputJsonDelta { partial_json: String },
		ThinkingDelta { thinking: String },
		SignatureDelta { signature: String },
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct MessageDeltaFields {
		#[serde(skip_serializing_if = "Option::is_none")]
		pub stop_reason: Option<StopReason>,
		#[serde(skip_serializing_if = "Option::is_none")]
		pub stop_sequence: Option<String>,
	}

	#[derive(Debug, Clone, Default, Serialize, Deserialize)]
	pub struct MessageDeltaUsage {
		pub output_tokens: u64,
	}

	#[derive(Debug, Clone, Serialize, Deserialize)]
	pub struct StreamErrorBody {
		#[serde(rename = "type")]
		pub kind: String,
		pub message: String,
	}
}
