//! OpenAI Responses wire types, built directly on `async_openai::types::responses` the way
//! the teacher's `llm::types::responses` module does — this is the one format where the
//! upstream crate's generated types map cleanly onto what the router/translator need, so they
//! are reused rather than re-declared.

use async_openai::types::responses::{
	Content, ContentType, Input, InputContent, InputItem, InputMessage, OutputContent, OutputText,
	Role,
};
use serde::{Deserialize, Serialize};

use super::{RequestType, ResponseType, SimpleChatMessage, Usage};
use crate::error::CcproxyError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Request {
	pub input: Input,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub model: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub instructions: Option<String>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub max_output_tokens: Option<u32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub temperature: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub top_p: Option<f32>,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub stream: Option<bool>,
	#[serde(flatten, default)]
	pub rest: serde_json::Value,
}

impl Request {
	pub fn validate(&self) -> Result<(), CcproxyError> {
		if self.model.as_deref().unwrap_or_default().is_empty() {
			return Err(CcproxyError::InputError("model is required".into()));
		}
		Ok(())
	}
}

fn message_to_input_item(msg: SimpleChatMessage) -> InputItem {
	let role = match msg.role.as_str() {
		"assistant" => Role::Assistant,
		"system" => Role::System,
		"developer" => Role::Developer,
		_ => Role::User,
	};
	InputItem::Message(InputMessage {
		kind: Default::default(),
		role,
		content: InputContent::TextInput(msg.content),
	})
}

impl RequestType for Request {
	fn model(&self) -> Option<&str> {
		self.model.as_deref()
	}

	fn set_model(&mut self, model: String) {
		self.model = Some(model);
	}

	fn is_streaming(&self) -> bool {
		self.stream.unwrap_or(false)
	}

	fn messages(&self) -> Vec<SimpleChatMessage> {
		let mut out = Vec::new();
		if let Some(instructions) = &self.instructions {
			out.push(SimpleChatMessage {
				role: "system".into(),
				content: instructions.clone(),
			});
		}
		match &self.input {
			Input::Text(text) => out.push(SimpleChatMessage {
				role: "user".into(),
				content: text.clone(),
			}),
			Input::Items(items) => {
				for item in items {
					let InputItem::Message(msg) = item else {
						continue;
					};
					let content = match &msg.content {
						InputContent::TextInput(text) => text.clone(),
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
						Role::User => "user",
						Role::Assistant => "assistant",
						Role::System => "system",
						Role::Developer => "developer",
					};
					out.push(SimpleChatMessage {
						role: role.into(),
						content,
					});
				}
			},
		}
		out
	}

	fn set_messages(&mut self, messages: Vec<SimpleChatMessage>) {
		let (system, rest): (Vec<_>, Vec<_>) = messages.into_iter().partition(|m| m.role == "system");
		if let Some(first) = system.into_iter().next() {
			self.instructions = Some(first.content);
		}
		self.input = Input::Items(rest.into_iter().map(message_to_input_item).collect());
	}

	fn serialize(&self) -> Result<Vec<u8>, CcproxyError> {
		serde_json::to_vec(self).map_err(|e| CcproxyError::TranslationError(e.to_string()))
	}
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResponseUsage {
	pub input_tokens: u64,
	pub output_tokens: u64,
	#[serde(flatten, default)]
	pub rest: serde_json::Value,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Response {
	pub id: String,
	pub status: String,
	pub output: Vec<OutputContent>,
	pub model: String,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub usage: Option<ResponseUsage>,
	#[serde(flatten, default)]
	pub rest: serde_json::Value,
}

impl ResponseType for Response {
	fn usage(&self) -> Usage {
		let Some(u) = &self.usage else {
			return Usage::default();
		};
		Usage {
			prompt_tokens: Some(u.input_tokens),
			completion_tokens: Some(u.output_tokens),
			cache_read_tokens: None,
			cache_write_tokens: None,
			reasoning_tokens: None,
			total_tokens: Some(u.input_tokens + u.output_tokens),
		}
	}

	fn model(&self) -> Option<&str> {
		Some(&self.model)
	}

	fn serialize(&self) -> Result<Vec<u8>, CcproxyError> {
		serde_json::to_vec(self).map_err(|e| CcproxyError::TranslationError(e.to_string()))
	}
}

pub fn extract_output_text(output: &[OutputContent]) -> String {
	output
		.iter()
		.filter_map(|o| match o {
			OutputContent::Message(msg) => Some(msg),
			_ => None,
		})
		.flat_map(|msg| {
			msg.content.iter().filter_map(|c| match c {
				Content::OutputText(t) => Some(t.text.clone()),
				_ => None,
			})
		})
		.collect::<Vec<_>>()
		.join("")
}

pub fn text_output(text: String) -> OutputContent {
	use async_openai::types::responses::OutputMessage;
	OutputContent::Message(OutputMessage {
		id: String::new(),
		kind: Default::default(),
		role: Role::Assistant,
		status: Default::default(),
		content: vec![Content::OutputText(OutputText {
			text,
			annotations: vec![],
		})],
	})
}

/// Streaming event kinds named in spec.md §3: `response.created`, `response.in_progress`,
/// `response.output_text.delta`, `response.reasoning_summary_text.delta`,
/// `response.completed`, `response.failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
	#[serde(rename = "response.created")]
	Created { response: Box<Response> },
	#[serde(rename = "response.in_progress")]
	InProgress { response: Box<Response> },
	#[serde(rename = "response.output_text.delta")]
	OutputTextDelta { item_id: String, delta: String },
	#[serde(rename = "response.reasoning_summary_text.delta")]
	ReasoningSummaryTextDelta { item_id: String, delta: String },
	#[serde(rename = "response.completed")]
	Completed { response: Box<Response> },
	#[serde(rename = "response.failed")]
	Failed { response: Box<Response> },
}
