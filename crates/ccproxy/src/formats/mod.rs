//! Typed representations of the three wire formats CCProxy speaks, and the
//! `RequestType`/`ResponseType` abstraction that lets the router and translator treat them
//! uniformly. Anthropic types are hand-rolled (see [`anthropic`]); OpenAI Chat and OpenAI
//! Responses reuse `async-openai`'s types directly rather than re-deriving them.

pub mod anthropic;
pub mod openai_chat;
pub mod openai_responses;

use serde::{Deserialize, Serialize};

use crate::error::CcproxyError;

/// One of the three wire formats a request or response can be shaped as.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
	Anthropic,
	OpenAiChat,
	OpenAiResponses,
}

impl Format {
	pub fn as_str(&self) -> &'static str {
		match self {
			Format::Anthropic => "anthropic",
			Format::OpenAiChat => "openai-chat",
			Format::OpenAiResponses => "openai-responses",
		}
	}
}

/// A format-neutral chat message, used for prompt enrichment (prepend/append system-prompt
/// text) regardless of which wire format the caller used. Mirrors
/// `SimpleChatCompletionMessage` in the teacher's `llm::types` module.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimpleChatMessage {
	pub role: String,
	pub content: String,
}

/// Normalized token/cost usage, common across all three formats.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Usage {
	pub prompt_tokens: Option<u64>,
	pub completion_tokens: Option<u64>,
	pub cache_read_tokens: Option<u64>,
	pub cache_write_tokens: Option<u64>,
	pub reasoning_tokens: Option<u64>,
	pub total_tokens: Option<u64>,
}

/// Abstraction over a provider/endpoint-specific *request* shape, implemented by
/// [`anthropic::Request`], [`openai_chat::Request`], and [`openai_responses::Request`].
pub trait RequestType {
	fn model(&self) -> Option<&str>;
	fn set_model(&mut self, model: String);
	fn is_streaming(&self) -> bool;
	fn messages(&self) -> Vec<SimpleChatMessage>;
	fn set_messages(&mut self, messages: Vec<SimpleChatMessage>);
	fn prepend_messages(&mut self, prefix: Vec<SimpleChatMessage>) {
		let mut all = prefix;
		all.extend(self.messages());
		self.set_messages(all);
	}
	fn serialize(&self) -> Result<Vec<u8>, CcproxyError> {
		Err(CcproxyError::UnsupportedConversion(
			"serialize not implemented for this format".into(),
		))
	}
}

/// Abstraction over a provider/endpoint-specific *response* shape.
pub trait ResponseType {
	fn usage(&self) -> Usage;
	fn model(&self) -> Option<&str>;
	fn serialize(&self) -> Result<Vec<u8>, CcproxyError>;
}
