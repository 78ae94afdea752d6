//! Format Translator (C5): pairwise conversion of requests, non-stream responses, and stream
//! events between Anthropic Messages, OpenAI Chat Completions, and OpenAI Responses.
//!
//! Anthropic⇄Responses is composed through Chat (spec.md §4.5, §9: "OpenAI-Chat is a practical
//! hub since it is the simplest union of the three"); Anthropic⇄Chat and Chat⇄Responses are
//! direct pairwise converters. Passthrough (source_format == target_format) is handled by the
//! caller (the router, C10) and never reaches this module — SSE framing must stay byte-exact in
//! that case.

pub mod anthropic_chat;
pub mod anthropic_responses;
pub mod chat_responses;

/// Anthropic `stop_reason` used as the canonical intermediate when mapping stop reasons
/// between all three formats (spec.md §4.5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
	EndTurn,
	MaxTokens,
	ToolUse,
	StopSequence,
}

impl StopReason {
	pub fn to_anthropic(self) -> crate::formats::anthropic::typed::StopReason {
		use crate::formats::anthropic::typed::StopReason as A;
		match self {
			StopReason::EndTurn => A::EndTurn,
			StopReason::MaxTokens => A::MaxTokens,
			StopReason::ToolUse => A::ToolUse,
			StopReason::StopSequence => A::StopSequence,
		}
	}

	pub fn from_anthropic(r: crate::formats::anthropic::typed::StopReason) -> Self {
		use crate::formats::anthropic::typed::StopReason as A;
		match r {
			A::EndTurn => StopReason::EndTurn,
			A::MaxTokens => StopReason::MaxTokens,
			A::ToolUse => StopReason::ToolUse,
			A::StopSequence => StopReason::StopSequence,
		}
	}

	/// OpenAI Chat `finish_reason`. The reverse mapping (`from_openai_finish_reason`) picks the
	/// first match per spec.md §4.5 ("`end_turn`↔`stop`... `stop_sequence`↔`stop`. The reverse
	/// mapping picks the first match"), i.e. `stop` always maps back to `EndTurn`.
	pub fn to_openai_finish_reason(self) -> async_openai::types::FinishReason {
		use async_openai::types::FinishReason as F;
		match self {
			StopReason::EndTurn | StopReason::StopSequence => F::Stop,
			StopReason::MaxTokens => F::Length,
			StopReason::ToolUse => F::ToolCalls,
		}
	}

	pub fn from_openai_finish_reason(r: async_openai::types::FinishReason) -> Self {
		use async_openai::types::FinishReason as F;
		match r {
			F::Stop => StopReason::EndTurn,
			F::Length => StopReason::MaxTokens,
			F::ToolCalls | F::FunctionCall => StopReason::ToolUse,
			F::ContentFilter => StopReason::EndTurn,
		}
	}
}

/// Micro-chunking config for the opt-in coarse-to-fine text re-splitting described in spec.md
/// §4.5. Deterministic for identical input: the split points depend only on word boundaries,
/// never on wall-clock time.
#[derive(Debug, Clone, Copy)]
pub struct MicroChunkConfig {
	pub words_per_chunk: usize,
	pub inter_chunk_delay: std::time::Duration,
}

impl Default for MicroChunkConfig {
	fn default() -> Self {
		Self {
			words_per_chunk: 3,
			inter_chunk_delay: std::time::Duration::from_millis(10),
		}
	}
}

/// Split `text` into chunks of roughly `words_per_chunk` words, preserving the exact original
/// bytes when chunks are concatenated back together (whitespace is kept with the word that
/// precedes it).
pub fn micro_chunks(text: &str, words_per_chunk: usize) -> Vec<String> {
	if words_per_chunk == 0 || text.is_empty() {
		return vec![text.to_string()];
	}
	let mut chunks = Vec::new();
	let mut current = String::new();
	let mut word_count = 0;
	let mut chars = text.char_indices().peekable();
	let mut in_word = false;
	for (_, c) in &mut chars {
		current.push(c);
		if c.is_whitespace() {
			in_word = false;
		} else if !in_word {
			in_word = true;
			word_count += 1;
			if word_count > words_per_chunk {
				let split = current.pop().unwrap();
				chunks.push(std::mem::take(&mut current));
				current.push(split);
				word_count = 1;
			}
		}
	}
	if !current.is_empty() {
		chunks.push(current);
	}
	chunks
}
