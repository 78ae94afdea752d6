//! Claude-Code CLI adapter. No teacher counterpart — grounded on
//! `original_source/claude_code_proxy/docker/adapter.py` and
//! `original_source/claude_proxy/services/claude_client.py`. This is the simplified in-process
//! mode named in SPEC_FULL.md §4.8: rather than spawning a local `claude` subprocess, it
//! forwards to `api.anthropic.com` with the Claude-Code system-prompt injection and CLI
//! masquerading headers that make a subscription-tier OAuth token acceptable to the API.

use super::{alias_model, HeaderMode, ProviderAdapter, OPENAI_TO_CLAUDE_MODEL_ALIASES};
use crate::formats::anthropic::{Request as AnthropicRequest, SystemPrompt};

/// The system-prompt text the official Claude Code CLI sends as its first system block, whose
/// presence is part of what makes Anthropic's API accept a Claude Code / Max subscription token.
pub const CLAUDE_CODE_SYSTEM_PROMPT: &str =
	"You are Claude Code, Anthropic's official CLI for Claude.";

const ANTHROPIC_BETA_FULL: &str = "claude-code-20250219,oauth-2025-04-20,interleaved-thinking-2025-05-14";
const CLI_USER_AGENT: &str = "claude-cli/1.0.0 (external, cli)";

pub struct ClaudeCodeCli;

impl ProviderAdapter for ClaudeCodeCli {
	fn name(&self) -> &'static str {
		"claude-code"
	}

	fn base_url(&self) -> &str {
		"https://api.anthropic.com"
	}

	fn header_mode(&self) -> HeaderMode {
		HeaderMode::Full
	}

	fn upstream_path(&self) -> &str {
		"/v1/messages"
	}

	fn apply_full_headers(&self, builder: reqwest::RequestBuilder, access_token: &str) -> reqwest::RequestBuilder {
		builder
			.header("Authorization", format!("Bearer {access_token}"))
			.header("anthropic-version", "2023-06-01")
			.header("anthropic-beta", ANTHROPIC_BETA_FULL)
			.header("User-Agent", CLI_USER_AGENT)
			.header("x-app", "cli")
			.header("X-Stainless-Lang", "js")
			.header("content-type", "application/json")
	}

	fn inject_system_prompt(&self, req: &mut AnthropicRequest) {
		req.system = Some(match req.system.take() {
			Some(existing) => existing.prepend(CLAUDE_CODE_SYSTEM_PROMPT),
			None => SystemPrompt::Text(CLAUDE_CODE_SYSTEM_PROMPT.to_string()),
		});
	}

	fn alias_model(&self, model: &str) -> String {
		alias_model(model, OPENAI_TO_CLAUDE_MODEL_ALIASES)
	}
}
