//! Provider Adapter (C8): per-upstream header construction, path mapping, system-prompt
//! injection, model aliasing, and usage extraction. Grounded on the teacher's `llm::anthropic`/
//! `llm::openai` per-provider modules and `llm::mod::set_required_fields`'s header-rewrite
//! pattern; `GitHubCopilot`/`ClaudeCodeCli` have no teacher counterpart (see SPEC_FULL.md §4.8).

pub mod anthropic_api;
pub mod claude_code;
pub mod copilot;
pub mod openai_api;

use crate::formats::anthropic::Request as AnthropicRequest;

/// How aggressively the adapter rewrites outbound headers, per spec.md §4.8.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMode {
	/// Authorization + `anthropic-version` + `anthropic-beta: oauth-2025-04-20` + content-type/accept only.
	Minimal,
	/// Full masquerade: beta headers, CLI user-agent, `x-app`, `X-Stainless-*`.
	Full,
	/// No header transforms at all.
	Passthrough,
}

/// Longest-prefix-match model alias table from spec.md §4.8, shared by every adapter that talks
/// to the Anthropic API under an OpenAI-style model name.
pub const OPENAI_TO_CLAUDE_MODEL_ALIASES: &[(&str, &str)] = &[
	("gpt-4o-mini", "claude-3-5-haiku-latest"),
	("gpt-4o", "claude-3-5-sonnet-latest"),
	("gpt-4", "claude-3-5-sonnet-latest"),
	("gpt-3.5", "claude-3-5-haiku-latest"),
	("o1-mini", "claude-sonnet-4"),
	("o1", "claude-opus-4"),
];

/// Alias `model` by longest-prefix match against `table`; Anthropic-native model names (no
/// prefix match) pass through unchanged.
pub fn alias_model(model: &str, table: &[(&str, &str)]) -> String {
	table
		.iter()
		.filter(|(prefix, _)| model.starts_with(prefix))
		.max_by_key(|(prefix, _)| prefix.len())
		.map(|(_, target)| target.to_string())
		.unwrap_or_else(|| model.to_string())
}

/// Per-provider behavior: path mapping, header construction, optional body transform, model
/// aliasing, and upstream base URL. One adapter instance per configured provider.
pub trait ProviderAdapter: Send + Sync {
	fn name(&self) -> &'static str;
	fn base_url(&self) -> &str;
	fn header_mode(&self) -> HeaderMode;

	/// Upstream path for this adapter, independent of the ingress route (spec.md §4.8: e.g.
	/// `/openai/v1/chat/completions` → `/v1/messages` under Anthropic mode).
	fn upstream_path(&self) -> &str;

	/// Apply this adapter's header policy to an outbound request builder. `access_token` is
	/// already-refreshed (via C2/C3); callers never see a stale token here.
	fn apply_headers(&self, builder: reqwest::RequestBuilder, access_token: &str) -> reqwest::RequestBuilder {
		match self.header_mode() {
			HeaderMode::Passthrough => builder,
			HeaderMode::Minimal => builder
				.header("Authorization", format!("Bearer {access_token}"))
				.header("anthropic-version", "2023-06-01")
				.header("anthropic-beta", "oauth-2025-04-20")
				.header("content-type", "application/json")
				.header("accept", "application/json"),
			HeaderMode::Full => self.apply_full_headers(builder, access_token),
		}
	}

	/// Hook for `Full`-mode adapters to add their own masquerade headers on top of the base
	/// Authorization header. Default matches `Minimal` since most providers need no masquerade.
	fn apply_full_headers(&self, builder: reqwest::RequestBuilder, access_token: &str) -> reqwest::RequestBuilder {
		builder.header("Authorization", format!("Bearer {access_token}"))
	}

	/// Claude-Code system-prompt injection (spec.md §4.8's body-transform bullet). A no-op for
	/// every adapter except [`claude_code::ClaudeCodeCli`].
	fn inject_system_prompt(&self, _req: &mut AnthropicRequest) {}

	fn alias_model(&self, model: &str) -> String {
		model.to_string()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn exact_prefix_maps_to_claude_model() {
		assert_eq!(alias_model("gpt-4o", OPENAI_TO_CLAUDE_MODEL_ALIASES), "claude-3-5-sonnet-latest");
	}

	#[test]
	fn longest_prefix_wins_over_shorter_overlapping_prefix() {
		// "gpt-4o-mini" and "gpt-4o" both prefix-match "gpt-4o-mini-2024", the longer one wins.
		assert_eq!(
			alias_model("gpt-4o-mini-2024", OPENAI_TO_CLAUDE_MODEL_ALIASES),
			"claude-3-5-haiku-latest"
		);
	}

	#[test]
	fn unmatched_model_passes_through_unchanged() {
		assert_eq!(alias_model("claude-3-5-sonnet-latest", OPENAI_TO_CLAUDE_MODEL_ALIASES), "claude-3-5-sonnet-latest");
	}
}
