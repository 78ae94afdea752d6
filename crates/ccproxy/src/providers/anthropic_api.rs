//! Anthropic API adapter: direct passthrough to `api.anthropic.com`. Grounded on the teacher's
//! `llm/anthropic.rs` + `llm/mod.rs::set_required_fields` (bearer → `x-api-key` rewrite,
//! `anthropic-version` injection).

use super::{HeaderMode, ProviderAdapter};

const ANTHROPIC_BETA_FULL: &str = "claude-code-20250219,oauth-2025-04-20,interleaved-thinking-2025-05-14";
const CLI_USER_AGENT: &str = "claude-cli/1.0.0 (external, cli)";

pub struct AnthropicApi {
	header_mode: HeaderMode,
}

impl AnthropicApi {
	pub fn new(header_mode: HeaderMode) -> Self {
		Self { header_mode }
	}
}

impl ProviderAdapter for AnthropicApi {
	fn name(&self) -> &'static str {
		"anthropic"
	}

	fn base_url(&self) -> &str {
		"https://api.anthropic.com"
	}

	fn header_mode(&self) -> HeaderMode {
		self.header_mode
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
			.header("X-Stainless-Package-Version", "0.30.1")
			.header("content-type", "application/json")
	}
}
