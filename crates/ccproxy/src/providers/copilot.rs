//! GitHub Copilot adapter. No teacher counterpart — grounded on the shape of
//! `llm/openai.rs` (Copilot speaks OpenAI Chat natively) plus the device-code OAuth specifics
//! from `original_source/claude_code_proxy/routers/oauth.py` (see [`crate::auth`]).

use super::{HeaderMode, ProviderAdapter};

/// Value official Copilot clients send; required by the upstream API to identify the calling
/// product.
const COPILOT_INTEGRATION_ID: &str = "vscode-chat";
const EDITOR_VERSION: &str = "vscode/1.95.0";

pub struct GitHubCopilot;

impl ProviderAdapter for GitHubCopilot {
	fn name(&self) -> &'static str {
		"copilot"
	}

	fn base_url(&self) -> &str {
		"https://api.githubcopilot.com"
	}

	fn header_mode(&self) -> HeaderMode {
		HeaderMode::Full
	}

	fn upstream_path(&self) -> &str {
		"/chat/completions"
	}

	fn apply_full_headers(&self, builder: reqwest::RequestBuilder, access_token: &str) -> reqwest::RequestBuilder {
		builder
			.header("Authorization", format!("Bearer {access_token}"))
			.header("Copilot-Integration-Id", COPILOT_INTEGRATION_ID)
			.header("Editor-Version", EDITOR_VERSION)
			.header("content-type", "application/json")
	}

	/// Copilot already speaks OpenAI Chat model names 1:1 (spec.md §4.8); no alias table needed.
	fn alias_model(&self, model: &str) -> String {
		model.to_string()
	}
}
