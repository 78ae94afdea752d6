//! OpenAI API adapter: direct passthrough to `api.openai.com`. Grounded on the teacher's
//! `llm/openai.rs` path-by-route-type mapping; no masquerade headers, since OpenAI is accessed
//! with a real API key rather than a subscription-tier token.

use super::{HeaderMode, ProviderAdapter};
use crate::formats::Format;

pub struct OpenAiApi {
	route: Format,
}

impl OpenAiApi {
	pub fn new(route: Format) -> Self {
		Self { route }
	}
}

impl ProviderAdapter for OpenAiApi {
	fn name(&self) -> &'static str {
		"openai"
	}

	fn base_url(&self) -> &str {
		"https://api.openai.com"
	}

	fn header_mode(&self) -> HeaderMode {
		HeaderMode::Full
	}

	fn upstream_path(&self) -> &str {
		match self.route {
			Format::OpenAiResponses => "/v1/responses",
			_ => "/v1/chat/completions",
		}
	}

	fn apply_full_headers(&self, builder: reqwest::RequestBuilder, access_token: &str) -> reqwest::RequestBuilder {
		builder
			.header("Authorization", format!("Bearer {access_token}"))
			.header("content-type", "application/json")
	}
}
