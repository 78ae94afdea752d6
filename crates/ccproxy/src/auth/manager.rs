//! Auth Manager (C3): unifies bearer-token and OAuth credentials behind one capability set.
//! Modeled as a closed tagged union per the Design Note in spec.md §9, not a trait-object
//! hierarchy.

use std::sync::Arc;

use super::credentials::Provider;
use super::oauth::OAuthEngine;
use crate::error::CcproxyError;

#[derive(Debug, Clone)]
pub struct UserProfile {
	pub org_uuid: String,
	pub org_name: String,
	pub account_uuid: String,
	pub account_email: String,
	pub display_name: Option<String>,
}

pub enum AuthCapability {
	/// A static, never-expiring token configured by the operator.
	BearerToken { token: String },
	/// Delegates to the OAuth engine for a specific provider.
	OAuth {
		provider: Provider,
		engine: Arc<OAuthEngine>,
	},
}

impl AuthCapability {
	pub async fn get_access_token(&self) -> Result<String, CcproxyError> {
		match self {
			AuthCapability::BearerToken { token } => Ok(token.clone()),
			AuthCapability::OAuth { engine, .. } => engine.get_valid_token().await,
		}
	}

	pub fn is_authenticated(&self) -> bool {
		matches!(self, AuthCapability::BearerToken { .. } | AuthCapability::OAuth { .. })
	}

	pub fn provider_name(&self) -> &str {
		match self {
			AuthCapability::BearerToken { .. } => "static",
			AuthCapability::OAuth { provider, .. } => provider.as_str(),
		}
	}

	/// `UserProfile` is only meaningful for OAuth-backed capabilities; bearer tokens never
	/// carry one (spec.md §4.3).
	pub async fn get_user_profile(&self) -> Option<UserProfile> {
		match self {
			AuthCapability::BearerToken { .. } => None,
			AuthCapability::OAuth { .. } => None, // fetched on demand by `ccproxy auth info`, not cached here
		}
	}
}

/// Holds the server's configured static auth token (if any) and the per-provider OAuth
/// capabilities used for upstream calls.
pub struct AuthManager {
	server_token: Option<String>,
	providers: std::collections::HashMap<Provider, Arc<OAuthEngine>>,
	/// OpenAI is accessed with a real API key rather than an OAuth subscription token, so it is
	/// modeled as a plain `BearerToken` capability outside the `providers` OAuth map.
	openai_api_key: Option<String>,
}

impl AuthManager {
	pub fn new(server_token: Option<String>) -> Self {
		Self {
			server_token,
			providers: std::collections::HashMap::new(),
			openai_api_key: None,
		}
	}

	pub fn with_provider(mut self, provider: Provider, engine: OAuthEngine) -> Self {
		self.providers.insert(provider, Arc::new(engine));
		self
	}

	pub fn with_openai_api_key(mut self, key: Option<String>) -> Self {
		self.openai_api_key = key;
		self
	}

	/// Resolve the upstream auth capability for a [`ProviderAdapter`](crate::providers::ProviderAdapter)
	/// by its `name()`, the mapping the router (C10) uses after it has picked an adapter.
	pub fn capability_for_adapter(&self, adapter_name: &str) -> Result<AuthCapability, CcproxyError> {
		match adapter_name {
			"anthropic" | "claude-code" => self
				.capability_for(Provider::Claude)
				.ok_or_else(|| CcproxyError::CredentialsError("no Claude credential on file; run `ccproxy auth login`".into())),
			"copilot" => self
				.capability_for(Provider::Copilot)
				.ok_or_else(|| CcproxyError::CredentialsError("no Copilot credential on file; run `ccproxy auth login`".into())),
			"openai" => self
				.openai_api_key
				.clone()
				.map(|token| AuthCapability::BearerToken { token })
				.ok_or_else(|| CcproxyError::CredentialsError("no OpenAI API key configured".into())),
			other => Err(CcproxyError::CredentialsError(format!("unknown provider adapter {other}"))),
		}
	}

	/// Authenticate an *incoming* client request. Spec.md §4.3: if a server-side token is
	/// configured, the request's Bearer token must match it exactly or the request fails with
	/// 401 + `WWW-Authenticate: Bearer`. If no server-side token is configured, any or no token
	/// is accepted (local-use mode).
	pub fn authenticate_client(&self, bearer: Option<&str>) -> Result<(), CcproxyError> {
		match &self.server_token {
			Some(expected) if bearer == Some(expected.as_str()) => Ok(()),
			Some(_) => Err(CcproxyError::AuthError),
			None => Ok(()),
		}
	}

	/// Resolve the upstream auth capability for `provider`.
	pub fn capability_for(&self, provider: Provider) -> Option<AuthCapability> {
		self
			.providers
			.get(&provider)
			.map(|engine| AuthCapability::OAuth {
				provider,
				engine: engine.clone(),
			})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn no_server_token_accepts_any_client_request() {
		let manager = AuthManager::new(None);
		assert!(manager.authenticate_client(None).is_ok());
		assert!(manager.authenticate_client(Some("whatever")).is_ok());
	}

	#[test]
	fn configured_server_token_requires_exact_match() {
		let manager = AuthManager::new(Some("secret".to_string()));
		assert!(manager.authenticate_client(Some("secret")).is_ok());
		assert!(manager.authenticate_client(Some("wrong")).is_err());
		assert!(manager.authenticate_client(None).is_err());
	}

	#[test]
	fn openai_adapter_resolves_to_bearer_token_from_api_key() {
		let manager = AuthManager::new(None).with_openai_api_key(Some("sk-test".to_string()));
		let cap = manager.capability_for_adapter("openai").unwrap();
		assert_eq!(cap.provider_name(), "static");
		assert!(cap.is_authenticated());
	}

	#[test]
	fn openai_adapter_without_api_key_is_an_error() {
		let manager = AuthManager::new(None);
		assert!(manager.capability_for_adapter("openai").is_err());
	}

	#[test]
	fn unknown_adapter_name_is_an_error() {
		let manager = AuthManager::new(None);
		assert!(manager.capability_for_adapter("not-a-real-provider").is_err());
	}

	#[test]
	fn missing_claude_credential_yields_credentials_error() {
		let manager = AuthManager::new(None);
		let err = manager.capability_for_adapter("anthropic").unwrap_err();
		assert!(matches!(err, CcproxyError::CredentialsError(_)));
	}
}
