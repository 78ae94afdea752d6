//! OAuth Engine (C2): PKCE login and refresh-token exchange. Constants are taken from
//! `original_source/claude_code_proxy/services/credentials.py` and
//! `original_source/claude_code_proxy/routers/oauth.py`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use base64::Engine as _;
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use super::credentials::{Credential, CredentialStore, Provider};
use crate::error::CcproxyError;

const CLAUDE_AUTHORIZE_URL: &str = "https://claude.ai/oauth/authorize";
const CLAUDE_TOKEN_URL: &str = "https://console.anthropic.com/v1/oauth/token";
const CLAUDE_CLIENT_ID: &str = "9d1c250a-e61b-44d9-88ed-5944d1962f5e";
const CLAUDE_SCOPES: &str = "org:create_api_key user:profile user:inference";
const CLAUDE_BETA_HEADER: &str = "oauth-2025-04-20";
const LOOPBACK_PORT: u16 = 54545;
const LOGIN_TIMEOUT: Duration = Duration::from_secs(300);
const REFRESH_BUFFER: chrono::Duration = chrono::Duration::seconds(300);

/// The `User-Agent` CCProxy presents when talking to the OAuth/token endpoints, masquerading
/// as the provider's own CLI per spec.md §1/§4.8.
const CLI_USER_AGENT: &str = "claude-cli/1.0.0 (external, cli)";

fn pkce_pair() -> (String, String) {
	let mut verifier_bytes = [0u8; 32];
	rand::rng().fill_bytes(&mut verifier_bytes);
	let verifier = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(verifier_bytes);
	let challenge = base64::engine::general_purpose::URL_SAFE_NO_PAD
		.encode(Sha256::digest(verifier.as_bytes()));
	(verifier, challenge)
}

fn random_state() -> String {
	let mut bytes = [0u8; 32];
	rand::rng().fill_bytes(&mut bytes);
	base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
}

#[derive(Debug, serde::Deserialize)]
struct TokenResponse {
	access_token: String,
	refresh_token: Option<String>,
	expires_in: Option<i64>,
	scope: Option<String>,
	#[serde(alias = "subscriptionType", alias = "subscription_tier")]
	subscription_tier: Option<String>,
}

pub struct OAuthEngine {
	http: reqwest::Client,
	store: CredentialStore,
	/// Serializes refresh calls per provider so concurrent requests share one network exchange
	/// (spec.md §4.2 `get_valid_token`, testable property scenario 4).
	refresh_lock: Arc<Mutex<()>>,
}

impl OAuthEngine {
	pub fn new(store: CredentialStore) -> Self {
		Self {
			http: reqwest::Client::new(),
			store,
			refresh_lock: Arc::new(Mutex::new(())),
		}
	}

	/// Interactive PKCE login (Claude). Opens a loopback listener, walks the user through the
	/// browser, and exchanges the resulting code for tokens.
	pub async fn login(&self) -> Result<Credential, CcproxyError> {
		let (verifier, challenge) = pkce_pair();
		let state = random_state();

		let listener = TcpListener::bind(("127.0.0.1", LOOPBACK_PORT))
			.await
			.map_err(|e| CcproxyError::OAuthLogin(format!("binding loopback listener: {e}")))?;

		let authorize_url = format!(
			"{CLAUDE_AUTHORIZE_URL}?response_type=code&client_id={CLAUDE_CLIENT_ID}&redirect_uri={}&scope={}&state={state}&code_challenge={challenge}&code_challenge_method=S256",
			urlencoding_loopback(),
			urlencoding_scopes(),
		);
		open_browser(&authorize_url);
		tracing::info!(url = %authorize_url, "open this URL to authorize CCProxy");

		let code = tokio::time::timeout(LOGIN_TIMEOUT, accept_callback(listener, state))
			.await
			.map_err(|_| CcproxyError::OAuthLogin("login timed out after 300s".into()))??;

		let body = serde_json::json!({
			"grant_type": "authorization_code",
			"code": code,
			"client_id": CLAUDE_CLIENT_ID,
			"code_verifier": verifier,
			"redirect_uri": "http://localhost:54545/callback",
		});

		let resp = self
			.http
			.post(CLAUDE_TOKEN_URL)
			.header("anthropic-beta", CLAUDE_BETA_HEADER)
			.header("User-Agent", CLI_USER_AGENT)
			.json(&body)
			.send()
			.await
			.map_err(|e| CcproxyError::OAuthLogin(e.to_string()))?;

		if !resp.status().is_success() {
			return Err(CcproxyError::OAuthLogin(format!(
				"token endpoint returned {}",
				resp.status()
			)));
		}
		let token: TokenResponse = resp
			.json()
			.await
			.map_err(|e| CcproxyError::OAuthLogin(e.to_string()))?;

		let cred = Credential {
			provider: Provider::Claude,
			access_token: token.access_token.into(),
			refresh_token: token.refresh_token.map(Into::into),
			expires_at: token
				.expires_in
				.map(|s| Utc::now() + chrono::Duration::seconds(s)),
			scopes: token
				.scope
				.map(|s| s.split_whitespace().map(String::from).collect())
				.unwrap_or_default(),
			subscription_tier: token.subscription_tier,
			token_type: "Bearer".to_string(),
		};
		self.store.save(&cred)?;
		Ok(cred)
	}

	/// Refresh with exponential backoff on 5xx/transport errors, per spec.md §4.2.
	pub async fn refresh(&self, existing: &Credential) -> Result<Credential, CcproxyError> {
		let Some(refresh_token) = &existing.refresh_token else {
			return Err(CcproxyError::OAuthTokenRefresh(
				"no refresh token on file".into(),
			));
		};

		let backoffs = [
			Duration::from_millis(500),
			Duration::from_secs(1),
			Duration::from_secs(2),
		];
		let mut last_err = None;
		for (attempt, backoff) in backoffs.iter().enumerate() {
			let body = serde_json::json!({
				"grant_type": "refresh_token",
				"refresh_token": refresh_token.expose(),
				"client_id": CLAUDE_CLIENT_ID,
			});
			let result = self
				.http
				.post(CLAUDE_TOKEN_URL)
				.header("anthropic-beta", CLAUDE_BETA_HEADER)
				.header("User-Agent", CLI_USER_AGENT)
				.json(&body)
				.send()
				.await;

			match result {
				Ok(resp) if resp.status().is_success() => {
					let token: TokenResponse = resp
						.json()
						.await
						.map_err(|e| CcproxyError::OAuthTokenRefresh(e.to_string()))?;
					let cred = Credential {
						provider: existing.provider,
						access_token: token.access_token.into(),
						refresh_token: token
							.refresh_token
							.map(Into::into)
							.or_else(|| existing.refresh_token.clone()),
						expires_at: token
							.expires_in
							.map(|s| Utc::now() + chrono::Duration::seconds(s)),
						scopes: if existing.scopes.is_empty() {
							token
								.scope
								.map(|s| s.split_whitespace().map(String::from).collect())
								.unwrap_or_default()
						} else {
							existing.scopes.clone()
						},
						subscription_tier: token.subscription_tier.or_else(|| existing.subscription_tier.clone()),
						token_type: "Bearer".to_string(),
					};
					self.store.save(&cred)?;
					return Ok(cred);
				},
				Ok(resp) if resp.status().is_client_error() => {
					return Err(CcproxyError::OAuthTokenRefresh(format!(
						"refresh rejected: {}",
						resp.status()
					)));
				},
				Ok(resp) => last_err = Some(format!("server error {}", resp.status())),
				Err(e) => last_err = Some(e.to_string()),
			}
			if attempt + 1 < backoffs.len() {
				tokio::time::sleep(*backoff).await;
			}
		}
		Err(CcproxyError::OAuthTokenRefresh(
			last_err.unwrap_or_else(|| "unknown error".into()),
		))
	}

	/// Return a valid access token, refreshing first if within `REFRESH_BUFFER` of expiry.
	/// Refreshes are serialized per-engine-instance (one per provider) so a concurrent second
	/// request observes a single token-endpoint call (spec.md §4.2, §8 scenario 4).
	pub async fn get_valid_token(&self) -> Result<String, CcproxyError> {
		let _guard = self.refresh_lock.lock().await;
		let Some(cred) = self.store.load()? else {
			return Err(CcproxyError::CredentialsError("no credential on file".into()));
		};
		if cred.is_expired_within(REFRESH_BUFFER) {
			let refreshed = self.refresh(&cred).await?;
			return Ok(refreshed.access_token.expose().to_string());
		}
		Ok(cred.access_token.expose().to_string())
	}
}

fn urlencoding_loopback() -> String {
	url::form_urlencoded::byte_serialize(b"http://localhost:54545/callback").collect()
}

fn urlencoding_scopes() -> String {
	url::form_urlencoded::byte_serialize(CLAUDE_SCOPES.as_bytes()).collect()
}

async fn accept_callback(listener: TcpListener, expected_state: String) -> Result<String, CcproxyError> {
	use tokio::io::{AsyncReadExt, AsyncWriteExt};

	loop {
		let (mut stream, _) = listener
			.accept()
			.await
			.map_err(|e| CcproxyError::OAuthLogin(e.to_string()))?;
		let mut buf = [0u8; 4096];
		let n = stream
			.read(&mut buf)
			.await
			.map_err(|e| CcproxyError::OAuthLogin(e.to_string()))?;
		let request_line = String::from_utf8_lossy(&buf[..n]);
		let Some(path) = request_line.split_whitespace().nth(1) else {
			continue;
		};
		let url = url::Url::parse(&format!("http://localhost{path}"))
			.map_err(|e| CcproxyError::OAuthLogin(e.to_string()))?;
		let params: HashMap<_, _> = url.query_pairs().into_owned().collect();

		let (status_line, message) = match (params.get("state"), params.get("code")) {
			(Some(state), Some(code)) if *state == expected_state => {
				let code = code.clone();
				let _ = stream
					.write_all(b"HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\n\r\nLogin complete, you may close this tab.")
					.await;
				return Ok(code);
			},
			(Some(_), _) => ("HTTP/1.1 400 Bad Request", "state mismatch, rejected"),
			_ => ("HTTP/1.1 400 Bad Request", "missing code or state"),
		};
		let _ = stream
			.write_all(format!("{status_line}\r\nContent-Type: text/plain\r\n\r\n{message}").as_bytes())
			.await;
	}
}

/// Best-effort browser launch; failure is non-fatal since the URL is also logged.
fn open_browser(url: &str) {
	#[cfg(target_os = "macos")]
	let cmd = "open";
	#[cfg(target_os = "linux")]
	let cmd = "xdg-open";
	#[cfg(target_os = "windows")]
	let cmd = "start";

	#[cfg(any(target_os = "macos", target_os = "linux", target_os = "windows"))]
	let _ = std::process::Command::new(cmd).arg(url).spawn();
}
