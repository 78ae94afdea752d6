//! Credential Store (C1): locate, parse, and persist per-provider OAuth credentials on disk.
//! Grounded on `original_source/claude_code_proxy/services/credentials.py`: the on-disk shape
//! is a provider-named wrapper object (`claudeAiOauth` for Claude) carrying camelCase fields
//! and a millisecond-epoch `expiresAt`.

use std::io::Write as _;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use ccproxy_core::Redacted;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::CcproxyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
	Claude,
	Copilot,
}

impl Provider {
	pub fn as_str(&self) -> &'static str {
		match self {
			Provider::Claude => "claude",
			Provider::Copilot => "copilot",
		}
	}

	/// The key the credential JSON wraps its payload under, e.g. `claudeAiOauth`.
	fn wrapper_key(&self) -> &'static str {
		match self {
			Provider::Claude => "claudeAiOauth",
			Provider::Copilot => "githubCopilotOauth",
		}
	}
}

/// Immutable record produced by login or refresh. `expires_at` is an absolute instant; the
/// invariant `expires_at > issued_at` is enforced at construction time by both login and
/// refresh (spec.md §3).
#[derive(Debug, Clone)]
pub struct Credential {
	pub provider: Provider,
	pub access_token: Redacted,
	pub refresh_token: Option<Redacted>,
	pub expires_at: Option<DateTime<Utc>>,
	pub scopes: Vec<String>,
	pub subscription_tier: Option<String>,
	pub token_type: String,
}

impl Credential {
	pub fn is_expired_within(&self, buffer: chrono::Duration) -> bool {
		match self.expires_at {
			Some(exp) => exp - Utc::now() <= buffer,
			None => false,
		}
	}
}

/// Wire shape tolerating both camelCase and snake_case field spellings, per spec.md §4.1.
#[derive(Debug, Serialize, Deserialize)]
struct WireCredential {
	#[serde(alias = "access_token")]
	access_token: String,
	#[serde(alias = "refresh_token", default)]
	refresh_token: Option<String>,
	#[serde(alias = "expires_at", default)]
	expires_at: Option<i64>,
	#[serde(default)]
	scopes: Vec<String>,
	#[serde(alias = "subscriptionType", alias = "subscription_tier", default)]
	subscription_tier: Option<String>,
	#[serde(alias = "token_type", default = "default_token_type")]
	token_type: String,
}

fn default_token_type() -> String {
	"Bearer".to_string()
}

pub struct CredentialStore {
	provider: Provider,
	explicit_path: Option<PathBuf>,
}

impl CredentialStore {
	pub fn new(provider: Provider, explicit_path: Option<PathBuf>) -> Self {
		Self {
			provider,
			explicit_path,
		}
	}

	/// Search order from spec.md §4.1: (a) explicit path; (b) `$XDG_CONFIG_HOME/<provider>/credentials.json`;
	/// (c) `~/.<provider>/credentials.json`; (d) `~/.config/<provider>/credentials.json`.
	pub fn find(&self) -> Option<PathBuf> {
		if let Some(p) = &self.explicit_path {
			if p.exists() {
				return Some(p.clone());
			}
			return None;
		}
		for candidate in self.candidate_paths() {
			if candidate.exists() {
				return Some(candidate);
			}
		}
		None
	}

	fn candidate_paths(&self) -> Vec<PathBuf> {
		let name = self.provider.as_str();
		let mut out = Vec::new();
		if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
			out.push(PathBuf::from(xdg).join(name).join("credentials.json"));
		}
		if let Some(home) = dirs_home() {
			out.push(home.join(format!(".{name}")).join("credentials.json"));
			out.push(home.join(".config").join(name).join("credentials.json"));
		}
		out
	}

	fn write_path(&self) -> PathBuf {
		self
			.explicit_path
			.clone()
			.or_else(|| self.candidate_paths().into_iter().next())
			.unwrap_or_else(|| PathBuf::from(format!("{}-credentials.json", self.provider.as_str())))
	}

	pub fn load(&self) -> Result<Option<Credential>, CcproxyError> {
		let Some(path) = self.find() else {
			return Ok(None);
		};
		let bytes = std::fs::read(&path)
			.map_err(|e| CcproxyError::CredentialsInvalid(format!("reading {}: {e}", path.display())))?;
		let root: serde_json::Value = serde_json::from_slice(&bytes)
			.map_err(|e| CcproxyError::CredentialsInvalid(format!("parsing {}: {e}", path.display())))?;
		let wrapped = root
			.get(self.provider.wrapper_key())
			.cloned()
			.unwrap_or(root);
		let wire: WireCredential = serde_json::from_value(wrapped)
			.map_err(|e| CcproxyError::CredentialsInvalid(e.to_string()))?;
		Ok(Some(Credential {
			provider: self.provider,
			access_token: Redacted::new(wire.access_token),
			refresh_token: wire.refresh_token.map(Redacted::new),
			expires_at: wire.expires_at.and_then(ms_epoch_to_instant),
			scopes: wire.scopes,
			subscription_tier: wire.subscription_tier,
			token_type: wire.token_type,
		}))
	}

	/// Atomic write (write-temp-then-rename) with file mode 0600, per spec.md §4.1.
	pub fn save(&self, cred: &Credential) -> Result<(), CcproxyError> {
		let path = self.write_path();
		if let Some(parent) = path.parent() {
			std::fs::create_dir_all(parent)
				.map_err(|e| CcproxyError::CredentialsStorage(e.to_string()))?;
			let mut perms = std::fs::metadata(parent)
				.map_err(|e| CcproxyError::CredentialsStorage(e.to_string()))?
				.permissions();
			perms.set_mode(0o700);
			let _ = std::fs::set_permissions(parent, perms);
		}

		let wire = WireCredential {
			access_token: cred.access_token.expose().to_string(),
			refresh_token: cred.refresh_token.as_ref().map(|r| r.expose().to_string()),
			expires_at: cred.expires_at.map(|t| t.timestamp_millis()),
			scopes: cred.scopes.clone(),
			subscription_tier: cred.subscription_tier.clone(),
			token_type: cred.token_type.clone(),
		};
		let body = serde_json::json!({ self.provider.wrapper_key(): wire });

		let parent = path.parent().unwrap_or_else(|| Path::new("."));
		let mut tmp = tempfile::NamedTempFile::new_in(parent)
			.map_err(|e| CcproxyError::CredentialsStorage(e.to_string()))?;
		tmp
			.write_all(serde_json::to_string_pretty(&body).unwrap().as_bytes())
			.map_err(|e| CcproxyError::CredentialsStorage(e.to_string()))?;
		let mut perms = tmp
			.as_file()
			.metadata()
			.map_err(|e| CcproxyError::CredentialsStorage(e.to_string()))?
			.permissions();
		perms.set_mode(0o600);
		tmp
			.as_file()
			.set_permissions(perms)
			.map_err(|e| CcproxyError::CredentialsStorage(e.to_string()))?;
		tmp
			.persist(&path)
			.map_err(|e| CcproxyError::CredentialsStorage(e.error.to_string()))?;
		Ok(())
	}

	pub fn delete(&self) -> Result<(), CcproxyError> {
		if let Some(path) = self.find() {
			std::fs::remove_file(path).map_err(|e| CcproxyError::CredentialsStorage(e.to_string()))?;
		}
		Ok(())
	}
}

fn ms_epoch_to_instant(ms: i64) -> Option<DateTime<Utc>> {
	chrono::DateTime::from_timestamp_millis(ms)
}

fn dirs_home() -> Option<PathBuf> {
	std::env::var_os("HOME").map(PathBuf::from)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn loads_camel_case_wrapped_credential() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("credentials.json");
		std::fs::write(
			&path,
			r#"{"claudeAiOauth": {"accessToken": "tok", "refreshToken": "ref", "expiresAt": 4102444800000, "scopes": ["a"], "subscriptionType": "pro"}}"#,
		)
		.unwrap();

		let store = CredentialStore::new(Provider::Claude, Some(path));
		let cred = store.load().unwrap().expect("credential should parse");
		assert_eq!(cred.access_token.expose(), "tok");
		assert_eq!(cred.subscription_tier.as_deref(), Some("pro"));
		assert_eq!(cred.token_type, "Bearer");
	}

	#[test]
	fn loads_snake_case_unwrapped_credential() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("credentials.json");
		std::fs::write(&path, r#"{"access_token": "tok2", "token_type": "Bearer"}"#).unwrap();

		let store = CredentialStore::new(Provider::Copilot, Some(path));
		let cred = store.load().unwrap().expect("credential should parse");
		assert_eq!(cred.access_token.expose(), "tok2");
	}

	#[test]
	fn missing_file_returns_none_not_error() {
		let store = CredentialStore::new(Provider::Claude, Some(PathBuf::from("/nonexistent/path/credentials.json")));
		assert!(store.load().unwrap().is_none());
	}

	#[test]
	fn save_then_load_round_trips_and_sets_owner_only_permissions() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("credentials.json");
		let store = CredentialStore::new(Provider::Claude, Some(path.clone()));
		let cred = Credential {
			provider: Provider::Claude,
			access_token: Redacted::new("secret".to_string()),
			refresh_token: None,
			expires_at: None,
			scopes: vec!["profile".to_string()],
			subscription_tier: None,
			token_type: "Bearer".to_string(),
		};
		store.save(&cred).unwrap();

		let mode = std::fs::metadata(&path).unwrap().permissions().mode() & 0o777;
		assert_eq!(mode, 0o600);

		let loaded = store.load().unwrap().expect("saved credential should load back");
		assert_eq!(loaded.access_token.expose(), "secret");
		assert_eq!(loaded.scopes, vec!["profile".to_string()]);
	}

	#[test]
	fn is_expired_within_honors_buffer() {
		let cred = Credential {
			provider: Provider::Claude,
			access_token: Redacted::new("tok".to_string()),
			refresh_token: None,
			expires_at: Some(Utc::now() + chrono::Duration::seconds(30)),
			scopes: vec![],
			subscription_tier: None,
			token_type: "Bearer".to_string(),
		};
		assert!(cred.is_expired_within(chrono::Duration::minutes(1)));
		assert!(!cred.is_expired_within(chrono::Duration::seconds(5)));
	}

	#[test]
	fn no_expiry_is_never_considered_expired() {
		let cred = Credential {
			provider: Provider::Claude,
			access_token: Redacted::new("tok".to_string()),
			refresh_token: None,
			expires_at: None,
			scopes: vec![],
			subscription_tier: None,
			token_type: "Bearer".to_string(),
		};
		assert!(!cred.is_expired_within(chrono::Duration::days(365)));
	}
}
