use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

/// Wraps a secret value (access token, refresh token, client secret) so that it can be carried
/// in structs that derive `Debug`/logged by `tracing` without leaking into a log line by accident.
/// Mirrors the discipline CCProxy's credential store needs: never let a token reach stderr or a
/// serialized error body.
#[derive(Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Redacted(SecretString);

impl Redacted {
	pub fn new(value: impl Into<String>) -> Self {
		Self(SecretString::from(value.into()))
	}

	pub fn expose(&self) -> &str {
		self.0.expose_secret()
	}
}

impl fmt::Debug for Redacted {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Redacted(..)")
	}
}

impl fmt::Display for Redacted {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str("Redacted(..)")
	}
}

impl From<String> for Redacted {
	fn from(value: String) -> Self {
		Self::new(value)
	}
}
