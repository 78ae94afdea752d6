use serde_json::json;

use crate::formats::Format;

/// Top-level error taxonomy for the gateway. Every variant carries the HTTP status it maps to
/// and knows how to render itself into the client's source format (Anthropic vs OpenAI error
/// envelopes). Mirrors the shape of `AIError` in the teacher's `llm` module: error variants
/// carry just enough context to produce a message, never raw upstream secrets.
#[derive(Debug, thiserror::Error)]
pub enum CcproxyError {
	#[error("request failed schema validation: {0}")]
	InputError(String),

	#[error("missing or invalid bearer token")]
	AuthError,

	#[error("no upstream credential available: {0}")]
	CredentialsError(String),

	#[error("upstream request timed out")]
	UpstreamTimeout,

	#[error("upstream returned an error: {status}: {body}")]
	UpstreamHttpError {
		status: http::StatusCode,
		body: String,
	},

	#[error("format translation failed: {0}")]
	TranslationError(String),

	#[error("client disconnected")]
	ClientDisconnect,

	#[error("credentials file is invalid: {0}")]
	CredentialsInvalid(String),

	#[error("failed to persist credentials: {0}")]
	CredentialsStorage(String),

	#[error("OAuth login failed: {0}")]
	OAuthLogin(String),

	#[error("OAuth token refresh failed: {0}")]
	OAuthTokenRefresh(String),

	#[error("unsupported conversion: {0}")]
	UnsupportedConversion(String),

	#[error(transparent)]
	Other(#[from] anyhow::Error),
}

impl CcproxyError {
	pub fn status(&self) -> http::StatusCode {
		use http::StatusCode as S;
		match self {
			Self::InputError(_) => S::UNPROCESSABLE_ENTITY,
			Self::AuthError => S::UNAUTHORIZED,
			Self::CredentialsError(_) | Self::CredentialsInvalid(_) | Self::CredentialsStorage(_) => {
				S::SERVICE_UNAVAILABLE
			},
			Self::UpstreamTimeout => S::GATEWAY_TIMEOUT,
			Self::UpstreamHttpError { status, .. } => {
				if status.is_client_error() {
					*status
				} else {
					S::BAD_GATEWAY
				}
			},
			Self::TranslationError(_) => S::INTERNAL_SERVER_ERROR,
			Self::ClientDisconnect => S::INTERNAL_SERVER_ERROR,
			Self::OAuthLogin(_) | Self::OAuthTokenRefresh(_) => S::SERVICE_UNAVAILABLE,
			Self::UnsupportedConversion(_) => S::INTERNAL_SERVER_ERROR,
			Self::Other(_) => S::INTERNAL_SERVER_ERROR,
		}
	}

	/// Error "type" string surfaced to the client, shared across both envelope shapes.
	fn error_type(&self) -> &'static str {
		match self {
			Self::InputError(_) => "invalid_request_error",
			Self::AuthError => "authentication_error",
			Self::CredentialsError(_) | Self::CredentialsInvalid(_) | Self::CredentialsStorage(_) => {
				"service_unavailable"
			},
			Self::UpstreamTimeout => "timeout_error",
			Self::UpstreamHttpError { status, .. } if status.is_client_error() => "invalid_request_error",
			Self::UpstreamHttpError { .. } => "api_error",
			Self::TranslationError(_) => "internal_error",
			Self::ClientDisconnect => "internal_error",
			Self::OAuthLogin(_) | Self::OAuthTokenRefresh(_) => "service_unavailable",
			Self::UnsupportedConversion(_) => "internal_error",
			Self::Other(_) => "internal_error",
		}
	}

	/// Render into the error envelope shape for `format`, per spec.md §4.4/§7.
	pub fn to_envelope(&self, format: Format) -> serde_json::Value {
		let message = self.to_string();
		match format {
			Format::Anthropic => json!({
				"type": "error",
				"error": { "type": self.error_type(), "message": message },
			}),
			Format::OpenAiChat | Format::OpenAiResponses => json!({
				"error": {
					"message": message,
					"type": self.error_type(),
					"param": serde_json::Value::Null,
					"code": serde_json::Value::Null,
				}
			}),
		}
	}
}

impl axum::response::IntoResponse for CcproxyError {
	fn into_response(self) -> axum::response::Response {
		// Default to the Anthropic envelope when no request-scoped format is known (e.g. a
		// failure before routing resolved source_format); call sites with context prefer
		// `crate::proxy::error_response` which threads the real source format through.
		let status = self.status();
		let body = self.to_envelope(Format::Anthropic);
		(status, axum::Json(body)).into_response()
	}
}
