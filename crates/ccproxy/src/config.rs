//! Config Loader (C13): typed `RawConfig`/`Config` split, mirroring the teacher's
//! `RawConfig -> Config` pattern in `lib.rs`. Sources, highest precedence first: CLI flags, env
//! vars, config file, built-in default (spec.md §6).

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;

use ccproxy_core::{LogFormat, TelemetryConfig};
use serde::Deserialize;

use crate::error::CcproxyError;

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8787;

/// TOML-deserialized user input. Every field is optional; a field absent here falls through to
/// the env var and then the built-in default in [`Config::resolve`].
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
	host: Option<String>,
	port: Option<u16>,
	auth_token: Option<String>,
	log_level: Option<String>,
	log_format: Option<String>,
	log_file: Option<PathBuf>,
	openai_api_key: Option<String>,
	#[serde(default)]
	enable_plugin: Vec<String>,
	#[serde(default)]
	disable_plugin: Vec<String>,
	raw_http_log: Option<bool>,
	raw_log_dir: Option<PathBuf>,
	openai_thinking_xml: Option<bool>,
}

impl RawConfig {
	pub fn from_file(path: &std::path::Path) -> Result<Self, CcproxyError> {
		let text = fs_err::read_to_string(path).map_err(|e| CcproxyError::Other(e.into()))?;
		toml::from_str(&text).map_err(|e| CcproxyError::Other(e.into()))
	}
}

/// CLI-flag overrides, collected by [`crate::cli::ServeArgs`] and applied last (highest
/// precedence) in [`Config::resolve`]. Every field is an `Option`/empty-`Vec` so "the flag was
/// not passed" is distinguishable from "the flag was passed with a falsy value".
#[derive(Debug, Default)]
pub struct CliOverrides {
	pub host: Option<String>,
	pub port: Option<u16>,
	pub auth_token: Option<String>,
	pub log_level: Option<String>,
	pub log_file: Option<PathBuf>,
	pub enable_plugin: Vec<String>,
	pub disable_plugin: Vec<String>,
}

/// Fully resolved, validated configuration the rest of the gateway consumes.
#[derive(Debug, Clone)]
pub struct Config {
	pub bind_addr: SocketAddr,
	pub auth_token: Option<String>,
	pub openai_api_key: Option<String>,
	pub telemetry: TelemetryConfig,
	pub enabled_plugins: Vec<String>,
	pub disabled_plugins: Vec<String>,
	pub raw_http_log: bool,
	pub raw_log_dir: PathBuf,
	/// Whether OpenAI-Responses reasoning deltas are serialized as `<thinking signature="…">`
	/// text for Chat consumers (spec.md §6 `LLM__OPENAI_THINKING_XML`, default on).
	pub openai_thinking_xml: bool,
}

impl Config {
	/// Merge `file` (config file, lowest precedence of the three explicit sources), the
	/// environment variables named in spec.md §6, and `cli` (highest precedence) into a
	/// validated `Config`.
	pub fn resolve(file: RawConfig, cli: CliOverrides) -> Result<Self, CcproxyError> {
		let host = cli
			.host
			.or(file.host)
			.unwrap_or_else(|| DEFAULT_HOST.to_string());
		let port = cli.port.or(file.port).unwrap_or(DEFAULT_PORT);
		let ip: IpAddr = host
			.parse()
			.map_err(|e| CcproxyError::InputError(format!("invalid --host '{host}': {e}")))?;

		let log_level = cli
			.log_level
			.or_else(|| std::env::var("CCPROXY_LOG_LEVEL").ok())
			.or(file.log_level);
		let log_format = std::env::var("CCPROXY_LOG_FORMAT")
			.ok()
			.or(file.log_format)
			.map(|s| s.parse::<LogFormat>())
			.transpose()
			.map_err(|e| CcproxyError::InputError(e.to_string()))?
			.unwrap_or_default();
		let log_file = cli.log_file.or(file.log_file);

		let raw_http_log = std::env::var("CCPROXY_LOG_RAW_HTTP")
			.ok()
			.map(|v| parse_bool(&v))
			.transpose()?
			.or(file.raw_http_log)
			.unwrap_or(false);
		let raw_log_dir = std::env::var("CCPROXY_RAW_LOG_DIR")
			.ok()
			.map(PathBuf::from)
			.or(file.raw_log_dir)
			.unwrap_or_else(|| PathBuf::from("/tmp/ccproxy/raw"));

		let openai_thinking_xml = std::env::var("LLM__OPENAI_THINKING_XML")
			.ok()
			.map(|v| parse_bool(&v))
			.transpose()?
			.or(file.openai_thinking_xml)
			.unwrap_or(true);

		let mut enabled_plugins = file_defaults_plugins();
		enabled_plugins.extend(cli.enable_plugin);
		let mut disabled_plugins = Vec::new();
		disabled_plugins.extend(cli.disable_plugin);

		Ok(Self {
			bind_addr: SocketAddr::new(ip, port),
			auth_token: cli.auth_token.or(file.auth_token),
			openai_api_key: file.openai_api_key.or_else(|| std::env::var("OPENAI_API_KEY").ok()),
			telemetry: TelemetryConfig {
				filter: log_level,
				format: log_format,
				log_dir: log_file.map(|f| f.parent().map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."))),
			},
			enabled_plugins,
			disabled_plugins,
			raw_http_log,
			raw_log_dir,
			openai_thinking_xml,
		})
	}
}

fn file_defaults_plugins() -> Vec<String> {
	// No plugin is enabled by default; the raw-HTTP logger (C14) opts in only via
	// `--enable-plugin=raw_http_logger` or `raw_http_log = true`, handled separately in `main`.
	Vec::new()
}

fn parse_bool(s: &str) -> Result<bool, CcproxyError> {
	match s.to_ascii_lowercase().as_str() {
		"1" | "true" | "yes" | "on" => Ok(true),
		"0" | "false" | "no" | "off" | "" => Ok(false),
		other => Err(CcproxyError::InputError(format!("invalid boolean '{other}'"))),
	}
}

impl Default for Config {
	fn default() -> Self {
		Self::resolve(RawConfig::default(), CliOverrides::default())
			.expect("default config must resolve")
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn defaults_bind_to_loopback_8787() {
		let config = Config::default();
		assert_eq!(config.bind_addr.to_string(), "127.0.0.1:8787");
		assert!(!config.raw_http_log);
		assert!(config.enabled_plugins.is_empty());
	}

	#[test]
	fn cli_override_beats_file_value() {
		let file = RawConfig {
			host: Some("10.0.0.1".to_string()),
			port: Some(9000),
			..Default::default()
		};
		let cli = CliOverrides {
			port: Some(1234),
			..Default::default()
		};
		let config = Config::resolve(file, cli).unwrap();
		assert_eq!(config.bind_addr.to_string(), "10.0.0.1:1234");
	}

	#[test]
	fn file_value_used_when_no_cli_override() {
		let file = RawConfig {
			auth_token: Some("file-token".to_string()),
			..Default::default()
		};
		let config = Config::resolve(file, CliOverrides::default()).unwrap();
		assert_eq!(config.auth_token.as_deref(), Some("file-token"));
	}

	#[test]
	fn cli_auth_token_beats_file_auth_token() {
		let file = RawConfig {
			auth_token: Some("file-token".to_string()),
			..Default::default()
		};
		let cli = CliOverrides {
			auth_token: Some("cli-token".to_string()),
			..Default::default()
		};
		let config = Config::resolve(file, cli).unwrap();
		assert_eq!(config.auth_token.as_deref(), Some("cli-token"));
	}

	#[test]
	fn invalid_host_is_rejected() {
		let file = RawConfig {
			host: Some("not-an-ip".to_string()),
			..Default::default()
		};
		let err = Config::resolve(file, CliOverrides::default()).unwrap_err();
		assert!(matches!(err, CcproxyError::InputError(_)));
	}

	#[test]
	fn enabled_plugins_accumulate_cli_flags() {
		let cli = CliOverrides {
			enable_plugin: vec!["raw_http_logger".to_string()],
			..Default::default()
		};
		let config = Config::resolve(RawConfig::default(), cli).unwrap();
		assert_eq!(config.enabled_plugins, vec!["raw_http_logger".to_string()]);
	}

	#[test]
	fn openai_thinking_xml_defaults_to_enabled() {
		let config = Config::default();
		assert!(config.openai_thinking_xml);
	}

	#[test]
	fn openai_thinking_xml_honors_file_value() {
		let file = RawConfig {
			openai_thinking_xml: Some(false),
			..Default::default()
		};
		let config = Config::resolve(file, CliOverrides::default()).unwrap();
		assert!(!config.openai_thinking_xml);
	}

	#[test]
	fn parse_bool_accepts_common_spellings() {
		assert_eq!(parse_bool("true").unwrap(), true);
		assert_eq!(parse_bool("1").unwrap(), true);
		assert_eq!(parse_bool("off").unwrap(), false);
		assert_eq!(parse_bool("").unwrap(), false);
		assert!(parse_bool("maybe").is_err());
	}
}
