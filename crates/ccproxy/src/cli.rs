//! CLI (C15): `ccproxy serve|auth|config`, via `clap` derive macros as the teacher does. Out of
//! scope for deep design per spec.md §1; this is the ambient entry point the binary crate calls
//! into (see `ccproxy-app/src/main.rs`).

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::auth::credentials::Provider;
use crate::config::CliOverrides;

#[derive(Parser, Debug)]
#[command(name = "ccproxy", about = "A local LLM gateway speaking Anthropic/OpenAI wire formats")]
pub struct Cli {
	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Run the gateway's HTTP server.
	Serve(ServeArgs),
	/// Manage per-provider OAuth credentials.
	Auth {
		#[command(subcommand)]
		action: AuthAction,
	},
	/// Inspect the resolved configuration.
	Config {
		#[command(subcommand)]
		action: ConfigAction,
	},
}

#[derive(Parser, Debug)]
pub struct ServeArgs {
	#[arg(long)]
	pub host: Option<String>,
	#[arg(long)]
	pub port: Option<u16>,
	/// Auto-restart on source changes. Accepted for CLI-contract parity with spec.md §6; this
	/// implementation has no file watcher, so the flag is a recognized no-op.
	#[arg(long)]
	pub reload: bool,
	#[arg(long)]
	pub log_level: Option<String>,
	#[arg(long)]
	pub log_file: Option<PathBuf>,
	#[arg(long)]
	pub auth_token: Option<String>,
	#[arg(long = "enable-plugin")]
	pub enable_plugin: Vec<String>,
	#[arg(long = "disable-plugin")]
	pub disable_plugin: Vec<String>,
	#[arg(long)]
	pub config: Option<PathBuf>,
}

impl ServeArgs {
	pub fn into_overrides(self) -> CliOverrides {
		CliOverrides {
			host: self.host,
			port: self.port,
			auth_token: self.auth_token,
			log_level: self.log_level,
			log_file: self.log_file,
			enable_plugin: self.enable_plugin,
			disable_plugin: self.disable_plugin,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum AuthAction {
	/// Interactive PKCE/device-code login (spec.md §9, grounded on
	/// `original_source/claude_code_proxy/cli/commands/auth.py`).
	Login(ProviderArgs),
	/// Print decoded credential status (subscription tier, expiry, scopes) without secrets.
	Info(ProviderArgs),
	/// Perform a live `get_valid_token()` round-trip, refreshing if needed, and report success.
	Validate(ProviderArgs),
}

#[derive(Parser, Debug)]
pub struct ProviderArgs {
	#[arg(long, value_enum, default_value_t = ProviderArg::Claude)]
	pub provider: ProviderArg,
	#[arg(long)]
	pub credential_file: Option<PathBuf>,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderArg {
	Claude,
	Copilot,
}

impl From<ProviderArg> for Provider {
	fn from(p: ProviderArg) -> Self {
		match p {
			ProviderArg::Claude => Provider::Claude,
			ProviderArg::Copilot => Provider::Copilot,
		}
	}
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
	/// Print the fully resolved configuration (after CLI/env/file/default merge).
	Show,
}

#[cfg(test)]
mod tests {
	use clap::CommandFactory;

	use super::*;

	#[test]
	fn cli_definition_is_valid() {
		Cli::command().debug_assert();
	}

	#[test]
	fn parses_serve_with_plugin_flags() {
		let cli = Cli::parse_from([
			"ccproxy",
			"serve",
			"--port",
			"9999",
			"--enable-plugin",
			"raw_http_logger",
			"--disable-plugin",
			"some_other",
		]);
		let Command::Serve(args) = cli.command else {
			panic!("expected Serve command");
		};
		assert_eq!(args.port, Some(9999));
		assert_eq!(args.enable_plugin, vec!["raw_http_logger".to_string()]);
		let overrides = args.into_overrides();
		assert_eq!(overrides.port, Some(9999));
		assert_eq!(overrides.disable_plugin, vec!["some_other".to_string()]);
	}

	#[test]
	fn auth_login_defaults_to_claude_provider() {
		let cli = Cli::parse_from(["ccproxy", "auth", "login"]);
		let Command::Auth {
			action: AuthAction::Login(args),
		} = cli.command
		else {
			panic!("expected Auth Login command");
		};
		assert_eq!(args.provider, ProviderArg::Claude);
	}

	#[test]
	fn provider_arg_converts_to_credential_provider() {
		assert_eq!(Provider::from(ProviderArg::Copilot).as_str(), "copilot");
		assert_eq!(Provider::from(ProviderArg::Claude).as_str(), "claude");
	}
}
