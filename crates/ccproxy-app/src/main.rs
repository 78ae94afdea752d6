//! `ccproxy` binary entry point: parses the CLI (C15), resolves configuration (C13), installs
//! structured logging (C12), and either runs the HTTP server (`serve`) or one of the ancillary
//! `auth`/`config` subcommands.

use std::sync::Arc;

use anyhow::Context;
use ccproxy::auth::credentials::{CredentialStore, Provider};
use ccproxy::auth::manager::AuthManager;
use ccproxy::auth::oauth::OAuthEngine;
use ccproxy::cli::{AuthAction, Cli, Command, ConfigAction, ProviderArgs};
use ccproxy::config::{Config, RawConfig};
use ccproxy::formats::Format;
use ccproxy::hooks::HookBus;
use ccproxy::plugins::raw_http_logger::RawHttpLoggerPlugin;
use ccproxy::plugins::PluginRegistry;
use ccproxy::providers::anthropic_api::AnthropicApi;
use ccproxy::providers::claude_code::ClaudeCodeCli;
use ccproxy::providers::copilot::GitHubCopilot;
use ccproxy::providers::openai_api::OpenAiApi;
use ccproxy::providers::{HeaderMode, ProviderAdapter};
use ccproxy::proxy::server::{build_router, AppState};
use clap::Parser;
use tracing::info;

#[cfg(all(target_os = "linux", feature = "jemalloc"))]
#[global_allocator]
static ALLOC: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[cfg(all(not(target_os = "linux"), feature = "mimalloc"))]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	let cli = Cli::parse();
	match cli.command {
		Command::Serve(args) => {
			let file = match &args.config {
				Some(path) => RawConfig::from_file(path).context("loading --config file")?,
				None => RawConfig::default(),
			};
			let config = Config::resolve(file, args.into_overrides()).context("resolving configuration")?;
			let _tracing_guard = ccproxy_core::init_tracing(&config.telemetry).context("initializing logging")?;
			serve(config).await
		},
		Command::Auth { action } => auth_command(action).await,
		Command::Config { action } => config_command(action),
	}
}

fn provider_store(args: &ProviderArgs) -> CredentialStore {
	CredentialStore::new(args.provider.into(), args.credential_file.clone())
}

async fn auth_command(action: AuthAction) -> anyhow::Result<()> {
	match action {
		AuthAction::Login(args) => {
			let provider: Provider = args.provider.into();
			let engine = OAuthEngine::new(provider_store(&args));
			let cred = engine.login().await?;
			println!("logged in to {} (subscription: {:?})", provider.as_str(), cred.subscription_tier);
			Ok(())
		},
		AuthAction::Info(args) => {
			let provider: Provider = args.provider.into();
			let store = provider_store(&args);
			match store.load()? {
				Some(cred) => {
					println!("provider:      {}", provider.as_str());
					println!("token type:    {}", cred.token_type);
					println!("scopes:        {}", cred.scopes.join(", "));
					println!(
						"subscription:  {}",
						cred.subscription_tier.as_deref().unwrap_or("unknown")
					);
					println!("expires at:    {}", cred.expires_at.map(|t| t.to_rfc3339()).unwrap_or_else(|| "never".to_string()));
				},
				None => println!("no credential on file for {}", provider.as_str()),
			}
			Ok(())
		},
		AuthAction::Validate(args) => {
			let provider: Provider = args.provider.into();
			let engine = OAuthEngine::new(provider_store(&args));
			match engine.get_valid_token().await {
				Ok(_) => {
					println!("{}: credential valid", provider.as_str());
					Ok(())
				},
				Err(e) => {
					eprintln!("{}: credential invalid: {e}", provider.as_str());
					std::process::exit(1);
				},
			}
		},
	}
}

fn config_command(action: ConfigAction) -> anyhow::Result<()> {
	match action {
		ConfigAction::Show => {
			let config = Config::default();
			println!("{config:#?}");
			Ok(())
		},
	}
}

async fn serve(config: Config) -> anyhow::Result<()> {
	let hooks = build_hook_bus(&config)?;

	let mut auth = AuthManager::new(config.auth_token.clone()).with_openai_api_key(config.openai_api_key.clone());
	auth = auth.with_provider(Provider::Claude, OAuthEngine::new(CredentialStore::new(Provider::Claude, None)));
	auth = auth.with_provider(Provider::Copilot, OAuthEngine::new(CredentialStore::new(Provider::Copilot, None)));

	let state = AppState {
		http: reqwest::Client::new(),
		hooks,
		auth: Arc::new(auth),
		anthropic: Arc::new(AnthropicApi::new(HeaderMode::Full)) as Arc<dyn ProviderAdapter>,
		anthropic_passthrough: Arc::new(AnthropicApi::new(HeaderMode::Passthrough)) as Arc<dyn ProviderAdapter>,
		openai_chat: Arc::new(OpenAiApi::new(Format::OpenAiChat)) as Arc<dyn ProviderAdapter>,
		openai_responses: Arc::new(OpenAiApi::new(Format::OpenAiResponses)) as Arc<dyn ProviderAdapter>,
		copilot: Arc::new(GitHubCopilot) as Arc<dyn ProviderAdapter>,
		claude_code: Arc::new(ClaudeCodeCli) as Arc<dyn ProviderAdapter>,
		openai_thinking_xml: config.openai_thinking_xml,
	};

	let router = build_router(state);
	let listener = tokio::net::TcpListener::bind(config.bind_addr)
		.await
		.with_context(|| format!("binding {}", config.bind_addr))?;
	info!(addr = %config.bind_addr, "ccproxy listening");
	axum::serve(listener, router)
		.await
		.context("server exited")?;
	Ok(())
}

fn build_hook_bus(config: &Config) -> anyhow::Result<HookBus> {
	let mut registry = PluginRegistry::new();
	let raw_logger_enabled = config.raw_http_log || config.enabled_plugins.iter().any(|p| p == "raw_http_logger");
	let raw_logger_disabled = config.disabled_plugins.iter().any(|p| p == "raw_http_logger");
	if raw_logger_enabled && !raw_logger_disabled {
		registry.add(Box::new(RawHttpLoggerPlugin::new(config.raw_log_dir.clone())));
	}
	Ok(registry.build()?)
}
