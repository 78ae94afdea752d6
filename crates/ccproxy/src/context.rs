//! Per-request ambient state (C6). Realized as a `tokio::task_local!`, per the Design Note in
//! spec.md §9 ("a per-task context store is the cleanest systems-language realization").

use std::net::IpAddr;
use std::sync::{Arc, Mutex};
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::formats::Format;

/// Numeric usage/cost fields an adapter writes once it has parsed the upstream response.
#[derive(Debug, Clone, Default)]
pub struct RequestMetadata {
	pub tokens_input: Option<u64>,
	pub tokens_output: Option<u64>,
	pub cache_read_tokens: Option<u64>,
	pub cache_write_tokens: Option<u64>,
	pub reasoning_tokens: Option<u64>,
	pub cost_usd: Option<f64>,
	pub model: Option<String>,
}

#[derive(Debug, Clone)]
pub struct RequestContext {
	pub request_id: String,
	pub received_at: Instant,
	pub method: http::Method,
	pub path: String,
	pub client_ip: Option<IpAddr>,
	pub user_agent: Option<String>,
	pub source_format: Format,
	pub target_format: Format,
	pub provider: String,
	pub metadata: Arc<Mutex<RequestMetadata>>,
	pub cancel: CancellationToken,
	/// Count of hook-subscriber failures observed for this request. Spec.md §9 Open Question
	/// (i) flags the source's broad catch-and-swallow around hook emission as hiding bugs; this
	/// counter is the structured remedy it recommends.
	pub hook_failures: Arc<std::sync::atomic::AtomicU64>,
}

impl RequestContext {
	pub fn new(
		request_id: String,
		method: http::Method,
		path: String,
		client_ip: Option<IpAddr>,
		user_agent: Option<String>,
		source_format: Format,
		target_format: Format,
		provider: impl Into<String>,
	) -> Self {
		Self {
			request_id,
			received_at: Instant::now(),
			method,
			path,
			client_ip,
			user_agent,
			source_format,
			target_format,
			provider: provider.into(),
			metadata: Arc::new(Mutex::new(RequestMetadata::default())),
			cancel: CancellationToken::new(),
			hook_failures: Arc::new(std::sync::atomic::AtomicU64::new(0)),
		}
	}

	pub fn duration_ms(&self) -> u128 {
		self.received_at.elapsed().as_millis()
	}

	pub fn record_hook_failure(&self) {
		self
			.hook_failures
			.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
	}

	pub fn metadata_snapshot(&self) -> RequestMetadata {
		self.metadata.lock().expect("metadata mutex poisoned").clone()
	}

	pub fn update_metadata(&self, f: impl FnOnce(&mut RequestMetadata)) {
		f(&mut self.metadata.lock().expect("metadata mutex poisoned"));
	}
}

tokio::task_local! {
	static CONTEXT: Arc<RequestContext>;
}

/// Run `f` with `ctx` installed as the ambient context for the duration of the future, so any
/// component downstream (translator, adapter, hook bus) can reach it via [`current`] without
/// being threaded an explicit parameter.
pub async fn scope<F: std::future::Future>(ctx: Arc<RequestContext>, f: F) -> F::Output {
	CONTEXT.scope(ctx, f).await
}

/// Fetch the ambient request context. Panics outside of a [`scope`]-wrapped task, which would
/// indicate a wiring bug in the proxy core rather than a recoverable runtime condition.
pub fn current() -> Arc<RequestContext> {
	CONTEXT.with(|c| c.clone())
}

pub fn try_current() -> Option<Arc<RequestContext>> {
	CONTEXT.try_with(|c| c.clone()).ok()
}
