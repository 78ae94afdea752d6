//! Typed hook bus (C7): `HTTP_REQUEST`, `HTTP_RESPONSE`, `HTTP_ERROR`, `REQUEST_COMPLETED`,
//! `REQUEST_FAILED`, fanned out to subscribers in priority-band order. A subscriber failure is
//! caught, logged, and counted on the request context — it never affects the data plane.
//! Grounded on `original_source/ccproxy/http/hooks.py`'s `HookableHTTPClient`, which wraps
//! every hook-manager call in a swallowing `try/except` and logs at debug level.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;

use crate::context::RequestContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventKind {
	HttpRequest,
	HttpResponse,
	HttpError,
	RequestCompleted,
	RequestFailed,
}

use serde::{Deserialize, Serialize};

/// Priority bands from spec.md §3 (`PluginManifest`); lower runs first ("outer").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Priority(pub u32);

impl Priority {
	pub const SECURITY: Priority = Priority(100);
	pub const OBSERVABILITY: Priority = Priority(200);
	pub const ROUTING: Priority = Priority(300);
	pub const APPLICATION: Priority = Priority(400);
}

#[derive(Debug, Clone)]
pub struct HookContext {
	pub event_kind: EventKind,
	pub timestamp: chrono::DateTime<chrono::Utc>,
	pub data: Value,
	pub metadata: BTreeMap<String, String>,
}

impl HookContext {
	pub fn new(event_kind: EventKind, ctx: &RequestContext, data: Value) -> Self {
		let mut metadata = BTreeMap::new();
		metadata.insert("request_id".to_string(), ctx.request_id.clone());
		metadata.insert("provider".to_string(), ctx.provider.clone());
		Self {
			event_kind,
			timestamp: chrono::Utc::now(),
			data,
			metadata,
		}
	}
}

/// The timeout a single subscriber is allowed per event, per spec.md §5 suspension-point (v).
const SUBSCRIBER_DEADLINE: Duration = Duration::from_millis(500);

pub type Subscriber = Arc<dyn Fn(HookContext) -> futures::future::BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

struct Registration {
	priority: Priority,
	name: &'static str,
	kind: EventKind,
	subscriber: Subscriber,
}

/// Process-wide subscriber registry. Frozen after startup per spec.md §5 ("Global mutable
/// state... effectively read-only after startup"); a copy-on-write snapshot is taken on every
/// emit so concurrent requests never contend on a lock in the data path.
#[derive(Default, Clone)]
pub struct HookBus {
	registrations: Arc<Vec<Registration>>,
}

pub struct HookBusBuilder {
	registrations: Vec<Registration>,
}

impl HookBusBuilder {
	pub fn new() -> Self {
		Self {
			registrations: Vec::new(),
		}
	}

	pub fn register<F, Fut>(mut self, kind: EventKind, priority: Priority, name: &'static str, f: F) -> Self
	where
		F: Fn(HookContext) -> Fut + Send + Sync + 'static,
		Fut: std::future::Future<Output = anyhow::Result<()>> + Send + 'static,
	{
		self.registrations.push(Registration {
			priority,
			name,
			kind,
			subscriber: Arc::new(move |ctx| Box::pin(f(ctx))),
		});
		self
	}

	pub fn build(mut self) -> HookBus {
		self
			.registrations
			.sort_by(|a, b| a.priority.cmp(&b.priority).then_with(|| a.name.cmp(b.name)));
		HookBus {
			registrations: Arc::new(self.registrations),
		}
	}
}

impl HookBus {
	/// Fan out `ctx` to every subscriber of `ctx.event_kind`, sequentially within a priority band
	/// and concurrently across bands is unnecessary for correctness here (bands already run in
	/// priority order); each subscriber call is given [`SUBSCRIBER_DEADLINE`] and any error or
	/// timeout is logged and counted, never propagated.
	pub async fn emit(&self, hook_ctx: HookContext, request_ctx: Option<&RequestContext>) {
		for reg in self.registrations.iter().filter(|r| r.kind == hook_ctx.event_kind) {
			let fut = (reg.subscriber)(hook_ctx.clone());
			match tokio::time::timeout(SUBSCRIBER_DEADLINE, fut).await {
				Ok(Ok(())) => {},
				Ok(Err(e)) => {
					tracing::debug!(subscriber = reg.name, error = %e, "hook subscriber failed");
					if let Some(rc) = request_ctx {
						rc.record_hook_failure();
					}
				},
				Err(_) => {
					tracing::debug!(subscriber = reg.name, "hook subscriber timed out");
					if let Some(rc) = request_ctx {
						rc.record_hook_failure();
					}
				},
			}
		}
	}

	pub fn is_empty(&self) -> bool {
		self.registrations.is_empty()
	}
}

#[cfg(test)]
mod tests {
	use std::sync::atomic::{AtomicUsize, Ordering};

	use super::*;
	use crate::context::RequestContext;

	fn ctx() -> HookContext {
		let request_ctx = RequestContext::new(
			"req-1".to_string(),
			http::Method::POST,
			"/v1/messages".to_string(),
			None,
			None,
			crate::formats::Format::Anthropic,
			crate::formats::Format::Anthropic,
			"anthropic",
		);
		HookContext::new(EventKind::HttpRequest, &request_ctx, serde_json::json!({}))
	}

	#[tokio::test]
	async fn subscribers_run_in_priority_order() {
		let order = Arc::new(std::sync::Mutex::new(Vec::new()));
		let order_a = order.clone();
		let order_b = order.clone();
		let bus = HookBusBuilder::new()
			.register(EventKind::HttpRequest, Priority::ROUTING, "b", move |_| {
				let order = order_b.clone();
				async move {
					order.lock().unwrap().push("b");
					Ok(())
				}
			})
			.register(EventKind::HttpRequest, Priority::SECURITY, "a", move |_| {
				let order = order_a.clone();
				async move {
					order.lock().unwrap().push("a");
					Ok(())
				}
			})
			.build();

		bus.emit(ctx(), None).await;
		assert_eq!(*order.lock().unwrap(), vec!["a", "b"]);
	}

	#[tokio::test]
	async fn a_failing_subscriber_does_not_stop_later_subscribers() {
		let ran = Arc::new(AtomicUsize::new(0));
		let ran_second = ran.clone();
		let bus = HookBusBuilder::new()
			.register(EventKind::HttpRequest, Priority::SECURITY, "failing", |_| async {
				Err(anyhow::anyhow!("boom"))
			})
			.register(EventKind::HttpRequest, Priority::OBSERVABILITY, "ok", move |_| {
				let ran = ran_second.clone();
				async move {
					ran.fetch_add(1, Ordering::SeqCst);
					Ok(())
				}
			})
			.build();

		bus.emit(ctx(), None).await;
		assert_eq!(ran.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn subscribers_of_other_event_kinds_are_not_invoked() {
		let ran = Arc::new(AtomicUsize::new(0));
		let ran_inner = ran.clone();
		let bus = HookBusBuilder::new()
			.register(EventKind::HttpResponse, Priority::OBSERVABILITY, "response-only", move |_| {
				let ran = ran_inner.clone();
				async move {
					ran.fetch_add(1, Ordering::SeqCst);
					Ok(())
				}
			})
			.build();

		bus.emit(ctx(), None).await;
		assert_eq!(ran.load(Ordering::SeqCst), 0);
	}
}
