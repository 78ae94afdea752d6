//! Raw HTTP Debug Logger (C14): one concrete [`crate::plugins::Plugin`] demonstrating the
//! contract end-to-end. Frames request/response pairs as raw HTTP/1.1 wire bytes under
//! `CCPROXY_RAW_LOG_DIR`, per spec.md §1/§6. Only the hook-subscriber contract is in scope; the
//! on-disk storage format itself is an explicit non-goal (spec.md §9), so the framing below is
//! deliberately simple rather than a faithful byte-for-byte wire capture.

use std::path::PathBuf;

use crate::hooks::{EventKind, HookBusBuilder, Priority};
use crate::plugins::{Plugin, PluginManifest};

pub struct RawHttpLoggerPlugin {
	manifest: PluginManifest,
	dir: PathBuf,
}

impl RawHttpLoggerPlugin {
	pub fn new(dir: PathBuf) -> Self {
		Self {
			manifest: PluginManifest {
				name: "raw_http_logger",
				priority: Priority::OBSERVABILITY,
				depends_on: &[],
			},
			dir,
		}
	}

}

fn write_frame(dir: &std::path::Path, request_id: &str, side: &str, phase: &str, body: &str) {
	let path = dir.join(format!("{request_id}_{side}_{phase}.http"));
	let frame = format!(
		"{phase_upper} {request_id}\r\nContent-Length: {len}\r\n\r\n{body}",
		phase_upper = phase.to_ascii_uppercase(),
		len = body.len(),
	);
	if let Err(e) = fs_err::create_dir_all(dir) {
		tracing::debug!(error = %e, "raw_http_logger: could not create log dir");
		return;
	}
	if let Err(e) = fs_err::write(&path, frame) {
		tracing::debug!(error = %e, path = %path.display(), "raw_http_logger: write failed");
	}
}

impl Plugin for RawHttpLoggerPlugin {
	fn manifest(&self) -> &PluginManifest {
		&self.manifest
	}

	fn register(&self, builder: HookBusBuilder) -> HookBusBuilder {
		let req_dir = self.dir.clone();
		let resp_dir = self.dir.clone();
		let builder = builder.register(
			EventKind::HttpRequest,
			Priority::OBSERVABILITY,
			"raw_http_logger",
			move |ctx| {
				let dir = req_dir.clone();
				async move {
					let request_id = ctx
						.metadata
						.get("request_id")
						.cloned()
						.unwrap_or_else(|| "unknown".to_string());
					write_frame(&dir, &request_id, "client", "request", &ctx.data.to_string());
					Ok(())
				}
			},
		);
		builder.register(
			EventKind::HttpResponse,
			Priority::OBSERVABILITY,
			"raw_http_logger",
			move |ctx| {
				let dir = resp_dir.clone();
				async move {
					let request_id = ctx
						.metadata
						.get("request_id")
						.cloned()
						.unwrap_or_else(|| "unknown".to_string());
					write_frame(&dir, &request_id, "provider", "response", &ctx.data.to_string());
					Ok(())
				}
			},
		)
	}
}
