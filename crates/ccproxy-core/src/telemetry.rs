use std::path::PathBuf;

use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::prelude::*;

/// Output shape for the `tracing-subscriber` formatter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
	/// Human-readable, ANSI-colored when attached to a tty. The default outside of `json` mode.
	#[default]
	Pretty,
	/// One JSON object per line, suitable for ingestion by a log collector.
	Json,
}

impl std::str::FromStr for LogFormat {
	type Err = anyhow::Error;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_ascii_lowercase().as_str() {
			"pretty" | "text" => Ok(LogFormat::Pretty),
			"json" => Ok(LogFormat::Json),
			other => anyhow::bail!("unknown log format '{other}', expected pretty|json"),
		}
	}
}

#[derive(Debug, Clone, Default)]
pub struct TelemetryConfig {
	/// `RUST_LOG`-style filter directive, e.g. `info` or `ccproxy=debug,tower_http=info`.
	pub filter: Option<String>,
	pub format: LogFormat,
	/// When set, logs are additionally written (non-blocking) to a rolling file in this directory.
	pub log_dir: Option<PathBuf>,
}

/// Guard returned by [`init_tracing`]. Dropping it flushes the non-blocking file writer; keep it
/// alive for the process lifetime (e.g. by holding it in `main`).
pub struct TracingGuard {
	_file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Install a global `tracing` subscriber for the process. Mirrors the teacher's practice of
/// pairing `tracing-subscriber`'s `EnvFilter` with a non-blocking `tracing-appender` file sink,
/// scaled down to a single local process instead of an OTLP pipeline.
pub fn init_tracing(cfg: &TelemetryConfig) -> anyhow::Result<TracingGuard> {
	let filter = match &cfg.filter {
		Some(f) => EnvFilter::try_new(f)?,
		None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
	};

	let registry = tracing_subscriber::registry().with(filter);

	let file_guard = match &cfg.log_dir {
		Some(dir) => {
			std::fs::create_dir_all(dir)?;
			let appender = tracing_appender::rolling::daily(dir, "ccproxy.log");
			let (non_blocking, guard) = tracing_appender::non_blocking(appender);
			Some((non_blocking, guard))
		},
		None => None,
	};

	match (&cfg.format, file_guard) {
		(LogFormat::Json, Some((file_writer, guard))) => {
			registry
				.with(
					tracing_subscriber::fmt::layer()
						.json()
						.with_writer(std::io::stderr.and(file_writer)),
				)
				.try_init()?;
			Ok(TracingGuard {
				_file_guard: Some(guard),
			})
		},
		(LogFormat::Json, None) => {
			registry
				.with(tracing_subscriber::fmt::layer().json())
				.try_init()?;
			Ok(TracingGuard { _file_guard: None })
		},
		(LogFormat::Pretty, Some((file_writer, guard))) => {
			registry
				.with(
					tracing_subscriber::fmt::layer().with_writer(std::io::stderr.and(file_writer)),
				)
				.try_init()?;
			Ok(TracingGuard {
				_file_guard: Some(guard),
			})
		},
		(LogFormat::Pretty, None) => {
			registry.with(tracing_subscriber::fmt::layer()).try_init()?;
			Ok(TracingGuard { _file_guard: None })
		},
	}
}
