//! Plugin Contract (C11): spec.md's explicit non-goal is the discovery/loading machinery, so
//! only the contract itself is implemented here — a `Plugin` trait, a `PluginManifest`, and a
//! `PluginRegistry` that topologically sorts declared dependencies and folds every plugin's hook
//! subscribers into one [`crate::hooks::HookBus`]. No `dlopen`/WASM loading. One concrete plugin
//! (`raw_http_logger`, C14) demonstrates the contract end-to-end.

pub mod raw_http_logger;

use crate::error::CcproxyError;
use crate::hooks::{HookBus, HookBusBuilder, Priority};

/// Static description of a plugin: its name (used both for CLI `--enable-plugin=NAME` matching
/// and for dependency resolution) and the priority band its subscribers run at (spec.md §3).
#[derive(Debug, Clone)]
pub struct PluginManifest {
	pub name: &'static str,
	pub priority: Priority,
	/// Names of plugins that must be registered before this one. Violating this with a cycle is
	/// a startup error, not a silently-ignored condition.
	pub depends_on: &'static [&'static str],
}

/// A unit of hook-subscriber registration. Implementors wire themselves into a
/// [`HookBusBuilder`] in [`Plugin::register`]; the registry decides *when* (dependency order),
/// the plugin decides *what* (which event kinds, at what priority).
pub trait Plugin: Send + Sync {
	fn manifest(&self) -> &PluginManifest;

	/// Add this plugin's hook subscriptions to `builder`, returning it for the next plugin.
	fn register(&self, builder: HookBusBuilder) -> HookBusBuilder;
}

/// Collects declared plugins and assembles them into one [`HookBus`] in dependency order.
#[derive(Default)]
pub struct PluginRegistry {
	plugins: Vec<Box<dyn Plugin>>,
}

impl PluginRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn add(&mut self, plugin: Box<dyn Plugin>) -> &mut Self {
		self.plugins.push(plugin);
		self
	}

	/// Topologically sort by `depends_on`, then fold each plugin's [`Plugin::register`] into a
	/// single [`HookBus`]. Errors on an unknown dependency name or a cycle — both indicate a
	/// misconfigured plugin set rather than a recoverable runtime condition.
	pub fn build(self) -> Result<HookBus, CcproxyError> {
		let order = topo_sort(&self.plugins)?;
		let mut builder = HookBusBuilder::new();
		for idx in order {
			builder = self.plugins[idx].register(builder);
		}
		Ok(builder.build())
	}
}

fn topo_sort(plugins: &[Box<dyn Plugin>]) -> Result<Vec<usize>, CcproxyError> {
	let names: Vec<&str> = plugins.iter().map(|p| p.manifest().name).collect();
	let mut visited = vec![0u8; plugins.len()]; // 0 = unvisited, 1 = in-progress, 2 = done
	let mut order = Vec::with_capacity(plugins.len());

	fn visit(
		idx: usize,
		plugins: &[Box<dyn Plugin>],
		names: &[&str],
		visited: &mut [u8],
		order: &mut Vec<usize>,
	) -> Result<(), CcproxyError> {
		match visited[idx] {
			2 => return Ok(()),
			1 => {
				return Err(CcproxyError::Other(anyhow::anyhow!(
					"plugin dependency cycle detected at '{}'",
					names[idx]
				)));
			},
			_ => {},
		}
		visited[idx] = 1;
		for dep in plugins[idx].manifest().depends_on {
			let dep_idx = names.iter().position(|n| n == dep).ok_or_else(|| {
				CcproxyError::Other(anyhow::anyhow!(
					"plugin '{}' depends on unknown plugin '{dep}'",
					names[idx]
				))
			})?;
			visit(dep_idx, plugins, names, visited, order)?;
		}
		visited[idx] = 2;
		order.push(idx);
		Ok(())
	}

	for idx in 0..plugins.len() {
		visit(idx, plugins, &names, &mut visited, &mut order)?;
	}
	Ok(order)
}

#[cfg(test)]
mod tests {
	use super::*;

	struct StubPlugin {
		manifest: PluginManifest,
	}

	impl Plugin for StubPlugin {
		fn manifest(&self) -> &PluginManifest {
			&self.manifest
		}

		fn register(&self, builder: HookBusBuilder) -> HookBusBuilder {
			builder
		}
	}

	fn stub(name: &'static str, depends_on: &'static [&'static str]) -> Box<dyn Plugin> {
		Box::new(StubPlugin {
			manifest: PluginManifest {
				name,
				priority: Priority::APPLICATION,
				depends_on,
			},
		})
	}

	#[test]
	fn dependency_is_ordered_before_dependent() {
		let plugins = vec![stub("b", &["a"]), stub("a", &[])];
		let order = topo_sort(&plugins).unwrap();
		let position_a = order.iter().position(|&i| plugins[i].manifest().name == "a").unwrap();
		let position_b = order.iter().position(|&i| plugins[i].manifest().name == "b").unwrap();
		assert!(position_a < position_b);
	}

	#[test]
	fn unknown_dependency_is_an_error() {
		let plugins = vec![stub("a", &["missing"])];
		assert!(topo_sort(&plugins).is_err());
	}

	#[test]
	fn dependency_cycle_is_an_error() {
		let plugins = vec![stub("a", &["b"]), stub("b", &["a"])];
		assert!(topo_sort(&plugins).is_err());
	}

	#[test]
	fn empty_registry_builds_empty_bus() {
		let registry = PluginRegistry::new();
		let bus = registry.build().unwrap();
		assert!(bus.is_empty());
	}
}
