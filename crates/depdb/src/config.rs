//! Runtime knobs consumed by the core operations.

use crate::resolver::VersionCmp;

/// Options threaded through the operations that need them.
///
/// The logging sink is the `log` facade; installing a logger is the caller's
/// business, and without one all reporting is a no-op.
#[derive(Debug, Clone, Copy)]
pub struct Config {
	/// Suppresses progress reporting only; findings and query streams are
	/// unaffected.
	pub quiet: bool,
	/// Upper bound on worker threads. `0` means "one per CPU"; `1` forces
	/// the serial paths.
	pub max_jobs: usize,
	/// Loader hint: whether package metadata (depends, provides, …) was
	/// populated. The core treats absent metadata as empty either way.
	pub package_depends: bool,
	/// Loader hint: whether package filelists were populated.
	pub package_filelist: bool,
	/// Version comparator plug-in. Without one, version constraints are
	/// dropped and dependency matching is name-only.
	pub version_cmp: Option<VersionCmp>,
}

impl Default for Config {
	fn default() -> Config {
		Config {
			quiet: false,
			max_jobs: 0,
			package_depends: true,
			package_filelist: true,
			version_cmp: None,
		}
	}
}
