//! Candidate search and per-object link resolution.

use std::collections::BTreeSet;

use crate::object::Object;
use crate::paths;

use super::{Database, ObjectId};

impl Database {
	/// Searches the object index for a library satisfying `needed` from the
	/// point of view of `obj`. Candidates are probed in installation order
	/// and the first compatible, correctly named, visible one wins.
	pub(crate) fn find_for(
		&self,
		obj: &Object,
		needed: &str,
		extra: Option<&[String]>,
	) -> Option<ObjectId> {
		log::trace!("dependency of {}: {}", obj.path(), needed);
		for &candidate_id in &self.objects {
			let Some(candidate) = self.object(candidate_id) else { continue };
			if candidate.basename != needed {
				continue;
			}
			if !obj.class.compatible(&candidate.class, self.strict_linking) {
				log::trace!("  skipping {} ({})", candidate.path(), candidate.class);
				continue;
			}
			if !self.object_visible(obj, &candidate.dirname, extra) {
				log::trace!("  skipping {} (not visible)", candidate.path());
				continue;
			}
			return Some(candidate_id);
		}
		None
	}

	/// Whether `obj` may load libraries out of `dir`.
	///
	/// The probe order matches run-time linker semantics: the object's
	/// `rpath`, then its `runpath`, then the trusted system directories,
	/// then the database-wide extra paths, then `extra` (the owning
	/// package's paths). The ambient loader environment is deliberately not
	/// consulted so resolution does not depend on the host.
	pub(crate) fn object_visible(&self, obj: &Object, dir: &str, extra: Option<&[String]>) -> bool {
		if let Some(rpath) = &obj.rpath {
			if paths::pathlist_contains(rpath, dir) {
				return true;
			}
		}
		if let Some(runpath) = &obj.runpath {
			if paths::pathlist_contains(runpath, dir) {
				return true;
			}
		}
		if dir == "/lib" || dir == "/usr/lib" {
			return true;
		}
		if self.library_path.iter().any(|path| path == dir) {
			return true;
		}
		if let Some(extra) = extra {
			if extra.iter().any(|path| path == dir) {
				return true;
			}
		}
		false
	}

	/// Computes the resolution sets of the object at `id` against the
	/// current index. Objects matching an ignore rule resolve to nothing;
	/// unresolved names on the assume-found list are dropped silently.
	pub(crate) fn link_object_sets(&self, id: ObjectId) -> (BTreeSet<ObjectId>, BTreeSet<String>) {
		let mut found = BTreeSet::new();
		let mut missing = BTreeSet::new();
		let Some(obj) = self.object(id) else {
			return (found, missing);
		};
		if !self.ignore_file_rules.is_empty() && self.ignore_file_rules.contains(&obj.path()) {
			return (found, missing);
		}

		let extra = self.pkg_extra_paths(id.pkg);
		for needed in &obj.needed {
			if let Some(library) = self.find_for(obj, needed, extra) {
				found.insert(library);
			} else if !self.is_assume_found(needed) {
				missing.insert(needed.clone());
			}
		}
		(found, missing)
	}
}
