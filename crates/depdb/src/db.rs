//! The package database and its incremental link-resolution state.
//!
//! A [`Database`] exclusively owns its packages; packages exclusively own
//! their objects. Cross-object references (`found` sets, ownership) are
//! index pairs, never pointers, so a reference can outlive its target
//! without extending any lifetime: a dangling id simply stops resolving.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Serialize, Deserialize};

use crate::error::{Error, Result};
use crate::object::Object;
use crate::package::Package;
use crate::paths;

mod linker;
mod query;
mod relink;

pub use query::{BrokenPackagesExt, InGroupExt};

/// Schema tag consumed by the external persistence layer.
pub const CURRENT_VERSION: u32 = 3;

/// Stable handle of an installed package. Ids are handed out monotonically
/// and never reused within a database, so a stale id can never alias a
/// later package.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PackageId(u32);

/// Address of an object: owning package plus position in its object list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ObjectId {
	pkg: PackageId,
	idx: u32,
}

impl ObjectId {
	/// The owning package's handle.
	pub fn package(&self) -> PackageId {
		self.pkg
	}
}

/// The installed-package database.
///
/// Mutating operations (`install_package`, `delete_package`, the rule and
/// path editors, `relink_all`) require exclusive access and leave the
/// per-object resolution sets consistent. Read-only queries can run in
/// parallel against a quiescent database.
#[derive(Debug, Serialize, Deserialize)]
pub struct Database {
	/// Human-readable name of this database.
	pub name: String,
	/// Whether object compatibility requires the OS ABI to match as well.
	/// Toggling this invalidates the resolution sets until the next
	/// `relink_all`.
	pub strict_linking: bool,

	loaded_version: u32,
	next_package_id: u32,
	packages: Vec<Package>,
	/// Flat object index in installation order; resolution candidates are
	/// searched in exactly this order.
	objects: Vec<ObjectId>,
	by_id: HashMap<PackageId, usize>,

	library_path: Vec<String>,
	package_library_path: BTreeMap<String, Vec<String>>,
	ignore_file_rules: BTreeSet<String>,
	assume_found_rules: BTreeSet<String>,
	base_packages: BTreeSet<String>,

	contains_package_depends: bool,
	contains_groups: bool,
	contains_filelists: bool,
}

impl Default for Database {
	fn default() -> Database {
		Database::new("")
	}
}

impl Database {
	pub fn new(name: impl Into<String>) -> Database {
		Database {
			name: name.into(),
			strict_linking: false,
			loaded_version: CURRENT_VERSION,
			next_package_id: 0,
			packages: Vec::new(),
			objects: Vec::new(),
			by_id: HashMap::new(),
			library_path: Vec::new(),
			package_library_path: BTreeMap::new(),
			ignore_file_rules: BTreeSet::new(),
			assume_found_rules: BTreeSet::new(),
			base_packages: BTreeSet::new(),
			contains_package_depends: false,
			contains_groups: false,
			contains_filelists: false,
		}
	}

	/* Lookups */

	pub fn packages(&self) -> &[Package] {
		&self.packages
	}

	pub fn find_pkg(&self, name: &str) -> Option<&Package> {
		self.packages.iter().find(|pkg| pkg.name == name)
	}

	pub fn package(&self, id: PackageId) -> Option<&Package> {
		self.packages.get(*self.by_id.get(&id)?)
	}

	pub fn object(&self, id: ObjectId) -> Option<&Object> {
		self.package(id.pkg)?.objects.get(id.idx as usize)
	}

	fn object_mut(&mut self, id: ObjectId) -> Option<&mut Object> {
		let at = *self.by_id.get(&id.pkg)?;
		self.packages.get_mut(at)?.objects.get_mut(id.idx as usize)
	}

	/// Per-package extra library paths of the package owning `id`, if any.
	pub(crate) fn pkg_extra_paths(&self, id: PackageId) -> Option<&[String]> {
		let pkg = self.package(id)?;
		self.package_library_path.get(&pkg.name).map(Vec::as_slice)
	}

	pub fn object_count(&self) -> usize {
		self.objects.len()
	}

	pub fn empty(&self) -> bool {
		self.packages.is_empty() && self.objects.is_empty()
	}

	pub fn loaded_version(&self) -> u32 {
		self.loaded_version
	}

	pub fn has_package_depends(&self) -> bool {
		self.contains_package_depends
	}

	pub fn has_groups(&self) -> bool {
		self.contains_groups
	}

	pub fn has_filelists(&self) -> bool {
		self.contains_filelists
	}

	/* Installation */

	/// Installs `pkg`, replacing any package of the same name, and resolves
	/// the needs of every new object as well as the pending needs of
	/// existing objects the new package satisfies.
	///
	/// # Errors
	/// - [`InvalidPackage`](Error::InvalidPackage) when the package has no
	///   name. Nothing is mutated in that case.
	pub fn install_package(&mut self, mut pkg: Package) -> Result<()> {
		if pkg.name.is_empty() {
			return Err(Error::InvalidPackage("package has no name".to_string()));
		}
		self.delete_package(&pkg.name);

		log::debug!("installing {} {} ({} objects)", pkg.name, pkg.version, pkg.objects.len());

		let id = PackageId(self.next_package_id);
		self.next_package_id += 1;
		pkg.id = Some(id);

		if !pkg.depends.is_empty() || !pkg.optdepends.is_empty() ||
		   !pkg.replaces.is_empty() || !pkg.conflicts.is_empty() ||
		   !pkg.provides.is_empty()
		{
			self.contains_package_depends = true;
		}
		if !pkg.groups.is_empty() {
			self.contains_groups = true;
		}
		if !pkg.filelist.is_empty() {
			self.contains_filelists = true;
		}

		let at = self.packages.len();
		let new_ids: Vec<ObjectId> = (0..pkg.objects.len())
			.map(|idx| ObjectId { pkg: id, idx: idx as u32 })
			.collect();
		self.packages.push(pkg);
		self.by_id.insert(id, at);
		self.objects.extend(new_ids.iter().copied());

		/* The index already contains the new objects here, so a package can
		 * satisfy its own needs. */
		for &oid in &new_ids {
			let (found, missing) = self.link_object_sets(oid);
			if let Some(obj) = self.object_mut(oid) {
				obj.req_found = found;
				obj.req_missing = missing;
			}
		}

		/* Existing objects may have been waiting for one of the new names.
		 * The new package's extra paths apply while probing visibility. */
		let mut fixes: Vec<(ObjectId, ObjectId, String)> = Vec::new();
		{
			let pkg = &self.packages[at];
			let extra = self.package_library_path.get(&pkg.name).map(Vec::as_slice);
			for &seeker_id in &self.objects {
				if seeker_id.pkg == id {
					continue;
				}
				let Some(seeker) = self.object(seeker_id) else { continue };
				for (idx, obj) in pkg.objects.iter().enumerate() {
					if !seeker.req_missing.contains(&obj.basename) {
						continue;
					}
					if !seeker.class.compatible(&obj.class, self.strict_linking) {
						continue;
					}
					if !self.object_visible(seeker, &obj.dirname, extra) {
						continue;
					}
					let oid = ObjectId { pkg: id, idx: idx as u32 };
					fixes.push((seeker_id, oid, obj.basename.clone()));
				}
			}
		}
		for (seeker_id, found_id, basename) in fixes {
			if let Some(seeker) = self.object_mut(seeker_id) {
				if seeker.req_missing.remove(&basename) {
					seeker.req_found.insert(found_id);
				}
			}
		}
		Ok(())
	}

	/// Removes the named package. Every remaining object that resolved into
	/// it gets one chance to re-resolve against what is left; needs that no
	/// longer resolve move to the missing set unless they are assumed found.
	///
	/// Returns whether a package was actually removed; an unknown name is a
	/// successful no-op.
	pub fn delete_package(&mut self, name: &str) -> bool {
		let Some(at) = self.packages.iter().position(|pkg| pkg.name == name) else {
			return false;
		};
		let removed = self.packages.remove(at);
		self.reindex();
		let Some(removed_id) = removed.id else {
			/* never installed, so nothing can reference it */
			return true;
		};
		self.objects.retain(|oid| oid.pkg != removed_id);

		log::debug!("deleting {} ({} objects)", removed.name, removed.objects.len());

		struct Patch {
			seeker: ObjectId,
			gone: ObjectId,
			replacement: Option<ObjectId>,
			basename: String,
		}
		let mut patches: Vec<Patch> = Vec::new();
		for &seeker_id in &self.objects {
			let Some(seeker) = self.object(seeker_id) else { continue };
			for (idx, obj) in removed.objects.iter().enumerate() {
				let gone = ObjectId { pkg: removed_id, idx: idx as u32 };
				if !seeker.req_found.contains(&gone) {
					continue;
				}
				let extra = self.pkg_extra_paths(seeker_id.pkg);
				patches.push(Patch {
					seeker: seeker_id,
					gone,
					replacement: self.find_for(seeker, &obj.basename, extra),
					basename: obj.basename.clone(),
				});
			}
		}
		for patch in patches {
			let assumed = self.assume_found_rules.contains(&patch.basename);
			if let Some(seeker) = self.object_mut(patch.seeker) {
				seeker.req_found.remove(&patch.gone);
				match patch.replacement {
					Some(other) => {
						seeker.req_found.insert(other);
					}
					None if !assumed => {
						seeker.req_missing.insert(patch.basename);
					}
					None => {}
				}
			}
		}
		true
	}

	fn reindex(&mut self) {
		self.by_id.clear();
		for (at, pkg) in self.packages.iter().enumerate() {
			if let Some(id) = pkg.id {
				self.by_id.insert(id, at);
			}
		}
	}

	/// Drops every package and object. Rules, paths and the summary flags
	/// stay untouched.
	pub fn wipe_packages(&mut self) -> bool {
		if self.empty() {
			return false;
		}
		self.objects.clear();
		self.packages.clear();
		self.by_id.clear();
		true
	}

	/// Drops every package's filelist and clears the filelist hint.
	pub fn wipe_filelists(&mut self) -> bool {
		let mut had_files = self.contains_filelists;
		for pkg in &mut self.packages {
			if !pkg.filelist.is_empty() {
				pkg.filelist.clear();
				had_files = true;
			}
		}
		self.contains_filelists = false;
		had_files
	}

	/// Re-normalizes the search-path hints of every object. Useful after a
	/// persistence layer loads data recorded before normalization applied.
	pub fn fix_paths(&mut self) {
		for pkg in &mut self.packages {
			for obj in &mut pkg.objects {
				obj.rpath = obj.rpath.take().map(|list| paths::normalize_pathlist(&list));
				obj.runpath = obj.runpath.take().map(|list| paths::normalize_pathlist(&list));
			}
		}
	}

	/* Global library path */

	pub fn library_path(&self) -> &[String] {
		&self.library_path
	}

	pub fn ld_append(&mut self, dir: &str) -> bool {
		self.ld_insert(dir, self.library_path.len())
	}

	pub fn ld_prepend(&mut self, dir: &str) -> bool {
		self.ld_insert(dir, 0)
	}

	/// Inserts `dir` at `index`. An already-present entry is moved there
	/// instead of duplicated; returns whether the list changed.
	pub fn ld_insert(&mut self, dir: &str, index: usize) -> bool {
		let dir = paths::normalize(dir);
		list_insert(&mut self.library_path, dir, index)
	}

	pub fn ld_delete(&mut self, dir: &str) -> bool {
		let dir = paths::normalize(dir);
		match self.library_path.iter().position(|entry| *entry == dir) {
			Some(at) => {
				self.library_path.remove(at);
				true
			}
			None => false,
		}
	}

	pub fn ld_delete_index(&mut self, index: usize) -> bool {
		if index >= self.library_path.len() {
			return false;
		}
		self.library_path.remove(index);
		true
	}

	pub fn ld_clear(&mut self) -> bool {
		if self.library_path.is_empty() {
			return false;
		}
		self.library_path.clear();
		true
	}

	/* Per-package library paths */

	pub fn package_library_path(&self, package: &str) -> Option<&[String]> {
		self.package_library_path.get(package).map(Vec::as_slice)
	}

	pub fn package_library_paths(&self) -> impl Iterator<Item = (&str, &[String])> {
		self.package_library_path.iter().map(|(name, list)| (name.as_str(), list.as_slice()))
	}

	/// Like [`ld_insert`](Database::ld_insert) for the named package's list.
	/// The list is allocated on first use.
	pub fn pkg_ld_insert(&mut self, package: &str, dir: &str, index: usize) -> bool {
		let dir = paths::normalize(dir);
		let list = self.package_library_path.entry(package.to_string()).or_default();
		list_insert(list, dir, index)
	}

	pub fn pkg_ld_delete(&mut self, package: &str, dir: &str) -> bool {
		let dir = paths::normalize(dir);
		let Some(list) = self.package_library_path.get_mut(package) else {
			return false;
		};
		let Some(at) = list.iter().position(|entry| *entry == dir) else {
			return false;
		};
		list.remove(at);
		if list.is_empty() {
			self.package_library_path.remove(package);
		}
		true
	}

	pub fn pkg_ld_delete_index(&mut self, package: &str, index: usize) -> bool {
		let Some(list) = self.package_library_path.get_mut(package) else {
			return false;
		};
		if index >= list.len() {
			return false;
		}
		list.remove(index);
		if list.is_empty() {
			self.package_library_path.remove(package);
		}
		true
	}

	pub fn pkg_ld_clear(&mut self, package: &str) -> bool {
		self.package_library_path.remove(package).is_some()
	}

	/* Rules */

	pub fn ignore_file_rules(&self) -> impl ExactSizeIterator<Item = &str> {
		self.ignore_file_rules.iter().map(String::as_str)
	}

	/// Excludes the file from linking: an object at this exact path keeps
	/// empty resolution sets. Takes effect at the next install or relink.
	pub fn ignore_file(&mut self, file: &str) -> bool {
		self.ignore_file_rules.insert(paths::normalize(file))
	}

	pub fn unignore_file(&mut self, file: &str) -> bool {
		self.ignore_file_rules.remove(&paths::normalize(file))
	}

	pub fn unignore_file_index(&mut self, index: usize) -> bool {
		set_remove_index(&mut self.ignore_file_rules, index)
	}

	pub fn assume_found_rules(&self) -> impl ExactSizeIterator<Item = &str> {
		self.assume_found_rules.iter().map(String::as_str)
	}

	/// Treats the library name as present without a resolving object.
	/// Takes effect at the next install or relink.
	pub fn assume_found(&mut self, name: &str) -> bool {
		self.assume_found_rules.insert(name.to_string())
	}

	pub fn unassume_found(&mut self, name: &str) -> bool {
		self.assume_found_rules.remove(name)
	}

	pub fn unassume_found_index(&mut self, index: usize) -> bool {
		set_remove_index(&mut self.assume_found_rules, index)
	}

	pub(crate) fn is_assume_found(&self, name: &str) -> bool {
		self.assume_found_rules.contains(name)
	}

	pub fn base_packages(&self) -> impl ExactSizeIterator<Item = &str> {
		self.base_packages.iter().map(String::as_str)
	}

	pub fn add_base_package(&mut self, name: &str) -> bool {
		self.base_packages.insert(name.to_string())
	}

	pub fn remove_base_package(&mut self, name: &str) -> bool {
		self.base_packages.remove(name)
	}

	pub fn remove_base_package_index(&mut self, index: usize) -> bool {
		set_remove_index(&mut self.base_packages, index)
	}

	/* Consistency */

	/// Verifies the database-wide resolution invariants: every needed name
	/// of every installed object is accounted for exactly once, found
	/// entries point at live, compatible, visible objects, and the flat
	/// index agrees with package ownership.
	///
	/// Rule edits (`ignore_file`, `assume_found`, …) intentionally take
	/// effect at the next relink, so call this after installs, deletes and
	/// relinks rather than between a rule edit and the relink applying it.
	///
	/// # Errors
	/// [`InvariantViolation`](Error::InvariantViolation) describing the
	/// first contradiction found.
	pub fn check_consistency(&self) -> Result<()> {
		let fail = |what: String| Err(Error::InvariantViolation(what));

		for (at, pkg) in self.packages.iter().enumerate() {
			let Some(id) = pkg.id else {
				return fail(format!("package {} has no id", pkg.name));
			};
			if self.by_id.get(&id) != Some(&at) {
				return fail(format!("package {} is mis-indexed", pkg.name));
			}
		}
		let owned: usize = self.packages.iter().map(|pkg| pkg.objects.len()).sum();
		if owned != self.objects.len() {
			return fail(format!(
				"object index holds {} entries but packages own {} objects",
				self.objects.len(), owned,
			));
		}

		for &oid in &self.objects {
			let Some(obj) = self.object(oid) else {
				return fail(format!("stale object index entry in package id {:?}", oid.pkg));
			};
			let extra = self.pkg_extra_paths(oid.pkg);

			if self.ignore_file_rules.contains(&obj.path()) {
				if !obj.req_found.is_empty() || !obj.req_missing.is_empty() {
					return fail(format!("ignored object {} carries resolution state", obj.path()));
				}
				continue;
			}

			let needed: BTreeSet<&str> = obj.needed.iter().map(String::as_str).collect();
			let mut found_names: BTreeSet<&str> = BTreeSet::new();
			for &rid in &obj.req_found {
				let Some(target) = self.object(rid) else {
					return fail(format!("{} resolves into a dropped object", obj.path()));
				};
				if !needed.contains(target.basename.as_str()) {
					return fail(format!("{} finds unneeded {}", obj.path(), target.basename));
				}
				if !obj.class.compatible(&target.class, self.strict_linking) {
					return fail(format!("{} finds incompatible {}", obj.path(), target.path()));
				}
				if !self.object_visible(obj, &target.dirname, extra) {
					return fail(format!("{} finds invisible {}", obj.path(), target.path()));
				}
				if !found_names.insert(target.basename.as_str()) {
					return fail(format!("{} resolves {} twice", obj.path(), target.basename));
				}
			}
			for name in &obj.req_missing {
				if !needed.contains(name.as_str()) {
					return fail(format!("{} misses unneeded {}", obj.path(), name));
				}
				if found_names.contains(name.as_str()) {
					return fail(format!("{} both finds and misses {}", obj.path(), name));
				}
			}
			for name in needed {
				let missing = obj.req_missing.contains(name);
				let assumed = self.assume_found_rules.contains(name);
				if missing && assumed {
					return fail(format!("{} misses assumed-found {}", obj.path(), name));
				}
				if !found_names.contains(name) && !missing && !assumed {
					return fail(format!("{} does not account for {}", obj.path(), name));
				}
			}
		}
		Ok(())
	}
}

/// Insert-or-move used by the library path editors: a list never holds the
/// same entry twice, and inserting an existing entry moves it instead.
fn list_insert(list: &mut Vec<String>, entry: String, index: usize) -> bool {
	let index = index.min(list.len());
	match list.iter().position(|existing| *existing == entry) {
		None => {
			list.insert(index, entry);
			true
		}
		Some(old) => {
			/* the landing slot once the old copy is gone; indices past it
			 * shift down by one */
			let target = if index > old { index - 1 } else { index };
			let target = target.min(list.len().saturating_sub(1));
			if target == old {
				return false;
			}
			list.remove(old);
			list.insert(target, entry);
			true
		}
	}
}

/// The rule sets are semantic sets, but their report views are numbered;
/// sorted iteration order is the stable index mapping deletions refer to.
fn set_remove_index(set: &mut BTreeSet<String>, index: usize) -> bool {
	let Some(value) = set.iter().nth(index).cloned() else {
		return false;
	};
	set.remove(&value)
}
