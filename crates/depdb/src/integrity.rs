//! Package-level dependency closure checking.
//!
//! The link resolver answers "does some object satisfy this need"; the
//! integrity checker answers the stricter question "does the package's
//! declared dependency closure actually pull that object in". It is purely
//! diagnostic: findings are returned as data and nothing ever aborts.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::Config;
use crate::db::{Database, ObjectId, PackageId};
use crate::jobs;
use crate::object::Object;
use crate::package::Package;
use crate::resolver::{self, DependencyResolver};

/// A single diagnostic. Rendering is the caller's business.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
	/// `package` depends on `dependency` but nothing installed resolves it.
	MissingDependency {
		package: String,
		dependency: String,
		optional: bool,
	},
	/// `package` declares `specifier` and the install closure contains the
	/// matching package `other`.
	Conflict {
		package: String,
		specifier: String,
		other: String,
		other_version: String,
	},
	/// `object` (owned by `package`) needs `need`, but no package in the
	/// dependency closure contains a resolving object.
	UnpulledNeed {
		package: String,
		object: String,
		need: String,
	},
	/// `path` occurs in every package of `packages` and none of them
	/// declares a conflict covering the others.
	FileConflict {
		path: String,
		packages: Vec<String>,
	},
}

type PackagePredicate = Box<dyn Fn(&Package) -> bool + Sync>;
type ObjectPredicate = Box<dyn Fn(&Object) -> bool + Sync>;

/// Checks whether package-level `depends`/`optdepends` actually pull in
/// every shared library the packages' objects need.
///
/// Construction precomputes the name indices and the base closure; the
/// check itself is read-only and can run for many packages, serially or in
/// parallel.
pub struct IntegrityChecker<'db> {
	db: &'db Database,
	resolver: DependencyResolver<'db>,
	objects_by_name: HashMap<&'db str, Vec<ObjectId>>,
	base: Vec<&'db Package>,
	base_map: HashMap<&'db str, &'db Package>,
	package_filter: Option<PackagePredicate>,
	object_filter: Option<ObjectPredicate>,
}

impl<'db> IntegrityChecker<'db> {
	pub fn new(db: &'db Database, config: &Config) -> IntegrityChecker<'db> {
		/* a stale index entry indicates a bug somewhere; report it and carry on */
		for oid in db.object_ids() {
			if db.object(oid).is_none() {
				log::error!("object index entry {:?} has no owning package", oid);
			}
		}

		let resolver = DependencyResolver::new(db, config.version_cmp);

		let mut objects_by_name: HashMap<&str, Vec<ObjectId>> = HashMap::new();
		for (oid, obj) in db.objects() {
			objects_by_name.entry(obj.basename.as_str()).or_default().push(oid);
		}

		let mut base = Vec::new();
		let mut base_map = HashMap::new();
		for name in db.base_packages() {
			if let Some(pkg) = db.find_pkg(name) {
				base.push(pkg);
				base_map.insert(pkg.name.as_str(), pkg);
			}
		}

		IntegrityChecker {
			db,
			resolver,
			objects_by_name,
			base,
			base_map,
			package_filter: None,
			object_filter: None,
		}
	}

	/// Restricts [`check_all`](IntegrityChecker::check_all) to packages the
	/// predicate accepts.
	pub fn with_package_filter(mut self, filter: impl Fn(&Package) -> bool + Sync + 'static) -> Self {
		self.package_filter = Some(Box::new(filter));
		self
	}

	/// Restricts the per-object need verification to objects the predicate
	/// accepts.
	pub fn with_object_filter(mut self, filter: impl Fn(&Object) -> bool + Sync + 'static) -> Self {
		self.object_filter = Some(Box::new(filter));
		self
	}

	/// Checks a single focus package: computes the install closure from the
	/// base packages plus `pkg`, then verifies that every need of every
	/// (filter-accepted) object is owned by some closure member.
	pub fn check_package(&self, pkg: &'db Package) -> Vec<Finding> {
		let mut findings = Vec::new();
		let mut pulled = self.base.clone();
		let mut install_map = self.base_map.clone();
		self.install_recursive(&mut pulled, &mut install_map, pkg, true, &mut findings);

		let pulled_ids: HashSet<PackageId> = pulled.iter().filter_map(|p| p.id()).collect();

		for obj in &pkg.objects {
			if let Some(filter) = &self.object_filter {
				if !filter(obj) {
					continue;
				}
			}
			let mut reported: BTreeSet<&str> = BTreeSet::new();
			for need in &obj.needed {
				if !reported.insert(need.as_str()) {
					continue;
				}
				let satisfied = match self.objects_by_name.get(need.as_str()) {
					Some(candidates) => candidates
						.iter()
						.any(|oid| pulled_ids.contains(&oid.package())),
					None => false,
				};
				if !satisfied {
					findings.push(Finding::UnpulledNeed {
						package: pkg.name.clone(),
						object: obj.path(),
						need: need.clone(),
					});
				}
			}
		}
		findings
	}

	/// Walks the closure: records the package under its name and all of its
	/// `provides`/`replaces` aliases, checks its `conflicts` against what
	/// the map holds so far, then recurses into its dependencies. Notices
	/// are only emitted for the focus package.
	fn install_recursive(
		&self,
		pulled: &mut Vec<&'db Package>,
		install_map: &mut HashMap<&'db str, &'db Package>,
		pkg: &'db Package,
		focus: bool,
		findings: &mut Vec<Finding>,
	) {
		if install_map.contains_key(pkg.name.as_str()) {
			return;
		}
		install_map.insert(pkg.name.as_str(), pkg);
		for prov in &pkg.provides {
			install_map.insert(prov.name.as_str(), pkg);
		}
		for repl in &pkg.replaces {
			install_map.insert(repl.name.as_str(), pkg);
		}

		for spec in &pkg.conflicts {
			let Some(&other) = install_map.get(spec.name.as_str()) else { continue };
			if std::ptr::eq(other, pkg) {
				continue;
			}
			if let (Some(cmp), Some((op, version))) = (self.resolver.vercmp(), &spec.constraint) {
				if !resolver::version_op(cmp, *op, &other.version, version) {
					continue;
				}
			}
			if focus {
				findings.push(Finding::Conflict {
					package: pkg.name.clone(),
					specifier: spec.to_string(),
					other: other.name.clone(),
					other_version: other.version.clone(),
				});
			}
		}

		pulled.push(pkg);
		for (deps, optional) in [(&pkg.depends, false), (&pkg.optdepends, true)] {
			for dep in deps {
				match self.resolver.find_depend(dep) {
					Some(found) => {
						self.install_recursive(pulled, install_map, found, false, findings);
					}
					None if focus => {
						findings.push(Finding::MissingDependency {
							package: pkg.name.clone(),
							dependency: dep.to_string(),
							optional,
						});
					}
					None => {}
				}
			}
		}
	}

	/// Checks every (filter-accepted) package. With `max_jobs == 1` the
	/// packages are visited serially; otherwise they are partitioned into
	/// contiguous slices across workers and the findings concatenated in
	/// slice order.
	pub fn check_all(&self, config: &Config) -> Vec<Finding> {
		let packages: Vec<&Package> = self
			.db
			.packages()
			.iter()
			.filter(|pkg| self.package_filter.as_ref().map_or(true, |f| f(pkg)))
			.collect();
		let total = packages.len();
		if total == 0 {
			return Vec::new();
		}

		if config.max_jobs == 1 {
			let mut progress = jobs::Progress::new("checking", total, config.quiet);
			progress.update(0, 1);
			let mut findings = Vec::new();
			for (at, &pkg) in packages.iter().enumerate() {
				findings.extend(self.check_package(pkg));
				progress.update(at + 1, 1);
			}
			return findings;
		}

		let slices = jobs::partition(total, jobs::thread_count(config.max_jobs));
		let workers = slices.len();
		let counter = AtomicUsize::new(0);
		let partials: Vec<Vec<Finding>> = std::thread::scope(|scope| {
			let counter = &counter;
			let packages = &packages;
			let handles: Vec<_> = slices
				.into_iter()
				.map(|slice| {
					scope.spawn(move || {
						let mut findings = Vec::new();
						for at in slice {
							findings.extend(self.check_package(packages[at]));
							counter.fetch_add(1, Ordering::Relaxed);
						}
						findings
					})
				})
				.collect();

			if !config.quiet {
				let mut progress = jobs::Progress::new("checking", total, config.quiet);
				let mut at = counter.load(Ordering::Relaxed);
				progress.update(at, workers);
				while at != total {
					std::thread::sleep(Duration::from_millis(100));
					at = counter.load(Ordering::Relaxed);
					progress.update(at, workers);
				}
			}

			handles
				.into_iter()
				.map(|handle| handle.join().expect("integrity worker panicked"))
				.collect()
		});
		partials.into_iter().flatten().collect()
	}
}
