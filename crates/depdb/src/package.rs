//! Packages and their dependency metadata.

use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::db::PackageId;
use crate::object::Object;
use crate::resolver::{self, VersionCmp};

/// Comparison operator of a versioned dependency specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VersionOp {
	Eq,
	Ne,
	Lt,
	Le,
	Gt,
	Ge,
}

impl VersionOp {
	pub fn as_str(self) -> &'static str {
		match self {
			VersionOp::Eq => "=",
			VersionOp::Ne => "!=",
			VersionOp::Lt => "<",
			VersionOp::Le => "<=",
			VersionOp::Gt => ">",
			VersionOp::Ge => ">=",
		}
	}

	/// Whether `actual OP wanted` holds, given `ord = cmp(actual, wanted)`.
	pub fn holds(self, ord: Ordering) -> bool {
		match self {
			VersionOp::Eq => ord == Ordering::Equal,
			VersionOp::Ne => ord != Ordering::Equal,
			VersionOp::Lt => ord == Ordering::Less,
			VersionOp::Le => ord != Ordering::Greater,
			VersionOp::Gt => ord == Ordering::Greater,
			VersionOp::Ge => ord != Ordering::Less,
		}
	}
}

impl fmt::Display for VersionOp {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A dependency specifier: a package (or provided) name with an optional
/// version constraint, e.g. `glibc` or `openssl>=3.0`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DepSpec {
	pub name: String,
	pub constraint: Option<(VersionOp, String)>,
}

impl DepSpec {
	pub fn named(name: impl Into<String>) -> DepSpec {
		DepSpec { name: name.into(), constraint: None }
	}

	pub fn versioned(name: impl Into<String>, op: VersionOp, version: impl Into<String>) -> DepSpec {
		DepSpec { name: name.into(), constraint: Some((op, version.into())) }
	}

	/// Parses `name`, `name=1.0`, `name>=2`, …
	///
	/// A dangling operator (`foo>=`) or a malformed one (`foo!bar`) degrades
	/// to a plain name; version matching then treats the specifier as
	/// unconstrained.
	pub fn parse(spec: &str) -> DepSpec {
		let Some(at) = spec.find(['=', '<', '>', '!']) else {
			return DepSpec::named(spec);
		};
		let name = &spec[..at];
		let rest = &spec[at..];
		let (op, version) = if let Some(v) = rest.strip_prefix("==") {
			(VersionOp::Eq, v)
		} else if let Some(v) = rest.strip_prefix("!=") {
			(VersionOp::Ne, v)
		} else if let Some(v) = rest.strip_prefix(">=") {
			(VersionOp::Ge, v)
		} else if let Some(v) = rest.strip_prefix("<=") {
			(VersionOp::Le, v)
		} else if let Some(v) = rest.strip_prefix('=') {
			(VersionOp::Eq, v)
		} else if let Some(v) = rest.strip_prefix('>') {
			(VersionOp::Gt, v)
		} else if let Some(v) = rest.strip_prefix('<') {
			(VersionOp::Lt, v)
		} else {
			/* lone '!' */
			return DepSpec::named(name);
		};
		if version.is_empty() {
			return DepSpec::named(name);
		}
		DepSpec::versioned(name, op, version)
	}
}

impl fmt::Display for DepSpec {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match &self.constraint {
			Some((op, version)) => write!(f, "{}{}{}", self.name, op, version),
			None => f.write_str(&self.name),
		}
	}
}

impl From<&str> for DepSpec {
	fn from(spec: &str) -> DepSpec {
		DepSpec::parse(spec)
	}
}

/// A named, versioned bundle of objects plus its dependency metadata.
///
/// Loaders populate every field and hand the package to
/// [`Database::install_package`](crate::db::Database::install_package), which
/// takes ownership. The version is an opaque string; all comparison goes
/// through the pluggable comparator.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Package {
	pub(crate) id: Option<PackageId>,
	pub name: String,
	pub version: String,
	pub depends: Vec<DepSpec>,
	pub optdepends: Vec<DepSpec>,
	pub provides: Vec<DepSpec>,
	pub replaces: Vec<DepSpec>,
	pub conflicts: Vec<DepSpec>,
	pub groups: BTreeSet<String>,
	/// Absolute paths of every file in the package, for conflict detection.
	pub filelist: Vec<String>,
	pub objects: Vec<Object>,
}

impl Package {
	pub fn new(name: impl Into<String>, version: impl Into<String>) -> Package {
		Package {
			name: name.into(),
			version: version.into(),
			..Default::default()
		}
	}

	/// Handle assigned at install time; `None` while the package lives
	/// outside a database.
	pub fn id(&self) -> Option<PackageId> {
		self.id
	}

	/// A package is broken when any of its objects has unresolved needs.
	pub fn is_broken(&self) -> bool {
		self.objects.iter().any(Object::is_broken)
	}

	/// Whether any of this package's `conflicts` specifiers covers `other`,
	/// either by its real name or through one of its `provides` entries.
	/// Version constraints are honored when a comparator is supplied and
	/// dropped otherwise.
	pub fn conflicts_with(&self, other: &Package, vercmp: Option<VersionCmp>) -> bool {
		self.conflicts.iter().any(|spec| conflict_covers(spec, other, vercmp))
	}
}

fn conflict_covers(spec: &DepSpec, other: &Package, vercmp: Option<VersionCmp>) -> bool {
	let constraint = match (vercmp, &spec.constraint) {
		(Some(cmp), Some((op, version))) => Some((cmp, *op, version.as_str())),
		_ => None,
	};
	let Some((cmp, op, wanted)) = constraint else {
		return other.name == spec.name ||
			other.provides.iter().any(|prov| prov.name == spec.name);
	};
	if other.name == spec.name && resolver::version_op(cmp, op, &other.version, wanted) {
		return true;
	}
	other.provides.iter().any(|prov| {
		prov.name == spec.name &&
			match &prov.constraint {
				Some((pop, pver)) => resolver::version_satisfies(cmp, op, wanted, *pop, pver),
				None => false,
			}
	})
}

#[cfg(test)]
mod test {
	use super::*;

	#[test] fn plain_name_parses() { assert_eq!(DepSpec::parse("glibc"), DepSpec::named("glibc")) }
	#[test] fn exact_version_parses() { assert_eq!(DepSpec::parse("foo=1.0"), DepSpec::versioned("foo", VersionOp::Eq, "1.0")) }
	#[test] fn double_equals_parses() { assert_eq!(DepSpec::parse("foo==1.0"), DepSpec::versioned("foo", VersionOp::Eq, "1.0")) }
	#[test] fn not_equal_parses() { assert_eq!(DepSpec::parse("foo!=2.0"), DepSpec::versioned("foo", VersionOp::Ne, "2.0")) }
	#[test] fn lower_bound_parses() { assert_eq!(DepSpec::parse("foo>=1.2"), DepSpec::versioned("foo", VersionOp::Ge, "1.2")) }
	#[test] fn upper_bound_parses() { assert_eq!(DepSpec::parse("foo<2"), DepSpec::versioned("foo", VersionOp::Lt, "2")) }
	#[test] fn dangling_operator_degrades() { assert_eq!(DepSpec::parse("foo>="), DepSpec::named("foo")) }
	#[test] fn lone_bang_degrades() { assert_eq!(DepSpec::parse("foo!bar"), DepSpec::named("foo")) }
	#[test] fn display_round_trips() { assert_eq!(DepSpec::parse("foo>=1.2").to_string(), "foo>=1.2") }
	#[test] fn from_str_parses() { assert_eq!(DepSpec::from("foo<=3"), DepSpec::versioned("foo", VersionOp::Le, "3")) }

	#[test]
	fn name_only_conflict_covers_provides() {
		let mut a = Package::new("a", "1");
		a.conflicts.push(DepSpec::named("virt"));
		let mut b = Package::new("b", "1");
		b.provides.push(DepSpec::named("virt"));
		assert!(a.conflicts_with(&b, None));
		assert!(!b.conflicts_with(&a, None));
	}

	#[test]
	fn versioned_conflict_checks_the_other_version() {
		let mut a = Package::new("a", "1");
		a.conflicts.push(DepSpec::parse("b<2.0"));
		let b_old = Package::new("b", "1.5");
		let b_new = Package::new("b", "2.1");
		assert!(a.conflicts_with(&b_old, Some(crate::vercmp::vercmp)));
		assert!(!a.conflicts_with(&b_new, Some(crate::vercmp::vercmp)));
		/* without a comparator the constraint is dropped */
		assert!(a.conflicts_with(&b_new, None));
	}
}
