//! Binary objects and their load-compatibility classification.

use std::collections::BTreeSet;
use std::fmt;

use serde::{Serialize, Deserialize};

use crate::db::ObjectId;
use crate::paths;

/* ELF identification bytes, as found in e_ident. */
pub const ELFCLASS32: u8 = 1;
pub const ELFCLASS64: u8 = 2;
pub const ELFDATA2LSB: u8 = 1;
pub const ELFDATA2MSB: u8 = 2;
pub const ELFOSABI_NONE: u8 = 0;
pub const ELFOSABI_LINUX: u8 = 3;
pub const ELFOSABI_FREEBSD: u8 = 9;

/// Load-compatibility key of an object: bit width, byte order and OS ABI,
/// exactly as the loader read them from the identification header.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectClass {
	pub ei_class: u8,
	pub ei_data: u8,
	pub ei_osabi: u8,
}

impl ObjectClass {
	pub fn new(ei_class: u8, ei_data: u8, ei_osabi: u8) -> ObjectClass {
		ObjectClass { ei_class, ei_data, ei_osabi }
	}

	/// Whether an object of this class can link against one of `other`'s.
	///
	/// Strict matching requires the full triple to agree; non-strict matching
	/// ignores the OS ABI.
	pub fn compatible(&self, other: &ObjectClass, strict: bool) -> bool {
		self.ei_class == other.ei_class &&
		self.ei_data == other.ei_data &&
		(!strict || self.ei_osabi == other.ei_osabi)
	}

	pub fn class_str(&self) -> &'static str {
		match self.ei_class {
			ELFCLASS32 => "ELF32",
			ELFCLASS64 => "ELF64",
			_ => "unknown class",
		}
	}

	pub fn data_str(&self) -> &'static str {
		match self.ei_data {
			ELFDATA2LSB => "LSB",
			ELFDATA2MSB => "MSB",
			_ => "unknown byte order",
		}
	}

	pub fn osabi_str(&self) -> &'static str {
		match self.ei_osabi {
			ELFOSABI_NONE => "SysV",
			ELFOSABI_LINUX => "Linux",
			ELFOSABI_FREEBSD => "FreeBSD",
			_ => "unknown ABI",
		}
	}
}

impl fmt::Display for ObjectClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{} {} ({})", self.class_str(), self.data_str(), self.osabi_str())
	}
}

/// One binary object owned by a package.
///
/// The identity fields, search-path hints and `needed` list are populated by
/// the loader before installation. The resolution sets are maintained by the
/// [`Database`](crate::db::Database) from installation onwards: every needed
/// name is accounted for by exactly one resolving entry in the found set or
/// by an entry in the missing set, except names the database assumes present.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Object {
	/// Absolute, normalized directory.
	pub dirname: String,
	/// File name, non-empty and slash-free.
	pub basename: String,
	pub class: ObjectClass,
	/// Colon-separated run-time search path, consulted before everything else.
	pub rpath: Option<String>,
	/// Colon-separated run-time search path, consulted after `rpath`.
	pub runpath: Option<String>,
	/// Declared shared-library dependencies, in declaration order.
	/// Duplicates are preserved.
	pub needed: Vec<String>,
	#[serde(default)]
	pub(crate) req_found: BTreeSet<ObjectId>,
	#[serde(default)]
	pub(crate) req_missing: BTreeSet<String>,
}

impl Object {
	pub fn new(dirname: &str, basename: impl Into<String>, class: ObjectClass) -> Object {
		Object {
			dirname: paths::normalize(dirname),
			basename: basename.into(),
			class,
			..Default::default()
		}
	}

	/// Full path of the object.
	pub fn path(&self) -> String {
		format!("{}/{}", self.dirname, self.basename)
	}

	/// Objects currently satisfying members of `needed`.
	pub fn found(&self) -> &BTreeSet<ObjectId> {
		&self.req_found
	}

	/// Needed names with no resolution.
	pub fn missing(&self) -> &BTreeSet<String> {
		&self.req_missing
	}

	pub fn is_broken(&self) -> bool {
		!self.req_missing.is_empty()
	}

	/// Expands `$ORIGIN` and `${ORIGIN}` in the search-path hints and
	/// normalizes the result. Called by loaders with the directory the
	/// object was read from.
	pub fn solve_paths(&mut self, origin: &str) {
		self.rpath = self.rpath.take().map(|list| replace_origin(&list, origin));
		self.runpath = self.runpath.take().map(|list| replace_origin(&list, origin));
	}
}

fn replace_origin(list: &str, origin: &str) -> String {
	let replaced = list.replace("${ORIGIN}", origin).replace("$ORIGIN", origin);
	paths::normalize_pathlist(&replaced)
}
