//! Builders for the synthetic packages the integration tests install.

use depdb::object::{ELFCLASS32, ELFCLASS64, ELFDATA2LSB, ELFOSABI_NONE};
use depdb::{Database, DepSpec, Object, ObjectClass, Package};

/// A 64-bit little-endian SysV object.
pub fn obj64(dirname: &str, basename: &str, needed: &[&str]) -> Object {
	let mut obj = Object::new(dirname, basename, ObjectClass::new(ELFCLASS64, ELFDATA2LSB, ELFOSABI_NONE));
	obj.needed = needed.iter().map(|name| name.to_string()).collect();
	obj
}

/// The 32-bit variant of [`obj64`].
pub fn obj32(dirname: &str, basename: &str, needed: &[&str]) -> Object {
	let mut obj = obj64(dirname, basename, needed);
	obj.class = ObjectClass::new(ELFCLASS32, ELFDATA2LSB, ELFOSABI_NONE);
	obj
}

pub fn with_rpath(mut obj: Object, rpath: &str) -> Object {
	obj.rpath = Some(rpath.to_string());
	obj
}

pub fn with_runpath(mut obj: Object, runpath: &str) -> Object {
	obj.runpath = Some(runpath.to_string());
	obj
}

/// A package carrying only objects, no metadata.
pub fn package(name: &str, version: &str, objects: Vec<Object>) -> Package {
	let mut pkg = Package::new(name, version);
	pkg.objects = objects;
	pkg
}

/// Parses a metadata list from plain specifier strings.
pub fn specs(entries: &[&str]) -> Vec<DepSpec> {
	entries.iter().map(|entry| DepSpec::parse(entry)).collect()
}

/// `(object path, resolved paths, missing names)` for every object, in
/// installation order. Two databases with equal snapshots resolve
/// identically.
pub fn snapshot(db: &Database) -> Vec<(String, Vec<String>, Vec<String>)> {
	db.objects()
		.map(|(_, obj)| {
			let found = obj
				.found()
				.iter()
				.filter_map(|&id| db.object(id))
				.map(|lib| lib.path())
				.collect();
			let missing = obj.missing().iter().cloned().collect();
			(obj.path(), found, missing)
		})
		.collect()
}
