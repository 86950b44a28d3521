//! Read-only query surface: streams, filters and bookkeeping views.

use depdb::db::{BrokenPackagesExt, InGroupExt};
use depdb::{Database, CURRENT_VERSION};
use depdb_test_utils::*;

#[test]
fn fresh_databases_carry_the_current_version_tag() {
	let db = Database::new("fresh");
	assert_eq!(db.loaded_version(), CURRENT_VERSION);
	assert!(db.empty());
	assert!(!db.has_package_depends());
	assert!(!db.has_groups());
}

#[test]
fn summary_flags_are_sticky_hints() {
	let mut db = Database::new("test");
	let mut pkg = package("P", "1.0", vec![]);
	pkg.depends = specs(&["glibc"]);
	pkg.groups.insert("base".to_string());
	db.install_package(pkg).unwrap();
	assert!(db.has_package_depends());
	assert!(db.has_groups());
	/* hints stay set after the package goes away */
	db.delete_package("P");
	assert!(db.has_package_depends());
	assert!(db.has_groups());
}

#[test]
fn iterator_extensions_filter_packages() {
	let mut db = Database::new("test");
	let mut base = package("base", "1.0", vec![obj64("/usr/lib", "libA.so", &[])]);
	base.groups.insert("core".to_string());
	db.install_package(base).unwrap();
	db.install_package(package("leaf", "1.0", vec![obj64("/usr/bin", "app", &["libmissing.so"])])).unwrap();

	let in_core: Vec<_> = db.packages().iter().in_group("core").map(|pkg| pkg.name.as_str()).collect();
	assert_eq!(in_core, ["base"]);

	let broken: Vec<_> = db.packages().iter().broken().map(|pkg| pkg.name.as_str()).collect();
	assert_eq!(broken, ["leaf"]);
}

#[test]
fn artifact_streams_expose_both_directions() {
	let mut db = Database::new("test");
	db.ld_prepend("/usr/lib");
	db.install_package(package("P", "1.0", vec![
		obj64("/usr/lib", "libA.so", &[]),
		obj64("/usr/bin", "app", &["libA.so", "libmissing.so"]),
	])).unwrap();
	assert_eq!(db.object_count(), 2);

	let missing: Vec<_> = db.missing_entries().map(|(obj, name)| (obj.path(), name.to_string())).collect();
	assert_eq!(missing, [("/usr/bin/app".to_string(), "libmissing.so".to_string())]);

	let found: Vec<_> = db.found_entries().map(|(obj, lib)| (obj.path(), lib.path())).collect();
	assert_eq!(found, [("/usr/bin/app".to_string(), "/usr/lib/libA.so".to_string())]);
}

#[test]
fn fix_paths_renormalizes_search_hints() {
	let mut db = Database::new("test");
	let mut app = obj64("/usr/bin", "app", &["libA.so"]);
	/* as if loaded from a dump recorded before normalization applied */
	app.rpath = Some("/opt//lib/".to_string());
	db.install_package(package("P", "1.0", vec![
		obj64("/opt/lib", "libA.so", &[]),
		app,
	])).unwrap();
	/* the mangled rpath component matches nothing */
	assert_eq!(db.missing_entries().count(), 1);

	db.fix_paths();
	let app = db.objects().map(|(_, obj)| obj).find(|obj| obj.basename == "app").unwrap();
	assert_eq!(app.rpath.as_deref(), Some("/opt/lib"));
	db.relink_all(&depdb::Config { max_jobs: 1, quiet: true, ..Default::default() });
	db.check_consistency().unwrap();
	assert!(db.missing_entries().next().is_none());
}
