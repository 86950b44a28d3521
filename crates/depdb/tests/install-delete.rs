//! Incremental install/delete behavior of the link-resolution state.

use depdb::Database;
use depdb_test_utils::*;

fn find_object<'db>(db: &'db Database, basename: &str) -> &'db depdb::Object {
	db.objects()
		.map(|(_, obj)| obj)
		.find(|obj| obj.basename == basename)
		.expect("object should be installed")
}

#[test]
fn package_resolves_its_own_objects() {
	let mut db = Database::new("test");
	db.install_package(package("P", "1.0", vec![
		obj64("/usr/lib", "libA.so", &[]),
		with_rpath(obj64("/usr/bin", "app", &["libA.so"]), "/usr/lib"),
	])).unwrap();
	db.check_consistency().unwrap();

	let app = find_object(&db, "app");
	assert!(app.missing().is_empty());
	let found: Vec<_> = db.found_entries().map(|(obj, lib)| (obj.path(), lib.path())).collect();
	assert_eq!(found, [("/usr/bin/app".to_string(), "/usr/lib/libA.so".to_string())]);

	assert!(db.delete_package("P"));
	db.check_consistency().unwrap();
	assert!(db.empty());
}

#[test]
fn deleting_the_provider_breaks_the_consumer() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.install_package(package("P", "1.0", vec![obj64("/usr/lib", "libA.so", &[])])).unwrap();
	db.install_package(package("Q", "1.0", vec![obj64("/usr/bin", "app", &["libA.so"])])).unwrap();
	db.check_consistency().unwrap();

	assert!(find_object(&db, "app").missing().is_empty());

	assert!(db.delete_package("P"));
	db.check_consistency().unwrap();
	let app = find_object(&db, "app");
	assert!(app.found().is_empty());
	assert_eq!(app.missing().iter().collect::<Vec<_>>(), ["libA.so"]);
	assert_eq!(db.broken_objects().count(), 1);
	assert_eq!(db.broken_packages().next().map(|pkg| pkg.name.as_str()), Some("Q"));
}

#[test]
fn installing_the_provider_fixes_the_consumer() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.install_package(package("Q", "1.0", vec![obj64("/usr/bin", "app", &["libA.so"])])).unwrap();
	db.check_consistency().unwrap();
	assert!(find_object(&db, "app").is_broken());

	db.install_package(package("P", "1.0", vec![obj64("/usr/lib", "libA.so", &[])])).unwrap();
	db.check_consistency().unwrap();
	let app = find_object(&db, "app");
	assert!(!app.is_broken());
	assert_eq!(app.found().len(), 1);
}

#[test]
fn class_mismatch_is_not_a_resolution() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.install_package(package("P", "1.0", vec![obj64("/usr/lib", "libA.so", &[])])).unwrap();
	db.install_package(package("Q", "1.0", vec![obj32("/usr/bin", "app", &["libA.so"])])).unwrap();
	db.check_consistency().unwrap();

	let app = find_object(&db, "app");
	assert!(app.found().is_empty());
	assert_eq!(app.missing().iter().collect::<Vec<_>>(), ["libA.so"]);
}

#[test]
fn assumed_names_are_neither_found_nor_missing() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.assume_found("libA.so");
	db.install_package(package("Q", "1.0", vec![obj32("/usr/bin", "app", &["libA.so"])])).unwrap();
	db.check_consistency().unwrap();

	let app = find_object(&db, "app");
	assert!(app.found().is_empty());
	assert!(app.missing().is_empty());
}

#[test]
fn assumed_names_stay_out_after_provider_deletion() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.install_package(package("P", "1.0", vec![obj64("/usr/lib", "libA.so", &[])])).unwrap();
	db.install_package(package("Q", "1.0", vec![obj64("/usr/bin", "app", &["libA.so"])])).unwrap();
	db.assume_found("libA.so");
	assert!(db.delete_package("P"));
	db.check_consistency().unwrap();

	let app = find_object(&db, "app");
	assert!(app.found().is_empty());
	assert!(app.missing().is_empty());
}

#[test]
fn trusted_paths_need_no_configuration() {
	let mut db = Database::new("test");
	db.install_package(package("P", "1.0", vec![
		obj64("/lib", "libA.so", &[]),
		obj64("/usr/lib", "libB.so", &[]),
	])).unwrap();
	db.install_package(package("Q", "1.0", vec![
		obj64("/opt/bin", "app", &["libA.so", "libB.so"]),
	])).unwrap();
	db.check_consistency().unwrap();

	let app = find_object(&db, "app");
	assert!(app.missing().is_empty());
	assert_eq!(app.found().len(), 2);
}

#[test]
fn per_package_paths_apply_to_that_package_only() {
	let mut db = Database::new("test");
	db.pkg_ld_insert("Q", "/opt/vendor/lib", 0);
	db.install_package(package("P", "1.0", vec![obj64("/opt/vendor/lib", "libA.so", &[])])).unwrap();
	db.install_package(package("Q", "1.0", vec![obj64("/usr/bin", "app", &["libA.so"])])).unwrap();
	db.install_package(package("R", "1.0", vec![obj64("/usr/bin", "other", &["libA.so"])])).unwrap();
	db.check_consistency().unwrap();

	assert!(!find_object(&db, "app").is_broken());
	assert!(find_object(&db, "other").is_broken());
}

#[test]
fn ignored_files_carry_no_resolution_state() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.ignore_file("/usr/bin/app");
	db.install_package(package("P", "1.0", vec![obj64("/usr/lib", "libA.so", &[])])).unwrap();
	db.install_package(package("Q", "1.0", vec![obj64("/usr/bin", "app", &["libA.so", "libZ.so"])])).unwrap();
	db.check_consistency().unwrap();

	let app = find_object(&db, "app");
	assert!(app.found().is_empty());
	assert!(app.missing().is_empty());
}

#[test]
fn reinstalling_is_idempotent() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.install_package(package("P", "1.0", vec![obj64("/usr/lib", "libA.so", &[])])).unwrap();
	db.install_package(package("Q", "1.0", vec![obj64("/usr/bin", "app", &["libA.so"])])).unwrap();
	let before = snapshot(&db);

	db.install_package(package("Q", "1.0", vec![obj64("/usr/bin", "app", &["libA.so"])])).unwrap();
	db.check_consistency().unwrap();
	/* the package moves to the end of the iteration order, but resolves identically */
	let mut after = snapshot(&db);
	after.sort();
	let mut before_sorted = before;
	before_sorted.sort();
	assert_eq!(before_sorted, after);
	assert_eq!(db.packages().len(), 2);
}

#[test]
fn install_then_delete_restores_prior_state() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.install_package(package("P", "1.0", vec![obj64("/usr/lib", "libA.so", &[])])).unwrap();
	db.install_package(package("Q", "1.0", vec![
		obj64("/usr/bin", "app", &["libA.so", "libB.so"]),
	])).unwrap();
	let before = snapshot(&db);

	/* R satisfies app's missing libB.so while installed */
	db.install_package(package("R", "1.0", vec![obj64("/usr/lib", "libB.so", &["libA.so"])])).unwrap();
	db.check_consistency().unwrap();
	assert!(!find_object(&db, "app").is_broken());

	assert!(db.delete_package("R"));
	db.check_consistency().unwrap();
	assert_eq!(snapshot(&db), before);
}

#[test]
fn replacement_is_resolved_among_survivors() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.ld_append("/opt/lib");
	db.install_package(package("P", "1.0", vec![obj64("/usr/lib", "libA.so", &[])])).unwrap();
	db.install_package(package("R", "1.0", vec![obj64("/opt/lib", "libA.so", &[])])).unwrap();
	db.install_package(package("Q", "1.0", vec![obj64("/usr/bin", "app", &["libA.so"])])).unwrap();
	db.check_consistency().unwrap();

	/* first match sits in P; deleting P falls through to R's copy */
	assert!(db.delete_package("P"));
	db.check_consistency().unwrap();
	let app = find_object(&db, "app");
	assert!(app.missing().is_empty());
	let found: Vec<_> = db.found_entries().map(|(_, lib)| lib.path()).collect();
	assert_eq!(found, ["/opt/lib/libA.so".to_string()]);
}

#[test]
fn wipe_clears_packages_but_keeps_rules() {
	let mut db = Database::new("test");
	db.ld_append("/usr/lib");
	db.assume_found("libc.so.6");
	db.install_package(package("P", "1.0", vec![obj64("/usr/lib", "libA.so", &[])])).unwrap();
	assert!(db.wipe_packages());
	assert!(!db.wipe_packages());
	assert!(db.empty());
	assert_eq!(db.library_path(), ["/usr/lib"]);
	assert_eq!(db.assume_found_rules().count(), 1);
}

#[test]
fn filelist_wipe_clears_the_hint() {
	let mut db = Database::new("test");
	let mut pkg = package("P", "1.0", vec![]);
	pkg.filelist.push("/etc/p.conf".to_string());
	db.install_package(pkg).unwrap();
	assert!(db.has_filelists());
	assert!(db.wipe_filelists());
	assert!(!db.has_filelists());
	assert!(db.find_pkg("P").unwrap().filelist.is_empty());
	assert!(!db.wipe_filelists());
}
