//! File-level conflict detection across package filelists.

use std::collections::BTreeMap;

use crate::db::Database;
use crate::integrity::Finding;
use crate::package::Package;
use crate::resolver::VersionCmp;

/// Finds files owned by two or more packages that do not already declare a
/// `conflicts` relation covering the overlap.
///
/// Two packages that conflict by declaration are expected to carry the same
/// files — only the remaining owners count, and a bucket reduced below two
/// is not reported. Buckets are visited in path order, so the output is
/// deterministic.
pub fn find_file_conflicts(db: &Database, vercmp: Option<VersionCmp>) -> Vec<Finding> {
	let mut owners: BTreeMap<&str, Vec<&Package>> = BTreeMap::new();
	for pkg in db.packages() {
		for file in &pkg.filelist {
			owners.entry(file.as_str()).or_default().push(pkg);
		}
	}

	let mut findings = Vec::new();
	for (path, pkgs) in owners {
		if pkgs.len() < 2 {
			continue;
		}
		let real: Vec<&Package> = pkgs
			.iter()
			.enumerate()
			.filter(|(i, a)| {
				!pkgs
					.iter()
					.enumerate()
					.any(|(j, b)| *i != j && a.conflicts_with(b, vercmp))
			})
			.map(|(_, &pkg)| pkg)
			.collect();
		if real.len() > 1 {
			findings.push(Finding::FileConflict {
				path: path.to_string(),
				packages: real.iter().map(|pkg| pkg.name.clone()).collect(),
			});
		}
	}
	findings
}
