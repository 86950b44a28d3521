//! Rebuilding the resolution state of every object from scratch.

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use crate::config::Config;
use crate::jobs;

use super::{Database, ObjectId};

type Partial = Vec<(ObjectId, BTreeSet<ObjectId>, BTreeSet<String>)>;

impl Database {
	/// Recomputes `found`/`missing` for every object, replacing the old
	/// sets wholesale. The incremental install/delete bookkeeping keeps the
	/// same state; this is the recovery path after rule or path edits, and
	/// the verification path for everything else.
	///
	/// Small databases relink serially; past the size threshold the work is
	/// split into contiguous package slices across `min(ncpus, max_jobs)`
	/// workers whose partial results a single merger installs afterwards.
	pub fn relink_all(&mut self, config: &Config) {
		if self.packages.is_empty() {
			return;
		}
		if config.max_jobs != 1 && jobs::ncpus() > 1 &&
		   self.packages.len() > 100 && self.objects.len() >= 300
		{
			return self.relink_all_parallel(config);
		}

		let mut progress = jobs::Progress::new("relinking", self.packages.len(), config.quiet);
		progress.update(0, 1);
		for at in 0..self.packages.len() {
			let Some(id) = self.packages[at].id else { continue };
			for idx in 0..self.packages[at].objects.len() {
				let oid = ObjectId { pkg: id, idx: idx as u32 };
				let (found, missing) = self.link_object_sets(oid);
				if let Some(obj) = self.object_mut(oid) {
					obj.req_found = found;
					obj.req_missing = missing;
				}
			}
			progress.update(at + 1, 1);
		}
	}

	fn relink_all_parallel(&mut self, config: &Config) {
		let slices = jobs::partition(self.packages.len(), jobs::thread_count(config.max_jobs));
		let workers = slices.len();
		let total = self.packages.len();
		let counter = AtomicUsize::new(0);

		log::debug!("relinking {} packages across {} workers", total, workers);

		let db = &*self;
		let partials: Vec<Partial> = std::thread::scope(|scope| {
			let counter = &counter;
			let handles: Vec<_> = slices
				.into_iter()
				.map(|slice| {
					scope.spawn(move || {
						let mut partial = Partial::new();
						for at in slice {
							let pkg = &db.packages[at];
							let Some(id) = pkg.id else { continue };
							for idx in 0..pkg.objects.len() {
								let oid = ObjectId { pkg: id, idx: idx as u32 };
								let (found, missing) = db.link_object_sets(oid);
								partial.push((oid, found, missing));
							}
							counter.fetch_add(1, Ordering::Relaxed);
						}
						partial
					})
				})
				.collect();

			if !config.quiet {
				let mut progress = jobs::Progress::new("relinking", total, config.quiet);
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
				.map(|handle| handle.join().expect("relink worker panicked"))
				.collect()
		});

		/* single writer; merge order is the partition order */
		for partial in partials {
			for (oid, found, missing) in partial {
				if let Some(obj) = self.object_mut(oid) {
					obj.req_found = found;
					obj.req_missing = missing;
				}
			}
		}
	}
}
