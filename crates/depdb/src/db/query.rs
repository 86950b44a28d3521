//! Read-only views over the resolution state.
//!
//! These are the artifact streams external formatters consume; nothing here
//! writes to the database.

use crate::object::Object;
use crate::package::Package;

use super::{Database, ObjectId};

impl Database {
	/// Every installed object with its address, in installation order.
	pub fn objects(&self) -> impl Iterator<Item = (ObjectId, &Object)> {
		self.objects.iter().filter_map(move |&oid| self.object(oid).map(|obj| (oid, obj)))
	}

	/// Raw index entries, including any that no longer resolve.
	pub(crate) fn object_ids(&self) -> impl Iterator<Item = ObjectId> + '_ {
		self.objects.iter().copied()
	}

	/// `(object, unresolved name)` pairs across the database.
	pub fn missing_entries(&self) -> impl Iterator<Item = (&Object, &str)> {
		self.objects()
			.flat_map(|(_, obj)| obj.missing().iter().map(move |name| (obj, name.as_str())))
	}

	/// `(object, resolving object)` pairs across the database.
	pub fn found_entries(&self) -> impl Iterator<Item = (&Object, &Object)> {
		self.objects().flat_map(move |(_, obj)| {
			obj.found()
				.iter()
				.filter_map(move |&rid| self.object(rid).map(|lib| (obj, lib)))
		})
	}

	/// Objects with at least one unresolved need.
	pub fn broken_objects(&self) -> impl Iterator<Item = &Object> {
		self.objects().map(|(_, obj)| obj).filter(|obj| obj.is_broken())
	}

	/// Packages owning at least one broken object.
	pub fn broken_packages(&self) -> impl Iterator<Item = &Package> {
		self.packages.iter().filter(|pkg| pkg.is_broken())
	}
}

pub struct BrokenPackages<'a, I>
where
	I: Iterator<Item = &'a Package>,
{
	underlying: I,
}

impl<'a, I> Iterator for BrokenPackages<'a, I>
where
	I: Iterator<Item = &'a Package>,
{
	type Item = I::Item;

	fn next(&mut self) -> Option<Self::Item> {
		self.underlying.by_ref().find(|pkg| pkg.is_broken())
	}
}

pub trait BrokenPackagesExt<'a>: Iterator<Item = &'a Package> {
	/// Filters the iterator to packages with unresolved objects.
	fn broken(self) -> BrokenPackages<'a, Self>
	where
		Self: Sized,
	{
		BrokenPackages { underlying: self }
	}
}

impl<'a, I: Iterator<Item = &'a Package>> BrokenPackagesExt<'a> for I {}

pub struct InGroup<'a, I>
where
	I: Iterator<Item = &'a Package>,
{
	group: String,
	underlying: I,
}

impl<'a, I> Iterator for InGroup<'a, I>
where
	I: Iterator<Item = &'a Package>,
{
	type Item = I::Item;

	fn next(&mut self) -> Option<Self::Item> {
		self.underlying.by_ref().find(|pkg| pkg.groups.contains(&self.group))
	}
}

pub trait InGroupExt<'a>: Iterator<Item = &'a Package> {
	/// Filters the iterator to members of `group`.
	fn in_group(self, group: impl Into<String>) -> InGroup<'a, Self>
	where
		Self: Sized,
	{
		InGroup { group: group.into(), underlying: self }
	}
}

impl<'a, I: Iterator<Item = &'a Package>> InGroupExt<'a> for I {}
