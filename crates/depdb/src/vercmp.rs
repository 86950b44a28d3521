//! A built-in package version comparator.
//!
//! The database core treats version comparison as a plug-in
//! ([`VersionCmp`](crate::resolver::VersionCmp)) and works name-only without
//! one. This module supplies a ready-made comparator for the common
//! `epoch:version` scheme: an optional numeric epoch dominates, then the
//! version strings are walked as alternating non-numeric and numeric
//! segments, with numeric segments compared as numbers.

use std::cmp::Ordering;

/// Compares two version strings. Usable directly as the `version_cmp`
/// plug-in in [`Config`](crate::config::Config).
pub fn vercmp(a: &str, b: &str) -> Ordering {
	let (a_epoch, a_version) = split_epoch(a);
	let (b_epoch, b_version) = split_epoch(b);
	match a_epoch.cmp(&b_epoch) {
		Ordering::Equal => cmp_segments(a_version, b_version),
		ord => ord,
	}
}

fn split_epoch(version: &str) -> (i64, &str) {
	match version.split_once(':') {
		Some((epoch, rest)) => (epoch.parse().unwrap_or(0), rest),
		None => (0, version),
	}
}

fn cmp_segments(a: &str, b: &str) -> Ordering {
	let mut lhs = ("", a);
	let mut rhs = ("", b);

	while !lhs.1.is_empty() && !rhs.1.is_empty() {
		lhs = take_until_digit(lhs.1);
		rhs = take_until_digit(rhs.1);
		match lhs.0.cmp(rhs.0) {
			Ordering::Equal => {}
			ord => return ord,
		}

		lhs = take_digits(lhs.1);
		rhs = take_digits(rhs.1);
		if !lhs.0.is_empty() && !rhs.0.is_empty() {
			match cmp_numeric(lhs.0, rhs.0) {
				Ordering::Equal => {}
				ord => return ord,
			}
		}
	}

	/* the longer version wins, e.g. 1.2 < 1.2.3 */
	lhs.1.len().cmp(&rhs.1.len())
}

fn take_until_digit(s: &str) -> (&str, &str) {
	let at = s.find(|c: char| c.is_ascii_digit()).unwrap_or(s.len());
	s.split_at(at)
}

fn take_digits(s: &str) -> (&str, &str) {
	let at = s.find(|c: char| !c.is_ascii_digit()).unwrap_or(s.len());
	s.split_at(at)
}

/* compared by trimmed length first so arbitrarily long components never overflow */
fn cmp_numeric(a: &str, b: &str) -> Ordering {
	let a = a.trim_start_matches('0');
	let b = b.trim_start_matches('0');
	match a.len().cmp(&b.len()) {
		Ordering::Equal => a.cmp(b),
		ord => ord,
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test] fn components_are_not_compared_lexically() { assert_eq!(vercmp("1.2.4.0", "1.2.10.0"), Ordering::Less) }
	#[test] fn shorter_version_is_less() { assert_eq!(vercmp("1.2", "1.2.3"), Ordering::Less) }
	#[test] fn identical_versions_are_equal() { assert_eq!(vercmp("1.2.3", "1.2.3"), Ordering::Equal) }
	#[test] fn higher_component_is_greater() { assert_eq!(vercmp("1.2.4", "1.2.3"), Ordering::Greater) }
	#[test] fn prefixed_versions_compare_numerically() { assert_eq!(vercmp("v1.2.3", "v1.2.4"), Ordering::Less) }
	#[test] fn prefixes_compare_lexically() { assert_eq!(vercmp("a1.2.3", "b1.2.3"), Ordering::Less) }
	#[test] fn trailing_letters_compare_lexically() { assert_eq!(vercmp("1.2a", "1.2b"), Ordering::Less) }
	#[test] fn epoch_dominates() { assert_eq!(vercmp("1:1.2", "2:v0.1"), Ordering::Less) }
	#[test] fn missing_epoch_is_zero() { assert_eq!(vercmp("0:5", "5"), Ordering::Equal) }
	#[test] fn leading_zeroes_are_insignificant() { assert_eq!(vercmp("1.02", "1.2"), Ordering::Equal) }
}
