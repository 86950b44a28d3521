pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised across the library boundary.
///
/// An unresolved shared-library dependency is *not* an error; it is recorded
/// in the owning object's missing set and surfaced through the query streams.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	/// The package was rejected before any mutation took place.
	#[error("invalid package: {0}")]
	InvalidPackage(String),
	/// The database contradicts one of its own invariants. Indicates a bug.
	#[error("internal invariant violation: {0}")]
	InvariantViolation(String),
}
