//! # depdb
//!
//! An in-memory, queryable database of installed packages and the
//! dynamically linked objects they contain.
//!
//! For every object the database tracks which of its declared shared-library
//! dependencies resolve to another object — honoring per-object `rpath`/
//! `runpath` hints, the trusted system directories and the configured extra
//! search paths — and which stay unresolved. The state is maintained
//! incrementally under [`install_package`](db::Database::install_package) and
//! [`delete_package`](db::Database::delete_package), and can be rebuilt from
//! scratch (optionally in parallel) with
//! [`relink_all`](db::Database::relink_all).
//!
//! On top of the link state, [`integrity::IntegrityChecker`] verifies that
//! each package's declared dependency closure actually pulls in every
//! library its objects need, and [`conflicts::find_file_conflicts`] reports
//! files shared between packages with no declared conflict relation.
//!
//! Reading package archives, parsing object headers and rendering reports
//! are external concerns: loaders hand fully populated [`Package`] values to
//! the database, and every diagnostic comes back as data.

pub mod config;
pub mod conflicts;
pub mod db;
pub mod error;
pub mod integrity;
mod jobs;
pub mod object;
pub mod package;
pub mod paths;
pub mod resolver;
pub mod vercmp;

pub use config::Config;
pub use conflicts::find_file_conflicts;
pub use db::{Database, ObjectId, PackageId, CURRENT_VERSION};
pub use error::{Error, Result};
pub use integrity::{Finding, IntegrityChecker};
pub use object::{Object, ObjectClass};
pub use package::{DepSpec, Package, VersionOp};
pub use resolver::{DependencyResolver, VersionCmp};
