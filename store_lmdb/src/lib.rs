//! LMDB storage backend for the POAP attendance service.
//!
//! Implements all storage traits from `poap-store` using the `heed` LMDB bindings.
//! Each logical store maps to one or more LMDB databases within a single environment.
//! LMDB admits one write transaction at a time, so any check-and-write done
//! inside a single write transaction is atomic with respect to every other writer.

pub mod attendance;
pub mod class;
pub mod environment;
pub mod error;
pub mod identity;
pub mod integrity;
pub mod keys;
pub mod meta;
pub mod migration;

pub use attendance::LmdbAttendanceStore;
pub use class::LmdbClassStore;
pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use identity::LmdbIdentityStore;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
