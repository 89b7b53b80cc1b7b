//! Abstract storage traits for the POAP attendance service.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. The rest of the codebase depends only on the traits, shared as
//! `Arc<dyn Trait + Send + Sync>` handles.

pub mod attendance;
pub mod class;
pub mod error;
pub mod identity;
pub mod meta;

use std::sync::Arc;

pub use attendance::{AttendanceRecord, AttendanceStore, BadgeClaim, CommitOutcome};
pub use class::{ClassRecord, ClassStore};
pub use error::StoreError;
pub use identity::IdentityStore;
pub use meta::MetaStore;

pub type SharedIdentityStore = Arc<dyn IdentityStore + Send + Sync>;
pub type SharedClassStore = Arc<dyn ClassStore + Send + Sync>;
pub type SharedAttendanceStore = Arc<dyn AttendanceStore + Send + Sync>;
