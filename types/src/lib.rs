//! Fundamental types for the POAP attendance service.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! identity addresses, roles and the identity sum type, class identifiers,
//! timestamps and calendar days, attendance identifiers, and badge references.

pub mod address;
pub mod attendance;
pub mod class;
pub mod error;
pub mod identity;
pub mod keys;
pub mod role;
pub mod time;

pub use address::IdentityAddress;
pub use attendance::{AttendanceId, BadgeRef};
pub use class::ClassId;
pub use error::TypeError;
pub use identity::{AdminPermission, Identity, IdentityHeader, RoleProfile};
pub use keys::{KeyPair, PrivateKey, PublicKey, Signature};
pub use role::Role;
pub use time::{Clock, DayIndex, SystemClock, Timestamp, SECS_PER_DAY};
