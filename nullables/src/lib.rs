//! Nullable infrastructure for deterministic testing.
//!
//! Every external dependency of the service (clock, storage, badge issuer)
//! sits behind a trait. This crate provides implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod badge;
pub mod clock;
pub mod store;

pub use badge::NullBadgeGateway;
pub use clock::NullClock;
pub use store::NullStore;
