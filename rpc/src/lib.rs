//! HTTP API for the POAP attendance service.
//!
//! Provides endpoints for:
//! - Wallet-signature login and cookie/bearer sessions
//! - Account provisioning and role assignment (administrators)
//! - Class management and enrollment (lecturers)
//! - Marking and validating attendance, badge retries
//! - Per-class attendance listings and student statistics
//! - Prometheus metrics

pub mod error;
pub mod handlers;
pub mod metrics;
pub mod pagination;
pub mod server;
pub mod session;
pub mod state;

pub use error::RpcError;
pub use metrics::RpcMetrics;
pub use server::{router, RpcServer};
pub use session::{Session, SESSION_COOKIE};
pub use state::AppState;
