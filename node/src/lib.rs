//! Attendance node: wires storage, identity, enrollment, attendance and
//! badge issuance together behind the HTTP API.
//!
//! The node:
//! - Opens (and migrates) the LMDB environment
//! - Provisions configured administrators
//! - Connects the badge mint client when an issuer is configured
//! - Serves the API until SIGINT/SIGTERM

pub mod config;
pub mod error;
pub mod logging;
pub mod node;
pub mod shutdown;

pub use config::{AdminEntry, NodeConfig};
pub use error::NodeError;
pub use logging::{init_logging, LogFormat};
pub use node::AttendanceNode;
pub use shutdown::ShutdownController;
