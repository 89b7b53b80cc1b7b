//! Enrollment Registry.
//!
//! Owns the class entity: who lectures it and who is enrolled. The enrolled
//! set is only changed through [`EnrollmentRegistry::enroll`] and
//! [`EnrollmentRegistry::unenroll`], both idempotent.

pub mod error;
pub mod registry;

pub use error::RegistryError;
pub use registry::{ClassUpdate, EnrollmentRegistry, NewClass, StudentDetails};
