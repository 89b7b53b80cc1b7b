//! Badge issuance for validated attendance.
//!
//! The workflow talks to a [`BadgeGateway`]. In production that is an
//! [`HttpBadgeGateway`] over an explicitly constructed [`MintClient`]; with no
//! issuer configured it is a [`DisabledBadgeGateway`]. Issuance never feeds
//! back into the attendance record beyond the returned reference.

pub mod client;
pub mod error;
pub mod gateway;

pub use client::MintClient;
pub use error::BadgeError;
pub use gateway::{
    BadgeGateway, BadgeReceipt, BadgeRequest, DisabledBadgeGateway, HttpBadgeGateway,
    SharedBadgeGateway, STUDENT_BADGE_ROLE,
};
