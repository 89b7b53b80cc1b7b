//! Identity records: a shared header plus a role-specific profile.
//!
//! The role is never stored separately from the profile. It is always
//! derived from which [`RoleProfile`] variant an identity carries, so
//! student-only fields cannot appear on a lecturer and vice versa.

use serde::{Deserialize, Serialize};

use crate::{IdentityAddress, Role, Timestamp};

/// Fields every identity carries regardless of role.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityHeader {
    pub address: IdentityAddress,
    pub name: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Administrative capabilities an admin account may hold.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminPermission {
    ManageUsers,
    ManageLecturers,
    ManageClasses,
    ViewReports,
    ManageContract,
}

impl AdminPermission {
    pub const ALL: [AdminPermission; 5] = [
        AdminPermission::ManageUsers,
        AdminPermission::ManageLecturers,
        AdminPermission::ManageClasses,
        AdminPermission::ViewReports,
        AdminPermission::ManageContract,
    ];
}

/// Role-specific data.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoleProfile {
    Student {
        student_id: String,
        graduation_date: Option<Timestamp>,
    },
    Lecturer {
        department: String,
        specialization: Option<String>,
    },
    Admin {
        permissions: Vec<AdminPermission>,
        super_admin: bool,
    },
}

impl RoleProfile {
    pub fn role(&self) -> Role {
        match self {
            RoleProfile::Student { .. } => Role::Student,
            RoleProfile::Lecturer { .. } => Role::Lecturer,
            RoleProfile::Admin { .. } => Role::Admin,
        }
    }

    /// A profile for `role` with empty role-specific fields.
    pub fn empty(role: Role) -> Self {
        match role {
            Role::Student => RoleProfile::Student {
                student_id: String::new(),
                graduation_date: None,
            },
            Role::Lecturer => RoleProfile::Lecturer {
                department: String::new(),
                specialization: None,
            },
            Role::Admin => RoleProfile::Admin {
                permissions: Vec::new(),
                super_admin: false,
            },
        }
    }
}

/// A registered account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub header: IdentityHeader,
    pub profile: RoleProfile,
}

impl Identity {
    pub fn new(
        address: IdentityAddress,
        name: impl Into<String>,
        profile: RoleProfile,
        now: Timestamp,
    ) -> Self {
        Self {
            header: IdentityHeader {
                address,
                name: name.into(),
                created_at: now,
                updated_at: now,
            },
            profile,
        }
    }

    pub fn address(&self) -> &IdentityAddress {
        &self.header.address
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn role(&self) -> Role {
        self.profile.role()
    }

    pub fn is(&self, role: Role) -> bool {
        self.role() == role
    }
}
