//! The Identity Resolver: the only place roles are read and changed.

use std::sync::Arc;

use poap_store::{SharedIdentityStore, StoreError};
use poap_types::{AdminPermission, Clock, Identity, IdentityAddress, Role, RoleProfile, Timestamp};

use crate::IdentityError;

/// An account to provision.
#[derive(Clone, Debug)]
pub struct NewIdentity {
    pub address: IdentityAddress,
    pub name: String,
    pub profile: RoleProfile,
}

/// Self-service changes to display fields. `None` leaves a field as is.
#[derive(Clone, Debug, Default)]
pub struct ProfileUpdate {
    pub name: Option<String>,
    pub student_id: Option<String>,
    pub graduation_date: Option<Timestamp>,
    pub department: Option<String>,
    pub specialization: Option<String>,
}

pub struct IdentityResolver {
    store: SharedIdentityStore,
    clock: Arc<dyn Clock>,
}

impl IdentityResolver {
    pub fn new(store: SharedIdentityStore, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    pub fn resolve(&self, address: &IdentityAddress) -> Result<Identity, IdentityError> {
        self.store.get_identity(address).map_err(|e| match e {
            StoreError::NotFound(_) => IdentityError::NotFound(address.clone()),
            other => IdentityError::Store(other),
        })
    }

    pub fn role_of(&self, address: &IdentityAddress) -> Result<Role, IdentityError> {
        Ok(self.resolve(address)?.role())
    }

    /// Resolve `address` and require it to hold `role`.
    pub fn require_role(
        &self,
        address: &IdentityAddress,
        role: Role,
    ) -> Result<Identity, IdentityError> {
        let identity = self.resolve(address)?;
        if !identity.is(role) {
            return Err(IdentityError::Forbidden(format!(
                "{} is a {}, not a {}",
                address,
                identity.role(),
                role
            )));
        }
        Ok(identity)
    }

    /// Provision a new account. Admin only.
    pub fn create_identity(
        &self,
        admin: &IdentityAddress,
        new: NewIdentity,
    ) -> Result<Identity, IdentityError> {
        self.require_role(admin, Role::Admin)?;
        let name = validated_name(&new.name)?;
        let identity = Identity::new(new.address, name, new.profile, self.clock.now());

        self.store
            .insert_identity(&identity)
            .map_err(|e| match e {
                StoreError::Duplicate(_) => IdentityError::Conflict(format!(
                    "account {} already exists",
                    identity.address()
                )),
                other => IdentityError::Store(other),
            })?;

        tracing::info!(
            admin = %admin,
            address = %identity.address(),
            role = %identity.role(),
            "account created"
        );
        Ok(identity)
    }

    /// Replace an account's role. Admin only; an admin cannot demote itself.
    ///
    /// Changing role resets the role-specific profile fields. Assigning the
    /// role an account already holds leaves it untouched.
    pub fn assign_role(
        &self,
        admin: &IdentityAddress,
        target: &IdentityAddress,
        role: Role,
    ) -> Result<Identity, IdentityError> {
        self.require_role(admin, Role::Admin)?;
        if admin == target && role != Role::Admin {
            return Err(IdentityError::Forbidden(
                "administrators cannot demote themselves".into(),
            ));
        }

        let mut identity = self.resolve(target)?;
        if identity.is(role) {
            return Ok(identity);
        }
        let previous = identity.role();
        identity.profile = RoleProfile::empty(role);
        identity.header.updated_at = self.clock.now();
        self.store.put_identity(&identity)?;

        tracing::info!(admin = %admin, address = %target, from = %previous, to = %role, "role assigned");
        Ok(identity)
    }

    /// Remove an account. Admin only; an admin cannot delete itself.
    ///
    /// Whether classes or attendance still reference the account is for the
    /// caller to check first.
    pub fn delete_identity(
        &self,
        admin: &IdentityAddress,
        target: &IdentityAddress,
    ) -> Result<Identity, IdentityError> {
        self.require_role(admin, Role::Admin)?;
        if admin == target {
            return Err(IdentityError::Forbidden(
                "administrators cannot delete themselves".into(),
            ));
        }
        let identity = self.resolve(target)?;
        self.store.delete_identity(target).map_err(|e| match e {
            StoreError::NotFound(_) => IdentityError::NotFound(target.clone()),
            other => IdentityError::Store(other),
        })?;
        tracing::info!(admin = %admin, address = %target, role = %identity.role(), "account deleted");
        Ok(identity)
    }

    /// Every account. Admin only.
    pub fn list(&self, admin: &IdentityAddress) -> Result<Vec<Identity>, IdentityError> {
        self.require_role(admin, Role::Admin)?;
        Ok(self.store.iter_identities()?)
    }

    /// Update the caller's own display fields. Never changes the role; a
    /// field that does not belong to the caller's role is invalid input.
    pub fn update_profile(
        &self,
        address: &IdentityAddress,
        update: ProfileUpdate,
    ) -> Result<Identity, IdentityError> {
        let mut identity = self.resolve(address)?;

        if let Some(name) = update.name.as_deref() {
            identity.header.name = validated_name(name)?;
        }

        match &mut identity.profile {
            RoleProfile::Student {
                student_id,
                graduation_date,
            } => {
                reject_field(update.department.is_some(), "department", Role::Student)?;
                reject_field(update.specialization.is_some(), "specialization", Role::Student)?;
                if let Some(id) = update.student_id {
                    *student_id = id.trim().to_string();
                }
                if update.graduation_date.is_some() {
                    *graduation_date = update.graduation_date;
                }
            }
            RoleProfile::Lecturer {
                department,
                specialization,
            } => {
                reject_field(update.student_id.is_some(), "studentId", Role::Lecturer)?;
                reject_field(update.graduation_date.is_some(), "graduationDate", Role::Lecturer)?;
                if let Some(d) = update.department {
                    *department = d.trim().to_string();
                }
                if update.specialization.is_some() {
                    *specialization = update.specialization;
                }
            }
            RoleProfile::Admin { .. } => {
                let role_fields = update.student_id.is_some()
                    || update.graduation_date.is_some()
                    || update.department.is_some()
                    || update.specialization.is_some();
                reject_field(role_fields, "role-specific fields", Role::Admin)?;
            }
        }

        identity.header.updated_at = self.clock.now();
        self.store.put_identity(&identity)?;
        tracing::debug!(address = %address, "profile updated");
        Ok(identity)
    }

    /// Make sure a configured administrator exists. Creates the account on
    /// first start; an existing non-admin account is promoted.
    pub fn bootstrap_admin(
        &self,
        address: &IdentityAddress,
        name: &str,
    ) -> Result<Identity, IdentityError> {
        let profile = RoleProfile::Admin {
            permissions: AdminPermission::ALL.to_vec(),
            super_admin: true,
        };
        match self.resolve(address) {
            Ok(existing) if existing.is(Role::Admin) => Ok(existing),
            Ok(mut existing) => {
                tracing::warn!(address = %address, role = %existing.role(), "promoting configured administrator");
                existing.profile = profile;
                existing.header.updated_at = self.clock.now();
                self.store.put_identity(&existing)?;
                Ok(existing)
            }
            Err(IdentityError::NotFound(_)) => {
                let identity = Identity::new(
                    address.clone(),
                    validated_name(name)?,
                    profile,
                    self.clock.now(),
                );
                self.store.insert_identity(&identity)?;
                tracing::info!(address = %address, "bootstrapped administrator");
                Ok(identity)
            }
            Err(e) => Err(e),
        }
    }
}

fn validated_name(name: &str) -> Result<String, IdentityError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(IdentityError::InvalidInput("name is required".into()));
    }
    Ok(name.to_string())
}

fn reject_field(present: bool, field: &str, role: Role) -> Result<(), IdentityError> {
    if present {
        return Err(IdentityError::InvalidInput(format!(
            "{field} does not apply to a {role} profile"
        )));
    }
    Ok(())
}
