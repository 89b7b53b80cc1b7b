//! Class storage trait.

use std::collections::BTreeSet;

use crate::StoreError;
use poap_types::{ClassId, IdentityAddress, Timestamp};
use serde::{Deserialize, Serialize};

/// A class and its enrolled students.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassRecord {
    pub class_id: ClassId,
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Owning lecturer.
    pub lecturer: IdentityAddress,
    /// Enrolled students. A set, so each student appears at most once.
    pub students: BTreeSet<IdentityAddress>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl ClassRecord {
    pub fn new(
        class_id: ClassId,
        title: impl Into<String>,
        description: Option<String>,
        lecturer: IdentityAddress,
        now: Timestamp,
    ) -> Self {
        Self {
            class_id,
            title: title.into(),
            description,
            lecturer,
            students: BTreeSet::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, address: &IdentityAddress) -> bool {
        self.lecturer == *address
    }

    pub fn has_student(&self, address: &IdentityAddress) -> bool {
        self.students.contains(address)
    }
}

/// Trait for class storage operations.
///
/// The enrolled-student set is only mutated through [`ClassStore::add_student`]
/// and [`ClassStore::remove_student`], each an atomic read-modify-write.
pub trait ClassStore {
    fn get_class(&self, class_id: &ClassId) -> Result<ClassRecord, StoreError>;

    /// Insert a new class. Fails with [`StoreError::Duplicate`] if the id exists.
    fn insert_class(&self, record: &ClassRecord) -> Result<(), StoreError>;

    /// Replace title and description, leaving owner and students untouched.
    fn update_details(
        &self,
        class_id: &ClassId,
        title: &str,
        description: Option<String>,
        now: Timestamp,
    ) -> Result<ClassRecord, StoreError>;

    /// Remove a class. Fails with [`StoreError::NotFound`] if absent.
    fn delete_class(&self, class_id: &ClassId) -> Result<(), StoreError>;

    /// Add a student to the class. Returns `false` if already enrolled.
    fn add_student(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    /// Remove a student from the class. Returns `false` if not enrolled.
    fn remove_student(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
        now: Timestamp,
    ) -> Result<bool, StoreError>;

    fn iter_classes(&self) -> Result<Vec<ClassRecord>, StoreError>;
}
