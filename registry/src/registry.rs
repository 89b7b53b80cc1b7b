use std::sync::Arc;

use poap_identity::{IdentityError, IdentityResolver, ProfileUpdate};
use poap_store::{ClassRecord, SharedClassStore, StoreError};
use poap_types::{ClassId, Clock, Identity, IdentityAddress, Role};

use crate::RegistryError;

/// Maximum length of a class title.
pub const MAX_TITLE_LEN: usize = 200;

/// Fields of a class being created.
#[derive(Clone, Debug)]
pub struct NewClass {
    pub class_id: ClassId,
    pub title: String,
    pub description: Option<String>,
}

/// Changes to a class's descriptive fields. `None` leaves a field as is;
/// an empty description clears it.
#[derive(Clone, Debug, Default)]
pub struct ClassUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
}

/// Details a lecturer may correct for a student enrolled in their class.
#[derive(Clone, Debug, Default)]
pub struct StudentDetails {
    pub name: Option<String>,
    pub student_id: Option<String>,
}

pub struct EnrollmentRegistry {
    classes: SharedClassStore,
    identities: Arc<IdentityResolver>,
    clock: Arc<dyn Clock>,
}

impl EnrollmentRegistry {
    pub fn new(
        classes: SharedClassStore,
        identities: Arc<IdentityResolver>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            classes,
            identities,
            clock,
        }
    }

    /// Create a class owned by `lecturer`, who must hold the lecturer role.
    pub fn create_class(
        &self,
        lecturer: &IdentityAddress,
        class: NewClass,
    ) -> Result<ClassRecord, RegistryError> {
        self.identities.require_role(lecturer, Role::Lecturer)?;
        self.insert(lecturer, class)
    }

    /// An administrator creates a class on a lecturer's behalf.
    pub fn provision_class(
        &self,
        admin: &IdentityAddress,
        lecturer: &IdentityAddress,
        class: NewClass,
    ) -> Result<ClassRecord, RegistryError> {
        self.identities.require_role(admin, Role::Admin)?;
        self.identities
            .require_role(lecturer, Role::Lecturer)
            .map_err(|e| match e {
                IdentityError::Forbidden(_) => RegistryError::Forbidden(format!(
                    "{lecturer} does not hold the lecturer role"
                )),
                other => other.into(),
            })?;
        self.insert(lecturer, class)
    }

    fn insert(
        &self,
        lecturer: &IdentityAddress,
        class: NewClass,
    ) -> Result<ClassRecord, RegistryError> {
        let title = validated_title(&class.title)?;
        let description = class.description.as_deref().and_then(cleaned_description);

        let record = ClassRecord::new(
            class.class_id,
            title,
            description,
            lecturer.clone(),
            self.clock.now(),
        );
        self.classes.insert_class(&record).map_err(|e| match e {
            StoreError::Duplicate(_) => {
                RegistryError::Conflict(format!("class {} already exists", record.class_id))
            }
            other => other.into(),
        })?;

        tracing::info!(class_id = %record.class_id, lecturer = %lecturer, "class created");
        Ok(record)
    }

    pub fn get_class(&self, class_id: &ClassId) -> Result<ClassRecord, RegistryError> {
        Ok(self.classes.get_class(class_id)?)
    }

    /// Change a class's title or description. Owner only.
    pub fn update_class(
        &self,
        class_id: &ClassId,
        lecturer: &IdentityAddress,
        update: ClassUpdate,
    ) -> Result<ClassRecord, RegistryError> {
        let class = self.owned_class(class_id, lecturer)?;
        let title = match update.title.as_deref() {
            Some(title) => validated_title(title)?,
            None => class.title,
        };
        let description = match update.description.as_deref() {
            Some(description) => cleaned_description(description),
            None => class.description,
        };
        let updated = self
            .classes
            .update_details(class_id, &title, description, self.clock.now())?;
        tracing::info!(class_id = %class_id, lecturer = %lecturer, "class updated");
        Ok(updated)
    }

    /// Delete a class. Owner only. Callers that keep attendance for the
    /// class must refuse before getting here.
    pub fn delete_class(
        &self,
        class_id: &ClassId,
        lecturer: &IdentityAddress,
    ) -> Result<ClassRecord, RegistryError> {
        let class = self.owned_class(class_id, lecturer)?;
        self.classes.delete_class(class_id)?;
        tracing::info!(class_id = %class_id, lecturer = %lecturer, "class deleted");
        Ok(class)
    }

    /// Correct the name or student id of a student enrolled in the
    /// lecturer's class.
    pub fn edit_student(
        &self,
        class_id: &ClassId,
        lecturer: &IdentityAddress,
        student: &IdentityAddress,
        details: StudentDetails,
    ) -> Result<Identity, RegistryError> {
        let class = self.owned_class(class_id, lecturer)?;
        if !class.has_student(student) {
            return Err(RegistryError::NotFound(format!(
                "{student} is not enrolled in class {class_id}"
            )));
        }
        match self.identities.resolve(student) {
            Ok(identity) if identity.is(Role::Student) => {}
            Ok(_) | Err(IdentityError::NotFound(_)) => {
                return Err(RegistryError::NotFound(format!(
                    "no student account for {student}"
                )));
            }
            Err(e) => return Err(e.into()),
        }
        let identity = self.identities.update_profile(
            student,
            ProfileUpdate {
                name: details.name,
                student_id: details.student_id,
                ..Default::default()
            },
        )?;
        tracing::info!(class_id = %class_id, lecturer = %lecturer, student = %student, "student details edited");
        Ok(identity)
    }

    /// Whether any class names `address` as its lecturer or a student.
    pub fn references_account(&self, address: &IdentityAddress) -> Result<bool, RegistryError> {
        Ok(self
            .classes
            .iter_classes()?
            .iter()
            .any(|c| c.is_owned_by(address) || c.has_student(address)))
    }

    /// Load a class and require `caller` to be its lecturer.
    pub fn owned_class(
        &self,
        class_id: &ClassId,
        caller: &IdentityAddress,
    ) -> Result<ClassRecord, RegistryError> {
        let class = self.get_class(class_id)?;
        if !class.is_owned_by(caller) {
            return Err(RegistryError::Forbidden(format!(
                "{caller} does not lecture class {class_id}"
            )));
        }
        Ok(class)
    }

    /// Enroll a student. Re-enrolling is a successful no-op; the return value
    /// says whether the set changed.
    pub fn enroll(
        &self,
        class_id: &ClassId,
        lecturer: &IdentityAddress,
        student: &IdentityAddress,
    ) -> Result<bool, RegistryError> {
        self.owned_class(class_id, lecturer)?;
        match self.identities.resolve(student) {
            Ok(identity) if identity.is(Role::Student) => {}
            Ok(_) | Err(IdentityError::NotFound(_)) => {
                return Err(RegistryError::NotFound(format!(
                    "no student account for {student}"
                )));
            }
            Err(e) => return Err(e.into()),
        }

        let added = self
            .classes
            .add_student(class_id, student, self.clock.now())?;
        if added {
            tracing::info!(class_id = %class_id, student = %student, "student enrolled");
        }
        Ok(added)
    }

    /// Remove a student. Removing a student who is not enrolled is a no-op.
    pub fn unenroll(
        &self,
        class_id: &ClassId,
        lecturer: &IdentityAddress,
        student: &IdentityAddress,
    ) -> Result<bool, RegistryError> {
        self.owned_class(class_id, lecturer)?;
        let removed = self
            .classes
            .remove_student(class_id, student, self.clock.now())?;
        if removed {
            tracing::info!(class_id = %class_id, student = %student, "student unenrolled");
        }
        Ok(removed)
    }

    /// False when the class does not exist.
    pub fn is_enrolled(
        &self,
        class_id: &ClassId,
        student: &IdentityAddress,
    ) -> Result<bool, RegistryError> {
        match self.classes.get_class(class_id) {
            Ok(class) => Ok(class.has_student(student)),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// False when the class does not exist.
    pub fn is_owner(
        &self,
        class_id: &ClassId,
        identity: &IdentityAddress,
    ) -> Result<bool, RegistryError> {
        match self.classes.get_class(class_id) {
            Ok(class) => Ok(class.is_owned_by(identity)),
            Err(StoreError::NotFound(_)) => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    /// Classes relevant to `identity`: owned ones for a lecturer, enrolled
    /// ones for a student, all of them for an administrator.
    pub fn classes_for(&self, identity: &Identity) -> Result<Vec<ClassRecord>, RegistryError> {
        let address = identity.address();
        let classes = self.classes.iter_classes()?;
        Ok(match identity.role() {
            Role::Admin => classes,
            Role::Lecturer => classes
                .into_iter()
                .filter(|c| c.is_owned_by(address))
                .collect(),
            Role::Student => classes
                .into_iter()
                .filter(|c| c.has_student(address))
                .collect(),
        })
    }

    /// The class, if `viewer` is its lecturer, an enrolled student, or an
    /// administrator.
    pub fn class_visible_to(
        &self,
        class_id: &ClassId,
        viewer: &Identity,
    ) -> Result<ClassRecord, RegistryError> {
        let class = self.get_class(class_id)?;
        let address = viewer.address();
        let visible = match viewer.role() {
            Role::Admin => true,
            Role::Lecturer => class.is_owned_by(address),
            Role::Student => class.has_student(address),
        };
        if !visible {
            return Err(RegistryError::Forbidden(format!(
                "{address} may not view class {class_id}"
            )));
        }
        Ok(class)
    }
}

fn validated_title(title: &str) -> Result<String, RegistryError> {
    let title = title.trim();
    if title.is_empty() || title.len() > MAX_TITLE_LEN {
        return Err(RegistryError::InvalidInput(format!(
            "title must be 1 to {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(title.to_string())
}

fn cleaned_description(description: &str) -> Option<String> {
    Some(description.trim().to_string()).filter(|d| !d.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use poap_identity::NewIdentity;
    use poap_nullables::{NullClock, NullStore};
    use poap_types::RoleProfile;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    struct Fixture {
        registry: EnrollmentRegistry,
        admin: IdentityAddress,
        lecturer: IdentityAddress,
        other_lecturer: IdentityAddress,
        students: Vec<IdentityAddress>,
    }

    fn addr(b: u8) -> IdentityAddress {
        IdentityAddress::from_bytes(&[b; 20])
    }

    fn cs101() -> ClassId {
        ClassId::parse("CS101").unwrap()
    }

    fn new_class(id: &ClassId) -> NewClass {
        NewClass {
            class_id: id.clone(),
            title: "Intro to CS".into(),
            description: None,
        }
    }

    fn fixture() -> Fixture {
        let store = Arc::new(NullStore::new());
        let clock: Arc<dyn Clock> = Arc::new(NullClock::new(1_000));
        let identities = Arc::new(IdentityResolver::new(store.clone(), clock.clone()));
        let admin = addr(0xad);
        identities.bootstrap_admin(&admin, "Root").unwrap();

        let provision = |b: u8, role: Role| {
            identities
                .create_identity(
                    &admin,
                    NewIdentity {
                        address: addr(b),
                        name: format!("user-{b}"),
                        profile: RoleProfile::empty(role),
                    },
                )
                .unwrap();
            addr(b)
        };
        let lecturer = provision(0x10, Role::Lecturer);
        let other_lecturer = provision(0x11, Role::Lecturer);
        let students = (0x20..0x24).map(|b| provision(b, Role::Student)).collect();

        let registry = EnrollmentRegistry::new(store, identities, clock);
        Fixture {
            registry,
            admin,
            lecturer,
            other_lecturer,
            students,
        }
    }

    #[test]
    fn create_requires_lecturer_role() {
        let f = fixture();
        let err = f
            .registry
            .create_class(&f.students[0], new_class(&cs101()))
            .unwrap_err();
        assert!(matches!(err, RegistryError::Forbidden(_)));

        let class = f.registry.create_class(&f.lecturer, new_class(&cs101())).unwrap();
        assert!(class.is_owned_by(&f.lecturer));
        assert!(class.students.is_empty());
    }

    #[test]
    fn duplicate_class_is_conflict() {
        let f = fixture();
        f.registry.create_class(&f.lecturer, new_class(&cs101())).unwrap();
        assert!(matches!(
            f.registry.create_class(&f.other_lecturer, new_class(&cs101())),
            Err(RegistryError::Conflict(_))
        ));
    }

    #[test]
    fn admin_provisions_for_lecturer_only() {
        let f = fixture();
        let class = f
            .registry
            .provision_class(&f.admin, &f.lecturer, new_class(&cs101()))
            .unwrap();
        assert!(class.is_owned_by(&f.lecturer));

        let other = ClassId::parse("MA201").unwrap();
        assert!(matches!(
            f.registry
                .provision_class(&f.admin, &f.students[0], new_class(&other)),
            Err(RegistryError::Forbidden(_))
        ));
        assert!(matches!(
            f.registry
                .provision_class(&f.lecturer, &f.lecturer, new_class(&other)),
            Err(RegistryError::Forbidden(_))
        ));
    }

    #[test]
    fn enroll_checks_owner_and_student() {
        let f = fixture();
        f.registry.create_class(&f.lecturer, new_class(&cs101())).unwrap();
        let s = &f.students[0];

        assert!(matches!(
            f.registry.enroll(&cs101(), &f.other_lecturer, s),
            Err(RegistryError::Forbidden(_))
        ));
        assert!(matches!(
            f.registry.enroll(&cs101(), &f.lecturer, &f.other_lecturer),
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            f.registry.enroll(&cs101(), &f.lecturer, &addr(0x99)),
            Err(RegistryError::NotFound(_))
        ));
        assert!(matches!(
            f.registry
                .enroll(&ClassId::parse("NOPE").unwrap(), &f.lecturer, s),
            Err(RegistryError::NotFound(_))
        ));

        assert!(f.registry.enroll(&cs101(), &f.lecturer, s).unwrap());
        assert!(!f.registry.enroll(&cs101(), &f.lecturer, s).unwrap());
        assert!(f.registry.is_enrolled(&cs101(), s).unwrap());
    }

    #[test]
    fn visibility_follows_role() {
        let f = fixture();
        f.registry.create_class(&f.lecturer, new_class(&cs101())).unwrap();
        f.registry.enroll(&cs101(), &f.lecturer, &f.students[0]).unwrap();

        let resolve = |a: &IdentityAddress| f.registry.identities.resolve(a).unwrap();
        assert!(f.registry.class_visible_to(&cs101(), &resolve(&f.lecturer)).is_ok());
        assert!(f.registry.class_visible_to(&cs101(), &resolve(&f.students[0])).is_ok());
        assert!(f.registry.class_visible_to(&cs101(), &resolve(&f.admin)).is_ok());
        assert!(matches!(
            f.registry.class_visible_to(&cs101(), &resolve(&f.students[1])),
            Err(RegistryError::Forbidden(_))
        ));
        assert!(matches!(
            f.registry.class_visible_to(&cs101(), &resolve(&f.other_lecturer)),
            Err(RegistryError::Forbidden(_))
        ));

        assert_eq!(f.registry.classes_for(&resolve(&f.students[0])).unwrap().len(), 1);
        assert!(f.registry.classes_for(&resolve(&f.students[1])).unwrap().is_empty());
        assert!(f.registry.classes_for(&resolve(&f.other_lecturer)).unwrap().is_empty());
        assert_eq!(f.registry.classes_for(&resolve(&f.admin)).unwrap().len(), 1);
    }

    #[test]
    fn only_the_owner_updates_or_deletes() {
        let f = fixture();
        f.registry.create_class(&f.lecturer, new_class(&cs101())).unwrap();
        f.registry.enroll(&cs101(), &f.lecturer, &f.students[0]).unwrap();

        let update = ClassUpdate {
            title: Some("  Algorithms ".into()),
            description: Some("Sorting and searching".into()),
        };
        assert!(matches!(
            f.registry.update_class(&cs101(), &f.other_lecturer, update.clone()),
            Err(RegistryError::Forbidden(_))
        ));
        let updated = f.registry.update_class(&cs101(), &f.lecturer, update).unwrap();
        assert_eq!(updated.title, "Algorithms");
        assert_eq!(updated.description.as_deref(), Some("Sorting and searching"));
        assert!(updated.has_student(&f.students[0]));

        let cleared = f
            .registry
            .update_class(
                &cs101(),
                &f.lecturer,
                ClassUpdate {
                    title: None,
                    description: Some(" ".into()),
                },
            )
            .unwrap();
        assert_eq!(cleared.title, "Algorithms");
        assert_eq!(cleared.description, None);
        assert!(matches!(
            f.registry.update_class(
                &cs101(),
                &f.lecturer,
                ClassUpdate {
                    title: Some(String::new()),
                    description: None,
                },
            ),
            Err(RegistryError::InvalidInput(_))
        ));

        assert!(matches!(
            f.registry.delete_class(&cs101(), &f.other_lecturer),
            Err(RegistryError::Forbidden(_))
        ));
        f.registry.delete_class(&cs101(), &f.lecturer).unwrap();
        assert!(matches!(
            f.registry.get_class(&cs101()),
            Err(RegistryError::NotFound(_))
        ));
    }

    #[test]
    fn lecturer_edits_enrolled_student_only() {
        let f = fixture();
        f.registry.create_class(&f.lecturer, new_class(&cs101())).unwrap();
        f.registry.enroll(&cs101(), &f.lecturer, &f.students[0]).unwrap();
        let details = StudentDetails {
            name: Some("Grace".into()),
            student_id: Some("S-7".into()),
        };

        assert!(matches!(
            f.registry
                .edit_student(&cs101(), &f.other_lecturer, &f.students[0], details.clone()),
            Err(RegistryError::Forbidden(_))
        ));
        assert!(matches!(
            f.registry
                .edit_student(&cs101(), &f.lecturer, &f.students[1], details.clone()),
            Err(RegistryError::NotFound(_))
        ));

        let edited = f
            .registry
            .edit_student(&cs101(), &f.lecturer, &f.students[0], details)
            .unwrap();
        assert_eq!(edited.name(), "Grace");
        assert!(matches!(
            edited.profile,
            RoleProfile::Student { ref student_id, .. } if student_id == "S-7"
        ));
    }

    #[test]
    fn references_cover_owner_and_students() {
        let f = fixture();
        f.registry.create_class(&f.lecturer, new_class(&cs101())).unwrap();
        f.registry.enroll(&cs101(), &f.lecturer, &f.students[0]).unwrap();
        assert!(f.registry.references_account(&f.lecturer).unwrap());
        assert!(f.registry.references_account(&f.students[0]).unwrap());
        assert!(!f.registry.references_account(&f.students[1]).unwrap());
        assert!(!f.registry.references_account(&f.other_lecturer).unwrap());
    }

    #[test]
    fn predicates_are_false_for_missing_class() {
        let f = fixture();
        let missing = ClassId::parse("NOPE").unwrap();
        assert!(!f.registry.is_owner(&missing, &f.lecturer).unwrap());
        assert!(!f.registry.is_enrolled(&missing, &f.students[0]).unwrap());
    }

    proptest! {
        #[test]
        fn enrollment_matches_set_model(ops in prop::collection::vec((any::<bool>(), 0usize..4), 0..24)) {
            let f = fixture();
            f.registry.create_class(&f.lecturer, new_class(&cs101())).unwrap();
            let mut model = BTreeSet::new();

            for (enroll, idx) in ops {
                let s = &f.students[idx];
                if enroll {
                    let changed = f.registry.enroll(&cs101(), &f.lecturer, s).unwrap();
                    prop_assert_eq!(changed, model.insert(idx));
                } else {
                    let changed = f.registry.unenroll(&cs101(), &f.lecturer, s).unwrap();
                    prop_assert_eq!(changed, model.remove(&idx));
                }
                for (i, student) in f.students.iter().enumerate() {
                    prop_assert_eq!(
                        f.registry.is_enrolled(&cs101(), student).unwrap(),
                        model.contains(&i)
                    );
                }
            }
        }
    }
}
