//! Per-class attendance statistics for a student.

use std::collections::BTreeMap;

use serde::Serialize;

use poap_registry::RegistryError;
use poap_types::{ClassId, IdentityAddress};

use crate::{AttendanceError, AttendanceLedger};

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassAttendanceStats {
    pub class_id: ClassId,
    pub class_title: String,
    /// Records of any kind.
    pub total: u32,
    /// Records the student marked.
    pub attended: u32,
    pub validated: u32,
}

impl AttendanceLedger {
    /// One entry per class the student has records in, ordered by class id.
    pub fn attendance_stats(
        &self,
        student: &IdentityAddress,
    ) -> Result<Vec<ClassAttendanceStats>, AttendanceError> {
        let mut by_class: BTreeMap<ClassId, ClassAttendanceStats> = BTreeMap::new();

        for record in self.student_records(student)? {
            if !by_class.contains_key(&record.class_id) {
                let class_title = match self.registry.get_class(&record.class_id) {
                    Ok(class) => class.title,
                    Err(RegistryError::NotFound(_)) => record.class_id.to_string(),
                    Err(e) => return Err(e.into()),
                };
                by_class.insert(
                    record.class_id.clone(),
                    ClassAttendanceStats {
                        class_id: record.class_id.clone(),
                        class_title,
                        total: 0,
                        attended: 0,
                        validated: 0,
                    },
                );
            }
            if let Some(entry) = by_class.get_mut(&record.class_id) {
                entry.total += 1;
                if record.marked_at.is_some() {
                    entry.attended += 1;
                }
                if record.validated {
                    entry.validated += 1;
                }
            }
        }

        Ok(by_class.into_values().collect())
    }
}
