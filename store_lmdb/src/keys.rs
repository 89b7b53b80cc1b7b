//! Composite key layouts.
//!
//! Class ids and addresses never contain a NUL byte, so `0x00` is a safe
//! separator and `class ++ 0 ++ student ++ 0` is an unambiguous prefix.

use poap_types::{AttendanceId, ClassId, DayIndex, IdentityAddress};

const SEP: u8 = 0;

/// `class ++ 0`: prefix of every index entry for a class.
pub fn class_prefix(class_id: &ClassId) -> Vec<u8> {
    let c = class_id.as_key();
    let mut key = Vec::with_capacity(c.len() + 1);
    key.extend_from_slice(c);
    key.push(SEP);
    key
}

/// `class ++ 0 ++ student ++ 0`: prefix of every index entry for a pair.
pub fn pair_prefix(class_id: &ClassId, student: &IdentityAddress) -> Vec<u8> {
    let mut key = class_prefix(class_id);
    key.extend_from_slice(student.as_key());
    key.push(SEP);
    key
}

/// `attendance_by_class` key: `pair ++ id_be`.
pub fn class_index_key(class_id: &ClassId, student: &IdentityAddress, id: AttendanceId) -> Vec<u8> {
    let mut key = pair_prefix(class_id, student);
    key.extend_from_slice(&id.to_be_bytes());
    key
}

/// `validated_days` key: `pair ++ day_be`. Unique per (class, student, day).
pub fn validated_day_key(class_id: &ClassId, student: &IdentityAddress, day: DayIndex) -> Vec<u8> {
    let mut key = pair_prefix(class_id, student);
    key.extend_from_slice(&day.to_be_bytes());
    key
}

/// Decode the trailing 8-byte big-endian id of an index key or value.
pub fn trailing_id(bytes: &[u8]) -> Option<AttendanceId> {
    if bytes.len() < 8 {
        return None;
    }
    let arr: [u8; 8] = bytes[bytes.len() - 8..].try_into().ok()?;
    Some(AttendanceId::from_be_bytes(arr))
}
