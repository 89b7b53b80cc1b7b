use proptest::prelude::*;

use poap_types::{DayIndex, IdentityAddress, Timestamp};

proptest! {
    /// Every timestamp lies inside the day it reports, at or after its midnight.
    #[test]
    fn timestamp_within_its_day(secs in 0u64..4_000_000_000) {
        let ts = Timestamp::new(secs);
        let day = ts.day();
        prop_assert!(day.contains(ts));
        prop_assert!(ts.start_of_day() <= ts);
        prop_assert!(ts.elapsed_since(ts.start_of_day().saturating_add(86_400)) > 0);
    }

    /// Two timestamps share a day exactly when their midnights coincide.
    #[test]
    fn same_day_iff_same_midnight(a in 0u64..4_000_000_000, b in 0u64..4_000_000_000) {
        let (ta, tb) = (Timestamp::new(a), Timestamp::new(b));
        prop_assert_eq!(ta.day() == tb.day(), ta.start_of_day() == tb.start_of_day());
    }

    /// Day ordering follows timestamp ordering.
    #[test]
    fn day_is_monotonic(a in 0u64..4_000_000_000, b in 0u64..4_000_000_000) {
        let (ta, tb) = (Timestamp::new(a), Timestamp::new(b));
        if ta <= tb {
            prop_assert!(ta.day() <= tb.day());
        }
    }

    /// Addresses parse case-insensitively to a single normalised form.
    #[test]
    fn address_case_insensitive(bytes in prop::array::uniform20(0u8..)) {
        let canonical = IdentityAddress::from_bytes(&bytes);
        let upper = format!("0x{}", canonical.as_str()[2..].to_ascii_uppercase());
        let parsed = IdentityAddress::parse(&upper).unwrap();
        prop_assert_eq!(parsed, canonical);
    }

    /// Day keys sort in chronological order as raw bytes.
    #[test]
    fn day_key_bytes_sort_chronologically(a in 0u64..100_000, b in 0u64..100_000) {
        let (da, db) = (DayIndex::new(a), DayIndex::new(b));
        prop_assert_eq!(da.cmp(&db), da.to_be_bytes().cmp(&db.to_be_bytes()));
    }
}
