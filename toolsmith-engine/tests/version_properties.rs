//! Ordering properties of version comparison.

use std::cmp::Ordering;

use proptest::prelude::*;
use toolsmith_engine::version::{compare, latest_version, sort};

fn version_string() -> impl Strategy<Value = String> {
    (
        prop::collection::vec(0u64..200, 1..5),
        prop::option::of(prop_oneof![Just("-rc1"), Just("-beta2"), Just("-alpha"), Just("+build")]),
        any::<bool>(),
    )
        .prop_map(|(segments, suffix, prefixed)| {
            let mut s = segments
                .iter()
                .map(u64::to_string)
                .collect::<Vec<_>>()
                .join(".");
            if let Some(suffix) = suffix {
                s.push_str(suffix);
            }
            if prefixed {
                s.insert(0, 'v');
            }
            s
        })
}

proptest! {
    #[test]
    fn compare_is_antisymmetric(a in version_string(), b in version_string()) {
        prop_assert_eq!(compare(&a, &b), compare(&b, &a).reverse());
    }

    #[test]
    fn compare_is_transitive(a in version_string(), b in version_string(), c in version_string()) {
        if compare(&a, &b) != Ordering::Greater && compare(&b, &c) != Ordering::Greater {
            prop_assert_ne!(compare(&a, &c), Ordering::Greater);
        }
    }

    #[test]
    fn compare_is_reflexive(a in version_string()) {
        prop_assert_eq!(compare(&a, &a), Ordering::Equal);
    }

    #[test]
    fn trailing_zero_segments_compare_equal(segments in prop::collection::vec(0u64..50, 1..4)) {
        let short = segments.iter().map(u64::to_string).collect::<Vec<_>>().join(".");
        let long = format!("{short}.0.0");
        prop_assert_eq!(compare(&short, &long), Ordering::Equal);
    }

    #[test]
    fn sort_orders_ascending(mut versions in prop::collection::vec(version_string(), 0..20)) {
        sort(&mut versions);
        for pair in versions.windows(2) {
            prop_assert_ne!(compare(&pair[0], &pair[1]), Ordering::Greater);
        }
    }

    #[test]
    fn latest_is_a_member(versions in prop::collection::vec(version_string(), 1..20)) {
        let latest = latest_version(&versions, "");
        prop_assert!(versions.contains(&latest));
    }
}

#[test]
fn test_documented_orderings() {
    assert_eq!(compare("1.9", "1.10"), Ordering::Less);
    assert_eq!(compare("1.21.0", "1.20.0"), Ordering::Greater);
    assert_eq!(compare("v1.2", "1.2.0"), Ordering::Equal);
}
