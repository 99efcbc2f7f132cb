//! Property-based tests using proptest
//!
//! These tests check the pure building blocks over randomized inputs:
//! status normalization, tag plans and page merging.

use proptest::prelude::*;
use regioncloud::paginate::{fetch_all, Continuation, Page, PageStyle};
use regioncloud::status::{normalize, status_tables, CanonicalStatus};
use regioncloud::tags::{parse_tag_args, plan, TagSet};
use std::cell::Cell;

/// Kinds with and without status tables
fn arb_kind() -> impl Strategy<Value = &'static str> {
    prop_oneof![
        Just("db-instance"),
        Just("elastic-ip"),
        Just("nat-gateway"),
        Just("file-share"),
        Just("lb-backend"),
        Just("security-group"),
        Just("no-such-kind"),
    ]
}

/// Raw statuses: known provider values in any case, or noise
fn arb_raw_status() -> impl Strategy<Value = String> {
    prop_oneof![
        prop_oneof!["ACTIVE", "BUILD", "PENDING_CREATE", "available", "ERROR", "BACKING UP"]
            .prop_map(|s| s.to_string()),
        prop_oneof!["active", "Build", "pending_create", "AVAILABLE"].prop_map(|s| s.to_string()),
        ".{0,24}",
    ]
}

/// Small tag sets over a shared key space so existing and desired overlap
fn arb_tags() -> impl Strategy<Value = TagSet> {
    prop::collection::btree_map("[a-e]", "[a-z0-9]{0,4}", 0..5)
}

fn block_on<F: std::future::Future>(future: F) -> F::Output {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
        .block_on(future)
}

proptest! {
    /// Normalization never fails and passthrough keeps the raw value
    #[test]
    fn normalize_is_total(kind in arb_kind(), raw in arb_raw_status()) {
        let status = normalize(kind, &raw);
        if status.is_passthrough() {
            prop_assert_eq!(status.as_str(), raw.as_str());
            prop_assert_eq!(status.canonical(), CanonicalStatus::Unknown);
        }
    }

    /// Every table entry maps to its canonical value regardless of case
    #[test]
    fn table_entries_ignore_case(kind in prop_oneof![Just("db-instance"), Just("elastic-ip"), Just("file-share")], upper in any::<bool>()) {
        let table = &status_tables()[kind];
        for (raw, expected) in table {
            let probe = if upper { raw.to_ascii_uppercase() } else { raw.to_ascii_lowercase() };
            prop_assert_eq!(normalize(kind, &probe).canonical(), *expected);
        }
    }

    /// Replace ends exactly at the desired set
    #[test]
    fn replace_reaches_desired(existing in arb_tags(), desired in arb_tags()) {
        let plan = plan(&existing, &desired, true);
        prop_assert_eq!(plan.apply(&existing), desired);
        prop_assert_eq!(plan.delete.len(), existing.len());
    }

    /// Merge keeps untouched keys and applies every desired pair
    #[test]
    fn merge_keeps_untouched_keys(existing in arb_tags(), desired in arb_tags()) {
        let plan = plan(&existing, &desired, false);
        let result = plan.apply(&existing);

        for (key, value) in &desired {
            prop_assert_eq!(result.get(key), Some(value));
        }
        for (key, value) in &existing {
            if !desired.contains_key(key) {
                prop_assert_eq!(result.get(key), Some(value));
            }
        }
        for key in &plan.delete {
            prop_assert!(existing.contains_key(key) && desired.contains_key(key));
        }
        prop_assert_eq!(result.len(), existing.keys().chain(desired.keys()).collect::<std::collections::BTreeSet<_>>().len());
    }

    /// Parsed tag arguments never carry empty keys
    #[test]
    fn parsed_tag_keys_are_non_empty(args in prop::collection::vec("[a-z=]{0,6}", 0..6)) {
        let parsed = parse_tag_args(args.as_slice());
        prop_assert!(parsed.keys().all(|k| !k.is_empty()));
    }

    /// Offset paging returns every item once, in order, whatever the page size
    #[test]
    fn offset_pages_merge_in_order(len in 0usize..60, size in 1usize..15) {
        let data: Vec<usize> = (0..len).collect();
        let items = block_on(fetch_all(
            PageStyle::Offset,
            0usize,
            |offset: &usize| {
                let page: Vec<usize> = data.iter().skip(*offset).take(size).copied().collect();
                std::future::ready(Ok(Page::new(page).with_total(len)))
            },
            |q: &mut usize, c: &Continuation| {
                if let Continuation::Offset(n) = c {
                    *q = *n;
                }
            },
        ))
        .unwrap();
        prop_assert_eq!(items, data);
    }

    /// Marker paging stops once a marker repeats
    #[test]
    fn repeated_marker_terminates(unique in 0usize..20) {
        let calls = Cell::new(0usize);
        let items = block_on(fetch_all(
            PageStyle::Marker,
            0usize,
            |_: &usize| {
                let n = calls.get();
                calls.set(n + 1);
                let marker = format!("m{}", n.min(unique));
                std::future::ready(Ok(Page::new(vec![n]).with_marker(marker)))
            },
            |q: &mut usize, _: &Continuation| *q += 1,
        ))
        .unwrap();
        prop_assert_eq!(items.len(), unique + 2);
    }
}
