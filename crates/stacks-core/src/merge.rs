//! Merge engine
//!
//! `merge` combines two observations of the same pin into one. It is the only
//! conflict resolution in the system and must stay idempotent, commutative
//! and associative: batches arrive from independent sources in no particular
//! order and may be replayed.
//!
//! Field policy:
//! - `tombstone`, `title`, `notes`, `is_read`, `modified_at`, `accessed_at`,
//!   `url`: last writer (larger `modified_at`) wins
//! - `created_at`: earliest
//! - `tags`: first-seen ordered union
//! - progress counters: componentwise max
//!
//! Last-writer-wins is per record, not per field: a newer observation with a
//! stale title still replaces the title.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};
use crate::identity::PinId;
use crate::models::{MergeDiff, Pin};

/// Total order on the last-writer-wins fields of a pin
///
/// `modified_at` decides; the remaining fields only break exact timestamp
/// ties, so that the winner never depends on argument order.
fn recency_key(pin: &Pin) -> (DateTime<Utc>, bool, &str, &str, bool, DateTime<Utc>, &str) {
    (
        pin.modified_at,
        pin.tombstone,
        &pin.title,
        &pin.notes,
        pin.is_read,
        pin.accessed_at,
        &pin.url,
    )
}

/// Merge two pins with the same identity
///
/// Fails with [`Error::PreconditionViolation`] when `x` and `y` have different
/// identities. URLs differing only by http/https share an identity; the merged
/// pin keeps the URL of the later observation.
pub fn merge(x: &Pin, y: &Pin) -> Result<Pin> {
    if x.id() != y.id() {
        return Err(Error::PreconditionViolation(format!(
            "cannot merge pins with different urls: {} vs {}",
            x.url, y.url
        )));
    }

    let later = if recency_key(x) > recency_key(y) { x } else { y };

    Ok(Pin {
        url: later.url.clone(),
        tombstone: later.tombstone,
        title: later.title.clone(),
        tags: x.tags.union(&y.tags),
        notes: later.notes.clone(),
        created_at: x.created_at.min(y.created_at),
        modified_at: later.modified_at,
        accessed_at: later.accessed_at,
        is_read: later.is_read,
        progress_page_scroll: x.progress_page_scroll.max(y.progress_page_scroll),
        progress_page_scroll_max: x.progress_page_scroll_max.max(y.progress_page_scroll_max),
        progress_pdf_page: x.progress_pdf_page.max(y.progress_pdf_page),
        progress_pdf_page_max: x.progress_pdf_page_max.max(y.progress_pdf_page_max),
    })
}

/// Merge two pin collections keyed by identity
///
/// Pins present on one side only pass through unchanged. Pins present on both
/// sides are merged, and a [`MergeDiff`] is emitted whenever the two sides
/// differ. Duplicate identities within one side are folded together first.
/// Output order: `xs` order, then pins only in `ys` in `ys` order.
#[must_use]
pub fn merge_collections(xs: &[Pin], ys: &[Pin]) -> (Vec<Pin>, Vec<MergeDiff>) {
    let xs = fold_duplicates(xs);
    let ys = fold_duplicates(ys);

    let mut index: HashMap<PinId, usize> = HashMap::with_capacity(xs.len());
    for (position, pin) in xs.iter().enumerate() {
        index.insert(pin.id(), position);
    }

    let mut merged = xs;
    let mut diffs = Vec::new();
    for y in ys {
        let Some(&position) = index.get(&y.id()) else {
            index.insert(y.id(), merged.len());
            merged.push(y);
            continue;
        };
        let x = &merged[position];
        if *x == y {
            continue;
        }
        // Same identity by construction of the index
        if let Ok(z) = merge(x, &y) {
            diffs.push(MergeDiff::new(x.clone(), y, z.clone()));
            merged[position] = z;
        }
    }

    tracing::debug!(
        "Merged collections: pins[{}], diffs[{}]",
        merged.len(),
        diffs.len()
    );
    (merged, diffs)
}

fn fold_duplicates(pins: &[Pin]) -> Vec<Pin> {
    let mut index: HashMap<PinId, usize> = HashMap::with_capacity(pins.len());
    let mut folded: Vec<Pin> = Vec::with_capacity(pins.len());
    for pin in pins {
        let id = pin.id();
        if let Some(&position) = index.get(&id) {
            if let Ok(z) = merge(&folded[position], pin) {
                folded[position] = z;
            }
        } else {
            index.insert(id, folded.len());
            folded.push(pin.clone());
        }
    }
    folded
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn at(millis: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(millis).unwrap()
    }

    fn pin(url: &str, modified: i64, title: &str, tags: &[&str]) -> Pin {
        Pin {
            url: url.to_string(),
            tombstone: false,
            title: title.to_string(),
            tags: tags.iter().copied().collect(),
            notes: String::new(),
            created_at: at(modified),
            modified_at: at(modified),
            accessed_at: at(modified),
            is_read: false,
            progress_page_scroll: 0,
            progress_page_scroll_max: 0,
            progress_pdf_page: 0,
            progress_pdf_page_max: 0,
        }
    }

    #[test]
    fn test_merge_later_wins_lww_fields() {
        let mut old = pin("https://a.com", 1_000, "old", &["x"]);
        old.notes = "old notes".to_string();
        old.is_read = true;
        let mut new = pin("https://a.com", 2_000, "new", &["y"]);
        new.tombstone = true;

        let z = merge(&old, &new).unwrap();
        assert_eq!(z.title, "new");
        assert_eq!(z.notes, "");
        assert!(!z.is_read);
        assert!(z.tombstone);
        assert_eq!(z.modified_at, at(2_000));
        assert_eq!(z.accessed_at, at(2_000));
        assert_eq!(z, merge(&new, &old).unwrap());
    }

    #[test]
    fn test_merge_created_at_is_min() {
        let x = pin("https://a.com", 5_000, "x", &[]);
        let mut y = pin("https://a.com", 6_000, "y", &[]);
        y.created_at = at(100);
        assert_eq!(merge(&x, &y).unwrap().created_at, at(100));
        assert_eq!(merge(&y, &x).unwrap().created_at, at(100));
    }

    #[test]
    fn test_merge_tags_union_first_seen() {
        let x = pin("https://a.com", 1, "x", &["a", "b"]);
        let y = pin("https://a.com", 2, "y", &["c", "b", "d"]);
        let z = merge(&x, &y).unwrap();
        assert_eq!(z.tags.as_slice(), ["a", "b", "c", "d"]);
    }

    #[test]
    fn test_merge_progress_is_max() {
        let mut x = pin("https://a.com", 2, "x", &[]);
        x.progress_pdf_page = 7;
        x.progress_page_scroll_max = 10;
        let mut y = pin("https://a.com", 1, "y", &[]);
        y.progress_pdf_page = 3;
        y.progress_pdf_page_max = 40;
        y.progress_page_scroll = 5;

        let z = merge(&x, &y).unwrap();
        assert_eq!(z.progress_pdf_page, 7);
        assert_eq!(z.progress_pdf_page_max, 40);
        assert_eq!(z.progress_page_scroll, 5);
        assert_eq!(z.progress_page_scroll_max, 10);
    }

    #[test]
    fn test_merge_rejects_different_identities() {
        let x = pin("https://a.com", 1, "x", &[]);
        let y = pin("https://b.com", 1, "y", &[]);
        assert!(matches!(
            merge(&x, &y),
            Err(Error::PreconditionViolation(_))
        ));
    }

    #[test]
    fn test_merge_scheme_variants_keep_later_url() {
        let x = pin("http://a.com", 1_000, "old", &["x"]);
        let y = pin("https://a.com", 2_000, "new", &["y"]);
        let z = merge(&x, &y).unwrap();
        assert_eq!(z.url, "https://a.com");
        assert_eq!(z.title, "new");
        assert!(z.tags.contains("x") && z.tags.contains("y"));
    }

    #[test]
    fn test_merge_tie_is_order_independent() {
        let x = pin("https://a.com", 1_000, "alpha", &[]);
        let y = pin("https://a.com", 1_000, "beta", &[]);
        assert_eq!(merge(&x, &y).unwrap(), merge(&y, &x).unwrap());
    }

    #[test]
    fn test_merge_collections_passes_through_and_diffs() {
        let a_old = pin("https://a.com", 1, "a-old", &["x"]);
        let a_new = pin("http://a.com", 2, "a-new", &["y"]);
        let b = pin("https://b.com", 1, "b", &[]);
        let c = pin("https://c.com", 1, "c", &[]);

        let (merged, diffs) = merge_collections(&[a_old.clone(), b.clone()], &[a_new.clone(), c.clone()]);

        assert_eq!(merged.len(), 3);
        assert_eq!(merged[0].title, "a-new");
        assert_eq!(merged[1], b);
        assert_eq!(merged[2], c);
        assert_eq!(diffs.len(), 1);
        assert_eq!(diffs[0].before, [a_old, a_new]);
        assert_eq!(diffs[0].after, merged[0]);
    }

    #[test]
    fn test_merge_collections_equal_pins_emit_no_diff() {
        let a = pin("https://a.com", 1, "a", &[]);
        let (merged, diffs) = merge_collections(&[a.clone()], &[a.clone()]);
        assert_eq!(merged, vec![a]);
        assert!(diffs.is_empty());
    }

    #[test]
    fn test_merge_collections_folds_duplicates_within_side() {
        let first = pin("http://a.com", 1, "first", &["x"]);
        let second = pin("https://a.com", 2, "second", &["y"]);
        let (merged, diffs) = merge_collections(&[first, second], &[]);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged[0].title, "second");
        assert!(diffs.is_empty());
    }

    fn pin_strategy() -> impl Strategy<Value = Pin> {
        let url = prop_oneof![Just("http://a.com/x"), Just("https://a.com/x")];
        let title = prop_oneof![Just("one"), Just("two"), Just("three")];
        let tag = prop_oneof![Just("a"), Just("b"), Just("c"), Just("d")];
        (
            (url, any::<bool>(), title, prop::collection::vec(tag, 0..4)),
            (0i64..5, 0i64..5, 0i64..5, any::<bool>()),
            (0u32..4, 0u32..4, 0u32..4, 0u32..4),
        )
            .prop_map(
                |((url, tombstone, title, tags), (created, modified, accessed, is_read), progress)| {
                    Pin {
                        url: url.to_string(),
                        tombstone,
                        title: title.to_string(),
                        tags: tags.into_iter().collect(),
                        notes: format!("notes-{title}"),
                        created_at: at(created * 1_000),
                        modified_at: at(modified * 1_000),
                        accessed_at: at(accessed * 1_000),
                        is_read,
                        progress_page_scroll: progress.0,
                        progress_page_scroll_max: progress.1,
                        progress_pdf_page: progress.2,
                        progress_pdf_page_max: progress.3,
                    }
                },
            )
    }

    proptest! {
        #![proptest_config(ProptestConfig { cases: 256, .. ProptestConfig::default() })]

        #[test]
        fn merge_idempotent(x in pin_strategy()) {
            prop_assert_eq!(merge(&x, &x).unwrap(), x);
        }

        #[test]
        fn merge_commutative(x in pin_strategy(), y in pin_strategy()) {
            prop_assert_eq!(merge(&x, &y).unwrap(), merge(&y, &x).unwrap());
        }

        #[test]
        fn merge_associative(x in pin_strategy(), y in pin_strategy(), z in pin_strategy()) {
            let left = merge(&merge(&x, &y).unwrap(), &z).unwrap();
            let right = merge(&x, &merge(&y, &z).unwrap()).unwrap();
            prop_assert_eq!(left, right);
        }

        #[test]
        fn merge_stable_under_repetition(x in pin_strategy(), y in pin_strategy()) {
            let once = merge(&x, &y).unwrap();
            prop_assert_eq!(merge(&once, &y).unwrap(), once);
        }

        #[test]
        fn merge_field_laws(x in pin_strategy(), y in pin_strategy()) {
            let z = merge(&x, &y).unwrap();
            let expected_tags: Vec<String> = x.tags.union(&y.tags).as_slice().to_vec();
            prop_assert_eq!(z.tags.as_slice(), expected_tags.as_slice());
            prop_assert_eq!(z.created_at, x.created_at.min(y.created_at));
            prop_assert_eq!(z.progress_pdf_page, x.progress_pdf_page.max(y.progress_pdf_page));
            prop_assert_eq!(z.progress_pdf_page_max, x.progress_pdf_page_max.max(y.progress_pdf_page_max));
            prop_assert_eq!(z.progress_page_scroll, x.progress_page_scroll.max(y.progress_page_scroll));
            prop_assert_eq!(
                z.progress_page_scroll_max,
                x.progress_page_scroll_max.max(y.progress_page_scroll_max)
            );
            prop_assert_eq!(z.modified_at, x.modified_at.max(y.modified_at));
        }
    }
}
