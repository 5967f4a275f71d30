// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use rstest::{fixture, rstest};

use super::{Reconciler, ResolvedPhoto};
use crate::model::{DisplayReference, NamedRecord};
use crate::store::{FileStore, StoreSnapshot};

fn reconciler(names: &[&str]) -> Reconciler {
    Reconciler::new(StoreSnapshot::from_names(names.iter().copied()))
}

fn photo(display: &str, stored: &str) -> Option<ResolvedPhoto> {
    Some(ResolvedPhoto {
        display_name: display.to_owned(),
        stored_name: stored.to_owned(),
    })
}

#[fixture]
fn studio() -> Reconciler {
    reconciler(&[
        "1700000000000-photo.jpg",
        "1700000000500-my_photo.jpg",
        "1700000000900-c d.jpg",
        "plain.jpg",
        "1700000001000-banana.jpg",
    ])
}

#[rstest]
fn bare_name_exact_match_wins(studio: Reconciler) {
    assert_eq!(
        studio.resolve(&DisplayReference::bare("plain.jpg")),
        photo("plain.jpg", "plain.jpg")
    );
}

#[rstest]
fn already_stored_bare_name_strips_prefix_for_display(studio: Reconciler) {
    assert_eq!(
        studio.resolve(&DisplayReference::bare("1700000000000-photo.jpg")),
        photo("photo.jpg", "1700000000000-photo.jpg")
    );
}

#[rstest]
fn bare_name_matches_disambiguated_file(studio: Reconciler) {
    assert_eq!(
        studio.resolve(&DisplayReference::bare("photo.jpg")),
        photo("photo.jpg", "1700000000000-photo.jpg")
    );
}

#[rstest]
fn bare_name_with_whitespace_matches_sanitized_file(studio: Reconciler) {
    assert_eq!(
        studio.resolve(&DisplayReference::bare("my photo.jpg")),
        photo("my photo.jpg", "1700000000500-my_photo.jpg")
    );
}

#[rstest]
fn plain_suffix_match_is_last_resort(studio: Reconciler) {
    assert_eq!(
        studio.resolve(&DisplayReference::bare("nana.jpg")),
        photo("nana.jpg", "1700000001000-banana.jpg")
    );
}

#[test]
fn separator_match_beats_earlier_suffix_match() {
    let r = reconciler(&["100-xa.jpg", "200-a.jpg"]);
    assert_eq!(
        r.resolve(&DisplayReference::bare("a.jpg")),
        photo("a.jpg", "200-a.jpg")
    );
}

#[test]
fn shared_original_name_resolves_to_earliest_upload() {
    let r = reconciler(&["300-a.jpg", "100-a.jpg", "200-a.jpg"]);
    assert_eq!(
        r.resolve(&DisplayReference::bare("a.jpg")),
        photo("a.jpg", "100-a.jpg")
    );
}

#[rstest]
fn named_record_prefers_recorded_stored_name(studio: Reconciler) {
    let reference = DisplayReference::Named(NamedRecord {
        filename: "photo.jpg".to_owned(),
        stored: Some("1700000001000-banana.jpg".to_owned()),
        url: None,
        uploaded_at_ms: None,
    });
    assert_eq!(
        studio.resolve(&reference),
        photo("photo.jpg", "1700000001000-banana.jpg")
    );
}

#[rstest]
fn named_record_with_missing_stored_file_is_dropped(studio: Reconciler) {
    let reference = DisplayReference::Named(NamedRecord {
        filename: "photo.jpg".to_owned(),
        stored: Some("1-gone.jpg".to_owned()),
        url: None,
        uploaded_at_ms: None,
    });
    assert_eq!(studio.resolve(&reference), None);
}

#[test]
fn named_record_resolves_again_once_its_file_returns() {
    let reference = DisplayReference::ingested("photo.jpg", "1-photo.jpg", 1);
    assert_eq!(reconciler(&["2-photo.jpg"]).resolve(&reference), None);
    assert_eq!(
        reconciler(&["1-photo.jpg", "2-photo.jpg"]).resolve(&reference),
        photo("photo.jpg", "1-photo.jpg")
    );
}

#[rstest]
fn named_record_falls_back_to_url_and_keeps_filename(studio: Reconciler) {
    let reference = DisplayReference::Named(NamedRecord {
        filename: "Holiday.jpg".to_owned(),
        stored: None,
        url: Some("https://x.ngrok.app/uploads/1700000000900-c%20d.jpg".to_owned()),
        uploaded_at_ms: None,
    });
    assert_eq!(
        studio.resolve(&reference),
        photo("Holiday.jpg", "1700000000900-c d.jpg")
    );
}

#[rstest]
fn url_record_uses_decoded_basename(studio: Reconciler) {
    assert_eq!(
        studio.resolve(&DisplayReference::from_url(
            "https://old-tunnel.example/uploads/1700000000900-c%20d.jpg"
        )),
        photo("c d.jpg", "1700000000900-c d.jpg")
    );
}

#[rstest]
fn unresolvable_references_are_none(studio: Reconciler) {
    for reference in [
        DisplayReference::bare("missing.png"),
        DisplayReference::bare(""),
        DisplayReference::bare("../photo.jpg"),
        DisplayReference::from_url("https://h/uploads/404.jpg"),
        DisplayReference::from_url("::not a url::"),
        DisplayReference::Unrecognized(serde_json::json!({"foo": 1})),
    ] {
        assert_eq!(studio.resolve(&reference), None, "{reference:?}");
    }
}

#[rstest]
fn resolution_is_idempotent(studio: Reconciler) {
    for reference in [
        DisplayReference::bare("photo.jpg"),
        DisplayReference::bare("nana.jpg"),
        DisplayReference::from_url("/uploads/1700000000900-c%20d.jpg"),
    ] {
        let first = studio.resolve(&reference);
        let second = studio.resolve(&reference);
        assert!(first.is_some());
        assert_eq!(first, second);
    }
}

#[rstest]
fn reconcile_all_keeps_order_and_counts_drops(studio: Reconciler) {
    let refs = vec![
        DisplayReference::bare("plain.jpg"),
        DisplayReference::bare("missing.jpg"),
        DisplayReference::bare("photo.jpg"),
    ];
    let report = studio.reconcile_all(&refs);
    assert_eq!(report.total, 3);
    assert_eq!(report.dropped(), 1);
    assert_eq!(
        report
            .resolved
            .iter()
            .map(|p| p.display_name.as_str())
            .collect::<Vec<_>>(),
        vec!["plain.jpg", "photo.jpg"]
    );
}

#[test]
fn from_store_sees_uploaded_files() {
    let tmp = tempfile::tempdir().unwrap();
    let store = FileStore::new(tmp.path());
    let stored = store.put("Wedding 01.jpg", b"x").unwrap();

    let r = Reconciler::from_store(&store).unwrap();
    assert_eq!(
        r.resolve(&DisplayReference::bare("Wedding 01.jpg")),
        photo("Wedding 01.jpg", &stored.name)
    );
}
