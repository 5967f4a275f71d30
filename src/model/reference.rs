// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Darkroom-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Darkroom and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Gallery ledger entries as they appear on disk.
//!
//! Galleries written by older deployments hold a mix of shapes: plain strings (sometimes already
//! carrying a `<millis>-` storage prefix), objects with a `filename`, and objects that only kept
//! the public `url`. All of them deserialize into [`DisplayReference`]; anything else is kept as
//! [`DisplayReference::Unrecognized`] so a single odd entry never makes a gallery unreadable.

use std::sync::OnceLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use serde::{Deserialize, Serialize};
use url::Url;

/// Separator between the disambiguator and the sanitized original name in a stored file name.
pub const DISAMBIGUATOR_SEPARATOR: char = '-';

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DisplayReference {
    BareName(String),
    Named(NamedRecord),
    Url(UrlRecord),
    Unrecognized(serde_json::Value),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NamedRecord {
    pub filename: String,
    /// Exact stored file name, recorded at ingest time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stored: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uploaded_at_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    pub url: String,
}

impl DisplayReference {
    pub fn bare(name: impl Into<String>) -> Self {
        Self::BareName(name.into())
    }

    pub fn ingested(filename: impl Into<String>, stored: impl Into<String>, uploaded_at_ms: u64) -> Self {
        Self::Named(NamedRecord {
            filename: filename.into(),
            stored: Some(stored.into()),
            url: None,
            uploaded_at_ms: Some(uploaded_at_ms),
        })
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self::Url(UrlRecord { url: url.into() })
    }
}

fn disambiguated_name_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([0-9]+)-(.+)$").expect("disambiguated name regex"))
}

/// Splits `<digits>-<rest>` into its disambiguator and the remainder.
///
/// The disambiguator is digits only, so the first `-` is always the separator even when the
/// original name contains dashes of its own.
pub fn split_disambiguated(name: &str) -> Option<(&str, &str)> {
    let caps = disambiguated_name_regex().captures(name)?;
    let prefix = caps.get(1)?.as_str();
    let rest = caps.get(2)?.as_str();
    Some((prefix, rest))
}

/// User-facing name for a stored or legacy reference: the part after the disambiguator, or the
/// input unchanged when it carries none.
pub fn strip_disambiguator(name: &str) -> &str {
    split_disambiguated(name).map_or(name, |(_, rest)| rest)
}

impl UrlRecord {
    /// Decoded last path segment of the recorded URL.
    ///
    /// Relative URLs such as `/uploads/1700000000000-a.jpg` are accepted.
    pub fn basename(&self) -> Option<String> {
        let parsed = match Url::parse(&self.url) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let base = Url::parse("http://localhost/").ok()?;
                base.join(&self.url).ok()?
            }
            Err(_) => return None,
        };

        let last = parsed.path_segments()?.filter(|s| !s.is_empty()).last()?;
        let decoded = percent_decode_str(last).decode_utf8().ok()?;
        Some(decoded.into_owned())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::{split_disambiguated, strip_disambiguator, DisplayReference, NamedRecord, UrlRecord};

    #[rstest]
    #[case("1700000000000-photo.jpg", "photo.jpg")]
    #[case("1700000000000-my-photo.jpg", "my-photo.jpg")]
    #[case("photo.jpg", "photo.jpg")]
    #[case("my-photo.jpg", "my-photo.jpg")]
    #[case("123-", "123-")]
    #[case("-photo.jpg", "-photo.jpg")]
    fn strip_disambiguator_only_removes_numeric_prefix(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(strip_disambiguator(input), expected);
    }

    #[test]
    fn split_uses_first_separator() {
        assert_eq!(
            split_disambiguated("42-a-b-c.png"),
            Some(("42", "a-b-c.png"))
        );
    }

    #[test]
    fn legacy_shapes_deserialize_into_variants() {
        let raw = r#"[
            "photo.jpg",
            {"filename": "b.jpg"},
            {"url": "https://studio.example/uploads/1700-c%20d.jpg"},
            {"filename": "e.jpg", "stored": "1701-e.jpg", "uploadedAtMs": 1701},
            {"something": "else"},
            42
        ]"#;
        let refs: Vec<DisplayReference> = serde_json::from_str(raw).unwrap();

        assert_eq!(refs[0], DisplayReference::bare("photo.jpg"));
        assert!(matches!(&refs[1], DisplayReference::Named(NamedRecord { filename, stored: None, .. }) if filename == "b.jpg"));
        assert!(matches!(&refs[2], DisplayReference::Url(_)));
        assert_eq!(refs[3], DisplayReference::ingested("e.jpg", "1701-e.jpg", 1701));
        assert!(matches!(refs[4], DisplayReference::Unrecognized(_)));
        assert!(matches!(refs[5], DisplayReference::Unrecognized(_)));
    }

    #[test]
    fn null_filename_falls_through_to_url_record() {
        let raw = r#"{"filename": null, "url": "http://h/uploads/1-x.jpg"}"#;
        let parsed: DisplayReference = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed, DisplayReference::from_url("http://h/uploads/1-x.jpg"));
    }

    #[test]
    fn ingested_record_serializes_without_empty_fields() {
        let json = serde_json::to_value(DisplayReference::ingested("a.jpg", "9-a.jpg", 9)).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"filename": "a.jpg", "stored": "9-a.jpg", "uploadedAtMs": 9})
        );
    }

    #[rstest]
    #[case("https://studio.example/uploads/1700-c%20d.jpg", Some("1700-c d.jpg"))]
    #[case("/uploads/1700-a.jpg", Some("1700-a.jpg"))]
    #[case("https://studio.example/uploads/1700-a.jpg?download=1", Some("1700-a.jpg"))]
    #[case("https://studio.example/", None)]
    #[case("http://[::1", None)]
    fn url_basename_is_decoded_last_segment(#[case] url: &str, #[case] expected: Option<&str>) {
        let record = UrlRecord { url: url.to_owned() };
        assert_eq!(record.basename().as_deref(), expected);
    }
}
