//! # Reference Resolver
//!
//! A reference tag has the form `prefix/data-tag/field-tag[/comparison]`:
//!
//! - `prefix` selects the family (`ref`, `template-ref`, `unique`, ...).
//! - `data-tag` names the section (a key tagged `*-data`) to search.
//! - `field-tag` names the column within that section.
//! - `comparison` is `equals` (default, case-folded and trimmed),
//!   `endswith` (the referring value ends with the matched value), or any
//!   other name, which is handed to a caller-supplied [`Callback`].
//!
//! A referring key may belong to a different document than the one being
//! searched (model keys are resolved against the template), so the
//! referring side is passed as a [`Key`] and a value, not as handles.

use serde::Serialize;

use tmv_core::{find_key_with_tag, find_keys_with_tag, get_data_tag_for_key};
use tmv_core::{Document, Key, KeyId, NodeId};

pub const EQUALS: &str = "equals";
pub const ENDSWITH: &str = "endswith";

/// Custom comparison: `(tag, value, matched key, matched value) -> bool`.
/// Configuration is captured by the closure.
pub type Callback<'c> = dyn Fn(&ReferenceTag<'_>, &str, KeyId, &str) -> bool + 'c;

/// A parsed reference tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReferenceTag<'a> {
    /// The full tag string.
    pub tag: &'a str,
    pub prefix: &'a str,
    pub data_tag: &'a str,
    pub field_tag: &'a str,
    pub comparison: &'a str,
}

impl<'a> ReferenceTag<'a> {
    /// Parse a 3 or 4 segment tag. Anything else is not a reference tag.
    pub fn parse(tag: &'a str) -> Option<Self> {
        let parts: Vec<&str> = tag.split('/').collect();
        let (prefix, data_tag, field_tag, comparison) = match parts.as_slice() {
            [p, d, f] => (*p, *d, *f, EQUALS),
            [p, d, f, c] => (*p, *d, *f, *c),
            _ => return None,
        };
        if [prefix, data_tag, field_tag, comparison]
            .iter()
            .any(|s| s.is_empty())
        {
            return None;
        }
        Some(Self {
            tag,
            prefix,
            data_tag,
            field_tag,
            comparison,
        })
    }

    /// Reference tags on `key` belonging to `prefix`.
    pub fn of_key(key: &'a Key, prefix: &'a str) -> impl Iterator<Item = ReferenceTag<'a>> + 'a {
        key.tags()
            .iter()
            .filter_map(|t| ReferenceTag::parse(t))
            .filter(move |r| r.prefix == prefix)
    }

    pub fn is_builtin_comparison(&self) -> bool {
        self.comparison == EQUALS || self.comparison == ENDSWITH
    }
}

/// Case-folded, trimmed form used by every text comparison.
pub fn normalise(value: &str) -> String {
    value.trim().to_lowercase()
}

/// A resolved reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceMatch {
    pub tag: String,
    pub key: KeyId,
    pub value: String,
}

/// Where a reference tag points, for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ReferenceDescription {
    pub table: String,
    pub column: String,
    pub match_type: String,
}

/// Apply the tag's comparison to one candidate.
pub fn check_tag_comparison(
    tag: &ReferenceTag<'_>,
    value: &str,
    matched_key: KeyId,
    matched_value: &str,
    callback: Option<&Callback<'_>>,
) -> bool {
    match tag.comparison {
        EQUALS => normalise(value) == normalise(matched_value),
        ENDSWITH => {
            let suffix = normalise(matched_value);
            !suffix.is_empty() && normalise(value).ends_with(&suffix)
        }
        other => match callback {
            Some(callback) => callback(tag, value, matched_key, matched_value),
            None => {
                tracing::debug!(tag = tag.tag, comparison = other, "no callback for comparison");
                false
            }
        },
    }
}

/// Every `(tag, key, value)` in `doc` that `key`'s `prefix` tags resolve
/// to for `value`. Duplicates are dropped.
pub fn get_references(
    doc: &Document,
    prefix: &str,
    key: &Key,
    value: &str,
    callback: Option<&Callback<'_>>,
) -> Vec<ReferenceMatch> {
    let mut found: Vec<ReferenceMatch> = Vec::new();
    for tag in ReferenceTag::of_key(key, prefix) {
        let Some((_, section)) = find_key_with_tag(doc, doc.root(), tag.data_tag) else {
            tracing::debug!(tag = tag.tag, key = key.name(), "referenced section not found");
            continue;
        };
        for (field, field_value) in find_keys_with_tag(doc, section, tag.field_tag) {
            for candidate in doc.texts(field_value) {
                if !check_tag_comparison(&tag, value, field, candidate, callback) {
                    continue;
                }
                let hit = ReferenceMatch {
                    tag: tag.tag.to_string(),
                    key: field,
                    value: candidate.to_string(),
                };
                if !found.contains(&hit) {
                    found.push(hit);
                }
            }
        }
    }
    found
}

/// The first of `key`'s `prefix` tags that resolves within `row`.
///
/// The row must belong to the section the tag names. With `only_callback`
/// set, tags using a built-in comparison are ignored.
pub fn check_reference_row(
    doc: &Document,
    row: NodeId,
    prefix: &str,
    key: &Key,
    value: &str,
    callback: Option<&Callback<'_>>,
    only_callback: bool,
) -> Option<String> {
    let row_data_tag = doc
        .entries(row)
        .first()
        .and_then(|(k, _)| get_data_tag_for_key(doc, *k));
    ReferenceTag::of_key(key, prefix)
        .filter(|tag| !(only_callback && tag.is_builtin_comparison()))
        .filter(|tag| row_data_tag == Some(tag.data_tag))
        .find(|tag| {
            find_keys_with_tag(doc, row, tag.field_tag)
                .into_iter()
                .any(|(field, field_value)| {
                    doc.texts(field_value)
                        .into_iter()
                        .any(|candidate| check_tag_comparison(tag, value, field, candidate, callback))
                })
        })
        .map(|tag| tag.tag.to_string())
}

/// Human-readable targets of `key`'s `prefix` tags, resolved in `doc` as
/// far as possible.
pub fn get_reference_descriptions(doc: &Document, prefix: &str, key: &Key) -> Vec<ReferenceDescription> {
    ReferenceTag::of_key(key, prefix)
        .map(|tag| {
            let section = find_key_with_tag(doc, doc.root(), tag.data_tag);
            let table = section
                .map(|(k, _)| {
                    let key = doc.key(k);
                    key.section().unwrap_or(key.name()).to_string()
                })
                .unwrap_or_else(|| tag.data_tag.to_string());
            let column = section
                .and_then(|(_, value)| find_key_with_tag(doc, value, tag.field_tag))
                .map(|(k, _)| {
                    let key = doc.key(k);
                    key.column_name().unwrap_or(key.name()).to_string()
                })
                .unwrap_or_else(|| tag.field_tag.to_string());
            ReferenceDescription {
                table,
                column,
                match_type: tag.comparison.to_string(),
            }
        })
        .collect()
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn normalise_is_idempotent(value in "[ \\ta-zA-Z0-9-]{0,24}") {
            let once = normalise(&value);
            prop_assert_eq!(normalise(&once), once.clone());
            prop_assert_eq!(once.trim(), once.as_str());
        }

        #[test]
        fn tags_with_three_or_four_segments_parse(
            segments in prop::collection::vec("[a-z-]{1,8}", 1..7),
        ) {
            let tag = segments.join("/");
            let parsed = ReferenceTag::parse(&tag);
            prop_assert_eq!(parsed.is_some(), segments.len() == 3 || segments.len() == 4);
            if let Some(parsed) = parsed {
                prop_assert_eq!(parsed.prefix, segments[0].as_str());
                prop_assert_eq!(parsed.is_builtin_comparison(), segments.len() == 3 || segments[3] == EQUALS || segments[3] == ENDSWITH);
            }
        }
    }
}
