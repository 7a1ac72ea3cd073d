//! `uniqueness`: values that must not repeat.
//!
//! Keys opt in with a reference tag under the unique prefix, e.g.
//! `unique/assets-data/asset-name` to require that no other asset row has
//! the same name. The comparison `value_not_table` extends the check to
//! keys in a different data section that hold the same value.
//!
//! A duplicate set is reported once, on its first member in document
//! order; the issue lists the other members.

use std::collections::HashSet;

use serde::Deserialize;
use serde_json::{json, Value};

use tmv_core::{get_data_tag_for_key, ConfigResult, Document, Issue, KeyId};

use super::{field_label, Verifier, VerifyContext};
use crate::config::typed;
use crate::reference::{get_references, normalise, Callback, ReferenceTag};

pub const KIND: &str = "duplicate-value";

/// Same value, owned by a different data section.
pub const VALUE_NOT_TABLE: &str = "value_not_table";

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
struct UniquenessConfig {
    /// Overrides the common unique prefix.
    prefix: Option<String>,
}

#[derive(Debug)]
pub struct Uniqueness;

impl Verifier for Uniqueness {
    fn name(&self) -> &'static str {
        "uniqueness"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        typed::<UniquenessConfig>(self.name(), config).map(|_| ())
    }

    fn verify(
        &self,
        ctx: &VerifyContext<'_>,
        config: &Value,
        model: &mut Document,
        _template: &Document,
    ) -> Vec<Issue> {
        let config = typed::<UniquenessConfig>(self.name(), config).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "uniqueness config unusable; using defaults");
            UniquenessConfig::default()
        });
        let prefix = config.prefix.as_deref().unwrap_or(&ctx.common.unique_prefix);
        let doc: &Document = model;

        let mut reported: HashSet<KeyId> = HashSet::new();
        let mut issues = Vec::new();
        for id in doc.key_ids() {
            let key = doc.key(id);
            if reported.contains(&id) || ReferenceTag::of_key(key, prefix).next().is_none() {
                continue;
            }
            let own_section = get_data_tag_for_key(doc, id);
            let value_not_table: &Callback<'_> =
                &|tag: &ReferenceTag<'_>, value: &str, matched: KeyId, matched_value: &str| {
                    tag.comparison == VALUE_NOT_TABLE
                        && normalise(value) == normalise(matched_value)
                        && get_data_tag_for_key(doc, matched) != own_section
                };

            for value in doc.texts(doc.value_of(id)) {
                if value.trim().is_empty() {
                    continue;
                }
                let duplicates: Vec<KeyId> =
                    get_references(doc, prefix, key, value, Some(value_not_table))
                        .into_iter()
                        .map(|m| m.key)
                        .filter(|k| *k != id)
                        .fold(Vec::new(), |mut acc, k| {
                            if !acc.contains(&k) {
                                acc.push(k);
                            }
                            acc
                        });
                if duplicates.is_empty() {
                    continue;
                }

                let others: Vec<String> = duplicates
                    .iter()
                    .map(|k| {
                        ctx.rows
                            .row_label(doc, *k)
                            .or_else(|| doc.key_text(*k))
                            .unwrap_or_default()
                            .to_string()
                    })
                    .collect();
                let field = field_label(doc, id);
                let context = [("field", field), ("value", value)];
                let issue = Issue::error(KIND)
                    .with_description(ctx.text(KIND, &context))
                    .with_error_data(json!({"value": value, "duplicates": others}))
                    .with_fix(ctx.text(&format!("{KIND}-fix"), &context), None);
                issues.push(ctx.locate(doc, id, issue));

                reported.insert(id);
                reported.extend(duplicates);
                break;
            }
        }
        issues
    }
}
