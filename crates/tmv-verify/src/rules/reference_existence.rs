//! `reference-existence`: referring values must point at something.
//!
//! A key carrying reference tags resolves a value when any of these holds:
//!
//! 1. one of its document-reference tags matches in the model itself
//!    (ignoring the key's own value);
//! 2. one of its template-reference tags matches in the template;
//! 3. a pre-approved template key of the same name holds an equal value.
//!
//! Each unresolved value is one issue whose fix data describes where the
//! value could have been found in both documents.

use serde_json::{json, Value};

use tmv_core::key::props;
use tmv_core::{Document, Issue, Key, KeyId};

use super::{field_label, Verifier, VerifyContext};
use crate::config::CommonConfig;
use crate::reference::{get_reference_descriptions, get_references, normalise, ReferenceTag};

pub const KIND: &str = "unresolved-reference";

fn has_reference_tags(key: &Key, common: &CommonConfig) -> bool {
    ReferenceTag::of_key(key, &common.reference_prefix).next().is_some()
        || ReferenceTag::of_key(key, &common.template_reference_prefix)
            .next()
            .is_some()
}

/// Flag template keys whose template references do not resolve through a
/// document reference inside the template. Their values are allowed
/// literals for the model. Returns the number of keys flagged.
pub fn mark_pre_approved(template: &mut Document, common: &CommonConfig) -> usize {
    let doc: &Document = template;
    let flagged: Vec<KeyId> = doc
        .key_ids()
        .filter(|id| {
            let key = doc.key(*id);
            if ReferenceTag::of_key(key, &common.template_reference_prefix)
                .next()
                .is_none()
            {
                return false;
            }
            let values: Vec<&str> = doc
                .texts(doc.value_of(*id))
                .into_iter()
                .filter(|v| !v.trim().is_empty())
                .collect();
            // A key with nothing to reference approves nothing.
            !values.is_empty()
                && values.iter().all(|v| {
                    get_references(doc, &common.reference_prefix, key, v, None)
                        .iter()
                        .all(|m| m.key == *id)
                })
        })
        .collect();
    for id in &flagged {
        template
            .key_mut(*id)
            .set_property(props::TEMPLATE_PRE_APPROVED, true);
    }
    tracing::debug!(flagged = flagged.len(), "marked pre-approved template values");
    flagged.len()
}

fn is_pre_approved(template: &Document, name: &str, value: &str) -> bool {
    let wanted = normalise(value);
    template.key_ids().any(|id| {
        let key = template.key(id);
        key.name() == name
            && key.property(props::TEMPLATE_PRE_APPROVED) == Some(&Value::Bool(true))
            && template
                .texts(template.value_of(id))
                .into_iter()
                .any(|v| normalise(v) == wanted)
    })
}

#[derive(Debug)]
pub struct ReferenceExistence;

impl Verifier for ReferenceExistence {
    fn name(&self) -> &'static str {
        "reference-existence"
    }

    fn verify(
        &self,
        ctx: &VerifyContext<'_>,
        _config: &Value,
        model: &mut Document,
        template: &Document,
    ) -> Vec<Issue> {
        let common = ctx.common;
        let doc: &Document = model;
        let mut issues = Vec::new();

        for id in doc.key_ids() {
            let key = doc.key(id);
            if !has_reference_tags(key, common) {
                continue;
            }
            for value in doc.texts(doc.value_of(id)) {
                if value.trim().is_empty() {
                    continue;
                }
                let in_document = get_references(doc, &common.reference_prefix, key, value, None)
                    .iter()
                    .any(|m| m.key != id);
                if in_document
                    || !get_references(template, &common.template_reference_prefix, key, value, None)
                        .is_empty()
                    || is_pre_approved(template, key.name(), value)
                {
                    continue;
                }

                tracing::debug!(key = key.name(), value, "reference did not resolve");
                let field = field_label(doc, id);
                let context = [("field", field), ("value", value)];
                let issue = Issue::error(KIND)
                    .with_description(ctx.text(KIND, &context))
                    .with_error_data(json!({"key": key.name(), "value": value}))
                    .with_fix(
                        ctx.text(&format!("{KIND}-fix"), &context),
                        Some(json!({
                            "document": get_reference_descriptions(doc, &common.reference_prefix, key),
                            "template": get_reference_descriptions(
                                template,
                                &common.template_reference_prefix,
                                key,
                            ),
                        })),
                    );
                issues.push(ctx.locate(doc, id, issue));
            }
        }
        issues
    }
}
