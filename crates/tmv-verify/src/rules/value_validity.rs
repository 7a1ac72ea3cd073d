//! `value-validity`: run the configured validators on every key tagged
//! `validate-*`.
//!
//! - An empty value on a `not-mandatory` key is skipped.
//! - Every validator failing is an ERROR (`invalid-value`).
//! - Some passing and some failing is an INFO (`valid-with-warning`).
//!
//! Validator outcomes are written to the key's `validation` property. List
//! values are validated element by element.

use serde_json::{json, Value};

use tmv_core::key::{props, tags};
use tmv_core::{Document, Issue, KeyId};

use super::{field_label, Verifier, VerifyContext};
use crate::validators::{References, ValidationOutcome, ValidatorInput};

pub const INVALID: &str = "invalid-value";
pub const WARNING: &str = "valid-with-warning";

#[derive(Debug)]
pub struct ValueValidity;

impl ValueValidity {
    fn issue_for(
        ctx: &VerifyContext<'_>,
        doc: &Document,
        id: KeyId,
        value: &str,
        outcomes: &[ValidationOutcome],
    ) -> Option<Issue> {
        let failed: Vec<&ValidationOutcome> = outcomes.iter().filter(|o| !o.result).collect();
        if failed.is_empty() {
            return None;
        }
        let (kind, base) = if failed.len() == outcomes.len() {
            (INVALID, Issue::error(INVALID))
        } else {
            (WARNING, Issue::info(WARNING))
        };
        let expected = failed
            .iter()
            .map(|o| o.description.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        let field = field_label(doc, id);
        let context = [("field", field), ("value", value), ("expected", expected.as_str())];
        let issue = base
            .with_description(ctx.text(kind, &context))
            .with_error_data(json!({"key": doc.key(id).name(), "value": value}))
            .with_fix(
                ctx.text(&format!("{kind}-fix"), &context),
                Some(json!(failed)),
            );
        Some(ctx.locate(doc, id, issue))
    }
}

impl Verifier for ValueValidity {
    fn name(&self) -> &'static str {
        "value-validity"
    }

    fn verify(
        &self,
        ctx: &VerifyContext<'_>,
        _config: &Value,
        model: &mut Document,
        template: &Document,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();
        let mut results: Vec<(KeyId, Vec<ValidationOutcome>)> = Vec::new();
        {
            let doc: &Document = model;
            let references = References {
                model: doc,
                template,
                common: ctx.common,
            };
            for id in doc.key_ids() {
                let key = doc.key(id);
                let validator_tags: Vec<&str> = key
                    .tags_with_prefix(tags::VALIDATE_PREFIX)
                    .filter(|tag| {
                        let bound = ctx.validator_specs.contains_key(*tag);
                        if !bound {
                            tracing::debug!(key = key.name(), tag, "no validator bound to tag");
                        }
                        bound
                    })
                    .collect();
                if validator_tags.is_empty() {
                    continue;
                }
                let value_node = doc.value_of(id);
                if doc.is_empty_value(value_node) && key.has_tag(tags::NOT_MANDATORY) {
                    continue;
                }

                let mut values = doc.texts(value_node);
                if values.is_empty() {
                    values.push("");
                }
                let mut all_outcomes = Vec::new();
                for value in values {
                    let input = ValidatorInput {
                        key,
                        value,
                        references,
                    };
                    let outcomes: Vec<ValidationOutcome> = validator_tags
                        .iter()
                        .map(|tag| ctx.validators.validate(ctx.validator_specs, tag, &input))
                        .collect();
                    issues.extend(Self::issue_for(ctx, doc, id, value, &outcomes));
                    all_outcomes.extend(outcomes);
                }
                results.push((id, all_outcomes));
            }
        }

        for (id, outcomes) in results {
            model
                .key_mut(id)
                .set_property(props::VALIDATION, json!(outcomes));
        }
        issues
    }
}
