//! `conditional-mandatory`: a field that must be filled in depending on
//! another field of the same row.
//!
//! ```yaml
//! conditional-mandatory:
//!   config:
//!     - {tag: tech-stack, depends-on: in-scope, depends-on-value: "Yes"}
//!     - {tag: mitigation, depends-on: threat}
//! ```
//!
//! Fields are selected by tag, or by key name when no key carries the tag.
//! With `depends-on-value`, the rule fires when the dependency equals that
//! value (case-folded, trimmed) and the field is empty. Without it, the
//! rule fires when the dependency is non-empty and the field is empty.

use serde::Deserialize;
use serde_json::{json, Value};

use tmv_core::{ConfigResult, Document, Issue, Key, KeyId};

use super::{field_label, Verifier, VerifyContext};
use crate::config::typed;
use crate::reference::normalise;

pub const KIND: &str = "missing-conditional-mandatory";

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct Condition {
    tag: String,
    depends_on: String,
    #[serde(default)]
    depends_on_value: Option<String>,
}

fn selects(key: &Key, selector: &str) -> bool {
    key.has_tag(selector) || key.name() == selector
}

fn conditions(config: &Value) -> ConfigResult<Vec<Condition>> {
    match config {
        Value::Null => Ok(Vec::new()),
        other => typed("conditional-mandatory", other),
    }
}

#[derive(Debug)]
pub struct ConditionalMandatory;

impl ConditionalMandatory {
    fn check_condition(
        ctx: &VerifyContext<'_>,
        doc: &Document,
        condition: &Condition,
        field: KeyId,
    ) -> Option<Issue> {
        if !doc.is_empty_value(doc.value_of(field)) {
            return None;
        }
        let row = doc.owner_of(field);
        let Some((dependency, dependency_value)) = doc
            .entries(row)
            .iter()
            .copied()
            .find(|(k, _)| *k != field && selects(doc.key(*k), &condition.depends_on))
        else {
            tracing::debug!(
                field = doc.key(field).name(),
                depends_on = %condition.depends_on,
                "dependency not present in row"
            );
            return None;
        };
        let actual = doc.texts(dependency_value).join("\n");
        let fires = match &condition.depends_on_value {
            Some(expected) => normalise(&actual) == normalise(expected),
            None => !doc.is_empty_value(dependency_value),
        };
        if !fires {
            return None;
        }

        let label = field_label(doc, field);
        let depends_label = field_label(doc, dependency);
        let expected = condition.depends_on_value.as_deref().unwrap_or(actual.as_str());
        let context = [
            ("field", label),
            ("depends-on", depends_label),
            ("depends-on-value", expected),
        ];
        let issue = Issue::error(KIND)
            .with_description(ctx.text(KIND, &context))
            .with_error_data(json!({
                "key": doc.key(field).name(),
                "depends-on": doc.key(dependency).name(),
                "depends-on-value": actual,
            }))
            .with_fix(ctx.text(&format!("{KIND}-fix"), &context), None);
        Some(ctx.locate(doc, field, issue))
    }
}

impl Verifier for ConditionalMandatory {
    fn name(&self) -> &'static str {
        "conditional-mandatory"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        conditions(config).map(|_| ())
    }

    fn verify(
        &self,
        ctx: &VerifyContext<'_>,
        config: &Value,
        model: &mut Document,
        _template: &Document,
    ) -> Vec<Issue> {
        let conditions = match conditions(config) {
            Ok(conditions) => conditions,
            Err(e) => {
                tracing::warn!(error = %e, "conditional-mandatory config unusable; rule skipped");
                return Vec::new();
            }
        };
        let doc: &Document = model;
        let mut issues = Vec::new();
        for condition in &conditions {
            for field in doc.key_ids().filter(|id| selects(doc.key(*id), &condition.tag)) {
                issues.extend(Self::check_condition(ctx, doc, condition, field));
            }
        }
        issues
    }
}
