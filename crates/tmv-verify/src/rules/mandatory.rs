//! `mandatory`: fields that must not be empty.
//!
//! In default mode every key in the model is mandatory unless it carries
//! one of the exception tags. Otherwise only keys tagged `mandatory` are
//! checked. Absent values, blank text and empty collections all count as
//! empty.

use serde::Deserialize;
use serde_json::{json, Value};

use tmv_core::key::tags;
use tmv_core::{ConfigResult, Document, Issue};

use super::{field_label, Verifier, VerifyContext};
use crate::config::typed;

pub const KIND: &str = "missing-mandatory";

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct MandatoryConfig {
    default: bool,
    /// Exception tags in addition to the common ones.
    exceptions: Vec<String>,
}

impl Default for MandatoryConfig {
    fn default() -> Self {
        Self {
            default: true,
            exceptions: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct Mandatory;

impl Verifier for Mandatory {
    fn name(&self) -> &'static str {
        "mandatory"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        typed::<MandatoryConfig>(self.name(), config).map(|_| ())
    }

    fn verify(
        &self,
        ctx: &VerifyContext<'_>,
        config: &Value,
        model: &mut Document,
        _template: &Document,
    ) -> Vec<Issue> {
        let config = match typed::<MandatoryConfig>(self.name(), config) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(error = %e, "mandatory config unusable; rule skipped");
                return Vec::new();
            }
        };
        let doc: &Document = model;
        let exempt = |tag: &String| {
            ctx.common.mandatory_exceptions.contains(tag) || config.exceptions.contains(tag)
        };

        doc.key_ids()
            .filter(|id| {
                let key = doc.key(*id);
                if key.tags().iter().any(&exempt) {
                    return false;
                }
                (config.default || key.has_tag(tags::MANDATORY))
                    && doc.is_empty_value(doc.value_of(*id))
            })
            .map(|id| {
                let field = field_label(doc, id);
                let issue = Issue::error(KIND)
                    .with_description(ctx.text(KIND, &[("field", field)]))
                    .with_error_data(json!({"key": doc.key(id).name()}))
                    .with_fix(ctx.text(&format!("{KIND}-fix"), &[("field", field)]), None);
                ctx.locate(doc, id, issue)
            })
            .collect()
    }
}
