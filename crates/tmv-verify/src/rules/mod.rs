//! # Verification Rules
//!
//! Each rule is a [`Verifier`] registered by name in a [`VerifierRegistry`].
//! The `verifiers` configuration lists which rules run, in which order, and
//! with which rule config. Every rule receives the same immutable
//! [`VerifyContext`] plus the working model and the template.
//!
//! Rules only add to the model: the properties they write
//! (`validation`, `covering-threats`) are diagnostics for reporting.

use std::collections::BTreeMap;
use std::fmt;

use indexmap::IndexMap;
use serde_json::Value;

use tmv_core::{get_section_for_key, ConfigResult, Document, Issue, KeyId, RowIndex};

use crate::config::{CommonConfig, ValidatorSpec};
use crate::localise::{Localise, Texts};
use crate::validators::ValidatorRegistry;

pub mod conditional_mandatory;
pub mod coverage;
pub mod mandatory;
pub mod reference_existence;
pub mod uniqueness;
pub mod value_validity;

pub use conditional_mandatory::ConditionalMandatory;
pub use coverage::AssetCoverage;
pub use mandatory::Mandatory;
pub use reference_existence::{mark_pre_approved, ReferenceExistence};
pub use uniqueness::Uniqueness;
pub use value_validity::ValueValidity;

/// Read-only state shared by every rule in one verification run.
#[derive(Debug, Clone, Copy)]
pub struct VerifyContext<'a> {
    pub common: &'a CommonConfig,
    pub texts: &'a Texts,
    pub validators: &'a ValidatorRegistry,
    pub validator_specs: &'a IndexMap<String, ValidatorSpec>,
    /// Row index of the working model.
    pub rows: &'a RowIndex,
    /// Row index of the template.
    pub template_rows: &'a RowIndex,
}

impl VerifyContext<'_> {
    /// Render the message for `kind`.
    pub fn text(&self, kind: &str, context: &[(&str, &str)]) -> String {
        self.texts.localise(kind, context)
    }

    /// An issue located at `key`: its section name and row label.
    pub fn locate(&self, doc: &Document, key: KeyId, issue: Issue) -> Issue {
        let table = get_section_for_key(doc, key).and_then(|k| doc.key(k).section());
        issue
            .with_table(table)
            .with_row(self.rows.row_label(doc, key))
    }
}

/// Display name of a field: its column header, else its key name.
pub fn field_label(doc: &Document, key: KeyId) -> &str {
    let key = doc.key(key);
    key.column_name().unwrap_or(key.name())
}

/// A model-level rule.
pub trait Verifier: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Validate the rule config when the verification is set up.
    fn check(&self, _config: &Value) -> ConfigResult<()> {
        Ok(())
    }

    fn verify(
        &self,
        ctx: &VerifyContext<'_>,
        config: &Value,
        model: &mut Document,
        template: &Document,
    ) -> Vec<Issue>;
}

/// Name → rule.
#[derive(Debug, Default)]
pub struct VerifierRegistry {
    verifiers: BTreeMap<String, Box<dyn Verifier>>,
}

impl VerifierRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// All six built-in rules.
    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Mandatory));
        registry.register(Box::new(ConditionalMandatory));
        registry.register(Box::new(Uniqueness));
        registry.register(Box::new(ReferenceExistence));
        registry.register(Box::new(ValueValidity));
        registry.register(Box::new(AssetCoverage));
        registry
    }

    pub fn register(&mut self, verifier: Box<dyn Verifier>) {
        self.verifiers.insert(verifier.name().to_string(), verifier);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Verifier> {
        self.verifiers.get(name).map(|v| v.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.verifiers.keys().map(String::as_str)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! Fixtures shared by the rule tests.

    use super::*;
    use tmv_core::{assign_key_tags, Node, TagTable};

    pub struct Fixture {
        pub common: CommonConfig,
        pub texts: Texts,
        pub validators: ValidatorRegistry,
        pub specs: IndexMap<String, ValidatorSpec>,
        pub model: Document,
        pub template: Document,
    }

    impl Fixture {
        pub fn new(model: Node, template: Node, tags: &TagTable) -> Self {
            let mut model = Document::new(model);
            let mut template = Document::new(template);
            assign_key_tags(&mut model, tags);
            assign_key_tags(&mut template, tags);
            Self {
                common: CommonConfig::default(),
                texts: Texts::builtin(),
                validators: ValidatorRegistry::with_builtins(),
                specs: IndexMap::new(),
                model,
                template,
            }
        }

        pub fn run(&mut self, rule: &dyn Verifier, config: Value) -> Vec<Issue> {
            let rows = RowIndex::build(&self.model);
            let template_rows = RowIndex::build(&self.template);
            let ctx = VerifyContext {
                common: &self.common,
                texts: &self.texts,
                validators: &self.validators,
                validator_specs: &self.specs,
                rows: &rows,
                template_rows: &template_rows,
            };
            rule.verify(&ctx, &config, &mut self.model, &self.template)
        }
    }
}
