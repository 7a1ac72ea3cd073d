//! # Verification Pipeline
//!
//! [`Verification`] owns a checked configuration and the registries it was
//! checked against. One call to [`Verification::verify`] runs the passes in
//! their required order:
//!
//! 1. tag assignment on model and template,
//! 2. row-identifier indexing of both,
//! 3. pre-approval marking of template values,
//! 4. every enabled rule, in configured order.
//!
//! Each pass depends on the ones before it; the pipeline is the only place
//! that sequences them.

use std::path::Path;

use serde_json::Value;

use tmv_core::{
    assign_key_tags, ConfigError, ConfigResult, Document, Issue, Node, RowIndex, TmvError,
};

use crate::config::{load_config, VerifierConfig};
use crate::localise::Texts;
use crate::rules::{mark_pre_approved, VerifierRegistry, VerifyContext};
use crate::validators::ValidatorRegistry;

/// A verifier ready to run against any number of models.
#[derive(Debug)]
pub struct Verification {
    config: VerifierConfig,
    texts: Texts,
    verifiers: VerifierRegistry,
    validators: ValidatorRegistry,
}

impl Verification {
    /// Check `config` against the built-in registries.
    pub fn new(config: VerifierConfig) -> ConfigResult<Self> {
        Self::with_registries(
            config,
            VerifierRegistry::with_builtins(),
            ValidatorRegistry::with_builtins(),
        )
    }

    /// Load a configuration file and check it against the built-in
    /// registries.
    pub fn from_path(path: &Path) -> Result<Self, TmvError> {
        let config = load_config(path)?;
        Ok(Self::new(config)?)
    }

    /// Check `config` against caller-supplied registries.
    ///
    /// Every listed rule must be registered, including disabled ones. Rule
    /// configs are checked only for enabled rules. Validator bindings are
    /// checked in full.
    pub fn with_registries(
        config: VerifierConfig,
        verifiers: VerifierRegistry,
        validators: ValidatorRegistry,
    ) -> ConfigResult<Self> {
        for (name, spec) in &config.verifiers {
            let verifier = verifiers
                .get(name)
                .ok_or_else(|| ConfigError::UnknownVerifier { name: name.clone() })?;
            if spec.enabled {
                verifier.check(&spec.config)?;
            }
        }
        validators.check(&config.validators)?;

        let texts = Texts::builtin().merged(&config.texts);
        tracing::info!(
            rules = config.verifiers.values().filter(|s| s.enabled).count(),
            validators = config.validators.len(),
            "verification configured"
        );
        Ok(Self {
            config,
            texts,
            verifiers,
            validators,
        })
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Run the whole pipeline. The model and template are annotated in
    /// place; the returned issues are in rule order.
    pub fn verify(&self, model: &mut Document, template: &mut Document) -> Vec<Issue> {
        let tagged = assign_key_tags(model, &self.config.tags);
        let template_tagged = assign_key_tags(template, &self.config.tags);
        tracing::debug!(model = tagged, template = template_tagged, "assigned key tags");

        let rows = RowIndex::build(model);
        let template_rows = RowIndex::build(template);
        mark_pre_approved(template, &self.config.common);
        let template: &Document = template;

        let ctx = VerifyContext {
            common: &self.config.common,
            texts: &self.texts,
            validators: &self.validators,
            validator_specs: &self.config.validators,
            rows: &rows,
            template_rows: &template_rows,
        };

        let mut issues = Vec::new();
        for (name, spec) in &self.config.verifiers {
            if !spec.enabled {
                tracing::debug!(rule = %name, "rule disabled");
                continue;
            }
            // Registration was checked in `with_registries`.
            let Some(verifier) = self.verifiers.get(name) else {
                continue;
            };
            let found: Vec<Issue> = verifier
                .verify(&ctx, &spec.config, model, template)
                .into_iter()
                .map(|mut issue| {
                    issue.verifier = name.clone();
                    issue
                })
                .collect();
            tracing::debug!(rule = %name, issues = found.len(), "rule finished");
            issues.extend(found);
        }
        tracing::info!(issues = issues.len(), "verification finished");
        issues
    }

    /// Verify owned trees, returning the annotated model with the issues.
    pub fn verify_nodes(&self, model: Node, template: Node) -> (Document, Vec<Issue>) {
        let mut model = Document::new(model);
        let mut template = Document::new(template);
        let issues = self.verify(&mut model, &mut template);
        (model, issues)
    }

    /// Verify JSON values, as produced by the mapping engine's serializer.
    pub fn verify_json(&self, model: &Value, template: &Value) -> (Document, Vec<Issue>) {
        self.verify_nodes(Node::from_json(model.clone()), Node::from_json(template.clone()))
    }
}
