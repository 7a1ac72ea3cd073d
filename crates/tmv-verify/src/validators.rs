//! # Validator Dispatch
//!
//! A validator is a pure predicate over one value. Keys opt in through
//! `validate-*` tags; the `validators` configuration binds each such tag to
//! a registered validator name plus its config:
//!
//! ```yaml
//! validators:
//!   validate-date:     {validator: date, config: {formats: ["%d.%m.%Y"]}}
//!   validate-threat-id: {validator: regex, config: {pattern: "^T\\d+$"}}
//! ```
//!
//! [`ValidatorRegistry::validate`] never fails: an unbound tag or an
//! unregistered validator yields an outcome with `result: false` and an
//! `error` explaining the miss, without calling anything.
//!
//! ## Built-ins
//!
//! | Name | Config | Passes when |
//! |------|--------|-------------|
//! | `date` | `formats` | the value parses with one of the formats |
//! | `regex` | `pattern` | the pattern matches |
//! | `string-method` | `method`, `argument?` | the string predicate holds |
//! | `template-match` | `tag` | a template value under `tag` equals it |
//! | `exists` | `data-tag`, `field-tag`, `document?` | it appears in that column |

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tmv_core::{
    find_key_with_tag, find_keys_with_tag, ConfigError, ConfigResult, Document, Key, PatternCache,
};

use crate::config::{typed, CommonConfig, ValidatorSpec};
use crate::reference::normalise;

/// Read-only documents a validator may consult.
#[derive(Debug, Clone, Copy)]
pub struct References<'a> {
    pub model: &'a Document,
    pub template: &'a Document,
    pub common: &'a CommonConfig,
}

/// The value under test.
#[derive(Debug, Clone, Copy)]
pub struct ValidatorInput<'a> {
    pub key: &'a Key,
    pub value: &'a str,
    pub references: References<'a>,
}

/// A value-level predicate.
pub trait Validator: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    /// Where the implementation lives, reported in outcomes.
    fn module(&self) -> &'static str {
        module_path!()
    }

    fn check(&self, _config: &Value) -> ConfigResult<()> {
        Ok(())
    }

    fn validate(&self, config: &Value, input: &ValidatorInput<'_>) -> bool;
}

/// Result of one validator invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub struct ValidationOutcome {
    pub result: bool,
    pub validator_name: String,
    pub validator_module: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidationOutcome {
    fn miss(validator_name: &str, error: String) -> Self {
        Self {
            result: false,
            validator_name: validator_name.to_string(),
            validator_module: String::new(),
            description: String::new(),
            error: Some(error),
        }
    }
}

/// Name → validator.
#[derive(Debug, Default)]
pub struct ValidatorRegistry {
    validators: BTreeMap<String, Box<dyn Validator>>,
}

impl ValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_builtins() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(DateValidator));
        registry.register(Box::new(RegexValidator::default()));
        registry.register(Box::new(StringMethodValidator));
        registry.register(Box::new(TemplateMatchValidator));
        registry.register(Box::new(ExistsValidator));
        registry
    }

    pub fn register(&mut self, validator: Box<dyn Validator>) {
        self.validators
            .insert(validator.name().to_string(), validator);
    }

    pub fn get(&self, name: &str) -> Option<&dyn Validator> {
        self.validators.get(name).map(|v| v.as_ref())
    }

    /// Check every binding in `specs` against the registry.
    pub fn check(&self, specs: &IndexMap<String, ValidatorSpec>) -> ConfigResult<()> {
        for (tag, spec) in specs {
            let validator = self
                .get(&spec.validator)
                .ok_or_else(|| ConfigError::UnknownValidator {
                    tag: tag.clone(),
                    validator: spec.validator.clone(),
                })?;
            validator.check(&spec.config)?;
        }
        Ok(())
    }

    /// Run the validator bound to `validator_tag`.
    pub fn validate(
        &self,
        specs: &IndexMap<String, ValidatorSpec>,
        validator_tag: &str,
        input: &ValidatorInput<'_>,
    ) -> ValidationOutcome {
        let Some(spec) = specs.get(validator_tag) else {
            return ValidationOutcome::miss(
                "",
                format!("no validator configured for tag {validator_tag:?}"),
            );
        };
        let Some(validator) = self.get(&spec.validator) else {
            return ValidationOutcome::miss(
                &spec.validator,
                format!("validator {:?} is not registered", spec.validator),
            );
        };
        let result = validator.validate(&spec.config, input);
        tracing::debug!(
            tag = validator_tag,
            validator = validator.name(),
            key = input.key.name(),
            result,
            "validated value"
        );
        ValidationOutcome {
            result,
            validator_name: validator.name().to_string(),
            validator_module: validator.module().to_string(),
            description: spec
                .description
                .clone()
                .unwrap_or_else(|| validator.name().to_string()),
            error: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Built-ins
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DateConfig {
    formats: Vec<String>,
}

impl Default for DateConfig {
    fn default() -> Self {
        Self {
            formats: vec!["%Y-%m-%d".to_string(), "%d.%m.%Y".to_string(), "%d/%m/%Y".to_string()],
        }
    }
}

/// Parseable as a calendar date.
#[derive(Debug)]
pub struct DateValidator;

impl Validator for DateValidator {
    fn name(&self) -> &'static str {
        "date"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        typed::<DateConfig>(self.name(), config).map(|_| ())
    }

    fn validate(&self, config: &Value, input: &ValidatorInput<'_>) -> bool {
        let Ok(config) = typed::<DateConfig>(self.name(), config) else {
            return false;
        };
        let value = input.value.trim();
        config
            .formats
            .iter()
            .any(|format| NaiveDate::parse_from_str(value, format).is_ok())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct PatternConfig {
    pattern: String,
}

impl PatternConfig {
    fn compile(&self, context: &str, patterns: &PatternCache) -> ConfigResult<Regex> {
        patterns.get(&self.pattern).map_err(|source| ConfigError::Pattern {
            context: context.to_string(),
            pattern: self.pattern.clone(),
            source,
        })
    }
}

/// Matches a regular expression. Patterns compile when the binding is
/// checked and are reused for every value.
#[derive(Debug, Default)]
pub struct RegexValidator {
    patterns: PatternCache,
}

impl Validator for RegexValidator {
    fn name(&self) -> &'static str {
        "regex"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        typed::<PatternConfig>(self.name(), config)?
            .compile(self.name(), &self.patterns)
            .map(|_| ())
    }

    fn validate(&self, config: &Value, input: &ValidatorInput<'_>) -> bool {
        typed::<PatternConfig>(self.name(), config)
            .and_then(|c| c.compile(self.name(), &self.patterns))
            .map(|re| re.is_match(input.value))
            .unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "kebab-case")]
enum StringMethod {
    IsNumeric,
    IsAlphabetic,
    IsAlphanumeric,
    IsLowercase,
    IsUppercase,
    IsAscii,
    StartsWith,
    EndsWith,
    Contains,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct StringMethodConfig {
    method: StringMethod,
    #[serde(default)]
    argument: Option<String>,
}

impl StringMethodConfig {
    fn parse(config: &Value) -> ConfigResult<Self> {
        let parsed: Self = typed("string-method", config)?;
        let needs_argument = matches!(
            parsed.method,
            StringMethod::StartsWith | StringMethod::EndsWith | StringMethod::Contains
        );
        if needs_argument && parsed.argument.is_none() {
            return Err(ConfigError::MissingKey {
                context: "string-method".to_string(),
                key: "argument".to_string(),
            });
        }
        Ok(parsed)
    }

    fn holds(&self, value: &str) -> bool {
        let argument = self.argument.as_deref().unwrap_or_default();
        let non_empty = !value.is_empty();
        match self.method {
            StringMethod::IsNumeric => non_empty && value.chars().all(char::is_numeric),
            StringMethod::IsAlphabetic => non_empty && value.chars().all(char::is_alphabetic),
            StringMethod::IsAlphanumeric => non_empty && value.chars().all(char::is_alphanumeric),
            StringMethod::IsLowercase => {
                value.chars().any(char::is_alphabetic) && !value.chars().any(char::is_uppercase)
            }
            StringMethod::IsUppercase => {
                value.chars().any(char::is_alphabetic) && !value.chars().any(char::is_lowercase)
            }
            StringMethod::IsAscii => value.is_ascii(),
            StringMethod::StartsWith => value.starts_with(argument),
            StringMethod::EndsWith => value.ends_with(argument),
            StringMethod::Contains => value.contains(argument),
        }
    }
}

/// A string predicate such as `is-numeric` or `starts-with`.
#[derive(Debug)]
pub struct StringMethodValidator;

impl Validator for StringMethodValidator {
    fn name(&self) -> &'static str {
        "string-method"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        StringMethodConfig::parse(config).map(|_| ())
    }

    fn validate(&self, config: &Value, input: &ValidatorInput<'_>) -> bool {
        StringMethodConfig::parse(config)
            .map(|c| c.holds(input.value.trim()))
            .unwrap_or(false)
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct TemplateMatchConfig {
    tag: String,
}

/// Equal to a template value under the configured tag.
#[derive(Debug)]
pub struct TemplateMatchValidator;

impl Validator for TemplateMatchValidator {
    fn name(&self) -> &'static str {
        "template-match"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        typed::<TemplateMatchConfig>(self.name(), config).map(|_| ())
    }

    fn validate(&self, config: &Value, input: &ValidatorInput<'_>) -> bool {
        let Ok(config) = typed::<TemplateMatchConfig>(self.name(), config) else {
            return false;
        };
        let template = input.references.template;
        let wanted = normalise(input.value);
        find_keys_with_tag(template, template.root(), &config.tag)
            .into_iter()
            .flat_map(|(_, value)| template.texts(value))
            .any(|candidate| normalise(candidate) == wanted)
    }
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Source {
    #[default]
    Model,
    Template,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
struct ExistsConfig {
    data_tag: String,
    field_tag: String,
    #[serde(default)]
    document: Source,
}

/// Present in a column of a section.
#[derive(Debug)]
pub struct ExistsValidator;

impl Validator for ExistsValidator {
    fn name(&self) -> &'static str {
        "exists"
    }

    fn check(&self, config: &Value) -> ConfigResult<()> {
        typed::<ExistsConfig>(self.name(), config).map(|_| ())
    }

    fn validate(&self, config: &Value, input: &ValidatorInput<'_>) -> bool {
        let Ok(config) = typed::<ExistsConfig>(self.name(), config) else {
            return false;
        };
        let doc = match config.document {
            Source::Model => input.references.model,
            Source::Template => input.references.template,
        };
        let Some((_, section)) = find_key_with_tag(doc, doc.root(), &config.data_tag) else {
            return false;
        };
        let wanted = normalise(input.value);
        find_keys_with_tag(doc, section, &config.field_tag)
            .into_iter()
            .flat_map(|(_, value)| doc.texts(value))
            .any(|candidate| normalise(candidate) == wanted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tmv_core::{assign_key_tags, Node, TagTable};

    fn docs() -> (Document, Document) {
        let table = TagTable::new()
            .with("assets", ["assets-data"])
            .with("name", ["asset-name"])
            .with("classification", ["classification"]);
        let mut model = Document::new(Node::from_json(json!({
            "assets": [{"name": "DB"}, {"name": "Keys"}]
        })));
        let mut template = Document::new(Node::from_json(json!({
            "levels": [{"classification": "Confidential"}, {"classification": "Public"}]
        })));
        assign_key_tags(&mut model, &table);
        assign_key_tags(&mut template, &table);
        (model, template)
    }

    fn specs(yaml: &str) -> IndexMap<String, ValidatorSpec> {
        serde_yaml::from_str(yaml).unwrap()
    }

    fn run(spec_yaml: &str, tag: &str, value: &str) -> ValidationOutcome {
        let (model, template) = docs();
        let common = CommonConfig::default();
        let key = Key::new("field");
        let input = ValidatorInput {
            key: &key,
            value,
            references: References {
                model: &model,
                template: &template,
                common: &common,
            },
        };
        ValidatorRegistry::with_builtins().validate(&specs(spec_yaml), tag, &input)
    }

    #[test]
    fn date_formats() {
        let spec = "validate-date: {validator: date, config: {formats: ['%d.%m.%Y']}}";
        assert!(run(spec, "validate-date", "31.12.2024").result);
        assert!(!run(spec, "validate-date", "2024-12-31").result);
        assert!(run("validate-date: {validator: date}", "validate-date", "2024-12-31").result);
    }

    #[test]
    fn regex_and_description() {
        let spec = "validate-id: {validator: regex, config: {pattern: '^T\\d+$'}, description: 'T followed by digits'}";
        let ok = run(spec, "validate-id", "T12");
        assert!(ok.result);
        assert_eq!(ok.description, "T followed by digits");
        assert_eq!(ok.validator_name, "regex");
        assert!(ok.validator_module.ends_with("validators"));
        assert!(!run(spec, "validate-id", "X1").result);
    }

    #[test]
    fn regex_pattern_compiles_once() {
        let (model, template) = docs();
        let common = CommonConfig::default();
        let key = Key::new("field");
        let input = |value: &'static str| ValidatorInput {
            key: &key,
            value,
            references: References {
                model: &model,
                template: &template,
                common: &common,
            },
        };
        let validator = RegexValidator::default();
        let config = json!({"pattern": "^T\\d+$"});
        validator.check(&config).unwrap();
        assert!(validator.validate(&config, &input("T1")));
        assert!(!validator.validate(&config, &input("X")));
        assert_eq!(validator.patterns.len(), 1);
    }

    #[test]
    fn string_methods() {
        let numeric = "v: {validator: string-method, config: {method: is-numeric}}";
        assert!(run(numeric, "v", "123").result);
        assert!(!run(numeric, "v", "").result);
        let starts = "v: {validator: string-method, config: {method: starts-with, argument: 'T'}}";
        assert!(run(starts, "v", "T1").result);
        assert!(!run(starts, "v", "A1").result);
    }

    #[test]
    fn template_match_and_exists() {
        let tm = "v: {validator: template-match, config: {tag: classification}}";
        assert!(run(tm, "v", " confidential ").result);
        assert!(!run(tm, "v", "Secret").result);

        let ex = "v: {validator: exists, config: {data-tag: assets-data, field-tag: asset-name}}";
        assert!(run(ex, "v", "keys").result);
        assert!(!run(ex, "v", "Vault").result);
    }

    #[test]
    fn lookup_misses_are_structured() {
        let unbound = run("{}", "validate-x", "1");
        assert!(!unbound.result);
        assert!(unbound.error.unwrap().contains("validate-x"));

        let unregistered = run("validate-x: {validator: nope}", "validate-x", "1");
        assert!(!unregistered.result);
        assert_eq!(unregistered.validator_name, "nope");
        assert!(unregistered.error.is_some());
    }

    #[test]
    fn eager_check() {
        let registry = ValidatorRegistry::with_builtins();
        assert!(registry.check(&specs("a: {validator: date}")).is_ok());
        assert!(matches!(
            registry.check(&specs("a: {validator: nope}")),
            Err(ConfigError::UnknownValidator { .. })
        ));
        assert!(matches!(
            registry.check(&specs("a: {validator: regex, config: {pattern: '('}}")),
            Err(ConfigError::Pattern { .. })
        ));
        assert!(matches!(
            registry.check(&specs("a: {validator: string-method, config: {method: contains}}")),
            Err(ConfigError::MissingKey { .. })
        ));
        assert!(registry.check(&specs("a: {validator: regex}")).is_err());
    }
}
