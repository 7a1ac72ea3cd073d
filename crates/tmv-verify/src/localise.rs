//! Message texts for issue descriptions.
//!
//! Texts are only used to render human-readable messages; no rule decides
//! anything based on them. Templates use `{name}` placeholders filled from
//! the context passed to [`Localise::localise`].

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Renders a message for an error-text key.
pub trait Localise {
    fn localise(&self, key: &str, context: &[(&str, &str)]) -> String;
}

/// Error-text key → message template.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Texts {
    templates: BTreeMap<String, String>,
}

const BUILTIN: &[(&str, &str)] = &[
    ("missing-mandatory", "Mandatory field '{field}' is empty"),
    ("missing-mandatory-fix", "Fill in '{field}'"),
    (
        "missing-conditional-mandatory",
        "Field '{field}' must be filled in when '{depends-on}' is '{depends-on-value}'",
    ),
    ("missing-conditional-mandatory-fix", "Fill in '{field}'"),
    ("duplicate-value", "Value '{value}' of '{field}' is not unique"),
    ("duplicate-value-fix", "Make '{value}' unique or merge the duplicate rows"),
    ("unresolved-reference", "Value '{value}' of '{field}' does not refer to an existing entry"),
    ("unresolved-reference-fix", "Use a value listed in one of the referenced columns"),
    ("invalid-value", "Value '{value}' of '{field}' is invalid"),
    ("invalid-value-fix", "Correct '{field}': {expected}"),
    ("valid-with-warning", "Value '{value}' of '{field}' passes only some checks"),
    ("valid-with-warning-fix", "Check '{field}': {expected}"),
    ("asset-not-covered", "Asset '{asset}' stored in '{storage}' is not covered by any threat"),
    ("asset-not-covered-fix", "Add a threat for '{asset}' in component '{storage}'"),
];

impl Texts {
    pub fn new() -> Self {
        Self::default()
    }

    /// The English messages for every built-in issue kind.
    pub fn builtin() -> Self {
        Self {
            templates: BUILTIN
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// `self` with entries of `overrides` replacing same-named ones.
    pub fn merged(mut self, overrides: &Texts) -> Self {
        self.templates.extend(
            overrides
                .templates
                .iter()
                .map(|(k, v)| (k.clone(), v.clone())),
        );
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, template: impl Into<String>) {
        self.templates.insert(key.into(), template.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.templates.get(key).map(String::as_str)
    }
}

impl Localise for Texts {
    fn localise(&self, key: &str, context: &[(&str, &str)]) -> String {
        match self.get(key) {
            Some(template) => context.iter().fold(template.to_string(), |acc, (name, value)| {
                acc.replace(&format!("{{{name}}}"), value)
            }),
            None => {
                if context.is_empty() {
                    key.to_string()
                } else {
                    let pairs: Vec<String> =
                        context.iter().map(|(k, v)| format!("{k}={v}")).collect();
                    format!("{key} ({})", pairs.join(", "))
                }
            }
        }
    }
}
