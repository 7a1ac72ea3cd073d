//! # Issues: Structured Verification Findings
//!
//! Every rule reports through [`Issue`]. The serialized form uses the
//! kebab-case field names consumed by report formatters
//! (`table-row`, `error-description`, `fix-data`, ...).

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Severity of an [`Issue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueType {
    Error,
    Warning,
    Info,
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "ERROR"),
            Self::Warning => write!(f, "WARNING"),
            Self::Info => write!(f, "INFO"),
        }
    }
}

/// A finding emitted by a verifier rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Issue {
    #[serde(rename = "type")]
    pub issue_type: IssueType,
    /// Error-text key identifying the kind of finding.
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_row: Option<String>,
    pub error_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_data: Option<Value>,
    /// Name of the rule that produced the issue. Stamped by the dispatcher.
    #[serde(default)]
    pub verifier: String,
}

impl Issue {
    pub fn new(issue_type: IssueType, kind: impl Into<String>) -> Self {
        Self {
            issue_type,
            kind: kind.into(),
            table: None,
            table_row: None,
            error_description: String::new(),
            error_data: None,
            fix_description: None,
            fix_data: None,
            verifier: String::new(),
        }
    }

    pub fn error(kind: impl Into<String>) -> Self {
        Self::new(IssueType::Error, kind)
    }

    pub fn info(kind: impl Into<String>) -> Self {
        Self::new(IssueType::Info, kind)
    }

    pub fn with_table(mut self, table: Option<&str>) -> Self {
        self.table = table.map(str::to_string);
        self
    }

    pub fn with_row(mut self, row: Option<&str>) -> Self {
        self.table_row = row.map(str::to_string);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.error_description = description.into();
        self
    }

    pub fn with_error_data(mut self, data: Value) -> Self {
        self.error_data = Some(data);
        self
    }

    pub fn with_fix(mut self, description: impl Into<String>, data: Option<Value>) -> Self {
        self.fix_description = Some(description.into());
        self.fix_data = data;
        self
    }
}

/// Issue counts by severity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IssueSummary {
    pub errors: usize,
    pub warnings: usize,
    pub infos: usize,
}

impl IssueSummary {
    pub fn of(issues: &[Issue]) -> Self {
        issues.iter().fold(Self::default(), |mut acc, issue| {
            match issue.issue_type {
                IssueType::Error => acc.errors += 1,
                IssueType::Warning => acc.warnings += 1,
                IssueType::Info => acc.infos += 1,
            }
            acc
        })
    }

    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_kebab_case_fields() {
        let issue = Issue::error("missing-mandatory")
            .with_table(Some("Assets"))
            .with_row(Some("DB"))
            .with_description("Field is empty")
            .with_error_data(json!({"key": "storage"}));
        let v = serde_json::to_value(&issue).unwrap();
        assert_eq!(v["type"], "ERROR");
        assert_eq!(v["table-row"], "DB");
        assert_eq!(v["error-description"], "Field is empty");
        assert!(v.get("fix-description").is_none());
    }

    #[test]
    fn deserializes_back() {
        let issue = Issue::info("valid-with-warning").with_fix("Check", Some(json!(["a"])));
        let text = serde_json::to_string(&issue).unwrap();
        let back: Issue = serde_json::from_str(&text).unwrap();
        assert_eq!(back, issue);
    }

    #[test]
    fn summary_counts_by_type() {
        let issues = vec![
            Issue::error("a"),
            Issue::error("b"),
            Issue::info("c"),
            Issue::new(IssueType::Warning, "d"),
        ];
        let summary = IssueSummary::of(&issues);
        assert_eq!(summary, IssueSummary { errors: 2, warnings: 1, infos: 1 });
        assert!(summary.has_errors());
        assert!(!IssueSummary::of(&[]).has_errors());
    }
}
