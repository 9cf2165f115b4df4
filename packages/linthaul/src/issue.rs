//! Normalized issue model shared by every runner.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Binary severity scale every tool is mapped into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl Severity {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Error => "error",
            Self::Warning => "warning",
        }
    }

    #[must_use]
    pub const fn is_error(self) -> bool {
        matches!(self, Self::Error)
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One finding reported by an external tool.
///
/// `file` is kept exactly as the tool reported it; no normalization happens
/// across tools.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    pub file: String,
    /// 1-based. Tools that omit the line report 1.
    pub line: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<u32>,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,
}

impl Issue {
    #[must_use]
    pub fn new(
        file: impl Into<String>,
        line: Option<u32>,
        severity: Severity,
        message: impl Into<String>,
    ) -> Self {
        Self {
            file: file.into(),
            line: line.filter(|x| *x > 0).unwrap_or(1),
            column: None,
            severity,
            message: message.into(),
            rule: None,
        }
    }

    #[must_use]
    pub fn with_column(mut self, column: Option<u32>) -> Self {
        self.column = column.filter(|x| *x > 0);
        self
    }

    #[must_use]
    pub fn with_rule(mut self, rule: Option<String>) -> Self {
        self.rule = rule.filter(|x| !x.is_empty());
        self
    }
}

/// Outcome of running one tool once.
///
/// `success` mirrors the process exit code only. A tool may exit 0 while
/// reporting issues, or fail without reporting any.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResult {
    pub tool: String,
    pub success: bool,
    pub issues: Vec<Issue>,
    pub raw_output: String,
}

impl ToolResult {
    /// Result for a tool that had nothing to check.
    #[must_use]
    pub fn empty(tool: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: true,
            issues: vec![],
            raw_output: String::new(),
        }
    }

    /// Result for a tool whose process could not run to completion.
    #[must_use]
    pub fn failed(tool: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            tool: tool.into(),
            success: false,
            issues: vec![],
            raw_output: error.into(),
        }
    }

    #[must_use]
    pub fn error_count(&self) -> usize {
        self.issues.iter().filter(|x| x.severity.is_error()).count()
    }

    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.issues.len() - self.error_count()
    }
}

/// Input for a single tool invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerConfig {
    pub config_path: Option<PathBuf>,
    pub files: Vec<String>,
    pub working_directory: PathBuf,
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn issue_line_defaults_to_one() {
        assert_eq!(Issue::new("a.php", None, Severity::Error, "x").line, 1);
        assert_eq!(Issue::new("a.php", Some(0), Severity::Error, "x").line, 1);
        assert_eq!(Issue::new("a.php", Some(12), Severity::Error, "x").line, 12);
    }

    #[test_log::test]
    fn empty_rule_is_dropped() {
        let issue =
            Issue::new("a.php", Some(3), Severity::Warning, "x").with_rule(Some(String::new()));
        assert_eq!(issue.rule, None);
    }

    #[test_log::test]
    fn issue_serializes_without_absent_fields() {
        let issue = Issue::new("a.php", Some(3), Severity::Warning, "msg");
        let json = serde_json::to_value(&issue).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "file": "a.php",
                "line": 3,
                "severity": "warning",
                "message": "msg",
            })
        );
    }

    #[test_log::test]
    fn counts_split_by_severity() {
        let result = ToolResult {
            tool: "PHPStan".to_string(),
            success: true,
            issues: vec![
                Issue::new("a.php", Some(1), Severity::Error, "a"),
                Issue::new("a.php", Some(2), Severity::Warning, "b"),
                Issue::new("b.php", Some(3), Severity::Error, "c"),
            ],
            raw_output: String::new(),
        };

        assert_eq!(result.error_count(), 2);
        assert_eq!(result.warning_count(), 1);
    }
}
