//! Workflow command annotations.
//!
//! One line per issue:
//! `::error file=src/A.php,line=3,col=5::[PHPStan - rule.id] Message`.

use crate::issue::{Issue, ToolResult};

/// Escapes the message part of a workflow command.
#[must_use]
pub fn escape_data(value: &str) -> String {
    value
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

/// Escapes a `key=value` property of a workflow command.
#[must_use]
pub fn escape_property(value: &str) -> String {
    escape_data(value).replace(':', "%3A").replace(',', "%2C")
}

/// Formats the annotation for one issue reported by `tool`.
#[must_use]
pub fn annotation(tool: &str, issue: &Issue) -> String {
    let mut properties = format!(
        "file={},line={}",
        escape_property(&issue.file),
        issue.line
    );
    if let Some(column) = issue.column {
        properties.push_str(&format!(",col={column}"));
    }

    let label = issue
        .rule
        .as_ref()
        .map_or_else(|| tool.to_string(), |rule| format!("{tool} - {rule}"));

    format!(
        "::{} {properties}::{}",
        issue.severity,
        escape_data(&format!("[{label}] {}", issue.message))
    )
}

/// Annotations for every issue, in tool order then discovery order.
#[must_use]
pub fn annotations(results: &[ToolResult]) -> Vec<String> {
    results
        .iter()
        .flat_map(|result| {
            result
                .issues
                .iter()
                .map(|issue| annotation(&result.tool, issue))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::issue::Severity;

    #[test_log::test]
    fn error_with_rule_and_column() {
        let issue = Issue::new("src/A.php", Some(3), Severity::Error, "Undefined variable $x")
            .with_column(Some(5))
            .with_rule(Some("variable.undefined".to_string()));

        assert_eq!(
            annotation("PHPStan", &issue),
            "::error file=src/A.php,line=3,col=5::[PHPStan - variable.undefined] Undefined variable $x"
        );
    }

    #[test_log::test]
    fn warning_without_rule_or_column() {
        let issue = Issue::new("app.js", None, Severity::Warning, "Unexpected console");

        assert_eq!(
            annotation("ESLint", &issue),
            "::warning file=app.js,line=1::[ESLint] Unexpected console"
        );
    }

    #[test_log::test]
    fn escapes_properties_and_data() {
        let issue = Issue::new(
            "C:\\src\\a,b.php",
            Some(2),
            Severity::Error,
            "100% broken\r\nsecond line",
        );

        assert_eq!(
            annotation("Psalm", &issue),
            "::error file=C%3A\\src\\a%2Cb.php,line=2::[Psalm] 100%25 broken%0D%0Asecond line"
        );
    }

    #[test_log::test]
    fn percent_is_escaped_first() {
        assert_eq!(escape_data("%0A\n"), "%250A%0A");
        assert_eq!(escape_property("a:b,c"), "a%3Ab%2Cc");
    }
}
