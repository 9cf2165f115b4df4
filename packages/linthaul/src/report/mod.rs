//! Turns tool results into CI annotations, a markdown summary and a JSON
//! report. Nothing here mutates its input.

pub mod annotations;

use serde::{Serialize, Serializer, ser::SerializeMap as _};

use crate::issue::{Issue, ToolResult};

pub use annotations::{annotation, annotations, escape_data, escape_property};

/// Sum of issue counts over every result.
#[must_use]
pub fn total_issues(results: &[ToolResult]) -> usize {
    results.iter().map(|x| x.issues.len()).sum()
}

/// Markdown table with one row per tool and a totals row.
#[must_use]
pub fn summary_markdown(results: &[ToolResult]) -> String {
    let mut out = String::from("## Lint Results\n\n");
    out.push_str("| Tool | Status | Issues |\n");
    out.push_str("|------|--------|--------|\n");

    for result in results {
        let status = if result.success {
            "✅ PASS"
        } else {
            "❌ FAIL"
        };
        out.push_str(&format!(
            "| {} | {status} | {} |\n",
            result.tool,
            result.issues.len()
        ));
    }

    out.push_str(&format!(
        "| **Total** | | **{}** |\n",
        total_issues(results)
    ));
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ToolReport<'a> {
    success: bool,
    issue_count: usize,
    errors: usize,
    warnings: usize,
    issues: &'a [Issue],
}

/// Serializes results as a map keyed by tool name, keeping invocation order.
struct ToolReports<'a>(&'a [ToolResult]);

impl Serialize for ToolReports<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for result in self.0 {
            map.serialize_entry(
                &result.tool,
                &ToolReport {
                    success: result.success,
                    issue_count: result.issues.len(),
                    errors: result.error_count(),
                    warnings: result.warning_count(),
                    issues: &result.issues,
                },
            )?;
        }
        map.end()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Report<'a> {
    total_issues: usize,
    tools: ToolReports<'a>,
}

/// Machine-readable report:
/// `{"totalIssues": n, "tools": {name: {success, issueCount, errors, warnings, issues}}}`.
///
/// # Errors
///
/// * If serialization fails
pub fn json_report(results: &[ToolResult]) -> Result<String, serde_json::Error> {
    serde_json::to_string(&Report {
        total_issues: total_issues(results),
        tools: ToolReports(results),
    })
}
