//! Stylelint runner.
//!
//! Stylelint 16 writes its JSON report to stderr, earlier releases to stdout.

use serde::Deserialize;

use super::{ParseError, ToolRunner, config_path, decode, targets};
use crate::{
    issue::{Issue, RunnerConfig, Severity},
    process::CommandOutput,
    tools::Tool,
};

#[derive(Debug, Deserialize)]
struct FileResult {
    source: Option<String>,
    #[serde(default)]
    warnings: Vec<Warning>,
}

#[derive(Debug, Deserialize)]
struct Warning {
    line: Option<u32>,
    column: Option<u32>,
    rule: Option<String>,
    #[serde(default)]
    severity: String,
    text: String,
}

/// Stylelint appends ` (rule-name)` to every message.
fn strip_rule_suffix(text: &str, rule: Option<&str>) -> String {
    rule.and_then(|rule| text.strip_suffix(&format!(" ({rule})")))
        .unwrap_or(text)
        .to_string()
}

fn report_text(output: &CommandOutput) -> &str {
    let stdout = output.stdout.trim_start();
    if stdout.starts_with('[') || output.stderr.trim().is_empty() {
        &output.stdout
    } else {
        &output.stderr
    }
}

pub struct StylelintRunner;

impl ToolRunner for StylelintRunner {
    fn tool(&self) -> Tool {
        Tool::Stylelint
    }

    fn args(&self, config: &RunnerConfig) -> Vec<String> {
        let mut args = vec![
            "--formatter=json".to_string(),
            "--allow-empty-input".to_string(),
        ];

        if let Some(path) = config_path(config) {
            args.push(format!("--config={path}"));
        }

        args.extend(targets(config, "**/*.{css,scss}"));
        args
    }

    fn parse(&self, output: &CommandOutput) -> Result<Vec<Issue>, ParseError> {
        let results: Vec<FileResult> = decode(report_text(output))?;

        Ok(results
            .into_iter()
            .flat_map(|result| {
                let file = result.source.unwrap_or_default();
                result.warnings.into_iter().map(move |warning| {
                    let severity = if warning.severity.eq_ignore_ascii_case("error") {
                        Severity::Error
                    } else {
                        Severity::Warning
                    };
                    let message = strip_rule_suffix(&warning.text, warning.rule.as_deref());
                    Issue::new(file.clone(), warning.line, severity, message)
                        .with_column(warning.column)
                        .with_rule(warning.rule)
                })
            })
            .collect())
    }
}
