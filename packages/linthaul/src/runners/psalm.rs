//! Psalm runner.

use serde::Deserialize;

use super::{ParseError, ToolRunner, config_path, decode};
use crate::{
    issue::{Issue, RunnerConfig, Severity},
    process::CommandOutput,
    tools::Tool,
};

#[derive(Debug, Deserialize)]
struct PsalmIssue {
    #[serde(default)]
    severity: String,
    line_from: Option<u32>,
    column_from: Option<u32>,
    #[serde(rename = "type")]
    kind: Option<String>,
    message: String,
    file_name: Option<String>,
    file_path: Option<String>,
}

pub struct PsalmRunner;

impl ToolRunner for PsalmRunner {
    fn tool(&self) -> Tool {
        Tool::Psalm
    }

    fn args(&self, config: &RunnerConfig) -> Vec<String> {
        let mut args = vec![
            "--output-format=json".to_string(),
            "--no-progress".to_string(),
            "--no-cache".to_string(),
        ];

        if let Some(path) = config_path(config) {
            args.push(format!("--config={path}"));
        }

        args.extend(config.files.iter().cloned());
        args
    }

    fn parse(&self, output: &CommandOutput) -> Result<Vec<Issue>, ParseError> {
        let issues: Vec<PsalmIssue> = decode(&output.stdout)?;

        Ok(issues
            .into_iter()
            .map(|issue| {
                let severity = if issue.severity.eq_ignore_ascii_case("error") {
                    Severity::Error
                } else {
                    Severity::Warning
                };
                let file = issue.file_name.or(issue.file_path).unwrap_or_default();
                Issue::new(file, issue.line_from, severity, issue.message)
                    .with_column(issue.column_from)
                    .with_rule(issue.kind)
            })
            .collect())
    }
}
