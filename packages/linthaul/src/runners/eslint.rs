//! ESLint runner.
//!
//! ESLint severities are `1` (warn) and `2` (error).

use serde::Deserialize;

use super::{ParseError, ToolRunner, config_path, decode, targets};
use crate::{
    issue::{Issue, RunnerConfig, Severity},
    process::CommandOutput,
    tools::Tool,
};

const ERROR_SEVERITY: u8 = 2;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FileResult {
    file_path: String,
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    rule_id: Option<String>,
    #[serde(default)]
    severity: u8,
    message: String,
    line: Option<u32>,
    column: Option<u32>,
}

pub struct EslintRunner;

impl ToolRunner for EslintRunner {
    fn tool(&self) -> Tool {
        Tool::Eslint
    }

    fn args(&self, config: &RunnerConfig) -> Vec<String> {
        let mut args = vec![
            "--format=json".to_string(),
            "--no-error-on-unmatched-pattern".to_string(),
        ];

        if let Some(path) = config_path(config) {
            args.push(format!("--config={path}"));
        }

        args.extend(targets(config, "."));
        args
    }

    fn parse(&self, output: &CommandOutput) -> Result<Vec<Issue>, ParseError> {
        let results: Vec<FileResult> = decode(&output.stdout)?;

        Ok(results
            .into_iter()
            .flat_map(|result| {
                let file = result.file_path;
                result.messages.into_iter().map(move |message| {
                    let severity = if message.severity == ERROR_SEVERITY {
                        Severity::Error
                    } else {
                        Severity::Warning
                    };
                    Issue::new(file.clone(), message.line, severity, message.message)
                        .with_column(message.column)
                        .with_rule(message.rule_id)
                })
            })
            .collect())
    }
}
