//! PHPStan runner.
//!
//! Every PHPStan finding is an error; PHPStan has no warning level. Errors not
//! tied to a file (bad config, autoload failures) are reported against the
//! pseudo file `phpstan`.

use serde::Deserialize;

use super::{ParseError, ToolRunner, config_path, decode, ordered_entries, targets};
use crate::{
    issue::{Issue, RunnerConfig, Severity},
    process::CommandOutput,
    tools::Tool,
};

#[derive(Debug, Default, Deserialize)]
struct Report {
    #[serde(default, deserialize_with = "ordered_entries")]
    files: Vec<(String, FileReport)>,
    #[serde(default)]
    errors: Vec<String>,
}

#[derive(Debug, Default, Deserialize)]
struct FileReport {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message: String,
    line: Option<u32>,
    identifier: Option<String>,
}

pub struct PhpstanRunner;

impl ToolRunner for PhpstanRunner {
    fn tool(&self) -> Tool {
        Tool::Phpstan
    }

    fn args(&self, config: &RunnerConfig) -> Vec<String> {
        let mut args = vec![
            "analyse".to_string(),
            "--error-format=json".to_string(),
            "--no-progress".to_string(),
            "--no-interaction".to_string(),
        ];

        if let Some(path) = config_path(config) {
            args.push(format!("--configuration={path}"));
        }

        args.extend(targets(config, "."));
        args
    }

    fn parse(&self, output: &CommandOutput) -> Result<Vec<Issue>, ParseError> {
        let report: Report = decode(&output.stdout)?;

        let file_issues = report.files.into_iter().flat_map(|(file, report)| {
            report.messages.into_iter().map(move |message| {
                Issue::new(file.clone(), message.line, Severity::Error, message.message)
                    .with_rule(message.identifier)
            })
        });

        let general = report
            .errors
            .into_iter()
            .map(|message| Issue::new("phpstan", None, Severity::Error, message));

        Ok(file_issues.chain(general).collect())
    }
}
