//! Rector runner.
//!
//! Rector suggests refactorings rather than reporting defects, so every
//! suggestion is a warning. When the JSON report cannot be read (older Rector
//! releases, crashes mid-output) the console listing is scraped for file
//! paths instead.

use std::{collections::BTreeSet, sync::LazyLock};

use regex::Regex;
use serde::Deserialize;

use super::{ParseError, ToolRunner, config_path, decode, targets};
use crate::{
    issue::{Issue, RunnerConfig, Severity},
    process::CommandOutput,
    tools::Tool,
};

/// First hunk header of a unified diff: `@@ -12,7 +12,9 @@`.
static HUNK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@@ -(\d+)(?:,\d+)? \+\d+").expect("valid regex"));

/// A changed-file entry in Rector's console listing: `1) src/Foo.php:12`.
static LISTED_FILE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*\d+\)\s+(\S+\.php)(?::(\d+))?").expect("valid regex")
});

#[derive(Debug, Default, Deserialize)]
struct Report {
    #[serde(default)]
    file_diffs: Vec<FileDiff>,
    #[serde(default)]
    errors: Vec<ReportError>,
}

#[derive(Debug, Deserialize)]
struct FileDiff {
    file: String,
    #[serde(default)]
    diff: String,
    #[serde(default)]
    applied_rectors: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ReportError {
    message: String,
    file: Option<String>,
    line: Option<u32>,
}

/// `Rector\Php80\Rector\Class_\ClassPropertyAssignToConstructorPromotionRector`
/// becomes `ClassPropertyAssignToConstructorPromotionRector`.
fn short_rector_name(name: &str) -> &str {
    name.rsplit('\\').next().unwrap_or(name)
}

fn first_changed_line(diff: &str) -> Option<u32> {
    HUNK_START
        .captures(diff)
        .and_then(|x| x.get(1))
        .and_then(|x| x.as_str().parse().ok())
}

pub struct RectorRunner;

impl ToolRunner for RectorRunner {
    fn tool(&self) -> Tool {
        Tool::Rector
    }

    fn args(&self, config: &RunnerConfig) -> Vec<String> {
        let mut args = vec![
            "process".to_string(),
            "--dry-run".to_string(),
            "--output-format=json".to_string(),
            "--no-progress-bar".to_string(),
        ];

        if let Some(path) = config_path(config) {
            args.push(format!("--config={path}"));
        }

        args.extend(targets(config, "."));
        args
    }

    fn parse(&self, output: &CommandOutput) -> Result<Vec<Issue>, ParseError> {
        let report: Report = decode(&output.stdout)?;

        let suggestions = report.file_diffs.into_iter().flat_map(|diff| {
            let line = first_changed_line(&diff.diff);

            if diff.applied_rectors.is_empty() {
                return vec![Issue::new(
                    diff.file,
                    line,
                    Severity::Warning,
                    "Rector suggests refactoring this file",
                )];
            }

            diff.applied_rectors
                .iter()
                .map(|rector| {
                    let name = short_rector_name(rector);
                    Issue::new(
                        diff.file.clone(),
                        line,
                        Severity::Warning,
                        format!("Rector suggests a refactoring ({name})"),
                    )
                    .with_rule(Some(name.to_string()))
                })
                .collect()
        });

        let errors = report.errors.into_iter().map(|error| {
            Issue::new(
                error.file.unwrap_or_else(|| "rector".to_string()),
                error.line,
                Severity::Error,
                error.message,
            )
        });

        Ok(suggestions.chain(errors).collect())
    }

    fn fallback_parse(&self, output: &CommandOutput) -> Option<Vec<Issue>> {
        let mut seen = BTreeSet::new();
        let issues = LISTED_FILE
            .captures_iter(&output.stdout)
            .filter_map(|captures| {
                let file = captures.get(1)?.as_str();
                if !seen.insert(file.to_string()) {
                    return None;
                }
                let line = captures.get(2).and_then(|x| x.as_str().parse().ok());
                Some(Issue::new(
                    file,
                    line,
                    Severity::Warning,
                    "Rector suggests refactoring this file",
                ))
            })
            .collect::<Vec<_>>();

        (!issues.is_empty()).then_some(issues)
    }
}
