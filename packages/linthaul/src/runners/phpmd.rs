//! PHP Mess Detector runner.
//!
//! PHPMD rates violations with a priority from 1 (highest) to 5. Priorities 1
//! through 3 are reported as errors.

use serde::Deserialize;

use super::{ParseError, ToolRunner, config_path, decode};
use crate::{
    issue::{Issue, RunnerConfig, Severity},
    process::CommandOutput,
    tools::Tool,
};

/// Rulesets used when no config file was resolved.
pub const DEFAULT_RULESETS: &str = "cleancode,codesize,design,naming,unusedcode";

const ERROR_PRIORITY_THRESHOLD: u8 = 3;

#[derive(Debug, Default, Deserialize)]
struct Report {
    #[serde(default)]
    files: Vec<FileReport>,
}

#[derive(Debug, Deserialize)]
struct FileReport {
    file: String,
    #[serde(default)]
    violations: Vec<Violation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Violation {
    begin_line: Option<u32>,
    description: String,
    rule: Option<String>,
    priority: Option<u8>,
}

pub struct PhpmdRunner;

impl ToolRunner for PhpmdRunner {
    fn tool(&self) -> Tool {
        Tool::Phpmd
    }

    fn args(&self, config: &RunnerConfig) -> Vec<String> {
        let paths = if config.files.is_empty() {
            ".".to_string()
        } else {
            config.files.join(",")
        };

        vec![
            paths,
            "json".to_string(),
            config_path(config).unwrap_or_else(|| DEFAULT_RULESETS.to_string()),
        ]
    }

    fn parse(&self, output: &CommandOutput) -> Result<Vec<Issue>, ParseError> {
        let report: Report = decode(&output.stdout)?;

        Ok(report
            .files
            .into_iter()
            .flat_map(|file| {
                let name = file.file;
                file.violations.into_iter().map(move |violation| {
                    let severity = match violation.priority {
                        Some(priority) if priority <= ERROR_PRIORITY_THRESHOLD => Severity::Error,
                        _ => Severity::Warning,
                    };
                    Issue::new(
                        name.clone(),
                        violation.begin_line,
                        severity,
                        violation.description.trim(),
                    )
                    .with_rule(violation.rule)
                })
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::runners::test_support::{config, stdout};

    #[test_log::test]
    fn args_join_files_and_default_rulesets() {
        assert_eq!(
            PhpmdRunner.args(&config(&["src/A.php", "src/B.php"], None)),
            vec!["src/A.php,src/B.php", "json", DEFAULT_RULESETS]
        );
        assert_eq!(
            PhpmdRunner.args(&config(&[], Some("/project/phpmd.xml"))),
            vec![".", "json", "/project/phpmd.xml"]
        );
    }

    #[test_log::test]
    fn priority_threshold_splits_severity() {
        let output = stdout(
            2,
            r#"{
                "version": "2.15.0",
                "package": "phpmd",
                "timestamp": "2024-05-01T10:00:00+00:00",
                "files": [{
                    "file": "/project/src/A.php",
                    "violations": [
                        {"beginLine": 10, "endLine": 30, "package": null, "function": null, "class": "A", "method": "run", "description": "The method run() has a Cyclomatic Complexity of 12.", "rule": "CyclomaticComplexity", "ruleSet": "Code Size Rules", "externalInfoUrl": "https://phpmd.org/rules/codesize.html", "priority": 3},
                        {"beginLine": 5, "endLine": 5, "description": "Avoid variables with short names like $x. ", "rule": "ShortVariable", "ruleSet": "Naming Rules", "priority": 4}
                    ]
                }]
            }"#,
        );

        let issues = PhpmdRunner.parse(&output).unwrap();

        assert_eq!(
            issues,
            vec![
                Issue::new(
                    "/project/src/A.php",
                    Some(10),
                    Severity::Error,
                    "The method run() has a Cyclomatic Complexity of 12."
                )
                .with_rule(Some("CyclomaticComplexity".to_string())),
                Issue::new(
                    "/project/src/A.php",
                    Some(5),
                    Severity::Warning,
                    "Avoid variables with short names like $x."
                )
                .with_rule(Some("ShortVariable".to_string())),
            ]
        );
    }
}
