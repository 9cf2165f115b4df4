//! PHP_CodeSniffer runner.

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
}

#[derive(Debug, Default, Deserialize)]
struct FileReport {
    #[serde(default)]
    messages: Vec<Message>,
}

#[derive(Debug, Deserialize)]
struct Message {
    message: String,
    source: Option<String>,
    #[serde(rename = "type", default)]
    kind: String,
    line: Option<u32>,
    column: Option<u32>,
}

pub struct PhpcsRunner;

impl ToolRunner for PhpcsRunner {
    fn tool(&self) -> Tool {
        Tool::Phpcs
    }

    fn args(&self, config: &RunnerConfig) -> Vec<String> {
        let mut args = vec!["--report=json".to_string(), "-q".to_string()];

        if let Some(path) = config_path(config) {
            args.push(format!("--standard={path}"));
        }

        args.extend(targets(config, "."));
        args
    }

    fn parse(&self, output: &CommandOutput) -> Result<Vec<Issue>, ParseError> {
        let report: Report = decode(&output.stdout)?;

        Ok(report
            .files
            .into_iter()
            .flat_map(|(file, report)| {
                report.messages.into_iter().map(move |message| {
                    let severity = if message.kind.eq_ignore_ascii_case("ERROR") {
                        Severity::Error
                    } else {
                        Severity::Warning
                    };
                    Issue::new(file.clone(), message.line, severity, message.message)
                        .with_column(message.column)
                        .with_rule(message.source)
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
    fn args_include_standard_and_files() {
        assert_eq!(
            PhpcsRunner.args(&config(&["src/A.php"], Some("/project/phpcs.xml"))),
            vec![
                "--report=json",
                "-q",
                "--standard=/project/phpcs.xml",
                "src/A.php"
            ]
        );
        assert_eq!(
            PhpcsRunner.args(&config(&[], None)),
            vec!["--report=json", "-q", "."]
        );
    }

    #[test_log::test]
    fn maps_message_type_to_severity() {
        let output = stdout(
            2,
            r#"{
                "totals": {"errors": 1, "warnings": 1, "fixable": 1},
                "files": {
                    "/project/src/A.php": {
                        "errors": 1,
                        "warnings": 1,
                        "messages": [
                            {"message": "Missing file doc comment", "source": "PEAR.Commenting.FileComment.Missing", "severity": 5, "fixable": false, "type": "ERROR", "line": 2, "column": 1},
                            {"message": "Line exceeds 120 characters", "source": "Generic.Files.LineLength.TooLong", "severity": 5, "fixable": false, "type": "WARNING", "line": 14, "column": 121}
                        ]
                    }
                }
            }"#,
        );

        let issues = PhpcsRunner.parse(&output).unwrap();

        assert_eq!(
            issues,
            vec![
                Issue::new(
                    "/project/src/A.php",
                    Some(2),
                    Severity::Error,
                    "Missing file doc comment"
                )
                .with_column(Some(1))
                .with_rule(Some("PEAR.Commenting.FileComment.Missing".to_string())),
                Issue::new(
                    "/project/src/A.php",
                    Some(14),
                    Severity::Warning,
                    "Line exceeds 120 characters"
                )
                .with_column(Some(121))
                .with_rule(Some("Generic.Files.LineLength.TooLong".to_string())),
            ]
        );
    }

    #[test_log::test]
    fn clean_report_has_no_issues() {
        let output = stdout(
            0,
            r#"{"totals": {"errors": 0, "warnings": 0, "fixable": 0}, "files": {"/project/src/A.php": {"errors": 0, "warnings": 0, "messages": []}}}"#,
        );

        assert!(PhpcsRunner.parse(&output).unwrap().is_empty());
    }
}
