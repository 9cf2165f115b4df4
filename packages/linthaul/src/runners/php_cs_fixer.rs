//! PHP CS Fixer runner.
//!
//! Runs in dry-run mode. Each fixer that would change a file becomes one
//! warning on line 1 of that file, since the JSON report carries no positions.

use serde::Deserialize;

use super::{ParseError, ToolRunner, config_path, decode, targets};
use crate::{
    issue::{Issue, RunnerConfig, Severity},
    process::CommandOutput,
    tools::Tool,
};

#[derive(Debug, Default, Deserialize)]
struct Report {
    #[serde(default)]
    files: Vec<FixedFile>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FixedFile {
    name: String,
    #[serde(default)]
    applied_fixers: Vec<String>,
}

pub struct PhpCsFixerRunner;

impl ToolRunner for PhpCsFixerRunner {
    fn tool(&self) -> Tool {
        Tool::PhpCsFixer
    }

    fn args(&self, config: &RunnerConfig) -> Vec<String> {
        let mut args = vec![
            "fix".to_string(),
            "--dry-run".to_string(),
            "--diff".to_string(),
            "--format=json".to_string(),
        ];

        if let Some(path) = config_path(config) {
            args.push(format!("--config={path}"));
            // Explicit paths would otherwise override the finder in the config.
            args.push("--path-mode=intersection".to_string());
        }

        args.extend(targets(config, "."));
        args
    }

    fn parse(&self, output: &CommandOutput) -> Result<Vec<Issue>, ParseError> {
        let report: Report = decode(&output.stdout)?;

        Ok(report
            .files
            .into_iter()
            .flat_map(|file| {
                if file.applied_fixers.is_empty() {
                    return vec![Issue::new(
                        file.name,
                        None,
                        Severity::Warning,
                        "File does not follow the coding standard",
                    )];
                }

                file.applied_fixers
                    .into_iter()
                    .map(|fixer| {
                        Issue::new(
                            file.name.clone(),
                            None,
                            Severity::Warning,
                            format!("Coding standard violation fixable by '{fixer}'"),
                        )
                        .with_rule(Some(fixer))
                    })
                    .collect()
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
    fn config_adds_intersection_path_mode() {
        assert_eq!(
            PhpCsFixerRunner.args(&config(&["src/A.php"], Some(".php-cs-fixer.php"))),
            vec![
                "fix",
                "--dry-run",
                "--diff",
                "--format=json",
                "--config=.php-cs-fixer.php",
                "--path-mode=intersection",
                "src/A.php",
            ]
        );
    }

    #[test_log::test]
    fn one_warning_per_applied_fixer() {
        let output = stdout(
            8,
            r#"{"files": [{"name": "src/A.php", "appliedFixers": ["braces", "no_unused_imports"], "diff": "--- a\n+++ b\n"}], "time": {"total": 0.2}, "memory": 14}"#,
        );

        let issues = PhpCsFixerRunner.parse(&output).unwrap();

        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].file, "src/A.php");
        assert_eq!(issues[0].line, 1);
        assert_eq!(issues[0].severity, Severity::Warning);
        assert_eq!(issues[0].rule.as_deref(), Some("braces"));
        assert_eq!(issues[1].rule.as_deref(), Some("no_unused_imports"));
    }

    #[test_log::test]
    fn file_without_fixer_list_still_reports() {
        let output = stdout(8, r#"{"files": [{"name": "src/B.php"}]}"#);

        let issues = PhpCsFixerRunner.parse(&output).unwrap();

        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].rule, None);
    }
}
