use std::{fs, path::Path};

use linthaul::{
    RunSettings, RunStatus, Severity, Tool, ToolResult,
    orchestrator::Orchestrator,
    report,
    test_utils::{FixedLocator, RecordingCacheBackend, ScriptedExecutor},
};
use pretty_assertions::assert_eq;

const PHPCS_REPORT: &str = r#"{
    "totals": {"errors": 2, "warnings": 1, "fixable": 0},
    "files": {
        "/project/src/A.php": {"errors": 2, "warnings": 1, "messages": [
            {"message": "Missing doc comment", "source": "Squiz.Commenting.FunctionComment.Missing", "severity": 5, "type": "ERROR", "line": 3, "column": 1, "fixable": false},
            {"message": "Line exceeds 120 characters", "source": "Generic.Files.LineLength.TooLong", "severity": 5, "type": "WARNING", "line": 9, "column": 121, "fixable": false},
            {"message": "Expected 1 space", "source": "Squiz.WhiteSpace.Foo", "severity": 5, "type": "ERROR", "line": 12, "column": 8, "fixable": true}
        ]}
    }
}"#;

fn project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/A.php"), "<?php\n").unwrap();
    fs::write(dir.path().join("src/app.js"), "let x = 1;\n").unwrap();
    dir
}

fn settings(tools: Vec<Tool>, dir: &Path, fail_on_errors: bool) -> RunSettings {
    RunSettings {
        fail_on_errors,
        ..RunSettings::new(tools, dir)
    }
}

#[test_log::test(tokio::test)]
async fn two_tools_total_their_issues() {
    let dir = project();
    let executor = ScriptedExecutor::new()
        .respond("phpcs", 0, PHPCS_REPORT, "")
        .respond("eslint", 0, "[]", "");
    let backend = RecordingCacheBackend::default();
    let locator = FixedLocator::new([Tool::Phpcs, Tool::Eslint]);
    let orchestrator = Orchestrator::new(&executor)
        .with_backend(&backend)
        .with_locator(&locator);

    let outcome = orchestrator
        .run(&settings(vec![Tool::Phpcs, Tool::Eslint], dir.path(), true))
        .await
        .unwrap();

    assert_eq!(outcome.total_issues, 3);
    assert_eq!(outcome.status, RunStatus::Failed);
    assert_eq!(
        outcome
            .results
            .iter()
            .map(|x| (x.tool.as_str(), x.success, x.issues.len()))
            .collect::<Vec<_>>(),
        vec![("PHP_CodeSniffer", true, 3), ("ESLint", true, 0)]
    );
    assert_eq!(outcome.results[0].error_count(), 2);
    assert_eq!(outcome.results[0].warning_count(), 1);
    assert_eq!(outcome.annotations.len(), 3);
    assert_eq!(
        outcome.annotations[1],
        "::warning file=/project/src/A.php,line=9,col=121::[PHP_CodeSniffer - Generic.Files.LineLength.TooLong] Line exceeds 120 characters"
    );
    assert_eq!(executor.programs(), vec!["phpcs", "eslint"]);

    let outcome = orchestrator
        .run(&settings(vec![Tool::Phpcs, Tool::Eslint], dir.path(), false))
        .await
        .unwrap();

    assert_eq!(outcome.total_issues, 3);
    assert_eq!(outcome.status, RunStatus::Success);
}

#[test_log::test(tokio::test)]
async fn unavailable_tool_is_left_out() {
    let dir = project();
    let executor = ScriptedExecutor::new()
        .respond("phpcs", 0, PHPCS_REPORT, "")
        .respond("eslint", 0, "[]", "");
    let backend = RecordingCacheBackend::default();
    let locator = FixedLocator::new([Tool::Phpcs, Tool::Eslint]);

    let outcome = Orchestrator::new(&executor)
        .with_backend(&backend)
        .with_locator(&locator)
        .run(&settings(
            vec![Tool::Phpcs, Tool::Psalm, Tool::Eslint],
            dir.path(),
            true,
        ))
        .await
        .unwrap();

    assert_eq!(
        outcome
            .results
            .iter()
            .map(|x| x.tool.as_str())
            .collect::<Vec<_>>(),
        vec!["PHP_CodeSniffer", "ESLint"]
    );
    assert_eq!(outcome.total_issues, 3);
    assert!(!executor.programs().contains(&"psalm".to_string()));
}

#[test_log::test(tokio::test)]
async fn malformed_output_with_clean_exit_is_success() {
    let dir = project();
    let executor = ScriptedExecutor::new().respond("phpstan", 0, "{\"files\": {oops", "");
    let backend = RecordingCacheBackend::default();
    let locator = FixedLocator::new([Tool::Phpstan]);

    let outcome = Orchestrator::new(&executor)
        .with_backend(&backend)
        .with_locator(&locator)
        .run(&settings(vec![Tool::Phpstan], dir.path(), true))
        .await
        .unwrap();

    assert_eq!(outcome.results.len(), 1);
    assert!(outcome.results[0].success);
    assert!(outcome.results[0].issues.is_empty());
    assert_eq!(outcome.status, RunStatus::Success);
}

#[test_log::test(tokio::test)]
async fn project_config_and_matched_files_reach_the_tool() {
    let dir = project();
    fs::write(dir.path().join("phpstan.neon"), "parameters:\n  level: 5\n").unwrap();
    let executor = ScriptedExecutor::new().respond(
        "phpstan",
        1,
        r#"{"totals": {"errors": 0, "file_errors": 1}, "files": {"src/A.php": {"errors": 1, "messages": [{"message": "Undefined variable: $x", "line": 2, "ignorable": true, "identifier": "variable.undefined"}]}}, "errors": []}"#,
        "",
    );
    let backend = RecordingCacheBackend::default();
    let locator = FixedLocator::new([Tool::Phpstan]);

    let outcome = Orchestrator::new(&executor)
        .with_backend(&backend)
        .with_locator(&locator)
        .run(&settings(vec![Tool::Phpstan], dir.path(), true))
        .await
        .unwrap();

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(
        calls[0].args,
        vec![
            "analyse".to_string(),
            "--error-format=json".to_string(),
            "--no-progress".to_string(),
            "--no-interaction".to_string(),
            format!("--configuration={}", dir.path().join("phpstan.neon").display()),
            "src/A.php".to_string(),
        ]
    );
    assert_eq!(calls[0].working_directory, dir.path());

    let result = &outcome.results[0];
    assert!(!result.success);
    assert_eq!(result.issues[0].severity, Severity::Error);
    assert_eq!(result.issues[0].rule.as_deref(), Some("variable.undefined"));
}

#[test_log::test(tokio::test)]
async fn report_totals_agree() {
    let dir = project();
    let executor = ScriptedExecutor::new()
        .respond("phpcs", 2, PHPCS_REPORT, "")
        .fail_spawn("eslint");
    let backend = RecordingCacheBackend::default();
    let locator = FixedLocator::new([Tool::Phpcs, Tool::Eslint]);

    let outcome = Orchestrator::new(&executor)
        .with_backend(&backend)
        .with_locator(&locator)
        .run(&settings(vec![Tool::Phpcs, Tool::Eslint], dir.path(), true))
        .await
        .unwrap();

    let json: serde_json::Value = serde_json::from_str(&outcome.report_json).unwrap();

    assert_eq!(json["totalIssues"], 3);
    assert_eq!(json["tools"]["ESLint"]["success"], false);
    assert_eq!(
        outcome.total_issues,
        outcome.results.iter().map(|x| x.issues.len()).sum::<usize>()
    );
    assert_eq!(outcome.annotations, report::annotations(&outcome.results));
    assert!(outcome.summary.contains("| ESLint | ❌ FAIL | 0 |"));
    assert_ne!(outcome.results[1], ToolResult::empty("ESLint"));
}

#[test_log::test(tokio::test)]
async fn failing_tool_does_not_affect_its_neighbours() {
    let dir = project();
    let executor = ScriptedExecutor::new()
        .respond("phpcs", 2, PHPCS_REPORT, "")
        .fail_spawn("phpstan")
        .respond(
            "eslint",
            1,
            r#"[{"filePath": "src/app.js", "messages": [{"ruleId": "no-unused-vars", "severity": 2, "message": "'x' is unused", "line": 1, "column": 5}]}]"#,
            "",
        );
    let backend = RecordingCacheBackend::default();
    let locator = FixedLocator::new([Tool::Phpcs, Tool::Phpstan, Tool::Psalm, Tool::Eslint]);
    let mut run = settings(
        vec![Tool::Phpcs, Tool::Phpstan, Tool::Psalm, Tool::Eslint],
        dir.path(),
        false,
    );
    run.patterns.insert(Tool::Psalm, vec!["src/**/*.{php".to_string()]);

    let outcome = Orchestrator::new(&executor)
        .with_backend(&backend)
        .with_locator(&locator)
        .run(&run)
        .await
        .unwrap();

    assert_eq!(
        outcome
            .results
            .iter()
            .map(|x| (x.tool.as_str(), x.success, x.issues.len()))
            .collect::<Vec<_>>(),
        vec![
            ("PHP_CodeSniffer", false, 3),
            ("PHPStan", false, 0),
            ("Psalm", false, 0),
            ("ESLint", false, 1),
        ]
    );
    assert_eq!(executor.programs(), vec!["phpcs", "phpstan", "eslint"]);
    assert_eq!(outcome.total_issues, 4);
    assert_eq!(outcome.status, RunStatus::Success);
}

#[test_log::test(tokio::test)]
async fn relative_working_directory_is_made_absolute() {
    let dir = tempfile::tempdir_in(".").unwrap();
    fs::write(dir.path().join("phpcs.xml"), "<ruleset/>").unwrap();
    fs::create_dir_all(dir.path().join("src")).unwrap();
    fs::write(dir.path().join("src/A.php"), "<?php\n").unwrap();
    let relative = Path::new(".").join(dir.path().file_name().unwrap());
    let executor = ScriptedExecutor::new().respond("phpcs", 0, r#"{"files": {}}"#, "");
    let backend = RecordingCacheBackend::default();
    let locator = FixedLocator::new([Tool::Phpcs]);

    let outcome = Orchestrator::new(&executor)
        .with_backend(&backend)
        .with_locator(&locator)
        .run(&settings(vec![Tool::Phpcs], &relative, true))
        .await
        .unwrap();

    assert!(outcome.results[0].success);

    let calls = executor.calls();
    assert_eq!(calls.len(), 1);
    assert!(calls[0].program.is_absolute());
    assert!(calls[0].working_directory.is_absolute());
    assert!(calls[0].working_directory.ends_with(dir.path().file_name().unwrap()));

    let standard = calls[0]
        .args
        .iter()
        .find_map(|x| x.strip_prefix("--standard="))
        .unwrap();
    assert!(Path::new(standard).is_absolute());
    assert!(Path::new(standard).is_file());
    assert!(calls[0].args.contains(&"src/A.php".to_string()));
}
