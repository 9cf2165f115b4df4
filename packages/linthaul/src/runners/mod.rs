//! Tool runners.
//!
//! A runner knows three things about its tool: how to build the argument
//! list, how to read the tool's native output, and (optionally) how to scrape
//! something useful out of output that is not in the expected format.
//! [`run_tool`] drives that for every runner the same way:
//!
//! - The process exit code alone decides `success`
//! - Structured parse failures fall back to [`ToolRunner::fallback_parse`]
//! - When no strategy yields issues the run reports zero issues and logs a warning

pub mod eslint;
pub mod php_cs_fixer;
pub mod phpcs;
pub mod phpmd;
pub mod phpstan;
pub mod psalm;
pub mod rector;
pub mod stylelint;

use std::{fmt, marker::PhantomData, path::Path, time::Duration};

use serde::{
    Deserialize, Deserializer,
    de::{DeserializeOwned, IgnoredAny, MapAccess, SeqAccess, Visitor},
};

use crate::{
    issue::{Issue, RunnerConfig, ToolResult},
    process::{CommandExecutor, CommandOutput, CommandSpec, ExecError},
    tools::Tool,
};

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

/// Wraps exactly one external tool.
pub trait ToolRunner: Send + Sync {
    fn tool(&self) -> Tool;

    /// Arguments passed to the tool binary.
    fn args(&self, config: &RunnerConfig) -> Vec<String>;

    /// Reads the tool's structured output.
    ///
    /// # Errors
    ///
    /// * If the output is not in the tool's structured format
    fn parse(&self, output: &CommandOutput) -> Result<Vec<Issue>, ParseError>;

    /// Degraded parse used only when [`ToolRunner::parse`] fails.
    ///
    /// Returns `None` when nothing could be recovered.
    fn fallback_parse(&self, _output: &CommandOutput) -> Option<Vec<Issue>> {
        None
    }

    /// Turns a finished process into issues, applying the fallback chain.
    fn collect_issues(&self, output: &CommandOutput) -> Vec<Issue> {
        let tool = self.tool();

        match self.parse(output) {
            Ok(issues) => issues,
            Err(e) => {
                if let Some(issues) = self.fallback_parse(output) {
                    log::info!(
                        "{tool}: structured output unavailable ({e}), recovered {} issue(s) from text output",
                        issues.len()
                    );
                    return issues;
                }
                log::warn!("{tool}: failed to parse output, reporting no issues: {e}");
                vec![]
            }
        }
    }
}

/// Runs `runner`'s tool through `executor` and normalizes the result.
///
/// # Errors
///
/// * If the process could not be started or did not finish within `timeout`
pub async fn run_tool(
    runner: &dyn ToolRunner,
    executor: &dyn CommandExecutor,
    program: &Path,
    config: &RunnerConfig,
    timeout: Duration,
) -> Result<ToolResult, ExecError> {
    let tool = runner.tool();
    let spec = CommandSpec::new(program, &config.working_directory)
        .args(runner.args(config))
        .timeout(timeout);

    log::info!(
        "Running {} on {} file(s)",
        tool.display_name(),
        config.files.len()
    );

    let output = executor.execute(&spec).await?;
    let issues = runner.collect_issues(&output);

    log::info!(
        "{} finished with exit code {} and {} issue(s)",
        tool.display_name(),
        output.exit_code,
        issues.len()
    );

    Ok(ToolResult {
        tool: tool.display_name().to_string(),
        success: output.success(),
        issues,
        raw_output: output.combined(),
    })
}

/// Target files, or `fallback` when none were given.
pub(crate) fn targets(config: &RunnerConfig, fallback: &str) -> Vec<String> {
    if config.files.is_empty() {
        vec![fallback.to_string()]
    } else {
        config.files.clone()
    }
}

pub(crate) fn config_path(config: &RunnerConfig) -> Option<String> {
    config
        .config_path
        .as_ref()
        .map(|x| x.to_string_lossy().to_string())
}

/// Decodes JSON output, tolerating noise (PHP notices, npm banners) printed
/// before the document. Blank output decodes to `T::default()`.
pub(crate) fn decode<T: DeserializeOwned + Default>(text: &str) -> Result<T, ParseError> {
    let text = text.trim();

    if text.is_empty() {
        return Ok(T::default());
    }

    match serde_json::from_str::<T>(text) {
        Ok(value) => Ok(value),
        Err(e) => {
            let start = text
                .match_indices(['\n'])
                .map(|(i, _)| i + 1)
                .find(|i| text[*i..].starts_with(['{', '[']));

            match start {
                Some(start) => Ok(serde_json::from_str(&text[start..])?),
                None => Err(e.into()),
            }
        }
    }
}

/// Deserializes a JSON object into its entries, keeping document order.
///
/// PHP encodes an empty associative array as `[]`, so an empty sequence is
/// accepted too.
pub(crate) fn ordered_entries<'de, D, T>(deserializer: D) -> Result<Vec<(String, T)>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    struct EntriesVisitor<T>(PhantomData<T>);

    impl<'de, T: Deserialize<'de>> Visitor<'de> for EntriesVisitor<T> {
        type Value = Vec<(String, T)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                entries.push(entry);
            }
            Ok(entries)
        }

        fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
            while seq.next_element::<IgnoredAny>()?.is_some() {}
            Ok(vec![])
        }

        fn visit_unit<E: serde::de::Error>(self) -> Result<Self::Value, E> {
            Ok(vec![])
        }
    }

    deserializer.deserialize_any(EntriesVisitor(PhantomData))
}
