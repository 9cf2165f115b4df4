//! Sequences a full lint run.
//!
//! Tools run one at a time in the order requested. A tool that is missing is
//! skipped, a tool with nothing to check reports an empty success, and a tool
//! whose process fails or whose patterns do not parse becomes a failed result.
//! None of these stop the run.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use crate::{
    cache::{CacheBackend, CacheManager, CacheSettings},
    config::ConfigResolver,
    files::find_files,
    issue::{RunnerConfig, ToolResult},
    process::{CommandExecutor, DEFAULT_TIMEOUT},
    report,
    runners::run_tool,
    tools::{SystemLocator, Tool, ToolLocator},
};

#[derive(Debug, thiserror::Error)]
pub enum RunError {
    #[error("Working directory '{}' does not exist or is not a directory", .0.display())]
    WorkingDirectory(PathBuf),
    #[error("Failed to serialize report: {0}")]
    Report(#[from] serde_json::Error),
}

/// Everything a run needs, resolved from CLI flags and environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSettings {
    pub tools: Vec<Tool>,
    pub working_directory: PathBuf,
    pub fail_on_errors: bool,
    /// User supplied config paths, relative to the working directory.
    pub configs: BTreeMap<Tool, String>,
    /// Glob patterns overriding a tool's defaults.
    pub patterns: BTreeMap<Tool, Vec<String>>,
    pub bundled_config_dir: Option<PathBuf>,
    pub timeout: Duration,
    pub cache: CacheSettings,
}

impl RunSettings {
    #[must_use]
    pub fn new(tools: Vec<Tool>, working_directory: impl Into<PathBuf>) -> Self {
        Self {
            tools,
            working_directory: working_directory.into(),
            fail_on_errors: true,
            configs: BTreeMap::new(),
            patterns: BTreeMap::new(),
            bundled_config_dir: None,
            timeout: DEFAULT_TIMEOUT,
            cache: CacheSettings::disabled(),
        }
    }

    fn patterns_for(&self, tool: Tool) -> Vec<String> {
        self.patterns
            .get(&tool)
            .filter(|x| !x.is_empty())
            .cloned()
            .unwrap_or_else(|| {
                tool.default_patterns()
                    .iter()
                    .map(ToString::to_string)
                    .collect()
            })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Success,
    Failed,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub total_issues: usize,
    pub results: Vec<ToolResult>,
    pub annotations: Vec<String>,
    pub summary: String,
    pub report_json: String,
}

impl RunOutcome {
    /// Step outputs: `status`, `total-issues` and `report`.
    #[must_use]
    pub fn outputs(&self) -> Vec<(String, String)> {
        vec![
            ("status".to_string(), self.status.to_string()),
            ("total-issues".to_string(), self.total_issues.to_string()),
            ("report".to_string(), self.report_json.clone()),
        ]
    }
}

/// `failed` only when failing on errors is enabled and anything was reported.
#[must_use]
pub const fn decide_status(total_issues: usize, fail_on_errors: bool) -> RunStatus {
    if fail_on_errors && total_issues > 0 {
        RunStatus::Failed
    } else {
        RunStatus::Success
    }
}

pub struct Orchestrator<'a> {
    executor: &'a dyn CommandExecutor,
    backend: Option<&'a dyn CacheBackend>,
    locator: &'a dyn ToolLocator,
}

impl<'a> Orchestrator<'a> {
    /// Orchestrator without a cache backend. Caching settings are ignored
    /// until one is set with [`Orchestrator::with_backend`].
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor) -> Self {
        Self {
            executor,
            backend: None,
            locator: &SystemLocator,
        }
    }

    #[must_use]
    pub fn with_backend(mut self, backend: &'a dyn CacheBackend) -> Self {
        self.backend = Some(backend);
        self
    }

    #[must_use]
    pub fn with_locator(mut self, locator: &'a dyn ToolLocator) -> Self {
        self.locator = locator;
        self
    }

    /// Runs one tool. `None` when the tool is not installed.
    ///
    /// `working_directory` is absolute.
    async fn run_one(
        &self,
        tool: Tool,
        settings: &RunSettings,
        working_directory: &Path,
        resolver: &ConfigResolver,
    ) -> Option<ToolResult> {
        let Some(location) = self.locator.locate(tool, working_directory) else {
            log::warn!(
                "{} is not installed, skipping it. Install it with: {}",
                tool.display_name(),
                tool.install_hint()
            );
            return None;
        };

        let files = match find_files(working_directory, &settings.patterns_for(tool)) {
            Ok(files) => files,
            Err(e) => {
                log::error!("{}: {e}", tool.display_name());
                return Some(ToolResult::failed(tool.display_name(), e.to_string()));
            }
        };

        if files.is_empty() {
            log::info!("No files found for {}", tool.display_name());
            return Some(ToolResult::empty(tool.display_name()));
        }

        let config = RunnerConfig {
            config_path: resolver.resolve(
                tool,
                settings.configs.get(&tool).map(String::as_str),
                working_directory,
            ),
            files,
            working_directory: working_directory.to_path_buf(),
        };

        let runner = tool.runner();

        Some(
            match run_tool(
                runner.as_ref(),
                self.executor,
                location.path(),
                &config,
                settings.timeout,
            )
            .await
            {
                Ok(result) => result,
                Err(e) => {
                    log::error!("{} failed to run: {e}", tool.display_name());
                    ToolResult::failed(tool.display_name(), e.to_string())
                }
            },
        )
    }

    /// Runs the whole pipeline: cache restore, every tool, report, cache save.
    ///
    /// # Errors
    ///
    /// * [`RunError::WorkingDirectory`] if the working directory is missing
    /// * [`RunError::Report`] if the JSON report cannot be serialized
    pub async fn run(&self, settings: &RunSettings) -> Result<RunOutcome, RunError> {
        if !settings.working_directory.is_dir() {
            return Err(RunError::WorkingDirectory(
                settings.working_directory.clone(),
            ));
        }

        // Tools are spawned with this as their cwd, so every path handed to
        // them must already be absolute.
        let working_directory = std::path::absolute(&settings.working_directory)
            .map_err(|_| RunError::WorkingDirectory(settings.working_directory.clone()))?;

        let cache = if settings.cache.ecosystems().is_empty() {
            None
        } else if let Some(backend) = self.backend {
            Some(CacheManager::new(
                &settings.cache,
                &working_directory,
                self.executor,
                backend,
            ))
        } else {
            log::warn!("Caching is enabled but no cache backend is available, running uncached");
            None
        };

        let cache_state = match &cache {
            Some(cache) => Some(cache.restore().await),
            None => None,
        };

        let resolver = ConfigResolver::new(settings.bundled_config_dir.clone());
        let mut results = vec![];

        for tool in &settings.tools {
            if let Some(result) = self
                .run_one(*tool, settings, &working_directory, &resolver)
                .await
            {
                results.push(result);
            }
        }

        let total_issues = report::total_issues(&results);
        let annotations = report::annotations(&results);
        let summary = report::summary_markdown(&results);
        let report_json = report::json_report(&results)?;

        if let (Some(cache), Some(state)) = (&cache, &cache_state) {
            cache.save(state).await;
        }

        let status = decide_status(total_issues, settings.fail_on_errors);

        log::info!(
            "Ran {} tool(s), {total_issues} issue(s) found, status: {status}",
            results.len()
        );

        Ok(RunOutcome {
            status,
            total_issues,
            results,
            annotations,
            summary,
            report_json,
        })
    }
}
