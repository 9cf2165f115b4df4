#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

use std::{collections::BTreeMap, path::PathBuf, process::ExitCode, time::Duration};

use clap::{Args as ClapArgs, Parser, Subcommand, builder::BoolishValueParser};
use linthaul::{
    RunSettings, RunStatus, Tool,
    cache::{CacheManager, CacheSettings, CacheState, DEFAULT_KEY_PREFIX, LocalCacheBackend},
    config::ConfigResolver,
    files::split_patterns,
    github,
    orchestrator::Orchestrator,
    process::ProcessExecutor,
    tools::{ALL_TOOLS, ToolLocation, locate, parse_selection},
};
use strum::IntoEnumIterator as _;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    cmd: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the selected tools and report their issues.
    Run(RunArgs),
    /// Run one cache phase on its own.
    Cache {
        #[command(subcommand)]
        phase: CachePhase,
    },
    /// List supported tools, whether they are installed and which config they would use.
    Tools {
        #[arg(long, env = "INPUT_WORKING_DIRECTORY", default_value = ".")]
        working_directory: PathBuf,

        #[arg(long, env = "INPUT_BUNDLED_CONFIG_DIR")]
        bundled_config_dir: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum CachePhase {
    /// Restore caches and record the result in the step state.
    Restore(CacheArgs),
    /// Save caches that were not an exact hit during restore.
    Save(CacheArgs),
}

#[derive(ClapArgs, Debug, Clone)]
struct CacheArgs {
    #[arg(long, env = "INPUT_WORKING_DIRECTORY", default_value = ".")]
    working_directory: PathBuf,

    #[arg(long, env = "INPUT_CACHE", default_value_t = true, value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    cache: bool,

    #[arg(long, env = "INPUT_CACHE_COMPOSER", default_value_t = true, value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    cache_composer: bool,

    #[arg(long, env = "INPUT_CACHE_NODE", default_value_t = true, value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    cache_node: bool,

    #[arg(long, env = "INPUT_CACHE_KEY_PREFIX", default_value = DEFAULT_KEY_PREFIX)]
    cache_key_prefix: String,

    /// Root directory of the local cache store.
    #[arg(long, env = "INPUT_CACHE_DIR")]
    cache_dir: Option<PathBuf>,

    #[arg(long, env = "RUNNER_OS", default_value = std::env::consts::OS)]
    platform: String,

    #[arg(long, env = "COMPOSER_CACHE_DIR")]
    composer_cache_dir: Option<PathBuf>,
}

impl CacheArgs {
    fn settings(&self) -> CacheSettings {
        CacheSettings {
            enabled: self.cache,
            composer: self.cache_composer,
            node: self.cache_node,
            key_prefix: self.cache_key_prefix.clone(),
            platform: self.platform.clone(),
            composer_cache_dir: self.composer_cache_dir.clone(),
        }
    }

    /// The local cache store. `None`, with a warning, when caching is off or
    /// no store location can be determined.
    fn backend(&self) -> Option<LocalCacheBackend> {
        if !self.cache {
            return None;
        }

        let root = self.cache_dir.clone().or_else(github::default_cache_root);
        if root.is_none() {
            log::warn!("No cache directory given and no home directory found, caching disabled");
        }
        root.map(LocalCacheBackend::new)
    }

    fn working_directory(&self) -> PathBuf {
        std::path::absolute(&self.working_directory)
            .unwrap_or_else(|_| self.working_directory.clone())
    }
}

#[derive(ClapArgs, Debug, Clone)]
struct RunArgs {
    /// Comma or whitespace separated tool names, or `all`.
    #[arg(long, env = "INPUT_TOOLS", default_value = ALL_TOOLS)]
    tools: String,

    #[arg(long, env = "INPUT_FAIL_ON_ERRORS", default_value_t = true, value_parser = BoolishValueParser::new(), action = clap::ArgAction::Set)]
    fail_on_errors: bool,

    #[arg(long, env = "INPUT_BUNDLED_CONFIG_DIR")]
    bundled_config_dir: Option<PathBuf>,

    #[arg(long, env = "INPUT_TIMEOUT_SECS", default_value_t = 600)]
    timeout_secs: u64,

    #[command(flatten)]
    cache: CacheArgs,

    #[command(flatten)]
    tool_inputs: ToolInputs,
}

#[derive(ClapArgs, Debug, Clone, Default)]
struct ToolInputs {
    #[arg(long, env = "INPUT_PHPCS_CONFIG")]
    phpcs_config: Option<String>,
    #[arg(long, env = "INPUT_PHPCS_PATTERNS")]
    phpcs_patterns: Option<String>,

    #[arg(long, env = "INPUT_PHP_CS_FIXER_CONFIG")]
    php_cs_fixer_config: Option<String>,
    #[arg(long, env = "INPUT_PHP_CS_FIXER_PATTERNS")]
    php_cs_fixer_patterns: Option<String>,

    #[arg(long, env = "INPUT_PHPSTAN_CONFIG")]
    phpstan_config: Option<String>,
    #[arg(long, env = "INPUT_PHPSTAN_PATTERNS")]
    phpstan_patterns: Option<String>,

    #[arg(long, env = "INPUT_PSALM_CONFIG")]
    psalm_config: Option<String>,
    #[arg(long, env = "INPUT_PSALM_PATTERNS")]
    psalm_patterns: Option<String>,

    #[arg(long, env = "INPUT_PHPMD_CONFIG")]
    phpmd_config: Option<String>,
    #[arg(long, env = "INPUT_PHPMD_PATTERNS")]
    phpmd_patterns: Option<String>,

    #[arg(long, env = "INPUT_RECTOR_CONFIG")]
    rector_config: Option<String>,
    #[arg(long, env = "INPUT_RECTOR_PATTERNS")]
    rector_patterns: Option<String>,

    #[arg(long, env = "INPUT_ESLINT_CONFIG")]
    eslint_config: Option<String>,
    #[arg(long, env = "INPUT_ESLINT_PATTERNS")]
    eslint_patterns: Option<String>,

    #[arg(long, env = "INPUT_STYLELINT_CONFIG")]
    stylelint_config: Option<String>,
    #[arg(long, env = "INPUT_STYLELINT_PATTERNS")]
    stylelint_patterns: Option<String>,
}

impl ToolInputs {
    const fn get(&self, tool: Tool) -> (Option<&String>, Option<&String>) {
        match tool {
            Tool::Phpcs => (self.phpcs_config.as_ref(), self.phpcs_patterns.as_ref()),
            Tool::PhpCsFixer => (
                self.php_cs_fixer_config.as_ref(),
                self.php_cs_fixer_patterns.as_ref(),
            ),
            Tool::Phpstan => (self.phpstan_config.as_ref(), self.phpstan_patterns.as_ref()),
            Tool::Psalm => (self.psalm_config.as_ref(), self.psalm_patterns.as_ref()),
            Tool::Phpmd => (self.phpmd_config.as_ref(), self.phpmd_patterns.as_ref()),
            Tool::Rector => (self.rector_config.as_ref(), self.rector_patterns.as_ref()),
            Tool::Eslint => (self.eslint_config.as_ref(), self.eslint_patterns.as_ref()),
            Tool::Stylelint => (
                self.stylelint_config.as_ref(),
                self.stylelint_patterns.as_ref(),
            ),
        }
    }

    fn configs(&self) -> BTreeMap<Tool, String> {
        Tool::iter()
            .filter_map(|tool| {
                self.get(tool)
                    .0
                    .filter(|x| !x.trim().is_empty())
                    .map(|x| (tool, x.clone()))
            })
            .collect()
    }

    fn patterns(&self) -> BTreeMap<Tool, Vec<String>> {
        Tool::iter()
            .filter_map(|tool| {
                let patterns = split_patterns(self.get(tool).1?);
                (!patterns.is_empty()).then_some((tool, patterns))
            })
            .collect()
    }
}

fn write_outputs(entries: &[(String, String)]) -> Result<(), github::GithubError> {
    match github::env_file(github::OUTPUT_FILE_ENV) {
        Some(path) => github::append_entries(&path, entries),
        None => {
            for (name, value) in entries {
                log::info!("Output {name}: {value}");
            }
            Ok(())
        }
    }
}

fn write_state(state: &CacheState) -> Result<(), github::GithubError> {
    let entries = state.entries();

    match github::env_file(github::STATE_FILE_ENV) {
        Some(path) => github::append_entries(&path, &entries),
        None => {
            for (name, value) in &entries {
                log::info!("State {name}: {value}");
            }
            Ok(())
        }
    }
}

async fn run(args: &RunArgs) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let tools = parse_selection(&args.tools);
    if tools.is_empty() {
        log::warn!("No known tools selected from '{}'", args.tools);
    }

    let settings = RunSettings {
        tools,
        working_directory: args.cache.working_directory.clone(),
        fail_on_errors: args.fail_on_errors,
        configs: args.tool_inputs.configs(),
        patterns: args.tool_inputs.patterns(),
        bundled_config_dir: args
            .bundled_config_dir
            .clone()
            .or_else(github::bundled_config_dir),
        timeout: Duration::from_secs(args.timeout_secs),
        cache: args.cache.settings(),
    };

    let executor = ProcessExecutor;
    let backend = args.cache.backend();
    let mut orchestrator = Orchestrator::new(&executor);
    if let Some(backend) = &backend {
        orchestrator = orchestrator.with_backend(backend);
    }
    let outcome = orchestrator.run(&settings).await?;

    for annotation in &outcome.annotations {
        println!("{annotation}");
    }

    match github::env_file(github::SUMMARY_FILE_ENV) {
        Some(path) => github::append_summary(&path, &outcome.summary)?,
        None => println!("{}", outcome.summary),
    }

    write_outputs(&outcome.outputs())?;

    Ok(match outcome.status {
        RunStatus::Success => ExitCode::SUCCESS,
        RunStatus::Failed => {
            log::error!("Found {} issue(s)", outcome.total_issues);
            ExitCode::FAILURE
        }
    })
}

async fn cache(phase: CachePhase) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let executor = ProcessExecutor;

    match phase {
        CachePhase::Restore(args) => {
            let settings = args.settings();
            let Some(backend) = args.backend() else {
                return Ok(ExitCode::SUCCESS);
            };
            let working_directory = args.working_directory();
            let manager = CacheManager::new(&settings, &working_directory, &executor, &backend);

            let state = manager.restore().await;
            write_state(&state)?;

            let hits = state
                .entries()
                .into_iter()
                .filter(|(name, _)| name.ends_with("-cache-hit"))
                .collect::<Vec<_>>();
            write_outputs(&hits)?;
        }
        CachePhase::Save(args) => {
            let settings = args.settings();
            let Some(backend) = args.backend() else {
                return Ok(ExitCode::SUCCESS);
            };
            let working_directory = args.working_directory();
            let manager = CacheManager::new(&settings, &working_directory, &executor, &backend);

            let state = CacheState::from_entries(github::read_state(&CacheState::entry_names()));
            manager.save(&state).await;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn list_tools(working_directory: &std::path::Path, bundled_config_dir: Option<PathBuf>) {
    let resolver = ConfigResolver::new(bundled_config_dir.or_else(github::bundled_config_dir));

    if let Some(dir) = resolver.bundled_dir() {
        println!("Bundled configs: {}\n", dir.display());
    }

    for tool in Tool::iter() {
        let availability = match locate(tool, working_directory) {
            Some(ToolLocation::Local(path)) => format!("local ({})", path.display()),
            Some(ToolLocation::System(path)) => format!("system ({})", path.display()),
            None => format!("missing, install with: {}", tool.install_hint()),
        };
        let config = resolver
            .resolve(tool, None, working_directory)
            .map_or_else(|| "tool defaults".to_string(), |x| x.display().to_string());
        let opt_in = if tool.is_opt_in() { " [opt-in]" } else { "" };

        println!("{tool} ({}){opt_in}", tool.display_name());
        println!("  binary: {availability}");
        println!("  config: {config}");
    }
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let filters = std::env::var("RUST_LOG").unwrap_or_else(|_| "linthaul=info".to_string());
    pretty_env_logger::formatted_builder()
        .parse_filters(&filters)
        .init();

    let args = Args::parse();

    match args.cmd {
        Commands::Run(args) => run(&args).await,
        Commands::Cache { phase } => cache(phase).await,
        Commands::Tools {
            working_directory,
            bundled_config_dir,
        } => {
            list_tools(&working_directory, bundled_config_dir);
            Ok(ExitCode::SUCCESS)
        }
    }
}
