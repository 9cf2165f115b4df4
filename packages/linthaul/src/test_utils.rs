//! In-memory fakes for the process, cache and tool lookup seams.

use std::{
    collections::{BTreeMap, BTreeSet},
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use async_trait::async_trait;

use crate::{
    cache::{CacheBackend, CacheError},
    process::{CommandExecutor, CommandOutput, CommandSpec, ExecError},
    tools::{Tool, ToolLocation, ToolLocator},
};

#[derive(Debug, Clone)]
enum Response {
    Output(CommandOutput),
    SpawnFailure,
}

/// [`CommandExecutor`] answering from a script keyed by program file name.
///
/// Programs without a scripted response fail to spawn with `NotFound`, as an
/// uninstalled binary would.
#[derive(Debug, Default)]
pub struct ScriptedExecutor {
    responses: BTreeMap<String, Response>,
    calls: Mutex<Vec<CommandSpec>>,
}

impl ScriptedExecutor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn respond(mut self, program: &str, exit_code: i32, stdout: &str, stderr: &str) -> Self {
        self.responses.insert(
            program.to_string(),
            Response::Output(CommandOutput {
                stdout: stdout.to_string(),
                stderr: stderr.to_string(),
                exit_code,
            }),
        );
        self
    }

    #[must_use]
    pub fn fail_spawn(mut self, program: &str) -> Self {
        self.responses
            .insert(program.to_string(), Response::SpawnFailure);
        self
    }

    /// Every command executed so far, in order.
    #[must_use]
    pub fn calls(&self) -> Vec<CommandSpec> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// File names of the programs executed so far, in order.
    #[must_use]
    pub fn programs(&self) -> Vec<String> {
        self.calls().iter().map(CommandSpec::program_name).collect()
    }
}

#[async_trait]
impl CommandExecutor for ScriptedExecutor {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(spec.clone());

        let program = spec.program_name();

        match self.responses.get(&program) {
            Some(Response::Output(output)) => Ok(output.clone()),
            Some(Response::SpawnFailure) | None => Err(ExecError::Spawn {
                program,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "not installed"),
            }),
        }
    }
}

/// [`CacheBackend`] that stores nothing and records every save.
#[derive(Debug, Default)]
pub struct RecordingCacheBackend {
    entries: Vec<String>,
    fail: bool,
    saves: Mutex<Vec<(String, Vec<PathBuf>)>>,
}

impl RecordingCacheBackend {
    /// Backend that already holds an entry under `key`.
    #[must_use]
    pub fn with_entry(key: &str) -> Self {
        Self {
            entries: vec![key.to_string()],
            ..Self::default()
        }
    }

    /// Backend whose every operation fails.
    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Keys and paths passed to `save`, in order.
    #[must_use]
    pub fn saves(&self) -> Vec<(String, Vec<PathBuf>)> {
        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn failure() -> CacheError {
        CacheError::Io(std::io::Error::other("cache service unavailable"))
    }
}

#[async_trait]
impl CacheBackend for RecordingCacheBackend {
    async fn restore(
        &self,
        _paths: &[PathBuf],
        key: &str,
        restore_keys: &[String],
    ) -> Result<Option<String>, CacheError> {
        if self.fail {
            return Err(Self::failure());
        }

        if self.entries.iter().any(|x| x == key) {
            return Ok(Some(key.to_string()));
        }

        Ok(restore_keys.iter().find_map(|prefix| {
            self.entries
                .iter()
                .find(|x| x.starts_with(prefix.as_str()))
                .cloned()
        }))
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> Result<(), CacheError> {
        if self.fail {
            return Err(Self::failure());
        }

        self.saves
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((key.to_string(), paths.to_vec()));
        Ok(())
    }
}

/// [`ToolLocator`] reporting a fixed set of tools as locally installed.
#[derive(Debug, Default, Clone)]
pub struct FixedLocator {
    installed: BTreeSet<Tool>,
}

impl FixedLocator {
    #[must_use]
    pub fn new(installed: impl IntoIterator<Item = Tool>) -> Self {
        Self {
            installed: installed.into_iter().collect(),
        }
    }
}

impl ToolLocator for FixedLocator {
    fn locate(&self, tool: Tool, working_directory: &Path) -> Option<ToolLocation> {
        self.installed.contains(&tool).then(|| {
            ToolLocation::Local(
                working_directory
                    .join(tool.ecosystem().local_bin_dir())
                    .join(tool.binary()),
            )
        })
    }
}
