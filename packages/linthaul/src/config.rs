//! Per-tool configuration file resolution.
//!
//! Precedence, first match wins:
//!
//! 1. A user supplied path, if the file exists
//! 2. A conventional config file in the project root
//! 3. The default config bundled with linthaul
//! 4. Nothing, letting the tool apply its own defaults
//!
//! Resolution never fails. A missing custom path is reported as a warning and
//! resolution continues with the next tier. Resolved paths are always absolute.

use std::path::{Path, PathBuf};

use crate::tools::Tool;

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigResolver {
    bundled_dir: Option<PathBuf>,
}

impl ConfigResolver {
    /// `bundled_dir` holds the shipped default configs, if any.
    #[must_use]
    pub const fn new(bundled_dir: Option<PathBuf>) -> Self {
        Self { bundled_dir }
    }

    #[must_use]
    pub fn bundled_dir(&self) -> Option<&Path> {
        self.bundled_dir.as_deref()
    }

    /// Picks the config file `tool` should run with.
    #[must_use]
    pub fn resolve(
        &self,
        tool: Tool,
        custom_path: Option<&str>,
        working_directory: &Path,
    ) -> Option<PathBuf> {
        if let Some(custom) = custom_path.map(str::trim).filter(|x| !x.is_empty()) {
            let path = absolute(working_directory.join(custom));
            if path.is_file() {
                log::info!("Using custom {tool} config: {}", path.display());
                return Some(path);
            }
            log::warn!(
                "Custom {tool} config '{}' not found, falling back to defaults",
                path.display()
            );
        }

        if let Some(path) = tool
            .config_candidates()
            .iter()
            .map(|name| absolute(working_directory.join(name)))
            .find(|path| path.is_file())
        {
            log::info!("Using project {tool} config: {}", path.display());
            return Some(path);
        }

        if let Some(path) = self
            .bundled_dir
            .as_ref()
            .zip(tool.bundled_config())
            .map(|(dir, name)| absolute(dir.join(name)))
            .filter(|path| path.is_file())
        {
            log::info!("Using bundled {tool} config: {}", path.display());
            return Some(path);
        }

        log::info!("No {tool} config found, using the tool's built-in defaults");
        None
    }
}
