//! Detects whether a tool can be invoked before running it.

use std::path::{Path, PathBuf};

use super::Tool;

/// Where an invocable tool binary was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolLocation {
    /// Installed by the project's package manager (`vendor/bin`, `node_modules/.bin`).
    Local(PathBuf),
    /// Found on `PATH`.
    System(PathBuf),
}

impl ToolLocation {
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::Local(path) | Self::System(path) => path,
        }
    }
}

/// Finds the binary for `tool`, preferring the project-local install over `PATH`.
///
/// Returns `None` when the tool cannot be invoked. Local paths are absolute
/// even when `working_directory` is relative.
#[must_use]
pub fn locate(tool: Tool, working_directory: &Path) -> Option<ToolLocation> {
    let local = working_directory
        .join(tool.ecosystem().local_bin_dir())
        .join(tool.binary());
    let local = std::path::absolute(&local).unwrap_or(local);

    if local.is_file() {
        log::debug!("Tool '{tool}' found locally at {}", local.display());
        return Some(ToolLocation::Local(local));
    }

    #[cfg(windows)]
    {
        let cmd = local.with_extension("cmd");
        if cmd.is_file() {
            log::debug!("Tool '{tool}' found locally at {}", cmd.display());
            return Some(ToolLocation::Local(cmd));
        }
    }

    match which::which(tool.binary()) {
        Ok(path) => {
            log::debug!("Tool '{tool}' detected at: {}", path.display());
            Some(ToolLocation::System(path))
        }
        Err(e) => {
            log::debug!("Tool '{tool}' not found: {e}");
            None
        }
    }
}

/// Decides whether a tool can be run, and from where.
pub trait ToolLocator: Send + Sync {
    fn locate(&self, tool: Tool, working_directory: &Path) -> Option<ToolLocation>;
}

/// [`ToolLocator`] checking the project's local bin dir, then `PATH`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLocator;

impl ToolLocator for SystemLocator {
    fn locate(&self, tool: Tool, working_directory: &Path) -> Option<ToolLocation> {
        locate(tool, working_directory)
    }
}
