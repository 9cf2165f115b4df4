//! GitHub Actions runner files and state.
//!
//! Outputs, step state and the job summary are written to files whose paths
//! the runner passes through environment variables. State saved in one step
//! comes back to later steps of the same action as `STATE_<name>` variables.

use std::{
    fs::OpenOptions,
    io::Write as _,
    path::{Path, PathBuf},
};

pub const OUTPUT_FILE_ENV: &str = "GITHUB_OUTPUT";
pub const STATE_FILE_ENV: &str = "GITHUB_STATE";
pub const SUMMARY_FILE_ENV: &str = "GITHUB_STEP_SUMMARY";
pub const STATE_ENV_PREFIX: &str = "STATE_";
pub const ACTION_PATH_ENV: &str = "GITHUB_ACTION_PATH";
pub const TOOL_CACHE_ENV: &str = "RUNNER_TOOL_CACHE";

#[derive(Debug, thiserror::Error)]
pub enum GithubError {
    #[error("Failed to write '{}': {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Path held by one of the runner file variables, if set and non-empty.
#[must_use]
pub fn env_file(var: &str) -> Option<PathBuf> {
    std::env::var_os(var)
        .filter(|x| !x.is_empty())
        .map(PathBuf::from)
}

/// `configs` next to the running action, where the bundled defaults live.
#[must_use]
pub fn bundled_config_dir() -> Option<PathBuf> {
    env_file(ACTION_PATH_ENV).map(|x| x.join("configs"))
}

/// Default root for the local cache backend: the runner's tool cache, else
/// `~/.cache`.
#[must_use]
pub fn default_cache_root() -> Option<PathBuf> {
    env_file(TOOL_CACHE_ENV)
        .or_else(|| home::home_dir().map(|x| x.join(".cache")))
        .map(|x| x.join("linthaul"))
}

/// Formats one `name=value` entry. Multiline values use the heredoc form with
/// a delimiter that does not occur in the value.
#[must_use]
pub fn format_entry(name: &str, value: &str) -> String {
    if !value.contains(['\n', '\r']) {
        return format!("{name}={value}\n");
    }

    let mut delimiter = "LINTHAUL_EOF".to_string();
    let mut n = 0;
    while value.contains(&delimiter) {
        n += 1;
        delimiter = format!("LINTHAUL_EOF_{n}");
    }

    format!("{name}<<{delimiter}\n{value}\n{delimiter}\n")
}

fn append(path: &Path, contents: &str) -> Result<(), GithubError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .and_then(|mut file| file.write_all(contents.as_bytes()))
        .map_err(|source| GithubError::Write {
            path: path.to_path_buf(),
            source,
        })
}

/// Appends `entries` to an output or state file.
///
/// # Errors
///
/// * If the file cannot be opened or written
pub fn append_entries<K: AsRef<str>, V: AsRef<str>>(
    path: &Path,
    entries: &[(K, V)],
) -> Result<(), GithubError> {
    let contents = entries
        .iter()
        .map(|(k, v)| format_entry(k.as_ref(), v.as_ref()))
        .collect::<String>();

    append(path, &contents)
}

/// Appends markdown to the job summary file.
///
/// # Errors
///
/// * If the file cannot be opened or written
pub fn append_summary(path: &Path, markdown: &str) -> Result<(), GithubError> {
    append(path, markdown)
}

/// Reads state entries saved by an earlier step. Missing names are skipped.
#[must_use]
pub fn read_state(names: &[String]) -> Vec<(String, String)> {
    names
        .iter()
        .filter_map(|name| {
            std::env::var(format!("{STATE_ENV_PREFIX}{name}"))
                .ok()
                .map(|value| (name.clone(), value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn single_line_entry() {
        assert_eq!(format_entry("status", "success"), "status=success\n");
    }

    #[test_log::test]
    fn multiline_entry_uses_heredoc() {
        assert_eq!(
            format_entry("report", "a\nb"),
            "report<<LINTHAUL_EOF\na\nb\nLINTHAUL_EOF\n"
        );
        assert_eq!(
            format_entry("x", "LINTHAUL_EOF\n"),
            "x<<LINTHAUL_EOF_1\nLINTHAUL_EOF\n\nLINTHAUL_EOF_1\n"
        );
    }

    #[test_log::test]
    fn entries_are_appended() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("output");
        std::fs::write(&path, "existing=1\n").unwrap();

        append_entries(&path, &[("status", "failed"), ("total-issues", "3")]).unwrap();

        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "existing=1\nstatus=failed\ntotal-issues=3\n"
        );
    }

    #[test_log::test]
    fn unwritable_path_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("output");

        assert!(matches!(
            append_summary(&path, "# x"),
            Err(GithubError::Write { .. })
        ));
    }
}
