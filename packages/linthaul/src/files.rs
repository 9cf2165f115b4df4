//! Expands glob patterns into the files a tool should check.

use std::{collections::BTreeSet, path::Path};

use globset::{GlobSet, GlobSetBuilder};
use walkdir::{DirEntry, WalkDir};

/// Directories that are never searched: installed dependencies and VCS data.
const SKIPPED_DIRS: &[&str] = &["vendor", "node_modules", ".git"];

#[derive(Debug, thiserror::Error)]
pub enum FileFinderError {
    #[error("Invalid glob pattern '{pattern}': {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error(transparent)]
    Build(#[from] globset::Error),
}

fn compile(patterns: &[String]) -> Result<GlobSet, FileFinderError> {
    let mut builder = GlobSetBuilder::new();

    for pattern in patterns {
        let pattern = pattern.trim().trim_start_matches("./");
        if pattern.is_empty() {
            continue;
        }
        let glob = globset::GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|source| FileFinderError::InvalidPattern {
                pattern: pattern.to_string(),
                source,
            })?;
        builder.add(glob);
    }

    Ok(builder.build()?)
}

fn is_skipped(entry: &DirEntry) -> bool {
    entry.depth() > 0
        && entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .is_some_and(|name| SKIPPED_DIRS.contains(&name))
}

/// Returns the files under `working_directory` matching any of `patterns`.
///
/// Paths are relative to `working_directory`, use `/` separators, and come
/// back sorted without duplicates.
///
/// # Errors
///
/// * If a pattern is not a valid glob
pub fn find_files(
    working_directory: &Path,
    patterns: &[String],
) -> Result<Vec<String>, FileFinderError> {
    let set = compile(patterns)?;

    if set.is_empty() {
        return Ok(vec![]);
    }

    let mut found = BTreeSet::new();

    for entry in WalkDir::new(working_directory)
        .follow_links(false)
        .into_iter()
        .filter_entry(|x| !is_skipped(x))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                log::debug!("Skipping unreadable entry: {e}");
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(working_directory) else {
            continue;
        };

        let relative = relative
            .components()
            .map(|x| x.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/");

        if set.is_match(&relative) {
            found.insert(relative);
        }
    }

    log::debug!(
        "Patterns {patterns:?} matched {} file(s) in {}",
        found.len(),
        working_directory.display()
    );

    Ok(found.into_iter().collect())
}

/// Splits a comma or newline separated pattern input.
#[must_use]
pub fn split_patterns(input: &str) -> Vec<String> {
    input
        .split([',', '\n'])
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .map(ToString::to_string)
        .collect()
}
