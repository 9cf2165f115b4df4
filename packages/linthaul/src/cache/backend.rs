//! Storage for cache entries.

use std::{
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use super::CacheError;

const MANIFEST: &str = "paths.json";

/// Restore/save primitive behind the cache manager.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Restores `paths` from the entry matching `key`, or from the newest
    /// entry matching the first `restore_keys` prefix that has one.
    ///
    /// Returns the key of the restored entry, `None` on a miss.
    ///
    /// # Errors
    ///
    /// * If the backing store could not be read or the paths written
    async fn restore(
        &self,
        paths: &[PathBuf],
        key: &str,
        restore_keys: &[String],
    ) -> Result<Option<String>, CacheError>;

    /// Saves `paths` under `key`. Existing entries are never overwritten.
    ///
    /// # Errors
    ///
    /// * If the paths could not be read or the entry written
    async fn save(&self, paths: &[PathBuf], key: &str) -> Result<(), CacheError>;
}

#[derive(Debug, Serialize, Deserialize)]
struct Manifest {
    paths: Vec<PathBuf>,
}

/// [`CacheBackend`] keeping entries as plain directory trees.
///
/// Layout: `<root>/<key>/paths.json` lists the saved paths, and the n-th path
/// is stored under `<root>/<key>/<n>`. Keys and prefixes are mapped to a single
/// path component first, so a key can never point outside `root`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalCacheBackend {
    root: PathBuf,
}

impl LocalCacheBackend {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// Directory name for a key or key prefix. Anything other than ASCII
/// alphanumerics, `-`, `_` and `.` becomes `_`, as does a leading `.`.
fn entry_name(key: &str) -> String {
    key.char_indices()
        .map(|(index, c)| match c {
            '.' if index == 0 => '_',
            c if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') => c,
            _ => '_',
        })
        .collect()
}

fn entry_written_at(entry: &Path) -> Option<SystemTime> {
    fs::metadata(entry.join(MANIFEST))
        .and_then(|x| x.modified())
        .ok()
}

/// Finds the entry to restore: the exact key first, then the newest entry
/// for each prefix in turn.
fn find_entry(
    root: &Path,
    key: &str,
    restore_keys: &[String],
) -> Result<Option<String>, CacheError> {
    let name = entry_name(key);
    if entry_written_at(&root.join(&name)).is_some() {
        return Ok(Some(name));
    }

    if !root.is_dir() {
        return Ok(None);
    }

    let mut entries = vec![];
    for dir in fs::read_dir(root)? {
        let dir = dir?;
        let Ok(name) = dir.file_name().into_string() else {
            continue;
        };
        if let Some(written_at) = entry_written_at(&dir.path()) {
            entries.push((name, written_at));
        }
    }

    for prefix in restore_keys {
        let prefix = entry_name(prefix);
        let newest = entries
            .iter()
            .filter(|(name, _)| name.starts_with(prefix.as_str()))
            .max_by_key(|(_, written_at)| *written_at);

        if let Some((name, _)) = newest {
            return Ok(Some(name.clone()));
        }
    }

    Ok(None)
}

fn copy_path(source: &Path, destination: &Path) -> Result<(), CacheError> {
    if source.is_file() {
        if let Some(parent) = destination.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(source, destination)?;
        return Ok(());
    }

    for entry in WalkDir::new(source).follow_links(false) {
        let entry = entry?;
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let target = destination.join(relative);
        let file_type = entry.file_type();

        if file_type.is_dir() {
            fs::create_dir_all(&target)?;
        } else if file_type.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target)?;
        }
    }

    Ok(())
}

#[cfg(unix)]
fn copy_symlink(source: &Path, target: &Path) -> Result<(), CacheError> {
    let link = fs::read_link(source)?;
    if fs::symlink_metadata(target).is_ok() {
        fs::remove_file(target)?;
    }
    std::os::unix::fs::symlink(link, target)?;
    Ok(())
}

#[cfg(not(unix))]
fn copy_symlink(source: &Path, target: &Path) -> Result<(), CacheError> {
    if source.is_file() {
        fs::copy(source, target)?;
    }
    Ok(())
}

fn restore_entry(entry: &Path, paths: &[PathBuf]) -> Result<(), CacheError> {
    let manifest: Manifest = serde_json::from_slice(&fs::read(entry.join(MANIFEST))?)?;

    for (index, saved) in manifest.paths.iter().enumerate() {
        if !paths.contains(saved) {
            log::debug!("Skipping cached path {} not requested", saved.display());
            continue;
        }
        copy_path(&entry.join(index.to_string()), saved)?;
    }

    Ok(())
}

fn save_entry(root: &Path, key: &str, paths: &[PathBuf]) -> Result<(), CacheError> {
    let name = entry_name(key);
    let entry = root.join(&name);
    if entry.exists() {
        log::info!("Cache entry {key} already exists, not saving");
        return Ok(());
    }

    let staging = root.join(format!(".{name}.partial"));
    if staging.exists() {
        fs::remove_dir_all(&staging)?;
    }
    fs::create_dir_all(&staging)?;

    for (index, path) in paths.iter().enumerate() {
        copy_path(path, &staging.join(index.to_string()))?;
    }

    let manifest = Manifest {
        paths: paths.to_vec(),
    };
    fs::write(staging.join(MANIFEST), serde_json::to_vec_pretty(&manifest)?)?;
    fs::rename(&staging, &entry)?;

    Ok(())
}

#[async_trait]
impl CacheBackend for LocalCacheBackend {
    async fn restore(
        &self,
        paths: &[PathBuf],
        key: &str,
        restore_keys: &[String],
    ) -> Result<Option<String>, CacheError> {
        let root = self.root.clone();
        let paths = paths.to_vec();
        let key = key.to_string();
        let restore_keys = restore_keys.to_vec();

        tokio::task::spawn_blocking(move || -> Result<Option<String>, CacheError> {
            let Some(matched) = find_entry(&root, &key, &restore_keys)? else {
                return Ok(None);
            };
            restore_entry(&root.join(&matched), &paths)?;
            if matched == entry_name(&key) {
                return Ok(Some(key));
            }
            Ok(Some(matched))
        })
        .await?
    }

    async fn save(&self, paths: &[PathBuf], key: &str) -> Result<(), CacheError> {
        let root = self.root.clone();
        let paths = paths.to_vec();
        let key = key.to_string();

        tokio::task::spawn_blocking(move || save_entry(&root, &key, &paths)).await?
    }
}
