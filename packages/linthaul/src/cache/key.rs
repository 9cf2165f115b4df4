//! Cache key derivation.
//!
//! A key looks like `{prefix}-{platform}-{label}-{hash}` where `label` names
//! the package manager that owns the lockfile and `hash` is the first 16 hex
//! characters of the lockfile's SHA-256. Restore keys drop trailing segments
//! one at a time so a stale entry can still seed the install.

use std::path::{Path, PathBuf};

use sha2::{Digest as _, Sha256};

use crate::tools::Ecosystem;

/// Hash used when the project has no lockfile.
pub const NO_LOCK_HASH: &str = "no-lock";

const HASH_LEN: usize = 16;

/// Package manager whose lockfile keys a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PackageManager {
    Composer,
    Pnpm,
    Yarn,
    Npm,
}

impl PackageManager {
    /// Node lockfiles in detection order. The first one present wins.
    pub const NODE: [Self; 3] = [Self::Pnpm, Self::Yarn, Self::Npm];

    #[must_use]
    pub const fn lockfile_name(self) -> &'static str {
        match self {
            Self::Composer => "composer.lock",
            Self::Pnpm => "pnpm-lock.yaml",
            Self::Yarn => "yarn.lock",
            Self::Npm => "package-lock.json",
        }
    }

    /// Key segment identifying the package manager.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Composer => "composer",
            Self::Pnpm => "pnpm",
            Self::Yarn => "yarn",
            Self::Npm => "npm",
        }
    }

    /// Detects the package manager for `ecosystem` from the lockfiles present
    /// in `working_directory`.
    ///
    /// Node projects without a lockfile are treated as npm projects.
    #[must_use]
    pub fn detect(ecosystem: Ecosystem, working_directory: &Path) -> (Self, Option<PathBuf>) {
        let candidates: &[Self] = match ecosystem {
            Ecosystem::Composer => &[Self::Composer],
            Ecosystem::Node => &Self::NODE,
        };

        candidates
            .iter()
            .map(|manager| (*manager, working_directory.join(manager.lockfile_name())))
            .find(|(_, path)| path.is_file())
            .map_or_else(
                || (candidates[candidates.len() - 1], None),
                |(manager, path)| (manager, Some(path)),
            )
    }
}

impl std::fmt::Display for PackageManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Truncated lowercase hex SHA-256 of `contents`.
#[must_use]
pub fn content_hash(contents: &[u8]) -> String {
    let digest = hex::encode(Sha256::digest(contents));
    digest[..HASH_LEN].to_string()
}

/// Everything needed to restore or save one ecosystem's cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheKeyInfo {
    pub key: String,
    /// Fallback prefixes, most specific first.
    pub restore_keys: Vec<String>,
    pub paths: Vec<PathBuf>,
}

impl CacheKeyInfo {
    /// Builds the primary key and its restore keys.
    ///
    /// `hash` is `None` when there is no lockfile.
    #[must_use]
    pub fn new(
        prefix: &str,
        platform: &str,
        manager: PackageManager,
        hash: Option<&str>,
        paths: Vec<PathBuf>,
    ) -> Self {
        let label = manager.label();
        let hash = hash.unwrap_or(NO_LOCK_HASH);

        Self {
            key: format!("{prefix}-{platform}-{label}-{hash}"),
            restore_keys: vec![
                format!("{prefix}-{platform}-{label}-"),
                format!("{prefix}-{platform}-"),
                format!("{prefix}-"),
            ],
            paths,
        }
    }
}
