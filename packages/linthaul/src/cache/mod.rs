//! Dependency cache restore and save.
//!
//! Both phases are best effort: every failure is logged as a warning and the
//! run continues uncached. Restore produces a [`CacheState`] that save consumes,
//! so an entry that was an exact hit is never written again.

pub mod backend;
pub mod key;
pub mod state;

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use strum::IntoEnumIterator as _;

use crate::{
    process::{CommandExecutor, CommandSpec},
    tools::Ecosystem,
};

pub use backend::{CacheBackend, LocalCacheBackend};
pub use key::{CacheKeyInfo, PackageManager, content_hash};
pub use state::{CacheState, EcosystemState};

/// Default key prefix.
pub const DEFAULT_KEY_PREFIX: &str = "linthaul";

const DIR_QUERY_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    WalkDir(#[from] walkdir::Error),
    #[error("Cache task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    pub enabled: bool,
    pub composer: bool,
    pub node: bool,
    pub key_prefix: String,
    /// Runner OS segment of the key, e.g. `Linux`.
    pub platform: String,
    /// Overrides Composer's own cache dir lookup (`COMPOSER_CACHE_DIR`).
    pub composer_cache_dir: Option<PathBuf>,
}

impl CacheSettings {
    /// Caching enabled for both ecosystems.
    #[must_use]
    pub fn new(key_prefix: impl Into<String>, platform: impl Into<String>) -> Self {
        Self {
            enabled: true,
            composer: true,
            node: true,
            key_prefix: key_prefix.into(),
            platform: platform.into(),
            composer_cache_dir: None,
        }
    }

    /// Caching turned off.
    #[must_use]
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Ecosystems to cache, in a fixed order.
    #[must_use]
    pub fn ecosystems(&self) -> Vec<Ecosystem> {
        if !self.enabled {
            return vec![];
        }

        Ecosystem::iter()
            .filter(|x| match x {
                Ecosystem::Composer => self.composer,
                Ecosystem::Node => self.node,
            })
            .collect()
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self::new(DEFAULT_KEY_PREFIX, std::env::consts::OS)
    }
}

/// Runs the restore and save phases for one project.
pub struct CacheManager<'a> {
    settings: &'a CacheSettings,
    working_directory: &'a Path,
    executor: &'a dyn CommandExecutor,
    backend: &'a dyn CacheBackend,
}

impl<'a> CacheManager<'a> {
    #[must_use]
    pub fn new(
        settings: &'a CacheSettings,
        working_directory: &'a Path,
        executor: &'a dyn CommandExecutor,
        backend: &'a dyn CacheBackend,
    ) -> Self {
        Self {
            settings,
            working_directory,
            executor,
            backend,
        }
    }

    /// Asks a package manager for one of its directories.
    async fn query_dir(&self, program: &str, args: &[&str]) -> Option<PathBuf> {
        let spec = CommandSpec::new(program, self.working_directory)
            .args(args.iter().copied())
            .timeout(DIR_QUERY_TIMEOUT);

        match self.executor.execute(&spec).await {
            Ok(output) if output.success() => {
                let dir = output.stdout.trim();
                (!dir.is_empty()).then(|| PathBuf::from(dir))
            }
            Ok(output) => {
                log::debug!(
                    "'{program} {}' exited with {}",
                    args.join(" "),
                    output.exit_code
                );
                None
            }
            Err(e) => {
                log::debug!("'{program} {}' failed: {e}", args.join(" "));
                None
            }
        }
    }

    async fn package_cache_dir(&self, manager: PackageManager) -> Option<PathBuf> {
        if manager == PackageManager::Composer
            && let Some(dir) = &self.settings.composer_cache_dir
        {
            return Some(dir.clone());
        }

        let (program, args, fallback): (&str, &[&str], &[&str]) = match manager {
            PackageManager::Composer => (
                "composer",
                &["config", "cache-files-dir"],
                &[".cache", "composer"],
            ),
            PackageManager::Pnpm => (
                "pnpm",
                &["store", "path"],
                &[".local", "share", "pnpm", "store"],
            ),
            PackageManager::Yarn => ("yarn", &["cache", "dir"], &[".cache", "yarn"]),
            PackageManager::Npm => ("npm", &["config", "get", "cache"], &[".npm"]),
        };

        if let Some(dir) = self.query_dir(program, args).await {
            return Some(dir);
        }

        home::home_dir().map(|home| fallback.iter().fold(home, |dir, x| dir.join(x)))
    }

    /// Paths governed by the cache for `ecosystem`.
    pub async fn paths(&self, ecosystem: Ecosystem, manager: PackageManager) -> Vec<PathBuf> {
        let local = match ecosystem {
            Ecosystem::Composer => "vendor",
            Ecosystem::Node => "node_modules",
        };

        let mut paths = vec![self.working_directory.join(local)];
        paths.extend(self.package_cache_dir(manager).await);
        paths
    }

    /// Computes the key, restore keys and paths for `ecosystem`.
    ///
    /// # Errors
    ///
    /// * If the lockfile exists but cannot be read
    pub async fn key_info(&self, ecosystem: Ecosystem) -> Result<CacheKeyInfo, CacheError> {
        let (manager, lockfile) = PackageManager::detect(ecosystem, self.working_directory);

        let hash = match &lockfile {
            Some(path) => Some(content_hash(&tokio::fs::read(path).await?)),
            None => None,
        };

        Ok(CacheKeyInfo::new(
            &self.settings.key_prefix,
            &self.settings.platform,
            manager,
            hash.as_deref(),
            self.paths(ecosystem, manager).await,
        ))
    }

    async fn restore_ecosystem(&self, ecosystem: Ecosystem) -> Option<EcosystemState> {
        let info = match self.key_info(ecosystem).await {
            Ok(info) => info,
            Err(e) => {
                log::warn!("Failed to compute {ecosystem} cache key: {e}");
                return None;
            }
        };

        log::info!("Restoring {ecosystem} cache with key {}", info.key);

        let hit = match self
            .backend
            .restore(&info.paths, &info.key, &info.restore_keys)
            .await
        {
            Ok(Some(matched)) => {
                log::info!("{ecosystem} cache restored from key: {matched}");
                matched == info.key
            }
            Ok(None) => {
                log::info!("{ecosystem} cache not found");
                false
            }
            Err(e) => {
                log::warn!("Failed to restore {ecosystem} cache: {e}");
                false
            }
        };

        Some(EcosystemState {
            hit,
            key: Some(info.key),
        })
    }

    /// Restores every enabled ecosystem. Never fails.
    pub async fn restore(&self) -> CacheState {
        let mut state = CacheState::default();

        for ecosystem in self.settings.ecosystems() {
            if let Some(result) = self.restore_ecosystem(ecosystem).await {
                state.set(ecosystem, result);
            }
        }

        state
    }

    async fn save_ecosystem(&self, ecosystem: Ecosystem, state: &CacheState) {
        if state.is_hit(ecosystem) {
            log::info!("{ecosystem} cache hit occurred on the primary key, not saving cache");
            return;
        }

        let recorded = state.get(ecosystem).and_then(|x| x.key.clone());

        let (key, paths) = if let Some(key) = recorded {
            let (manager, _) = PackageManager::detect(ecosystem, self.working_directory);
            (key, self.paths(ecosystem, manager).await)
        } else {
            match self.key_info(ecosystem).await {
                Ok(info) => (info.key, info.paths),
                Err(e) => {
                    log::warn!("Failed to compute {ecosystem} cache key: {e}");
                    return;
                }
            }
        };

        let existing = paths
            .into_iter()
            .filter(|x| x.exists())
            .collect::<Vec<_>>();

        if existing.is_empty() {
            log::info!("No {ecosystem} cache paths exist, skipping save");
            return;
        }

        log::info!("Saving {ecosystem} cache with key {key}");

        match self.backend.save(&existing, &key).await {
            Ok(()) => log::info!("{ecosystem} cache saved with key: {key}"),
            Err(e) => log::warn!("Failed to save {ecosystem} cache: {e}"),
        }
    }

    /// Saves every enabled ecosystem that was not an exact hit. Never fails.
    pub async fn save(&self, state: &CacheState) {
        for ecosystem in self.settings.ecosystems() {
            self.save_ecosystem(ecosystem, state).await;
        }
    }
}
