//! Restore results carried over to the save phase.

use std::collections::BTreeMap;

use strum::IntoEnumIterator as _;

use crate::tools::Ecosystem;

/// What the restore phase found for one ecosystem.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EcosystemState {
    /// The primary key matched exactly.
    pub hit: bool,
    /// Primary key computed during restore.
    pub key: Option<String>,
}

/// Per-ecosystem restore results.
///
/// Restore and save may run in different processes, so the state flattens to
/// at most two string entries per ecosystem: `{ecosystem}-cache-hit` and
/// `{ecosystem}-cache-key`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheState {
    ecosystems: BTreeMap<Ecosystem, EcosystemState>,
}

fn hit_entry(ecosystem: Ecosystem) -> String {
    format!("{ecosystem}-cache-hit")
}

fn key_entry(ecosystem: Ecosystem) -> String {
    format!("{ecosystem}-cache-key")
}

impl CacheState {
    #[must_use]
    pub fn get(&self, ecosystem: Ecosystem) -> Option<&EcosystemState> {
        self.ecosystems.get(&ecosystem)
    }

    pub fn set(&mut self, ecosystem: Ecosystem, state: EcosystemState) {
        self.ecosystems.insert(ecosystem, state);
    }

    #[must_use]
    pub fn is_hit(&self, ecosystem: Ecosystem) -> bool {
        self.get(ecosystem).is_some_and(|x| x.hit)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ecosystems.is_empty()
    }

    /// Names of every entry the state can flatten to.
    #[must_use]
    pub fn entry_names() -> Vec<String> {
        Ecosystem::iter()
            .flat_map(|x| [hit_entry(x), key_entry(x)])
            .collect()
    }

    /// Flattens the state into name/value entries.
    #[must_use]
    pub fn entries(&self) -> Vec<(String, String)> {
        self.ecosystems
            .iter()
            .flat_map(|(ecosystem, state)| {
                let hit = (hit_entry(*ecosystem), state.hit.to_string());
                let key = state.key.clone().map(|key| (key_entry(*ecosystem), key));
                std::iter::once(hit).chain(key)
            })
            .collect()
    }

    /// Rebuilds a state from entries produced by [`CacheState::entries`].
    ///
    /// Unknown names are ignored. An ecosystem appears in the result when any
    /// of its entries is present.
    #[must_use]
    pub fn from_entries<K: AsRef<str>, V: AsRef<str>>(
        entries: impl IntoIterator<Item = (K, V)>,
    ) -> Self {
        let entries = entries
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect::<BTreeMap<_, _>>();

        let mut state = Self::default();

        for ecosystem in Ecosystem::iter() {
            let hit = entries.get(&hit_entry(ecosystem));
            let key = entries
                .get(&key_entry(ecosystem))
                .filter(|x| !x.is_empty())
                .cloned();

            if hit.is_none() && key.is_none() {
                continue;
            }

            state.set(
                ecosystem,
                EcosystemState {
                    hit: hit.is_some_and(|x| x == "true"),
                    key,
                },
            );
        }

        state
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn flattens_to_named_entries() {
        let mut state = CacheState::default();
        state.set(
            Ecosystem::Composer,
            EcosystemState {
                hit: true,
                key: Some("linthaul-Linux-composer-abc".to_string()),
            },
        );
        state.set(
            Ecosystem::Node,
            EcosystemState {
                hit: false,
                key: None,
            },
        );

        assert_eq!(
            state.entries(),
            vec![
                ("composer-cache-hit".to_string(), "true".to_string()),
                (
                    "composer-cache-key".to_string(),
                    "linthaul-Linux-composer-abc".to_string()
                ),
                ("node-cache-hit".to_string(), "false".to_string()),
            ]
        );
        assert_eq!(CacheState::from_entries(state.entries()), state);
    }

    #[test_log::test]
    fn missing_entries_leave_ecosystem_unset() {
        let state = CacheState::from_entries([("node-cache-key", "k"), ("unrelated", "x")]);

        assert_eq!(state.get(Ecosystem::Composer), None);
        assert_eq!(
            state.get(Ecosystem::Node),
            Some(&EcosystemState {
                hit: false,
                key: Some("k".to_string()),
            })
        );
        assert!(!state.is_hit(Ecosystem::Node));
    }

    #[test_log::test]
    fn entry_names_cover_both_ecosystems() {
        assert_eq!(
            CacheState::entry_names(),
            vec![
                "composer-cache-hit",
                "composer-cache-key",
                "node-cache-hit",
                "node-cache-key",
            ]
        );
    }
}
