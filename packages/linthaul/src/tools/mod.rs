//! The closed set of supported tools.
//!
//! Every per-tool fact (binary name, default file patterns, conventional
//! config file names, bundled default config, install hint and runner) hangs
//! off [`Tool`], so adding a tool is a compile-checked change to one `match`
//! per fact.

pub mod availability;

use std::str::FromStr as _;

use itertools::Itertools as _;
use serde::Serialize;
use strum::IntoEnumIterator as _;
use strum_macros::{AsRefStr, EnumIter, EnumString, IntoStaticStr};

use crate::runners::{
    ToolRunner, eslint::EslintRunner, php_cs_fixer::PhpCsFixerRunner, phpcs::PhpcsRunner,
    phpmd::PhpmdRunner, phpstan::PhpstanRunner, psalm::PsalmRunner, rector::RectorRunner,
    stylelint::StylelintRunner,
};

pub use availability::{SystemLocator, ToolLocation, ToolLocator, locate};

/// Dependency ecosystem a tool is installed through.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, AsRefStr, EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Ecosystem {
    /// PHP dependencies managed by Composer.
    Composer,
    /// JavaScript dependencies managed by npm, yarn or pnpm.
    Node,
}

impl Ecosystem {
    /// Directory, relative to the project root, holding locally installed
    /// tool binaries.
    #[must_use]
    pub const fn local_bin_dir(self) -> &'static str {
        match self {
            Self::Composer => "vendor/bin",
            Self::Node => "node_modules/.bin",
        }
    }
}

impl std::fmt::Display for Ecosystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_ref())
    }
}

/// A supported external analysis tool.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    EnumIter,
    EnumString,
    IntoStaticStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case", ascii_case_insensitive)]
pub enum Tool {
    Phpcs,
    PhpCsFixer,
    Phpstan,
    Psalm,
    Phpmd,
    Rector,
    Eslint,
    Stylelint,
}

const PHP_PATTERNS: &[&str] = &["**/*.php"];
const JS_PATTERNS: &[&str] = &["**/*.{js,jsx,ts,tsx,mjs,cjs}"];
const STYLE_PATTERNS: &[&str] = &["**/*.{css,scss}"];

impl Tool {
    /// Identifier used in inputs, e.g. `php-cs-fixer`.
    #[must_use]
    pub fn id(self) -> &'static str {
        self.into()
    }

    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Phpcs => "PHP_CodeSniffer",
            Self::PhpCsFixer => "PHP CS Fixer",
            Self::Phpstan => "PHPStan",
            Self::Psalm => "Psalm",
            Self::Phpmd => "PHP Mess Detector",
            Self::Rector => "Rector",
            Self::Eslint => "ESLint",
            Self::Stylelint => "Stylelint",
        }
    }

    /// Executable name, looked up in the ecosystem's local bin dir and `PATH`.
    #[must_use]
    pub const fn binary(self) -> &'static str {
        match self {
            Self::Phpcs => "phpcs",
            Self::PhpCsFixer => "php-cs-fixer",
            Self::Phpstan => "phpstan",
            Self::Psalm => "psalm",
            Self::Phpmd => "phpmd",
            Self::Rector => "rector",
            Self::Eslint => "eslint",
            Self::Stylelint => "stylelint",
        }
    }

    #[must_use]
    pub const fn ecosystem(self) -> Ecosystem {
        match self {
            Self::Phpcs
            | Self::PhpCsFixer
            | Self::Phpstan
            | Self::Psalm
            | Self::Phpmd
            | Self::Rector => Ecosystem::Composer,
            Self::Eslint | Self::Stylelint => Ecosystem::Node,
        }
    }

    /// Glob patterns used when the caller supplies none.
    #[must_use]
    pub const fn default_patterns(self) -> &'static [&'static str] {
        match self {
            Self::Phpcs
            | Self::PhpCsFixer
            | Self::Phpstan
            | Self::Psalm
            | Self::Phpmd
            | Self::Rector => PHP_PATTERNS,
            Self::Eslint => JS_PATTERNS,
            Self::Stylelint => STYLE_PATTERNS,
        }
    }

    /// Conventional config file names searched in the project root, in
    /// priority order.
    #[must_use]
    pub const fn config_candidates(self) -> &'static [&'static str] {
        match self {
            Self::Phpcs => &[
                "phpcs.xml",
                ".phpcs.xml",
                "phpcs.xml.dist",
                ".phpcs.xml.dist",
            ],
            Self::PhpCsFixer => &[".php-cs-fixer.php", ".php-cs-fixer.dist.php"],
            Self::Phpstan => &["phpstan.neon", "phpstan.neon.dist", "phpstan.dist.neon"],
            Self::Psalm => &["psalm.xml", "psalm.xml.dist"],
            Self::Phpmd => &["phpmd.xml", "phpmd.xml.dist", ".phpmd.xml"],
            Self::Rector => &["rector.php"],
            Self::Eslint => &[
                "eslint.config.js",
                "eslint.config.mjs",
                "eslint.config.cjs",
                ".eslintrc.js",
                ".eslintrc.cjs",
                ".eslintrc.json",
                ".eslintrc.yml",
                ".eslintrc.yaml",
                ".eslintrc",
            ],
            Self::Stylelint => &[
                ".stylelintrc",
                ".stylelintrc.json",
                ".stylelintrc.yml",
                ".stylelintrc.yaml",
                ".stylelintrc.js",
                "stylelint.config.js",
                "stylelint.config.cjs",
                "stylelint.config.mjs",
            ],
        }
    }

    /// File name of the default config shipped in the bundled config dir.
    #[must_use]
    pub const fn bundled_config(self) -> Option<&'static str> {
        match self {
            Self::Phpcs => Some("phpcs.xml"),
            Self::Phpstan => Some("phpstan.neon"),
            Self::Phpmd => Some("phpmd.xml"),
            Self::Eslint => Some("eslint.config.mjs"),
            Self::Stylelint => Some(".stylelintrc.json"),
            Self::PhpCsFixer | Self::Psalm | Self::Rector => None,
        }
    }

    /// Command a user runs to install the tool.
    #[must_use]
    pub const fn install_hint(self) -> &'static str {
        match self {
            Self::Phpcs => "composer require --dev squizlabs/php_codesniffer",
            Self::PhpCsFixer => "composer require --dev friendsofphp/php-cs-fixer",
            Self::Phpstan => "composer require --dev phpstan/phpstan",
            Self::Psalm => "composer require --dev vimeo/psalm",
            Self::Phpmd => "composer require --dev phpmd/phpmd",
            Self::Rector => "composer require --dev rector/rector",
            Self::Eslint => "npm install --save-dev eslint",
            Self::Stylelint => "npm install --save-dev stylelint stylelint-config-standard",
        }
    }

    /// Opt-in tools only run when named explicitly, never through `all`.
    #[must_use]
    pub const fn is_opt_in(self) -> bool {
        matches!(self, Self::Rector)
    }

    #[must_use]
    pub fn runner(self) -> Box<dyn ToolRunner> {
        match self {
            Self::Phpcs => Box::new(PhpcsRunner),
            Self::PhpCsFixer => Box::new(PhpCsFixerRunner),
            Self::Phpstan => Box::new(PhpstanRunner),
            Self::Psalm => Box::new(PsalmRunner),
            Self::Phpmd => Box::new(PhpmdRunner),
            Self::Rector => Box::new(RectorRunner),
            Self::Eslint => Box::new(EslintRunner),
            Self::Stylelint => Box::new(StylelintRunner),
        }
    }
}

impl std::fmt::Display for Tool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Selection keyword meaning every non-opt-in tool.
pub const ALL_TOOLS: &str = "all";

/// Parses a comma or whitespace separated tool list.
///
/// `all` expands to every tool except the opt-in ones, which are still added
/// when named next to it. Unknown names are logged and skipped. Order follows
/// the input, duplicates keep their first position.
#[must_use]
pub fn parse_selection(input: &str) -> Vec<Tool> {
    input
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|x| !x.is_empty())
        .flat_map(|name| {
            if name.eq_ignore_ascii_case(ALL_TOOLS) {
                return Tool::iter().filter(|x| !x.is_opt_in()).collect_vec();
            }
            Tool::from_str(name).map_or_else(
                |_| {
                    log::warn!("Unknown tool '{name}', ignoring it");
                    vec![]
                },
                |tool| vec![tool],
            )
        })
        .unique()
        .collect()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn all_excludes_opt_in_tool() {
        let tools = parse_selection("all");

        assert!(!tools.contains(&Tool::Rector));
        assert_eq!(tools.len(), Tool::iter().count() - 1);
    }

    #[test_log::test]
    fn opt_in_tool_is_added_when_named() {
        let tools = parse_selection("all, rector");

        assert_eq!(tools.last(), Some(&Tool::Rector));
        assert_eq!(tools.len(), Tool::iter().count());
    }

    #[test_log::test]
    fn selection_keeps_caller_order() {
        assert_eq!(
            parse_selection("eslint,phpstan PHPCS"),
            vec![Tool::Eslint, Tool::Phpstan, Tool::Phpcs]
        );
    }

    #[test_log::test]
    fn selection_drops_unknown_and_duplicate_names() {
        assert_eq!(
            parse_selection("phpstan,bogus,phpstan,php-cs-fixer"),
            vec![Tool::Phpstan, Tool::PhpCsFixer]
        );
    }

    #[test_log::test]
    fn ids_round_trip() {
        for tool in Tool::iter() {
            assert_eq!(Tool::from_str(tool.id()).unwrap(), tool);
        }
        assert_eq!(Tool::PhpCsFixer.id(), "php-cs-fixer");
    }

    #[test_log::test]
    fn js_tools_use_node_ecosystem() {
        assert_eq!(Tool::Eslint.ecosystem(), Ecosystem::Node);
        assert_eq!(Tool::Stylelint.ecosystem(), Ecosystem::Node);
        assert_eq!(Tool::Phpmd.ecosystem(), Ecosystem::Composer);
    }
}
