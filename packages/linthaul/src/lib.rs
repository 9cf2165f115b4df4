#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Runs third-party PHP, JavaScript and CSS linters inside a CI pipeline and
//! normalizes what they report.
//!
//! `linthaul` does not analyze code itself. It acts as an orchestrator:
//!
//! - Detects which tools are installed ([`tools::availability`])
//! - Expands file patterns ([`files`]) and picks a configuration file ([`config`])
//! - Invokes each tool and parses its native output into [`Issue`]s ([`runners`])
//! - Restores and saves dependency caches keyed by lockfile hashes ([`cache`])
//! - Reports results as CI annotations, a summary table and JSON ([`report`])
//!
//! The whole pipeline is sequenced by [`orchestrator::run`].

pub mod cache;
pub mod config;
pub mod files;
pub mod github;
pub mod issue;
pub mod orchestrator;
pub mod process;
pub mod report;
pub mod runners;
pub mod tools;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use issue::{Issue, RunnerConfig, Severity, ToolResult};
pub use orchestrator::{RunOutcome, RunSettings, RunStatus};
pub use tools::Tool;
