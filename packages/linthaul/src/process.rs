//! External command execution.
//!
//! Commands run to completion with their output buffered in memory. A non-zero
//! exit code is a normal outcome and is returned in [`CommandOutput`]; only a
//! failure to spawn, wait on, or finish the process in time is an error.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use async_trait::async_trait;

/// Default upper bound for a single tool invocation.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(600);

#[derive(Debug, thiserror::Error)]
pub enum ExecError {
    #[error("Failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed waiting on '{program}': {source}")]
    Wait {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("'{program}' did not finish within {}s", timeout.as_secs())]
    Timeout { program: String, timeout: Duration },
}

/// Captured result of a finished process.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
    /// `-1` when the process was terminated by a signal.
    pub exit_code: i32,
}

impl CommandOutput {
    #[must_use]
    pub const fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// stdout followed by stderr, for debugging output.
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => format!("{}\n{}", self.stdout, self.stderr),
        }
    }
}

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
    pub timeout: Duration,
}

impl CommandSpec {
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, working_directory: &Path) -> Self {
        Self {
            program: program.into(),
            args: vec![],
            working_directory: working_directory.to_path_buf(),
            timeout: DEFAULT_TIMEOUT,
        }
    }

    #[must_use]
    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The program's file name, used in log lines and errors.
    #[must_use]
    pub fn program_name(&self) -> String {
        self.program.file_name().map_or_else(
            || self.program.display().to_string(),
            |x| x.to_string_lossy().to_string(),
        )
    }
}

/// Runs external commands.
///
/// Everything that talks to a real process goes through this trait so runners,
/// the cache manager and the orchestrator can be driven by a scripted executor
/// in tests.
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Runs the command to completion.
    ///
    /// # Errors
    ///
    /// * [`ExecError::Spawn`] if the process could not be started
    /// * [`ExecError::Wait`] if reading its output failed
    /// * [`ExecError::Timeout`] if it did not finish within `spec.timeout`
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError>;
}

/// [`CommandExecutor`] backed by real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessExecutor;

#[async_trait]
impl CommandExecutor for ProcessExecutor {
    async fn execute(&self, spec: &CommandSpec) -> Result<CommandOutput, ExecError> {
        let program = spec.program_name();

        log::debug!(
            "Running {} {} (cwd={})",
            spec.program.display(),
            spec.args.join(" "),
            spec.working_directory.display()
        );

        let child = tokio::process::Command::new(&spec.program)
            .args(&spec.args)
            .current_dir(&spec.working_directory)
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ExecError::Spawn {
                program: program.clone(),
                source,
            })?;

        // Dropping the future on timeout drops the child, which kills it.
        let output = tokio::time::timeout(spec.timeout, child.wait_with_output())
            .await
            .map_err(|_| ExecError::Timeout {
                program: program.clone(),
                timeout: spec.timeout,
            })?
            .map_err(|source| ExecError::Wait {
                program: program.clone(),
                source,
            })?;

        let result = CommandOutput {
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            exit_code: output.status.code().unwrap_or(-1),
        };

        log::debug!("{program} exited with code {}", result.exit_code);

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test_log::test]
    fn combined_output_joins_streams() {
        let output = CommandOutput {
            stdout: "out".to_string(),
            stderr: "err".to_string(),
            exit_code: 1,
        };
        assert_eq!(output.combined(), "out\nerr");

        let output = CommandOutput {
            stdout: String::new(),
            stderr: "err".to_string(),
            exit_code: 1,
        };
        assert_eq!(output.combined(), "err");
    }

    #[test_log::test]
    fn program_name_is_file_name() {
        let spec = CommandSpec::new("/app/vendor/bin/phpstan", Path::new("/app"));
        assert_eq!(spec.program_name(), "phpstan");
    }

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn non_zero_exit_is_not_an_error() {
        let spec = CommandSpec::new("sh", Path::new("."))
            .args(["-c", "echo out; echo err >&2; exit 3"]);

        let output = ProcessExecutor.execute(&spec).await.unwrap();

        assert_eq!(output.exit_code, 3);
        assert_eq!(output.stdout.trim(), "out");
        assert_eq!(output.stderr.trim(), "err");
    }

    #[cfg(unix)]
    #[test_log::test(tokio::test)]
    async fn slow_command_times_out() {
        let spec = CommandSpec::new("sleep", Path::new("."))
            .args(["5"])
            .timeout(Duration::from_millis(100));

        let err = ProcessExecutor.execute(&spec).await.unwrap_err();

        assert!(matches!(err, ExecError::Timeout { .. }));
    }

    #[test_log::test(tokio::test)]
    async fn missing_program_fails_to_spawn() {
        let spec = CommandSpec::new("linthaul-definitely-missing-binary", Path::new("."));

        let err = ProcessExecutor.execute(&spec).await.unwrap_err();

        assert!(matches!(err, ExecError::Spawn { .. }));
    }
}
