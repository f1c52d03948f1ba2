// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// External command execution.
//
// Every interaction with the host print system goes through `CommandRunner`,
// so inventory queries and print methods can be exercised against a fake
// runner.  The production runner spawns through `tokio::process` and bounds
// each invocation with a timeout; a timed-out child is killed on drop.

use std::fmt;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, instrument};

use photoprint_core::error::{PhotoprintError, Result};

/// Which native print path the host offers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostPlatform {
    /// CUPS-style hosts (`lp`, `lpstat`): Linux, macOS, BSD.
    Unix,
    /// Windows hosts (PowerShell, shell verbs, shimgvw).
    Windows,
}

impl HostPlatform {
    /// The platform this binary was compiled for.
    pub fn current() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Unix
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Unix => "unix",
            Self::Windows => "windows",
        }
    }
}

/// A program plus its argument vector. Arguments are never passed through a
/// shell, so paths and printer names need no quoting here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    /// Set on top of the inherited environment.
    pub envs: Vec<(String, String)>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Captured result of a command that ran to completion.
#[derive(Debug, Clone, Default)]
pub struct CommandOutput {
    pub success: bool,
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Turn a non-zero exit into a `Command` error carrying stderr.
    pub fn into_checked(self, spec: &CommandSpec) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        let detail = match (self.code, self.stderr.trim()) {
            (Some(code), "") => format!("exit status {code}"),
            (Some(code), err) => format!("exit status {code}: {err}"),
            (None, "") => "terminated by signal".to_string(),
            (None, err) => format!("terminated by signal: {err}"),
        };
        Err(PhotoprintError::Command {
            program: spec.program.clone(),
            detail,
        })
    }
}

/// Runs external commands.
///
/// `Ok` means the process ran and exited (successfully or not); spawn
/// failures and timeouts are `Err`.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<CommandOutput>;
}

/// Spawns real processes on the host.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandRunner;

#[async_trait]
impl CommandRunner for SystemCommandRunner {
    #[instrument(skip(self, spec), fields(program = %spec.program))]
    async fn run(&self, spec: &CommandSpec, timeout: Duration) -> Result<CommandOutput> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(spec.envs.iter().map(|(k, v)| (k, v)))
            .stdin(Stdio::null())
            .kill_on_drop(true);

        // Keep console windows from flashing up on a kiosk screen.
        #[cfg(windows)]
        cmd.creation_flags(0x0800_0000);

        debug!(command = %spec, "spawning");
        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| PhotoprintError::CommandTimeout {
                program: spec.program.clone(),
                secs: timeout.as_secs(),
            })?
            .map_err(|e| PhotoprintError::Command {
                program: spec.program.clone(),
                detail: format!("spawn: {e}"),
            })?;

        let result = CommandOutput {
            success: output.status.success(),
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        };
        debug!(success = result.success, code = ?result.code, "command finished");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_joins_program_and_args() {
        let spec = CommandSpec::new("lp").args(["-n", "2"]).arg("/tmp/a.png");
        assert_eq!(spec.to_string(), "lp -n 2 /tmp/a.png");
    }

    #[test]
    fn non_zero_exit_becomes_command_error() {
        let spec = CommandSpec::new("lp");
        let output = CommandOutput {
            success: false,
            code: Some(1),
            stdout: String::new(),
            stderr: "lp: The printer or class does not exist.\n".into(),
        };
        match output.into_checked(&spec) {
            Err(PhotoprintError::Command { program, detail }) => {
                assert_eq!(program, "lp");
                assert!(detail.contains("exit status 1"));
                assert!(detail.contains("does not exist"));
            }
            other => panic!("expected command error, got {other:?}"),
        }
    }

    #[test]
    fn zero_exit_passes_through() {
        let spec = CommandSpec::new("lp");
        let output = CommandOutput {
            success: true,
            code: Some(0),
            stdout: "request id is Office-12 (1 file(s))".into(),
            stderr: String::new(),
        };
        assert!(output.into_checked(&spec).is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_reports_exit_status() {
        let runner = SystemCommandRunner;
        let ok = runner
            .run(&CommandSpec::new("true"), Duration::from_secs(5))
            .await
            .expect("spawn true");
        assert!(ok.success);

        let failed = runner
            .run(&CommandSpec::new("false"), Duration::from_secs(5))
            .await
            .expect("spawn false");
        assert!(!failed.success);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_applies_environment() {
        let out = SystemCommandRunner
            .run(
                &CommandSpec::new("sh")
                    .args(["-c", "printf %s \"$LC_ALL\""])
                    .env("LC_ALL", "C"),
                Duration::from_secs(5),
            )
            .await
            .expect("spawn sh");
        assert!(out.success);
        assert_eq!(out.stdout, "C");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn system_runner_times_out() {
        let runner = SystemCommandRunner;
        let err = runner
            .run(&CommandSpec::new("sleep").arg("5"), Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, PhotoprintError::CommandTimeout { .. }));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let runner = SystemCommandRunner;
        let err = runner
            .run(
                &CommandSpec::new("photoprint-no-such-program"),
                Duration::from_secs(5),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, PhotoprintError::Command { .. }));
    }
}
