// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 PCC Arena Contributors

//! Process runner for codecs and metric tools

use chrono::Utc;
use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::error::{ArenaError, Result};

/// A fully described external command
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(OsString, OsString)>,
}

impl ToolCommand {
    pub fn new(program: impl Into<OsString>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            envs: Vec::new(),
        }
    }

    pub fn arg(mut self, arg: impl Into<OsString>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Append `<flag><path>`, e.g. `--fileA=/data/a.ply`
    pub fn flag_path(self, flag: &str, path: &Path) -> Self {
        let mut arg = OsString::from(flag);
        arg.push(path.as_os_str());
        self.arg(arg)
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn env(mut self, key: impl Into<OsString>, value: impl Into<OsString>) -> Self {
        self.envs.push((key.into(), value.into()));
        self
    }

    pub fn program(&self) -> &OsString {
        &self.program
    }

    pub fn arguments(&self) -> &[OsString] {
        &self.args
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn env_var(&self, key: &str) -> Option<&OsString> {
        self.envs.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Shell-like rendering used in logs and diagnostics
    pub fn display(&self) -> String {
        let mut line = self.program.to_string_lossy().into_owned();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn to_command(&self) -> Command {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(dir) = &self.cwd {
            command.current_dir(dir);
        }
        for (key, value) in &self.envs {
            command.env(key, value);
        }
        command
    }
}

/// Captured output of a successful run
#[derive(Debug, Clone)]
pub struct ToolOutput {
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

/// Runs external tools and records failures to diagnostic files
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    diagnostics_dir: Option<PathBuf>,
}

impl ToolRunner {
    /// Runner that writes a diagnostic file for every failed invocation
    pub fn new(diagnostics_dir: impl Into<PathBuf>) -> Self {
        Self {
            diagnostics_dir: Some(diagnostics_dir.into()),
        }
    }

    /// Runner that only reports failures through the returned error
    pub fn without_diagnostics() -> Self {
        Self::default()
    }

    pub fn diagnostics_dir(&self) -> Option<&Path> {
        self.diagnostics_dir.as_deref()
    }

    /// Run to completion, failing on launch errors and non-zero exits
    pub fn run(&self, tool: &ToolCommand) -> Result<ToolOutput> {
        let line = tool.display();
        debug!(command = %line, "running tool");

        let start = Instant::now();
        let output = match tool.to_command().output() {
            Ok(output) => output,
            Err(e) => {
                let reason = format!("failed to launch: {}", e);
                let diagnostic = self.record_failure(tool, &reason, "", "");
                return Err(ArenaError::ToolInvocation {
                    command: line,
                    reason,
                    diagnostic,
                });
            }
        };
        let elapsed = start.elapsed();

        if !output.status.success() {
            let reason = format!("exited with {}", output.status);
            let diagnostic = self.record_failure(
                tool,
                &reason,
                &String::from_utf8_lossy(&output.stdout),
                &String::from_utf8_lossy(&output.stderr),
            );
            return Err(ArenaError::ToolInvocation {
                command: line,
                reason,
                diagnostic,
            });
        }

        Ok(ToolOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            elapsed,
        })
    }

    /// Error for a run that succeeded but whose output is unusable
    pub fn reject(&self, tool: &ToolCommand, output: &ToolOutput, reason: &str) -> ArenaError {
        let diagnostic = self.record_failure(tool, reason, &output.stdout, &output.stderr);
        ArenaError::ToolInvocation {
            command: tool.display(),
            reason: reason.to_string(),
            diagnostic,
        }
    }

    fn record_failure(&self, tool: &ToolCommand, reason: &str, stdout: &str, stderr: &str) -> Option<PathBuf> {
        let text = format!(
            "command: {}\nreason: {}\n\n--- stdout ---\n{}\n--- stderr ---\n{}\n",
            tool.display(),
            reason,
            stdout,
            stderr
        );
        self.write_diagnostic(tool, &text)
    }

    fn write_diagnostic(&self, tool: &ToolCommand, text: &str) -> Option<PathBuf> {
        let dir = self.diagnostics_dir.as_ref()?;
        let program = Path::new(&tool.program)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "tool".to_string());
        let path = dir.join(format!(
            "{}_{}.log",
            Utc::now().format("%Y%m%d-%H%M%S%.6f"),
            program.replace(['/', '\\', ' '], "_")
        ));

        let written = fs::create_dir_all(dir).and_then(|_| fs::write(&path, text));
        match written {
            Ok(()) => Some(path),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "could not write diagnostic file");
                None
            }
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_captures_stdout() {
        let runner = ToolRunner::without_diagnostics();
        let tool = ToolCommand::new("sh").args(["-c", "echo 'CD        (p2point): 1.5'"]);
        let output = runner.run(&tool).unwrap();
        assert_eq!(output.stdout.trim(), "CD        (p2point): 1.5");
    }

    #[test]
    fn test_failure_writes_diagnostic() {
        let dir = TempDir::new().unwrap();
        let runner = ToolRunner::new(dir.path());
        let tool = ToolCommand::new("sh").args(["-c", "echo boom >&2; exit 3"]);

        let err = runner.run(&tool).unwrap_err();
        let diagnostic = err.diagnostic().cloned().unwrap();
        let text = fs::read_to_string(diagnostic).unwrap();
        assert!(text.contains("sh -c echo boom >&2; exit 3"));
        assert!(text.contains("boom"));
    }

    #[test]
    fn test_launch_failure() {
        let runner = ToolRunner::without_diagnostics();
        let tool = ToolCommand::new("/nonexistent/pc_error");
        match runner.run(&tool) {
            Err(ArenaError::ToolInvocation { reason, diagnostic, .. }) => {
                assert!(reason.starts_with("failed to launch"));
                assert!(diagnostic.is_none());
            }
            other => panic!("unexpected: {:?}", other.map(|o| o.stdout)),
        }
    }

    #[test]
    fn test_environment_and_cwd() {
        let dir = TempDir::new().unwrap();
        let tool = ToolCommand::new("sh")
            .args(["-c", "echo $CUDA_VISIBLE_DEVICES; pwd"])
            .env("CUDA_VISIBLE_DEVICES", "2")
            .current_dir(dir.path());
        let output = ToolRunner::without_diagnostics().run(&tool).unwrap();
        let mut lines = output.stdout.lines();
        assert_eq!(lines.next(), Some("2"));
        assert_eq!(tool.env_var("CUDA_VISIBLE_DEVICES").unwrap(), "2");
    }
}
