//! External tool invocation
//!
//! The parsers never spawn processes themselves. They receive raw text from a
//! [`ToolRunner`], which the library implements with [`SystemTools`] (real
//! `ldd` and `readelf` processes) and tests implement with canned output.

use crate::error::{Error, Result};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

/// Arguments passed to `readelf` for the symbol dump
pub const READELF_ARGS: &[&str] = &["-W", "--dynamic", "--dyn-syms", "--version-info"];

/// Paths of the external tools
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ToolConfig {
    /// Loader-inspection tool
    pub ldd_path: PathBuf,
    /// Symbol-dump tool
    pub readelf_path: PathBuf,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            ldd_path: PathBuf::from("ldd"),
            readelf_path: PathBuf::from("readelf"),
        }
    }
}

/// Captured result of one tool run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolOutput {
    /// Name or path the tool was launched as
    pub tool: String,
    pub stdout: String,
    pub stderr: String,
    /// Exit code, `None` when terminated by a signal
    pub code: Option<i32>,
}

impl ToolOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    /// Convert a failed run into an error, preferring stderr as diagnostic
    pub fn into_error(self) -> Error {
        let stderr = if self.stderr.trim().is_empty() {
            self.stdout
        } else {
            self.stderr
        };
        Error::ToolExecution {
            tool: self.tool,
            code: self.code,
            stderr,
        }
    }
}

/// Capability to run the two inspection tools against a binary
pub trait ToolRunner {
    /// Run the loader-inspection tool. `env`, when given, is the child's
    /// entire environment; otherwise the environment is inherited.
    fn run_dependency_listing(
        &self,
        path: &Path,
        env: Option<&HashMap<String, String>>,
    ) -> Result<ToolOutput>;

    /// Run the symbol-dump tool
    fn run_symbol_dump(&self, path: &Path) -> Result<ToolOutput>;
}

/// Runs the real `ldd` and `readelf` executables
#[derive(Debug, Clone, Default)]
pub struct SystemTools {
    config: ToolConfig,
}

impl SystemTools {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    fn run(&self, mut cmd: Command, tool: &Path) -> Result<ToolOutput> {
        debug!(command = ?cmd, "running external tool");
        let tool = tool.display().to_string();

        let output = cmd.output().map_err(|e| Error::ToolExecution {
            tool: tool.clone(),
            code: None,
            stderr: e.to_string(),
        })?;

        let result = ToolOutput {
            tool,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            code: output.status.code(),
        };
        debug!(tool = %result.tool, code = ?result.code, "external tool finished");

        Ok(result)
    }
}

impl ToolRunner for SystemTools {
    fn run_dependency_listing(
        &self,
        path: &Path,
        env: Option<&HashMap<String, String>>,
    ) -> Result<ToolOutput> {
        let mut cmd = Command::new(&self.config.ldd_path);
        cmd.arg(path);
        if let Some(env) = env {
            cmd.env_clear().envs(env);
        }
        self.run(cmd, &self.config.ldd_path)
    }

    fn run_symbol_dump(&self, path: &Path) -> Result<ToolOutput> {
        let mut cmd = Command::new(&self.config.readelf_path);
        cmd.args(READELF_ARGS).arg(path);
        self.run(cmd, &self.config.readelf_path)
    }
}

/// Turn a non-zero exit into a [`Error::ToolExecution`]
pub fn check_status(output: ToolOutput) -> Result<ToolOutput> {
    if output.success() {
        Ok(output)
    } else {
        Err(output.into_error())
    }
}
