//! CLI module for the lddscan tool
//!
//! This module provides the command-line interface functionality including
//! argument parsing and output formatting.

pub mod args;
pub mod output;

pub use args::{Args, OutputFormat};
pub use output::OutputFormatter;

use crate::dependency::sort_dependencies;
use crate::tools::{SystemTools, ToolConfig};
use anyhow::{bail, Context, Result};
use std::collections::HashMap;
use std::io::{self, IsTerminal, Write};
use tracing::{debug, info};

/// Main CLI application runner
pub struct CliApp {
    args: Args,
}

impl CliApp {
    /// Create a new CLI application with parsed arguments
    pub fn new(args: Args) -> Self {
        Self { args }
    }

    /// Run the CLI application, writing the result to stdout
    pub fn run(&self) -> Result<i32> {
        let stdout = io::stdout();
        let use_color = !self.args.no_color && stdout.is_terminal();
        let mut stdout = stdout.lock();
        self.run_with(&mut stdout, use_color)
    }

    /// Run the CLI application against an arbitrary writer
    pub fn run_with<W: Write>(&self, writer: &mut W, use_color: bool) -> Result<i32> {
        let path = &self.args.path;

        // Validate file exists
        if path.is_dir() {
            bail!("'{}' is a directory, not a file", path.display());
        }
        if !path.is_file() {
            bail!("path '{}' is not a file", path.display());
        }

        let tools = SystemTools::new(self.tool_config());
        let env = self.child_env();
        let analyze_usage = !self.args.skip_unused;
        debug!(path = %path.display(), analyze_usage, "inspecting binary");

        let result = crate::list_dependencies_with(&tools, path, env.as_ref(), analyze_usage);
        let mut deps = match result {
            Ok(deps) => deps,
            Err(e) if e.is_not_dynamic() => {
                info!(path = %path.display(), "{}, no dependencies to list", e);
                Vec::new()
            }
            Err(e) => {
                let context = format!("failed to inspect {}", path.display());
                return Err(e).context(context);
            }
        };

        if let Some(attribute) = self.args.sorted {
            sort_dependencies(&mut deps, attribute);
        }

        let formatter = OutputFormatter::new(self.args.format, use_color);
        formatter.write_dependencies(writer, &deps)?;
        writer.flush()?;

        Ok(0)
    }

    fn tool_config(&self) -> ToolConfig {
        let defaults = ToolConfig::default();
        ToolConfig {
            ldd_path: self.args.ldd_path.clone().unwrap_or(defaults.ldd_path),
            readelf_path: self
                .args
                .readelf_path
                .clone()
                .unwrap_or(defaults.readelf_path),
        }
    }

    /// Explicit child environment, `None` to inherit ours
    fn child_env(&self) -> Option<HashMap<String, String>> {
        if self.args.env.is_empty() {
            None
        } else {
            Some(self.args.env.iter().cloned().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use std::path::PathBuf;

    #[test]
    fn test_tool_config_from_args() {
        let app = CliApp::new(Args::try_parse_from(["lddscan", "/bin/ls"]).unwrap());
        assert_eq!(app.tool_config(), ToolConfig::default());

        let app = CliApp::new(
            Args::try_parse_from(["lddscan", "--ldd-path", "/opt/ldd", "/bin/ls"]).unwrap(),
        );
        let config = app.tool_config();
        assert_eq!(config.ldd_path, PathBuf::from("/opt/ldd"));
        assert_eq!(config.readelf_path, PathBuf::from("readelf"));
    }

    #[test]
    fn test_child_env() {
        let app = CliApp::new(Args::try_parse_from(["lddscan", "/bin/ls"]).unwrap());
        assert!(app.child_env().is_none());

        let app = CliApp::new(
            Args::try_parse_from(["lddscan", "--env", "A=1", "--env", "A=2", "/bin/ls"]).unwrap(),
        );
        let env = app.child_env().unwrap();
        assert_eq!(env.len(), 1);
        assert_eq!(env["A"], "2");
    }

    #[test]
    fn test_rejects_directory_before_running_tools() {
        let dir = tempfile::tempdir().unwrap();
        let args = Args::try_parse_from([
            "lddscan",
            "--ldd-path",
            "/nonexistent/ldd",
            dir.path().to_str().unwrap(),
        ])
        .unwrap();

        let mut buffer = Vec::new();
        let err = CliApp::new(args).run_with(&mut buffer, false).unwrap_err();
        assert!(err.to_string().contains("is a directory"));
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_rejects_missing_file() {
        let args = Args::try_parse_from(["lddscan", "/nonexistent/lddscan-test/binary"]).unwrap();
        let mut buffer = Vec::new();
        let err = CliApp::new(args).run_with(&mut buffer, false).unwrap_err();
        assert!(err.to_string().contains("is not a file"));
    }
}
