//! CLI argument parsing module
//!
//! This module defines the command-line interface for the lddscan tool.

use crate::dependency::Attribute;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// List the shared libraries a binary loads and flag the unused ones
#[derive(Parser, Debug)]
#[command(name = "lddscan")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "List shared library dependencies of a binary")]
#[command(long_about = r#"
lddscan runs ldd against a binary and prints its shared library dependencies
as a table or as JSON. Unless --skip-unused is given it also inspects the
binary's dynamic symbols with readelf and marks direct dependencies that no
symbol binds to as unused.

Examples:
  lddscan /bin/ls                          # Table of dependencies
  lddscan --format json /bin/ls            # JSON array of dependencies
  lddscan --sorted path /bin/ls            # Sort rows by library path
  lddscan --env LD_LIBRARY_PATH=/opt/lib ./app
"#)]
pub struct Args {
    /// Path to the binary to inspect
    #[arg(value_name = "BINARY")]
    pub path: PathBuf,

    /// Output format
    #[arg(short = 'f', long = "format", value_enum, default_value_t = OutputFormat::Table)]
    pub format: OutputFormat,

    /// Sort rows by a field (soname when no field is given)
    #[arg(
        short = 's',
        long = "sorted",
        value_name = "FIELD",
        value_enum,
        num_args = 0..=1,
        default_missing_value = "soname"
    )]
    pub sorted: Option<Attribute>,

    /// Do not run readelf to detect unused dependencies
    #[arg(long)]
    pub skip_unused: bool,

    /// Environment for the ldd child, replacing the inherited one (repeatable)
    #[arg(long = "env", value_name = "KEY=VALUE", value_parser = parse_env_pair)]
    pub env: Vec<(String, String)>,

    /// Custom path to the ldd executable
    #[arg(long, value_name = "PATH")]
    pub ldd_path: Option<PathBuf>,

    /// Custom path to the readelf executable
    #[arg(long, value_name = "PATH")]
    pub readelf_path: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// Suppress colored output
    #[arg(long = "no-color")]
    pub no_color: bool,
}

/// Output format options
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Column-aligned table (default)
    Table,
    /// JSON array of dependency objects
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn parse_env_pair(s: &str) -> Result<(String, String), String> {
    match s.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected KEY=VALUE, got `{}`", s)),
    }
}
