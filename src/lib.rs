//! lddscan - list the shared libraries a binary loads
//!
//! Wraps the platform `ldd` utility, turns its text output into typed
//! [`DependencyRecord`]s and optionally fuses a `readelf` symbol dump to flag
//! direct dependencies the binary never binds a symbol to.

pub mod cli;
pub mod dependency;
pub mod error;
pub mod listing;
pub mod tools;
pub mod usage;

// Re-export main types for convenience
pub use cli::{Args, CliApp, OutputFormat};
pub use dependency::{sort_dependencies, Attribute, DependencyRecord, LoadAddress};
pub use error::{Error, Result};
pub use tools::{SystemTools, ToolConfig, ToolOutput, ToolRunner};
pub use usage::UsageAnalyzer;

use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Inspect `path` with the system `ldd` (and `readelf` when `unused` is set).
///
/// `env`, when given, replaces the inherited environment of the `ldd` child.
pub fn list_dependencies(
    path: &Path,
    env: Option<&HashMap<String, String>>,
    unused: bool,
) -> Result<Vec<DependencyRecord>> {
    list_dependencies_with(&SystemTools::default(), path, env, unused)
}

/// Same as [`list_dependencies`] but with caller-supplied tools
pub fn list_dependencies_with<R: ToolRunner>(
    runner: &R,
    path: &Path,
    env: Option<&HashMap<String, String>>,
    unused: bool,
) -> Result<Vec<DependencyRecord>> {
    let output = runner.run_dependency_listing(path, env)?;
    if !output.success() {
        // ldd exits non-zero for binaries it cannot inspect
        let combined = format!("{}\n{}", output.stdout, output.stderr);
        if let Some(diagnostic) = listing::not_dynamic_diagnostic(&combined) {
            return Err(Error::NotDynamicExecutable { diagnostic });
        }
        return Err(output.into_error());
    }

    let records = listing::assemble(&output.stdout)?;
    debug!(path = %path.display(), count = records.len(), "parsed dependency listing");

    if !unused {
        return Ok(records);
    }

    let dump = tools::check_status(runner.run_symbol_dump(path)?)?;
    UsageAnalyzer::new()?.annotate_unused(records, &dump.stdout)
}
