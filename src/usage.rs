//! Unused dependency detection
//!
//! Fuses the dependency list with a dynamic symbol dump of the same binary.
//! A direct dependency counts as used when at least one dynamic symbol of the
//! binary is bound to it through its version tag.

pub mod dump;

pub use dump::{DynamicSymbol, SymbolDump, SymbolDumpParser, VersionRequirement};

use crate::dependency::DependencyRecord;
use crate::error::Result;
use std::collections::HashSet;

/// Annotates dependency records with their usage status
pub struct UsageAnalyzer {
    parser: SymbolDumpParser,
}

impl UsageAnalyzer {
    pub fn new() -> Result<Self> {
        Ok(Self {
            parser: SymbolDumpParser::new()?,
        })
    }

    /// Fill in `unused` for every analyzable record.
    ///
    /// Records that were not found, have no soname or resolved path, or are
    /// not direct dependencies of the binary keep `unused` unset, as do
    /// records that already carry a value. An unparseable dump is an error and
    /// leaves no record marked.
    pub fn annotate_unused(
        &self,
        mut records: Vec<DependencyRecord>,
        dump_text: &str,
    ) -> Result<Vec<DependencyRecord>> {
        let dump = self.parser.parse(dump_text)?;
        let bindings = Bindings::from_dump(&dump);

        for record in records.iter_mut() {
            if record.unused().is_some() {
                continue;
            }
            if let Some(unused) = bindings.usage_of(record) {
                record.set_unused(unused);
            }
        }

        Ok(records)
    }
}

/// What the symbol dump says about each soname
struct Bindings<'a> {
    needed: &'a [String],
    referenced: HashSet<&'a str>,
    versioned: HashSet<&'a str>,
    unversioned_references: bool,
}

impl<'a> Bindings<'a> {
    fn from_dump(dump: &'a SymbolDump) -> Self {
        Self {
            needed: &dump.needed,
            referenced: dump.referenced_files(),
            versioned: dump.versioned_files(),
            unversioned_references: dump.has_unversioned_references(),
        }
    }

    /// `Some(true)` when the record is a direct dependency nothing binds to
    fn usage_of(&self, record: &DependencyRecord) -> Option<bool> {
        if !record.found() || record.path().is_none() {
            return None;
        }
        let soname = record.soname()?;

        // Without NEEDED entries every resolved record is taken as direct.
        if !self.needed.is_empty() && !self.needed.iter().any(|needed| needed == soname) {
            return None;
        }

        if self.referenced.contains(soname) {
            return Some(false);
        }

        // Unversioned references cannot be attributed to a library, so they
        // may bind to any dependency that publishes no version requirements.
        let unattributable = !self.versioned.contains(soname);
        Some(!(unattributable && self.unversioned_references))
    }
}

/// Convenience wrapper around [`UsageAnalyzer::annotate_unused`]
pub fn annotate_unused(
    records: Vec<DependencyRecord>,
    dump_text: &str,
) -> Result<Vec<DependencyRecord>> {
    UsageAnalyzer::new()?.annotate_unused(records, dump_text)
}
