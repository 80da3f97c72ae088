//! Parser for the dynamic symbol dump printed by `readelf`
//!
//! Expects the output of `readelf -W --dynamic --dyn-syms --version-info`.
//! Only three blocks matter: the NEEDED entries of the dynamic section, the
//! `.dynsym` table and the `.gnu.version_r` version requirements. Lines in the
//! latter two blocks must match the expected grammar; everything else is
//! skipped.

use crate::error::{Error, Result};
use regex::Regex;
use std::collections::HashSet;

/// One required symbol version, taken from `.gnu.version_r`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRequirement {
    /// Soname of the library the version belongs to
    pub file: String,
    /// Version name such as `GLIBC_2.2.5`
    pub version: String,
    /// Index referenced from `.dynsym` entries
    pub index: u16,
}

/// One entry of the `.dynsym` table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DynamicSymbol {
    pub name: String,
    pub version: Option<String>,
    pub version_index: Option<u16>,
    pub binding: String,
    /// Section index column (`UND`, `ABS`, a number)
    pub section: String,
}

impl DynamicSymbol {
    pub fn is_undefined(&self) -> bool {
        self.section == "UND"
    }

    pub fn is_weak(&self) -> bool {
        self.binding == "WEAK"
    }
}

/// Parsed symbol dump of one binary
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SymbolDump {
    /// Direct dependencies from the dynamic section, in order
    pub needed: Vec<String>,
    pub requirements: Vec<VersionRequirement>,
    pub symbols: Vec<DynamicSymbol>,
}

impl SymbolDump {
    /// Soname the symbol's version tag binds it to, if any
    pub fn resolve_file(&self, symbol: &DynamicSymbol) -> Option<&str> {
        let version = symbol.version.as_deref()?;
        let requirement = match symbol.version_index {
            Some(index) => self.requirements.iter().find(|r| r.index == index),
            None => self.requirements.iter().find(|r| r.version == version),
        };
        requirement.map(|r| r.file.as_str())
    }

    /// Sonames that at least one symbol resolves against
    pub fn referenced_files(&self) -> HashSet<&str> {
        self.symbols
            .iter()
            .filter(|symbol| !symbol.name.is_empty())
            .filter_map(|symbol| self.resolve_file(symbol))
            .collect()
    }

    /// Sonames that publish at least one version requirement
    pub fn versioned_files(&self) -> HashSet<&str> {
        self.requirements.iter().map(|r| r.file.as_str()).collect()
    }

    /// Whether the binary has strong undefined references without a version tag
    pub fn has_unversioned_references(&self) -> bool {
        self.symbols.iter().any(|symbol| {
            !symbol.name.is_empty()
                && symbol.version.is_none()
                && symbol.is_undefined()
                && !symbol.is_weak()
                && symbol.binding != "LOCAL"
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Block {
    Other,
    Dynamic,
    DynSym,
    VersionNeeds,
}

/// Regex-driven parser for `readelf` symbol dumps
pub struct SymbolDumpParser {
    needed_regex: Regex,
    symbol_regex: Regex,
    symbol_name_regex: Regex,
    version_file_regex: Regex,
    version_aux_regex: Regex,
}

impl SymbolDumpParser {
    pub fn new() -> Result<Self> {
        let needed_regex = Regex::new(r"\(NEEDED\)\s+Shared library:\s+\[([^\]]+)\]")?;
        let symbol_regex = Regex::new(
            r"^\s*\d+:\s+[0-9a-fA-F]+\s+(?:\d+|0x[0-9a-fA-F]+)\s+\w+\s+(\w+)\s+\w+(?:\s+\[[^\]]*\])?\s+(\w+)(?:\s+(.*?))?\s*$",
        )?;
        let symbol_name_regex = Regex::new(r"^([^@\s]*)(?:@@?([^\s(]+))?(?:\s+\((\d+)\))?$")?;
        let version_file_regex = Regex::new(
            r"^\s*(?:0x)?[0-9a-fA-F]+:\s+(?:Version:\s+\d+\s+)?(?:Cnt:\s+\d+\s+)?File:\s+(\S+)(?:\s+Cnt:\s+\d+)?\s*$",
        )?;
        let version_aux_regex = Regex::new(
            r"^\s*(?:0x)?[0-9a-fA-F]+:\s+Name:\s+(\S+)\s+Flags:\s+.*?\s+Version:\s+(\d+)\s*$",
        )?;

        Ok(Self {
            needed_regex,
            symbol_regex,
            symbol_name_regex,
            version_file_regex,
            version_aux_regex,
        })
    }

    /// Parse a complete dump. A dump without a `.dynsym` table is rejected.
    pub fn parse(&self, text: &str) -> Result<SymbolDump> {
        let mut dump = SymbolDump::default();
        let mut block = Block::Other;
        let mut saw_dynsym = false;
        let mut current_file: Option<String> = None;

        for (index, line) in text.lines().enumerate() {
            let line_number = index + 1;
            if line.trim().is_empty() {
                continue;
            }

            if !line.starts_with(char::is_whitespace) {
                block = classify_header(line);
                saw_dynsym |= block == Block::DynSym;
                current_file = None;
                continue;
            }

            match block {
                Block::Other => {}
                Block::Dynamic => {
                    if let Some(captures) = self.needed_regex.captures(line) {
                        dump.needed.push(captures[1].to_string());
                    }
                }
                Block::DynSym => {
                    if line.trim_start().starts_with("Num:") {
                        continue;
                    }
                    let symbol = self
                        .parse_symbol(line)
                        .ok_or_else(|| unexpected(line_number, line, "not a symbol table entry"))?;
                    dump.symbols.push(symbol);
                }
                Block::VersionNeeds => {
                    if line.trim_start().starts_with("Addr:") {
                        continue;
                    }
                    if let Some(captures) = self.version_file_regex.captures(line) {
                        current_file = Some(captures[1].to_string());
                    } else if let Some(captures) = self.version_aux_regex.captures(line) {
                        let file = current_file.clone().ok_or_else(|| {
                            unexpected(line_number, line, "version requirement without a file")
                        })?;
                        let index = captures[2].parse().map_err(|_| {
                            unexpected(line_number, line, "version index out of range")
                        })?;
                        dump.requirements.push(VersionRequirement {
                            file,
                            version: captures[1].to_string(),
                            index,
                        });
                    } else {
                        return Err(unexpected(line_number, line, "not a version requirement"));
                    }
                }
            }
        }

        if !saw_dynsym {
            return Err(Error::SymbolDump {
                line_number: None,
                line: None,
                reason: "no dynamic symbol table in output".to_string(),
            });
        }

        Ok(dump)
    }

    fn parse_symbol(&self, line: &str) -> Option<DynamicSymbol> {
        let captures = self.symbol_regex.captures(line)?;
        let rest = captures.get(3).map_or("", |m| m.as_str());
        let name = self.symbol_name_regex.captures(rest)?;

        let version_index = match name.get(3) {
            Some(index) => Some(index.as_str().parse().ok()?),
            None => None,
        };

        Some(DynamicSymbol {
            name: name[1].to_string(),
            version: name.get(2).map(|m| m.as_str().to_string()),
            version_index,
            binding: captures[1].to_string(),
            section: captures[2].to_string(),
        })
    }
}

fn classify_header(line: &str) -> Block {
    if line.starts_with("Dynamic section at offset") {
        Block::Dynamic
    } else if line.starts_with("Symbol table '.dynsym'") {
        Block::DynSym
    } else if line.starts_with("Version needs section") {
        Block::VersionNeeds
    } else {
        Block::Other
    }
}

fn unexpected(line_number: usize, line: &str, reason: &str) -> Error {
    Error::SymbolDump {
        line_number: Some(line_number),
        line: Some(line.to_string()),
        reason: reason.to_string(),
    }
}
