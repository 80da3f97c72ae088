//! Dependency record model
//!
//! A [`DependencyRecord`] is the validated form of one line of loader-inspection
//! output. Records are immutable once built, except for the `unused` flag which
//! the usage analyzer fills in at most once.

use crate::error::{Error, Result};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};

/// Names of the record attributes, in display order
pub const DEPENDENCY_ATTRIBUTES: [&str; 5] = ["soname", "path", "found", "mem_address", "unused"];

/// A normalized hexadecimal load address such as `0x00007f4e739f9000`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LoadAddress(String);

/// Reason an address token was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressError {
    /// The token as it appeared after trimming
    pub token: String,
}

impl fmt::Display for AddressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "expected 0x and hex digits, got {:?}", self.token)
    }
}

impl LoadAddress {
    /// Parse an address token, stripping whitespace and enclosing parentheses
    pub fn parse(token: &str) -> std::result::Result<Self, AddressError> {
        let trimmed = token.trim();
        let bare = trimmed
            .strip_prefix('(')
            .and_then(|rest| rest.strip_suffix(')'))
            .map(str::trim)
            .unwrap_or(trimmed);

        let digits = bare.strip_prefix("0x").unwrap_or("");
        if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(AddressError {
                token: bare.to_string(),
            });
        }

        Ok(Self(format!("0x{}", digits.to_ascii_lowercase())))
    }

    /// The normalized textual form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Compare two addresses by numeric value, ignoring leading zeros
    pub fn numeric_cmp(&self, other: &Self) -> Ordering {
        let lhs = self.0[2..].trim_start_matches('0');
        let rhs = other.0[2..].trim_start_matches('0');
        lhs.len().cmp(&rhs.len()).then_with(|| lhs.cmp(rhs))
    }
}

impl fmt::Display for LoadAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for LoadAddress {
    type Error = AddressError;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<LoadAddress> for String {
    fn from(address: LoadAddress) -> Self {
        address.0
    }
}

/// One shared-library dependency of the inspected binary
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDependency", into = "RawDependency")]
pub struct DependencyRecord {
    soname: Option<String>,
    path: Option<PathBuf>,
    found: bool,
    load_address: Option<LoadAddress>,
    unused: Option<bool>,
}

impl DependencyRecord {
    /// Build a record, checking the invariants between the fields.
    ///
    /// A record that was not found carries neither a path nor an address. A
    /// found record has an address and at least a soname or a path.
    pub fn new(
        soname: Option<String>,
        path: Option<PathBuf>,
        found: bool,
        load_address: Option<LoadAddress>,
    ) -> Result<Self> {
        if found {
            if load_address.is_none() {
                return Err(Error::InvalidRecord(
                    "a found dependency must have a load address".to_string(),
                ));
            }
            if soname.is_none() && path.is_none() {
                return Err(Error::InvalidRecord(
                    "a found dependency must have a soname or a path".to_string(),
                ));
            }
        } else {
            if path.is_some() || load_address.is_some() {
                return Err(Error::InvalidRecord(
                    "a dependency that was not found cannot have a path or address".to_string(),
                ));
            }
            if soname.is_none() {
                return Err(Error::InvalidRecord(
                    "a dependency that was not found must have a soname".to_string(),
                ));
            }
        }

        Ok(Self {
            soname,
            path,
            found,
            load_address,
            unused: None,
        })
    }

    /// A dependency the loader resolved to a file
    pub fn resolved(soname: Option<String>, path: PathBuf, load_address: LoadAddress) -> Self {
        Self {
            soname,
            path: Some(path),
            found: true,
            load_address: Some(load_address),
            unused: None,
        }
    }

    /// A dependency loaded at an address but without a file on disk (vdso)
    pub fn unresolved(soname: String, load_address: LoadAddress) -> Self {
        Self {
            soname: Some(soname),
            path: None,
            found: true,
            load_address: Some(load_address),
            unused: None,
        }
    }

    /// A dependency the loader could not locate
    pub fn not_found(soname: String) -> Self {
        Self {
            soname: Some(soname),
            path: None,
            found: false,
            load_address: None,
            unused: None,
        }
    }

    pub fn soname(&self) -> Option<&str> {
        self.soname.as_deref()
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn found(&self) -> bool {
        self.found
    }

    pub fn load_address(&self) -> Option<&LoadAddress> {
        self.load_address.as_ref()
    }

    /// `None` when usage analysis was not performed for this record
    pub fn unused(&self) -> Option<bool> {
        self.unused
    }

    pub(crate) fn set_unused(&mut self, unused: bool) {
        debug_assert!(self.unused.is_none(), "unused is populated at most once");
        self.unused = Some(unused);
    }

    /// Compare two records on a single attribute, absent values first
    pub fn compare_by(&self, other: &Self, attribute: Attribute) -> Ordering {
        match attribute {
            Attribute::Soname => self.soname.cmp(&other.soname),
            Attribute::Path => {
                let lhs = self.path.as_ref().map(|p| p.to_string_lossy());
                let rhs = other.path.as_ref().map(|p| p.to_string_lossy());
                lhs.cmp(&rhs)
            }
            Attribute::Found => self.found.cmp(&other.found),
            Attribute::MemAddress => match (&self.load_address, &other.load_address) {
                (Some(lhs), Some(rhs)) => lhs.numeric_cmp(rhs),
                (lhs, rhs) => lhs.is_some().cmp(&rhs.is_some()),
            },
            Attribute::Unused => self.unused.cmp(&other.unused),
        }
    }
}

impl fmt::Display for DependencyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "soname: {}, path: {}, found: {}, mem_address: {}, unused: {}",
            self.soname.as_deref().unwrap_or("None"),
            self.path
                .as_ref()
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| "None".to_string()),
            self.found,
            self.load_address
                .as_ref()
                .map(LoadAddress::as_str)
                .unwrap_or("None"),
            self.unused
                .map(|u| u.to_string())
                .unwrap_or_else(|| "None".to_string()),
        )
    }
}

/// Serialized shape of a record; field order is the output column order
#[derive(Serialize, Deserialize)]
struct RawDependency {
    soname: Option<String>,
    path: Option<PathBuf>,
    found: bool,
    mem_address: Option<LoadAddress>,
    unused: Option<bool>,
}

impl TryFrom<RawDependency> for DependencyRecord {
    type Error = Error;

    fn try_from(raw: RawDependency) -> Result<Self> {
        let mut record = Self::new(raw.soname, raw.path, raw.found, raw.mem_address)?;
        record.unused = raw.unused;
        Ok(record)
    }
}

impl From<DependencyRecord> for RawDependency {
    fn from(record: DependencyRecord) -> Self {
        Self {
            soname: record.soname,
            path: record.path,
            found: record.found,
            mem_address: record.load_address,
            unused: record.unused,
        }
    }
}

/// Attribute a dependency list can be sorted by
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    #[value(name = "soname")]
    Soname,
    #[value(name = "path")]
    Path,
    #[value(name = "found")]
    Found,
    #[value(name = "mem_address")]
    MemAddress,
    #[value(name = "unused")]
    Unused,
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Attribute::Soname => DEPENDENCY_ATTRIBUTES[0],
            Attribute::Path => DEPENDENCY_ATTRIBUTES[1],
            Attribute::Found => DEPENDENCY_ATTRIBUTES[2],
            Attribute::MemAddress => DEPENDENCY_ATTRIBUTES[3],
            Attribute::Unused => DEPENDENCY_ATTRIBUTES[4],
        };
        f.write_str(name)
    }
}

/// Stable sort by one attribute; absent values sort before present ones
pub fn sort_dependencies(deps: &mut [DependencyRecord], by: Attribute) {
    deps.sort_by(|a, b| a.compare_by(b, by));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn address(text: &str) -> LoadAddress {
        LoadAddress::parse(text).unwrap()
    }

    fn sample() -> Vec<DependencyRecord> {
        vec![
            DependencyRecord::unresolved(
                "linux-vdso.so.1".to_string(),
                address("0x00007ffe0953f000"),
            ),
            DependencyRecord::resolved(
                Some("libc.so.6".to_string()),
                PathBuf::from("/lib/x86_64-linux-gnu/libc.so.6"),
                address("0x00007fd548353000"),
            ),
            DependencyRecord::resolved(
                None,
                PathBuf::from("/lib64/ld-linux-x86-64.so.2"),
                address("0x00007fd54894d000"),
            ),
        ]
    }

    #[test]
    fn test_address_normalization() {
        let wrapped = LoadAddress::parse("(0x00007f4e739f9000)").unwrap();
        let bare = LoadAddress::parse("0x00007f4e739f9000").unwrap();
        assert_eq!(wrapped, bare);
        assert_eq!(bare.as_str(), "0x00007f4e739f9000");

        assert_eq!(LoadAddress::parse(" ( 0x7F ) ").unwrap().as_str(), "0x7f");
        let padded = LoadAddress::parse("\t(0x00007f9a1a329000)\t").unwrap();
        assert_eq!(padded.as_str(), "0x00007f9a1a329000");
    }

    #[test]
    fn test_address_rejects_garbage() {
        for token in ["0xZZZZ", "(0xZZZZ)", "0x", "7f00", "", "0X7f", "(0x7f"] {
            assert!(LoadAddress::parse(token).is_err(), "accepted {:?}", token);
        }
        assert_eq!(LoadAddress::parse("(0xZZZZ)").unwrap_err().token, "0xZZZZ");
    }

    #[test]
    fn test_address_ordering() {
        let small = address("0x0000e");
        assert_eq!(address("0x0f").numeric_cmp(&small), Ordering::Greater);

        let zero = address("0x0");
        assert_eq!(address("0x00").numeric_cmp(&zero), Ordering::Equal);

        let wide = address("0x10000000000000000");
        assert_eq!(wide.numeric_cmp(&address("0xffff")), Ordering::Greater);
    }

    #[test]
    fn test_record_invariants() {
        let soname = || Some("libz.so.1".to_string());
        let path = Some(PathBuf::from("/lib/libz.so.1"));

        assert!(DependencyRecord::new(soname(), None, false, None).is_ok());
        assert!(DependencyRecord::new(soname(), path, false, None).is_err());
        assert!(DependencyRecord::new(soname(), None, true, None).is_err());

        let orphan = Some(address("0x1"));
        assert!(DependencyRecord::new(None, None, true, orphan).is_err());
        assert!(DependencyRecord::new(None, None, false, None).is_err());
    }

    #[test]
    fn test_json_round_trip_preserves_unset_unused() {
        let mut deps = sample();
        deps[1].set_unused(false);
        deps[2].set_unused(true);

        let json = serde_json::to_string(&deps).unwrap();
        let back: Vec<DependencyRecord> = serde_json::from_str(&json).unwrap();

        assert_eq!(back, deps);
        assert_eq!(back[0].unused(), None);
        assert_eq!(back[1].unused(), Some(false));
        assert_eq!(back[2].unused(), Some(true));
    }

    #[test]
    fn test_json_shape() {
        let value = serde_json::to_value(&sample()[0]).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "soname": "linux-vdso.so.1",
                "path": null,
                "found": true,
                "mem_address": "0x00007ffe0953f000",
                "unused": null
            })
        );
    }

    #[test]
    fn test_json_rejects_invalid_records() {
        let from_json = |value| serde_json::from_value::<DependencyRecord>(value);

        let bad_address = serde_json::json!({
            "soname": "a",
            "path": "/a",
            "found": true,
            "mem_address": "0xZZ",
            "unused": null
        });
        assert!(from_json(bad_address).is_err());

        let path_without_found = serde_json::json!({
            "soname": "a",
            "path": "/a",
            "found": false,
            "mem_address": null,
            "unused": null
        });
        assert!(from_json(path_without_found).is_err());
    }

    #[test]
    fn test_sort_by_soname_puts_absent_first() {
        let mut deps = sample();
        sort_dependencies(&mut deps, Attribute::Soname);

        let sonames: Vec<_> = deps.iter().map(|d| d.soname()).collect();
        assert_eq!(
            sonames,
            vec![None, Some("libc.so.6"), Some("linux-vdso.so.1")]
        );
    }

    #[test]
    fn test_sort_is_idempotent_and_keeps_original() {
        let original = sample();
        let mut deps = original.clone();
        sort_dependencies(&mut deps, Attribute::Path);
        let once = deps.clone();
        sort_dependencies(&mut deps, Attribute::Path);

        assert_eq!(deps, once);
        assert_eq!(original, sample());
        assert_eq!(deps[0].path(), None);
        assert_eq!(deps[1].soname(), Some("libc.so.6"));
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut deps = sample();
        sort_dependencies(&mut deps, Attribute::Found);
        assert_eq!(deps, sample());
    }

    #[test]
    fn test_sort_by_mem_address_is_numeric() {
        let mut deps = vec![
            DependencyRecord::unresolved("b".to_string(), address("0x1000")),
            DependencyRecord::not_found("c".to_string()),
            DependencyRecord::unresolved("a".to_string(), address("0x00000fff")),
        ];
        sort_dependencies(&mut deps, Attribute::MemAddress);

        let sonames: Vec<_> = deps.iter().map(|d| d.soname().unwrap()).collect();
        assert_eq!(sonames, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_sort_by_unused_orders_unset_before_false_before_true() {
        let mut deps = sample();
        deps[0].set_unused(true);
        deps[1].set_unused(false);
        sort_dependencies(&mut deps, Attribute::Unused);

        let unused: Vec<_> = deps.iter().map(|d| d.unused()).collect();
        assert_eq!(unused, vec![None, Some(false), Some(true)]);
    }

    #[test]
    fn test_attribute_names() {
        let names: Vec<String> = Attribute::value_variants()
            .iter()
            .map(|a| a.to_string())
            .collect();
        assert_eq!(names, DEPENDENCY_ATTRIBUTES);
    }
}
