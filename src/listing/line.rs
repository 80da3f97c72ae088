//! Single-line parser for loader-inspection output
//!
//! Recognized dependency shapes:
//!
//! ```text
//! soname => path (address)
//! soname => not found
//! soname =>  (address)      older glibc, vdso without a backing file
//! path (address)            a `/` marks the token as a path (dynamic linker)
//! soname (address)          no `/`, e.g. linux-vdso.so.1
//! ```

use crate::dependency::{AddressError, DependencyRecord, LoadAddress};
use std::path::PathBuf;

const SEPARATOR: &str = "=>";
const NOT_FOUND: &str = "not found";
const STATICALLY_LINKED: &str = "statically linked";
const NO_VERSION_INFO: &str = "no version information available";
const NOT_DYNAMIC_MARKERS: &[&str] = &["not a dynamic executable", "not a valid dynamic program"];

/// Classification of one output line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
    /// A dependency entry
    Dependency(DependencyRecord),
    /// Empty or whitespace-only line
    Blank,
    /// Loader warning that is not a dependency, e.g. missing version information
    Notice,
    /// `<file>:` header printed ahead of the entries for some inputs
    Header(String),
    /// The tool reported a statically linked target
    StaticallyLinked,
    /// The tool refused the target as not dynamically loadable
    NotDynamic,
}

/// Why a line could not be parsed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineError {
    /// The line matches none of the known shapes
    Malformed(&'static str),
    /// The address token failed hex validation
    InvalidAddress(AddressError),
}

impl From<AddressError> for LineError {
    fn from(err: AddressError) -> Self {
        LineError::InvalidAddress(err)
    }
}

/// Parse one raw line of `ldd` output
pub fn parse_line(line: &str) -> Result<ParsedLine, LineError> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return Ok(ParsedLine::Blank);
    }
    if trimmed.contains(NO_VERSION_INFO) {
        return Ok(ParsedLine::Notice);
    }

    let lower = trimmed.to_ascii_lowercase();
    if lower == STATICALLY_LINKED {
        return Ok(ParsedLine::StaticallyLinked);
    }
    if NOT_DYNAMIC_MARKERS
        .iter()
        .any(|marker| lower.contains(marker))
    {
        return Ok(ParsedLine::NotDynamic);
    }

    match trimmed.split_once(SEPARATOR) {
        Some((left, right)) => parse_mapping(left.trim(), right.trim()),
        None => parse_bare(trimmed),
    }
}

/// `soname => ...`
fn parse_mapping(soname: &str, target: &str) -> Result<ParsedLine, LineError> {
    if soname.is_empty() {
        return Err(LineError::Malformed("missing soname before `=>`"));
    }
    if soname.contains(char::is_whitespace) {
        return Err(LineError::Malformed("soname contains whitespace"));
    }

    if target == NOT_FOUND {
        let record = DependencyRecord::not_found(soname.to_string());
        return Ok(ParsedLine::Dependency(record));
    }

    let (path, address) = split_address(target)?;
    let Some(address) = address else {
        return Err(LineError::Malformed("no load address after the path"));
    };

    let record = if path.is_empty() {
        DependencyRecord::unresolved(soname.to_string(), address)
    } else {
        DependencyRecord::resolved(Some(soname.to_string()), PathBuf::from(path), address)
    };
    Ok(ParsedLine::Dependency(record))
}

/// `path (address)` or `soname (address)`
fn parse_bare(line: &str) -> Result<ParsedLine, LineError> {
    if let Some(file) = line.strip_suffix(':') {
        if !file.is_empty() && !file.contains(char::is_whitespace) {
            return Ok(ParsedLine::Header(file.to_string()));
        }
    }

    let (target, address) = split_address(line)?;
    let Some(address) = address else {
        return Err(LineError::Malformed("expected `=>` or an address"));
    };

    if target.is_empty() {
        return Err(LineError::Malformed("no library before the address"));
    }
    if target.contains(char::is_whitespace) {
        return Err(LineError::Malformed("library name contains whitespace"));
    }

    let record = if target.contains('/') {
        DependencyRecord::resolved(None, PathBuf::from(target), address)
    } else {
        DependencyRecord::unresolved(target.to_string(), address)
    };
    Ok(ParsedLine::Dependency(record))
}

/// Split a trailing address, parenthesized or bare, off `text`.
///
/// Returns the remainder (trimmed) and the address if there was one. A
/// trailing token in address position that fails validation is an error.
fn split_address(text: &str) -> Result<(&str, Option<LoadAddress>), LineError> {
    if text.ends_with(')') {
        let open = text
            .rfind('(')
            .ok_or(LineError::Malformed("unbalanced parenthesis"))?;
        let address = LoadAddress::parse(&text[open..])?;
        return Ok((text[..open].trim_end(), Some(address)));
    }

    let (rest, last) = match text.rsplit_once(char::is_whitespace) {
        Some((rest, last)) => (rest.trim_end(), last),
        None => ("", text),
    };
    if last.starts_with("0x") {
        let address = LoadAddress::parse(last)?;
        return Ok((rest, Some(address)));
    }

    Ok((text, None))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn dependency(line: &str) -> DependencyRecord {
        match parse_line(line) {
            Ok(ParsedLine::Dependency(record)) => record,
            other => panic!("expected a dependency from {:?}, got {:?}", line, other),
        }
    }

    #[test]
    fn test_resolved_line() {
        let line = "libc.so.6 => /lib/x86_64-linux-gnu/libc.so.6 (0x00007f4e739f9000)";
        let record = dependency(line);
        assert_eq!(record.soname(), Some("libc.so.6"));
        assert_eq!(
            record.path(),
            Some(Path::new("/lib/x86_64-linux-gnu/libc.so.6"))
        );
        assert!(record.found());
        assert_eq!(
            record.load_address().unwrap().as_str(),
            "0x00007f4e739f9000"
        );
        assert_eq!(record.unused(), None);
    }

    #[test]
    fn test_not_found_line() {
        let record = dependency("libfoo.so.1 => not found");
        assert_eq!(record.soname(), Some("libfoo.so.1"));
        assert_eq!(record.path(), None);
        assert!(!record.found());
        assert_eq!(record.load_address(), None);
        assert_eq!(record.unused(), None);
    }

    #[test]
    fn test_not_found_relative_path_is_kept_as_soname() {
        let record = dependency("\t../build/debug/libextstr.so => not found");
        assert_eq!(record.soname(), Some("../build/debug/libextstr.so"));
        assert_eq!(record.path(), None);
        assert!(!record.found());
    }

    #[test]
    fn test_vdso_without_arrow() {
        let record = dependency("\tlinux-vdso.so.1 (0x00007ffd8750f000)");
        assert_eq!(record.soname(), Some("linux-vdso.so.1"));
        assert_eq!(record.path(), None);
        assert!(record.found());
        assert_eq!(
            record.load_address().unwrap().as_str(),
            "0x00007ffd8750f000"
        );
    }

    #[test]
    fn test_vdso_with_empty_target() {
        let record = dependency("linux-vdso.so.1 =>  (0x00007ffd7c7fd000)");
        assert_eq!(record.soname(), Some("linux-vdso.so.1"));
        assert_eq!(record.path(), None);
        assert!(record.found());
        assert_eq!(
            record.load_address().unwrap().as_str(),
            "0x00007ffd7c7fd000"
        );
    }

    #[test]
    fn test_dynamic_linker_line() {
        let record = dependency("\t/lib64/ld-linux-x86-64.so.2 (0x00007f9a1a329000)");
        assert_eq!(record.soname(), None);
        assert_eq!(
            record.path(),
            Some(Path::new("/lib64/ld-linux-x86-64.so.2"))
        );
        assert!(record.found());
    }

    #[test]
    fn test_bare_address() {
        let record = dependency("libm.so.6 => /lib64/libm.so.6 0x00007f72b7e76000");
        assert_eq!(record.path(), Some(Path::new("/lib64/libm.so.6")));
        assert_eq!(
            record.load_address().unwrap().as_str(),
            "0x00007f72b7e76000"
        );
    }

    #[test]
    fn test_parenthesized_and_bare_addresses_are_equal() {
        let wrapped = dependency("libm.so.6 => /lib64/libm.so.6 (0x00007f72b7e76000)");
        let bare = dependency("libm.so.6 => /lib64/libm.so.6 0x00007f72b7e76000");
        assert_eq!(wrapped, bare);
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let line =
            "libstdc++.so.6 => /usr/lib/x86_64-linux-gnu/libstdc++.so.6 (0x00007f9a19d8a000)";
        assert_eq!(parse_line(line), parse_line(line));
    }

    #[test]
    fn test_path_with_spaces() {
        let record = dependency("libx.so => /opt/my libs/libx.so (0x1000)");
        assert_eq!(record.path(), Some(Path::new("/opt/my libs/libx.so")));
    }

    #[test]
    fn test_invalid_address() {
        for line in [
            "libfoo.so.1 => /lib/libfoo.so.1 (0xZZZZ)",
            "libfoo.so.1 => /lib/libfoo.so.1 0xZZZZ",
            "/lib64/ld-linux-x86-64.so.2 (garbage)",
        ] {
            match parse_line(line) {
                Err(LineError::InvalidAddress(_)) => {}
                other => panic!("expected invalid address for {:?}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_malformed_lines() {
        for line in [
            "\tsome wrong data which does not make sense",
            "=> /lib/libc.so.6 (0x1000)",
            "libc.so.6 => /lib/libc.so.6",
            "lib c.so => /lib/libc.so.6 (0x1000)",
            "(0x1000)",
            "libc.so.6 => /lib/libc.so.6 0x1000)",
        ] {
            match parse_line(line) {
                Err(LineError::Malformed(_)) => {}
                other => panic!("expected malformed for {:?}, got {:?}", line, other),
            }
        }
    }

    #[test]
    fn test_non_dependency_lines() {
        assert_eq!(parse_line(""), Ok(ParsedLine::Blank));
        assert_eq!(parse_line(" \t "), Ok(ParsedLine::Blank));
        assert_eq!(
            parse_line("\tstatically linked"),
            Ok(ParsedLine::StaticallyLinked)
        );
        assert_eq!(
            parse_line("\tnot a dynamic executable"),
            Ok(ParsedLine::NotDynamic)
        );
        assert_eq!(
            parse_line("my_static_lib.so:"),
            Ok(ParsedLine::Header("my_static_lib.so".to_string()))
        );
        assert_eq!(
            parse_line(
                "qt/plugins/libqsqlpsql.so: /lib/x86_64-linux-gnu/libpq.so.5: \
                 no version information available (required by qt/plugins/libqsqlpsql.so)"
            ),
            Ok(ParsedLine::Notice)
        );
    }
}
