//! Whole-output assembly of dependency records

use super::line::{parse_line, LineError, ParsedLine};
use crate::dependency::DependencyRecord;
use crate::error::{Error, Result};

/// Parse the complete output of the listing tool.
///
/// Records come back in the order their lines appeared. Blank lines and
/// loader notices are skipped, as is a single leading `<file>:` header. A
/// statically linked or non-dynamic target yields
/// [`Error::NotDynamicExecutable`]; any other unrecognized line aborts with
/// a parse error carrying the 1-based line number.
pub fn assemble(raw: &str) -> Result<Vec<DependencyRecord>> {
    let mut dependencies = Vec::new();
    let mut seen_entry = false;

    for (index, line) in raw.lines().enumerate() {
        let line_number = index + 1;

        match parse_line(line) {
            Ok(ParsedLine::Blank) | Ok(ParsedLine::Notice) => continue,
            Ok(ParsedLine::Header(_)) if !seen_entry => {}
            Ok(ParsedLine::Header(_)) => {
                return Err(Error::Parse {
                    line_number,
                    line: line.to_string(),
                    reason: "file header after dependency entries".to_string(),
                });
            }
            Ok(ParsedLine::StaticallyLinked) | Ok(ParsedLine::NotDynamic) => {
                return Err(Error::NotDynamicExecutable {
                    diagnostic: line.trim().to_string(),
                });
            }
            Ok(ParsedLine::Dependency(record)) => dependencies.push(record),
            Err(LineError::Malformed(reason)) => {
                return Err(Error::Parse {
                    line_number,
                    line: line.to_string(),
                    reason: reason.to_string(),
                });
            }
            Err(LineError::InvalidAddress(err)) => {
                return Err(Error::InvalidAddress {
                    line_number,
                    line: line.to_string(),
                    token: err.token,
                });
            }
        }

        seen_entry = true;
    }

    Ok(dependencies)
}

/// Find the not-dynamic diagnostic in the output of a failed listing run
pub fn not_dynamic_diagnostic(output: &str) -> Option<String> {
    output.lines().find_map(|line| match parse_line(line) {
        Ok(ParsedLine::StaticallyLinked) | Ok(ParsedLine::NotDynamic) => {
            Some(line.trim().to_string())
        }
        _ => None,
    })
}
