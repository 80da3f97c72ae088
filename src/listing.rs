//! Dependency listing parser
//!
//! Turns the text printed by the loader-inspection tool (`ldd`) into an ordered
//! list of [`DependencyRecord`](crate::dependency::DependencyRecord)s. Parsing
//! is all-or-nothing: the first line that matches no known shape aborts the
//! whole listing.

pub mod assemble;
pub mod line;

pub use assemble::{assemble, not_dynamic_diagnostic};
pub use line::{parse_line, LineError, ParsedLine};
