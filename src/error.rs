//! Error types shared by the listing, usage and tool layers

use thiserror::Error;

/// Result alias used throughout the library
pub type Result<T> = std::result::Result<T, Error>;

/// Everything that can go wrong while inspecting a binary
#[derive(Error, Debug)]
pub enum Error {
    /// An external tool could not be launched or exited unsuccessfully
    #[error("{tool} failed{}: {}", exit_suffix(.code), single_line(.stderr))]
    ToolExecution {
        /// Name or path of the tool that failed
        tool: String,
        /// Exit code, `None` when the process never ran or was killed by a signal
        code: Option<i32>,
        /// Captured diagnostic output, unmodified
        stderr: String,
    },

    /// The target has no dynamic dependencies (static or not loadable)
    #[error("not a dynamic executable: {diagnostic}")]
    NotDynamicExecutable { diagnostic: String },

    /// A line of the listing output matches none of the known shapes
    #[error("unexpected line {line_number} in dependency listing ({reason}): {line:?}")]
    Parse {
        line_number: usize,
        line: String,
        reason: String,
    },

    /// A load address failed hex validation
    #[error("invalid load address {token:?} on line {line_number}: {line:?}")]
    InvalidAddress {
        line_number: usize,
        line: String,
        token: String,
    },

    /// The symbol dump is not in the expected format
    #[error("{}", symbol_dump_message(.line_number, .line, .reason))]
    SymbolDump {
        line_number: Option<usize>,
        line: Option<String>,
        reason: String,
    },

    /// A dependency record violates the record invariants
    #[error("invalid dependency record: {0}")]
    InvalidRecord(String),

    /// One of the built-in output patterns failed to compile
    #[error("failed to compile output pattern: {0}")]
    Pattern(#[from] regex::Error),
}

impl Error {
    /// True for listing parse failures, including invalid addresses
    pub fn is_parse_error(&self) -> bool {
        matches!(self, Error::Parse { .. } | Error::InvalidAddress { .. })
    }

    /// True when the target simply has no dynamic dependencies
    pub fn is_not_dynamic(&self) -> bool {
        matches!(self, Error::NotDynamicExecutable { .. })
    }
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => String::new(),
    }
}

/// Collapse multi-line tool diagnostics so the message stays on one line
fn single_line(text: &str) -> String {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("; ")
}

fn symbol_dump_message(line_number: &Option<usize>, line: &Option<String>, reason: &str) -> String {
    match (line_number, line) {
        (Some(n), Some(line)) => format!("unexpected symbol dump line {n} ({reason}): {line:?}"),
        _ => format!("unexpected symbol dump: {}", reason),
    }
}
