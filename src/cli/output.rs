//! CLI output formatting module
//!
//! Renders dependency lists as an aligned text table or as a JSON array.

use crate::cli::args::OutputFormat;
use crate::dependency::{DependencyRecord, DEPENDENCY_ATTRIBUTES};
use anyhow::Result;
use colored::{Color, Colorize};
use std::io::Write;

const NONE: &str = "None";

/// Main output formatter that handles different formats
pub struct OutputFormatter {
    format: OutputFormat,
    use_color: bool,
}

impl OutputFormatter {
    /// Create a new output formatter
    pub fn new(format: OutputFormat, use_color: bool) -> Self {
        Self { format, use_color }
    }

    /// Format and write a dependency list
    pub fn write_dependencies<W: Write>(
        &self,
        writer: &mut W,
        deps: &[DependencyRecord],
    ) -> Result<()> {
        match self.format {
            OutputFormat::Table => self.write_table_output(writer, deps),
            OutputFormat::Json => self.write_json_output(writer, deps),
        }
    }

    /// Write the column-aligned table
    fn write_table_output<W: Write>(
        &self,
        writer: &mut W,
        deps: &[DependencyRecord],
    ) -> Result<()> {
        let header = DEPENDENCY_ATTRIBUTES.map(String::from).to_vec();
        let rows: Vec<Vec<String>> = deps.iter().map(table_cells).collect();

        let widths: Vec<usize> = (0..header.len())
            .map(|i| {
                rows.iter()
                    .map(|row| row[i].chars().count())
                    .chain(std::iter::once(header[i].chars().count()))
                    .max()
                    .unwrap_or(0)
            })
            .collect();

        let header_line = join_padded(&header, &widths);
        writeln!(writer, "{}", self.colorize(&header_line, Color::Cyan))?;

        let border: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(writer, "{}", border.join("-+-"))?;

        for row in &rows {
            writeln!(writer, "{}", join_padded(row, &widths))?;
        }
        Ok(())
    }

    /// Write JSON-formatted output
    fn write_json_output<W: Write>(&self, writer: &mut W, deps: &[DependencyRecord]) -> Result<()> {
        writeln!(writer, "{}", serde_json::to_string_pretty(deps)?)?;
        Ok(())
    }

    /// Apply color to text if colors are enabled
    pub fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_color {
            text.color(color).bold().to_string()
        } else {
            text.to_string()
        }
    }
}

/// Cell texts of one record in column order
fn table_cells(dep: &DependencyRecord) -> Vec<String> {
    vec![
        dep.soname().unwrap_or(NONE).to_string(),
        dep.path()
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_else(|| NONE.to_string()),
        bool_cell(dep.found()).to_string(),
        dep.load_address()
            .map(|a| a.as_str().to_string())
            .unwrap_or_else(|| NONE.to_string()),
        dep.unused().map(bool_cell).unwrap_or(NONE).to_string(),
    ]
}

fn bool_cell(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

fn join_padded(cells: &[String], widths: &[usize]) -> String {
    cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = width))
        .collect::<Vec<_>>()
        .join(" | ")
}
