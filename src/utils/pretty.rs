//! Plain-text report formatting.
//!
//! Baseline summaries, candidate listings and run summaries are all
//! rendered through [`ReportWriter`], an indenting line writer.

use std::fmt;

/// Width of the rule lines drawn under section titles.
pub const RULE_WIDTH: usize = 60;

/// An indenting writer for multi-line reports.
#[derive(Debug)]
pub struct ReportWriter {
    output: String,
    depth: usize,
    indent_str: String,
    at_line_start: bool,
}

impl ReportWriter {
    /// Create a writer with the given indent string.
    pub fn new(indent_str: &str) -> Self {
        Self {
            output: String::new(),
            depth: 0,
            indent_str: indent_str.to_string(),
            at_line_start: true,
        }
    }

    /// Create a writer with default settings (2 spaces).
    pub fn default_indent() -> Self {
        Self::new("  ")
    }

    /// Write text, indenting every line that starts inside it.
    pub fn write(&mut self, s: &str) {
        for (n, piece) in s.split('\n').enumerate() {
            if n > 0 {
                self.output.push('\n');
                self.at_line_start = true;
            }
            if piece.is_empty() {
                continue;
            }
            if self.at_line_start {
                self.output.push_str(&self.indent_str.repeat(self.depth));
                self.at_line_start = false;
            }
            self.output.push_str(piece);
        }
    }

    /// Write a line.
    pub fn writeln(&mut self, s: &str) {
        self.write(s);
        self.write("\n");
    }

    /// Write a `key: value` line with the key padded to `width`.
    pub fn field<V: fmt::Display>(&mut self, key: &str, width: usize, value: V) {
        self.writeln(&format!("{:<width$} {}", format!("{}:", key), value, width = width));
    }

    /// Write a section title followed by a rule.
    pub fn section(&mut self, title: &str) {
        self.writeln(title);
        self.writeln(&"-".repeat(RULE_WIDTH));
    }

    /// Write an indented block under a header line.
    pub fn block<F: FnOnce(&mut Self)>(&mut self, header: &str, f: F) {
        self.writeln(header);
        self.depth += 1;
        f(self);
        self.depth = self.depth.saturating_sub(1);
    }

    /// Get the formatted output.
    pub fn finish(self) -> String {
        self.output
    }

    /// Get a reference to the current output.
    pub fn output(&self) -> &str {
        &self.output
    }
}

/// Format a list with separators.
pub fn format_list<T: fmt::Display>(items: &[T], sep: &str) -> String {
    items
        .iter()
        .map(|x| x.to_string())
        .collect::<Vec<_>>()
        .join(sep)
}

/// Render a yes/no flag as a single table cell.
pub fn yes_no(flag: bool) -> &'static str {
    if flag {
        "Y"
    } else {
        "N"
    }
}
