//! Simple Output and Reporting
//!
//! This module formats resolution and parse results for the terminal.

use serde::Serialize;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::handler::CollectedText;
use crate::parser::{EntityKind, ParseOutcome};

/// Result of the `resolve` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolutionReport {
    pub system_id: String,
    pub resource_name: String,
    pub size_bytes: usize,
}

/// Result of the `parse` command
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseReport {
    pub file: String,
    #[serde(flatten)]
    pub outcome: ParseOutcome,
    pub collected: Vec<CollectedText>,
}

/// Output formatter for human-readable or JSON results
pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Plain output, for tests and redirected streams
    pub fn without_colors(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: false,
        }
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    fn to_json<T: Serialize>(value: &T) -> String {
        serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e))
    }

    pub fn format_resolution(&self, report: &ResolutionReport) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(report);
        }

        match self.verbosity {
            VerbosityLevel::Quiet => report.resource_name.clone(),
            VerbosityLevel::Normal => format!(
                "{}  {} -> {}",
                self.colorize("✓ RESOLVED", "32"),
                report.system_id,
                report.resource_name
            ),
            VerbosityLevel::Verbose => format!(
                "{}  {} -> {} ({} bytes)",
                self.colorize("✓ RESOLVED", "32"),
                report.system_id,
                report.resource_name,
                report.size_bytes
            ),
        }
    }

    pub fn format_parse(&self, report: &ParseReport) -> String {
        if self.format == OutputFormat::Json {
            return Self::to_json(report);
        }

        let mut output = String::new();
        for item in &report.collected {
            output.push_str(&format!("{}: {}\n", item.element, item.text.trim()));
        }

        if self.verbosity == VerbosityLevel::Quiet {
            return output;
        }

        output.push_str(&format!(
            "{}  {} ({} elements",
            self.colorize("✓ PARSED", "32"),
            report.file,
            report.outcome.elements
        ));
        if report.outcome.warnings > 0 {
            output.push_str(&format!(
                ", {} {}",
                report.outcome.warnings,
                self.colorize("warnings", "33")
            ));
        }
        output.push_str(")\n");

        if self.verbosity >= VerbosityLevel::Verbose {
            for entity in &report.outcome.resolved {
                let kind = match entity.kind {
                    EntityKind::Doctype => "doctype",
                    EntityKind::Schema => "schema",
                };
                output.push_str(&format!(
                    "    {} {} -> {} ({} bytes)\n",
                    kind, entity.system_id, entity.resource_name, entity.size_bytes
                ));
            }
        }

        output
    }
}
