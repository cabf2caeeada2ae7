//! Report formatting for the command line tool.

use serde::Serialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::header::Header;

/// Summary of a catalog taken from its header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InfoReport {
    pub file: PathBuf,
    pub catalog_id: String,
    pub catalog_version: String,
    pub language: String,
    pub products: usize,
    pub catalog_groups: usize,
    pub classification_groups: usize,
    pub mappings: usize,
}

impl InfoReport {
    pub fn from_header(file: impl Into<PathBuf>, header: &Header) -> Self {
        Self {
            file: file.into(),
            catalog_id: header.catalog.id.clone(),
            catalog_version: header.catalog.version.clone(),
            language: header.catalog.language.clone(),
            products: header.number_of_articles,
            catalog_groups: header.number_of_catalog_groups,
            classification_groups: header.number_of_classification_groups,
            mappings: header.number_of_article_to_catalog_group_maps,
        }
    }
}

/// Throughput of a full read, with delivered counts next to those the header declares.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerfReport {
    pub file: PathBuf,
    pub products: usize,
    pub declared_products: usize,
    pub catalog_groups: usize,
    pub declared_catalog_groups: usize,
    pub classification_groups: usize,
    pub declared_classification_groups: usize,
    #[serde(serialize_with = "serialize_duration_ms", rename = "duration_ms")]
    pub duration: Duration,
    pub products_per_sec: f64,
}

impl PerfReport {
    pub fn new(
        file: impl Into<PathBuf>,
        header: &Header,
        products: usize,
        catalog_groups: usize,
        classification_groups: usize,
        duration: Duration,
    ) -> Self {
        let secs = duration.as_secs_f64();
        let products_per_sec = if secs > 0.0 {
            products as f64 / secs
        } else {
            0.0
        };
        Self {
            file: file.into(),
            products,
            declared_products: header.number_of_articles,
            catalog_groups,
            declared_catalog_groups: header.number_of_catalog_groups,
            classification_groups,
            declared_classification_groups: header.number_of_classification_groups,
            duration,
            products_per_sec,
        }
    }
}

fn serialize_duration_ms<S: serde::Serializer>(
    duration: &Duration,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.serialize_u128(duration.as_millis())
}

/// Formats reports as text or JSON
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

    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_info(&self, report: &InfoReport) -> String {
        if self.format == OutputFormat::Json {
            return to_json(report);
        }

        let mut output = String::new();
        match self.verbosity {
            VerbosityLevel::Quiet => {
                output.push_str(&format!("{}\n", report.products));
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                output.push_str(&format!(
                    "{} {}\n",
                    self.colorize("Catalog:", "1"),
                    report.file.display()
                ));
                if self.verbosity == VerbosityLevel::Verbose {
                    output.push_str(&format!("  Id: {}\n", report.catalog_id));
                    output.push_str(&format!("  Version: {}\n", report.catalog_version));
                    output.push_str(&format!("  Language: {}\n", report.language));
                }
                output.push_str(&format!(
                    "  {} {}\n",
                    self.colorize("Products:", "32"),
                    report.products
                ));
                output.push_str(&format!("  Catalog groups: {}\n", report.catalog_groups));
                output.push_str(&format!(
                    "  Classification groups: {}\n",
                    report.classification_groups
                ));
                output.push_str(&format!("  Mappings: {}\n", report.mappings));
            }
        }
        output
    }

    pub fn format_perf(&self, report: &PerfReport) -> String {
        if self.format == OutputFormat::Json {
            return to_json(report);
        }

        let mut output = String::new();
        match self.verbosity {
            VerbosityLevel::Quiet => {
                output.push_str(&format!("{:.1}\n", report.products_per_sec));
            }
            VerbosityLevel::Normal | VerbosityLevel::Verbose => {
                output.push_str(&format!(
                    "{} {} products in {}\n",
                    self.colorize("Read", "32"),
                    report.products,
                    format_duration(report.duration)
                ));
                output.push_str(&format!(
                    "  Throughput: {:.1} products/sec\n",
                    report.products_per_sec
                ));
                output.push_str(&self.count_line(
                    "Products:",
                    report.products,
                    report.declared_products,
                ));
                output.push_str(&self.count_line(
                    "Catalog groups:",
                    report.catalog_groups,
                    report.declared_catalog_groups,
                ));
                output.push_str(&self.count_line(
                    "Classification groups:",
                    report.classification_groups,
                    report.declared_classification_groups,
                ));
            }
        }
        output
    }

    /// `delivered / declared`, highlighted when the two disagree.
    fn count_line(&self, label: &str, delivered: usize, declared: usize) -> String {
        let counts = format!("{} / {}", delivered, declared);
        let counts = if delivered == declared {
            counts
        } else {
            self.colorize(&counts, "33")
        };
        format!("  {} {}\n", label, counts)
    }

    pub fn format_error(&self, message: &str) -> String {
        format!("{} {}", self.colorize("error:", "31"), message)
    }
}

fn to_json<T: Serialize>(value: &T) -> String {
    match serde_json::to_string_pretty(value) {
        Ok(mut json) => {
            json.push('\n');
            json
        }
        Err(e) => format!("{{\"error\": \"{}\"}}\n", e),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
