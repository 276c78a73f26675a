//! Output formatting for the CLI.

use crate::config::OutputFormat;
use crate::error::Result;
use colored::*;
use morgue_domain::Outcome;
use morgue_scheduler::{RunMetrics, RunReport};
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Output formatter.
pub struct Formatter {
    format: OutputFormat,
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(format: OutputFormat, color_enabled: bool) -> Self {
        Self {
            format,
            color_enabled,
        }
    }

    /// Format a finished run.
    pub fn format_report(&self, report: &RunReport) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
            OutputFormat::Table => Ok(self.format_report_table(report)),
        }
    }

    /// Exceptions table followed by the run summary.
    fn format_report_table(&self, report: &RunReport) -> String {
        let exceptions = report.exceptions();
        let mut sections = Vec::new();

        if exceptions.is_empty() {
            sections.push(self.success("No duplicates, skips or errors."));
        } else {
            let mut builder = Builder::default();
            builder.push_record(["Status", "Path", "Key / Identifier", "Reason"]);

            for outcome in exceptions {
                builder.push_record([
                    self.status(outcome),
                    outcome.path().display().to_string(),
                    outcome.subject().unwrap_or_else(|| "-".to_string()),
                    outcome.reason(),
                ]);
            }

            let mut table = builder.build();
            table
                .with(Style::rounded())
                .with(Modify::new(Rows::first()).with(Alignment::center()));
            sections.push(table.to_string());
        }

        sections.push(self.format_metrics(&report.metrics));
        sections.join("\n\n")
    }

    /// Summary counts as a two-column table.
    fn format_metrics(&self, metrics: &RunMetrics) -> String {
        let mut builder = Builder::default();
        builder.push_record(["Metric", "Value"]);

        let rows = [
            ("Attempted", metrics.attempted.to_string()),
            ("Succeeded", metrics.succeeded.to_string()),
            ("Duplicates", metrics.duplicated.to_string()),
            ("Skipped", metrics.skipped.to_string()),
            ("Errors", metrics.failed.to_string()),
            ("Concurrency", metrics.concurrency.to_string()),
            ("Peak in flight", metrics.peak_in_flight.to_string()),
            ("Elapsed", format!("{:.2?}", metrics.elapsed)),
        ];
        for (name, value) in rows {
            builder.push_record([name.to_string(), value]);
        }

        let mut table = builder.build();
        table
            .with(Style::rounded())
            .with(Modify::new(Rows::first()).with(Alignment::center()));
        table.to_string()
    }

    fn status(&self, outcome: &Outcome) -> String {
        let color = match outcome {
            Outcome::Success { .. } => "green",
            Outcome::Duplicate { .. } => "cyan",
            Outcome::Skipped { .. } => "yellow",
            Outcome::Error { .. } => "red",
        };
        self.colorize(outcome.status(), color)
    }

    /// Format a success message.
    pub fn success(&self, message: &str) -> String {
        self.colorize(&format!("✓ {}", message), "green")
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("✗ {}", message), "red")
    }

    /// Format an info message.
    pub fn info(&self, message: &str) -> String {
        self.colorize(&format!("ℹ {}", message), "blue")
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: &str) -> String {
        if !self.color_enabled {
            return text.to_string();
        }

        match color {
            "red" => text.red().to_string(),
            "green" => text.green().to_string(),
            "blue" => text.blue().to_string(),
            "yellow" => text.yellow().to_string(),
            "cyan" => text.cyan().to_string(),
            _ => text.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use morgue_domain::{DuplicateReason, Resolver, SkipReason};
    use std::path::PathBuf;

    fn sample_report() -> RunReport {
        let key = Resolver::default()
            .resolve("https://tw.appledaily.com/local/20200505/HASH/")
            .unwrap();
        let outcomes = vec![
            Outcome::Success {
                path: PathBuf::from("a/index.html"),
                key: key.clone(),
                target: PathBuf::from("out/local/20200505/HASH/index.json"),
            },
            Outcome::Duplicate {
                path: PathBuf::from("b/index.html"),
                key,
                reason: DuplicateReason::IdCollision,
            },
            Outcome::Skipped {
                path: PathBuf::from("c/index.html"),
                reason: SkipReason::NoMatch,
                identifier: Some("https://example.com/about".to_string()),
            },
            Outcome::Error {
                path: PathBuf::from("d/index.html"),
                message: "read failed: denied".to_string(),
            },
        ];

        let mut metrics = RunMetrics::new();
        for outcome in &outcomes {
            metrics.record(outcome);
        }
        RunReport { metrics, outcomes }
    }

    #[test]
    fn test_table_format() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&sample_report()).unwrap();
        assert!(output.contains("Key / Identifier"));
        assert!(output.contains("id-collision"));
        assert!(output.contains("https://example.com/about"));
        assert!(output.contains("read failed: denied"));
        assert!(output.contains("Peak in flight"));
        // successes are not listed
        assert!(!output.contains("a/index.html"));
    }

    #[test]
    fn test_json_format() {
        let formatter = Formatter::new(OutputFormat::Json, false);
        let output = formatter.format_report(&sample_report()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(value["metrics"]["attempted"], 4);
        assert_eq!(value["outcomes"].as_array().unwrap().len(), 4);
    }

    #[test]
    fn test_clean_run() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let output = formatter.format_report(&RunReport::default()).unwrap();
        assert!(output.contains("No duplicates, skips or errors."));
        assert!(output.contains("Attempted"));
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        assert_eq!(formatter.success("test"), "✓ test");
        assert_eq!(formatter.error("test"), "✗ test");
        assert_eq!(formatter.info("test"), "ℹ test");
    }

    #[test]
    fn test_run_error_line() {
        let formatter = Formatter::new(OutputFormat::Table, false);
        let err = crate::error::CliError::Config("[scheduler] concurrency must be greater than 0".into());
        assert_eq!(
            formatter.error(&format!("Error: {}", err)),
            "✗ Error: Configuration error: [scheduler] concurrency must be greater than 0"
        );
    }
}
