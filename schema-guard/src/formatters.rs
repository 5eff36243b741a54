//! Rendering validation reports for people and machines.
//!
//! # Examples
//!
//! ```rust
//! use schema_guard::core::Record;
//! use schema_guard::formatters::{HumanFormatter, FormatterConfig, ReportFormatter};
//! use schema_guard::schema::Schema;
//! use schema_guard::statistics::StatisticsComputer;
//! use schema_guard::validation::Validator;
//!
//! let snapshot = StatisticsComputer::new().compute(&[Record::new().with("a", 1)])?;
//! let report = Validator::new().report(&snapshot, &Schema::new(), None, None);
//!
//! let text = HumanFormatter::with_config(FormatterConfig::ci()).format(&report)?;
//! assert!(text.contains("unexpected column"));
//! # Ok::<(), schema_guard::error::GuardError>(())
//! ```

use std::fmt::Write;

use crate::error::{GuardError, Result};
use crate::validation::{Anomaly, ValidationReport};

/// Configuration options for formatting validation reports.
#[derive(Debug, Clone)]
pub struct FormatterConfig {
    /// Include the per-kind anomaly counts
    pub include_summary: bool,
    /// Include individual anomalies
    pub include_anomalies: bool,
    /// Maximum number of anomalies to display (`None` for all)
    pub max_anomalies: Option<usize>,
    /// Whether to use ANSI colors (human formatter only)
    pub use_colors: bool,
}

impl Default for FormatterConfig {
    fn default() -> Self {
        Self {
            include_summary: true,
            include_anomalies: true,
            max_anomalies: None,
            use_colors: true,
        }
    }
}

impl FormatterConfig {
    /// Only the verdict and counts.
    pub fn minimal() -> Self {
        Self {
            include_summary: true,
            include_anomalies: false,
            max_anomalies: Some(0),
            use_colors: false,
        }
    }

    /// Plain output with a bounded anomaly list, for CI logs.
    pub fn ci() -> Self {
        Self {
            include_summary: true,
            include_anomalies: true,
            max_anomalies: Some(50),
            use_colors: false,
        }
    }

    pub fn with_summary(mut self, include: bool) -> Self {
        self.include_summary = include;
        self
    }

    pub fn with_anomalies(mut self, include: bool) -> Self {
        self.include_anomalies = include;
        self
    }

    pub fn with_max_anomalies(mut self, max: Option<usize>) -> Self {
        self.max_anomalies = max;
        self
    }

    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    fn shown<'a>(&self, report: &'a ValidationReport) -> &'a [Anomaly] {
        let limit = self
            .max_anomalies
            .map_or(report.anomalies.len(), |max| max.min(report.anomalies.len()));
        &report.anomalies[..limit]
    }
}

/// Converts a [`ValidationReport`] into a string representation.
pub trait ReportFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String>;
}

fn rendering_failed(e: std::fmt::Error) -> GuardError {
    GuardError::Internal(format!("failed to render report: {e}"))
}

/// Structured JSON, for programmatic consumers.
#[derive(Debug, Clone)]
pub struct JsonFormatter {
    config: FormatterConfig,
    pretty: bool,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            pretty: true,
        }
    }

    pub fn with_pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}

impl Default for JsonFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for JsonFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        let mut value = serde_json::json!({
            "passed": report.is_clean(),
            "environment": report.environment,
            "columns_checked": report.columns_checked,
            "compared_with_previous": report.compared_with_previous,
            "anomaly_count": report.anomaly_count(),
        });
        if self.config.include_summary {
            value["summary"] = serde_json::to_value(report.counts_by_kind())?;
        }
        if self.config.include_anomalies {
            value["anomalies"] = serde_json::to_value(self.config.shown(report))?;
        }

        let json = if self.pretty {
            serde_json::to_string_pretty(&value)?
        } else {
            serde_json::to_string(&value)?
        };
        Ok(json)
    }
}

/// Console output.
#[derive(Debug, Clone, Default)]
pub struct HumanFormatter {
    config: FormatterConfig,
}

impl HumanFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self { config }
    }

    fn paint(&self, text: &str, color: &str) -> String {
        if self.config.use_colors {
            format!("\x1b[{color}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    }

    fn render(&self, report: &ValidationReport, out: &mut String) -> std::fmt::Result {
        let config = &self.config;
        if report.is_clean() {
            writeln!(out, "{}", self.paint("Validation PASSED", "32"))?;
        } else {
            writeln!(out, "{}", self.paint("Validation FAILED", "31"))?;
        }
        if let Some(env) = &report.environment {
            writeln!(out, "Environment: {env}")?;
        }
        writeln!(out, "Columns checked: {}", report.columns_checked)?;
        writeln!(out, "Anomalies: {}", report.anomaly_count())?;

        if config.include_summary && !report.is_clean() {
            writeln!(out)?;
            for (kind, count) in report.counts_by_kind() {
                writeln!(out, "   {kind}: {count}")?;
            }
        }

        if config.include_anomalies && !report.is_clean() {
            let shown = config.shown(report);
            writeln!(out)?;
            for anomaly in shown {
                writeln!(
                    out,
                    "   {} {} [{}] {}",
                    self.paint(anomaly.severity.as_str(), "31"),
                    anomaly.column,
                    anomaly.kind,
                    anomaly.description
                )?;
            }
            let hidden = report.anomaly_count() - shown.len();
            if hidden > 0 {
                writeln!(out, "   ... and {hidden} more")?;
            }
        }
        Ok(())
    }
}

impl ReportFormatter for HumanFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        let mut out = String::new();
        self.render(report, &mut out).map_err(rendering_failed)?;
        Ok(out)
    }
}

/// Markdown, for pull request comments and generated docs.
#[derive(Debug, Clone)]
pub struct MarkdownFormatter {
    config: FormatterConfig,
    heading_level: u8,
}

impl MarkdownFormatter {
    pub fn new() -> Self {
        Self::with_config(FormatterConfig::default())
    }

    pub fn with_config(config: FormatterConfig) -> Self {
        Self {
            config,
            heading_level: 2,
        }
    }

    /// Sets the base heading level, clamped to 1..=5.
    pub fn with_heading_level(mut self, level: u8) -> Self {
        self.heading_level = level.clamp(1, 5);
        self
    }

    fn render(&self, report: &ValidationReport, out: &mut String) -> std::fmt::Result {
        let h = "#".repeat(self.heading_level as usize);
        let verdict = if report.is_clean() { "PASSED" } else { "FAILED" };
        writeln!(out, "{h} Validation Report - {verdict}")?;
        writeln!(out)?;
        if let Some(env) = &report.environment {
            writeln!(out, "**Environment:** {env}")?;
        }
        writeln!(out, "**Columns checked:** {}", report.columns_checked)?;
        writeln!(out, "**Anomalies:** {}", report.anomaly_count())?;

        if self.config.include_summary && !report.is_clean() {
            writeln!(out)?;
            writeln!(out, "{h}# Summary")?;
            writeln!(out)?;
            writeln!(out, "| Kind | Count |")?;
            writeln!(out, "|------|-------|")?;
            for (kind, count) in report.counts_by_kind() {
                writeln!(out, "| {kind} | {count} |")?;
            }
        }

        if self.config.include_anomalies && !report.is_clean() {
            let shown = self.config.shown(report);
            writeln!(out)?;
            writeln!(out, "{h}# Anomalies")?;
            writeln!(out)?;
            writeln!(out, "| Column | Kind | Description |")?;
            writeln!(out, "|--------|------|-------------|")?;
            for anomaly in shown {
                writeln!(
                    out,
                    "| `{}` | {} | {} |",
                    anomaly.column,
                    anomaly.kind,
                    anomaly.description.replace('|', "\\|")
                )?;
            }
            let hidden = report.anomaly_count() - shown.len();
            if hidden > 0 {
                writeln!(out)?;
                writeln!(out, "> **Note:** {hidden} additional anomalies not shown.")?;
            }
        }
        Ok(())
    }
}

impl Default for MarkdownFormatter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportFormatter for MarkdownFormatter {
    fn format(&self, report: &ValidationReport) -> Result<String> {
        let mut out = String::new();
        self.render(report, &mut out).map_err(rendering_failed)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::AnomalyKind;

    fn failing() -> ValidationReport {
        ValidationReport {
            environment: Some("SERVING".to_string()),
            columns_checked: 2,
            compared_with_previous: true,
            anomalies: vec![
                Anomaly::new("country", AnomalyKind::UnexpectedValue, "value 'DE' is not in the domain"),
                Anomaly::new("age", AnomalyKind::DriftExceeded, "L-infinity distance 0.5000 | big"),
            ],
        }
    }

    fn passing() -> ValidationReport {
        ValidationReport {
            environment: None,
            columns_checked: 2,
            compared_with_previous: false,
            anomalies: Vec::new(),
        }
    }

    #[test]
    fn test_human() {
        let formatter = HumanFormatter::with_config(FormatterConfig::default().with_colors(false));
        let text = formatter.format(&failing()).unwrap();
        assert!(text.starts_with("Validation FAILED"));
        assert!(text.contains("Environment: SERVING"));
        assert!(text.contains("error country [unexpected value] value 'DE' is not in the domain"));

        let text = formatter.format(&passing()).unwrap();
        assert!(text.starts_with("Validation PASSED"));
        assert!(!text.contains("Environment"));
    }

    #[test]
    fn test_human_colors_and_limit() {
        let config = FormatterConfig::default().with_max_anomalies(Some(1));
        let text = HumanFormatter::with_config(config).format(&failing()).unwrap();
        assert!(text.contains("\x1b[31m"));
        assert!(text.contains("... and 1 more"));
        assert!(!text.contains("drift exceeded] L-infinity"));
    }

    #[test]
    fn test_json() {
        let json = JsonFormatter::new().format(&failing()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["passed"], false);
        assert_eq!(value["anomaly_count"], 2);
        assert_eq!(value["summary"]["unexpected_value"], 1);
        assert_eq!(value["anomalies"][1]["kind"], "drift_exceeded");

        let compact = JsonFormatter::with_config(FormatterConfig::minimal())
            .with_pretty(false)
            .format(&passing())
            .unwrap();
        assert!(!compact.contains('\n'));
        let value: serde_json::Value = serde_json::from_str(&compact).unwrap();
        assert!(value.get("anomalies").is_none());
    }

    #[test]
    fn test_markdown() {
        let text = MarkdownFormatter::new()
            .with_heading_level(3)
            .format(&failing())
            .unwrap();
        assert!(text.starts_with("### Validation Report - FAILED"));
        assert!(text.contains("#### Anomalies"));
        assert!(text.contains("| `country` | unexpected value |"));
        assert!(text.contains("0.5000 \\| big"));
    }
}
