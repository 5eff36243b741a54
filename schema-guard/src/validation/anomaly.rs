//! Anomalies and the report that groups them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::core::Severity;

/// What a schema violation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyKind {
    MissingExpectedColumn,
    UnexpectedColumn,
    TypeMismatch,
    UnexpectedValue,
    PresenceBelowThreshold,
    DriftExceeded,
}

impl AnomalyKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnomalyKind::MissingExpectedColumn => "missing expected column",
            AnomalyKind::UnexpectedColumn => "unexpected column",
            AnomalyKind::TypeMismatch => "type mismatch",
            AnomalyKind::UnexpectedValue => "unexpected value",
            AnomalyKind::PresenceBelowThreshold => "presence below threshold",
            AnomalyKind::DriftExceeded => "drift exceeded",
        }
    }
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single schema violation found in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub column: String,
    pub kind: AnomalyKind,
    pub description: String,
    pub severity: Severity,
}

impl Anomaly {
    pub fn new(column: impl Into<String>, kind: AnomalyKind, description: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            kind,
            description: description.into(),
            severity: Severity::Error,
        }
    }
}

impl fmt::Display for Anomaly {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {}: {} ({})",
            self.severity, self.column, self.description, self.kind
        )
    }
}

/// Outcome of one validation run, ready for formatting or persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    /// Environment the run was evaluated in, after applying the schema default.
    pub environment: Option<String>,
    /// Number of columns looked at: schema features plus unexpected columns.
    pub columns_checked: usize,
    /// Whether a previous snapshot was available for drift checks.
    pub compared_with_previous: bool,
    pub anomalies: Vec<Anomaly>,
}

impl ValidationReport {
    pub fn is_clean(&self) -> bool {
        self.anomalies.is_empty()
    }

    pub fn anomaly_count(&self) -> usize {
        self.anomalies.len()
    }

    pub fn count_of(&self, kind: AnomalyKind) -> usize {
        self.anomalies.iter().filter(|a| a.kind == kind).count()
    }

    /// Anomaly counts per kind, omitting kinds that did not occur.
    pub fn counts_by_kind(&self) -> BTreeMap<AnomalyKind, usize> {
        let mut counts = BTreeMap::new();
        for anomaly in &self.anomalies {
            *counts.entry(anomaly.kind).or_insert(0) += 1;
        }
        counts
    }

    pub fn for_column<'a>(&'a self, column: &'a str) -> impl Iterator<Item = &'a Anomaly> + 'a {
        self.anomalies.iter().filter(move |a| a.column == column)
    }

    /// Distinct columns with at least one anomaly, in report order.
    pub fn affected_columns(&self) -> Vec<&str> {
        let mut columns: Vec<&str> = Vec::new();
        for anomaly in &self.anomalies {
            if !columns.contains(&anomaly.column.as_str()) {
                columns.push(&anomaly.column);
            }
        }
        columns
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report() -> ValidationReport {
        ValidationReport {
            environment: Some("SERVING".to_string()),
            columns_checked: 3,
            compared_with_previous: false,
            anomalies: vec![
                Anomaly::new("a", AnomalyKind::UnexpectedValue, "value 'x'"),
                Anomaly::new("a", AnomalyKind::UnexpectedValue, "value 'y'"),
                Anomaly::new("b", AnomalyKind::TypeMismatch, "expected numeric"),
            ],
        }
    }

    #[test]
    fn test_counts() {
        let report = report();
        assert!(!report.is_clean());
        assert_eq!(report.anomaly_count(), 3);
        assert_eq!(report.count_of(AnomalyKind::UnexpectedValue), 2);
        assert_eq!(report.count_of(AnomalyKind::DriftExceeded), 0);
        assert_eq!(report.counts_by_kind().len(), 2);
        assert_eq!(report.for_column("a").count(), 2);
        assert_eq!(report.affected_columns(), vec!["a", "b"]);
    }

    #[test]
    fn test_display_and_serde() {
        let anomaly = Anomaly::new("age", AnomalyKind::TypeMismatch, "expected numeric, found string");
        assert_eq!(
            anomaly.to_string(),
            "[error] age: expected numeric, found string (type mismatch)"
        );

        let json = serde_json::to_value(&anomaly).unwrap();
        assert_eq!(json["kind"], "type_mismatch");
        assert_eq!(json["severity"], "error");
    }
}
