//! Checks a statistics snapshot against a schema.

use tracing::{info, instrument};

use super::anomaly::{Anomaly, AnomalyKind, ValidationReport};
use super::drift::column_distance;
use crate::core::FeatureType;
use crate::logging::LogConfig;
use crate::schema::{Domain, FeatureSpec, Schema};
use crate::statistics::{ColumnStatistics, StatisticsSnapshot};
use crate::{log_check, perf_debug};

/// Compares snapshots against a [`Schema`] and reports every violation as an
/// [`Anomaly`].
///
/// Columns are visited in schema order, followed by columns the schema does
/// not declare in the order they appear in the snapshot. For each declared
/// column the checks run in a fixed order:
///
/// 1. column presence (suppressed when the feature is expected to be absent in
///    the active environment)
/// 2. observed type against the declared type
/// 3. domain: one anomaly per value outside a categorical domain, one anomaly
///    for a numeric range violation
/// 4. fraction of present values against the presence threshold
/// 5. drift against `previous`, when a drift threshold is set
///
/// Data-quality problems are never errors; validation is infallible.
///
/// # Examples
///
/// ```rust
/// use schema_guard::core::Record;
/// use schema_guard::schema::SchemaInferencer;
/// use schema_guard::statistics::StatisticsComputer;
/// use schema_guard::validation::{AnomalyKind, Validator};
///
/// let training = vec![Record::new().with("country", "GB"), Record::new().with("country", "FR")];
/// let serving = vec![Record::new().with("country", "DE")];
///
/// let computer = StatisticsComputer::new();
/// let schema = SchemaInferencer::new().infer(&computer.compute(&training)?);
/// let anomalies = Validator::new().validate(&computer.compute(&serving)?, &schema, None, None);
///
/// assert_eq!(anomalies.len(), 1);
/// assert_eq!(anomalies[0].kind, AnomalyKind::UnexpectedValue);
/// # Ok::<(), schema_guard::error::GuardError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct Validator {
    log_config: LogConfig,
}

impl Validator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_log_config(log_config: LogConfig) -> Self {
        Self { log_config }
    }

    /// Validates `current` and returns the anomalies in column order.
    ///
    /// When `environment` is `None` the schema's default environment applies.
    pub fn validate(
        &self,
        current: &StatisticsSnapshot,
        schema: &Schema,
        previous: Option<&StatisticsSnapshot>,
        environment: Option<&str>,
    ) -> Vec<Anomaly> {
        self.report(current, schema, previous, environment).anomalies
    }

    /// Same as [`validate`](Self::validate), wrapped in a [`ValidationReport`].
    #[instrument(skip_all, fields(columns = current.len(), features = schema.len()))]
    pub fn report(
        &self,
        current: &StatisticsSnapshot,
        schema: &Schema,
        previous: Option<&StatisticsSnapshot>,
        environment: Option<&str>,
    ) -> ValidationReport {
        let environment = environment.or(schema.default_environment());
        let mut anomalies = Vec::new();
        let mut columns_checked = 0;

        for feature in schema.features() {
            columns_checked += 1;
            let before = anomalies.len();
            self.check_feature(feature, current, previous, environment, &mut anomalies);
            log_check!(
                self.log_config,
                column = feature.name(),
                anomalies = anomalies.len() - before,
                "Checked feature"
            );
        }

        for column in current.columns() {
            if !schema.contains(&column.name) {
                columns_checked += 1;
                anomalies.push(Anomaly::new(
                    &column.name,
                    AnomalyKind::UnexpectedColumn,
                    format!("column '{}' is not declared in the schema", column.name),
                ));
            }
        }

        if self.log_config.log_metrics {
            info!(
                columns = columns_checked,
                anomalies = anomalies.len(),
                environment = environment.unwrap_or("-"),
                "Validation finished"
            );
        }

        ValidationReport {
            environment: environment.map(str::to_string),
            columns_checked,
            compared_with_previous: previous.is_some(),
            anomalies,
        }
    }

    fn check_feature(
        &self,
        feature: &FeatureSpec,
        current: &StatisticsSnapshot,
        previous: Option<&StatisticsSnapshot>,
        environment: Option<&str>,
        anomalies: &mut Vec<Anomaly>,
    ) {
        let Some(column) = current.column(feature.name()) else {
            match environment {
                Some(env) if feature.is_absent_in(env) => {
                    perf_debug!(
                        self.log_config,
                        column = feature.name(),
                        environment = env,
                        "Column expected to be absent"
                    );
                }
                _ => anomalies.push(Anomaly::new(
                    feature.name(),
                    AnomalyKind::MissingExpectedColumn,
                    format!(
                        "column '{}' is declared in the schema but missing from the data",
                        feature.name()
                    ),
                )),
            }
            return;
        };

        // A column that was never present has no observed type to compare.
        let type_matches = match column.feature_type {
            Some(observed) if observed != feature.feature_type() => {
                anomalies.push(Anomaly::new(
                    feature.name(),
                    AnomalyKind::TypeMismatch,
                    format!(
                        "expected {} values, found {}",
                        feature.feature_type(),
                        observed
                    ),
                ));
                false
            }
            Some(_) => true,
            None => false,
        };

        if type_matches {
            if let Some(domain) = feature.domain() {
                check_domain(feature, domain, column, anomalies);
            }
        }

        let threshold = feature.presence_threshold();
        if threshold > 0.0 {
            let present = column.present_fraction();
            if present < threshold {
                anomalies.push(Anomaly::new(
                    feature.name(),
                    AnomalyKind::PresenceBelowThreshold,
                    format!(
                        "present in {:.4} of rows, expected at least {:.4}",
                        present, threshold
                    ),
                ));
            }
        }

        if let (Some(threshold), Some(previous)) = (feature.drift_threshold(), previous) {
            let Some(before) = previous.column(feature.name()) else {
                return;
            };
            if let Some(distance) = column_distance(feature.feature_type(), column, before) {
                log_check!(
                    self.log_config,
                    column = feature.name(),
                    distance,
                    threshold,
                    "Computed drift"
                );
                if distance > threshold {
                    anomalies.push(Anomaly::new(
                        feature.name(),
                        AnomalyKind::DriftExceeded,
                        format!(
                            "L-infinity distance {:.4} exceeds the drift threshold {:.4}",
                            distance, threshold
                        ),
                    ));
                }
            }
        }
    }
}

fn check_domain(
    feature: &FeatureSpec,
    domain: &Domain,
    column: &ColumnStatistics,
    anomalies: &mut Vec<Anomaly>,
) {
    match domain {
        Domain::Categorical { values } => {
            let Some(counts) = &column.value_counts else {
                return;
            };
            for value in counts.counts.keys() {
                if !values.contains(value) {
                    anomalies.push(Anomaly::new(
                        feature.name(),
                        AnomalyKind::UnexpectedValue,
                        format!("value '{value}' is not in the domain"),
                    ));
                }
            }
        }
        Domain::Numeric { min, max } => {
            if feature.feature_type() != FeatureType::Numeric {
                return;
            }
            let Some(numeric) = &column.numeric else {
                return;
            };
            let below = min.filter(|&min| numeric.min < min);
            let above = max.filter(|&max| numeric.max > max);
            let description = match (below, above) {
                (None, None) => return,
                (Some(min), None) => {
                    format!("observed minimum {} is below the domain minimum {}", numeric.min, min)
                }
                (None, Some(max)) => {
                    format!("observed maximum {} is above the domain maximum {}", numeric.max, max)
                }
                (Some(min), Some(max)) => format!(
                    "observed range [{}, {}] exceeds the domain range [{}, {}]",
                    numeric.min, numeric.max, min, max
                ),
            };
            anomalies.push(Anomaly::new(
                feature.name(),
                AnomalyKind::UnexpectedValue,
                description,
            ));
        }
    }
}
