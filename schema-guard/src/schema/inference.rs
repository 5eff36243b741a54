//! Schema inference from a statistics snapshot.

use tracing::{debug, info, instrument};

use super::types::{Domain, FeatureSpec, Schema};
use crate::core::FeatureType;
use crate::statistics::{ColumnStatistics, StatisticsSnapshot};

/// Configuration for [`SchemaInferencer`].
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Categorical columns with this many distinct values or more get no
    /// inferred domain and are treated as free text.
    pub cardinality_cap: usize,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            cardinality_cap: 1000,
        }
    }
}

/// Builder for [`SchemaInferencer`].
#[derive(Debug, Default)]
pub struct SchemaInferencerBuilder {
    config: InferenceConfig,
}

impl SchemaInferencerBuilder {
    pub fn cardinality_cap(mut self, cap: usize) -> Self {
        self.config.cardinality_cap = cap;
        self
    }

    pub fn build(self) -> SchemaInferencer {
        SchemaInferencer {
            config: self.config,
        }
    }
}

/// Derives a [`Schema`] from a [`StatisticsSnapshot`].
///
/// - the feature type is the observed type; columns that were never present
///   become string features without a domain
/// - string columns get a categorical domain of their observed values (sorted)
///   when they have fewer distinct values than the cardinality cap and the
///   value set was not truncated
/// - no presence threshold, drift threshold or environment is inferred
///
/// Inference is deterministic: the same snapshot always yields the same schema.
#[derive(Debug, Clone, Default)]
pub struct SchemaInferencer {
    config: InferenceConfig,
}

impl SchemaInferencer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn builder() -> SchemaInferencerBuilder {
        SchemaInferencerBuilder::default()
    }

    pub fn config(&self) -> &InferenceConfig {
        &self.config
    }

    #[instrument(skip_all, fields(columns = stats.len()))]
    pub fn infer(&self, stats: &StatisticsSnapshot) -> Schema {
        let features: Vec<FeatureSpec> = stats
            .columns()
            .iter()
            .map(|column| self.infer_feature(column))
            .collect();

        let constrained = features.iter().filter(|f| f.domain().is_some()).count();
        info!(
            features = features.len(),
            with_domain = constrained,
            "Inferred schema"
        );

        Schema {
            features,
            environments: Vec::new(),
            default_environment: None,
        }
    }

    fn infer_feature(&self, column: &ColumnStatistics) -> FeatureSpec {
        let feature_type = column.feature_type.unwrap_or(FeatureType::String);
        let spec = FeatureSpec::new(&column.name, feature_type);
        if feature_type != FeatureType::String {
            return spec;
        }

        match &column.value_counts {
            Some(counts) if !counts.truncated => {
                if counts.distinct_count() < self.config.cardinality_cap {
                    spec.with_domain(Domain::Categorical {
                        values: counts.counts.keys().cloned().collect(),
                    })
                } else {
                    debug!(
                        column = %column.name,
                        distinct = counts.distinct_count(),
                        cap = self.config.cardinality_cap,
                        "Skipping domain for high-cardinality column"
                    );
                    spec
                }
            }
            _ => spec,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Record, Value};
    use crate::statistics::StatisticsComputer;

    fn snapshot(records: &[Record]) -> StatisticsSnapshot {
        StatisticsComputer::new().compute(records).unwrap()
    }

    #[test]
    fn test_infers_types_and_domains() {
        let records = vec![
            Record::new().with("c", "b").with("n", 1).with("f", true),
            Record::new().with("c", "a").with("n", 2).with("f", false),
            Record::new().with("c", "b").with("n", Value::Null).with("f", true),
        ];
        let schema = SchemaInferencer::new().infer(&snapshot(&records));

        let names: Vec<&str> = schema.features().iter().map(|f| f.name()).collect();
        assert_eq!(names, vec!["c", "n", "f"]);

        let c = schema.feature("c").unwrap();
        assert_eq!(c.feature_type(), FeatureType::String);
        assert_eq!(c.domain(), Some(&Domain::categorical(["a", "b"])));
        assert_eq!(c.presence_threshold(), 0.0);
        assert_eq!(c.drift_threshold(), None);

        assert_eq!(schema.feature("n").unwrap().feature_type(), FeatureType::Numeric);
        assert!(schema.feature("n").unwrap().domain().is_none());
        assert!(schema.feature("f").unwrap().domain().is_none());
        assert!(schema.environments().is_empty());
    }

    #[test]
    fn test_cardinality_cap() {
        let records: Vec<Record> = (0..5)
            .map(|i| Record::new().with("id", format!("user-{i}")))
            .collect();
        let stats = snapshot(&records);

        let capped = SchemaInferencer::builder().cardinality_cap(5).build();
        assert!(capped.infer(&stats).feature("id").unwrap().domain().is_none());

        let roomy = SchemaInferencer::builder().cardinality_cap(6).build();
        assert!(roomy.infer(&stats).feature("id").unwrap().domain().is_some());
    }

    #[test]
    fn test_truncated_values_get_no_domain() {
        let records: Vec<Record> = (0..5)
            .map(|i| Record::new().with("id", format!("v{i}")))
            .collect();
        let stats = StatisticsComputer::builder()
            .max_tracked_values(2)
            .build()
            .compute(&records)
            .unwrap();
        let schema = SchemaInferencer::new().infer(&stats);
        assert!(schema.feature("id").unwrap().domain().is_none());
    }

    #[test]
    fn test_all_missing_column_becomes_unconstrained_string() {
        let records = vec![Record::new().with("ghost", Value::Null)];
        let schema = SchemaInferencer::new().infer(&snapshot(&records));
        let ghost = schema.feature("ghost").unwrap();
        assert_eq!(ghost.feature_type(), FeatureType::String);
        assert!(ghost.domain().is_none());
    }

    #[test]
    fn test_deterministic() {
        let records = vec![
            Record::new().with("c", "z"),
            Record::new().with("c", "y"),
        ];
        let stats = snapshot(&records);
        let inferencer = SchemaInferencer::new();
        assert_eq!(inferencer.infer(&stats), inferencer.infer(&stats));
    }
}
