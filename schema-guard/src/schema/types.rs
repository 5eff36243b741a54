//! Schema, feature specs and value domains.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::FeatureType;
use crate::error::{GuardError, Result};

/// Version written into serialized schema documents.
pub const SCHEMA_FORMAT_VERSION: u32 = 1;

/// Allowed values for a feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Domain {
    /// Enumerated values, for string features. Order is preserved.
    Categorical { values: Vec<String> },
    /// Inclusive range, for numeric features. Either bound may be open.
    Numeric { min: Option<f64>, max: Option<f64> },
}

impl Domain {
    /// Builds a categorical domain, dropping duplicate values.
    pub fn categorical<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut seen = HashSet::new();
        let values = values
            .into_iter()
            .map(Into::into)
            .filter(|v: &String| seen.insert(v.clone()))
            .collect();
        Domain::Categorical { values }
    }

    /// Builds a numeric range with both bounds set.
    pub fn range(min: f64, max: f64) -> Self {
        Domain::Numeric {
            min: Some(min),
            max: Some(max),
        }
    }

    /// The feature type this domain applies to.
    pub fn feature_type(&self) -> FeatureType {
        match self {
            Domain::Categorical { .. } => FeatureType::String,
            Domain::Numeric { .. } => FeatureType::Numeric,
        }
    }

    pub(crate) fn check(&self, column: &str, feature_type: FeatureType) -> Result<()> {
        if self.feature_type() != feature_type {
            return Err(GuardError::invalid_constraint(
                column,
                format!(
                    "{} domain does not apply to a {feature_type} feature",
                    self.feature_type()
                ),
            ));
        }
        match self {
            Domain::Categorical { values } => {
                let mut seen = HashSet::new();
                if let Some(dup) = values.iter().find(|v| !seen.insert(v.as_str())) {
                    return Err(GuardError::invalid_constraint(
                        column,
                        format!("duplicate domain value '{dup}'"),
                    ));
                }
            }
            Domain::Numeric { min, max } => {
                for bound in min.iter().chain(max.iter()) {
                    if !bound.is_finite() {
                        return Err(GuardError::invalid_constraint(
                            column,
                            format!("numeric domain bound {bound} is not finite"),
                        ));
                    }
                }
                if let (Some(lo), Some(hi)) = (min, max) {
                    if lo > hi {
                        return Err(GuardError::invalid_constraint(
                            column,
                            format!("numeric domain min {lo} exceeds max {hi}"),
                        ));
                    }
                }
            }
        }
        Ok(())
    }
}

pub(crate) fn check_fraction(column: &str, what: &str, value: f64) -> Result<()> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(GuardError::invalid_constraint(
            column,
            format!("{what} must be within [0, 1], got {value}"),
        ))
    }
}

/// The expectations attached to one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureSpec {
    name: String,
    feature_type: FeatureType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    domain: Option<Domain>,
    #[serde(default)]
    presence_threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    drift_threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    absent_in_environments: Vec<String>,
}

impl FeatureSpec {
    /// A feature with no domain, no presence constraint and no drift threshold.
    pub fn new(name: impl Into<String>, feature_type: FeatureType) -> Self {
        Self {
            name: name.into(),
            feature_type,
            domain: None,
            presence_threshold: 0.0,
            drift_threshold: None,
            absent_in_environments: Vec::new(),
        }
    }

    /// Builder-style domain; checked when the feature joins a schema.
    pub fn with_domain(mut self, domain: Domain) -> Self {
        self.domain = Some(domain);
        self
    }

    /// Builder-style presence threshold; checked when the feature joins a schema.
    pub fn with_presence_threshold(mut self, fraction: f64) -> Self {
        self.presence_threshold = fraction;
        self
    }

    /// Builder-style drift threshold; checked when the feature joins a schema.
    pub fn with_drift_threshold(mut self, fraction: f64) -> Self {
        self.drift_threshold = Some(fraction);
        self
    }

    /// Builder-style environment exclusion; checked when the feature joins a schema.
    pub fn absent_in(mut self, environment: impl Into<String>) -> Self {
        let environment = environment.into();
        if !self.absent_in_environments.contains(&environment) {
            self.absent_in_environments.push(environment);
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn feature_type(&self) -> FeatureType {
        self.feature_type
    }

    pub fn domain(&self) -> Option<&Domain> {
        self.domain.as_ref()
    }

    /// Minimum fraction of present values; 0 disables the check.
    pub fn presence_threshold(&self) -> f64 {
        self.presence_threshold
    }

    pub fn drift_threshold(&self) -> Option<f64> {
        self.drift_threshold
    }

    pub fn absent_in_environments(&self) -> &[String] {
        &self.absent_in_environments
    }

    pub fn is_absent_in(&self, environment: &str) -> bool {
        self.absent_in_environments.iter().any(|e| e == environment)
    }

    pub(crate) fn domain_mut(&mut self) -> &mut Option<Domain> {
        &mut self.domain
    }

    pub(crate) fn set_presence_threshold(&mut self, fraction: f64) {
        self.presence_threshold = fraction;
    }

    pub(crate) fn set_drift_threshold(&mut self, fraction: Option<f64>) {
        self.drift_threshold = fraction;
    }

    pub(crate) fn add_absent_environment(&mut self, environment: String) {
        if !self.is_absent_in(&environment) {
            self.absent_in_environments.push(environment);
        }
    }

    /// Checks every invariant of this feature against the declared environments.
    pub(crate) fn check(&self, environments: &[String]) -> Result<()> {
        if self.name.is_empty() {
            return Err(GuardError::invalid_constraint("", "feature name is empty"));
        }
        if let Some(domain) = &self.domain {
            domain.check(&self.name, self.feature_type)?;
        }
        check_fraction(&self.name, "presence threshold", self.presence_threshold)?;
        if let Some(drift) = self.drift_threshold {
            check_fraction(&self.name, "drift threshold", drift)?;
        }
        let mut seen = HashSet::new();
        for environment in &self.absent_in_environments {
            if !environments.contains(environment) {
                return Err(GuardError::invalid_constraint(
                    &self.name,
                    format!("environment '{environment}' is not declared"),
                ));
            }
            if !seen.insert(environment.as_str()) {
                return Err(GuardError::invalid_constraint(
                    &self.name,
                    format!("environment '{environment}' listed twice"),
                ));
            }
        }
        Ok(())
    }
}

/// The declarative contract a snapshot is validated against.
///
/// Features keep their declaration order. A schema is mutated only through
/// [`SchemaEditor`](super::SchemaEditor), which checks every change before
/// applying it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "SchemaDocument", into = "SchemaDocument")]
pub struct Schema {
    pub(crate) features: Vec<FeatureSpec>,
    pub(crate) environments: Vec<String>,
    pub(crate) default_environment: Option<String>,
}

impl Schema {
    /// An empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Features in declaration order.
    pub fn features(&self) -> &[FeatureSpec] {
        &self.features
    }

    pub fn feature(&self, name: &str) -> Option<&FeatureSpec> {
        self.features.iter().find(|f| f.name == name)
    }

    /// Like [`feature`](Self::feature), failing with `UnknownColumn`.
    pub fn require_feature(&self, name: &str) -> Result<&FeatureSpec> {
        self.feature(name)
            .ok_or_else(|| GuardError::unknown_column(name))
    }

    pub(crate) fn feature_mut(&mut self, name: &str) -> Result<&mut FeatureSpec> {
        self.features
            .iter_mut()
            .find(|f| f.name == name)
            .ok_or_else(|| GuardError::unknown_column(name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.feature(name).is_some()
    }

    /// Declared environment names in declaration order.
    pub fn environments(&self) -> &[String] {
        &self.environments
    }

    pub fn default_environment(&self) -> Option<&str> {
        self.default_environment.as_deref()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Checks every schema invariant.
    pub fn check(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for environment in &self.environments {
            check_environment_name(environment)?;
            if !seen.insert(environment.as_str()) {
                return Err(GuardError::invalid_constraint(
                    "",
                    format!("environment '{environment}' declared twice"),
                ));
            }
        }
        if let Some(default) = &self.default_environment {
            if !self.environments.contains(default) {
                return Err(GuardError::invalid_constraint(
                    "",
                    format!("default environment '{default}' is not declared"),
                ));
            }
        }
        let mut names = HashSet::new();
        for feature in &self.features {
            if !names.insert(feature.name.as_str()) {
                return Err(GuardError::invalid_constraint(
                    &feature.name,
                    "feature declared twice",
                ));
            }
            feature.check(&self.environments)?;
        }
        Ok(())
    }
}

/// Rejects blank environment names.
pub(crate) fn check_environment_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(GuardError::invalid_constraint(
            "",
            "environment names must not be empty",
        ));
    }
    Ok(())
}

/// Serialized form of a [`Schema`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct SchemaDocument {
    version: u32,
    #[serde(default)]
    environments: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    default_environment: Option<String>,
    features: Vec<FeatureSpec>,
}

impl From<Schema> for SchemaDocument {
    fn from(schema: Schema) -> Self {
        Self {
            version: SCHEMA_FORMAT_VERSION,
            environments: schema.environments,
            default_environment: schema.default_environment,
            features: schema.features,
        }
    }
}

impl TryFrom<SchemaDocument> for Schema {
    type Error = GuardError;

    fn try_from(document: SchemaDocument) -> Result<Self> {
        if document.version != SCHEMA_FORMAT_VERSION {
            return Err(GuardError::NotSupported(format!(
                "schema format version {} (expected {SCHEMA_FORMAT_VERSION})",
                document.version
            )));
        }
        let schema = Schema {
            features: document.features,
            environments: document.environments,
            default_environment: document.default_environment,
        };
        schema.check()?;
        Ok(schema)
    }
}
