//! Checked, in-place schema mutations.

use tracing::debug;

use super::types::{check_environment_name, check_fraction, Domain, FeatureSpec, Schema};
use crate::core::FeatureType;
use crate::error::{GuardError, Result};

/// Mutates a [`Schema`] in place.
///
/// Every operation checks its argument against the target feature before
/// touching anything, so a failed call leaves the schema exactly as it was.
/// Operations are idempotent. The editor borrows the schema mutably; clone
/// the schema first if the original must stay untouched.
///
/// # Examples
///
/// ```rust
/// use schema_guard::core::FeatureType;
/// use schema_guard::schema::{Domain, FeatureSpec, Schema};
///
/// let mut schema = Schema::new();
/// schema
///     .edit()
///     .add_feature(FeatureSpec::new("country", FeatureType::String))?
///     .set_domain("country", Domain::categorical(["GB", "FR"]))?
///     .add_domain_value("country", "DE")?
///     .set_presence_threshold("country", 0.95)?
///     .declare_environments(["TRAINING", "SERVING"])?;
///
/// // a numeric range on a string feature is rejected
/// assert!(schema.edit().set_domain("country", Domain::range(0.0, 1.0)).is_err());
/// # Ok::<(), schema_guard::error::GuardError>(())
/// ```
#[derive(Debug)]
pub struct SchemaEditor<'a> {
    schema: &'a mut Schema,
}

impl<'a> SchemaEditor<'a> {
    pub fn new(schema: &'a mut Schema) -> Self {
        Self { schema }
    }

    /// Appends a feature after checking it against the schema.
    pub fn add_feature(&mut self, feature: FeatureSpec) -> Result<&mut Self> {
        if let Some(existing) = self.schema.feature(feature.name()) {
            if *existing == feature {
                return Ok(self);
            }
            return Err(GuardError::invalid_constraint(
                feature.name(),
                "feature already declared with different settings",
            ));
        }
        feature.check(&self.schema.environments)?;
        debug!(column = feature.name(), "Adding feature");
        self.schema.features.push(feature);
        Ok(self)
    }

    /// Removes a feature, returning its spec.
    pub fn remove_feature(&mut self, column: &str) -> Result<FeatureSpec> {
        let position = self
            .schema
            .features
            .iter()
            .position(|f| f.name() == column)
            .ok_or_else(|| GuardError::unknown_column(column))?;
        Ok(self.schema.features.remove(position))
    }

    /// Replaces the domain of a feature.
    pub fn set_domain(&mut self, column: &str, domain: Domain) -> Result<&mut Self> {
        let feature = self.schema.feature_mut(column)?;
        let domain = match domain {
            Domain::Categorical { values } => Domain::categorical(values),
            numeric => numeric,
        };
        domain.check(column, feature.feature_type())?;
        *feature.domain_mut() = Some(domain);
        Ok(self)
    }

    /// Removes the domain of a feature, leaving its values unconstrained.
    pub fn clear_domain(&mut self, column: &str) -> Result<&mut Self> {
        *self.schema.feature_mut(column)?.domain_mut() = None;
        Ok(self)
    }

    /// Adds one value to a string feature's categorical domain.
    pub fn add_domain_value(&mut self, column: &str, value: impl Into<String>) -> Result<&mut Self> {
        let value = value.into();
        let feature = self.schema.feature_mut(column)?;
        if feature.feature_type() != FeatureType::String {
            return Err(GuardError::invalid_constraint(
                column,
                format!(
                    "cannot add a categorical value to a {} feature",
                    feature.feature_type()
                ),
            ));
        }
        match feature.domain_mut() {
            Some(Domain::Categorical { values }) => {
                if !values.contains(&value) {
                    values.push(value);
                }
            }
            _ => {
                return Err(GuardError::invalid_constraint(
                    column,
                    "feature has no categorical domain; use set_domain first",
                ))
            }
        }
        Ok(self)
    }

    /// Sets the minimum fraction of present values, in `[0, 1]`.
    pub fn set_presence_threshold(&mut self, column: &str, fraction: f64) -> Result<&mut Self> {
        check_fraction(column, "presence threshold", fraction)?;
        self.schema
            .feature_mut(column)?
            .set_presence_threshold(fraction);
        Ok(self)
    }

    /// Sets the maximum allowed L-infinity drift distance, in `[0, 1]`.
    pub fn set_drift_threshold(&mut self, column: &str, fraction: f64) -> Result<&mut Self> {
        check_fraction(column, "drift threshold", fraction)?;
        self.schema
            .feature_mut(column)?
            .set_drift_threshold(Some(fraction));
        Ok(self)
    }

    /// Disables the drift check for a feature.
    pub fn clear_drift_threshold(&mut self, column: &str) -> Result<&mut Self> {
        self.schema.feature_mut(column)?.set_drift_threshold(None);
        Ok(self)
    }

    /// Marks a feature as expected to be absent in a declared environment.
    pub fn mark_absent_in_environment(
        &mut self,
        column: &str,
        environment: &str,
    ) -> Result<&mut Self> {
        if !self.schema.environments.iter().any(|e| e == environment) {
            return Err(GuardError::invalid_constraint(
                column,
                format!("environment '{environment}' is not declared"),
            ));
        }
        self.schema
            .feature_mut(column)?
            .add_absent_environment(environment.to_string());
        Ok(self)
    }

    /// Declares environments; names already declared are kept as they are.
    pub fn declare_environments<I, S>(&mut self, names: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let names: Vec<String> = names.into_iter().map(Into::into).collect();
        for name in &names {
            check_environment_name(name)?;
        }
        for name in names {
            if !self.schema.environments.contains(&name) {
                self.schema.environments.push(name);
            }
        }
        Ok(self)
    }

    /// Sets the environment applied when validation is given none.
    pub fn set_default_environment(&mut self, environment: Option<&str>) -> Result<&mut Self> {
        if let Some(name) = environment {
            if !self.schema.environments.iter().any(|e| e == name) {
                return Err(GuardError::invalid_constraint(
                    "",
                    format!("default environment '{name}' is not declared"),
                ));
            }
        }
        self.schema.default_environment = environment.map(str::to_string);
        Ok(self)
    }
}

impl Schema {
    /// Opens a [`SchemaEditor`] on this schema.
    pub fn edit(&mut self) -> SchemaEditor<'_> {
        SchemaEditor::new(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> Schema {
        let mut schema = Schema::new();
        schema
            .edit()
            .add_feature(
                FeatureSpec::new("country", FeatureType::String)
                    .with_domain(Domain::categorical(["A", "B"])),
            )
            .unwrap()
            .add_feature(FeatureSpec::new("age", FeatureType::Numeric))
            .unwrap()
            .add_feature(FeatureSpec::new("active", FeatureType::Boolean))
            .unwrap();
        schema
    }

    #[test]
    fn test_add_domain_value_is_idempotent() {
        let mut schema = schema();
        schema.edit().add_domain_value("country", "C").unwrap();
        schema.edit().add_domain_value("country", "C").unwrap();
        assert_eq!(
            schema.feature("country").unwrap().domain(),
            Some(&Domain::categorical(["A", "B", "C"]))
        );
    }

    #[test]
    fn test_ill_typed_mutations_leave_schema_unchanged() {
        let mut schema = schema();
        let before = schema.clone();

        let mut cases: Vec<Result<()>> = Vec::new();
        cases.push(schema.edit().set_domain("country", Domain::range(0.0, 1.0)).map(|_| ()));
        cases.push(schema.edit().set_domain("age", Domain::categorical(["x"])).map(|_| ()));
        cases.push(schema.edit().set_domain("active", Domain::categorical(["true"])).map(|_| ()));
        cases.push(schema.edit().add_domain_value("age", "7").map(|_| ()));
        cases.push(schema.edit().set_presence_threshold("age", 1.01).map(|_| ()));
        cases.push(schema.edit().set_drift_threshold("age", f64::NAN).map(|_| ()));
        cases.push(schema.edit().mark_absent_in_environment("age", "SERVING").map(|_| ()));
        cases.push(schema.edit().declare_environments([""]).map(|_| ()));
        cases.push(schema.edit().set_default_environment(Some("PROD")).map(|_| ()));
        for result in cases {
            assert!(matches!(result, Err(GuardError::InvalidConstraint { .. })));
        }
        assert_eq!(schema, before);
    }

    #[test]
    fn test_unknown_column() {
        let mut schema = schema();
        let err = schema.edit().set_presence_threshold("nope", 0.5).unwrap_err();
        assert!(matches!(err, GuardError::UnknownColumn { column } if column == "nope"));
        assert!(schema.edit().remove_feature("nope").is_err());
    }

    #[test]
    fn test_add_domain_value_requires_existing_domain() {
        let mut schema = Schema::new();
        schema
            .edit()
            .add_feature(FeatureSpec::new("free_text", FeatureType::String))
            .unwrap();
        assert!(schema.edit().add_domain_value("free_text", "x").is_err());
        assert!(schema.feature("free_text").unwrap().domain().is_none());
    }

    #[test]
    fn test_environments() {
        let mut schema = schema();
        schema
            .edit()
            .declare_environments(["TRAINING", "SERVING"])
            .unwrap()
            .declare_environments(["SERVING"])
            .unwrap()
            .mark_absent_in_environment("active", "SERVING")
            .unwrap()
            .mark_absent_in_environment("active", "SERVING")
            .unwrap()
            .set_default_environment(Some("TRAINING"))
            .unwrap();

        assert_eq!(schema.environments(), ["TRAINING", "SERVING"]);
        assert_eq!(
            schema.feature("active").unwrap().absent_in_environments(),
            ["SERVING"]
        );
        assert_eq!(schema.default_environment(), Some("TRAINING"));
        assert!(schema.check().is_ok());
    }

    #[test]
    fn test_add_feature_conflicts() {
        let mut schema = schema();
        // identical spec is a no-op
        schema
            .edit()
            .add_feature(FeatureSpec::new("age", FeatureType::Numeric))
            .unwrap();
        assert_eq!(schema.len(), 3);
        assert!(schema
            .edit()
            .add_feature(FeatureSpec::new("age", FeatureType::String))
            .is_err());
    }

    #[test]
    fn test_remove_and_clear() {
        let mut schema = schema();
        schema
            .edit()
            .set_drift_threshold("age", 0.2)
            .unwrap()
            .clear_drift_threshold("age")
            .unwrap()
            .clear_domain("country")
            .unwrap();
        assert_eq!(schema.feature("age").unwrap().drift_threshold(), None);
        assert!(schema.feature("country").unwrap().domain().is_none());

        let removed = schema.edit().remove_feature("active").unwrap();
        assert_eq!(removed.name(), "active");
        assert_eq!(schema.len(), 2);
    }
}
