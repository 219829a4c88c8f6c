//! Checker configuration.

use crate::error::{BrakeError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

pub const DEFAULT_BETA_API_EXTENSION_NAME: &str = "x-beta-api";
pub const DEFAULT_MAX_LOG_SERIALIZATION_DEPTH: usize = 3;
pub const DEFAULT_MAX_SCHEMA_TRANSFORMATION_DEPTH: usize = 50;

const LOG_DEPTH_RANGE: (usize, usize) = (1, 20);
const TRANSFORMATION_DEPTH_RANGE: (usize, usize) = (1, 100);

/// Options consumed by the whole pipeline: building specifications and
/// evaluating rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckerOptions {
    /// Deleting a path marked `deprecated` is not reported when set.
    pub deprecated_api_deletion_allowed: bool,
    /// Vendor extension marking an operation as beta.
    pub beta_api_extension_name: String,
    /// Path prefixes excluded from every rule.
    pub excluded_paths: BTreeSet<String>,
    /// Fail on schemas without a resolvable type instead of assuming `object`.
    pub strict_validation: bool,
    /// Nesting limit when rendering raw schemas into log lines.
    pub max_log_serialization_depth: usize,
    /// Nesting limit of a transformed schema tree.
    pub max_schema_transformation_depth: usize,
}

impl Default for CheckerOptions {
    fn default() -> Self {
        Self {
            deprecated_api_deletion_allowed: true,
            beta_api_extension_name: DEFAULT_BETA_API_EXTENSION_NAME.to_string(),
            excluded_paths: BTreeSet::new(),
            strict_validation: true,
            max_log_serialization_depth: DEFAULT_MAX_LOG_SERIALIZATION_DEPTH,
            max_schema_transformation_depth: DEFAULT_MAX_SCHEMA_TRANSFORMATION_DEPTH,
        }
    }
}

impl CheckerOptions {
    pub fn with_deprecated_api_deletion_allowed(mut self, allowed: bool) -> Self {
        self.deprecated_api_deletion_allowed = allowed;
        self
    }

    pub fn with_beta_api_extension_name(mut self, name: impl Into<String>) -> Self {
        self.beta_api_extension_name = name.into();
        self
    }

    pub fn with_excluded_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.excluded_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_strict_validation(mut self, strict: bool) -> Self {
        self.strict_validation = strict;
        self
    }

    /// Sets the log rendering depth.
    ///
    /// # Errors
    ///
    /// Returns [`BrakeError::InvalidOption`] unless `depth` is within 1..=20.
    pub fn with_max_log_serialization_depth(mut self, depth: i64) -> Result<Self> {
        self.max_log_serialization_depth =
            check_range("maxLogSerializationDepth", depth, LOG_DEPTH_RANGE)?;
        Ok(self)
    }

    /// Sets the schema transformation depth.
    ///
    /// # Errors
    ///
    /// Returns [`BrakeError::InvalidOption`] unless `depth` is within 1..=100.
    pub fn with_max_schema_transformation_depth(mut self, depth: i64) -> Result<Self> {
        self.max_schema_transformation_depth =
            check_range("maxSchemaTransformationDepth", depth, TRANSFORMATION_DEPTH_RANGE)?;
        Ok(self)
    }

    /// Re-checks ranged fields, for options that did not go through the setters
    /// (deserialized or built with struct literals).
    pub fn validate(&self) -> Result<()> {
        check_range(
            "maxLogSerializationDepth",
            to_i64(self.max_log_serialization_depth),
            LOG_DEPTH_RANGE,
        )?;
        check_range(
            "maxSchemaTransformationDepth",
            to_i64(self.max_schema_transformation_depth),
            TRANSFORMATION_DEPTH_RANGE,
        )?;
        Ok(())
    }
}

fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn check_range(name: &'static str, value: i64, (min, max): (usize, usize)) -> Result<usize> {
    let (min, max) = (to_i64(min), to_i64(max));
    if value < min || value > max {
        return Err(BrakeError::InvalidOption {
            name,
            min,
            max,
            value,
        });
    }
    usize::try_from(value).map_err(|_| BrakeError::InvalidOption {
        name,
        min,
        max,
        value,
    })
}

/// Contents of a configuration file: checker options plus the rule codes the
/// reporting side should drop.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrakeConfig {
    #[serde(flatten)]
    pub checker: CheckerOptions,
    #[serde(default)]
    pub ignored_rule_codes: BTreeSet<String>,
}

impl BrakeConfig {
    /// Load configuration from YAML file
    pub fn from_yaml_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from YAML string. Settings live under `breaking:`;
    /// a file without that section yields the defaults.
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        #[derive(Deserialize)]
        struct ConfigFile {
            breaking: Option<BrakeConfig>,
        }

        let config_file: ConfigFile =
            serde_yaml::from_str(yaml).map_err(|e| BrakeError::Parse(e.to_string()))?;
        let config = config_file.breaking.unwrap_or_default();
        config.checker.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = CheckerOptions::default();
        assert!(options.deprecated_api_deletion_allowed);
        assert!(options.strict_validation);
        assert_eq!(options.beta_api_extension_name, "x-beta-api");
        assert_eq!(options.max_log_serialization_depth, 3);
        assert_eq!(options.max_schema_transformation_depth, 50);
        assert!(options.excluded_paths.is_empty());
        assert!(options.validate().is_ok());
    }

    #[test]
    fn test_log_depth_bounds() {
        assert_eq!(
            CheckerOptions::default()
                .with_max_log_serialization_depth(1)
                .unwrap()
                .max_log_serialization_depth,
            1
        );
        assert_eq!(
            CheckerOptions::default()
                .with_max_log_serialization_depth(20)
                .unwrap()
                .max_log_serialization_depth,
            20
        );
        for invalid in [0, -1, 21] {
            let err = CheckerOptions::default()
                .with_max_log_serialization_depth(invalid)
                .unwrap_err();
            let message = err.to_string();
            assert!(message.contains("must be between 1 and 20"), "{message}");
            assert!(message.contains(&invalid.to_string()), "{message}");
        }
    }

    #[test]
    fn test_transformation_depth_bounds() {
        assert!(
            CheckerOptions::default()
                .with_max_schema_transformation_depth(100)
                .is_ok()
        );
        assert!(
            CheckerOptions::default()
                .with_max_schema_transformation_depth(101)
                .is_err()
        );
        assert!(
            CheckerOptions::default()
                .with_max_schema_transformation_depth(0)
                .is_err()
        );
    }

    #[test]
    fn test_validate_catches_literal_values() {
        let options = CheckerOptions {
            max_log_serialization_depth: 0,
            ..CheckerOptions::default()
        };
        assert!(options.validate().is_err());
    }
}
