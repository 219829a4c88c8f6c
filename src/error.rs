//! Error taxonomy for loading, transforming and checking OpenAPI documents.

use thiserror::Error;

/// Errors raised by the comparison pipeline.
///
/// Cyclic schemas and depth overflows are not errors: the transformer
/// truncates them. Everything here aborts the whole check.
#[derive(Debug, Error)]
pub enum BrakeError {
    /// One side of the comparison was not provided.
    #[error("{0} must be provided")]
    InvalidInput(&'static str),

    /// The document version is missing, malformed or not 3.0.x/3.1.x.
    #[error("{0}")]
    UnsupportedVersion(String),

    /// Strict validation found a schema without a resolvable type.
    #[error("Schema does not have any type at {location}")]
    MissingType { location: String },

    /// A `$ref` points at something the document does not define.
    #[error("Reference not found for {reference} (referenced from {location})")]
    UnresolvedReference { reference: String, location: String },

    /// A checker option is outside its valid range.
    #[error("{name} must be between {min} and {max}, got: {value}")]
    InvalidOption {
        name: &'static str,
        min: i64,
        max: i64,
        value: i64,
    },

    /// An entry of the excluded paths option is blank.
    #[error("excluded_paths must not contain blank entries")]
    BlankExcludedPath,

    /// The document text could not be parsed as JSON or YAML.
    #[error("API cannot be parsed: {0}")]
    Parse(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BrakeError>;
