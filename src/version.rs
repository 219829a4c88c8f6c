//! Detection of the OpenAPI dialect a document is written in.

use crate::error::{BrakeError, Result};
use serde_json::Value;
use std::fmt;

/// Extension the loader records on every document it accepts, holding the
/// detected dialect (and `V2_CONVERTED` for upgraded Swagger 2.0 input).
pub const ORIGINAL_VERSION_EXTENSION: &str = "x-oas-brake-original-version";

/// The dialects the transformation understands.
///
/// 3.0 documents encode nullability with a `nullable` flag and exclusive
/// bounds as boolean modifiers; 3.1 documents use type arrays with a `null`
/// member and numeric `exclusiveMaximum`/`exclusiveMinimum`. Converted
/// Swagger 2.0 documents follow the 3.0 encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OpenApiVersion {
    V30,
    V31,
    V2Converted,
}

impl OpenApiVersion {
    /// Value stored in [`ORIGINAL_VERSION_EXTENSION`].
    pub fn marker(&self) -> &'static str {
        match self {
            OpenApiVersion::V30 => "V3_0_X",
            OpenApiVersion::V31 => "V3_1_X",
            OpenApiVersion::V2Converted => "V2_CONVERTED",
        }
    }

    pub fn from_marker(marker: &str) -> Option<Self> {
        match marker {
            "V3_0_X" => Some(OpenApiVersion::V30),
            "V3_1_X" => Some(OpenApiVersion::V31),
            "V2_CONVERTED" => Some(OpenApiVersion::V2Converted),
            _ => None,
        }
    }

    /// Nullability and union types are expressed through `type` arrays.
    pub fn uses_type_arrays(&self) -> bool {
        matches!(self, OpenApiVersion::V31)
    }

    /// `exclusiveMaximum`/`exclusiveMinimum` carry the bound itself rather
    /// than a flag modifying `maximum`/`minimum`.
    pub fn uses_numeric_exclusive_bounds(&self) -> bool {
        matches!(self, OpenApiVersion::V31)
    }

    /// Resolves the dialect of a raw document: the loader's marker first
    /// (unknown marker values are ignored), then the `openapi` field.
    pub fn resolve(document: &Value) -> Result<Self> {
        if let Some(marker) = document
            .get(ORIGINAL_VERSION_EXTENSION)
            .and_then(Value::as_str)
        {
            if let Some(version) = Self::from_marker(marker) {
                return Ok(version);
            }
        }
        let declared = document.get("openapi").and_then(Value::as_str);
        Self::parse(declared.unwrap_or_default())
    }

    /// Parses a declared version string, `major.minor.patch` with an optional
    /// suffix (`3.1.0-rc1`).
    pub fn parse(version: &str) -> Result<Self> {
        let trimmed = version.trim();
        if trimmed.is_empty() {
            return Err(BrakeError::UnsupportedVersion(
                "OpenAPI version string cannot be null or empty".to_string(),
            ));
        }

        let (major, minor) = split_version(trimmed).ok_or_else(|| {
            BrakeError::UnsupportedVersion(format!(
                "Malformed OpenAPI version string: {version}"
            ))
        })?;

        match (major, minor) {
            (3, 0) => Ok(OpenApiVersion::V30),
            (3, 1) => Ok(OpenApiVersion::V31),
            _ => Err(BrakeError::UnsupportedVersion(format!(
                "Unsupported OpenAPI version: {version}. Only versions 3.0.x and 3.1.x are supported."
            ))),
        }
    }
}

/// Returns major and minor when `version` starts with three dot-separated
/// numeric components.
fn split_version(version: &str) -> Option<(u64, u64)> {
    let mut parts = version.splitn(3, '.');
    let major = parse_component(parts.next()?)?;
    let minor = parse_component(parts.next()?)?;
    let rest = parts.next()?;
    let patch_len = rest.chars().take_while(char::is_ascii_digit).count();
    if patch_len == 0 {
        return None;
    }
    Some((major, minor))
}

fn parse_component(part: &str) -> Option<u64> {
    if part.is_empty() || !part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    part.parse().ok()
}

impl fmt::Display for OpenApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpenApiVersion::V30 => write!(f, "OpenAPI 3.0.x"),
            OpenApiVersion::V31 => write!(f, "OpenAPI 3.1.x"),
            OpenApiVersion::V2Converted => write!(f, "Swagger 2.0 (converted to OpenAPI 3.0.x)"),
        }
    }
}
