use bigdecimal::BigDecimal;
use serde::{Serialize, Serializer};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::sync::Arc;

//==============================================================================
// Operations
//==============================================================================

/// The eight operation slots of an OpenAPI path item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
    Trace,
}

impl HttpMethod {
    pub const ALL: [HttpMethod; 8] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Head,
        HttpMethod::Options,
        HttpMethod::Trace,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Head => "HEAD",
            HttpMethod::Options => "OPTIONS",
            HttpMethod::Trace => "TRACE",
        }
    }

    /// Key of the operation inside a path item.
    pub fn key(&self) -> &'static str {
        match self {
            HttpMethod::Get => "get",
            HttpMethod::Post => "post",
            HttpMethod::Put => "put",
            HttpMethod::Patch => "patch",
            HttpMethod::Delete => "delete",
            HttpMethod::Head => "head",
            HttpMethod::Options => "options",
            HttpMethod::Trace => "trace",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for HttpMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HttpMethod::ALL
            .into_iter()
            .find(|method| method.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unknown HTTP method: {s}"))
    }
}

//==============================================================================
// Specification
//==============================================================================

/// All operations of one document, unique by (path, method).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Specification {
    paths: HashMap<(String, HttpMethod), Path>,
}

impl Specification {
    pub fn new(paths: impl IntoIterator<Item = Path>) -> Self {
        Self {
            paths: paths
                .into_iter()
                .map(|path| ((path.path.clone(), path.method), path))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn get(&self, path: &str, method: HttpMethod) -> Option<&Path> {
        self.paths.get(&(path.to_string(), method))
    }

    /// The operation of this specification matching `other`'s path and method.
    pub fn get_path(&self, other: &Path) -> Option<&Path> {
        self.get(&other.path, other.method)
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.values()
    }

    /// Operations ordered by path, then method.
    pub fn sorted_paths(&self) -> Vec<&Path> {
        let mut paths: Vec<&Path> = self.paths.values().collect();
        paths.sort_by(|a, b| (&a.path, a.method).cmp(&(&b.path, b.method)));
        paths
    }
}

/// One operation: a path string combined with an HTTP method.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub path: String,
    pub method: HttpMethod,
    pub request: Option<Request>,
    pub parameters: Vec<RequestParameter>,
    pub responses: Vec<Response>,
    pub deprecated: bool,
    pub beta_api: bool,
}

impl Path {
    pub fn new(path: impl Into<String>, method: HttpMethod) -> Self {
        Self {
            path: path.into(),
            method,
            request: None,
            parameters: Vec::new(),
            responses: Vec::new(),
            deprecated: false,
            beta_api: false,
        }
    }

    pub fn parameter(&self, name: &str) -> Option<&RequestParameter> {
        self.parameters.iter().find(|p| p.name == name)
    }

    pub fn response(&self, code: &str) -> Option<&Response> {
        self.responses.iter().find(|r| r.code == code)
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.path)
    }
}

//==============================================================================
// Requests and responses
//==============================================================================

/// A request body, keyed by media type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Request {
    pub media: BTreeMap<String, Arc<Schema>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub code: String,
    pub media: BTreeMap<String, Arc<Schema>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Query,
    Header,
    Path,
    Cookie,
}

impl ParameterLocation {
    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "query" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            "path" => Some(ParameterLocation::Path),
            "cookie" => Some(ParameterLocation::Cookie),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ParameterLocation::Query => "query",
            ParameterLocation::Header => "header",
            ParameterLocation::Path => "path",
            ParameterLocation::Cookie => "cookie",
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RequestParameter {
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// Declared type of the parameter's schema, when it has one.
    pub type_name: Option<String>,
    pub schema: Option<Arc<Schema>>,
    pub kind: ParameterKind,
}

/// Constraint-bearing flavour of a parameter, chosen from its declared type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterKind {
    Generic,
    String(StringConstraints),
    Number(NumberConstraints),
    Array(ArrayConstraints),
}

impl ParameterKind {
    /// Picks the variant for a parameter from its (transformed) schema.
    pub fn of(schema: Option<&Schema>) -> Self {
        let Some(schema) = schema else {
            return ParameterKind::Generic;
        };
        let constraints = &schema.constraints;
        match schema.type_name.as_str() {
            "string" => ParameterKind::String(StringConstraints {
                max_length: constraints.max_length,
                min_length: constraints.min_length,
            }),
            "integer" | "number" => ParameterKind::Number(NumberConstraints {
                bounds: constraints.bounds.clone(),
                integral: schema.type_name == "integer",
            }),
            "array" => ParameterKind::Array(ArrayConstraints {
                max_items: constraints.max_items,
                min_items: constraints.min_items,
                unique_items: constraints.unique_items,
            }),
            _ => ParameterKind::Generic,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StringConstraints {
    pub max_length: Option<u64>,
    pub min_length: Option<u64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ArrayConstraints {
    pub max_items: Option<u64>,
    pub min_items: Option<u64>,
    pub unique_items: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct NumberConstraints {
    pub bounds: NumericBounds,
    /// Values are whole numbers, so `< n` and `<= n - 1` are the same bound.
    pub integral: bool,
}

/// Numeric bounds with exclusive thresholds already normalized: an exclusive
/// bound is the excluded value itself, whatever encoding the document used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize)]
pub struct NumericBounds {
    #[serde(serialize_with = "serialize_decimal")]
    pub maximum: Option<BigDecimal>,
    #[serde(serialize_with = "serialize_decimal")]
    pub minimum: Option<BigDecimal>,
    #[serde(serialize_with = "serialize_decimal")]
    pub exclusive_maximum: Option<BigDecimal>,
    #[serde(serialize_with = "serialize_decimal")]
    pub exclusive_minimum: Option<BigDecimal>,
}

impl NumericBounds {
    /// Builds bounds from the boolean-modifier encoding: a set flag makes the
    /// corresponding bound exclusive.
    pub fn from_flags(
        maximum: Option<BigDecimal>,
        minimum: Option<BigDecimal>,
        exclusive_maximum: bool,
        exclusive_minimum: bool,
    ) -> Self {
        Self {
            exclusive_maximum: maximum.clone().filter(|_| exclusive_maximum),
            exclusive_minimum: minimum.clone().filter(|_| exclusive_minimum),
            maximum,
            minimum,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.maximum.is_none()
            && self.minimum.is_none()
            && self.exclusive_maximum.is_none()
            && self.exclusive_minimum.is_none()
    }
}

fn serialize_decimal<S: Serializer>(
    value: &Option<BigDecimal>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match value {
        Some(value) => serializer.serialize_str(&format_decimal(value)),
        None => serializer.serialize_none(),
    }
}

/// Renders a decimal without trailing zeros or exponent notation.
pub fn format_decimal(value: &BigDecimal) -> String {
    if value.is_integer() {
        value.with_scale(0).to_string()
    } else {
        value.normalized().to_string()
    }
}

//==============================================================================
// Schemas
//==============================================================================

/// Type of a schema node as seen by the type-changed rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    Generic,
    Object,
    Boolean,
    Number,
    Float,
    Double,
    Integer,
    Int32,
    Int64,
    String,
    Array,
}

impl AttributeType {
    /// Type plus format, falling back to the type alone when the format is
    /// not one that changes the wire representation.
    pub fn resolve(type_name: &str, format: Option<&str>) -> Self {
        match (type_name, format) {
            ("number", Some("float")) => AttributeType::Float,
            ("number", Some("double")) => AttributeType::Double,
            ("integer", Some("int32")) => AttributeType::Int32,
            ("integer", Some("int64")) => AttributeType::Int64,
            ("number", _) => AttributeType::Number,
            ("integer", _) => AttributeType::Integer,
            ("string", _) => AttributeType::String,
            ("array", _) => AttributeType::Array,
            ("boolean", _) => AttributeType::Boolean,
            ("object", _) => AttributeType::Object,
            _ => AttributeType::Generic,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AttributeType::Generic => "generic",
            AttributeType::Object => "object",
            AttributeType::Boolean => "boolean",
            AttributeType::Number => "number",
            AttributeType::Float => "float",
            AttributeType::Double => "double",
            AttributeType::Integer => "integer",
            AttributeType::Int32 => "int32",
            AttributeType::Int64 => "int64",
            AttributeType::String => "string",
            AttributeType::Array => "array",
        }
    }
}

impl fmt::Display for AttributeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Constraint fields a schema may carry, whatever its type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaConstraints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_length: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_items: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_items: Option<u64>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub unique_items: bool,
    #[serde(skip_serializing_if = "NumericBounds::is_empty")]
    pub bounds: NumericBounds,
}

/// A normalized schema. Always finite: cycles in the source are cut during
/// transformation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Schema {
    pub type_name: String,
    pub format: Option<String>,
    pub nullable: bool,
    pub enum_values: BTreeSet<String>,
    pub attributes: Vec<SchemaAttribute>,
    pub items: Option<Arc<Schema>>,
    pub constraints: SchemaConstraints,
}

/// A named property of an object schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaAttribute {
    pub name: String,
    /// Absent when the property's reference is already being resolved
    /// further up. Properties cut by a cycle or the depth limit are left out
    /// of the parent entirely.
    pub schema: Option<Arc<Schema>>,
    pub required: bool,
    pub deprecated: bool,
}

/// Label used for the schema itself in attribute paths.
pub const ROOT_ATTRIBUTE: &str = "<root>";

impl Schema {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ..Default::default()
        }
    }

    pub fn attribute_type(&self) -> AttributeType {
        AttributeType::resolve(&self.type_name, self.format.as_deref())
    }

    pub fn attribute(&self, name: &str) -> Option<&SchemaAttribute> {
        self.attributes.iter().find(|a| a.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_attribute_type_resolution() {
        assert_eq!(AttributeType::resolve("integer", Some("int64")), AttributeType::Int64);
        assert_eq!(AttributeType::resolve("integer", Some("custom")), AttributeType::Integer);
        assert_eq!(AttributeType::resolve("string", Some("date-time")), AttributeType::String);
        assert_eq!(AttributeType::resolve("whatever", None), AttributeType::Generic);
    }

    #[test]
    fn test_specification_lookup() {
        let spec = Specification::new(vec![
            Path::new("/pets", HttpMethod::Get),
            Path::new("/pets", HttpMethod::Post),
        ]);
        assert_eq!(spec.len(), 2);
        assert!(spec.get("/pets", HttpMethod::Post).is_some());
        assert!(spec.get("/pets", HttpMethod::Delete).is_none());
        let sorted: Vec<_> = spec.sorted_paths().iter().map(|p| p.method).collect();
        assert_eq!(sorted, vec![HttpMethod::Get, HttpMethod::Post]);
    }

    #[test]
    fn test_bounds_from_flags() {
        let ten = BigDecimal::from(10);
        let bounds = NumericBounds::from_flags(Some(ten.clone()), None, true, true);
        assert_eq!(bounds.exclusive_maximum, Some(ten));
        assert_eq!(bounds.exclusive_minimum, None);
    }

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(&BigDecimal::from(10)), "10");
        assert_eq!(format_decimal(&BigDecimal::from_str("10.50").unwrap()), "10.5");
        assert_eq!(format_decimal(&BigDecimal::from_str("1E+2").unwrap()), "100");
    }

    #[test]
    fn test_http_method_parsing() {
        assert_eq!(HttpMethod::from_str("get").unwrap(), HttpMethod::Get);
        assert_eq!(HttpMethod::Trace.key(), "trace");
        assert!(HttpMethod::from_str("connect").is_err());
    }
}
