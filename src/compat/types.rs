//! Core types for breaking change detection

use crate::canonical::{AttributeType, HttpMethod, ParameterLocation, format_decimal};
use crate::compat::categories::BreakingCategory;
use crate::compat::skipper::PathSkipper;
use crate::options::CheckerOptions;
use bigdecimal::BigDecimal;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Stable identifier of a rule, such as `R002`.
pub type RuleCode = &'static str;

/// A value on either side of a [`ConstraintChange`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConstraintValue {
    /// The constraint was not declared.
    Absent,
    Integer(u64),
    Number(BigDecimal),
    Bool(bool),
}

impl fmt::Display for ConstraintValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintValue::Absent => f.write_str("null"),
            ConstraintValue::Integer(value) => write!(f, "{value}"),
            ConstraintValue::Number(value) => f.write_str(&format_decimal(value)),
            ConstraintValue::Bool(value) => write!(f, "{value}"),
        }
    }
}

impl Serialize for ConstraintValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            ConstraintValue::Absent => serializer.serialize_none(),
            ConstraintValue::Integer(value) => serializer.serialize_u64(*value),
            ConstraintValue::Bool(value) => serializer.serialize_bool(*value),
            ConstraintValue::Number(value) => {
                let text = format_decimal(value);
                match serde_json::Number::from_str(&text) {
                    Ok(number) => number.serialize(serializer),
                    Err(_) => serializer.serialize_str(&text),
                }
            }
        }
    }
}

/// A narrowed constraint: which attribute, and its old and new values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct ConstraintChange {
    pub attribute: &'static str,
    pub old_value: ConstraintValue,
    pub new_value: ConstraintValue,
}

impl ConstraintChange {
    pub fn new(attribute: &'static str, old_value: ConstraintValue, new_value: ConstraintValue) -> Self {
        Self {
            attribute,
            old_value,
            new_value,
        }
    }
}

/// A breaking change detected between two specifications. Variants are
/// declared in name order, so the derived ordering sorts by variant name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(tag = "type")]
pub enum BreakingChange {
    PathDeleted {
        path: String,
        method: HttpMethod,
    },
    RequestMediaTypeDeleted {
        path: String,
        method: HttpMethod,
        media_type: String,
    },
    RequestParameterAdded {
        path: String,
        method: HttpMethod,
        name: String,
    },
    RequestParameterConstraintChanged {
        path: String,
        method: HttpMethod,
        name: String,
        change: ConstraintChange,
    },
    RequestParameterDeleted {
        path: String,
        method: HttpMethod,
        name: String,
    },
    RequestParameterEnumValueDeleted {
        path: String,
        method: HttpMethod,
        name: String,
        value: String,
    },
    RequestParameterInTypeChanged {
        path: String,
        method: HttpMethod,
        name: String,
        old_location: ParameterLocation,
        new_location: ParameterLocation,
    },
    RequestParameterRequired {
        path: String,
        method: HttpMethod,
        name: String,
    },
    RequestParameterTypeChanged {
        path: String,
        method: HttpMethod,
        name: String,
        old_type: String,
        new_type: String,
    },
    RequestTypeAttributeRemoved {
        path: String,
        method: HttpMethod,
        attribute: String,
    },
    RequestTypeChanged {
        path: String,
        method: HttpMethod,
        attribute: String,
        old_type: AttributeType,
        new_type: AttributeType,
    },
    RequestTypeEnumValueDeleted {
        path: String,
        method: HttpMethod,
        attribute: String,
        value: String,
    },
    ResponseDeleted {
        path: String,
        method: HttpMethod,
        code: String,
    },
    ResponseMediaTypeDeleted {
        path: String,
        method: HttpMethod,
        code: String,
        media_type: String,
    },
    ResponseTypeAttributeRemoved {
        path: String,
        method: HttpMethod,
        code: String,
        attribute: String,
    },
    ResponseTypeChanged {
        path: String,
        method: HttpMethod,
        code: String,
        attribute: String,
        old_type: AttributeType,
        new_type: AttributeType,
    },
    ResponseTypeEnumValueDeleted {
        path: String,
        method: HttpMethod,
        code: String,
        attribute: String,
        value: String,
    },
    StandardApiToBetaApi {
        path: String,
        method: HttpMethod,
    },
}

impl BreakingChange {
    pub fn rule_code(&self) -> RuleCode {
        match self {
            BreakingChange::StandardApiToBetaApi { .. } => "R001",
            BreakingChange::PathDeleted { .. } => "R002",
            BreakingChange::RequestMediaTypeDeleted { .. } => "R003",
            BreakingChange::RequestParameterDeleted { .. } => "R004",
            BreakingChange::RequestParameterEnumValueDeleted { .. } => "R005",
            BreakingChange::RequestParameterInTypeChanged { .. } => "R006",
            BreakingChange::RequestParameterRequired { .. } => "R007",
            BreakingChange::RequestParameterTypeChanged { .. } => "R008",
            BreakingChange::RequestTypeAttributeRemoved { .. } => "R009",
            BreakingChange::RequestTypeChanged { .. } => "R010",
            BreakingChange::RequestTypeEnumValueDeleted { .. } => "R011",
            BreakingChange::ResponseDeleted { .. } => "R012",
            BreakingChange::ResponseMediaTypeDeleted { .. } => "R013",
            BreakingChange::ResponseTypeAttributeRemoved { .. } => "R014",
            BreakingChange::ResponseTypeChanged { .. } => "R015",
            BreakingChange::ResponseTypeEnumValueDeleted { .. } => "R016",
            BreakingChange::RequestParameterConstraintChanged { .. } => "R017",
            BreakingChange::RequestParameterAdded { .. } => "R018",
        }
    }

    pub fn variant_name(&self) -> &'static str {
        match self {
            BreakingChange::PathDeleted { .. } => "PathDeleted",
            BreakingChange::RequestMediaTypeDeleted { .. } => "RequestMediaTypeDeleted",
            BreakingChange::RequestParameterAdded { .. } => "RequestParameterAdded",
            BreakingChange::RequestParameterConstraintChanged { .. } => {
                "RequestParameterConstraintChanged"
            }
            BreakingChange::RequestParameterDeleted { .. } => "RequestParameterDeleted",
            BreakingChange::RequestParameterEnumValueDeleted { .. } => {
                "RequestParameterEnumValueDeleted"
            }
            BreakingChange::RequestParameterInTypeChanged { .. } => "RequestParameterInTypeChanged",
            BreakingChange::RequestParameterRequired { .. } => "RequestParameterRequired",
            BreakingChange::RequestParameterTypeChanged { .. } => "RequestParameterTypeChanged",
            BreakingChange::RequestTypeAttributeRemoved { .. } => "RequestTypeAttributeRemoved",
            BreakingChange::RequestTypeChanged { .. } => "RequestTypeChanged",
            BreakingChange::RequestTypeEnumValueDeleted { .. } => "RequestTypeEnumValueDeleted",
            BreakingChange::ResponseDeleted { .. } => "ResponseDeleted",
            BreakingChange::ResponseMediaTypeDeleted { .. } => "ResponseMediaTypeDeleted",
            BreakingChange::ResponseTypeAttributeRemoved { .. } => "ResponseTypeAttributeRemoved",
            BreakingChange::ResponseTypeChanged { .. } => "ResponseTypeChanged",
            BreakingChange::ResponseTypeEnumValueDeleted { .. } => "ResponseTypeEnumValueDeleted",
            BreakingChange::StandardApiToBetaApi { .. } => "StandardApiToBetaApi",
        }
    }

    pub fn category(&self) -> BreakingCategory {
        match self {
            BreakingChange::PathDeleted { .. } | BreakingChange::StandardApiToBetaApi { .. } => {
                BreakingCategory::Path
            }
            BreakingChange::ResponseDeleted { .. }
            | BreakingChange::ResponseMediaTypeDeleted { .. }
            | BreakingChange::ResponseTypeAttributeRemoved { .. }
            | BreakingChange::ResponseTypeChanged { .. }
            | BreakingChange::ResponseTypeEnumValueDeleted { .. } => BreakingCategory::Response,
            _ => BreakingCategory::Request,
        }
    }

    /// The operation's path string.
    pub fn path(&self) -> &str {
        match self {
            BreakingChange::PathDeleted { path, .. }
            | BreakingChange::RequestMediaTypeDeleted { path, .. }
            | BreakingChange::RequestParameterAdded { path, .. }
            | BreakingChange::RequestParameterConstraintChanged { path, .. }
            | BreakingChange::RequestParameterDeleted { path, .. }
            | BreakingChange::RequestParameterEnumValueDeleted { path, .. }
            | BreakingChange::RequestParameterInTypeChanged { path, .. }
            | BreakingChange::RequestParameterRequired { path, .. }
            | BreakingChange::RequestParameterTypeChanged { path, .. }
            | BreakingChange::RequestTypeAttributeRemoved { path, .. }
            | BreakingChange::RequestTypeChanged { path, .. }
            | BreakingChange::RequestTypeEnumValueDeleted { path, .. }
            | BreakingChange::ResponseDeleted { path, .. }
            | BreakingChange::ResponseMediaTypeDeleted { path, .. }
            | BreakingChange::ResponseTypeAttributeRemoved { path, .. }
            | BreakingChange::ResponseTypeChanged { path, .. }
            | BreakingChange::ResponseTypeEnumValueDeleted { path, .. }
            | BreakingChange::StandardApiToBetaApi { path, .. } => path,
        }
    }

    pub fn method(&self) -> HttpMethod {
        match self {
            BreakingChange::PathDeleted { method, .. }
            | BreakingChange::RequestMediaTypeDeleted { method, .. }
            | BreakingChange::RequestParameterAdded { method, .. }
            | BreakingChange::RequestParameterConstraintChanged { method, .. }
            | BreakingChange::RequestParameterDeleted { method, .. }
            | BreakingChange::RequestParameterEnumValueDeleted { method, .. }
            | BreakingChange::RequestParameterInTypeChanged { method, .. }
            | BreakingChange::RequestParameterRequired { method, .. }
            | BreakingChange::RequestParameterTypeChanged { method, .. }
            | BreakingChange::RequestTypeAttributeRemoved { method, .. }
            | BreakingChange::RequestTypeChanged { method, .. }
            | BreakingChange::RequestTypeEnumValueDeleted { method, .. }
            | BreakingChange::ResponseDeleted { method, .. }
            | BreakingChange::ResponseMediaTypeDeleted { method, .. }
            | BreakingChange::ResponseTypeAttributeRemoved { method, .. }
            | BreakingChange::ResponseTypeChanged { method, .. }
            | BreakingChange::ResponseTypeEnumValueDeleted { method, .. }
            | BreakingChange::StandardApiToBetaApi { method, .. } => *method,
        }
    }

    /// Human-readable description of the change.
    pub fn message(&self) -> String {
        match self {
            BreakingChange::StandardApiToBetaApi { path, method } => {
                format!("Path {path} {method} has been as beta however it was already present.")
            }
            BreakingChange::PathDeleted { path, method } => {
                format!("Path {path} {method} has been deleted")
            }
            BreakingChange::RequestMediaTypeDeleted {
                path,
                method,
                media_type,
            } => format!("{media_type} media type request was removed from {method} {path}"),
            BreakingChange::RequestParameterDeleted { path, method, name } => {
                format!("{name} parameter has been deleted in {method} {path}")
            }
            BreakingChange::RequestParameterEnumValueDeleted {
                path,
                method,
                name,
                value,
            } => format!(
                "Enum value {value} has been deleted for parameter {name} in {method} {path}"
            ),
            BreakingChange::RequestParameterInTypeChanged {
                path,
                method,
                name,
                old_location,
                new_location,
            } => format!(
                "{name} parameter location was changed in {method} {path} from {old_location} to {new_location}"
            ),
            BreakingChange::RequestParameterRequired { path, method, name } => {
                format!("{name} parameter became required in {method} {path}")
            }
            BreakingChange::RequestParameterTypeChanged {
                path,
                method,
                name,
                old_type,
                new_type,
            } => format!(
                "{name} parameter type was changed in {method} {path} from {old_type} to {new_type}"
            ),
            BreakingChange::RequestTypeAttributeRemoved {
                path,
                method,
                attribute,
            } => format!("{attribute} attribute has been removed from the request of {method} {path}"),
            BreakingChange::RequestTypeChanged {
                path,
                method,
                attribute,
                old_type,
                new_type,
            } => format!("{attribute} type was changed in {method} {path} from {old_type} to {new_type}"),
            BreakingChange::RequestTypeEnumValueDeleted {
                path,
                method,
                attribute,
                value,
            } => format!(
                "Enum value {value} has been deleted for request attribute {attribute} in {method} {path}"
            ),
            BreakingChange::ResponseDeleted { path, method, code } => {
                format!("Response {code} has been removed from {method} {path}")
            }
            BreakingChange::ResponseMediaTypeDeleted {
                path,
                method,
                code,
                media_type,
            } => format!("{media_type} media type was removed from response {code} of {method} {path}"),
            BreakingChange::ResponseTypeAttributeRemoved {
                path,
                method,
                code,
                attribute,
            } => format!("{attribute} attribute has been removed from response {code} of {method} {path}"),
            BreakingChange::ResponseTypeChanged {
                path,
                method,
                code,
                attribute,
                old_type,
                new_type,
            } => format!(
                "Response type was changed for response {code} in {method} {path} at attribute {attribute} from {old_type} to {new_type}"
            ),
            BreakingChange::ResponseTypeEnumValueDeleted {
                path, method, value, ..
            } => format!("Enum value {value} has been deleted in {method} {path}"),
            BreakingChange::RequestParameterConstraintChanged {
                path,
                method,
                name,
                change,
            } => format!(
                "{} constraint of parameter {name} was narrowed in {method} {path} from {} to {}",
                change.attribute, change.old_value, change.new_value
            ),
            BreakingChange::RequestParameterAdded { path, method, name } => {
                format!("{name} required parameter has been added to {method} {path}")
            }
        }
    }

    /// Serializable view carrying the rule code and the rendered message
    /// alongside the change itself.
    pub fn report(&self) -> ChangeReport<'_> {
        ChangeReport {
            rule_code: self.rule_code(),
            category: self.category().id(),
            message: self.message(),
            change: self,
        }
    }
}

impl fmt::Display for BreakingChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.rule_code(), self.message())
    }
}

#[derive(Debug, Serialize)]
pub struct ChangeReport<'a> {
    pub rule_code: RuleCode,
    pub category: &'static str,
    pub message: String,
    #[serde(flatten)]
    pub change: &'a BreakingChange,
}

/// Context for rule execution
#[derive(Debug, Clone)]
pub struct RuleContext {
    pub options: CheckerOptions,
    pub skipper: PathSkipper,
}

impl RuleContext {
    pub fn new(options: &CheckerOptions) -> crate::error::Result<Self> {
        Ok(Self {
            skipper: PathSkipper::new(&options.excluded_paths)?,
            options: options.clone(),
        })
    }
}

/// Result of a single rule check
#[derive(Debug, Clone, Default)]
pub struct RuleResult {
    /// Breaking changes found by this rule, without duplicates
    pub changes: BTreeSet<BreakingChange>,
}

impl RuleResult {
    pub fn with_changes(changes: BTreeSet<BreakingChange>) -> Self {
        Self { changes }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages() {
        let deleted = BreakingChange::PathDeleted {
            path: "/pet/findByStatus".to_string(),
            method: HttpMethod::Get,
        };
        assert_eq!(deleted.rule_code(), "R002");
        assert_eq!(deleted.message(), "Path /pet/findByStatus GET has been deleted");

        let parameter = BreakingChange::RequestParameterDeleted {
            path: "/pet".to_string(),
            method: HttpMethod::Post,
            name: "limit".to_string(),
        };
        assert_eq!(parameter.message(), "limit parameter has been deleted in POST /pet");
        assert_eq!(parameter.category(), BreakingCategory::Request);
    }

    #[test]
    fn test_ordering_follows_variant_name() {
        let mut changes = vec![
            BreakingChange::StandardApiToBetaApi {
                path: "/a".to_string(),
                method: HttpMethod::Get,
            },
            BreakingChange::ResponseDeleted {
                path: "/a".to_string(),
                method: HttpMethod::Get,
                code: "200".to_string(),
            },
            BreakingChange::PathDeleted {
                path: "/b".to_string(),
                method: HttpMethod::Get,
            },
        ];
        changes.sort();
        let names: Vec<_> = changes.iter().map(BreakingChange::variant_name).collect();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
    }

    #[test]
    fn test_constraint_value_rendering() {
        assert_eq!(ConstraintValue::Absent.to_string(), "null");
        assert_eq!(
            ConstraintValue::Number(BigDecimal::from_str("10.50").unwrap()).to_string(),
            "10.5"
        );
        assert_eq!(
            serde_json::to_value(ConstraintValue::Number(BigDecimal::from(5))).unwrap(),
            serde_json::json!(5)
        );
        assert_eq!(serde_json::to_value(ConstraintValue::Absent).unwrap(), serde_json::Value::Null);
    }

    #[test]
    fn test_report_flattens_change() {
        let change = BreakingChange::ResponseDeleted {
            path: "/a".to_string(),
            method: HttpMethod::Get,
            code: "404".to_string(),
        };
        let value = serde_json::to_value(change.report()).unwrap();
        assert_eq!(value["rule_code"], "R012");
        assert_eq!(value["type"], "ResponseDeleted");
        assert_eq!(value["code"], "404");
        assert_eq!(value["method"], "GET");
        assert_eq!(value["category"], "RESPONSE");
    }
}
