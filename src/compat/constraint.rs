//! Constraint comparators.
//!
//! Each comparator looks at one constraint of a parameter and reports a
//! [`ConstraintChange`] only when the new value accepts less than the old
//! one. Loosened and removed constraints are never reported; a constraint
//! that did not exist before is.

use crate::canonical::{ArrayConstraints, NumberConstraints, NumericBounds, ParameterKind, StringConstraints};
use crate::compat::types::{ConstraintChange, ConstraintValue};
use bigdecimal::{BigDecimal, RoundingMode};
use std::cmp::Ordering;

/// All narrowed constraints between two parameter kinds. Parameters of
/// different kinds are not compared.
pub fn compare_parameter(old: &ParameterKind, new: &ParameterKind) -> Vec<ConstraintChange> {
    match (old, new) {
        (ParameterKind::String(old), ParameterKind::String(new)) => compare_string(Some(old), Some(new)),
        (ParameterKind::Number(old), ParameterKind::Number(new)) => compare_number(Some(old), Some(new)),
        (ParameterKind::Array(old), ParameterKind::Array(new)) => compare_array(Some(old), Some(new)),
        _ => Vec::new(),
    }
}

pub fn compare_string(old: Option<&StringConstraints>, new: Option<&StringConstraints>) -> Vec<ConstraintChange> {
    let (Some(old), Some(new)) = (old, new) else {
        return Vec::new();
    };
    [
        max_count("maxLength", old.max_length, new.max_length),
        min_count("minLength", old.min_length, new.min_length),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn compare_array(old: Option<&ArrayConstraints>, new: Option<&ArrayConstraints>) -> Vec<ConstraintChange> {
    let (Some(old), Some(new)) = (old, new) else {
        return Vec::new();
    };
    [
        max_count("maxItems", old.max_items, new.max_items),
        min_count("minItems", old.min_items, new.min_items),
        unique_items(old.unique_items, new.unique_items),
    ]
    .into_iter()
    .flatten()
    .collect()
}

pub fn compare_number(old: Option<&NumberConstraints>, new: Option<&NumberConstraints>) -> Vec<ConstraintChange> {
    let (Some(old), Some(new)) = (old, new) else {
        return Vec::new();
    };
    let integral = old.integral && new.integral;
    [
        maximum(&old.bounds, &new.bounds, integral),
        minimum(&old.bounds, &new.bounds, integral),
    ]
    .into_iter()
    .flatten()
    .collect()
}

fn max_count(attribute: &'static str, old: Option<u64>, new: Option<u64>) -> Option<ConstraintChange> {
    match (old, new) {
        (_, None) => None,
        (None, Some(new)) => Some(ConstraintChange::new(
            attribute,
            ConstraintValue::Absent,
            ConstraintValue::Integer(new),
        )),
        (Some(old), Some(new)) if new < old => Some(ConstraintChange::new(
            attribute,
            ConstraintValue::Integer(old),
            ConstraintValue::Integer(new),
        )),
        _ => None,
    }
}

fn min_count(attribute: &'static str, old: Option<u64>, new: Option<u64>) -> Option<ConstraintChange> {
    match (old, new) {
        (_, None) => None,
        (None, Some(new)) => Some(ConstraintChange::new(
            attribute,
            ConstraintValue::Absent,
            ConstraintValue::Integer(new),
        )),
        (Some(old), Some(new)) if new > old => Some(ConstraintChange::new(
            attribute,
            ConstraintValue::Integer(old),
            ConstraintValue::Integer(new),
        )),
        _ => None,
    }
}

fn unique_items(old: bool, new: bool) -> Option<ConstraintChange> {
    (!old && new).then(|| {
        ConstraintChange::new("uniqueItems", ConstraintValue::Bool(false), ConstraintValue::Bool(true))
    })
}

//==============================================================================
// Numeric bounds
//==============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    Upper,
    Lower,
}

impl Side {
    fn attributes(self) -> (&'static str, &'static str) {
        match self {
            Side::Upper => ("maximum", "exclusiveMaximum"),
            Side::Lower => ("minimum", "exclusiveMinimum"),
        }
    }
}

/// The effective threshold on one side: the tighter of the inclusive and the
/// exclusive bound.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Bound {
    value: BigDecimal,
    exclusive: bool,
}

impl Bound {
    fn effective(side: Side, inclusive: Option<&BigDecimal>, exclusive: Option<&BigDecimal>) -> Option<Self> {
        let inclusive = inclusive.map(|value| Bound {
            value: value.clone(),
            exclusive: false,
        });
        let exclusive = exclusive.map(|value| Bound {
            value: value.clone(),
            exclusive: true,
        });
        match (inclusive, exclusive) {
            (Some(a), Some(b)) => Some(if b.tightness(side, &a, false) != Ordering::Less { b } else { a }),
            (a, b) => a.or(b),
        }
    }

    /// Integer threshold equivalent to this bound: `< n` is `<= n - 1`.
    fn integral_value(&self, side: Side) -> BigDecimal {
        let one = BigDecimal::from(1);
        match (side, self.exclusive) {
            (Side::Upper, false) => self.value.with_scale_round(0, RoundingMode::Floor),
            (Side::Upper, true) => self.value.with_scale_round(0, RoundingMode::Ceiling) - one,
            (Side::Lower, false) => self.value.with_scale_round(0, RoundingMode::Ceiling),
            (Side::Lower, true) => self.value.with_scale_round(0, RoundingMode::Floor) + one,
        }
    }

    /// How much tighter `self` is than `other`: `Greater` when `self`
    /// admits fewer values.
    fn tightness(&self, side: Side, other: &Bound, integral: bool) -> Ordering {
        if integral {
            let ordering = self.integral_value(side).cmp(&other.integral_value(side));
            return match side {
                Side::Upper => ordering.reverse(),
                Side::Lower => ordering,
            };
        }
        let by_value = match side {
            Side::Upper => other.value.cmp(&self.value),
            Side::Lower => self.value.cmp(&other.value),
        };
        by_value.then(self.exclusive.cmp(&other.exclusive))
    }
}

fn maximum(old: &NumericBounds, new: &NumericBounds, integral: bool) -> Option<ConstraintChange> {
    compare_bound(
        Side::Upper,
        Bound::effective(Side::Upper, old.maximum.as_ref(), old.exclusive_maximum.as_ref()),
        Bound::effective(Side::Upper, new.maximum.as_ref(), new.exclusive_maximum.as_ref()),
        integral,
    )
}

fn minimum(old: &NumericBounds, new: &NumericBounds, integral: bool) -> Option<ConstraintChange> {
    compare_bound(
        Side::Lower,
        Bound::effective(Side::Lower, old.minimum.as_ref(), old.exclusive_minimum.as_ref()),
        Bound::effective(Side::Lower, new.minimum.as_ref(), new.exclusive_minimum.as_ref()),
        integral,
    )
}

/// A moved value is reported as `maximum`/`minimum`; a bound that only
/// became exclusive as `exclusiveMaximum`/`exclusiveMinimum`.
fn compare_bound(side: Side, old: Option<Bound>, new: Option<Bound>, integral: bool) -> Option<ConstraintChange> {
    let (value_attribute, exclusive_attribute) = side.attributes();
    match (old, new) {
        (_, None) => None,
        (None, Some(new)) => Some(ConstraintChange::new(
            if new.exclusive { exclusive_attribute } else { value_attribute },
            ConstraintValue::Absent,
            ConstraintValue::Number(new.value),
        )),
        (Some(old), Some(new)) => {
            if new.tightness(side, &old, integral) != Ordering::Greater {
                return None;
            }
            if new.value != old.value {
                Some(ConstraintChange::new(
                    value_attribute,
                    ConstraintValue::Number(old.value),
                    ConstraintValue::Number(new.value),
                ))
            } else {
                Some(ConstraintChange::new(
                    exclusive_attribute,
                    ConstraintValue::Bool(old.exclusive),
                    ConstraintValue::Bool(new.exclusive),
                ))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn decimal(value: &str) -> BigDecimal {
        BigDecimal::from_str(value).unwrap()
    }

    fn upper(value: &str, exclusive: bool) -> NumberConstraints {
        let mut bounds = NumericBounds::default();
        if exclusive {
            bounds.exclusive_maximum = Some(decimal(value));
        } else {
            bounds.maximum = Some(decimal(value));
        }
        NumberConstraints {
            bounds,
            integral: true,
        }
    }

    fn lower(value: &str, exclusive: bool) -> NumberConstraints {
        let mut bounds = NumericBounds::default();
        if exclusive {
            bounds.exclusive_minimum = Some(decimal(value));
        } else {
            bounds.minimum = Some(decimal(value));
        }
        NumberConstraints {
            bounds,
            integral: true,
        }
    }

    fn number_change(attribute: &'static str, old: &str, new: &str) -> ConstraintChange {
        ConstraintChange::new(
            attribute,
            ConstraintValue::Number(decimal(old)),
            ConstraintValue::Number(decimal(new)),
        )
    }

    fn flag_change(attribute: &'static str) -> ConstraintChange {
        ConstraintChange::new(attribute, ConstraintValue::Bool(false), ConstraintValue::Bool(true))
    }

    #[test]
    fn test_maximum() {
        let cases = [
            (upper("1", true), upper("10", true), None),
            (upper("10", true), upper("10", false), None),
            (upper("10", false), upper("10", true), Some(flag_change("exclusiveMaximum"))),
            (upper("11", true), upper("10", false), None),
            (upper("10", false), upper("11", true), None),
            (upper("10", false), upper("1", false), Some(number_change("maximum", "10", "1"))),
            (upper("10.5", false), upper("1.5", false), Some(number_change("maximum", "10.5", "1.5"))),
        ];
        for (old, new, expected) in cases {
            assert_eq!(
                compare_number(Some(&old), Some(&new)),
                expected.into_iter().collect::<Vec<_>>(),
                "{old:?} -> {new:?}"
            );
        }
    }

    #[test]
    fn test_maximum_introduced_and_removed() {
        let none = NumberConstraints {
            bounds: NumericBounds::default(),
            integral: true,
        };
        assert_eq!(
            compare_number(Some(&none), Some(&upper("1", false))),
            vec![ConstraintChange::new(
                "maximum",
                ConstraintValue::Absent,
                ConstraintValue::Number(decimal("1"))
            )]
        );
        assert!(compare_number(Some(&upper("1", false)), Some(&none)).is_empty());
        assert!(compare_number(None, Some(&upper("1", false))).is_empty());
        assert!(compare_number(Some(&upper("1", false)), None).is_empty());
    }

    #[test]
    fn test_minimum() {
        let cases = [
            (lower("10", true), lower("1", true), None),
            (lower("10", true), lower("10", false), None),
            (lower("10", false), lower("10", true), Some(flag_change("exclusiveMinimum"))),
            (lower("9", true), lower("10", false), None),
            (lower("10", false), lower("9", true), None),
            (lower("1", false), lower("10", false), Some(number_change("minimum", "1", "10"))),
        ];
        for (old, new, expected) in cases {
            assert_eq!(
                compare_number(Some(&old), Some(&new)),
                expected.into_iter().collect::<Vec<_>>(),
                "{old:?} -> {new:?}"
            );
        }
    }

    #[test]
    fn test_non_integral_exclusivity_at_same_value() {
        let mut old = upper("10", true);
        old.integral = false;
        let mut new = upper("10", false);
        new.integral = false;
        assert!(compare_number(Some(&old), Some(&new)).is_empty());
        assert_eq!(
            compare_number(Some(&new), Some(&old)),
            vec![flag_change("exclusiveMaximum")]
        );

        let mut eleven = upper("11", true);
        eleven.integral = false;
        assert_eq!(
            compare_number(Some(&eleven), Some(&new)),
            vec![number_change("maximum", "11", "10")]
        );
    }

    #[test]
    fn test_flag_encoded_bound_is_exclusive() {
        let ten = Some(decimal("10"));
        let inclusive = NumberConstraints {
            bounds: NumericBounds::from_flags(ten.clone(), None, false, false),
            integral: true,
        };
        let exclusive = NumberConstraints {
            bounds: NumericBounds::from_flags(ten, None, true, false),
            integral: true,
        };
        assert_eq!(
            compare_number(Some(&inclusive), Some(&exclusive)),
            vec![flag_change("exclusiveMaximum")]
        );
    }

    #[test]
    fn test_string_length() {
        let constraints = |max: Option<u64>, min: Option<u64>| StringConstraints {
            max_length: max,
            min_length: min,
        };
        assert_eq!(
            compare_string(Some(&constraints(Some(2), None)), Some(&constraints(Some(1), None))),
            vec![ConstraintChange::new(
                "maxLength",
                ConstraintValue::Integer(2),
                ConstraintValue::Integer(1)
            )]
        );
        assert_eq!(
            compare_string(Some(&constraints(None, None)), Some(&constraints(Some(1), None))),
            vec![ConstraintChange::new(
                "maxLength",
                ConstraintValue::Absent,
                ConstraintValue::Integer(1)
            )]
        );
        assert!(compare_string(Some(&constraints(Some(1), None)), Some(&constraints(Some(2), None))).is_empty());
        assert!(compare_string(Some(&constraints(Some(1), None)), Some(&constraints(None, None))).is_empty());
        assert_eq!(
            compare_string(Some(&constraints(None, Some(1))), Some(&constraints(None, Some(3)))),
            vec![ConstraintChange::new(
                "minLength",
                ConstraintValue::Integer(1),
                ConstraintValue::Integer(3)
            )]
        );
    }

    #[test]
    fn test_array_items() {
        let constraints = |max: Option<u64>, min: Option<u64>, unique: bool| ArrayConstraints {
            max_items: max,
            min_items: min,
            unique_items: unique,
        };
        assert_eq!(
            compare_array(
                Some(&constraints(None, Some(1), false)),
                Some(&constraints(None, Some(2), false))
            ),
            vec![ConstraintChange::new(
                "minItems",
                ConstraintValue::Integer(1),
                ConstraintValue::Integer(2)
            )]
        );
        assert_eq!(
            compare_array(
                Some(&constraints(None, None, false)),
                Some(&constraints(None, Some(1), false))
            ),
            vec![ConstraintChange::new(
                "minItems",
                ConstraintValue::Absent,
                ConstraintValue::Integer(1)
            )]
        );
        assert!(compare_array(
            Some(&constraints(None, Some(1), false)),
            Some(&constraints(None, Some(0), false))
        )
        .is_empty());
        assert!(compare_array(
            Some(&constraints(None, Some(1), false)),
            Some(&constraints(None, None, false))
        )
        .is_empty());
        assert_eq!(
            compare_array(
                Some(&constraints(None, None, false)),
                Some(&constraints(None, None, true))
            ),
            vec![flag_change("uniqueItems")]
        );
        assert!(compare_array(
            Some(&constraints(None, None, true)),
            Some(&constraints(None, None, false))
        )
        .is_empty());
        assert_eq!(
            compare_array(
                Some(&constraints(Some(5), None, false)),
                Some(&constraints(Some(3), None, false))
            ),
            vec![ConstraintChange::new(
                "maxItems",
                ConstraintValue::Integer(5),
                ConstraintValue::Integer(3)
            )]
        );
    }

    #[test]
    fn test_mismatched_kinds_are_not_compared() {
        let string = ParameterKind::String(StringConstraints {
            max_length: Some(3),
            min_length: None,
        });
        let number = ParameterKind::Number(upper("1", false));
        assert!(compare_parameter(&string, &number).is_empty());
        assert!(compare_parameter(&ParameterKind::Generic, &string).is_empty());
    }
}
