//! Static rule table

use crate::canonical::Specification;
use crate::compat::types::{RuleCode, RuleContext, RuleResult};
use crate::compat::{path_rules, request_rules, response_rules};
use std::collections::HashSet;

pub type RuleFn = fn(&Specification, &Specification, &RuleContext) -> RuleResult;

/// One registered rule: its code and check. Variant names and categories
/// come from the [`BreakingChange`](crate::compat::BreakingChange) values a
/// rule produces.
pub type RuleEntry = (RuleCode, RuleFn);

pub fn get_rule_mapping() -> &'static [RuleEntry] {
    RULES
}

/// Every rule, ordered by code.
const RULES: &[RuleEntry] = &[
    // PATH rules
    ("R001", path_rules::check_standard_api_to_beta_api),
    ("R002", path_rules::check_path_deleted),
    // REQUEST rules
    ("R003", request_rules::check_request_media_type_deleted),
    ("R004", request_rules::check_request_parameter_deleted),
    ("R005", request_rules::check_request_parameter_enum_value_deleted),
    ("R006", request_rules::check_request_parameter_in_type_changed),
    ("R007", request_rules::check_request_parameter_required),
    ("R008", request_rules::check_request_parameter_type_changed),
    ("R009", request_rules::check_request_type_attribute_removed),
    ("R010", request_rules::check_request_type_changed),
    ("R011", request_rules::check_request_type_enum_value_deleted),
    // RESPONSE rules
    ("R012", response_rules::check_response_deleted),
    ("R013", response_rules::check_response_media_type_deleted),
    ("R014", response_rules::check_response_type_attribute_removed),
    ("R015", response_rules::check_response_type_changed),
    ("R016", response_rules::check_response_type_enum_value_deleted),
    // Parameter constraints and additions
    ("R017", request_rules::check_request_parameter_constraint_changed),
    ("R018", request_rules::check_request_parameter_added),
];

pub fn get_rule_count() -> usize {
    RULES.len()
}

/// Looks up a rule by its code.
pub fn find_rule(code: &str) -> Option<&'static RuleEntry> {
    RULES.iter().find(|(rule_code, ..)| *rule_code == code)
}

/// Checks that codes are unique and well formed.
pub fn verify_rules() -> Result<(), String> {
    let mut codes = HashSet::new();
    for (code, _) in RULES {
        let well_formed = code.len() == 4
            && code.starts_with('R')
            && code[1..].chars().all(|c| c.is_ascii_digit());
        if !well_formed {
            return Err(format!("Malformed rule code: {code}"));
        }
        if !codes.insert(*code) {
            return Err(format!("Duplicate rule code: {code}"));
        }
    }
    Ok(())
}
