//! Operation-level rules

use crate::canonical::Specification;
use crate::compat::handlers::compared_paths;
use crate::compat::types::{BreakingChange, RuleContext, RuleResult};
use std::collections::BTreeSet;
use tracing::debug;

/// R001 - an operation that existed as a standard API became beta.
/// Honors the excluded prefixes but not the beta half of the skipper, since
/// the beta marker is what this rule inspects.
pub fn check_standard_api_to_beta_api(
    old: &Specification,
    new: &Specification,
    context: &RuleContext,
) -> RuleResult {
    let mut changes = BTreeSet::new();
    for path in old.paths() {
        if context.skipper.is_excluded(path) {
            continue;
        }
        let Some(new_path) = new.get_path(path) else {
            continue;
        };
        if !path.beta_api && new_path.beta_api {
            changes.insert(BreakingChange::StandardApiToBetaApi {
                path: path.path.clone(),
                method: path.method,
            });
        }
    }
    RuleResult::with_changes(changes)
}

/// R002 - an operation is missing from the new specification. Deprecated
/// operations may go when the options allow it.
pub fn check_path_deleted(old: &Specification, new: &Specification, context: &RuleContext) -> RuleResult {
    let mut changes = BTreeSet::new();
    for (path, counterpart) in compared_paths(old, new, context) {
        if counterpart.is_some() {
            continue;
        }
        if path.deprecated && context.options.deprecated_api_deletion_allowed {
            debug!(%path, "deprecated path deleted, allowed");
            continue;
        }
        debug!(%path, "path is not included in the new API");
        changes.insert(BreakingChange::PathDeleted {
            path: path.path.clone(),
            method: path.method,
        });
    }
    RuleResult::with_changes(changes)
}
