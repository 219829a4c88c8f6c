//! Breaking change detection engine
//!
//! Runs every registered rule against two specifications and merges the
//! results into one deterministic list.

use crate::canonical::Specification;
use crate::compat::rule_registry;
use crate::compat::types::{BreakingChange, ChangeReport, RuleContext};
use crate::error::{BrakeError, Result};
use crate::options::CheckerOptions;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Result of breaking change detection
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BreakingResult {
    /// All breaking changes found, ordered by variant name
    pub changes: Vec<BreakingChange>,
    /// Whether any breaking changes were found
    pub has_breaking_changes: bool,
    /// Summary by category
    pub summary: BTreeMap<String, usize>,
    /// Rules that were executed
    pub executed_rules: Vec<String>,
}

impl BreakingResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add breaking changes to the result
    pub fn add_changes(&mut self, new_changes: impl IntoIterator<Item = BreakingChange>) {
        for change in new_changes {
            *self.summary.entry(change.category().id().to_string()).or_insert(0) += 1;
            self.changes.push(change);
        }
        self.has_breaking_changes = !self.changes.is_empty();
    }

    pub fn mark_rule_executed(&mut self, rule_code: &str) {
        self.executed_rules.push(rule_code.to_string());
    }

    /// Drops the changes whose rule code is ignored. Applied at the reporting
    /// boundary, after detection.
    pub fn without_rules(self, ignored: &BTreeSet<String>) -> Self {
        let mut result = Self {
            executed_rules: self.executed_rules,
            ..Self::default()
        };
        result.add_changes(
            self.changes
                .into_iter()
                .filter(|change| !ignored.contains(change.rule_code())),
        );
        result
    }

    /// Serializable form with rule codes and rendered messages.
    pub fn report(&self) -> ResultReport<'_> {
        ResultReport {
            breaking_changes: self.changes.iter().map(BreakingChange::report).collect(),
            has_breaking_changes: self.has_breaking_changes,
            summary: &self.summary,
            executed_rules: &self.executed_rules,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ResultReport<'a> {
    pub breaking_changes: Vec<ChangeReport<'a>>,
    pub has_breaking_changes: bool,
    pub summary: &'a BTreeMap<String, usize>,
    pub executed_rules: &'a [String],
}

/// Runs all rules with one set of options.
#[derive(Debug, Clone)]
pub struct BreakChecker {
    context: RuleContext,
}

impl BreakChecker {
    /// # Errors
    ///
    /// Fails when an excluded path is blank.
    pub fn new(options: &CheckerOptions) -> Result<Self> {
        Ok(Self {
            context: RuleContext::new(options)?,
        })
    }

    /// Breaking changes from `old` to `new`, ordered by variant name.
    ///
    /// # Errors
    ///
    /// [`BrakeError::InvalidInput`] when either side is missing.
    pub fn check(
        &self,
        old: Option<&Specification>,
        new: Option<&Specification>,
    ) -> Result<Vec<BreakingChange>> {
        Ok(self.run(old, new)?.changes)
    }

    /// Like [`BreakChecker::check`], with the per-category summary and the
    /// executed rules.
    pub fn run(&self, old: Option<&Specification>, new: Option<&Specification>) -> Result<BreakingResult> {
        let old = old.ok_or(BrakeError::InvalidInput("oldApi"))?;
        let new = new.ok_or(BrakeError::InvalidInput("newApi"))?;

        let mut merged = BTreeSet::new();
        let mut result = BreakingResult::new();
        for (code, rule_fn) in rule_registry::get_rule_mapping() {
            let rule_result = rule_fn(old, new, &self.context);
            debug!(rule = code, found = rule_result.changes.len(), "rule executed");
            result.mark_rule_executed(code);
            merged.extend(rule_result.changes);
        }

        let mut changes: Vec<BreakingChange> = merged.into_iter().collect();
        changes.sort_by(|a, b| a.variant_name().cmp(b.variant_name()).then_with(|| a.cmp(b)));
        result.add_changes(changes);
        Ok(result)
    }

    pub fn get_rule_count(&self) -> usize {
        rule_registry::get_rule_count()
    }

    pub fn verify_rules(&self) -> std::result::Result<(), String> {
        rule_registry::verify_rules()
    }
}
