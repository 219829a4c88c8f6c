//! Provides the high-level Spec API for comparing OpenAPI documents.

use crate::canonical::Specification;
use crate::compat::{BreakChecker, BreakingChange};
use crate::error::Result;
use crate::options::CheckerOptions;
use crate::{build_specification, generate_fingerprint};

/// The result of a compatibility comparison between two API documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compatibility {
    /// The two documents describe the same API.
    Green,
    /// The new document differs but breaks no existing consumer.
    Yellow,
    /// The new document contains breaking changes.
    Red,
}

impl Compatibility {
    /// Level of two documents known to differ, given the breaking changes
    /// between them.
    pub fn of(changes: &[BreakingChange]) -> Self {
        if changes.is_empty() {
            Compatibility::Yellow
        } else {
            Compatibility::Red
        }
    }
}

impl std::fmt::Display for Compatibility {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Compatibility::Green => "GREEN",
            Compatibility::Yellow => "YELLOW",
            Compatibility::Red => "RED",
        };
        f.write_str(label)
    }
}

/// A single API document, holding its content and derived models for comparison.
pub struct Spec<'a> {
    /// The original document text.
    pub content: &'a str,
    /// The exact semantic fingerprint.
    pub fingerprint: String,
    /// The normalized specification.
    pub specification: Specification,
    options: CheckerOptions,
}

impl<'a> Spec<'a> {
    /// Creates a new `Spec` from the text of an OpenAPI or Swagger document.
    ///
    /// This parses and normalizes the document once, so it should be called
    /// once per file.
    pub fn try_from(content: &'a str, options: &CheckerOptions) -> Result<Self> {
        options.validate()?;
        let specification = build_specification(content, options)?;
        let fingerprint = generate_fingerprint(&specification)?;
        Ok(Spec {
            content,
            fingerprint,
            specification,
            options: options.clone(),
        })
    }

    /// Breaking changes from this (old) document to `new_spec`.
    pub fn check_breaking_changes(&self, new_spec: &Spec) -> Result<Vec<BreakingChange>> {
        BreakChecker::new(&self.options)?.check(Some(&self.specification), Some(&new_spec.specification))
    }

    /// Compares this `Spec` (the "old" version) with another `Spec` (the "new" version)
    /// to determine their compatibility level.
    pub fn compare_with(&self, new_spec: &Spec) -> Result<Compatibility> {
        self.assess(new_spec).map(|(compatibility, _)| compatibility)
    }

    /// The compatibility level together with the breaking changes behind it.
    /// Identical fingerprints short-circuit to `Green` without running the
    /// rules.
    pub fn assess(&self, new_spec: &Spec) -> Result<(Compatibility, Vec<BreakingChange>)> {
        if self.fingerprint == new_spec.fingerprint {
            return Ok((Compatibility::Green, Vec::new()));
        }
        let changes = self.check_breaking_changes(new_spec)?;
        Ok((Compatibility::of(&changes), changes))
    }
}
