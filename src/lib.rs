pub mod canonical;
pub mod compat;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod normalize;
pub mod options;
pub mod raw;
pub mod safe_format;
pub mod spec;
pub mod store;
pub mod transformer;
pub mod type_resolver;
pub mod upgrade;
pub mod version;

pub use canonical::Specification;
pub use compat::{BreakChecker, BreakingChange, BreakingResult};
pub use document::RawDocument;
pub use error::{BrakeError, Result};
pub use options::{BrakeConfig, CheckerOptions};
pub use spec::{Compatibility, Spec};

use std::thread;

/// Generates a semantic fingerprint for a specification.
///
/// The fingerprint is a SHA-256 hash over the specification's canonical JSON
/// representation, with every schema node standing in as the hash of its own
/// content. It is insensitive to formatting, key order and how schemas were
/// split into references.
///
/// # Returns
///
/// The hex-encoded SHA-256 fingerprint, or an error if serialization fails.
pub fn generate_fingerprint(specification: &Specification) -> Result<String> {
    fingerprint::digest_specification(specification)
}

/// Parses `content` and builds its specification.
pub fn build_specification(content: &str, options: &CheckerOptions) -> Result<Specification> {
    let document: RawDocument = content.parse()?;
    normalize::normalize_document(&document, options)
}

/// Builds both specifications, each on its own thread, and checks the new one
/// against the old one.
///
/// # Errors
///
/// Any failure while building either specification aborts the check; no
/// partial result is returned.
pub fn check_documents(old: &str, new: &str, options: &CheckerOptions) -> Result<BreakingResult> {
    options.validate()?;
    let checker = BreakChecker::new(options)?;

    let (old_spec, new_spec) = thread::scope(|scope| {
        let old_handle = scope.spawn(|| build_specification(old, options));
        let new_spec = build_specification(new, options);
        let old_spec = old_handle.join().unwrap_or_else(|panic| std::panic::resume_unwind(panic));
        (old_spec, new_spec)
    });

    checker.run(Some(&old_spec?), Some(&new_spec?))
}
