//! Breaking change categories used to group rules in summaries

use serde::{Deserialize, Serialize};

/// Part of an operation a rule inspects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum BreakingCategory {
    /// PATH category - operations removed or demoted to beta
    Path,
    /// REQUEST category - parameters and request bodies
    Request,
    /// RESPONSE category - response codes and bodies
    Response,
}

impl BreakingCategory {
    pub fn id(&self) -> &'static str {
        match self {
            BreakingCategory::Path => "PATH",
            BreakingCategory::Request => "REQUEST",
            BreakingCategory::Response => "RESPONSE",
        }
    }
}

impl std::fmt::Display for BreakingCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids() {
        assert_eq!(BreakingCategory::Path.id(), "PATH");
        assert_eq!(BreakingCategory::Request.to_string(), "REQUEST");
        assert_eq!(BreakingCategory::Response.to_string(), "RESPONSE");
    }
}
