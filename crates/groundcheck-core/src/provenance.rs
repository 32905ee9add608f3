//! Provenance classification.
//!
//! Combines "did the agent invoke a tool" with the verdict into a coarse label
//! describing where a correct or incorrect answer most likely came from.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::verdict::Verdict;

/// Where an answer's correctness most likely came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ProvenanceLabel {
    /// Correct without any tool call.
    #[serde(rename = "parametric")]
    Parametric,
    /// Correct after using a tool.
    #[serde(rename = "tool-assisted")]
    ToolAssisted,
    /// Verified and wrong, with or without tools.
    #[serde(rename = "hybrid_or_failed")]
    HybridOrFailed,
    /// Not verifiable, no tool used.
    #[serde(rename = "unverified_parametric")]
    UnverifiedParametric,
    /// Not verifiable, tool used.
    #[serde(rename = "unverified_tool_used")]
    UnverifiedToolUsed,
}

impl ProvenanceLabel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProvenanceLabel::Parametric => "parametric",
            ProvenanceLabel::ToolAssisted => "tool-assisted",
            ProvenanceLabel::HybridOrFailed => "hybrid_or_failed",
            ProvenanceLabel::UnverifiedParametric => "unverified_parametric",
            ProvenanceLabel::UnverifiedToolUsed => "unverified_tool_used",
        }
    }
}

impl fmt::Display for ProvenanceLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a verdict by whether a tool was used.
pub fn classify_provenance(tool_used: bool, verdict: &Verdict) -> ProvenanceLabel {
    match (verdict.valid, tool_used) {
        (None, true) => ProvenanceLabel::UnverifiedToolUsed,
        (None, false) => ProvenanceLabel::UnverifiedParametric,
        (Some(true), false) => ProvenanceLabel::Parametric,
        (Some(true), true) => ProvenanceLabel::ToolAssisted,
        (Some(false), _) => ProvenanceLabel::HybridOrFailed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verdict::Reason;

    fn verdict(valid: Option<bool>) -> Verdict {
        Verdict {
            valid,
            reason: None,
            detail: None,
        }
    }

    #[test]
    fn test_valid_without_tool_is_parametric() {
        assert_eq!(classify_provenance(false, &verdict(Some(true))), ProvenanceLabel::Parametric);
    }

    #[test]
    fn test_valid_with_tool_is_tool_assisted() {
        assert_eq!(classify_provenance(true, &verdict(Some(true))), ProvenanceLabel::ToolAssisted);
    }

    #[test]
    fn test_invalid_is_hybrid_or_failed() {
        for tool_used in [true, false] {
            assert_eq!(
                classify_provenance(tool_used, &verdict(Some(false))),
                ProvenanceLabel::HybridOrFailed
            );
        }
    }

    #[test]
    fn test_null_never_reads_as_failed() {
        let unverifiable = Verdict::unverifiable(Reason::UnverifiablePromptType);
        assert_eq!(
            classify_provenance(false, &unverifiable),
            ProvenanceLabel::UnverifiedParametric
        );
        assert_eq!(classify_provenance(true, &unverifiable), ProvenanceLabel::UnverifiedToolUsed);
    }

    #[test]
    fn test_label_wire_names() {
        assert_eq!(
            serde_json::to_string(&ProvenanceLabel::ToolAssisted).unwrap(),
            r#""tool-assisted""#
        );
        assert_eq!(ProvenanceLabel::UnverifiedParametric.to_string(), "unverified_parametric");
    }
}
