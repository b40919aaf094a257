//! Error types with fix suggestions

use thiserror::Error;

/// Trait for errors that provide fix suggestions
pub trait FixSuggestion {
    fn fix_suggestion(&self) -> Option<&str>;
}

/// All error variants are part of the public API.
#[derive(Error, Debug)]
pub enum FlowError {
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // ─────────────────────────────────────────────────────────────
    // Definition errors (malformed workflow shape)
    // ─────────────────────────────────────────────────────────────

    #[error("Merge step '{step}' references step index {index}, but the workflow has only {len} steps")]
    MergeIndexOutOfRange { step: String, index: usize, len: usize },

    #[error("Merge step '{step}' must reference an earlier step (got index {index})")]
    MergeIndexNotEarlier { step: String, index: usize },

    #[error("Merge step '{step}' references step {index}, which is not a branch step")]
    MergeTargetNotBranch { step: String, index: usize },

    #[error("Merge step '{step}' references branch step {index}, which has no branches")]
    MergeTargetEmpty { step: String, index: usize },

    // ─────────────────────────────────────────────────────────────
    // Run-time errors
    // ─────────────────────────────────────────────────────────────

    #[error("Step '{step}' failed: {detail}")]
    Executor { step: String, detail: String },

    #[error("Progress channel closed by consumer")]
    ChannelClosed,

    // ─────────────────────────────────────────────────────────────
    // Registry errors
    // ─────────────────────────────────────────────────────────────

    #[error("Workflow '{id}' not found")]
    WorkflowNotFound { id: String },

    #[error("Shortcut '{id}' not found")]
    ShortcutNotFound { id: String },

    #[error("Unknown executor: '{0}'. Available: shortcuts, mock")]
    UnknownExecutor(String),
}

impl FlowError {
    /// Definition errors are detected before any executor call
    pub fn is_definition(&self) -> bool {
        matches!(
            self,
            FlowError::MergeIndexOutOfRange { .. }
                | FlowError::MergeIndexNotEarlier { .. }
                | FlowError::MergeTargetNotBranch { .. }
                | FlowError::MergeTargetEmpty { .. }
        )
    }
}

impl FixSuggestion for FlowError {
    fn fix_suggestion(&self) -> Option<&str> {
        match self {
            FlowError::Json(_) => Some("Check the workflow JSON: every step needs name + shortcutName, branches is a list of lists"),
            FlowError::Io(_) => Some("Check file path and permissions"),
            FlowError::MergeIndexOutOfRange { .. } | FlowError::MergeIndexNotEarlier { .. } => {
                Some("Point branchStepIndex at a branch step that appears before the merge step")
            }
            FlowError::MergeTargetNotBranch { .. } => {
                Some("branchStepIndex must reference a step with a branches list")
            }
            FlowError::MergeTargetEmpty { .. } => {
                Some("Add at least one branch to the referenced branch step, or drop the merge")
            }
            FlowError::Executor { .. } => {
                Some("Check the shortcut exists and runs cleanly outside the pipeline")
            }
            FlowError::ChannelClosed => {
                Some("Keep draining progress events until completed or error")
            }
            FlowError::WorkflowNotFound { .. } => Some("Verify the workflow id exists in the registry"),
            FlowError::ShortcutNotFound { .. } => Some("Refresh the shortcut library and retry"),
            FlowError::UnknownExecutor(_) => Some("Use one of: shortcuts, mock"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn definition_errors_are_flagged() {
        let err = FlowError::MergeTargetNotBranch {
            step: "combine".to_string(),
            index: 0,
        };
        assert!(err.is_definition());

        let err = FlowError::Executor {
            step: "summarize".to_string(),
            detail: "exit 1".to_string(),
        };
        assert!(!err.is_definition());
    }

    #[test]
    fn every_variant_has_a_suggestion() {
        let err = FlowError::ChannelClosed;
        assert!(err.fix_suggestion().is_some());

        let err = FlowError::WorkflowNotFound {
            id: "wf-1".to_string(),
        };
        assert!(err.fix_suggestion().is_some());
    }

    #[test]
    fn executor_error_carries_step_and_detail() {
        let err = FlowError::Executor {
            step: "Summarize Text".to_string(),
            detail: "shortcut not installed".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("Summarize Text"));
        assert!(msg.contains("shortcut not installed"));
    }
}
