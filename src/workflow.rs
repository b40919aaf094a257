//! Workflow parsing structures
//!
//! A workflow is an ordered list of steps: plain, branch, or merge. The
//! engine reads a definition for the duration of one run and never mutates
//! the stored record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::FlowError;

/// Workflow definition as stored/exchanged (JSON, camelCase field names)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Caller-assigned id, stable across saves
    pub id: String,
    pub name: String,
    pub steps: Vec<Step>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub form_definition: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub import_format: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

/// One unit of workflow definition
///
/// Wire shape is untagged: a dict with `branches` is a branch step, a dict
/// with `branchStepIndex` is a merge step, any other dict is a plain step.
/// Variant order matters for deserialization - a merge dict would also
/// satisfy the plain shape.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum Step {
    Branch(BranchStep),
    Merge(MergeStep),
    Plain(PlainStep),
}

/// One unit of work: run a shortcut against the current context
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlainStep {
    pub name: String,
    pub shortcut_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

/// N independent sub-pipelines, each an ordered sequence of plain steps.
/// Branches run concurrently; steps within a branch run in order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BranchStep {
    pub branches: Vec<Vec<PlainStep>>,
}

/// A plain-like step whose payload additionally carries the collected
/// outputs of the branch step at `branch_step_index`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MergeStep {
    pub name: String,
    pub shortcut_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    pub branch_step_index: usize,
}

impl BranchStep {
    /// Total leaf steps across all branches
    pub fn leaf_count(&self) -> usize {
        self.branches.iter().map(Vec::len).sum()
    }
}

impl Step {
    /// Leaf steps this step contributes to the progress denominator:
    /// 1 for plain/merge, sum of branch lengths for branch
    pub fn leaf_count(&self) -> usize {
        match self {
            Step::Plain(_) | Step::Merge(_) => 1,
            Step::Branch(b) => b.leaf_count(),
        }
    }

}

impl Workflow {
    /// Parse a workflow definition from JSON text
    pub fn from_json(json: &str) -> Result<Self, FlowError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Progress denominator, fixed for the whole run
    pub fn total_steps(&self) -> usize {
        self.steps.iter().map(Step::leaf_count).sum()
    }

    /// Minimal shape checks: every merge must reference an earlier branch
    /// step that actually has branches
    pub fn validate(&self) -> Result<(), FlowError> {
        for (position, step) in self.steps.iter().enumerate() {
            let Step::Merge(merge) = step else { continue };
            let index = merge.branch_step_index;

            if index >= self.steps.len() {
                return Err(FlowError::MergeIndexOutOfRange {
                    step: merge.name.clone(),
                    index,
                    len: self.steps.len(),
                });
            }
            if index >= position {
                return Err(FlowError::MergeIndexNotEarlier {
                    step: merge.name.clone(),
                    index,
                });
            }
            match &self.steps[index] {
                Step::Branch(b) if b.branches.is_empty() => {
                    return Err(FlowError::MergeTargetEmpty {
                        step: merge.name.clone(),
                        index,
                    });
                }
                Step::Branch(_) => {}
                _ => {
                    return Err(FlowError::MergeTargetNotBranch {
                        step: merge.name.clone(),
                        index,
                    });
                }
            }
        }
        Ok(())
    }
}
