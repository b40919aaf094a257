//! Shortflow - pipeline engine for Shortcuts automation workflows

pub mod context;
pub mod error;
pub mod executor;
pub mod progress;
pub mod runner;
pub mod store;
pub mod template;
pub mod workflow;

pub use context::Context;
pub use error::{FixSuggestion, FlowError};
pub use executor::{create_executor, MockExecutor, ShortcutsExecutor, StepExecutor};
pub use progress::{ProgressEvent, ProgressSender, RunStatus, StepOutput};
pub use runner::{RunHandle, Runner};
pub use store::{Shortcut, ShortcutStore, WorkflowStore};
pub use template::substitute_tags;
pub use workflow::{BranchStep, MergeStep, PlainStep, Step, Workflow};
