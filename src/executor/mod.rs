//! Step executor abstraction
//!
//! Trait and implementations for the external program that performs one
//! step's work. The engine hands over a shortcut name and the current
//! context as payload, gets text back, and treats everything in between as
//! a black box.
//!
//! ## Available executors
//!
//! | Executor | Use case | Requires |
//! |-----------|----------|----------|
//! | `shortcuts` | Production | `shortcuts` CLI installed |
//! | `mock` | Testing | Nothing |

mod mock;
mod shortcuts;

pub use mock::MockExecutor;
pub use shortcuts::ShortcutsExecutor;

use anyhow::Result;
use async_trait::async_trait;

use crate::context::Context;
use crate::error::FlowError;

/// Core trait for executing one step
///
/// All methods are async-capable because the underlying work is a
/// subprocess (or any other slow collaborator). The engine never retries
/// and never applies a timeout; a call suspends the driver until it
/// resolves. Failures carry the executor's raw error text; the runner wraps
/// them with step identification.
#[async_trait]
pub trait StepExecutor: Send + Sync {
    /// Executor name (e.g. "shortcuts", "mock")
    fn name(&self) -> &str;

    /// Run one step to completion, returning its output text
    async fn execute(&self, shortcut_name: &str, payload: &Context) -> Result<String>;

    /// Check if this executor can run on this machine (CLI installed, ...)
    fn is_available(&self) -> bool {
        true
    }
}

/// Create an executor instance by name
pub fn create_executor(name: &str) -> Result<Box<dyn StepExecutor>, FlowError> {
    match name.to_lowercase().as_str() {
        "shortcuts" => Ok(Box::new(ShortcutsExecutor::new())),
        "mock" => Ok(Box::new(MockExecutor::new())),
        other => Err(FlowError::UnknownExecutor(other.to_string())),
    }
}
