//! Mock executor for testing
//!
//! Returns scripted responses without touching the system. Responses keyed
//! by shortcut name stay deterministic under branch concurrency; a FIFO
//! queue covers simple sequential scripts. Every call is recorded for
//! assertions.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};

use anyhow::{bail, Result};
use async_trait::async_trait;

use super::StepExecutor;
use crate::context::Context;

/// Mock executor with scripted responses and failure injection
#[derive(Clone)]
pub struct MockExecutor {
    /// Responses keyed by shortcut name (checked first)
    by_name: Arc<Mutex<HashMap<String, String>>>,
    /// FIFO queue of responses (fallback)
    queue: Arc<Mutex<VecDeque<String>>>,
    /// Shortcut names that fail, with their error detail
    failures: Arc<Mutex<HashMap<String, String>>>,
    /// Response when nothing else matches
    default_response: String,
    /// All calls made, in order: (shortcut_name, payload)
    calls: Arc<Mutex<Vec<(String, Context)>>>,
}

impl MockExecutor {
    pub fn new() -> Self {
        Self {
            by_name: Arc::new(Mutex::new(HashMap::new())),
            queue: Arc::new(Mutex::new(VecDeque::new())),
            failures: Arc::new(Mutex::new(HashMap::new())),
            default_response: "Mock output".to_string(),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Script a response for one shortcut name
    pub fn with_response(self, name: impl Into<String>, output: impl Into<String>) -> Self {
        self.by_name.lock().unwrap().insert(name.into(), output.into());
        self
    }

    /// Queue responses consumed first-in-first-out when no name matches
    pub fn with_queued(self, outputs: Vec<&str>) -> Self {
        self.queue
            .lock()
            .unwrap()
            .extend(outputs.into_iter().map(str::to_string));
        self
    }

    /// Make one shortcut name fail with the given detail
    pub fn with_failure(self, name: impl Into<String>, detail: impl Into<String>) -> Self {
        self.failures.lock().unwrap().insert(name.into(), detail.into());
        self
    }

    /// Set the response used when nothing else matches
    pub fn with_default(mut self, output: impl Into<String>) -> Self {
        self.default_response = output.into();
        self
    }

    /// All calls made, in order
    pub fn calls(&self) -> Vec<(String, Context)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Payload of the first call to the given shortcut name
    pub fn payload_for(&self, name: &str) -> Option<Context> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, payload)| payload.clone())
    }
}

impl Default for MockExecutor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StepExecutor for MockExecutor {
    fn name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, shortcut_name: &str, payload: &Context) -> Result<String> {
        self.calls
            .lock()
            .unwrap()
            .push((shortcut_name.to_string(), payload.clone()));

        let failure = self.failures.lock().unwrap().get(shortcut_name).cloned();
        if let Some(detail) = failure {
            bail!("{detail}");
        }

        if let Some(response) = self.by_name.lock().unwrap().get(shortcut_name) {
            return Ok(response.clone());
        }

        if let Some(response) = self.queue.lock().unwrap().pop_front() {
            return Ok(response);
        }

        Ok(self.default_response.clone())
    }
}
