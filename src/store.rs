//! Workflow and shortcut registries
//!
//! In-memory record stores reachable by id - the storage collaborator the
//! engine depends on. Lock-free concurrent maps, no on-disk persistence;
//! the engine only ever reads a definition for the duration of one run.

use std::sync::Arc;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::FlowError;
use crate::workflow::Workflow;

/// A user-visible shortcut record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Shortcut {
    pub id: String,
    pub name: String,
    pub description: String,
}

/// Workflow registry: insert-or-replace, keyed by the workflow's own id
#[derive(Clone, Default)]
pub struct WorkflowStore {
    workflows: Arc<DashMap<String, Arc<Workflow>>>,
}

impl WorkflowStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a definition under its id
    pub fn save(&self, workflow: Workflow) {
        self.workflows
            .insert(workflow.id.clone(), Arc::new(workflow));
    }

    pub fn get(&self, id: &str) -> Option<Arc<Workflow>> {
        self.workflows.get(id).map(|w| Arc::clone(&w))
    }

    /// Like `get`, but a miss is an error (the engine-facing contract)
    pub fn load(&self, id: &str) -> Result<Arc<Workflow>, FlowError> {
        self.get(id).ok_or_else(|| FlowError::WorkflowNotFound {
            id: id.to_string(),
        })
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Workflow>> {
        self.workflows.remove(id).map(|(_, w)| w)
    }

    /// All definitions, sorted by name for stable listings
    pub fn list(&self) -> Vec<Arc<Workflow>> {
        let mut all: Vec<Arc<Workflow>> = self
            .workflows
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.workflows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workflows.is_empty()
    }
}

/// Shortcut library, refreshed from the platform's shortcut listing
#[derive(Clone, Default)]
pub struct ShortcutStore {
    shortcuts: Arc<DashMap<String, Shortcut>>,
}

impl ShortcutStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole library with freshly listed names. Every record
    /// gets a new uuid4 id and a placeholder description.
    pub fn refresh(&self, names: Vec<String>) -> Vec<Shortcut> {
        self.shortcuts.clear();

        let mut refreshed = Vec::with_capacity(names.len());
        for name in names.into_iter().filter(|n| !n.is_empty()) {
            let shortcut = Shortcut {
                id: Uuid::new_v4().to_string(),
                name,
                description: "User shortcut".to_string(),
            };
            self.shortcuts.insert(shortcut.id.clone(), shortcut.clone());
            refreshed.push(shortcut);
        }
        refreshed
    }

    pub fn save(&self, shortcut: Shortcut) {
        self.shortcuts.insert(shortcut.id.clone(), shortcut);
    }

    pub fn get(&self, id: &str) -> Option<Shortcut> {
        self.shortcuts.get(id).map(|s| s.clone())
    }

    pub fn update_description(&self, id: &str, description: &str) -> Result<(), FlowError> {
        match self.shortcuts.get_mut(id) {
            Some(mut shortcut) => {
                shortcut.description = description.to_string();
                Ok(())
            }
            None => Err(FlowError::ShortcutNotFound { id: id.to_string() }),
        }
    }

    /// All records, sorted by name for stable listings
    pub fn list(&self) -> Vec<Shortcut> {
        let mut all: Vec<Shortcut> = self
            .shortcuts
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_by(|a, b| a.name.cmp(&b.name));
        all
    }

    pub fn len(&self) -> usize {
        self.shortcuts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shortcuts.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::{PlainStep, Step};

    fn workflow(id: &str, name: &str) -> Workflow {
        Workflow {
            id: id.to_string(),
            name: name.to_string(),
            steps: vec![Step::Plain(PlainStep {
                name: "Only".to_string(),
                shortcut_name: "Only".to_string(),
                model: None,
                system_prompt: None,
            })],
            form_definition: None,
            import_format: None,
            version: None,
        }
    }

    #[test]
    fn save_then_load_by_id() {
        let store = WorkflowStore::new();
        store.save(workflow("wf-1", "Digest"));

        let loaded = store.load("wf-1").unwrap();
        assert_eq!(loaded.name, "Digest");
        assert!(matches!(
            store.load("missing"),
            Err(FlowError::WorkflowNotFound { .. })
        ));
    }

    #[test]
    fn save_replaces_same_id() {
        let store = WorkflowStore::new();
        store.save(workflow("wf-1", "Old"));
        store.save(workflow("wf-1", "New"));

        assert_eq!(store.len(), 1);
        assert_eq!(store.load("wf-1").unwrap().name, "New");
    }

    #[test]
    fn list_is_sorted_by_name() {
        let store = WorkflowStore::new();
        store.save(workflow("wf-2", "Zeta"));
        store.save(workflow("wf-1", "Alpha"));

        let names: Vec<_> = store.list().iter().map(|w| w.name.clone()).collect();
        assert_eq!(names, vec!["Alpha", "Zeta"]);
    }

    #[test]
    fn refresh_replaces_the_whole_library() {
        let store = ShortcutStore::new();
        store.save(Shortcut {
            id: "stale".to_string(),
            name: "Stale".to_string(),
            description: "old".to_string(),
        });

        let refreshed = store.refresh(vec!["One".to_string(), "Two".to_string()]);

        assert_eq!(refreshed.len(), 2);
        assert_eq!(store.len(), 2);
        assert!(store.get("stale").is_none());
        assert!(refreshed.iter().all(|s| !s.id.is_empty()));
        assert!(refreshed.iter().all(|s| s.description == "User shortcut"));
    }

    #[test]
    fn refresh_skips_empty_names() {
        let store = ShortcutStore::new();
        let refreshed = store.refresh(vec!["Real".to_string(), String::new()]);
        assert_eq!(refreshed.len(), 1);
        assert_eq!(refreshed[0].name, "Real");
    }

    #[test]
    fn update_description_in_place() {
        let store = ShortcutStore::new();
        let refreshed = store.refresh(vec!["One".to_string()]);
        let id = refreshed[0].id.clone();

        store.update_description(&id, "Summarizes my mail").unwrap();
        assert_eq!(store.get(&id).unwrap().description, "Summarizes my mail");

        assert!(matches!(
            store.update_description("missing", "x"),
            Err(FlowError::ShortcutNotFound { .. })
        ));
    }
}
