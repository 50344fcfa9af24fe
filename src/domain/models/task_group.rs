//! Exploration task templates.
//!
//! The engine never looks inside a task: a stage's template is handed back
//! unchanged every iteration for the simulation layer to run.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One simulation task: a set of named input files.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationTask {
    #[serde(default)]
    pub files: BTreeMap<String, String>,
}

impl ExplorationTask {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add (or replace) an input file.
    #[must_use]
    pub fn with_file(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.files.insert(name.into(), content.into());
        self
    }
}

/// A group of tasks run together in one exploration iteration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationTaskGroup {
    #[serde(default)]
    pub tasks: Vec<ExplorationTask>,
}

impl ExplorationTaskGroup {
    pub fn new(tasks: Vec<ExplorationTask>) -> Self {
        Self { tasks }
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn extend(&mut self, other: &Self) {
        self.tasks.extend(other.tasks.iter().cloned());
    }
}

/// The static task template of one exploration stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExplorationStage {
    #[serde(default)]
    pub task_groups: Vec<ExplorationTaskGroup>,
}

impl ExplorationStage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_task_group(&mut self, group: ExplorationTaskGroup) {
        self.task_groups.push(group);
    }

    /// Merge all task groups into the group run each iteration.
    pub fn make_task(&self) -> ExplorationTaskGroup {
        let mut merged = ExplorationTaskGroup::default();
        for group in &self.task_groups {
            merged.extend(group);
        }
        merged
    }
}
