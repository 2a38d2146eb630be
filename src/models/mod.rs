//! Data models for tagtask entities.
//!
//! This module defines the core data structures:
//! - `Task` - Top-level work items with status, priority, dependencies
//! - `Subtask` - Work items nested under a single parent task
//! - `TagData` - A named, independent task list with metadata
//! - `TaggedData` - The whole on-disk document, keyed by tag name
//! - `MoveHistoryEntry` - Audit record appended on every cross-tag move

pub mod graph;
pub mod refs;

pub use refs::{ItemRef, TaskId, TaskRef, normalize_dependencies, normalize_dependency};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Unknown JSON fields carried through a load/save cycle untouched.
pub type Extra = serde_json::Map<String, serde_json::Value>;

/// Task status in the workflow.
///
/// The engine never interprets status; unknown values survive round trips.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Review,
    Done,
    Deferred,
    Blocked,
    Cancelled,
    Other(String),
}

impl TaskStatus {
    pub fn as_str(&self) -> &str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Review => "review",
            TaskStatus::Done => "done",
            TaskStatus::Deferred => "deferred",
            TaskStatus::Blocked => "blocked",
            TaskStatus::Cancelled => "cancelled",
            TaskStatus::Other(s) => s,
        }
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => TaskStatus::Pending,
            "in-progress" => TaskStatus::InProgress,
            "review" => TaskStatus::Review,
            "done" => TaskStatus::Done,
            "deferred" => TaskStatus::Deferred,
            "blocked" => TaskStatus::Blocked,
            "cancelled" => TaskStatus::Cancelled,
            _ => TaskStatus::Other(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.as_str().to_string()
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Task priority, opaque to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum TaskPriority {
    High,
    Medium,
    Low,
    Other(String),
}

impl From<String> for TaskPriority {
    fn from(s: String) -> Self {
        match s.as_str() {
            "high" => TaskPriority::High,
            "medium" => TaskPriority::Medium,
            "low" => TaskPriority::Low,
            _ => TaskPriority::Other(s),
        }
    }
}

impl From<TaskPriority> for String {
    fn from(priority: TaskPriority) -> Self {
        match priority {
            TaskPriority::High => "high".to_string(),
            TaskPriority::Medium => "medium".to_string(),
            TaskPriority::Low => "low".to_string(),
            TaskPriority::Other(s) => s,
        }
    }
}

/// One cross-tag move, recorded on the moved task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveHistoryEntry {
    pub from_tag: String,
    pub to_tag: String,
    pub timestamp: DateTime<Utc>,
}

/// Per-task metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskMetadata {
    /// Append-only log of cross-tag moves
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub move_history: Vec<MoveHistoryEntry>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// A top-level work item inside a tag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique within its tag
    pub id: TaskId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<TaskPriority>,

    /// References to other tasks in the same tag
    #[serde(default)]
    pub dependencies: Vec<TaskRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_strategy: Option<String>,

    #[serde(default)]
    pub subtasks: Vec<Subtask>,

    /// Tag the task was last moved into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<TaskMetadata>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Task {
    /// Create a new pending task with the given ID and title.
    pub fn new(id: TaskId, title: String) -> Self {
        Self {
            id,
            title,
            description: String::new(),
            status: TaskStatus::default(),
            priority: None,
            dependencies: Vec::new(),
            details: None,
            test_strategy: None,
            subtasks: Vec::new(),
            tag: None,
            metadata: None,
            extra: Extra::new(),
        }
    }

    pub fn subtask(&self, id: TaskId) -> Option<&Subtask> {
        self.subtasks.iter().find(|s| s.id == id)
    }

    /// Recorded cross-tag moves, oldest first.
    pub fn move_history(&self) -> &[MoveHistoryEntry] {
        self.metadata
            .as_ref()
            .map(|m| m.move_history.as_slice())
            .unwrap_or(&[])
    }

    pub fn push_move_history(&mut self, entry: MoveHistoryEntry) {
        self.metadata
            .get_or_insert_with(TaskMetadata::default)
            .move_history
            .push(entry);
    }

    /// Ids of other tasks this task depends on, directly or through a subtask.
    pub fn outgoing_task_ids(&self) -> Vec<TaskId> {
        let mut ids: Vec<TaskId> = self
            .dependencies
            .iter()
            .filter_map(TaskRef::normalize)
            .collect();
        for sub in &self.subtasks {
            ids.extend(sub.dependencies.iter().filter_map(|dep| self.subtask_dep_target(dep)));
        }
        ids.retain(|id| *id != self.id);
        ids.sort();
        ids.dedup();
        ids
    }

    /// Task-level target of a dependency listed on one of this task's subtasks.
    ///
    /// A bare id names a sibling subtask when one with that id exists, and a
    /// top-level task otherwise. Sibling references yield `None`.
    pub fn subtask_dep_target(&self, dep: &TaskRef) -> Option<TaskId> {
        match dep {
            TaskRef::Subtask { parent, .. } => Some(*parent),
            TaskRef::Task(id) if self.subtask(*id).is_some() => None,
            other => other.normalize(),
        }
    }

    /// Apply `rewrite` to every dependency of the task and its subtasks.
    ///
    /// `rewrite` returns `Some(new)` to replace a reference and `None` to keep it.
    /// Bare ids on a subtask that name a sibling are local and never passed
    /// to `rewrite`.
    pub fn rewrite_refs<F>(&mut self, rewrite: &F)
    where
        F: Fn(&TaskRef) -> Option<TaskRef>,
    {
        rewrite_list(&mut self.dependencies, rewrite);
        let siblings: Vec<TaskId> = self.subtasks.iter().map(|s| s.id).collect();
        let outside = |dep: &TaskRef| match dep {
            TaskRef::Task(id) if siblings.contains(id) => None,
            other => rewrite(other),
        };
        for sub in &mut self.subtasks {
            rewrite_list(&mut sub.dependencies, &outside);
        }
    }

    /// Drop dependencies (own and subtask ones) pointing at matching tasks.
    ///
    /// Sibling references and references to this task itself are never
    /// removed. Returns the removed references.
    pub fn remove_refs_to<F>(&mut self, should_remove: &F) -> Vec<TaskRef>
    where
        F: Fn(TaskId) -> bool,
    {
        let own_id = self.id;
        let doomed = |target: Option<TaskId>| target.is_some_and(|id| id != own_id && should_remove(id));

        let mut removed = Vec::new();
        let (keep, drop): (Vec<TaskRef>, Vec<TaskRef>) = std::mem::take(&mut self.dependencies)
            .into_iter()
            .partition(|dep| !doomed(dep.normalize()));
        self.dependencies = keep;
        removed.extend(drop);

        for i in 0..self.subtasks.len() {
            let deps = std::mem::take(&mut self.subtasks[i].dependencies);
            let (keep, drop): (Vec<TaskRef>, Vec<TaskRef>) = deps
                .into_iter()
                .partition(|dep| !doomed(self.subtask_dep_target(dep)));
            self.subtasks[i].dependencies = keep;
            removed.extend(drop);
        }
        removed
    }
}

fn rewrite_list<F>(deps: &mut [TaskRef], rewrite: &F)
where
    F: Fn(&TaskRef) -> Option<TaskRef>,
{
    for dep in deps.iter_mut() {
        if let Some(new) = rewrite(dep) {
            *dep = new;
        }
    }
}

/// A work item nested under one parent task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subtask {
    /// Unique within the parent only
    pub id: TaskId,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: TaskStatus,

    /// Sibling ids or dotted references
    #[serde(default)]
    pub dependencies: Vec<TaskRef>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_strategy: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Subtask {
    pub fn new(id: TaskId, title: String) -> Self {
        Self {
            id,
            title,
            description: String::new(),
            status: TaskStatus::default(),
            dependencies: Vec::new(),
            details: None,
            test_strategy: None,
            extra: Extra::new(),
        }
    }

    /// Promote into a top-level task with a fresh, empty subtask list.
    pub fn into_task(self, id: TaskId) -> Task {
        Task {
            id,
            title: self.title,
            description: self.description,
            status: self.status,
            priority: None,
            dependencies: self.dependencies,
            details: self.details,
            test_strategy: self.test_strategy,
            subtasks: Vec::new(),
            tag: None,
            metadata: None,
            extra: self.extra,
        }
    }
}

impl Task {
    /// Demote into a subtask. The caller must handle `self.subtasks` first.
    pub fn into_subtask(self, id: TaskId) -> Subtask {
        let mut extra = self.extra;
        if let Some(priority) = self.priority {
            extra.insert(
                "priority".to_string(),
                serde_json::Value::String(priority.into()),
            );
        }
        Subtask {
            id,
            title: self.title,
            description: self.description,
            status: self.status,
            dependencies: self.dependencies,
            details: self.details,
            test_strategy: self.test_strategy,
            extra,
        }
    }
}

/// Metadata describing a tag.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TagMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

/// One tag: an independent task list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagData {
    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub metadata: TagMetadata,
}

impl TagData {
    /// An empty tag stamped with the current time.
    pub fn new(description: Option<String>) -> Self {
        Self {
            tasks: Vec::new(),
            metadata: TagMetadata {
                created: Some(Utc::now()),
                description,
                extra: Extra::new(),
            },
        }
    }

    pub fn task(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn contains(&self, id: TaskId) -> bool {
        self.task(id).is_some()
    }
}

/// The whole persisted document: tag name to task list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaggedData {
    tags: BTreeMap<String, TagData>,
}

impl TaggedData {
    pub fn get(&self, tag: &str) -> Option<&TagData> {
        self.tags.get(tag)
    }

    pub fn get_mut(&mut self, tag: &str) -> Option<&mut TagData> {
        self.tags.get_mut(tag)
    }

    pub fn contains_tag(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    pub fn insert(&mut self, tag: String, data: TagData) -> Option<TagData> {
        self.tags.insert(tag, data)
    }

    /// Get a tag, creating it empty when absent.
    pub fn entry_or_create(&mut self, tag: &str, description: impl FnOnce() -> String) -> &mut TagData {
        self.tags
            .entry(tag.to_string())
            .or_insert_with(|| TagData::new(Some(description())))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagData)> {
        self.tags.iter()
    }

    pub fn tag_names(&self) -> impl Iterator<Item = &str> {
        self.tags.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }
}
