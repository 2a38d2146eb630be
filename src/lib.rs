//! Tagtask - move tasks and subtasks around a tagged task graph.
//!
//! This library provides the engine behind the `tg` CLI tool: the data
//! model for tag-partitioned task lists, repositioning within a tag,
//! migration between tags, and dependency-integrity checks.

pub mod action_log;
pub mod cli;
pub mod commands;
pub mod config;
pub mod models;
pub mod moves;
pub mod storage;

use models::TaskId;
use moves::{ConflictKind, DependencyConflict};


/// Library-level error type for tagtask operations.
///
/// Every variant maps to a stable [`Error::code`] and a structured
/// [`Error::data`] payload so callers can branch on the failure kind.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("KDL error: {0}")]
    Kdl(#[from] kdl::KdlError),

    #[error("Invalid tasks file {path}: {reason}")]
    InvalidTasksFile { path: String, reason: String },

    #[error("Tasks file {path} changed on disk since it was loaded")]
    ConcurrentModification { path: String },

    #[error("Number of source IDs ({sources}) must match number of destination IDs ({destinations})")]
    IdCountMismatch { sources: usize, destinations: usize },

    #[error("Tag \"{tag}\" not found")]
    TagNotFound { tag: String },

    #[error("Source tag \"{tag}\" not found or has no tasks")]
    InvalidSourceTag { tag: String },

    #[error("Cannot move subtask {id} directly between tags; promote it to a task first")]
    CannotMoveSubtask { id: String },

    #[error("Source and target tags are the same (\"{tag}\")")]
    SourceTargetTagsSame { tag: String },

    #[error("Task {id} not found{}", in_tag(.tag))]
    TaskNotFound { id: TaskId, tag: Option<String> },

    #[error("Subtask {parent_id}.{id} not found")]
    SubtaskNotFound { parent_id: TaskId, id: TaskId },

    #[error("Parent task {parent_id} not found")]
    ParentTaskNotFound { parent_id: TaskId },

    #[error("Parent task {parent_id} has no subtasks")]
    ParentTaskNoSubtasks { parent_id: TaskId },

    #[error("Destination task {id} not found")]
    DestinationTaskNotFound { id: TaskId },

    #[error("Task {id} already exists{}", in_tag(.tag))]
    TaskAlreadyExists {
        id: TaskId,
        tag: Option<String>,
        suggestions: Vec<String>,
    },

    #[error("Cannot move tasks: {} cross-tag dependency conflict(s) found", .conflicts.len())]
    CrossTagDependencyConflicts {
        conflicts: Vec<DependencyConflict>,
        task_ids: Vec<TaskId>,
    },

    #[error("Task {id} has {count} subtask(s); move or remove them before converting it to a subtask")]
    TaskHasSubtasks { id: TaskId, count: usize },

    #[error("Invalid ID: {0}")]
    InvalidId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Stable machine-readable code for this error.
    pub fn code(&self) -> &'static str {
        match self {
            Error::Io(_) => "IO_ERROR",
            Error::Json(_) => "JSON_ERROR",
            Error::Kdl(_) => "CONFIG_PARSE_ERROR",
            Error::InvalidTasksFile { .. } => "INVALID_TASKS_FILE",
            Error::ConcurrentModification { .. } => "CONCURRENT_MODIFICATION",
            Error::IdCountMismatch { .. } => "ID_COUNT_MISMATCH",
            Error::TagNotFound { .. } => "TAG_NOT_FOUND",
            Error::InvalidSourceTag { .. } => "INVALID_SOURCE_TAG",
            Error::CannotMoveSubtask { .. } => "CANNOT_MOVE_SUBTASK",
            Error::SourceTargetTagsSame { .. } => "SOURCE_TARGET_TAGS_SAME",
            Error::TaskNotFound { .. } => "TASK_NOT_FOUND",
            Error::SubtaskNotFound { .. } => "SUBTASK_NOT_FOUND",
            Error::ParentTaskNotFound { .. } => "PARENT_TASK_NOT_FOUND",
            Error::ParentTaskNoSubtasks { .. } => "PARENT_TASK_NO_SUBTASKS",
            Error::DestinationTaskNotFound { .. } => "DESTINATION_TASK_NOT_FOUND",
            Error::TaskAlreadyExists { .. } => "TASK_ALREADY_EXISTS",
            Error::CrossTagDependencyConflicts { .. } => "CROSS_TAG_DEPENDENCY_CONFLICTS",
            Error::TaskHasSubtasks { .. } => "TASK_HAS_SUBTASKS",
            Error::InvalidId(_) => "INVALID_ID",
            Error::InvalidInput(_) => "INVALID_INPUT",
            Error::Config(_) => "CONFIG_ERROR",
        }
    }

    /// Structured context for remediation (ids, tags, conflicts, suggestions).
    pub fn data(&self) -> serde_json::Value {
        use serde_json::json;

        match self {
            Error::InvalidTasksFile { path, reason } => json!({ "path": path, "reason": reason }),
            Error::ConcurrentModification { path } => json!({ "path": path }),
            Error::IdCountMismatch {
                sources,
                destinations,
            } => json!({ "sources": sources, "destinations": destinations }),
            Error::TagNotFound { tag }
            | Error::InvalidSourceTag { tag }
            | Error::SourceTargetTagsSame { tag } => {
                json!({ "tag": tag })
            }
            Error::CannotMoveSubtask { id } => json!({
                "id": id,
                "suggestions": [format!("Promote the subtask first: tg move --from {} --to <new-id>", id)],
            }),
            Error::TaskNotFound { id, tag } => json!({ "id": id, "tag": tag }),
            Error::SubtaskNotFound { parent_id, id } => {
                json!({ "parent_id": parent_id, "id": id })
            }
            Error::ParentTaskNotFound { parent_id } | Error::ParentTaskNoSubtasks { parent_id } => {
                json!({ "parent_id": parent_id })
            }
            Error::DestinationTaskNotFound { id } => json!({ "id": id }),
            Error::TaskAlreadyExists {
                id,
                tag,
                suggestions,
            } => json!({ "id": id, "tag": tag, "suggestions": suggestions }),
            Error::CrossTagDependencyConflicts {
                conflicts,
                task_ids,
            } => {
                let mut suggestions = vec![
                    "Use --with-dependencies to move the dependencies along".to_string(),
                    "Use --ignore-dependencies to drop the conflicting dependencies".to_string(),
                ];
                // --with-dependencies only follows outgoing edges
                let mut dependents: Vec<TaskId> = conflicts
                    .iter()
                    .filter(|c| c.kind == ConflictKind::Incoming)
                    .map(|c| c.task_id)
                    .collect();
                dependents.sort();
                dependents.dedup();
                if !dependents.is_empty() {
                    let ids: Vec<String> = dependents.iter().map(|id| id.to_string()).collect();
                    suggestions.push(format!(
                        "Add the dependent task(s) {} to --from to move them too",
                        ids.join(",")
                    ));
                }
                json!({
                    "conflicts": conflicts,
                    "task_ids": task_ids,
                    "suggestions": suggestions,
                })
            }
            Error::TaskHasSubtasks { id, count } => json!({ "id": id, "subtask_count": count }),
            _ => serde_json::Value::Null,
        }
    }

    /// Lookup failures; batch moves record these and continue.
    pub fn is_lookup(&self) -> bool {
        matches!(
            self,
            Error::TaskNotFound { .. }
                | Error::SubtaskNotFound { .. }
                | Error::ParentTaskNotFound { .. }
                | Error::ParentTaskNoSubtasks { .. }
                | Error::DestinationTaskNotFound { .. }
        )
    }
}

fn in_tag(tag: &Option<String>) -> String {
    tag.as_ref()
        .map(|t| format!(" in tag \"{}\"", t))
        .unwrap_or_default()
}

/// Result type alias for tagtask operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes_are_stable() {
        let err = Error::TaskAlreadyExists {
            id: TaskId::new(3),
            tag: Some("done".to_string()),
            suggestions: vec![],
        };
        assert_eq!(err.code(), "TASK_ALREADY_EXISTS");
        assert_eq!(err.to_string(), "Task 3 already exists in tag \"done\"");
        assert_eq!(err.data()["id"], 3);
        assert_eq!(err.data()["tag"], "done");
    }

    #[test]
    fn test_lookup_classification() {
        assert!(
            Error::ParentTaskNotFound {
                parent_id: TaskId::new(1)
            }
            .is_lookup()
        );
        assert!(
            !Error::TaskAlreadyExists {
                id: TaskId::new(1),
                tag: None,
                suggestions: vec![],
            }
            .is_lookup()
        );
        assert!(!Error::InvalidId("x".to_string()).is_lookup());
    }

    #[test]
    fn test_conflict_suggestions_name_dependents() {
        let conflict = |task, dep, kind| DependencyConflict {
            task_id: TaskId::new(task),
            dependency_id: TaskId::new(dep),
            kind,
        };
        let err = Error::CrossTagDependencyConflicts {
            conflicts: vec![
                conflict(2, 1, ConflictKind::Outgoing),
                conflict(4, 2, ConflictKind::Incoming),
                conflict(3, 2, ConflictKind::Incoming),
                conflict(4, 2, ConflictKind::Incoming),
            ],
            task_ids: vec![TaskId::new(2)],
        };
        let data = err.data();
        let suggestions = data["suggestions"].as_array().unwrap();
        assert_eq!(suggestions.len(), 3);
        assert!(suggestions[2].as_str().unwrap().contains("3,4"));

        let outgoing_only = Error::CrossTagDependencyConflicts {
            conflicts: vec![conflict(2, 1, ConflictKind::Outgoing)],
            task_ids: vec![TaskId::new(2)],
        };
        assert_eq!(outgoing_only.data()["suggestions"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_task_not_found_without_tag() {
        let err = Error::TaskNotFound {
            id: TaskId::new(9),
            tag: None,
        };
        assert_eq!(err.to_string(), "Task 9 not found");
        assert!(err.data()["tag"].is_null());
    }
}
