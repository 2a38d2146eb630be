//! Migration of tasks between tags.
//!
//! [`migrate`] is pure: it validates the request against a snapshot of the
//! document, resolves dependency conflicts according to the chosen
//! [`DependencyPolicy`], and returns a rewritten copy. Nothing touches disk
//! here; the caller saves the returned document once.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeSet, HashSet};
use std::fmt;
use tracing::{debug, info, warn};

use crate::models::graph::{ClosureOptions, dependency_closure};
use crate::models::{MoveHistoryEntry, TaggedData, Task, TaskId, TaskRef};
use crate::{Error, Result};

/// Closure depth used when pulling dependencies along.
pub const WITH_DEPENDENCIES_MAX_DEPTH: usize = 100;

/// What to do with dependency edges that would cross tags after the move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyPolicy {
    /// Refuse the move when any edge would cross tags
    #[default]
    Block,
    /// Drop the conflicting edges and move anyway
    IgnoreDependencies,
    /// Move the forward dependency closure along with the requested tasks
    WithDependencies,
}

impl fmt::Display for DependencyPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DependencyPolicy::Block => "block",
            DependencyPolicy::IgnoreDependencies => "ignore-dependencies",
            DependencyPolicy::WithDependencies => "with-dependencies",
        })
    }
}

/// A cross-tag migration request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationRequest {
    /// Raw ids as given by the caller
    pub task_ids: Vec<String>,
    pub source_tag: String,
    pub target_tag: String,
    pub policy: DependencyPolicy,
    /// Closure bound for [`DependencyPolicy::WithDependencies`]
    pub max_depth: usize,
}

impl MigrationRequest {
    pub fn new(task_ids: Vec<String>, source_tag: impl Into<String>, target_tag: impl Into<String>) -> Self {
        Self {
            task_ids,
            source_tag: source_tag.into(),
            target_tag: target_tag.into(),
            policy: DependencyPolicy::default(),
            max_depth: WITH_DEPENDENCIES_MAX_DEPTH,
        }
    }

    pub fn with_policy(mut self, policy: DependencyPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }
}

/// Direction of a conflicting edge relative to the moving set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// A moving task depends on a task that stays behind
    Outgoing,
    /// A task that stays behind depends on a moving task
    Incoming,
}

/// An edge `task_id -> dependency_id` that would span two tags.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct DependencyConflict {
    pub task_id: TaskId,
    pub dependency_id: TaskId,
    pub kind: ConflictKind,
}

/// A dependency reference removed under [`DependencyPolicy::IgnoreDependencies`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DroppedDependency {
    pub task_id: TaskId,
    pub dependency: TaskRef,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedTaskRecord {
    pub id: TaskId,
    pub from_tag: String,
    pub to_tag: String,
}

/// Outcome of a successful migration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationSummary {
    pub moved_tasks: Vec<MovedTaskRecord>,
    pub message: String,
    pub policy: DependencyPolicy,
    /// Follow-up advice, set when dependencies were ignored
    pub tips: Vec<String>,
    /// Ids that were not requested but moved as dependencies
    pub dependencies_added: Vec<TaskId>,
    pub dropped_dependencies: Vec<DroppedDependency>,
    /// Tags whose generated task files are stale
    pub changed_tags: Vec<String>,
    pub created_target_tag: bool,
}

/// Move tasks from one tag to another.
pub fn migrate(data: &TaggedData, request: &MigrationRequest, now: DateTime<Utc>) -> Result<(TaggedData, MigrationSummary)> {
    let source_tag = request.source_tag.as_str();
    let target_tag = request.target_tag.as_str();

    // 1. validate
    if source_tag == target_tag {
        return Err(Error::SourceTargetTagsSame {
            tag: source_tag.to_string(),
        });
    }
    let requested = parse_task_ids(&request.task_ids)?;
    let source = match data.get(source_tag) {
        Some(tag) if !tag.tasks.is_empty() => tag,
        _ => {
            return Err(Error::InvalidSourceTag {
                tag: source_tag.to_string(),
            });
        }
    };

    // 2. select
    for id in &requested {
        if !source.contains(*id) {
            return Err(Error::TaskNotFound {
                id: *id,
                tag: Some(source_tag.to_string()),
            });
        }
    }

    // 3. dependencies
    let mut moving: BTreeSet<TaskId> = requested.iter().copied().collect();
    let mut dependencies_added = Vec::new();
    if request.policy == DependencyPolicy::WithDependencies {
        let closure = dependency_closure(
            &requested,
            &source.tasks,
            ClosureOptions {
                max_depth: request.max_depth,
                include_self: false,
            },
        );
        dependencies_added = closure.difference(&moving).copied().collect();
        moving.extend(closure);
        debug!(added = ?dependencies_added, "expanded move set with dependencies");
    }

    let conflicts = find_conflicts(&source.tasks, &moving);
    if !conflicts.is_empty() && request.policy != DependencyPolicy::IgnoreDependencies {
        let task_ids: BTreeSet<TaskId> = conflicts.iter().map(|c| c.task_id).collect();
        return Err(Error::CrossTagDependencyConflicts {
            conflicts,
            task_ids: task_ids.into_iter().collect(),
        });
    }

    // 4. collisions
    if let Some(target) = data.get(target_tag) {
        if let Some(id) = moving.iter().find(|id| target.contains(**id)) {
            return Err(Error::TaskAlreadyExists {
                id: *id,
                tag: Some(target_tag.to_string()),
                suggestions: vec![
                    "Choose a different target tag".to_string(),
                    format!(
                        "Renumber task {} first: tg move --from {} --to <free-id> --tag {}",
                        id, id, source_tag
                    ),
                    format!("Move the conflicting task out of \"{}\" first", target_tag),
                ],
            });
        }
    }

    // 5. execute on a copy
    let mut out = data.clone();
    let mut dropped_dependencies = Vec::new();
    let moved = {
        let Some(source) = out.get_mut(source_tag) else {
            return Err(Error::InvalidSourceTag {
                tag: source_tag.to_string(),
            });
        };
        if !conflicts.is_empty() {
            dropped_dependencies = drop_conflicting_edges(&mut source.tasks, &moving);
        }
        let (moved, remaining): (Vec<Task>, Vec<Task>) =
            std::mem::take(&mut source.tasks).into_iter().partition(|t| moving.contains(&t.id));
        source.tasks = remaining;
        moved
    };

    let created_target_tag = !data.contains_tag(target_tag);
    let target = out.entry_or_create(target_tag, || {
        format!("Tag created by moving tasks from \"{}\"", source_tag)
    });
    let mut moved_tasks = Vec::with_capacity(moved.len());
    for mut task in moved {
        task.tag = Some(target_tag.to_string());
        task.push_move_history(MoveHistoryEntry {
            from_tag: source_tag.to_string(),
            to_tag: target_tag.to_string(),
            timestamp: now,
        });
        moved_tasks.push(MovedTaskRecord {
            id: task.id,
            from_tag: source_tag.to_string(),
            to_tag: target_tag.to_string(),
        });
        target.tasks.push(task);
    }

    // 6. summarize
    let mut message = format!(
        "Successfully moved {} task(s) from \"{}\" to \"{}\"",
        moved_tasks.len(),
        source_tag,
        target_tag
    );
    if !dependencies_added.is_empty() {
        message.push_str(&format!(
            " (including {} dependenc{})",
            dependencies_added.len(),
            if dependencies_added.len() == 1 { "y" } else { "ies" }
        ));
    }

    let tips = if request.policy == DependencyPolicy::IgnoreDependencies {
        vec![
            format!("Run `tg validate --tag {}` to check the tasks left behind", source_tag),
            format!("Run `tg validate --tag {}` to check the moved tasks", target_tag),
        ]
    } else {
        Vec::new()
    };
    for dropped in &dropped_dependencies {
        warn!(task = %dropped.task_id, dependency = %dropped.dependency, "dropped cross-tag dependency");
    }
    info!(
        from = source_tag,
        to = target_tag,
        count = moved_tasks.len(),
        policy = %request.policy,
        "migrated tasks"
    );

    Ok((
        out,
        MigrationSummary {
            moved_tasks,
            message,
            policy: request.policy,
            tips,
            dependencies_added,
            dropped_dependencies,
            changed_tags: vec![source_tag.to_string(), target_tag.to_string()],
            created_target_tag,
        },
    ))
}

/// Parse requested ids, rejecting subtasks. Duplicates collapse, order is kept.
fn parse_task_ids(raw: &[String]) -> Result<Vec<TaskId>> {
    if raw.is_empty() {
        return Err(Error::InvalidInput("No task IDs given".to_string()));
    }
    let mut seen = HashSet::new();
    let mut ids = Vec::with_capacity(raw.len());
    for value in raw {
        let value = value.trim();
        if value.contains('.') {
            return Err(Error::CannotMoveSubtask {
                id: value.to_string(),
            });
        }
        let id: TaskId = value.parse()?;
        if seen.insert(id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

/// Edges between `moving` and the rest of `scope`, in both directions.
///
/// References to ids absent from `scope` are already dangling and are not
/// reported.
pub fn find_conflicts(scope: &[Task], moving: &BTreeSet<TaskId>) -> Vec<DependencyConflict> {
    let present: HashSet<TaskId> = scope.iter().map(|t| t.id).collect();
    let mut conflicts = Vec::new();
    for task in scope {
        let is_moving = moving.contains(&task.id);
        for dep in task.outgoing_task_ids() {
            if !present.contains(&dep) || moving.contains(&dep) == is_moving {
                continue;
            }
            conflicts.push(DependencyConflict {
                task_id: task.id,
                dependency_id: dep,
                kind: if is_moving {
                    ConflictKind::Outgoing
                } else {
                    ConflictKind::Incoming
                },
            });
        }
    }
    conflicts.sort();
    conflicts
}

/// Remove every reference that links `moving` with the tasks staying in `tasks`.
fn drop_conflicting_edges(tasks: &mut [Task], moving: &BTreeSet<TaskId>) -> Vec<DroppedDependency> {
    let staying: HashSet<TaskId> = tasks
        .iter()
        .map(|t| t.id)
        .filter(|id| !moving.contains(id))
        .collect();

    let mut dropped = Vec::new();
    for task in tasks.iter_mut() {
        let removed = if moving.contains(&task.id) {
            task.remove_refs_to(&|id: TaskId| staying.contains(&id))
        } else {
            task.remove_refs_to(&|id: TaskId| moving.contains(&id))
        };
        dropped.extend(removed.into_iter().map(|dependency| DroppedDependency {
            task_id: task.id,
            dependency,
        }));
    }
    dropped
}
