//! Graph algorithms for task dependency analysis.
//!
//! This module walks the dependency edges of a bounded task set (normally one
//! tag). Edges are task-level: every reference is reduced to its parent task
//! id before traversal, and references to tasks outside the set are ignored.

use serde::Serialize;
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use crate::models::{TaggedData, Task, TaskId, TaskRef};

/// Default traversal bound for [`DependencyIndex::closure`].
pub const DEFAULT_MAX_DEPTH: usize = 50;

/// Options for a forward dependency closure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClosureOptions {
    /// Maximum number of hops followed from any source
    pub max_depth: usize,
    /// Whether the source ids themselves belong in the result
    pub include_self: bool,
}

impl Default for ClosureOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            include_self: false,
        }
    }
}

/// Outgoing task-level edges for a set of tasks.
#[derive(Debug, Clone, Default)]
pub struct DependencyIndex {
    /// Maps each task to the in-scope tasks it depends on
    edges: HashMap<TaskId, Vec<TaskId>>,
}

impl DependencyIndex {
    /// Build the index over `scope`. Edges leaving the scope are dropped.
    pub fn from_tasks(scope: &[Task]) -> Self {
        let present: HashSet<TaskId> = scope.iter().map(|t| t.id).collect();
        let edges = scope
            .iter()
            .map(|task| {
                let deps = task
                    .outgoing_task_ids()
                    .into_iter()
                    .filter(|id| present.contains(id))
                    .collect();
                (task.id, deps)
            })
            .collect();
        Self { edges }
    }

    /// Direct in-scope dependencies of `id`.
    pub fn dependencies_of(&self, id: TaskId) -> &[TaskId] {
        self.edges.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Tasks in scope that depend directly on `id`.
    pub fn dependents_of(&self, id: TaskId) -> Vec<TaskId> {
        let mut dependents: Vec<TaskId> = self
            .edges
            .iter()
            .filter(|(_, deps)| deps.contains(&id))
            .map(|(task, _)| *task)
            .collect();
        dependents.sort();
        dependents
    }

    /// Forward closure from `sources`.
    ///
    /// Breadth-first, bounded by `options.max_depth`, and de-duplicated through
    /// a visited set so cycles terminate.
    pub fn closure(&self, sources: &[TaskId], options: ClosureOptions) -> BTreeSet<TaskId> {
        let mut visited: HashSet<TaskId> = HashSet::new();
        let mut queue: VecDeque<(TaskId, usize)> = VecDeque::new();

        for source in sources {
            if visited.insert(*source) {
                queue.push_back((*source, 0));
            }
        }

        while let Some((current, depth)) = queue.pop_front() {
            if depth >= options.max_depth {
                continue;
            }
            for dep in self.dependencies_of(current) {
                if visited.insert(*dep) {
                    queue.push_back((*dep, depth + 1));
                }
            }
        }

        let mut result: BTreeSet<TaskId> = visited.into_iter().collect();
        if !options.include_self {
            for source in sources {
                result.remove(source);
            }
        }
        result
    }
}

/// Forward dependency closure of `sources` within `scope`.
pub fn dependency_closure(
    sources: &[TaskId],
    scope: &[Task],
    options: ClosureOptions,
) -> BTreeSet<TaskId> {
    DependencyIndex::from_tasks(scope).closure(sources, options)
}

/// A problem found by [`validate_tag`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityIssue {
    /// A reference whose target does not exist in the tag
    DanglingReference {
        task_id: TaskId,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtask_id: Option<TaskId>,
        reference: TaskRef,
        /// Other tags holding a task with the referenced parent id
        found_in: Vec<String>,
    },
    /// A reference that is not a task or subtask id at all
    UnresolvedReference {
        task_id: TaskId,
        #[serde(skip_serializing_if = "Option::is_none")]
        subtask_id: Option<TaskId>,
        reference: TaskRef,
    },
    DuplicateTaskId { task_id: TaskId },
    DuplicateSubtaskId { task_id: TaskId, subtask_id: TaskId },
}

/// Report dangling references and duplicate ids in one tag. Never repairs.
///
/// Returns `None` when `tag` does not exist.
pub fn validate_tag(data: &TaggedData, tag: &str) -> Option<Vec<IntegrityIssue>> {
    let tasks = &data.get(tag)?.tasks;
    let mut issues = Vec::new();

    let mut seen = HashSet::new();
    for task in tasks {
        if !seen.insert(task.id) {
            issues.push(IntegrityIssue::DuplicateTaskId { task_id: task.id });
        }
        let mut subs = HashSet::new();
        for sub in &task.subtasks {
            if !subs.insert(sub.id) {
                issues.push(IntegrityIssue::DuplicateSubtaskId {
                    task_id: task.id,
                    subtask_id: sub.id,
                });
            }
        }
    }

    let resolves = |dep: &TaskRef| match dep {
        TaskRef::Task(id) => tasks.iter().any(|t| t.id == *id),
        TaskRef::Subtask { parent, sub } => tasks
            .iter()
            .any(|t| t.id == *parent && t.subtask(*sub).is_some()),
        TaskRef::Unresolved(_) => false,
    };
    let found_in = |dep: &TaskRef| -> Vec<String> {
        let Some(id) = dep.normalize() else {
            return Vec::new();
        };
        data.iter()
            .filter(|(name, other)| name.as_str() != tag && other.contains(id))
            .map(|(name, _)| name.clone())
            .collect()
    };
    let mut check = |task: &Task, subtask_id: Option<TaskId>, dep: &TaskRef| {
        if let TaskRef::Unresolved(_) = dep {
            issues.push(IntegrityIssue::UnresolvedReference {
                task_id: task.id,
                subtask_id,
                reference: dep.clone(),
            });
        } else if !resolves(dep) {
            issues.push(IntegrityIssue::DanglingReference {
                task_id: task.id,
                subtask_id,
                reference: dep.clone(),
                found_in: found_in(dep),
            });
        }
    };

    for task in tasks {
        for dep in &task.dependencies {
            check(task, None, dep);
        }
        for sub in &task.subtasks {
            for dep in &sub.dependencies {
                // Bare ids naming a sibling are always local
                if matches!(dep, TaskRef::Task(id) if task.subtask(*id).is_some()) {
                    continue;
                }
                check(task, Some(sub.id), dep);
            }
        }
    }
    Some(issues)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::task;

    fn ids(set: &BTreeSet<TaskId>) -> Vec<u32> {
        set.iter().map(|id| id.get()).collect()
    }

    #[test]
    fn test_closure_terminates_on_cycle() {
        // 1 -> 2 -> 3 -> 1
        let scope = vec![task(1, &[2]), task(2, &[3]), task(3, &[1])];
        let options = ClosureOptions {
            max_depth: 10,
            include_self: false,
        };
        let result = dependency_closure(&[TaskId::new(1)], &scope, options);
        assert_eq!(ids(&result), vec![2, 3]);
    }

    #[test]
    fn test_closure_include_self() {
        let scope = vec![task(1, &[2]), task(2, &[])];
        let options = ClosureOptions {
            include_self: true,
            ..Default::default()
        };
        let result = dependency_closure(&[TaskId::new(1)], &scope, options);
        assert_eq!(ids(&result), vec![1, 2]);
    }

    #[test]
    fn test_closure_respects_max_depth() {
        // 1 -> 2 -> 3 -> 4
        let scope = vec![task(1, &[2]), task(2, &[3]), task(3, &[4]), task(4, &[])];
        let options = ClosureOptions {
            max_depth: 2,
            include_self: false,
        };
        let result = dependency_closure(&[TaskId::new(1)], &scope, options);
        assert_eq!(ids(&result), vec![2, 3]);
    }

    #[test]
    fn test_closure_ignores_out_of_scope_refs() {
        let scope = vec![task(1, &[2, 99]), task(2, &[])];
        let result = dependency_closure(&[TaskId::new(1)], &scope, ClosureOptions::default());
        assert_eq!(ids(&result), vec![2]);
    }

    #[test]
    fn test_closure_multiple_sources_exclude_each_other() {
        // Both sources excluded even when one depends on the other
        let scope = vec![task(1, &[2]), task(2, &[3]), task(3, &[])];
        let result = dependency_closure(
            &[TaskId::new(1), TaskId::new(2)],
            &scope,
            ClosureOptions::default(),
        );
        assert_eq!(ids(&result), vec![3]);
    }

    #[test]
    fn test_dependents_of() {
        let scope = vec![task(1, &[]), task(2, &[1]), task(3, &[1, 2])];
        let index = DependencyIndex::from_tasks(&scope);
        assert_eq!(
            index.dependents_of(TaskId::new(1)),
            vec![TaskId::new(2), TaskId::new(3)]
        );
        assert!(index.dependents_of(TaskId::new(3)).is_empty());
    }

    #[test]
    fn test_diamond_visits_once() {
        // 1 -> {2, 3} -> 4
        let scope = vec![task(1, &[2, 3]), task(2, &[4]), task(3, &[4]), task(4, &[])];
        let result = dependency_closure(&[TaskId::new(1)], &scope, ClosureOptions::default());
        assert_eq!(ids(&result), vec![2, 3, 4]);
    }

    #[test]
    fn test_validate_tag_reports_dangling_and_cross_tag_refs() {
        use crate::test_utils::{subtask, tagged};

        let mut parent = task(1, &[]);
        let mut sub = subtask(1);
        sub.dependencies = vec![
            TaskRef::Task(TaskId::new(2)),
            TaskRef::Subtask {
                parent: TaskId::new(1),
                sub: TaskId::new(9),
            },
        ];
        parent.subtasks = vec![sub, subtask(2)];
        let data = tagged(vec![
            ("a", vec![parent, task(3, &[4]), task(3, &[])]),
            ("b", vec![task(4, &[])]),
        ]);

        let issues = validate_tag(&data, "a").unwrap();
        assert!(issues.contains(&IntegrityIssue::DuplicateTaskId {
            task_id: TaskId::new(3)
        }));
        assert!(issues.contains(&IntegrityIssue::DanglingReference {
            task_id: TaskId::new(3),
            subtask_id: None,
            reference: TaskRef::Task(TaskId::new(4)),
            found_in: vec!["b".to_string()],
        }));
        assert!(issues.contains(&IntegrityIssue::DanglingReference {
            task_id: TaskId::new(1),
            subtask_id: Some(TaskId::new(1)),
            reference: TaskRef::Subtask {
                parent: TaskId::new(1),
                sub: TaskId::new(9),
            },
            found_in: vec![],
        }));
        // Subtask 1 -> sibling 2 is fine
        assert_eq!(issues.len(), 3);

        assert!(validate_tag(&data, "b").unwrap().is_empty());
        assert!(validate_tag(&data, "missing").is_none());
    }

    #[test]
    fn test_validate_tag_flags_unresolved() {
        use crate::test_utils::tagged;

        let mut t = task(1, &[]);
        t.dependencies.push(TaskRef::Unresolved("soon".to_string()));
        let data = tagged(vec![("a", vec![t])]);
        let issues = validate_tag(&data, "a").unwrap();
        let json = serde_json::to_value(&issues).unwrap();
        assert_eq!(json[0]["kind"], "unresolved_reference");
        assert_eq!(json[0]["reference"], "soon");
    }
}
