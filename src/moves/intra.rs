//! Repositioning within a single tag.
//!
//! Every operation takes an immutable snapshot of a tag's task list and
//! returns a new list. Ids are relabeled as needed and every dependency that
//! pointed at the moved item is rewritten to its new address.

use serde::Serialize;
use tracing::debug;

use crate::models::{ItemRef, Subtask, Task, TaskId, TaskRef};
use crate::{Error, Result};

/// Which of the move shapes was performed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveKind {
    TaskToTask,
    SubtaskReorder,
    SubtaskToSubtask,
    SubtaskToTask,
    TaskToSubtask,
}

/// Result of one successful intra-tag move.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MovedItem {
    pub kind: MoveKind,
    /// Where the item was
    pub from: ItemRef,
    /// Where the item is now (may differ from the requested destination)
    pub to: ItemRef,
    /// Requested destination
    pub requested: ItemRef,
    pub title: String,
}

impl MovedItem {
    /// One-line description for human output.
    pub fn describe(&self) -> String {
        match self.kind {
            MoveKind::SubtaskReorder => format!(
                "Reordered subtask {} \"{}\" to follow {}",
                self.from, self.title, self.requested
            ),
            _ if self.to != self.requested => format!(
                "Moved {} \"{}\" to {} ({} was taken)",
                self.from, self.title, self.to, self.requested
            ),
            _ => format!("Moved {} \"{}\" to {}", self.from, self.title, self.to),
        }
    }
}

/// Move one item inside a tag.
///
/// Dispatches on whether `source` and `dest` are tasks or subtasks.
pub fn move_item(tasks: &[Task], source: ItemRef, dest: ItemRef) -> Result<(Vec<Task>, MovedItem)> {
    if source == dest {
        return Err(Error::InvalidInput(format!(
            "Cannot move {} onto itself",
            source
        )));
    }
    debug!(%source, %dest, "intra-tag move");

    match (source, dest) {
        (ItemRef::Task(from), ItemRef::Task(to)) => task_to_task(tasks, from, to),
        (ItemRef::Subtask(parent, sub), ItemRef::Subtask(dest_parent, dest_sub)) => {
            if parent == dest_parent {
                reorder_subtask(tasks, parent, sub, dest_sub)
            } else {
                subtask_to_subtask(tasks, (parent, sub), (dest_parent, dest_sub))
            }
        }
        (ItemRef::Subtask(parent, sub), ItemRef::Task(to)) => subtask_to_task(tasks, parent, sub, to),
        (ItemRef::Task(from), ItemRef::Subtask(parent, sub)) => task_to_subtask(tasks, from, parent, sub),
    }
}

/// Insert `item` immediately after `anchor`, or append when there is none.
pub fn insert_after<T: Clone>(items: &[T], item: T, anchor: Option<usize>) -> Vec<T> {
    let at = match anchor {
        Some(i) if i < items.len() => i + 1,
        _ => items.len(),
    };
    let mut out = Vec::with_capacity(items.len() + 1);
    out.extend_from_slice(&items[..at]);
    out.push(item);
    out.extend_from_slice(&items[at..]);
    out
}

/// Insert `task` keeping the list in ascending id order.
pub fn insert_sorted(tasks: &[Task], task: Task) -> Vec<Task> {
    let at = tasks.iter().position(|t| t.id > task.id);
    match at {
        Some(0) => {
            let mut out = Vec::with_capacity(tasks.len() + 1);
            out.push(task);
            out.extend_from_slice(tasks);
            out
        }
        Some(i) => insert_after(tasks, task, Some(i - 1)),
        None => insert_after(tasks, task, None),
    }
}

fn find_task(tasks: &[Task], id: TaskId) -> Option<usize> {
    tasks.iter().position(|t| t.id == id)
}

fn already_exists(id: TaskId) -> Error {
    Error::TaskAlreadyExists {
        id,
        tag: None,
        suggestions: vec![
            format!("Task {} is taken; choose an unused destination ID", id),
            format!("Move task {} elsewhere first", id),
        ],
    }
}

/// Locate `parent.sub`, returning (task index, subtask index).
fn locate_subtask(tasks: &[Task], parent: TaskId, sub: TaskId) -> Result<(usize, usize)> {
    let ti = find_task(tasks, parent).ok_or(Error::ParentTaskNotFound { parent_id: parent })?;
    let subtasks = &tasks[ti].subtasks;
    if subtasks.is_empty() {
        return Err(Error::ParentTaskNoSubtasks { parent_id: parent });
    }
    let si = subtasks
        .iter()
        .position(|s| s.id == sub)
        .ok_or(Error::SubtaskNotFound { parent_id: parent, id: sub })?;
    Ok((ti, si))
}

/// Place `subtask` in `subtasks` at `requested`.
///
/// It goes right after the subtask currently holding `requested`, else at the
/// end. If `requested` is taken the next free id in the list is used instead.
fn place_subtask(subtasks: &[Subtask], mut subtask: Subtask, requested: TaskId) -> (Vec<Subtask>, TaskId) {
    let anchor = subtasks.iter().position(|s| s.id == requested);
    let id = match anchor {
        Some(_) => subtasks
            .iter()
            .map(|s| s.id)
            .max()
            .map(TaskId::next)
            .unwrap_or(requested),
        None => requested,
    };
    subtask.id = id;
    (insert_after(subtasks, subtask, anchor), id)
}

fn rewrite_all<F>(tasks: &mut [Task], rewrite: F)
where
    F: Fn(&TaskRef) -> Option<TaskRef>,
{
    for task in tasks.iter_mut() {
        task.rewrite_refs(&rewrite);
    }
}

/// Spell out bare sibling references of a subtask leaving `parent`.
fn qualify_sibling_refs(deps: &mut [TaskRef], parent: &Task, leaving: TaskId) {
    for dep in deps.iter_mut() {
        if let TaskRef::Task(id) = *dep {
            if id != leaving && parent.subtask(id).is_some() {
                *dep = TaskRef::Subtask {
                    parent: parent.id,
                    sub: id,
                };
            }
        }
    }
}

/// Point former siblings' bare references to `parent.sub` at `new_ref`.
fn retarget_sibling_refs(tasks: &mut [Task], parent: TaskId, sub: TaskId, new_ref: TaskRef) {
    let Some(old_parent) = tasks.iter_mut().find(|t| t.id == parent) else {
        return;
    };
    for sibling in old_parent.subtasks.iter_mut() {
        for dep in sibling.dependencies.iter_mut() {
            if *dep == TaskRef::Task(sub) {
                *dep = new_ref.clone();
            }
        }
    }
}

fn task_to_task(tasks: &[Task], from: TaskId, to: TaskId) -> Result<(Vec<Task>, MovedItem)> {
    if find_task(tasks, to).is_some() {
        return Err(already_exists(to));
    }
    let idx = find_task(tasks, from).ok_or(Error::TaskNotFound { id: from, tag: None })?;

    let mut moved = tasks[idx].clone();
    moved.id = to;
    let title = moved.title.clone();

    let mut out: Vec<Task> = tasks
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != idx)
        .map(|(_, t)| t.clone())
        .collect();
    out.push(moved);

    rewrite_all(&mut out, |dep| match dep {
        TaskRef::Task(id) if *id == from => Some(TaskRef::Task(to)),
        TaskRef::Subtask { parent, sub } if *parent == from => Some(TaskRef::Subtask {
            parent: to,
            sub: *sub,
        }),
        _ => None,
    });

    Ok((
        out,
        MovedItem {
            kind: MoveKind::TaskToTask,
            from: ItemRef::Task(from),
            to: ItemRef::Task(to),
            requested: ItemRef::Task(to),
            title,
        },
    ))
}

fn reorder_subtask(tasks: &[Task], parent: TaskId, sub: TaskId, after: TaskId) -> Result<(Vec<Task>, MovedItem)> {
    let (ti, si) = locate_subtask(tasks, parent, sub)?;
    let mut out = tasks.to_vec();

    let subtasks = &tasks[ti].subtasks;
    let moving = subtasks[si].clone();
    let title = moving.title.clone();
    let rest: Vec<Subtask> = subtasks
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != si)
        .map(|(_, s)| s.clone())
        .collect();
    let anchor = rest.iter().position(|s| s.id == after);
    out[ti].subtasks = insert_after(&rest, moving, anchor);

    Ok((
        out,
        MovedItem {
            kind: MoveKind::SubtaskReorder,
            from: ItemRef::Subtask(parent, sub),
            to: ItemRef::Subtask(parent, sub),
            requested: ItemRef::Subtask(parent, after),
            title,
        },
    ))
}

fn subtask_to_subtask(
    tasks: &[Task],
    (parent, sub): (TaskId, TaskId),
    (dest_parent, dest_sub): (TaskId, TaskId),
) -> Result<(Vec<Task>, MovedItem)> {
    let (ti, si) = locate_subtask(tasks, parent, sub)?;
    let di = find_task(tasks, dest_parent).ok_or(Error::DestinationTaskNotFound { id: dest_parent })?;

    let mut moving = tasks[ti].subtasks[si].clone();
    let title = moving.title.clone();
    qualify_sibling_refs(&mut moving.dependencies, &tasks[ti], sub);

    let mut out = tasks.to_vec();
    let (placed, assigned) = place_subtask(&tasks[di].subtasks, moving, dest_sub);
    out[di].subtasks = placed;
    out[ti].subtasks.remove(si);

    let new_ref = TaskRef::Subtask {
        parent: dest_parent,
        sub: assigned,
    };
    rewrite_all(&mut out, |dep| match dep {
        TaskRef::Subtask { parent: p, sub: s } if *p == parent && *s == sub => Some(new_ref.clone()),
        _ => None,
    });
    retarget_sibling_refs(&mut out, parent, sub, new_ref);

    Ok((
        out,
        MovedItem {
            kind: MoveKind::SubtaskToSubtask,
            from: ItemRef::Subtask(parent, sub),
            to: ItemRef::Subtask(dest_parent, assigned),
            requested: ItemRef::Subtask(dest_parent, dest_sub),
            title,
        },
    ))
}

fn subtask_to_task(tasks: &[Task], parent: TaskId, sub: TaskId, to: TaskId) -> Result<(Vec<Task>, MovedItem)> {
    if find_task(tasks, to).is_some() {
        return Err(already_exists(to));
    }
    let (ti, si) = locate_subtask(tasks, parent, sub)?;

    let mut promoted = tasks[ti].subtasks[si].clone().into_task(to);
    let title = promoted.title.clone();
    // Bare sibling ids would read as top-level tasks once promoted
    qualify_sibling_refs(&mut promoted.dependencies, &tasks[ti], sub);

    let mut remaining = tasks.to_vec();
    remaining[ti].subtasks.remove(si);
    let mut out = insert_sorted(&remaining, promoted);

    rewrite_all(&mut out, |dep| match dep {
        TaskRef::Subtask { parent: p, sub: s } if *p == parent && *s == sub => Some(TaskRef::Task(to)),
        _ => None,
    });
    retarget_sibling_refs(&mut out, parent, sub, TaskRef::Task(to));

    Ok((
        out,
        MovedItem {
            kind: MoveKind::SubtaskToTask,
            from: ItemRef::Subtask(parent, sub),
            to: ItemRef::Task(to),
            requested: ItemRef::Task(to),
            title,
        },
    ))
}

fn task_to_subtask(tasks: &[Task], from: TaskId, parent: TaskId, dest_sub: TaskId) -> Result<(Vec<Task>, MovedItem)> {
    if from == parent {
        return Err(Error::InvalidInput(format!(
            "Cannot move task {} under itself",
            from
        )));
    }
    let si = find_task(tasks, from).ok_or(Error::TaskNotFound { id: from, tag: None })?;
    let pi = find_task(tasks, parent).ok_or(Error::ParentTaskNotFound { parent_id: parent })?;

    let source = &tasks[si];
    if !source.subtasks.is_empty() {
        return Err(Error::TaskHasSubtasks {
            id: from,
            count: source.subtasks.len(),
        });
    }
    let title = source.title.clone();
    let demoted = source.clone().into_subtask(dest_sub);

    let mut out = tasks.to_vec();
    let (placed, assigned) = place_subtask(&tasks[pi].subtasks, demoted, dest_sub);
    out[pi].subtasks = placed;
    out.remove(si);

    rewrite_all(&mut out, |dep| match dep {
        TaskRef::Task(id) if *id == from => Some(TaskRef::Subtask {
            parent,
            sub: assigned,
        }),
        _ => None,
    });

    Ok((
        out,
        MovedItem {
            kind: MoveKind::TaskToSubtask,
            from: ItemRef::Task(from),
            to: ItemRef::Subtask(parent, assigned),
            requested: ItemRef::Subtask(parent, dest_sub),
            title,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{subtask, task};
    use std::collections::HashSet;

    fn id(n: u32) -> TaskId {
        TaskId::new(n)
    }

    fn ids(tasks: &[Task]) -> Vec<u32> {
        tasks.iter().map(|t| t.id.get()).collect()
    }

    fn sub_ids(task: &Task) -> Vec<u32> {
        task.subtasks.iter().map(|s| s.id.get()).collect()
    }

    fn get(tasks: &[Task], n: u32) -> &Task {
        tasks.iter().find(|t| t.id == id(n)).unwrap()
    }

    fn assert_unique(tasks: &[Task]) {
        let mut seen = HashSet::new();
        for t in tasks {
            assert!(seen.insert(t.id), "duplicate task id {}", t.id);
            let mut subs = HashSet::new();
            for s in &t.subtasks {
                assert!(subs.insert(s.id), "duplicate subtask id {}.{}", t.id, s.id);
            }
        }
    }

    fn with_subtasks(n: u32, subs: &[u32]) -> Task {
        let mut t = task(n, &[]);
        t.subtasks = subs.iter().map(|s| subtask(*s)).collect();
        t
    }

    #[test]
    fn test_insert_after() {
        assert_eq!(insert_after(&[1, 2, 3], 9, Some(0)), vec![1, 9, 2, 3]);
        assert_eq!(insert_after(&[1, 2, 3], 9, Some(2)), vec![1, 2, 3, 9]);
        assert_eq!(insert_after(&[1, 2, 3], 9, None), vec![1, 2, 3, 9]);
        assert_eq!(insert_after(&[], 9, None), vec![9]);
        // Out-of-range anchors append
        assert_eq!(insert_after(&[1], 9, Some(7)), vec![1, 9]);
    }

    #[test]
    fn test_insert_sorted() {
        let tasks = vec![task(2, &[]), task(5, &[])];
        assert_eq!(ids(&insert_sorted(&tasks, task(1, &[]))), vec![1, 2, 5]);
        assert_eq!(ids(&insert_sorted(&tasks, task(3, &[]))), vec![2, 3, 5]);
        assert_eq!(ids(&insert_sorted(&tasks, task(8, &[]))), vec![2, 5, 8]);
    }

    #[test]
    fn test_task_to_task_rewrites_dependencies() {
        let mut dependent = task(3, &[1]);
        let mut sub = subtask(1);
        sub.dependencies = vec![TaskRef::Subtask { parent: id(1), sub: id(2) }];
        dependent.subtasks.push(sub);
        let tasks = vec![with_subtasks(1, &[1, 2]), task(2, &[1]), dependent];

        let (out, moved) = move_item(&tasks, ItemRef::Task(id(1)), ItemRef::Task(id(10))).unwrap();
        assert_eq!(moved.kind, MoveKind::TaskToTask);
        assert_eq!(ids(&out), vec![2, 3, 10]);
        assert_eq!(get(&out, 2).dependencies, vec![TaskRef::Task(id(10))]);
        assert_eq!(get(&out, 3).dependencies, vec![TaskRef::Task(id(10))]);
        assert_eq!(
            get(&out, 3).subtasks[0].dependencies,
            vec![TaskRef::Subtask { parent: id(10), sub: id(2) }]
        );
        assert_eq!(sub_ids(get(&out, 10)), vec![1, 2]);
        assert_unique(&out);
    }

    fn with_sibling_link(n: u32) -> Task {
        let mut parent = with_subtasks(n, &[1, 2]);
        parent.subtasks[1].dependencies = vec![TaskRef::Task(id(1))];
        parent
    }

    #[test]
    fn test_task_to_task_keeps_sibling_refs() {
        let tasks = vec![task(1, &[]), with_sibling_link(5)];

        let (out, _) = move_item(&tasks, ItemRef::Task(id(1)), ItemRef::Task(id(10))).unwrap();
        assert_eq!(get(&out, 5).subtasks[1].dependencies, vec![TaskRef::Task(id(1))]);
    }

    #[test]
    fn test_task_to_subtask_keeps_sibling_refs() {
        let tasks = vec![task(1, &[]), with_sibling_link(5), task(7, &[])];

        let (out, _) = move_item(&tasks, ItemRef::Task(id(1)), ItemRef::Subtask(id(7), id(1))).unwrap();
        assert_eq!(get(&out, 5).subtasks[1].dependencies, vec![TaskRef::Task(id(1))]);
        assert_eq!(sub_ids(get(&out, 7)), vec![1]);
    }

    #[test]
    fn test_subtask_bare_ref_to_task_is_rewritten() {
        // 5.1 has no sibling 3, so its bare 3 names top-level task 3
        let mut parent = with_subtasks(5, &[1]);
        parent.subtasks[0].dependencies = vec![TaskRef::Task(id(3))];
        let tasks = vec![task(3, &[]), parent];

        let (out, _) = move_item(&tasks, ItemRef::Task(id(3)), ItemRef::Task(id(8))).unwrap();
        assert_eq!(get(&out, 5).subtasks[0].dependencies, vec![TaskRef::Task(id(8))]);
    }

    #[test]
    fn test_task_to_task_refuses_overwrite() {
        let tasks = vec![task(1, &[]), task(2, &[])];
        let err = move_item(&tasks, ItemRef::Task(id(1)), ItemRef::Task(id(2))).unwrap_err();
        assert_eq!(err.code(), "TASK_ALREADY_EXISTS");
    }

    #[test]
    fn test_task_to_task_missing_source() {
        let tasks = vec![task(1, &[])];
        let err = move_item(&tasks, ItemRef::Task(id(4)), ItemRef::Task(id(5))).unwrap_err();
        assert_eq!(err.code(), "TASK_NOT_FOUND");
    }

    #[test]
    fn test_move_onto_itself() {
        let tasks = vec![task(1, &[])];
        let err = move_item(&tasks, ItemRef::Task(id(1)), ItemRef::Task(id(1))).unwrap_err();
        assert_eq!(err.code(), "INVALID_INPUT");
    }

    #[test]
    fn test_reorder_within_parent() {
        let tasks = vec![with_subtasks(1, &[1, 2, 3, 4])];
        let (out, moved) = move_item(
            &tasks,
            ItemRef::Subtask(id(1), id(1)),
            ItemRef::Subtask(id(1), id(3)),
        )
        .unwrap();
        assert_eq!(moved.kind, MoveKind::SubtaskReorder);
        assert_eq!(sub_ids(&out[0]), vec![2, 3, 1, 4]);

        // Unknown anchor appends
        let (out, _) = move_item(
            &tasks,
            ItemRef::Subtask(id(1), id(2)),
            ItemRef::Subtask(id(1), id(9)),
        )
        .unwrap();
        assert_eq!(sub_ids(&out[0]), vec![1, 3, 4, 2]);
    }

    #[test]
    fn test_subtask_to_other_parent() {
        let mut tasks = vec![with_subtasks(1, &[1, 2]), with_subtasks(2, &[1, 2]), task(3, &[])];
        tasks[2].dependencies = vec![TaskRef::Subtask { parent: id(1), sub: id(2) }];

        let (out, moved) = move_item(
            &tasks,
            ItemRef::Subtask(id(1), id(2)),
            ItemRef::Subtask(id(2), id(5)),
        )
        .unwrap();
        assert_eq!(moved.to, ItemRef::Subtask(id(2), id(5)));
        assert_eq!(sub_ids(get(&out, 1)), vec![1]);
        assert_eq!(sub_ids(get(&out, 2)), vec![1, 2, 5]);
        assert_eq!(
            get(&out, 3).dependencies,
            vec![TaskRef::Subtask { parent: id(2), sub: id(5) }]
        );
        assert_unique(&out);
    }

    #[test]
    fn test_subtask_to_other_parent_keeps_sibling_links() {
        let mut source = with_subtasks(1, &[1, 2, 3]);
        source.subtasks[1].dependencies = vec![TaskRef::Task(id(1))];
        source.subtasks[2].dependencies = vec![TaskRef::Task(id(2))];
        let tasks = vec![source, with_subtasks(2, &[1])];

        let (out, _) = move_item(
            &tasks,
            ItemRef::Subtask(id(1), id(2)),
            ItemRef::Subtask(id(2), id(2)),
        )
        .unwrap();
        let moved = get(&out, 2).subtask(id(2)).unwrap();
        assert_eq!(
            moved.dependencies,
            vec![TaskRef::Subtask { parent: id(1), sub: id(1) }]
        );
        let left_behind = get(&out, 1).subtask(id(3)).unwrap();
        assert_eq!(
            left_behind.dependencies,
            vec![TaskRef::Subtask { parent: id(2), sub: id(2) }]
        );
    }

    #[test]
    fn test_subtask_to_taken_slot_gets_next_free_id() {
        let tasks = vec![with_subtasks(1, &[1]), with_subtasks(2, &[1, 2, 3])];
        let (out, moved) = move_item(
            &tasks,
            ItemRef::Subtask(id(1), id(1)),
            ItemRef::Subtask(id(2), id(1)),
        )
        .unwrap();
        assert_eq!(moved.to, ItemRef::Subtask(id(2), id(4)));
        assert_eq!(moved.requested, ItemRef::Subtask(id(2), id(1)));
        // Placed right after the occupant of 2.1
        assert_eq!(sub_ids(get(&out, 2)), vec![1, 4, 2, 3]);
        assert!(get(&out, 1).subtasks.is_empty());
        assert_unique(&out);
    }

    #[test]
    fn test_subtask_lookup_errors() {
        let tasks = vec![with_subtasks(1, &[1]), task(2, &[])];
        let move_err = |from: ItemRef, to: ItemRef| move_item(&tasks, from, to).unwrap_err().code();

        assert_eq!(
            move_err(ItemRef::Subtask(id(9), id(1)), ItemRef::Task(id(5))),
            "PARENT_TASK_NOT_FOUND"
        );
        assert_eq!(
            move_err(ItemRef::Subtask(id(2), id(1)), ItemRef::Task(id(5))),
            "PARENT_TASK_NO_SUBTASKS"
        );
        assert_eq!(
            move_err(ItemRef::Subtask(id(1), id(7)), ItemRef::Task(id(5))),
            "SUBTASK_NOT_FOUND"
        );
        assert_eq!(
            move_err(ItemRef::Subtask(id(1), id(1)), ItemRef::Subtask(id(8), id(1))),
            "DESTINATION_TASK_NOT_FOUND"
        );
    }

    #[test]
    fn test_subtask_to_task_promotes_in_order() {
        let mut parent = with_subtasks(2, &[1, 2]);
        parent.subtasks[1].dependencies = vec![TaskRef::Task(id(1))];
        parent.subtasks[0].dependencies = vec![TaskRef::Task(id(2))];
        let mut dependent = task(9, &[]);
        dependent.dependencies = vec![TaskRef::Subtask { parent: id(2), sub: id(2) }];
        let tasks = vec![task(1, &[]), parent, task(6, &[]), dependent];

        let (out, moved) = move_item(&tasks, ItemRef::Subtask(id(2), id(2)), ItemRef::Task(id(4))).unwrap();
        assert_eq!(moved.kind, MoveKind::SubtaskToTask);
        assert_eq!(ids(&out), vec![1, 2, 4, 6, 9]);

        let promoted = get(&out, 4);
        assert!(promoted.subtasks.is_empty());
        assert_eq!(promoted.status, crate::models::TaskStatus::Pending);
        // Its old sibling reference keeps pointing at 2.1
        assert_eq!(
            promoted.dependencies,
            vec![TaskRef::Subtask { parent: id(2), sub: id(1) }]
        );
        assert_eq!(sub_ids(get(&out, 2)), vec![1]);
        assert_eq!(get(&out, 2).subtasks[0].dependencies, vec![TaskRef::Task(id(4))]);
        assert_eq!(get(&out, 9).dependencies, vec![TaskRef::Task(id(4))]);
    }

    #[test]
    fn test_subtask_to_existing_task_fails() {
        let tasks = vec![with_subtasks(1, &[1]), task(2, &[])];
        let err = move_item(&tasks, ItemRef::Subtask(id(1), id(1)), ItemRef::Task(id(2))).unwrap_err();
        assert_eq!(err.code(), "TASK_ALREADY_EXISTS");
    }

    #[test]
    fn test_task_to_subtask_demotes() {
        let tasks = vec![with_subtasks(1, &[1, 2]), task(3, &[]), task(4, &[3])];
        let (out, moved) = move_item(&tasks, ItemRef::Task(id(3)), ItemRef::Subtask(id(1), id(3))).unwrap();
        assert_eq!(moved.kind, MoveKind::TaskToSubtask);
        assert_eq!(ids(&out), vec![1, 4]);
        assert_eq!(sub_ids(get(&out, 1)), vec![1, 2, 3]);
        assert_eq!(
            get(&out, 4).dependencies,
            vec![TaskRef::Subtask { parent: id(1), sub: id(3) }]
        );
        assert_unique(&out);
    }

    #[test]
    fn test_task_to_subtask_into_empty_parent() {
        let tasks = vec![task(1, &[]), task(2, &[])];
        let (out, _) = move_item(&tasks, ItemRef::Task(id(2)), ItemRef::Subtask(id(1), id(1))).unwrap();
        assert_eq!(sub_ids(get(&out, 1)), vec![1]);
        assert_eq!(out[0].subtasks[0].title, "Task 2");
    }

    #[test]
    fn test_task_to_subtask_errors() {
        let tasks = vec![with_subtasks(1, &[1]), with_subtasks(2, &[1])];
        let code = |from: ItemRef, to: ItemRef| move_item(&tasks, from, to).unwrap_err().code();
        assert_eq!(code(ItemRef::Task(id(7)), ItemRef::Subtask(id(1), id(2))), "TASK_NOT_FOUND");
        assert_eq!(
            code(ItemRef::Task(id(1)), ItemRef::Subtask(id(9), id(2))),
            "PARENT_TASK_NOT_FOUND"
        );
        // Demoting a task that still has subtasks would drop them
        assert_eq!(
            code(ItemRef::Task(id(2)), ItemRef::Subtask(id(1), id(2))),
            "TASK_HAS_SUBTASKS"
        );
        assert_eq!(code(ItemRef::Task(id(1)), ItemRef::Subtask(id(1), id(2))), "INVALID_INPUT");
    }
}
