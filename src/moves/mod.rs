//! Mutations of the tagged task graph.
//!
//! - [`intra`] repositions tasks and subtasks inside one tag
//! - [`cross_tag`] migrates whole tasks between tags
//!
//! This module also runs comma-separated intra-tag batches.

pub mod cross_tag;
pub mod intra;

pub use cross_tag::{
    ConflictKind, DependencyConflict, DependencyPolicy, DroppedDependency, MigrationRequest,
    MigrationSummary, MovedTaskRecord, migrate,
};
pub use intra::{MoveKind, MovedItem, insert_after, move_item};

use serde::Serialize;
use tracing::{info, warn};

use crate::models::{ItemRef, Task};
use crate::{Error, Result};

/// A batch pair that was skipped because an item could not be found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedMove {
    pub from: String,
    pub to: String,
    pub code: &'static str,
    pub message: String,
}

/// What happened to each pair of a batch.
#[derive(Debug, Default)]
pub struct BatchOutcome {
    pub moved: Vec<MovedItem>,
    pub skipped: Vec<SkippedMove>,
    /// Error that stopped the batch; pairs before it stay applied
    pub aborted: Option<Error>,
}

impl BatchOutcome {
    /// True when at least one pair changed the task list.
    pub fn changed(&self) -> bool {
        !self.moved.is_empty()
    }
}

/// Run `sources[i] -> dests[i]` in order over an evolving copy of `tasks`.
///
/// Every id is parsed first. Lookup failures skip the pair and continue. Any
/// other failure stops the batch and is returned in [`BatchOutcome::aborted`]
/// alongside the list as it stood after the last applied pair.
pub fn move_batch(tasks: &[Task], sources: &[String], dests: &[String]) -> Result<(Vec<Task>, BatchOutcome)> {
    if sources.len() != dests.len() {
        return Err(Error::IdCountMismatch {
            sources: sources.len(),
            destinations: dests.len(),
        });
    }
    if sources.is_empty() {
        return Err(Error::InvalidInput("No IDs given to move".to_string()));
    }

    // Malformed ids fail the whole batch before anything is applied
    let pairs = sources
        .iter()
        .zip(dests)
        .map(|(from, to)| Ok((ItemRef::parse(from)?, ItemRef::parse(to)?)))
        .collect::<Result<Vec<_>>>()?;

    let mut current = tasks.to_vec();
    let mut outcome = BatchOutcome::default();

    for ((from, to), (source, dest)) in sources.iter().zip(dests).zip(pairs) {
        match move_item(&current, source, dest) {
            Ok((next, moved)) => {
                info!(from = %moved.from, to = %moved.to, "moved item");
                current = next;
                outcome.moved.push(moved);
            }
            Err(e) if e.is_lookup() => {
                warn!(from = %from, to = %to, error = %e, "skipping move");
                outcome.skipped.push(SkippedMove {
                    from: from.clone(),
                    to: to.clone(),
                    code: e.code(),
                    message: e.to_string(),
                });
            }
            Err(e) => {
                outcome.aborted = Some(e);
                break;
            }
        }
    }

    Ok((current, outcome))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskId;
    use crate::test_utils::task;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_count_mismatch() {
        let tasks = vec![task(1, &[])];
        let err = move_batch(&tasks, &strings(&["1", "2"]), &strings(&["3"])).unwrap_err();
        assert_eq!(err.code(), "ID_COUNT_MISMATCH");
        assert_eq!(err.data()["sources"], 2);
    }

    #[test]
    fn test_pairs_apply_in_order() {
        // 1 -> 5 frees id 1 for 2 -> 1
        let tasks = vec![task(1, &[]), task(2, &[1])];
        let (out, outcome) =
            move_batch(&tasks, &strings(&["1", "2"]), &strings(&["5", "1"])).unwrap();
        assert_eq!(outcome.moved.len(), 2);
        let ids: Vec<u32> = out.iter().map(|t| t.id.get()).collect();
        assert_eq!(ids, vec![5, 1]);
        let renamed = out.iter().find(|t| t.id == TaskId::new(1)).unwrap();
        assert_eq!(renamed.title, "Task 2");
        assert_eq!(renamed.dependencies, vec![crate::models::TaskRef::Task(TaskId::new(5))]);
    }

    #[test]
    fn test_lookup_errors_are_skipped() {
        let tasks = vec![task(1, &[]), task(2, &[])];
        let (out, outcome) =
            move_batch(&tasks, &strings(&["9", "2"]), &strings(&["10", "3"])).unwrap();
        assert_eq!(outcome.skipped.len(), 1);
        assert_eq!(outcome.skipped[0].code, "TASK_NOT_FOUND");
        assert_eq!(outcome.moved.len(), 1);
        assert!(outcome.aborted.is_none());
        assert!(out.iter().any(|t| t.id == TaskId::new(3)));
    }

    #[test]
    fn test_conflict_aborts_but_keeps_earlier_pairs() {
        let tasks = vec![task(1, &[]), task(2, &[]), task(3, &[])];
        let (out, outcome) = move_batch(
            &tasks,
            &strings(&["1", "2", "3"]),
            &strings(&["7", "3", "8"]),
        )
        .unwrap();
        assert_eq!(outcome.moved.len(), 1);
        assert_eq!(outcome.aborted.as_ref().map(Error::code), Some("TASK_ALREADY_EXISTS"));
        assert!(outcome.changed());
        let ids: Vec<u32> = out.iter().map(|t| t.id.get()).collect();
        assert_eq!(ids, vec![2, 3, 7]);
    }

    #[test]
    fn test_malformed_id_rejects_whole_batch() {
        let tasks = vec![task(1, &[])];
        let err = move_batch(&tasks, &strings(&["1", "abc"]), &strings(&["2", "3"])).unwrap_err();
        assert_eq!(err.code(), "INVALID_ID");
    }
}
