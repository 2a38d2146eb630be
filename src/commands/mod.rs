//! Command implementations for the tg CLI.
//!
//! Each command loads the tasks file once, runs the engine, persists at most
//! once, and returns a value implementing [`Output`]:
//! - `init` - Create an empty tasks file
//! - `move_within_tag` - Batch repositioning inside one tag
//! - `move_between_tags` - Cross-tag migration
//! - `tags` - Tag listing
//! - `validate` - Read-only dependency integrity report

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use tracing::info;

use crate::config::ResolvedConfig;
use crate::models::graph::{IntegrityIssue, validate_tag};
use crate::models::refs::parse_id_list;
use crate::moves::{
    DependencyPolicy, MigrationRequest, MigrationSummary, MovedItem, SkippedMove, migrate, move_batch,
};
use crate::storage::Storage;
use crate::{Error, Result};

/// Command results that can be serialized to JSON or formatted for humans.
pub trait Output {
    /// Serialize to JSON string.
    fn to_json(&self) -> String;

    /// Format for human-readable output.
    fn to_human(&self) -> String;
}

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|e| format!(r#"{{"error":"{}"}}"#, e))
}

// === init ===

#[derive(Debug, Serialize)]
pub struct InitResult {
    pub path: PathBuf,
    pub created: bool,
}

impl Output for InitResult {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        if self.created {
            format!("Created {}", self.path.display())
        } else {
            format!("{} already exists", self.path.display())
        }
    }
}

/// Create the tasks file with an empty `master` tag if it is missing.
pub fn init(config: &ResolvedConfig) -> Result<InitResult> {
    let mut storage = Storage::new(config.tasks_file());
    let created = storage.init()?;
    Ok(InitResult {
        path: storage.path().to_path_buf(),
        created,
    })
}

// === move (intra-tag) ===

#[derive(Debug, Serialize)]
pub struct MoveResult {
    pub tag: String,
    pub moved: Vec<MovedItem>,
    pub skipped: Vec<SkippedMove>,
    pub dry_run: bool,
    /// Tags whose generated task files are stale
    pub changed_tags: Vec<String>,
}

impl Output for MoveResult {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.dry_run {
            lines.push(format!("Dry run in tag \"{}\", nothing saved:", self.tag));
        }
        for item in &self.moved {
            lines.push(format!("  {}", item.describe()));
        }
        for skipped in &self.skipped {
            lines.push(format!(
                "  Skipped {} -> {}: {}",
                skipped.from, skipped.to, skipped.message
            ));
        }
        if self.moved.is_empty() {
            lines.push("Nothing moved".to_string());
        }
        lines.join("\n")
    }
}

/// Run a comma-separated batch of moves inside one tag.
///
/// Pairs applied before a failing pair are saved before the failure is
/// returned.
pub fn move_within_tag(
    config: &ResolvedConfig,
    from: &str,
    to: &str,
    tag: Option<&str>,
    dry_run: bool,
) -> Result<MoveResult> {
    let tag = tag.unwrap_or_else(|| config.default_tag()).to_string();
    let mut storage = Storage::new(config.tasks_file());
    let view = storage.load_resolved(&tag)?;
    if view.metadata().is_none() {
        return Err(Error::TagNotFound { tag });
    }

    let (tasks, outcome) = move_batch(view.tasks(), &parse_id_list(from), &parse_id_list(to))?;

    let changed = outcome.changed();
    if changed && !dry_run {
        let mut data = view.into_raw();
        if let Some(tag_data) = data.get_mut(&tag) {
            tag_data.tasks = tasks;
        }
        storage.save(&data)?;
        info!(tag = %tag, moved = outcome.moved.len(), "saved intra-tag moves");
    }

    if let Some(e) = outcome.aborted {
        return Err(e);
    }

    Ok(MoveResult {
        changed_tags: if changed { vec![tag.clone()] } else { Vec::new() },
        tag,
        moved: outcome.moved,
        skipped: outcome.skipped,
        dry_run,
    })
}

// === move (cross-tag) ===

#[derive(Debug, Serialize)]
pub struct CrossTagMoveResult {
    #[serde(flatten)]
    pub summary: MigrationSummary,
    pub dry_run: bool,
}

impl Output for CrossTagMoveResult {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        let mut lines = Vec::new();
        if self.dry_run {
            lines.push("Dry run, nothing saved:".to_string());
        }
        lines.push(self.summary.message.clone());
        for task in &self.summary.moved_tasks {
            lines.push(format!("  {} {} -> {}", task.id, task.from_tag, task.to_tag));
        }
        for dropped in &self.summary.dropped_dependencies {
            lines.push(format!(
                "  Dropped dependency {} -> {}",
                dropped.task_id, dropped.dependency
            ));
        }
        for tip in &self.summary.tips {
            lines.push(format!("Tip: {}", tip));
        }
        lines.join("\n")
    }
}

/// Move tasks to another tag and save once.
pub fn move_between_tags(
    config: &ResolvedConfig,
    from: &str,
    source_tag: &str,
    target_tag: &str,
    policy: DependencyPolicy,
    dry_run: bool,
) -> Result<CrossTagMoveResult> {
    let mut storage = Storage::new(config.tasks_file());
    let data = storage.load_raw()?;

    let request = MigrationRequest::new(parse_id_list(from), source_tag, target_tag)
        .with_policy(policy)
        .with_max_depth(config.max_dependency_depth());
    let (updated, summary) = migrate(&data, &request, Utc::now())?;

    if !dry_run {
        storage.save(&updated)?;
    }

    Ok(CrossTagMoveResult { summary, dry_run })
}

// === tags ===

#[derive(Debug, Serialize)]
pub struct TagSummary {
    pub name: String,
    pub task_count: usize,
    pub subtask_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TagsResult {
    pub tags: Vec<TagSummary>,
}

impl Output for TagsResult {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        if self.tags.is_empty() {
            return "No tags".to_string();
        }
        self.tags
            .iter()
            .map(|t| {
                let mut line = format!(
                    "{}: {} task(s), {} subtask(s)",
                    t.name, t.task_count, t.subtask_count
                );
                if let Some(ref description) = t.description {
                    line.push_str(&format!(" - {}", description));
                }
                line
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// List every tag with its counts.
pub fn tags(config: &ResolvedConfig) -> Result<TagsResult> {
    let data = Storage::new(config.tasks_file()).load_raw()?;
    let tags = data
        .iter()
        .map(|(name, tag)| TagSummary {
            name: name.clone(),
            task_count: tag.tasks.len(),
            subtask_count: tag.tasks.iter().map(|t| t.subtasks.len()).sum(),
            created: tag.metadata.created,
            description: tag.metadata.description.clone(),
        })
        .collect();
    Ok(TagsResult { tags })
}

// === validate ===

#[derive(Debug, Serialize)]
pub struct ValidateResult {
    pub tag: String,
    pub valid: bool,
    pub issues: Vec<IntegrityIssue>,
}

impl Output for ValidateResult {
    fn to_json(&self) -> String {
        to_json(self)
    }

    fn to_human(&self) -> String {
        if self.valid {
            return format!("Tag \"{}\": no dependency problems found", self.tag);
        }
        let mut lines = vec![format!("Tag \"{}\": {} problem(s)", self.tag, self.issues.len())];
        for issue in &self.issues {
            lines.push(format!("  {}", describe_issue(issue)));
        }
        lines.join("\n")
    }
}

fn describe_issue(issue: &IntegrityIssue) -> String {
    let owner = |task_id: &crate::models::TaskId, subtask_id: &Option<crate::models::TaskId>| match subtask_id {
        Some(sub) => format!("{}.{}", task_id, sub),
        None => task_id.to_string(),
    };
    match issue {
        IntegrityIssue::DanglingReference {
            task_id,
            subtask_id,
            reference,
            found_in,
        } => {
            let mut text = format!("{} depends on missing {}", owner(task_id, subtask_id), reference);
            if !found_in.is_empty() {
                text.push_str(&format!(" (exists in: {})", found_in.join(", ")));
            }
            text
        }
        IntegrityIssue::UnresolvedReference {
            task_id,
            subtask_id,
            reference,
        } => format!(
            "{} has unrecognized dependency {:?}",
            owner(task_id, subtask_id),
            reference.to_string()
        ),
        IntegrityIssue::DuplicateTaskId { task_id } => format!("task id {} is used more than once", task_id),
        IntegrityIssue::DuplicateSubtaskId { task_id, subtask_id } => {
            format!("subtask id {}.{} is used more than once", task_id, subtask_id)
        }
    }
}

/// Report dependency problems in one tag without changing anything.
pub fn validate(config: &ResolvedConfig, tag: Option<&str>) -> Result<ValidateResult> {
    let tag = tag.unwrap_or_else(|| config.default_tag()).to_string();
    let data = Storage::new(config.tasks_file()).load_raw()?;
    let issues = validate_tag(&data, &tag).ok_or_else(|| Error::TagNotFound { tag: tag.clone() })?;
    Ok(ValidateResult {
        valid: issues.is_empty(),
        tag,
        issues,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Resolved, ValueSource};
    use crate::models::{TaskId, TaskRef};
    use crate::test_utils::{TestEnv, subtask, tagged, task};

    fn config_for(env: &TestEnv) -> ResolvedConfig {
        let mut config = ResolvedConfig::defaults(env.path());
        config.tasks_file = Resolved::new(env.tasks_path(), ValueSource::CliFlag);
        config
    }

    fn load(env: &TestEnv) -> crate::models::TaggedData {
        Storage::new(env.tasks_path()).load_raw().unwrap()
    }

    #[test]
    fn test_init_is_idempotent() {
        let env = TestEnv::new();
        let config = config_for(&env);
        assert!(init(&config).unwrap().created);
        assert!(!init(&config).unwrap().created);
        assert!(load(&env).contains_tag("master"));
    }

    #[test]
    fn test_move_within_tag_saves() {
        let env = TestEnv::new();
        env.store_with(&tagged(vec![("master", vec![task(1, &[]), task(2, &[1])])]));
        let config = config_for(&env);

        let result = move_within_tag(&config, "1", "4", None, false).unwrap();
        assert_eq!(result.moved.len(), 1);
        assert_eq!(result.changed_tags, vec!["master"]);

        let data = load(&env);
        let tasks = &data.get("master").unwrap().tasks;
        assert!(tasks.iter().any(|t| t.id == TaskId::new(4)));
        let two = tasks.iter().find(|t| t.id == TaskId::new(2)).unwrap();
        assert_eq!(two.dependencies, vec![TaskRef::Task(TaskId::new(4))]);
    }

    #[test]
    fn test_move_within_tag_dry_run_leaves_file() {
        let env = TestEnv::new();
        let original = tagged(vec![("master", vec![task(1, &[])])]);
        env.store_with(&original);
        let config = config_for(&env);

        let result = move_within_tag(&config, "1", "2", None, true).unwrap();
        assert!(result.dry_run);
        assert_eq!(result.moved.len(), 1);
        assert_eq!(load(&env), original);
    }

    #[test]
    fn test_move_within_tag_saves_pairs_before_failure() {
        let env = TestEnv::new();
        env.store_with(&tagged(vec![("master", vec![task(1, &[]), task(2, &[]), task(3, &[])])]));
        let config = config_for(&env);

        let err = move_within_tag(&config, "1,2", "5,3", None, false).unwrap_err();
        assert_eq!(err.code(), "TASK_ALREADY_EXISTS");
        let data = load(&env);
        assert!(data.get("master").unwrap().contains(TaskId::new(5)));
    }

    #[test]
    fn test_move_within_unknown_tag() {
        let env = TestEnv::new();
        env.store_with(&tagged(vec![("master", vec![task(1, &[])])]));
        let err = move_within_tag(&config_for(&env), "1", "2", Some("nope"), false).unwrap_err();
        assert_eq!(err.code(), "TAG_NOT_FOUND");
    }

    #[test]
    fn test_move_between_tags_saves_once() {
        let env = TestEnv::new();
        env.store_with(&tagged(vec![("backlog", vec![task(1, &[]), task(2, &[1])])]));
        let config = config_for(&env);

        let err = move_between_tags(&config, "2", "backlog", "done", DependencyPolicy::Block, false)
            .unwrap_err();
        assert_eq!(err.code(), "CROSS_TAG_DEPENDENCY_CONFLICTS");
        assert!(!load(&env).contains_tag("done"));

        let result = move_between_tags(
            &config,
            "2",
            "backlog",
            "done",
            DependencyPolicy::WithDependencies,
            false,
        )
        .unwrap();
        assert_eq!(result.summary.moved_tasks.len(), 2);
        let data = load(&env);
        assert!(data.get("backlog").unwrap().tasks.is_empty());
        assert_eq!(data.get("done").unwrap().tasks.len(), 2);
    }

    #[test]
    fn test_tags_and_validate() {
        let env = TestEnv::new();
        let mut parent = task(1, &[9]);
        parent.subtasks = vec![subtask(1), subtask(2)];
        env.store_with(&tagged(vec![("a", vec![parent]), ("b", vec![task(9, &[])])]));
        let config = config_for(&env);

        let listed = tags(&config).unwrap();
        assert_eq!(listed.tags.len(), 2);
        assert_eq!(listed.tags[0].name, "a");
        assert_eq!(listed.tags[0].subtask_count, 2);

        let report = validate(&config, Some("a")).unwrap();
        assert!(!report.valid);
        assert_eq!(report.issues.len(), 1);
        assert!(report.to_human().contains("exists in: b"));

        assert!(validate(&config, Some("b")).unwrap().valid);
        assert_eq!(validate(&config, None).unwrap_err().code(), "TAG_NOT_FOUND");
    }
}
