//! Task and subtask identifiers.
//!
//! Ids arrive as JSON numbers, numeric strings, or dotted `"parent.sub"`
//! strings. Everything here turns them into typed values once, so the rest
//! of the crate never inspects raw JSON to decide what an id is.

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// A positive task or subtask id.
///
/// Deserializes from a number or a numeric string, always serializes as a number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskId(u32);

impl TaskId {
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    pub fn get(self) -> u32 {
        self.0
    }

    /// The id directly after this one.
    pub fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TaskId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        match trimmed.parse::<u32>() {
            Ok(0) => Err(Error::InvalidId(format!(
                "IDs must be positive integers, got: {}",
                s
            ))),
            Ok(n) => Ok(TaskId(n)),
            Err(_) => Err(Error::InvalidId(format!("Not a numeric ID: {}", s))),
        }
    }
}

impl Serialize for TaskId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.0)
    }
}

impl<'de> Deserialize<'de> for TaskId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct TaskIdVisitor;

        impl Visitor<'_> for TaskIdVisitor {
            type Value = TaskId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a task id as a number or numeric string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<TaskId, E> {
                match u32::try_from(v) {
                    Ok(0) => Err(E::custom("task id must be positive, got 0")),
                    Ok(n) => Ok(TaskId(n)),
                    Err(_) => Err(E::custom(format!("task id out of range: {}", v))),
                }
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<TaskId, E> {
                let v = u64::try_from(v).map_err(|_| E::custom(format!("task id out of range: {}", v)))?;
                self.visit_u64(v)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<TaskId, E> {
                v.parse::<TaskId>().map_err(|_| E::custom(format!("not a positive task id: {:?}", v)))
            }
        }

        deserializer.deserialize_any(TaskIdVisitor)
    }
}

/// A dependency reference as stored in a `dependencies` list.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TaskRef {
    /// A top-level task id.
    Task(TaskId),
    /// A `"parent.sub"` subtask reference.
    Subtask { parent: TaskId, sub: TaskId },
    /// Anything else, kept verbatim.
    Unresolved(String),
}

impl TaskRef {
    /// Parse a textual reference. Never fails; unknown shapes become `Unresolved`.
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if let Ok(id) = trimmed.parse::<TaskId>() {
            return TaskRef::Task(id);
        }
        if let Some((parent, sub)) = trimmed.split_once('.') {
            if let (Ok(parent), Ok(sub)) = (parent.parse::<TaskId>(), sub.parse::<TaskId>()) {
                return TaskRef::Subtask { parent, sub };
            }
        }
        TaskRef::Unresolved(raw.to_string())
    }

    /// Reduce to the parent task id used for task-level membership tests.
    pub fn normalize(&self) -> Option<TaskId> {
        match self {
            TaskRef::Task(id) => Some(*id),
            TaskRef::Subtask { parent, .. } => Some(*parent),
            TaskRef::Unresolved(raw) => normalize_dependency(raw),
        }
    }

    pub fn is_subtask(&self) -> bool {
        matches!(self, TaskRef::Subtask { .. })
    }
}

impl fmt::Display for TaskRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskRef::Task(id) => write!(f, "{}", id),
            TaskRef::Subtask { parent, sub } => write!(f, "{}.{}", parent, sub),
            TaskRef::Unresolved(raw) => f.write_str(raw),
        }
    }
}

impl Serialize for TaskRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            TaskRef::Task(id) => id.serialize(serializer),
            other => serializer.serialize_str(&other.to_string()),
        }
    }
}

impl<'de> Deserialize<'de> for TaskRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum RawRef {
            Int(u64),
            Float(f64),
            Str(String),
        }

        Ok(match RawRef::deserialize(deserializer)? {
            RawRef::Int(n) => match u32::try_from(n) {
                Ok(id) if id > 0 => TaskRef::Task(TaskId(id)),
                _ => TaskRef::Unresolved(n.to_string()),
            },
            RawRef::Float(f) => TaskRef::Unresolved(f.to_string()),
            RawRef::Str(s) => TaskRef::parse(&s),
        })
    }
}

/// Normalize a textual dependency to its parent task id.
///
/// Numeric text parses directly, dotted text parses its first segment, and
/// empty or unparseable text yields `None`.
pub fn normalize_dependency(raw: &str) -> Option<TaskId> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    let head = trimmed.split('.').next().unwrap_or(trimmed);
    head.parse::<TaskId>().ok()
}

/// Normalize a dependency list, dropping entries that do not resolve.
///
/// A missing list stays missing; it is not the same as an empty one.
pub fn normalize_dependencies(deps: Option<&[TaskRef]>) -> Option<Vec<TaskId>> {
    deps.map(|deps| deps.iter().filter_map(TaskRef::normalize).collect())
}

/// The source or destination of an intra-tag move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemRef {
    Task(TaskId),
    Subtask(TaskId, TaskId),
}

impl ItemRef {
    /// Strict parse of `"5"` or `"5.2"`.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        match trimmed.split_once('.') {
            None => Ok(ItemRef::Task(trimmed.parse()?)),
            Some((parent, sub)) => {
                if sub.contains('.') {
                    return Err(Error::InvalidId(format!(
                        "Nested subtask IDs are not supported: {}",
                        raw
                    )));
                }
                Ok(ItemRef::Subtask(parent.parse()?, sub.parse()?))
            }
        }
    }

    pub fn is_subtask(&self) -> bool {
        matches!(self, ItemRef::Subtask(..))
    }

    /// The dependency reference that points at this item.
    pub fn as_task_ref(&self) -> TaskRef {
        match *self {
            ItemRef::Task(id) => TaskRef::Task(id),
            ItemRef::Subtask(parent, sub) => TaskRef::Subtask { parent, sub },
        }
    }
}

impl fmt::Display for ItemRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ItemRef::Task(id) => write!(f, "{}", id),
            ItemRef::Subtask(parent, sub) => write!(f, "{}.{}", parent, sub),
        }
    }
}

impl Serialize for ItemRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self {
            ItemRef::Task(id) => id.serialize(serializer),
            ItemRef::Subtask(..) => serializer.serialize_str(&self.to_string()),
        }
    }
}

/// Split a comma-separated id list, trimming whitespace and dropping empties.
pub fn parse_id_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
