//! KDL schema for config.kdl.
//!
//! This module provides:
//! - The `TagtaskConfig` struct mirroring the file
//! - Conversion to and from `KdlDocument`
//! - Validation of value ranges
//! - Loading from and writing to disk

use kdl::{KdlDocument, KdlEntry, KdlNode, KdlValue};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// Upper bound accepted for `max-dependency-depth`.
pub const MAX_DEPENDENCY_DEPTH_LIMIT: usize = 1000;

/// Output format preference for CLI commands.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// JSON output (default, machine-readable)
    #[default]
    Json,
    /// Human-readable output
    Human,
}

impl OutputFormat {
    /// Parse from string, case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "json" => Some(OutputFormat::Json),
            "human" => Some(OutputFormat::Human),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Human => "human",
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Settings stored in config.kdl. Every field is optional; unset fields fall
/// through to the next layer.
///
/// # KDL Schema
///
/// ```kdl
/// tasks-file ".taskmaster/tasks/tasks.json"
/// default-tag "master"
/// max-dependency-depth 100
/// output-format "human"  // or "json"
/// action-log #false
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TagtaskConfig {
    /// Tasks file, relative to the project root unless absolute
    pub tasks_file: Option<PathBuf>,

    /// Tag used when a command does not name one
    pub default_tag: Option<String>,

    /// Closure bound when moving tasks with their dependencies
    pub max_dependency_depth: Option<usize>,

    pub output_format: Option<OutputFormat>,

    /// Whether commands are appended to the action log
    pub action_log: Option<bool>,
}

impl TagtaskConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate value ranges.
    pub fn validate(&self) -> std::result::Result<(), String> {
        if let Some(depth) = self.max_dependency_depth {
            if depth == 0 || depth > MAX_DEPENDENCY_DEPTH_LIMIT {
                return Err(format!(
                    "max-dependency-depth must be 1-{}, got {}",
                    MAX_DEPENDENCY_DEPTH_LIMIT, depth
                ));
            }
        }
        if let Some(tag) = &self.default_tag {
            if tag.trim().is_empty() {
                return Err("default-tag must not be empty".to_string());
            }
        }
        Ok(())
    }

    /// Parse config from a KDL document.
    ///
    /// Unknown nodes are ignored. Known nodes with a value of the wrong type
    /// are errors.
    pub fn from_kdl(doc: &KdlDocument) -> std::result::Result<Self, String> {
        let mut config = Self::new();

        if let Some(s) = string_value(doc, "tasks-file")? {
            config.tasks_file = Some(PathBuf::from(s));
        }

        config.default_tag = string_value(doc, "default-tag")?;

        if let Some(node) = doc.get("max-dependency-depth") {
            let depth = node
                .entries()
                .first()
                .and_then(|e| e.value().as_integer())
                .ok_or("max-dependency-depth must be an integer")?;
            let depth = usize::try_from(depth).map_err(|_| {
                format!(
                    "max-dependency-depth must be 1-{}, got {}",
                    MAX_DEPENDENCY_DEPTH_LIMIT, depth
                )
            })?;
            config.max_dependency_depth = Some(depth);
        }

        if let Some(s) = string_value(doc, "output-format")? {
            config.output_format = Some(
                OutputFormat::parse(&s)
                    .ok_or_else(|| format!("output-format must be \"json\" or \"human\", got {:?}", s))?,
            );
        }

        if let Some(node) = doc.get("action-log") {
            let enabled = node
                .entries()
                .first()
                .and_then(|e| e.value().as_bool())
                .ok_or("action-log must be #true or #false")?;
            config.action_log = Some(enabled);
        }

        config.validate()?;
        Ok(config)
    }

    /// Convert config to a KDL document.
    pub fn to_kdl(&self) -> KdlDocument {
        let mut doc = KdlDocument::new();

        if let Some(ref path) = self.tasks_file {
            push_node(&mut doc, "tasks-file", KdlValue::String(path.display().to_string()));
        }
        if let Some(ref tag) = self.default_tag {
            push_node(&mut doc, "default-tag", KdlValue::String(tag.clone()));
        }
        if let Some(depth) = self.max_dependency_depth {
            push_node(&mut doc, "max-dependency-depth", KdlValue::Integer(depth as i128));
        }
        if let Some(format) = self.output_format {
            push_node(&mut doc, "output-format", KdlValue::String(format.as_str().to_string()));
        }
        if let Some(enabled) = self.action_log {
            push_node(&mut doc, "action-log", KdlValue::Bool(enabled));
        }

        doc
    }

    /// Merge another config into this one.
    /// Values from `other` override values in `self` if they are Some.
    pub fn merge(&mut self, other: &TagtaskConfig) {
        if other.tasks_file.is_some() {
            self.tasks_file = other.tasks_file.clone();
        }
        if other.default_tag.is_some() {
            self.default_tag = other.default_tag.clone();
        }
        if other.max_dependency_depth.is_some() {
            self.max_dependency_depth = other.max_dependency_depth;
        }
        if other.output_format.is_some() {
            self.output_format = other.output_format;
        }
        if other.action_log.is_some() {
            self.action_log = other.action_log;
        }
    }

    /// Read a config file. A missing file is an empty config.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let content = fs::read_to_string(path)?;
        let doc: KdlDocument = content.parse()?;
        Self::from_kdl(&doc).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))
    }

    /// Write the config file, creating parent directories.
    pub fn write(&self, path: &Path) -> Result<()> {
        self.validate().map_err(Error::Config)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut doc = self.to_kdl();
        doc.autoformat();
        fs::write(path, doc.to_string())?;
        Ok(())
    }
}

fn string_value(doc: &KdlDocument, name: &str) -> std::result::Result<Option<String>, String> {
    let Some(node) = doc.get(name) else {
        return Ok(None);
    };
    node.entries()
        .first()
        .and_then(|e| e.value().as_string())
        .map(|s| Some(s.to_string()))
        .ok_or_else(|| format!("{} must be a string", name))
}

fn push_node(doc: &mut KdlDocument, name: &str, value: KdlValue) {
    let mut node = KdlNode::new(name);
    node.push(KdlEntry::new(value));
    doc.nodes_mut().push(node);
}
