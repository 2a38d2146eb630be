//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment (`TG_TASKS_FILE`, tasks file only)
//! 3. Project config.kdl (`<project>/.taskmaster/config.kdl`)
//! 4. System config.kdl (`~/.config/tagtask/config.kdl`)
//! 5. Built-in defaults

use std::path::{Path, PathBuf};

use crate::Result;
use crate::config::{OutputFormat, TagtaskConfig};
use crate::moves::cross_tag::WITH_DEPENDENCIES_MAX_DEPTH;
use crate::storage::LEGACY_TAG;

/// Environment variable overriding the tasks file location.
pub const TASKS_FILE_ENV: &str = "TG_TASKS_FILE";

/// Environment variable overriding the system config directory.
pub const CONFIG_DIR_ENV: &str = "TG_CONFIG_DIR";

/// Tasks file location relative to the project root.
pub const DEFAULT_TASKS_FILE: &str = ".taskmaster/tasks/tasks.json";

/// Project config location relative to the project root.
pub const PROJECT_CONFIG_FILE: &str = ".taskmaster/config.kdl";

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from CLI flag
    CliFlag,
    /// Value from environment variable
    EnvVar(String),
    /// Value from the project's config.kdl
    Project,
    /// Value from the user's config.kdl
    System,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Project => write!(f, "project"),
            ValueSource::System => write!(f, "system"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    /// Directory the relative paths below were resolved against
    pub project_root: PathBuf,
    pub tasks_file: Resolved<PathBuf>,
    pub default_tag: Resolved<String>,
    pub max_dependency_depth: Resolved<usize>,
    pub output_format: Resolved<OutputFormat>,
    pub action_log: Resolved<bool>,
}

impl ResolvedConfig {
    /// Defaults for a project rooted at `project_root`.
    pub fn defaults(project_root: &Path) -> Self {
        Self {
            project_root: project_root.to_path_buf(),
            tasks_file: Resolved::new(project_root.join(DEFAULT_TASKS_FILE), ValueSource::Default),
            default_tag: Resolved::new(LEGACY_TAG.to_string(), ValueSource::Default),
            max_dependency_depth: Resolved::new(WITH_DEPENDENCIES_MAX_DEPTH, ValueSource::Default),
            output_format: Resolved::new(OutputFormat::Json, ValueSource::Default),
            action_log: Resolved::new(true, ValueSource::Default),
        }
    }

    pub fn tasks_file(&self) -> &Path {
        &self.tasks_file.value
    }

    pub fn default_tag(&self) -> &str {
        &self.default_tag.value
    }

    pub fn max_dependency_depth(&self) -> usize {
        self.max_dependency_depth.value
    }

    pub fn output_format(&self) -> OutputFormat {
        self.output_format.value
    }

    pub fn action_log_enabled(&self) -> bool {
        self.action_log.value
    }
}

/// CLI overrides for configuration resolution.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub tasks_file: Option<PathBuf>,
    pub default_tag: Option<String>,
    pub max_dependency_depth: Option<usize>,
    pub output_format: Option<OutputFormat>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tasks_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.tasks_file = Some(path.into());
        self
    }

    pub fn with_default_tag(mut self, tag: impl Into<String>) -> Self {
        self.default_tag = Some(tag.into());
        self
    }

    pub fn with_max_dependency_depth(mut self, depth: usize) -> Self {
        self.max_dependency_depth = Some(depth);
        self
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }
}

/// Path of the user-level config file.
///
/// `TG_CONFIG_DIR` replaces the platform config directory when set.
pub fn system_config_path() -> Option<PathBuf> {
    match std::env::var(CONFIG_DIR_ENV) {
        Ok(dir) if !dir.is_empty() => Some(PathBuf::from(dir).join("config.kdl")),
        _ => dirs::config_dir().map(|d| d.join("tagtask").join("config.kdl")),
    }
}

pub fn project_config_path(project_root: &Path) -> PathBuf {
    project_root.join(PROJECT_CONFIG_FILE)
}

/// Pick the first layer that sets a value.
fn pick<T>(layers: [(Option<T>, ValueSource); 3], fallback: Resolved<T>) -> Resolved<T> {
    layers
        .into_iter()
        .find_map(|(value, source)| value.map(|v| Resolved::new(v, source)))
        .unwrap_or(fallback)
}

/// Resolve configuration with full precedence chain.
pub fn resolve_config(project_root: &Path, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let defaults = ResolvedConfig::defaults(project_root);

    let system = match system_config_path() {
        Some(path) => TagtaskConfig::load(&path)?,
        None => TagtaskConfig::default(),
    };
    let project = TagtaskConfig::load(&project_config_path(project_root))?;

    let depth_override = match overrides.max_dependency_depth {
        Some(depth) => {
            TagtaskConfig {
                max_dependency_depth: Some(depth),
                ..Default::default()
            }
            .validate()
            .map_err(crate::Error::Config)?;
            Some(depth)
        }
        None => None,
    };

    // Paths from files are relative to the project, CLI and env paths to the cwd
    let tasks_file = if let Some(ref path) = overrides.tasks_file {
        Resolved::new(path.clone(), ValueSource::CliFlag)
    } else if let Some(path) = std::env::var_os(TASKS_FILE_ENV).filter(|v| !v.is_empty()) {
        Resolved::new(PathBuf::from(path), ValueSource::EnvVar(TASKS_FILE_ENV.to_string()))
    } else if let Some(ref path) = project.tasks_file {
        Resolved::new(project_root.join(path), ValueSource::Project)
    } else if let Some(ref path) = system.tasks_file {
        Resolved::new(project_root.join(path), ValueSource::System)
    } else {
        defaults.tasks_file
    };

    Ok(ResolvedConfig {
        project_root: project_root.to_path_buf(),
        tasks_file,
        default_tag: pick(
            [
                (overrides.default_tag.clone(), ValueSource::CliFlag),
                (project.default_tag, ValueSource::Project),
                (system.default_tag, ValueSource::System),
            ],
            defaults.default_tag,
        ),
        max_dependency_depth: pick(
            [
                (depth_override, ValueSource::CliFlag),
                (project.max_dependency_depth, ValueSource::Project),
                (system.max_dependency_depth, ValueSource::System),
            ],
            defaults.max_dependency_depth,
        ),
        output_format: pick(
            [
                (overrides.output_format, ValueSource::CliFlag),
                (project.output_format, ValueSource::Project),
                (system.output_format, ValueSource::System),
            ],
            defaults.output_format,
        ),
        action_log: match (project.action_log, system.action_log) {
            (Some(enabled), _) => Resolved::new(enabled, ValueSource::Project),
            (None, Some(enabled)) => Resolved::new(enabled, ValueSource::System),
            (None, None) => defaults.action_log,
        },
    })
}
