//! Configuration for tagtask.
//!
//! Settings live in `config.kdl` files at two levels:
//! - System: `~/.config/tagtask/config.kdl` (or `$TG_CONFIG_DIR/config.kdl`)
//! - Project: `<project>/.taskmaster/config.kdl`
//!
//! Recognized keys:
//! - `tasks-file` - Path of the tagged tasks document
//! - `default-tag` - Tag used when a command does not name one
//! - `max-dependency-depth` - Closure bound for `--with-dependencies` (1-1000)
//! - `output-format` - "json" or "human"
//! - `action-log` - Whether invocations are appended to the action log
//!
//! ## Precedence
//!
//! CLI flag > environment > project config > system config > defaults
//!
//! Use the [`resolver`] module for precedence resolution.

pub mod resolver;
pub mod schema;

pub use resolver::{
    CONFIG_DIR_ENV, ConfigOverrides, DEFAULT_TASKS_FILE, PROJECT_CONFIG_FILE, Resolved,
    ResolvedConfig, TASKS_FILE_ENV, ValueSource, project_config_path, resolve_config,
    system_config_path,
};
pub use schema::{MAX_DEPENDENCY_DEPTH_LIMIT, OutputFormat, TagtaskConfig};
