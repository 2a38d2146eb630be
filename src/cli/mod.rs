//! CLI argument definitions for tg.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::moves::DependencyPolicy;

/// Build metadata shown by `tg --version`.
const LONG_VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("TG_GIT_COMMIT"),
    " ",
    env!("TG_BUILD_TIMESTAMP"),
    ")"
);

/// tg - Move tasks and subtasks around a tagged task graph.
///
/// Repositions items inside a tag and migrates tasks between tags while
/// keeping ids unique and dependencies pointing at the right place.
#[derive(Parser, Debug)]
#[command(name = "tg")]
#[command(author, version, long_version = LONG_VERSION, about = "Move tasks within and between tags", long_about = None)]
pub struct Cli {
    /// Output in human-readable format instead of JSON
    #[arg(short = 'H', long = "human", global = true)]
    pub human_readable: bool,

    /// Run as if tg was started in <path> instead of the current directory.
    /// Can also be set via TG_REPO environment variable.
    #[arg(short = 'C', long = "repo", global = true, env = "TG_REPO")]
    pub repo_path: Option<PathBuf>,

    /// Tasks file to operate on (default: .taskmaster/tasks/tasks.json).
    /// Can also be set via TG_TASKS_FILE environment variable.
    #[arg(short = 'f', long = "file", global = true)]
    pub tasks_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create the tasks file with an empty "master" tag
    Init,

    /// Move tasks or subtasks
    ///
    /// Within a tag: `tg move --from 5 --to 7`, `tg move --from 5.2 --to 3`,
    /// or a batch with `--from 1,2 --to 8,9`.
    ///
    /// Between tags: `tg move --from 5,6 --from-tag backlog --to-tag done`.
    Move(MoveArgs),

    /// List tags with task counts
    Tags,

    /// Report dependencies that do not resolve inside a tag
    Validate {
        /// Tag to check (default: the configured default tag)
        #[arg(long)]
        tag: Option<String>,
    },
}

/// Arguments for `tg move`.
#[derive(Args, Debug, Clone)]
pub struct MoveArgs {
    /// Source id(s), comma-separated (e.g. "5", "5.2", "1,2,3")
    #[arg(long)]
    pub from: String,

    /// Destination id(s) for a move within one tag, paired with --from
    #[arg(long, required_unless_present = "to_tag", conflicts_with_all = ["from_tag", "to_tag"])]
    pub to: Option<String>,

    /// Tag to move within (default: the configured default tag)
    #[arg(long, conflicts_with_all = ["from_tag", "to_tag"])]
    pub tag: Option<String>,

    /// Tag the tasks currently live in
    #[arg(long, requires = "to_tag")]
    pub from_tag: Option<String>,

    /// Tag to move the tasks into (created if missing)
    #[arg(long, requires = "from_tag")]
    pub to_tag: Option<String>,

    /// Also move every task the selected tasks depend on
    #[arg(long, requires = "to_tag", conflicts_with_all = ["to", "ignore_dependencies"])]
    pub with_dependencies: bool,

    /// Drop dependencies that would cross tags
    #[arg(long, requires = "to_tag", conflicts_with = "to")]
    pub ignore_dependencies: bool,

    /// Maximum depth followed by --with-dependencies
    #[arg(long, requires = "with_dependencies", conflicts_with = "to")]
    pub max_depth: Option<usize>,

    /// Show what would happen without saving
    #[arg(long)]
    pub dry_run: bool,
}

impl MoveArgs {
    /// Dependency handling selected by the flags.
    pub fn policy(&self) -> DependencyPolicy {
        if self.with_dependencies {
            DependencyPolicy::WithDependencies
        } else if self.ignore_dependencies {
            DependencyPolicy::IgnoreDependencies
        } else {
            DependencyPolicy::Block
        }
    }
}
