//! Common test utilities for tg integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't read the
//! user's real configuration or tasks file.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
pub use tempfile::TempDir;

/// A test environment with isolated project and config directories.
///
/// - `repo_dir`: project root, holds `.taskmaster/`
/// - `config_dir`: system config location (via `TG_CONFIG_DIR`)
///
/// The `tg()` method sets the environment per-invocation, making tests
/// parallel-safe.
pub struct TestEnv {
    pub repo_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            repo_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and run `tg init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.tg().arg("init").assert().success();
        env
    }

    /// Create a test environment whose tasks file holds `document`.
    pub fn with_tasks(document: Value) -> Self {
        let env = Self::new();
        env.write_tasks(&document);
        env
    }

    /// Get a Command for the tg binary running inside the project.
    pub fn tg(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_tg"));
        cmd.current_dir(self.repo_dir.path());
        cmd.env("TG_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("TG_TASKS_FILE");
        cmd.env_remove("TG_REPO");
        cmd.env_remove("TG_LOG");
        cmd
    }

    pub fn path(&self) -> &Path {
        self.repo_dir.path()
    }

    pub fn tasks_path(&self) -> PathBuf {
        self.path().join(".taskmaster/tasks/tasks.json")
    }

    pub fn write_tasks(&self, document: &Value) {
        let path = self.tasks_path();
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, serde_json::to_string_pretty(document).unwrap()).unwrap();
    }

    pub fn read_tasks(&self) -> Value {
        serde_json::from_str(&fs::read_to_string(self.tasks_path()).unwrap()).unwrap()
    }

    /// Write the project config (`.taskmaster/config.kdl`).
    pub fn write_project_config(&self, kdl: &str) {
        let dir = self.path().join(".taskmaster");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("config.kdl"), kdl).unwrap();
    }

    /// Ids of the tasks in `tag`, in file order.
    pub fn task_ids(&self, tag: &str) -> Vec<u64> {
        self.read_tasks()[tag]["tasks"]
            .as_array()
            .unwrap()
            .iter()
            .map(|t| t["id"].as_u64().unwrap())
            .collect()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse a command's stdout as JSON.
pub fn parse_json(output: &[u8]) -> Value {
    serde_json::from_slice(output).unwrap()
}

/// Parse the `{error, code, data}` object printed on stderr.
pub fn parse_error(stderr: &[u8]) -> Value {
    let text = String::from_utf8_lossy(stderr);
    let line = text
        .lines()
        .rev()
        .find(|l| l.trim_start().starts_with('{'))
        .unwrap();
    serde_json::from_str(line).unwrap()
}
